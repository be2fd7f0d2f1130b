//! X.509 certificate parsing for leaf pinning.
//!
//! Only the fields needed to pin a peer and run the legacy key exchange are
//! decoded: the RSA public key, the subject and issuer names, and the subject
//! alternative names. Signatures and validity are not checked.
//!
//! # References
//!
//! - [RFC 5280](https://datatracker.ietf.org/doc/html/rfc5280)
//! - [A Warm Welcome to ASN.1 and DER](https://letsencrypt.org/docs/a-warm-welcome-to-asn1-and-der/)

mod extension;
mod name;
mod oid;
mod pem;

use std::fmt;
use std::net::IpAddr;

use crate::{
    ByteCursor, Error, Fingerprint, Result,
    asn1::{Dialect, strip_leading_zeros},
};

use extension::Extensions;
use oid::ObjectIdentifier;

pub use name::Name;

/// Converts a failed step of the certificate walk into
/// [`Error::MalformedCertificate`], logging where it happened.
pub(crate) trait Context<T> {
    fn context(self, name: &str) -> Result<T>;
}

impl<T> Context<T> for Result<T> {
    fn context(self, name: &str) -> Result<T> {
        self.map_err(|e| match e {
            Error::MalformedCertificate => e,
            e => {
                log::error!("{name}: {e}");
                Error::MalformedCertificate
            }
        })
    }
}

impl<T> Context<T> for Option<T> {
    fn context(self, _name: &str) -> Result<T> {
        // callers log before returning None
        self.ok_or(Error::MalformedCertificate)
    }
}

/// Runs an optional read. A tag mismatch or an exhausted cursor means the
/// field is absent.
pub(crate) fn optional<'a, T>(
    cursor: &mut ByteCursor<'a>,
    read: impl FnOnce(&mut ByteCursor<'a>) -> Result<T>,
) -> Result<Option<T>> {
    if cursor.is_empty() {
        return Ok(None);
    }
    match read(cursor) {
        Ok(val) => Ok(Some(val)),
        Err(Error::TagMismatch) => Ok(None),
        Err(e) => Err(e),
    }
}

/// RSA public key as big-endian unsigned integers without leading zeros.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    modulus: Vec<u8>,
    exponent: Vec<u8>,
}

impl fmt::Debug for RsaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPublicKey")
            .field("bits", &(self.modulus.len() * 8))
            .field("exponent", &hex::encode(&self.exponent))
            .finish()
    }
}

impl RsaPublicKey {
    /// Leading zero octets are stripped from both values.
    pub fn new(modulus: &[u8], exponent: &[u8]) -> Self {
        Self {
            modulus: strip_leading_zeros(modulus).to_vec(),
            exponent: strip_leading_zeros(exponent).to_vec(),
        }
    }

    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    pub fn exponent(&self) -> &[u8] {
        &self.exponent
    }

    /// Modulus length in bytes.
    pub fn modulus_len(&self) -> usize {
        self.modulus.len()
    }
}

/// # References
///
/// - [RFC 5280 Section 4.1](https://datatracker.ietf.org/doc/html/rfc5280#section-4.1)
///
/// ```text
/// Version  ::=  INTEGER  {  v1(0), v2(1), v3(2)  }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Version {
    V1,
    V2,
    V3,
}

impl Version {
    fn deser(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        const NAME: &str = "Certificate.tbsCertificate.version";

        let Some(len) = optional(cursor, |c| Dialect::Ber.read_contextual_tag(c, 0, true))
            .context(NAME)?
        else {
            return Ok(Version::V1);
        };

        let mut explicit: ByteCursor = ByteCursor::new(cursor.read(len).context(NAME)?);
        let version: u32 = Dialect::Ber.read_integer_u32(&mut explicit).context(NAME)?;

        if !explicit.is_empty() {
            log::error!("{NAME} contains {} bytes of extra data", explicit.remaining());
            return None.context(NAME);
        }

        match version {
            0 => Ok(Version::V1),
            1 => Ok(Version::V2),
            2 => Ok(Version::V3),
            x => {
                log::error!("{NAME} invalid value {x}");
                None.context(NAME)
            }
        }
    }
}

/// # References
///
/// - [RFC 5280 Section 4.1.1.2](https://datatracker.ietf.org/doc/html/rfc5280#section-4.1.1.2)
///
/// ```text
/// AlgorithmIdentifier  ::=  SEQUENCE  {
///     algorithm               OBJECT IDENTIFIER,
///     parameters              ANY DEFINED BY algorithm OPTIONAL  }
/// ```
///
/// Parameters are skipped.
fn algorithm_identifier(name: &str, cursor: &mut ByteCursor<'_>) -> Result<ObjectIdentifier> {
    let mut seq: ByteCursor = Dialect::Ber.read_sequence(cursor).context(name)?;
    let algorithm: ObjectIdentifier =
        ObjectIdentifier::deser(&format!("{name}.algorithm"), &mut seq)?;

    if !seq.is_empty() {
        let parameters_name: String = format!("{name}.parameters");
        Dialect::Ber.read_any(&mut seq).context(&parameters_name)?;
        if !seq.is_empty() {
            log::error!("{name} contains {} bytes of extra data", seq.remaining());
            return None.context(name);
        }
    }

    Ok(algorithm)
}

/// # References
///
/// - [RFC 5280 Section 4.1](https://datatracker.ietf.org/doc/html/rfc5280#section-4.1)
/// - [RFC 8017 Appendix A.1.1](https://datatracker.ietf.org/doc/html/rfc8017#appendix-A.1.1)
///
/// ```text
/// SubjectPublicKeyInfo  ::=  SEQUENCE  {
///      algorithm            AlgorithmIdentifier,
///      subjectPublicKey     BIT STRING  }
///
/// RSAPublicKey ::= SEQUENCE {
///     modulus           INTEGER,  -- n
///     publicExponent    INTEGER   -- e
/// }
/// ```
fn subject_public_key_info(cursor: &mut ByteCursor<'_>) -> Result<RsaPublicKey> {
    const NAME: &str = "Certificate.tbsCertificate.subjectPublicKeyInfo";

    let mut spki: ByteCursor = Dialect::Ber.read_sequence(cursor).context(NAME)?;

    let algorithm_name: String = format!("{NAME}.algorithm");
    let mut algorithm: ByteCursor = Dialect::Ber
        .read_sequence(&mut spki)
        .context(&algorithm_name)?;
    let algorithm_oid: ObjectIdentifier =
        ObjectIdentifier::deser(&format!("{algorithm_name}.algorithm"), &mut algorithm)?;

    if algorithm_oid.as_str() != oid::RSA_ENCRYPTION {
        log::error!("{algorithm_name}.algorithm {algorithm_oid} is not rsaEncryption");
        return None.context(NAME);
    }

    // parameters MUST be NULL for rsaEncryption, tolerate absent
    optional(&mut algorithm, |c| Dialect::Ber.read_null(c))
        .context(&format!("{algorithm_name}.parameters"))?;
    if !algorithm.is_empty() {
        log::error!(
            "{algorithm_name} contains {} bytes of extra data",
            algorithm.remaining()
        );
        return None.context(&algorithm_name);
    }

    let key_name: String = format!("{NAME}.subjectPublicKey");
    let (unused, bits) = Dialect::Ber.read_bit_string(&mut spki).context(&key_name)?;
    if unused != 0 {
        log::error!("{key_name} has {unused} unused bits");
        return None.context(&key_name);
    }

    if !spki.is_empty() {
        log::error!("{NAME} contains {} bytes of extra data", spki.remaining());
        return None.context(NAME);
    }

    let mut key_cursor: ByteCursor = ByteCursor::new(bits);
    let mut rsa: ByteCursor = Dialect::Ber
        .read_sequence(&mut key_cursor)
        .context(&key_name)?;
    let modulus: &[u8] = Dialect::Ber
        .read_integer(&mut rsa)
        .context(&format!("{key_name}.modulus"))?;
    let exponent: &[u8] = Dialect::Ber
        .read_integer(&mut rsa)
        .context(&format!("{key_name}.publicExponent"))?;

    if !rsa.is_empty() || !key_cursor.is_empty() {
        log::error!("{key_name} contains extra data after RSAPublicKey");
        return None.context(&key_name);
    }

    for (field, val) in [("modulus", modulus), ("publicExponent", exponent)] {
        if val[0] & 0x80 != 0 {
            log::error!("{key_name}.{field} is negative");
            return None.context(&key_name);
        }
        if strip_leading_zeros(val).is_empty() {
            log::error!("{key_name}.{field} is zero");
            return None.context(&key_name);
        }
    }

    Ok(RsaPublicKey::new(modulus, exponent))
}

/// A parsed certificate. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Certificate {
    der: Vec<u8>,
    version: Version,
    serial_number: Vec<u8>,
    signature_algorithm: ObjectIdentifier,
    issuer: Name,
    subject: Name,
    public_key: RsaPublicKey,
    subject_dns_names: Vec<String>,
    subject_email: Option<String>,
    subject_ip_addrs: Vec<IpAddr>,
    fingerprint: Fingerprint,
}

impl Certificate {
    /// Parses a PEM or DER encoded certificate.
    ///
    /// Any structural problem is reported as [`Error::MalformedCertificate`].
    pub fn parse(input: &[u8]) -> Result<Self> {
        if pem::is_pem(input) {
            let der: Vec<u8> = pem::decode(input)?;
            Self::from_der(&der)
        } else {
            Self::from_der(input)
        }
    }

    /// # References
    ///
    /// - [RFC 5280 Section 4.1](https://datatracker.ietf.org/doc/html/rfc5280#section-4.1)
    ///
    /// ```text
    /// Certificate  ::=  SEQUENCE  {
    ///     tbsCertificate       TBSCertificate,
    ///     signatureAlgorithm   AlgorithmIdentifier,
    ///     signatureValue       BIT STRING  }
    ///
    /// TBSCertificate  ::=  SEQUENCE  {
    ///      version         [0]  EXPLICIT Version DEFAULT v1,
    ///      serialNumber         CertificateSerialNumber,
    ///      signature            AlgorithmIdentifier,
    ///      issuer               Name,
    ///      validity             Validity,
    ///      subject              Name,
    ///      subjectPublicKeyInfo SubjectPublicKeyInfo,
    ///      issuerUniqueID  [1]  IMPLICIT UniqueIdentifier OPTIONAL,
    ///      subjectUniqueID [2]  IMPLICIT UniqueIdentifier OPTIONAL,
    ///      extensions      [3]  EXPLICIT Extensions OPTIONAL
    ///      }
    /// ```
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let mut cursor: ByteCursor = ByteCursor::new(der);

        let mut certificate: ByteCursor = Dialect::Ber
            .read_sequence(&mut cursor)
            .context("Certificate")?;
        if !cursor.is_empty() {
            log::error!(
                "Certificate contains {} bytes of data after sequence encoding",
                cursor.remaining()
            );
            return None.context("Certificate");
        }

        let mut tbs: ByteCursor = Dialect::Ber
            .read_sequence(&mut certificate)
            .context("Certificate.tbsCertificate")?;

        let outer_algorithm: ObjectIdentifier =
            algorithm_identifier("Certificate.signatureAlgorithm", &mut certificate)?;
        Dialect::Ber
            .read_bit_string(&mut certificate)
            .context("Certificate.signatureValue")?;
        if !certificate.is_empty() {
            log::error!(
                "Certificate contains {} bytes of extra data",
                certificate.remaining()
            );
            return None.context("Certificate");
        }

        let version: Version = Version::deser(&mut tbs)?;

        let serial_number: Vec<u8> = Dialect::Ber
            .read_integer(&mut tbs)
            .context("Certificate.tbsCertificate.serialNumber")?
            .to_vec();

        let signature_algorithm: ObjectIdentifier =
            algorithm_identifier("Certificate.tbsCertificate.signature", &mut tbs)?;
        if signature_algorithm != outer_algorithm {
            log::error!(
                "Certificate.tbsCertificate.signature {signature_algorithm} differs from Certificate.signatureAlgorithm {outer_algorithm}"
            );
            return None.context("Certificate");
        }

        let issuer: Name = Name::deser("Certificate.tbsCertificate.issuer", &mut tbs)?;

        Dialect::Ber
            .read_sequence(&mut tbs)
            .context("Certificate.tbsCertificate.validity")?;

        let subject: Name = Name::deser("Certificate.tbsCertificate.subject", &mut tbs)?;

        let public_key: RsaPublicKey = subject_public_key_info(&mut tbs)?;

        for (number, field) in [(1, "issuerUniqueID"), (2, "subjectUniqueID")] {
            let name: String = format!("Certificate.tbsCertificate.{field}");
            if let Some(len) =
                optional(&mut tbs, |c| Dialect::Ber.read_contextual_tag(c, number, false))
                    .context(&name)?
            {
                if version < Version::V2 {
                    log::error!("{name} is present in a {version:?} certificate");
                    return None.context(&name);
                }
                tbs.skip(len).context(&name)?;
            }
        }

        let extensions: Extensions = match optional(&mut tbs, |c| {
            Dialect::Ber.read_contextual_tag(c, 3, true)
        })
        .context("Certificate.tbsCertificate.extensions")?
        {
            Some(len) => {
                if version != Version::V3 {
                    log::error!(
                        "Certificate.tbsCertificate.extensions is present in a {version:?} certificate"
                    );
                    return None.context("Certificate.tbsCertificate.extensions");
                }
                let mut explicit: ByteCursor = ByteCursor::new(
                    tbs.read(len)
                        .context("Certificate.tbsCertificate.extensions")?,
                );
                let extensions: Extensions = Extensions::deser(&mut explicit)?;
                if !explicit.is_empty() {
                    log::error!(
                        "Certificate.tbsCertificate.extensions contains {} bytes of extra data",
                        explicit.remaining()
                    );
                    return None.context("Certificate.tbsCertificate.extensions");
                }
                extensions
            }
            None => Extensions::default(),
        };

        if !tbs.is_empty() {
            log::error!(
                "Certificate.tbsCertificate contains {} bytes of extra data",
                tbs.remaining()
            );
            return None.context("Certificate.tbsCertificate");
        }

        let (subject_dns_names, subject_email, subject_ip_addrs) = match extensions.subject_alt_name
        {
            Some(san) => (san.dns_names(), san.first_email(), san.ip_addrs()),
            None => (Vec::new(), None, Vec::new()),
        };

        let certificate: Self = Self {
            der: der.to_vec(),
            version,
            serial_number,
            signature_algorithm,
            issuer,
            subject,
            public_key,
            subject_dns_names,
            subject_email,
            subject_ip_addrs,
            fingerprint: Fingerprint::of(der),
        };

        log::debug!(
            "parsed certificate subject=\"{}\" fingerprint={}",
            certificate.subject,
            certificate.fingerprint
        );

        Ok(certificate)
    }

    /// The exact bytes the certificate was decoded from.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Content octets of the serial number `INTEGER`.
    pub fn serial_number(&self) -> &[u8] {
        &self.serial_number
    }

    /// Dotted OID of the signature algorithm.
    pub fn signature_algorithm(&self) -> &str {
        self.signature_algorithm.as_str()
    }

    pub fn issuer(&self) -> &Name {
        &self.issuer
    }

    pub fn subject(&self) -> &Name {
        &self.subject
    }

    pub fn common_name(&self) -> Option<&str> {
        self.subject.common_name()
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    pub fn modulus(&self) -> &[u8] {
        self.public_key.modulus()
    }

    pub fn exponent(&self) -> &[u8] {
        self.public_key.exponent()
    }

    /// `dNSName` entries of the subject alternative name, in order.
    pub fn subject_dns_names(&self) -> &[String] {
        &self.subject_dns_names
    }

    /// First `rfc822Name` entry of the subject alternative name.
    pub fn subject_email(&self) -> Option<&str> {
        self.subject_email.as_deref()
    }

    pub fn subject_ip_addrs(&self) -> &[IpAddr] {
        &self.subject_ip_addrs
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn to_pem(&self) -> String {
        let block = ::pem::Pem::new("CERTIFICATE", self.der.clone());
        ::pem::encode_config(
            &block,
            ::pem::EncodeConfig::new().set_line_ending(::pem::LineEnding::LF),
        )
    }

    /// Checks `host` against the subject alternative names, falling back to
    /// the common name when the certificate has no `dNSName` entries.
    ///
    /// A leading `*.` label matches exactly one label. Comparison is ASCII
    /// case-insensitive and ignores a trailing dot.
    pub fn matches_hostname(&self, host: &str) -> bool {
        let host: &str = host.strip_suffix('.').unwrap_or(host);

        if let Ok(addr) = host.parse::<IpAddr>() {
            return self.subject_ip_addrs.contains(&addr);
        }

        if self.subject_dns_names.is_empty() {
            self.common_name()
                .is_some_and(|cn| hostname_matches_pattern(host, cn))
        } else {
            self.subject_dns_names
                .iter()
                .any(|pattern| hostname_matches_pattern(host, pattern))
        }
    }
}

fn hostname_matches_pattern(host: &str, pattern: &str) -> bool {
    let pattern: &str = pattern.strip_suffix('.').unwrap_or(pattern);

    match pattern.strip_prefix("*.") {
        Some(suffix) => {
            let Some(split) = host.len().checked_sub(suffix.len() + 1) else {
                return false;
            };
            let (label, rest) = host.split_at_checked(split).unwrap_or(("", ""));
            !label.is_empty()
                && !label.contains('.')
                && rest.len() == suffix.len() + 1
                && rest.starts_with('.')
                && rest[1..].eq_ignore_ascii_case(suffix)
        }
        None => host.eq_ignore_ascii_case(pattern),
    }
}

#[cfg(test)]
mod tests {
    use super::hostname_matches_pattern;

    #[test]
    fn wildcard() {
        assert!(hostname_matches_pattern("rdp.example.net", "*.example.net"));
        assert!(hostname_matches_pattern("RDP.Example.NET", "*.example.net"));
        assert!(!hostname_matches_pattern("example.net", "*.example.net"));
        assert!(!hostname_matches_pattern("a.b.example.net", "*.example.net"));
        assert!(!hostname_matches_pattern(".example.net", "*.example.net"));
        assert!(!hostname_matches_pattern("rdpexample.net", "*.example.net"));
    }

    #[test]
    fn exact() {
        assert!(hostname_matches_pattern("host.test", "HOST.test."));
        assert!(!hostname_matches_pattern("host.test", "other.test"));
    }
}
