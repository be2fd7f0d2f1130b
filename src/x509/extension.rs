use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::{Context as _, oid, oid::ObjectIdentifier, optional};
use crate::{
    ByteCursor, Result,
    asn1::{Class, Dialect},
};

/// # References
///
/// - [RFC 5280 Section 4.2.1.6](https://datatracker.ietf.org/doc/html/rfc5280#section-4.2.1.6)
///
/// ```text
/// GeneralName ::= CHOICE {
///     otherName                       [0]     OtherName,
///     rfc822Name                      [1]     IA5String,
///     dNSName                         [2]     IA5String,
///     x400Address                     [3]     ORAddress,
///     directoryName                   [4]     Name,
///     ediPartyName                    [5]     EDIPartyName,
///     uniformResourceIdentifier       [6]     IA5String,
///     iPAddress                       [7]     OCTET STRING,
///     registeredID                    [8]     OBJECT IDENTIFIER }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GeneralName {
    Rfc822Name(String),
    DnsName(String),
    IpAddr(IpAddr),
    /// Choices this crate has no use for, by context tag number.
    Other(u32),
}

fn ia5_string(name: &str, content: &[u8]) -> Option<String> {
    if !content.is_ascii() {
        log::error!("{name} is not a valid IA5String (ASCII)");
        return None;
    }
    Some(content.iter().copied().map(char::from).collect())
}

impl GeneralName {
    fn deser(name: &str, cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let (header, content) = Dialect::Ber.read_any(cursor).context(name)?;

        if header.class != Class::ContextSpecific {
            log::error!(
                "{name} expected identifier class {:?} got {:?}",
                Class::ContextSpecific,
                header.class
            );
            return None.context(name);
        }

        let ret: Self = match header.tag_number {
            1 => Self::Rfc822Name(
                ia5_string(&format!("{name}.rfc822Name"), content).context(name)?,
            ),
            2 => Self::DnsName(ia5_string(&format!("{name}.dNSName"), content).context(name)?),
            7 => match content.len() {
                4 => {
                    let mut octets: [u8; 4] = [0; 4];
                    octets.copy_from_slice(content);
                    Self::IpAddr(IpAddr::V4(Ipv4Addr::from(octets)))
                }
                16 => {
                    let mut octets: [u8; 16] = [0; 16];
                    octets.copy_from_slice(content);
                    Self::IpAddr(IpAddr::V6(Ipv6Addr::from(octets)))
                }
                len => {
                    log::error!(
                        "{name} contains an unrecognized IP address length {len} expected 4 for IPv4 or 16 for IPv6"
                    );
                    return None.context(name);
                }
            },
            other => {
                log::debug!("{name} ignoring GeneralName type [{other}]");
                Self::Other(other)
            }
        };

        if header.constructed && matches!(header.tag_number, 1 | 2 | 7) {
            // seen in the wild, harmless for primitive content
            log::warn!("{name} has the constructed bit set on a primitive GeneralName");
        }

        Ok(ret)
    }
}

/// # References
///
/// - [RFC 5280 Section 4.2.1.6](https://datatracker.ietf.org/doc/html/rfc5280#section-4.2.1.6)
///
/// ```text
/// SubjectAltName ::= GeneralNames
///
/// GeneralNames ::= SEQUENCE SIZE (1..MAX) OF GeneralName
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SubjectAltName {
    names: Vec<GeneralName>,
}

impl SubjectAltName {
    fn deser(name: &str, extn_value: &[u8]) -> Result<Self> {
        let mut cursor: ByteCursor = ByteCursor::new(extn_value);
        let seq_name: String = format!("{name}.GeneralNames");
        let mut seq: ByteCursor = Dialect::Ber.read_sequence(&mut cursor).context(&seq_name)?;

        let mut names: Vec<GeneralName> = Vec::new();
        while !seq.is_empty() {
            let name_name: String = format!("{seq_name}[{}]", names.len());
            names.push(GeneralName::deser(&name_name, &mut seq)?);
        }

        if !cursor.is_empty() {
            log::error!("{name} contains {} bytes of extra data", cursor.remaining());
            return None.context(name);
        }

        Ok(Self { names })
    }

    pub(crate) fn dns_names(&self) -> Vec<String> {
        self.names
            .iter()
            .filter_map(|general_name| match general_name {
                GeneralName::DnsName(dns_name) => Some(dns_name.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn first_email(&self) -> Option<String> {
        self.names.iter().find_map(|general_name| match general_name {
            GeneralName::Rfc822Name(email) => Some(email.clone()),
            _ => None,
        })
    }

    pub(crate) fn ip_addrs(&self) -> Vec<IpAddr> {
        self.names
            .iter()
            .filter_map(|general_name| match general_name {
                GeneralName::IpAddr(addr) => Some(*addr),
                _ => None,
            })
            .collect()
    }
}

/// # References
///
/// - [RFC 5280 Section 4.2](https://datatracker.ietf.org/doc/html/rfc5280#section-4.2)
///
/// ```text
/// Extensions  ::=  SEQUENCE SIZE (1..MAX) OF Extension
///
/// Extension  ::=  SEQUENCE  {
///      extnID      OBJECT IDENTIFIER,
///      critical    BOOLEAN DEFAULT FALSE,
///      extnValue   OCTET STRING }
/// ```
#[derive(Debug, Clone, Default)]
pub(crate) struct Extensions {
    pub(crate) subject_alt_name: Option<SubjectAltName>,
}

impl Extensions {
    pub(crate) fn deser(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        const NAME: &str = "Certificate.tbsCertificate.extensions";

        let mut seq: ByteCursor = Dialect::Ber.read_sequence(cursor).context(NAME)?;

        let mut subject_alt_name: Option<SubjectAltName> = None;
        let mut n: usize = 0;

        while !seq.is_empty() {
            let ext_name: String = format!("{NAME}[{n}]");
            let mut ext: ByteCursor = Dialect::Ber.read_sequence(&mut seq).context(&ext_name)?;

            let extn_id: ObjectIdentifier =
                ObjectIdentifier::deser(&format!("{ext_name}.extnID"), &mut ext)?;

            let critical: bool = optional(&mut ext, |c| Dialect::Ber.read_boolean(c))
                .context(&format!("{ext_name}.critical"))?
                .unwrap_or(false);

            let extn_value_name: String = format!("{ext_name}.extnValue");
            let extn_value: &[u8] = Dialect::Ber
                .read_octet_string(&mut ext)
                .context(&extn_value_name)?;

            if !ext.is_empty() {
                log::error!("{ext_name} contains {} bytes of extra data", ext.remaining());
                return None.context(&ext_name);
            }

            match extn_id.as_str() {
                oid::SUBJECT_ALT_NAME => {
                    if subject_alt_name
                        .replace(SubjectAltName::deser(&extn_value_name, extn_value)?)
                        .is_some()
                    {
                        log::error!("{ext_name} is a duplicate SubjectAltName extension");
                        return None.context(&ext_name);
                    }
                }
                unrecognized_oid => {
                    if critical {
                        log::warn!(
                            "{ext_name} unrecognized OID {unrecognized_oid} with critical bit set ignored"
                        );
                    } else {
                        log::debug!("{ext_name} unrecognized OID {unrecognized_oid} ignored");
                    }
                }
            }

            n = n.saturating_add(1);
        }

        if n == 0 {
            log::error!("{NAME} must contain at least one extension");
            return None.context(NAME);
        }

        Ok(Self { subject_alt_name })
    }
}

#[cfg(test)]
mod tests {
    use super::{GeneralName, SubjectAltName};
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn general_names() {
        // SEQUENCE { [2] "a.test", [7] 10.0.0.1, [6] "u", [1] "x@y" }
        let der = [
            0x30, 0x16, 0x82, 0x06, b'a', b'.', b't', b'e', b's', b't', 0x87, 0x04, 10, 0, 0, 1,
            0x86, 0x01, b'u', 0x81, 0x03, b'x', b'@', b'y',
        ];
        let san = SubjectAltName::deser("san", &der).unwrap();
        assert_eq!(
            san.names,
            [
                GeneralName::DnsName("a.test".into()),
                GeneralName::IpAddr(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))),
                GeneralName::Other(6),
                GeneralName::Rfc822Name("x@y".into()),
            ]
        );
        assert_eq!(san.dns_names(), ["a.test"]);
        assert_eq!(san.first_email().as_deref(), Some("x@y"));
    }

    #[test]
    fn bad_ip_length() {
        let der = [0x30, 0x05, 0x87, 0x03, 1, 2, 3];
        assert!(SubjectAltName::deser("san", &der).is_err());
    }

    #[test]
    fn trailing_data() {
        let der = [0x30, 0x00, 0x00];
        assert!(SubjectAltName::deser("san", &der).is_err());
    }
}
