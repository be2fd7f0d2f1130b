//! Standard RDP Security key exchange.
//!
//! Before TLS was available RDP protected the client random with the
//! server's RSA key, taken from the server certificate carried in the
//! Server Security Data block. All integers on this path are little-endian.
//!
//! # References
//!
//! - [MS-RDPBCGR 2.2.1.4.3](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-rdpbcgr/54e72cc6-3422-404c-a6b4-2486db125342) Server Security Data
//! - [MS-RDPBCGR 2.2.1.10](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-rdpbcgr/9cde84cd-5055-475a-ac8b-704db419b66f) Client Security Exchange PDU
//! - [MS-RDPBCGR 5.3.4](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-rdpbcgr/3ff81b3e-2f4a-4b87-8e1c-6e8ef1a3ef6f) Client and Server Random Values

mod bignum;
mod rsa;

use std::fmt;

use rand::{CryptoRng, RngCore, rngs::OsRng};

use crate::{ByteCursor, Certificate, Error, Result, RsaPublicKey, x509::Context as _};

pub use bignum::MAX_MODULUS_LEN;

/// Length of the client random.
pub const CLIENT_RANDOM_LEN: usize = 32;
/// Zero bytes appended to the encrypted client random.
pub const LEGACY_PADDING_LEN: usize = 8;

const CERT_CHAIN_VERSION_MASK: u32 = 0x7FFF_FFFF;
const CERT_CHAIN_TEMPORARY: u32 = 0x8000_0000;
const CERT_CHAIN_VERSION_1: u32 = 1;
const CERT_CHAIN_VERSION_2: u32 = 2;

const SIGNATURE_ALG_RSA: u32 = 1;
const KEY_EXCHANGE_ALG_RSA: u32 = 1;
const BB_RSA_KEY_BLOB: u16 = 0x0006;
const BB_RSA_SIGNATURE_BLOB: u16 = 0x0008;
const RSA_SIGNATURE_LEN: usize = 72;
const RSA1_MAGIC: [u8; 4] = *b"RSA1";

const MAX_CERT_BLOBS: u32 = 72;

/// The server certificate from the Server Security Data block.
#[derive(Debug, Clone)]
pub enum ServerCertificate {
    /// Proprietary certificate signed with the Terminal Services key.
    /// The signature is not checked.
    Proprietary {
        public_key: RsaPublicKey,
        temporary: bool,
    },
    /// X.509 chain; the last certificate belongs to the server.
    X509 {
        leaf: Box<Certificate>,
        chain: Vec<Vec<u8>>,
        temporary: bool,
    },
}

/// # References
///
/// - [MS-RDPBCGR 2.2.1.4.3.1.1.1](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-rdpbcgr/fe93545c-772a-4ade-9d02-ad1e0d81b6af) RSA Public Key
///
/// ```text
/// magic (4) | keylen (4) | bitlen (4) | datalen (4) | pubExp (4) | modulus (keylen)
/// ```
///
/// `keylen` includes 8 bytes of zero padding after the modulus.
fn rsa1_public_key(blob: &[u8]) -> Result<RsaPublicKey> {
    const NAME: &str = "ServerCertificate.PublicKeyBlob";

    let mut c: ByteCursor = ByteCursor::new(blob);

    let magic: [u8; 4] = c.read_array().context(NAME)?;
    if magic != RSA1_MAGIC {
        log::error!("{NAME}.magic {magic:02X?} is not RSA1");
        return None.context(NAME);
    }

    let keylen: usize = c.read_u32_le().context(NAME)? as usize;
    let bitlen: u32 = c.read_u32_le().context(NAME)?;
    let datalen: u32 = c.read_u32_le().context(NAME)?;
    let pub_exp: [u8; 4] = c.read_array().context(NAME)?;

    if keylen < LEGACY_PADDING_LEN || keylen != c.remaining() {
        log::error!(
            "{NAME}.keylen {keylen} is inconsistent with the {} remaining bytes",
            c.remaining()
        );
        return None.context(NAME);
    }

    let modulus_len: usize = keylen - LEGACY_PADDING_LEN;
    let mut modulus: Vec<u8> = c.read(modulus_len).context(NAME)?.to_vec();
    let padding: &[u8] = c.read(LEGACY_PADDING_LEN).context(NAME)?;

    if padding.iter().any(|&b| b != 0) {
        log::warn!("{NAME}.modulus padding is not zero");
    }
    if bitlen as usize / 8 != modulus_len || datalen as usize + 1 != modulus_len {
        log::warn!("{NAME} bitlen {bitlen} datalen {datalen} disagree with keylen {keylen}");
    }

    modulus.reverse();
    let exponent: [u8; 4] = u32::from_le_bytes(pub_exp).to_be_bytes();

    Ok(RsaPublicKey::new(&modulus, &exponent))
}

impl ServerCertificate {
    /// Decodes the `serverCertificate` field.
    ///
    /// Bytes after the certificate are ignored.
    pub fn parse(blob: &[u8]) -> Result<Self> {
        let mut c: ByteCursor = ByteCursor::new(blob);

        let dw_version: u32 = c.read_u32_le().context("ServerCertificate.dwVersion")?;
        let temporary: bool = dw_version & CERT_CHAIN_TEMPORARY != 0;

        let certificate: Self = match dw_version & CERT_CHAIN_VERSION_MASK {
            CERT_CHAIN_VERSION_1 => Self::proprietary(&mut c, temporary)?,
            CERT_CHAIN_VERSION_2 => Self::x509_chain(&mut c, temporary)?,
            version => {
                log::error!(
                    "ServerCertificate.dwVersion invalid certificate chain version {version}"
                );
                return Err(Error::MalformedCertificate);
            }
        };

        if !c.is_empty() {
            log::debug!("ServerCertificate has {} trailing bytes", c.remaining());
        }

        Ok(certificate)
    }

    /// # References
    ///
    /// - [MS-RDPBCGR 2.2.1.4.3.1.1](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-rdpbcgr/a37d449a-73ac-4f00-9b9d-56cefc954634) Server Proprietary Certificate
    fn proprietary(c: &mut ByteCursor<'_>, temporary: bool) -> Result<Self> {
        const NAME: &str = "ServerCertificate.PROPRIETARYSERVERCERTIFICATE";

        let sig_alg: u32 = c.read_u32_le().context(NAME)?;
        let key_alg: u32 = c.read_u32_le().context(NAME)?;
        if sig_alg != SIGNATURE_ALG_RSA || key_alg != KEY_EXCHANGE_ALG_RSA {
            log::error!("{NAME} dwSigAlgId {sig_alg} dwKeyAlgId {key_alg} are not RSA");
            return None.context(NAME);
        }

        let blob_type: u16 = c.read_u16_le().context(NAME)?;
        if blob_type != BB_RSA_KEY_BLOB {
            log::error!("{NAME}.wPublicKeyBlobType 0x{blob_type:04X} is not BB_RSA_KEY_BLOB");
            return None.context(NAME);
        }
        let blob_len: u16 = c.read_u16_le().context(NAME)?;
        let public_key: RsaPublicKey =
            rsa1_public_key(c.read(usize::from(blob_len)).context(NAME)?)?;

        let sig_type: u16 = c.read_u16_le().context(NAME)?;
        if sig_type != BB_RSA_SIGNATURE_BLOB {
            log::error!("{NAME}.wSignatureBlobType 0x{sig_type:04X} is not BB_RSA_SIGNATURE_BLOB");
            return None.context(NAME);
        }
        let sig_len: u16 = c.read_u16_le().context(NAME)?;
        if usize::from(sig_len) != RSA_SIGNATURE_LEN {
            log::error!("{NAME}.wSignatureBlobLen {sig_len} expected {RSA_SIGNATURE_LEN}");
            return None.context(NAME);
        }
        c.skip(RSA_SIGNATURE_LEN).context(NAME)?;

        log::debug!(
            "proprietary server certificate with a {} bit key",
            public_key.modulus_len() * 8
        );

        Ok(Self::Proprietary {
            public_key,
            temporary,
        })
    }

    /// # References
    ///
    /// - [MS-RDPELE 2.2.1.4.2](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-rdpele/bf2cc9cc-2b01-442e-a288-6ddfa3b80d59) X.509 Certificate Chain
    fn x509_chain(c: &mut ByteCursor<'_>, temporary: bool) -> Result<Self> {
        const NAME: &str = "ServerCertificate.X509CertificateChain";

        let num_cert_blobs: u32 = c.read_u32_le().context(NAME)?;
        if !(2..=MAX_CERT_BLOBS).contains(&num_cert_blobs) {
            log::error!("{NAME}.NumCertBlobs {num_cert_blobs} is outside 2..={MAX_CERT_BLOBS}");
            return None.context(NAME);
        }

        let mut chain: Vec<Vec<u8>> = Vec::with_capacity(num_cert_blobs as usize);
        for idx in 0..num_cert_blobs {
            let blob_name: String = format!("{NAME}.CertBlobArray[{idx}]");
            let len: usize = c.read_u32_le().context(&blob_name)? as usize;
            chain.push(c.read(len).context(&blob_name)?.to_vec());
        }

        let Some(leaf_der) = chain.last() else {
            return None.context(NAME);
        };
        let leaf: Certificate = Certificate::from_der(leaf_der)?;

        Ok(Self::X509 {
            leaf: Box::new(leaf),
            chain,
            temporary,
        })
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        match self {
            Self::Proprietary { public_key, .. } => public_key,
            Self::X509 { leaf, .. } => leaf.public_key(),
        }
    }

    /// The server's X.509 certificate, if it sent a chain.
    pub fn certificate(&self) -> Option<&Certificate> {
        match self {
            Self::Proprietary { .. } => None,
            Self::X509 { leaf, .. } => Some(leaf),
        }
    }

    /// Whether the server flagged the certificate as temporary.
    pub fn is_temporary(&self) -> bool {
        match self {
            Self::Proprietary { temporary, .. } | Self::X509 { temporary, .. } => *temporary,
        }
    }
}

/// Server half of the key pair, for answering a [`SecurityExchange`].
#[derive(Clone)]
pub struct RsaPrivateKey {
    modulus: Vec<u8>,
    private_exponent: Vec<u8>,
}

impl fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("bits", &(self.modulus.len() * 8))
            .finish_non_exhaustive()
    }
}

impl RsaPrivateKey {
    /// Big-endian modulus and private exponent.
    pub fn new(modulus: &[u8], private_exponent: &[u8]) -> Self {
        Self {
            modulus: crate::asn1::strip_leading_zeros(modulus).to_vec(),
            private_exponent: crate::asn1::strip_leading_zeros(private_exponent).to_vec(),
        }
    }
}

/// Client Security Exchange PDU payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityExchange {
    /// Little-endian ciphertext followed by the zero padding.
    encrypted_client_random: Vec<u8>,
}

impl SecurityExchange {
    /// Generates a client random and encrypts it to `key`.
    ///
    /// The client random is returned for deriving the session keys.
    pub fn new<R: RngCore + CryptoRng>(
        key: &RsaPublicKey,
        rng: &mut R,
    ) -> Result<([u8; CLIENT_RANDOM_LEN], Self)> {
        let mut client_random: [u8; CLIENT_RANDOM_LEN] = [0; CLIENT_RANDOM_LEN];
        rng.fill_bytes(&mut client_random);
        let exchange: Self = Self::with_client_random(key, &client_random)?;
        Ok((client_random, exchange))
    }

    /// [`SecurityExchange::new`] with the operating system RNG.
    pub fn generate(key: &RsaPublicKey) -> Result<([u8; CLIENT_RANDOM_LEN], Self)> {
        Self::new(key, &mut OsRng)
    }

    pub fn with_client_random(
        key: &RsaPublicKey,
        client_random: &[u8; CLIENT_RANDOM_LEN],
    ) -> Result<Self> {
        // little-endian on the wire, big-endian for the arithmetic
        let mut plaintext: [u8; CLIENT_RANDOM_LEN] = *client_random;
        plaintext.reverse();

        let mut encrypted_client_random: Vec<u8> =
            rsa::encrypt(&plaintext, key.modulus(), key.exponent())?;
        encrypted_client_random.reverse();
        encrypted_client_random.resize(encrypted_client_random.len() + LEGACY_PADDING_LEN, 0);

        Ok(Self {
            encrypted_client_random,
        })
    }

    /// Encrypted client random including the trailing padding.
    pub fn encrypted_client_random(&self) -> &[u8] {
        &self.encrypted_client_random
    }

    /// `length (u32 LE) | encryptedClientRandom`
    pub fn ser(&self) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::with_capacity(4 + self.encrypted_client_random.len());
        // bounded by MAX_MODULUS_LEN + LEGACY_PADDING_LEN
        out.extend_from_slice(&(self.encrypted_client_random.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.encrypted_client_random);
        out
    }

    pub fn deser(payload: &[u8]) -> Result<Self> {
        let mut c: ByteCursor = ByteCursor::new(payload);
        let len: usize = c.read_u32_le()? as usize;

        if len > MAX_MODULUS_LEN + LEGACY_PADDING_LEN {
            log::error!("SecurityExchange length {len} exceeds the maximum key size");
            return Err(Error::InvalidLength);
        }

        let encrypted_client_random: Vec<u8> = c.read(len)?.to_vec();
        Ok(Self {
            encrypted_client_random,
        })
    }

    /// Server side: recovers the client random with the private key.
    pub fn decrypt_client_random(&self, key: &RsaPrivateKey) -> Result<[u8; CLIENT_RANDOM_LEN]> {
        let modulus_len: usize = key.modulus.len();

        let Some(ciphertext) = self.encrypted_client_random.get(..modulus_len) else {
            log::error!(
                "encrypted client random of {} bytes is shorter than the {modulus_len} byte modulus",
                self.encrypted_client_random.len()
            );
            return Err(Error::InvalidInputLength);
        };

        let mut ciphertext: Vec<u8> = ciphertext.to_vec();
        ciphertext.reverse();

        let mut plaintext: Vec<u8> =
            rsa::decrypt(&ciphertext, &key.modulus, &key.private_exponent)?;
        plaintext.reverse();

        let (client_random, rest) = plaintext
            .split_first_chunk::<CLIENT_RANDOM_LEN>()
            .ok_or(Error::InvalidInputLength)?;
        if rest.iter().any(|&b| b != 0) {
            log::error!("decrypted client random is wider than {CLIENT_RANDOM_LEN} bytes");
            return Err(Error::InvalidInputLength);
        }

        Ok(*client_random)
    }
}
