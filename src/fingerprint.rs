use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// SHA-256 over the DER encoding of a certificate.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; Fingerprint::LEN]);

impl Fingerprint {
    pub const LEN: usize = 32;

    pub fn of(der: &[u8]) -> Self {
        Self(Sha256::digest(der).into())
    }

    pub const fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Lowercase hex without separators, the persisted form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses hex digits with or without `:` separators.
    pub fn from_hex(text: &str) -> Result<Self> {
        let digits: String = text.chars().filter(|&ch| ch != ':').collect();
        let mut bytes: [u8; Self::LEN] = [0; Self::LEN];
        hex::decode_to_slice(&digits, &mut bytes).map_err(|e| {
            log::error!("Invalid fingerprint {text:?}: {e}");
            Error::InvalidEncoding
        })?;
        Ok(Self(bytes))
    }
}

impl FromStr for Fingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, byte) in self.0.iter().enumerate() {
            if idx != 0 {
                f.write_str(":")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}
