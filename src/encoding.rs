//! Strict Base64 for authentication tokens and PEM bodies.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::{Error, Result};

/// Default cap on decoded output.
pub const DEFAULT_MAX_DECODED_LEN: usize = 64 * 1024;

/// Base64 codec with a bound on decoded output size.
///
/// Decoding uses the standard alphabet with canonical `=` padding. Whitespace,
/// foreign characters and non-zero trailing bits are all rejected.
///
/// # Example
///
/// ```
/// use rdp_trust::encoding::Base64Codec;
///
/// let codec = Base64Codec::new().max_decoded_len(4);
/// assert_eq!(codec.decode("TlRMTQ==")?, b"NTLM");
/// assert!(codec.decode("TlRMTVNTUA==").is_err());
/// # Ok::<(), rdp_trust::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Base64Codec {
    max_decoded_len: usize,
}

impl Default for Base64Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Base64Codec {
    pub const fn new() -> Self {
        Self {
            max_decoded_len: DEFAULT_MAX_DECODED_LEN,
        }
    }

    /// Set the maximum number of bytes `decode` may produce.
    #[must_use]
    pub const fn max_decoded_len(mut self, max: usize) -> Self {
        self.max_decoded_len = max;
        self
    }

    pub fn encode(&self, bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    pub fn decode(&self, text: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        let text: &[u8] = text.as_ref();

        let decoded_len: usize = decoded_len(text);
        if decoded_len > self.max_decoded_len {
            log::error!(
                "Base64 input of {} characters decodes to {decoded_len} bytes, limit is {}",
                text.len(),
                self.max_decoded_len
            );
            return Err(Error::OutputTooLarge);
        }

        STANDARD.decode(text).map_err(|e| {
            log::error!("Base64 decode failed: {e}");
            Error::InvalidEncoding
        })
    }
}

/// Exact output size for well-formed input, an upper bound otherwise.
fn decoded_len(text: &[u8]) -> usize {
    let groups: usize = text.len().div_ceil(4);
    let padding: usize = if text.len() % 4 == 0 {
        text.iter().rev().take(2).take_while(|&&b| b == b'=').count()
    } else {
        0
    };
    groups * 3 - padding
}

/// Encode with the default codec.
pub fn encode(bytes: &[u8]) -> String {
    Base64Codec::new().encode(bytes)
}

/// Decode with the default codec.
pub fn decode(text: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    Base64Codec::new().decode(text)
}

#[cfg(test)]
mod tests {
    use super::{Base64Codec, decoded_len};
    use crate::Error;

    #[test]
    fn exact_size() {
        assert_eq!(decoded_len(b""), 0);
        assert_eq!(decoded_len(b"QQ=="), 1);
        assert_eq!(decoded_len(b"QUI="), 2);
        assert_eq!(decoded_len(b"QUJD"), 3);
        assert_eq!(decoded_len(b"QUJ"), 3);
    }

    #[test]
    fn limit_is_inclusive() {
        let codec = Base64Codec::new().max_decoded_len(3);
        assert_eq!(codec.decode("QUJD").unwrap(), b"ABC");
        assert!(matches!(codec.decode("QUJDRA=="), Err(Error::OutputTooLarge)));
    }

    #[test]
    fn strict_alphabet() {
        let codec = Base64Codec::new();
        for bad in ["QQ=", "QQ", "QR==", "QU JD", "QUJD\n", "QUJ-", "=QUJ"] {
            assert!(
                matches!(codec.decode(bad), Err(Error::InvalidEncoding)),
                "{bad:?}"
            );
        }
    }
}
