use std::fmt;

use super::Context as _;
use crate::{ByteCursor, Result, asn1::Dialect};

pub(crate) const RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
pub(crate) const SUBJECT_ALT_NAME: &str = "2.5.29.17";
pub(crate) const COMMON_NAME: &str = "2.5.4.3";

/// Dotted decimal form of an `OBJECT IDENTIFIER`.
///
/// # References
///
/// - X.690 Section 8.19
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct ObjectIdentifier {
    repr: String,
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

impl ObjectIdentifier {
    pub(crate) fn as_str(&self) -> &str {
        &self.repr
    }

    fn decode(name: &str, content: &[u8]) -> Option<Self> {
        if content.is_empty() {
            log::error!("{name} must not be empty");
            return None;
        }

        let mut arcs: Vec<u64> = Vec::new();
        let mut acc: u64 = 0;
        let mut in_progress: bool = false;

        for &byte in content {
            if !in_progress && byte == 0x80 {
                log::error!("{name} has a subidentifier with a leading zero group");
                return None;
            }
            if acc > u64::MAX >> 7 {
                log::error!("{name} has a subidentifier wider than 64 bits");
                return None;
            }
            acc = (acc << 7) | u64::from(byte & 0x7F);
            in_progress = byte & 0x80 != 0;
            if !in_progress {
                arcs.push(acc);
                acc = 0;
            }
        }

        if in_progress {
            log::error!("{name} has an unterminated multi-byte encoding");
            return None;
        }

        // the first subidentifier packs two arcs, X.690 Section 8.19.4
        let first: u64 = arcs[0];
        let (arc0, arc1) = match first {
            0..40 => (0, first),
            40..80 => (1, first - 40),
            _ => (2, first - 80),
        };

        let mut repr: String = format!("{arc0}.{arc1}");
        for arc in &arcs[1..] {
            repr.push('.');
            repr.push_str(&arc.to_string());
        }

        Some(Self { repr })
    }

    pub(crate) fn deser(name: &str, cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let content: &[u8] = Dialect::Ber.read_object_identifier(cursor).context(name)?;
        Self::decode(name, content).context(name)
    }
}
