use crate::encoding::{self, Base64Codec};
use crate::{Certificate, Error, Fingerprint, Result};

/// Placeholder for an empty optional text field.
const EMPTY_FIELD: &str = "-";

/// One pinned (host, port) entry.
///
/// Persisted as a single line:
///
/// ```text
/// <host> <port> <fingerprint-hex> [<subject-base64> [<issuer-base64>]]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustRecord {
    /// Lowercased host name.
    pub host: String,
    pub port: u16,
    pub fingerprint: Fingerprint,
    /// One-line subject distinguished name.
    pub subject: String,
    /// One-line issuer distinguished name.
    pub issuer: String,
}

/// Lowercases `host` and rejects names that cannot be stored on one line.
pub(crate) fn normalize_host(host: &str) -> Result<String> {
    if host.is_empty() || host.starts_with('#') || host.chars().any(char::is_whitespace) {
        log::error!("host name {host:?} cannot be stored");
        return Err(Error::InvalidEncoding);
    }
    Ok(host.to_ascii_lowercase())
}

fn decode_text(field: &str, line: usize) -> Result<String> {
    if field == EMPTY_FIELD {
        return Ok(String::new());
    }

    // fields are written without a size limit, only their own length bounds the decode
    let bytes: Vec<u8> = Base64Codec::new()
        .max_decoded_len(field.len())
        .decode(field)
        .map_err(|_| Error::StoreFormat { line })?;
    String::from_utf8(bytes).map_err(|e| {
        log::error!("trust store line {line} text field is not UTF-8: {e}");
        Error::StoreFormat { line }
    })
}

fn encode_text(text: &str) -> String {
    if text.is_empty() {
        EMPTY_FIELD.to_string()
    } else {
        encoding::encode(text.as_bytes())
    }
}

impl TrustRecord {
    pub fn new(host: &str, port: u16, certificate: &Certificate) -> Result<Self> {
        Ok(Self {
            host: normalize_host(host)?,
            port,
            fingerprint: *certificate.fingerprint(),
            subject: certificate.subject().to_string(),
            issuer: certificate.issuer().to_string(),
        })
    }

    /// `true` if this record is keyed by the normalized `host` and `port`.
    pub(crate) fn is_for(&self, host: &str, port: u16) -> bool {
        self.port == port && self.host == host
    }

    /// Parses one line of the store. Blank and `#` comment lines yield `None`.
    ///
    /// `line` is the 1-based line number used in errors.
    pub(crate) fn parse_line(text: &str, line: usize) -> Result<Option<Self>> {
        let text: &str = text.trim();
        if text.is_empty() || text.starts_with('#') {
            return Ok(None);
        }

        let mut fields = text.split_ascii_whitespace();

        let (Some(host), Some(port), Some(fingerprint)) =
            (fields.next(), fields.next(), fields.next())
        else {
            log::error!("trust store line {line} has fewer than 3 fields");
            return Err(Error::StoreFormat { line });
        };

        let port: u16 = port.parse().map_err(|e| {
            log::error!("trust store line {line} port {port:?} is invalid: {e}");
            Error::StoreFormat { line }
        })?;

        let fingerprint: Fingerprint =
            Fingerprint::from_hex(fingerprint).map_err(|_| Error::StoreFormat { line })?;

        let subject: String = fields
            .next()
            .map(|field| decode_text(field, line))
            .transpose()?
            .unwrap_or_default();
        let issuer: String = fields
            .next()
            .map(|field| decode_text(field, line))
            .transpose()?
            .unwrap_or_default();

        // fields added by later versions are ignored
        if fields.next().is_some() {
            log::debug!("trust store line {line} has extra fields");
        }

        Ok(Some(Self {
            host: host.to_ascii_lowercase(),
            port,
            fingerprint,
            subject,
            issuer,
        }))
    }

    pub(crate) fn to_line(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.host,
            self.port,
            self.fingerprint.to_hex(),
            encode_text(&self.subject),
            encode_text(&self.issuer)
        )
    }
}
