use std::fmt;

/// Errors produced while decoding untrusted input or persisting trust
/// decisions.
#[derive(Debug)]
pub enum Error {
    /// Fewer bytes remain than the read requires.
    Truncated,
    /// The decoded ASN.1 identifier differs from the expected one.
    TagMismatch,
    /// A high-tag-number identifier that the dialect cannot represent.
    InvalidTag,
    /// A declared length exceeds the remaining input or a hard bound.
    InvalidLength,
    /// Structural violation or missing required field in a certificate.
    MalformedCertificate,
    /// RSA modulus or exponent unusable for modular exponentiation.
    InvalidKey,
    /// Input does not fit the RSA modulus.
    InvalidInputLength,
    /// Text is not in the expected encoding.
    InvalidEncoding,
    /// Decoded output would exceed the configured maximum.
    OutputTooLarge,
    /// A trust store entry could not be parsed.
    StoreFormat { line: usize },
    /// A required path or record does not exist.
    NotFound,
    Io(std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Truncated => write!(f, "input truncated"),
            Error::TagMismatch => write!(f, "unexpected ASN.1 tag"),
            Error::InvalidTag => write!(f, "invalid ASN.1 tag number"),
            Error::InvalidLength => write!(f, "invalid length"),
            Error::MalformedCertificate => write!(f, "malformed certificate"),
            Error::InvalidKey => write!(f, "invalid RSA key"),
            Error::InvalidInputLength => write!(f, "input does not fit the RSA modulus"),
            Error::InvalidEncoding => write!(f, "invalid encoding"),
            Error::OutputTooLarge => write!(f, "decoded output exceeds the configured maximum"),
            Error::StoreFormat { line } => write!(f, "malformed trust store entry on line {line}"),
            Error::NotFound => write!(f, "not found"),
            Error::Io(error) => error.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(error) => Some(error),
            _ => None,
        }
    }
}
