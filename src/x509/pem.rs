//! PEM armour detection and decoding.
//!
//! # References
//!
//! - [RFC 7468](https://datatracker.ietf.org/doc/html/rfc7468)

use crate::{Error, Result, encoding::Base64Codec};

const BEGIN: &[u8] = b"-----BEGIN CERTIFICATE-----";
const END: &[u8] = b"-----END CERTIFICATE-----";

/// `true` if the input looks like PEM text rather than DER.
pub(crate) fn is_pem(input: &[u8]) -> bool {
    input.trim_ascii_start().starts_with(b"-----BEGIN ")
}

/// Decodes the first `CERTIFICATE` block.
pub(crate) fn decode(input: &[u8]) -> Result<Vec<u8>> {
    let text: &[u8] = input.trim_ascii_start();

    let Some(text) = text.strip_prefix(BEGIN) else {
        log::error!("PEM input does not start with a CERTIFICATE label");
        return Err(Error::MalformedCertificate);
    };

    let Some(end) = text.windows(END.len()).position(|window| window == END) else {
        log::error!("PEM input is missing the END CERTIFICATE line");
        return Err(Error::MalformedCertificate);
    };

    let trailer: &[u8] = &text[end + END.len()..];
    if !trailer.trim_ascii().is_empty() {
        log::debug!("ignoring {} bytes after the first PEM block", trailer.len());
    }

    let body: Vec<u8> = text[..end]
        .iter()
        .copied()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();

    Base64Codec::new()
        .max_decoded_len(input.len())
        .decode(&body)
        .map_err(|e| {
            log::error!("PEM body is not valid Base64: {e}");
            Error::MalformedCertificate
        })
}
