//! Raw RSA over big-endian byte strings.
//!
//! No padding scheme is applied; the legacy exchange encrypts the bare client
//! random. Only [`super::SecurityExchange`] calls into this module.

use super::bignum::{Montgomery, Uint};
use crate::{Error, Result, asn1::strip_leading_zeros};

/// Significant octets of `exponent`, which must be non-zero and no wider
/// than the modulus.
fn check_exponent(exponent: &[u8], modulus_len: usize) -> Result<&[u8]> {
    let exponent: &[u8] = strip_leading_zeros(exponent);
    if exponent.is_empty() {
        log::error!("RSA exponent is zero");
        return Err(Error::InvalidKey);
    }
    if exponent.len() > modulus_len {
        log::error!(
            "RSA exponent of {} bytes is wider than the {modulus_len} byte modulus",
            exponent.len()
        );
        return Err(Error::InvalidKey);
    }
    Ok(exponent)
}

/// `plaintext^exponent mod modulus`, zero-padded to the modulus length.
///
/// The plaintext must be at least one byte shorter than the modulus so that
/// its value is always below it.
pub(crate) fn encrypt(plaintext: &[u8], modulus: &[u8], exponent: &[u8]) -> Result<Vec<u8>> {
    let ctx: Montgomery = Montgomery::new(modulus)?;
    let modulus_len: usize = strip_leading_zeros(modulus).len();
    let exponent: &[u8] = check_exponent(exponent, modulus_len)?;

    if plaintext.len() > modulus_len - 1 {
        log::error!(
            "plaintext of {} bytes does not fit a {modulus_len} byte modulus",
            plaintext.len()
        );
        return Err(Error::InvalidInputLength);
    }

    let message: Uint = Uint::from_be_bytes(plaintext).ok_or(Error::InvalidInputLength)?;
    Ok(ctx.pow(&message, exponent).to_be_bytes(modulus_len))
}

/// `ciphertext^exponent mod modulus`, zero-padded to the modulus length.
///
/// The ciphertext value must be below the modulus.
pub(crate) fn decrypt(ciphertext: &[u8], modulus: &[u8], exponent: &[u8]) -> Result<Vec<u8>> {
    let ctx: Montgomery = Montgomery::new(modulus)?;
    let modulus_len: usize = strip_leading_zeros(modulus).len();
    let exponent: &[u8] = check_exponent(exponent, modulus_len)?;

    let cipher: Option<Uint> = Uint::from_be_bytes(ciphertext);
    let Some(cipher) = cipher.filter(|cipher| ctx.is_reduced(cipher)) else {
        log::error!("ciphertext is not below the modulus");
        return Err(Error::InvalidInputLength);
    };

    Ok(ctx.pow(&cipher, exponent).to_be_bytes(modulus_len))
}
