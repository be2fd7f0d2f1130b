//! Security negotiation helpers for RDP clients.
//!
//! - [`asn1`]: BER and legacy ER tag/length decoding over a [`ByteCursor`]
//! - [`x509`]: certificate parsing for pinning
//! - [`store`]: trust-on-first-use certificate store
//! - [`legacy`]: Standard RDP Security key exchange
//! - [`encoding`]: bounded strict Base64 for authentication tokens
//!
//! Decoders take untrusted bytes and either return a complete value or an
//! [`Error`]; they never return partial results.

pub mod asn1;
mod cursor;
pub mod encoding;
mod error;
mod fingerprint;
pub mod legacy;
pub mod store;
pub mod x509;

pub use cursor::ByteCursor;
pub use error::{Error, Result};
pub use fingerprint::Fingerprint;
pub use store::{
    CertificateStore, CertificateStoreBuilder, Decision, Mismatch, Trust, TrustRecord,
};
pub use x509::{Certificate, RsaPublicKey};
