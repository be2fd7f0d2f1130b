//! Fixed-capacity unsigned integers with Montgomery multiplication.
//!
//! Sized for moduli up to [`MAX_MODULUS_LEN`] bytes. Limbs are little-endian
//! `u32` words so every partial product fits in a `u64`.
//!
//! # References
//!
//! - [Analyzing and Comparing Montgomery Multiplication Algorithms](https://www.microsoft.com/en-us/research/wp-content/uploads/1996/01/j37acmon.pdf)
//!   (Koç, Acar, Kaliski), the CIOS method

use std::fmt;

use crate::{Error, Result};

/// Largest supported modulus in bytes (4096 bits).
pub const MAX_MODULUS_LEN: usize = 512;

const LIMB_BYTES: usize = size_of::<u32>();
const LIMBS: usize = MAX_MODULUS_LEN / LIMB_BYTES;

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct Uint {
    limbs: [u32; LIMBS],
}

impl fmt::Debug for Uint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uint({})", hex::encode(self.to_be_bytes(MAX_MODULUS_LEN)))
    }
}

impl Uint {
    pub(crate) const ZERO: Self = Self { limbs: [0; LIMBS] };

    fn one() -> Self {
        let mut one: Self = Self::ZERO;
        one.limbs[0] = 1;
        one
    }

    /// `None` if the value needs more than [`MAX_MODULUS_LEN`] bytes.
    pub(crate) fn from_be_bytes(bytes: &[u8]) -> Option<Self> {
        let bytes: &[u8] = crate::asn1::strip_leading_zeros(bytes);
        if bytes.len() > MAX_MODULUS_LEN {
            return None;
        }

        let mut out: Self = Self::ZERO;
        for (idx, &byte) in bytes.iter().rev().enumerate() {
            out.limbs[idx / LIMB_BYTES] |= u32::from(byte) << (8 * (idx % LIMB_BYTES));
        }
        Some(out)
    }

    /// The low `len` bytes, most significant first.
    pub(crate) fn to_be_bytes(&self, len: usize) -> Vec<u8> {
        let mut out: Vec<u8> = vec![0; len];
        for (idx, byte) in out.iter_mut().rev().enumerate().take(MAX_MODULUS_LEN) {
            *byte = (self.limbs[idx / LIMB_BYTES] >> (8 * (idx % LIMB_BYTES))) as u8;
        }
        out
    }

    pub(crate) fn is_zero(&self) -> bool {
        self.limbs.iter().all(|&limb| limb == 0)
    }

    /// `self - other` over the low `len` limbs, with the final borrow.
    fn sub(&self, other: &Self, len: usize) -> (Self, u32) {
        let mut out: Self = Self::ZERO;
        let mut borrow: u64 = 0;
        for idx in 0..len {
            let diff: u64 = u64::from(self.limbs[idx])
                .wrapping_sub(u64::from(other.limbs[idx]))
                .wrapping_sub(borrow);
            out.limbs[idx] = diff as u32;
            borrow = diff >> 63;
        }
        (out, borrow as u32)
    }

    /// Picks `a` where `mask` is all ones and `b` where it is zero, without
    /// branching on the mask.
    fn select(mask: u32, a: &Self, b: &Self) -> Self {
        let mut out: Self = Self::ZERO;
        for ((o, &x), &y) in out.limbs.iter_mut().zip(&a.limbs).zip(&b.limbs) {
            *o = (x & mask) | (y & !mask);
        }
        out
    }

    /// Reduces `value + top * 2^(32 * len)`, known to be below `2n`, into
    /// `[0, n)`.
    fn reduce_once(value: &Self, top: u32, n: &Self, len: usize) -> Self {
        let (diff, borrow) = value.sub(n, len);
        // keep `value` only when the subtraction underflowed past `top`
        let keep: u32 = (u64::from(top).wrapping_sub(u64::from(borrow)) >> 63) as u32;
        Self::select(keep.wrapping_neg(), value, &diff)
    }
}

/// Montgomery arithmetic modulo an odd `n`.
#[derive(Debug, Clone)]
pub(crate) struct Montgomery {
    n: Uint,
    /// `-n^-1 mod 2^32`
    n0_inv: u32,
    /// Active limbs of `n`.
    len: usize,
    /// `R^2 mod n` with `R = 2^(32 * len)`.
    r2: Uint,
}

impl Montgomery {
    pub(crate) fn new(modulus: &[u8]) -> Result<Self> {
        let Some(n) = Uint::from_be_bytes(modulus) else {
            log::error!(
                "modulus of {} bytes exceeds the {MAX_MODULUS_LEN} byte limit",
                crate::asn1::strip_leading_zeros(modulus).len()
            );
            return Err(Error::InvalidKey);
        };

        if n.limbs[0] & 1 == 0 {
            log::error!("modulus is even or zero");
            return Err(Error::InvalidKey);
        }
        if n == Uint::one() {
            log::error!("modulus is one");
            return Err(Error::InvalidKey);
        }

        let len: usize = crate::asn1::strip_leading_zeros(modulus)
            .len()
            .div_ceil(LIMB_BYTES);

        // Newton iteration doubles the correct low bits each round
        let n0: u32 = n.limbs[0];
        let mut inv: u32 = 1;
        for _ in 0..5 {
            inv = inv.wrapping_mul(2u32.wrapping_sub(n0.wrapping_mul(inv)));
        }

        let mut ctx: Self = Self {
            n,
            n0_inv: inv.wrapping_neg(),
            len,
            r2: Uint::ZERO,
        };

        // 2^(64 * len) mod n by doubling from 1
        let mut r2: Uint = Uint::one();
        for _ in 0..(64 * len) {
            r2 = ctx.double(&r2);
        }
        ctx.r2 = r2;

        Ok(ctx)
    }

    /// `true` if `value < n`.
    pub(crate) fn is_reduced(&self, value: &Uint) -> bool {
        value.limbs[self.len..].iter().all(|&limb| limb == 0) && value.sub(&self.n, self.len).1 == 1
    }

    /// `2 * a mod n` for `a < n`.
    fn double(&self, a: &Uint) -> Uint {
        let mut out: Uint = Uint::ZERO;
        let mut carry: u32 = 0;
        for idx in 0..self.len {
            out.limbs[idx] = (a.limbs[idx] << 1) | carry;
            carry = a.limbs[idx] >> 31;
        }
        Uint::reduce_once(&out, carry, &self.n, self.len)
    }

    /// `a * b * R^-1 mod n` for `a, b < n`.
    fn mul(&self, a: &Uint, b: &Uint) -> Uint {
        let len: usize = self.len;
        let n: &[u32; LIMBS] = &self.n.limbs;
        let mut t: [u32; LIMBS + 2] = [0; LIMBS + 2];

        for i in 0..len {
            let bi: u64 = u64::from(b.limbs[i]);

            let mut carry: u64 = 0;
            for j in 0..len {
                let s: u64 = u64::from(t[j]) + u64::from(a.limbs[j]) * bi + carry;
                t[j] = s as u32;
                carry = s >> 32;
            }
            let s: u64 = u64::from(t[len]) + carry;
            t[len] = s as u32;
            t[len + 1] = (s >> 32) as u32;

            let m: u64 = u64::from(t[0].wrapping_mul(self.n0_inv));
            let s: u64 = u64::from(t[0]) + m * u64::from(n[0]);
            let mut carry: u64 = s >> 32;
            for j in 1..len {
                let s: u64 = u64::from(t[j]) + m * u64::from(n[j]) + carry;
                t[j - 1] = s as u32;
                carry = s >> 32;
            }
            let s: u64 = u64::from(t[len]) + carry;
            t[len - 1] = s as u32;
            t[len] = t[len + 1] + (s >> 32) as u32;
            t[len + 1] = 0;
        }

        let mut out: Uint = Uint::ZERO;
        out.limbs[..len].copy_from_slice(&t[..len]);
        Uint::reduce_once(&out, t[len], &self.n, len)
    }

    /// `base^exponent mod n` for `base < n`.
    ///
    /// Every exponent bit costs one squaring and one multiplication; the
    /// product is kept or dropped with a masked select.
    pub(crate) fn pow(&self, base: &Uint, exponent: &[u8]) -> Uint {
        let base_m: Uint = self.mul(base, &self.r2);
        let mut acc: Uint = self.mul(&Uint::one(), &self.r2);

        for &byte in exponent {
            for shift in (0..8).rev() {
                acc = self.mul(&acc, &acc);
                let product: Uint = self.mul(&acc, &base_m);
                let bit: u32 = u32::from((byte >> shift) & 1);
                acc = Uint::select(bit.wrapping_neg(), &product, &acc);
            }
        }

        self.mul(&acc, &Uint::one())
    }
}
