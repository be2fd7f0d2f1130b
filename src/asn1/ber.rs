//! Basic Encoding Rules, X.690 Section 8.1.

use super::{CONSTRUCTED, Class, ContentLength, TAG_MASK};
use crate::{ByteCursor, Error, Result};

pub(super) fn read_identifier(cursor: &mut ByteCursor<'_>) -> Result<(Class, bool, u32)> {
    let mut c: ByteCursor = *cursor;

    let first: u8 = c.read_u8()?;
    let class: Class = Class::from_identifier(first);
    let constructed: bool = first & CONSTRUCTED != 0;

    let number: u32 = if first & TAG_MASK != TAG_MASK {
        u32::from(first & TAG_MASK)
    } else {
        // X.690 Section 8.1.2.4.2: base-128, most significant group first
        let mut number: u32 = 0;
        let mut groups: usize = 0;
        loop {
            let octet: u8 = c.read_u8()?;
            if groups == 0 && octet == 0x80 {
                log::error!("BER high tag number has a leading zero group");
                return Err(Error::InvalidTag);
            }
            if number > u32::MAX >> 7 {
                log::error!("BER high tag number does not fit in 32 bits");
                return Err(Error::InvalidTag);
            }
            number = (number << 7) | u32::from(octet & 0x7F);
            groups += 1;
            if octet & 0x80 == 0 {
                break;
            }
        }

        if number < u32::from(TAG_MASK) {
            log::error!("BER high tag form used for low tag number {number}");
            return Err(Error::InvalidTag);
        }

        number
    };

    *cursor = c;
    Ok((class, constructed, number))
}

pub(super) fn read_length(cursor: &mut ByteCursor<'_>) -> Result<ContentLength> {
    let mut c: ByteCursor = *cursor;

    let first: u8 = c.read_u8()?;
    let length: ContentLength = match first {
        0x00..=0x7F => ContentLength::Definite(usize::from(first)),
        0x80 => ContentLength::Indefinite,
        0xFF => {
            log::error!("BER length octet 0xFF is reserved");
            return Err(Error::InvalidLength);
        }
        _ => {
            let num_octets: usize = usize::from(first & 0x7F);
            if num_octets > size_of::<usize>() {
                log::error!("BER length uses {num_octets} octets");
                return Err(Error::InvalidLength);
            }

            let mut len: usize = 0;
            for &octet in c.read(num_octets)? {
                len = len
                    .checked_mul(256)
                    .and_then(|len| len.checked_add(usize::from(octet)))
                    .ok_or(Error::InvalidLength)?;
            }
            ContentLength::Definite(len)
        }
    };

    *cursor = c;
    Ok(length)
}

pub(super) fn write_identifier(out: &mut Vec<u8>, leading: u8, number: u32) {
    if number < u32::from(TAG_MASK) {
        // number < 31 fits the low five bits
        out.push(leading | number as u8);
        return;
    }

    out.push(leading | TAG_MASK);

    let mut groups: [u8; 5] = [0; 5];
    let mut n: usize = 0;
    let mut rest: u32 = number;
    while rest != 0 {
        groups[n] = (rest & 0x7F) as u8;
        rest >>= 7;
        n += 1;
    }

    for idx in (0..n).rev() {
        let continuation: u8 = if idx == 0 { 0 } else { 0x80 };
        out.push(groups[idx] | continuation);
    }
}

pub(super) fn write_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }

    let bytes: [u8; size_of::<usize>()] = len.to_be_bytes();
    let significant: &[u8] = super::strip_leading_zeros(&bytes);
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
}
