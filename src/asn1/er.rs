//! The restricted encoding of the legacy negotiation layer.
//!
//! Lengths are short form, `0x81 nn` or `0x82 nn nn`. A tag number above 30
//! is carried in a single octet after the `0x1F` marker.

use super::{CONSTRUCTED, Class, ContentLength, TAG_MASK};
use crate::{ByteCursor, Error, Result};

pub(super) fn read_identifier(cursor: &mut ByteCursor<'_>) -> Result<(Class, bool, u32)> {
    let mut c: ByteCursor = *cursor;

    let first: u8 = c.read_u8()?;
    let number: u8 = if first & TAG_MASK != TAG_MASK {
        first & TAG_MASK
    } else {
        let number: u8 = c.read_u8()?;
        if number < TAG_MASK {
            log::error!("ER high tag form used for low tag number {number}");
            return Err(Error::InvalidTag);
        }
        number
    };

    *cursor = c;
    Ok((
        Class::from_identifier(first),
        first & CONSTRUCTED != 0,
        u32::from(number),
    ))
}

pub(super) fn read_length(cursor: &mut ByteCursor<'_>) -> Result<ContentLength> {
    let mut c: ByteCursor = *cursor;

    let first: u8 = c.read_u8()?;
    let len: usize = match first {
        0x00..=0x7F => usize::from(first),
        0x81 => usize::from(c.read_u8()?),
        0x82 => usize::from(c.read_u16_be()?),
        _ => {
            log::error!("ER length octet 0x{first:02X} is not supported");
            return Err(Error::InvalidLength);
        }
    };

    *cursor = c;
    Ok(ContentLength::Definite(len))
}

pub(super) fn write_identifier(out: &mut Vec<u8>, leading: u8, number: u32) -> Result<()> {
    match u8::try_from(number) {
        Ok(number) if number < TAG_MASK => out.push(leading | number),
        Ok(number) => out.extend_from_slice(&[leading | TAG_MASK, number]),
        Err(_) => {
            log::error!("ER cannot encode tag number {number}");
            return Err(Error::InvalidTag);
        }
    }
    Ok(())
}

pub(super) fn write_length(out: &mut Vec<u8>, len: usize) -> Result<()> {
    match len {
        0x00..=0x7F => out.push(len as u8),
        0x80..=0xFF => out.extend_from_slice(&[0x81, len as u8]),
        0x100..=0xFFFF => {
            out.push(0x82);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        }
        _ => {
            log::error!("ER cannot encode length {len}");
            return Err(Error::InvalidLength);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{read_length, write_identifier, write_length};
    use crate::asn1::ContentLength;
    use crate::{ByteCursor, Error};

    #[test]
    fn length_limits() {
        let mut out = Vec::new();
        write_length(&mut out, 0xFFFF).unwrap();
        assert_eq!(out, [0x82, 0xFF, 0xFF]);
        let mut cursor = ByteCursor::new(&out);
        assert_eq!(read_length(&mut cursor).unwrap(), ContentLength::Definite(0xFFFF));

        assert!(matches!(
            write_length(&mut Vec::new(), 0x1_0000),
            Err(Error::InvalidLength)
        ));
    }

    #[test]
    fn indefinite_is_rejected() {
        let mut cursor = ByteCursor::new(&[0x80]);
        assert!(matches!(read_length(&mut cursor), Err(Error::InvalidLength)));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn tag_number_limit() {
        let mut out = Vec::new();
        write_identifier(&mut out, 0x60, 101).unwrap();
        assert_eq!(out, [0x7F, 101]);
        assert!(matches!(
            write_identifier(&mut Vec::new(), 0x60, 256),
            Err(Error::InvalidTag)
        ));
    }
}
