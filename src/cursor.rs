use crate::{Error, Result};

/// Bounds-checked read cursor over a borrowed byte buffer.
///
/// Every read either advances the position by exactly the number of bytes
/// it returns or fails with [`Error::Truncated`] and leaves the position
/// untouched.
///
/// The cursor is `Copy`; decoders that need all-or-nothing semantics over
/// several reads work on a copy and write it back on success.
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread tail of the buffer, without consuming it.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn peek_byte(&self) -> Result<u8> {
        self.buf.get(self.pos).copied().ok_or(Error::Truncated)
    }

    pub fn read(&mut self, n: usize) -> Result<&'a [u8]> {
        match self.rest().split_at_checked(n) {
            Some((val, _)) => {
                self.pos += n;
                Ok(val)
            }
            None => {
                log::trace!(
                    "read of {n} bytes at offset {} with {} remaining",
                    self.pos,
                    self.remaining()
                );
                Err(Error::Truncated)
            }
        }
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out: [u8; N] = [0; N];
        out.copy_from_slice(self.read(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let [val]: [u8; 1] = self.read_array()?;
        Ok(val)
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read(n).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::ByteCursor;
    use crate::Error;

    #[test]
    fn reads_advance_exactly() {
        let mut cursor = ByteCursor::new(&[0x01, 0x02, 0x03, 0x04, 0x05]);
        assert_eq!(cursor.read_u8().unwrap(), 0x01);
        assert_eq!(cursor.position(), 1);
        assert_eq!(cursor.read_u16_be().unwrap(), 0x0203);
        assert_eq!(cursor.remaining(), 2);
        assert_eq!(cursor.peek_byte().unwrap(), 0x04);
        assert_eq!(cursor.remaining(), 2);
        assert_eq!(cursor.read_u16_le().unwrap(), 0x0504);
        assert!(cursor.is_empty());
    }

    #[test]
    fn failed_read_does_not_move() {
        let mut cursor = ByteCursor::new(&[0xAA, 0xBB, 0xCC]);
        cursor.skip(1).unwrap();
        assert!(matches!(cursor.read(3), Err(Error::Truncated)));
        assert!(matches!(cursor.read_u32_le(), Err(Error::Truncated)));
        assert_eq!(cursor.position(), 1);
        assert_eq!(cursor.rest(), &[0xBB, 0xCC]);
    }

    #[test]
    fn empty_buffer() {
        let mut cursor = ByteCursor::new(&[]);
        assert!(matches!(cursor.peek_byte(), Err(Error::Truncated)));
        assert!(matches!(cursor.read_u8(), Err(Error::Truncated)));
        assert_eq!(cursor.read(0).unwrap(), &[] as &[u8]);
    }
}
