//! BitReader: reads a packed bitstream for the block-oriented deconstruction of BZIP2 data.
//!
//! The reader borrows a byte slice and keeps a bit cursor into it. The cursor can be read back
//! with `position()` and restored with `at()`, so a caller holding a growing input buffer can
//! abandon a half-parsed block and try again once more bytes arrive.
//!

use crate::error::{BzError, Result};

/// Reads bits, most significant first, from a byte slice.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// Cursor in bits from the start of `data`.
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a new BitReader positioned at the first bit of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Creates a BitReader positioned `bit_pos` bits into `data`.
    pub fn at(data: &'a [u8], bit_pos: usize) -> Self {
        Self { data, pos: bit_pos }
    }

    /// Current cursor, in bits.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bits.
    pub fn remaining(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.pos)
    }

    /// Return the next bit as a bool, *true* if it is 1.
    pub fn bit(&mut self) -> Result<bool> {
        if self.pos >= self.data.len() * 8 {
            return Err(self.truncated(1));
        }
        let byte = self.data[self.pos >> 3];
        let bit = (byte >> (7 - (self.pos & 7))) & 1;
        self.pos += 1;
        Ok(bit == 1)
    }

    /// Return the next n bits (0 to 32) as an unsigned integer.
    pub fn bint(&mut self, n: u32) -> Result<u32> {
        /*
        This is used primarily to return signatures and crc values. For example, if a crc
        value is stored on the stream as a u32, then bint(32) will return the crc value.

        Read as many bits as possible from each byte: first whatever is left of the current
        byte, then whole bytes, then the leading part of the last byte.
        */
        if n == 0 {
            return Ok(0);
        }
        if n > 32 {
            return Err(BzError::CorruptFrame(format!(
                "cannot read {} bits into a 32 bit value",
                n
            )));
        }
        if self.remaining() < n as usize {
            return Err(self.truncated(n));
        }
        let mut result = 0_u64;
        let mut needed = n;
        while needed > 0 {
            let byte = self.data[self.pos >> 3];
            let available = 8 - (self.pos & 7) as u32;
            let take = available.min(needed);
            let bits = (byte >> (available - take)) & (0xff_u8 >> (8 - take));
            result = result << take | bits as u64;
            needed -= take;
            self.pos += take as usize;
        }
        Ok(result as u32)
    }

    /// Returns the next 8 bits as a byte.
    pub fn byte(&mut self) -> Result<u8> {
        self.bint(8).map(|byte| byte as u8)
    }

    /// Returns the next n bytes (which need not be byte aligned).
    pub fn bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        if self.remaining() < n * 8 {
            return Err(self.truncated((n * 8) as u32));
        }
        (0..n).map(|_| self.byte()).collect()
    }

    /// Skip to the next byte boundary (a no-op when already aligned).
    pub fn align(&mut self) {
        self.pos = (self.pos + 7) & !7;
    }

    /// Debugging function. Report current position in the buffer.
    pub fn loc(&self) -> String {
        format!("[{}.{}]", self.pos / 8, self.pos % 8)
    }

    fn truncated(&self, wanted: u32) -> BzError {
        BzError::TruncatedStream(format!(
            "needed {} bits at {}, only {} left",
            wanted,
            self.loc(),
            self.remaining()
        ))
    }
}

#[cfg(test)]
mod test {
    use super::BitReader;
    use crate::error::BzError;

    #[test]
    fn basic_test() {
        let x = [0b10000001_u8];
        let mut br = BitReader::new(&x);
        assert!(br.bit().unwrap());
        for _ in 0..6 {
            assert!(!br.bit().unwrap());
        }
        assert!(br.bit().unwrap());
        assert!(matches!(br.bit(), Err(BzError::TruncatedStream(_))));
    }

    #[test]
    fn bint_test() {
        let x = [0b00011011];
        let mut br = BitReader::new(&x);
        assert_eq!(br.bint(5).unwrap(), 3);
        assert_eq!(br.bint(1).unwrap(), 0);
        assert_eq!(br.bint(2).unwrap(), 3);
    }

    #[test]
    fn bint_across_bytes_test() {
        let x = [0xab, 0xcd, 0xef, 0x12, 0x34];
        let mut br = BitReader::new(&x);
        assert_eq!(br.bint(4).unwrap(), 0xa);
        assert_eq!(br.bint(32).unwrap(), 0xbcde_f123);
        assert_eq!(br.bint(4).unwrap(), 0x4);
        assert_eq!(br.remaining(), 0);
    }

    #[test]
    fn truncated_read_does_not_move_cursor_test() {
        let x = [0xff, 0xff];
        let mut br = BitReader::new(&x);
        br.bint(3).unwrap();
        assert!(matches!(br.bint(14), Err(BzError::TruncatedStream(_))));
        assert_eq!(br.position(), 3);
        assert_eq!(br.bint(13).unwrap(), 0x1fff);
    }

    #[test]
    fn bytes_and_loc_test() {
        let x = "Hello, world!".as_bytes();
        let mut br = BitReader::new(x);
        assert_eq!(br.bytes(5).unwrap(), "Hello".as_bytes().to_vec());
        br.bit().unwrap();
        assert_eq!(br.loc(), "[5.1]");
        br.align();
        assert_eq!(br.byte().unwrap(), b' ');
    }

    #[test]
    fn restart_at_saved_position_test() {
        let x = [0b0101_0000, 0xff];
        let mut br = BitReader::new(&x);
        br.bint(2).unwrap();
        let saved = br.position();
        let mut again = BitReader::at(&x, saved);
        assert_eq!(again.bint(2).unwrap(), 0b01);
    }
}
