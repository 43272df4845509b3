//! Run-Length-Encoding phase 1.
//!
//! Applied to the raw input before the BWT. Any run of 4 to 255 identical bytes is written as
//! four copies of the byte followed by a count byte (0-251) of additional copies. Runs never span
//! a block boundary.
//!
use super::crc::BlockCrc;

/// Longest run that a single RLE1 group can describe.
pub const MAX_RUN: usize = 255;

/// Room for a full block plus a flushed run, capped for unbounded encoders.
fn block_capacity(max_block: usize) -> usize {
    max_block.saturating_add(5).min(1 << 20)
}

/// Builds one block of RLE1 data incrementally, tracking the CRC of the original bytes.
#[derive(Debug)]
pub struct Rle1Encoder {
    /// Maximum RLE1 bytes in a block before it must be sealed.
    max_block: usize,
    data: Vec<u8>,
    run_byte: u8,
    run_len: usize,
    crc: BlockCrc,
}

impl Rle1Encoder {
    pub fn new(max_block: usize) -> Self {
        Self {
            max_block,
            data: Vec::with_capacity(block_capacity(max_block)),
            run_byte: 0,
            run_len: 0,
            crc: BlockCrc::new(),
        }
    }

    /// Add as much of `input` as the block can take. Returns how many bytes were consumed; fewer
    /// than `input.len()` means the block is full and must be sealed with take_block().
    pub fn push(&mut self, input: &[u8]) -> usize {
        for (used, &byte) in input.iter().enumerate() {
            if self.is_full() {
                return used;
            }
            self.add_byte(byte);
        }
        input.len()
    }

    #[inline(always)]
    fn add_byte(&mut self, byte: u8) {
        self.crc.update(byte);
        if self.run_len > 0 && byte == self.run_byte && self.run_len < MAX_RUN {
            self.run_len += 1;
            return;
        }
        self.flush_run();
        self.run_byte = byte;
        self.run_len = 1;
    }

    /// Move the pending run into the block data.
    fn flush_run(&mut self) {
        match self.run_len {
            0 => {}
            1..=3 => {
                let byte = self.run_byte;
                self.data.extend(std::iter::repeat(byte).take(self.run_len));
            }
            n => {
                self.data.extend_from_slice(&[self.run_byte; 4]);
                self.data.push((n - 4) as u8);
            }
        }
        self.run_len = 0;
    }

    /// True once the flushed data has reached the maximum size. The pending run still joins the
    /// block in take_block(), so a sealed block can be up to 5 bytes larger.
    pub fn is_full(&self) -> bool {
        self.data.len() >= self.max_block
    }

    /// True when no byte has been added since the last take_block().
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.run_len == 0
    }

    /// Seal the block: returns the RLE1 data and the CRC of the original bytes, and resets the
    /// encoder for the next block.
    pub fn take_block(&mut self) -> (Vec<u8>, u32) {
        self.flush_run();
        let crc = self.crc.finish();
        self.crc = BlockCrc::new();
        let fresh = Vec::with_capacity(block_capacity(self.max_block));
        let data = std::mem::replace(&mut self.data, fresh);
        (data, crc)
    }
}

/// One-shot RLE1 encode of a whole buffer (used in tests and for small inputs).
pub fn rle1_encode(data: &[u8]) -> Vec<u8> {
    let mut enc = Rle1Encoder::new(usize::MAX);
    enc.push(data);
    enc.take_block().0
}

/// Expand RLE1 data back into the original bytes. A final group of four identical bytes with no
/// count byte after it is taken as a run of exactly four.
pub fn rle1_decode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 4);
    let mut last: Option<u8> = None;
    let mut run = 0;
    let mut i = 0;
    while i < data.len() {
        let byte = data[i];
        i += 1;
        out.push(byte);
        if last == Some(byte) {
            run += 1;
        } else {
            last = Some(byte);
            run = 1;
        }
        if run == 4 {
            if let Some(&count) = data.get(i) {
                out.extend(std::iter::repeat(byte).take(count as usize));
                i += 1;
            }
            last = None;
            run = 0;
        }
    }
    out
}
