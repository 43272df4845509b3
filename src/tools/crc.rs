//! CRC32 as used by BZIP2: polynomial 0x04c11db7, processed most significant bit first, with an
//! initial value and final xor of 0xffffffff. Block CRCs cover the original (pre-RLE1) bytes.

const POLY: u32 = 0x04c1_1db7;

/// Lookup table, built at compile time.
static CRC_TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0_u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Continue a finished CRC over more data. Start a new CRC by passing 0.
pub fn do_crc(crc: u32, data: &[u8]) -> u32 {
    let mut crc = !crc;
    for &byte in data {
        crc = (crc << 8) ^ CRC_TABLE[((crc >> 24) ^ byte as u32) as usize];
    }
    !crc
}

/// Running (un-finalised) CRC, for callers that feed one byte at a time.
#[derive(Debug, Clone, Copy)]
pub struct BlockCrc(u32);

impl BlockCrc {
    pub fn new() -> Self {
        Self(u32::MAX)
    }

    #[inline(always)]
    pub fn update(&mut self, byte: u8) {
        self.0 = (self.0 << 8) ^ CRC_TABLE[((self.0 >> 24) ^ byte as u32) as usize];
    }

    pub fn finish(&self) -> u32 {
        !self.0
    }
}

impl Default for BlockCrc {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold a block CRC into the stream CRC.
pub fn do_stream_crc(stream_crc: u32, block_crc: u32) -> u32 {
    stream_crc.rotate_left(1) ^ block_crc
}
