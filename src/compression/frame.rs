//! Container layout.
//!
//! ```text
//! stream  := "BZh" level('1'..'9') block* footer
//! block   := 0x314159265359 crc:32 randomised:1 origin:24 symbol_map huffman_section
//! footer  := 0x177245385090 stream_crc:32 padding-to-byte
//! ```
//!
//! Nothing after the stream header is byte aligned.

use log::{error, trace};

use crate::bitstream::bitpacker::BitPacker;
use crate::bitstream::bitreader::BitReader;
use crate::error::{BzError, Result};
use crate::tools::symbol_map::decode_sym_map;

pub const STREAM_MAGIC: [u8; 3] = *b"BZh";
pub const BLOCK_MAGIC: [u8; 6] = [0x31, 0x41, 0x59, 0x26, 0x53, 0x59];
pub const END_OF_STREAM_MAGIC: [u8; 6] = [0x17, 0x72, 0x45, 0x38, 0x50, 0x90];
/// Bytes per step of block size class.
pub const BLOCK_SIZE_BASE: usize = 100_000;

/// Fields that precede the coded data of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub block_crc: u32,
    pub origin: u32,
}

/// What follows the previous block: another block or the end of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    Block(BlockHeader),
    EndOfStream { stream_crc: u32 },
}

/// Read "BZh" and the block size class. Returns the class (1..=9).
pub fn read_stream_header(br: &mut BitReader<'_>) -> Result<u8> {
    let magic = br.bytes(3)?;
    if magic != STREAM_MAGIC {
        error!("Fatal error: not a valid bzip2 stream.");
        return Err(BzError::CorruptFrame(format!(
            "bad stream magic {:02x?}",
            magic
        )));
    }
    let level = br.byte()?;
    if !(b'1'..=b'9').contains(&level) {
        error!("Fatal error: found invalid block size.");
        return Err(BzError::CorruptFrame(format!(
            "bad block size byte {:#04x}",
            level
        )));
    }
    Ok(level - b'0')
}

/// Read a block header or the stream footer.
pub fn read_record(br: &mut BitReader<'_>) -> Result<Record> {
    let magic = br.bytes(6)?;
    if magic == END_OF_STREAM_MAGIC {
        let stream_crc = br.bint(32)?;
        return Ok(Record::EndOfStream { stream_crc });
    }
    if magic != BLOCK_MAGIC {
        error!("Invalid block magic {:02x?} at {}", magic, br.loc());
        return Err(BzError::CorruptFrame(format!(
            "bad block magic {:02x?}",
            magic
        )));
    }
    let block_crc = br.bint(32)?;
    if br.bit()? {
        return Err(BzError::CorruptFrame(
            "randomised blocks are not supported".into(),
        ));
    }
    let origin = br.bint(24)?;
    trace!("Block header: crc {:#010x}, origin {}.", block_crc, origin);
    Ok(Record::Block(BlockHeader { block_crc, origin }))
}

/// Write the block magic, CRC, randomised flag (always off) and origin pointer.
pub fn write_block_header(bp: &mut BitPacker, header: &BlockHeader) {
    BLOCK_MAGIC.iter().for_each(|&b| bp.out8(b));
    bp.out32(header.block_crc);
    bp.bit(false);
    bp.write_bits(header.origin, 24);
}

/// Write a symbol map produced by `encode_sym_map`.
pub fn write_sym_map(bp: &mut BitPacker, sym_map: &[u16]) {
    sym_map.iter().for_each(|&word| bp.out16(word));
}

/// Read the symbol map and return the byte values in use, in increasing order.
pub fn read_sym_map(br: &mut BitReader<'_>) -> Result<Vec<u8>> {
    let index = br.bint(16)? as u16;
    let mut sym_map = vec![index];
    for _ in 0..index.count_ones() {
        sym_map.push(br.bint(16)? as u16);
    }
    let symbols = decode_sym_map(&sym_map);
    if symbols.is_empty() {
        return Err(BzError::MalformedBlock("block uses no symbols".into()));
    }
    Ok(symbols)
}
