use log::{debug, trace};

use super::frame::{write_block_header, write_sym_map, BlockHeader};
use crate::bitstream::bitpacker::{BitPacker, PackedBits};
use crate::bwt_algorithms::bwt_sort::bwt_encode;
use crate::huffman_coding::huffman::huf_encode;
use crate::tools::options::BzConfig;
use crate::tools::rle2_mtf::rle2_mtf_encode;

/// One sealed block of RLE1 data, waiting for the block transforms.
#[derive(Debug, Clone)]
pub struct Block {
    /// Position of the block in the stream, counting from 1.
    pub seq: u32,
    /// RLE1 encoded bytes.
    pub data: Vec<u8>,
    /// CRC of the original bytes that went into `data`.
    pub block_crc: u32,
}

/// Called by the compressor, this handles one block and returns its complete record: block
/// header, symbol map and huffman section. Blocks share no state, so any number of them can be
/// encoded at once.
pub fn compress_block(block: &Block, config: &BzConfig) -> PackedBits {
    let (origin, bwt) = bwt_encode(&block.data, config.effective_work_factor());
    trace!("Block {}: origin pointer {}.", block.seq, origin);

    let rle2 = rle2_mtf_encode(&bwt);

    let mut bp = BitPacker::new(block.data.len() / 2 + 64);
    write_block_header(
        &mut bp,
        &BlockHeader {
            block_crc: block.block_crc,
            origin,
        },
    );
    write_sym_map(&mut bp, &rle2.sym_map);

    // Now for the compression - the Huffman encoding (which also writes out data)
    huf_encode(&mut bp, &rle2, config.iterations);

    debug!(
        "Block {}: {} bytes in block, {} after MTF & RLE2 coding, {} syms in use, {} bits out",
        block.seq,
        block.data.len(),
        rle2.symbols.len(),
        rle2.eob + 1,
        bp.bit_len()
    );
    bp.finish()
}
