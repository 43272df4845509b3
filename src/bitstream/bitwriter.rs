use log::trace;

use super::bitpacker::{BitPacker, PackedBits};
use crate::compression::frame::{BLOCK_SIZE_BASE, END_OF_STREAM_MAGIC, STREAM_MAGIC};
use crate::tools::crc::do_stream_crc;

/// Writes a bitstream for output. Takes the blocks packed by BitPacker and assembles them with
/// the stream header and footer, calculating the stream CRC as it processes the blocks.
pub struct BitWriter {
    /// Bit queue and output buffer shared by header, blocks and footer.
    packer: BitPacker,
    /// Block size, needed to create the header.
    block_size: u8,
    /// Stream CRC, calculated from each block crc and added to the stream footer.
    stream_crc: u32,
    /// Set once the stream header is on the output.
    header_written: bool,
}

impl BitWriter {
    /// Create a new Bitwriter. We need the block size to create the header. Use add_block() to
    /// add each block to the stream.
    pub fn new(block_size: u8) -> Self {
        Self {
            packer: BitPacker::new(block_size as usize * BLOCK_SIZE_BASE),
            block_size,
            stream_crc: 0,
            header_written: false,
        }
    }

    /// Push the stream header to output buffer.
    pub fn push_header(&mut self) {
        if self.header_written {
            return;
        }
        trace!("\r\x1b[43mWriting BZh signature header at {}.    \x1b[0m", self.packer.loc());
        STREAM_MAGIC.iter().for_each(|&x| self.packer.out8(x));
        self.packer.out8(self.block_size + b'0');
        self.header_written = true;
    }

    /// Add a block of data to the output. The block is assumed to be packed by BitPacker and to
    /// start with its block header, so its CRC is at a fixed offset.
    pub fn add_block(&mut self, block_crc: u32, data: &PackedBits) {
        self.push_header();
        self.stream_crc = do_stream_crc(self.stream_crc, block_crc);

        let full_bytes = (data.bits / 8) as usize;
        data.bytes[..full_bytes]
            .iter()
            .for_each(|&x| self.packer.out8(x));

        // The last byte only carries some valid bits; skip its zero padding.
        let rem = (data.bits % 8) as u32;
        if rem > 0 {
            let last = data.bytes[full_bytes];
            self.packer.write_bits((last >> (8 - rem)) as u32, rem);
        }
    }

    /// Write the stream footer: end-of-stream magic and the combined stream CRC, then pad the
    /// final byte with zeros.
    pub fn push_footer(&mut self) {
        self.push_header();
        trace!("\r\x1b[43mWriting stream footer at {}.    \x1b[0m", self.packer.loc());
        END_OF_STREAM_MAGIC
            .iter()
            .for_each(|&x| self.packer.out8(x));
        self.packer.out32(self.stream_crc);
        let rem = (self.packer.bit_len() % 8) as u32;
        if rem > 0 {
            self.packer.write_bits(0, 8 - rem);
        }
    }

    /// The combined CRC of every block added so far.
    pub fn stream_crc(&self) -> u32 {
        self.stream_crc
    }

    /// Hand over every complete byte produced so far. Partial bytes stay queued until more bits
    /// (or the footer padding) complete them.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.packer.output)
    }
}
