use log::{debug, info};
use rayon::prelude::*;

use super::compress_block::{compress_block, Block};
use crate::bitstream::bitwriter::BitWriter;
use crate::error::{BzError, Result};
use crate::tools::options::BzConfig;
use crate::tools::rle1::Rle1Encoder;

/*
    The compressor takes input a slice at a time through feed(). Input goes straight through the
    RLE1 encoder into the current block. When a block is full it is sealed and parked until
    enough blocks are waiting to keep every rayon thread busy. Those blocks are then encoded in
    parallel and handed to the BitWriter in the order they were sealed.

    finish() seals whatever partial block is left, encodes everything still waiting and writes the
    stream footer.
*/

/// Where the compressor is in its per-block cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressState {
    /// Waiting for input; no partial block is open.
    Idle,
    /// Collecting input into the current block.
    Buffering,
    /// Running BWT, MTF/RLE2 and huffman coding over sealed blocks.
    Transforming,
    /// Appending encoded blocks to the output stream.
    Framing,
    /// Flushing the final block and writing the stream footer.
    Finalizing,
    /// The stream footer is written. Nothing more can be fed.
    Done,
}

pub struct Compressor {
    config: BzConfig,
    rle1: Rle1Encoder,
    writer: BitWriter,
    /// Sealed blocks that have not been encoded yet, in input order.
    pending: Vec<Block>,
    /// Sequence number of the last sealed block.
    seq: u32,
    state: CompressState,
    bytes_in: u64,
}

impl Compressor {
    /// Create a compressor for the given settings. Settings are checked before anything else.
    pub fn new(config: BzConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "Compressing with {}00k blocks, work factor {}, {} huffman passes.",
            config.block_size,
            config.effective_work_factor(),
            config.iterations
        );
        Ok(Self {
            rle1: Rle1Encoder::new(config.max_block_len()),
            writer: BitWriter::new(config.block_size),
            pending: Vec::new(),
            seq: 0,
            state: CompressState::Idle,
            bytes_in: 0,
            config,
        })
    }

    pub fn state(&self) -> CompressState {
        self.state
    }

    /// Total bytes consumed so far.
    pub fn bytes_in(&self) -> u64 {
        self.bytes_in
    }

    fn check_open(&self) -> Result<()> {
        if self.state == CompressState::Done {
            return Err(BzError::SessionClosed);
        }
        Ok(())
    }

    /// Consume input. All of `input` is always taken; compressed bytes become available from
    /// poll() as blocks complete.
    pub fn feed(&mut self, input: &[u8]) -> Result<usize> {
        self.check_open()?;
        let mut rest = input;
        while !rest.is_empty() {
            self.state = CompressState::Buffering;
            let used = self.rle1.push(rest);
            rest = &rest[used..];
            if self.rle1.is_full() {
                self.seal_block();
            }
        }
        self.bytes_in += input.len() as u64;

        if self.pending.len() >= rayon::current_num_threads() {
            self.encode_pending();
        }
        self.state = if self.rle1.is_empty() && self.pending.is_empty() {
            CompressState::Idle
        } else {
            CompressState::Buffering
        };
        Ok(input.len())
    }

    /// Hand over the compressed bytes produced so far.
    pub fn poll(&mut self) -> Result<Vec<u8>> {
        self.check_open()?;
        Ok(self.writer.take_output())
    }

    /// Flush the last partial block, write the stream footer and return every byte not yet
    /// collected with poll(). The compressor is closed afterwards.
    pub fn finish(&mut self) -> Result<Vec<u8>> {
        self.check_open()?;
        self.state = CompressState::Finalizing;
        if !self.rle1.is_empty() {
            self.seal_block();
        }
        self.encode_pending();

        self.state = CompressState::Finalizing;
        self.writer.push_footer();
        info!(
            "Compressed {} bytes in {} blocks. Stream CRC {:#010x}.",
            self.bytes_in,
            self.seq,
            self.writer.stream_crc()
        );
        self.state = CompressState::Done;
        Ok(self.writer.take_output())
    }

    /// Close the current block and queue it for encoding.
    fn seal_block(&mut self) {
        let (data, block_crc) = self.rle1.take_block();
        self.seq += 1;
        debug!(
            "Sealed block {}: {} RLE1 bytes, crc {:#010x}.",
            self.seq,
            data.len(),
            block_crc
        );
        self.pending.push(Block {
            seq: self.seq,
            data,
            block_crc,
        });
    }

    /// Encode every waiting block in parallel, then frame them in input order.
    fn encode_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        self.state = CompressState::Transforming;
        let config = self.config;
        let packed: Vec<_> = self
            .pending
            .par_iter()
            .map(|block| compress_block(block, &config))
            .collect();

        self.state = CompressState::Framing;
        for (block, bits) in self.pending.drain(..).zip(packed.iter()) {
            info!("Writing block {} ({} bits).", block.seq, bits.bits);
            self.writer.add_block(block.block_crc, bits);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_stream_test() {
        let mut c = Compressor::new(BzConfig::default()).unwrap();
        assert_eq!(c.state(), CompressState::Idle);
        let out = c.finish().unwrap();
        assert_eq!(
            out,
            vec![
                b'B', b'Z', b'h', b'9', 0x17, 0x72, 0x45, 0x38, 0x50, 0x90, 0, 0, 0, 0
            ]
        );
        assert_eq!(c.state(), CompressState::Done);
    }

    #[test]
    fn closed_after_finish_test() {
        let mut c = Compressor::new(BzConfig::default()).unwrap();
        c.feed(b"abc").unwrap();
        assert_eq!(c.state(), CompressState::Buffering);
        c.finish().unwrap();
        assert!(matches!(c.feed(b"x"), Err(BzError::SessionClosed)));
        assert!(matches!(c.poll(), Err(BzError::SessionClosed)));
        assert!(matches!(c.finish(), Err(BzError::SessionClosed)));
    }

    #[test]
    fn bad_config_test() {
        assert!(matches!(
            Compressor::new(BzConfig::default().with_block_size(0)),
            Err(BzError::Config(_))
        ));
    }

    #[test]
    fn block_count_test() {
        // A 100k class block seals at 99,981 RLE1 bytes plus the pending byte; three full
        // blocks and a partial one.
        let data: Vec<u8> = (0..310_000_u32).map(|i| (i * 7 % 251) as u8).collect();
        let mut c = Compressor::new(BzConfig::default().with_block_size(1)).unwrap();
        assert_eq!(c.feed(&data).unwrap(), data.len());
        c.finish().unwrap();
        assert_eq!(c.seq, 4);
        assert_eq!(c.bytes_in(), 310_000);
    }

    #[test]
    fn buffering_after_framing_test() {
        // With one worker thread every sealed block is encoded during feed().
        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        pool.install(|| {
            let data: Vec<u8> = (0..150_000_u32).map(|i| (i * 7 % 251) as u8).collect();
            let mut c = Compressor::new(BzConfig::default().with_block_size(1)).unwrap();
            c.feed(&data).unwrap();
            assert_eq!(c.state(), CompressState::Buffering);
            assert!(c.pending.is_empty());
            assert!(!c.poll().unwrap().is_empty());
        });
    }
}
