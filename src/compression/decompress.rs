use log::{debug, error, info, trace};

use super::decompress_block::{decode_block, verify_block};
use super::frame::{read_record, read_stream_header, BlockHeader, Record, STREAM_MAGIC};
use crate::bitstream::bitreader::BitReader;
use crate::error::{BzError, Result};
use crate::tools::crc::do_stream_crc;

/*
    The decompressor keeps every byte it has been fed but not yet used, along with a bit cursor
    into that buffer. Each step parses one element (stream header, block record, block body,
    footer) from the cursor. A step that runs out of input leaves the cursor where it was, so the
    same step is simply tried again once more input arrives. Running out of input only becomes an
    error at finish().

    Blocks are large and decoding one is the expensive part, so a block that came up short is not
    retried on every feed, only once its unread input has doubled (or grown by MAX_RETRY).
*/

/// Most new bytes to wait for before retrying a short block.
const MAX_RETRY: usize = 1 << 20;

/// Where the decompressor is in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressState {
    /// Expecting "BZh" and a block size class.
    ReadingHeader,
    /// Expecting a block header or the stream footer.
    ReadingBlock,
    /// Decoding the body of the current block.
    DecodingBlock,
    /// Checking a decoded block against its CRC.
    VerifyingCrc,
    /// Checking the stream CRC from the footer.
    ReadingFooter,
    /// All input was decoded and verified.
    Done,
    /// A previous call returned an error. Nothing more can be done.
    Failed,
}

/// Outcome of one parse step.
enum Step {
    Advanced,
    NeedInput,
    Finished,
}

pub struct Decompressor {
    /// Input not yet fully used.
    buffer: Vec<u8>,
    /// Bit cursor into `buffer`.
    bit_pos: usize,
    /// Buffer length to wait for before retrying a short block.
    retry_at: usize,
    /// Block size class of the current stream.
    block_size: u8,
    /// Combined CRC of the blocks decoded in the current stream.
    stream_crc: u32,
    /// Stream CRC read from the footer.
    footer_crc: u32,
    /// Header of the block being decoded.
    header: Option<BlockHeader>,
    /// Decoded block waiting for CRC verification.
    decoded: Vec<u8>,
    /// Verified output not yet collected.
    output: Vec<u8>,
    state: DecompressState,
    /// Completed streams. More than one when streams are concatenated.
    streams: u32,
    blocks: u64,
}

impl Decompressor {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            bit_pos: 0,
            retry_at: 0,
            block_size: 0,
            stream_crc: 0,
            footer_crc: 0,
            header: None,
            decoded: Vec::new(),
            output: Vec::new(),
            state: DecompressState::ReadingHeader,
            streams: 0,
            blocks: 0,
        }
    }

    pub fn state(&self) -> DecompressState {
        self.state
    }

    fn check_open(&self) -> Result<()> {
        match self.state {
            DecompressState::Done | DecompressState::Failed => Err(BzError::SessionClosed),
            _ => Ok(()),
        }
    }

    /// Consume compressed input. All of `input` is always taken; decoded bytes become available
    /// from poll() once a whole block has been decoded and verified.
    pub fn feed(&mut self, input: &[u8]) -> Result<usize> {
        self.check_open()?;
        self.buffer.extend_from_slice(input);
        self.advance(false)?;
        Ok(input.len())
    }

    /// Hand over the verified bytes produced so far.
    pub fn poll(&mut self) -> Result<Vec<u8>> {
        self.check_open()?;
        Ok(std::mem::take(&mut self.output))
    }

    /// Decode whatever is left. The input must end with a complete stream; anything short of that
    /// is a TruncatedStream error.
    pub fn finish(&mut self) -> Result<Vec<u8>> {
        self.check_open()?;
        self.advance(true)?;
        info!(
            "Decompressed {} blocks from {} stream(s).",
            self.blocks, self.streams
        );
        Ok(std::mem::take(&mut self.output))
    }

    /// Run parse steps until more input is needed or the input is used up. Any error poisons the
    /// decompressor.
    fn advance(&mut self, at_end: bool) -> Result<()> {
        loop {
            match self.step(at_end) {
                Ok(Step::Advanced) => continue,
                Ok(Step::NeedInput) => return Ok(()),
                Ok(Step::Finished) => {
                    self.state = DecompressState::Done;
                    return Ok(());
                }
                Err(e) => {
                    error!("Decompression failed: {}", e);
                    self.state = DecompressState::Failed;
                    return Err(e);
                }
            }
        }
    }

    /// A step that ran short of input waits for more, unless there is no more to come.
    fn short(&self, err: BzError, at_end: bool) -> Result<Step> {
        match err {
            BzError::TruncatedStream(_) if !at_end => Ok(Step::NeedInput),
            other => Err(other),
        }
    }

    fn step(&mut self, at_end: bool) -> Result<Step> {
        match self.state {
            DecompressState::ReadingHeader => {
                if self.streams > 0 {
                    // Only another stream may follow a stream footer.
                    let unread = &self.buffer[self.bit_pos / 8..];
                    if unread.is_empty() {
                        return Ok(if at_end { Step::Finished } else { Step::NeedInput });
                    }
                    let n = unread.len().min(STREAM_MAGIC.len());
                    if unread[..n] != STREAM_MAGIC[..n] {
                        return Err(BzError::CorruptFrame(format!(
                            "{} bytes of trailing data after stream {}",
                            unread.len(),
                            self.streams
                        )));
                    }
                }
                let mut br = BitReader::at(&self.buffer, self.bit_pos);
                match read_stream_header(&mut br) {
                    Ok(level) => {
                        self.bit_pos = br.position();
                        debug!("Found a valid bzip2 signature, block size {}00k.", level);
                        self.block_size = level;
                        self.stream_crc = 0;
                        self.state = DecompressState::ReadingBlock;
                        Ok(Step::Advanced)
                    }
                    Err(e) => self.short(e, at_end),
                }
            }

            DecompressState::ReadingBlock => {
                let mut br = BitReader::at(&self.buffer, self.bit_pos);
                match read_record(&mut br) {
                    Ok(Record::Block(header)) => {
                        self.bit_pos = br.position();
                        trace!("Found a valid header for block {}.", self.blocks + 1);
                        self.header = Some(header);
                        self.retry_at = 0;
                        self.state = DecompressState::DecodingBlock;
                        Ok(Step::Advanced)
                    }
                    Ok(Record::EndOfStream { stream_crc }) => {
                        self.bit_pos = br.position();
                        self.footer_crc = stream_crc;
                        self.state = DecompressState::ReadingFooter;
                        Ok(Step::Advanced)
                    }
                    Err(e) => self.short(e, at_end),
                }
            }

            DecompressState::DecodingBlock => {
                if !at_end && self.buffer.len() < self.retry_at {
                    return Ok(Step::NeedInput);
                }
                let header = self.current_header()?;
                let mut br = BitReader::at(&self.buffer, self.bit_pos);
                match decode_block(&mut br, &header, self.block_size) {
                    Ok(data) => {
                        self.bit_pos = br.position();
                        self.decoded = data;
                        self.state = DecompressState::VerifyingCrc;
                        Ok(Step::Advanced)
                    }
                    Err(e) => {
                        let unread = self.buffer.len() - self.bit_pos / 8;
                        self.retry_at = self.buffer.len() + unread.clamp(1, MAX_RETRY);
                        self.short(e, at_end)
                    }
                }
            }

            DecompressState::VerifyingCrc => {
                let header = self.current_header()?;
                verify_block(&header, &self.decoded)?;
                self.stream_crc = do_stream_crc(self.stream_crc, header.block_crc);
                self.blocks += 1;
                info!(
                    "Block {} verified, {} bytes.",
                    self.blocks,
                    self.decoded.len()
                );
                self.output.append(&mut self.decoded);
                self.header = None;
                self.compact();
                self.state = DecompressState::ReadingBlock;
                Ok(Step::Advanced)
            }

            DecompressState::ReadingFooter => {
                if self.footer_crc != self.stream_crc {
                    error!(
                        "Stream CRC mismatch: stored {:#010x}, computed {:#010x}",
                        self.footer_crc, self.stream_crc
                    );
                    return Err(BzError::DataIntegrity {
                        expected: self.footer_crc,
                        found: self.stream_crc,
                    });
                }
                // The footer is padded to a byte boundary.
                let mut br = BitReader::at(&self.buffer, self.bit_pos);
                br.align();
                self.bit_pos = br.position();
                self.streams += 1;
                self.compact();
                self.state = DecompressState::ReadingHeader;
                Ok(Step::Advanced)
            }

            DecompressState::Done | DecompressState::Failed => Ok(Step::Finished),
        }
    }

    fn current_header(&self) -> Result<BlockHeader> {
        self.header
            .ok_or_else(|| BzError::CorruptFrame("block body without a block header".into()))
    }

    /// Drop the whole bytes in front of the cursor.
    fn compact(&mut self) {
        let used = self.bit_pos / 8;
        if used > 0 {
            self.buffer.drain(..used);
            self.bit_pos -= used * 8;
        }
    }
}

impl Default for Decompressor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compression::compress::Compressor;
    use crate::tools::options::BzConfig;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut c = Compressor::new(BzConfig::default().with_block_size(1)).unwrap();
        c.feed(data).unwrap();
        let mut out = c.poll().unwrap();
        out.extend(c.finish().unwrap());
        out
    }

    #[test]
    fn states_test() {
        let packed = compress(b"Hello, hello, hello world!");
        let mut d = Decompressor::new();
        assert_eq!(d.state(), DecompressState::ReadingHeader);
        d.feed(&packed[..2]).unwrap();
        assert_eq!(d.state(), DecompressState::ReadingHeader);
        d.feed(&packed[2..20]).unwrap();
        assert_eq!(d.state(), DecompressState::DecodingBlock);
        d.feed(&packed[20..]).unwrap();
        // Another stream could still follow.
        assert_eq!(d.state(), DecompressState::ReadingHeader);
        let mut out = d.poll().unwrap();
        out.extend(d.finish().unwrap());
        assert_eq!(out, b"Hello, hello, hello world!".to_vec());
        assert_eq!(d.state(), DecompressState::Done);
    }

    #[test]
    fn short_input_waits_until_finish_test() {
        let packed = compress(b"some text to squeeze");
        let mut d = Decompressor::new();
        // Only the footer is cut short, so the block itself still comes through.
        d.feed(&packed[..packed.len() - 4]).unwrap();
        assert_eq!(d.poll().unwrap(), b"some text to squeeze".to_vec());
        assert!(matches!(d.finish(), Err(BzError::TruncatedStream(_))));
        assert_eq!(d.state(), DecompressState::Failed);
        assert!(matches!(d.poll(), Err(BzError::SessionClosed)));
    }

    #[test]
    fn stream_crc_mismatch_test() {
        let mut packed = compress(b"");
        // Empty stream: the stored stream CRC is in bytes 10..14 and must be zero.
        packed[13] = 1;
        let mut d = Decompressor::new();
        assert!(matches!(
            d.feed(&packed),
            Err(BzError::DataIntegrity {
                expected: 1,
                found: 0
            })
        ));
        assert!(matches!(d.feed(b""), Err(BzError::SessionClosed)));
    }

    #[test]
    fn trailing_garbage_test() {
        let mut packed = compress(b"abc");
        packed.extend_from_slice(b"junk");
        let mut d = Decompressor::new();
        assert!(matches!(d.feed(&packed), Err(BzError::CorruptFrame(_))));
    }

    #[test]
    fn empty_input_test() {
        let mut d = Decompressor::new();
        assert!(matches!(d.finish(), Err(BzError::TruncatedStream(_))));
    }
}
