//! Session API for the engine.
//!
//! A session is opened for one direction (compress or decompress) with one method and a plain
//! [`BzConfig`] value. Input is pushed with `feed`, output is pulled with `poll`, and `finish`
//! flushes the stream and returns the last bytes. Sessions share nothing, so separate sessions
//! may run on separate threads.
//!
//! ```
//! use bzip2_engine::session::{open, Method, Mode};
//! use bzip2_engine::tools::options::BzConfig;
//!
//! let mut zip = open(Method::Bzip2, Mode::Compress, BzConfig::default()).unwrap();
//! zip.feed(b"hello hello hello").unwrap();
//! let mut packed = zip.poll().unwrap();
//! packed.extend(zip.finish().unwrap());
//!
//! let mut unzip = open(Method::Bzip2, Mode::Decompress, BzConfig::default()).unwrap();
//! unzip.feed(&packed).unwrap();
//! assert_eq!(unzip.finish().unwrap(), b"hello hello hello".to_vec());
//! ```

use std::fmt::{Display, Formatter};
use std::sync::OnceLock;

use log::{info, warn};

use crate::compression::compress::{CompressState, Compressor};
use crate::compression::decompress::{DecompressState, Decompressor};
use crate::error::{BzError, Result};
use crate::tools::options::BzConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compression method a session runs. Selects the codec at open time.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Bzip2,
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Bzip2 => write!(f, "bzip2"),
        }
    }
}

/// Direction of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Compress,
    Decompress,
}

/// Progress of a session, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Compress(CompressState),
    Decompress(DecompressState),
    /// close() was called.
    Closed,
}

/// One direction of one method, driven by a [`Session`].
///
/// Every call after `finish` or after an error returns [`BzError::SessionClosed`].
pub trait StreamCodec: Send {
    /// Consume input, returning how many bytes were taken.
    fn feed(&mut self, input: &[u8]) -> Result<usize>;

    /// Output produced since the last call.
    fn poll(&mut self) -> Result<Vec<u8>>;

    /// End of input. Returns all remaining output.
    fn finish(&mut self) -> Result<Vec<u8>>;

    fn state(&self) -> SessionState;
}

impl StreamCodec for Compressor {
    fn feed(&mut self, input: &[u8]) -> Result<usize> {
        Compressor::feed(self, input)
    }

    fn poll(&mut self) -> Result<Vec<u8>> {
        Compressor::poll(self)
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        Compressor::finish(self)
    }

    fn state(&self) -> SessionState {
        SessionState::Compress(Compressor::state(self))
    }
}

impl StreamCodec for Decompressor {
    fn feed(&mut self, input: &[u8]) -> Result<usize> {
        Decompressor::feed(self, input)
    }

    fn poll(&mut self) -> Result<Vec<u8>> {
        Decompressor::poll(self)
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        Decompressor::finish(self)
    }

    fn state(&self) -> SessionState {
        SessionState::Decompress(Decompressor::state(self))
    }
}

/// Pick the codec for a method and direction.
fn codec_for(method: Method, mode: Mode, config: BzConfig) -> Result<Box<dyn StreamCodec>> {
    match (method, mode) {
        (Method::Bzip2, Mode::Compress) => Ok(Box::new(Compressor::new(config)?)),
        (Method::Bzip2, Mode::Decompress) => Ok(Box::new(Decompressor::new())),
    }
}

static ENGINE: OnceLock<usize> = OnceLock::new();

/// One-time engine setup for the process: builds the global rayon pool used for parallel block
/// encoding. Safe to call any number of times; open() calls it too. Returns the number of worker
/// threads.
pub fn init() -> usize {
    *ENGINE.get_or_init(|| {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("bzip2-engine-{}", i))
            .build_global()
        {
            // Someone else already set up the global pool; use theirs.
            warn!("Using the existing rayon thread pool: {}", e);
        }
        let threads = rayon::current_num_threads();
        info!("bzip2 engine {} ready, {} worker threads.", VERSION, threads);
        threads
    })
}

/// A running compression or decompression.
pub struct Session {
    method: Method,
    mode: Mode,
    codec: Option<Box<dyn StreamCodec>>,
}

/// Open a session. The configuration is checked here, before any data is consumed. Decompression
/// takes its block size from the stream, so only the checks apply.
pub fn open(method: Method, mode: Mode, config: BzConfig) -> Result<Session> {
    init();
    config.validate()?;
    let codec = codec_for(method, mode, config)?;
    info!("Opened {} session ({:?}).", method, mode);
    Ok(Session {
        method,
        mode,
        codec: Some(codec),
    })
}

impl Session {
    fn codec(&mut self) -> Result<&mut Box<dyn StreamCodec>> {
        self.codec.as_mut().ok_or(BzError::SessionClosed)
    }

    /// Push input into the session. Returns the number of bytes consumed, which is always all
    /// of them.
    pub fn feed(&mut self, input: &[u8]) -> Result<usize> {
        self.codec()?.feed(input)
    }

    /// Collect the output produced so far.
    pub fn poll(&mut self) -> Result<Vec<u8>> {
        self.codec()?.poll()
    }

    /// Signal end of input and collect the remaining output.
    pub fn finish(&mut self) -> Result<Vec<u8>> {
        self.codec()?.finish()
    }

    /// Release the session. Unfinished output is discarded and must not be used.
    pub fn close(&mut self) {
        if let Some(codec) = self.codec.take() {
            if !matches!(
                codec.state(),
                SessionState::Compress(CompressState::Done)
                    | SessionState::Decompress(DecompressState::Done)
            ) {
                warn!("Closing an unfinished {} session.", self.method);
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.codec
            .as_ref()
            .map_or(SessionState::Closed, |codec| codec.state())
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}

/// Drive a whole buffer through a session.
fn run(mode: Mode, config: BzConfig, data: &[u8]) -> Result<Vec<u8>> {
    let mut session = open(Method::Bzip2, mode, config)?;
    session.feed(data)?;
    let mut out = session.poll()?;
    out.extend(session.finish()?);
    session.close();
    Ok(out)
}

/// Compress a whole buffer into one bzip2 stream.
pub fn compress(data: &[u8], config: BzConfig) -> Result<Vec<u8>> {
    run(Mode::Compress, config, data)
}

/// Decompress a whole bzip2 stream (or several concatenated streams).
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    run(Mode::Decompress, BzConfig::default(), data)
}
