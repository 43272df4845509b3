//! Rust version of the BZIP2 block-sorting compression engine.
//!
//! Version 0.4.0
//!
//! Provides streaming compression and decompression in the standard bzip2 format, so output can
//! be read by any bzip2 decoder and any bzip2 stream can be read back.
//!
//! Utilizes multi-core parallelism. Blocks are independent once their input has been collected,
//! so several blocks are encoded at once and then written out in input order. Highly repetitive
//! data, which is slow for a plain comparison sort, is handed to a prefix-doubling sort once the
//! main sort has used up its work budget.
//!
//! Basic usage goes through [`session`]:
//!
//! ```
//! use bzip2_engine::{compress, decompress, BzConfig};
//!
//! let packed = compress(b"aaaa", BzConfig::default()).unwrap();
//! assert_eq!(decompress(&packed).unwrap(), b"aaaa".to_vec());
//! ```
//!
//! The `bzip2-engine` binary wraps the same API for files:
//!
//! `$> bzip2-engine -z test.txt`
//!
//! This will compress the file and create the file test.txt.bz2.
//! The original file will be deleted unless -k is given.
//!
pub mod bitstream;
pub mod bwt_algorithms;
pub mod compression;
pub mod error;
pub mod huffman_coding;
pub mod session;
pub mod tools;

pub use error::{BzError, Result};
pub use session::{compress, decompress, init, open, Method, Mode, Session, SessionState};
pub use tools::options::BzConfig;
