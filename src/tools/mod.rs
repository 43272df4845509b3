//! The tools module provides the helper stages of the BZIP2 engine.
//!
//! BZIP2 is a block-oriented approach to compress data.
//!
//! The tools are:
//! - cli: Command line interface for the bzip2-engine binary.
//! - crc: CRC32 checksum for BZIP2, both block and stream versions.
//! - freq_count: Frequency count of byte values.
//! - options: Engine configuration and its validation.
//! - rle1: Run-Length-Encoding phase 1, applied to the raw input before sorting.
//! - rle2_mtf: Move-To-Front transform and Run-Length-Encoding phase 2 (integrated for speed).
//! - symbol_map: Encode and decode the symbol map used in BZIP2.
//!
pub mod cli;
pub mod crc;
pub mod freq_count;
pub mod options;
pub mod rle1;
pub mod rle2_mtf;
pub mod symbol_map;
