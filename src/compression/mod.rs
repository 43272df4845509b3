//! The compression module manages both directions of the BZIP2 engine.
//!
//! BZIP2 compression happens in the following steps:
//! - Run Length Encoding 1: Compress all runs of 4-255 identical bytes.
//! - Burrows Wheeler Transform: Sort the data to increase the probability of runs of identical bytes.
//! - Move To Front transform: Increase the frequency of lower byte values, and thereby decrease the frequency of other byte values.
//! - Run Length Encoding 2: Compress all runs of the zero index.
//! - Huffman coding: Encode frequent symbols using smaller bit codes and less frequent symbols with longer bit codes.
//!
//! While the initial RLE1 compression is probably not necessary, every bzip2 decoder expects it, so it must be preserved.
//!
//! Blocks are independent once their input has been collected, so the compressor encodes whatever
//! blocks are ready in parallel and then frames them strictly in input order.
//!
//! Decompression is single threaded. It follows the inverse of the compression process.
//! - Huffman decoding.
//! - RLE 2: Expand all runs of the zero index.
//! - MTF transform: Convert from the Move-To-Front indexes to the symbols represented by the indexes.
//! - BWT reversal: Restore the original data from the BWT transform.
//! - RLE 1: Expand all runs of 4+ identical bytes.
//!

pub mod compress;
pub mod compress_block;
pub mod decompress;
pub mod decompress_block;
pub mod frame;
