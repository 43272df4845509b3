//! The bitstream module forms the I/O subsystem for the BZIP2 engine.
//!
//! BZIP2 is a block-oriented approach to compress data. Nothing in the format is byte aligned
//! except the very start of a stream, so every stage reads and writes arbitrary width bit fields,
//! most significant bit first.
//!
//! Blocks are encoded independently (possibly on different threads) into a BitPacker. The
//! BitWriter then stitches the packed blocks together, bit-exactly, between the stream header and
//! footer. The BitReader walks a byte slice with a bit cursor that can be saved and restored, which
//! lets the decompressor retry a block when more input arrives.
//!
pub mod bitpacker;
pub mod bitreader;
pub mod bitwriter;
