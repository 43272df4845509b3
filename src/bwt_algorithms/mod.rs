//! The bwt_algorithms module forms the critical sorting subsystem of the BZIP2 engine.
//!
//! BZIP2 uses the Burrows-Wheeler Transform (BWT) to prepare data for compression. This transform alters the data in such
//! a way that runs of similar bytes are more likely to occur. This allows for more effective compression.
//!
//! The Burrows-Wheeler Transform requires "computationally expensive" sorting of every cyclic rotation of a block. Since
//! different sorting algorithms are better suited for different kinds of data, this module contains two:
//! - main sort: a two byte radix split followed by a multikey quicksort of each bucket. Fast on typical data, but the
//!   work it does grows with the length of repeated substrings, so it runs against a budget set by the work factor.
//! - fallback sort: prefix doubling over the rotations. Always O(n log n), used for small or highly repetitive blocks.
//!
//! Both produce the same permutation: rotations in increasing order, identical rotations in original order.
//!
pub mod bwt_sort;
pub mod fallback_sort;
