//! The huffman module generates and reads the entropy coded part of each block.
//!
//! BZIP2 is a block-oriented approach to compress data.
//!
//! Huffman encoding is used in lieu of arithmetic encoding because of an historical problem with licensing restrictions.
//! While that has been resolved in more recent years, the BZIP2 standard was set based on the huffman standard.
//!
//! The huffman coding algorithm as used by BZIP2 is both block and chunk oriented. Within each block, chunks of 50
//! symbols are encoded separately using one of two to six huffman tables. This allows for higher compression ratios
//! compared to using one huffman table per block (or for the entire file).
//!
//! Tables are sent as canonical code lengths only; both sides derive the actual codes from the lengths.
//!
//! The process of encoding and decoding each block is inherently sequential and does not benefit from multithreading.
//!
pub mod huffman;
pub mod huffman_code_from_weights;
pub mod huffman_decode;

/// Symbols per selector group.
pub const CHUNK_SIZE: usize = 50;
/// Longest code the encoder will produce.
pub const MAX_CODE_LEN: u8 = 17;
/// Longest code the decoder accepts.
pub const MAX_DECODE_LEN: u8 = 20;
/// Most tables a block may carry.
pub const MAX_TABLES: usize = 6;
/// Most selectors a block may use.
pub const MAX_SELECTORS: usize = 18_002;

/// Assign canonical codes from code lengths: shorter codes first, and within a length in
/// increasing symbol order.
pub fn canonical_codes(lengths: &[u8]) -> Vec<u32> {
    let mut codes = vec![0_u32; lengths.len()];
    let min = lengths.iter().copied().min().unwrap_or(0);
    let max = lengths.iter().copied().max().unwrap_or(0);
    let mut next = 0_u32;
    for len in min..=max {
        for (sym, &l) in lengths.iter().enumerate() {
            if l == len {
                codes[sym] = next;
                next += 1;
            }
        }
        next <<= 1;
    }
    codes
}

#[cfg(test)]
mod test {
    use super::canonical_codes;

    #[test]
    fn canonical_codes_test() {
        // lengths 2,1,3,3 -> B=0, A=10, C=110, D=111
        assert_eq!(canonical_codes(&[2, 1, 3, 3]), vec![0b10, 0b0, 0b110, 0b111]);
    }
}
