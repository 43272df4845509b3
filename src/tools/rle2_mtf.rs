//! Perform run-length-encoding and move-to-front transforms for the BZIP2 engine.
//!
//! The move-to-front transform will increase the frequency of lower byte values. The result of this is that
//! the huffman codes can more efficiently compress those high frequency bytes.
//!
//! The run-length-encoding will compress runs of the zero index regardless of the number of zeros found. The
//! number of zeros found is encoded in a bijective base-2 scheme using the two symbols RUNA and RUNB.
//! Since the move-to-front transform will increase the frequency of zero indexes, this reduces the symbol count
//! significantly for most data.
//!
//! Encoding also returns a frequency table and symbol map used during the huffman stage.
//!
use super::symbol_map::encode_sym_map;
use crate::error::{BzError, Result};
use log::error;

pub const RUNA: u16 = 0;
pub const RUNB: u16 = 1;
/// Largest alphabet: RUNA, RUNB, 255 non-zero MTF positions and EOB.
pub const MAX_ALPHA_SIZE: usize = 258;

/// Output of the MTF/RLE2 stage for one block.
#[derive(Debug, Clone)]
pub struct Rle2Block {
    /// RLE2 symbols, terminated by the EOB symbol.
    pub symbols: Vec<u16>,
    /// How often each symbol occurs in `symbols`.
    pub freqs: [u32; MAX_ALPHA_SIZE],
    /// Symbol map for the block header.
    pub sym_map: Vec<u16>,
    /// The end-of-block symbol, which is also the largest symbol in use.
    pub eob: u16,
}

/// Push the RUNA/RUNB digits for a run of `zeros` zero indexes.
fn push_zero_run(zeros: usize, out: &mut Vec<u16>, freqs: &mut [u32; MAX_ALPHA_SIZE]) {
    let mut n = zeros;
    while n > 0 {
        n -= 1;
        let sym = (n & 1) as u16;
        out.push(sym);
        freqs[sym as usize] += 1;
        n >>= 1;
    }
}

/// Does Move-To-Front transform and Run-Length-Encoding 2 prior to the huffman stage.
/// Receives a block of BWT data.
pub fn rle2_mtf_encode(block: &[u8]) -> Rle2Block {
    // Start by finding every u8 in the input.
    let mut in_use = [false; 256];
    block.iter().for_each(|&b| in_use[b as usize] = true);

    // The MTF list starts as the used byte values in increasing order
    let mut mtf_index: Vec<u8> = (0..=255_u8).filter(|&b| in_use[b as usize]).collect();

    // Get the EOB value: RUNA and RUNB take the first two symbol values
    let eob = mtf_index.len() as u16 + 1;
    let sym_map = encode_sym_map(&in_use);

    let mut zeros = 0_usize;
    let mut symbols = Vec::with_capacity(block.len() + 1);
    let mut freqs = [0_u32; MAX_ALPHA_SIZE];

    for byte in block {
        // Every byte is in the list, so position cannot fail.
        let idx = mtf_index.iter().position(|c| c == byte).unwrap_or(0);
        if idx == 0 {
            zeros += 1;
            continue;
        }
        // Not a zero, so output any pending zeros first
        push_zero_run(zeros, &mut symbols, &mut freqs);
        zeros = 0;

        let sym = idx as u16 + 1;
        symbols.push(sym);
        freqs[sym as usize] += 1;

        // Move the byte to the front of the list.
        mtf_index[..=idx].rotate_right(1);
    }

    // Write any trailing zeros, then the EOB symbol
    push_zero_run(zeros, &mut symbols, &mut freqs);
    symbols.push(eob);
    freqs[eob as usize] += 1;

    Rle2Block {
        symbols,
        freqs,
        sym_map,
        eob,
    }
}

/// Does run-length-decoding and MTF decoding.
/// Takes huffman decoder output (without the EOB), the symbol set from the symbol map, and the
/// maximum number of bytes the block may hold.
pub fn rle2_mtf_decode(data_in: &[u16], symbol_set: &[u8], max_len: usize) -> Result<Vec<u8>> {
    let mut mtf_index = symbol_set.to_vec();
    if mtf_index.is_empty() {
        return Err(BzError::MalformedBlock("block has an empty symbol map".into()));
    }
    let mut out: Vec<u8> = Vec::with_capacity(max_len.min(data_in.len() * 2));

    // Pending zero run and the weight of the next RUNA/RUNB digit
    let mut zeros = 0_usize;
    let mut bit_multiplier = 1_usize;

    for &rle2_code in data_in {
        match rle2_code {
            RUNA | RUNB => {
                zeros += bit_multiplier << rle2_code;
                bit_multiplier <<= 1;
                if zeros > max_len {
                    error!("Run of {} zeros exceeds the block size of {}.", zeros, max_len);
                    return Err(BzError::MalformedBlock(format!(
                        "run of {} exceeds block size {}",
                        zeros, max_len
                    )));
                }
            }
            n => {
                flush_zeros(&mut out, mtf_index[0], zeros, max_len)?;
                zeros = 0;
                bit_multiplier = 1;

                let mtf_code = n as usize - 1;
                if mtf_code >= mtf_index.len() {
                    return Err(BzError::MalformedBlock(format!(
                        "mtf index {} outside symbol set of {}",
                        mtf_code,
                        mtf_index.len()
                    )));
                }
                if out.len() >= max_len {
                    return Err(BzError::MalformedBlock(format!(
                        "block expands beyond {} bytes",
                        max_len
                    )));
                }
                out.push(mtf_index[mtf_code]);
                mtf_index[..=mtf_code].rotate_right(1);
            }
        }
    }
    // Output trailing zeros from RUNA/RUNB sequences, if any
    flush_zeros(&mut out, mtf_index[0], zeros, max_len)?;
    Ok(out)
}

fn flush_zeros(out: &mut Vec<u8>, byte: u8, zeros: usize, max_len: usize) -> Result<()> {
    if zeros == 0 {
        return Ok(());
    }
    if out.len() + zeros > max_len {
        error!(
            "Run of {} zeros overflows the block ({} of {} bytes used).",
            zeros,
            out.len(),
            max_len
        );
        return Err(BzError::MalformedBlock(format!(
            "run of {} overflows block of {} bytes",
            zeros, max_len
        )));
    }
    out.extend(std::iter::repeat(byte).take(zeros));
    Ok(())
}
