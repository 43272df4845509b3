//! Huffman decoding: reads the table count, selectors and code length tables written by
//! huf_encode, rebuilds the canonical codes and decodes the symbol stream up to the EOB symbol.

use log::{error, trace, warn};

use super::{CHUNK_SIZE, MAX_DECODE_LEN, MAX_SELECTORS, MAX_TABLES};
use crate::bitstream::bitreader::BitReader;
use crate::error::{BzError, Result};

/// Canonical decoding table for one set of code lengths.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    /// Shortest code length in use.
    min_len: u8,
    /// Longest code length in use.
    max_len: u8,
    /// First code of each length.
    first_code: [u32; MAX_DECODE_LEN as usize + 1],
    /// Number of codes of each length.
    count: [u32; MAX_DECODE_LEN as usize + 1],
    /// Index into `symbols` of the first code of each length.
    offset: [u32; MAX_DECODE_LEN as usize + 1],
    /// Symbols sorted by (length, symbol).
    symbols: Vec<u16>,
}

impl HuffmanTable {
    /// Build a decoding table from per-symbol code lengths. Every symbol of the alphabet must have
    /// a length of 1..=20, and the lengths must satisfy the Kraft inequality.
    pub fn from_lengths(lengths: &[u8]) -> Result<Self> {
        if lengths.is_empty() {
            return Err(BzError::InvalidHuffmanTable("empty alphabet".into()));
        }
        let mut count = [0_u32; MAX_DECODE_LEN as usize + 1];
        for (sym, &len) in lengths.iter().enumerate() {
            if !(1..=MAX_DECODE_LEN).contains(&len) {
                return Err(BzError::InvalidHuffmanTable(format!(
                    "symbol {} has code length {}",
                    sym, len
                )));
            }
            count[len as usize] += 1;
        }

        // Kraft: the sum of 2^-len may not exceed 1.
        let kraft: u64 = lengths
            .iter()
            .map(|&len| 1_u64 << (MAX_DECODE_LEN - len))
            .sum();
        if kraft > 1 << MAX_DECODE_LEN {
            return Err(BzError::InvalidHuffmanTable(format!(
                "code lengths oversubscribe the code space ({}/{})",
                kraft,
                1_u64 << MAX_DECODE_LEN
            )));
        }

        let min_len = lengths.iter().copied().min().unwrap_or(1);
        let max_len = lengths.iter().copied().max().unwrap_or(1);

        let mut first_code = [0_u32; MAX_DECODE_LEN as usize + 1];
        let mut offset = [0_u32; MAX_DECODE_LEN as usize + 1];
        let mut code = 0_u32;
        let mut index = 0_u32;
        for len in 1..=MAX_DECODE_LEN as usize {
            code = (code + count[len - 1]) << 1;
            first_code[len] = code;
            offset[len] = index;
            index += count[len];
        }

        let mut symbols: Vec<u16> = (0..lengths.len() as u16).collect();
        symbols.sort_by_key(|&s| lengths[s as usize]);

        Ok(Self {
            min_len,
            max_len,
            first_code,
            count,
            offset,
            symbols,
        })
    }

    /// Read one symbol from the bitstream.
    pub fn decode_symbol(&self, br: &mut BitReader<'_>) -> Result<u16> {
        let mut len = self.min_len;
        let mut code = br.bint(len as u32)?;
        loop {
            let l = len as usize;
            if code >= self.first_code[l] && code - self.first_code[l] < self.count[l] {
                let idx = self.offset[l] + code - self.first_code[l];
                return Ok(self.symbols[idx as usize]);
            }
            if len >= self.max_len {
                return Err(BzError::MalformedBlock(format!(
                    "bit pattern at {} matches no huffman code",
                    br.loc()
                )));
            }
            code = (code << 1) | br.bit()? as u32;
            len += 1;
        }
    }
}

/// Read the huffman section of a block (everything after the symbol map) and return the decoded
/// RLE2 symbols, excluding the EOB symbol. `max_symbols` bounds how many symbols the block may
/// hold before it is considered malformed.
pub fn huf_decode(br: &mut BitReader<'_>, alpha_size: usize, max_symbols: usize) -> Result<Vec<u16>> {
    let eob = (alpha_size - 1) as u16;

    // Read the table count
    let table_count = br.bint(3)? as usize;
    if !(2..=MAX_TABLES).contains(&table_count) {
        error!("Invalid table count {}", table_count);
        return Err(BzError::CorruptFrame(format!(
            "table count {} not in 2..=6",
            table_count
        )));
    }

    // Read the selector count, and then the selectors.
    let selector_count = br.bint(15)? as usize;
    if selector_count == 0 {
        return Err(BzError::CorruptFrame("block has no selectors".into()));
    }
    if selector_count > MAX_SELECTORS {
        warn!(
            "Found {} selectors, but the maximum is {}. Ignoring the excess.",
            selector_count, MAX_SELECTORS
        );
    }
    let mut table_idx: Vec<u8> = (0..table_count as u8).collect();
    let mut selectors = Vec::with_capacity(selector_count.min(MAX_SELECTORS));
    for _ in 0..selector_count {
        let mut idx = 0;
        while br.bit()? {
            idx += 1;
            if idx >= table_count {
                return Err(BzError::CorruptFrame(format!(
                    "selector mtf value {} for {} tables",
                    idx, table_count
                )));
            }
        }
        // Undo the move to the front.
        let table = table_idx[idx];
        table_idx[..=idx].rotate_right(1);
        if selectors.len() < MAX_SELECTORS {
            selectors.push(table);
        }
    }
    trace!("Decoded {} selectors for {} tables.", selectors.len(), table_count);

    // Read the code lengths and build the decode tables
    let mut tables = Vec::with_capacity(table_count);
    for t in 0..table_count {
        let mut lengths = vec![0_u8; alpha_size];
        let mut current = br.bint(5)? as i32;
        for len in lengths.iter_mut() {
            loop {
                if !(1..=MAX_DECODE_LEN as i32).contains(&current) {
                    return Err(BzError::InvalidHuffmanTable(format!(
                        "code length {} in table {}",
                        current, t
                    )));
                }
                if !br.bit()? {
                    break;
                }
                if br.bit()? {
                    current -= 1;
                } else {
                    current += 1;
                }
            }
            *len = current as u8;
        }
        tables.push(HuffmanTable::from_lengths(&lengths)?);
    }

    // Now read the data in chunks of 50 symbols using the table named by each selector
    let mut out = Vec::with_capacity(max_symbols.min(1 << 16));
    let mut group = 0;
    loop {
        let Some(&selector) = selectors.get(group) else {
            return Err(BzError::MalformedBlock(format!(
                "data runs past the last of {} selectors",
                selectors.len()
            )));
        };
        let table = &tables[selector as usize];
        for _ in 0..CHUNK_SIZE {
            let sym = table.decode_symbol(br)?;
            if sym == eob {
                return Ok(out);
            }
            if out.len() >= max_symbols {
                return Err(BzError::MalformedBlock(format!(
                    "block holds more than {} symbols",
                    max_symbols
                )));
            }
            out.push(sym);
        }
        group += 1;
    }
}
