use log::{debug, trace};

use super::huffman_code_from_weights::code_len_from_weights;
use super::{canonical_codes, CHUNK_SIZE, MAX_CODE_LEN, MAX_TABLES};
use crate::bitstream::bitpacker::BitPacker;
use crate::tools::rle2_mtf::{Rle2Block, MAX_ALPHA_SIZE};

/// Number of coding tables for a block with `symbols` RLE2 symbols.
pub fn table_count(symbols: usize) -> usize {
    match symbols {
        0..=199 => 2,
        200..=599 => 3,
        600..=1199 => 4,
        1200..=2399 => 5,
        _ => 6,
    }
}

/// Starting code lengths. The symbol range is cut into `table_count` slices of roughly equal
/// total frequency; each table favours (length 0) its own slice and penalises (length 15) the
/// rest. The iterations in huf_encode turn these into real code lengths.
fn init_tables(freqs: &[u32], table_count: usize, total: usize) -> Vec<Vec<u8>> {
    let alpha_size = freqs.len();
    let mut tables = vec![vec![15_u8; alpha_size]; table_count];

    let mut parts_left = table_count;
    let mut remaining = total as i64;
    let mut start = 0_i64;
    while parts_left > 0 {
        let target = remaining / parts_left as i64;
        let mut stop = start - 1;
        let mut got = 0_i64;
        while got < target && stop < alpha_size as i64 - 1 {
            stop += 1;
            got += freqs[stop as usize] as i64;
        }
        // Alternate slices give back their last symbol, which evens out the split.
        if stop > start
            && parts_left != table_count
            && parts_left != 1
            && (table_count - parts_left) % 2 == 1
        {
            got -= freqs[stop as usize] as i64;
            stop -= 1;
        }
        let table = &mut tables[parts_left - 1];
        for sym in start.max(0)..=stop {
            table[sym as usize] = 0;
        }
        parts_left -= 1;
        start = stop + 1;
        remaining -= got;
    }
    tables
}

/// Encode MTF/RLE2 data using the multi-table system.
/// We need a BitPacker, the RLE2 block, and the number of refinement passes (4 is traditional).
/// Writes the table count, selectors, code length tables and the coded symbols.
pub fn huf_encode(bw: &mut BitPacker, block: &Rle2Block, iterations: usize) {
    let symbols = &block.symbols;
    let alpha_size = block.eob as usize + 1;
    let table_count = table_count(symbols.len());
    let selector_count = (symbols.len() + CHUNK_SIZE - 1) / CHUNK_SIZE;

    let mut tables = init_tables(&block.freqs[..alpha_size], table_count, symbols.len());
    let mut selectors = vec![0_u8; selector_count];

    /*
    Move through the input 50 symbols at a time. For each chunk we compute the table with the
    lowest cost and record it in the selector table. The frequencies seen by each table are then
    used to rebuild its code lengths, and the whole thing is repeated.
    */
    for iter in 0..iterations {
        let mut favorites = [0_usize; MAX_TABLES];
        let mut total_cost = 0_u64;
        let mut rfreq = vec![[0_u32; MAX_ALPHA_SIZE]; table_count];

        for (chunk, selector) in symbols.chunks(CHUNK_SIZE).zip(selectors.iter_mut()) {
            let mut cost = [0_u64; MAX_TABLES];
            chunk.iter().for_each(|&sym| {
                (0..table_count).for_each(|t| cost[t] += tables[t][sym as usize] as u64)
            });

            // Lowest cost wins; the first table wins a tie.
            let mut bt = 0;
            for t in 1..table_count {
                if cost[t] < cost[bt] {
                    bt = t;
                }
            }
            total_cost += cost[bt];
            favorites[bt] += 1;
            *selector = bt as u8;
            chunk
                .iter()
                .for_each(|&sym| rfreq[bt][sym as usize] += 1);
        }

        debug!(
            " pass {}: size is {}, grp uses are {:?}",
            iter + 1,
            total_cost / 8,
            &favorites[..table_count]
        );

        for (table, freq) in tables.iter_mut().zip(rfreq.iter()) {
            *table = code_len_from_weights(&freq[..alpha_size], MAX_CODE_LEN);
        }
    }

    // Table count (3 bits) and selector count (15 bits)
    trace!("\r\x1b[43mTable count written at {}.     \x1b[0m", bw.loc());
    bw.write_bits(table_count as u32, 3);
    bw.write_bits(selector_count as u32, 15);

    /*
    Selectors tell us which table is to be used for each 50 symbol chunk of input
    data in this block. They are written after a Move-To-Front transform, in unary.
    */
    let mut table_idx: Vec<u8> = (0..table_count as u8).collect();
    for &selector in &selectors {
        let idx = table_idx
            .iter()
            .position(|&t| t == selector)
            .unwrap_or(0);
        table_idx[..=idx].rotate_right(1);
        for _ in 0..idx {
            bw.bit(true);
        }
        bw.bit(false);
    }

    /*
    Code lengths are written as a five bit start value followed, for each symbol, by a
    sequence of adjustments: "10" adds one, "11" subtracts one, "0" ends the symbol.
    */
    trace!("\r\x1b[43mCode lengths written at {}.     \x1b[0m", bw.loc());
    for table in &tables {
        let mut current = table[0];
        bw.write_bits(current as u32, 5);
        for &len in table {
            while current < len {
                bw.write_bits(0b10, 2);
                current += 1;
            }
            while current > len {
                bw.write_bits(0b11, 2);
                current -= 1;
            }
            bw.bit(false);
        }
    }

    // And finally the data itself
    trace!("\r\x1b[43mHuffman data written at {}.     \x1b[0m", bw.loc());
    let codes: Vec<Vec<u32>> = tables.iter().map(|t| canonical_codes(t)).collect();
    for (chunk, &selector) in symbols.chunks(CHUNK_SIZE).zip(selectors.iter()) {
        let (code, len) = (&codes[selector as usize], &tables[selector as usize]);
        for &sym in chunk {
            bw.write_bits(code[sym as usize], len[sym as usize] as u32);
        }
    }
}
