const BIT_MASK: u16 = 0x8000;

/// Takes a 256 entry table of which byte values occur in a block and returns a bzip2 symbol
/// map. The first word marks which ranges of 16 byte values are present; one word follows for
/// each marked range.
pub fn encode_sym_map(in_use: &[bool; 256]) -> Vec<u16> {
    /*
       There are 256 possible u8s, which equals 16 sets of 16 u8s. This means we can indicate
       the existence of every u8 in the input by setting bits in 16 16-bit words.
       Since many files contain only a subset of the full u8 set, we can save space by only
       including those 16-bit words that have at least one bit set.
    */
    let mut sym_maps: Vec<u16> = vec![0; 17]; // Index and 16 maps

    in_use.iter().enumerate().for_each(|(idx, &used)| {
        if used {
            // Idx/16 (idx>>4) marks the map index
            sym_maps[0] |= BIT_MASK >> (idx >> 4);
            // The last 4 bits of idx mark the symbol within that set
            sym_maps[1 + (idx >> 4)] |= BIT_MASK >> (idx & 15)
        }
    });

    // Keep the index word, then only those maps that have bits set.
    let index = sym_maps[0];
    let mut out = vec![index];
    out.extend(sym_maps[1..].iter().filter(|&&map| map > 0));
    out
}

/// Takes the unique bzip2 symbol map and returns a sorted vec of all
/// u8s used in the block.
pub fn decode_sym_map(symbol_map: &[u16]) -> Vec<u8> {
    /*
    Symbol_map[0] is a map of the presence/absence of ranges of u8s in the block.
    For example, if the first bit of maps[0] is a zero, then none of the u8s from 0-15 were
    present, AND there is no u16 for that range. If the second bit is a one, then at least one
    u8 from 16-31 was present and the next u16 is a bit map for that range.
    */
    let mut symbols: Vec<u8> = Vec::with_capacity(256);
    // Set a counter for the number of maps
    let mut map_idx = 0;

    for range in 0..16_u8 {
        if (symbol_map[0] & (BIT_MASK >> range)) > 0 {
            map_idx += 1;
            let Some(&map) = symbol_map.get(map_idx) else {
                break;
            };
            for byte_idx in 0..16_u8 {
                if (map & (BIT_MASK >> byte_idx)) > 0 {
                    // range * 16 + byte_idx = u8 value we found
                    symbols.push((range << 4) + byte_idx);
                };
            }
        }
    }
    symbols
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decode_symbol_map_test() {
        let maps = vec![11008, 32770, 4, 17754, 6208];
        let mut compare = "Making a silly test.".as_bytes().to_vec();
        compare.sort_unstable();
        compare.dedup();
        assert_eq!(compare, decode_sym_map(&maps));
    }

    #[test]
    fn decode_symbol_map_full_test() {
        let maps = vec![0xffff; 17];
        let compare = (0..=255).collect::<Vec<u8>>();
        assert_eq!(compare, decode_sym_map(&maps));
    }

    #[test]
    fn encode_matches_known_map_test() {
        let mut in_use = [false; 256];
        "Making a silly test."
            .bytes()
            .for_each(|b| in_use[b as usize] = true);
        assert_eq!(encode_sym_map(&in_use), vec![11008, 32770, 4, 17754, 6208]);
    }
}
