use log::debug;

/// Fallback sort for small blocks or blocks which contain highly repetitive data.
/// Returns the start of every rotation of `data`, in sorted order.
pub fn fallback_sort(data: &[u8]) -> Vec<u32> {
    /*
    This is a kind-of "exponential radix sort" inspired by the Manber-Myers suffix array
    construction algorithm, applied to cyclic rotations instead of suffixes. After each round
    the rotations are ordered by their first h bytes and every rotation carries the rank ("class")
    of that prefix. Ordering by the pair (class of first h, class of next h) then orders by 2h
    bytes. We stop once every class is distinct or h covers the whole block.
    */
    let end = data.len();
    if end == 0 {
        return Vec::new();
    }

    // Initial bucket sort by the first byte. Forward iteration keeps equal bytes in index order.
    let mut starts = [0_usize; 256];
    {
        let mut counts = [0_usize; 256];
        data.iter().for_each(|&b| counts[b as usize] += 1);
        let mut sum = 0;
        for (start, count) in starts.iter_mut().zip(counts.iter()) {
            *start = sum;
            sum += count;
        }
    }
    let mut index = vec![0_u32; end];
    for (i, &b) in data.iter().enumerate() {
        index[starts[b as usize]] = i as u32;
        starts[b as usize] += 1;
    }

    let mut class = vec![0_u32; end];
    let mut classes = 1_usize;
    for i in 1..end {
        if data[index[i] as usize] != data[index[i - 1] as usize] {
            classes += 1;
        }
        class[index[i] as usize] = (classes - 1) as u32;
    }

    let mut shifted = vec![0_u32; end];
    let mut new_class = vec![0_u32; end];
    let mut counts = vec![0_u32; end];
    let mut h = 1;

    while h < end && classes < end {
        // Rotations sorted by their second half: step back h from each sorted position.
        for (s, &p) in shifted.iter_mut().zip(index.iter()) {
            *s = ((p as usize + end - h) % end) as u32;
        }

        // Stable counting sort by the class of the first half.
        counts[..classes].iter_mut().for_each(|c| *c = 0);
        shifted
            .iter()
            .for_each(|&p| counts[class[p as usize] as usize] += 1);
        for c in 1..classes {
            counts[c] += counts[c - 1];
        }
        for &p in shifted.iter().rev() {
            let bucket = class[p as usize] as usize;
            counts[bucket] -= 1;
            index[counts[bucket] as usize] = p;
        }

        // Re-rank on the (first half, second half) pair.
        let key = |p: u32| {
            (
                class[p as usize],
                class[(p as usize + h) % end],
            )
        };
        new_class[index[0] as usize] = 0;
        classes = 1;
        for i in 1..end {
            if key(index[i]) != key(index[i - 1]) {
                classes += 1;
            }
            new_class[index[i] as usize] = (classes - 1) as u32;
        }
        std::mem::swap(&mut class, &mut new_class);
        h <<= 1;
    }

    // Only periodic blocks leave classes shared: those rotations are identical and must stay
    // in their original order.
    if classes < end {
        debug!("Block is periodic: {} distinct rotations of {}.", classes, end);
        let mut run_start = 0;
        for i in 1..=end {
            if i == end || class[index[i] as usize] != class[index[run_start] as usize] {
                index[run_start..i].sort_unstable();
                run_start = i;
            }
        }
    }

    index
}
