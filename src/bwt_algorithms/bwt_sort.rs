use super::fallback_sort::fallback_sort;
use crate::error::{BzError, Result};
use crate::tools::freq_count::freqs;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

/// Blocks shorter than this skip the main sort entirely.
const FALLBACK_THRESHOLD: usize = 10_000;
/// Sort buckets on the rayon pool once the block is at least this long.
const PARALLEL_THRESHOLD: usize = 40_000;
/// Ranges at or below this size are finished with an insertion sort.
const SMALL_RANGE: usize = 16;
/// Budget units (compared bytes) per block byte for each step of work factor.
const WORK_SCALE: i64 = 8;

/// Burrows-Wheeler-Transform. Returns the origin pointer (where the unrotated block landed in
/// sorted order) and the last column of the sorted rotations.
pub fn bwt_encode(data: &[u8], work_factor: u32) -> (u32, Vec<u8>) {
    let end = data.len();
    if end == 0 {
        return (0, Vec::new());
    }

    let index = if end < FALLBACK_THRESHOLD {
        debug!("Small block of {} bytes; using fallback sort.", end);
        fallback_sort(data)
    } else {
        let budget = end as i64 * work_factor.clamp(1, 100) as i64 * WORK_SCALE;
        match main_sort(data, budget) {
            Some(index) => index,
            None => {
                warn!("    too repetitive; using fallback sorting algorithm");
                fallback_sort(data)
            }
        }
    };

    // Get key and BWT output
    let mut key = 0_u32;
    let mut bwt = Vec::with_capacity(end);
    for (i, &p) in index.iter().enumerate() {
        if p == 0 {
            key = i as u32;
        }
        bwt.push(data[(p as usize + end - 1) % end]);
    }
    (key, bwt)
}

/// Radix the rotations on their first two bytes, then multikey quicksort each bucket.
/// Returns None if the work budget runs out.
fn main_sort(data: &[u8], budget: i64) -> Option<Vec<u32>> {
    let end = data.len();

    // A double length copy lets every rotation be read as one contiguous slice.
    let mut doubled = Vec::with_capacity(end * 2);
    doubled.extend_from_slice(data);
    doubled.extend_from_slice(data);

    // Bucket by the first two bytes of each rotation.
    let pair = |p: usize| ((doubled[p] as usize) << 8) | doubled[p + 1] as usize;
    let mut starts = vec![0_usize; 65_537];
    (0..end).for_each(|p| starts[pair(p) + 1] += 1);
    for i in 1..starts.len() {
        starts[i] += starts[i - 1];
    }
    let mut index = vec![0_u32; end];
    {
        let mut next = starts.clone();
        for p in 0..end {
            let b = pair(p);
            index[next[b]] = p as u32;
            next[b] += 1;
        }
    }

    // Split the index into one mutable slice per non-trivial bucket.
    let mut buckets: Vec<&mut [u32]> = Vec::new();
    let mut rest: &mut [u32] = &mut index;
    for w in starts.windows(2) {
        let (bucket, tail) = std::mem::take(&mut rest).split_at_mut(w[1] - w[0]);
        rest = tail;
        if bucket.len() > 1 {
            buckets.push(bucket);
        }
    }

    let budget = AtomicI64::new(budget);
    let ok = if end >= PARALLEL_THRESHOLD {
        buckets
            .into_par_iter()
            .all(|bucket| multikey_qsort(bucket, &doubled, end, 2, &budget))
    } else {
        buckets
            .into_iter()
            .all(|bucket| multikey_qsort(bucket, &doubled, end, 2, &budget))
    };

    info!(
        "Main sort finished with {} budget left.",
        budget.load(AtomicOrdering::Relaxed)
    );
    ok.then_some(index)
}

/// Three-way radix quicksort of rotations that share their first `depth` bytes. Works from an
/// explicit stack so long shared prefixes cannot overflow the call stack.
fn multikey_qsort(
    bucket: &mut [u32],
    doubled: &[u8],
    end: usize,
    depth: usize,
    budget: &AtomicI64,
) -> bool {
    let mut stack = vec![(0_usize, bucket.len(), depth)];

    while let Some((lo, hi, d)) = stack.pop() {
        if budget.load(AtomicOrdering::Relaxed) < 0 {
            return false;
        }
        let range = &mut bucket[lo..hi];
        if range.len() < 2 {
            continue;
        }
        if d >= end {
            // Identical rotations keep their original order.
            range.sort_unstable();
            continue;
        }
        if range.len() <= SMALL_RANGE {
            insertion_sort(range, doubled, end, d, budget);
            continue;
        }

        let byte = |p: u32| doubled[p as usize + d];
        let pivot = med3(
            byte(range[0]),
            byte(range[range.len() / 2]),
            byte(range[range.len() - 1]),
        );

        let (mut lt, mut i, mut gt) = (0, 0, range.len());
        while i < gt {
            match byte(range[i]).cmp(&pivot) {
                Ordering::Less => {
                    range.swap(lt, i);
                    lt += 1;
                    i += 1;
                }
                Ordering::Greater => {
                    gt -= 1;
                    range.swap(i, gt);
                }
                Ordering::Equal => i += 1,
            }
        }
        budget.fetch_sub(range.len() as i64, AtomicOrdering::Relaxed);

        stack.push((lo, lo + lt, d));
        stack.push((lo + gt, hi, d));
        stack.push((lo + lt, lo + gt, d + 1));
    }
    true
}

fn med3(a: u8, b: u8, c: u8) -> u8 {
    a.max(b).min(a.min(b).max(c))
}

/// Compare two rotations from byte `depth` on. Returns the ordering and how many bytes it took.
fn rotation_compare(a: u32, b: u32, doubled: &[u8], end: usize, depth: usize) -> (Ordering, usize) {
    let x = &doubled[a as usize + depth..a as usize + end];
    let y = &doubled[b as usize + depth..b as usize + end];
    match x.iter().zip(y).position(|(p, q)| p != q) {
        Some(i) => (x[i].cmp(&y[i]), i + 1),
        None => (a.cmp(&b), end - depth),
    }
}

fn insertion_sort(range: &mut [u32], doubled: &[u8], end: usize, depth: usize, budget: &AtomicI64) {
    let mut work = 0;
    for i in 1..range.len() {
        let mut j = i;
        while j > 0 {
            let (ord, cost) = rotation_compare(range[j - 1], range[j], doubled, end, depth);
            work += cost;
            if ord != Ordering::Greater {
                break;
            }
            range.swap(j - 1, j);
            j -= 1;
        }
    }
    budget.fetch_sub(work as i64, AtomicOrdering::Relaxed);
}

/// Decode a Burrows-Wheeler-Transform.
pub fn bwt_decode(key: u32, bwt_in: &[u8]) -> Result<Vec<u8>> {
    let end = bwt_in.len();
    if key as usize >= end {
        return Err(BzError::MalformedBlock(format!(
            "origin pointer {} outside block of {} bytes",
            key, end
        )));
    }

    // Convert frequency count to a cumulative sum of frequencies
    let freq_in = freqs(bwt_in);
    let mut freq = [0_usize; 256];
    for i in 0..255 {
        freq[i + 1] = freq[i] + freq_in[i] as usize;
    }

    // Build the transformation vector to find the next character in the original data
    let mut t_vec = vec![0_u32; end];
    for (i, &s) in bwt_in.iter().enumerate() {
        t_vec[freq[s as usize]] = i as u32;
        freq[s as usize] += 1
    }

    // Follow the chain from the origin
    let mut out = Vec::with_capacity(end);
    let mut pos = t_vec[key as usize] as usize;
    for _ in 0..end {
        out.push(bwt_in[pos]);
        pos = t_vec[pos] as usize;
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn banana_test() {
        // Rotations of "banana" sorted: abanan, anaban, ananab, banana, nabana, nanaba
        let (key, bwt) = bwt_encode(b"banana", 30);
        assert_eq!(bwt, b"nnbaaa".to_vec());
        assert_eq!(key, 3);
        assert_eq!(bwt_decode(key, &bwt).unwrap(), b"banana".to_vec());
    }

    #[test]
    fn main_sort_matches_fallback_test() {
        let mut rng = StdRng::seed_from_u64(42);
        let text: Vec<u8> = (0..50_000).map(|_| b"abcde "[rng.gen_range(0..6)]).collect();
        let main = main_sort(&text, i64::MAX).unwrap();
        assert_eq!(main, fallback_sort(&text));
    }

    #[test]
    fn repetitive_block_exhausts_budget_test() {
        let data = vec![b'q'; 20_000];
        assert!(main_sort(&data, 20_000).is_none());
        let (key, bwt) = bwt_encode(&data, 1);
        assert_eq!(key, 0);
        assert_eq!(bwt_decode(key, &bwt).unwrap(), data);
    }

    #[test]
    fn round_trip_test() {
        let mut rng = StdRng::seed_from_u64(3);
        for len in [1_usize, 2, 3, 17, 1_000, 12_345, 60_000] {
            let data: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            let (key, bwt) = bwt_encode(&data, 30);
            assert_eq!(bwt_decode(key, &bwt).unwrap(), data, "length {}", len);
        }
        let periodic: Vec<u8> = b"xyz".iter().cycle().take(30_000).copied().collect();
        let (key, bwt) = bwt_encode(&periodic, 30);
        assert_eq!(bwt_decode(key, &bwt).unwrap(), periodic);
    }

    #[test]
    fn bad_key_is_malformed_test() {
        assert!(matches!(
            bwt_decode(6, b"nnbaaa"),
            Err(BzError::MalformedBlock(_))
        ));
        assert!(matches!(bwt_decode(0, b""), Err(BzError::MalformedBlock(_))));
    }
}
