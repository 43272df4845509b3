use bzip2_engine::session::{compress, decompress, open, Method, Mode, SessionState};
use bzip2_engine::{BzConfig, BzError};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

/// Text-like data: a small alphabet with plenty of repeats.
fn texty_bytes(len: usize, seed: u64) -> Vec<u8> {
    let words: [&[u8]; 8] = [
        b"the ", b"quick ", b"brown ", b"fox ", b"jumps ", b"over ", b"lazy ", b"dogs.\n",
    ];
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(len + 8);
    while out.len() < len {
        out.extend_from_slice(words[rng.gen_range(0..words.len())]);
    }
    out.truncate(len);
    out
}

/// Feed `data` through a session `chunk` bytes at a time, collecting output as it appears.
fn run_chunked(mode: Mode, config: BzConfig, data: &[u8], chunk: usize) -> Result<Vec<u8>, BzError> {
    let mut s = open(Method::Bzip2, mode, config)?;
    let mut out = Vec::new();
    for piece in data.chunks(chunk) {
        assert_eq!(s.feed(piece)?, piece.len());
        out.extend(s.poll()?);
    }
    out.extend(s.finish()?);
    Ok(out)
}

/// Number of block magics in a stream, at any bit offset. A chance match inside coded data is
/// about one in 2^48 per bit position.
fn count_block_magics(stream: &[u8]) -> usize {
    let mut count = 0;
    let bits: Vec<bool> = stream
        .iter()
        .flat_map(|b| (0..8).rev().map(move |i| b >> i & 1 == 1))
        .collect();
    let magic: Vec<bool> = [0x31_u8, 0x41, 0x59, 0x26, 0x53, 0x59]
        .iter()
        .flat_map(|b| (0..8).rev().map(move |i| b >> i & 1 == 1))
        .collect();
    for w in bits.windows(magic.len()) {
        if w == magic.as_slice() {
            count += 1;
        }
    }
    count
}

#[test]
fn empty_input_test() {
    let packed = compress(b"", BzConfig::default()).unwrap();
    assert_eq!(
        packed,
        vec![b'B', b'Z', b'h', b'9', 0x17, 0x72, 0x45, 0x38, 0x50, 0x90, 0, 0, 0, 0]
    );
    assert!(decompress(&packed).unwrap().is_empty());
}

#[test]
fn aaaa_test() {
    let packed = compress(b"aaaa", BzConfig::default()).unwrap();
    assert_eq!(&packed[..4], b"BZh9");
    assert_eq!(decompress(&packed).unwrap(), b"aaaa".to_vec());
}

#[test]
fn known_stream_test() {
    // "hello\n" as written by the reference bzip2 -9.
    let packed: [u8; 42] = [
        0x42, 0x5a, 0x68, 0x39, 0x31, 0x41, 0x59, 0x26, 0x53, 0x59, 0xc1, 0xc0, 0x80, 0xe2, 0x00,
        0x00, 0x01, 0x41, 0x00, 0x00, 0x10, 0x02, 0x44, 0xa0, 0x00, 0x30, 0xcd, 0x00, 0xc3, 0x46,
        0x29, 0x97, 0x17, 0x72, 0x45, 0x38, 0x50, 0x90, 0xc1, 0xc0, 0x80, 0xe2,
    ];
    assert_eq!(decompress(&packed).unwrap(), b"hello\n".to_vec());
}

#[test]
fn block_sizes_test() {
    let data = texty_bytes(250_000, 1);
    for level in [1_u8, 2, 5, 9] {
        let config = BzConfig::default().with_block_size(level);
        let packed = compress(&data, config).unwrap();
        assert_eq!(packed[3], b'0' + level);
        assert!(packed.len() < data.len() / 2);
        assert_eq!(decompress(&packed).unwrap(), data);
    }
}

#[test]
fn exact_block_boundary_test() {
    // 100k class blocks seal once 99,981 RLE1 bytes are flushed; the byte still pending as a
    // run joins the block. Data without runs of 99,981 or 99,982 bytes fits in one block.
    let config = BzConfig::default().with_block_size(1);
    for len in [99_981_u32, 99_982] {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let packed = compress(&data, config).unwrap();
        assert_eq!(count_block_magics(&packed), 1, "length {}", len);
        assert_eq!(decompress(&packed).unwrap(), data);
    }

    // One more byte starts a second block.
    let data: Vec<u8> = (0..99_983_u32).map(|i| (i % 251) as u8).collect();
    let packed = compress(&data, config).unwrap();
    assert_eq!(count_block_magics(&packed), 2);
    assert_eq!(decompress(&packed).unwrap(), data);
}

#[test]
fn random_data_overhead_test() {
    let data = random_bytes(1 << 20, 42);
    let packed = compress(&data, BzConfig::default()).unwrap();
    // Incompressible input grows by well under one percent.
    assert!(packed.len() < data.len() + data.len() / 100);
    assert_eq!(decompress(&packed).unwrap(), data);
}

#[test]
fn repetitive_data_test() {
    // Long periodic input exhausts the main sort budget and takes the fallback sort.
    let data = b"abcabcabd".repeat(60_000);
    for wf in [0, 1, 10] {
        let config = BzConfig::default().with_work_factor(wf);
        let packed = compress(&data, config).unwrap();
        assert!(packed.len() < 2_000);
        assert_eq!(decompress(&packed).unwrap(), data);
    }
}

#[test]
fn long_runs_test() {
    let mut data = vec![0_u8; 300_000];
    data.extend(std::iter::repeat(b'x').take(1_000));
    data.extend(b"tail");
    data.extend(vec![255_u8; 70_000]);
    let packed = compress(&data, BzConfig::default().with_block_size(1)).unwrap();
    assert_eq!(decompress(&packed).unwrap(), data);
}

#[test]
fn all_byte_values_test() {
    let data: Vec<u8> = (0..=255_u8).cycle().take(5_000).collect();
    let packed = compress(&data, BzConfig::default()).unwrap();
    assert_eq!(decompress(&packed).unwrap(), data);
}

#[test]
fn chunked_feed_test() {
    let data = texty_bytes(120_000, 7);
    let config = BzConfig::default().with_block_size(1);
    let whole = compress(&data, config).unwrap();

    // Compressed output does not depend on how the input was split.
    for chunk in [1_usize, 777, 65_536] {
        let packed = run_chunked(Mode::Compress, config, &data, chunk).unwrap();
        assert_eq!(packed, whole);
    }

    // The decompressor accepts the stream split anywhere, including mid-field.
    for chunk in [1_usize, 13, 4_096] {
        let out = run_chunked(Mode::Decompress, config, &whole, chunk).unwrap();
        assert_eq!(out, data);
    }
}

#[test]
fn concatenated_streams_test() {
    let first = compress(b"first part, ", BzConfig::default()).unwrap();
    let second = compress(b"second part", BzConfig::default().with_block_size(3)).unwrap();
    let mut both = first;
    both.extend(second);
    assert_eq!(
        decompress(&both).unwrap(),
        b"first part, second part".to_vec()
    );
}

#[test]
fn trailing_garbage_test() {
    let mut packed = compress(b"payload", BzConfig::default()).unwrap();
    packed.extend_from_slice(b"\0\0garbage");
    assert!(matches!(decompress(&packed), Err(BzError::CorruptFrame(_))));
}

#[test]
fn corruption_detected_test() {
    let data = texty_bytes(20_000, 3);
    let packed = compress(&data, BzConfig::default()).unwrap();
    let mut rng = StdRng::seed_from_u64(99);
    // Skip the stream header and the last byte, which may hold ignored padding bits.
    for _ in 0..40 {
        let mut bad = packed.clone();
        let at = rng.gen_range(4..bad.len() - 1);
        bad[at] ^= 1 << rng.gen_range(0..8);
        match decompress(&bad) {
            Ok(out) => panic!("corruption at byte {} went unnoticed ({} bytes out)", at, out.len()),
            Err(BzError::SessionClosed) | Err(BzError::Config(_)) | Err(BzError::Io(_)) => {
                panic!("unexpected error kind for corruption at byte {}", at)
            }
            Err(_) => {}
        }
    }
}

#[test]
fn bad_header_test() {
    let mut packed = compress(b"abc", BzConfig::default()).unwrap();
    packed[0] = b'b';
    assert!(matches!(decompress(&packed), Err(BzError::CorruptFrame(_))));

    let mut packed = compress(b"abc", BzConfig::default()).unwrap();
    packed[3] = b'0';
    assert!(matches!(decompress(&packed), Err(BzError::CorruptFrame(_))));
}

#[test]
fn truncated_stream_test() {
    let data = texty_bytes(50_000, 5);
    let packed = compress(&data, BzConfig::default()).unwrap();
    for cut in [0, 3, 10, packed.len() / 2, packed.len() - 1] {
        assert!(
            matches!(decompress(&packed[..cut]), Err(BzError::TruncatedStream(_))),
            "cut at {}",
            cut
        );
    }
}

#[test]
fn config_rejected_at_open_test() {
    for config in [
        BzConfig::default().with_block_size(0),
        BzConfig::default().with_block_size(10),
        BzConfig::default().with_work_factor(251),
        BzConfig::default().with_iterations(0),
    ] {
        assert!(matches!(
            open(Method::Bzip2, Mode::Compress, config),
            Err(BzError::Config(_))
        ));
    }
}

#[test]
fn use_after_finish_test() {
    let mut s = open(Method::Bzip2, Mode::Compress, BzConfig::default()).unwrap();
    s.feed(b"data").unwrap();
    s.finish().unwrap();
    assert!(matches!(s.feed(b"more"), Err(BzError::SessionClosed)));
    assert!(matches!(s.poll(), Err(BzError::SessionClosed)));
    assert!(matches!(s.finish(), Err(BzError::SessionClosed)));
}

#[test]
fn failed_session_is_poisoned_test() {
    let mut s = open(Method::Bzip2, Mode::Decompress, BzConfig::default()).unwrap();
    assert!(matches!(s.feed(b"PK\x03\x04"), Err(BzError::CorruptFrame(_))));
    assert!(matches!(s.feed(b"BZh9"), Err(BzError::SessionClosed)));
    assert!(matches!(s.state(), SessionState::Decompress(_)));
}

#[test]
fn sessions_on_threads_test() {
    let handles: Vec<_> = (0..4_u64)
        .map(|seed| {
            std::thread::spawn(move || {
                let data = texty_bytes(80_000, seed);
                let packed = compress(&data, BzConfig::default().with_block_size(1)).unwrap();
                assert_eq!(decompress(&packed).unwrap(), data);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}
