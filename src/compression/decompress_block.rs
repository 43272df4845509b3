use log::{debug, error};

use super::frame::{read_sym_map, BlockHeader, BLOCK_SIZE_BASE};
use crate::bitstream::bitreader::BitReader;
use crate::bwt_algorithms::bwt_sort::bwt_decode;
use crate::error::{BzError, Result};
use crate::huffman_coding::huffman_decode::huf_decode;
use crate::tools::crc::do_crc;
use crate::tools::rle1::rle1_decode;
use crate::tools::rle2_mtf::rle2_mtf_decode;

/// Decode the body of one block, starting right after its header. `block_size` is the class from
/// the stream header and bounds the block length. The result still has to pass verify_block().
pub fn decode_block(
    br: &mut BitReader<'_>,
    header: &BlockHeader,
    block_size: u8,
) -> Result<Vec<u8>> {
    let max_len = block_size as usize * BLOCK_SIZE_BASE;
    if header.origin as usize >= max_len {
        error!("Invalid key pointer {}", header.origin);
        return Err(BzError::MalformedBlock(format!(
            "origin pointer {} beyond block size {}",
            header.origin, max_len
        )));
    }

    let symbol_set = read_sym_map(br)?;
    // RUNA, RUNB, every symbol but the first, and EOB.
    let alpha_size = symbol_set.len() + 2;

    let rle2 = huf_decode(br, alpha_size, max_len + 1)?;
    let bwt = rle2_mtf_decode(&rle2, &symbol_set, max_len)?;
    let rle1 = bwt_decode(header.origin, &bwt)?;
    let data = rle1_decode(&rle1);

    debug!(
        "Decoded block of {} bytes ({} after BWT reversal).",
        data.len(),
        rle1.len()
    );
    Ok(data)
}

/// Compare the CRC of decoded block data with the CRC stored in the block header.
pub fn verify_block(header: &BlockHeader, data: &[u8]) -> Result<()> {
    let found = do_crc(0, data);
    if found != header.block_crc {
        error!(
            "Block CRC mismatch: stored {:#010x}, computed {:#010x}",
            header.block_crc, found
        );
        return Err(BzError::DataIntegrity {
            expected: header.block_crc,
            found,
        });
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compression::compress_block::{compress_block, Block};
    use crate::compression::frame::{read_record, Record};
    use crate::tools::options::BzConfig;
    use crate::tools::rle1::rle1_encode;

    fn encode(original: &[u8], crc: u32) -> Vec<u8> {
        let block = Block {
            seq: 1,
            data: rle1_encode(original),
            block_crc: crc,
        };
        compress_block(&block, &BzConfig::default()).bytes
    }

    #[test]
    fn crc_mismatch_test() {
        let original = b"hello hello hello world";
        let bytes = encode(original, do_crc(0, original) ^ 1);
        let mut br = BitReader::new(&bytes);
        let Record::Block(header) = read_record(&mut br).unwrap() else {
            panic!("expected a block record");
        };
        let data = decode_block(&mut br, &header, 9).unwrap();
        assert_eq!(data, original.to_vec());
        assert!(matches!(
            verify_block(&header, &data),
            Err(BzError::DataIntegrity { .. })
        ));
    }

    #[test]
    fn truncated_block_test() {
        let original = b"abracadabra abracadabra abracadabra";
        let bytes = encode(original, do_crc(0, original));
        let cut = &bytes[..bytes.len() - 3];
        let mut br = BitReader::new(cut);
        let Record::Block(header) = read_record(&mut br).unwrap() else {
            panic!("expected a block record");
        };
        assert!(matches!(
            decode_block(&mut br, &header, 9),
            Err(BzError::TruncatedStream(_))
        ));
    }

    #[test]
    fn origin_out_of_range_test() {
        let header = BlockHeader {
            block_crc: 0,
            origin: 100_000,
        };
        let bytes = [0_u8; 8];
        let mut br = BitReader::new(&bytes);
        assert!(matches!(
            decode_block(&mut br, &header, 1),
            Err(BzError::MalformedBlock(_))
        ));
    }
}
