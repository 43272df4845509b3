/// The bits of one fully encoded block. `bits` is the exact number of valid bits; the last byte
/// of `bytes` is zero padded in its least significant bits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedBits {
    pub bytes: Vec<u8>,
    pub bits: u64,
}

/// Creates a bitstream for output.
pub struct BitPacker {
    pub output: Vec<u8>,
    queue: u64,
    q_bits: u32,
}

impl BitPacker {
    /// Create a new BitPacker with an output buffer of size specified. Suggest the
    /// size be set to the block size. Call finish() to flush the bit queue to the buffer.
    pub fn new(size: usize) -> Self {
        Self {
            output: Vec::with_capacity(size),
            queue: 0,
            q_bits: 0,
        }
    }

    /// Internal bitstream write function common to all out.XX functions.
    fn write_stream(&mut self) {
        while self.q_bits > 7 {
            let byte = (self.queue >> (self.q_bits - 8)) as u8;
            self.output.push(byte); //push the packed byte out
            self.q_bits -= 8; //adjust the count of bits left in the queue
        }
    }

    /// Appends the `width` least significant bits of `value`, most significant bit first.
    /// Width may be 0 to 32; anything wider is a caller bug and panics.
    pub fn write_bits(&mut self, value: u32, width: u32) {
        assert!(width <= 32, "write_bits: width {} exceeds 32", width);
        if width == 0 {
            return;
        }
        let mask = u32::MAX >> (32 - width);
        self.queue <<= width; //shift queue by bit length
        self.queue |= (value & mask) as u64; //add data portion to queue
        self.q_bits += width; //update depth of queue bits
        self.write_stream();
    }

    /// Puts a single bit on the stream.
    pub fn bit(&mut self, bit: bool) {
        self.write_bits(bit as u32, 1)
    }

    /// Puts an 8 bit word of pre-packed binary encoded data on the stream.
    pub fn out8(&mut self, data: u8) {
        self.write_bits(data as u32, 8)
    }

    /// Puts a 16 bit word of pre-packed binary encoded data on the stream.
    pub fn out16(&mut self, data: u16) {
        self.write_bits(data as u32, 16)
    }

    /// Puts a 32 bit word of pre-packed binary encoded data on the stream.
    pub fn out32(&mut self, data: u32) {
        self.write_bits(data, 32)
    }

    /// Number of bits written so far, including those still queued.
    pub fn bit_len(&self) -> u64 {
        self.output.len() as u64 * 8 + self.q_bits as u64
    }

    /// Flushes the remaining bits (1-7) from the queue, padding with 0s in the least
    /// significant bits, and hands back the packed data with its exact bit length.
    pub fn finish(mut self) -> PackedBits {
        let bits = self.bit_len();
        if self.q_bits > 0 {
            let pad = 8 - self.q_bits;
            self.queue <<= pad; //pad the queue with zeros
            self.q_bits += pad;
            self.write_stream(); // write out all that is left
        }
        PackedBits {
            bytes: self.output,
            bits,
        }
    }

    /// Debugging function to return the number of bytes.bits output so far
    pub fn loc(&self) -> String {
        format!("[{}.{}]", self.bit_len() / 8, self.bit_len() % 8)
    }
}
