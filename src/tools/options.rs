//! Engine configuration. A plain value passed into `session::open`; nothing here holds a handle.
use crate::compression::frame::BLOCK_SIZE_BASE;
use crate::error::{BzError, Result};

/// Default work factor, as in the reference bzip2.
pub const DEFAULT_WORK_FACTOR: u32 = 30;
/// Huffman refinement passes used by the reference bzip2.
pub const DEFAULT_ITERATIONS: usize = 4;

/// Defines all user settable options that control compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BzConfig {
    /// Block size class, 1..=9, for 100k..900k blocks.
    pub block_size: u8,
    /// How hard the main sort tries before handing a repetitive block to the fallback sort.
    /// 0..=250; 0 selects the default of 30.
    pub work_factor: u32,
    /// Huffman table refinement passes, 1..=8.
    pub iterations: usize,
}

impl BzConfig {
    pub fn new() -> Self {
        Self {
            block_size: 9,
            work_factor: DEFAULT_WORK_FACTOR,
            iterations: DEFAULT_ITERATIONS,
        }
    }

    pub fn with_block_size(mut self, block_size: u8) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_work_factor(mut self, work_factor: u32) -> Self {
        self.work_factor = work_factor;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Reject out-of-range settings before any data is consumed.
    pub fn validate(&self) -> Result<()> {
        if !(1..=9).contains(&self.block_size) {
            return Err(BzError::Config(format!(
                "block size class must be 1..=9, got {}",
                self.block_size
            )));
        }
        if self.work_factor > 250 {
            return Err(BzError::Config(format!(
                "work factor must be 0..=250, got {}",
                self.work_factor
            )));
        }
        if !(1..=8).contains(&self.iterations) {
            return Err(BzError::Config(format!(
                "huffman iterations must be 1..=8, got {}",
                self.iterations
            )));
        }
        Ok(())
    }

    /// Work factor with 0 mapped to the default.
    pub fn effective_work_factor(&self) -> u32 {
        if self.work_factor == 0 {
            DEFAULT_WORK_FACTOR
        } else {
            self.work_factor
        }
    }

    /// Largest RLE1 block the compressor builds. The reference encoder keeps 19 bytes spare.
    pub fn max_block_len(&self) -> usize {
        self.block_size as usize * BLOCK_SIZE_BASE - 19
    }
}

impl Default for BzConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_valid_test() {
        let c = BzConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.max_block_len(), 899_981);
    }

    #[test]
    fn rejects_bad_values_test() {
        assert!(matches!(
            BzConfig::new().with_block_size(0).validate(),
            Err(BzError::Config(_))
        ));
        assert!(matches!(
            BzConfig::new().with_block_size(10).validate(),
            Err(BzError::Config(_))
        ));
        assert!(matches!(
            BzConfig::new().with_work_factor(251).validate(),
            Err(BzError::Config(_))
        ));
        assert!(matches!(
            BzConfig::new().with_iterations(0).validate(),
            Err(BzError::Config(_))
        ));
    }

    #[test]
    fn zero_work_factor_means_default_test() {
        let c = BzConfig::new().with_work_factor(0);
        assert!(c.validate().is_ok());
        assert_eq!(c.effective_work_factor(), 30);
    }
}
