//! Implementation of a saturating counter.

/// Configuration for building a [`SaturatingCounter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaturatingCounterConfig {
    /// Width of the counter in bits
    pub bits: u32,
}
impl SaturatingCounterConfig {
    /// Largest supported counter width.
    pub const MAX_BITS: u32 = 31;

    pub fn new(bits: u32) -> Self {
        Self { bits }
    }

    /// The largest value the counter can hold.
    pub fn max(&self) -> u32 { (1 << self.bits) - 1 }

    /// The smallest value predicting 'taken'.
    pub fn threshold(&self) -> u32 { 1 << (self.bits - 1) }

    pub fn build(self) -> SaturatingCounter {
        assert!(self.bits >= 1 && self.bits <= Self::MAX_BITS,
            "invalid counter width {}", self.bits);
        SaturatingCounter {
            cfg: self,
            ctr: 0,
        }
    }
}

/// An unsigned N-bit saturating counter used to follow the behavior of a
/// branch.
///
/// The predicted direction is the most-significant bit of the counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaturatingCounter {
    cfg: SaturatingCounterConfig,
    ctr: u32,
}
impl SaturatingCounter {
    /// Increment the counter, saturating at the maximum value.
    pub fn inc(&mut self) {
        if self.ctr < self.cfg.max() {
            self.ctr += 1;
        }
    }

    /// Decrement the counter, saturating at zero.
    pub fn dec(&mut self) {
        self.ctr = self.ctr.saturating_sub(1);
    }

    /// Return the raw counter value.
    pub fn value(&self) -> u32 { self.ctr }

    pub fn config(&self) -> &SaturatingCounterConfig { &self.cfg }

    /// Return the current predicted direction.
    pub fn predict(&self) -> bool {
        self.ctr >= self.cfg.threshold()
    }

    /// Update the state of the counter with the resolved direction.
    pub fn update(&mut self, taken: bool) {
        if taken { self.inc(); } else { self.dec(); }
    }
}
