//! Implementation of a branch history table (BHT).

use crate::branch::INST_BYTES;
use crate::history::GlobalHistoryRegister;
use crate::predictor::*;

/// A direct-mapped table of [SaturatingCounter] indexed by the program
/// counter, and optionally folded with global history (gshare).
#[derive(Clone, Debug)]
pub struct BranchHistoryTable {
    /// Saturating counter configuration
    cfg: SaturatingCounterConfig,

    /// Table of counters
    data: Vec<SaturatingCounter>,

    /// Number of entries
    size: usize,

    /// Global history folded into the index (when enabled)
    ghr: Option<GlobalHistoryRegister>,
}
impl BranchHistoryTable {
    /// Create a table of 'size' counters, each 'counter_bits' wide.
    pub fn new(size: usize, counter_bits: u32) -> Self {
        assert!(size.is_power_of_two());
        let cfg = SaturatingCounterConfig::new(counter_bits);
        Self {
            cfg,
            data: vec![cfg.build(); size],
            size,
            ghr: None,
        }
    }

    /// Create a gshare-style table which folds 'history_bits' bits of
    /// global history into each index.
    pub fn with_history(size: usize, counter_bits: u32, history_bits: usize)
        -> Self
    {
        let mut res = Self::new(size, counter_bits);
        if history_bits > 0 {
            res.ghr = Some(GlobalHistoryRegister::new(history_bits));
        }
        res
    }

    pub fn counter_config(&self) -> &SaturatingCounterConfig { &self.cfg }

    pub fn history(&self) -> Option<&GlobalHistoryRegister> {
        self.ghr.as_ref()
    }

    /// Return the counter used to predict some program counter value.
    pub fn counter(&self, pc: u64) -> &SaturatingCounter {
        self.get_entry(self.get_index(pc))
    }

    /// Predict the direction of the branch at 'pc'.
    pub fn predict(&self, pc: u64) -> bool {
        self.counter(pc).predict()
    }

    /// Train the counter for 'pc' with a resolved direction.
    ///
    /// When global history is enabled, the outcome is shifted into history
    /// *after* the counter has been updated.
    pub fn update(&mut self, pc: u64, taken: bool) {
        let idx = self.get_index(pc);
        self.get_entry_mut(idx).update(taken);
        if let Some(ghr) = self.ghr.as_mut() {
            ghr.push(taken);
        }
    }
}

impl PredictorTable for BranchHistoryTable {
    type Entry = SaturatingCounter;

    fn size(&self) -> usize { self.size }

    fn get_index(&self, pc: u64) -> usize {
        let pc_bits = (pc / INST_BYTES) as usize;
        let hist_bits = match &self.ghr {
            Some(ghr) => ghr.fold(self.index_bits() as usize),
            None => 0,
        };
        (pc_bits ^ hist_bits) & self.index_mask()
    }

    fn get_entry(&self, idx: usize) -> &SaturatingCounter {
        &self.data[idx & self.index_mask()]
    }

    fn get_entry_mut(&mut self, idx: usize) -> &mut SaturatingCounter {
        let index = idx & self.index_mask();
        &mut self.data[index]
    }
}
