//! A straw-man model of a superscalar front-end.
//!
//! - The BTB is looked up with an *aligned* fetch address, and also provides
//!   the offset of the instruction responsible for a taken prediction.
//!   It is updated once per commit bundle.
//! - The BHT has one counter per aligned fetch address, which may be
//!   updated by up to W branches in a single cycle.
//! - The RAS is popped when the BTB says the fetch bundle ends in a return,
//!   and pushed when a call commits.

use crate::branch::INST_BYTES;
use crate::predictor::*;

/// Superscalar predictor keyed on aligned fetch-bundle addresses.
#[derive(Clone, Debug)]
pub struct SuperscalarPredictor {
    /// Instructions fetched per cycle
    width: usize,

    /// Number of low bits masked off to form an aligned fetch address
    shamt: u32,

    btb: BranchTargetBuffer,
    bht: BranchHistoryTable,
    ras: ReturnAddressStack,
}
impl SuperscalarPredictor {
    pub fn new(width: usize, num_btb_entries: usize, num_ras_entries: usize)
        -> Self
    {
        Self::with_history(width, num_btb_entries, num_ras_entries, 0)
    }

    pub fn with_history(width: usize, num_btb_entries: usize,
        num_ras_entries: usize, history_bits: usize) -> Self
    {
        assert!(width.is_power_of_two());
        let shamt = 1 + width.ilog2();
        let nbht = 2 * num_btb_entries;
        Self {
            width,
            shamt,
            btb: BranchTargetBuffer::new(num_btb_entries, shamt),
            bht: BranchHistoryTable::with_history(nbht, nbht.ilog2(),
                history_bits),
            ras: ReturnAddressStack::new(num_ras_entries),
        }
    }

    pub fn width(&self) -> usize { self.width }

    /// Mask off the low bits of 'pc' to get the address of its fetch bundle.
    pub fn aligned_pc(&self, pc: u64) -> u64 {
        (pc >> self.shamt) << self.shamt
    }

    /// Size of a fetch bundle in bytes.
    pub fn bundle_bytes(&self) -> u64 { 1 << self.shamt }
}

impl BranchPredictor for SuperscalarPredictor {
    fn name(&self) -> &'static str { "SS-Version 1 (full commit info)" }

    fn predict(&mut self, pc: u64) -> Prediction {
        let aligned_pc = self.aligned_pc(pc);
        let bht_taken = self.bht.predict(aligned_pc);
        let btb = self.btb.predict(aligned_pc);
        let offset = btb.payload.branch_offset;

        if btb.payload.is_return {
            if let Ok(tgt) = self.ras.pop() {
                return Prediction::taken(tgt, offset);
            }
        }
        if bht_taken && btb.hit {
            Prediction::taken(btb.payload.target, offset)
        } else {
            Prediction::not_taken(aligned_pc.wrapping_add(self.bundle_bytes()))
        }
    }

    /// Train with every micro-op in a commit bundle.
    ///
    /// Only the *first* call in the bundle pushes the RAS; the return
    /// address of any later call in the same bundle is lost.
    fn update(&mut self, fetch_pc: u64, taken: bool, next_pc: u64,
        bundle: &CommitBundle, taken_br_offset: usize)
    {
        let aligned_pc = self.aligned_pc(fetch_pc);
        let mut is_return = false;
        let mut found_call = false;
        for uop in bundle {
            self.bht.update(aligned_pc, uop.taken);
            if uop.is_return {
                is_return = true;
            }
            if uop.is_call && !found_call {
                found_call = true;
                self.ras.push(uop.return_addr);
            }
        }
        self.btb.update(aligned_pc, taken,
            BtbPayload::new(next_pc, is_return).with_offset(taken_br_offset));
    }

    fn fetch_offset(&self, pc: u64) -> usize {
        ((pc - self.aligned_pc(pc)) / INST_BYTES) as usize
    }

    fn fetch_block(&self, pc: u64) -> u64 { self.aligned_pc(pc) }

    fn btb(&self) -> &BranchTargetBuffer { &self.btb }
    fn bht(&self) -> &BranchHistoryTable { &self.bht }
    fn ras(&self) -> &ReturnAddressStack { &self.ras }
}
