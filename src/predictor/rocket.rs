//! A model of the single-issue Rocket front-end.
//!
//! The BTB redirects fetch in a single cycle, informed by a BHT and a RAS.
//! The BTB also holds an "is return" bit which decides when to pop the RAS.

use crate::branch::INST_BYTES;
use crate::predictor::*;

/// Single-issue predictor combining a BTB, a BHT, and a RAS.
#[derive(Clone, Debug)]
pub struct RocketPredictor {
    btb: BranchTargetBuffer,
    bht: BranchHistoryTable,
    ras: ReturnAddressStack,
}
impl RocketPredictor {
    /// Create a predictor with 'num_btb_entries' BTB entries and
    /// 'num_ras_entries' RAS entries.
    ///
    /// The BHT has twice as many entries as the BTB, and each counter is
    /// `log2(BHT entries)` bits wide.
    pub fn new(num_btb_entries: usize, num_ras_entries: usize) -> Self {
        Self::with_history(num_btb_entries, num_ras_entries, 0)
    }

    /// Like [RocketPredictor::new], but the BHT is indexed with
    /// 'history_bits' bits of folded global history (gshare).
    pub fn with_history(num_btb_entries: usize, num_ras_entries: usize,
        history_bits: usize) -> Self
    {
        let nbht = 2 * num_btb_entries;
        Self {
            btb: BranchTargetBuffer::new(num_btb_entries, INST_BYTES.ilog2()),
            bht: BranchHistoryTable::with_history(nbht, nbht.ilog2(),
                history_bits),
            ras: ReturnAddressStack::new(num_ras_entries),
        }
    }
}

impl BranchPredictor for RocketPredictor {
    fn name(&self) -> &'static str { "Rocket" }

    fn predict(&mut self, pc: u64) -> Prediction {
        let bht_taken = self.bht.predict(pc);
        let btb = self.btb.predict(pc);

        // A return always uses the RAS when it has something to offer,
        // even if the BTB lookup missed.
        if btb.payload.is_return {
            if let Ok(tgt) = self.ras.pop() {
                return Prediction::taken(tgt, 0);
            }
        }
        if bht_taken && btb.hit {
            Prediction::taken(btb.payload.target, 0)
        } else {
            Prediction::not_taken(pc.wrapping_add(INST_BYTES))
        }
    }

    fn update(&mut self, fetch_pc: u64, taken: bool, _next_pc: u64,
        bundle: &CommitBundle, _taken_br_offset: usize)
    {
        let Some(uop) = bundle.first() else { return; };
        self.btb.update(fetch_pc, taken,
            BtbPayload::new(uop.target, uop.is_return));
        self.bht.update(fetch_pc, taken);
        if uop.is_call {
            self.ras.push(uop.return_addr);
        }
    }

    fn btb(&self) -> &BranchTargetBuffer { &self.btb }
    fn bht(&self) -> &BranchHistoryTable { &self.bht }
    fn ras(&self) -> &ReturnAddressStack { &self.ras }
}


#[cfg(test)]
mod test {
    use super::*;
    use rand::prelude::*;

    fn uop(pc: u64, taken: bool, target: u64) -> CommitUop {
        CommitUop {
            pc, taken, target,
            is_return: false,
            is_call: false,
            return_addr: pc + INST_BYTES,
        }
    }

    /// Resolve a single instruction the way the evaluator does.
    fn train(p: &mut RocketPredictor, u: CommitUop) {
        p.update(u.pc, u.taken, u.target, &[u], 0);
    }

    #[test]
    fn cold_predicts_fallthrough() {
        let mut p = RocketPredictor::new(64, 2);
        assert_eq!(p.predict(0x2000), Prediction::not_taken(0x2004));
    }

    #[test]
    fn table_sizes() {
        let p = RocketPredictor::new(64, 2);
        assert_eq!(p.btb().size(), 64);
        assert_eq!(p.bht().size(), 128);
        assert_eq!(p.bht().counter_config().bits, 7);
        assert_eq!(p.ras().capacity(), 2);
    }

    #[test]
    fn btb_hit_needs_taken_bias() {
        // 1-bit counters (one BTB entry, two BHT entries)
        let mut p = RocketPredictor::new(1, 1);
        assert_eq!(p.bht().counter_config().bits, 1);

        // The entry is installed, but the counter is still biased not-taken
        train(&mut p, uop(0x400, false, 0x404));
        assert!(p.btb().predict(0x400).hit);
        assert!(!p.predict(0x400).taken);

        train(&mut p, uop(0x400, true, 0x800));
        assert_eq!(p.predict(0x400), Prediction::taken(0x800, 0));
    }

    #[test]
    fn taken_bias_without_btb_hit_falls_through() {
        let mut p = RocketPredictor::new(1, 1);
        train(&mut p, uop(0x400, true, 0x800));
        // 0x408 reads the same (taken) BHT counter, but misses in the BTB
        assert!(!p.btb().predict(0x408).hit);
        assert_eq!(p.predict(0x408), Prediction::not_taken(0x40c));
    }

    #[test]
    fn return_priority() {
        let mut p = RocketPredictor::new(16, 4);
        // Train 0x500 as a strongly taken return to some stale target
        for _ in 0..20 {
            let mut u = uop(0x500, true, 0xdead_0000);
            u.is_return = true;
            train(&mut p, u);
        }
        // A call elsewhere pushes a return address
        let mut call = uop(0x104, true, 0x500);
        call.is_call = true;
        train(&mut p, call);

        assert_eq!(p.ras().top(), Some(0x108));
        assert_eq!(p.predict(0x500), Prediction::taken(0x108, 0));
        assert!(p.ras().is_empty());

        // With an empty RAS we fall back to the BTB target
        assert_eq!(p.predict(0x500), Prediction::taken(0xdead_0000, 0));
    }

    #[test]
    fn return_bit_used_on_btb_miss() {
        let mut p = RocketPredictor::new(64, 2);
        let mut ret = uop(0x1004, true, 0x200c);
        ret.is_return = true;
        train(&mut p, ret);
        let mut call = uop(0x2008, true, 0x1004);
        call.is_call = true;
        train(&mut p, call);

        // 0x1104 aliases with 0x1004 in the BTB but has a different tag
        let res = p.btb().predict(0x1104);
        assert!(!res.hit);
        assert!(res.payload.is_return);
        assert_eq!(p.predict(0x1104), Prediction::taken(0x200c, 0));
        assert!(p.ras().is_empty());
    }

    #[test]
    fn empty_bundle_is_ignored() {
        let mut p = RocketPredictor::new(16, 4);
        p.update(0x100, true, 0x200, &[], 0);
        assert!(!p.btb().predict(0x100).hit);
    }

    #[test]
    fn predict_is_a_function_of_prior_state() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut p = RocketPredictor::new(8, 2);
        for _ in 0..2000 {
            let pc = rng.gen_range(0..64u64) * INST_BYTES;
            let mut shadow = p.clone();
            let pred = p.predict(pc);
            assert_eq!(pred, shadow.predict(pc));

            let taken: bool = rng.gen();
            let target = if taken { rng.gen_range(0..64u64) * 4 } else { pc + 4 };
            let mut u = uop(pc, taken, target);
            u.is_call = rng.gen_bool(0.1);
            u.is_return = !u.is_call && rng.gen_bool(0.1);
            train(&mut p, u);
            train(&mut shadow, u);
            assert_eq!(p.ras(), shadow.ras());
        }
    }
}
