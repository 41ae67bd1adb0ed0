//! Branch target buffer (BTB) implementation.

use crate::predictor::*;

/// Data cached by the BTB for a particular branch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BtbPayload {
    /// Cached target address for this branch
    pub target: u64,

    /// Whether this branch is a procedure return
    pub is_return: bool,

    /// Which instruction in a fetch bundle is responsible for the taken
    /// outcome (always zero for single-issue machines)
    pub branch_offset: usize,
}
impl BtbPayload {
    pub fn new(target: u64, is_return: bool) -> Self {
        Self { target, is_return, branch_offset: 0 }
    }

    pub fn with_offset(mut self, branch_offset: usize) -> Self {
        self.branch_offset = branch_offset;
        self
    }
}

/// An entry in the [BranchTargetBuffer].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BtbEntry {
    pub valid: bool,
    pub tag: u64,
    pub payload: BtbPayload,
}

/// The result of a BTB lookup.
///
/// The payload is returned even when the lookup misses; it is up to the
/// caller to check [BtbLookup::hit] before relying on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BtbLookup {
    pub hit: bool,
    pub payload: BtbPayload,
}

/// A direct-mapped, tagged branch target buffer.
///
/// The entry for some program counter value is overwritten on *every*
/// update, so each slot always reflects the most recent branch mapped to it.
#[derive(Clone, Debug)]
pub struct BranchTargetBuffer {
    size: usize,
    data: Vec<BtbEntry>,

    /// Number of low program counter bits ignored when forming an index
    shift: u32,
}
impl BranchTargetBuffer {
    pub fn new(size: usize, shift: u32) -> Self {
        assert!(size.is_power_of_two());
        Self {
            size,
            data: vec![BtbEntry::default(); size],
            shift,
        }
    }

    pub fn shift(&self) -> u32 { self.shift }

    /// Look up the entry for 'pc'.
    pub fn predict(&self, pc: u64) -> BtbLookup {
        let entry = self.get_entry(self.get_index(pc));
        BtbLookup {
            hit: entry.valid && entry.tag == self.get_tag(pc),
            payload: entry.payload,
        }
    }

    /// Install an entry for 'pc', replacing whatever occupied the slot.
    ///
    /// The direction is not used to filter updates: not-taken branches
    /// refresh their entry too.
    pub fn update(&mut self, pc: u64, _taken: bool, payload: BtbPayload) {
        let idx = self.get_index(pc);
        let tag = self.get_tag(pc);
        *self.get_entry_mut(idx) = BtbEntry { valid: true, tag, payload };
    }
}

impl PredictorTable for BranchTargetBuffer {
    type Entry = BtbEntry;

    fn size(&self) -> usize { self.size }

    fn get_index(&self, pc: u64) -> usize {
        (pc >> self.shift) as usize & self.index_mask()
    }

    fn get_entry(&self, idx: usize) -> &BtbEntry {
        &self.data[idx & self.index_mask()]
    }

    fn get_entry_mut(&mut self, idx: usize) -> &mut BtbEntry {
        let index = idx & self.index_mask();
        &mut self.data[index]
    }
}

impl TaggedPredictorTable for BranchTargetBuffer {
    fn get_tag(&self, pc: u64) -> u64 {
        // Shifting a u64 by 64 is an overflow
        pc.checked_shr(self.shift + self.index_bits()).unwrap_or(0)
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn cold_lookup_misses() {
        let btb = BranchTargetBuffer::new(64, 2);
        let res = btb.predict(0x2000);
        assert!(!res.hit);
        assert_eq!(res.payload, BtbPayload::default());
    }

    #[test]
    fn hit_after_update() {
        let mut btb = BranchTargetBuffer::new(64, 2);
        btb.update(0x2000, true, BtbPayload::new(0x2400, false));
        let res = btb.predict(0x2000);
        assert!(res.hit);
        assert_eq!(res.payload.target, 0x2400);
        assert!(!res.payload.is_return);
    }

    #[test]
    fn aliasing_pc_misses_but_sees_payload() {
        let mut btb = BranchTargetBuffer::new(64, 2);
        // 64 entries * 4 bytes
        let alias = 0x2000 + 0x100;
        btb.update(0x2000, true, BtbPayload::new(0x2400, true));
        assert_eq!(btb.get_index(0x2000), btb.get_index(alias));
        let res = btb.predict(alias);
        assert!(!res.hit);
        assert_eq!(res.payload, BtbPayload::new(0x2400, true));
    }

    #[test]
    fn not_taken_update_still_installs() {
        let mut btb = BranchTargetBuffer::new(16, 2);
        btb.update(0x40, false, BtbPayload::new(0x44, false));
        assert!(btb.predict(0x40).hit);
    }

    #[test]
    fn tag_uses_bits_above_index() {
        let btb = BranchTargetBuffer::new(16, 2);
        assert_eq!(btb.get_tag(0x1234_5678), 0x1234_5678 >> 6);
        assert_eq!(btb.get_index(0x1234_5678), (0x1234_5678 >> 2) & 0xf);
    }

    proptest! {
        #[test]
        fn last_write_wins(
            updates in proptest::collection::vec((any::<u64>(), any::<u64>()), 1..128))
        {
            let mut btb = BranchTargetBuffer::new(32, 2);
            for (pc, tgt) in updates.iter() {
                btb.update(*pc, true, BtbPayload::new(*tgt, false));
                let idx = btb.get_index(*pc);
                let entry = btb.get_entry(idx);
                prop_assert!(entry.valid);
                prop_assert_eq!(entry.tag, btb.get_tag(*pc));
                prop_assert_eq!(entry.payload.target, *tgt);
            }
            let (pc, tgt) = updates.last().unwrap();
            let res = btb.predict(*pc);
            prop_assert!(res.hit);
            prop_assert_eq!(res.payload.target, *tgt);
        }
    }
}
