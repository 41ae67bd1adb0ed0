//! Global branch history.

use bitvec::prelude::*;

/// Maximum supported length of a [GlobalHistoryRegister] in bits.
pub const MAX_HISTORY_BITS: usize = 64;

/// A register recording the outcomes of the most recent branches.
///
/// Bit 0 is the youngest outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalHistoryRegister {
    data: BitVec<usize, Lsb0>,
}

// NOTE: This *reverses* the all of the bits and presents them in a format
// where the leftmost bit is the oldest outcome and the rightmost bit is the
// youngest.
impl std::fmt::Display for GlobalHistoryRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let x: String = self.data.as_bitslice().iter().by_vals()
            .map(|b| if b { '1' } else { '0' })
            .rev()
            .collect();
        write!(f, "{}", x)
    }
}

impl GlobalHistoryRegister {
    /// Create a register with the specified length in bits.
    /// All bits in the register are initialized to zero.
    pub fn new(len: usize) -> Self {
        assert!(len <= MAX_HISTORY_BITS);
        Self { data: bitvec![usize, Lsb0; 0; len] }
    }

    pub fn len(&self) -> usize { self.data.len() }
    pub fn is_empty(&self) -> bool { self.data.is_empty() }
    pub fn data(&self) -> &BitSlice<usize, Lsb0> { &self.data }

    /// Shift in a new outcome. The oldest outcome is discarded.
    pub fn push(&mut self, taken: bool) {
        if self.data.is_empty() {
            return;
        }
        self.data.shift_right(1);
        self.data.set(0, taken);
    }

    /// Fold [with XOR] the whole register into 'output_bits' bits.
    pub fn fold(&self, output_bits: usize) -> usize {
        if output_bits == 0 || self.data.is_empty() {
            return 0;
        }
        let output_mask = if output_bits >= usize::BITS as usize {
            usize::MAX
        } else {
            (1 << output_bits) - 1
        };
        let chunk_bits = output_bits.min(usize::BITS as usize);
        let res = self.data.chunks(chunk_bits).fold(0, |res, x| {
            res ^ x.load_le::<usize>()
        });
        res & output_mask
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn push_shifts_toward_oldest() {
        let mut ghr = GlobalHistoryRegister::new(4);
        ghr.push(true);
        ghr.push(false);
        ghr.push(true);
        assert_eq!(ghr.to_string(), "0101");
        ghr.push(true);
        ghr.push(true);
        // The first outcome has been shifted out
        assert_eq!(ghr.to_string(), "0111");
        assert_eq!(ghr.len(), 4);
    }

    #[test]
    fn fold_xors_chunks() {
        let mut ghr = GlobalHistoryRegister::new(8);
        // 1000_0001 (youngest on the right)
        ghr.push(true);
        for _ in 0..6 { ghr.push(false); }
        ghr.push(true);
        assert_eq!(ghr.fold(8), 0b1000_0001);
        // 0001 ^ 1000
        assert_eq!(ghr.fold(4), 0b1001);
        // Chunks of three bits: 001 ^ 000 ^ 10
        assert_eq!(ghr.fold(3), 0b011);
    }

    #[test]
    fn empty_register_is_inert() {
        let mut ghr = GlobalHistoryRegister::new(0);
        ghr.push(true);
        assert!(ghr.is_empty());
        assert_eq!(ghr.fold(6), 0);
    }
}
