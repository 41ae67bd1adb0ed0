//! Types for implementing a direct-mapped table of predictors.

/// Interface to a table of predictors.
pub trait PredictorTable {
    /// The type of entry in the table.
    type Entry;

    /// Returns the number of entries in the table.
    fn size(&self) -> usize;

    /// Given some program counter value, return the corresponding index
    /// into the table.
    fn get_index(&self, pc: u64) -> usize;

    /// Returns a reference to an entry in the table.
    fn get_entry(&self, idx: usize) -> &Self::Entry;

    /// Returns a mutable reference to an entry in the table.
    fn get_entry_mut(&mut self, idx: usize) -> &mut Self::Entry;

    /// Returns a bitmask corresponding to the number of entries in the table.
    fn index_mask(&self) -> usize {
        assert!(self.size().is_power_of_two());
        self.size() - 1
    }

    /// Returns the number of bits used to form an index.
    fn index_bits(&self) -> u32 {
        self.size().trailing_zeros()
    }
}

/// Interface to a *tagged* table of predictors.
pub trait TaggedPredictorTable: PredictorTable {
    /// Return the tag associated with some program counter value.
    fn get_tag(&self, pc: u64) -> u64;
}
