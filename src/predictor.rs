//! Models of front-end branch prediction.
//!
//! A predictor policy combines three structures:
//!
//! - A [BranchTargetBuffer] (BTB) providing targets and "is return" bits
//! - A [BranchHistoryTable] (BHT) providing a taken/not-taken bias
//! - A [ReturnAddressStack] (RAS) providing return targets
//!
//! Different policies are implemented as separate types implementing
//! [BranchPredictor]. Each owns its own instance of each structure.

pub mod table;
pub mod counter;
pub mod bht;
pub mod btb;
pub mod ras;
pub mod rocket;
pub mod superscalar;

pub use table::*;
pub use counter::*;
pub use bht::*;
pub use btb::*;
pub use ras::*;
pub use rocket::*;
pub use superscalar::*;

use serde::Serialize;

/// The output of [BranchPredictor::predict].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Prediction {
    /// Predicted direction
    pub taken: bool,

    /// Predicted next fetch address
    pub target: u64,

    /// Which instruction in the fetch bundle is blamed for a taken
    /// prediction (always zero for single-issue policies)
    pub branch_offset: usize,
}
impl Prediction {
    pub fn taken(target: u64, branch_offset: usize) -> Self {
        Self { taken: true, target, branch_offset }
    }

    pub fn not_taken(target: u64) -> Self {
        Self { taken: false, target, branch_offset: 0 }
    }
}

/// Resolved facts about one retiring micro-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CommitUop {
    /// Program counter of the micro-op
    pub pc: u64,

    /// Resolved direction
    pub taken: bool,

    /// Resolved next program counter value
    pub target: u64,

    pub is_return: bool,
    pub is_call: bool,

    /// The address a call will return to
    pub return_addr: u64,
}

/// All of the micro-ops retiring together in a single update cycle.
pub type CommitBundle = [CommitUop];

/// Interface to a front-end branch prediction policy.
///
/// Callers must always call [BranchPredictor::predict] for a fetch address
/// before calling [BranchPredictor::update] with the resolved outcome.
pub trait BranchPredictor {
    fn name(&self) -> &'static str;

    /// Predict the next fetch address after 'pc'.
    ///
    /// This takes `&mut self` because a predicted return consumes an entry
    /// from the RAS.
    fn predict(&mut self, pc: u64) -> Prediction;

    /// Train the predictor with the resolved outcome of a fetch.
    fn update(&mut self,
        fetch_pc: u64,
        taken: bool,
        next_pc: u64,
        bundle: &CommitBundle,
        taken_br_offset: usize,
    );

    /// The position of 'pc' within its fetch bundle.
    fn fetch_offset(&self, _pc: u64) -> usize { 0 }

    /// The address used to look up the fetch bundle containing 'pc'.
    ///
    /// A single prediction covers every instruction in a bundle.
    fn fetch_block(&self, pc: u64) -> u64 { pc }

    fn btb(&self) -> &BranchTargetBuffer;
    fn bht(&self) -> &BranchHistoryTable;
    fn ras(&self) -> &ReturnAddressStack;
}

/// One of the available prediction policies, chosen at runtime.
pub type Predictor = Box<dyn BranchPredictor>;

impl<P: BranchPredictor + ?Sized> BranchPredictor for Box<P> {
    fn name(&self) -> &'static str { (**self).name() }
    fn predict(&mut self, pc: u64) -> Prediction { (**self).predict(pc) }
    fn update(&mut self, fetch_pc: u64, taken: bool, next_pc: u64,
        bundle: &CommitBundle, taken_br_offset: usize)
    {
        (**self).update(fetch_pc, taken, next_pc, bundle, taken_br_offset)
    }
    fn fetch_offset(&self, pc: u64) -> usize { (**self).fetch_offset(pc) }
    fn fetch_block(&self, pc: u64) -> u64 { (**self).fetch_block(pc) }
    fn btb(&self) -> &BranchTargetBuffer { (**self).btb() }
    fn bht(&self) -> &BranchHistoryTable { (**self).bht() }
    fn ras(&self) -> &ReturnAddressStack { (**self).ras() }
}
