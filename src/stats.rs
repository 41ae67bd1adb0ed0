//! Helpers for collecting statistics.

use std::collections::*;
use std::fmt;
use bitvec::prelude::*;
use itertools::Itertools;
use serde::Serialize;

use crate::branch::*;

/// Counters accumulated while evaluating a predictor against a trace.
///
/// Every percentage in a report is relative to [EvalStats::total], the
/// number of scored branch and jump instructions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EvalStats {
    /// Conditional branches
    pub br: usize,
    /// Direct jumps
    pub jal: usize,
    /// Indirect jumps
    pub jalr: usize,

    pub ret: usize,
    pub call: usize,
    pub taken: usize,

    /// Mispredictions (all classes)
    pub mispredict: usize,
    pub misp_br: usize,
    pub misp_jal: usize,
    pub misp_jalr: usize,

    /// Mispredicted returns
    pub missed_ret: usize,
}
impl EvalStats {
    pub fn new() -> Self { Self::default() }

    /// Record the outcome of a single branch or jump.
    ///
    /// Records for [InstClass::None] are ignored.
    pub fn record(&mut self, class: InstClass, facts: ControlFlowFacts,
        taken: bool, mispredicted: bool)
    {
        match class {
            InstClass::None => return,
            InstClass::ConditionalBranch => self.br += 1,
            InstClass::UnconditionalJump => self.jal += 1,
            InstClass::IndirectJump => self.jalr += 1,
        }
        if facts.is_return {
            self.ret += 1;
        } else if facts.is_call {
            self.call += 1;
        }
        if taken {
            self.taken += 1;
        }
        if mispredicted {
            self.mispredict += 1;
            match class {
                InstClass::ConditionalBranch => self.misp_br += 1,
                InstClass::UnconditionalJump => self.misp_jal += 1,
                InstClass::IndirectJump => self.misp_jalr += 1,
                InstClass::None => unreachable!(),
            }
            if facts.is_return {
                self.missed_ret += 1;
            }
        }
    }

    /// Total number of scored branch/jump instructions.
    pub fn total(&self) -> usize { self.br + self.jal + self.jalr }

    /// Number of correct predictions.
    pub fn hits(&self) -> usize { self.total() - self.mispredict }

    /// Fraction of mispredicted branches/jumps.
    pub fn mispredict_rate(&self) -> f64 {
        self.mispredict as f64 / self.total() as f64
    }

    /// Fraction of correctly predicted branches/jumps.
    pub fn accuracy(&self) -> f64 { 1.0 - self.mispredict_rate() }

    /// Express some count as a percentage of the total.
    pub fn pct(&self, n: usize) -> f64 {
        100.0 * n as f64 / self.total() as f64
    }
}

impl EvalStats {
    fn write_row(&self, f: &mut fmt::Formatter, label: &str, n: usize)
        -> fmt::Result
    {
        writeln!(f, "  {:16}: {:6}  [{:7.3} %]", label, n, self.pct(n))
    }
}

impl fmt::Display for EvalStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "  {:16}: {:6}", "Total", self.total())?;
        self.write_row(f, "  - br", self.br)?;
        self.write_row(f, "  - jal", self.jal)?;
        self.write_row(f, "  - jalr", self.jalr)?;
        writeln!(f)?;
        self.write_row(f, "rets", self.ret)?;
        self.write_row(f, "calls", self.call)?;
        writeln!(f)?;
        self.write_row(f, "taken", self.taken)?;
        self.write_row(f, "mispredicted", self.mispredict)?;
        self.write_row(f, "      - br", self.misp_br)?;
        self.write_row(f, "      - jal", self.misp_jal)?;
        self.write_row(f, "      - jalr", self.misp_jalr)?;
        self.write_row(f, "   - missed rets", self.missed_ret)?;
        writeln!(f)?;
        write!(f, "  {:16}: {:6}  [{:7.3} %]", "Accuracy", "",
            100.0 * self.accuracy())
    }
}


/// Container for per-branch statistics (indexed by program counter value).
#[derive(Clone, Debug, Default)]
pub struct BranchStats {
    pub data: BTreeMap<u64, BranchData>,
}
impl BranchStats {
    pub fn new() -> Self { Self::default() }

    /// Update per-branch statistics.
    pub fn update(&mut self, pc: u64, taken: bool, hit: bool) {
        let data = self.get_mut(pc);
        data.occ += 1;
        if taken { data.taken += 1; }
        if hit { data.hits += 1; }
        if data.pat.len() == BranchData::PATTERN_LEN {
            data.pat.remove(0);
        }
        data.pat.push(taken);
    }

    /// Returns a reference to data collected for a particular branch.
    pub fn get(&self, pc: u64) -> Option<&BranchData> {
        self.data.get(&pc)
    }

    /// Returns a mutable reference to data collected for a particular branch.
    /// Creates a new entry if one doesn't already exist.
    pub fn get_mut(&mut self, pc: u64) -> &mut BranchData {
        self.data.entry(pc).or_default()
    }

    /// Returns the number of unique observed branch instructions.
    pub fn num_unique_branches(&self) -> usize {
        self.data.len()
    }

    /// Returns up to 'n' poorly predicted branches which were executed more
    /// than 'min_occ' times, most frequently executed first.
    pub fn get_low_rate_branches(&self, n: usize, min_occ: usize)
        -> Vec<(u64, &BranchData)>
    {
        self.data.iter()
            .filter(|(_, s)| s.occ > min_occ && s.hit_rate() <= 0.55)
            .sorted_by_key(|(_, s)| s.occ)
            .rev()
            .take(n)
            .map(|(pc, s)| (*pc, s))
            .collect()
    }
}

/// Container for per-branch statistics.
#[derive(Clone, Debug, Default)]
pub struct BranchData {
    /// Number of times this branch was encountered.
    pub occ: usize,

    /// Number of correct predictions for this branch.
    pub hits: usize,

    /// Number of times this branch was taken.
    pub taken: usize,

    /// The most recent outcomes for this branch (oldest first).
    pub pat: BitVec,
}
impl BranchData {
    /// Number of outcomes kept in [BranchData::pat].
    pub const PATTERN_LEN: usize = 64;

    /// Return the hit rate for this branch.
    pub fn hit_rate(&self) -> f64 {
        self.hits as f64 / self.occ as f64
    }

    pub fn times_taken(&self) -> usize { self.taken }

    /// The most recent 'n' outcomes (at most [BranchData::PATTERN_LEN]),
    /// oldest first.
    pub fn recent_pattern(&self, n: usize) -> String {
        let start = self.pat.len().saturating_sub(n);
        self.pat[start..].iter().by_vals()
            .map(|b| if b { '1' } else { '0' })
            .collect()
    }
}
