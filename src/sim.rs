//! Trace-driven evaluation of a [BranchPredictor].
//!
//! Each committed instruction is classified from its opcode, and the
//! predictor is asked for a prediction *before* the next record in the
//! trace is used to decide what actually happened.
//!
//! A bundle-keyed predictor is only consulted once per fetch bundle: every
//! following record in the same bundle reuses that prediction, until a
//! record leaves the bundle or fetch is redirected.
//!
//! NOTE: A branch is considered taken whenever the next committed
//! instruction is not the sequential one. Gaps in the trace will look like
//! taken branches; this is accepted rather than corrected.

use std::fmt;
use tracing::{ debug, info, warn };

use crate::branch::*;
use crate::error::*;
use crate::predictor::*;
use crate::stats::*;
use crate::trace::TraceRecord;

/// The resolved outcome of a scored branch or jump.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub taken: bool,

    /// The program counter of the next committed instruction
    pub target: u64,

    pub mispredicted: bool,
}

/// A record of one step of an evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceEvent {
    pub record: TraceRecord,
    pub class: InstClass,
    pub facts: ControlFlowFacts,

    /// The prediction made for this fetch address
    pub prediction: Prediction,

    /// Only present for scored branches and jumps
    pub resolution: Option<Resolution>,
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "pc: 0x{:08x}, inst: {:08x} {:4}",
            self.record.pc, self.record.inst, self.class.mnemonic())?;
        if let Some(res) = self.resolution {
            write!(f, " target: {:x}, predtarg: {:x}, {} {}{} {} {}",
                res.target,
                self.prediction.target,
                if res.taken { "T" } else { "-" },
                if self.facts.is_return { "RET" } else { "   " },
                if self.facts.is_call { "CALL" } else { "    " },
                if self.prediction.taken { "PT" } else { "nT" },
                if res.mispredicted { "MISPREDICT" } else { "" },
            )?;
        }
        Ok(())
    }
}


/// The prediction covering the fetch bundle currently being consumed.
#[derive(Clone, Copy, Debug)]
struct FetchState {
    block: u64,
    prediction: Prediction,

    /// The next record stays in this bundle only if it has this address
    next_pc: u64,
}

/// Replays a trace against a predictor and accumulates statistics.
pub struct Evaluator<P: BranchPredictor> {
    predictor: P,

    /// Aggregate counters
    stats: EvalStats,

    /// Per-branch counters
    branches: BranchStats,

    /// Per-step records (only when enabled)
    events: Option<Vec<TraceEvent>>,

    /// Number of trace records consumed
    records: usize,

    fetch: Option<FetchState>,
}
impl<P: BranchPredictor> Evaluator<P> {
    pub fn new(predictor: P) -> Self {
        Self {
            predictor,
            stats: EvalStats::new(),
            branches: BranchStats::new(),
            events: None,
            records: 0,
            fetch: None,
        }
    }

    /// Keep a [TraceEvent] for every record consumed by this evaluator.
    pub fn with_event_log(mut self) -> Self {
        self.events = Some(Vec::new());
        self
    }

    pub fn predictor(&self) -> &P { &self.predictor }
    pub fn stats(&self) -> &EvalStats { &self.stats }
    pub fn branch_stats(&self) -> &BranchStats { &self.branches }
    pub fn num_records(&self) -> usize { self.records }

    /// Recorded events (empty unless [Evaluator::with_event_log] was used).
    pub fn events(&self) -> &[TraceEvent] {
        self.events.as_deref().unwrap_or(&[])
    }

    /// Evaluate a single record, given the record committed after it.
    pub fn step(&mut self, record: &TraceRecord,
        successor: Option<&TraceRecord>) -> TraceEvent
    {
        self.records += 1;
        let class = record.class();
        let facts = record.facts();

        let prediction = self.fetch_prediction(record);

        let resolution = match successor {
            _ if !class.is_control_flow() => None,
            Some(next) => {
                Some(self.resolve(record, class, facts, prediction, next))
            },
            None => {
                warn!(pc = %format!("{:#x}", record.pc),
                    "no successor for the final branch; not scored");
                None
            },
        };

        let event = TraceEvent { record: *record, class, facts, prediction,
            resolution };
        if let Some(events) = self.events.as_mut() {
            events.push(event);
        }
        event
    }

    /// Return the prediction for a single record, consulting the predictor
    /// only when a new fetch bundle begins.
    ///
    /// A bundle prediction only applies to the instruction at its branch
    /// offset. Any other instruction is predicted to fall through.
    fn fetch_prediction(&mut self, record: &TraceRecord) -> Prediction {
        let block = self.predictor.fetch_block(record.pc);
        let bundle = match self.fetch {
            Some(f) if f.block == block && f.next_pc == record.pc => {
                f.prediction
            },
            _ => self.predictor.predict(record.pc),
        };
        self.fetch = Some(FetchState {
            block,
            prediction: bundle,
            next_pc: record.fallthrough(),
        });

        let offset = self.predictor.fetch_offset(record.pc);
        if bundle.taken && bundle.branch_offset == offset {
            bundle
        } else {
            Prediction::not_taken(record.fallthrough())
        }
    }

    /// Score a prediction against the next committed instruction, then
    /// train the predictor with the outcome.
    fn resolve(&mut self, record: &TraceRecord, class: InstClass,
        facts: ControlFlowFacts, prediction: Prediction, next: &TraceRecord)
        -> Resolution
    {
        let taken = next.pc != record.fallthrough();
        let target = next.pc;

        // The predicted target only matters for a taken prediction
        let mispredicted = prediction.taken != taken
            || (taken && prediction.target != target);

        self.stats.record(class, facts, taken, mispredicted);
        self.branches.update(record.pc, taken, !mispredicted);

        let uop = CommitUop {
            pc: record.pc,
            taken,
            target,
            is_return: facts.is_return,
            is_call: facts.is_call,
            return_addr: record.fallthrough(),
        };
        let offset = self.predictor.fetch_offset(record.pc);
        self.predictor.update(record.pc, taken, target, &[uop], offset);

        debug!(
            pc = %format!("{:#x}", record.pc),
            class = class.mnemonic(),
            taken,
            target = %format!("{:#x}", target),
            predicted = prediction.taken,
            mispredicted,
            "resolved"
        );
        Resolution { taken, target, mispredicted }
    }

    /// Consume an entire trace.
    ///
    /// The first malformed record terminates the run. The final record is
    /// never scored since there is nothing after it.
    pub fn run<I>(&mut self, trace: I) -> Result<EvalStats, EvalError>
        where I: IntoIterator<Item = Result<TraceRecord, TraceError>>
    {
        info!(predictor = self.predictor.name(), "evaluating trace");
        let mut trace = trace.into_iter();
        let mut cur = trace.next().transpose()?;
        while let Some(record) = cur {
            let next = trace.next().transpose()?;
            self.step(&record, next.as_ref());
            cur = next;
        }
        info!(
            records = self.records,
            branches = self.stats.total(),
            mispredicted = self.stats.mispredict,
            "evaluation complete"
        );
        self.finish()
    }

    /// Return a snapshot of the final statistics.
    pub fn finish(&self) -> Result<EvalStats, EvalError> {
        if self.stats.total() == 0 {
            return Err(EvalError::NoControlFlow);
        }
        Ok(self.stats)
    }
}

/// Evaluate a predictor against a trace.
pub fn evaluate<P, I>(predictor: P, trace: I) -> Result<EvalStats, EvalError>
    where P: BranchPredictor,
          I: IntoIterator<Item = Result<TraceRecord, TraceError>>,
{
    Evaluator::new(predictor).run(trace)
}
