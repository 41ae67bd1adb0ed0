//! Trace-driven evaluation of RISC-V branch prediction front-ends.

pub mod branch;
pub mod config;
pub mod error;
pub mod history;
pub mod predictor;
pub mod sim;
pub mod stats;
pub mod trace;

pub use branch::*;
pub use config::*;
pub use error::*;
pub use history::*;
pub use predictor::*;
pub use sim::*;
pub use stats::*;
pub use trace::*;
