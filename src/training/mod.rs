//! The training driver: the per-step control loop, the roster of trainers,
//! reward and diagnostic bookkeeping, and the pickle outputs.

pub mod benchmark;
pub mod control_loop;
pub mod ledger;
pub mod outputs;
pub mod roster;

pub use control_loop::{ControlLoop, LoopSettings, LoopState, RunOutcome};
pub use roster::ShuffleMode;
