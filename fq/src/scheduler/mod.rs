//! Weighted fair queuing scheduler
//!
//! Requests are queued per service class. A single dispatcher releases them
//! in order of virtual finish time, so every continuously backlogged class
//! receives service in proportion to its weight and a small request in a
//! lightly loaded class never waits behind another class's whole backlog.

mod class;
mod config;
mod core;
mod error;
mod heap;
mod request;
mod state;

pub(crate) use class::is_valid_weight;
pub use class::ClassStats;
pub use config::{SchedulerConfig, ShutdownPolicy};
pub use core::{Scheduler, ShutdownReport};
pub use error::SchedulerError;
pub use request::{Completion, Dispatch, Outcome, RequestId};
pub use state::SchedulerMetrics;
