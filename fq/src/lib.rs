//! Fairqueue - Weighted Fair Queuing admission and dispatch
//!
//! Fairqueue accepts variably sized work items tagged with a service class and
//! releases them in an order that approximates Generalized Processor Sharing.
//!
//! # Core Concepts
//!
//! - **Weighted Shares**: Backlogged classes are served in proportion to weight
//! - **Bounded Latency**: One heap pop releases one request, so no class waits
//!   behind another class's entire backlog
//! - **Virtual Time**: A logical clock advanced only by service orders requests
//! - **Single Dispatcher**: Many concurrent admitters, one dispatch path
//!
//! # Modules
//!
//! - [`scheduler`] - Class queues, virtual-time heap and the dispatcher
//! - [`config`] - Configuration types and loading

pub mod config;
pub mod scheduler;

// Re-export commonly used types
pub use config::{ClassConfig, Config};
pub use scheduler::{
    ClassStats, Completion, Dispatch, Outcome, RequestId, Scheduler, SchedulerConfig, SchedulerError, SchedulerMetrics,
    ShutdownPolicy, ShutdownReport,
};
