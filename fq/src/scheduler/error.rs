//! Scheduler error types

use thiserror::Error;
use uuid::Uuid;

/// Errors returned by scheduler operations or delivered through a completion
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulerError {
    #[error("Unknown class: {class_id}")]
    UnknownClass { class_id: String },

    #[error("Invalid weight {weight} for class {class_id}: must be positive and finite with a finite request cost")]
    InvalidWeight { class_id: String, weight: f64 },

    #[error("Invalid request size {size}: must be positive")]
    InvalidSize { size: u64 },

    #[error("Class already registered: {class_id}")]
    DuplicateClass { class_id: String },

    #[error("Scheduler stopped")]
    Stopped,

    #[error("Scheduler already started")]
    AlreadyStarted,

    #[error("Request not pending: {request_id}")]
    UnknownRequest { request_id: Uuid },

    #[error("Request cancelled: {request_id}")]
    Cancelled { request_id: Uuid },
}

impl SchedulerError {
    /// Check if this error reports a stopped scheduler
    pub fn is_stopped(&self) -> bool {
        matches!(self, SchedulerError::Stopped)
    }

    /// Check if this error reports a cancelled request
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SchedulerError::Cancelled { .. })
    }
}
