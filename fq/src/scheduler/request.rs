//! Request and completion types

use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

use super::error::SchedulerError;

/// Identifier assigned to every admitted request
pub type RequestId = Uuid;

/// What a waiting caller eventually receives
pub type Outcome = Result<Dispatch, SchedulerError>;

/// Record of a request released by the dispatcher
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub request_id: RequestId,
    pub class_id: String,

    /// Size the request was submitted with
    pub size: u64,

    /// Scheduler-wide dispatch counter, starting at 0
    pub sequence: u64,

    /// Virtual finish time the class carried when it was popped
    pub virtual_finish: f64,

    /// Time between admission and dispatch
    pub delay: Duration,
}

/// A queued unit of work
#[derive(Debug)]
pub(crate) struct Request {
    pub id: RequestId,
    pub class_id: String,
    pub size: u64,
    pub arrival: Instant,
    completion: oneshot::Sender<Outcome>,
}

impl Request {
    /// Create a request and the completion its caller waits on
    pub(crate) fn new(class_id: &str, size: u64) -> (Self, Completion) {
        let id = Uuid::now_v7();
        let (tx, rx) = oneshot::channel();
        let request = Self {
            id,
            class_id: class_id.to_string(),
            size,
            arrival: Instant::now(),
            completion: tx,
        };
        let completion = Completion {
            request_id: id,
            class_id: class_id.to_string(),
            rx,
        };
        (request, completion)
    }

    /// Fulfill the completion. Consumes the request so it can only happen once.
    ///
    /// Returns false if the caller stopped waiting.
    pub(crate) fn complete(self, outcome: Outcome) -> bool {
        let delivered = self.completion.send(outcome).is_ok();
        if !delivered {
            debug!(request_id = %self.id, "Request::complete: caller no longer waiting");
        }
        delivered
    }
}

/// Caller-side handle for one admitted request
///
/// Resolves once: to a [`Dispatch`] when the request is released, or to an
/// error if it was cancelled or the scheduler shut down without draining it.
#[derive(Debug)]
pub struct Completion {
    request_id: RequestId,
    class_id: String,
    rx: oneshot::Receiver<Outcome>,
}

impl Completion {
    /// Get the id of the request this handle tracks
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Get the class the request was submitted to
    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    /// Wait for the request to be dispatched, failed or cancelled
    pub async fn wait(self) -> Outcome {
        debug!(request_id = %self.request_id, "Completion::wait: called");
        // A dropped sender means the scheduler went away with this request queued
        self.rx.await.unwrap_or(Err(SchedulerError::Stopped))
    }

    #[cfg(test)]
    pub(crate) fn try_outcome(&mut self) -> Option<Outcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(SchedulerError::Stopped)),
        }
    }
}
