//! Scheduler implementation

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;

use super::class::ClassStats;
use super::config::{SchedulerConfig, ShutdownPolicy};
use super::error::SchedulerError;
use super::request::{Completion, RequestId};
use super::state::{DispatchResult, SchedulerMetrics, WfqState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Running,
    Stopped,
}

/// Internal state protected by mutex
struct SchedulerInner {
    state: WfqState,
    phase: Phase,
}

/// State shared with the dispatcher task
struct Shared {
    inner: Mutex<SchedulerInner>,
    notify: Notify,
}

/// What `stop` did with the requests still queued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub policy: ShutdownPolicy,
    pub drained: usize,
    pub failed: usize,
}

/// The Scheduler admits requests into per-class queues and releases them
/// in weighted fair order from a single dispatcher task.
pub struct Scheduler {
    config: SchedulerConfig,
    shared: Arc<Shared>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a new scheduler with the given configuration and no classes
    pub fn new(config: SchedulerConfig) -> Self {
        debug!(?config, "Scheduler::new: called");
        Self::with_state(config, WfqState::new())
    }

    /// Create a scheduler with every class listed in `config` registered
    pub fn from_config(config: &Config) -> Result<Self, SchedulerError> {
        debug!(classes = config.classes.len(), "Scheduler::from_config: called");
        let mut state = WfqState::new();
        for class in &config.classes {
            state.register(&class.id, class.weight)?;
        }
        Ok(Self::with_state(config.scheduler.clone(), state))
    }

    fn with_state(config: SchedulerConfig, state: WfqState) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                inner: Mutex::new(SchedulerInner {
                    state,
                    phase: Phase::Created,
                }),
                notify: Notify::new(),
            }),
            dispatcher: Mutex::new(None),
        }
    }

    /// Get the scheduler configuration
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Register a class with the given weight
    pub async fn register_class(&self, class_id: &str, weight: f64) -> Result<(), SchedulerError> {
        debug!(%class_id, weight, "Scheduler::register_class: called");
        let mut inner = self.shared.inner.lock().await;
        if inner.phase == Phase::Stopped {
            return Err(SchedulerError::Stopped);
        }
        inner.state.register(class_id, weight)
    }

    /// Admit a request of `size` into `class_id`
    ///
    /// Returns a handle that resolves when the request is dispatched. Requests
    /// submitted before `start` wait in their queues until the dispatcher runs.
    pub async fn submit(&self, class_id: &str, size: u64) -> Result<Completion, SchedulerError> {
        debug!(%class_id, size, "Scheduler::submit: called");
        let mut inner = self.shared.inner.lock().await;
        if inner.phase == Phase::Stopped {
            debug!(%class_id, "Scheduler::submit: stopped, rejecting");
            return Err(SchedulerError::Stopped);
        }

        let completion = inner.state.enqueue(class_id, size)?;
        let running = inner.phase == Phase::Running;
        drop(inner);

        if running {
            self.shared.notify.notify_one();
        }
        Ok(completion)
    }

    /// Remove a queued request before it is dispatched
    pub async fn cancel(&self, request_id: RequestId) -> Result<(), SchedulerError> {
        debug!(%request_id, "Scheduler::cancel: called");
        let mut inner = self.shared.inner.lock().await;
        if inner.phase == Phase::Stopped {
            return Err(SchedulerError::Stopped);
        }
        inner.state.cancel(request_id)
    }

    /// Spawn the dispatcher task
    pub async fn start(&self) -> Result<(), SchedulerError> {
        debug!("Scheduler::start: called");
        let mut dispatcher = self.dispatcher.lock().await;
        let mut inner = self.shared.inner.lock().await;
        match inner.phase {
            Phase::Running => return Err(SchedulerError::AlreadyStarted),
            Phase::Stopped => return Err(SchedulerError::Stopped),
            Phase::Created => {}
        }
        inner.phase = Phase::Running;
        let backlog = inner.state.pending();
        drop(inner);

        *dispatcher = Some(tokio::spawn(dispatch_loop(self.shared.clone())));
        self.shared.notify.notify_one();

        info!(backlog, "Scheduler started");
        Ok(())
    }

    /// Stop the scheduler
    ///
    /// Applies the configured [`ShutdownPolicy`] to every queued request before
    /// returning, then joins the dispatcher. Every later mutating call fails
    /// with [`SchedulerError::Stopped`].
    pub async fn stop(&self) -> Result<ShutdownReport, SchedulerError> {
        debug!("Scheduler::stop: called");
        let mut dispatcher = self.dispatcher.lock().await;
        let mut inner = self.shared.inner.lock().await;
        if inner.phase == Phase::Stopped {
            return Err(SchedulerError::Stopped);
        }
        inner.phase = Phase::Stopped;

        let policy = self.config.shutdown_policy;
        let report = match policy {
            ShutdownPolicy::Drain => ShutdownReport {
                policy,
                drained: inner.state.drain(),
                failed: 0,
            },
            ShutdownPolicy::Fail => ShutdownReport {
                policy,
                drained: 0,
                failed: inner.state.fail_all(&SchedulerError::Stopped),
            },
        };
        drop(inner);

        self.shared.notify.notify_one();

        if let Some(handle) = dispatcher.take() {
            debug!("Scheduler::stop: joining dispatcher");
            let abort = handle.abort_handle();
            match tokio::time::timeout(self.config.stop_timeout(), handle).await {
                Ok(Ok(())) => debug!("Scheduler::stop: dispatcher joined"),
                Ok(Err(e)) => warn!(error = %e, "Dispatcher task ended abnormally"),
                Err(_) => {
                    warn!(timeout = ?self.config.stop_timeout(), "Dispatcher did not stop in time, aborting");
                    abort.abort();
                }
            }
        }

        info!(%policy, drained = report.drained, failed = report.failed, "Scheduler stopped");
        Ok(report)
    }

    /// Check whether the dispatcher is running
    pub async fn is_running(&self) -> bool {
        self.shared.inner.lock().await.phase == Phase::Running
    }

    /// Get a snapshot of per-class statistics
    pub async fn stats(&self) -> HashMap<String, ClassStats> {
        debug!("Scheduler::stats: called");
        let inner = self.shared.inner.lock().await;
        inner.state.stats()
    }

    /// Get scheduler-wide counters
    pub async fn metrics(&self) -> SchedulerMetrics {
        debug!("Scheduler::metrics: called");
        let inner = self.shared.inner.lock().await;
        inner.state.metrics()
    }

    /// Get the current global virtual time
    pub async fn virtual_time(&self) -> f64 {
        self.shared.inner.lock().await.state.virtual_time()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // Pending senders drop with the state, so waiting callers see Stopped
        if let Some(handle) = self.dispatcher.get_mut().take() {
            debug!("Scheduler::drop: aborting dispatcher");
            handle.abort();
        }
    }
}

/// Dispatcher task: sleeps until woken, then drains every dispatchable request
async fn dispatch_loop(shared: Arc<Shared>) {
    info!("Dispatcher started");
    loop {
        shared.notify.notified().await;

        let mut dispatched = 0usize;
        loop {
            // One critical section per dispatch so admitters can interleave
            let mut inner = shared.inner.lock().await;
            if inner.phase == Phase::Stopped {
                info!("Dispatcher exiting");
                return;
            }

            match inner.state.dispatch_next() {
                DispatchResult::Idle => break,
                DispatchResult::Dispatched(dispatch) => {
                    debug!(
                        class_id = %dispatch.class_id,
                        request_id = %dispatch.request_id,
                        size = dispatch.size,
                        delay = ?dispatch.delay,
                        "Dispatched"
                    );
                    dispatched += 1;
                }
                DispatchResult::Skipped { class_id } => {
                    warn!(%class_id, "Dispatcher skipped class with nothing to dispatch");
                }
            }
        }

        debug!(dispatched, "dispatch_loop: drained");
    }
}
