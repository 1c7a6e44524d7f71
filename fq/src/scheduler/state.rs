//! WFQ bookkeeping: class registry, class heap and the global virtual clock
//!
//! Everything here is synchronous and lock-free; [`super::Scheduler`] wraps a
//! single `WfqState` in a mutex and drives `dispatch_next` from its dispatcher.

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, warn};

use super::class::{ClassStats, ServiceClass, is_valid_weight};
use super::error::SchedulerError;
use super::heap::ClassHeap;
use super::request::{Completion, Dispatch, Request, RequestId};

/// Result of one dispatch step
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DispatchResult {
    /// Nothing queued
    Idle,

    /// A request was released
    Dispatched(Dispatch),

    /// A popped class had nothing to dispatch and was dropped from the heap
    Skipped { class_id: String },
}

/// Scheduler-wide counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchedulerMetrics {
    pub registered_classes: usize,
    pub submitted: u64,
    pub dispatched: u64,
    pub cancelled: u64,
    pub failed: u64,
    pub invariant_violations: u64,
    pub peak_pending: usize,
    pub active_classes: usize,
    pub virtual_time: f64,
}

#[derive(Debug, Default)]
pub(crate) struct WfqState {
    classes: HashMap<String, ServiceClass>,
    heap: ClassHeap,
    virtual_time: f64,

    /// Pending request id -> owning class
    requests: HashMap<RequestId, String>,

    next_order: u64,
    next_sequence: u64,
    metrics: SchedulerMetrics,
}

impl WfqState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, class_id: &str, weight: f64) -> Result<(), SchedulerError> {
        if !is_valid_weight(weight) {
            return Err(SchedulerError::InvalidWeight {
                class_id: class_id.to_string(),
                weight,
            });
        }
        if self.classes.contains_key(class_id) {
            return Err(SchedulerError::DuplicateClass {
                class_id: class_id.to_string(),
            });
        }

        let order = self.next_order;
        self.next_order += 1;
        self.classes
            .insert(class_id.to_string(), ServiceClass::new(class_id, weight, order));
        self.metrics.registered_classes = self.classes.len();

        debug!(%class_id, weight, order, "WfqState::register: registered");
        Ok(())
    }

    pub(crate) fn enqueue(&mut self, class_id: &str, size: u64) -> Result<Completion, SchedulerError> {
        let virtual_time = self.virtual_time;
        let class = self
            .classes
            .get_mut(class_id)
            .ok_or_else(|| SchedulerError::UnknownClass {
                class_id: class_id.to_string(),
            })?;
        if size == 0 {
            return Err(SchedulerError::InvalidSize { size });
        }

        let (request, completion) = Request::new(class_id, size);
        self.requests.insert(request.id, class_id.to_string());
        class.pending.push_back(request);

        if !class.active {
            // Restart from the current clock; never reuse a finish time from an earlier busy period
            if let Some(finish) = class.stamp(virtual_time.max(0.0)) {
                class.active = true;
                debug_assert!(!self.heap.contains(&class.id), "class already in heap");
                self.heap.push(&class.id, finish, class.order);
                debug!(%class_id, finish, "WfqState::enqueue: class activated");
            }
        }

        self.metrics.submitted += 1;
        self.metrics.peak_pending = self.metrics.peak_pending.max(self.requests.len());
        Ok(completion)
    }

    /// Release the head request of the class with the smallest virtual finish time
    pub(crate) fn dispatch_next(&mut self) -> DispatchResult {
        let Some(entry) = self.heap.pop() else {
            return DispatchResult::Idle;
        };

        let Some(class) = self.classes.get_mut(&entry.class_id) else {
            warn!(class_id = %entry.class_id, "Heap held an unregistered class, dropping it");
            self.metrics.invariant_violations += 1;
            return DispatchResult::Skipped {
                class_id: entry.class_id,
            };
        };

        let Some(request) = class.pending.pop_front() else {
            warn!(class_id = %class.id, "Active class had an empty queue, dropping it from the heap");
            class.active = false;
            self.metrics.invariant_violations += 1;
            return DispatchResult::Skipped {
                class_id: entry.class_id,
            };
        };

        let virtual_finish = class.virtual_finish;
        self.virtual_time = self.virtual_time.max(virtual_finish);

        let now = Instant::now();
        let delay = now.saturating_duration_since(request.arrival);
        class.record_service(delay, now);

        match class.stamp(self.virtual_time) {
            Some(next_finish) => self.heap.push(&class.id, next_finish, class.order),
            None => class.active = false,
        }

        let dispatch = Dispatch {
            request_id: request.id,
            class_id: request.class_id.clone(),
            size: request.size,
            sequence: self.next_sequence,
            virtual_finish,
            delay,
        };
        self.next_sequence += 1;
        self.requests.remove(&request.id);
        self.metrics.dispatched += 1;

        request.complete(Ok(dispatch.clone()));
        DispatchResult::Dispatched(dispatch)
    }

    /// Dispatch until the heap is empty, returning how many requests were released
    pub(crate) fn drain(&mut self) -> usize {
        let mut dispatched = 0;
        loop {
            match self.dispatch_next() {
                DispatchResult::Idle => return dispatched,
                DispatchResult::Dispatched(_) => dispatched += 1,
                DispatchResult::Skipped { .. } => {}
            }
        }
    }

    /// Complete every pending request with `error`, returning how many were failed
    pub(crate) fn fail_all(&mut self, error: &SchedulerError) -> usize {
        let mut failed = 0;
        for class in self.classes.values_mut() {
            for request in class.pending.drain(..) {
                request.complete(Err(error.clone()));
                failed += 1;
            }
            class.active = false;
        }
        self.heap.clear();
        self.requests.clear();
        self.metrics.failed += failed as u64;
        failed
    }

    /// Remove a queued request before it is dispatched
    pub(crate) fn cancel(&mut self, request_id: RequestId) -> Result<(), SchedulerError> {
        let not_pending = || SchedulerError::UnknownRequest { request_id };
        let class_id = self.requests.get(&request_id).cloned().ok_or_else(not_pending)?;
        let class = self.classes.get_mut(&class_id).ok_or_else(not_pending)?;
        let position = class
            .pending
            .iter()
            .position(|r| r.id == request_id)
            .ok_or_else(not_pending)?;
        let request = class.pending.remove(position).ok_or_else(not_pending)?;

        if class.pending.is_empty() {
            debug!(%class_id, "WfqState::cancel: class emptied, deactivating");
            class.active = false;
            self.heap.remove(&class_id);
        } else if position == 0 {
            let start = class.virtual_start;
            if let Some(finish) = class.stamp(start) {
                debug!(%class_id, finish, "WfqState::cancel: head changed, restamping");
                self.heap.remove(&class_id);
                self.heap.push(&class_id, finish, class.order);
            }
        }

        class.cancelled += 1;
        self.requests.remove(&request_id);
        self.metrics.cancelled += 1;

        request.complete(Err(SchedulerError::Cancelled { request_id }));
        Ok(())
    }

    pub(crate) fn stats(&self) -> HashMap<String, ClassStats> {
        self.classes
            .iter()
            .map(|(id, class)| (id.clone(), class.stats()))
            .collect()
    }

    pub(crate) fn metrics(&self) -> SchedulerMetrics {
        SchedulerMetrics {
            active_classes: self.heap.len(),
            virtual_time: self.virtual_time,
            ..self.metrics.clone()
        }
    }

    pub(crate) fn virtual_time(&self) -> f64 {
        self.virtual_time
    }

    pub(crate) fn pending(&self) -> usize {
        self.requests.len()
    }
}
