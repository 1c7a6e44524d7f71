//! Per-class queue state and its statistics snapshot

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::request::Request;

/// Whether `weight` is usable: positive, finite, and small enough that the
/// largest request size still has a finite virtual cost
pub(crate) fn is_valid_weight(weight: f64) -> bool {
    weight > 0.0 && weight.is_finite() && (u64::MAX as f64 / weight).is_finite()
}

/// A service class: FIFO of pending requests plus WFQ bookkeeping
#[derive(Debug)]
pub(crate) struct ServiceClass {
    pub id: String,
    pub weight: f64,

    /// Registration order, used to break virtual finish time ties
    pub order: u64,

    pub pending: VecDeque<Request>,

    /// Virtual time the head request's service starts from
    pub virtual_start: f64,
    pub virtual_finish: f64,
    pub active: bool,

    pub processed: u64,
    pub cancelled: u64,
    pub total_delay: Duration,
    pub last_service: Option<Instant>,
}

impl ServiceClass {
    pub(crate) fn new(id: impl Into<String>, weight: f64, order: u64) -> Self {
        Self {
            id: id.into(),
            weight,
            order,
            pending: VecDeque::new(),
            virtual_start: 0.0,
            virtual_finish: 0.0,
            active: false,
            processed: 0,
            cancelled: 0,
            total_delay: Duration::ZERO,
            last_service: None,
        }
    }

    /// Virtual service cost of the head request (size / weight)
    pub(crate) fn head_cost(&self) -> Option<f64> {
        self.pending.front().map(|r| r.size as f64 / self.weight)
    }

    /// Stamp the head request starting at `start`, returning the new finish time
    pub(crate) fn stamp(&mut self, start: f64) -> Option<f64> {
        let cost = self.head_cost()?;
        self.virtual_start = start;
        self.virtual_finish = start + cost;
        Some(self.virtual_finish)
    }

    /// Record a dispatch of a request that waited `delay`
    pub(crate) fn record_service(&mut self, delay: Duration, now: Instant) {
        self.processed += 1;
        self.total_delay += delay;
        self.last_service = Some(now);
    }

    pub(crate) fn stats(&self) -> ClassStats {
        let average_delay = if self.processed > 0 {
            self.total_delay.div_f64(self.processed as f64)
        } else {
            Duration::ZERO
        };

        ClassStats {
            weight: self.weight,
            processed: self.processed,
            pending: self.pending.len(),
            cancelled: self.cancelled,
            total_delay: self.total_delay,
            average_delay,
            since_last_service: self.last_service.map(|t| t.elapsed()),
            active: self.active,
            virtual_finish: self.virtual_finish,
        }
    }
}

/// Point-in-time statistics for one class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStats {
    pub weight: f64,
    pub processed: u64,
    pub pending: usize,
    pub cancelled: u64,
    pub total_delay: Duration,
    pub average_delay: Duration,

    /// Time since the class last had a request dispatched
    pub since_last_service: Option<Duration>,
    pub active: bool,
    pub virtual_finish: f64,
}
