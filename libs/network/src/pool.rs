//! Receive slot pool
//!
//! Each listener owns one pool, touched only by its receive thread, so there is no
//! locking here. Frames are allocated once at construction and recycled on release.
//!
//! ```text
//!            cursor
//!              ↓
//! ┌────┬────┬────┬────┬────┬────┐
//! │ in │ in │free│free│ in │free│   acquire: scan from cursor, take first free,
//! └────┴────┴────┴────┴────┴────┘            cursor moves past it
//! ```
//!
//! ## Overload
//!
//! When every slot is in use, `acquire` does not block the receive loop. It counts an
//! overload event, logs a warning and hands out a transient frame allocated on the spot.
//! The transient frame is dropped on release instead of joining the pool. The overload
//! counter is the back-pressure signal for whoever watches the listener's metrics.

use crate::metrics::ListenerMetrics;
use nav_codec::{ReceivedFrame, WireFormat};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{trace, warn};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Exclusive handle to an acquired frame
///
/// Not `Clone`: a lease is consumed by [`MessageSlotPool::release`], so a released frame
/// can never be reached through it again.
#[derive(Debug)]
#[must_use = "an acquired frame must be released back to its pool"]
pub struct FrameLease {
    pool_id: u64,
    kind: LeaseKind,
}

#[derive(Debug)]
enum LeaseKind {
    Pooled(usize),
    Transient(Box<ReceivedFrame>),
}

impl FrameLease {
    /// True when the frame was allocated outside the pool because of overload
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, LeaseKind::Transient(_))
    }

    /// Pool slot index, for pooled frames
    pub fn slot(&self) -> Option<usize> {
        match self.kind {
            LeaseKind::Pooled(index) => Some(index),
            LeaseKind::Transient(_) => None,
        }
    }
}

/// Point-in-time pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub capacity: usize,
    pub in_use: usize,
    pub overload_events: u64,
    pub transient_outstanding: usize,
}

impl PoolStats {
    pub fn free(&self) -> usize {
        self.capacity - self.in_use
    }
}

/// Fixed set of reusable receive frames with a round-robin cursor
#[derive(Debug)]
pub struct MessageSlotPool {
    id: u64,
    name: String,
    format: WireFormat,
    frame_capacity: usize,
    slots: Vec<ReceivedFrame>,
    cursor: usize,
    in_use: usize,
    overload_events: u64,
    transient_outstanding: usize,
    metrics: Option<ListenerMetrics>,
}

impl MessageSlotPool {
    /// Allocate `size` frames of `frame_capacity` bytes each
    pub fn new(
        name: impl Into<String>,
        format: WireFormat,
        size: usize,
        frame_capacity: usize,
    ) -> Self {
        Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            format,
            frame_capacity,
            slots: (0..size)
                .map(|_| ReceivedFrame::new(format, frame_capacity))
                .collect(),
            cursor: 0,
            in_use: 0,
            overload_events: 0,
            transient_outstanding: 0,
            metrics: None,
        }
    }

    /// Report overload events to a listener's metrics as well
    pub fn with_metrics(mut self, metrics: ListenerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn frame_capacity(&self) -> usize {
        self.frame_capacity
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Take a free frame, or a transient one when the pool is exhausted
    pub fn acquire(&mut self) -> FrameLease {
        let size = self.slots.len();
        for step in 0..size {
            let index = (self.cursor + step) % size;
            let slot = &mut self.slots[index];
            if !slot.is_in_use() {
                slot.mark_in_use();
                self.cursor = (index + 1) % size;
                self.in_use += 1;
                trace!(pool = %self.name, slot = index, "Acquired slot");
                return FrameLease {
                    pool_id: self.id,
                    kind: LeaseKind::Pooled(index),
                };
            }
        }

        self.overload_events += 1;
        self.transient_outstanding += 1;
        if let Some(metrics) = &self.metrics {
            metrics.record_overload();
        }
        warn!(
            pool = %self.name,
            capacity = size,
            overload_events = self.overload_events,
            "Slot pool exhausted, allocating transient frame"
        );

        let mut frame = ReceivedFrame::new(self.format, self.frame_capacity);
        frame.mark_in_use();
        FrameLease {
            pool_id: self.id,
            kind: LeaseKind::Transient(Box::new(frame)),
        }
    }

    pub fn frame<'a>(&'a self, lease: &'a FrameLease) -> &'a ReceivedFrame {
        debug_assert_eq!(lease.pool_id, self.id, "lease used on a foreign pool");
        match &lease.kind {
            LeaseKind::Pooled(index) => &self.slots[*index],
            LeaseKind::Transient(frame) => &**frame,
        }
    }

    pub fn frame_mut<'a>(&'a mut self, lease: &'a mut FrameLease) -> &'a mut ReceivedFrame {
        debug_assert_eq!(lease.pool_id, self.id, "lease used on a foreign pool");
        match &mut lease.kind {
            LeaseKind::Pooled(index) => &mut self.slots[*index],
            LeaseKind::Transient(frame) => &mut **frame,
        }
    }

    /// Return a frame; pooled frames are reset, transient frames are dropped
    pub fn release(&mut self, lease: FrameLease) {
        debug_assert_eq!(lease.pool_id, self.id, "lease used on a foreign pool");
        match lease.kind {
            LeaseKind::Pooled(index) => {
                self.slots[index].reset();
                self.in_use -= 1;
            }
            LeaseKind::Transient(_) => {
                self.transient_outstanding -= 1;
            }
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.slots.len(),
            in_use: self.in_use,
            overload_events: self.overload_events,
            transient_outstanding: self.transient_outstanding,
        }
    }
}
