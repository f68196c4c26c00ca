//! Listener Metrics
//!
//! Lock-free counters updated from a listener's receive thread and its control surface.
//! Snapshots are cheap and may be taken from any thread.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Counters for one listener
#[derive(Clone, Default)]
pub struct ListenerMetrics {
    frames_received: Arc<AtomicU64>,
    bytes_received: Arc<AtomicU64>,
    frames_sent: Arc<AtomicU64>,
    bytes_sent: Arc<AtomicU64>,
    receive_errors: Arc<AtomicU64>,
    send_errors: Arc<AtomicU64>,
    overload_events: Arc<AtomicU64>,
    dropped_frames: Arc<AtomicU64>,

    send_latency: Arc<RwLock<LatencyTracker>>,
    last_receive: Arc<RwLock<Option<Instant>>>,
}

/// Point-in-time copy of [`ListenerMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub bytes_received: u64,
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub receive_errors: u64,
    pub send_errors: u64,
    /// Acquires served by a transient frame because the pool was exhausted
    pub overload_events: u64,
    /// Received data discarded before dispatch (oversized datagrams or sentences)
    pub dropped_frames: u64,
    pub avg_send_latency_ns: u64,
    pub p99_send_latency_ns: u64,
    /// Milliseconds since the last received frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_ms: Option<u64>,
}

impl ListenerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_receive(&self, bytes: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
        *self.last_receive.write() = Some(Instant::now());
    }

    #[inline]
    pub fn record_send(&self, bytes: usize, latency_ns: u64) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);

        // Skip the sample rather than wait on a reader
        if let Some(mut tracker) = self.send_latency.try_write() {
            tracker.record(latency_ns);
        }
    }

    #[inline]
    pub fn record_receive_error(&self) {
        self.receive_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_send_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_overload(&self) {
        self.overload_events.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self) {
        self.dropped_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let latency = self.send_latency.read();
        MetricsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            overload_events: self.overload_events.load(Ordering::Relaxed),
            dropped_frames: self.dropped_frames.load(Ordering::Relaxed),
            avg_send_latency_ns: latency.average(),
            p99_send_latency_ns: latency.percentile(99),
            idle_ms: self
                .last_receive
                .read()
                .map(|at| at.elapsed().as_millis() as u64),
        }
    }
}

impl std::fmt::Debug for ListenerMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ListenerMetrics")
            .field(&self.snapshot())
            .finish()
    }
}

/// Send latency samples over a sliding window
#[derive(Debug)]
struct LatencyTracker {
    samples: Vec<u64>,
    position: usize,
    total_samples: u64,
    sum: u64,
}

impl LatencyTracker {
    const SAMPLE_SIZE: usize = 256;

    fn record(&mut self, latency_ns: u64) {
        self.sum = self.sum.saturating_add(latency_ns);
        self.total_samples += 1;

        if self.samples.len() < Self::SAMPLE_SIZE {
            self.samples.push(latency_ns);
        } else {
            self.samples[self.position] = latency_ns;
            self.position = (self.position + 1) % Self::SAMPLE_SIZE;
        }
    }

    fn average(&self) -> u64 {
        if self.total_samples > 0 {
            self.sum / self.total_samples
        } else {
            0
        }
    }

    fn percentile(&self, p: usize) -> u64 {
        if self.samples.is_empty() {
            return 0;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_unstable();
        let index = ((sorted.len() - 1) * p) / 100;
        sorted[index]
    }
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self {
            samples: Vec::with_capacity(Self::SAMPLE_SIZE),
            position: 0,
            total_samples: 0,
            sum: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = ListenerMetrics::new();
        metrics.record_receive(56);
        metrics.record_receive(24);
        metrics.record_receive_error();
        metrics.record_overload();
        metrics.record_send(48, 1_000);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_received, 2);
        assert_eq!(snapshot.bytes_received, 80);
        assert_eq!(snapshot.receive_errors, 1);
        assert_eq!(snapshot.overload_events, 1);
        assert_eq!(snapshot.frames_sent, 1);
        assert_eq!(snapshot.avg_send_latency_ns, 1_000);
        assert!(snapshot.idle_ms.is_some());
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = ListenerMetrics::new();
        let handle = metrics.clone();
        handle.record_dropped();
        assert_eq!(metrics.snapshot().dropped_frames, 1);
    }

    #[test]
    fn test_percentile_over_window() {
        let mut tracker = LatencyTracker::default();
        for ns in 1..=100 {
            tracker.record(ns);
        }
        assert_eq!(tracker.percentile(99), 99);
        assert_eq!(tracker.average(), 50);
    }
}
