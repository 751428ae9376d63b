//! Per-build phase timings and process-wide lifecycle counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Phases of a connection build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Resolution,
    Connect,
    Bootstrap,
}

/// Immutable timing record of one connection build
///
/// A phase that never ran stays `None`, so a failed build reports exactly
/// the phases it reached.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub resolution_time_ms: Option<f64>,
    pub connect_time_ms: Option<f64>,
    pub bootstrap_time_ms: Option<f64>,
    pub total_time_ms: Option<f64>,
}

impl MetricsSnapshot {
    /// Resolution plus connect, the time until the handle was usable
    pub fn connection_time_ms(&self) -> Option<f64> {
        match (self.resolution_time_ms, self.connect_time_ms) {
            (Some(r), Some(c)) => Some(r + c),
            _ => None,
        }
    }
}

/// Times the phases of one build
#[derive(Debug)]
pub struct MetricsRecorder {
    started: Instant,
    snapshot: MetricsSnapshot,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            snapshot: MetricsSnapshot::default(),
        }
    }

    /// Run `f`, recording its wall time against `phase` whether it succeeds or not.
    ///
    /// Returns the result together with the elapsed milliseconds.
    pub fn time<T, E>(
        &mut self,
        phase: Phase,
        f: impl FnOnce() -> Result<T, E>,
    ) -> (Result<T, E>, f64) {
        let start = Instant::now();
        let result = f();
        let elapsed = elapsed_ms(start);
        self.record(phase, elapsed);
        (result, elapsed)
    }

    pub fn record(&mut self, phase: Phase, ms: f64) {
        let slot = match phase {
            Phase::Resolution => &mut self.snapshot.resolution_time_ms,
            Phase::Connect => &mut self.snapshot.connect_time_ms,
            Phase::Bootstrap => &mut self.snapshot.bootstrap_time_ms,
        };
        *slot = Some(ms);
    }

    /// Snapshot with the total measured up to now
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_time_ms: Some(elapsed_ms(self.started)),
            ..self.snapshot.clone()
        }
    }
}

pub fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Process-wide lifecycle counters, shared across builds
#[derive(Debug, Default)]
pub struct ConnectionCounters {
    builds_started: AtomicU64,
    builds_succeeded: AtomicU64,
    builds_failed: AtomicU64,
    bootstrap_fetches: AtomicU64,
    bootstrap_failures: AtomicU64,
    bootstrap_short_circuits: AtomicU64,
}

/// Point-in-time copy of [`ConnectionCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub builds_started: u64,
    pub builds_succeeded: u64,
    pub builds_failed: u64,
    pub bootstrap_fetches: u64,
    pub bootstrap_failures: u64,
    pub bootstrap_short_circuits: u64,
}

impl ConnectionCounters {
    pub fn build_started(&self) {
        self.builds_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn build_succeeded(&self) {
        self.builds_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn build_failed(&self) {
        self.builds_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bootstrap_fetched(&self) {
        self.bootstrap_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bootstrap_failed(&self) {
        self.bootstrap_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bootstrap_short_circuited(&self) {
        self.bootstrap_short_circuits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            builds_started: self.builds_started.load(Ordering::Relaxed),
            builds_succeeded: self.builds_succeeded.load(Ordering::Relaxed),
            builds_failed: self.builds_failed.load(Ordering::Relaxed),
            bootstrap_fetches: self.bootstrap_fetches.load(Ordering::Relaxed),
            bootstrap_failures: self.bootstrap_failures.load(Ordering::Relaxed),
            bootstrap_short_circuits: self.bootstrap_short_circuits.load(Ordering::Relaxed),
        }
    }
}
