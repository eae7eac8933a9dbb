//! Link statistics for observability
//!
//! Each connection keeps a rolling window of its most recent pushes; rates
//! are derived from that window when a snapshot is requested, so the data
//! path only appends.

use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use contracts::PortUsage;

/// One recorded push
#[derive(Debug, Clone, Copy)]
struct PushRecord {
    elements: usize,
    queue_depth: f32,
    at: Instant,
}

/// Rolling statistics of a single connection
#[derive(Debug)]
pub struct LinkStatistics {
    bits_per_element: usize,
    history_window: usize,
    enabled: bool,
    history: VecDeque<PushRecord>,
    stream_ids: BTreeSet<String>,
    dropped_count: u64,
    failure_count: u64,
}

impl LinkStatistics {
    pub fn new(bits_per_element: usize, history_window: usize) -> Self {
        let history_window = history_window.max(2);
        Self {
            bits_per_element,
            history_window,
            enabled: true,
            history: VecDeque::with_capacity(history_window),
            stream_ids: BTreeSet::new(),
            dropped_count: 0,
            failure_count: 0,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Record one delivered push
    pub fn update(&mut self, elements: usize, queue_depth: f32, eos: bool, stream_id: &str) {
        self.update_at(elements, queue_depth, eos, stream_id, Instant::now());
    }

    fn update_at(
        &mut self,
        elements: usize,
        queue_depth: f32,
        eos: bool,
        stream_id: &str,
        at: Instant,
    ) {
        if !self.enabled {
            return;
        }
        if self.history.len() == self.history_window {
            self.history.pop_front();
        }
        self.history.push_back(PushRecord {
            elements,
            queue_depth,
            at,
        });
        if eos {
            self.stream_ids.remove(stream_id);
        } else if !self.stream_ids.contains(stream_id) {
            self.stream_ids.insert(stream_id.to_string());
        }
    }

    pub fn inc_dropped_count(&mut self) {
        self.dropped_count += 1;
    }

    pub fn inc_failure_count(&mut self) {
        self.failure_count += 1;
    }

    /// Compute rates over the current window
    pub fn retrieve(&self) -> LinkSnapshot {
        self.retrieve_at(Instant::now())
    }

    fn retrieve_at(&self, now: Instant) -> LinkSnapshot {
        let mut snapshot = LinkSnapshot {
            stream_ids: self.stream_ids.iter().cloned().collect(),
            dropped_count: self.dropped_count,
            failure_count: self.failure_count,
            ..LinkSnapshot::default()
        };

        let (Some(oldest), Some(newest)) = (self.history.front(), self.history.back()) else {
            return snapshot;
        };

        let total_elements: usize = self.history.iter().map(|r| r.elements).sum();
        let total_queue: f32 = self.history.iter().map(|r| r.queue_depth).sum();
        let calls = self.history.len() as f32;
        let span = now.saturating_duration_since(oldest.at).as_secs_f32();

        if span > 0.0 {
            snapshot.elements_per_second = total_elements as f32 / span;
            snapshot.bits_per_second = snapshot.elements_per_second * self.bits_per_element as f32;
            snapshot.calls_per_second = calls / span;
        }
        snapshot.average_queue_depth = total_queue / calls;
        snapshot.time_since_last_call = now.saturating_duration_since(newest.at).as_secs_f32();
        snapshot
    }
}

/// Derived view of a `LinkStatistics` window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkSnapshot {
    pub elements_per_second: f32,
    pub bits_per_second: f32,
    pub calls_per_second: f32,
    pub stream_ids: Vec<String>,
    pub average_queue_depth: f32,
    pub time_since_last_call: f32,
    pub dropped_count: u64,
    pub failure_count: u64,
}

/// Port-wide activity indicators, readable without taking any lock
#[derive(Debug)]
pub struct PortActivity {
    origin: Instant,
    /// Nanoseconds since `origin` of the last push, plus one; zero = never
    last_push: AtomicU64,
    /// Highest transport backlog seen at the last push, as `f32` bits
    backlog: AtomicU32,
    connections: AtomicUsize,
}

impl PortActivity {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_push: AtomicU64::new(0),
            backlog: AtomicU32::new(0f32.to_bits()),
            connections: AtomicUsize::new(0),
        }
    }

    pub fn record_push(&self, highest_backlog: f32) {
        let elapsed = self.origin.elapsed().as_nanos() as u64;
        self.last_push.store(elapsed.saturating_add(1), Ordering::Relaxed);
        self.backlog.store(highest_backlog.to_bits(), Ordering::Relaxed);
    }

    pub fn set_connections(&self, count: usize) {
        self.connections.store(count, Ordering::Relaxed);
    }

    fn connections(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    fn backlog(&self) -> f32 {
        f32::from_bits(self.backlog.load(Ordering::Relaxed))
    }

    /// Time since the last push, `None` before the first one
    fn since_last_push(&self) -> Option<Duration> {
        match self.last_push.load(Ordering::Relaxed) {
            0 => None,
            stamp => {
                let at = Duration::from_nanos(stamp - 1);
                Some(self.origin.elapsed().saturating_sub(at))
            }
        }
    }

    pub fn usage(&self, idle_after: Duration, busy_threshold: f32) -> PortUsage {
        if self.connections() == 0 {
            return PortUsage::Idle;
        }
        match self.since_last_push() {
            None => PortUsage::Idle,
            Some(quiet) if quiet > idle_after => PortUsage::Idle,
            Some(_) if self.backlog() >= busy_threshold => PortUsage::Busy,
            Some(_) => PortUsage::Active,
        }
    }
}

impl Default for PortActivity {
    fn default() -> Self {
        Self::new()
    }
}
