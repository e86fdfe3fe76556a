//! Metrics Collection
//!
//! Counters for record administration and name-server control.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Metrics collector for the zone manager
#[derive(Default)]
pub struct Metrics {
    /// Start time for uptime calculation
    start_time: Option<Instant>,

    /// Records added
    pub records_added: AtomicU64,

    /// Records deleted
    pub records_deleted: AtomicU64,

    /// Queries served
    pub queries: AtomicU64,

    /// Requests refused by validation, conflict or lookup
    pub rejected_requests: AtomicU64,

    /// Mutations that failed after validation (structure or I/O)
    pub failed_mutations: AtomicU64,

    /// Successful name-server reloads
    pub reloads: AtomicU64,

    /// Failed name-server commands
    pub control_failures: AtomicU64,

    /// Current zone serial
    pub serial: AtomicU64,

    /// Current number of records
    pub record_count: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn inc_records_added(&self) {
        self.records_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_records_deleted(&self) {
        self.records_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_queries(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected(&self) {
        self.rejected_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed_mutations(&self) {
        self.failed_mutations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reloads(&self) {
        self.reloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_control_failures(&self) {
        self.control_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Update zone gauges
    pub fn set_zone(&self, serial: u32, record_count: usize) {
        self.serial.store(serial as u64, Ordering::Relaxed);
        self.record_count.store(record_count as u64, Ordering::Relaxed);
    }

    /// Export metrics in Prometheus format
    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();

        let mut metric = |name: &str, kind: &str, help: &str, value: u64| {
            output.push_str(&format!(
                "# HELP tld_zone_manager_{name} {help}\n\
                 # TYPE tld_zone_manager_{name} {kind}\n\
                 tld_zone_manager_{name} {value}\n\n",
            ));
        };

        metric("uptime_seconds", "gauge", "Zone manager uptime in seconds", self.uptime_secs());

        // Records
        metric("records_added_total", "counter", "Records added", self.records_added.load(Ordering::Relaxed));
        metric("records_deleted_total", "counter", "Records deleted", self.records_deleted.load(Ordering::Relaxed));
        metric("queries_total", "counter", "Record queries served", self.queries.load(Ordering::Relaxed));
        metric("rejected_requests_total", "counter", "Rejected requests", self.rejected_requests.load(Ordering::Relaxed));
        metric("failed_mutations_total", "counter", "Mutations failed after validation", self.failed_mutations.load(Ordering::Relaxed));

        // Name server
        metric("reloads_total", "counter", "Name-server reloads", self.reloads.load(Ordering::Relaxed));
        metric("control_failures_total", "counter", "Failed name-server commands", self.control_failures.load(Ordering::Relaxed));

        // Zone state
        metric("zone_serial", "gauge", "Current zone serial", self.serial.load(Ordering::Relaxed));
        metric("zone_records", "gauge", "Records in the zone", self.record_count.load(Ordering::Relaxed));

        output
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "uptime_secs": self.uptime_secs(),
            "records": {
                "added": self.records_added.load(Ordering::Relaxed),
                "deleted": self.records_deleted.load(Ordering::Relaxed),
                "queries": self.queries.load(Ordering::Relaxed),
                "rejected": self.rejected_requests.load(Ordering::Relaxed),
                "failed": self.failed_mutations.load(Ordering::Relaxed),
            },
            "nameserver": {
                "reloads": self.reloads.load(Ordering::Relaxed),
                "failures": self.control_failures.load(Ordering::Relaxed),
            },
            "zone": {
                "serial": self.serial.load(Ordering::Relaxed),
                "records": self.record_count.load(Ordering::Relaxed),
            },
        })
    }
}
