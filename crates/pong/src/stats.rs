//! Traffic counters shared by every connection.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// Packet and byte counters for the whole server.
///
/// All counters are relaxed atomics: they are only ever read for
/// reporting, never to synchronize anything.
#[derive(Debug)]
pub struct Stats {
    started: Instant,
    packets_received: AtomicU64,
    bytes_received: AtomicU64,
    packets_dropped: AtomicU64,
    bytes_dropped: AtomicU64,
    packets_sent: AtomicU64,
    bytes_sent: AtomicU64,
    changed: AtomicBool,
}

/// A point-in-time copy of [`Stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub uptime: Duration,
    pub packets_received: u64,
    pub bytes_received: u64,
    pub packets_dropped: u64,
    pub bytes_dropped: u64,
    pub packets_sent: u64,
    pub bytes_sent: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            packets_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            packets_dropped: AtomicU64::new(0),
            bytes_dropped: AtomicU64::new(0),
            packets_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            changed: AtomicBool::new(false),
        }
    }

    /// A frame arrived and decoded.
    pub fn record_received(&self, bytes: usize) {
        self.add(&self.packets_received, &self.bytes_received, bytes);
    }

    /// A frame arrived but was thrown away (undecodable or rejected).
    pub fn record_dropped(&self, bytes: usize) {
        self.add(&self.packets_dropped, &self.bytes_dropped, bytes);
    }

    /// A frame went out.
    pub fn record_sent(&self, bytes: usize) {
        self.add(&self.packets_sent, &self.bytes_sent, bytes);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime: self.started.elapsed(),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            packets_dropped: self.packets_dropped.load(Ordering::Relaxed),
            bytes_dropped: self.bytes_dropped.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }

    /// Returns `true` if any counter moved since the previous call.
    pub fn has_changed(&self) -> bool {
        self.changed.swap(false, Ordering::Relaxed)
    }

    fn add(&self, packets: &AtomicU64, bytes: &AtomicU64, count: usize) {
        packets.fetch_add(1, Ordering::Relaxed);
        bytes.fetch_add(count as u64, Ordering::Relaxed);
        self.changed.store(true, Ordering::Relaxed);
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "uptime:   {}s", self.uptime.as_secs())?;
        writeln!(
            f,
            "received: {} packets ({} bytes)",
            self.packets_received, self.bytes_received
        )?;
        writeln!(
            f,
            "dropped:  {} packets ({} bytes)",
            self.packets_dropped, self.bytes_dropped
        )?;
        write!(
            f,
            "sent:     {} packets ({} bytes)",
            self.packets_sent, self.bytes_sent
        )
    }
}
