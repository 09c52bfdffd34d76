//! Broadcast counters
//!
//! Shared between the producer-facing server handle and the event-loop
//! worker, so every counter is atomic. Oversize drops are counted rather
//! than swallowed; a monitoring producer can watch them.

use std::sync::atomic::{AtomicU64, Ordering};

/// Server-wide broadcast statistics
#[derive(Debug, Default)]
pub struct BroadcastStats {
    /// Snapshots successfully framed and fanned out
    publishes: AtomicU64,
    /// Snapshots dropped because the serialized body hit the frame limit
    oversize_drops: AtomicU64,
    /// Frames accepted into subscriber queues
    frames_queued: AtomicU64,
    /// Subscribers ever admitted
    subscribers_joined: AtomicU64,
    /// Subscribers removed (write failure, lag, or shutdown)
    subscribers_left: AtomicU64,
    /// Subscribers disconnected because their queue was full
    lagging_disconnects: AtomicU64,
}

impl BroadcastStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_publish(&self) {
        self.publishes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_oversize_drop(&self) {
        self.oversize_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_frame_queued(&self) {
        self.frames_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_join(&self) {
        self.subscribers_joined.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_leave(&self) {
        self.subscribers_left.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_lagging_disconnect(&self) {
        self.lagging_disconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn publishes(&self) -> u64 {
        self.publishes.load(Ordering::Relaxed)
    }

    pub fn oversize_drops(&self) -> u64 {
        self.oversize_drops.load(Ordering::Relaxed)
    }

    pub fn frames_queued(&self) -> u64 {
        self.frames_queued.load(Ordering::Relaxed)
    }

    pub fn subscribers_joined(&self) -> u64 {
        self.subscribers_joined.load(Ordering::Relaxed)
    }

    pub fn subscribers_left(&self) -> u64 {
        self.subscribers_left.load(Ordering::Relaxed)
    }

    /// Currently connected subscribers
    pub fn active_subscribers(&self) -> u64 {
        self.subscribers_joined()
            .saturating_sub(self.subscribers_left())
    }

    pub fn lagging_disconnects(&self) -> u64 {
        self.lagging_disconnects.load(Ordering::Relaxed)
    }
}
