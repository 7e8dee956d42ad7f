//! Metric helpers for `wirelink`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. With the `metrics` feature
//! disabled the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking open sessions.
pub const SESSIONS_OPEN: &str = "wirelink_sessions_open";
/// Name of the counter tracking frames sent and received.
pub const FRAMES_TOTAL: &str = "wirelink_frames_total";
/// Name of the counter tracking automatic reconnects.
pub const RECONNECTS_TOTAL: &str = "wirelink_reconnects_total";
/// Name of the counter tracking session I/O and framing errors.
pub const ERRORS_TOTAL: &str = "wirelink_errors_total";
/// Name of the counter tracking fragments produced and consumed.
pub const FRAGMENTS_TOTAL: &str = "wirelink_fragments_total";

/// Direction of frame processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Frames read from the peer.
    Inbound,
    /// Frames written to the peer.
    Outbound,
}

impl Direction {
    /// Label value used for the `direction` metric label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Increment the open sessions gauge.
pub fn inc_sessions() {
    #[cfg(feature = "metrics")]
    gauge!(SESSIONS_OPEN).increment(1.0);
}

/// Decrement the open sessions gauge.
pub fn dec_sessions() {
    #[cfg(feature = "metrics")]
    gauge!(SESSIONS_OPEN).decrement(1.0);
}

/// Record a frame for the given direction.
pub fn inc_frames(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_TOTAL, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record `count` fragments for the given direction.
pub fn inc_fragments(direction: Direction, count: usize) {
    #[cfg(feature = "metrics")]
    counter!(FRAGMENTS_TOTAL, "direction" => direction.as_str()).increment(count as u64);
    #[cfg(not(feature = "metrics"))]
    let _ = (direction, count);
}

/// Record an automatic reconnect.
pub fn inc_reconnects() {
    #[cfg(feature = "metrics")]
    counter!(RECONNECTS_TOTAL).increment(1);
}

/// Record a session error.
pub fn inc_errors() {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL).increment(1);
}
