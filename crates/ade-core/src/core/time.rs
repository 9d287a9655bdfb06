// crates/ade-core/src/core/time.rs
// ============================================================================
// Module: ADE Time Model
// Description: Canonical timestamp representation for envelopes and traces.
// Purpose: Provide deterministic, replayable time values across ADE records.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! ADE records carry explicit unix-millisecond timestamps so traces replay
//! deterministically. Decision semantics never depend on wall-clock reads:
//! the only time value that influences a decision is the request's
//! `context.current_time`, which callers supply as RFC 3339 text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while parsing or rendering timestamps.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum TimeError {
    /// Input text is not a valid RFC 3339 timestamp.
    #[error("invalid rfc3339 timestamp: {0}")]
    InvalidRfc3339(String),
    /// Timestamp value is outside the renderable range.
    #[error("timestamp out of range: {0}")]
    OutOfRange(i64),
}

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical timestamp used in ADE envelopes, traces, and memory records.
///
/// # Invariants
/// - Stored as unix epoch milliseconds.
/// - Monotonicity is a caller responsibility.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Captures the current wall-clock time.
    ///
    /// Pre-epoch clocks collapse to the epoch rather than failing.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Self(millis)
    }

    /// Parses an RFC 3339 timestamp into unix milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::InvalidRfc3339`] when the text does not parse.
    pub fn parse_rfc3339(text: &str) -> Result<Self, TimeError> {
        let parsed = OffsetDateTime::parse(text, &Rfc3339)
            .map_err(|_| TimeError::InvalidRfc3339(text.to_string()))?;
        let millis = parsed.unix_timestamp_nanos() / 1_000_000;
        i64::try_from(millis).map(Self).map_err(|_| TimeError::InvalidRfc3339(text.to_string()))
    }

    /// Renders the timestamp as RFC 3339 UTC text.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::OutOfRange`] when the value cannot be rendered.
    pub fn to_rfc3339(self) -> Result<String, TimeError> {
        let nanos = i128::from(self.0) * 1_000_000;
        let datetime = OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map_err(|_| TimeError::OutOfRange(self.0))?;
        datetime.format(&Rfc3339).map_err(|_| TimeError::OutOfRange(self.0))
    }

    /// Returns the millisecond delta to a later timestamp, saturating at zero.
    #[must_use]
    pub const fn millis_until(self, later: Self) -> u64 {
        let delta = later.0.saturating_sub(self.0);
        if delta < 0 { 0 } else { delta as u64 }
    }
}

// ============================================================================
// SECTION: Local-Time Helpers
// ============================================================================

/// Extracts the local hour (0-23) from RFC 3339 text, honoring its offset.
///
/// Returns `None` when the text does not parse; callers treat the hour as
/// unavailable rather than failing the decision.
#[must_use]
pub fn local_hour_of(text: &str) -> Option<u8> {
    OffsetDateTime::parse(text, &Rfc3339).ok().map(|parsed| parsed.hour())
}

/// Extracts the ISO weekday number (Monday = 1) from RFC 3339 text.
#[must_use]
pub fn weekday_of(text: &str) -> Option<u8> {
    OffsetDateTime::parse(text, &Rfc3339)
        .ok()
        .map(|parsed| parsed.weekday().number_from_monday())
}
