use std::fmt;

use chrono::{Datelike, Duration, Local, NaiveDateTime, Timelike};

/// Layout of every timestamp the store sees: fixed width, so lexical and
/// numeric order agree.
pub const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

// ─── Stamp ───────────────────────────────────────────────────────

/// A `yyyyMMddHHmmss` wall-clock stamp.
///
/// Held as its numeric value (14 digits fit exactly in an `f64`, which is
/// what Redis sorted-set scores are), rendered back as the fixed-width
/// string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp(u64);

impl Stamp {
    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        let year = u64::try_from(dt.year()).unwrap_or(0);
        Self(
            year * 10_000_000_000
                + u64::from(dt.month()) * 100_000_000
                + u64::from(dt.day()) * 1_000_000
                + u64::from(dt.hour()) * 10_000
                + u64::from(dt.minute()) * 100
                + u64::from(dt.second()),
        )
    }

    /// Parses a 14-digit stamp, rejecting anything that is not a real
    /// calendar instant.
    pub fn parse(text: &str) -> Option<Self> {
        if text.len() != 14 || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveDateTime::parse_from_str(text, STAMP_FORMAT).ok()?;
        text.parse().ok().map(Self)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:014}", self.0)
    }
}

// ─── Clock ───────────────────────────────────────────────────────

/// Source of "now". Injected so tests can pin the window.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time, as the ingestion side records it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

// ─── Window ──────────────────────────────────────────────────────

/// The interval every query of one scrape cycle is scoped to.
/// Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: Stamp,
    pub end: Stamp,
}

impl Window {
    /// `[now - look_back, now + look_ahead]`.
    pub fn compute(now: NaiveDateTime, look_back: Duration, look_ahead: Duration) -> Self {
        Self {
            start: Stamp::from_datetime(now - look_back),
            end: Stamp::from_datetime(now + look_ahead),
        }
    }

    pub fn contains(&self, stamp: Stamp) -> bool {
        self.start <= stamp && stamp <= self.end
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
