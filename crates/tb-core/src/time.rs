//! Simulation time model.
//!
//! # Design
//!
//! The brake model is driven by an external game loop that hands over a
//! variable elapsed time every frame.  The simulator keeps two counters:
//!
//!   - `Tick`: number of completed `Train::update` calls
//!   - `elapsed_secs`: accumulated simulated seconds (`f64` to avoid drift
//!     over long sessions)
//!
//! Elapsed times coming from the outside world are untrusted: anything that
//! is not a finite positive number is coerced to zero by [`sanitize_dt`]
//! before it reaches the pressure model.

use std::fmt;

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute tick counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Return the tick `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Tick {
        Tick(self.0 + n)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── sanitize_dt ───────────────────────────────────────────────────────────────

/// Coerce an elapsed time to a safe value: `NaN`, infinities and negative
/// numbers become `0.0`.
#[inline]
pub fn sanitize_dt(dt: f32) -> f32 {
    if dt.is_finite() && dt > 0.0 { dt } else { 0.0 }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Tracks ticks and simulated seconds.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// Number of completed ticks.
    pub current_tick: Tick,
    /// Simulated seconds since the clock was created.
    pub elapsed_secs: f64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one tick of `dt` seconds.  `dt` is sanitized first.
    #[inline]
    pub fn advance(&mut self, dt: f32) {
        self.current_tick = self.current_tick + 1;
        self.elapsed_secs += sanitize_dt(dt) as f64;
    }

    /// Break elapsed time into (hours, minutes, seconds).
    pub fn elapsed_hms(&self) -> (u64, u32, f32) {
        let total = self.elapsed_secs.max(0.0);
        let hours = (total / 3_600.0) as u64;
        let minutes = ((total % 3_600.0) / 60.0) as u32;
        let seconds = (total % 60.0) as f32;
        (hours, minutes, seconds)
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (h, m, s) = self.elapsed_hms();
        write!(f, "{} ({}:{:02}:{:04.1})", self.current_tick, h, m, s)
    }
}
