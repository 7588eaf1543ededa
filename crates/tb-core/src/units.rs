//! Pressure units, brake families, and valid pressure ranges.
//!
//! # Conventions
//!
//! All pressures inside the simulator are `f32` pounds per square inch.
//! Which zero they are measured from depends on the brake family:
//!
//! | Family   | Stored as          | Atmospheric | Brakes applied when…        |
//! |----------|--------------------|-------------|-----------------------------|
//! | `Air`    | gauge psi (psig)   | `0.0`       | brake pipe pressure *falls* |
//! | `Vacuum` | absolute psi (psia)| `ATM_PSI`   | brake pipe pressure *rises* |
//!
//! Vacuum quantities shown to the driver are converted to inches of mercury
//! of vacuum with [`vacuum_inhg`].

use std::fmt;

use crate::{CoreError, CoreResult};

/// Standard sea-level atmospheric pressure (psia).
pub const ATM_PSI: f32 = 14.695_95;

/// Upper bound for any air-brake pressure (gauge psi).  Covers main
/// reservoirs with margin.
pub const AIR_MAX_PSI: f32 = 200.0;

pub const PSI_PER_INHG: f32 = 0.491_154;
pub const PSI_PER_BAR: f32 = 14.503_774;
pub const PSI_PER_KPA: f32 = 0.145_037_74;
pub const M3_PER_FT3: f32 = 0.028_316_847;
pub const M3_PER_LITRE: f32 = 0.001;
pub const M_PER_INCH: f32 = 0.0254;

/// Convert inches of mercury of *vacuum* to absolute psi.
#[inline]
pub fn psia_from_vacuum_inhg(inhg: f32) -> f32 {
    ATM_PSI - inhg * PSI_PER_INHG
}

/// Convert absolute psi to inches of mercury of vacuum below one atmosphere.
#[inline]
pub fn vacuum_inhg(psia: f32) -> f32 {
    (ATM_PSI - psia) / PSI_PER_INHG
}

/// Atmospheric pressure (psia) at `elevation_m` above sea level.
///
/// Standard barometric formula; elevations are clamped to `[-500, 9000]` m.
pub fn atmospheric_psi_at(elevation_m: f32) -> f32 {
    let h = if elevation_m.is_finite() { elevation_m.clamp(-500.0, 9_000.0) } else { 0.0 };
    ATM_PSI * (1.0 - 2.255_77e-5 * h).powf(5.255_88)
}

// ── BrakeFamily ───────────────────────────────────────────────────────────────

/// Physical working medium of a brake pipe.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BrakeFamily {
    #[default]
    Air,
    Vacuum,
}

impl BrakeFamily {
    /// The stored value of "open to atmosphere" for this family.
    #[inline]
    pub fn atmospheric(self) -> f32 {
        match self {
            BrakeFamily::Air    => 0.0,
            BrakeFamily::Vacuum => ATM_PSI,
        }
    }

    /// Physically valid range for every pressure of this family.
    #[inline]
    pub fn range(self) -> PressureRange {
        match self {
            BrakeFamily::Air    => PressureRange::new(0.0, AIR_MAX_PSI),
            BrakeFamily::Vacuum => PressureRange::new(0.0, ATM_PSI),
        }
    }
}

// ── PressureRange ─────────────────────────────────────────────────────────────

/// Closed interval every pressure of one family is clamped into after each
/// mutation.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PressureRange {
    pub min: f32,
    pub max: f32,
}

impl PressureRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Clamp `p` into the range.  `NaN` collapses to `fallback` (itself
    /// clamped), so a bad value can never leak into the next tick.
    #[inline]
    pub fn clamp(self, p: f32, fallback: f32) -> f32 {
        if p.is_nan() {
            fallback.clamp(self.min, self.max)
        } else {
            p.clamp(self.min, self.max)
        }
    }

    #[inline]
    pub fn contains(self, p: f32) -> bool {
        p >= self.min && p <= self.max
    }
}

// ── PressureUnit ──────────────────────────────────────────────────────────────

/// Unit used when formatting pressures for the HUD.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PressureUnit {
    #[default]
    Psi,
    Bar,
    KPa,
    InHg,
}

impl PressureUnit {
    /// Parse a unit name as written in settings (`psi`, `bar`, `kpa`,
    /// `inhg`), case-insensitive.
    pub fn from_name(name: &str) -> CoreResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "psi"  => Ok(PressureUnit::Psi),
            "bar"  => Ok(PressureUnit::Bar),
            "kpa"  => Ok(PressureUnit::KPa),
            "inhg" => Ok(PressureUnit::InHg),
            _      => Err(CoreError::Parse(format!("unknown pressure unit {name:?}"))),
        }
    }

    /// Convert a value in psi to this unit.
    pub fn from_psi(self, psi: f32) -> f32 {
        match self {
            PressureUnit::Psi  => psi,
            PressureUnit::Bar  => psi / PSI_PER_BAR,
            PressureUnit::KPa  => psi / PSI_PER_KPA,
            PressureUnit::InHg => psi / PSI_PER_INHG,
        }
    }

    /// Convert a value in this unit to psi.
    pub fn to_psi(self, value: f32) -> f32 {
        match self {
            PressureUnit::Psi  => value,
            PressureUnit::Bar  => value * PSI_PER_BAR,
            PressureUnit::KPa  => value * PSI_PER_KPA,
            PressureUnit::InHg => value * PSI_PER_INHG,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            PressureUnit::Psi  => "psi",
            PressureUnit::Bar  => "bar",
            PressureUnit::KPa  => "kPa",
            PressureUnit::InHg => "inHg",
        }
    }

    /// Format a family pressure for display.
    ///
    /// Vacuum pressures are always shown as inches of mercury of vacuum,
    /// whatever unit is configured, because that is what vacuum gauges read.
    pub fn format(self, family: BrakeFamily, psi: f32) -> String {
        match family {
            BrakeFamily::Vacuum => format!("{:.0} inHg", vacuum_inhg(psi)),
            BrakeFamily::Air => match self {
                PressureUnit::Bar => format!("{:.2} bar", self.from_psi(psi)),
                _                 => format!("{:.0} {}", self.from_psi(psi), self.suffix()),
            },
        }
    }
}

impl fmt::Display for PressureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}
