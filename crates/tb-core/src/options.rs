//! Simulator-wide brake options.
//!
//! These used to be process-wide switches read from a settings singleton.
//! Here they are an ordinary value handed to every car and to the train when
//! they are built, so two trains in one process can run with different
//! options and tests never depend on hidden state.

use crate::{CoreError, CoreResult, PressureUnit};

/// Share of cars (counted from the rear) that receive a retainer setting.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RetainerPercent {
    Quarter,
    Half,
    /// Retainers on all cars.
    #[default]
    All,
}

impl RetainerPercent {
    /// From the percentage written in settings files: 25, 50 or 100.
    pub fn from_percent(percent: u32) -> CoreResult<Self> {
        match percent {
            25  => Ok(RetainerPercent::Quarter),
            50  => Ok(RetainerPercent::Half),
            100 => Ok(RetainerPercent::All),
            _   => Err(CoreError::Config(format!("retainer share must be 25, 50 or 100 percent, got {percent}"))),
        }
    }

    /// Whether the car `index_from_rear` (0 = last car) receives the setting.
    pub fn applies_to(self, index_from_rear: usize) -> bool {
        match self {
            RetainerPercent::Quarter => index_from_rear % 4 == 0,
            RetainerPercent::Half    => index_from_rear % 2 == 0,
            RetainerPercent::All     => true,
        }
    }
}

/// Options shared by every brake system of a train.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BrakeOptions {
    /// Use graduated release (distributor behaviour) on cars whose
    /// parameters leave the choice open.
    pub graduated_release: bool,

    /// Which cars follow `Train::set_retainer`.
    pub retainer_percent: RetainerPercent,

    /// Unit for HUD strings.
    pub pressure_unit: PressureUnit,

    /// How often (simulated seconds) sound triggers compare pressures.
    /// Coarser than a tick so brief flickers do not toggle sounds.
    pub sound_check_interval_s: f32,
}

impl Default for BrakeOptions {
    fn default() -> Self {
        Self {
            graduated_release:      false,
            retainer_percent:       RetainerPercent::All,
            pressure_unit:          PressureUnit::Psi,
            sound_check_interval_s: 0.5,
        }
    }
}
