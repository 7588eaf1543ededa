//! Mutable per-car brake state.
//!
//! Everything the simulation changes tick to tick lives in [`BrakeState`];
//! everything fixed at load time lives in [`BrakeParams`][crate::BrakeParams].
//! Line pressures (`line1`..`line4`) are written by the train-wide
//! propagation pass and read by the car's own update.

use tb_core::BrakeFamily;

// ── ValveState ────────────────────────────────────────────────────────────────

/// Position of a triple valve / distributor, or of an EP holding valve.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValveState {
    /// Cylinder exhausting, auxiliary reservoir recharging from the pipe.
    #[default]
    Release,
    /// Everything closed; cylinder pressure held.
    Lap,
    /// Auxiliary reservoir feeding the cylinder.
    Apply,
    /// Auxiliary and emergency reservoirs feeding the cylinder, pipe vented
    /// locally (quick action).
    Emergency,
}

impl ValveState {
    pub fn label(self) -> &'static str {
        match self {
            ValveState::Release   => "Release",
            ValveState::Lap       => "Lap",
            ValveState::Apply     => "Apply",
            ValveState::Emergency => "Emergency",
        }
    }
}

// ── RetainerSetting ───────────────────────────────────────────────────────────

/// Retaining valve handle position.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RetainerSetting {
    /// Normal release to zero.
    #[default]
    Exhaust,
    /// Holds 10 psi, slow release above it.
    LowPressure,
    /// Holds 20 psi, slow release above it.
    HighPressure,
    /// Full release, but slowly.
    SlowDirect,
}

impl RetainerSetting {
    pub fn label(self) -> &'static str {
        match self {
            RetainerSetting::Exhaust      => "EX",
            RetainerSetting::LowPressure  => "LP",
            RetainerSetting::HighPressure => "HP",
            RetainerSetting::SlowDirect   => "SD",
        }
    }
}

// ── EpDemand ──────────────────────────────────────────────────────────────────

/// Electrical brake demand carried on line 4.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EpDemand {
    /// No EP-capable lead, or the EP circuit is not energised.  Cars fall
    /// back to pneumatic control.
    #[default]
    Inactive,
    /// Requested fraction of maximum cylinder pressure, in `[0, 1]`.
    Demand(f32),
}

impl EpDemand {
    /// A demand clamped into `[0, 1]`.  `NaN` maps to zero demand.
    pub fn demand(fraction: f32) -> Self {
        EpDemand::Demand(if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) })
    }

    pub fn fraction(self) -> Option<f32> {
        match self {
            EpDemand::Inactive  => None,
            EpDemand::Demand(d) => Some(d),
        }
    }
}

// ── HoseState ─────────────────────────────────────────────────────────────────

/// Hose and cock positions at one car.
///
/// `angle_cock_a` is at the front of the car, `angle_cock_b` at the rear.
/// The front hose joins this car to the car ahead.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HoseState {
    pub front_connected:      bool,
    pub angle_cock_a_open:    bool,
    pub angle_cock_b_open:    bool,
    pub bleed_off_valve_open: bool,
}

impl Default for HoseState {
    fn default() -> Self {
        Self {
            front_connected:      false,
            angle_cock_a_open:    true,
            angle_cock_b_open:    true,
            bleed_off_valve_open: false,
        }
    }
}

// ── Sound tracking ────────────────────────────────────────────────────────────

/// Direction a sampled pressure moved since the previous sample.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PressureTrend {
    #[default]
    Steady,
    Rising,
    Falling,
}

/// Coarse sampler behind the brake sound triggers.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SoundTracker {
    /// Seconds accumulated since the last sample.
    pub timer_s:        f32,
    pub last_cyl_psi:   f32,
    pub last_pipe_psi:  f32,
    pub cyl_trend:      PressureTrend,
    pub pipe_trend:     PressureTrend,
}

// ── BrakeState ────────────────────────────────────────────────────────────────

/// All mutable fields of one car's brake system.
///
/// Pressures are gauge psi for air and absolute psi for vacuum (see
/// [`tb_core::units`]).  Variants use the subset they need; the rest stay at
/// their initial values.
#[derive(Clone, PartialEq, Debug)]
pub struct BrakeState {
    // ── Train lines ───────────────────────────────────────────────────────
    /// Brake pipe.
    pub line1_psi: f32,
    /// Main-reservoir pipe (twin-pipe stock).
    pub line2_psi: f32,
    /// Engine brake pipe (locomotive block only).
    pub line3_psi: f32,
    /// EP / ECP demand wire.
    pub line4:     EpDemand,

    // ── Reservoirs and cylinder ───────────────────────────────────────────
    pub aux_res_psi:     f32,
    pub emerg_res_psi:   f32,
    pub control_res_psi: f32,
    /// Cylinder pressure produced by the automatic brake alone.
    pub auto_cyl_psi:    f32,
    /// Effective cylinder pressure (automatic combined with engine brake).
    pub cyl_psi:         f32,
    pub vac_res_psi:     f32,
    /// Current total cylinder volume; varies with piston travel on vacuum
    /// stock.
    pub cyl_volume_m3:   f32,

    // ── Valves ────────────────────────────────────────────────────────────
    pub valve:                  ValveState,
    pub holding_valve:          ValveState,
    pub retainer:               RetainerSetting,
    pub retainer_threshold_psi: f32,
    pub release_rate_psi_per_s: f32,
    pub hoses:                  HoseState,
    pub bail_off:               bool,

    // ── Handbrake and manual brake ────────────────────────────────────────
    pub handbrake_percent:    f32,
    pub manual_brake_desired: f32,
    pub manual_brake_current: f32,

    // ── Emergency and wheel-slide protection ──────────────────────────────
    /// Brake pipe pressure at the end of the previous update; the drop rate
    /// against it selects `Emergency`.
    pub prev_line1_psi:     f32,
    /// Remaining quick-action vent time.
    pub emergency_timer_s:  f32,
    pub wheel_slide_active: bool,
    pub dump_valve_timer_s: f32,
    pub dump_valve_locked:  bool,

    // ── Initialization references ─────────────────────────────────────────
    /// Fully charged brake pipe pressure given at initialization.
    pub max_pressure_psi:  f32,
    /// Brake pipe pressure for a full service application.
    pub full_service_psi:  f32,

    pub sound: SoundTracker,
}

impl BrakeState {
    /// A released, uncharged state: every pressure at the family's
    /// atmospheric value.
    pub fn new(family: BrakeFamily) -> Self {
        let atm = family.atmospheric();
        Self {
            line1_psi:              atm,
            line2_psi:              0.0,
            line3_psi:              0.0,
            line4:                  EpDemand::Inactive,
            aux_res_psi:            atm,
            emerg_res_psi:          atm,
            control_res_psi:        atm,
            auto_cyl_psi:           atm,
            cyl_psi:                atm,
            vac_res_psi:            atm,
            cyl_volume_m3:          0.0,
            valve:                  ValveState::Release,
            holding_valve:          ValveState::Release,
            retainer:               RetainerSetting::Exhaust,
            retainer_threshold_psi: 0.0,
            release_rate_psi_per_s: 0.0,
            hoses:                  HoseState::default(),
            bail_off:               false,
            handbrake_percent:      0.0,
            manual_brake_desired:   0.0,
            manual_brake_current:   0.0,
            prev_line1_psi:         atm,
            emergency_timer_s:      0.0,
            wheel_slide_active:     false,
            dump_valve_timer_s:     0.0,
            dump_valve_locked:      false,
            max_pressure_psi:       atm,
            full_service_psi:       atm,
            sound:                  SoundTracker::default(),
        }
    }

    /// Replace every non-finite pressure with `atm` and clamp all pressures
    /// into `range`.
    pub(crate) fn clamp_pressures(&mut self, family: BrakeFamily) {
        let range = family.range();
        let atm = family.atmospheric();
        for p in [
            &mut self.line1_psi,
            &mut self.aux_res_psi,
            &mut self.emerg_res_psi,
            &mut self.control_res_psi,
            &mut self.auto_cyl_psi,
            &mut self.cyl_psi,
            &mut self.vac_res_psi,
        ] {
            *p = range.clamp(*p, atm);
        }
        let air = BrakeFamily::Air.range();
        self.line2_psi = air.clamp(self.line2_psi, 0.0);
        self.line3_psi = air.clamp(self.line3_psi, 0.0);
        self.handbrake_percent = if self.handbrake_percent.is_nan() {
            0.0
        } else {
            self.handbrake_percent.clamp(0.0, 100.0)
        };
    }
}
