//! Control valve helpers shared by the air variants.
//!
//! Pure functions of the pressures involved, so the triple valve,
//! distributor and retainer rules can be tested without building a car.

use crate::{RetainerSetting, ValveState};

/// Fraction of the control reservoir above which a high-pressure distributor
/// releases.
pub const HIGH_PRESSURE_RELEASE_FRACTION: f32 = 0.97;

/// Inputs to one valve decision.
#[derive(Copy, Clone, Debug)]
pub struct ValveInputs {
    pub pipe_psi:        f32,
    pub prev_pipe_psi:   f32,
    pub aux_psi:         f32,
    pub control_psi:     f32,
    pub cyl_psi:         f32,
    pub dt:              f32,
    pub deadband_psi:    f32,
    /// Pipe drop rate selecting `Emergency`.
    pub emergency_rate:  f32,
    pub max_cyl_psi:     f32,
    pub aux_cyl_ratio:   f32,
    pub high_pressure:   bool,
}

/// Rate at which the pipe fell over the last update (psi/s, positive when
/// falling).  Zero for a zero-length step.
pub fn pipe_drop_rate(pipe_psi: f32, prev_pipe_psi: f32, dt: f32) -> f32 {
    if dt <= 0.0 { 0.0 } else { (prev_pipe_psi - pipe_psi) / dt }
}

/// True when the pipe fell faster than the emergency actuation rate.
pub fn emergency_triggered(inp: &ValveInputs) -> bool {
    inp.emergency_rate > 0.0
        && pipe_drop_rate(inp.pipe_psi, inp.prev_pipe_psi, inp.dt) > inp.emergency_rate
}

/// Next state of a direct-release triple valve.
///
/// The valve compares the pipe against the auxiliary reservoir.  A rise of
/// the pipe above the reservoir releases completely; a fall below it applies
/// until the reservoir has dropped to meet the pipe, then laps.
pub fn triple_valve_next(current: ValveState, inp: &ValveInputs) -> ValveState {
    if emergency_triggered(inp) {
        return ValveState::Emergency;
    }
    let db = inp.deadband_psi;
    match current {
        ValveState::Emergency => {
            if inp.pipe_psi > inp.aux_psi { ValveState::Release } else { ValveState::Emergency }
        }
        _ if inp.pipe_psi > inp.aux_psi + db => ValveState::Release,
        ValveState::Release => {
            if inp.pipe_psi < inp.aux_psi - db { ValveState::Apply } else { ValveState::Release }
        }
        ValveState::Apply => {
            if inp.pipe_psi >= inp.aux_psi { ValveState::Lap } else { ValveState::Apply }
        }
        ValveState::Lap => {
            if inp.pipe_psi < inp.aux_psi - db { ValveState::Apply } else { ValveState::Lap }
        }
    }
}

/// Cylinder pressure a distributor aims for.
pub fn distributor_target(control_psi: f32, pipe_psi: f32, ratio: f32, max_cyl_psi: f32) -> f32 {
    ((control_psi - pipe_psi) * ratio).clamp(0.0, max_cyl_psi.max(0.0))
}

/// Next state of a graduated-release distributor.
///
/// The cylinder follows `(control − pipe) × ratio`; a partial rise in pipe
/// pressure gives a partial release.
pub fn distributor_next(current: ValveState, inp: &ValveInputs) -> ValveState {
    if emergency_triggered(inp) {
        return ValveState::Emergency;
    }
    if current == ValveState::Emergency && inp.pipe_psi <= inp.aux_psi {
        return ValveState::Emergency;
    }
    let target = distributor_target(inp.control_psi, inp.pipe_psi, inp.aux_cyl_ratio, inp.max_cyl_psi);
    let db = inp.deadband_psi;
    if inp.high_pressure && inp.pipe_psi > HIGH_PRESSURE_RELEASE_FRACTION * inp.control_psi {
        ValveState::Release
    } else if inp.cyl_psi > target + db {
        ValveState::Release
    } else if inp.cyl_psi < target - db {
        ValveState::Apply
    } else {
        ValveState::Lap
    }
}

/// Threshold and release rate for a retainer position.
///
/// `positions` is how many retainer positions the car's valve has; settings
/// the valve lacks fall back to the nearest one it has.  Returns
/// `(threshold_psi, release_rate_psi_per_s)`.
pub fn retainer_limits(setting: RetainerSetting, positions: u32, max_release_rate: f32) -> (f32, f32) {
    let exhaust = (0.0, max_release_rate);
    let high = (20.0, (50.0 - 20.0) / 90.0);
    let low = (10.0, (50.0 - 10.0) / 60.0);
    match setting {
        RetainerSetting::Exhaust => exhaust,
        RetainerSetting::HighPressure if positions > 0 => high,
        RetainerSetting::LowPressure if positions > 3 => low,
        RetainerSetting::LowPressure if positions > 0 => high,
        RetainerSetting::SlowDirect if positions > 0 => (0.0, (50.0 - 10.0) / 86.0),
        _ => exhaust,
    }
}
