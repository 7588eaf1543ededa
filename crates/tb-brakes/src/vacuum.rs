//! Vacuum brakes: automatic (with vacuum reservoir) and straight.
//!
//! Pressures are absolute psi.  On automatic stock the space above the
//! piston is the vacuum reservoir and the space below follows the train
//! pipe; admitting air to the pipe pushes the piston up.  A ball valve lets
//! the pipe evacuate the reservoir but never lets air back into it.
//!
//! Straight vacuum stock has no reservoir: the cylinder is evacuated through
//! the pipe to apply and leaks back towards local atmosphere.

use tb_core::units::{ATM_PSI, atmospheric_psi_at};
use tb_core::{BrakeFamily, BrakeOptions, MIN_VOLUME_M3, approach, exchange};

use crate::air::BLEED_OFF_RATE;
use crate::{
    BrakeKind, BrakeModel, BrakeParams, BrakeState, BrakeStatus, CarContext, PipeContribution,
    ValveState,
};

/// Cylinder change per update below which the valve reads `Lap` (psi).
const MOVING_PSI: f32 = 1.0e-4;

/// Strategy for `VacuumSinglePipe` and `StraightVacuumSinglePipe`.
pub struct VacuumBrake;

impl BrakeModel for VacuumBrake {
    fn initialize(
        &self,
        params:            &BrakeParams,
        state:             &mut BrakeState,
        handbrake_on:      bool,
        max_pressure_psi:  f32,
        full_service_psi:  f32,
        immediate_release: bool,
    ) {
        state.max_pressure_psi = max_pressure_psi;
        state.full_service_psi = full_service_psi;
        if params.kind == BrakeKind::StraightVacuumSinglePipe {
            state.vac_res_psi = ATM_PSI;
            state.auto_cyl_psi = if immediate_release { ATM_PSI } else { state.line1_psi };
        } else {
            state.vac_res_psi = max_pressure_psi;
            state.auto_cyl_psi = if immediate_release {
                state.vac_res_psi
            } else {
                state.line1_psi.max(state.vac_res_psi)
            };
        }
        state.cyl_psi = state.auto_cyl_psi;
        state.line3_psi = 0.0;
        state.valve = ValveState::Lap;
        state.holding_valve = ValveState::Release;
        state.handbrake_percent = if handbrake_on && params.handbrake_present { 100.0 } else { 0.0 };
        state.prev_line1_psi = state.line1_psi;
        state.clamp_pressures(BrakeFamily::Vacuum);
        state.cyl_volume_m3 = cylinder_volume(params, 0.0);
        state.sound.reset(state.cyl_psi, state.line1_psi);
    }

    fn update(
        &self,
        params:   &BrakeParams,
        _options: &BrakeOptions,
        state:    &mut BrakeState,
        ctx:      &CarContext,
        dt:       f32,
    ) {
        let before = state.auto_cyl_psi;

        if params.kind == BrakeKind::StraightVacuumSinglePipe {
            straight_update(params, state, ctx, dt);
        } else if state.hoses.bleed_off_valve_open {
            state.vac_res_psi = approach(state.vac_res_psi, ATM_PSI, BLEED_OFF_RATE, dt);
            state.auto_cyl_psi = approach(state.auto_cyl_psi, ATM_PSI, BLEED_OFF_RATE, dt);
        } else {
            if state.line1_psi < state.vac_res_psi {
                (state.vac_res_psi, state.line1_psi) = exchange(
                    state.vac_res_psi,
                    params.vac_res_volume_m3,
                    state.line1_psi,
                    ctx.pipe_volume_m3,
                    params.vac_res_charging_rate,
                    dt,
                );
            }
            let rate = if state.line1_psi > state.auto_cyl_psi {
                params.vac_application_rate
            } else {
                params.vac_release_rate
            };
            state.auto_cyl_psi = approach(state.auto_cyl_psi, state.line1_psi, rate, dt);
        }

        // Straight vacuum applies by evacuating, automatic by admitting air.
        let change = if params.kind == BrakeKind::StraightVacuumSinglePipe {
            before - state.auto_cyl_psi
        } else {
            state.auto_cyl_psi - before
        };
        state.valve = if change > MOVING_PSI {
            ValveState::Apply
        } else if change < -MOVING_PSI {
            ValveState::Release
        } else {
            ValveState::Lap
        };
        state.cyl_psi = state.auto_cyl_psi;
        state.prev_line1_psi = state.line1_psi;
        state.clamp_pressures(BrakeFamily::Vacuum);

        let travel = travel_fraction(params, state, ctx);
        state.cyl_volume_m3 = cylinder_volume(params, travel);
    }

    fn contribute(&self, params: &BrakeParams, pipe_volume_m3: f32) -> PipeContribution {
        let reservoir = if params.kind == BrakeKind::StraightVacuumSinglePipe {
            0.0
        } else {
            params.vac_res_volume_m3
        };
        PipeContribution {
            family:              BrakeFamily::Vacuum,
            pipe_volume_m3,
            reservoir_volume_m3: reservoir,
            cylinder_volume_m3:  params.total_cylinder_volume(),
            twin_pipe:           false,
            ep_capable:          false,
        }
    }

    fn force_fraction(&self, params: &BrakeParams, state: &BrakeState, ctx: &CarContext) -> f32 {
        let vacuum = if ctx.is_locomotive && state.bail_off {
            0.0
        } else if params.kind == BrakeKind::StraightVacuumSinglePipe {
            travel_fraction(params, state, ctx)
        } else {
            let diff = state.auto_cyl_psi - vac_res_pressure_adjusted(params, state);
            fraction(diff, params.vac_max_force_diff_psi)
        };
        if ctx.is_locomotive {
            vacuum.max(fraction(state.line3_psi, params.max_cylinder_psi))
        } else {
            vacuum
        }
    }

    fn status(&self, params: &BrakeParams, _options: &BrakeOptions, state: &BrakeState) -> BrakeStatus {
        let fmt = |p: f32| tb_core::PressureUnit::InHg.format(BrakeFamily::Vacuum, p);
        let mut s = BrakeStatus::new();
        s.push("BC", fmt(state.cyl_psi));
        s.push("BP", fmt(state.line1_psi));
        if params.kind != BrakeKind::StraightVacuumSinglePipe {
            s.push("VR", fmt(state.vac_res_psi));
        }
        if state.line3_psi > 0.0 {
            s.push("EC", format!("{:.0} psi", state.line3_psi));
        }
        s.push("Valve", state.valve.label());
        s.push("Handbrake", format!("{:.0}%", state.handbrake_percent));
        s
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn fraction(value: f32, full: f32) -> f32 {
    if full <= 0.0 || value.is_nan() { 0.0 } else { (value / full).clamp(0.0, 1.0) }
}

/// Deepest absolute pressure a straight vacuum ejector can draw at the car's
/// elevation.  The achievable vacuum scales with the local atmosphere.
pub fn straight_vacuum_min_psia(params: &BrakeParams, elevation_m: f32) -> f32 {
    let atm = atmospheric_psi_at(elevation_m);
    (atm - params.max_vacuum_psi * (atm / ATM_PSI)).max(0.0)
}

/// Piston travel as a fraction of full stroke.
fn travel_fraction(params: &BrakeParams, state: &BrakeState, ctx: &CarContext) -> f32 {
    if params.kind == BrakeKind::StraightVacuumSinglePipe {
        let atm = atmospheric_psi_at(ctx.elevation_m);
        let min = straight_vacuum_min_psia(params, ctx.elevation_m);
        fraction(atm - state.auto_cyl_psi, atm - min)
    } else {
        fraction(state.auto_cyl_psi - state.vac_res_psi, params.vac_max_force_diff_psi)
    }
}

fn cylinder_volume(params: &BrakeParams, travel: f32) -> f32 {
    params.total_cylinder_volume() + travel * params.vac_swept_volume_m3
}

/// Vacuum reservoir pressure corrected for piston displacement.
///
/// As the piston rises it shrinks the space above it, which is part of the
/// reservoir side, so the reservoir pressure rises by Boyle's law.
pub fn vac_res_pressure_adjusted(params: &BrakeParams, state: &BrakeState) -> f32 {
    if params.kind == BrakeKind::StraightVacuumSinglePipe {
        return state.vac_res_psi;
    }
    let travel = fraction(state.auto_cyl_psi - state.vac_res_psi, params.vac_max_force_diff_psi);
    if travel <= 0.0 {
        return state.vac_res_psi;
    }
    let v = params.vac_res_volume_m3.max(MIN_VOLUME_M3);
    let shrunk = (v - travel * params.vac_swept_volume_m3).max(MIN_VOLUME_M3);
    (state.vac_res_psi * v / shrunk).min(ATM_PSI)
}

fn straight_update(params: &BrakeParams, state: &mut BrakeState, ctx: &CarContext, dt: f32) {
    let atm = atmospheric_psi_at(ctx.elevation_m);
    let min = straight_vacuum_min_psia(params, ctx.elevation_m);

    if state.hoses.bleed_off_valve_open {
        state.auto_cyl_psi = approach(state.auto_cyl_psi, atm, BLEED_OFF_RATE, dt);
        return;
    }
    state.auto_cyl_psi = if state.line1_psi < state.auto_cyl_psi {
        approach(state.auto_cyl_psi, state.line1_psi.max(min), params.vac_application_rate, dt)
    } else {
        approach(state.auto_cyl_psi, state.line1_psi.min(atm), params.vac_release_rate, dt)
    };
    state.auto_cyl_psi = approach(state.auto_cyl_psi, atm, params.straight_vac_leak_rate, dt).max(min);
}
