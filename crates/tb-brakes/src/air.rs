//! Automatic air brake: single pipe, twin pipe, EP and SME.
//!
//! # Update order
//!
//! ```text
//! ① bleed-off valve open?  vent every reservoir and the cylinder, stop.
//! ② valve decision         triple valve or distributor (valve.rs),
//!                          Emergency on a fast pipe drop.
//! ③ cylinder               EP/SME demand on line 4 if active, otherwise the
//!                          pneumatic valve state drives aux → cylinder.
//! ④ recharge               pipe → aux / emergency, line 2 → aux (twin pipe),
//!                          pipe → control reservoir (distributor).
//! ⑤ quick action           vent valve held open for a few seconds after an
//!                          emergency application; the train's propagation
//!                          pass vents the pipe through it.
//! ⑥ wheel-slide dump       vent while sliding, lock out after 7 s.
//! ⑦ locomotive             bail-off, then cylinder = max(auto, line 3).
//! ```

use tb_core::{BrakeFamily, BrakeOptions, approach, exchange};

use crate::valve::{ValveInputs, distributor_next, distributor_target, retainer_limits, triple_valve_next};
use crate::{
    BrakeKind, BrakeModel, BrakeParams, BrakeState, BrakeStatus, CarContext, EpDemand,
    PipeContribution, RetainerSetting, ValveState,
};

/// Rate the bleed-off valve drains reservoirs and cylinder (psi/s).
pub const BLEED_OFF_RATE: f32 = 5.0;
/// Rate the wheel-slide dump valve vents the cylinder (psi/s).
pub const DUMP_VALVE_RATE: f32 = 15.0;
/// Continuous dump time after which the valve locks out (s).
pub const DUMP_VALVE_LOCKOUT_S: f32 = 7.0;
/// Cylinder within this of the EP target counts as reached (psi).
pub const HOLDING_TOLERANCE_PSI: f32 = 0.05;

/// Strategy for every automatic air brake variant.
pub struct AirBrake;

impl BrakeModel for AirBrake {
    fn initialize(
        &self,
        params:            &BrakeParams,
        state:             &mut BrakeState,
        handbrake_on:      bool,
        max_pressure_psi:  f32,
        full_service_psi:  f32,
        immediate_release: bool,
    ) {
        let bp = state.line1_psi;
        let ratio = params.aux_cyl_volume_ratio.max(f32::EPSILON);
        let max = max_pressure_psi;

        state.max_pressure_psi = max;
        state.full_service_psi = full_service_psi;
        state.control_res_psi = max;
        state.auto_cyl_psi = if immediate_release {
            0.0
        } else {
            ((max - bp) * ratio).clamp(0.0, params.max_cylinder_psi)
        };
        state.aux_res_psi = if state.auto_cyl_psi == 0.0 {
            max.max(bp)
        } else {
            (max - state.auto_cyl_psi / ratio).max(bp)
        };
        state.emerg_res_psi = if params.emerg_res_volume_m3 > 0.0 {
            state.aux_res_psi.max(max)
        } else {
            0.0
        };
        state.line3_psi = 0.0;
        state.cyl_psi = state.auto_cyl_psi;
        state.cyl_volume_m3 = params.total_cylinder_volume();
        state.valve = if state.auto_cyl_psi > 0.0 { ValveState::Lap } else { ValveState::Release };
        state.holding_valve = ValveState::Release;
        state.handbrake_percent = if handbrake_on && params.handbrake_present { 100.0 } else { 0.0 };

        let (threshold, rate) = retainer_limits(RetainerSetting::Exhaust, params.retainer_positions, params.max_release_rate);
        state.retainer = RetainerSetting::Exhaust;
        state.retainer_threshold_psi = threshold;
        state.release_rate_psi_per_s = rate;

        state.prev_line1_psi = bp;
        state.emergency_timer_s = 0.0;
        state.dump_valve_timer_s = 0.0;
        state.dump_valve_locked = false;
        state.clamp_pressures(BrakeFamily::Air);
        state.sound.reset(state.cyl_psi, state.line1_psi);
    }

    fn update(
        &self,
        params:  &BrakeParams,
        options: &BrakeOptions,
        state:   &mut BrakeState,
        ctx:     &CarContext,
        dt:      f32,
    ) {
        let cyl_vol = params.total_cylinder_volume();
        let aux_vol = params.aux_res_volume();
        let pipe_vol = ctx.pipe_volume_m3;

        if state.hoses.bleed_off_valve_open {
            bleed_off(state, dt);
        } else {
            let distributor = params.uses_distributor(options.graduated_release);
            let inputs = ValveInputs {
                pipe_psi:       state.line1_psi,
                prev_pipe_psi:  state.prev_line1_psi,
                aux_psi:        state.aux_res_psi,
                control_psi:    state.control_res_psi,
                cyl_psi:        state.auto_cyl_psi,
                dt,
                deadband_psi:   params.valve_deadband_psi,
                emergency_rate: params.emergency_valve_actuation_rate,
                max_cyl_psi:    params.max_cylinder_psi,
                aux_cyl_ratio:  params.aux_cyl_volume_ratio,
                high_pressure:  params.high_pressure_release,
            };
            let next = if distributor {
                distributor_next(state.valve, &inputs)
            } else {
                triple_valve_next(state.valve, &inputs)
            };
            if next == ValveState::Emergency && state.valve != ValveState::Emergency {
                state.emergency_timer_s = params.quick_action_time_s;
            }
            state.valve = next;

            let ep_demand = match state.line4 {
                EpDemand::Demand(d) if params.kind.is_electric() && next != ValveState::Emergency => Some(d),
                _ => None,
            };

            match ep_demand {
                Some(d) => electric_cylinder(params, state, d, cyl_vol, aux_vol, pipe_vol, dt),
                None => {
                    state.holding_valve = ValveState::Release;
                    pneumatic_cylinder(params, state, distributor, cyl_vol, aux_vol, dt);
                }
            }

            recharge(params, state, distributor, aux_vol, pipe_vol, dt);
            quick_action_countdown(state, dt);
        }

        wheel_slide_dump(params, state, dt);

        if ctx.is_locomotive && state.bail_off {
            state.auto_cyl_psi = approach(state.auto_cyl_psi, 0.0, params.max_release_rate, dt);
        }
        state.cyl_psi = if ctx.is_locomotive {
            state.auto_cyl_psi.max(state.line3_psi)
        } else {
            state.auto_cyl_psi
        };
        state.cyl_volume_m3 = cyl_vol;

        state.prev_line1_psi = state.line1_psi;
        state.clamp_pressures(BrakeFamily::Air);
    }

    fn contribute(&self, params: &BrakeParams, pipe_volume_m3: f32) -> PipeContribution {
        PipeContribution {
            family:              BrakeFamily::Air,
            pipe_volume_m3,
            reservoir_volume_m3: params.aux_res_volume() + params.emerg_res_volume_m3,
            cylinder_volume_m3:  params.total_cylinder_volume(),
            twin_pipe:           params.kind.is_twin_pipe(),
            ep_capable:          params.kind.is_electric(),
        }
    }

    fn force_fraction(&self, params: &BrakeParams, state: &BrakeState, _ctx: &CarContext) -> f32 {
        if params.max_cylinder_psi <= 0.0 {
            return 0.0;
        }
        (state.cyl_psi / params.max_cylinder_psi).clamp(0.0, 1.0)
    }

    fn status(&self, params: &BrakeParams, options: &BrakeOptions, state: &BrakeState) -> BrakeStatus {
        let unit = options.pressure_unit;
        let fmt = |p: f32| unit.format(BrakeFamily::Air, p);
        let mut s = BrakeStatus::new();
        s.push("BC", fmt(state.cyl_psi));
        s.push("BP", fmt(state.line1_psi));
        s.push("AR", fmt(state.aux_res_psi));
        if params.emerg_res_volume_m3 > 0.0 {
            s.push("ER", fmt(state.emerg_res_psi));
        }
        if params.uses_distributor(options.graduated_release) {
            s.push("CR", fmt(state.control_res_psi));
        }
        if params.kind.is_twin_pipe() {
            s.push("MRP", fmt(state.line2_psi));
        }
        if state.line3_psi > 0.0 {
            s.push("EC", fmt(state.line3_psi));
        }
        s.push("Valve", state.valve.label());
        if params.kind.is_electric() {
            s.push("Holding", state.holding_valve.label());
            s.push("EP", match state.line4 {
                EpDemand::Inactive  => "off".to_owned(),
                EpDemand::Demand(d) => format!("{:.0}%", d * 100.0),
            });
        }
        s.push("Retainer", state.retainer.label());
        s.push("Handbrake", format!("{:.0}%", state.handbrake_percent));
        s
    }
}

// ── Update steps ──────────────────────────────────────────────────────────────

fn bleed_off(state: &mut BrakeState, dt: f32) {
    state.valve = ValveState::Release;
    state.holding_valve = ValveState::Release;
    for p in [
        &mut state.aux_res_psi,
        &mut state.emerg_res_psi,
        &mut state.control_res_psi,
        &mut state.auto_cyl_psi,
    ] {
        *p = approach(*p, 0.0, BLEED_OFF_RATE, dt);
    }
}

/// Rate that lands `from` exactly on `target` this step, capped at `rate`.
fn capped_rate(from: f32, target: f32, rate: f32, dt: f32) -> f32 {
    rate.min((target - from).abs() / dt)
}

fn pneumatic_cylinder(
    params:      &BrakeParams,
    state:       &mut BrakeState,
    distributor: bool,
    cyl_vol:     f32,
    aux_vol:     f32,
    dt:          f32,
) {
    let max_cyl = params.max_cylinder_psi;
    match state.valve {
        ValveState::Apply => {
            let target = if distributor {
                distributor_target(state.control_res_psi, state.line1_psi, params.aux_cyl_volume_ratio, max_cyl)
            } else {
                max_cyl
            };
            if state.auto_cyl_psi < target {
                let rate = capped_rate(state.auto_cyl_psi, target, params.max_application_rate, dt);
                (state.auto_cyl_psi, state.aux_res_psi) =
                    exchange(state.auto_cyl_psi, cyl_vol, state.aux_res_psi, aux_vol, rate, dt);
            }
        }
        ValveState::Emergency => {
            if state.auto_cyl_psi < max_cyl {
                let rate = capped_rate(state.auto_cyl_psi, max_cyl, params.emergency_application_rate, dt);
                (state.auto_cyl_psi, state.aux_res_psi) =
                    exchange(state.auto_cyl_psi, cyl_vol, state.aux_res_psi, aux_vol, rate, dt);
            }
            if params.emerg_res_volume_m3 > 0.0 && state.emerg_res_psi > state.aux_res_psi {
                (state.aux_res_psi, state.emerg_res_psi) = exchange(
                    state.aux_res_psi,
                    aux_vol,
                    state.emerg_res_psi,
                    params.emerg_res_volume_m3,
                    params.emergency_application_rate,
                    dt,
                );
            }
        }
        ValveState::Release => {
            let mut floor = state.retainer_threshold_psi;
            if distributor {
                floor = floor.max(distributor_target(
                    state.control_res_psi,
                    state.line1_psi,
                    params.aux_cyl_volume_ratio,
                    max_cyl,
                ));
            }
            if state.auto_cyl_psi > floor {
                state.auto_cyl_psi = approach(state.auto_cyl_psi, floor, state.release_rate_psi_per_s, dt);
            }
        }
        ValveState::Lap => {}
    }
}

/// EP / SME: the cylinder follows `demand × max_cylinder_psi`; the holding
/// valve laps once the target is reached.
fn electric_cylinder(
    params:   &BrakeParams,
    state:    &mut BrakeState,
    demand:   f32,
    cyl_vol:  f32,
    aux_vol:  f32,
    pipe_vol: f32,
    dt:       f32,
) {
    let target = demand * params.max_cylinder_psi;
    if state.auto_cyl_psi > target + HOLDING_TOLERANCE_PSI {
        state.holding_valve = ValveState::Release;
        state.auto_cyl_psi = approach(state.auto_cyl_psi, target, params.max_release_rate, dt);
    } else if state.auto_cyl_psi >= target - HOLDING_TOLERANCE_PSI {
        state.holding_valve = ValveState::Lap;
    } else {
        state.holding_valve = ValveState::Apply;
        let rate = capped_rate(state.auto_cyl_psi, target, params.ep_application_rate, dt);
        if params.kind == BrakeKind::Sme {
            (state.auto_cyl_psi, state.line2_psi) =
                exchange(state.auto_cyl_psi, cyl_vol, state.line2_psi, pipe_vol, rate, dt);
        } else {
            (state.auto_cyl_psi, state.aux_res_psi) =
                exchange(state.auto_cyl_psi, cyl_vol, state.aux_res_psi, aux_vol, rate, dt);
        }
    }
}

fn recharge(
    params:      &BrakeParams,
    state:       &mut BrakeState,
    distributor: bool,
    aux_vol:     f32,
    pipe_vol:    f32,
    dt:          f32,
) {
    let charging = match state.valve {
        ValveState::Release => true,
        ValveState::Lap     => distributor || state.holding_valve != ValveState::Release,
        _                   => false,
    };
    if !charging {
        return;
    }

    if state.line1_psi > state.aux_res_psi {
        (state.aux_res_psi, state.line1_psi) = exchange(
            state.aux_res_psi,
            aux_vol,
            state.line1_psi,
            pipe_vol,
            params.aux_charging_rate,
            dt,
        );
    }
    if params.emerg_res_volume_m3 > 0.0 && state.line1_psi > state.emerg_res_psi {
        (state.emerg_res_psi, state.line1_psi) = exchange(
            state.emerg_res_psi,
            params.emerg_res_volume_m3,
            state.line1_psi,
            pipe_vol,
            params.emerg_res_charging_rate,
            dt,
        );
    }

    if params.kind.is_twin_pipe() && params.main_res_charging {
        let cap = if distributor { state.control_res_psi } else { state.line1_psi };
        if state.line2_psi > state.aux_res_psi && state.aux_res_psi < cap {
            let rate = capped_rate(state.aux_res_psi, cap, params.aux_charging_rate, dt);
            (state.aux_res_psi, state.line2_psi) =
                exchange(state.aux_res_psi, aux_vol, state.line2_psi, pipe_vol, rate, dt);
        }
    }

    if distributor && state.line1_psi > state.control_res_psi {
        state.control_res_psi = approach(state.control_res_psi, state.line1_psi, params.aux_charging_rate, dt);
    }
}

fn quick_action_countdown(state: &mut BrakeState, dt: f32) {
    state.emergency_timer_s = (state.emergency_timer_s - dt).max(0.0);
}

fn wheel_slide_dump(params: &BrakeParams, state: &mut BrakeState, dt: f32) {
    if !params.wheel_slide_dump_valve || !state.wheel_slide_active {
        state.dump_valve_timer_s = 0.0;
        state.dump_valve_locked = false;
        return;
    }
    if state.dump_valve_locked {
        return;
    }
    state.auto_cyl_psi = approach(state.auto_cyl_psi, 0.0, DUMP_VALVE_RATE, dt);
    state.dump_valve_timer_s += dt;
    if state.dump_valve_timer_s >= DUMP_VALVE_LOCKOUT_S {
        state.dump_valve_locked = true;
    }
}
