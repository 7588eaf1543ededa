//! Piped-only stock and hand-wound brake vans.
//!
//! The pipe runs through the car so propagation can pass it on, but nothing
//! on the car responds to it.  Brake force comes only from the handbrake or,
//! for `ManualBraking`, from the wound-on manual brake.

use tb_core::{BrakeOptions, approach};

use crate::{
    BrakeKind, BrakeModel, BrakeParams, BrakeState, BrakeStatus, CarContext, PipeContribution,
    ValveState,
};

/// Strategy for `AirPiped`, `VacuumPiped` and `ManualBraking`.
pub struct TransferPipe;

impl BrakeModel for TransferPipe {
    fn initialize(
        &self,
        params:            &BrakeParams,
        state:             &mut BrakeState,
        handbrake_on:      bool,
        max_pressure_psi:  f32,
        full_service_psi:  f32,
        _immediate_release: bool,
    ) {
        let atm = params.pipe_family.atmospheric();
        state.max_pressure_psi = max_pressure_psi;
        state.full_service_psi = full_service_psi;
        state.aux_res_psi = atm;
        state.emerg_res_psi = atm;
        state.control_res_psi = atm;
        state.auto_cyl_psi = atm;
        state.cyl_psi = atm;
        state.vac_res_psi = atm;
        state.cyl_volume_m3 = 0.0;
        state.valve = ValveState::Release;
        state.handbrake_percent = if handbrake_on && params.handbrake_present { 100.0 } else { 0.0 };
        state.manual_brake_desired = 0.0;
        state.manual_brake_current = 0.0;
        state.prev_line1_psi = state.line1_psi;
        state.clamp_pressures(params.pipe_family);
        state.sound.reset(state.cyl_psi, state.line1_psi);
    }

    fn update(
        &self,
        params:   &BrakeParams,
        _options: &BrakeOptions,
        state:    &mut BrakeState,
        _ctx:     &CarContext,
        dt:       f32,
    ) {
        if params.kind == BrakeKind::ManualBraking {
            state.manual_brake_current = approach(
                state.manual_brake_current,
                state.manual_brake_desired,
                params.manual_brake_rate,
                dt,
            );
        }
        state.prev_line1_psi = state.line1_psi;
        state.clamp_pressures(params.pipe_family);
    }

    fn contribute(&self, params: &BrakeParams, pipe_volume_m3: f32) -> PipeContribution {
        PipeContribution {
            family:              params.pipe_family,
            pipe_volume_m3,
            reservoir_volume_m3: 0.0,
            cylinder_volume_m3:  0.0,
            twin_pipe:           false,
            ep_capable:          false,
        }
    }

    fn force_fraction(&self, params: &BrakeParams, state: &BrakeState, _ctx: &CarContext) -> f32 {
        if params.kind == BrakeKind::ManualBraking {
            state.manual_brake_current.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn status(&self, params: &BrakeParams, options: &BrakeOptions, state: &BrakeState) -> BrakeStatus {
        let mut s = BrakeStatus::new();
        s.push("BP", options.pressure_unit.format(params.pipe_family, state.line1_psi));
        if params.kind == BrakeKind::ManualBraking {
            s.push("Manual", format!("{:.0}%", state.manual_brake_current * 100.0));
        }
        s.push("Handbrake", format!("{:.0}%", state.handbrake_percent));
        s
    }
}
