//! Flat snapshot of a [`BrakeState`] for save files.

use crate::{
    BrakeState, EpDemand, HoseState, PressureTrend, RetainerSetting, SoundTracker, ValveState,
};

/// Every mutable field of one car's brakes.
///
/// Converting a state to a record and back gives the identical state, so a
/// restored simulation continues bit-for-bit from where it was saved.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BrakeRecord {
    pub line1_psi:     f32,
    pub line2_psi:     f32,
    pub line3_psi:     f32,
    /// `None` when line 4 is inactive.
    pub line4_demand:  Option<f32>,

    pub aux_res_psi:     f32,
    pub emerg_res_psi:   f32,
    pub control_res_psi: f32,
    pub auto_cyl_psi:    f32,
    pub cyl_psi:         f32,
    pub vac_res_psi:     f32,
    pub cyl_volume_m3:   f32,

    pub valve:                  ValveState,
    pub holding_valve:          ValveState,
    pub retainer:               RetainerSetting,
    pub retainer_threshold_psi: f32,
    pub release_rate_psi_per_s: f32,

    pub front_hose_connected: bool,
    pub angle_cock_a_open:    bool,
    pub angle_cock_b_open:    bool,
    pub bleed_off_valve_open: bool,
    pub bail_off:             bool,

    pub handbrake_percent:    f32,
    pub manual_brake_desired: f32,
    pub manual_brake_current: f32,

    pub prev_line1_psi:     f32,
    pub emergency_timer_s:  f32,
    pub wheel_slide_active: bool,
    pub dump_valve_timer_s: f32,
    pub dump_valve_locked:  bool,

    pub max_pressure_psi: f32,
    pub full_service_psi: f32,

    pub sound_timer_s:    f32,
    pub sound_cyl_psi:    f32,
    pub sound_pipe_psi:   f32,
    pub sound_cyl_trend:  PressureTrend,
    pub sound_pipe_trend: PressureTrend,
}

impl From<&BrakeState> for BrakeRecord {
    fn from(s: &BrakeState) -> Self {
        Self {
            line1_psi:              s.line1_psi,
            line2_psi:              s.line2_psi,
            line3_psi:              s.line3_psi,
            line4_demand:           s.line4.fraction(),
            aux_res_psi:            s.aux_res_psi,
            emerg_res_psi:          s.emerg_res_psi,
            control_res_psi:        s.control_res_psi,
            auto_cyl_psi:           s.auto_cyl_psi,
            cyl_psi:                s.cyl_psi,
            vac_res_psi:            s.vac_res_psi,
            cyl_volume_m3:          s.cyl_volume_m3,
            valve:                  s.valve,
            holding_valve:          s.holding_valve,
            retainer:               s.retainer,
            retainer_threshold_psi: s.retainer_threshold_psi,
            release_rate_psi_per_s: s.release_rate_psi_per_s,
            front_hose_connected:   s.hoses.front_connected,
            angle_cock_a_open:      s.hoses.angle_cock_a_open,
            angle_cock_b_open:      s.hoses.angle_cock_b_open,
            bleed_off_valve_open:   s.hoses.bleed_off_valve_open,
            bail_off:               s.bail_off,
            handbrake_percent:      s.handbrake_percent,
            manual_brake_desired:   s.manual_brake_desired,
            manual_brake_current:   s.manual_brake_current,
            prev_line1_psi:         s.prev_line1_psi,
            emergency_timer_s:      s.emergency_timer_s,
            wheel_slide_active:     s.wheel_slide_active,
            dump_valve_timer_s:     s.dump_valve_timer_s,
            dump_valve_locked:      s.dump_valve_locked,
            max_pressure_psi:       s.max_pressure_psi,
            full_service_psi:       s.full_service_psi,
            sound_timer_s:          s.sound.timer_s,
            sound_cyl_psi:          s.sound.last_cyl_psi,
            sound_pipe_psi:         s.sound.last_pipe_psi,
            sound_cyl_trend:        s.sound.cyl_trend,
            sound_pipe_trend:       s.sound.pipe_trend,
        }
    }
}

impl From<&BrakeRecord> for BrakeState {
    fn from(r: &BrakeRecord) -> Self {
        Self {
            line1_psi:              r.line1_psi,
            line2_psi:              r.line2_psi,
            line3_psi:              r.line3_psi,
            // Taken as stored, not re-clamped.
            line4:                  r.line4_demand.map_or(EpDemand::Inactive, EpDemand::Demand),
            aux_res_psi:            r.aux_res_psi,
            emerg_res_psi:          r.emerg_res_psi,
            control_res_psi:        r.control_res_psi,
            auto_cyl_psi:           r.auto_cyl_psi,
            cyl_psi:                r.cyl_psi,
            vac_res_psi:            r.vac_res_psi,
            cyl_volume_m3:          r.cyl_volume_m3,
            valve:                  r.valve,
            holding_valve:          r.holding_valve,
            retainer:               r.retainer,
            retainer_threshold_psi: r.retainer_threshold_psi,
            release_rate_psi_per_s: r.release_rate_psi_per_s,
            hoses: HoseState {
                front_connected:      r.front_hose_connected,
                angle_cock_a_open:    r.angle_cock_a_open,
                angle_cock_b_open:    r.angle_cock_b_open,
                bleed_off_valve_open: r.bleed_off_valve_open,
            },
            bail_off:               r.bail_off,
            handbrake_percent:      r.handbrake_percent,
            manual_brake_desired:   r.manual_brake_desired,
            manual_brake_current:   r.manual_brake_current,
            prev_line1_psi:         r.prev_line1_psi,
            emergency_timer_s:      r.emergency_timer_s,
            wheel_slide_active:     r.wheel_slide_active,
            dump_valve_timer_s:     r.dump_valve_timer_s,
            dump_valve_locked:      r.dump_valve_locked,
            max_pressure_psi:       r.max_pressure_psi,
            full_service_psi:       r.full_service_psi,
            sound: SoundTracker {
                timer_s:       r.sound_timer_s,
                last_cyl_psi:  r.sound_cyl_psi,
                last_pipe_psi: r.sound_pipe_psi,
                cyl_trend:     r.sound_cyl_trend,
                pipe_trend:    r.sound_pipe_trend,
            },
        }
    }
}
