//! Per-car brake constants and their vehicle-file tokens.
//!
//! [`BrakeParams::new`] gives sensible defaults for each [`BrakeKind`];
//! [`BrakeParams::parse`] overrides them one token at a time while a vehicle
//! definition is loaded.
//!
//! # Recognised tokens
//!
//! | Token                                              | Field                           |
//! |----------------------------------------------------|---------------------------------|
//! | `wagon(brakesystemtype`                            | `kind`, `pipe_family`           |
//! | `wagon(brakecylinderpressureformaxbrakebrakeforce` | `max_cylinder_psi`              |
//! | `wagon(triplevalveratio`                           | `aux_cyl_volume_ratio`          |
//! | `wagon(maxreleaserate`                             | `max_release_rate`              |
//! | `wagon(maxapplicationrate`                         | `max_application_rate`          |
//! | `wagon(ortsemergencyapplicationrate`               | `emergency_application_rate`    |
//! | `wagon(maxauxilarychargingrate`                    | `aux_charging_rate`             |
//! | `wagon(emergencyreschargingrate`                   | `emerg_res_charging_rate`       |
//! | `wagon(emergencyrescapacity`                       | `emerg_res_volume_m3`           |
//! | `wagon(emergencyresvolumemultiplier`               | `emerg_res_volume_m3` (× aux)   |
//! | `wagon(ortsauxilaryrescapacity`                    | `aux_res_volume_m3`             |
//! | `wagon(ortsbrakecylindervolume`                    | `cylinder_volume_m3`            |
//! | `wagon(ortsnumberbrakecylinders`                   | `num_cylinders`                 |
//! | `wagon(brakepipevolume`                            | `brake_pipe_volume_m3`          |
//! | `wagon(ortsemergencyvalveactuationrate`            | `emergency_valve_actuation_rate`|
//! | `wagon(ortsemergencydumpvalverate`                 | `quick_action_rate`             |
//! | `wagon(ortsemergencydumpvalvetimer`                | `quick_action_time_s`           |
//! | `wagon(ortsmainrescharging`                        | `main_res_charging`             |
//! | `wagon(retainerpositions`                          | `retainer_positions`            |
//! | `wagon(ortsdistributortype`                        | `valve_mode`                    |
//! | `wagon(ortsuichighpressurerelease`                 | `high_pressure_release`         |
//! | `wagon(ortsepapplicationrate`                      | `ep_application_rate`           |
//! | `wagon(ortswheelslidedumpvalve`                    | `wheel_slide_dump_valve`        |
//! | `wagon(handbrakepresent`                           | `handbrake_present`             |
//! | `wagon(ortsvacuumreservoircapacity`                | `vac_res_volume_m3`             |
//! | `wagon(ortsvacuumbrakeforcedifferential`           | `vac_max_force_diff_psi`        |
//! | `wagon(ortsvacuumreleaserate`                      | `vac_release_rate`              |
//! | `wagon(ortsvacuumapplicationrate`                  | `vac_application_rate`          |
//! | `wagon(ortsvacuumreservoirchargingrate`            | `vac_res_charging_rate`         |
//! | `wagon(ortsmaxvacuum`                              | `max_vacuum_psi`                |
//! | `wagon(ortsstraightvacuumleakrate`                 | `straight_vac_leak_rate`        |
//! | `wagon(ortsmanualbrakerate`                        | `manual_brake_rate`             |
//!
//! Anything else is ignored (`parse` returns `false`).  A recognised token
//! whose value cannot be read logs a warning and leaves the field alone.

use log::warn;

use tb_core::BrakeFamily;
use tb_core::units::{PSI_PER_INHG, psia_from_vacuum_inhg};

use crate::{BrakeKind, BrakeResult, ValueReader};

/// Air pipe bore (m).
const AIR_PIPE_DIAMETER_M: f32 = 0.032;
/// Vacuum train pipe bore (m).
const VACUUM_PIPE_DIAMETER_M: f32 = 0.0508;
/// Shortest pipe length used for volume sizing (m).
const MIN_PIPE_LENGTH_M: f32 = 5.0;

/// How the car's control valve decides between release and application.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValveMode {
    /// Direct release: any rise in pipe pressure releases fully.
    TripleValve,
    /// Graduated release against a control reservoir.
    Distributor,
    /// Follow [`BrakeOptions::graduated_release`][tb_core::BrakeOptions].
    #[default]
    Auto,
}

/// Fixed constants of one car's brake equipment.
///
/// Rates are psi per second, volumes m³, pressures psi (vacuum depths are
/// psi below atmosphere).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BrakeParams {
    pub kind:        BrakeKind,
    /// Medium of the pipe running through the car.  Equals `kind.family()`
    /// except for manual-braking stock, which may be piped either way.
    pub pipe_family: BrakeFamily,

    // ── Cylinder and reservoirs ───────────────────────────────────────────
    pub max_cylinder_psi:     f32,
    pub aux_cyl_volume_ratio: f32,
    /// Volume of one brake cylinder.
    pub cylinder_volume_m3:   f32,
    pub num_cylinders:        u32,
    /// `None` derives it from cylinder volume × ratio.
    pub aux_res_volume_m3:    Option<f32>,
    /// Zero means no emergency reservoir.
    pub emerg_res_volume_m3:  f32,
    /// `None` sizes the pipe from the car length.
    pub brake_pipe_volume_m3: Option<f32>,

    // ── Air rates ─────────────────────────────────────────────────────────
    pub max_release_rate:               f32,
    pub max_application_rate:           f32,
    pub emergency_application_rate:    f32,
    pub aux_charging_rate:              f32,
    pub emerg_res_charging_rate:        f32,
    /// Pipe drop rate above which the valve goes to `Emergency`.
    pub emergency_valve_actuation_rate: f32,
    /// Least pipe vent rate while quick action is open.
    pub quick_action_rate:              f32,
    pub quick_action_time_s:            f32,
    pub ep_application_rate:            f32,

    // ── Air valve behaviour ───────────────────────────────────────────────
    pub valve_mode:             ValveMode,
    pub valve_deadband_psi:     f32,
    /// UIC rule: release once the pipe exceeds 97 % of the control
    /// reservoir.
    pub high_pressure_release:  bool,
    /// Twin-pipe cars recharge the auxiliary reservoir from line 2.
    pub main_res_charging:      bool,
    pub retainer_positions:     u32,
    pub wheel_slide_dump_valve: bool,
    pub handbrake_present:      bool,

    // ── Vacuum ────────────────────────────────────────────────────────────
    pub vac_res_volume_m3:      f32,
    /// Cylinder-minus-reservoir difference giving full force.
    pub vac_max_force_diff_psi: f32,
    pub vac_release_rate:       f32,
    pub vac_application_rate:   f32,
    pub vac_res_charging_rate:  f32,
    /// Cylinder volume swept by the piston over its full travel.
    pub vac_swept_volume_m3:    f32,
    /// Deepest vacuum the ejector or exhauster can draw at sea level.
    pub max_vacuum_psi:         f32,
    pub straight_vac_leak_rate: f32,

    // ── Manual brake ──────────────────────────────────────────────────────
    /// Fraction of full manual brake per second of winding.
    pub manual_brake_rate: f32,
}

impl BrakeParams {
    /// Defaults for `kind`.
    pub fn new(kind: BrakeKind) -> Self {
        let vacuum = kind.family() == BrakeFamily::Vacuum;
        Self {
            kind,
            pipe_family:          kind.family(),
            max_cylinder_psi:     if vacuum { 50.0 } else { 64.0 },
            aux_cyl_volume_ratio: 2.5,
            cylinder_volume_m3:   if vacuum { 0.045 } else { 0.012 },
            num_cylinders:        1,
            aux_res_volume_m3:    None,
            emerg_res_volume_m3:  if kind.is_pipe_only() || vacuum { 0.0 } else { 0.07 },
            brake_pipe_volume_m3: None,

            max_release_rate:               1.86,
            max_application_rate:           0.9,
            emergency_application_rate:     2.5,
            aux_charging_rate:              1.684,
            emerg_res_charging_rate:        1.684,
            emergency_valve_actuation_rate: 15.0,
            quick_action_rate:              20.0,
            quick_action_time_s:            3.0,
            ep_application_rate:            8.0,

            valve_mode:             ValveMode::Auto,
            valve_deadband_psi:     1.0,
            high_pressure_release:  false,
            main_res_charging:      true,
            retainer_positions:     4,
            wheel_slide_dump_valve: false,
            handbrake_present:      true,

            vac_res_volume_m3:      0.12,
            vac_max_force_diff_psi: 21.0 * PSI_PER_INHG,
            vac_release_rate:       2.5 * PSI_PER_INHG,
            vac_application_rate:   5.0 * PSI_PER_INHG,
            vac_res_charging_rate:  3.0 * PSI_PER_INHG,
            vac_swept_volume_m3:    0.02,
            max_vacuum_psi:         21.0 * PSI_PER_INHG,
            straight_vac_leak_rate: 0.05,

            manual_brake_rate: 0.1,
        }
    }

    /// Auxiliary reservoir volume, derived from the cylinders if not set.
    pub fn aux_res_volume(&self) -> f32 {
        self.aux_res_volume_m3.unwrap_or_else(|| {
            self.total_cylinder_volume() * self.aux_cyl_volume_ratio
        })
    }

    /// Combined volume of all brake cylinders.
    pub fn total_cylinder_volume(&self) -> f32 {
        self.cylinder_volume_m3 * self.num_cylinders.max(1) as f32
    }

    /// Brake pipe volume for a car of `length_m`.
    ///
    /// Unless overridden, a pipe of the family's bore running the car length
    /// (at least 5 m).
    pub fn brake_pipe_volume(&self, length_m: f32) -> f32 {
        if let Some(v) = self.brake_pipe_volume_m3 {
            return v;
        }
        let d = match self.pipe_family {
            BrakeFamily::Air    => AIR_PIPE_DIAMETER_M,
            BrakeFamily::Vacuum => VACUUM_PIPE_DIAMETER_M,
        };
        let length = if length_m.is_finite() { (1.0 + length_m).max(MIN_PIPE_LENGTH_M) } else { MIN_PIPE_LENGTH_M };
        std::f32::consts::PI * d * d / 4.0 * length
    }

    /// Deepest pipe pressure (psia) the vacuum equipment can reach at sea
    /// level.
    pub fn min_vacuum_psia(&self) -> f32 {
        psia_from_vacuum_inhg(self.max_vacuum_psi / PSI_PER_INHG)
    }

    /// Whether the valve works as a distributor under `graduated_release`.
    pub fn uses_distributor(&self, graduated_release: bool) -> bool {
        match self.valve_mode {
            ValveMode::TripleValve => false,
            ValveMode::Distributor => true,
            ValveMode::Auto        => graduated_release,
        }
    }

    /// Apply one vehicle-file token.  Returns whether the token was
    /// recognised.
    pub fn parse(&mut self, token: &str, reader: &mut dyn ValueReader) -> bool {
        match token {
            "wagon(brakesystemtype" => {
                if let Some(name) = keep_on_error(token, reader.read_string()) {
                    match BrakeKind::from_name(&name) {
                        Ok(kind) => {
                            self.kind = kind;
                            self.pipe_family = kind.family();
                        }
                        Err(e) => warn!("{token}: {e}; keeping {}", self.kind),
                    }
                }
            }
            "wagon(brakecylinderpressureformaxbrakebrakeforce" => {
                set_positive(token, &mut self.max_cylinder_psi, reader.read_pressure_psi());
            }
            "wagon(triplevalveratio" => {
                set_positive(token, &mut self.aux_cyl_volume_ratio, reader.read_f32());
            }
            "wagon(maxreleaserate" => {
                set_positive(token, &mut self.max_release_rate, reader.read_rate_psi_per_s());
            }
            "wagon(maxapplicationrate" => {
                set_positive(token, &mut self.max_application_rate, reader.read_rate_psi_per_s());
            }
            "wagon(ortsemergencyapplicationrate" => {
                set_positive(token, &mut self.emergency_application_rate, reader.read_rate_psi_per_s());
            }
            "wagon(maxauxilarychargingrate" => {
                set_positive(token, &mut self.aux_charging_rate, reader.read_rate_psi_per_s());
            }
            "wagon(emergencyreschargingrate" => {
                set_positive(token, &mut self.emerg_res_charging_rate, reader.read_rate_psi_per_s());
            }
            "wagon(emergencyrescapacity" => {
                set_non_negative(token, &mut self.emerg_res_volume_m3, reader.read_volume_m3());
            }
            "wagon(emergencyresvolumemultiplier" => {
                let mut mult = 0.0;
                if set_non_negative(token, &mut mult, reader.read_f32()) {
                    self.emerg_res_volume_m3 = mult * self.aux_res_volume();
                }
            }
            "wagon(ortsauxilaryrescapacity" => {
                let mut v = self.aux_res_volume();
                if set_positive(token, &mut v, reader.read_volume_m3()) {
                    self.aux_res_volume_m3 = Some(v);
                }
            }
            "wagon(ortsbrakecylindervolume" => {
                set_positive(token, &mut self.cylinder_volume_m3, reader.read_volume_m3());
            }
            "wagon(ortsnumberbrakecylinders" => {
                let mut n = self.num_cylinders as f32;
                if set_positive(token, &mut n, reader.read_f32()) {
                    self.num_cylinders = n.round().max(1.0) as u32;
                }
            }
            "wagon(brakepipevolume" => {
                let mut v = 0.0;
                if set_positive(token, &mut v, reader.read_volume_m3()) {
                    self.brake_pipe_volume_m3 = Some(v);
                }
            }
            "wagon(ortsemergencyvalveactuationrate" => {
                set_positive(token, &mut self.emergency_valve_actuation_rate, reader.read_rate_psi_per_s());
            }
            "wagon(ortsemergencydumpvalverate" => {
                set_non_negative(token, &mut self.quick_action_rate, reader.read_rate_psi_per_s());
            }
            "wagon(ortsemergencydumpvalvetimer" => {
                set_non_negative(token, &mut self.quick_action_time_s, reader.read_time_s());
            }
            "wagon(ortsmainrescharging" => {
                if let Some(b) = keep_on_error(token, reader.read_bool()) {
                    self.main_res_charging = b;
                }
            }
            "wagon(retainerpositions" => {
                let mut n = self.retainer_positions as f32;
                if set_non_negative(token, &mut n, reader.read_f32()) {
                    self.retainer_positions = n.round() as u32;
                }
            }
            "wagon(ortsdistributortype" => {
                if let Some(name) = keep_on_error(token, reader.read_string()) {
                    match name.to_ascii_lowercase().replace(['_', '-', ' '], "").as_str() {
                        "triplevalve" | "direct" => self.valve_mode = ValveMode::TripleValve,
                        "distributor" | "graduated" => self.valve_mode = ValveMode::Distributor,
                        "auto" | "default" => self.valve_mode = ValveMode::Auto,
                        _ => warn!("{token}: unknown distributor type {name:?}; keeping {:?}", self.valve_mode),
                    }
                }
            }
            "wagon(ortsuichighpressurerelease" => {
                if let Some(b) = keep_on_error(token, reader.read_bool()) {
                    self.high_pressure_release = b;
                }
            }
            "wagon(ortsepapplicationrate" => {
                set_positive(token, &mut self.ep_application_rate, reader.read_rate_psi_per_s());
            }
            "wagon(ortswheelslidedumpvalve" => {
                if let Some(b) = keep_on_error(token, reader.read_bool()) {
                    self.wheel_slide_dump_valve = b;
                }
            }
            "wagon(handbrakepresent" => {
                if let Some(b) = keep_on_error(token, reader.read_bool()) {
                    self.handbrake_present = b;
                }
            }
            "wagon(ortsvacuumreservoircapacity" => {
                set_positive(token, &mut self.vac_res_volume_m3, reader.read_volume_m3());
            }
            "wagon(ortsvacuumbrakeforcedifferential" => {
                set_positive(token, &mut self.vac_max_force_diff_psi, reader.read_pressure_psi());
            }
            "wagon(ortsvacuumreleaserate" => {
                set_positive(token, &mut self.vac_release_rate, reader.read_rate_psi_per_s());
            }
            "wagon(ortsvacuumapplicationrate" => {
                set_positive(token, &mut self.vac_application_rate, reader.read_rate_psi_per_s());
            }
            "wagon(ortsvacuumreservoirchargingrate" => {
                set_positive(token, &mut self.vac_res_charging_rate, reader.read_rate_psi_per_s());
            }
            "wagon(ortsmaxvacuum" => {
                set_positive(token, &mut self.max_vacuum_psi, reader.read_pressure_psi());
            }
            "wagon(ortsstraightvacuumleakrate" => {
                set_non_negative(token, &mut self.straight_vac_leak_rate, reader.read_rate_psi_per_s());
            }
            "wagon(ortsmanualbrakerate" => {
                set_positive(token, &mut self.manual_brake_rate, reader.read_f32());
            }
            _ => return false,
        }
        true
    }
}

impl Default for BrakeParams {
    fn default() -> Self {
        Self::new(BrakeKind::default())
    }
}

// ── Parse helpers ─────────────────────────────────────────────────────────────

fn keep_on_error<T>(token: &str, value: BrakeResult<T>) -> Option<T> {
    match value {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("{token}: {e}; keeping default");
            None
        }
    }
}

/// Store a strictly positive value; returns whether `slot` changed.
fn set_positive(token: &str, slot: &mut f32, value: BrakeResult<f32>) -> bool {
    match keep_on_error(token, value) {
        Some(v) if v > 0.0 => {
            *slot = v;
            true
        }
        Some(v) => {
            warn!("{token}: {v} must be positive; keeping {slot}");
            false
        }
        None => false,
    }
}

/// Store a value `>= 0`; returns whether `slot` changed.
fn set_non_negative(token: &str, slot: &mut f32, value: BrakeResult<f32>) -> bool {
    match keep_on_error(token, value) {
        Some(v) if v >= 0.0 => {
            *slot = v;
            true
        }
        Some(v) => {
            warn!("{token}: {v} must not be negative; keeping {slot}");
            false
        }
        None => false,
    }
}
