//! Driver's brake valve: controller positions and valve constants.
//!
//! # Controller positions
//!
//! | Position            | Air brake pipe                     | Vacuum train pipe                  |
//! |---------------------|------------------------------------|------------------------------------|
//! | `Release`, `Running`, `BrakeNotch` | self-lapping to EQ  | self-lapping to EQ                 |
//! | `Apply`             | vent down to EQ                    | admit air up to EQ                 |
//! | `Lap`, `Neutral`    | hold                               | hold                               |
//! | `Emergency`         | vent to atmosphere, full rate      | admit air to atmosphere, full rate |
//! | `FullQuickRelease`  | charge to EQ at quick rate         | large ejector to EQ                |
//! | `Overcharge`        | charge above EQ at quick rate      | hold                               |
//! | `VacContServ`       | hold                               | self-lapping to EQ                 |
//! | `VacApplyContServ`  | hold                               | admit air at service rate          |
//! | `Straight*`         | engine brake (line 3) only         | engine brake (line 3) only         |
//!
//! EQ is the equalizing reservoir pressure commanded on the train.  On a
//! straight vacuum lead the pipe sense is inverted: releasing admits air and
//! applying evacuates (see `propagate.rs`).

use std::fmt;

use log::warn;

use tb_brakes::{BrakeResult, ValueReader};

/// Position of a brake controller handle.
///
/// The train brake and the engine brake each hold one of these; positions
/// that mean nothing to a handle are treated as `Lap`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BrakeControllerState {
    Release,
    Apply,
    #[default]
    Lap,
    Emergency,
    Running,
    FullQuickRelease,
    Overcharge,
    Neutral,
    VacContServ,
    VacApplyContServ,
    StraightApply,
    StraightRelease,
    StraightLap,
    StraightEmergency,
    BrakeNotch,
}

impl BrakeControllerState {
    /// Engine (independent) brake positions.
    pub fn is_straight(self) -> bool {
        matches!(
            self,
            BrakeControllerState::StraightApply
                | BrakeControllerState::StraightRelease
                | BrakeControllerState::StraightLap
                | BrakeControllerState::StraightEmergency
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            BrakeControllerState::Release           => "Release",
            BrakeControllerState::Apply             => "Apply",
            BrakeControllerState::Lap               => "Lap",
            BrakeControllerState::Emergency         => "Emergency",
            BrakeControllerState::Running           => "Running",
            BrakeControllerState::FullQuickRelease  => "Quick Release",
            BrakeControllerState::Overcharge        => "Overcharge",
            BrakeControllerState::Neutral           => "Neutral",
            BrakeControllerState::VacContServ       => "Cont. Service",
            BrakeControllerState::VacApplyContServ  => "Apply Cont. Service",
            BrakeControllerState::StraightApply     => "Apply",
            BrakeControllerState::StraightRelease   => "Release",
            BrakeControllerState::StraightLap       => "Lap",
            BrakeControllerState::StraightEmergency => "Emergency",
            BrakeControllerState::BrakeNotch        => "Notch",
        }
    }
}

impl fmt::Display for BrakeControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── BrakeValveParams ──────────────────────────────────────────────────────────

/// Constants of the lead locomotive's brake valve, compressor and engine
/// brake.  Rates are psi per second at the reference train volume; the
/// propagation pass scales them by train size.
///
/// # Recognised tokens
///
/// | Token                                               | Field                      |
/// |-----------------------------------------------------|----------------------------|
/// | `engine(brakepipechargingrate`                      | `charging_rate`            |
/// | `engine(ortsbrakeservicepipedischargerate`          | `service_rate`             |
/// | `engine(ortsbrakeemergencypipedischargerate`        | `emergency_rate`           |
/// | `engine(ortsbrakepipequickchargingrate`             | `quick_release_rate`       |
/// | `engine(ortsbrakepipeoverchargepressure`            | `overcharge_psi`           |
/// | `engine(trainpipeleakrate`                          | `leak_rate`                |
/// | `engine(brakepipetimefactor`                        | `propagation_time_s`       |
/// | `engine(enginebrakesapplicationrate`                | `engine_apply_rate`        |
/// | `engine(enginebrakesreleaserate`                    | `engine_release_rate`      |
/// | `engine(enginebrakescontrollermaxsystempressure`    | `engine_max_psi`           |
/// | `engine(mainresvolume`                              | `main_res_volume_m3`       |
/// | `engine(maxmainrespressure`                         | `main_res_max_psi`         |
/// | `engine(ortsmainreschargingrate`                    | `compressor_rate`          |
/// | `engine(ortsvacuumexhausterrate`                    | `exhauster_rate`           |
/// | `engine(ortsvacuumlargeejectorrate`                 | `ejector_rate`             |
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BrakeValveParams {
    /// Rates at which the driver's valve moves its relay pressure.
    pub charging_rate:       f32,
    pub service_rate:        f32,
    /// Not scaled by train volume.
    pub emergency_rate:      f32,
    pub quick_release_rate:  f32,
    pub overcharge_psi:      f32,
    /// Per-car brake pipe leakage toward atmosphere.
    pub leak_rate:           f32,
    /// Propagation time constant at the reference volume (s).
    pub propagation_time_s:  f32,

    pub engine_apply_rate:   f32,
    pub engine_release_rate: f32,
    pub engine_max_psi:      f32,

    pub main_res_volume_m3:  f32,
    pub main_res_max_psi:    f32,
    pub compressor_rate:     f32,

    /// Vacuum: evacuation rate while running.
    pub exhauster_rate:      f32,
    /// Vacuum: evacuation rate with the large ejector open.
    pub ejector_rate:        f32,
}

impl Default for BrakeValveParams {
    fn default() -> Self {
        Self {
            charging_rate:       5.0,
            service_rate:        1.0,
            emergency_rate:      40.0,
            quick_release_rate:  15.0,
            overcharge_psi:      5.0,
            leak_rate:           0.0,
            propagation_time_s:  0.01,

            engine_apply_rate:   12.0,
            engine_release_rate: 12.0,
            engine_max_psi:      45.0,

            main_res_volume_m3:  0.8,
            main_res_max_psi:    140.0,
            compressor_rate:     1.5,

            exhauster_rate:      1.0,
            ejector_rate:        3.0,
        }
    }
}

impl BrakeValveParams {
    /// Apply one vehicle-file token.  Returns whether it was recognised;
    /// unreadable or negative values are logged and ignored.
    pub fn parse(&mut self, token: &str, reader: &mut dyn ValueReader) -> bool {
        let slot = match token {
            "engine(brakepipechargingrate"                   => &mut self.charging_rate,
            "engine(ortsbrakeservicepipedischargerate"       => &mut self.service_rate,
            "engine(ortsbrakeemergencypipedischargerate"     => &mut self.emergency_rate,
            "engine(ortsbrakepipequickchargingrate"          => &mut self.quick_release_rate,
            "engine(trainpipeleakrate"                       => &mut self.leak_rate,
            "engine(enginebrakesapplicationrate"             => &mut self.engine_apply_rate,
            "engine(enginebrakesreleaserate"                 => &mut self.engine_release_rate,
            "engine(ortsmainreschargingrate"                 => &mut self.compressor_rate,
            "engine(ortsvacuumexhausterrate"                 => &mut self.exhauster_rate,
            "engine(ortsvacuumlargeejectorrate"              => &mut self.ejector_rate,
            "engine(ortsbrakepipeoverchargepressure"         => {
                store(token, &mut self.overcharge_psi, reader.read_pressure_psi());
                return true;
            }
            "engine(enginebrakescontrollermaxsystempressure" => {
                store(token, &mut self.engine_max_psi, reader.read_pressure_psi());
                return true;
            }
            "engine(maxmainrespressure"                      => {
                store(token, &mut self.main_res_max_psi, reader.read_pressure_psi());
                return true;
            }
            "engine(mainresvolume"                           => {
                store(token, &mut self.main_res_volume_m3, reader.read_volume_m3());
                return true;
            }
            "engine(brakepipetimefactor"                     => {
                store(token, &mut self.propagation_time_s, reader.read_time_s());
                return true;
            }
            _ => return false,
        };
        store(token, slot, reader.read_rate_psi_per_s());
        true
    }
}

fn store(token: &str, slot: &mut f32, value: BrakeResult<f32>) {
    match value {
        Ok(v) if v >= 0.0 => *slot = v,
        Ok(v) => warn!("{token}: {v} must not be negative; keeping {slot}"),
        Err(e) => warn!("{token}: {e}; keeping {slot}"),
    }
}
