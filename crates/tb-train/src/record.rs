//! Flat snapshot of a [`Train`] for save files.

use tb_brakes::BrakeRecord;
use tb_core::{CarId, Tick};

use crate::{BrakeControllerState, Train};

/// Dynamic state of a train: controls, clock and every car's brakes.
///
/// Static data (car kinds, parameters, forces) is not recorded; a record is
/// restored onto a train built the same way.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrainRecord {
    pub tick:               Tick,
    pub elapsed_secs:       f64,

    pub lead:               Option<usize>,
    pub equalizing_res_psi: f32,
    pub relay_psi:          f32,
    pub train_brake:        BrakeControllerState,
    pub engine_brake:       BrakeControllerState,
    pub engine_brake_psi:   f32,
    pub ep_demand:          Option<f32>,
    pub brake_pipe_intact:  bool,
    pub max_pressure_psi:   f32,
    pub full_service_psi:   f32,

    /// Per car, front to rear.
    pub car_ids:            Vec<CarId>,
    pub brakes:             Vec<BrakeRecord>,
    pub main_res_psi:       Vec<f32>,
}

impl From<&Train> for TrainRecord {
    fn from(t: &Train) -> Self {
        Self {
            tick:               t.clock.current_tick,
            elapsed_secs:       t.clock.elapsed_secs,
            lead:               t.lead,
            equalizing_res_psi: t.equalizing_res_psi,
            relay_psi:          t.relay_psi,
            train_brake:        t.train_brake,
            engine_brake:       t.engine_brake,
            engine_brake_psi:   t.engine_brake_psi,
            ep_demand:          t.ep_demand,
            brake_pipe_intact:  t.brake_pipe_intact,
            max_pressure_psi:   t.max_pressure_psi,
            full_service_psi:   t.full_service_psi,
            car_ids:            t.cars.iter().map(|c| c.id).collect(),
            brakes:             t.cars.iter().map(|c| c.brakes.snapshot()).collect(),
            main_res_psi:       t.cars.iter().map(|c| c.main_res_psi).collect(),
        }
    }
}
