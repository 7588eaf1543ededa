//! Plain data row types written by output backends.

use tb_train::{Car, TickReport, Train};

/// Pressures of one car at a snapshot tick.
///
/// Pressures are stored values: psi gauge on air cars, psia on vacuum cars.
#[derive(Debug, Clone, PartialEq)]
pub struct CarPressureRow {
    pub tick:           u64,
    pub car_id:         u32,
    /// Position in the train, 0 = front.
    pub position:       u32,
    pub kind:           &'static str,
    pub brake_pipe_psi: f32,
    pub cylinder_psi:   f32,
    pub aux_res_psi:    f32,
    pub valve:          &'static str,
    pub brake_force_n:  f32,
}

impl CarPressureRow {
    pub fn from_car(tick: u64, position: usize, car: &Car) -> Self {
        let s = &car.brakes.state;
        Self {
            tick,
            car_id:         car.id.0,
            position:       position as u32,
            kind:           car.brakes.kind().name(),
            brake_pipe_psi: s.line1_psi,
            cylinder_psi:   s.cyl_psi,
            aux_res_psi:    s.aux_res_psi,
            valve:          s.valve.label(),
            brake_force_n:  car.brake_force_n(),
        }
    }

    /// One row per car, front to rear.
    pub fn all(tick: u64, train: &Train) -> Vec<Self> {
        train.cars.iter().enumerate().map(|(i, car)| Self::from_car(tick, i, car)).collect()
    }
}

/// Summary of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainSummaryRow {
    pub tick:                u64,
    pub brake_pipe_intact:   bool,
    pub substeps:            u32,
    pub sound_events:        u32,
    pub total_brake_force_n: f32,
}

impl From<&TickReport> for TrainSummaryRow {
    fn from(r: &TickReport) -> Self {
        Self {
            tick:                r.tick.0,
            brake_pipe_intact:   r.propagation.brake_pipe_intact,
            substeps:            r.propagation.substeps,
            sound_events:        r.sound_events.len() as u32,
            total_brake_force_n: r.total_brake_force_n,
        }
    }
}
