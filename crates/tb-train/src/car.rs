//! One vehicle in a train.

use tb_brakes::{BrakeSystem, CarContext};
use tb_core::CarId;

/// Whether a car carries a driver's brake valve and main reservoir.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CarRole {
    #[default]
    Wagon,
    Locomotive,
}

/// A car: identity, role, forces and its brake equipment.
///
/// The car's position in the train is its index in `Train::cars`.  `id` is
/// assigned by the train the car joins and never reused within it.
#[derive(Clone, Debug)]
pub struct Car {
    pub id:                    CarId,
    pub role:                  CarRole,
    pub brakes:                BrakeSystem,
    /// Retarding force at full cylinder pressure (N).
    pub max_brake_force_n:     f32,
    /// Retarding force with the handbrake fully on (N).
    pub max_handbrake_force_n: f32,
    pub elevation_m:           f32,
    /// Main reservoir (locomotives only, psi).
    pub main_res_psi:          f32,
}

impl Car {
    /// A car without an ID; the train assigns one when the car joins it.
    pub fn new(role: CarRole, brakes: BrakeSystem) -> Self {
        Self {
            id: CarId::INVALID,
            role,
            brakes,
            max_brake_force_n:     0.0,
            max_handbrake_force_n: 0.0,
            elevation_m:           0.0,
            main_res_psi:          0.0,
        }
    }

    pub fn wagon(brakes: BrakeSystem) -> Self {
        Self::new(CarRole::Wagon, brakes)
    }

    pub fn locomotive(brakes: BrakeSystem) -> Self {
        Self::new(CarRole::Locomotive, brakes)
    }

    /// Set the maximum brake and handbrake forces (N).
    pub fn with_forces(mut self, max_brake_force_n: f32, max_handbrake_force_n: f32) -> Self {
        self.max_brake_force_n = max_brake_force_n.max(0.0);
        self.max_handbrake_force_n = max_handbrake_force_n.max(0.0);
        self
    }

    pub fn at_elevation(mut self, elevation_m: f32) -> Self {
        self.elevation_m = elevation_m;
        self
    }

    #[inline]
    pub fn is_locomotive(&self) -> bool {
        self.role == CarRole::Locomotive
    }

    pub fn length_m(&self) -> f32 {
        self.brakes.car_length_m()
    }

    /// What the brake model needs to know about this car.
    pub fn context(&self) -> CarContext {
        let ctx = if self.is_locomotive() { CarContext::locomotive() } else { CarContext::wagon() };
        CarContext { elevation_m: self.elevation_m, ..ctx }
    }

    /// Current retarding force (N).
    pub fn brake_force_n(&self) -> f32 {
        self.brakes.brake_force_n(&self.context(), self.max_brake_force_n, self.max_handbrake_force_n)
    }
}
