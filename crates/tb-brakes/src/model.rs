//! The `BrakeModel` strategy trait: one implementation per brake family.

use tb_core::{BrakeFamily, BrakeOptions};

use crate::{BrakeParams, BrakeState, BrakeStatus};

/// What a car looks like from the outside, as far as its brakes care.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CarContext {
    /// Locomotives combine the automatic brake with the engine brake
    /// (line 3) and honour bail-off.
    pub is_locomotive: bool,
    /// Used for the atmospheric correction of vacuum equipment.
    pub elevation_m:   f32,
    /// This car's brake pipe volume.  Overwritten by
    /// [`BrakeSystem::update`][crate::BrakeSystem::update] from the car
    /// length, so callers may leave it at zero.
    pub pipe_volume_m3: f32,
}

impl CarContext {
    pub fn wagon() -> Self {
        Self::default()
    }

    pub fn locomotive() -> Self {
        Self { is_locomotive: true, ..Self::default() }
    }
}

/// Volumes and capabilities a car offers to the train-wide propagation pass.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PipeContribution {
    pub family:              BrakeFamily,
    pub pipe_volume_m3:      f32,
    /// Reservoirs charged from the pipe (auxiliary, emergency, vacuum).
    pub reservoir_volume_m3: f32,
    pub cylinder_volume_m3:  f32,
    /// Carries line 2.
    pub twin_pipe:           bool,
    /// Responds to line 4.
    pub ep_capable:          bool,
}

impl PipeContribution {
    /// Everything the driver's valve has to fill or empty for this car.
    pub fn total_volume_m3(&self) -> f32 {
        self.pipe_volume_m3 + self.reservoir_volume_m3 + self.cylinder_volume_m3
    }
}

/// Per-family brake behaviour.
///
/// Implementations are stateless; all per-car data is passed in.  One static
/// instance per family is selected from [`BrakeKind`][crate::BrakeKind] when a
/// [`BrakeSystem`][crate::BrakeSystem] is built, so a car never changes
/// strategy during its lifetime.
pub trait BrakeModel: Send + Sync + 'static {
    /// Set starting pressures.  `max_pressure_psi` is the fully charged pipe
    /// pressure and `full_service_psi` the pipe pressure of a full service
    /// application, both in the car's family convention.
    fn initialize(
        &self,
        params:            &BrakeParams,
        state:             &mut BrakeState,
        handbrake_on:      bool,
        max_pressure_psi:  f32,
        full_service_psi:  f32,
        immediate_release: bool,
    );

    /// Advance valves, reservoirs and cylinder by `dt` seconds from the
    /// current line pressures.  `dt` is already sanitized and positive.
    fn update(
        &self,
        params:  &BrakeParams,
        options: &BrakeOptions,
        state:   &mut BrakeState,
        ctx:     &CarContext,
        dt:      f32,
    );

    /// Volumes this car adds to the train for propagation.
    fn contribute(&self, params: &BrakeParams, pipe_volume_m3: f32) -> PipeContribution;

    /// Fraction of maximum brake force currently produced by the cylinder,
    /// in `[0, 1]`.  Handbrake force is handled by the caller.
    fn force_fraction(&self, params: &BrakeParams, state: &BrakeState, ctx: &CarContext) -> f32;

    /// HUD key/value pairs.
    fn status(&self, params: &BrakeParams, options: &BrakeOptions, state: &BrakeState) -> BrakeStatus;
}
