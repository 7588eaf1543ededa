//! `BrakeSystem`: one car's brakes: parameters, state and strategy.

use std::fmt;

use log::debug;

use tb_core::{BrakeFamily, BrakeOptions, sanitize_dt};

use crate::air::AirBrake;
use crate::transfer::TransferPipe;
use crate::vacuum::{VacuumBrake, vac_res_pressure_adjusted};
use crate::valve::retainer_limits;
use crate::{
    BrakeKind, BrakeModel, BrakeParams, BrakeRecord, BrakeSoundEvent, BrakeState, BrakeStatus,
    CarContext, PipeContribution, RetainerSetting,
};

impl BrakeKind {
    /// The strategy implementing this kind.
    pub fn model(self) -> &'static dyn BrakeModel {
        match self {
            BrakeKind::AirSinglePipe
            | BrakeKind::AirTwinPipe
            | BrakeKind::Ep
            | BrakeKind::Sme => &AirBrake,
            BrakeKind::VacuumSinglePipe
            | BrakeKind::StraightVacuumSinglePipe => &VacuumBrake,
            BrakeKind::AirPiped
            | BrakeKind::VacuumPiped
            | BrakeKind::ManualBraking => &TransferPipe,
        }
    }
}

/// The brake equipment of one car.
///
/// Owns the fixed [`BrakeParams`], the shared [`BrakeOptions`] it was built
/// with, and the mutable [`BrakeState`].  The state is public so the
/// train-wide propagation pass can write line pressures and hose positions
/// directly; everything else goes through methods.
///
/// # Lifecycle
///
/// ```rust,ignore
/// let mut brake = BrakeSystem::new(BrakeParams::new(BrakeKind::AirSinglePipe), options, 15.0);
/// brake.state.line1_psi = 90.0;
/// brake.initialize(false, 90.0, 64.0, true);
/// loop {
///     // train writes line pressures …
///     let events = brake.update(&CarContext::wagon(), dt);
///     let force = brake.brake_force_n(&CarContext::wagon(), 80_000.0, 20_000.0);
/// }
/// ```
#[derive(Clone)]
pub struct BrakeSystem {
    params:       BrakeParams,
    options:      BrakeOptions,
    car_length_m: f32,
    model:        &'static dyn BrakeModel,
    pub state:    BrakeState,
}

impl fmt::Debug for BrakeSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrakeSystem")
            .field("kind", &self.params.kind)
            .field("car_length_m", &self.car_length_m)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl BrakeSystem {
    /// A released, uncharged brake for a car of `car_length_m`.
    pub fn new(params: BrakeParams, options: BrakeOptions, car_length_m: f32) -> Self {
        let mut state = BrakeState::new(params.pipe_family);
        state.cyl_volume_m3 = if params.kind.is_pipe_only() { 0.0 } else { params.total_cylinder_volume() };
        Self {
            model: params.kind.model(),
            params,
            options,
            car_length_m: if car_length_m.is_finite() { car_length_m.max(0.0) } else { 0.0 },
            state,
        }
    }

    /// Shorthand for a car with default parameters of `kind`.
    pub fn with_kind(kind: BrakeKind, options: BrakeOptions, car_length_m: f32) -> Self {
        Self::new(BrakeParams::new(kind), options, car_length_m)
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn kind(&self) -> BrakeKind {
        self.params.kind
    }

    /// Medium of the pipe running through this car.
    pub fn family(&self) -> BrakeFamily {
        self.params.pipe_family
    }

    pub fn params(&self) -> &BrakeParams {
        &self.params
    }

    pub fn options(&self) -> &BrakeOptions {
        &self.options
    }

    pub fn car_length_m(&self) -> f32 {
        self.car_length_m
    }

    /// Effective cylinder pressure (psi, or psia on vacuum stock).
    pub fn cylinder_pressure_psi(&self) -> f32 {
        self.state.cyl_psi
    }

    pub fn cylinder_volume_m3(&self) -> f32 {
        self.state.cyl_volume_m3
    }

    /// Vacuum reservoir pressure corrected for piston displacement (psia).
    /// Atmospheric on stock without a vacuum reservoir.
    pub fn vac_res_pressure_psi(&self) -> f32 {
        match self.params.kind {
            BrakeKind::VacuumSinglePipe => vac_res_pressure_adjusted(&self.params, &self.state),
            _ => self.state.vac_res_psi,
        }
    }

    pub fn vac_res_volume_m3(&self) -> f32 {
        match self.params.kind {
            BrakeKind::VacuumSinglePipe => self.params.vac_res_volume_m3,
            _ => 0.0,
        }
    }

    pub fn num_cylinders(&self) -> u32 {
        if self.params.kind.is_pipe_only() { 0 } else { self.params.num_cylinders }
    }

    pub fn brake_pipe_volume_m3(&self) -> f32 {
        self.params.brake_pipe_volume(self.car_length_m)
    }

    /// Volumes this car adds to the train.
    pub fn contribution(&self) -> PipeContribution {
        self.model.contribute(&self.params, self.brake_pipe_volume_m3())
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Set starting pressures from the current brake pipe pressure.
    ///
    /// `max_pressure_psi` is the fully charged pipe and `full_service_psi`
    /// the pipe at full service, in the family's convention.  With
    /// `immediate_release` the cylinder starts empty whatever the pipe says.
    pub fn initialize(
        &mut self,
        handbrake_on:      bool,
        max_pressure_psi:  f32,
        full_service_psi:  f32,
        immediate_release: bool,
    ) {
        let range = self.family().range();
        let atm = self.family().atmospheric();
        let max = range.clamp(max_pressure_psi, atm);
        let full = range.clamp(full_service_psi, atm);
        self.state.line1_psi = range.clamp(self.state.line1_psi, atm);
        self.model.initialize(&self.params, &mut self.state, handbrake_on, max, full, immediate_release);
    }

    /// Advance by `dt` seconds and return the sound cues raised.
    ///
    /// A zero, negative or non-finite `dt` changes nothing.
    pub fn update(&mut self, ctx: &CarContext, dt: f32) -> Vec<BrakeSoundEvent> {
        let dt = sanitize_dt(dt);
        if dt == 0.0 {
            return Vec::new();
        }
        let ctx = CarContext { pipe_volume_m3: self.brake_pipe_volume_m3(), ..*ctx };
        self.model.update(&self.params, &self.options, &mut self.state, &ctx, dt);

        let mut events = Vec::new();
        let (cyl, pipe) = (self.state.cyl_psi, self.state.line1_psi);
        self.state.sound.sample(dt, self.options.sound_check_interval_s, cyl, pipe, &mut events);
        events
    }

    /// Move the retainer handle.  Ignored on stock without a triple valve.
    pub fn set_retainer(&mut self, setting: RetainerSetting) {
        if self.family() != BrakeFamily::Air || self.params.kind.is_pipe_only() {
            debug!("{}: no retaining valve, ignoring {setting:?}", self.params.kind);
            return;
        }
        let (threshold, rate) = retainer_limits(setting, self.params.retainer_positions, self.params.max_release_rate);
        self.state.retainer = setting;
        self.state.retainer_threshold_psi = threshold;
        self.state.release_rate_psi_per_s = rate;
    }

    pub fn snapshot(&self) -> BrakeRecord {
        BrakeRecord::from(&self.state)
    }

    pub fn restore(&mut self, record: &BrakeRecord) {
        self.state = BrakeState::from(record);
    }

    /// Equalizing reservoir pressure that gives `percent` of a full service
    /// application, interpolating between the initialization references.
    pub fn ai_set_percent(&self, percent: f32) -> f32 {
        let p = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
        let max = self.state.max_pressure_psi;
        let full = self.state.full_service_psi;
        max - (max - full) * p / 100.0
    }

    // ── Driver and crew inputs ────────────────────────────────────────────

    /// Set the handbrake to `percent`.  Cars without a handbrake stay at 0.
    pub fn set_handbrake(&mut self, percent: f32) {
        self.state.handbrake_percent = if !self.params.handbrake_present || percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
    }

    pub fn set_bleed_off(&mut self, open: bool) {
        self.state.hoses.bleed_off_valve_open = open;
    }

    pub fn set_bail_off(&mut self, bail_off: bool) {
        self.state.bail_off = bail_off;
    }

    /// Report whether the wheels are sliding; drives the dump valve.
    pub fn set_wheel_slide(&mut self, sliding: bool) {
        self.state.wheel_slide_active = sliding;
    }

    /// Wind the manual brake toward `fraction` of full application.
    pub fn set_manual_brake(&mut self, fraction: f32) {
        self.state.manual_brake_desired = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    }

    // ── Outputs ───────────────────────────────────────────────────────────

    /// Fraction of maximum brake force from the cylinder, in `[0, 1]`.
    pub fn force_fraction(&self, ctx: &CarContext) -> f32 {
        self.model.force_fraction(&self.params, &self.state, ctx)
    }

    /// Retarding force (N): the larger of the cylinder force and the
    /// handbrake force.
    pub fn brake_force_n(&self, ctx: &CarContext, max_brake_force_n: f32, max_handbrake_force_n: f32) -> f32 {
        let brake = max_brake_force_n.max(0.0) * self.force_fraction(ctx);
        let hand = max_handbrake_force_n.max(0.0) * self.state.handbrake_percent / 100.0;
        brake.max(hand)
    }

    pub fn status(&self) -> BrakeStatus {
        self.model.status(&self.params, &self.options, &self.state)
    }
}
