//! The `Train` struct and its tick loop.

use log::{debug, info};

use tb_brakes::{BrakeKind, BrakeSoundEvent, RetainerSetting};
use tb_core::{BrakeFamily, BrakeOptions, CarId, CoreError, SimClock, Tick, approach, sanitize_dt};

use crate::{
    BrakeControllerState, BrakeValveParams, Car, NoopObserver, PropagationReport, TrainError,
    TrainObserver, TrainRecord, TrainResult,
};

/// What one tick did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// The tick that was processed.
    pub tick:                Tick,
    pub propagation:         PropagationReport,
    /// Sound cues raised by the cars, in car order.
    pub sound_events:        Vec<(CarId, BrakeSoundEvent)>,
    pub total_brake_force_n: f32,
}

// ── Train ─────────────────────────────────────────────────────────────────────

/// A coupled consist and the driver's controls acting on it.
///
/// `Train` owns its cars front to rear and drives the per-tick sequence:
///
/// 1. **Propagation**: the driver's valve acts on the lead car's pipe and
///    pressure moves along the train (see [`Train::propagate`]).
/// 2. **Cars**: every car's brake system runs its own valves against the
///    line pressures it was handed.
/// 3. **Compressors**: locomotive main reservoirs recharge.
///
/// Create via [`TrainBuilder`][crate::TrainBuilder].
#[derive(Clone, Debug)]
pub struct Train {
    /// Cars, front to rear.  Position is the index here.
    pub cars:  Vec<Car>,
    pub clock: SimClock,

    pub options: BrakeOptions,
    pub valve:   BrakeValveParams,
    /// Index of the car whose brake valve controls the train.  `None` for a
    /// cut of cars with no locomotive; its pipe is then only vented or held.
    pub lead:    Option<usize>,

    /// Equalizing reservoir (psi, or psia on vacuum trains).
    pub equalizing_res_psi: f32,
    /// Pressure the driver's valve holds the lead pipe at; follows EQ at the
    /// controller rates.
    pub relay_psi:          f32,
    pub train_brake:        BrakeControllerState,
    pub engine_brake:       BrakeControllerState,
    /// Engine brake pressure delivered on line 3 (psi).
    pub engine_brake_psi:   f32,
    /// EP demand in `[0, 1]`, `None` with the EP circuit off.
    pub ep_demand:          Option<f32>,

    /// Whether the pipe ran end to end without an open vent after the last
    /// propagation.
    pub brake_pipe_intact: bool,

    /// Snapshot interval for [`Train::run_ticks`]; 0 disables snapshots.
    pub snapshot_interval_ticks: u64,

    /// Fully charged pipe pressure in the train's family convention.
    pub max_pressure_psi: f32,
    /// Pipe pressure at full service.
    pub full_service_psi: f32,

    /// Car IDs seen by the previous propagation; new ones were just coupled.
    pub(crate) known_ids: Vec<CarId>,
    pub(crate) next_id:   u32,
}

impl Train {
    // ── Queries ───────────────────────────────────────────────────────────

    /// Pipe family of the train: the lead's, else the front car's.
    pub fn family(&self) -> BrakeFamily {
        self.lead
            .or(if self.cars.is_empty() { None } else { Some(0) })
            .map(|i| self.cars[i].brakes.family())
            .unwrap_or_default()
    }

    /// Contiguous run of locomotives containing the lead, as `(first, last)`.
    pub fn lead_block(&self) -> Option<(usize, usize)> {
        let lead = self.lead?;
        let mut first = lead;
        while first > 0 && self.cars[first - 1].is_locomotive() {
            first -= 1;
        }
        let mut last = lead;
        while last + 1 < self.cars.len() && self.cars[last + 1].is_locomotive() {
            last += 1;
        }
        Some((first, last))
    }

    pub fn index_of(&self, id: CarId) -> Option<usize> {
        self.cars.iter().position(|c| c.id == id)
    }

    pub fn car(&self, id: CarId) -> TrainResult<&Car> {
        self.cars.iter().find(|c| c.id == id).ok_or(CoreError::CarNotFound(id).into())
    }

    pub fn car_mut(&mut self, id: CarId) -> TrainResult<&mut Car> {
        self.cars.iter_mut().find(|c| c.id == id).ok_or(CoreError::CarNotFound(id).into())
    }

    /// Sum of the cars' current retarding forces (N).
    pub fn total_brake_force_n(&self) -> f32 {
        self.cars.iter().map(Car::brake_force_n).sum()
    }

    // ── Driver controls ───────────────────────────────────────────────────

    pub fn set_train_brake(&mut self, state: BrakeControllerState) {
        if state != self.train_brake {
            debug!("train brake {} -> {}", self.train_brake, state);
        }
        self.train_brake = state;
    }

    pub fn set_engine_brake(&mut self, state: BrakeControllerState) {
        self.engine_brake = state;
    }

    /// Command EP demand; `None` de-energises the EP circuit.
    pub fn set_ep_demand(&mut self, demand: Option<f32>) {
        self.ep_demand = demand.map(|d| if d.is_nan() { 0.0 } else { d.clamp(0.0, 1.0) });
    }

    /// Set the equalizing reservoir, clamped to the family range.  `NaN` is
    /// ignored.
    pub fn set_equalizing_reservoir(&mut self, psi: f32) {
        let range = self.family().range();
        self.equalizing_res_psi = range.clamp(psi, self.equalizing_res_psi);
    }

    /// Ask for `percent` of a full service application, the way an AI driver
    /// does: set EQ from the lead's references and self-lap on it.
    pub fn ai_set_percent(&mut self, percent: f32) {
        let Some(lead) = self.lead else {
            return;
        };
        let eq = self.cars[lead].brakes.ai_set_percent(percent);
        self.set_equalizing_reservoir(eq);
        self.train_brake = BrakeControllerState::Running;
    }

    // ── Crew controls ─────────────────────────────────────────────────────

    /// Set retainers from the rear: the share of cars chosen by
    /// `options.retainer_percent` gets `setting`, the rest `Exhaust`.
    pub fn set_retainer(&mut self, setting: RetainerSetting) {
        let share = self.options.retainer_percent;
        let len = self.cars.len();
        for (i, car) in self.cars.iter_mut().enumerate() {
            let from_rear = len - 1 - i;
            let s = if share.applies_to(from_rear) { setting } else { RetainerSetting::Exhaust };
            car.brakes.set_retainer(s);
        }
    }

    pub fn set_handbrake(&mut self, id: CarId, percent: f32) -> TrainResult<()> {
        self.car_mut(id)?.brakes.set_handbrake(percent);
        Ok(())
    }

    /// Set every car's handbrake.
    pub fn set_handbrakes(&mut self, percent: f32) {
        for car in &mut self.cars {
            car.brakes.set_handbrake(percent);
        }
    }

    // ── Hoses and coupling ────────────────────────────────────────────────

    /// Connect every hose inside the train and open the cocks behind them.
    /// The cocks at both ends are closed.
    pub fn connect_brake_hoses(&mut self) {
        let len = self.cars.len();
        for (i, car) in self.cars.iter_mut().enumerate() {
            let hoses = &mut car.brakes.state.hoses;
            hoses.front_connected = i > 0;
            hoses.angle_cock_a_open = i > 0;
            hoses.angle_cock_b_open = i + 1 < len;
        }
    }

    /// Couple `car` to the rear and connect its hose.  Its pipe is vented on
    /// the next propagation.  Returns the ID it was given.
    pub fn couple(&mut self, mut car: Car) -> CarId {
        let id = CarId(self.next_id);
        self.next_id += 1;
        car.id = id;

        if let Some(last) = self.cars.last_mut() {
            last.brakes.state.hoses.angle_cock_b_open = true;
            car.brakes.state.hoses.front_connected = true;
            car.brakes.state.hoses.angle_cock_a_open = true;
        } else {
            car.brakes.state.hoses.front_connected = false;
            car.brakes.state.hoses.angle_cock_a_open = false;
        }
        car.brakes.state.hoses.angle_cock_b_open = false;
        if car.is_locomotive() {
            car.main_res_psi = self.valve.main_res_max_psi;
        }

        info!("coupling {} ({}) at position {}", id, car.brakes.kind(), self.cars.len());
        self.cars.push(car);
        id
    }

    /// Split the train in front of index `at` and return the cars behind.
    ///
    /// The detached cars keep their cock positions, so the pipe of both
    /// parts vents at the open hose.
    pub fn uncouple(&mut self, at: usize) -> TrainResult<Vec<Car>> {
        let len = self.cars.len();
        if at == 0 || at >= len {
            return Err(TrainError::BadUncouple { at, len });
        }
        if let Some(lead) = self.lead.filter(|&lead| lead >= at) {
            return Err(TrainError::LeadDetached { at, lead });
        }
        let mut detached = self.cars.split_off(at);
        detached[0].brakes.state.hoses.front_connected = false;
        info!("uncoupled {} cars at position {at}", detached.len());
        Ok(detached)
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Charge (or vent) every pipe to its released value and initialize each
    /// car from it.  Handbrakes are kept; EQ is set to `max_pressure_psi`.
    pub fn initialize_brakes(&mut self, max_pressure_psi: f32, full_service_psi: f32, immediate_release: bool) {
        let family = self.family();
        let straight = self.lead.is_some_and(|i| self.cars[i].brakes.kind() == BrakeKind::StraightVacuumSinglePipe);
        let released = if straight { family.atmospheric() } else { max_pressure_psi };
        self.max_pressure_psi = max_pressure_psi;
        self.full_service_psi = full_service_psi;

        for car in &mut self.cars {
            let car_family = car.brakes.family();
            let handbrake = car.brakes.state.handbrake_percent;
            if car_family == family {
                car.brakes.state.line1_psi = released;
                car.brakes.initialize(false, max_pressure_psi, full_service_psi, immediate_release);
            } else {
                let atm = car_family.atmospheric();
                car.brakes.state.line1_psi = atm;
                car.brakes.initialize(false, atm, atm, immediate_release);
            }
            car.brakes.set_handbrake(handbrake);
        }
        self.equalizing_res_psi = family.range().clamp(max_pressure_psi, family.atmospheric());
        self.relay_psi = family.range().clamp(released, family.atmospheric());
    }

    /// Advance the train by one tick of `dt` seconds.
    ///
    /// A zero, negative or non-finite `dt` changes nothing and does not
    /// advance the clock.
    pub fn update(&mut self, dt: f32) -> TickReport {
        self.step(dt, &mut NoopObserver)
    }

    /// Run `n` ticks of `dt` seconds, calling observer hooks at every tick
    /// boundary.
    pub fn run_ticks<O: TrainObserver>(&mut self, n: u64, dt: f32, observer: &mut O) {
        for _ in 0..n {
            let now = self.clock.current_tick;
            observer.on_tick_start(now);
            let report = self.step(dt, observer);
            observer.on_tick_end(&report);
            if self.snapshot_interval_ticks > 0 && now.0.is_multiple_of(self.snapshot_interval_ticks) {
                observer.on_snapshot(now, self);
            }
        }
        observer.on_run_end(self.clock.current_tick);
    }

    fn step<O: TrainObserver>(&mut self, dt: f32, observer: &mut O) -> TickReport {
        let now = self.clock.current_tick;
        let dt = sanitize_dt(dt);
        if dt == 0.0 {
            return TickReport {
                tick: now,
                propagation: PropagationReport { brake_pipe_intact: self.brake_pipe_intact, ..Default::default() },
                sound_events: Vec::new(),
                total_brake_force_n: self.total_brake_force_n(),
            };
        }

        let propagation = self.propagate(dt);

        let mut sound_events = Vec::new();
        for car in &mut self.cars {
            let ctx = car.context();
            for event in car.brakes.update(&ctx, dt) {
                observer.on_sound_event(now, car.id, event);
                sound_events.push((car.id, event));
            }
        }

        let (max, rate) = (self.valve.main_res_max_psi, self.valve.compressor_rate);
        for car in self.cars.iter_mut().filter(|c| c.is_locomotive()) {
            car.main_res_psi = approach(car.main_res_psi, max, rate, dt);
        }

        self.clock.advance(dt);
        TickReport {
            tick: now,
            propagation,
            sound_events,
            total_brake_force_n: self.total_brake_force_n(),
        }
    }

    // ── Save and restore ──────────────────────────────────────────────────

    pub fn snapshot(&self) -> TrainRecord {
        TrainRecord::from(self)
    }

    /// Restore dynamic state from `record`.  The train must have the same
    /// number of cars as when the record was taken.
    pub fn restore(&mut self, record: &TrainRecord) -> TrainResult<()> {
        let len = self.cars.len();
        for (got, what) in [
            (record.car_ids.len(), "car ids"),
            (record.brakes.len(), "brake records"),
            (record.main_res_psi.len(), "main reservoirs"),
        ] {
            if got != len {
                return Err(TrainError::CarCountMismatch { expected: len, got, what });
            }
        }
        if let Some(lead) = record.lead.filter(|&lead| lead >= len) {
            return Err(TrainError::LeadOutOfRange { index: lead, len });
        }

        self.clock = SimClock { current_tick: record.tick, elapsed_secs: record.elapsed_secs };
        self.lead = record.lead;
        self.equalizing_res_psi = record.equalizing_res_psi;
        self.relay_psi = record.relay_psi;
        self.train_brake = record.train_brake;
        self.engine_brake = record.engine_brake;
        self.engine_brake_psi = record.engine_brake_psi;
        self.ep_demand = record.ep_demand;
        self.brake_pipe_intact = record.brake_pipe_intact;
        self.max_pressure_psi = record.max_pressure_psi;
        self.full_service_psi = record.full_service_psi;

        for (i, car) in self.cars.iter_mut().enumerate() {
            car.id = record.car_ids[i];
            car.brakes.restore(&record.brakes[i]);
            car.main_res_psi = record.main_res_psi[i];
        }
        self.known_ids = record.car_ids.clone();
        self.next_id = record.car_ids.iter().filter(|id| **id != CarId::INVALID).map(|id| id.0 + 1).max().unwrap_or(0);
        Ok(())
    }
}
