//! Fluent builder for constructing a [`Train`].

use tb_core::units::psia_from_vacuum_inhg;
use tb_core::{BrakeFamily, BrakeOptions, CarId, SimClock};

use crate::{BrakeControllerState, BrakeValveParams, Car, Train, TrainError, TrainResult};

/// Vacuum held by a released automatic vacuum train (inHg).
pub const VACUUM_RELEASED_INHG: f32 = 21.0;
/// Air brake pipe pressure of a released train (psi).
pub const AIR_RELEASED_PSI: f32 = 90.0;
/// Air brake pipe pressure at full service (psi).
pub const AIR_FULL_SERVICE_PSI: f32 = 64.0;

/// Fluent builder for [`Train`].
///
/// # Optional inputs (have defaults)
///
/// | Method                   | Default                                      |
/// |--------------------------|----------------------------------------------|
/// | `.lead(i)`               | First locomotive, or none                    |
/// | `.valve_params(p)`       | `BrakeValveParams::default()`                |
/// | `.pressures(max, full)`  | Air 90/64 psi; vacuum 21/0 inHg as psia      |
/// | `.snapshot_interval(n)`  | 0 (no snapshots)                             |
///
/// # Example
///
/// ```rust,ignore
/// let options = BrakeOptions::default();
/// let loco = Car::locomotive(BrakeSystem::with_kind(BrakeKind::AirSinglePipe, options.clone(), 20.0));
/// let wagon = Car::wagon(BrakeSystem::with_kind(BrakeKind::AirSinglePipe, options.clone(), 15.0));
/// let mut train = TrainBuilder::new(options)
///     .car(loco)
///     .cars(std::iter::repeat_n(wagon, 10))
///     .build()?;
/// train.run_ticks(100, 0.1, &mut NoopObserver);
/// ```
pub struct TrainBuilder {
    options:           BrakeOptions,
    cars:              Vec<Car>,
    lead:              Option<usize>,
    valve:             Option<BrakeValveParams>,
    pressures:         Option<(f32, f32)>,
    snapshot_interval: u64,
}

impl TrainBuilder {
    pub fn new(options: BrakeOptions) -> Self {
        Self {
            options,
            cars:              Vec::new(),
            lead:              None,
            valve:             None,
            pressures:         None,
            snapshot_interval: 0,
        }
    }

    /// Append one car at the rear.
    pub fn car(mut self, car: Car) -> Self {
        self.cars.push(car);
        self
    }

    /// Append cars at the rear, front first.
    pub fn cars(mut self, cars: impl IntoIterator<Item = Car>) -> Self {
        self.cars.extend(cars);
        self
    }

    /// Choose the controlling car by index.  It must be a locomotive.
    pub fn lead(mut self, index: usize) -> Self {
        self.lead = Some(index);
        self
    }

    pub fn valve_params(mut self, valve: BrakeValveParams) -> Self {
        self.valve = Some(valve);
        self
    }

    /// Released and full service pipe pressures, in the train's family
    /// convention (psi for air, psia for vacuum).
    pub fn pressures(mut self, max_pressure_psi: f32, full_service_psi: f32) -> Self {
        self.pressures = Some((max_pressure_psi, full_service_psi));
        self
    }

    pub fn snapshot_interval(mut self, ticks: u64) -> Self {
        self.snapshot_interval = ticks;
        self
    }

    /// Validate inputs, number the cars, connect the hoses and charge the
    /// train to its released state.
    pub fn build(self) -> TrainResult<Train> {
        let len = self.cars.len();
        if len == 0 {
            return Err(TrainError::EmptyTrain);
        }

        // ── Validate and resolve optional inputs ──────────────────────────
        let lead = match self.lead {
            Some(i) if i >= len => return Err(TrainError::LeadOutOfRange { index: i, len }),
            Some(i) if !self.cars[i].is_locomotive() => return Err(TrainError::NotALocomotive(i)),
            Some(i) => Some(i),
            None => self.cars.iter().position(Car::is_locomotive),
        };
        let valve = self.valve.unwrap_or_default();

        let mut cars = self.cars;
        for (i, car) in cars.iter_mut().enumerate() {
            car.id = CarId(i as u32);
            if car.is_locomotive() {
                car.main_res_psi = valve.main_res_max_psi;
            }
        }

        let family = lead.map(|i| cars[i].brakes.family()).unwrap_or(cars[0].brakes.family());
        let (max, full) = self.pressures.unwrap_or(match family {
            BrakeFamily::Air    => (AIR_RELEASED_PSI, AIR_FULL_SERVICE_PSI),
            BrakeFamily::Vacuum => (psia_from_vacuum_inhg(VACUUM_RELEASED_INHG), psia_from_vacuum_inhg(0.0)),
        });

        let mut train = Train {
            known_ids:               cars.iter().map(|c| c.id).collect(),
            next_id:                 len as u32,
            cars,
            clock:                   SimClock::new(),
            options:                 self.options,
            valve,
            lead,
            equalizing_res_psi:      max,
            relay_psi:               max,
            train_brake:             BrakeControllerState::Running,
            engine_brake:            BrakeControllerState::StraightRelease,
            engine_brake_psi:        0.0,
            ep_demand:               None,
            brake_pipe_intact:       true,
            snapshot_interval_ticks: self.snapshot_interval,
            max_pressure_psi:        max,
            full_service_psi:        full,
        };
        train.connect_brake_hoses();
        train.initialize_brakes(max, full, true);
        Ok(train)
    }
}
