//! Train-wide brake pipe propagation.
//!
//! # One call
//!
//! ```text
//! ① coupling   cars not seen on the previous call start vented (applied)
//! ② scaling    volume factor = reference volume / train brake volume,
//!              capped; time constant and rates scale with it
//! ③ sub-steps  n = ceil(dt / time constant), each:
//!                snapshot every car's pipe pressure
//!                exchange across every open hose from the snapshot
//!                vent at open angle cocks and open quick-action valves,
//!                leak toward atmosphere
//!                apply all deltas at once
//!                driver's valve holds the lead pipe at its relay pressure
//! ④ lines      line 2 equalized with the main reservoirs, line 3 set on
//!              the locomotive block, line 4 carries the EP demand
//! ```
//!
//! Deltas are computed from the snapshot and each boundary moves its two
//! cars half-way toward equalization, so the result does not depend on the
//! order the cars are visited and a car between two neighbours can never be
//! pushed past either of them.
//!
//! The driver's valve is a relay: its relay pressure moves toward EQ at the
//! controller rates and the lead pipe is held at it, exhausting or feeding
//! from the main reservoir as much air as the rest of the pipe draws.  A long
//! train therefore takes longer to equalize but the lead reaches EQ at the
//! same rate whatever the train length.
//!
//! An air car in emergency keeps its quick-action valve open for a few
//! seconds and vents its own pipe at full bore, so the pressure drop that
//! tripped it trips its neighbours in turn.

use log::{info, warn};

use tb_brakes::{BrakeKind, EpDemand};
use tb_brakes::vacuum::straight_vacuum_min_psia;
use tb_core::units::atmospheric_psi_at;
use tb_core::{BrakeFamily, CarId, approach, exchange, floor_volume, sanitize_dt};

use crate::{BrakeControllerState, BrakeValveParams, Car, Train};

/// Brake system volume at which rates are taken as configured (200 ft³).
pub const REFERENCE_VOLUME_M3: f32 = 5.663;
/// Short trains change pressure at most this much faster.
pub const MAX_VOLUME_FACTOR: f32 = 2.0;
pub const MAX_SUBSTEPS: u32 = 1000;
const MIN_TIME_CONSTANT_S: f32 = 1.0e-4;

/// What one propagation call did.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PropagationReport {
    pub substeps:          u32,
    pub volume_factor:     f32,
    pub brake_pipe_intact: bool,
    /// Cars found newly coupled and vented.
    pub coupled:           usize,
}

// ── Topology ──────────────────────────────────────────────────────────────────

/// Hose and cock layout of the train, fixed for one call.
struct Topology {
    /// `joined[i]`: air flows between car `i` and car `i + 1`.
    joined:     Vec<bool>,
    front_vent: Vec<bool>,
    rear_vent:  Vec<bool>,
    intact:     bool,
}

impl Topology {
    fn of(cars: &[Car]) -> Self {
        let n = cars.len();
        let mut joined = vec![false; n.saturating_sub(1)];
        let mut front_vent = vec![false; n];
        let mut rear_vent = vec![false; n];

        for i in 0..n {
            let hoses = cars[i].brakes.state.hoses;
            let front_hose = i > 0 && hoses.front_connected;
            let rear_hose = i + 1 < n && cars[i + 1].brakes.state.hoses.front_connected;
            front_vent[i] = hoses.angle_cock_a_open && !front_hose;
            rear_vent[i] = hoses.angle_cock_b_open && !rear_hose;
            if rear_hose {
                let next = &cars[i + 1];
                // Mismatched pipes behave as a closed boundary.
                joined[i] = hoses.angle_cock_b_open
                    && next.brakes.state.hoses.angle_cock_a_open
                    && cars[i].brakes.family() == next.brakes.family();
            }
        }

        let intact = joined.iter().all(|&j| j)
            && !front_vent.iter().any(|&v| v)
            && !rear_vent.iter().any(|&v| v);
        Self { joined, front_vent, rear_vent, intact }
    }
}

// ── Train::propagate ──────────────────────────────────────────────────────────

impl Train {
    /// Move brake pipe pressure through the train for `dt` seconds and set
    /// lines 2 to 4 on every car.  A zero, negative or non-finite `dt`
    /// changes nothing.
    pub fn propagate(&mut self, dt: f32) -> PropagationReport {
        let dt = sanitize_dt(dt);
        if dt == 0.0 || self.cars.is_empty() {
            return PropagationReport { brake_pipe_intact: self.brake_pipe_intact, ..Default::default() };
        }

        let coupled = self.vent_coupled_cars();
        let family = self.family();
        let factor = volume_factor(&self.cars, family);
        let time_constant = (self.valve.propagation_time_s / factor).max(MIN_TIME_CONSTANT_S);
        let wanted = (dt / time_constant).ceil();
        let substeps = if wanted > MAX_SUBSTEPS as f32 {
            warn!("propagation wants {wanted} sub-steps for dt {dt}; capped at {MAX_SUBSTEPS}");
            MAX_SUBSTEPS
        } else {
            (wanted as u32).max(1)
        };
        let sub_dt = dt / substeps as f32;

        let topology = Topology::of(&self.cars);
        let volumes: Vec<f32> = self.cars.iter().map(|c| floor_volume(c.brakes.brake_pipe_volume_m3())).collect();
        let atm: Vec<f32> = self.cars.iter().map(|c| c.brakes.family().atmospheric()).collect();
        let mut pipe: Vec<f32> = self.cars.iter().map(|c| c.brakes.state.line1_psi).collect();
        let quick_action: Vec<Option<f32>> = self
            .cars
            .iter()
            .map(|c| (c.brakes.state.emergency_timer_s > 0.0).then_some(c.brakes.params().quick_action_rate))
            .collect();
        let mut delta = vec![0.0_f32; pipe.len()];
        let leak = self.valve.leak_rate * factor;

        for _ in 0..substeps {
            delta.fill(0.0);
            for (i, _) in topology.joined.iter().enumerate().filter(|(_, j)| **j) {
                let (a, b) = (pipe[i], pipe[i + 1]);
                let rate = (b - a).abs() / time_constant;
                let (a2, b2) = exchange(a, volumes[i], b, volumes[i + 1], rate, sub_dt);
                delta[i] += 0.5 * (a2 - a);
                delta[i + 1] += 0.5 * (b2 - b);
            }
            for (i, p) in pipe.iter().enumerate() {
                let vents = topology.front_vent[i] as u8 + topology.rear_vent[i] as u8;
                let mut open = 0.5 * f32::from(vents);
                let mut rate = (p - atm[i]).abs() / time_constant;
                if let Some(least) = quick_action[i] {
                    open += 1.0;
                    rate = rate.max(least);
                }
                // Vents together never take more than the whole gap to atmosphere.
                if open > 0.0 {
                    delta[i] += open.min(1.0) * (approach(*p, atm[i], rate, sub_dt) - p);
                }
                delta[i] += approach(*p, atm[i], leak, sub_dt) - p;
            }
            for (p, d) in pipe.iter_mut().zip(&delta) {
                *p += d;
            }

            if let Some(lead) = self.lead {
                pipe[lead] = drive_lead(
                    &self.valve,
                    self.train_brake,
                    self.equalizing_res_psi,
                    &mut self.relay_psi,
                    &mut self.cars[lead],
                    pipe[lead],
                    factor,
                    sub_dt,
                );
            }
        }

        for (car, p) in self.cars.iter_mut().zip(pipe) {
            let range = car.brakes.family().range();
            car.brakes.state.line1_psi = range.clamp(p, car.brakes.family().atmospheric());
        }

        self.brake_pipe_intact = topology.intact;
        self.equalize_main_reservoir_pipe(&topology.joined);
        self.set_engine_brake_line(dt);
        self.set_ep_line();

        PropagationReport {
            substeps,
            volume_factor: factor,
            brake_pipe_intact: topology.intact,
            coupled,
        }
    }

    /// Vent and re-initialize every car that was not in the train on the
    /// previous call.  Returns how many there were.
    pub(crate) fn vent_coupled_cars(&mut self) -> usize {
        let known = std::mem::take(&mut self.known_ids);
        let family = self.family();
        let (max, full) = (self.max_pressure_psi, self.full_service_psi);
        let mut coupled = 0;
        for car in self.cars.iter_mut().filter(|c| !known.contains(&c.id)) {
            let car_family = car.brakes.family();
            let (car_max, car_full) = if car_family == family {
                (max, full)
            } else {
                (car_family.atmospheric(), car_family.atmospheric())
            };
            let handbrake = car.brakes.state.handbrake_percent;
            car.brakes.state.line1_psi = car_family.atmospheric();
            car.brakes.initialize(false, car_max, car_full, false);
            car.brakes.set_handbrake(handbrake);
            info!("{} coupled; brake pipe vented", car.id);
            coupled += 1;
        }
        self.known_ids = self.cars.iter().map(|c| c.id).collect::<Vec<CarId>>();
        coupled
    }

    /// Equalize line 2 and the main reservoirs over the locomotive block and,
    /// behind a twin-pipe lead, every twin-pipe car joined to it.
    fn equalize_main_reservoir_pipe(&mut self, joined: &[bool]) {
        let (Some(lead), Some((first, last))) = (self.lead, self.lead_block()) else {
            return;
        };
        let twin = |car: &Car| car.brakes.kind().is_twin_pipe();
        let extend = twin(&self.cars[lead]);
        let (mut lo, mut hi) = (first, last);
        while extend && lo > 0 && joined[lo - 1] && twin(&self.cars[lo - 1]) {
            lo -= 1;
        }
        while extend && hi + 1 < self.cars.len() && joined[hi] && twin(&self.cars[hi + 1]) {
            hi += 1;
        }

        let mr_volume = floor_volume(self.valve.main_res_volume_m3);
        let (mut volume, mut mass) = (0.0_f32, 0.0_f32);
        for car in &self.cars[lo..=hi] {
            if car.is_locomotive() {
                volume += mr_volume;
                mass += car.main_res_psi * mr_volume;
            }
            if twin(car) {
                let v = floor_volume(car.brakes.brake_pipe_volume_m3());
                volume += v;
                mass += car.brakes.state.line2_psi * v;
            }
        }
        if volume <= 0.0 {
            return;
        }
        let mean = BrakeFamily::Air.range().clamp(mass / volume, 0.0);
        for car in &mut self.cars[lo..=hi] {
            if car.is_locomotive() {
                car.main_res_psi = mean;
            }
            if car.is_locomotive() || twin(&*car) {
                car.brakes.state.line2_psi = mean;
            }
        }
    }

    fn set_engine_brake_line(&mut self, dt: f32) {
        let v = &self.valve;
        let psi = self.engine_brake_psi;
        self.engine_brake_psi = match self.engine_brake {
            BrakeControllerState::StraightApply     => approach(psi, v.engine_max_psi, v.engine_apply_rate, dt),
            BrakeControllerState::StraightRelease   => approach(psi, 0.0, v.engine_release_rate, dt),
            BrakeControllerState::StraightEmergency => approach(psi, v.engine_max_psi, 2.0 * v.engine_apply_rate, dt),
            _ => psi,
        };
        let block = self.lead_block();
        for (i, car) in self.cars.iter_mut().enumerate() {
            let in_block = block.is_some_and(|(first, last)| (first..=last).contains(&i));
            car.brakes.state.line3_psi = if in_block { self.engine_brake_psi } else { 0.0 };
        }
    }

    fn set_ep_line(&mut self) {
        let ep_lead = self.lead.is_some_and(|i| self.cars[i].brakes.kind().is_electric());
        let line4 = match self.ep_demand {
            Some(d) if ep_lead => EpDemand::demand(d),
            _ => EpDemand::Inactive,
        };
        for car in &mut self.cars {
            car.brakes.state.line4 = line4;
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// `reference volume / train brake volume`, capped at [`MAX_VOLUME_FACTOR`].
/// Only cars on the train's pipe family count.
pub fn volume_factor(cars: &[Car], family: BrakeFamily) -> f32 {
    let total: f32 = cars
        .iter()
        .map(|c| c.brakes.contribution())
        .filter(|c| c.family == family)
        .map(|c| c.total_volume_m3())
        .sum();
    if total > 0.0 { (REFERENCE_VOLUME_M3 / total).min(MAX_VOLUME_FACTOR) } else { MAX_VOLUME_FACTOR }
}

/// Which way the driver's valve may move the lead pipe toward its relay.
#[derive(Copy, Clone, PartialEq, Eq)]
enum Feed {
    Both,
    /// Only raise the pipe: charge (air) or admit air (vacuum).
    Up,
    /// Only lower the pipe: exhaust (air) or evacuate (vacuum).
    Down,
    /// Relay follows the pipe; the pipe is left alone.
    Lapped,
}

/// One sub-step of the driver's brake valve.  Moves `relay` toward the
/// controller's target and returns the lead pipe pressure held at it; air
/// for an increase comes from the lead's main reservoir.
#[allow(clippy::too_many_arguments)]
fn drive_lead(
    valve:  &BrakeValveParams,
    state:  BrakeControllerState,
    eq:     f32,
    relay:  &mut f32,
    lead:   &mut Car,
    pipe:   f32,
    factor: f32,
    dt:     f32,
) -> f32 {
    use BrakeControllerState as S;

    let family = lead.brakes.family();
    let service = valve.service_rate * factor;
    let r = *relay;
    let (target, rate, feed) = match family {
        BrakeFamily::Air => match state {
            S::Release | S::Running | S::BrakeNotch => {
                let rate = if r < eq { valve.charging_rate * factor } else { service };
                (eq, rate, Feed::Both)
            }
            S::Apply if r > eq => (eq, service, Feed::Down),
            S::Apply => (r, 0.0, Feed::Down),
            S::FullQuickRelease => (eq, valve.quick_release_rate * factor, Feed::Up),
            S::Overcharge => (eq + valve.overcharge_psi, valve.quick_release_rate * factor, Feed::Up),
            S::Emergency => (0.0, valve.emergency_rate, Feed::Down),
            _ => (pipe, 0.0, Feed::Lapped),
        },

        BrakeFamily::Vacuum if lead.brakes.kind() == BrakeKind::StraightVacuumSinglePipe => match state {
            S::Release | S::Running => (atmospheric_psi_at(lead.elevation_m), service, Feed::Up),
            S::Apply if r > eq => (eq, valve.exhauster_rate * factor, Feed::Down),
            S::Apply => (r, 0.0, Feed::Down),
            S::Emergency => {
                let min = straight_vacuum_min_psia(lead.brakes.params(), lead.elevation_m);
                (min, valve.emergency_rate, Feed::Down)
            }
            _ => (pipe, 0.0, Feed::Lapped),
        },

        BrakeFamily::Vacuum => {
            let atm = atmospheric_psi_at(lead.elevation_m);
            match state {
                S::Release | S::Running | S::BrakeNotch | S::VacContServ => {
                    let rate = if r > eq { valve.exhauster_rate * factor } else { service };
                    (eq, rate, Feed::Both)
                }
                S::FullQuickRelease if r > eq => (eq, valve.ejector_rate * factor, Feed::Down),
                S::FullQuickRelease => (r, 0.0, Feed::Down),
                S::Apply if r < eq => (eq, service, Feed::Up),
                S::Apply => (r, 0.0, Feed::Up),
                S::VacApplyContServ => (atm, service, Feed::Up),
                S::Emergency => (atm, valve.emergency_rate, Feed::Up),
                _ => (pipe, 0.0, Feed::Lapped),
            }
        }
    };

    if feed == Feed::Lapped {
        *relay = pipe;
        return pipe;
    }
    *relay = family.range().clamp(approach(r, target, rate, dt), r);
    let raise = matches!(feed, Feed::Both | Feed::Up) && pipe < *relay;
    let lower = matches!(feed, Feed::Both | Feed::Down) && pipe > *relay;
    match family {
        BrakeFamily::Air if raise => charge_from_main_reservoir(valve, lead, pipe, *relay, dt),
        _ if raise || lower => *relay,
        _ => pipe,
    }
}

/// Charge the lead pipe toward `target` from the lead's main reservoir,
/// never above the reservoir itself.
fn charge_from_main_reservoir(valve: &BrakeValveParams, lead: &mut Car, pipe: f32, target: f32, dt: f32) -> f32 {
    let target = target.min(lead.main_res_psi);
    if pipe >= target {
        return pipe;
    }
    let (pipe, mr) = exchange(
        pipe,
        lead.brakes.brake_pipe_volume_m3(),
        lead.main_res_psi,
        valve.main_res_volume_m3,
        (target - pipe) / dt,
        dt,
    );
    lead.main_res_psi = mr;
    pipe
}
