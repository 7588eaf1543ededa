//! consist: headless brake test of a single train.
//!
//! Builds a locomotive and `--cars` wagons of one brake kind, then runs the
//! classic standing test: release and charge, full service, emergency, and
//! release again.  A table of pipe and cylinder pressures is printed after
//! each phase; with `--output` every tick is also written as CSV.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;

use tb_brakes::{BrakeKind, BrakeSoundEvent, BrakeSystem};
use tb_core::{BrakeOptions, CarId, PressureUnit, RetainerPercent, Tick};
use tb_output::{CsvWriter, TrainOutputObserver};
use tb_train::{BrakeControllerState, Car, TickReport, Train, TrainBuilder, TrainObserver};

// ── Constants ─────────────────────────────────────────────────────────────────

const LOCO_LENGTH_M:      f32 = 20.0;
const WAGON_LENGTH_M:     f32 = 15.0;
const LOCO_BRAKE_N:       f32 = 120_000.0;
const LOCO_HANDBRAKE_N:   f32 = 25_000.0;
const WAGON_BRAKE_N:      f32 = 80_000.0;
const WAGON_HANDBRAKE_N:  f32 = 20_000.0;
const SNAPSHOT_EVERY:     u64 = 10;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "consist")]
#[command(about = "Standing brake test of a locomotive and a rake of wagons")]
struct Cli {
    /// Number of wagons behind the locomotive
    #[arg(long, default_value = "20")]
    cars: usize,

    /// Ticks per phase of the test
    #[arg(long, default_value = "600")]
    ticks: u64,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.1")]
    delta: f32,

    /// Brake system of every vehicle, e.g. air_single_pipe, ep, vacuum_single_pipe
    #[arg(long, default_value = "air_single_pipe")]
    kind: String,

    /// Unit for printed pressures: psi, bar, kpa or inhg
    #[arg(long, default_value = "psi")]
    unit: String,

    /// Share of cars, from the rear, whose retainers the crew may set: 25, 50 or 100
    #[arg(long, default_value = "100")]
    retainers: u32,

    /// Directory for car_pressures.csv and train_summaries.csv
    #[arg(long)]
    output: Option<PathBuf>,
}

// ── Observer wrapper ──────────────────────────────────────────────────────────

/// Counts sound cues and forwards to the CSV observer without closing it at
/// the end of each phase.
struct PhaseObserver {
    csv:    Option<TrainOutputObserver<CsvWriter>>,
    sounds: usize,
}

impl TrainObserver for PhaseObserver {
    fn on_sound_event(&mut self, _tick: Tick, _car: CarId, _event: BrakeSoundEvent) {
        self.sounds += 1;
    }

    fn on_tick_end(&mut self, report: &TickReport) {
        if let Some(csv) = &mut self.csv {
            csv.on_tick_end(report);
        }
    }

    fn on_snapshot(&mut self, tick: Tick, train: &Train) {
        if let Some(csv) = &mut self.csv {
            csv.on_snapshot(tick, train);
        }
    }
}

// ── Script ────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone)]
enum Phase {
    Release,
    Service,
    Emergency,
    Recharge,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::Release   => "release",
            Phase::Service   => "service",
            Phase::Emergency => "emergency",
            Phase::Recharge  => "recharge",
        }
    }

    fn apply(self, train: &mut Train) {
        match self {
            Phase::Release | Phase::Recharge => {
                train.set_equalizing_reservoir(train.max_pressure_psi);
                train.set_train_brake(BrakeControllerState::Release);
            }
            Phase::Service => {
                let straight = train
                    .lead
                    .is_some_and(|i| train.cars[i].brakes.kind() == BrakeKind::StraightVacuumSinglePipe);
                if straight {
                    train.set_equalizing_reservoir(train.max_pressure_psi);
                    train.set_train_brake(BrakeControllerState::Apply);
                } else {
                    train.ai_set_percent(100.0);
                }
            }
            Phase::Emergency => train.set_train_brake(BrakeControllerState::Emergency),
        }
    }
}

fn build_train(kind: BrakeKind, wagons: usize, options: &BrakeOptions) -> Result<Train> {
    let loco = Car::locomotive(BrakeSystem::with_kind(kind, options.clone(), LOCO_LENGTH_M))
        .with_forces(LOCO_BRAKE_N, LOCO_HANDBRAKE_N);
    let wagon = Car::wagon(BrakeSystem::with_kind(kind, options.clone(), WAGON_LENGTH_M))
        .with_forces(WAGON_BRAKE_N, WAGON_HANDBRAKE_N);
    let train = TrainBuilder::new(options.clone())
        .car(loco)
        .cars(std::iter::repeat_n(wagon, wagons))
        .snapshot_interval(SNAPSHOT_EVERY)
        .build()?;
    Ok(train)
}

fn print_row(phase: &str, train: &Train, options: &BrakeOptions) {
    let family = train.family();
    let fmt = |psi: f32| options.pressure_unit.format(family, psi);
    let front = &train.cars[0].brakes.state;
    let rear = &train.cars[train.cars.len() - 1].brakes.state;
    println!(
        "{:<10} {:>8.1} {:>14} {:>14} {:>14} {:>10.1} {:<6}",
        phase,
        train.clock.elapsed_secs,
        fmt(front.line1_psi),
        fmt(rear.line1_psi),
        fmt(rear.cyl_psi),
        train.total_brake_force_n() / 1_000.0,
        if train.brake_pipe_intact { "yes" } else { "no" },
    );
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if !(cli.delta.is_finite() && cli.delta > 0.0) {
        bail!("--delta must be a positive number of seconds, got {}", cli.delta);
    }
    let kind = BrakeKind::from_name(&cli.kind)?;
    let options = BrakeOptions {
        pressure_unit:    PressureUnit::from_name(&cli.unit)?,
        retainer_percent: RetainerPercent::from_percent(cli.retainers)?,
        ..BrakeOptions::default()
    };
    let mut train = build_train(kind, cli.cars, &options)?;
    info!("built {} with {} wagons, {} ticks of {} s per phase", kind, cli.cars, cli.ticks, cli.delta);

    let csv = match &cli.output {
        Some(dir) => {
            std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
            Some(TrainOutputObserver::new(CsvWriter::new(Path::new(dir))?))
        }
        None => None,
    };
    let mut obs = PhaseObserver { csv, sounds: 0 };

    println!("{:<10} {:>8} {:>14} {:>14} {:>14} {:>10} {:<6}", "Phase", "Time s", "Lead pipe", "Rear pipe", "Rear cyl", "Force kN", "Intact");
    println!("{}", "-".repeat(84));
    print_row("start", &train, &options);

    let t0 = Instant::now();
    for phase in [Phase::Release, Phase::Service, Phase::Emergency, Phase::Recharge] {
        phase.apply(&mut train);
        train.run_ticks(cli.ticks, cli.delta, &mut obs);
        print_row(phase.label(), &train, &options);
    }
    let elapsed = t0.elapsed();

    println!();
    println!("Rear car:");
    for (key, value) in train.cars[train.cars.len() - 1].brakes.status().iter() {
        println!("  {key:<10} {value}");
    }
    println!();
    println!("{} ticks in {:.3} s, {} sound cues", train.clock.current_tick.0, elapsed.as_secs_f64(), obs.sounds);

    if let Some(mut csv) = obs.csv.take() {
        csv.on_run_end(train.clock.current_tick);
        if let Some(e) = csv.take_error() {
            bail!("output error: {e}");
        }
        if let Some(dir) = &cli.output {
            println!("CSV written to {}", dir.display());
        }
    }
    Ok(())
}
