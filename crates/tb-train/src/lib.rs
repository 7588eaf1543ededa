//! `tb-train`: train-wide brake orchestration.
//!
//! # Tick loop
//!
//! ```text
//! for each Train::update(dt):
//!   ① Couple    : cars not seen before start with a vented pipe.
//!   ② Propagate : the driver's valve acts on the lead pipe; pressure
//!                  moves car to car in sub-steps; lines 2, 3 and 4 set.
//!   ③ Cars      : each BrakeSystem::update runs its own valves and
//!                  raises sound cues.
//!   ④ Compress  : locomotive main reservoirs recharge.
//! ```
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                   |
//! |---------|----------------------------------------------------------|
//! | `serde` | `Serialize`/`Deserialize` on controls, params and record |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use tb_brakes::{BrakeKind, BrakeSystem};
//! use tb_core::BrakeOptions;
//! use tb_train::{BrakeControllerState, Car, NoopObserver, TrainBuilder};
//!
//! let options = BrakeOptions::default();
//! let brakes = |kind| BrakeSystem::with_kind(kind, options.clone(), 15.0);
//! let mut train = TrainBuilder::new(options.clone())
//!     .car(Car::locomotive(brakes(BrakeKind::AirSinglePipe)))
//!     .car(Car::wagon(brakes(BrakeKind::AirSinglePipe)))
//!     .build()?;
//! train.set_equalizing_reservoir(75.0);
//! train.run_ticks(300, 0.1, &mut NoopObserver);
//! ```

pub mod builder;
pub mod car;
pub mod controller;
pub mod error;
pub mod observer;
pub mod propagate;
pub mod record;
pub mod train;


pub use builder::TrainBuilder;
pub use car::{Car, CarRole};
pub use controller::{BrakeControllerState, BrakeValveParams};
pub use error::{TrainError, TrainResult};
pub use observer::{NoopObserver, TrainObserver};
pub use propagate::PropagationReport;
pub use record::TrainRecord;
pub use train::{TickReport, Train};
