//! `tb-brakes`: per-car brake systems.
//!
//! # Variants
//!
//! | Kind                       | Strategy        | Cylinder source                           |
//! |----------------------------|-----------------|-------------------------------------------|
//! | `AirSinglePipe`            | `AirBrake`      | aux reservoir via triple valve/distributor|
//! | `AirTwinPipe`              | `AirBrake`      | as above, aux also charged from line 2    |
//! | `Ep`                       | `AirBrake`      | aux reservoir, demand on line 4           |
//! | `Sme`                      | `AirBrake`      | line 2, demand on line 4                  |
//! | `VacuumSinglePipe`         | `VacuumBrake`   | train pipe against vacuum reservoir       |
//! | `StraightVacuumSinglePipe` | `VacuumBrake`   | evacuated directly through the pipe       |
//! | `AirPiped` / `VacuumPiped` | `TransferPipe`  | none                                      |
//! | `ManualBraking`            | `TransferPipe`  | hand-wound brake                          |
//!
//! A [`BrakeSystem`] pairs [`BrakeParams`] and [`BrakeState`] with the
//! [`BrakeModel`] selected from its [`BrakeKind`].  Line pressures are
//! written by the train (see `tb-train`); [`BrakeSystem::update`] then runs
//! the car's own valves.
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                   |
//! |---------|----------------------------------------------------------|
//! | `serde` | `Serialize`/`Deserialize` on params, state enums, record |

pub mod air;
pub mod error;
pub mod kind;
pub mod model;
pub mod params;
pub mod reader;
pub mod record;
pub mod sound;
pub mod state;
pub mod status;
pub mod system;
pub mod transfer;
pub mod vacuum;
pub mod valve;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use air::AirBrake;
pub use error::{BrakeError, BrakeResult};
pub use kind::BrakeKind;
pub use model::{BrakeModel, CarContext, PipeContribution};
pub use params::{BrakeParams, ValveMode};
pub use reader::{TokenValueReader, ValueReader};
pub use record::BrakeRecord;
pub use sound::BrakeSoundEvent;
pub use state::{BrakeState, EpDemand, HoseState, PressureTrend, RetainerSetting, SoundTracker, ValveState};
pub use status::BrakeStatus;
pub use system::BrakeSystem;
pub use transfer::TransferPipe;
pub use vacuum::VacuumBrake;
