//! `tb-core`: foundational types for the train brake simulator.
//!
//! This crate is a dependency of every other `tb-*` crate.  It has no `tb-*`
//! dependencies and minimal external ones (only `thiserror`, plus optional
//! `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`ids`]         | `CarId`                                                    |
//! | [`units`]       | unit conversions, `BrakeFamily`, `PressureRange`, `PressureUnit` |
//! | [`exchange`]    | `exchange`, `approach`: the volume-weighted flow primitive |
//! | [`time`]        | `Tick`, `SimClock`, `sanitize_dt`                          |
//! | [`options`]     | `BrakeOptions` (explicit replacement for global settings)  |
//! | [`error`]       | `CoreError`, `CoreResult`                                  |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod exchange;
pub mod ids;
pub mod options;
pub mod time;
pub mod units;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use exchange::{MIN_VOLUME_M3, approach, exchange, floor_volume};
pub use ids::CarId;
pub use options::{BrakeOptions, RetainerPercent};
pub use time::{SimClock, Tick, sanitize_dt};
pub use units::{BrakeFamily, PressureRange, PressureUnit};
