//! `tb-output`: telemetry writers for the train brake simulator.
//!
//! | Backend | Files created                                   |
//! |---------|-------------------------------------------------|
//! | CSV     | `car_pressures.csv`, `train_summaries.csv`      |
//!
//! Backends implement [`OutputWriter`] and are driven by
//! [`TrainOutputObserver`], which implements `tb_train::TrainObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tb_output::{CsvWriter, TrainOutputObserver};
//!
//! let writer = CsvWriter::new(Path::new("./output"))?;
//! let mut obs = TrainOutputObserver::new(writer);
//! train.run_ticks(600, 0.1, &mut obs);
//! if let Some(e) = obs.take_error() {
//!     eprintln!("output error: {e}");
//! }
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;


pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::TrainOutputObserver;
pub use row::{CarPressureRow, TrainSummaryRow};
pub use writer::OutputWriter;
