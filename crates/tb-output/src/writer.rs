//! The `OutputWriter` trait implemented by backend writers.

use crate::{CarPressureRow, OutputResult, TrainSummaryRow};

/// Trait implemented by telemetry writers.
///
/// Errors are returned here but swallowed by the observer, which keeps the
/// first one for [`TrainOutputObserver::take_error`][crate::TrainOutputObserver::take_error].
pub trait OutputWriter {
    /// Write a batch of per-car rows.
    fn write_car_pressures(&mut self, rows: &[CarPressureRow]) -> OutputResult<()>;

    /// Write one tick summary row.
    fn write_train_summary(&mut self, row: &TrainSummaryRow) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent: safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
