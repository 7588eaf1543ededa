//! `TrainOutputObserver<W>`: bridges `TrainObserver` to an `OutputWriter`.

use tb_core::Tick;
use tb_train::{TickReport, Train, TrainObserver};

use crate::row::{CarPressureRow, TrainSummaryRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// A [`TrainObserver`] that writes per-car pressures at snapshot ticks and a
/// summary every tick to any [`OutputWriter`].
///
/// Errors from the writer are stored internally because `TrainObserver`
/// methods have no return value.  After `train.run_ticks()` returns, check
/// for errors with [`take_error`][Self::take_error].
pub struct TrainOutputObserver<W: OutputWriter> {
    writer:     W,
    last_error: Option<OutputError>,
}

impl<W: OutputWriter> TrainOutputObserver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, last_error: None }
    }

    /// Take the stored write error (if any).  `None` if all writes succeeded.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    /// Unwrap the inner writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                log::warn!("telemetry write failed: {e}");
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> TrainObserver for TrainOutputObserver<W> {
    fn on_tick_end(&mut self, report: &TickReport) {
        let result = self.writer.write_train_summary(&TrainSummaryRow::from(report));
        self.store_err(result);
    }

    fn on_snapshot(&mut self, tick: Tick, train: &Train) {
        let rows = CarPressureRow::all(tick.0, train);
        if !rows.is_empty() {
            let result = self.writer.write_car_pressures(&rows);
            self.store_err(result);
        }
    }

    fn on_run_end(&mut self, _final_tick: Tick) {
        let result = self.writer.finish();
        self.store_err(result);
    }
}
