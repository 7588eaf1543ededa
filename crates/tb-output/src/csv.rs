//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `car_pressures.csv`
//! - `train_summaries.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;
use log::debug;

use crate::writer::OutputWriter;
use crate::{CarPressureRow, OutputResult, TrainSummaryRow};

/// Writes telemetry to two CSV files.
pub struct CsvWriter {
    cars:      Writer<File>,
    summaries: Writer<File>,
    finished:  bool,
}

impl CsvWriter {
    /// Open (or create) the two CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut cars = Writer::from_path(dir.join("car_pressures.csv"))?;
        cars.write_record([
            "tick",
            "car_id",
            "position",
            "kind",
            "brake_pipe_psi",
            "cylinder_psi",
            "aux_res_psi",
            "valve",
            "brake_force_n",
        ])?;

        let mut summaries = Writer::from_path(dir.join("train_summaries.csv"))?;
        summaries.write_record(["tick", "brake_pipe_intact", "substeps", "sound_events", "total_brake_force_n"])?;

        debug!("writing CSV telemetry to {}", dir.display());
        Ok(Self {
            cars,
            summaries,
            finished: false,
        })
    }
}

impl OutputWriter for CsvWriter {
    fn write_car_pressures(&mut self, rows: &[CarPressureRow]) -> OutputResult<()> {
        for row in rows {
            self.cars.write_record(&[
                row.tick.to_string(),
                row.car_id.to_string(),
                row.position.to_string(),
                row.kind.to_owned(),
                format!("{:.3}", row.brake_pipe_psi),
                format!("{:.3}", row.cylinder_psi),
                format!("{:.3}", row.aux_res_psi),
                row.valve.to_owned(),
                format!("{:.1}", row.brake_force_n),
            ])?;
        }
        Ok(())
    }

    fn write_train_summary(&mut self, row: &TrainSummaryRow) -> OutputResult<()> {
        self.summaries.write_record(&[
            row.tick.to_string(),
            (row.brake_pipe_intact as u8).to_string(),
            row.substeps.to_string(),
            row.sound_events.to_string(),
            format!("{:.1}", row.total_brake_force_n),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.cars.flush()?;
        self.summaries.flush()?;
        Ok(())
    }
}
