//! Train observer trait for output writers and progress reporting.

use tb_brakes::BrakeSoundEvent;
use tb_core::{CarId, Tick};

use crate::{TickReport, Train};

/// Callbacks invoked by [`Train::run_ticks`][crate::Train::run_ticks] at key
/// points in the tick loop.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example: emergency detector
///
/// ```rust,ignore
/// struct PipeWatch { vented_at: Option<Tick> }
///
/// impl TrainObserver for PipeWatch {
///     fn on_tick_end(&mut self, report: &TickReport) {
///         if !report.propagation.brake_pipe_intact && self.vented_at.is_none() {
///             self.vented_at = Some(report.tick);
///         }
///     }
/// }
/// ```
pub trait TrainObserver {
    /// Called at the very start of each tick, before any processing.
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// Called for every sound cue a car raises, as it is raised.
    fn on_sound_event(&mut self, _tick: Tick, _car: CarId, _event: BrakeSoundEvent) {}

    /// Called at the end of each tick with what the tick did.
    fn on_tick_end(&mut self, _report: &TickReport) {}

    /// Called at snapshot intervals (every `snapshot_interval_ticks` ticks)
    /// with read-only access to the whole train.
    fn on_snapshot(&mut self, _tick: Tick, _train: &Train) {}

    /// Called once after the final tick of a run.
    fn on_run_end(&mut self, _final_tick: Tick) {}
}

/// A [`TrainObserver`] that does nothing.
pub struct NoopObserver;

impl TrainObserver for NoopObserver {}
