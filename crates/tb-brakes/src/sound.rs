//! Brake sound triggers.
//!
//! Pressures are sampled every `BrakeOptions::sound_check_interval_s` of
//! simulated time rather than every update, and an event is emitted only
//! when the direction of change differs from the previous sample.  A
//! cylinder that creeps up over many ticks therefore gives one
//! `BrakePressureIncrease`, not one per tick.

use crate::{PressureTrend, SoundTracker};

/// Change smaller than this between samples counts as steady (psi).
pub const TREND_THRESHOLD_PSI: f32 = 0.1;

/// Sound cue for the audio layer.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BrakeSoundEvent {
    BrakePressureIncrease,
    BrakePressureDecrease,
    BrakePressureStoppedChanging,
    BrakePipePressureIncrease,
    BrakePipePressureDecrease,
    BrakePipePressureStoppedChanging,
}

fn trend(prev: f32, now: f32) -> PressureTrend {
    let d = now - prev;
    if d > TREND_THRESHOLD_PSI {
        PressureTrend::Rising
    } else if d < -TREND_THRESHOLD_PSI {
        PressureTrend::Falling
    } else {
        PressureTrend::Steady
    }
}

impl SoundTracker {
    /// Start sampling from the given pressures without emitting anything.
    pub fn reset(&mut self, cyl_psi: f32, pipe_psi: f32) {
        *self = SoundTracker {
            timer_s:       0.0,
            last_cyl_psi:  cyl_psi,
            last_pipe_psi: pipe_psi,
            cyl_trend:     PressureTrend::Steady,
            pipe_trend:    PressureTrend::Steady,
        };
    }

    /// Advance the sample timer by `dt`; when an interval elapses compare
    /// against the previous sample and push any direction changes.
    ///
    /// Directions are of the stored value; on vacuum stock a rising pipe
    /// pressure is a loss of vacuum.
    pub fn sample(
        &mut self,
        dt:       f32,
        interval: f32,
        cyl_psi:  f32,
        pipe_psi: f32,
        events:   &mut Vec<BrakeSoundEvent>,
    ) {
        self.timer_s += dt;
        if self.timer_s < interval.max(0.0) {
            return;
        }
        self.timer_s = 0.0;

        let cyl = trend(self.last_cyl_psi, cyl_psi);
        if cyl != self.cyl_trend {
            events.push(match cyl {
                PressureTrend::Rising  => BrakeSoundEvent::BrakePressureIncrease,
                PressureTrend::Falling => BrakeSoundEvent::BrakePressureDecrease,
                PressureTrend::Steady  => BrakeSoundEvent::BrakePressureStoppedChanging,
            });
            self.cyl_trend = cyl;
        }

        let pipe = trend(self.last_pipe_psi, pipe_psi);
        if pipe != self.pipe_trend {
            events.push(match pipe {
                PressureTrend::Rising  => BrakeSoundEvent::BrakePipePressureIncrease,
                PressureTrend::Falling => BrakeSoundEvent::BrakePipePressureDecrease,
                PressureTrend::Steady  => BrakeSoundEvent::BrakePipePressureStoppedChanging,
            });
            self.pipe_trend = pipe;
        }

        self.last_cyl_psi = cyl_psi;
        self.last_pipe_psi = pipe_psi;
    }
}
