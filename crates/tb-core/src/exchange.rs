//! The volume-weighted pressure exchange primitive.
//!
//! Every air movement in the simulator is one of two shapes:
//!
//! - **Exchange** between two finite volumes (aux reservoir ↔ cylinder,
//!   emergency ↔ aux, pipe ↔ aux, pipe ↔ main reservoir, car ↔ car).  Mass is
//!   conserved: `V1·Δp1 + V2·Δp2 = 0`.
//! - **Approach** of one volume toward a fixed pressure (venting to
//!   atmosphere, charging from an unlimited source).
//!
//! Both are rate limited and neither ever overshoots: a step that would
//! carry the pressures past each other is replaced by exact equalization.

/// Lower bound applied to every volume handed to [`exchange`] (m³).
///
/// Zero-length cars would otherwise produce zero pipe volumes and divide by
/// zero in the volume ratio.
pub const MIN_VOLUME_M3: f32 = 1.0e-4;

/// Clamp a volume to [`MIN_VOLUME_M3`].  `NaN` maps to the floor.
#[inline]
pub fn floor_volume(v: f32) -> f32 {
    if v.is_nan() { MIN_VOLUME_M3 } else { v.max(MIN_VOLUME_M3) }
}

/// Move `p1` toward `p2` by at most `max_rate · dt`, moving `p2` the
/// opposite way by the volume-weighted amount `Δp1 · V1 / V2`.
///
/// If the full step would cross the equalization point the step is
/// shortened to `|p2 − p1| / (1 + V1/V2)` and both sides end at the
/// volume-weighted mean.  The rate is expressed on the `p1` side.
///
/// Returns `(p1', p2')`.  A no-op when `dt <= 0`, `max_rate <= 0`, or
/// either pressure is not finite.
pub fn exchange(p1: f32, v1: f32, p2: f32, v2: f32, max_rate: f32, dt: f32) -> (f32, f32) {
    if dt.is_nan() || dt <= 0.0 || max_rate.is_nan() || max_rate <= 0.0
        || !p1.is_finite() || !p2.is_finite()
    {
        return (p1, p2);
    }
    let gap = p2 - p1;
    if gap == 0.0 {
        return (p1, p2);
    }

    let v1 = floor_volume(v1);
    let v2 = floor_volume(v2);
    let ratio = v1 / v2;
    let equalize = gap.abs() / (1.0 + ratio);
    let step = max_rate * dt;

    if step >= equalize {
        let mean = (p1 * v1 + p2 * v2) / (v1 + v2);
        return (mean, mean);
    }

    let dp = step.copysign(gap);
    (p1 + dp, p2 - dp * ratio)
}

/// Move `p` toward `target` by at most `max_rate · dt`, stopping exactly on
/// `target`.
#[inline]
pub fn approach(p: f32, target: f32, max_rate: f32, dt: f32) -> f32 {
    if dt.is_nan() || dt <= 0.0 || max_rate.is_nan() || max_rate <= 0.0
        || !p.is_finite() || !target.is_finite()
    {
        return p;
    }
    let step = max_rate * dt;
    if (target - p).abs() <= step {
        target
    } else if target > p {
        p + step
    } else {
        p - step
    }
}
