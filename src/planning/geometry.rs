// geometry.rs

use crate::shared_data::SpaceTimePoint;

const SOLVE_TOLERANCE: f64 = 1e-9;
const SOLVE_MAX_ITERATIONS: u32 = 200;

/// A straight characteristic in the time-position plane: a quantity (wave
/// boundary or vehicle trajectory) advancing at constant speed from an anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacteristicLine {
    pub anchor: SpaceTimePoint,
    pub speed: f64,
}

impl CharacteristicLine {
    pub fn new(anchor: SpaceTimePoint, speed: f64) -> Self {
        Self { anchor, speed }
    }

    pub fn position_at(&self, t: f64) -> f64 {
        self.anchor.x + self.speed * (t - self.anchor.t)
    }

    /// Closed-form intersection with another line. None when the slopes are
    /// (numerically) parallel.
    pub fn intersect(&self, other: &CharacteristicLine) -> Option<SpaceTimePoint> {
        let relative_speed = self.speed - other.speed;
        if relative_speed.abs() < f64::EPSILON {
            return None;
        }
        let t = (other.anchor.x - other.speed * other.anchor.t - self.anchor.x
            + self.speed * self.anchor.t)
            / relative_speed;
        Some(SpaceTimePoint::new(t, self.position_at(t)))
    }

    /// Time at which the line crosses a fixed longitudinal position.
    /// None for a stationary line that never reaches it.
    pub fn time_at_position(&self, x: f64) -> Option<f64> {
        if self.speed.abs() < f64::EPSILON {
            return None;
        }
        Some(self.anchor.t + (x - self.anchor.x) / self.speed)
    }
}

/// Outcome of a bracketed intersection search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntersectionResult {
    Found(SpaceTimePoint),
    /// The signed difference does not change sign across the bracket; there
    /// is no crossing to converge on. Callers must handle this explicitly.
    NotBracketed,
}

/// Finds where two position functions of time cross, by bisection on their
/// signed difference over `bracket`. The difference must have opposite signs
/// at the bracket ends.
pub fn solve_intersection<F, G>(f: F, g: G, bracket: (f64, f64)) -> IntersectionResult
where
    F: Fn(f64) -> f64,
    G: Fn(f64) -> f64,
{
    let (mut lo, mut hi) = bracket;
    let difference = |t: f64| f(t) - g(t);

    let mut diff_lo = difference(lo);
    let diff_hi = difference(hi);
    if diff_lo == 0.0 {
        return IntersectionResult::Found(SpaceTimePoint::new(lo, f(lo)));
    }
    if diff_hi == 0.0 {
        return IntersectionResult::Found(SpaceTimePoint::new(hi, f(hi)));
    }
    if diff_lo.signum() == diff_hi.signum() {
        return IntersectionResult::NotBracketed;
    }

    for _ in 0..SOLVE_MAX_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        let diff_mid = difference(mid);
        if diff_mid.abs() < SOLVE_TOLERANCE || (hi - lo) < SOLVE_TOLERANCE {
            return IntersectionResult::Found(SpaceTimePoint::new(mid, f(mid)));
        }
        if diff_mid.signum() == diff_lo.signum() {
            lo = mid;
            diff_lo = diff_mid;
        } else {
            hi = mid;
        }
    }

    let t = 0.5 * (lo + hi);
    IntersectionResult::Found(SpaceTimePoint::new(t, f(t)))
}
