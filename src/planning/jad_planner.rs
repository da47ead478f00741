// jad_planner.rs

use serde::Serialize;
use thiserror::Error;

use crate::global_variables::BRACKET_HORIZON;
use crate::planning::geometry::{solve_intersection, CharacteristicLine, IntersectionResult};
use crate::shared_data::SpaceTimePoint;

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("trajectory and wave characteristic do not cross between {0:.0} s and {1:.0} s")]
    NotBracketed(f64, f64),
    #[error("characteristic lines are parallel at {0:.2} m/s")]
    ParallelLines(f64),
    #[error("plan ordering violated: A.t={a:.1}, B.t={b:.1}, C.t={c:.1}")]
    InvalidOrdering { a: f64, b: f64, c: f64 },
    #[error("degenerate control window: AB={0} s, BC={1} s")]
    DegenerateDuration(u64, u64),
}

/// The complete jam-absorption plan. Constructed atomically by the planner,
/// never mutated afterwards.
///
/// A: insertion; F: wave head; E: wave tail (time offset already applied);
/// B: jad-speed trajectory meets the head characteristic; C: leader-speed
/// trajectory meets the tail characteristic; D: diagnostic worst-case exit
/// at jam interior speed. P1-P3 bound the feasible insertion region against
/// the upstream protected location (diagnostic only).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JadPlan {
    pub a: SpaceTimePoint,
    pub b: SpaceTimePoint,
    pub c: SpaceTimePoint,
    pub d: SpaceTimePoint,
    pub e: SpaceTimePoint,
    pub f: SpaceTimePoint,
    pub duration_ab: u64,
    pub duration_bc: u64,
    pub p1: SpaceTimePoint,
    pub p2: SpaceTimePoint,
    pub p3: SpaceTimePoint,
    pub jad_speed: f64,
    pub wave_speed: f64,
    pub leader_speed: f64,
    pub wave_min_speed: f64,
}

impl JadPlan {
    /// The invariant the controller relies on. A violating plan must never
    /// drive a vehicle.
    pub fn is_consistent(&self) -> bool {
        self.a.t < self.b.t
            && self.b.t < self.c.t
            && self.duration_ab > 0
            && self.duration_bc > 0
    }
}

/// Pure shockwave-kinematics planner. Both operations are called exactly once
/// per run, before any control command is issued.
pub struct JadPlanner {
    pub jad_speed: f64,
    pub wave_speed: f64,
    pub upstream_location: f64,
}

impl JadPlanner {
    pub fn new(jad_speed: f64, wave_speed: f64, upstream_location: f64) -> Self {
        Self {
            jad_speed,
            wave_speed,
            upstream_location,
        }
    }

    /// Computes B, C, D and the feasibility region for an insertion at `a`
    /// against a wave anchored at head `f` and (offset) tail `e`.
    ///
    /// B is found by bracketed root-finding on the signed difference of the
    /// two position functions: at insertion the vehicle is behind the head
    /// characteristic, and by the bracket horizon it is ahead of it, so the
    /// difference changes sign by construction.
    pub fn plan(
        &self,
        a: SpaceTimePoint,
        e: SpaceTimePoint,
        f: SpaceTimePoint,
        leader_speed: f64,
        wave_min_speed: f64,
    ) -> Result<JadPlan, PlanError> {
        let head = CharacteristicLine::new(f, self.wave_speed);
        let tail = CharacteristicLine::new(e, self.wave_speed);
        let approach = CharacteristicLine::new(a, self.jad_speed);

        let horizon = a.t + BRACKET_HORIZON;
        let b = match solve_intersection(
            |t| approach.position_at(t),
            |t| head.position_at(t),
            (a.t, horizon),
        ) {
            IntersectionResult::Found(point) => point,
            IntersectionResult::NotBracketed => return Err(PlanError::NotBracketed(a.t, horizon)),
        };

        let follow = CharacteristicLine::new(b, leader_speed);
        let c = follow
            .intersect(&tail)
            .ok_or(PlanError::ParallelLines(leader_speed))?;

        let crawl = CharacteristicLine::new(b, wave_min_speed);
        let d = crawl
            .intersect(&tail)
            .ok_or(PlanError::ParallelLines(wave_min_speed))?;

        if !(a.t < b.t && b.t < c.t) {
            return Err(PlanError::InvalidOrdering {
                a: a.t,
                b: b.t,
                c: c.t,
            });
        }
        let duration_ab = (b.t - a.t).floor() as u64;
        let duration_bc = (c.t - b.t).floor() as u64;
        if duration_ab == 0 || duration_bc == 0 {
            return Err(PlanError::DegenerateDuration(duration_ab, duration_bc));
        }

        let (p1, p2, p3) = self.feasible_region(e, f, leader_speed)?;

        Ok(JadPlan {
            a,
            b,
            c,
            d,
            e,
            f,
            duration_ab,
            duration_bc,
            p1,
            p2,
            p3,
            jad_speed: self.jad_speed,
            wave_speed: self.wave_speed,
            leader_speed,
            wave_min_speed,
        })
    }

    /// The triangle of insertion points (t, x) from which absorption completes
    /// before the wave tail reaches the upstream protected location. Same
    /// line-intersection logic as `plan`, with known and unknown points
    /// swapped: the limiting trajectory is traced backwards from the tail
    /// crossing at the upstream boundary. The wave minimum speed plays no
    /// role in the region geometry, so it is not taken here.
    pub fn feasible_region(
        &self,
        e: SpaceTimePoint,
        f: SpaceTimePoint,
        leader_speed: f64,
    ) -> Result<(SpaceTimePoint, SpaceTimePoint, SpaceTimePoint), PlanError> {
        let head = CharacteristicLine::new(f, self.wave_speed);
        let tail = CharacteristicLine::new(e, self.wave_speed);

        // Latest admissible absorption: C* on the tail at the upstream boundary.
        let c_star_t = tail
            .time_at_position(self.upstream_location)
            .ok_or(PlanError::ParallelLines(self.wave_speed))?;
        let c_star = SpaceTimePoint::new(c_star_t, self.upstream_location);

        // Trace back along the leader-speed segment to the head characteristic.
        let b_star = CharacteristicLine::new(c_star, leader_speed)
            .intersect(&head)
            .ok_or(PlanError::ParallelLines(leader_speed))?;

        // ...and along the jad-speed segment: the latest-insertion boundary.
        let latest_insertion = CharacteristicLine::new(b_star, self.jad_speed);

        let p1_t = head
            .time_at_position(self.upstream_location)
            .ok_or(PlanError::ParallelLines(self.wave_speed))?;
        let p1 = SpaceTimePoint::new(p1_t, self.upstream_location);
        let p2_t = latest_insertion
            .time_at_position(self.upstream_location)
            .ok_or(PlanError::ParallelLines(self.jad_speed))?;
        let p2 = SpaceTimePoint::new(p2_t, self.upstream_location);
        let p3 = b_star;

        Ok((p1, p2, p3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::global_variables::{DETECTOR_LOC_UPSTREAM, WAVE_SPEED};
    use crate::shared_data::kmh_to_ms;

    fn planner() -> JadPlanner {
        JadPlanner::new(kmh_to_ms(55.0), WAVE_SPEED, DETECTOR_LOC_UPSTREAM)
    }

    fn wave_points() -> (SpaceTimePoint, SpaceTimePoint) {
        // Downstream event: start 100 s, end 140 s at 7000 m, no offset.
        (
            SpaceTimePoint::new(140.0, 7000.0),
            SpaceTimePoint::new(100.0, 7000.0),
        )
    }

    #[test]
    fn point_b_matches_closed_form_solution() {
        let planner = planner();
        let (e, f) = wave_points();
        let a = SpaceTimePoint::new(150.0, 1000.0);
        let plan = planner.plan(a, e, f, 25.0, 2.0).expect("plan");

        let approach = CharacteristicLine::new(a, planner.jad_speed);
        let head = CharacteristicLine::new(f, planner.wave_speed);
        let exact = approach.intersect(&head).expect("not parallel");
        assert!((plan.b.t - exact.t).abs() / exact.t < 1e-6);
        assert!((plan.b.x - exact.x).abs() / exact.x < 1e-6);
    }

    #[test]
    fn plan_points_sit_on_their_characteristics() {
        let planner = planner();
        let (e, f) = wave_points();
        let a = SpaceTimePoint::new(150.0, 1000.0);
        let plan = planner.plan(a, e, f, 25.0, 2.0).expect("plan");

        let head = CharacteristicLine::new(f, WAVE_SPEED);
        let tail = CharacteristicLine::new(e, WAVE_SPEED);
        assert!((head.position_at(plan.b.t) - plan.b.x).abs() < 1e-6);
        assert!((tail.position_at(plan.c.t) - plan.c.x).abs() < 1e-6);
        assert!((tail.position_at(plan.d.t) - plan.d.x).abs() < 1e-6);
    }

    #[test]
    fn ordering_invariant_holds() {
        let planner = planner();
        let (e, f) = wave_points();
        let a = SpaceTimePoint::new(150.0, 1000.0);
        let plan = planner.plan(a, e, f, 25.0, 2.0).expect("plan");
        assert!(plan.a.t < plan.b.t);
        assert!(plan.b.t < plan.c.t);
        assert!(plan.duration_ab > 0);
        assert!(plan.duration_bc > 0);
        assert!(plan.is_consistent());
    }

    #[test]
    fn durations_are_truncated_point_differences() {
        let planner = planner();
        let (e, f) = wave_points();
        let a = SpaceTimePoint::new(150.0, 1000.0);
        let plan = planner.plan(a, e, f, 25.0, 2.0).expect("plan");
        assert_eq!(plan.duration_ab, (plan.b.t - plan.a.t).floor() as u64);
        assert_eq!(plan.duration_bc, (plan.c.t - plan.b.t).floor() as u64);
    }

    #[test]
    fn insertion_ahead_of_the_wave_head_fails_to_bracket() {
        let planner = planner();
        let (e, f) = wave_points();
        // At 8000 m the vehicle is already ahead of the head characteristic;
        // moving forward it only gets further ahead.
        let a = SpaceTimePoint::new(150.0, 8000.0);
        let result = planner.plan(a, e, f, 25.0, 2.0);
        assert!(matches!(result, Err(PlanError::NotBracketed(_, _))));
    }

    #[test]
    fn tail_anchored_before_the_head_breaks_the_ordering() {
        let planner = planner();
        let f = SpaceTimePoint::new(100.0, 7000.0);
        // The tail far in the past puts the return-segment intersection C
        // before B.
        let e = SpaceTimePoint::new(-900.0, 7000.0);
        let a = SpaceTimePoint::new(150.0, 1000.0);
        let result = planner.plan(a, e, f, 25.0, 2.0);
        assert!(matches!(result, Err(PlanError::InvalidOrdering { .. })));
    }

    #[test]
    fn sub_second_segments_are_degenerate() {
        let planner = planner();
        let f = SpaceTimePoint::new(100.0, 7000.0);
        // The tail barely behind the head leaves B-to-C shorter than one step.
        let e = SpaceTimePoint::new(100.1, 7000.0);
        let a = SpaceTimePoint::new(150.0, 1000.0);
        let result = planner.plan(a, e, f, 25.0, 2.0);
        assert!(matches!(result, Err(PlanError::DegenerateDuration(_, _))));
    }

    #[test]
    fn diagnostic_point_d_is_no_earlier_than_c() {
        let planner = planner();
        let (e, f) = wave_points();
        let a = SpaceTimePoint::new(150.0, 1000.0);
        let plan = planner.plan(a, e, f, 25.0, 2.0).expect("plan");
        // Crawling at jam interior speed cannot clear the tail sooner than
        // following the platoon.
        assert!(plan.d.t >= plan.c.t);
    }

    #[test]
    fn feasible_region_vertices_lie_on_their_boundaries() {
        let planner = planner();
        let (e, f) = wave_points();
        let (p1, p2, p3) = planner.feasible_region(e, f, 25.0).expect("region");

        let head = CharacteristicLine::new(f, WAVE_SPEED);
        assert!((p1.x - DETECTOR_LOC_UPSTREAM).abs() < 1e-9);
        assert!((head.position_at(p1.t) - p1.x).abs() < 1e-6);
        assert!((p2.x - DETECTOR_LOC_UPSTREAM).abs() < 1e-9);
        // P3 is on the head characteristic and on the latest-insertion line
        // through P2.
        assert!((head.position_at(p3.t) - p3.x).abs() < 1e-6);
        let latest = CharacteristicLine::new(p2, planner.jad_speed);
        assert!((latest.position_at(p3.t) - p3.x).abs() < 1e-6);
    }

    #[test]
    fn tail_offset_shifts_c_but_not_b() {
        let planner = planner();
        let f = SpaceTimePoint::new(100.0, 7000.0);
        let e = SpaceTimePoint::new(140.0, 7000.0);
        let e_offset = SpaceTimePoint::new(140.0 + 20.0, 7000.0);
        let a = SpaceTimePoint::new(150.0, 1000.0);
        let plan = planner.plan(a, e, f, 25.0, 2.0).expect("plan");
        let plan_offset = planner.plan(a, e_offset, f, 25.0, 2.0).expect("plan");
        assert!((plan.b.t - plan_offset.b.t).abs() < 1e-9);
        assert!(plan_offset.c.t > plan.c.t);
    }
}
