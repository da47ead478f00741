// session.rs

use crate::control::vehicle_controller::{ControlPhase, VehicleController};
use crate::detection::insertion_monitor::{InsertionMonitor, InsertionOpportunity};
use crate::detection::wave_detector::{DetectorRecord, StopAndGoEvent, WaveDetector};
use crate::global_variables::{
    DETECTION_RANGE, DETECTOR_LOC_DOWNSTREAM, DETECTOR_LOC_UPSTREAM, INSERTION_HEADWAY_THRESHOLD,
    JAD_VEHICLE_ID, RAMP_LANE, RAMP_POSITION, SG_MAX_SPEED, SG_MIN_DURATION, WAVE_SPEED,
};
use crate::planning::jad_planner::{JadPlan, JadPlanner, PlanError};
use crate::shared_data::{SimCommand, SpaceTimePoint, VehicleSnapshot};

/// Lifecycle of one jam-absorption run. The single source of truth for
/// "has planning happened yet": planning is attempted exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No completed downstream wave event yet.
    AwaitingEvent,
    /// Wave observed; watching the ramp for an insertion gap.
    AwaitingOpportunity,
    /// Plan computed, controlled vehicle not yet inserted.
    Planned,
    /// Controlled vehicle inserted and under speed control.
    Active,
    /// Maneuver finished or abandoned; the controller stays idle.
    Done,
}

/// Orchestrates one simulation step in the fixed order: downstream detector,
/// upstream detector, insertion monitor, one-shot planner, controller. Owns
/// the only mutable cross-step resource, the plan, written once and read
/// every subsequent step.
pub struct JadSession {
    jad_speed: f64,
    et_offset: f64,
    downstream_detector: WaveDetector,
    upstream_detector: WaveDetector,
    monitor: InsertionMonitor,
    planner: JadPlanner,
    state: SessionState,
    wave_event: Option<StopAndGoEvent>,
    plan: Option<JadPlan>,
    controller: Option<VehicleController>,
}

impl JadSession {
    /// `jad_speed` in m/s; `et_offset` in seconds, applied to the wave-tail
    /// point E to buffer for uncertainty in wave dissipation.
    pub fn new(jad_speed: f64, et_offset: f64) -> Self {
        Self {
            jad_speed,
            et_offset,
            downstream_detector: WaveDetector::new(
                DETECTOR_LOC_DOWNSTREAM,
                DETECTION_RANGE,
                SG_MAX_SPEED,
                SG_MIN_DURATION,
            ),
            upstream_detector: WaveDetector::new(
                DETECTOR_LOC_UPSTREAM,
                DETECTION_RANGE,
                SG_MAX_SPEED,
                SG_MIN_DURATION,
            ),
            monitor: InsertionMonitor::new(RAMP_POSITION, INSERTION_HEADWAY_THRESHOLD),
            planner: JadPlanner::new(jad_speed, WAVE_SPEED, DETECTOR_LOC_UPSTREAM),
            state: SessionState::AwaitingEvent,
            wave_event: None,
            plan: None,
            controller: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn plan(&self) -> Option<&JadPlan> {
        self.plan.as_ref()
    }

    pub fn downstream_records(&self) -> &[DetectorRecord] {
        self.downstream_detector.records()
    }

    pub fn upstream_records(&self) -> &[DetectorRecord] {
        self.upstream_detector.records()
    }

    /// One simulation step. Returns the commands the glue loop must apply.
    pub fn on_step(&mut self, step: u64, snapshots: &[VehicleSnapshot]) -> Vec<SimCommand> {
        let downstream_events = self.downstream_detector.observe(step, snapshots);
        self.upstream_detector.observe(step, snapshots);

        // Only the most recent completed downstream event matters for planning.
        if let Some(event) = downstream_events.last() {
            println!(
                "\n[SG detected at {} m] start={} s, end={} s, duration={} s, \
                 v_start={:.2} m/s, v_end={:.2} m/s, v_min={:.2} m/s, v_mean={:.2} m/s",
                event.location,
                event.t_start,
                event.t_end,
                event.duration,
                event.v_start,
                event.v_end,
                event.v_min,
                event.v_mean
            );
            self.wave_event = Some(event.clone());
            if self.state == SessionState::AwaitingEvent {
                self.state = SessionState::AwaitingOpportunity;
            }
        }

        if self.state == SessionState::AwaitingOpportunity {
            if let Some(opportunity) = self.monitor.check(step, snapshots) {
                // Clone keeps the event immutable under the borrow checker;
                // the state gate guarantees it exists here.
                if let Some(event) = self.wave_event.clone() {
                    match self.try_plan(step, &event, &opportunity) {
                        Ok(plan) => {
                            Self::print_plan(&plan);
                            self.plan = Some(plan);
                            self.controller =
                                Some(VehicleController::new(JAD_VEHICLE_ID, RAMP_LANE));
                            self.state = SessionState::Planned;
                        }
                        Err(error) => {
                            // A garbage plan must never drive a vehicle; the
                            // run continues uncontrolled.
                            log::error!("planning failed, maneuver abandoned: {error}");
                            self.state = SessionState::Done;
                        }
                    }
                }
            }
        }

        let mut commands = Vec::new();
        if let (Some(plan), Some(controller)) = (self.plan.as_ref(), self.controller.as_mut()) {
            let control_commands = controller.on_step(step, plan);
            if !control_commands.is_empty() && self.state == SessionState::Planned {
                self.state = SessionState::Active;
            }
            if controller.phase() == ControlPhase::Released {
                self.state = SessionState::Done;
            }
            commands.extend(control_commands);
        }
        commands
    }

    /// Flush detector state at the end of the run.
    pub fn finish(&mut self, end_step: u64) {
        self.downstream_detector.finish(end_step);
        self.upstream_detector.finish(end_step);
    }

    fn try_plan(
        &self,
        step: u64,
        event: &StopAndGoEvent,
        opportunity: &InsertionOpportunity,
    ) -> Result<JadPlan, PlanError> {
        let f = SpaceTimePoint::new(event.t_start as f64, event.location);
        let e = SpaceTimePoint::new(event.t_end as f64 + self.et_offset, event.location);
        let a = SpaceTimePoint::new(step as f64, opportunity.position);
        println!(
            "[JAD Input] A ({},{}), E ({},{}), F ({},{}), vt={:.2} m/s, vw={:.2} m/s, w={:.2} m/s",
            a.t as i64,
            a.x as i64,
            e.t as i64,
            e.x as i64,
            f.t as i64,
            f.x as i64,
            opportunity.leader_speed,
            event.v_min,
            WAVE_SPEED
        );
        self.planner
            .plan(a, e, f, opportunity.leader_speed, event.v_min)
    }

    fn print_plan(plan: &JadPlan) {
        println!(
            "[JAD Strategy] A ({},{}), B ({},{}), C ({},{})",
            plan.a.t as i64,
            plan.a.x as i64,
            plan.b.t as i64,
            plan.b.x as i64,
            plan.c.t as i64,
            plan.c.x as i64
        );
        println!(
            "[Feasible Region of A] P1 ({},{}), P2 ({},{}), P3 ({},{})",
            plan.p1.t as i64,
            plan.p1.x as i64,
            plan.p2.t as i64,
            plan.p2.x as i64,
            plan.p3.t as i64,
            plan.p3.x as i64
        );
    }
}
