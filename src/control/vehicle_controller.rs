// vehicle_controller.rs

use crate::planning::jad_planner::JadPlan;
use crate::shared_data::SimCommand;

/// Control phase of the inserted vehicle. Transitions are driven solely by
/// elapsed steps since A relative to the plan durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPhase {
    PreInsertion,
    HoldJadSpeed,
    ReturnToLeaderSpeed,
    Released,
}

/// Drives the one controlled vehicle through the three-stage speed profile.
///
/// No-op before A.t and after release; idempotent when called twice with the
/// same step. Refuses to activate on a plan violating `A.t < B.t < C.t` or
/// with a zero-length control window.
pub struct VehicleController {
    vehicle_id: u64,
    lane: u8,
    phase: ControlPhase,
    inserted: bool,
}

impl VehicleController {
    pub fn new(vehicle_id: u64, lane: u8) -> Self {
        Self {
            vehicle_id,
            lane,
            phase: ControlPhase::PreInsertion,
            inserted: false,
        }
    }

    pub fn phase(&self) -> ControlPhase {
        self.phase
    }

    pub fn vehicle_id(&self) -> u64 {
        self.vehicle_id
    }

    /// One step of control. Returns the commands to apply this step.
    pub fn on_step(&mut self, step: u64, plan: &JadPlan) -> Vec<SimCommand> {
        if !plan.is_consistent() {
            log::error!(
                "refusing to activate on inconsistent plan (A.t={:.1}, B.t={:.1}, C.t={:.1})",
                plan.a.t,
                plan.b.t,
                plan.c.t
            );
            return Vec::new();
        }
        if self.phase == ControlPhase::Released {
            return Vec::new();
        }

        let insertion_step = plan.a.t.round() as u64;
        if step < insertion_step {
            return Vec::new();
        }
        let elapsed = step - insertion_step;

        if elapsed < plan.duration_ab {
            let mut commands = Vec::new();
            if !self.inserted {
                // The vehicle enters traffic already holding the jad speed.
                commands.push(SimCommand::Insert {
                    id: self.vehicle_id,
                    position: plan.a.x,
                    lane: self.lane,
                    speed: plan.jad_speed,
                });
                self.inserted = true;
                self.phase = ControlPhase::HoldJadSpeed;
            } else {
                commands.push(SimCommand::SetSpeed {
                    id: self.vehicle_id,
                    speed: plan.jad_speed,
                });
            }
            commands
        } else if elapsed < plan.duration_ab + plan.duration_bc {
            self.phase = ControlPhase::ReturnToLeaderSpeed;
            vec![SimCommand::SetSpeed {
                id: self.vehicle_id,
                speed: plan.leader_speed,
            }]
        } else {
            self.phase = ControlPhase::Released;
            vec![SimCommand::Release {
                id: self.vehicle_id,
            }]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_data::SpaceTimePoint;

    fn scenario_plan() -> JadPlan {
        // A.t = 100, Duration_AB = 40, Duration_BC = 30.
        JadPlan {
            a: SpaceTimePoint::new(100.0, 1000.0),
            b: SpaceTimePoint::new(140.0, 1600.0),
            c: SpaceTimePoint::new(170.0, 2300.0),
            d: SpaceTimePoint::new(200.0, 2400.0),
            e: SpaceTimePoint::new(140.0, 7000.0),
            f: SpaceTimePoint::new(100.0, 7000.0),
            duration_ab: 40,
            duration_bc: 30,
            p1: SpaceTimePoint::new(1660.0, 500.0),
            p2: SpaceTimePoint::new(1700.0, 500.0),
            p3: SpaceTimePoint::new(1690.0, 400.0),
            jad_speed: 15.0,
            wave_speed: -15.0 / 3.6,
            leader_speed: 25.0,
            wave_min_speed: 2.0,
        }
    }

    #[test]
    fn command_windows_match_the_plan_durations() {
        let plan = scenario_plan();
        let mut controller = VehicleController::new(7, 0);

        for step in 0..250 {
            let commands = controller.on_step(step, &plan);
            match step {
                s if s < 100 => assert!(commands.is_empty(), "step {s}"),
                100 => assert_eq!(
                    commands,
                    vec![SimCommand::Insert {
                        id: 7,
                        position: 1000.0,
                        lane: 0,
                        speed: 15.0,
                    }]
                ),
                s if s < 140 => assert_eq!(
                    commands,
                    vec![SimCommand::SetSpeed { id: 7, speed: 15.0 }],
                    "step {s}"
                ),
                s if s < 170 => assert_eq!(
                    commands,
                    vec![SimCommand::SetSpeed { id: 7, speed: 25.0 }],
                    "step {s}"
                ),
                170 => assert_eq!(commands, vec![SimCommand::Release { id: 7 }]),
                s => assert!(commands.is_empty(), "step {s}"),
            }
        }
        assert_eq!(controller.phase(), ControlPhase::Released);
    }

    #[test]
    fn repeated_call_with_the_same_step_does_not_reinsert() {
        let plan = scenario_plan();
        let mut controller = VehicleController::new(7, 0);
        let first = controller.on_step(100, &plan);
        assert!(matches!(first[0], SimCommand::Insert { .. }));
        let again = controller.on_step(100, &plan);
        assert_eq!(again, vec![SimCommand::SetSpeed { id: 7, speed: 15.0 }]);
    }

    #[test]
    fn refuses_inconsistent_plan() {
        let mut plan = scenario_plan();
        plan.duration_bc = 0;
        let mut controller = VehicleController::new(7, 0);
        for step in 90..200 {
            assert!(controller.on_step(step, &plan).is_empty());
        }
        assert_eq!(controller.phase(), ControlPhase::PreInsertion);
    }

    #[test]
    fn refuses_plan_with_reversed_ordering() {
        let mut plan = scenario_plan();
        plan.b = SpaceTimePoint::new(90.0, 1600.0);
        let mut controller = VehicleController::new(7, 0);
        assert!(controller.on_step(100, &plan).is_empty());
    }
}
