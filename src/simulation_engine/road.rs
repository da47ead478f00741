// road.rs

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::global_variables::STEP_LENGTH;
use crate::shared_data::{SimCommand, VehicleSnapshot};
use crate::simulation_engine::vehicles::SimVehicle;

// Single-lane road geometry (m).
const ROAD_LENGTH: f64 = 8000.0;
// Car-following parameters.
const MAX_ACCEL: f64 = 1.5; // m/s^2
const MIN_GAP: f64 = 2.0; // m
// Lead-vehicle braking disturbance that seeds the stop-and-go wave.
const BRAKE_TRIGGER_POSITION: f64 = 7050.0;
const BRAKE_HOLD_STEPS: u64 = 60;
const CRAWL_SPEED: f64 = 1.5; // m/s

#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("vehicle {0} not found")]
    VehicleNotFound(u64),
}

/// Minimal single-lane longitudinal traffic simulation. Stands in for the
/// external microscopic simulator: it supplies per-step snapshots and accepts
/// insert / set-speed / release commands.
///
/// Vehicles follow a safe-gap rule with bounded acceleration; the first
/// spawned vehicle brakes hard once it passes the downstream section, seeding
/// the wave the detectors observe.
pub struct RoadSimulation {
    vehicles: Vec<SimVehicle>,
    rng: SmallRng,
    next_id: u64,
    steps_until_spawn: u64,
    brake_target: Option<u64>,
    brake_until: Option<u64>,
    brake_done: bool,
}

impl RoadSimulation {
    pub fn new(seed: u64) -> Self {
        Self {
            vehicles: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
            next_id: 1,
            steps_until_spawn: 0,
            brake_target: None,
            brake_until: None,
            brake_done: false,
        }
    }

    pub fn snapshots(&self) -> Vec<VehicleSnapshot> {
        self.vehicles.iter().map(|v| v.snapshot()).collect()
    }

    /// Advance the road by one step.
    pub fn step(&mut self, step: u64) {
        self.update_disturbance(step);

        // New speeds from the previous state, front to back.
        let mut new_speeds = Vec::with_capacity(self.vehicles.len());
        for (index, vehicle) in self.vehicles.iter().enumerate() {
            let mut target = vehicle
                .commanded_speed
                .unwrap_or(vehicle.desired_speed)
                .min(vehicle.speed + MAX_ACCEL * STEP_LENGTH);
            if self.is_braking(vehicle.id) {
                target = target.min(CRAWL_SPEED);
            }
            // Safe speed: never close more than the available gap this step.
            if index > 0 {
                let leader = &self.vehicles[index - 1];
                let gap = leader.position - leader.length - vehicle.position;
                target = target.min(((gap - MIN_GAP) / STEP_LENGTH).max(0.0));
            }
            new_speeds.push(target.max(0.0));
        }
        for (vehicle, speed) in self.vehicles.iter_mut().zip(new_speeds) {
            vehicle.speed = speed;
            vehicle.position += speed * STEP_LENGTH;
        }

        self.vehicles.retain(|v| v.position <= ROAD_LENGTH);
        self.spawn(step);
        self.vehicles
            .sort_by(|a, b| b.position.total_cmp(&a.position));
    }

    /// Apply a session command. Failures are not retried; they end the run.
    pub fn apply(&mut self, command: &SimCommand) -> Result<(), SimError> {
        match command {
            SimCommand::Insert {
                id,
                position,
                lane,
                speed,
            } => {
                let mut vehicle = SimVehicle::new(*id, *position, *speed, *speed, *lane);
                vehicle.commanded_speed = Some(*speed);
                self.vehicles.push(vehicle);
                self.vehicles
                    .sort_by(|a, b| b.position.total_cmp(&a.position));
                Ok(())
            }
            SimCommand::SetSpeed { id, speed } => {
                let vehicle = self
                    .vehicles
                    .iter_mut()
                    .find(|v| v.id == *id)
                    .ok_or(SimError::VehicleNotFound(*id))?;
                vehicle.commanded_speed = Some(*speed);
                Ok(())
            }
            SimCommand::Release { id } => {
                let vehicle = self
                    .vehicles
                    .iter_mut()
                    .find(|v| v.id == *id)
                    .ok_or(SimError::VehicleNotFound(*id))?;
                vehicle.commanded_speed = None;
                // Uncontrolled again: resume the ambient free-flow target.
                vehicle.desired_speed = self.rng.random_range(22.0..28.0);
                Ok(())
            }
        }
    }

    fn spawn(&mut self, step: u64) {
        if self.steps_until_spawn > 0 {
            self.steps_until_spawn -= 1;
            return;
        }
        // Entry must be clear enough that the newcomer is not born colliding.
        let entry_blocked = self
            .vehicles
            .iter()
            .any(|v| v.position - v.length < MIN_GAP + 20.0);
        if !entry_blocked {
            let desired = self.rng.random_range(22.0..28.0);
            let vehicle = SimVehicle::new(self.next_id, 0.0, desired, desired, 0);
            if self.brake_target.is_none() {
                self.brake_target = Some(vehicle.id);
                log::info!("vehicle {} will carry the braking disturbance", vehicle.id);
            }
            self.vehicles.push(vehicle);
            self.next_id += 1;
            log::debug!("spawned vehicle {} at step {}", self.next_id - 1, step);
        }
        self.steps_until_spawn = self.rng.random_range(2..5);
    }

    fn update_disturbance(&mut self, step: u64) {
        if self.brake_done {
            return;
        }
        if let Some(until) = self.brake_until {
            if step >= until {
                self.brake_done = true;
                self.brake_until = None;
                println!("Lead vehicle released after braking disturbance at step {step}.");
            }
            return;
        }
        let Some(target) = self.brake_target else {
            return;
        };
        let triggered = self
            .vehicles
            .iter()
            .any(|v| v.id == target && v.position >= BRAKE_TRIGGER_POSITION);
        if triggered {
            self.brake_until = Some(step + BRAKE_HOLD_STEPS);
            println!(
                "Lead vehicle {target} braking to {CRAWL_SPEED} m/s at step {step} for {BRAKE_HOLD_STEPS} steps."
            );
        }
    }

    fn is_braking(&self, id: u64) -> bool {
        self.brake_until.is_some() && self.brake_target == Some(id)
    }
}
