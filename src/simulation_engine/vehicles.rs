// vehicles.rs

use crate::shared_data::VehicleSnapshot;

/// A vehicle in the single-lane road simulation.
#[derive(Debug, Clone)]
pub struct SimVehicle {
    pub id: u64,
    /// Road-longitudinal position of the front bumper (m).
    pub position: f64,
    pub speed: f64,
    /// Free-flow target speed under car following (m/s).
    pub desired_speed: f64,
    pub lane: u8,
    pub length: f64,
    /// Externally commanded speed; caps car following while set.
    pub commanded_speed: Option<f64>,
}

impl SimVehicle {
    pub fn new(id: u64, position: f64, speed: f64, desired_speed: f64, lane: u8) -> Self {
        Self {
            id,
            position,
            speed,
            desired_speed,
            lane,
            length: 4.5,
            commanded_speed: None,
        }
    }

    pub fn snapshot(&self) -> VehicleSnapshot {
        VehicleSnapshot {
            id: self.id,
            position: self.position,
            lane: self.lane,
            speed: self.speed,
        }
    }
}
