// src/shared_data.rs

use serde::{Deserialize, Serialize};

/// One vehicle observed at one simulation step.
/// Produced fresh every step; nothing outside the detectors keeps it longer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id: u64,
    /// Road-longitudinal position in meters.
    pub position: f64,
    pub lane: u8,
    /// Instantaneous speed in m/s.
    pub speed: f64,
}

/// A point in the time-position plane (t in seconds/steps, x in meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpaceTimePoint {
    pub t: f64,
    pub x: f64,
}

impl SpaceTimePoint {
    pub fn new(t: f64, x: f64) -> Self {
        Self { t, x }
    }
}

/// Commands issued toward the simulator by the session.
/// The glue loop applies them; the core components never touch the simulator.
#[derive(Debug, Clone, PartialEq)]
pub enum SimCommand {
    /// Inject a new vehicle at the given location with an initial commanded speed.
    Insert {
        id: u64,
        position: f64,
        lane: u8,
        speed: f64,
    },
    /// Override a vehicle's target speed for the current step.
    SetSpeed { id: u64, speed: f64 },
    /// Hand the vehicle back to default (uncontrolled) behavior.
    Release { id: u64 },
}

pub fn kmh_to_ms(kmh: f64) -> f64 {
    kmh / 3.6
}

pub fn ms_to_kmh(ms: f64) -> f64 {
    ms * 3.6
}
