// wave_detector.rs

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::shared_data::VehicleSnapshot;

/// A completed stop-and-go wave observed at a fixed location.
/// Immutable once emitted; `duration` always satisfies the minimum-duration
/// criterion, shorter dips are discarded as braking noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopAndGoEvent {
    pub location: f64,
    pub t_start: u64,
    pub t_end: u64,
    pub duration: u64,
    pub v_start: f64,
    pub v_end: f64,
    pub v_min: f64,
    pub v_mean: f64,
}

/// One row of the detector log: a vehicle observed at the cross-section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorRecord {
    pub step: u64,
    pub vehicle: u64,
    pub position: f64,
    pub speed: f64,
}

/// Tracking state for one vehicle currently inside a low-speed dip.
#[derive(Debug, Clone)]
struct PerVehicleWaveState {
    entry_step: u64,
    entry_speed: f64,
    last_speed: f64,
    min_speed: f64,
    speed_sum: f64,
    samples: u64,
}

/// Watches one fixed road location for stop-and-go waves.
///
/// Each step, every vehicle within `DETECTION_RANGE` of the location is
/// recorded; a vehicle whose speed is at/below `max_speed` enters a tracked
/// dip, and the dip closes when the speed recovers, the vehicle leaves the
/// window, or the run ends. Closed dips at least `min_duration` long become
/// `StopAndGoEvent`s.
pub struct WaveDetector {
    location: f64,
    range: f64,
    max_speed: f64,
    min_duration: u64,
    states: HashMap<u64, PerVehicleWaveState>,
    records: Vec<DetectorRecord>,
}

impl WaveDetector {
    pub fn new(location: f64, range: f64, max_speed: f64, min_duration: u64) -> Self {
        Self {
            location,
            range,
            max_speed,
            min_duration,
            states: HashMap::new(),
            records: Vec::new(),
        }
    }

    pub fn location(&self) -> f64 {
        self.location
    }

    /// Per-vehicle-step observations at this location, for the detector CSV.
    pub fn records(&self) -> &[DetectorRecord] {
        &self.records
    }

    /// Consume one step of snapshots; returns the stop-and-go events that
    /// completed this step. Touches nothing but its own state.
    pub fn observe(&mut self, step: u64, snapshots: &[VehicleSnapshot]) -> Vec<StopAndGoEvent> {
        let mut events = Vec::new();
        let mut in_range: HashSet<u64> = HashSet::new();

        for snap in snapshots {
            if (snap.position - self.location).abs() > self.range {
                continue;
            }
            in_range.insert(snap.id);
            self.records.push(DetectorRecord {
                step,
                vehicle: snap.id,
                position: snap.position,
                speed: snap.speed,
            });

            if self.states.contains_key(&snap.id) {
                if snap.speed > self.max_speed {
                    // Speed recovered; the dip ends at this step.
                    if let Some(state) = self.states.remove(&snap.id) {
                        if let Some(event) = self.close_state(&state, step, snap.speed) {
                            events.push(event);
                        }
                    }
                } else if let Some(state) = self.states.get_mut(&snap.id) {
                    state.last_speed = snap.speed;
                    state.min_speed = state.min_speed.min(snap.speed);
                    state.speed_sum += snap.speed;
                    state.samples += 1;
                }
            } else if snap.speed <= self.max_speed {
                self.states.insert(
                    snap.id,
                    PerVehicleWaveState {
                        entry_step: step,
                        entry_speed: snap.speed,
                        last_speed: snap.speed,
                        min_speed: snap.speed,
                        speed_sum: snap.speed,
                        samples: 1,
                    },
                );
            }
        }

        // Evict entries for vehicles that left the window or the simulation;
        // their dip ends at this step with the last speed seen.
        let gone: Vec<u64> = self
            .states
            .keys()
            .filter(|id| !in_range.contains(id))
            .copied()
            .collect();
        for id in gone {
            if let Some(state) = self.states.remove(&id) {
                let v_end = state.last_speed;
                if let Some(event) = self.close_state(&state, step, v_end) {
                    events.push(event);
                }
            }
        }

        events
    }

    /// Flush every open dip at the end of the run.
    pub fn finish(&mut self, end_step: u64) -> Vec<StopAndGoEvent> {
        let mut events = Vec::new();
        let states: Vec<PerVehicleWaveState> = self.states.drain().map(|(_, s)| s).collect();
        for state in states {
            let v_end = state.last_speed;
            if let Some(event) = self.close_state(&state, end_step, v_end) {
                events.push(event);
            }
        }
        events
    }

    fn close_state(
        &self,
        state: &PerVehicleWaveState,
        t_end: u64,
        v_end: f64,
    ) -> Option<StopAndGoEvent> {
        let duration = t_end.saturating_sub(state.entry_step);
        if duration < self.min_duration {
            log::debug!(
                "discarding {} s dip at {} m (minimum {} s)",
                duration,
                self.location,
                self.min_duration
            );
            return None;
        }
        Some(StopAndGoEvent {
            location: self.location,
            t_start: state.entry_step,
            t_end,
            duration,
            v_start: state.entry_speed,
            v_end,
            v_min: state.min_speed,
            v_mean: state.speed_sum / state.samples as f64,
        })
    }
}
