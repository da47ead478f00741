// insertion_monitor.rs

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::global_variables::MIN_LEADER_SPEED;
use crate::shared_data::VehicleSnapshot;

/// A gap at the ramp wide enough to merge the controlled vehicle behind
/// `leader_id`. Valid only at the step it was computed; superseded each step
/// until the planner consumes one.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertionOpportunity {
    pub step: u64,
    pub position: f64,
    pub leader_id: u64,
    pub leader_speed: f64,
}

/// Watches the ramp cross-section for insertion opportunities.
///
/// A candidate leader is a vehicle crossing the ramp position this step. Its
/// time headway is the spatial gap to the nearest vehicle ahead in the same
/// lane divided by its own speed; an opportunity is reported only when that
/// headway reaches the configured threshold.
pub struct InsertionMonitor {
    ramp_position: f64,
    headway_threshold: f64,
    last_positions: HashMap<u64, f64>,
}

impl InsertionMonitor {
    pub fn new(ramp_position: f64, headway_threshold: f64) -> Self {
        Self {
            ramp_position,
            headway_threshold,
            last_positions: HashMap::new(),
        }
    }

    pub fn check(&mut self, step: u64, snapshots: &[VehicleSnapshot]) -> Option<InsertionOpportunity> {
        let mut opportunity = None;

        for snap in snapshots {
            let previous = self.last_positions.insert(snap.id, snap.position);
            let crossed = matches!(previous, Some(p) if p < self.ramp_position)
                && snap.position >= self.ramp_position;
            if !crossed {
                continue;
            }
            if snap.speed < MIN_LEADER_SPEED {
                // Standing traffic; the headway is undefined.
                continue;
            }

            let ahead = snapshots
                .iter()
                .filter(|other| {
                    other.id != snap.id
                        && other.lane == snap.lane
                        && other.position > snap.position
                })
                .min_by(|a, b| {
                    a.position
                        .partial_cmp(&b.position)
                        .unwrap_or(Ordering::Equal)
                });
            let Some(ahead) = ahead else {
                continue;
            };

            let headway = (ahead.position - snap.position) / snap.speed;
            if headway >= self.headway_threshold {
                log::info!(
                    "insertion opportunity at step {}: leader {} at {:.1} m, headway {:.2} s",
                    step,
                    snap.id,
                    snap.position,
                    headway
                );
                opportunity = Some(InsertionOpportunity {
                    step,
                    position: self.ramp_position,
                    leader_id: snap.id,
                    leader_speed: snap.speed,
                });
            }
        }

        // Drop bookkeeping for vehicles that left the simulation.
        let current: std::collections::HashSet<u64> = snapshots.iter().map(|s| s.id).collect();
        self.last_positions.retain(|id, _| current.contains(id));

        opportunity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(id: u64, position: f64, speed: f64) -> VehicleSnapshot {
        VehicleSnapshot {
            id,
            position,
            lane: 0,
            speed,
        }
    }

    #[test]
    fn reports_opportunity_when_headway_meets_threshold() {
        let mut monitor = InsertionMonitor::new(1000.0, 3.0);
        // Leader at 20 m/s, vehicle ahead 100 m further: headway 5 s.
        assert!(monitor
            .check(10, &[snap(1, 990.0, 20.0), snap(2, 1090.0, 20.0)])
            .is_none());
        let opportunity = monitor
            .check(11, &[snap(1, 1010.0, 20.0), snap(2, 1110.0, 20.0)])
            .expect("opportunity");
        assert_eq!(opportunity.step, 11);
        assert_eq!(opportunity.leader_id, 1);
        assert_eq!(opportunity.leader_speed, 20.0);
        assert_eq!(opportunity.position, 1000.0);
    }

    #[test]
    fn headway_below_threshold_is_rejected() {
        let mut monitor = InsertionMonitor::new(1000.0, 3.0);
        // Gap 50 m at 20 m/s: headway 2.5 s.
        monitor.check(10, &[snap(1, 990.0, 20.0), snap(2, 1060.0, 20.0)]);
        assert!(monitor
            .check(11, &[snap(1, 1010.0, 20.0), snap(2, 1080.0, 20.0)])
            .is_none());
    }

    #[test]
    fn headway_exactly_at_threshold_is_accepted() {
        let mut monitor = InsertionMonitor::new(1000.0, 3.0);
        // Gap 60 m at 20 m/s: headway exactly 3 s.
        monitor.check(10, &[snap(1, 990.0, 20.0), snap(2, 1050.0, 20.0)]);
        assert!(monitor
            .check(11, &[snap(1, 1010.0, 20.0), snap(2, 1070.0, 20.0)])
            .is_some());
    }

    #[test]
    fn near_zero_leader_speed_yields_no_opportunity() {
        let mut monitor = InsertionMonitor::new(1000.0, 3.0);
        monitor.check(10, &[snap(1, 999.9, 0.05), snap(2, 1500.0, 20.0)]);
        assert!(monitor
            .check(11, &[snap(1, 1000.1, 0.05), snap(2, 1520.0, 20.0)])
            .is_none());
    }

    #[test]
    fn no_crossing_means_no_opportunity() {
        let mut monitor = InsertionMonitor::new(1000.0, 3.0);
        // Vehicle already past the ramp on first sight: no crossing observed.
        assert!(monitor
            .check(10, &[snap(1, 1200.0, 20.0), snap(2, 1400.0, 20.0)])
            .is_none());
        assert!(monitor
            .check(11, &[snap(1, 1220.0, 20.0), snap(2, 1420.0, 20.0)])
            .is_none());
    }

    #[test]
    fn vehicles_ahead_in_other_lanes_are_ignored() {
        let mut monitor = InsertionMonitor::new(1000.0, 3.0);
        let mut other_lane = snap(2, 1030.0, 20.0);
        other_lane.lane = 1;
        monitor.check(10, &[snap(1, 990.0, 20.0), other_lane.clone(), snap(3, 1200.0, 20.0)]);
        let mut other_lane_next = other_lane.clone();
        other_lane_next.position = 1050.0;
        let opportunity = monitor
            .check(11, &[snap(1, 1010.0, 20.0), other_lane_next, snap(3, 1220.0, 20.0)])
            .expect("opportunity");
        // Gap measured to vehicle 3 (same lane), not the closer one in lane 1.
        assert_eq!(opportunity.leader_id, 1);
    }
}
