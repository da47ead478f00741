// run_logs.rs

use serde::{Deserialize, Serialize};
use std::error::Error;

use crate::detection::wave_detector::DetectorRecord;
use crate::planning::jad_planner::JadPlan;

/// One row of the trajectory log. Speed is reconstructed downstream by
/// finite difference, so only the position is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    pub step: u64,
    pub vehicle: u64,
    pub position: f64,
}

/// The strategy log: one row per run with the six named points, the
/// feasibility triangle and the input parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRecord {
    pub a_t: f64,
    pub a_x: f64,
    pub b_t: f64,
    pub b_x: f64,
    pub c_t: f64,
    pub c_x: f64,
    pub d_t: f64,
    pub d_x: f64,
    pub e_t: f64,
    pub e_x: f64,
    pub f_t: f64,
    pub f_x: f64,
    pub p1_t: f64,
    pub p1_x: f64,
    pub p2_t: f64,
    pub p2_x: f64,
    pub p3_t: f64,
    pub p3_x: f64,
    pub duration_ab: u64,
    pub duration_bc: u64,
    pub jad_speed: f64,
    pub wave_speed: f64,
    pub et_offset: f64,
    pub leader_speed: f64,
    pub wave_min_speed: f64,
}

impl StrategyRecord {
    pub fn from_plan(plan: &JadPlan, et_offset: f64) -> Self {
        Self {
            a_t: plan.a.t,
            a_x: plan.a.x,
            b_t: plan.b.t,
            b_x: plan.b.x,
            c_t: plan.c.t,
            c_x: plan.c.x,
            d_t: plan.d.t,
            d_x: plan.d.x,
            e_t: plan.e.t,
            e_x: plan.e.x,
            f_t: plan.f.t,
            f_x: plan.f.x,
            p1_t: plan.p1.t,
            p1_x: plan.p1.x,
            p2_t: plan.p2.t,
            p2_x: plan.p2.x,
            p3_t: plan.p3.t,
            p3_x: plan.p3.x,
            duration_ab: plan.duration_ab,
            duration_bc: plan.duration_bc,
            jad_speed: plan.jad_speed,
            wave_speed: plan.wave_speed,
            et_offset,
            leader_speed: plan.leader_speed,
            wave_min_speed: plan.wave_min_speed,
        }
    }
}

/// Generic helper to write a batch of records to a CSV file.
pub fn write_csv<T: Serialize>(filename: &str, records: &[T]) -> Result<(), Box<dyn Error>> {
    let mut writer = csv::Writer::from_path(filename)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Persist everything the plotting scripts consume. File names carry the run
/// parameters so sweeps over speed/offset do not clobber each other.
pub fn save_run_results(
    tag: &str,
    upstream: &[DetectorRecord],
    downstream: &[DetectorRecord],
    trajectory: &[TrajectoryRecord],
    plan: Option<&JadPlan>,
    et_offset: f64,
) -> Result<(), Box<dyn Error>> {
    write_csv(&format!("jad_detector_upstream_{tag}.csv"), upstream)?;
    write_csv(&format!("jad_detector_downstream_{tag}.csv"), downstream)?;
    write_csv(&format!("jad_trajectory_{tag}.csv"), trajectory)?;
    if let Some(plan) = plan {
        let record = StrategyRecord::from_plan(plan, et_offset);
        write_csv(&format!("jad_strategy_{tag}.csv"), &[record])?;
    } else {
        log::info!("no plan this run; strategy file not written");
    }
    Ok(())
}
