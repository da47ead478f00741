// jad_simulation.rs

use clap::Parser;
use tokio::time::{sleep, Duration};

use jad_simulation::monitoring::run_logs::{save_run_results, TrajectoryRecord};
use jad_simulation::session::{JadSession, SessionState};
use jad_simulation::shared_data::kmh_to_ms;
use jad_simulation::simulation_engine::road::RoadSimulation;

/// Jam-absorption driving experiment on the built-in single-lane road.
#[derive(Parser, Debug)]
#[command(name = "jad_simulation")]
#[command(after_help = "Examples:\n  jad_simulation 55 0\n  jad_simulation 55 -40\n  jad_simulation 35 0")]
struct Args {
    /// JAD speed in km/h.
    jad_speed_kmh: f64,
    /// Time offset in seconds applied to the wave-tail point E.
    #[arg(allow_hyphen_values = true)]
    et_offset: f64,
    /// Total simulated steps.
    #[arg(long, default_value_t = 1600)]
    end_time: u64,
    /// Random seed for the road simulation.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Pace the loop in real time (100 ms per step).
    #[arg(long)]
    realtime: bool,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();
    println!(
        "JAD_SPEED: {} km/h, Et_OFFSET: {}",
        args.jad_speed_kmh as i64, args.et_offset
    );

    let mut sim = RoadSimulation::new(args.seed);
    let mut session = JadSession::new(kmh_to_ms(args.jad_speed_kmh), args.et_offset);
    let mut trajectory: Vec<TrajectoryRecord> = Vec::new();

    for step in 0..args.end_time {
        sim.step(step);
        let snapshots = sim.snapshots();
        for snapshot in &snapshots {
            trajectory.push(TrajectoryRecord {
                step,
                vehicle: snapshot.id,
                position: snapshot.position,
            });
        }

        let commands = session.on_step(step, &snapshots);
        for command in &commands {
            if let Err(error) = sim.apply(command) {
                eprintln!("Simulator command failed at step {step}: {error}");
                std::process::exit(1);
            }
        }

        if args.realtime {
            sleep(Duration::from_millis(100)).await;
        }
    }
    session.finish(args.end_time);

    if let Some(plan) = session.plan() {
        match serde_json::to_string(plan) {
            Ok(json) => log::info!("final plan: {json}"),
            Err(error) => log::warn!("could not serialize plan: {error}"),
        }
    } else {
        println!("No stop-and-go wave absorbed this run (state: {:?}).", session.state());
    }

    let tag = format!("{}_{}", args.jad_speed_kmh as i64, args.et_offset as i64);
    if let Err(error) = save_run_results(
        &tag,
        session.upstream_records(),
        session.downstream_records(),
        &trajectory,
        session.plan(),
        args.et_offset,
    ) {
        eprintln!("Error saving run results: {error}");
        std::process::exit(1);
    }

    if session.state() == SessionState::Done {
        println!("Maneuver completed.");
    }
    println!("Simulation finished\n");
}
