// src/lib.rs
pub mod control;
pub mod detection;
pub mod global_variables;
pub mod monitoring;
pub mod planning;
pub mod session;
pub mod shared_data;
pub mod simulation_engine;
