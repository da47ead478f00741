// control/mod.rs
pub mod vehicle_controller;
