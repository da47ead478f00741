// simulation_engine/mod.rs
pub mod road;
pub mod vehicles;
