// detection/mod.rs
pub mod insertion_monitor;
pub mod wave_detector;
