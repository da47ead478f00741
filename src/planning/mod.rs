// planning/mod.rs
pub mod geometry;
pub mod jad_planner;
