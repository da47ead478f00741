// monitoring/mod.rs
pub mod run_logs;
