//! CLI command implementations.

mod config;
mod doctor;
mod report;

pub use config::run_config;
pub use doctor::run_doctor;
pub use report::run_report;
