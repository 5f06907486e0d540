pub mod board;
pub mod config;
pub mod errors;
pub mod relay;
pub mod telemetry;
