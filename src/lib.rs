pub mod analyzer;
pub mod calibration;
pub mod cli;
pub mod git;
pub mod metrics;
pub mod models;
pub mod ordinal;
pub mod score;
pub mod sessions;
pub mod spirals;
pub mod utils;
