//! Study configuration for pulsebench
//!
//! This crate provides configuration loading and parsing for the `pulsebench` tool:
//! - TOML study file parsing
//! - Study structures holding named pulses, base BER parameters, sweeps and output settings

pub mod study_config;
pub mod toml_config;

pub use study_config::*;
pub use toml_config::*;
