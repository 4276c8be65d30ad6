//! Core utilities for pulsebench
//!
//! This crate provides fundamental types and utilities used across the workspace:
//! - BerError, the error kinds raised by pulse construction and BER evaluation
//! - PowerRatio for SNR/SIR values given in dB or linear scale
//! - Gaussian tail, Bessel and sinc helpers
//! - AxisGrid for strictly ascending sweep axes
//! - Sample types and logging setup

pub mod axis;
pub mod debug;
pub mod dsp_types;
pub mod error;
pub mod math;
pub mod ratio;

// Re-export commonly used items
pub use axis::AxisGrid;
pub use dsp_types::*;
pub use error::BerError;
pub use ratio::PowerRatio;
