//! Command handlers

pub mod config;
pub mod hosts;
pub mod payments;
pub mod presets;
pub mod reset;
pub mod status;
