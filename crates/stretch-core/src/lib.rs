//! Core types for the stretching dv/v tools: errors, project configuration,
//! the default-stations table, command-line settings, filter and pair
//! resolution, and small numeric and date helpers.

pub mod config;
pub mod error;
pub mod filters;
pub mod pairs;
pub mod settings;
pub mod stations;
pub mod stats;
pub mod time_utils;

pub use error::{Result, StretchError};
