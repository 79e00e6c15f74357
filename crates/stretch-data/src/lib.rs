//! Data layer for the stretching tools.
//!
//! Reads per-pair stretching results, coefficient matrices, forcing station
//! files and the PGV event list from a processing project, and averages them
//! into date-indexed series.

pub mod averager;
pub mod forcing;
pub mod pgv;
pub mod reader;
pub mod store;
pub mod table;

pub use stretch_core as core;
