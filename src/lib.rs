//! Station trend output store.
//!
//! Writes, retains and verifies the flat-file artifact trees produced by
//! per-station trend runs: station metadata, per-station observed and model
//! series, trend-window series and aggregated trend tables.

pub mod analysis;
pub mod config;
pub mod logging;
pub mod model;
pub mod periods;
pub mod retention;
pub mod store;
pub mod trends;
pub mod variables;
pub mod verify;
