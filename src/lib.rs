//! Grid transient simulation driver.
//!
//! Redistributes bulk transfer changes over a generator fleet (local area
//! first, then the rest of the system) and schedules timed disturbances
//! against a dynamic simulation engine.

#[cfg(feature = "api")]
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod logging;
pub mod model;
pub mod runner;
/// Allocation, event scheduling, session sequencing, and run summaries.
pub mod sim;
