//! Weekly lab roster generation.
//!
//! Staff declare which of the three daily shifts they can work on each
//! weekday. The generator fills three labs per shift for every weekday of a
//! date range, keeping people in one lab across the day where it can, then
//! runs a bounded balancing pass that moves slots from the most loaded staff
//! to the least loaded ones.
//!
//! - [`parser`] reads availability CSVs
//! - [`schedule`] holds the assignment engine, the ledger and the balancer
//! - [`display`] renders the result as rows, CSV or JSON
//! - [`config`] loads the optional TOML configuration
//! - [`web`] serves the latest schedule and accepts availability uploads

pub mod calendar;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod parser;
pub mod schedule;
pub mod web;

pub use error::{Result, RosterError};
