//
// Copyright (c) Memfault, Inc.
// See License.txt for details
//! Envsensord Test Utils
//!
//! A collection of useful structs and functions for unit testing.
//!
use rstest::fixture;

mod fake_i2c;
mod synthetic_sensor;
mod test_instant;

pub use fake_i2c::{FakeI2c, NoDelay};
pub use synthetic_sensor::SyntheticSensor;
pub use test_instant::TestInstant;

#[fixture]
/// Simple fixture to add to a test when you want the logger to work.
pub fn setup_logger() {
    let _ = stderrlog::new().module("envsensord").verbosity(10).init();
}
