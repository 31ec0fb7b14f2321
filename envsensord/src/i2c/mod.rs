//
// Copyright (c) Memfault, Inc.
// See License.txt for details
//! I2C transport for sensor drivers.
//!
//! Drivers are written against the `embedded-hal` I2C and delay traits. On
//! Linux they talk to the `i2c-dev` character devices (`/dev/i2c-N`), which
//! need the `i2c-dev` kernel module.
use std::path::PathBuf;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use eyre::{Context, Result};
use linux_embedded_hal::I2cdev;
use log::debug;

use crate::lightsensor::ConfigurationError;

mod register_access;
pub use register_access::RegisterAccess;

const BUS_PREFIX: &str = "i2c-";

/// Extract the adapter number from bus names such as "i2c-1".
pub fn bus_number(bus: &str) -> std::result::Result<u32, ConfigurationError> {
    bus.strip_prefix(BUS_PREFIX)
        .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| ConfigurationError::UnsupportedBus(bus.to_string()))
}

/// Open the character device of a bus given by name ("i2c-1").
pub fn open_bus(bus: &str) -> Result<I2cdev> {
    let path = PathBuf::from(format!("/dev/i2c-{}", bus_number(bus)?));
    let i2c = I2cdev::new(&path)
        .wrap_err_with(|| format!("Unable to open I2C device {}", path.display()))?;
    debug!("Opened I2C device {}", path.display());
    Ok(i2c)
}

/// Wait for `duration`, rounded up to the microsecond.
pub fn delay_for(delay: &mut impl DelayNs, duration: Duration) {
    let us = (duration.as_nanos() + 999) / 1000;
    delay.delay_us(u32::try_from(us).unwrap_or(u32::MAX));
}

/// Blocking delay for the settling and integration time of measurements.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}
