//
// Copyright (c) Memfault, Inc.
// See License.txt for details
//! Registry of the supported light sensor models.
use std::str::FromStr;

use eyre::Result;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{Display, EnumIter, EnumString};

use crate::i2c::{open_bus, StdDelay};
use crate::lightsensor::{ConfigurationError, LightSensor};

mod tsl2591;
pub use tsl2591::Tsl2591;

mod veml6075;
pub use veml6075::Veml6075;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum LightSensorDriver {
    /// ams TSL2591 visible and infrared light sensor with lux output.
    #[strum(serialize = "TSL2591")]
    Tsl2591,
    /// Vishay VEML6075 UVA and UVB sensor with UV index output.
    #[strum(serialize = "VEML6075")]
    Veml6075,
}

impl LightSensorDriver {
    /// Resolve a driver from a part number as printed on the package or in
    /// the datasheet, ignoring case, dashes, underscores and spaces.
    pub fn from_part_number(part_number: &str) -> Result<Self, ConfigurationError> {
        let sanitized: String = part_number
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();
        Self::from_str(&sanitized)
            .map_err(|_| ConfigurationError::UnknownDriver(part_number.to_string()))
    }

    /// Bus address used when none is configured.
    pub fn default_address(&self) -> u8 {
        match self {
            LightSensorDriver::Tsl2591 => tsl2591::DEFAULT_ADDRESS,
            LightSensorDriver::Veml6075 => veml6075::DEFAULT_ADDRESS,
        }
    }
}

impl Serialize for LightSensorDriver {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LightSensorDriver {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let part_number = String::deserialize(deserializer)?;
        Self::from_part_number(&part_number).map_err(serde::de::Error::custom)
    }
}

/// Creates sensor drivers for a bus.
#[cfg_attr(test, mockall::automock)]
pub trait SensorFactory {
    fn open(
        &self,
        driver: LightSensorDriver,
        bus: &str,
        address: Option<u8>,
    ) -> Result<Box<dyn LightSensor + Send>>;
}

/// Opens sensors on the Linux i2c-dev adapters.
pub struct LinuxSensorFactory;

impl SensorFactory for LinuxSensorFactory {
    fn open(
        &self,
        driver: LightSensorDriver,
        bus: &str,
        address: Option<u8>,
    ) -> Result<Box<dyn LightSensor + Send>> {
        let i2c = open_bus(bus)?;
        let address = address.unwrap_or_else(|| driver.default_address());
        Ok(match driver {
            LightSensorDriver::Tsl2591 => Box::new(Tsl2591::new(i2c, StdDelay, address)?),
            LightSensorDriver::Veml6075 => Box::new(Veml6075::new(i2c, StdDelay, address)?),
        })
    }
}
