//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::fs;
use std::path::Path;
use std::time::Duration;

use eyre::{eyre, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::i2c::bus_number;
use crate::lightsensor::{
    drivers::LightSensorDriver, AutoRangeConfig, ConfigurationError, LogOptions,
};
use crate::util::serialization::*;
use crate::util::string;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EnvsensordConfig {
    #[serde(rename = "interval_seconds", with = "seconds_to_duration")]
    pub interval: Duration,
    pub hostname: Option<String>,
    pub light_sensors: Vec<LightSensorConfig>,
}

/// One sensor model at one address, on every listed bus.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LightSensorConfig {
    pub driver: LightSensorDriver,
    pub buses: Vec<String>,
    /// Defaults to the address of the driver.
    #[serde(default, with = "optional_integer_expression")]
    pub address: Option<u8>,
    #[serde(default = "default_true")]
    pub log_radiometric: bool,
    #[serde(default = "default_true")]
    pub log_perceptive: bool,
    #[serde(default)]
    pub log_saturation: bool,
    #[serde(default)]
    pub log_integration_time: bool,
    #[serde(default)]
    pub log_analog_gain: bool,
    #[serde(default)]
    pub log_total_gain: bool,
    pub max_integration_time: Option<f64>,
    #[serde(default = "default_gain_margin")]
    pub gain_margin: f64,
    #[serde(default = "default_max_saturation")]
    pub max_saturation: f64,
    pub analog_gain: Option<f64>,
    pub integration_time: Option<f64>,
}

fn default_true() -> bool {
    true
}

fn default_gain_margin() -> f64 {
    AutoRangeConfig::default().gain_margin
}

fn default_max_saturation() -> f64 {
    AutoRangeConfig::default().max_saturation
}

/// Largest 7-bit I2C address.
const MAX_ADDRESS: u8 = 0x7f;

impl LightSensorConfig {
    /// Check values that the JSON types alone do not constrain.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.buses.is_empty() {
            return Err(ConfigurationError::InvalidOption {
                name: "buses",
                reason: "at least one bus is required".to_string(),
            });
        }
        for bus in &self.buses {
            bus_number(bus)?;
        }
        if let Some(address) = self.address {
            if address > MAX_ADDRESS {
                return Err(ConfigurationError::InvalidOption {
                    name: "address",
                    reason: format!("{:#04x} is not a 7-bit address", address),
                });
            }
        }
        if !(self.gain_margin.is_finite() && self.gain_margin >= 0.0) {
            return Err(ConfigurationError::InvalidOption {
                name: "gain_margin",
                reason: format!("{} is not a non-negative number", self.gain_margin),
            });
        }
        if !(0.0..=1.0).contains(&self.max_saturation) {
            return Err(ConfigurationError::InvalidOption {
                name: "max_saturation",
                reason: format!("{} is not a fraction", self.max_saturation),
            });
        }
        for (name, value) in [
            ("max_integration_time", self.max_integration_time),
            ("analog_gain", self.analog_gain),
            ("integration_time", self.integration_time),
        ] {
            if let Some(value) = value {
                if !(value.is_finite() && value > 0.0) {
                    return Err(ConfigurationError::InvalidOption {
                        name,
                        reason: format!("{} is not a positive number", value),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn auto_range(&self) -> AutoRangeConfig {
        AutoRangeConfig {
            analog_gain: self.analog_gain,
            integration_time: self.integration_time,
            max_integration_time: self.max_integration_time,
            gain_margin: self.gain_margin,
            max_saturation: self.max_saturation,
        }
    }

    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            radiometric: self.log_radiometric,
            perceptive: self.log_perceptive,
            saturation: self.log_saturation,
            integration_time: self.log_integration_time,
            analog_gain: self.log_analog_gain,
            total_gain: self.log_total_gain,
        }
    }
}

impl EnvsensordConfig {
    pub const DEFAULT_CONFIG_PATH: &'static str = "/etc/envsensord.conf";

    /// Load the built-in configuration merged with the user configuration.
    ///
    /// Without an explicit path the default file is used if it exists.
    pub fn load(config_path: Option<&Path>) -> Result<EnvsensordConfig> {
        let mut config = Self::parse(include_str!("../../builtin.conf"))?;

        let user_config_path = match config_path {
            Some(path) => Some(path),
            None => {
                let path = Path::new(Self::DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Some(path)
                } else {
                    debug!("No configuration file at {}", path.display());
                    None
                }
            }
        };
        if let Some(path) = user_config_path {
            let user_config = fs::read_to_string(path)
                .wrap_err_with(|| format!("Unable to read {}", path.display()))
                .and_then(|s| Self::parse(&s))?;
            Self::merge_into(&mut config, user_config);
        }

        let config: EnvsensordConfig =
            serde_json::from_value(config).wrap_err("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(eyre!("interval_seconds must be positive"));
        }
        for (index, sensor) in self.light_sensors.iter().enumerate() {
            sensor
                .validate()
                .wrap_err_with(|| format!("Invalid light_sensors[{}] ({})", index, sensor.driver))?;
        }
        Ok(())
    }

    /// Parse a JSON configuration with optional C-style comments.
    fn parse(config_string: &str) -> Result<Value> {
        let json_text = string::remove_comments(config_string);
        let json: Value = serde_json::from_str(json_text.as_str())?;
        if !json.is_object() {
            return Err(eyre!("Configuration should be a JSON object."));
        }
        Ok(json)
    }

    /// Merge `src` into `dest`, recursing into objects. Any other value of
    /// `src`, arrays included, replaces the one in `dest`.
    fn merge_into(dest: &mut Value, src: Value) {
        let Value::Object(src_map) = src else {
            return;
        };
        for (key, value) in src_map {
            if let Some(existing) = dest.get_mut(&key) {
                if existing.is_object() && value.is_object() {
                    Self::merge_into(existing, value);
                    continue;
                }
            }
            dest[&key] = value;
        }
    }
}
