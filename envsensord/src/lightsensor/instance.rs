//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::time::Duration;

use chrono::{DateTime, Utc};
use eyre::Result;
use itertools::Itertools;
use log::{debug, info};

use super::drivers::LightSensorDriver;
use super::{
    AutoRangeConfig, AutoRangeController, ConfigurationError, LightSensor, MeasurementResult,
};
use crate::metrics::ValueList;

pub const PLUGIN_NAME: &str = "envsensor";

/// Which values of a sensor are reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogOptions {
    pub radiometric: bool,
    pub perceptive: bool,
    pub saturation: bool,
    pub integration_time: bool,
    pub analog_gain: bool,
    pub total_gain: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            radiometric: true,
            perceptive: true,
            saturation: false,
            integration_time: false,
            analog_gain: false,
            total_gain: false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct ChannelInfo {
    radiometric: bool,
    /// Integration time of the group's total gain 1 setting.
    baseline_integration_time: f64,
}

/// One sensor on one bus, turning measurements into value lists.
pub struct LightSensorInstance {
    controller: AutoRangeController<Box<dyn LightSensor + Send>>,
    driver: LightSensorDriver,
    bus: String,
    log: LogOptions,
    channels: HashMap<String, ChannelInfo>,
}

impl LightSensorInstance {
    pub fn new(
        driver: LightSensorDriver,
        bus: &str,
        sensor: Box<dyn LightSensor + Send>,
        auto_range: AutoRangeConfig,
        log: LogOptions,
    ) -> Result<Self, ConfigurationError> {
        let mut channels = HashMap::new();
        for group in sensor.channel_modes() {
            let baseline_integration_time = group
                .gain_table
                .get(1)
                .map(|setting| setting.integration_time)
                .ok_or_else(|| ConfigurationError::MissingBaseline {
                    group: group.name().to_string(),
                })?;
            for channel in &group.channels {
                channels.insert(
                    channel.name.clone(),
                    ChannelInfo {
                        radiometric: channel.radiometric,
                        baseline_integration_time,
                    },
                );
            }
        }

        let controller = AutoRangeController::new(sensor, auto_range)?;
        let instance = Self {
            controller,
            driver,
            bus: bus.to_string(),
            log,
            channels,
        };
        for group in instance.controller.channel_groups() {
            info!(
                "{}, permitted settings of {:?}: {}",
                instance,
                group.channel_names().collect::<Vec<_>>(),
                group
                    .gain_table
                    .iter()
                    .map(|(total_gain, s)| format!(
                        "{}:({}, {}s)",
                        total_gain, s.analog_gain, s.integration_time
                    ))
                    .join(" ")
            );
        }
        Ok(instance)
    }

    pub fn driver(&self) -> LightSensorDriver {
        self.driver
    }

    pub fn bus(&self) -> &str {
        &self.bus
    }

    /// Measure all channels and describe the results as value lists of the
    /// `envsensor` plugin.
    pub fn value_lists(
        &mut self,
        host: &str,
        time: DateTime<Utc>,
        interval: Duration,
    ) -> Result<Vec<ValueList>> {
        let readings = self.controller.measure()?;

        let mut value_lists = Vec::new();
        let mut push = |plugin_instance: String, type_str: &str, type_instance: String, value| {
            value_lists.push(ValueList {
                host: host.to_string(),
                plugin: PLUGIN_NAME.to_string(),
                plugin_instance: Some(plugin_instance),
                type_str: type_str.to_string(),
                type_instance: Some(type_instance),
                time,
                interval,
                value,
            })
        };

        for (name, result) in readings {
            let Some(channel) = self.channels.get(&name) else {
                debug!("{}, ignoring unknown channel {}", self, name);
                continue;
            };
            let MeasurementResult {
                value,
                saturation,
                analog_gain,
                integration_time,
            } = result;

            if !channel.radiometric {
                if self.log.perceptive {
                    push(
                        format!("{}_{}", self.bus, name),
                        "gauge",
                        self.driver.to_string(),
                        value,
                    );
                }
                continue;
            }
            if !self.log.radiometric {
                continue;
            }

            let type_instance = format!("{}_{}", self.driver, name);
            push(
                format!("{}_irradiance-W-m2", self.bus),
                "count",
                type_instance.clone(),
                value,
            );
            if self.log.saturation {
                push(
                    self.bus.clone(),
                    "percent",
                    type_instance.clone(),
                    saturation * 100.0,
                );
            }
            if self.log.integration_time {
                push(
                    self.bus.clone(),
                    "duration",
                    type_instance.clone(),
                    integration_time,
                );
            }
            if self.log.analog_gain {
                push(
                    format!("{}_gain", self.bus),
                    "gauge",
                    type_instance.clone(),
                    analog_gain,
                );
            }
            if self.log.total_gain {
                push(
                    format!("{}_total-gain", self.bus),
                    "gauge",
                    type_instance,
                    analog_gain * integration_time / channel.baseline_integration_time,
                );
            }
        }
        Ok(value_lists)
    }
}

impl Display for LightSensorInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on bus {}", self.driver, self.bus)
    }
}
