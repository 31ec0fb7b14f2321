//
// Copyright (c) Memfault, Inc.
// See License.txt for details
//! Ambient light sensors with automatic gain and integration time control.
//!
//! A sensor exposes one or more channel groups. All channels of a group share
//! one hardware setting (analog gain and integration time) and the group's
//! gain table lists every setting the hardware supports, keyed by the total
//! gain relative to the lowest setting.
//!
//! `AutoRangeController` drives a `LightSensor` through an estimation pass at
//! the lowest setting and an optional refinement pass at the highest setting
//! that still leaves the configured headroom.
use std::collections::BTreeMap;

use eyre::Result;
use serde::Serialize;
use thiserror::Error;

mod auto_range;
pub use auto_range::{AutoRangeConfig, AutoRangeController};

pub mod drivers;

mod gain_table;
pub use gain_table::{GainSetting, GainTable};

mod instance;
pub use instance::{LightSensorInstance, LogOptions, PLUGIN_NAME};

/// Measurements of one cycle, keyed by channel name.
pub type Readings = BTreeMap<String, MeasurementResult>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Channel {
    /// Human friendly name ("UVA", "IR", ...) for radiometric channels, a unit
    /// ("lux", "UVI") for perceptive ones.
    pub name: String,
    /// Radiometric channels report irradiance in W/m2. Perceptive channels
    /// are derived from one or more radiometric channels.
    pub radiometric: bool,
}

impl Channel {
    pub fn radiometric(name: &str) -> Self {
        Self {
            name: name.to_string(),
            radiometric: true,
        }
    }

    pub fn perceptive(name: &str) -> Self {
        Self {
            name: name.to_string(),
            radiometric: false,
        }
    }
}

/// A set of channels that must share the same hardware setting.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChannelGroup {
    pub channels: Vec<Channel>,
    pub gain_table: GainTable,
}

impl ChannelGroup {
    pub fn new(channels: Vec<Channel>, gain_table: GainTable) -> Self {
        Self {
            channels,
            gain_table,
        }
    }

    /// Name used to address the group when changing its setting.
    pub fn name(&self) -> &str {
        self.channels.first().map(|c| c.name.as_str()).unwrap_or("")
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|c| c.name.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MeasurementResult {
    /// W/m2 for radiometric channels, the channel unit for perceptive ones.
    pub value: f64,
    /// Fraction of the dynamic range used by the raw reading, in (0, 1].
    pub saturation: f64,
    pub analog_gain: f64,
    /// Seconds
    pub integration_time: f64,
}

impl MeasurementResult {
    pub fn new(value: f64, saturation: f64, setting: GainSetting) -> Self {
        Self {
            value,
            saturation,
            analog_gain: setting.analog_gain,
            integration_time: setting.integration_time,
        }
    }

    /// Saturation of a raw ADC count for a converter whose largest possible
    /// count is `max_count`.
    ///
    /// A zero count still reports a small non-zero saturation so that a dark
    /// reading never asks for unbounded gain. Counts above `max_count`, which
    /// some converters produce in their shortest integration time, report 1.
    pub fn saturation_of(raw_count: u32, max_count: u32) -> f64 {
        let saturation = (f64::from(raw_count) + 1.0) / (f64::from(max_count) + 1.0);
        saturation.min(1.0)
    }
}

/// An ambient light sensor that can be auto-ranged.
///
/// Every call may block for the duration of a bus transaction, including the
/// integration time of a measurement. Implementations are not reentrant.
#[cfg_attr(test, mockall::automock)]
pub trait LightSensor {
    /// Channel groups supported by the sensor. The gain table of every group
    /// must contain the baseline entry with a total gain of 1, made of the
    /// lowest analog gain and the shortest integration time.
    fn channel_modes(&self) -> Vec<ChannelGroup>;

    /// Apply `setting` to `channel` and every other channel of its group.
    fn set_channel_mode(&mut self, channel: &str, setting: GainSetting) -> Result<()>;

    /// Run one measurement on all channels and block until it is complete.
    fn read_channels(&mut self) -> Result<Readings>;
}

impl<S: LightSensor + ?Sized> LightSensor for Box<S> {
    fn channel_modes(&self) -> Vec<ChannelGroup> {
        (**self).channel_modes()
    }

    fn set_channel_mode(&mut self, channel: &str, setting: GainSetting) -> Result<()> {
        (**self).set_channel_mode(channel, setting)
    }

    fn read_channels(&mut self) -> Result<Readings> {
        (**self).read_channels()
    }
}

/// Errors that prevent a sensor instance from being created.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigurationError {
    #[error("no supported settings match the given configuration (channel group {group})")]
    NoMatchingSettings { group: String },
    #[error("gain table of channel group {group} has no baseline entry with a total gain of 1")]
    MissingBaseline { group: String },
    #[error("gain table of channel group {group} has settings below its baseline entry")]
    InvalidBaseline { group: String },
    #[error("channel group without channels")]
    EmptyChannelGroup,
    #[error("driver \"{0}\" does not exist")]
    UnknownDriver(String),
    #[error("unsupported bus \"{0}\", expected i2c-<number>")]
    UnsupportedBus(String),
    #[error("invalid value for {name}: {reason}")]
    InvalidOption { name: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 65535, 1.0 / 65536.0)]
    #[case(65535, 65535, 1.0)]
    #[case(32767, 65535, 0.5)]
    #[case(37888, 36863, 1.0)]
    fn saturation_is_a_nonzero_fraction(
        #[case] raw_count: u32,
        #[case] max_count: u32,
        #[case] expected: f64,
    ) {
        let saturation = MeasurementResult::saturation_of(raw_count, max_count);
        assert!(saturation > 0.0 && saturation <= 1.0);
        assert!((saturation - expected).abs() < 1e-12);
    }

    #[test]
    fn saturation_stays_in_range_over_full_scale() {
        let max_count = 36863;
        for raw_count in (0..=max_count).step_by(97).chain([max_count]) {
            let saturation = MeasurementResult::saturation_of(raw_count, max_count);
            assert!(saturation > 0.0 && saturation <= 1.0, "{}", raw_count);
        }
    }

    #[test]
    fn group_is_named_after_its_first_channel() {
        let group = ChannelGroup::new(
            vec![Channel::radiometric("Full"), Channel::perceptive("lux")],
            GainTable::from_entries([(1, GainSetting::new(1.0, 0.1))]),
        );
        assert_eq!(group.name(), "Full");
        assert_eq!(group.channel_names().collect::<Vec<_>>(), ["Full", "lux"]);
    }
}
