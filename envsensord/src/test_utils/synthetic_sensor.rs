//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::collections::HashMap;

use eyre::{eyre, Result};

use crate::lightsensor::{
    ChannelGroup, GainSetting, LightSensor, MeasurementResult, Readings,
};

const MAX_COUNT: u32 = 65535;

/// A sensor whose raw counts grow linearly with irradiance and total gain.
///
/// An irradiance of 1.0 saturates the converter at the baseline setting.
pub struct SyntheticSensor {
    groups: Vec<ChannelGroup>,
    irradiance: HashMap<String, f64>,
    derived: HashMap<String, (String, f64)>,
    settings: HashMap<String, GainSetting>,
    reads: usize,
}

impl SyntheticSensor {
    pub fn new(groups: Vec<ChannelGroup>) -> Self {
        Self {
            groups,
            irradiance: HashMap::new(),
            derived: HashMap::new(),
            settings: HashMap::new(),
            reads: 0,
        }
    }

    pub fn with_irradiance(mut self, channel: &str, irradiance: f64) -> Self {
        self.irradiance.insert(channel.to_string(), irradiance);
        self
    }

    /// A perceptive channel computed as `factor` times the `source` channel.
    pub fn with_derived(mut self, channel: &str, source: &str, factor: f64) -> Self {
        self.derived
            .insert(channel.to_string(), (source.to_string(), factor));
        self
    }

    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn saturation_at(irradiance: f64, total_gain: f64) -> f64 {
        MeasurementResult::saturation_of(Self::count_at(irradiance, total_gain), MAX_COUNT)
    }

    fn count_at(irradiance: f64, total_gain: f64) -> u32 {
        (irradiance * total_gain * f64::from(MAX_COUNT)).min(f64::from(MAX_COUNT)) as u32
    }

    fn group_of(&self, channel: &str) -> Option<&ChannelGroup> {
        self.groups
            .iter()
            .find(|g| g.channel_names().any(|n| n == channel))
    }

    fn total_gain(group: &ChannelGroup, setting: &GainSetting) -> f64 {
        group
            .gain_table
            .iter()
            .find(|(_, s)| *s == setting)
            .map(|(k, _)| f64::from(k))
            .unwrap_or(1.0)
    }
}

impl LightSensor for SyntheticSensor {
    fn channel_modes(&self) -> Vec<ChannelGroup> {
        self.groups.clone()
    }

    fn set_channel_mode(&mut self, channel: &str, setting: GainSetting) -> Result<()> {
        let group = self
            .group_of(channel)
            .ok_or_else(|| eyre!("Invalid channel: {}", channel))?;
        self.settings.insert(group.name().to_string(), setting);
        Ok(())
    }

    fn read_channels(&mut self) -> Result<Readings> {
        self.reads += 1;
        let mut readings = Readings::new();
        for group in &self.groups {
            let setting = *self
                .settings
                .get(group.name())
                .ok_or_else(|| eyre!("Sensor not configured"))?;
            let total_gain = Self::total_gain(group, &setting);
            for channel in group.channels.iter().filter(|c| c.radiometric) {
                let irradiance = self.irradiance.get(&channel.name).copied().unwrap_or(0.0);
                let count = Self::count_at(irradiance, total_gain);
                readings.insert(
                    channel.name.clone(),
                    MeasurementResult::new(
                        f64::from(count) / total_gain / f64::from(MAX_COUNT),
                        MeasurementResult::saturation_of(count, MAX_COUNT),
                        setting,
                    ),
                );
            }
        }
        for (channel, (source, factor)) in &self.derived {
            if let Some(source) = readings.get(source).copied() {
                readings.insert(
                    channel.clone(),
                    MeasurementResult {
                        value: source.value * factor,
                        ..source
                    },
                );
            }
        }
        Ok(readings)
    }
}
