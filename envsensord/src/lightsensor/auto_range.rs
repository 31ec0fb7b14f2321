//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use eyre::{eyre, Result};
use log::debug;

use super::{ChannelGroup, ConfigurationError, GainSetting, LightSensor, Readings};

/// Constraints and tuning of the automatic gain control.
#[derive(Clone, Debug, PartialEq)]
pub struct AutoRangeConfig {
    /// Only use settings with exactly this analog gain.
    pub analog_gain: Option<f64>,
    /// Only use settings with exactly this integration time (seconds).
    pub integration_time: Option<f64>,
    /// Only use settings up to this integration time (seconds).
    pub max_integration_time: Option<f64>,
    /// Headroom left when picking the refinement setting. 0.5 aims for a
    /// reading that could still grow by 50% before saturating.
    pub gain_margin: f64,
    /// Refined readings above this saturation fall back to the estimate.
    pub max_saturation: f64,
}

impl Default for AutoRangeConfig {
    fn default() -> Self {
        Self {
            analog_gain: None,
            integration_time: None,
            max_integration_time: None,
            gain_margin: 0.5,
            max_saturation: 0.9,
        }
    }
}

/// Picks the best gain/integration time for every channel group of a sensor
/// on each measurement.
pub struct AutoRangeController<S: LightSensor> {
    sensor: S,
    groups: Vec<ChannelGroup>,
    config: AutoRangeConfig,
}

impl<S: LightSensor> AutoRangeController<S> {
    pub fn new(sensor: S, config: AutoRangeConfig) -> Result<Self, ConfigurationError> {
        let groups = sensor
            .channel_modes()
            .into_iter()
            .map(|group| {
                Self::check_baseline(&group)?;
                let gain_table = group.gain_table.filtered(&config);
                if gain_table.is_empty() {
                    return Err(ConfigurationError::NoMatchingSettings {
                        group: group.name().to_string(),
                    });
                }
                Ok(ChannelGroup {
                    channels: group.channels,
                    gain_table,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            sensor,
            groups,
            config,
        })
    }

    /// Every group needs channels and a baseline entry at total gain 1 that
    /// has both the lowest analog gain and the shortest integration time.
    fn check_baseline(group: &ChannelGroup) -> Result<(), ConfigurationError> {
        if group.channels.is_empty() {
            return Err(ConfigurationError::EmptyChannelGroup);
        }
        let baseline = group
            .gain_table
            .get(1)
            .ok_or_else(|| ConfigurationError::MissingBaseline {
                group: group.name().to_string(),
            })?;
        let below_baseline = group.gain_table.iter().any(|(total_gain, setting)| {
            total_gain < 1
                || setting.analog_gain < baseline.analog_gain
                || setting.integration_time < baseline.integration_time
        });
        if below_baseline {
            return Err(ConfigurationError::InvalidBaseline {
                group: group.name().to_string(),
            });
        }
        Ok(())
    }

    /// Channel groups with only the settings permitted by the configuration.
    pub fn channel_groups(&self) -> &[ChannelGroup] {
        &self.groups
    }

    pub fn config(&self) -> &AutoRangeConfig {
        &self.config
    }

    /// Measure all channels, using at most two sensor transactions.
    ///
    /// Sensor errors are returned as-is. The sensor is left in an unspecified
    /// setting after an error; the next call starts over from the estimate.
    pub fn measure(&mut self) -> Result<Readings> {
        for group in &self.groups {
            let (_, setting) = Self::estimation_setting(group)?;
            self.sensor.set_channel_mode(group.name(), setting)?;
        }
        let results_estimate = self.sensor.read_channels()?;

        let mut refine = false;
        for group in &self.groups {
            let (base_gain, _) = Self::estimation_setting(group)?;
            let (total_gain, setting) =
                Self::refinement_setting(group, &results_estimate, self.config.gain_margin)?;
            debug!(
                "Channel group {}: total gain {} (analog gain {}, integration time {}s)",
                group.name(),
                total_gain,
                setting.analog_gain,
                setting.integration_time
            );
            if total_gain != base_gain {
                self.sensor.set_channel_mode(group.name(), setting)?;
                refine = true;
            }
        }

        if !refine {
            debug!("Skipping second measurement, estimate has insufficient gain margin");
            return Ok(results_estimate);
        }

        let mut results = self.sensor.read_channels()?;
        for (name, result) in results.iter_mut() {
            if result.saturation > self.config.max_saturation {
                if let Some(estimate) = results_estimate.get(name) {
                    debug!(
                        "Reverting channel {} to estimate due to saturation: {}",
                        name, result.saturation
                    );
                    *result = *estimate;
                }
            }
        }
        Ok(results)
    }

    /// Lowest permitted setting, used for the estimation pass.
    fn estimation_setting(group: &ChannelGroup) -> Result<(u32, GainSetting)> {
        group
            .gain_table
            .baseline()
            .ok_or_else(|| eyre!("Channel group {} has no settings", group.name()))
    }

    /// Highest permitted setting whose predicted saturation keeps the
    /// configured margin, falling back to the estimation setting.
    fn refinement_setting(
        group: &ChannelGroup,
        estimate: &Readings,
        gain_margin: f64,
    ) -> Result<(u32, GainSetting)> {
        let max_saturation = group
            .channel_names()
            .map(|name| {
                estimate
                    .get(name)
                    .map(|r| r.saturation)
                    .ok_or_else(|| eyre!("Sensor did not report channel {}", name))
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .fold(f64::MIN_POSITIVE, f64::max);

        let (base_gain, base_setting) = Self::estimation_setting(group)?;
        let extra_gain = 1.0 / max_saturation / (1.0 + gain_margin);
        Ok(group
            .gain_table
            .select(f64::from(base_gain) * extra_gain)
            .unwrap_or((base_gain, base_setting)))
    }
}
