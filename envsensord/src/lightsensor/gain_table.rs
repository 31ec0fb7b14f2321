//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::Serialize;

use super::AutoRangeConfig;

/// Integration times are configured in seconds with a handful of decimals.
const INTEGRATION_TIME_TOLERANCE: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GainSetting {
    /// Amplifier multiplier, >= 1
    pub analog_gain: f64,
    /// Seconds, > 0
    pub integration_time: f64,
}

impl GainSetting {
    pub fn new(analog_gain: f64, integration_time: f64) -> Self {
        Self {
            analog_gain,
            integration_time,
        }
    }

    fn same_integration_time(&self, integration_time: f64) -> bool {
        (self.integration_time - integration_time).abs() <= INTEGRATION_TIME_TOLERANCE
    }
}

/// Supported settings of a channel group, keyed by total gain relative to the
/// lowest setting.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GainTable {
    entries: BTreeMap<u32, GainSetting>,
}

impl GainTable {
    /// Build a table from explicit (total gain, setting) pairs.
    ///
    /// When two settings share a total gain the one with the longer
    /// integration time is kept since it has the better signal to noise ratio.
    /// On an exact tie the first setting is kept.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u32, GainSetting)>,
    {
        let mut table = Self::default();
        for (total_gain, setting) in entries {
            table.insert(total_gain, setting);
        }
        table
    }

    /// Build a table from the supported settings, deriving the total gain of
    /// each one relative to the lowest analog gain and integration time.
    pub fn from_settings<I>(settings: I) -> Self
    where
        I: IntoIterator<Item = GainSetting>,
    {
        let settings: Vec<_> = settings.into_iter().collect();
        let min_analog_gain = settings
            .iter()
            .map(|s| s.analog_gain)
            .fold(f64::INFINITY, f64::min);
        let min_integration_time = settings
            .iter()
            .map(|s| s.integration_time)
            .fold(f64::INFINITY, f64::min);

        Self::from_entries(settings.into_iter().map(|setting| {
            let total_gain = (setting.analog_gain / min_analog_gain)
                * (setting.integration_time / min_integration_time);
            (total_gain.round() as u32, setting)
        }))
    }

    fn insert(&mut self, total_gain: u32, setting: GainSetting) {
        match self.entries.entry(total_gain) {
            Entry::Vacant(e) => {
                e.insert(setting);
            }
            Entry::Occupied(mut e) => {
                if setting.integration_time > e.get().integration_time {
                    e.insert(setting);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, total_gain: u32) -> Option<&GainSetting> {
        self.entries.get(&total_gain)
    }

    pub fn contains(&self, total_gain: u32) -> bool {
        self.entries.contains_key(&total_gain)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &GainSetting)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Lowest setting of the table.
    pub fn baseline(&self) -> Option<(u32, GainSetting)> {
        self.entries.iter().next().map(|(k, v)| (*k, *v))
    }

    /// Highest total gain that does not exceed `target`.
    pub fn select(&self, target: f64) -> Option<(u32, GainSetting)> {
        self.entries
            .iter()
            .rev()
            .find(|(total_gain, _)| f64::from(**total_gain) <= target)
            .map(|(k, v)| (*k, *v))
    }

    /// Keep only the settings permitted by `config`.
    pub fn filtered(&self, config: &AutoRangeConfig) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(_, s)| config.analog_gain.map_or(true, |g| s.analog_gain == g))
            .filter(|(_, s)| {
                config
                    .integration_time
                    .map_or(true, |t| s.same_integration_time(t))
            })
            .filter(|(_, s)| {
                config
                    .max_integration_time
                    .map_or(true, |t| s.integration_time <= t + INTEGRATION_TIME_TOLERANCE)
            })
            .map(|(k, v)| (*k, *v))
            .collect();
        Self { entries }
    }
}
