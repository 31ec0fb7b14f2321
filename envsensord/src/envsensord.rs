//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use eyre::{Context, Result};
use log::{debug, error, info, warn};

use crate::config::{Config, LightSensorConfig};
use crate::lightsensor::drivers::SensorFactory;
use crate::lightsensor::LightSensorInstance;
use crate::metrics::MetricSink;
use crate::util::task::{loop_with_period, LoopContinuation};

#[derive(Debug, PartialEq, Eq)]
pub enum EnvsensordLoopResult {
    Terminate,
    Relaunch,
}

/// Collects sensor configurations and creates all their instances at once.
#[derive(Default)]
pub struct SensorSetBuilder {
    configs: Vec<LightSensorConfig>,
}

impl SensorSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: LightSensorConfig) -> Self {
        self.configs.push(config);
        self
    }

    pub fn with_configs<I: IntoIterator<Item = LightSensorConfig>>(mut self, configs: I) -> Self {
        self.configs.extend(configs);
        self
    }

    /// Create one instance per configuration and bus. Instances that fail to
    /// initialize are logged and left out.
    pub fn build(self, factory: &dyn SensorFactory) -> Vec<LightSensorInstance> {
        if self.configs.is_empty() {
            warn!("No light sensor configured, will not create any instance");
        }

        let mut instances = Vec::new();
        for config in self.configs {
            debug!("Handling config: {:?}", config);
            for bus in &config.buses {
                let instance = factory
                    .open(config.driver, bus, config.address)
                    .and_then(|sensor| {
                        LightSensorInstance::new(
                            config.driver,
                            bus,
                            sensor,
                            config.auto_range(),
                            config.log_options(),
                        )
                        .map_err(Into::into)
                    });
                match instance {
                    Ok(instance) => {
                        info!("Initialized instance for \"{}\" on bus {}", config.driver, bus);
                        instances.push(instance);
                    }
                    Err(e) => error!(
                        "Instance for \"{}\" on bus {} failed to initialize: {:#}",
                        config.driver, bus, e
                    ),
                }
            }
        }
        instances
    }
}

/// Measure every instance once and hand the values to `sink`.
///
/// A failed measurement only skips its instance. A failure of the sink ends
/// the cycle with an error.
pub fn read_cycle(
    instances: &mut [LightSensorInstance],
    sink: &mut dyn MetricSink,
    hostname: &str,
    interval: Duration,
) -> Result<()> {
    let time = Utc::now();
    for instance in instances.iter_mut() {
        let value_lists = match instance.value_lists(hostname, time, interval) {
            Ok(value_lists) => value_lists,
            Err(e) => {
                error!("{}, measurement failed: {:#}", instance, e);
                continue;
            }
        };
        for value_list in value_lists {
            sink.dispatch(value_list).wrap_err("Dispatch failed")?;
        }
    }
    Ok(())
}

/// Poll all configured sensors until a termination or reload signal.
///
/// With `once`, a single read cycle is made.
pub fn envsensord_loop(
    config: Config,
    factory: &dyn SensorFactory,
    sink: &mut dyn MetricSink,
    once: bool,
) -> Result<EnvsensordLoopResult> {
    // Register a flag which will be set when one of these signals is received.
    let term_signals = [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM];
    let term = Arc::new(AtomicBool::new(false));
    for signal in term_signals {
        signal_hook::flag::register(signal, Arc::clone(&term))?;
    }

    // This flag will be set when we get the SIGHUP signal to reload the configuration.
    let reload = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGHUP, Arc::clone(&reload))?;

    let mut instances = SensorSetBuilder::new()
        .with_configs(config.config_file.light_sensors)
        .build(factory);
    info!(
        "Polling {} light sensor instance(s) every {:?} as {}",
        instances.len(),
        config.interval,
        config.hostname
    );

    if once {
        read_cycle(&mut instances, sink, &config.hostname, config.interval)?;
        return Ok(EnvsensordLoopResult::Terminate);
    }

    loop_with_period(
        || read_cycle(&mut instances, sink, &config.hostname, config.interval),
        || {
            if term.load(Ordering::Relaxed) || reload.load(Ordering::Relaxed) {
                LoopContinuation::Stop
            } else {
                LoopContinuation::KeepRunning
            }
        },
        config.interval,
    )?;
    info!("Envsensord shutting down...");

    if reload.load(Ordering::Relaxed) {
        Ok(EnvsensordLoopResult::Relaunch)
    } else {
        Ok(EnvsensordLoopResult::Terminate)
    }
}
