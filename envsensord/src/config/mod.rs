//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{eyre, Context, Result};
use log::warn;

mod config_file;
pub use config_file::{EnvsensordConfig, LightSensorConfig};

/// Set by collectd for programs started by its exec plugin.
const COLLECTD_HOSTNAME_ENV: &str = "COLLECTD_HOSTNAME";
const COLLECTD_INTERVAL_ENV: &str = "COLLECTD_INTERVAL";

/// Container of the entire envsensord configuration.
#[derive(Debug)]
pub struct Config {
    pub config_file: EnvsensordConfig,
    /// File the configuration was read from, kept to reload it.
    pub config_path: Option<PathBuf>,
    /// Host name of the value lists.
    pub hostname: String,
    /// Period of the read cycle.
    pub interval: Duration,
}

impl Config {
    pub fn read_from_system(user_config: Option<&Path>) -> Result<Self> {
        let config_file = EnvsensordConfig::load(user_config)?;
        Self::from_config_file(config_file, user_config, |name| std::env::var(name).ok())
    }

    /// Resolve the settings that may come from the environment.
    ///
    /// The host name is taken from the configuration file, then from
    /// `COLLECTD_HOSTNAME`, then from the system. `COLLECTD_INTERVAL`
    /// overrides the configured interval.
    fn from_config_file<E>(
        config_file: EnvsensordConfig,
        config_path: Option<&Path>,
        env: E,
    ) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let hostname = match config_file.hostname.clone() {
            Some(hostname) => hostname,
            None => match env(COLLECTD_HOSTNAME_ENV).filter(|h| !h.is_empty()) {
                Some(hostname) => hostname,
                None => nix::unistd::gethostname()
                    .wrap_err("Unable to get host name")?
                    .to_string_lossy()
                    .into_owned(),
            },
        };

        let interval = match env(COLLECTD_INTERVAL_ENV) {
            Some(value) => Self::parse_interval(&value).unwrap_or_else(|e| {
                warn!("Ignoring {}: {}", COLLECTD_INTERVAL_ENV, e);
                config_file.interval
            }),
            None => config_file.interval,
        };

        Ok(Self {
            config_file,
            config_path: config_path.map(Path::to_path_buf),
            hostname,
            interval,
        })
    }

    fn parse_interval(value: &str) -> Result<Duration> {
        let secs: f64 = value
            .trim()
            .parse()
            .wrap_err_with(|| format!("\"{}\" is not a number", value))?;
        match Duration::try_from_secs_f64(secs) {
            Ok(interval) if !interval.is_zero() => Ok(interval),
            _ => Err(eyre!("{} is not a positive number of seconds", secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;

    use super::*;

    fn config_file(hostname: Option<&str>) -> EnvsensordConfig {
        EnvsensordConfig {
            interval: Duration::from_secs(10),
            hostname: hostname.map(String::from),
            light_sensors: vec![],
        }
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[rstest]
    #[case(Some("configured"), &[("COLLECTD_HOSTNAME", "collectd")], "configured")]
    #[case(None, &[("COLLECTD_HOSTNAME", "collectd")], "collectd")]
    fn hostname_precedence(
        #[case] configured: Option<&str>,
        #[case] vars: &[(&str, &str)],
        #[case] expected: &str,
    ) {
        let config = Config::from_config_file(config_file(configured), None, env(vars)).unwrap();
        assert_eq!(config.hostname, expected);
    }

    #[test]
    fn hostname_falls_back_to_system() {
        let config = Config::from_config_file(config_file(None), None, env(&[])).unwrap();
        assert!(!config.hostname.is_empty());
    }

    #[rstest]
    #[case(&[], Duration::from_secs(10))]
    #[case(&[("COLLECTD_INTERVAL", "60.000")], Duration::from_secs(60))]
    #[case(&[("COLLECTD_INTERVAL", "0.5")], Duration::from_millis(500))]
    #[case(&[("COLLECTD_INTERVAL", "soon")], Duration::from_secs(10))]
    #[case(&[("COLLECTD_INTERVAL", "0")], Duration::from_secs(10))]
    #[case(&[("COLLECTD_INTERVAL", "-5")], Duration::from_secs(10))]
    fn interval_from_collectd(#[case] vars: &[(&str, &str)], #[case] expected: Duration) {
        let config =
            Config::from_config_file(config_file(Some("host")), None, env(vars)).unwrap();
        assert_eq!(config.interval, expected);
    }

    #[test]
    fn keeps_config_path() {
        let path = Path::new("/etc/envsensord.conf");
        let config =
            Config::from_config_file(config_file(Some("host")), Some(path), env(&[])).unwrap();
        assert_eq!(config.config_path.as_deref(), Some(path));
    }
}
