//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::borrow::Cow;
use std::io::{stdout, Write};
use std::path::Path;

use eyre::Result;
use strum::IntoEnumIterator;

use crate::cli::version::VERSION;
use crate::config::{Config, EnvsensordConfig};
use crate::lightsensor::drivers::LightSensorDriver;

fn dump_config(writer: &mut impl Write, config: &Config) -> Result<()> {
    let path_str = config
        .config_path
        .as_deref()
        .map(Path::display)
        .map(|d| Cow::Owned(d.to_string()))
        .unwrap_or_else(|| Cow::Borrowed(EnvsensordConfig::DEFAULT_CONFIG_PATH));
    writeln!(writer, "Configuration ({}):", path_str)?;
    writeln!(
        writer,
        "{}",
        serde_json::to_string_pretty(&config.config_file)?
    )?;
    writeln!(writer)?;
    writeln!(writer, "Resolved settings:")?;
    writeln!(writer, "  hostname={}", config.hostname)?;
    writeln!(writer, "  interval={:?}", config.interval)?;
    Ok(())
}

fn dump_drivers(writer: &mut impl Write, drivers: &[LightSensorDriver]) -> Result<()> {
    writeln!(writer, "Light sensor drivers:")?;
    for driver in drivers {
        writeln!(
            writer,
            "  {} (default address {:#04x})",
            driver,
            driver.default_address()
        )?;
    }
    Ok(())
}

fn dump_version(writer: &mut impl Write, version: &str) -> Result<()> {
    writeln!(writer, "Envsensord version:")?;
    writeln!(writer, "  VERSION={}", version)?;
    Ok(())
}

fn dump_settings(
    writer: &mut impl Write,
    config: &Config,
    drivers: &[LightSensorDriver],
    version: &str,
) -> Result<()> {
    dump_config(writer, config)?;
    writeln!(writer)?;
    dump_drivers(writer, drivers)?;
    writeln!(writer)?;
    dump_version(writer, version)?;
    writeln!(writer)?;
    Ok(())
}

pub fn show_settings(config_path: Option<&Path>) -> Result<()> {
    let config = Config::read_from_system(config_path)?;
    let drivers: Vec<_> = LightSensorDriver::iter().collect();

    dump_settings(&mut stdout(), &config, &drivers, VERSION)
}
