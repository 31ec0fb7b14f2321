//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::io::stdout;
use std::path::Path;

use argh::FromArgs;
use eyre::Result;
use log::{info, LevelFilter};

use crate::cli::show_settings::show_settings;
use crate::cli::{from_env, init_logger};
use crate::config::Config;
use crate::envsensord::{envsensord_loop, EnvsensordLoopResult};
use crate::lightsensor::drivers::LinuxSensorFactory;
use crate::metrics::PutvalSink;

#[derive(FromArgs)]
/// Envsensord polls I2C ambient light sensors with automatic gain control and
/// writes their readings to stdout using the collectd exec plugin protocol.
struct EnvsensordArgs {
    /// use configuration file
    #[argh(option, short = 'c')]
    config_file: Option<String>,

    /// show version information
    #[argh(switch, short = 'v')]
    #[allow(dead_code)]
    version: bool,

    /// verbose output
    #[argh(switch, short = 'V')]
    verbose: bool,

    /// run a single read cycle and exit
    #[argh(switch)]
    once: bool,

    /// show settings and exit immediately
    #[argh(switch, short = 's')]
    show_settings: bool,
}

pub fn main() -> Result<()> {
    let args: EnvsensordArgs = from_env();

    init_logger(if args.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    })?;

    let config_path = args.config_file.as_ref().map(Path::new);
    if args.show_settings {
        return show_settings(config_path);
    }

    let mut sink = PutvalSink::new(stdout());
    loop {
        let config = Config::read_from_system(config_path)?;
        match envsensord_loop(config, &LinuxSensorFactory, &mut sink, args.once)? {
            EnvsensordLoopResult::Terminate => break,
            EnvsensordLoopResult::Relaunch => info!("Reloading configuration"),
        }
    }
    Ok(())
}
