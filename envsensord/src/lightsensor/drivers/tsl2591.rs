//
// Copyright (c) Memfault, Inc.
// See License.txt for details
//! ams TSL2591 light-to-digital converter with lux output.
//!
//! Channel 0 sees visible and infrared light, channel 1 infrared only. The
//! sensor is powered on for each measurement only. The first conversion after
//! power-on is unreliable and gets discarded.
use std::time::Duration;

use embedded_hal::{delay::DelayNs, i2c::I2c};
use eyre::{eyre, Result};
use log::{debug, trace};

use crate::i2c::{delay_for, RegisterAccess};
use crate::lightsensor::{
    Channel, ChannelGroup, GainSetting, GainTable, LightSensor, MeasurementResult, Readings,
};

pub const DEFAULT_ADDRESS: u8 = 0x29;

/// Selects the command register, normal operation with auto-increment.
const COMMAND_BIT: u8 = 0xa0;
const REG_ENABLE: u8 = 0x00;
const REG_CONTROL: u8 = 0x01;
const REG_ID: u8 = 0x12;
const REG_CHAN0_LOW: u8 = 0x14;
const REG_CHAN1_LOW: u8 = 0x16;
const DEVICE_ID: u8 = 0x50;

const ENABLE_POWEROFF: u8 = 0x00;
const ENABLE_POWERON: u8 = 0x01;
const ENABLE_AEN: u8 = 0x02;

/// Analog gains with their control register bits.
const ANALOG_GAINS: [(f64, u8); 4] = [(1.0, 0x00), (25.0, 0x10), (428.0, 0x20), (9876.0, 0x30)];
/// Integration times (seconds) with their control register bits.
const INTEGRATION_TIMES: [(f64, u8); 6] = [
    (0.1, 0x00),
    (0.2, 0x01),
    (0.3, 0x02),
    (0.4, 0x03),
    (0.5, 0x04),
    (0.6, 0x05),
];

/// The converter stops at 0x9000 - 1 in the shortest integration time.
const MAX_COUNT_100MS: u32 = 36863;
const MAX_COUNT: u32 = 65535;

// Counts per uW/cm2 at 25x gain and 100ms, converted to W/m2 per count.
const FULL_TO_IRRADIANCE: f64 = 1.0 / 264.1 * 1e4 / 1e6;
const IR_TO_IRRADIANCE: f64 = 1.0 / 34.9 * 1e4 / 1e6;
const RESPONSIVITY_GAIN: f64 = 25.0 * 0.1;

const LUX_DF: f64 = 408.0;
const LUX_COEFB: f64 = 1.64;

const CHANNEL_FULL: &str = "Full";
const CHANNEL_IR: &str = "IR";
const CHANNEL_LUX: &str = "lux";

#[derive(Clone, Copy, Debug)]
struct Mode {
    control: u8,
    time_code: u8,
    setting: GainSetting,
}

pub struct Tsl2591<I, D> {
    i2c: I,
    delay: D,
    address: u8,
    mode: Option<Mode>,
}

impl<I: I2c, D: DelayNs> Tsl2591<I, D> {
    /// Verify the chip ID and leave the sensor powered off.
    pub fn new(mut i2c: I, delay: D, address: u8) -> Result<Self> {
        let device_id = i2c.read_byte_data(address, COMMAND_BIT | REG_ID)?;
        if device_id != DEVICE_ID {
            return Err(eyre!("Invalid TSL2591 chip ID ({:#04x})", device_id));
        }
        i2c.write_byte_data(address, COMMAND_BIT | REG_ENABLE, ENABLE_POWEROFF)?;
        debug!("TSL2591 found at {:#04x}", address);

        Ok(Self {
            i2c,
            delay,
            address,
            mode: None,
        })
    }

    /// Wait for the conversion in progress and read both channels.
    fn read_counts(&mut self, mode: &Mode) -> Result<(u16, u16)> {
        let wait = Duration::from_millis(105 + 100 * u64::from(mode.time_code));
        delay_for(&mut self.delay, wait);
        let full = self
            .i2c
            .read_word_data(self.address, COMMAND_BIT | REG_CHAN0_LOW)?;
        let ir = self
            .i2c
            .read_word_data(self.address, COMMAND_BIT | REG_CHAN1_LOW)?;
        Ok((full, ir))
    }

    fn measure(&mut self, mode: &Mode) -> Result<(u16, u16)> {
        self.i2c
            .write_byte_data(self.address, COMMAND_BIT | REG_CONTROL, mode.control)?;
        self.i2c.write_byte_data(
            self.address,
            COMMAND_BIT | REG_ENABLE,
            ENABLE_POWERON | ENABLE_AEN,
        )?;
        let (full, ir) = self.read_counts(mode)?;
        trace!("Discarding first sample after power-on: {} {}", full, ir);
        let counts = self.read_counts(mode)?;
        self.i2c
            .write_byte_data(self.address, COMMAND_BIT | REG_ENABLE, ENABLE_POWEROFF)?;
        Ok(counts)
    }
}

impl<I: I2c, D: DelayNs> LightSensor for Tsl2591<I, D> {
    fn channel_modes(&self) -> Vec<ChannelGroup> {
        let settings = ANALOG_GAINS.iter().flat_map(|(analog_gain, _)| {
            INTEGRATION_TIMES
                .iter()
                .map(|(integration_time, _)| GainSetting::new(*analog_gain, *integration_time))
        });
        vec![ChannelGroup::new(
            vec![
                Channel::radiometric(CHANNEL_FULL),
                Channel::radiometric(CHANNEL_IR),
                Channel::perceptive(CHANNEL_LUX),
            ],
            GainTable::from_settings(settings),
        )]
    }

    fn set_channel_mode(&mut self, channel: &str, setting: GainSetting) -> Result<()> {
        if ![CHANNEL_FULL, CHANNEL_IR, CHANNEL_LUX].contains(&channel) {
            return Err(eyre!("Invalid channel: {}", channel));
        }
        let (_, gain_bits) = ANALOG_GAINS
            .iter()
            .find(|(analog_gain, _)| *analog_gain == setting.analog_gain)
            .ok_or_else(|| eyre!("Invalid gain: {}", setting.analog_gain))?;
        let (_, time_code) = INTEGRATION_TIMES
            .iter()
            .find(|(integration_time, _)| *integration_time == setting.integration_time)
            .ok_or_else(|| eyre!("Invalid integration time: {}", setting.integration_time))?;

        let mode = Mode {
            control: gain_bits | time_code,
            time_code: *time_code,
            setting,
        };
        self.mode = Some(mode);
        Ok(())
    }

    fn read_channels(&mut self) -> Result<Readings> {
        let mode = self.mode.ok_or_else(|| eyre!("Sensor not configured"))?;
        let (full, ir) = self.measure(&mode)?;
        let setting = mode.setting;

        let max_count = if mode.time_code == 0 {
            MAX_COUNT_100MS
        } else {
            MAX_COUNT
        };
        let full_saturation = MeasurementResult::saturation_of(u32::from(full), max_count);
        let ir_saturation = MeasurementResult::saturation_of(u32::from(ir), max_count);

        let (full, ir) = (f64::from(full), f64::from(ir));
        let total_gain = setting.analog_gain * setting.integration_time;
        let counts_per_lux = setting.analog_gain * setting.integration_time * 1000.0 / LUX_DF;
        let lux = ((full - LUX_COEFB * ir) / counts_per_lux).max(0.0);

        Ok(Readings::from([
            (
                CHANNEL_FULL.to_string(),
                MeasurementResult::new(
                    full * FULL_TO_IRRADIANCE * RESPONSIVITY_GAIN / total_gain,
                    full_saturation,
                    setting,
                ),
            ),
            (
                CHANNEL_IR.to_string(),
                MeasurementResult::new(
                    ir * IR_TO_IRRADIANCE * RESPONSIVITY_GAIN / total_gain,
                    ir_saturation,
                    setting,
                ),
            ),
            (
                CHANNEL_LUX.to_string(),
                MeasurementResult::new(lux, full_saturation.max(ir_saturation), setting),
            ),
        ]))
    }
}
