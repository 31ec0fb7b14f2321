//
// Copyright (c) Memfault, Inc.
// See License.txt for details
//! Vishay VEML6075 UVA and UVB sensor, with UV index output.
//!
//! The part has been end of life since 2019. Without individual calibration
//! readings carry a large offset and the UV index is only indicative. The
//! address is fixed, so only one sensor fits on a bus.
use std::time::Duration;

use embedded_hal::{delay::DelayNs, i2c::I2c};
use eyre::{eyre, Result};
use log::debug;

use crate::i2c::{delay_for, RegisterAccess};
use crate::lightsensor::{
    Channel, ChannelGroup, GainSetting, GainTable, LightSensor, MeasurementResult, Readings,
};

pub const DEFAULT_ADDRESS: u8 = 0x10;

const REG_UV_CONF: u8 = 0x00;
const REG_UVA_DATA: u8 = 0x07;
const REG_UVB_DATA: u8 = 0x09;
/// Visible light compensation channel
const REG_UVCOMP1_DATA: u8 = 0x0a;
/// Near infrared compensation channel
const REG_UVCOMP2_DATA: u8 = 0x0b;
const REG_ID: u8 = 0x0c;
const DEVICE_ID: u16 = 0x0026;

const UV_CONF_SD: u16 = 1 << 0;
const UV_CONF_AF: u16 = 1 << 1;
const UV_CONF_TRIG: u16 = 1 << 2;
const UV_CONF_IT_SHIFT: u16 = 4;

/// Supported integration times (seconds) with their register code.
const INTEGRATION_TIMES: [(f64, u16); 5] = [(0.05, 0), (0.1, 1), (0.2, 2), (0.4, 3), (0.8, 4)];
const MIN_INTEGRATION_TIME: f64 = 0.05;

const MAX_COUNT: u32 = 65535;
const POWER_CYCLE_DELAY: Duration = Duration::from_millis(10);

// W/m2 per count at 50ms. UVA has 0.93 counts per uW/cm2, UVB 2.10.
const UVA_TO_IRRADIANCE: f64 = 1.0 / 0.93 * 1e4 / 1e6;
const UVB_TO_IRRADIANCE: f64 = 1.0 / 2.10 * 1e4 / 1e6;

// Open-air compensation and UV index coefficients from application note
// 84339 (rev. 25-Apr-2018).
const UVA_A_COEF: f64 = 2.22;
const UVA_B_COEF: f64 = 1.33;
const UVB_C_COEF: f64 = 2.95;
const UVB_D_COEF: f64 = 1.74;
const UVA_UVI_RESPONSE: f64 = 0.001461;
const UVB_UVI_RESPONSE: f64 = 0.002591;
const MAX_UV_INDEX: f64 = 12.0;

const CHANNEL_UVA: &str = "UVA";
const CHANNEL_UVB: &str = "UVB";
const CHANNEL_UVI: &str = "UVI";

pub struct Veml6075<I, D> {
    i2c: I,
    delay: D,
    address: u8,
    /// Configuration register value and integration time of the next
    /// measurement, unset until the first `set_channel_mode`.
    config: Option<(u16, GainSetting)>,
}

impl<I: I2c, D: DelayNs> Veml6075<I, D> {
    /// Verify the chip ID, then power cycle the sensor into single
    /// measurement (active force) mode.
    pub fn new(mut i2c: I, mut delay: D, address: u8) -> Result<Self> {
        let device_id = i2c.read_word_data(address, REG_ID)?;
        if device_id != DEVICE_ID {
            return Err(eyre!("Invalid VEML6075 chip ID ({:#06x})", device_id));
        }

        i2c.write_word_data(address, REG_UV_CONF, UV_CONF_SD)?;
        delay_for(&mut delay, POWER_CYCLE_DELAY);
        i2c.write_word_data(address, REG_UV_CONF, UV_CONF_AF)?;
        delay_for(&mut delay, POWER_CYCLE_DELAY);
        debug!("VEML6075 found at {:#04x}", address);

        Ok(Self {
            i2c,
            delay,
            address,
            config: None,
        })
    }

    fn read_counts(&mut self) -> Result<[u16; 4]> {
        let mut counts = [0; 4];
        for (count, register) in counts.iter_mut().zip([
            REG_UVA_DATA,
            REG_UVB_DATA,
            REG_UVCOMP1_DATA,
            REG_UVCOMP2_DATA,
        ]) {
            *count = self.i2c.read_word_data(self.address, register)?;
        }
        Ok(counts)
    }
}

impl<I: I2c, D: DelayNs> LightSensor for Veml6075<I, D> {
    fn channel_modes(&self) -> Vec<ChannelGroup> {
        // A single configuration register, so a single group.
        vec![ChannelGroup::new(
            vec![
                Channel::radiometric(CHANNEL_UVA),
                Channel::radiometric(CHANNEL_UVB),
                Channel::perceptive(CHANNEL_UVI),
            ],
            GainTable::from_settings(
                INTEGRATION_TIMES
                    .iter()
                    .map(|(integration_time, _)| GainSetting::new(1.0, *integration_time)),
            ),
        )]
    }

    fn set_channel_mode(&mut self, channel: &str, setting: GainSetting) -> Result<()> {
        if ![CHANNEL_UVA, CHANNEL_UVB, CHANNEL_UVI].contains(&channel) {
            return Err(eyre!("Invalid channel: {}", channel));
        }
        if setting.analog_gain != 1.0 {
            return Err(eyre!("Invalid gain (can only be 1): {}", setting.analog_gain));
        }
        let (_, code) = INTEGRATION_TIMES
            .iter()
            .find(|(integration_time, _)| *integration_time == setting.integration_time)
            .ok_or_else(|| {
                eyre!(
                    "Invalid integration time: {}, possible values: {:?}",
                    setting.integration_time,
                    INTEGRATION_TIMES.map(|(t, _)| t)
                )
            })?;
        self.config = Some(((code << UV_CONF_IT_SHIFT) | UV_CONF_AF, setting));
        Ok(())
    }

    fn read_channels(&mut self) -> Result<Readings> {
        let (uv_conf, setting) = self.config.ok_or_else(|| eyre!("Sensor not configured"))?;
        self.i2c
            .write_word_data(self.address, REG_UV_CONF, uv_conf | UV_CONF_TRIG)?;

        // The datasheet gives no conversion overhead. 20% + 50ms is enough
        // on a typical part, leave some room for process variation.
        let wait = Duration::from_secs_f64(setting.integration_time * 1.25 + 0.1);
        delay_for(&mut self.delay, wait);

        let [uva, uvb, uvcomp1, uvcomp2] = self.read_counts()?;

        let comp_saturation = MeasurementResult::saturation_of(u32::from(uvcomp1), MAX_COUNT)
            .max(MeasurementResult::saturation_of(u32::from(uvcomp2), MAX_COUNT));
        let uva_saturation =
            MeasurementResult::saturation_of(u32::from(uva), MAX_COUNT).max(comp_saturation);
        let uvb_saturation =
            MeasurementResult::saturation_of(u32::from(uvb), MAX_COUNT).max(comp_saturation);

        let (uvcomp1, uvcomp2) = (f64::from(uvcomp1), f64::from(uvcomp2));
        let uva = (f64::from(uva) - UVA_A_COEF * uvcomp1 - UVA_B_COEF * uvcomp2).max(0.0);
        let uvb = (f64::from(uvb) - UVB_C_COEF * uvcomp1 - UVB_D_COEF * uvcomp2).max(0.0);
        let uvi = (uva * UVA_UVI_RESPONSE + uvb * UVB_UVI_RESPONSE) / 2.0;

        let time_gain = setting.integration_time / MIN_INTEGRATION_TIME;
        let uva_irradiance = uva * UVA_TO_IRRADIANCE / time_gain;
        let uvb_irradiance = uvb * UVB_TO_IRRADIANCE / time_gain;
        Ok(Readings::from([
            (
                CHANNEL_UVA.to_string(),
                MeasurementResult::new(uva_irradiance, uva_saturation, setting),
            ),
            (
                CHANNEL_UVB.to_string(),
                MeasurementResult::new(uvb_irradiance, uvb_saturation, setting),
            ),
            (
                CHANNEL_UVI.to_string(),
                MeasurementResult::new(
                    uvi.clamp(0.0, MAX_UV_INDEX),
                    uva_saturation.max(uvb_saturation),
                    setting,
                ),
            ),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::test_utils::{FakeI2c, NoDelay};

    #[fixture]
    fn bus() -> FakeI2c {
        FakeI2c::new(DEFAULT_ADDRESS).with_register(REG_ID, &[DEVICE_ID])
    }

    fn sensor(bus: &FakeI2c) -> Veml6075<FakeI2c, NoDelay> {
        Veml6075::new(bus.clone(), NoDelay::default(), DEFAULT_ADDRESS).unwrap()
    }

    #[rstest]
    fn power_cycles_into_force_mode(bus: FakeI2c) {
        let delay = NoDelay::default();
        Veml6075::new(bus.clone(), delay.clone(), DEFAULT_ADDRESS).unwrap();

        assert_eq!(
            bus.writes(),
            vec![
                vec![REG_ID],
                vec![REG_UV_CONF, 0x01, 0x00],
                vec![REG_UV_CONF, 0x02, 0x00]
            ]
        );
        assert_eq!(delay.requested(), Duration::from_millis(20));
    }

    #[test]
    fn rejects_other_chips() {
        let bus = FakeI2c::new(DEFAULT_ADDRESS).with_register(REG_ID, &[0x0050]);
        let err = Veml6075::new(bus, NoDelay::default(), DEFAULT_ADDRESS)
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Invalid VEML6075 chip ID (0x0050)");
    }

    #[rstest]
    fn gain_table_doubles_with_integration_time(bus: FakeI2c) {
        let groups = sensor(&bus).channel_modes();
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].channel_names().collect::<Vec<_>>(),
            ["UVA", "UVB", "UVI"]
        );
        let table: Vec<_> = groups[0]
            .gain_table
            .iter()
            .map(|(k, s)| (k, s.analog_gain, s.integration_time))
            .collect();
        assert_eq!(
            table,
            [
                (1, 1.0, 0.05),
                (2, 1.0, 0.1),
                (4, 1.0, 0.2),
                (8, 1.0, 0.4),
                (16, 1.0, 0.8)
            ]
        );
    }

    #[rstest]
    fn reading_before_configuring_fails(bus: FakeI2c) {
        let err = sensor(&bus).read_channels().unwrap_err();
        assert_eq!(err.to_string(), "Sensor not configured");
    }

    #[rstest]
    #[case::channel("UVD", GainSetting::new(1.0, 0.1), "Invalid channel")]
    #[case::gain("UVA", GainSetting::new(2.0, 0.1), "Invalid gain")]
    #[case::time("UVB", GainSetting::new(1.0, 0.3), "Invalid integration time")]
    fn rejects_unsupported_modes(
        bus: FakeI2c,
        #[case] channel: &str,
        #[case] setting: GainSetting,
        #[case] message: &str,
    ) {
        let err = sensor(&bus).set_channel_mode(channel, setting).unwrap_err();
        assert!(err.to_string().starts_with(message), "{}", err);
    }

    #[rstest]
    fn triggers_one_measurement_and_waits(bus: FakeI2c) {
        let delay = NoDelay::default();
        let mut sensor = Veml6075::new(bus.clone(), delay.clone(), DEFAULT_ADDRESS).unwrap();
        sensor
            .set_channel_mode("UVI", GainSetting::new(1.0, 0.2))
            .unwrap();
        bus.clear_writes();

        sensor.read_channels().unwrap();

        // Integration time code 2, active force mode, trigger.
        assert_eq!(bus.writes()[0], vec![REG_UV_CONF, 0x26, 0x00]);
        assert_eq!(
            delay.requested(),
            Duration::from_millis(20 + 350)
        );
    }

    #[rstest]
    fn compensates_and_scales_readings(bus: FakeI2c) {
        bus.set_register(REG_UVA_DATA, &[1000]);
        bus.set_register(REG_UVB_DATA, &[2000]);
        bus.set_register(REG_UVCOMP1_DATA, &[100]);
        bus.set_register(REG_UVCOMP2_DATA, &[50]);
        let mut sensor = sensor(&bus);
        sensor
            .set_channel_mode("UVA", GainSetting::new(1.0, 0.1))
            .unwrap();

        let readings = sensor.read_channels().unwrap();

        let uva_counts = 1000.0 - 222.0 - 66.5;
        let uvb_counts = 2000.0 - 295.0 - 87.0;
        let uva = readings["UVA"];
        assert!((uva.value - uva_counts * UVA_TO_IRRADIANCE / 2.0).abs() < 1e-12);
        assert!((uva.saturation - 1001.0 / 65536.0).abs() < 1e-12);
        assert_eq!(uva.integration_time, 0.1);
        assert_eq!(uva.analog_gain, 1.0);
        let uvb = readings["UVB"];
        assert!((uvb.value - uvb_counts * UVB_TO_IRRADIANCE / 2.0).abs() < 1e-12);
        assert!((uvb.saturation - 2001.0 / 65536.0).abs() < 1e-12);
        let uvi = readings["UVI"];
        let expected_uvi = (uva_counts * UVA_UVI_RESPONSE + uvb_counts * UVB_UVI_RESPONSE) / 2.0;
        assert!((uvi.value - expected_uvi).abs() < 1e-12);
        assert_eq!(uvi.saturation, uvb.saturation);
    }

    #[rstest]
    fn compensation_channels_count_toward_saturation(bus: FakeI2c) {
        bus.set_register(REG_UVA_DATA, &[10]);
        bus.set_register(REG_UVB_DATA, &[10]);
        bus.set_register(REG_UVCOMP1_DATA, &[65535]);
        let mut sensor = sensor(&bus);
        sensor
            .set_channel_mode("UVA", GainSetting::new(1.0, 0.05))
            .unwrap();

        let readings = sensor.read_channels().unwrap();

        assert_eq!(readings["UVA"].saturation, 1.0);
        assert_eq!(readings["UVB"].saturation, 1.0);
        assert_eq!(readings["UVA"].value, 0.0);
        assert_eq!(readings["UVI"].value, 0.0);
    }

    #[rstest]
    fn uv_index_is_capped(bus: FakeI2c) {
        bus.set_register(REG_UVA_DATA, &[65535]);
        bus.set_register(REG_UVB_DATA, &[65535]);
        let mut sensor = sensor(&bus);
        sensor
            .set_channel_mode("UVA", GainSetting::new(1.0, 0.8))
            .unwrap();

        assert_eq!(sensor.read_channels().unwrap()["UVI"].value, MAX_UV_INDEX);
    }

    #[rstest]
    fn bus_errors_are_propagated(bus: FakeI2c) {
        let mut sensor = sensor(&bus);
        sensor
            .set_channel_mode("UVA", GainSetting::new(1.0, 0.05))
            .unwrap();
        bus.fail_transfers();
        assert!(sensor.read_channels().is_err());
    }
}
