//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use embedded_hal::i2c::I2c;
use eyre::{eyre, Result};

/// SMBus style register access on top of a plain I2C bus.
///
/// Words are transferred least significant byte first.
pub trait RegisterAccess: I2c {
    fn read_byte_data(&mut self, address: u8, register: u8) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.write_read(address, &[register], &mut buf)
            .map_err(|e| {
                eyre!(
                    "Read of register {:#04x} at {:#04x} failed: {:?}",
                    register,
                    address,
                    e
                )
            })?;
        Ok(buf[0])
    }

    fn read_word_data(&mut self, address: u8, register: u8) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.write_read(address, &[register], &mut buf)
            .map_err(|e| {
                eyre!(
                    "Read of register {:#04x} at {:#04x} failed: {:?}",
                    register,
                    address,
                    e
                )
            })?;
        Ok(u16::from_le_bytes(buf))
    }

    fn write_byte_data(&mut self, address: u8, register: u8, value: u8) -> Result<()> {
        self.write(address, &[register, value]).map_err(|e| {
            eyre!(
                "Write of register {:#04x} at {:#04x} failed: {:?}",
                register,
                address,
                e
            )
        })
    }

    fn write_word_data(&mut self, address: u8, register: u8, value: u16) -> Result<()> {
        let [low, high] = value.to_le_bytes();
        self.write(address, &[register, low, high]).map_err(|e| {
            eyre!(
                "Write of register {:#04x} at {:#04x} failed: {:?}",
                register,
                address,
                e
            )
        })
    }
}

impl<T: I2c> RegisterAccess for T {}
