//
// Copyright (c) Memfault, Inc.
// See License.txt for details
use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
    rc::Rc,
    time::Duration,
};

use embedded_hal::{
    delay::DelayNs,
    i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation, SevenBitAddress},
};

#[derive(Default)]
struct FakeI2cState {
    registers: HashMap<u8, VecDeque<u16>>,
    pointer: Option<u8>,
    writes: Vec<Vec<u8>>,
    fail: bool,
}

/// A register-mapped I2C device answering at a single address.
///
/// Every write moves the register pointer to its first byte. Reads return the
/// queued values of the pointed register one after the other, repeating the
/// last one. Clones share the same device.
#[derive(Clone)]
pub struct FakeI2c {
    address: u8,
    state: Rc<RefCell<FakeI2cState>>,
}

impl FakeI2c {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            state: Rc::new(RefCell::new(FakeI2cState::default())),
        }
    }

    pub fn with_register(self, register: u8, values: &[u16]) -> Self {
        self.set_register(register, values);
        self
    }

    pub fn set_register(&self, register: u8, values: &[u16]) {
        self.state
            .borrow_mut()
            .registers
            .insert(register, values.iter().copied().collect());
    }

    /// All bytes written to the device, one entry per write operation.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.borrow().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.borrow_mut().writes.clear();
    }

    pub fn fail_transfers(&self) {
        self.state.borrow_mut().fail = true;
    }

    fn next_value(state: &mut FakeI2cState) -> u16 {
        let Some(pointer) = state.pointer else {
            return 0;
        };
        match state.registers.get_mut(&pointer) {
            Some(values) if values.len() > 1 => values.pop_front().unwrap_or_default(),
            Some(values) => values.front().copied().unwrap_or_default(),
            None => 0,
        }
    }
}

impl ErrorType for FakeI2c {
    type Error = ErrorKind;
}

impl I2c<SevenBitAddress> for FakeI2c {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail {
            return Err(ErrorKind::Bus);
        }
        if address != self.address {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    state.pointer = bytes.first().copied();
                    state.writes.push(bytes.to_vec());
                }
                Operation::Read(buffer) => {
                    let value = Self::next_value(&mut state).to_le_bytes();
                    for (dst, src) in buffer.iter_mut().zip(value.iter()) {
                        *dst = *src;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Delay that returns immediately and keeps track of the requested time.
#[derive(Clone, Default)]
pub struct NoDelay {
    requested_ns: Rc<Cell<u64>>,
}

impl NoDelay {
    pub fn requested(&self) -> Duration {
        Duration::from_nanos(self.requested_ns.get())
    }
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.requested_ns.set(self.requested_ns.get() + u64::from(ns));
    }
}
