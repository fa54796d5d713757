// Licensed under the Apache-2.0 license

//! Memory-mapped register access for real TWI hardware.

use crate::twi::common::{Prescaler, TwiSpeed};
use crate::twi::traits::TwiRegisters;
use core::ptr::{read_volatile, write_volatile};

/// Data-space addresses of the TWI registers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegisterMap {
    pub twbr: usize,
    pub twsr: usize,
    pub twar: usize,
    pub twdr: usize,
    pub twcr: usize,
}

/// Register layout of the ATmega328P family.
pub const ATMEGA328P: RegisterMap = RegisterMap {
    twbr: 0xb8,
    twsr: 0xb9,
    twar: 0xba,
    twdr: 0xbb,
    twcr: 0xbc,
};

const TWSR_PRESCALER_MASK: u8 = 0x03;

pub struct MmioTwi {
    map: RegisterMap,
}

impl MmioTwi {
    /// # Safety
    ///
    /// Every address in `map` must be a valid, byte-wide TWI register of the
    /// running part, and no other code may drive the peripheral except through
    /// this handle (or copies of the references handed to the engines).
    #[must_use]
    pub const unsafe fn new(map: RegisterMap) -> Self {
        Self { map }
    }

    fn read(&self, addr: usize) -> u8 {
        // SAFETY: address validity is the constructor's contract.
        unsafe { read_volatile(addr as *const u8) }
    }

    fn write(&self, addr: usize, value: u8) {
        // SAFETY: address validity is the constructor's contract.
        unsafe { write_volatile(addr as *mut u8, value) }
    }
}

impl TwiRegisters for MmioTwi {
    fn control(&self) -> u8 {
        self.read(self.map.twcr)
    }

    fn set_control(&self, value: u8) {
        self.write(self.map.twcr, value);
    }

    fn status(&self) -> u8 {
        self.read(self.map.twsr)
    }

    fn data(&self) -> u8 {
        self.read(self.map.twdr)
    }

    fn set_data(&self, value: u8) {
        self.write(self.map.twdr, value);
    }

    fn own_address(&self) -> u8 {
        self.read(self.map.twar)
    }

    fn set_own_address(&self, value: u8) {
        self.write(self.map.twar, value);
    }

    fn speed(&self) -> TwiSpeed {
        TwiSpeed::new(
            self.read(self.map.twbr),
            Prescaler::from_bits(self.read(self.map.twsr)),
        )
    }

    fn set_speed(&self, speed: TwiSpeed) {
        self.write(self.map.twbr, speed.bit_rate);
        // Status bits are read-only, only the prescaler bits take the write.
        self.write(self.map.twsr, speed.prescaler as u8 & TWSR_PRESCALER_MASK);
    }
}
