// Licensed under the Apache-2.0 license

//! # TWI Peripheral Contract
//!
//! The master engine and the slave responder never touch hardware directly.
//! Both go through [`TwiRegisters`], the register-level contract of a TWI
//! peripheral:
//!
//! ```text
//! TwiRegisters
//!     ├── control      (TWINT, TWEA, TWSTA, TWSTO, TWEN, TWIE)
//!     ├── status       (coded bus condition, see `TwiStatus`)
//!     ├── data         (next byte out / last byte in / address + R/W)
//!     ├── own address  (7-bit slave address, shifted left by one)
//!     └── speed        (bit rate divisor + prescaler)
//! ```
//!
//! Accessors take `&self`. The registers are shared between foreground code
//! and the interrupt handler, the same way a PAC register block is shared;
//! sequences that must look atomic to the handler are wrapped in an
//! [`InterruptGuard`](crate::twi::guard::InterruptGuard) by the callers.

use crate::twi::common::TwiSpeed;

pub trait TwiRegisters {
    /// Read the control register. `TWINT` reads as 1 while an event is pending.
    fn control(&self) -> u8;

    /// Write the control register.
    ///
    /// Writing `TWINT` as 1 clears the flag and lets the hardware carry out the
    /// action encoded in the remaining bits.
    fn set_control(&self, value: u8);

    /// Raw status register. The low two bits carry the prescaler; callers mask them.
    fn status(&self) -> u8;

    fn data(&self) -> u8;

    fn set_data(&self, value: u8);

    /// Own-address register: address in bits 7..1, general call enable in bit 0.
    fn own_address(&self) -> u8;

    fn set_own_address(&self, value: u8);

    /// Current bus clock selection.
    fn speed(&self) -> TwiSpeed;

    fn set_speed(&self, speed: TwiSpeed);
}

impl<T: TwiRegisters + ?Sized> TwiRegisters for &T {
    fn control(&self) -> u8 {
        (**self).control()
    }
    fn set_control(&self, value: u8) {
        (**self).set_control(value);
    }
    fn status(&self) -> u8 {
        (**self).status()
    }
    fn data(&self) -> u8 {
        (**self).data()
    }
    fn set_data(&self, value: u8) {
        (**self).set_data(value);
    }
    fn own_address(&self) -> u8 {
        (**self).own_address()
    }
    fn set_own_address(&self, value: u8) {
        (**self).set_own_address(value);
    }
    fn speed(&self) -> TwiSpeed {
        (**self).speed()
    }
    fn set_speed(&self, speed: TwiSpeed) {
        (**self).set_speed(speed);
    }
}
