// Licensed under the Apache-2.0 license

//! TWI (I2C) bus engines.
//!
//! One peripheral, two roles:
//!
//! - [`TwiMaster`]: foreground, polling. Drives a transaction to completion or
//!   failure, every hardware wait bounded by a timeout.
//! - [`SlaveResponder`]: interrupt driven. Answers reads and writes addressed
//!   to this node by another master.
//!
//! Both reach the hardware through [`TwiRegisters`]. The master restores the
//! responder's configuration bits after every transaction, so the two can be
//! used side by side on the same bus.

pub mod common;
pub mod controller;
pub mod error;
pub(crate) mod guard;
pub mod master;
pub mod mmio;
#[cfg(feature = "twi_slave")]
pub mod slave;
pub mod status;
pub mod traits;

pub use common::{Direction, Prescaler, TwiConfig, TwiConfigBuilder, TwiSpeed};
pub use error::Error;
pub use master::{TransactionState, TwiMaster};
pub use mmio::{MmioTwi, RegisterMap, ATMEGA328P};
#[cfg(feature = "twi_slave")]
pub use slave::{SlaveDirection, SlaveHandler, SlaveResponder, Transfer};
pub use status::TwiStatus;
pub use traits::TwiRegisters;
