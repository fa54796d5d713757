// Licensed under the Apache-2.0 license

//! `embedded-hal` I2C interface for the master engine.
//!
//! Lets generic device drivers written against [`embedded_hal::i2c::I2c`] run
//! on top of [`TwiMaster`]. Errors keep their engine type and map onto
//! [`embedded_hal::i2c::ErrorKind`].

use crate::common::Logger;
use crate::timeout::Clock;
use crate::twi::common::{Direction, MAX_ADDRESS, MAX_TRANSFER};
use crate::twi::error::Error;
use crate::twi::master::TwiMaster;
use crate::twi::traits::TwiRegisters;
use embedded_hal::i2c::{Operation, SevenBitAddress};

impl<R: TwiRegisters, C: Clock, L: Logger> embedded_hal::i2c::ErrorType for TwiMaster<'_, R, C, L> {
    type Error = Error;
}

impl<R: TwiRegisters, C: Clock, L: Logger> embedded_hal::i2c::I2c for TwiMaster<'_, R, C, L> {
    fn read(&mut self, addr: SevenBitAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.receive(addr, buffer, false)
    }

    fn write(&mut self, addr: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        self.transmit(addr, bytes, false)
    }

    fn write_read(
        &mut self,
        addr: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        TwiMaster::write_read(self, addr, bytes, buffer)
    }

    /// Consecutive operations of the same kind share one address phase; a
    /// change of direction issues a repeated start. Only the last byte of each
    /// read group is NACKed. Empty reads carry no bytes and are skipped. A stop
    /// follows the last operation.
    fn transaction(
        &mut self,
        addr: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if addr > MAX_ADDRESS || operations.iter().any(|op| op_len(op) > MAX_TRANSFER) {
            return Err(Error::BadArguments);
        }
        let result = self.run_operations(addr, operations);
        result.map_err(|e| self.fail(addr, e))?;
        self.stop()
    }
}

impl<R: TwiRegisters, C: Clock, L: Logger> TwiMaster<'_, R, C, L> {
    fn run_operations(
        &mut self,
        addr: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Error> {
        let mut previous: Option<Direction> = None;
        for index in 0..operations.len() {
            let more_to_read = operations
                .get(index + 1..)
                .is_some_and(|rest| pending_read_bytes(rest));
            let Some(op) = operations.get_mut(index) else {
                break;
            };
            let direction = match op {
                Operation::Read(buffer) if buffer.is_empty() => continue,
                Operation::Read(_) => Direction::Read,
                Operation::Write(_) => Direction::Write,
            };
            if previous != Some(direction) {
                self.begin(addr, direction)?;
            }
            match op {
                Operation::Read(buffer) => self.read_into(buffer, !more_to_read)?,
                Operation::Write(bytes) => self.write_bytes(bytes)?,
            }
            previous = Some(direction);
        }
        Ok(())
    }
}

/// Bytes are still to be read in the current read group.
fn pending_read_bytes(rest: &[Operation<'_>]) -> bool {
    rest.iter()
        .take_while(|op| matches!(op, Operation::Read(_)))
        .any(|op| op_len(op) > 0)
}

fn op_len(op: &Operation<'_>) -> usize {
    match op {
        Operation::Read(buffer) => buffer.len(),
        Operation::Write(bytes) => bytes.len(),
    }
}
