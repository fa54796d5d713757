// Licensed under the Apache-2.0 license

//! Polling master transaction engine.
//!
//! Every step writes the control register, then busy-waits for `TWINT` under a
//! [`Timeout`] and checks the resulting status against the one the protocol
//! expects. A mismatch fails the transaction immediately; there are no retries.
//!
//! Recovery depends on how the transaction failed:
//!
//! | outcome                               | recovery                                   |
//! |---------------------------------------|--------------------------------------------|
//! | address / data NACK, bus error        | stop condition, then restore control bits  |
//! | arbitration lost                      | restore control bits, no stop              |
//! | timeout                               | disable the peripheral, then restore       |
//! | slave event still pending at start    | none, nothing was written                  |
//!
//! The control bits restored are the enable / interrupt-enable / acknowledge
//! bits captured right before the first start of the transaction, so a slave
//! responder sharing the peripheral gets its configuration back after every
//! transaction.

use crate::common::{Logger, NoOpLogger};
use crate::timeout::{Clock, Timeout};
use crate::twi::common::{
    Direction, TwiConfig, TwiSpeed, CONFIG_BITS, MAX_ADDRESS, MAX_TRANSFER, STATUS_MASK, TWEA,
    TWEN, TWIE, TWINT, TWSTA, TWSTO,
};
use crate::twi::error::Error;
use crate::twi::guard::InterruptGuard;
use crate::twi::status::TwiStatus;
use crate::twi::traits::TwiRegisters;
use zerocopy::{FromBytes, Immutable, IntoBytes};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransactionState {
    /// No transaction open; the next start is a fresh start.
    Idle,
    /// This engine holds the bus; the next start is a repeated start.
    Started,
}

/// Peripheral state captured at construction and put back on drop.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct SavedConfig {
    control: u8,
    speed: TwiSpeed,
}

pub struct TwiMaster<'a, R: TwiRegisters, C: Clock, L: Logger = NoOpLogger> {
    regs: &'a R,
    clock: C,
    logger: L,
    config: TwiConfig,
    state: TransactionState,
    saved: SavedConfig,
    snapshot: u8,
    last_status: Option<u8>,
}

impl<'a, R: TwiRegisters, C: Clock> TwiMaster<'a, R, C> {
    /// Take over the peripheral for master use without logging.
    pub fn new(regs: &'a R, clock: C, config: TwiConfig) -> Self {
        Self::with_logger(regs, clock, config, NoOpLogger)
    }
}

impl<'a, R: TwiRegisters, C: Clock, L: Logger> TwiMaster<'a, R, C, L> {
    /// Take over the peripheral for master use.
    ///
    /// The current clock selection and configuration bits are saved and any
    /// pending start/stop request is dropped. The own-address register is left
    /// alone, so a configured slave responder keeps working between
    /// transactions.
    pub fn with_logger(regs: &'a R, clock: C, config: TwiConfig, logger: L) -> Self {
        let saved = {
            let _guard = InterruptGuard::new();
            let saved = SavedConfig {
                control: regs.control() & CONFIG_BITS,
                speed: regs.speed(),
            };
            regs.set_control(saved.control);
            regs.set_speed(config.speed);
            saved
        };
        Self {
            regs,
            clock,
            logger,
            config,
            state: TransactionState::Idle,
            saved,
            snapshot: saved.control,
            last_status: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &TwiConfig {
        &self.config
    }

    /// Masked status code observed by the most recent failed transaction.
    #[must_use]
    pub fn last_status(&self) -> Option<u8> {
        self.last_status
    }

    /// Write `bytes` to `address`.
    ///
    /// With `keep_bus` the transaction stays open and the next call starts with
    /// a repeated start.
    ///
    /// # Errors
    ///
    /// The first failure ends the transaction; see [`Error`].
    pub fn transmit(&mut self, address: u8, bytes: &[u8], keep_bus: bool) -> Result<(), Error> {
        check_args(address, bytes.len())?;
        let result = self
            .begin(address, Direction::Write)
            .and_then(|()| self.write_bytes(bytes));
        result.map_err(|e| self.fail(address, e))?;
        if !keep_bus {
            self.stop()?;
        }
        Ok(())
    }

    /// Read `buffer.len()` bytes from `address`, acknowledging all but the last.
    ///
    /// # Errors
    ///
    /// The first failure ends the transaction; see [`Error`]. An empty
    /// `buffer` is [`Error::BadArguments`]: a read has to end on a NACKed byte.
    pub fn receive(
        &mut self,
        address: u8,
        buffer: &mut [u8],
        keep_bus: bool,
    ) -> Result<(), Error> {
        check_read_args(address, buffer.len())?;
        let result = self
            .begin(address, Direction::Read)
            .and_then(|()| self.read_into(buffer, true));
        result.map_err(|e| self.fail(address, e))?;
        if !keep_bus {
            self.stop()?;
        }
        Ok(())
    }

    /// Write `bytes`, then read into `buffer` behind a repeated start.
    ///
    /// # Errors
    ///
    /// See [`Error`]. A failed write phase skips the read phase.
    pub fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Error> {
        check_args(address, bytes.len())?;
        check_read_args(address, buffer.len())?;
        self.transmit(address, bytes, true)?;
        self.receive(address, buffer, false)
    }

    /// Send a fixed-size record in one transaction.
    ///
    /// # Errors
    ///
    /// See [`Error`].
    pub fn transmit_record<T: IntoBytes + Immutable>(
        &mut self,
        address: u8,
        record: &T,
    ) -> Result<(), Error> {
        self.transmit(address, record.as_bytes(), false)
    }

    /// Fill a fixed-size record in one transaction.
    ///
    /// # Errors
    ///
    /// See [`Error`].
    pub fn receive_record<T: FromBytes + IntoBytes>(
        &mut self,
        address: u8,
        record: &mut T,
    ) -> Result<(), Error> {
        self.receive(address, record.as_mut_bytes(), false)
    }

    /// Write `request`, then read `response` without releasing the bus in
    /// between. Register-addressed devices are read this way.
    ///
    /// # Errors
    ///
    /// See [`Error`].
    pub fn transmit_receive<W, D>(
        &mut self,
        address: u8,
        request: &W,
        response: &mut D,
    ) -> Result<(), Error>
    where
        W: IntoBytes + Immutable,
        D: FromBytes + IntoBytes,
    {
        self.write_read(address, request.as_bytes(), response.as_mut_bytes())
    }

    /// Address-only write. `Ok` means a device acknowledged `address`.
    ///
    /// # Errors
    ///
    /// [`Error::AddressNack`] when nothing answers.
    pub fn ping(&mut self, address: u8) -> Result<(), Error> {
        self.transmit(address, &[], false)
    }

    /// Send a stop condition if a transaction is open.
    ///
    /// Never hangs: when the hardware does not confirm the stop in time the
    /// peripheral is disabled and re-enabled, the state goes back to idle and
    /// [`Error::Timeout`] is returned.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] as described above.
    pub fn stop(&mut self) -> Result<(), Error> {
        if self.state == TransactionState::Idle {
            return Ok(());
        }
        self.regs.set_control(TWINT | TWEN | TWSTO);
        let mut deadline = Timeout::new(&self.clock, self.config.timeout);
        while self.regs.control() & TWSTO != 0 {
            if deadline.check(&self.clock) {
                self.last_status = Some(self.regs.status() & STATUS_MASK);
                self.logger
                    .error(format_args!("twi: stop not confirmed, resetting peripheral"));
                self.abort();
                return Err(Error::Timeout);
            }
            core::hint::spin_loop();
        }
        self.restore(true);
        self.state = TransactionState::Idle;
        Ok(())
    }

    /// Give the peripheral back. Same as dropping the engine.
    pub fn release(self) {
        drop(self);
    }

    /// Start (or repeated start) followed by the address phase.
    pub(crate) fn begin(&mut self, address: u8, direction: Direction) -> Result<(), Error> {
        self.start()?;
        let expected = match direction {
            Direction::Write => TwiStatus::MtAddressAck,
            Direction::Read => TwiStatus::MrAddressAck,
        };
        self.send(direction.address_byte(address), expected)
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        for &byte in bytes {
            self.send(byte, TwiStatus::MtDataAck)?;
        }
        Ok(())
    }

    /// Read into `buffer`. With `nack_last` the final byte is not acknowledged,
    /// which tells the slave the read is over.
    pub(crate) fn read_into(&mut self, buffer: &mut [u8], nack_last: bool) -> Result<(), Error> {
        let last = buffer.len().saturating_sub(1);
        for (index, slot) in buffer.iter_mut().enumerate() {
            let ack = !(nack_last && index == last);
            if ack {
                self.regs.set_control(TWINT | TWEN | TWEA);
                self.expect(TwiStatus::MrDataAck)?;
            } else {
                self.regs.set_control(TWINT | TWEN);
                self.expect(TwiStatus::MrDataNack)?;
            }
            *slot = self.regs.data();
        }
        Ok(())
    }

    /// Run the recovery matching `error` and hand the error back.
    pub(crate) fn fail(&mut self, address: u8, error: Error) -> Error {
        let raw = self.regs.status() & STATUS_MASK;
        self.last_status = Some(raw);
        match error {
            Error::ArbitrationLost => {
                self.logger.debug(format_args!(
                    "twi: arbitration lost addressing 0x{address:02x} (status 0x{raw:02x})"
                ));
                // Addressed as a slave: leave the flag pending for the responder.
                let addressed = TwiStatus::try_from(raw)
                    .is_ok_and(TwiStatus::addressed_after_arbitration_loss);
                self.restore(!addressed);
                self.state = TransactionState::Idle;
            }
            Error::Timeout if self.state == TransactionState::Idle => {
                // The start was never issued; the peripheral is untouched.
                self.logger.debug(format_args!(
                    "twi: 0x{address:02x} not started, slave event still pending"
                ));
            }
            Error::Timeout => {
                self.logger.error(format_args!(
                    "twi: 0x{address:02x} timed out (status 0x{raw:02x}), resetting peripheral"
                ));
                self.abort();
            }
            Error::AddressNack | Error::DataNack => {
                self.logger.debug(format_args!(
                    "twi: 0x{address:02x} {error} (status 0x{raw:02x})"
                ));
                self.stop_logged();
            }
            Error::BusError => {
                self.logger.error(format_args!(
                    "twi: bus error talking to 0x{address:02x} (status 0x{raw:02x})"
                ));
                self.stop_logged();
            }
            Error::BadArguments => {}
        }
        error
    }

    fn stop_logged(&mut self) {
        if let Err(stop_error) = self.stop() {
            self.logger.error(format_args!("twi: stop: {stop_error}"));
        }
    }

    fn start(&mut self) -> Result<(), Error> {
        let expected = match self.state {
            TransactionState::Idle => {
                self.claim()?;
                TwiStatus::Start
            }
            TransactionState::Started => {
                self.regs.set_control(TWINT | TWSTA | TWEN);
                TwiStatus::RepeatedStart
            }
        };
        self.state = TransactionState::Started;
        self.expect(expected)
    }

    /// Snapshot the configuration bits and issue a fresh start.
    ///
    /// Writing `TWINT` would also clear an event still waiting for the slave
    /// responder, so the start is held back, with interrupts unmasked, until
    /// the interrupt handler has serviced it.
    fn claim(&mut self) -> Result<(), Error> {
        let mut deadline = Timeout::new(&self.clock, self.config.timeout);
        loop {
            {
                let _guard = InterruptGuard::new();
                let control = self.regs.control();
                if !slave_event_pending(control) {
                    self.snapshot = control & CONFIG_BITS;
                    // Interrupts and slave acknowledge stay off while this engine owns the bus.
                    self.regs.set_control(TWINT | TWSTA | TWEN);
                    return Ok(());
                }
            }
            if deadline.check(&self.clock) {
                return Err(Error::Timeout);
            }
            core::hint::spin_loop();
        }
    }

    fn send(&mut self, byte: u8, expected: TwiStatus) -> Result<(), Error> {
        self.regs.set_data(byte);
        self.regs.set_control(TWINT | TWEN);
        self.expect(expected)
    }

    fn expect(&mut self, expected: TwiStatus) -> Result<(), Error> {
        self.wait()?;
        match TwiStatus::try_from(self.regs.status()) {
            Ok(status) if status == expected => Ok(()),
            Ok(status) => Err(classify(status)),
            Err(_) => Err(Error::BusError),
        }
    }

    fn wait(&mut self) -> Result<(), Error> {
        let mut deadline = Timeout::new(&self.clock, self.config.timeout);
        while self.regs.control() & TWINT == 0 {
            if deadline.check(&self.clock) {
                return Err(Error::Timeout);
            }
            core::hint::spin_loop();
        }
        Ok(())
    }

    fn restore(&mut self, clear_flag: bool) {
        let _guard = InterruptGuard::new();
        let flag = if clear_flag { TWINT } else { 0 };
        self.regs.set_control(flag | self.snapshot);
    }

    /// Last-resort recovery: dropping the enable bit resets the hardware state machine.
    fn abort(&mut self) {
        {
            let _guard = InterruptGuard::new();
            self.regs.set_control(0);
            self.regs.set_control(TWINT | self.snapshot);
        }
        self.state = TransactionState::Idle;
    }
}

impl<R: TwiRegisters, C: Clock, L: Logger> Drop for TwiMaster<'_, R, C, L> {
    fn drop(&mut self) {
        self.stop_logged();
        let _guard = InterruptGuard::new();
        self.regs.set_speed(self.saved.speed);
        // Without TWINT: a pending slave event stays pending.
        self.regs.set_control(self.saved.control);
    }
}

fn check_args(address: u8, len: usize) -> Result<(), Error> {
    if address > MAX_ADDRESS || len > MAX_TRANSFER {
        return Err(Error::BadArguments);
    }
    Ok(())
}

fn check_read_args(address: u8, len: usize) -> Result<(), Error> {
    if len == 0 {
        return Err(Error::BadArguments);
    }
    check_args(address, len)
}

/// The slave responder has an event to service: flag raised with its interrupt enabled.
fn slave_event_pending(control: u8) -> bool {
    control & (TWINT | TWEN | TWIE) == TWINT | TWEN | TWIE
}

/// Error for a status the transaction did not expect.
fn classify(status: TwiStatus) -> Error {
    match status {
        TwiStatus::MtAddressNack | TwiStatus::MrAddressNack => Error::AddressNack,
        TwiStatus::MtDataNack => Error::DataNack,
        TwiStatus::ArbitrationLost
        | TwiStatus::SrArbitrationLostAddressAck
        | TwiStatus::SrArbitrationLostGeneralCallAck
        | TwiStatus::StArbitrationLostAddressAck => Error::ArbitrationLost,
        TwiStatus::BusError
        | TwiStatus::Start
        | TwiStatus::RepeatedStart
        | TwiStatus::MtAddressAck
        | TwiStatus::MtDataAck
        | TwiStatus::MrAddressAck
        | TwiStatus::MrDataAck
        | TwiStatus::MrDataNack
        | TwiStatus::SrAddressAck
        | TwiStatus::SrGeneralCallAck
        | TwiStatus::SrDataAck
        | TwiStatus::SrDataNack
        | TwiStatus::SrGeneralCallDataAck
        | TwiStatus::SrGeneralCallDataNack
        | TwiStatus::SrStop
        | TwiStatus::StAddressAck
        | TwiStatus::StDataAck
        | TwiStatus::StDataNack
        | TwiStatus::StLastData
        | TwiStatus::NoInfo => Error::BusError,
    }
}
