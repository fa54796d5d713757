// Licensed under the Apache-2.0 license

//! Interrupt-driven slave responder.
//!
//! Once [`SlaveResponder::begin`] has armed the peripheral, every bus event
//! addressed to this node raises the TWI interrupt and the interrupt handler
//! calls [`SlaveResponder::on_interrupt`]. The responder moves one byte per
//! interrupt between the bus and a buffer loaned by the application through a
//! [`Transfer`], and asks the application's [`SlaveHandler`] for buffers and
//! reports finished transfers.
//!
//! The responder acknowledges as long as the loaned buffer has room (or data)
//! left. When it runs out and the application has not promised more, the next
//! byte is not acknowledged, which tells the master the slave is done.
//!
//! Nothing here blocks or waits; the interrupt path does a bounded amount of
//! work per event.
//!
//! ```rust,ignore
//! static SLAVE: Mutex<RefCell<Option<SlaveResponder<'static, MmioTwi, Registers>>>> =
//!     Mutex::new(RefCell::new(None));
//!
//! #[interrupt]
//! fn TWI() {
//!     critical_section::with(|cs| {
//!         if let Some(slave) = SLAVE.borrow_ref_mut(cs).as_mut() {
//!             slave.on_interrupt();
//!         }
//!     });
//! }
//! ```

use crate::twi::common::{MAX_ADDRESS, MAX_TRANSFER, TWEA, TWEN, TWIE, TWINT, TWSTO};
use crate::twi::error::Error;
use crate::twi::guard::InterruptGuard;
use crate::twi::status::TwiStatus;
use crate::twi::traits::TwiRegisters;

/// Direction of a slave transfer, seen from this node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlaveDirection {
    /// The master writes, this node receives.
    Receive,
    /// The master reads, this node transmits.
    Transmit,
}

/// State of the slave transfer in progress and the buffer loaned to it.
#[derive(Debug, Default)]
pub struct Transfer<'a> {
    buf: Option<&'a mut [u8]>,
    pos: usize,
    end: usize,
    done: usize,
    more: bool,
    armed: bool,
}

impl<'a> Transfer<'a> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buf: None,
            pos: 0,
            end: 0,
            done: 0,
            more: false,
            armed: false,
        }
    }

    /// Loan `buf` to the current transfer, starting at its first byte.
    ///
    /// With `more`, running out of room asks the handler for another chunk
    /// instead of ending the transfer. Returns the buffer loaned before, if any.
    ///
    /// A chunk that no byte has gone through yet carries over to the next
    /// transfer, so foreground code can arm the first buffer in advance.
    pub fn use_buffer(&mut self, buf: &'a mut [u8], more: bool) -> Option<&'a mut [u8]> {
        self.pos = 0;
        self.end = buf.len();
        self.more = more;
        self.armed = true;
        self.buf.replace(buf)
    }

    /// Reuse the loaned buffer from its first byte.
    pub fn rewind(&mut self, more: bool) {
        self.pos = 0;
        self.end = self.buf.as_deref().map_or(0, <[u8]>::len);
        self.more = more;
        self.armed = true;
    }

    /// Take the loaned buffer back.
    pub fn take_buffer(&mut self) -> Option<&'a mut [u8]> {
        self.pos = 0;
        self.end = 0;
        self.armed = false;
        self.buf.take()
    }

    /// Bytes moved through the current chunk so far.
    #[must_use]
    pub fn processed(&self) -> &[u8] {
        self.buf
            .as_deref()
            .and_then(|buf| buf.get(..self.pos))
            .unwrap_or(&[])
    }

    /// Room (or data) left in the current chunk.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.pos)
    }

    /// Bytes moved since the transfer was addressed.
    #[must_use]
    pub fn done(&self) -> usize {
        self.done
    }

    #[must_use]
    pub fn more(&self) -> bool {
        self.more
    }

    fn start(&mut self) {
        if !self.armed {
            self.pos = 0;
            self.end = 0;
            self.more = false;
        }
        self.armed = false;
        self.done = 0;
    }

    fn has_room(&self) -> bool {
        self.remaining() > 0 && self.done < MAX_TRANSFER
    }

    fn exhausted(&self) -> bool {
        self.remaining() == 0 || self.done >= MAX_TRANSFER
    }

    fn push(&mut self, byte: u8) {
        if !self.has_room() {
            return;
        }
        if let Some(slot) = self.buf.as_deref_mut().and_then(|buf| buf.get_mut(self.pos)) {
            *slot = byte;
        }
        self.advance();
    }

    fn advance(&mut self) {
        self.pos += 1;
        self.done += 1;
        self.armed = false;
    }

    /// Next byte to transmit; zero once the data runs out.
    fn pull(&mut self) -> u8 {
        if !self.has_room() {
            return 0;
        }
        let byte = self
            .buf
            .as_deref()
            .and_then(|buf| buf.get(self.pos))
            .copied()
            .unwrap_or(0);
        self.advance();
        byte
    }
}

/// Application side of the slave responder. Both callbacks run in interrupt
/// context and must return quickly.
pub trait SlaveHandler<'a> {
    /// The master addressed this node (`done == 0`) or the current chunk ran
    /// out while more was promised. Loan a buffer with
    /// [`Transfer::use_buffer`] or [`Transfer::rewind`]; doing neither ends the
    /// transfer.
    fn on_request(&mut self, direction: SlaveDirection, done: usize, transfer: &mut Transfer<'a>);

    /// The transfer ended after `done` bytes.
    fn on_complete(&mut self, direction: SlaveDirection, done: usize, transfer: &mut Transfer<'a>);
}

pub struct SlaveResponder<'a, R: TwiRegisters, H: SlaveHandler<'a>> {
    regs: &'a R,
    handler: H,
    transfer: Transfer<'a>,
}

impl<'a, R: TwiRegisters, H: SlaveHandler<'a>> SlaveResponder<'a, R, H> {
    pub fn new(regs: &'a R, handler: H) -> Self {
        Self {
            regs,
            handler,
            transfer: Transfer::new(),
        }
    }

    /// Program the own address and arm interrupt-driven operation.
    ///
    /// # Errors
    ///
    /// [`Error::BadArguments`] when `address` is not a 7-bit address.
    pub fn begin(&mut self, address: u8) -> Result<(), Error> {
        if address > MAX_ADDRESS {
            return Err(Error::BadArguments);
        }
        let _guard = InterruptGuard::new();
        self.regs.set_own_address(address << 1);
        self.regs.set_control(TWINT | TWEA | TWEN | TWIE);
        Ok(())
    }

    /// Pre-arm a buffer from foreground code.
    pub fn use_buffer(&mut self, buf: &'a mut [u8], more: bool) -> Option<&'a mut [u8]> {
        let _guard = InterruptGuard::new();
        self.transfer.use_buffer(buf, more)
    }

    pub fn transfer(&self) -> &Transfer<'a> {
        &self.transfer
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Interrupt handler body. Services exactly one bus event.
    pub fn on_interrupt(&mut self) {
        let mut control = TWEN | TWIE | TWEA;
        match TwiStatus::try_from(self.regs.status()) {
            Ok(TwiStatus::SrAddressAck | TwiStatus::SrArbitrationLostAddressAck) => {
                self.transfer.start();
                self.handler
                    .on_request(SlaveDirection::Receive, 0, &mut self.transfer);
                control = self.ack_if_room(control);
            }
            Ok(TwiStatus::SrDataAck) => {
                self.transfer.push(self.regs.data());
                self.refill(SlaveDirection::Receive);
                control = self.ack_if_room(control);
            }
            Ok(TwiStatus::SrDataNack) => {
                self.transfer.push(self.regs.data());
                self.complete(SlaveDirection::Receive);
            }
            Ok(TwiStatus::SrStop) => self.complete(SlaveDirection::Receive),
            Ok(TwiStatus::StAddressAck | TwiStatus::StArbitrationLostAddressAck) => {
                self.transfer.start();
                self.handler
                    .on_request(SlaveDirection::Transmit, 0, &mut self.transfer);
                control = self.transmit_next(control);
            }
            Ok(TwiStatus::StDataAck) => control = self.transmit_next(control),
            Ok(TwiStatus::StDataNack | TwiStatus::StLastData) => {
                self.complete(SlaveDirection::Transmit);
            }
            Ok(TwiStatus::BusError) => control |= TWSTO,
            Ok(
                TwiStatus::Start
                | TwiStatus::RepeatedStart
                | TwiStatus::MtAddressAck
                | TwiStatus::MtAddressNack
                | TwiStatus::MtDataAck
                | TwiStatus::MtDataNack
                | TwiStatus::ArbitrationLost
                | TwiStatus::MrAddressAck
                | TwiStatus::MrAddressNack
                | TwiStatus::MrDataAck
                | TwiStatus::MrDataNack
                | TwiStatus::SrGeneralCallAck
                | TwiStatus::SrArbitrationLostGeneralCallAck
                | TwiStatus::SrGeneralCallDataAck
                | TwiStatus::SrGeneralCallDataNack
                | TwiStatus::NoInfo,
            )
            | Err(_) => {}
        }
        self.regs.set_control(control | TWINT);
    }

    fn transmit_next(&mut self, control: u8) -> u8 {
        let byte = self.transfer.pull();
        self.regs.set_data(byte);
        self.refill(SlaveDirection::Transmit);
        self.ack_if_room(control)
    }

    fn refill(&mut self, direction: SlaveDirection) {
        if self.transfer.remaining() == 0 && self.transfer.more {
            let done = self.transfer.done;
            self.handler.on_request(direction, done, &mut self.transfer);
        }
    }

    fn complete(&mut self, direction: SlaveDirection) {
        let done = self.transfer.done;
        self.handler.on_complete(direction, done, &mut self.transfer);
    }

    fn ack_if_room(&self, control: u8) -> u8 {
        if self.transfer.exhausted() {
            control & !TWEA
        } else {
            control
        }
    }
}
