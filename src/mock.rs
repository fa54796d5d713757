// Licensed under the Apache-2.0 license

//! Host-side simulation of a TWI peripheral and the bus behind it.
//!
//! `MockTwi` implements [`TwiRegisters`] with plain cells and reacts to control
//! register writes the way the hardware does: writing `TWINT` hands the current
//! step to the "hardware", which completes it immediately against a set of
//! scripted [`MockDevice`]s and raises `TWINT` again with the matching status.
//! Faults (a wedged peripheral, lost arbitration, bus errors) can be injected.
//! Slave-side statuses are raised by tests through [`MockTwi::raise`].

use crate::timeout::{Clock, Instant};
use crate::twi::common::{
    Direction, Prescaler, TwiSpeed, TWEA, TWEN, TWIE, TWINT, TWSTA, TWSTO,
};
use crate::twi::status::TwiStatus;
use crate::twi::traits::TwiRegisters;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::vec::Vec;

/// What the simulated bus saw, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    Start,
    RepeatedStart,
    Address { address: u8, read: bool, ack: bool },
    Write { byte: u8, ack: bool },
    Read { byte: u8, ack: bool },
    Stop,
}

/// A scripted slave on the simulated bus.
#[derive(Clone, Debug, Default)]
pub struct MockDevice {
    pub address: u8,
    /// Bytes written to the device by the master.
    pub received: Vec<u8>,
    /// Bytes handed out on reads; 0xff once exhausted.
    pub response: VecDeque<u8>,
    /// Reads return what was written, in order.
    pub echo: bool,
    /// Acknowledge only this many data bytes, then NACK.
    pub ack_limit: Option<usize>,
}

impl MockDevice {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    pub fn responding(mut self, bytes: &[u8]) -> Self {
        self.response.extend(bytes.iter().copied());
        self
    }

    pub fn echoing(mut self) -> Self {
        self.echo = true;
        self
    }

    pub fn acking(mut self, limit: usize) -> Self {
        self.ack_limit = Some(limit);
        self
    }

    fn accept(&mut self, byte: u8) -> bool {
        if self.ack_limit.is_some_and(|limit| self.received.len() >= limit) {
            return false;
        }
        self.received.push(byte);
        if self.echo {
            self.response.push_back(byte);
        }
        true
    }

    fn next(&mut self) -> u8 {
        self.response.pop_front().unwrap_or(0xff)
    }
}

pub struct MockTwi {
    control: Cell<u8>,
    status: Cell<u8>,
    data: Cell<u8>,
    own_address: Cell<u8>,
    speed: Cell<TwiSpeed>,
    bus_active: Cell<bool>,
    target: Cell<Option<usize>>,
    devices: RefCell<Vec<MockDevice>>,
    trace: RefCell<Vec<BusEvent>>,
    control_writes: RefCell<Vec<u8>>,
    data_writes: RefCell<Vec<u8>>,
    stuck: Cell<bool>,
    stuck_stop: Cell<bool>,
    address_status: Cell<Option<u8>>,
    bus_error_on_start: Cell<bool>,
    slave_service_in: Cell<Option<usize>>,
}

impl Default for MockTwi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTwi {
    pub fn new() -> Self {
        Self {
            control: Cell::new(0),
            status: Cell::new(TwiStatus::NoInfo.code()),
            data: Cell::new(0xff),
            own_address: Cell::new(0),
            speed: Cell::new(TwiSpeed::new(0, Prescaler::Div1)),
            bus_active: Cell::new(false),
            target: Cell::new(None),
            devices: RefCell::new(Vec::new()),
            trace: RefCell::new(Vec::new()),
            control_writes: RefCell::new(Vec::new()),
            data_writes: RefCell::new(Vec::new()),
            stuck: Cell::new(false),
            stuck_stop: Cell::new(false),
            address_status: Cell::new(None),
            bus_error_on_start: Cell::new(false),
            slave_service_in: Cell::new(None),
        }
    }

    pub fn with_device(self, device: MockDevice) -> Self {
        self.devices.borrow_mut().push(device);
        self
    }

    pub fn device(&self, address: u8) -> Option<MockDevice> {
        self.devices
            .borrow()
            .iter()
            .find(|d| d.address == address)
            .cloned()
    }

    pub fn trace(&self) -> Vec<BusEvent> {
        self.trace.borrow().clone()
    }

    pub fn count(&self, event: &BusEvent) -> usize {
        self.trace.borrow().iter().filter(|e| *e == event).count()
    }

    pub fn last_control_write(&self) -> Option<u8> {
        self.control_writes.borrow().last().copied()
    }

    pub fn control_writes(&self) -> Vec<u8> {
        self.control_writes.borrow().clone()
    }

    pub fn data_writes(&self) -> Vec<u8> {
        self.data_writes.borrow().clone()
    }

    /// Overwrite the control register without any hardware reaction.
    pub fn preset_control(&self, value: u8) {
        self.control.set(value);
    }

    pub fn preset_speed(&self, speed: TwiSpeed) {
        self.speed.set(speed);
    }

    /// The peripheral stops reacting: `TWINT` never rises and stop never completes.
    pub fn set_stuck(&self, stuck: bool) {
        self.stuck.set(stuck);
    }

    /// Only the stop condition hangs.
    pub fn set_stuck_stop(&self, stuck: bool) {
        self.stuck_stop.set(stuck);
    }

    /// Address phases lose arbitration to another master.
    pub fn lose_arbitration(&self, lose: bool) {
        self.answer_address_with(lose.then_some(TwiStatus::ArbitrationLost.code()));
    }

    /// Address phases complete with this raw status instead of reaching a device.
    pub fn answer_address_with(&self, status: Option<u8>) {
        self.address_status.set(status);
    }

    /// A slave interrupt handler clears the pending flag after `reads` more
    /// control register reads.
    pub fn service_slave_after(&self, reads: usize) {
        self.slave_service_in.set(Some(reads));
    }

    pub fn bus_error_on_start(&self, error: bool) {
        self.bus_error_on_start.set(error);
    }

    /// Raise a slave-side event: status, received byte, interrupt flag.
    pub fn raise(&self, status: TwiStatus, data: u8) {
        self.status.set(status.code());
        self.data.set(data);
        self.control.set(self.control.get() | TWINT);
    }

    fn complete(&self, control: u8, status: TwiStatus) {
        self.complete_raw(control, status.code());
    }

    fn complete_raw(&self, control: u8, raw: u8) {
        self.status.set(raw);
        self.control.set(control | TWINT);
    }

    fn address_phase(&self, control: u8) {
        let byte = self.data.get();
        let address = byte >> 1;
        let read = byte & Direction::Read as u8 != 0;
        if let Some(raw) = self.address_status.get() {
            let lost = TwiStatus::try_from(raw).is_ok_and(|status| {
                status == TwiStatus::ArbitrationLost || status.addressed_after_arbitration_loss()
            });
            if lost {
                self.bus_active.set(false);
            }
            self.complete_raw(control, raw);
            return;
        }
        let found = self
            .devices
            .borrow()
            .iter()
            .position(|d| d.address == address);
        self.target.set(found);
        let ack = found.is_some();
        self.trace
            .borrow_mut()
            .push(BusEvent::Address { address, read, ack });
        let status = match (read, ack) {
            (false, true) => TwiStatus::MtAddressAck,
            (false, false) => TwiStatus::MtAddressNack,
            (true, true) => TwiStatus::MrAddressAck,
            (true, false) => TwiStatus::MrAddressNack,
        };
        self.complete(control, status);
    }

    fn write_phase(&self, control: u8) {
        let byte = self.data.get();
        let ack = match self.target.get() {
            Some(index) => self.devices.borrow_mut()[index].accept(byte),
            None => false,
        };
        self.trace.borrow_mut().push(BusEvent::Write { byte, ack });
        let status = if ack {
            TwiStatus::MtDataAck
        } else {
            TwiStatus::MtDataNack
        };
        self.complete(control, status);
    }

    fn read_phase(&self, control: u8) {
        let byte = match self.target.get() {
            Some(index) => self.devices.borrow_mut()[index].next(),
            None => 0xff,
        };
        let ack = control & TWEA != 0;
        self.data.set(byte);
        self.trace.borrow_mut().push(BusEvent::Read { byte, ack });
        let status = if ack {
            TwiStatus::MrDataAck
        } else {
            TwiStatus::MrDataNack
        };
        self.complete(control, status);
    }
}

impl TwiRegisters for MockTwi {
    fn control(&self) -> u8 {
        match self.slave_service_in.get() {
            Some(0) => {
                self.slave_service_in.set(None);
                self.set_control(TWINT | TWEA | TWEN | TWIE);
            }
            Some(reads) => self.slave_service_in.set(Some(reads - 1)),
            None => {}
        }
        self.control.get()
    }

    fn set_control(&self, value: u8) {
        self.control_writes.borrow_mut().push(value);
        let control = value & !TWINT;

        if value & TWEN == 0 {
            // Disabling the module drops whatever it was doing.
            self.control.set(control);
            self.bus_active.set(false);
            self.target.set(None);
            self.status.set(TwiStatus::NoInfo.code());
            return;
        }
        if value & TWINT == 0 {
            // Writing zero leaves the flag alone.
            self.control.set(control | (self.control.get() & TWINT));
            return;
        }
        if self.stuck.get() {
            self.control.set(control);
            return;
        }

        if value & TWSTA != 0 {
            if self.bus_error_on_start.get() {
                self.complete(control, TwiStatus::BusError);
                return;
            }
            let (event, status) = if self.bus_active.get() {
                (BusEvent::RepeatedStart, TwiStatus::RepeatedStart)
            } else {
                (BusEvent::Start, TwiStatus::Start)
            };
            self.trace.borrow_mut().push(event);
            self.bus_active.set(true);
            self.target.set(None);
            self.complete(control, status);
        } else if value & TWSTO != 0 {
            if self.stuck_stop.get() {
                self.control.set(control);
                return;
            }
            if self.bus_active.get() {
                self.trace.borrow_mut().push(BusEvent::Stop);
            }
            self.bus_active.set(false);
            self.target.set(None);
            self.status.set(TwiStatus::NoInfo.code());
            // The flag is not raised after a stop.
            self.control.set(control & !TWSTO);
        } else {
            match TwiStatus::try_from(self.status.get()) {
                Ok(TwiStatus::Start | TwiStatus::RepeatedStart) => self.address_phase(control),
                Ok(TwiStatus::MtAddressAck | TwiStatus::MtDataAck) => self.write_phase(control),
                Ok(TwiStatus::MrAddressAck | TwiStatus::MrDataAck) => self.read_phase(control),
                // Slave-side and idle states: the test drives those.
                _ => self.control.set(control),
            }
        }
    }

    fn status(&self) -> u8 {
        self.status.get() | self.speed.get().prescaler as u8
    }

    fn data(&self) -> u8 {
        self.data.get()
    }

    fn set_data(&self, value: u8) {
        self.data_writes.borrow_mut().push(value);
        self.data.set(value);
    }

    fn own_address(&self) -> u8 {
        self.own_address.get()
    }

    fn set_own_address(&self, value: u8) {
        self.own_address.set(value);
    }

    fn speed(&self) -> TwiSpeed {
        self.speed.get()
    }

    fn set_speed(&self, speed: TwiSpeed) {
        self.speed.set(speed);
    }
}

/// Millisecond clock that advances by `step` every time it is read.
pub struct MockClock {
    now: Cell<u32>,
    step: u32,
}

impl MockClock {
    pub fn frozen(start: u32) -> Self {
        Self::stepping(start, 0)
    }

    pub fn stepping(start: u32, step: u32) -> Self {
        Self {
            now: Cell::new(start),
            step,
        }
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    /// Current time without advancing.
    pub fn peek(&self) -> u32 {
        self.now.get()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step));
        Instant::from_ticks(now)
    }
}
