// Licensed under the Apache-2.0 license

//! Status codes reported by the TWI status register.
//!
//! Each code identifies the bus condition the hardware just completed. The
//! engines match exhaustively over [`TwiStatus`] instead of comparing raw bytes.

use crate::twi::common::STATUS_MASK;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TwiStatus {
    /// Illegal start or stop observed on the bus.
    BusError = 0x00,
    Start = 0x08,
    RepeatedStart = 0x10,

    // Master transmitter
    MtAddressAck = 0x18,
    MtAddressNack = 0x20,
    MtDataAck = 0x28,
    MtDataNack = 0x30,
    /// Arbitration lost in address or data phase (both master roles).
    ArbitrationLost = 0x38,

    // Master receiver
    MrAddressAck = 0x40,
    MrAddressNack = 0x48,
    MrDataAck = 0x50,
    MrDataNack = 0x58,

    // Slave receiver
    SrAddressAck = 0x60,
    SrArbitrationLostAddressAck = 0x68,
    SrGeneralCallAck = 0x70,
    SrArbitrationLostGeneralCallAck = 0x78,
    SrDataAck = 0x80,
    SrDataNack = 0x88,
    SrGeneralCallDataAck = 0x90,
    SrGeneralCallDataNack = 0x98,
    SrStop = 0xa0,

    // Slave transmitter
    StAddressAck = 0xa8,
    StArbitrationLostAddressAck = 0xb0,
    StDataAck = 0xb8,
    StDataNack = 0xc0,
    StLastData = 0xc8,

    /// No relevant state information; the interrupt flag is not set.
    NoInfo = 0xf8,
}

impl TwiStatus {
    /// Raw status code as it appears in the status register (prescaler bits clear).
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// True when this node was addressed as a slave right after losing arbitration.
    #[must_use]
    pub const fn addressed_after_arbitration_loss(self) -> bool {
        matches!(
            self,
            Self::SrArbitrationLostAddressAck
                | Self::SrArbitrationLostGeneralCallAck
                | Self::StArbitrationLostAddressAck
        )
    }
}

impl TryFrom<u8> for TwiStatus {
    /// The masked code that matched no known status.
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        let status = match raw & STATUS_MASK {
            0x00 => Self::BusError,
            0x08 => Self::Start,
            0x10 => Self::RepeatedStart,
            0x18 => Self::MtAddressAck,
            0x20 => Self::MtAddressNack,
            0x28 => Self::MtDataAck,
            0x30 => Self::MtDataNack,
            0x38 => Self::ArbitrationLost,
            0x40 => Self::MrAddressAck,
            0x48 => Self::MrAddressNack,
            0x50 => Self::MrDataAck,
            0x58 => Self::MrDataNack,
            0x60 => Self::SrAddressAck,
            0x68 => Self::SrArbitrationLostAddressAck,
            0x70 => Self::SrGeneralCallAck,
            0x78 => Self::SrArbitrationLostGeneralCallAck,
            0x80 => Self::SrDataAck,
            0x88 => Self::SrDataNack,
            0x90 => Self::SrGeneralCallDataAck,
            0x98 => Self::SrGeneralCallDataNack,
            0xa0 => Self::SrStop,
            0xa8 => Self::StAddressAck,
            0xb0 => Self::StArbitrationLostAddressAck,
            0xb8 => Self::StDataAck,
            0xc0 => Self::StDataNack,
            0xc8 => Self::StLastData,
            0xf8 => Self::NoInfo,
            other => return Err(other),
        };
        Ok(status)
    }
}
