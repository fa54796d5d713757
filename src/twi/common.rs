// Licensed under the Apache-2.0 license

//! Common types and constants for the TWI engines.
//!
//! Register bit layouts, the bus clock encoding and the master configuration
//! builder shared by the master engine and the slave responder.

use crate::timeout::Millis;

// Control register bits.
pub const TWINT: u8 = 0x80;
pub const TWEA: u8 = 0x40;
pub const TWSTA: u8 = 0x20;
pub const TWSTO: u8 = 0x10;
pub const TWEN: u8 = 0x04;
pub const TWIE: u8 = 0x01;

/// Control bits that make up the persistent peripheral configuration
/// (enable, interrupt-enable, auto-acknowledge). Everything else is transient.
pub const CONFIG_BITS: u8 = TWEN | TWIE | TWEA;

/// Status register bits carrying the status code; the low bits hold the prescaler.
pub const STATUS_MASK: u8 = 0xf8;

/// Largest 7-bit bus address.
pub const MAX_ADDRESS: u8 = 0x7f;

/// Ceiling on bytes moved in one transfer, master or slave.
pub const MAX_TRANSFER: usize = 0xff;

/// Default bound on every hardware wait of the master engine.
pub const DEFAULT_TIMEOUT: Millis = Millis::millis(200);

/// Core clock the speed presets are computed for.
pub const DEFAULT_CPU_HZ: u32 = 16_000_000;

/// Direction bit appended to the address byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    Write = 0,
    Read = 1,
}

impl Direction {
    /// Address byte shifted out during the addressing phase.
    #[must_use]
    pub const fn address_byte(self, address: u8) -> u8 {
        (address << 1) | self as u8
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Prescaler {
    Div1 = 0,
    Div4 = 1,
    Div16 = 2,
    Div64 = 3,
}

impl Prescaler {
    const ALL: [Prescaler; 4] = [Self::Div1, Self::Div4, Self::Div16, Self::Div64];

    #[must_use]
    pub const fn factor(self) -> u32 {
        match self {
            Self::Div1 => 1,
            Self::Div4 => 4,
            Self::Div16 => 16,
            Self::Div64 => 64,
        }
    }

    /// Decode the prescaler from the low two bits of the status register.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Div1,
            1 => Self::Div4,
            2 => Self::Div16,
            _ => Self::Div64,
        }
    }
}

/// Bus clock selection: divisor register value plus prescaler.
///
/// `SCL = F_CPU / (16 + 2 * bit_rate * prescaler)`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TwiSpeed {
    pub bit_rate: u8,
    pub prescaler: Prescaler,
}

/// 10 kHz on a 16 MHz core.
pub const TWI_10K: TwiSpeed = TwiSpeed::new(198, Prescaler::Div4);
/// 40 kHz on a 16 MHz core.
pub const TWI_40K: TwiSpeed = TwiSpeed::new(192, Prescaler::Div1);
/// 100 kHz on a 16 MHz core.
pub const TWI_100K: TwiSpeed = TwiSpeed::new(72, Prescaler::Div1);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The requested SCL frequency is zero or faster than the core allows.
    FrequencyTooHigh,
    /// Even the largest divisor and prescaler cannot slow the bus down enough.
    FrequencyTooLow,
}

impl TwiSpeed {
    #[must_use]
    pub const fn new(bit_rate: u8, prescaler: Prescaler) -> Self {
        Self {
            bit_rate,
            prescaler,
        }
    }

    /// Compute the divisor for `scl_hz` on a core running at `cpu_hz`, using the
    /// smallest prescaler that keeps the divisor within one byte.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when no divisor/prescaler pair reaches the frequency.
    pub fn for_frequency(cpu_hz: u32, scl_hz: u32) -> Result<Self, ConfigError> {
        if scl_hz == 0 || cpu_hz / scl_hz < 16 {
            return Err(ConfigError::FrequencyTooHigh);
        }
        let cycles = cpu_hz / scl_hz - 16;
        for prescaler in Prescaler::ALL {
            let bit_rate = cycles / (2 * prescaler.factor());
            if let Ok(bit_rate) = u8::try_from(bit_rate) {
                return Ok(Self::new(bit_rate, prescaler));
            }
        }
        Err(ConfigError::FrequencyTooLow)
    }

    /// Resulting SCL frequency on a core running at `cpu_hz`.
    #[must_use]
    pub const fn scl_frequency(self, cpu_hz: u32) -> u32 {
        cpu_hz / (16 + 2 * self.bit_rate as u32 * self.prescaler.factor())
    }
}

impl Default for TwiSpeed {
    fn default() -> Self {
        TWI_100K
    }
}

/// Master engine configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TwiConfig {
    pub speed: TwiSpeed,
    /// Bound on every individual hardware wait.
    pub timeout: Millis,
}

impl Default for TwiConfig {
    fn default() -> Self {
        TwiConfigBuilder::new().build()
    }
}

pub struct TwiConfigBuilder {
    speed: TwiSpeed,
    timeout: Millis,
}

impl Default for TwiConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TwiConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            speed: TWI_100K,
            timeout: DEFAULT_TIMEOUT,
        }
    }
    #[must_use]
    pub fn speed(mut self, speed: TwiSpeed) -> Self {
        self.speed = speed;
        self
    }
    #[must_use]
    pub fn timeout(mut self, timeout: Millis) -> Self {
        self.timeout = timeout;
        self
    }
    #[must_use]
    pub fn build(self) -> TwiConfig {
        TwiConfig {
            speed: self.speed,
            timeout: self.timeout,
        }
    }
}
