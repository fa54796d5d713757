// Licensed under the Apache-2.0 license

use core::fmt;
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

/// Failure outcomes of a master transaction.
///
/// A successful transaction is `Ok(())`; every other outcome is one of these.
/// The engine never retries. Retry policy belongs to the calling driver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The slave did not acknowledge its address.
    AddressNack,
    /// The slave did not acknowledge a data byte.
    DataNack,
    /// Another master won arbitration. No stop condition was sent.
    ArbitrationLost,
    /// Illegal start/stop sequencing, or a status the transaction cannot be in.
    BusError,
    /// The hardware did not reach the expected state in time. The peripheral
    /// has been forced idle before this is returned.
    Timeout,
    /// Rejected before touching the hardware.
    BadArguments,
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::AddressNack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            Error::DataNack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data),
            Error::ArbitrationLost => ErrorKind::ArbitrationLoss,
            Error::BusError => ErrorKind::Bus,
            Error::Timeout | Error::BadArguments => ErrorKind::Other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Error::AddressNack => "address not acknowledged",
            Error::DataNack => "data not acknowledged",
            Error::ArbitrationLost => "arbitration lost",
            Error::BusError => "bus error",
            Error::Timeout => "timed out",
            Error::BadArguments => "bad arguments",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::Error as _;

    #[test]
    fn maps_to_embedded_hal_kinds() {
        assert_eq!(
            Error::AddressNack.kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
        assert_eq!(
            Error::DataNack.kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
        );
        assert_eq!(Error::ArbitrationLost.kind(), ErrorKind::ArbitrationLoss);
        assert_eq!(Error::BusError.kind(), ErrorKind::Bus);
        assert_eq!(Error::Timeout.kind(), ErrorKind::Other);
    }

    #[test]
    fn displays_readable_text() {
        assert_eq!(std::format!("{}", Error::Timeout), "timed out");
        assert_eq!(std::format!("{}", Error::AddressNack), "address not acknowledged");
    }
}
