// Licensed under the Apache-2.0 license

//! Shared crate plumbing: the injectable logger used by the bus engines.

use core::fmt;

/// Diagnostic sink injected into drivers as a generic parameter.
///
/// Drivers never allocate to log; messages arrive as pre-formatted
/// [`fmt::Arguments`] and the implementation decides where they go.
pub trait Logger {
    fn debug(&mut self, args: fmt::Arguments<'_>);
    fn error(&mut self, args: fmt::Arguments<'_>);
}

/// Logger that discards everything. The default for every driver.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn debug(&mut self, _args: fmt::Arguments<'_>) {}
    fn error(&mut self, _args: fmt::Arguments<'_>) {}
}

impl<L: Logger + ?Sized> Logger for &mut L {
    fn debug(&mut self, args: fmt::Arguments<'_>) {
        (**self).debug(args);
    }

    fn error(&mut self, args: fmt::Arguments<'_>) {
        (**self).error(args);
    }
}

/// Forwards driver diagnostics to the `log` facade under the `twi` target.
#[cfg(feature = "log")]
#[derive(Clone, Copy, Debug, Default)]
pub struct LogLogger;

#[cfg(feature = "log")]
impl Logger for LogLogger {
    fn debug(&mut self, args: fmt::Arguments<'_>) {
        log::debug!(target: "twi", "{}", args);
    }

    fn error(&mut self, args: fmt::Arguments<'_>) {
        log::error!(target: "twi", "{}", args);
    }
}

#[cfg(test)]
pub(crate) mod test_logger {
    use super::Logger;
    use core::fmt;
    use std::string::String;
    use std::vec::Vec;

    /// Captures every line so tests can assert on recovery diagnostics.
    #[derive(Default)]
    pub struct RecordingLogger {
        pub lines: Vec<String>,
    }

    impl Logger for RecordingLogger {
        fn debug(&mut self, args: fmt::Arguments<'_>) {
            self.lines.push(std::format!("DEBUG {args}"));
        }

        fn error(&mut self, args: fmt::Arguments<'_>) {
            self.lines.push(std::format!("ERROR {args}"));
        }
    }

    impl RecordingLogger {
        pub fn contains(&self, needle: &str) -> bool {
            self.lines.iter().any(|l| l.contains(needle))
        }
    }
}
