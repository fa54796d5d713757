// Licensed under the Apache-2.0 license

//! One-shot deadlines over a monotonic millisecond clock.
//!
//! A [`Timeout`] "fires" once from [`Timeout::check`] after the interval given to
//! [`Timeout::reset`] has passed, then disables itself. There is no auto-repeat.
//! Deadlines are kept as wrapping millisecond ticks and compared through a signed
//! difference, so a free-running 32-bit counter may wrap freely as long as the
//! timeout is checked at least once every ~24 days.

/// Millisecond instant produced by a [`Clock`].
pub type Instant = fugit::TimerInstantU32<1_000>;

/// Millisecond interval.
pub type Millis = fugit::MillisDurationU32;

/// Monotonic millisecond time source.
pub trait Clock {
    fn now(&self) -> Instant;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

// Anything longer would be indistinguishable from a deadline in the past.
const MAX_INTERVAL_TICKS: u32 = i32::MAX as u32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timeout {
    deadline: Option<u32>,
}

impl Timeout {
    /// A timeout that never fires until it is [`reset`](Self::reset).
    #[must_use]
    pub const fn disabled() -> Self {
        Self { deadline: None }
    }

    /// Start a timeout that fires `interval` from now.
    #[must_use]
    pub fn new<C: Clock>(clock: &C, interval: Millis) -> Self {
        let mut timeout = Self::disabled();
        timeout.reset(clock, interval);
        timeout
    }

    /// Start (or restart) the timeout to fire `interval` from now.
    pub fn reset<C: Clock>(&mut self, clock: &C, interval: Millis) {
        let ticks = interval.ticks().min(MAX_INTERVAL_TICKS);
        self.deadline = Some(clock.now().ticks().wrapping_add(ticks));
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn disable(&mut self) {
        self.deadline = None;
    }

    /// Returns `true` exactly once when the deadline has passed.
    pub fn check<C: Clock>(&mut self, clock: &C) -> bool {
        match self.deadline {
            Some(deadline) if Self::until(deadline, clock) <= 0 => {
                self.disable();
                true
            }
            _ => false,
        }
    }

    /// Time left before the deadline; zero when due or disabled.
    ///
    /// This does not consume the deadline, callers still need [`check`](Self::check).
    #[must_use]
    pub fn remaining<C: Clock>(&self, clock: &C) -> Millis {
        match self.deadline {
            Some(deadline) => {
                let rem = Self::until(deadline, clock);
                Millis::millis(u32::try_from(rem).unwrap_or(0))
            }
            None => Millis::millis(0),
        }
    }

    fn until<C: Clock>(deadline: u32, clock: &C) -> i32 {
        // Two's complement reinterpretation is the wrap-around check.
        deadline.wrapping_sub(clock.now().ticks()) as i32
    }
}
