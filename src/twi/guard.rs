// Licensed under the Apache-2.0 license

//! Scoped interrupt masking.
//!
//! The slave responder's interrupt handler may run between any two register
//! writes of foreground code. Register sequences that must appear atomic to it
//! (snapshot then reconfigure, restore after a transaction) run while an
//! [`InterruptGuard`] is alive.
//!
//! Masking goes through the `critical-section` crate, so the final binary has
//! to link exactly one implementation for its target. On AVR that is
//! `avr-device` built with `critical-section-impl`, which disables global
//! interrupts with `cli` and restores `SREG`. The `cortex-m` feature supplies
//! the single-core Cortex-M implementation instead; host tests use the `std`
//! one.

use core::marker::PhantomData;

// Links the single-core Cortex-M critical-section provider.
#[cfg(feature = "cortex-m")]
use cortex_m as _;

/// Masks interrupts from construction until drop.
///
/// Guards must be dropped in reverse order of creation. Crate code only binds
/// them to a block scope and never moves them out of it.
#[must_use = "interrupts are unmasked again as soon as the guard is dropped"]
pub(crate) struct InterruptGuard {
    state: critical_section::RestoreState,
    _not_send: PhantomData<*mut ()>,
}

impl InterruptGuard {
    pub(crate) fn new() -> Self {
        // SAFETY: released exactly once, in Drop, in LIFO order with any nested guard.
        let state = unsafe { critical_section::acquire() };
        Self {
            state,
            _not_send: PhantomData,
        }
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        // SAFETY: `state` came from the matching `acquire` in `new`.
        unsafe { critical_section::release(self.state) }
    }
}
