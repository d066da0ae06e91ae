//! Interrupt masking around state shared with the completion handler.
//!
//! Entering saves the current mask and disables preemption; leaving restores
//! exactly what was saved. A section entered while another one is already open
//! therefore leaves interrupts masked on exit, and only the outermost exit
//! re-enables them.
//!
//! The masking itself is provided by the [`critical_section`] implementation
//! linked into the final binary (for example `cortex-m`'s single-core one, or
//! the `std` one on a host).
//!
//! # Example
//! ```ignore
//! let outer = ph_acquire::critical::enter();
//! let inner = ph_acquire::critical::enter();
//! inner.exit(); // still masked
//! outer.exit(); // prior state restored
//! ```

use core::marker::PhantomData;

use critical_section::RestoreState;

pub use critical_section::CriticalSection;

/// An open critical section. Leaves it when dropped.
///
/// Guards must be released in the reverse order they were entered. The guard
/// is `!Send` so it can't be released from a different execution context.
#[must_use = "dropping the guard leaves the critical section immediately"]
pub struct Guard {
    saved: RestoreState,
    _not_send: PhantomData<*mut ()>,
}

/// Disable preemption, remembering whether it was enabled before.
#[inline]
pub fn enter() -> Guard {
    // SAFETY: the matching `release` runs exactly once, in `Guard::drop`.
    let saved = unsafe { critical_section::acquire() };
    Guard {
        saved,
        _not_send: PhantomData,
    }
}

impl Guard {
    /// Token proving that preemption is masked while it lives.
    #[inline]
    pub fn token(&self) -> CriticalSection<'_> {
        // SAFETY: the token borrows the guard, so it can't outlive the section.
        unsafe { CriticalSection::new() }
    }

    /// Leave the section, restoring the saved preemption state.
    #[inline]
    pub fn exit(self) {
        drop(self);
    }
}

impl Drop for Guard {
    #[inline]
    fn drop(&mut self) {
        // SAFETY: `saved` came from the `acquire` in `enter`.
        unsafe { critical_section::release(self.saved) };
    }
}

/// Run `f` with preemption masked.
#[inline]
pub fn with<R>(f: impl FnOnce(CriticalSection<'_>) -> R) -> R {
    let guard = enter();
    f(guard.token())
}

#[cfg(test)]
mod tests {
    use super::{enter, with};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn with_returns_closure_value() {
        assert_eq!(with(|_| 7), 7);
    }

    #[test]
    fn nested_sections_do_not_deadlock() {
        let outer = enter();
        let value = with(|_| with(|_| 3));
        outer.exit();
        assert_eq!(value, 3);
    }

    #[test]
    fn inner_exit_keeps_outer_section_closed() {
        let entered = AtomicBool::new(false);

        thread::scope(|s| {
            let outer = enter();
            let inner = enter();
            inner.exit();

            let waiter = s.spawn(|| {
                with(|_| entered.store(true, Ordering::SeqCst));
            });

            thread::sleep(Duration::from_millis(50));
            assert!(!entered.load(Ordering::SeqCst));

            outer.exit();
            waiter.join().unwrap();
        });

        assert!(entered.load(Ordering::SeqCst));
    }
}
