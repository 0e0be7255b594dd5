//! Interrupt handling while a stub server runs.
//!
//! # Responsibilities
//! - Save the current SIGINT disposition when the first server starts
//! - Install a handler that terminates the whole process on Ctrl-C
//! - Restore the saved disposition when the last guard is dropped
//!
//! # Design Decisions
//! - SIGINT is process-wide, so guards share one reference-counted slot
//! - The installed handler only calls `_exit`, which is async-signal-safe
//! - No-op on non-unix targets

use std::io;
#[cfg(unix)]
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Exit status used when the interrupt handler terminates the process.
pub const INTERRUPT_EXIT_CODE: i32 = 130;

/// Live guards and the disposition saved by the first of them.
#[cfg(unix)]
struct Installed {
    guards: usize,
    previous: Option<libc::sigaction>,
}

#[cfg(unix)]
static INSTALLED: Mutex<Installed> = Mutex::new(Installed {
    guards: 0,
    previous: None,
});

#[cfg(unix)]
fn installed() -> MutexGuard<'static, Installed> {
    INSTALLED.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps the terminating SIGINT handler in place while alive.
///
/// Overlapping guards share one installation; the handler that was active
/// before the first guard comes back when the last one is dropped.
pub struct InterruptGuard {
    _private: (),
}

impl std::fmt::Debug for InterruptGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterruptGuard").finish_non_exhaustive()
    }
}

#[cfg(unix)]
extern "C" fn terminate(_signal: libc::c_int) {
    // SAFETY: `_exit` is async-signal-safe and never returns.
    unsafe { libc::_exit(INTERRUPT_EXIT_CODE) }
}

impl InterruptGuard {
    /// Replace the SIGINT handler with one that terminates the process.
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        let mut slot = installed();
        if slot.guards == 0 {
            // SAFETY: both sigaction structs are fully initialized before use and
            // `terminate` has the signature the kernel expects for `sa_handler`.
            let previous = unsafe {
                let mut action: libc::sigaction = std::mem::zeroed();
                action.sa_sigaction = terminate as extern "C" fn(libc::c_int) as libc::sighandler_t;
                libc::sigemptyset(&mut action.sa_mask);

                let mut previous: libc::sigaction = std::mem::zeroed();
                if libc::sigaction(libc::SIGINT, &action, &mut previous) != 0 {
                    return Err(io::Error::last_os_error());
                }
                previous
            };
            slot.previous = Some(previous);
            tracing::debug!("Interrupt handler installed");
        }
        slot.guards += 1;
        Ok(Self { _private: () })
    }

    #[cfg(not(unix))]
    pub fn install() -> io::Result<Self> {
        Ok(Self { _private: () })
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            let mut slot = installed();
            slot.guards = slot.guards.saturating_sub(1);
            if slot.guards > 0 {
                return;
            }
            let Some(previous) = slot.previous.take() else {
                return;
            };
            // SAFETY: `previous` was filled in by a successful sigaction call.
            let rc = unsafe { libc::sigaction(libc::SIGINT, &previous, std::ptr::null_mut()) };
            if rc != 0 {
                tracing::warn!(
                    error = %io::Error::last_os_error(),
                    "Failed to restore interrupt handler"
                );
                return;
            }
        }
        tracing::debug!("Interrupt handler restored");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn current_handler() -> libc::sighandler_t {
        unsafe {
            let mut current: libc::sigaction = std::mem::zeroed();
            libc::sigaction(libc::SIGINT, std::ptr::null(), &mut current);
            current.sa_sigaction
        }
    }

    fn terminate_handler() -> libc::sighandler_t {
        terminate as extern "C" fn(libc::c_int) as libc::sighandler_t
    }

    // One test only: SIGINT is shared by every test in this binary.
    #[test]
    fn test_install_and_restore() {
        let before = current_handler();

        let guard = InterruptGuard::install().unwrap();
        assert_eq!(current_handler(), terminate_handler());
        drop(guard);
        assert_eq!(current_handler(), before);

        // Overlapping guards dropped in start order.
        let first = InterruptGuard::install().unwrap();
        let second = InterruptGuard::install().unwrap();
        drop(first);
        assert_eq!(current_handler(), terminate_handler());
        drop(second);
        assert_eq!(current_handler(), before);
        assert_eq!(installed().guards, 0);
    }
}
