//! # Desired Velocity Register
//!
//! Single slot holding the operator's most recent desired velocity command. It is written by the
//! desired velocity client's background thread and read once per cycle by the main loop. There is
//! no queueing: every write replaces the previous command, and a command is held until it is
//! replaced, however old it gets.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use comms_if::eqpt::vel::VelCmd;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Shared handle to the desired velocity slot. Clones refer to the same slot.
#[derive(Debug, Clone, Default)]
pub struct DesVelRegister {
    slot: Arc<Mutex<Option<HeldDesVel>>>,
}

/// A desired command along with the time it was received.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeldDesVel {
    pub cmd: VelCmd,
    pub received_at: DateTime<Utc>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl DesVelRegister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held command.
    pub fn write(&self, cmd: VelCmd) {
        *self.lock() = Some(HeldDesVel {
            cmd,
            received_at: Utc::now(),
        });
    }

    /// Get the held command, or the zero command if nothing has been received yet.
    pub fn read(&self) -> VelCmd {
        self.snapshot().map(|h| h.cmd).unwrap_or_default()
    }

    /// Get the held command and when it was received, or `None` if nothing has been received
    /// yet.
    pub fn snapshot(&self) -> Option<HeldDesVel> {
        *self.lock()
    }

    /// Lock the slot.
    ///
    /// The slot only ever holds a complete value, so a writer panicking while holding the lock
    /// can't leave it torn and a poisoned lock is recovered.
    fn lock(&self) -> MutexGuard<'_, Option<HeldDesVel>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl HeldDesVel {
    /// Time since the command was received.
    ///
    /// Units: seconds
    pub fn age_s(&self) -> f64 {
        util::time::duration_to_seconds(Utc::now() - self.received_at)
            .unwrap_or(std::f64::INFINITY)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;

    #[test]
    fn test_starts_at_zero() {
        let reg = DesVelRegister::new();

        assert_eq!(reg.snapshot(), None);
        assert_eq!(reg.read(), VelCmd::new(0.0, 0.0));
    }

    #[test]
    fn test_last_write_wins() {
        let reg = DesVelRegister::new();

        reg.write(VelCmd::new(1.0, 0.0));
        reg.write(VelCmd::new(0.5, 0.2));
        reg.write(VelCmd::new(-0.1, 0.4));

        assert_eq!(reg.read(), VelCmd::new(-0.1, 0.4));

        // Reading doesn't consume the command
        assert_eq!(reg.read(), VelCmd::new(-0.1, 0.4));

        let held = reg.snapshot().unwrap();
        assert!(held.age_s() >= 0.0);
        assert!(held.received_at <= Utc::now());
    }

    #[test]
    fn test_shared_across_threads() {
        let reg = DesVelRegister::new();
        let writer = reg.clone();

        thread::spawn(move || {
            for i in 0..100 {
                writer.write(VelCmd::new(i as f64, -(i as f64)));
            }
        }).join().unwrap();

        assert_eq!(reg.read(), VelCmd::new(99.0, -99.0));
    }

    #[test]
    fn test_poisoned_lock_recovered() {
        let reg = DesVelRegister::new();
        reg.write(VelCmd::new(0.3, 0.0));

        let poisoner = reg.clone();
        let result = thread::spawn(move || {
            let _guard = poisoner.slot.lock().unwrap();
            panic!("poison the register");
        }).join();
        assert!(result.is_err());

        assert_eq!(reg.read(), VelCmd::new(0.3, 0.0));
        reg.write(VelCmd::new(0.6, 0.0));
        assert_eq!(reg.read(), VelCmd::new(0.6, 0.0));
    }
}
