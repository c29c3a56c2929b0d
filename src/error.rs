//! # Errors
//!
//! One error type for the kernel and the dashboard. Every variant is
//! either a bootstrap failure (fatal, see [`crate::system::fatal`]) or a
//! programming error surfaced by a checked API.

use core::fmt;

use crate::sync::LockRank;

/// Everything that can go wrong in DashOS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// All `MAX_TASKS` slots are taken.
    TaskTableFull,
    /// A task asked for a stack outside `[MIN_STACK_BYTES, STACK_SIZE]`.
    InvalidStack { requested: usize },
    /// The sensor did not come up.
    SensorInit,
    /// The toolkit ran out of widget slots.
    WidgetCapacity,
    /// A lock was requested while a lock of equal or higher rank is held.
    LockOrder { held: LockRank, requested: LockRank },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TaskTableFull => write!(f, "task table full"),
            Error::InvalidStack { requested } => {
                write!(f, "invalid stack size: {} bytes", requested)
            }
            Error::SensorInit => write!(f, "sensor init failed"),
            Error::WidgetCapacity => write!(f, "out of widget slots"),
            Error::LockOrder { held, requested } => write!(
                f,
                "lock order violation: {:?} requested while holding {:?}",
                requested, held
            ),
        }
    }
}

impl core::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    #[test]
    fn test_display() {
        assert_eq!(Error::TaskTableFull.to_string(), "task table full");
        assert_eq!(
            Error::InvalidStack { requested: 16 }.to_string(),
            "invalid stack size: 16 bytes"
        );
        assert_eq!(
            Error::LockOrder {
                held: LockRank::Render,
                requested: LockRank::Samples,
            }
            .to_string(),
            "lock order violation: Samples requested while holding Render"
        );
    }

    #[test]
    fn test_every_variant_has_a_distinct_message() {
        let all = [
            Error::TaskTableFull,
            Error::InvalidStack { requested: 0 },
            Error::SensorInit,
            Error::WidgetCapacity,
            Error::LockOrder {
                held: LockRank::Panel,
                requested: LockRank::Render,
            },
        ];
        for (i, a) in all.iter().enumerate() {
            // Exhaustive: a new variant must be listed above.
            match a {
                Error::TaskTableFull
                | Error::InvalidStack { .. }
                | Error::SensorInit
                | Error::WidgetCapacity
                | Error::LockOrder { .. } => {}
            }
            for b in &all[i + 1..] {
                assert_ne!(a.to_string(), b.to_string());
            }
        }
        assert_eq!(Error::WidgetCapacity.to_string(), "out of widget slots");
    }
}
