//! # Synchronization Primitives
//!
//! Critical sections and the kernel's blocking, rank-ordered mutex.
//!
//! ## Lock ranks
//!
//! Every [`Mutex`] carries a [`LockRank`]. A task may only acquire a lock
//! whose rank is strictly greater than the rank of every lock it already
//! holds. With `Samples < Render < Panel` this admits exactly the nestings
//! the dashboard needs:
//!
//! ```text
//!   Samples ──► Render ──► Panel
//!   (refresh)   (service → flush)
//! ```
//!
//! and rejects `Render → Samples`, the inversion that could deadlock the
//! Render Task against any other two-lock path. Each task tracks what it
//! holds in its own [`HeldLocks`] ledger.
//!
//! ## Blocking
//!
//! A contended `lock()` parks the calling task in the scheduler (state
//! `Blocked`) and lends its priority to the owner. Releasing the lock
//! wakes every waiter; they race again on their next run. The owner keeps
//! whatever is still lent to it through the other locks it holds. Before the
//! scheduler starts (and in host tests) contention simply spins.

use core::cell::{Cell, UnsafeCell};
use core::ops::{Deref, DerefMut};

use critical_section::CriticalSection;

use crate::error::Error;
use crate::kernel;
use crate::task::TaskId;

/// Execute a closure within a critical section (interrupts disabled).
///
/// This is the primary mechanism for safely accessing shared kernel state.
/// Interrupts are disabled on entry and restored on exit.
///
/// # Performance
/// Keep critical sections as short as possible to minimize interrupt latency.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection<'_>) -> R,
{
    critical_section::with(f)
}

// ---------------------------------------------------------------------------
// Lock ranks
// ---------------------------------------------------------------------------

/// Position of a lock in the global acquisition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LockRank {
    /// The Sample Store ring.
    Samples = 0,
    /// Render parameters and the toolkit service call.
    Render = 1,
    /// The display panel's pixel-transfer protocol.
    Panel = 2,
}

impl LockRank {
    const fn bit(self) -> u8 {
        1 << self as u8
    }

    const fn from_index(index: u32) -> LockRank {
        match index {
            0 => LockRank::Samples,
            1 => LockRank::Render,
            _ => LockRank::Panel,
        }
    }
}

/// Per-task record of held lock ranks.
///
/// Not `Sync`: each task owns its own ledger and passes it to every
/// `lock()` it performs.
#[derive(Debug, Default)]
pub struct HeldLocks {
    mask: Cell<u8>,
}

impl HeldLocks {
    pub const fn new() -> Self {
        Self { mask: Cell::new(0) }
    }

    /// Check that `rank` may be acquired given what is already held.
    pub fn check(&self, rank: LockRank) -> Result<(), Error> {
        let mask = self.mask.get();
        if mask >> rank as u8 != 0 {
            let highest = LockRank::from_index(7 - mask.leading_zeros());
            return Err(Error::LockOrder {
                held: highest,
                requested: rank,
            });
        }
        Ok(())
    }

    pub fn is_held(&self, rank: LockRank) -> bool {
        self.mask.get() & rank.bit() != 0
    }

    /// True when no lock is held.
    pub fn is_empty(&self) -> bool {
        self.mask.get() == 0
    }

    fn insert(&self, rank: LockRank) {
        self.mask.set(self.mask.get() | rank.bit());
    }

    fn remove(&self, rank: LockRank) {
        self.mask.set(self.mask.get() & !rank.bit());
    }
}

// ---------------------------------------------------------------------------
// Mutex
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockState {
    Free,
    /// Held; the owner is `None` when taken outside any task.
    Held(Option<TaskId>),
}

enum Attempt {
    Taken,
    Parked,
    Busy,
}

/// Blocking mutual-exclusion lock with indefinite wait.
///
/// The protected value is only reachable through a [`MutexGuard`], which
/// releases the lock on drop, including while unwinding.
pub struct Mutex<T> {
    rank: LockRank,
    state: critical_section::Mutex<Cell<LockState>>,
    data: UnsafeCell<T>,
}

// Safety: access to `data` is serialized by `state`, which is only read
// and written inside critical sections.
unsafe impl<T: Send> Sync for Mutex<T> {}
unsafe impl<T: Send> Send for Mutex<T> {}

impl<T> Mutex<T> {
    pub const fn new(rank: LockRank, value: T) -> Self {
        Self {
            rank,
            state: critical_section::Mutex::new(Cell::new(LockState::Free)),
            data: UnsafeCell::new(value),
        }
    }

    pub fn rank(&self) -> LockRank {
        self.rank
    }

    /// Whether `held` permits taking this lock now.
    pub fn try_order(&self, held: &HeldLocks) -> Result<(), Error> {
        held.check(self.rank)
    }

    /// Acquire the lock, waiting as long as it takes.
    ///
    /// # Panics
    /// If `held` already contains a lock of equal or higher rank.
    pub fn lock<'a>(&'a self, held: &'a HeldLocks) -> MutexGuard<'a, T> {
        if let Err(e) = held.check(self.rank) {
            panic!("{}", e);
        }

        loop {
            let attempt = critical_section(|cs| {
                let state = self.state.borrow(cs);
                match state.get() {
                    LockState::Free => {
                        state.set(LockState::Held(kernel::current_task()));
                        Attempt::Taken
                    }
                    LockState::Held(owner) => {
                        if kernel::park_on_lock(self.key(), owner) {
                            Attempt::Parked
                        } else {
                            Attempt::Busy
                        }
                    }
                }
            });
            match attempt {
                Attempt::Taken => break,
                // PendSV switches us out as soon as the critical section
                // ends; by the time we get here again the lock was released.
                Attempt::Parked => {}
                Attempt::Busy => core::hint::spin_loop(),
            }
        }

        held.insert(self.rank);
        MutexGuard { mutex: self, held }
    }

    /// Mutable access without locking; `&mut self` proves exclusivity.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    fn key(&self) -> usize {
        self as *const Self as *const () as usize
    }

    fn release(&self) {
        critical_section(|cs| {
            let state = self.state.borrow(cs);
            let owner = match state.get() {
                LockState::Held(owner) => owner,
                LockState::Free => None,
            };
            state.set(LockState::Free);
            kernel::lock_released(self.key(), owner);
        });
    }
}

/// RAII access to the value inside a [`Mutex`].
pub struct MutexGuard<'a, T> {
    mutex: &'a Mutex<T>,
    held: &'a HeldLocks,
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: the guard's existence means we own the lock.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: the guard's existence means we own the lock.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.release();
        self.held.remove(self.mutex.rank);
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_allowed_nesting() {
        let samples = Mutex::new(LockRank::Samples, 1u32);
        let render = Mutex::new(LockRank::Render, 2u32);
        let panel = Mutex::new(LockRank::Panel, 3u32);
        let held = HeldLocks::new();

        {
            let s = samples.lock(&held);
            let r = render.lock(&held);
            let p = panel.lock(&held);
            assert_eq!(*s + *r + *p, 6);
            assert!(held.is_held(LockRank::Samples));
            assert!(held.is_held(LockRank::Panel));
        }
        assert!(held.is_empty());

        // Render then panel, as the flush bridge does.
        let _r = render.lock(&held);
        let _p = panel.lock(&held);
    }

    #[test]
    fn test_render_then_samples_is_rejected() {
        let samples = Mutex::new(LockRank::Samples, ());
        let render = Mutex::new(LockRank::Render, ());
        let held = HeldLocks::new();

        let _r = render.lock(&held);
        assert_eq!(
            samples.try_order(&held),
            Err(Error::LockOrder {
                held: LockRank::Render,
                requested: LockRank::Samples,
            })
        );
    }

    #[test]
    #[should_panic(expected = "lock order violation")]
    fn test_inverted_lock_panics() {
        let samples = Mutex::new(LockRank::Samples, ());
        let render = Mutex::new(LockRank::Render, ());
        let held = HeldLocks::new();

        let _r = render.lock(&held);
        let _s = samples.lock(&held);
    }

    #[test]
    fn test_same_rank_twice_is_rejected() {
        let render = Mutex::new(LockRank::Render, ());
        let held = HeldLocks::new();
        let _r = render.lock(&held);
        assert!(render.try_order(&held).is_err());
    }

    #[test]
    fn test_lock_released_on_panic() {
        let m = Arc::new(Mutex::new(LockRank::Samples, 0u32));
        let m2 = Arc::clone(&m);
        let result = thread::spawn(move || {
            let held = HeldLocks::new();
            let mut g = m2.lock(&held);
            *g = 7;
            panic!("fault inside critical section");
        })
        .join();
        assert!(result.is_err());

        let held = HeldLocks::new();
        assert_eq!(*m.lock(&held), 7);
    }

    #[test]
    fn test_contended_increments_are_not_lost() {
        let m = Arc::new(Mutex::new(LockRank::Render, 0u64));
        let workers: std::vec::Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&m);
                thread::spawn(move || {
                    let held = HeldLocks::new();
                    for _ in 0..2_000 {
                        let mut g = m.lock(&held);
                        let v = *g;
                        core::hint::spin_loop();
                        *g = v + 1;
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        let held = HeldLocks::new();
        assert_eq!(*m.lock(&held), 8_000);
    }
}
