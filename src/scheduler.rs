//! # Scheduler
//!
//! Core scheduling logic for DashOS: fixed-priority preemptive scheduling
//! with round-robin among equal priorities.
//!
//! ## Scheduling Algorithm
//!
//! At each SysTick interrupt:
//! 1. **Advance time**: increment the (wrapping) tick counter
//! 2. **Wake sleepers**: every `Sleeping` task whose deadline is reached
//!    becomes `Ready`; a wake-up above the current priority preempts
//! 3. **Decrement time slice**: if expired, let an equal-priority peer run
//! 4. **Select next task**: highest effective-priority runnable task,
//!    scanning from the slot after the current one so peers alternate
//! 5. **Context switch**: if the selection differs, trigger PendSV
//!
//! ## Locks
//!
//! A task that finds a lock held is parked as `Blocked { lock, owner }`
//! and its priority is lent to the owner for as long as it stays parked.
//! A release wakes every task parked on that lock; the owner keeps the
//! highest priority still waiting on the other locks it holds.

use crate::config::MAX_TASKS;
use crate::error::Error;
use crate::task::{TaskConfig, TaskControlBlock, TaskEntry, TaskId, TaskState};
use crate::time::reached;

// ---------------------------------------------------------------------------
// Scheduler struct
// ---------------------------------------------------------------------------

/// The central scheduler state. Holds all task control blocks and the
/// tick counter. Stored behind a critical-section mutex in `kernel.rs`.
///
/// ## Design Notes
///
/// - All tasks are stored inline in a fixed-size array (no heap)
/// - `current_task` tracks the index of the currently running task
/// - The idle task (index 0, priority 0) is always runnable
pub struct Scheduler {
    /// Fixed-size array of TCBs. Index 0 is reserved for the idle task.
    pub tasks: [TaskControlBlock; MAX_TASKS],

    /// Index of the currently running task.
    pub current_task: usize,

    /// Number of allocated tasks (including idle task).
    pub task_count: usize,

    /// Wrapping tick counter, one tick per millisecond.
    pub tick_count: u32,

    /// Flag set when a context switch should occur.
    pub needs_reschedule: bool,
}

impl Scheduler {
    /// Create an empty scheduler. The kernel adds the idle task first.
    pub const fn new() -> Self {
        Self {
            tasks: [TaskControlBlock::EMPTY; MAX_TASKS],
            current_task: 0,
            task_count: 0,
            tick_count: 0,
            needs_reschedule: false,
        }
    }

    /// Register a new task with the scheduler.
    ///
    /// # Returns
    /// - `Ok(task_id)` — the index of the newly created task
    /// - `Err(Error::TaskTableFull)` — if the task array is full
    /// - `Err(Error::InvalidStack)` — if the stack size is out of range
    pub fn create_task(
        &mut self,
        name: &'static str,
        config: TaskConfig,
        entry: TaskEntry,
    ) -> Result<TaskId, Error> {
        config.validate()?;
        if self.task_count >= MAX_TASKS {
            return Err(Error::TaskTableFull);
        }

        let id = TaskId(self.task_count);
        self.tasks[id.0].init(id, name, config, entry);
        self.task_count += 1;
        Ok(id)
    }

    /// Called from the SysTick handler every tick.
    pub fn tick(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);
        let now = self.tick_count;
        let current = self.current_task;
        let running_prio = self.tasks[current].effective_priority();

        // --- Wake sleepers ---
        for tcb in self.tasks[..self.task_count].iter_mut() {
            if let TaskState::Sleeping { until } = tcb.state {
                if reached(now, until) {
                    tcb.state = TaskState::Ready;
                    if tcb.effective_priority() > running_prio {
                        self.needs_reschedule = true;
                    }
                }
            }
        }

        // --- Time slice of the running task ---
        let tcb = &mut self.tasks[current];
        if tcb.state != TaskState::Running {
            return;
        }
        tcb.total_ticks = tcb.total_ticks.wrapping_add(1);
        tcb.ticks_remaining = tcb.ticks_remaining.saturating_sub(1);
        if tcb.ticks_remaining == 0 {
            tcb.ticks_remaining = tcb.config.effective_time_slice();
            if self.has_ready_peer(current) {
                self.needs_reschedule = true;
            }
        }
    }

    /// Is another task of the same effective priority ready to run?
    fn has_ready_peer(&self, current: usize) -> bool {
        let prio = self.tasks[current].effective_priority();
        self.tasks[..self.task_count]
            .iter()
            .enumerate()
            .any(|(i, t)| i != current && t.state == TaskState::Ready && t.effective_priority() == prio)
    }

    /// Select the next task to run.
    ///
    /// Picks the highest effective-priority runnable task. Among equals,
    /// the scan starts after the current task so peers take turns.
    /// Falls back to the idle task (index 0).
    ///
    /// # Returns
    /// Index of the next task to run.
    pub fn schedule(&mut self) -> usize {
        let count = self.task_count;
        let mut best_task: usize = 0;
        let mut best_priority: Option<u8> = None;

        for offset in 1..=count {
            let i = (self.current_task + offset) % count.max(1);
            let tcb = &self.tasks[i];
            if !tcb.is_runnable() {
                continue;
            }
            let prio = tcb.effective_priority();
            if best_priority.map_or(true, |best| prio > best) {
                best_priority = Some(prio);
                best_task = i;
            }
        }

        // Mark previous task as Ready (if it was Running)
        let prev = self.current_task;
        if self.tasks[prev].state == TaskState::Running {
            self.tasks[prev].state = TaskState::Ready;
        }

        if best_task < count {
            self.tasks[best_task].state = TaskState::Running;
        }

        self.current_task = best_task;
        self.needs_reschedule = false;

        best_task
    }

    /// Give up the CPU; the current task stays `Ready`.
    pub fn yield_current(&mut self) {
        let tcb = &mut self.tasks[self.current_task];
        if tcb.state == TaskState::Running {
            tcb.state = TaskState::Ready;
            tcb.ticks_remaining = tcb.config.effective_time_slice();
        }
        self.needs_reschedule = true;
    }

    /// Put the current task to sleep until tick `until`.
    ///
    /// Returns `false` (and does nothing) if `until` has already passed
    /// or the current task is the idle task.
    pub fn sleep_current_until(&mut self, until: u32) -> bool {
        let current = self.current_task;
        if current == TaskId::IDLE.0 || reached(self.tick_count, until) {
            return false;
        }
        self.tasks[current].state = TaskState::Sleeping { until };
        self.needs_reschedule = true;
        true
    }

    /// Park the current task on `lock`, currently held by `owner`.
    ///
    /// The owner inherits the parked task's priority if that is higher.
    pub fn block_current_on(&mut self, lock: usize, owner: Option<TaskId>) {
        let current = self.current_task;
        let owner = owner.filter(|o| o.0 < self.task_count);
        let prio = self.tasks[current].effective_priority();
        self.tasks[current].state = TaskState::Blocked { lock, owner };

        if let Some(owner) = owner {
            let tcb = &mut self.tasks[owner.0];
            if tcb.effective_priority() < prio {
                tcb.inherited_priority = Some(prio);
            }
        }
        self.needs_reschedule = true;
    }

    /// `owner` released `lock`: wake every task parked on the lock, then
    /// recompute what the owner still inherits from tasks parked on the
    /// other locks it holds.
    pub fn lock_released(&mut self, lock: usize, owner: Option<TaskId>) {
        let running_prio = self.tasks[self.current_task].effective_priority();
        for tcb in self.tasks[..self.task_count].iter_mut() {
            if matches!(tcb.state, TaskState::Blocked { lock: l, .. } if l == lock) {
                tcb.state = TaskState::Ready;
                if tcb.effective_priority() >= running_prio {
                    self.needs_reschedule = true;
                }
            }
        }

        if let Some(owner) = owner.filter(|o| o.0 < self.task_count) {
            let inherited = self.waiting_on(owner);
            let tcb = &mut self.tasks[owner.0];
            let inherited = inherited.filter(|&prio| prio > tcb.config.priority);
            if tcb.inherited_priority != inherited {
                tcb.inherited_priority = inherited;
                self.needs_reschedule = true;
            }
        }
    }

    /// Highest effective priority among tasks parked on a lock `owner` holds.
    fn waiting_on(&self, owner: TaskId) -> Option<u8> {
        self.tasks[..self.task_count]
            .iter()
            .filter(|tcb| {
                matches!(tcb.state, TaskState::Blocked { owner: Some(o), .. } if o == owner)
            })
            .map(TaskControlBlock::effective_priority)
            .max()
    }

    /// Get a reference to the current task's TCB.
    pub fn current_tcb(&self) -> &TaskControlBlock {
        &self.tasks[self.current_task]
    }

    /// Get a mutable reference to the current task's TCB.
    pub fn current_tcb_mut(&mut self) -> &mut TaskControlBlock {
        &mut self.tasks[self.current_task]
    }

    /// Look up an allocated task.
    pub fn task(&self, id: TaskId) -> Option<&TaskControlBlock> {
        self.tasks[..self.task_count].get(id.0)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
