//! # Task Control Block
//!
//! Defines the task model for DashOS. The task set is fixed at start-up:
//! every task is created before the scheduler starts, runs an infinite
//! loop, and suspends only by sleeping until its next period or by
//! blocking on a held [`crate::sync::Mutex`].

use core::fmt;

use crate::config::{DEFAULT_TIME_SLICE, MIN_STACK_BYTES, STACK_PAINT, STACK_SIZE};
use crate::error::Error;

// ---------------------------------------------------------------------------
// Task identity
// ---------------------------------------------------------------------------

/// Index of a task in the scheduler's task table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    /// The idle task always occupies slot 0.
    pub const IDLE: TaskId = TaskId(0);

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{:03}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TaskId {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "T{=usize:03}", self.0);
    }
}

// ---------------------------------------------------------------------------
// Task state machine
// ---------------------------------------------------------------------------

/// Execution state of a task in the scheduler's state machine.
///
/// ```text
///   ┌──────────┐     schedule()      ┌─────────┐
///   │  Ready   │ ──────────────────► │ Running │
///   └──────────┘ ◄────────────────── └─────────┘
///     ▲      ▲      preempt / yield    │      │
///     │      │                         │      │ sleep_until()
///     │      │   lock released    ┌─────────┐ │
///     │      └────────────────────│ Blocked │◄┘ park_on_lock()
///     │                           └─────────┘
///     │        tick() reaches     ┌──────────┐
///     └───────────────────────────│ Sleeping │
///                                 └──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Slot is unused.
    Free,
    /// Task is ready to run and waiting for the CPU.
    Ready,
    /// Task is currently executing.
    Running,
    /// Task sleeps until the tick count reaches `until`.
    Sleeping { until: u32 },
    /// Task waits for the lock identified by `lock` to be released by
    /// `owner`, which inherits its priority meanwhile.
    Blocked { lock: usize, owner: Option<TaskId> },
}

// ---------------------------------------------------------------------------
// Task configuration (immutable after creation)
// ---------------------------------------------------------------------------

/// Static configuration for a task, set at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskConfig {
    /// Base priority (higher = more important). 0 is reserved for idle.
    pub priority: u8,

    /// Stack depth in bytes, carved from the top of the task's slot.
    pub stack_bytes: usize,

    /// Round-robin slice in ticks among equal priorities.
    /// If 0, uses `DEFAULT_TIME_SLICE`.
    pub time_slice: u32,
}

impl TaskConfig {
    pub const fn new(priority: u8, stack_bytes: usize) -> Self {
        Self {
            priority,
            stack_bytes,
            time_slice: 0,
        }
    }

    /// Returns the effective time slice, falling back to the system default.
    #[inline]
    pub const fn effective_time_slice(&self) -> u32 {
        if self.time_slice > 0 {
            self.time_slice
        } else {
            DEFAULT_TIME_SLICE
        }
    }

    pub const fn validate(&self) -> Result<(), Error> {
        if self.stack_bytes < MIN_STACK_BYTES || self.stack_bytes > STACK_SIZE {
            return Err(Error::InvalidStack {
                requested: self.stack_bytes,
            });
        }
        Ok(())
    }
}

/// Where a task starts: the first PC and the two argument registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskEntry {
    pub pc: usize,
    pub arg0: usize,
    pub arg1: usize,
}

// ---------------------------------------------------------------------------
// Task Control Block
// ---------------------------------------------------------------------------

/// Task Control Block (TCB) — the per-task scheduling state.
///
/// TCBs live in a static array inside the scheduler — no heap allocation.
/// Each includes an inline stack; `stack_pointer` points into it and is
/// updated on every context switch.
pub struct TaskControlBlock {
    /// Unique task identifier (index in the scheduler's task array).
    pub id: TaskId,

    /// Human-readable name used in diagnostics.
    pub name: &'static str,

    /// Current execution state.
    pub state: TaskState,

    /// Static configuration.
    pub config: TaskConfig,

    /// Priority lent by a higher-priority task waiting on a lock we hold.
    pub inherited_priority: Option<u8>,

    /// Saved stack pointer (PSP). Updated on context switch.
    pub stack_pointer: *mut u32,

    /// Per-task stack memory.
    pub stack: Stack,

    /// Remaining ticks in the current time slice.
    pub ticks_remaining: u32,

    /// Total ticks this task has been in the Running state.
    pub total_ticks: u32,
}

/// Task stack slot, aligned to 8 bytes as required by AAPCS.
#[repr(C, align(8))]
pub struct Stack(pub [u8; STACK_SIZE]);

// Safety: TaskControlBlock contains a raw pointer (stack_pointer) but
// it always points into the task's own stack array. TCBs are only
// accessed within critical sections.
unsafe impl Send for TaskControlBlock {}
unsafe impl Sync for TaskControlBlock {}

impl TaskControlBlock {
    /// An unallocated slot. Used to initialize the static array.
    pub const EMPTY: Self = Self {
        id: TaskId(0),
        name: "",
        state: TaskState::Free,
        config: TaskConfig::new(0, STACK_SIZE),
        inherited_priority: None,
        stack_pointer: core::ptr::null_mut(),
        stack: Stack([0u8; STACK_SIZE]),
        ticks_remaining: 0,
        total_ticks: 0,
    };

    /// Initialize a TCB for a new task and build its first stack frame.
    pub fn init(&mut self, id: TaskId, name: &'static str, config: TaskConfig, entry: TaskEntry) {
        self.id = id;
        self.name = name;
        self.state = TaskState::Ready;
        self.config = config;
        self.inherited_priority = None;
        self.ticks_remaining = config.effective_time_slice();
        self.total_ticks = 0;
        self.paint_stack();
        self.init_frame(entry);
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state != TaskState::Free
    }

    #[inline]
    pub fn is_runnable(&self) -> bool {
        matches!(self.state, TaskState::Ready | TaskState::Running)
    }

    /// Base priority raised by any inherited priority.
    #[inline]
    pub fn effective_priority(&self) -> u8 {
        match self.inherited_priority {
            Some(p) => p.max(self.config.priority),
            None => self.config.priority,
        }
    }

    /// The part of the slot this task actually uses.
    fn stack_window(&self) -> core::ops::Range<usize> {
        STACK_SIZE - self.config.stack_bytes..STACK_SIZE
    }

    fn paint_stack(&mut self) {
        let window = self.stack_window();
        self.stack.0[window].fill(STACK_PAINT);
    }

    /// Bytes at the bottom of the stack that were never written.
    ///
    /// This is the high-water mark complement: the smallest amount of free
    /// stack the task has had since it was created.
    pub fn stack_headroom(&self) -> usize {
        self.stack.0[self.stack_window()]
            .iter()
            .take_while(|&&b| b == STACK_PAINT)
            .count()
    }

    /// Initialize the stack frame for the first context switch.
    ///
    /// The Cortex-M4 hardware automatically pushes an exception frame on
    /// interrupt entry. We pre-populate this frame on the task's stack so
    /// that the first PendSV "return" starts executing the task function.
    ///
    /// ## Stack Layout (top = high address, growing down)
    ///
    /// ```text
    /// [Hardware stacked frame]
    ///   xPSR  (Thumb bit set)
    ///   PC    (entry.pc)
    ///   LR    (task_exit)
    ///   R12   (0)
    ///   R3    (0)
    ///   R2    (0)
    ///   R1    (entry.arg1)
    ///   R0    (entry.arg0)
    /// [Software saved context]
    ///   R11 … R4 (0)           <- stack_pointer after init
    /// ```
    fn init_frame(&mut self, entry: TaskEntry) {
        let top = self.stack.0.as_mut_ptr() as usize + STACK_SIZE;
        // Align to 8 bytes (AAPCS requirement)
        let aligned_top = top & !0x07;
        let frame = (aligned_top - FRAME_WORDS * 4) as *mut u32;

        let words: [u32; FRAME_WORDS] = [
            0, 0, 0, 0, 0, 0, 0, 0, // R4–R11
            entry.arg0 as u32,      // R0
            entry.arg1 as u32,      // R1
            0,                      // R2
            0,                      // R3
            0,                      // R12
            task_exit as usize as u32, // LR — reached only if a task returns
            entry.pc as u32,        // PC
            0x0100_0000,            // xPSR — Thumb bit set
        ];

        // Safety: the frame lies inside `self.stack`, below the aligned
        // top, and the slot is at least MIN_STACK_BYTES deep.
        unsafe {
            for (i, word) in words.iter().enumerate() {
                frame.add(i).write_volatile(*word);
            }
        }

        self.stack_pointer = frame;
    }
}

/// Words in the initial frame: 8 software-saved + 8 hardware-stacked.
const FRAME_WORDS: usize = 16;

/// Fallback for tasks that return (they shouldn't — entries are `-> !`).
extern "C" fn task_exit() -> ! {
    crate::arch::halt()
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
