//! # Kernel
//!
//! Top-level kernel initialization and public API for DashOS.
//!
//! The kernel owns the global scheduler instance, provides task creation
//! and timing APIs, and coordinates system startup. All public functions
//! use critical sections to ensure interrupt safety.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init()        ← Register the idle task
//!         ├─► kernel::spawn()       ← Register tasks (×N)
//!         └─► kernel::start()       ← Launch scheduler (no return)
//!               ├─► Set interrupt priorities
//!               ├─► Configure SysTick
//!               └─► Start first task via arch::start_first_task()
//! ```

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::arch;
use crate::config::MIN_STACK_BYTES;
use crate::error::Error;
use crate::scheduler::Scheduler;
use crate::sync;
use crate::task::{TaskConfig, TaskEntry, TaskId};
use crate::time::Duration;

// ---------------------------------------------------------------------------
// Global scheduler instance
// ---------------------------------------------------------------------------

/// Global scheduler instance, only reachable inside a critical section.
static SCHEDULER: critical_section::Mutex<RefCell<Scheduler>> =
    critical_section::Mutex::new(RefCell::new(Scheduler::new()));

/// Set once the first task has been launched.
static RUNNING: AtomicBool = AtomicBool::new(false);

/// Run `f` with exclusive access to the scheduler.
pub(crate) fn with_scheduler<R>(f: impl FnOnce(&mut Scheduler) -> R) -> R {
    sync::critical_section(|cs| f(&mut SCHEDULER.borrow_ref_mut(cs)))
}

// ---------------------------------------------------------------------------
// Kernel API
// ---------------------------------------------------------------------------

/// Initialize the DashOS kernel by registering the idle task.
///
/// Must be called before any other kernel function. Calling it again is
/// harmless.
pub fn init() -> Result<(), Error> {
    with_scheduler(|scheduler| {
        if scheduler.task_count == 0 {
            let entry = TaskEntry {
                pc: idle_task as usize,
                arg0: 0,
                arg1: 0,
            };
            scheduler.create_task("Idle", TaskConfig::new(0, MIN_STACK_BYTES), entry)?;
        }
        Ok(())
    })
}

/// Create a new task and register it with the scheduler.
///
/// `ctx` is handed to `entry` when the task first runs; `spawn` consumes
/// the only mutable reference, so the task owns its context outright.
///
/// # Example
/// ```ignore
/// static SAMPLER: StaticCell<SamplerTask<..>> = StaticCell::new();
/// let task = SAMPLER.init(SamplerTask::new(shared, sensor));
/// kernel::spawn("Sampler Task", TaskConfig::new(3, 2048), SamplerTask::run, task)?;
/// ```
pub fn spawn<T: Send + 'static>(
    name: &'static str,
    config: TaskConfig,
    entry: fn(&'static mut T) -> !,
    ctx: &'static mut T,
) -> Result<TaskId, Error> {
    let entry = TaskEntry {
        pc: trampoline::<T> as usize,
        arg0: ctx as *mut T as usize,
        arg1: entry as usize,
    };
    let id = with_scheduler(|scheduler| scheduler.create_task(name, config, entry))?;
    debug!("spawned {} as {}", name, id.index());
    Ok(id)
}

/// Start the DashOS scheduler. **Does not return.**
///
/// # Panics
/// Never; with no application tasks only the idle task runs.
#[cfg(target_arch = "arm")]
pub fn start(mut core_peripherals: cortex_m::Peripherals) -> ! {
    use crate::arch::cortex_m4;

    cortex_m::interrupt::disable();
    cortex_m4::set_interrupt_priorities();

    let first_sp = with_scheduler(|scheduler| {
        scheduler.schedule();
        scheduler.current_tcb().stack_pointer as *const u32
    });
    RUNNING.store(true, Ordering::Release);
    info!("scheduler starting");

    cortex_m4::configure_systick(&mut core_peripherals.SYST);

    // Safety: interrupts are off and `first_sp` was built by TaskControlBlock::init.
    unsafe { cortex_m4::start_first_task(first_sp) }
}

/// True once the scheduler runs tasks.
#[inline]
pub fn is_running() -> bool {
    RUNNING.load(Ordering::Acquire)
}

/// Current tick count (milliseconds since start, wrapping).
pub fn now() -> u32 {
    with_scheduler(|scheduler| scheduler.tick_count)
}

/// The task calling this, or `None` before the scheduler starts.
pub fn current_task() -> Option<TaskId> {
    if !is_running() {
        return None;
    }
    Some(with_scheduler(|scheduler| scheduler.current_tcb().id))
}

/// Voluntarily yield the CPU to another ready task of equal priority.
pub fn yield_task() {
    if !is_running() {
        return;
    }
    with_scheduler(|scheduler| scheduler.yield_current());
    arch::trigger_pendsv();
}

/// Suspend the calling task until tick `wake`.
pub fn sleep_until(wake: u32) {
    if !is_running() {
        return;
    }
    if with_scheduler(|scheduler| scheduler.sleep_current_until(wake)) {
        arch::trigger_pendsv();
    }
}

/// Suspend the calling task for at least `duration`.
pub fn delay(duration: Duration) {
    if duration.ticks() == 0 {
        yield_task();
        return;
    }
    sleep_until(now().wrapping_add(duration.ticks()));
}

/// Unused stack bytes of `task` since it was created.
pub fn stack_headroom(task: TaskId) -> Option<usize> {
    with_scheduler(|scheduler| scheduler.task(task).map(|tcb| tcb.stack_headroom()))
}

/// Name given to `task` at spawn time.
pub fn task_name(task: TaskId) -> Option<&'static str> {
    with_scheduler(|scheduler| scheduler.task(task).map(|tcb| tcb.name))
}

/// Stop the system for good.
pub fn halt() -> ! {
    RUNNING.store(false, Ordering::Release);
    arch::halt()
}

/// Park the calling task on a held lock. Returns `false` when there is no
/// scheduler to park on, in which case the caller spins.
pub(crate) fn park_on_lock(lock: usize, owner: Option<TaskId>) -> bool {
    if !is_running() {
        return false;
    }
    with_scheduler(|scheduler| scheduler.block_current_on(lock, owner));
    arch::trigger_pendsv();
    true
}

/// A lock was released: wake its waiters and settle inherited priority.
pub(crate) fn lock_released(lock: usize, owner: Option<TaskId>) {
    if !is_running() {
        return;
    }
    let reschedule = with_scheduler(|scheduler| {
        scheduler.lock_released(lock, owner);
        scheduler.needs_reschedule
    });
    if reschedule {
        arch::trigger_pendsv();
    }
}

// ---------------------------------------------------------------------------
// Task entry
// ---------------------------------------------------------------------------

/// First code every spawned task runs: rebuild the context reference and
/// call the task body.
extern "C" fn trampoline<T: 'static>(ctx: *mut T, entry: fn(&'static mut T) -> !) -> ! {
    // Safety: `ctx` came from the `&'static mut T` handed to `spawn`, which
    // was consumed there; this task holds the only reference.
    let ctx = unsafe { &mut *ctx };
    entry(ctx)
}

extern "C" fn idle_task() -> ! {
    loop {
        arch::wait_for_interrupt();
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Something that can create tasks. Implemented by [`Kernel`]; bootstrap
/// code is written against this so it can be exercised without hardware.
pub trait Spawner {
    fn spawn<T: Send + 'static>(
        &mut self,
        name: &'static str,
        config: TaskConfig,
        entry: fn(&'static mut T) -> !,
        ctx: &'static mut T,
    ) -> Result<TaskId, Error>;
}

/// Read-only task introspection used by the Diagnostics Task.
pub trait StackProbe {
    /// Unused stack bytes of `task`.
    fn stack_headroom(&self, task: TaskId) -> Option<usize>;

    /// The task calling this.
    fn current_task(&self) -> Option<TaskId>;
}

/// Handle to the global kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct Kernel;

impl Spawner for Kernel {
    fn spawn<T: Send + 'static>(
        &mut self,
        name: &'static str,
        config: TaskConfig,
        entry: fn(&'static mut T) -> !,
        ctx: &'static mut T,
    ) -> Result<TaskId, Error> {
        spawn(name, config, entry, ctx)
    }
}

impl StackProbe for Kernel {
    fn stack_headroom(&self, task: TaskId) -> Option<usize> {
        stack_headroom(task)
    }

    fn current_task(&self) -> Option<TaskId> {
        current_task()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
