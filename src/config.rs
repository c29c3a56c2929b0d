//! # DashOS Configuration
//!
//! Compile-time constants governing the kernel and the dashboard tasks.
//! All limits are fixed at compile time — no dynamic allocation.

use crate::time::Duration;

// ---------------------------------------------------------------------------
// Kernel
// ---------------------------------------------------------------------------

/// Maximum number of tasks the kernel can manage, including the idle task.
/// This bounds the static TCB array. Each slot reserves `STACK_SIZE` bytes.
pub const MAX_TASKS: usize = 8;

/// SysTick frequency in Hz. One tick is one millisecond.
pub const TICK_HZ: u32 = 1000;

/// Default round-robin time slice in ticks for tasks of equal priority.
pub const DEFAULT_TIME_SLICE: u32 = 10;

/// Per-slot stack reservation in bytes. A task uses the top
/// `TaskConfig::stack_bytes` of its slot.
pub const STACK_SIZE: usize = 4096;

/// Smallest stack a task may ask for: the initial 16-word frame plus
/// room for the entry trampoline.
pub const MIN_STACK_BYTES: usize = 256;

/// Byte pattern written over a task stack at spawn time. Bytes still
/// holding it have never been touched and count as headroom.
pub const STACK_PAINT: u8 = 0xA5;

/// System clock frequency in Hz (SAMD51 at 120 MHz).
pub const SYSTEM_CLOCK_HZ: u32 = 120_000_000;

// ---------------------------------------------------------------------------
// Task periods
// ---------------------------------------------------------------------------

/// Tick Source period; the logical clock advances by this much each cycle.
pub const TICK_PERIOD: Duration = Duration::millis(20);

/// Sampler Task period.
pub const SAMPLE_PERIOD: Duration = Duration::millis(100);

/// Input Task poll period.
pub const INPUT_POLL_PERIOD: Duration = Duration::millis(50);

/// Extra sleep after every directional button action.
pub const DEBOUNCE_DELAY: Duration = Duration::millis(50);

/// Render Task cycle.
pub const RENDER_PERIOD: Duration = Duration::millis(20);

/// Content refresh interval for the ticker and clock views.
pub const SLOW_REFRESH: Duration = Duration::millis(1000);

/// Diagnostics Task report interval.
pub const DIAGNOSTICS_PERIOD: Duration = Duration::millis(10_000);

// ---------------------------------------------------------------------------
// Task priorities (higher = more important; 0 is the idle task)
// ---------------------------------------------------------------------------

pub const TICK_PRIORITY: u8 = 4;
pub const SAMPLER_PRIORITY: u8 = 3;
pub const RENDER_PRIORITY: u8 = 2;
pub const INPUT_PRIORITY: u8 = 2;
pub const DIAGNOSTICS_PRIORITY: u8 = 1;

// ---------------------------------------------------------------------------
// Task names, as shown in the stack report
// ---------------------------------------------------------------------------

pub const TICK_NAME: &str = "Tick Task";
pub const SAMPLER_NAME: &str = "Sampler Task";
pub const RENDER_NAME: &str = "Render Task";
pub const INPUT_NAME: &str = "Input Task";
pub const DIAGNOSTICS_NAME: &str = "Diagnostics Task";

// ---------------------------------------------------------------------------
// Task stacks, in bytes
// ---------------------------------------------------------------------------

pub const TICK_STACK: usize = 512;
pub const SAMPLER_STACK: usize = 2048;
pub const RENDER_STACK: usize = 4096;
pub const INPUT_STACK: usize = 2048;
pub const DIAGNOSTICS_STACK: usize = 1024;

// ---------------------------------------------------------------------------
// Sample store and render parameters
// ---------------------------------------------------------------------------

/// Number of slots in the sample ring.
pub const SAMPLE_CAPACITY: usize = 50;

/// Initial half-height of the chart's vertical axis.
pub const Y_RANGE_DEFAULT: i16 = 200;
pub const Y_RANGE_MIN: i16 = 20;
pub const Y_RANGE_MAX: i16 = 500;
pub const Y_RANGE_STEP: i16 = 10;

/// Narrowest chart window, in samples. The widest is the ring capacity.
pub const WINDOW_MIN: usize = 5;
pub const WINDOW_STEP: usize = 2;

/// Multiplier applied to sensor readings before plotting.
pub const CHART_SCALE: f32 = 100.0;

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

pub const DISPLAY_WIDTH: u16 = 320;
pub const DISPLAY_HEIGHT: u16 = 240;

/// Toolkit draw buffer: one twentieth of the screen.
pub const DRAW_BUFFER_PIXELS: usize = DISPLAY_WIDTH as usize * DISPLAY_HEIGHT as usize / 20;

pub const CHART_WIDTH: u16 = 280;
pub const CHART_HEIGHT: u16 = 200;

/// Seconds into the day shown by the clock views at power-on.
pub const CLOCK_START_OF_DAY: u32 = 0;

/// Seed for the ticker's pseudo-random walk.
pub const TICKER_SEED: u64 = 0x5EED_DA5B;
