//! # DashOS — Sensor Dashboard Operating System
//!
//! A fixed-priority real-time kernel for ARM Cortex-M4 microcontrollers and
//! the dashboard runtime built on it: a periodic sampler filling a ring of
//! accelerometer readings, a renderer driving a graphics toolkit and a
//! display panel, a five-way button handler and a stack-usage reporter.
//!
//! ## Overview
//!
//! Five tasks run forever, each sleeping until its next period:
//!
//! | Task | Period | Priority | Locks |
//! |------|--------|----------|-------|
//! | Tick | 20 ms | 4 | none |
//! | Sampler | 100 ms | 3 | Samples |
//! | Render | 20 ms | 2 | Samples → Render → Panel |
//! | Input | 50 ms | 2 | Render |
//! | Diagnostics | 10 s | 1 | none |
//!
//! Shared state lives in one [`system::Shared`] context built before any
//! task exists and handed to every task by reference.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │      Dashboard Tasks (tasks/)  ·  Content (content/)    │
//! │   tick · sampler · input · render · diagnostics         │
//! ├────────────────────────────────────────────────────────┤
//! │   Bootstrap (system.rs)  ·  Shared context · launch()   │
//! ├──────────────┬────────────────────┬───────────────────┤
//! │ Sample Store │ Render Parameters  │  Collaborators    │
//! │ samples.rs   │ params.rs          │  hal.rs           │
//! │              │                    │  toolkit/         │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │                 Kernel API (kernel.rs)                  │
//! │       init() · spawn() · start() · sleep_until()        │
//! ├──────────────┬────────────────────┬───────────────────┤
//! │  Scheduler   │   Task Model       │  Sync Primitives  │
//! │  scheduler.rs│   task.rs          │  sync.rs          │
//! │  ─ tick()    │   ─ TCB            │  ─ Mutex<T>       │
//! │  ─ schedule()│   ─ stack paint    │  ─ LockRank       │
//! ├──────────────┴────────────────────┴───────────────────┤
//! │            Arch Port (arch/cortex_m4.rs)                │
//! │    PendSV · SysTick · Context Switch · First Task      │
//! ├────────────────────────────────────────────────────────┤
//! │         ARM Cortex-M4 Hardware (Thumb-2)                │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lock Order
//!
//! `Samples < Render < Panel`. A task may only take a lock ranked above
//! everything it already holds, so the only multi-lock paths are the
//! chart refresh (Samples then Render) and the toolkit flush (Render then
//! Panel). See [`sync`].
//!
//! ## Memory Model
//!
//! - **No heap**: All state is statically allocated
//! - **No `alloc`**: Pure `core` only
//! - **Fixed-size TCB array**: `[TaskControlBlock; MAX_TASKS]`
//! - **Per-task stack**: `[u8; STACK_SIZE]` inline in TCB, painted at spawn
//! - **Critical sections**: `critical_section::with()` for kernel state

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod arch;
pub mod config;
pub mod content;
pub mod error;
pub mod hal;
pub mod kernel;
pub mod params;
pub mod samples;
pub mod scheduler;
pub mod sim;
pub mod sync;
pub mod system;
pub mod task;
pub mod tasks;
pub mod time;
pub mod toolkit;

pub use error::Error;
