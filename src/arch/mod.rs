//! # Architecture Abstraction Layer
//!
//! Provides a hardware abstraction boundary for the scheduler.
//! The Cortex-M4 port does the real work; the host port lets the kernel
//! compile and unit-test on a development machine, where nothing is ever
//! context-switched.

#[cfg(target_arch = "arm")]
pub mod cortex_m4;
#[cfg(target_arch = "arm")]
pub use cortex_m4::{halt, trigger_pendsv, wait_for_interrupt};

#[cfg(not(target_arch = "arm"))]
mod host;
#[cfg(not(target_arch = "arm"))]
pub use host::{halt, trigger_pendsv, wait_for_interrupt};
