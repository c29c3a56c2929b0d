//! # Dashboard Tasks
//!
//! Every task is a plain struct holding references to the shared pieces
//! it uses, its collaborators and its own [`crate::sync::HeldLocks`]
//! ledger. Each exposes one iteration (`step`, `poll`, `cycle` or
//! `report`) so it can be driven directly in tests, and a `run` entry
//! point for [`crate::kernel::spawn`] that loops forever.

pub mod diagnostics;
pub mod input;
pub mod render;
pub mod sampler;
pub mod tick;

pub use diagnostics::DiagnosticsTask;
pub use input::{InputReport, InputTask};
pub use render::{PanelFlush, RenderState, RenderTask};
pub use sampler::SamplerTask;
pub use tick::TickTask;
