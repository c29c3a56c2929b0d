//! # Bootstrap
//!
//! Builds the shared context, brings up the sensor and spawns the
//! dashboard tasks in a fixed order:
//!
//! | Order | Task | Priority | Stack | Locks |
//! |-------|------|----------|-------|-------|
//! | 1 | Tick | 4 | 512 | none |
//! | 2 | Sampler | 3 | 2048 | Samples |
//! | 3 | Render | 2 | 4096 | Samples → Render → Panel |
//! | 4 | Input (optional) | 2 | 2048 | Render |
//! | 5 | Diagnostics | 1 | 1024 | none |
//!
//! Every bootstrap error is fatal: [`fatal`] reports it, runs the
//! shutdown hook and halts.

use core::fmt::Write;

use heapless::String;

use crate::config::{
    DIAGNOSTICS_NAME, DIAGNOSTICS_PRIORITY, DIAGNOSTICS_STACK, INPUT_NAME, INPUT_PRIORITY,
    INPUT_STACK, RENDER_NAME, RENDER_PRIORITY, RENDER_STACK, SAMPLER_NAME, SAMPLER_PRIORITY,
    SAMPLER_STACK, TICK_NAME, TICK_PRIORITY, TICK_STACK,
};
use crate::error::Error;
use crate::hal::{Buttons, Console, PanelDriver, Sensor, ShutdownHook};
use crate::kernel::{self, Spawner, StackProbe};
use crate::params::RenderParams;
use crate::samples::SampleStore;
use crate::sync::{LockRank, Mutex};
use crate::task::{TaskConfig, TaskId};
use crate::tasks::{DiagnosticsTask, InputTask, RenderState, RenderTask, SamplerTask, TickTask};
use crate::time::LogicalClock;
use crate::toolkit::Toolkit;

/// State shared between tasks. Each piece sits behind its own lock, apart
/// from the clock which has a single writer.
pub struct Shared<T, P, const N: usize> {
    pub clock: LogicalClock,
    pub samples: Mutex<SampleStore<N>>,
    pub render: Mutex<RenderState<T>>,
    pub panel: Mutex<P>,
}

impl<T, P, const N: usize> Shared<T, P, N> {
    pub const fn new(toolkit: T, panel: P, params: RenderParams) -> Self {
        Self {
            clock: LogicalClock::new(),
            samples: Mutex::new(LockRank::Samples, SampleStore::new()),
            render: Mutex::new(LockRank::Render, RenderState::new(toolkit, params)),
            panel: Mutex::new(LockRank::Panel, panel),
        }
    }
}

/// The task contexts to hand to the kernel.
pub struct Launch<S, T, P, B, C, Q, const N: usize>
where
    S: 'static,
    T: 'static,
    P: 'static,
    B: 'static,
    C: 'static,
    Q: 'static,
{
    pub tick: &'static mut TickTask<'static>,
    pub sampler: &'static mut SamplerTask<'static, S, N>,
    pub render: &'static mut RenderTask<'static, T, P, N>,
    pub input: Option<&'static mut InputTask<'static, B, T>>,
    pub diagnostics: &'static mut DiagnosticsTask<C, Q>,
}

/// Ids of the spawned tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Launched {
    pub tick: TaskId,
    pub sampler: TaskId,
    pub render: TaskId,
    pub input: Option<TaskId>,
    pub diagnostics: TaskId,
}

/// Initialise the sensor, then spawn every task.
///
/// The Diagnostics Task is told about the Render, Sampler and Input tasks
/// before it is spawned.
pub fn launch<K, S, T, P, B, C, Q, const N: usize>(
    spawner: &mut K,
    tasks: Launch<S, T, P, B, C, Q, N>,
) -> Result<Launched, Error>
where
    K: Spawner,
    S: Sensor + Send + 'static,
    T: Toolkit + Send + 'static,
    P: PanelDriver + Send + 'static,
    B: Buttons + Send + 'static,
    C: Console + Send + 'static,
    Q: StackProbe + Send + 'static,
{
    let Launch {
        tick,
        sampler,
        render,
        input,
        diagnostics,
    } = tasks;

    if sampler.sensor_mut().init().is_err() {
        error!("sensor did not come up");
        return Err(Error::SensorInit);
    }

    let tick = spawner.spawn(
        TICK_NAME,
        TaskConfig::new(TICK_PRIORITY, TICK_STACK),
        TickTask::run,
        tick,
    )?;
    let sampler = spawner.spawn(
        SAMPLER_NAME,
        TaskConfig::new(SAMPLER_PRIORITY, SAMPLER_STACK),
        SamplerTask::run,
        sampler,
    )?;
    let render = spawner.spawn(
        RENDER_NAME,
        TaskConfig::new(RENDER_PRIORITY, RENDER_STACK),
        RenderTask::run,
        render,
    )?;
    let input = match input {
        Some(task) => Some(spawner.spawn(
            INPUT_NAME,
            TaskConfig::new(INPUT_PRIORITY, INPUT_STACK),
            InputTask::run,
            task,
        )?),
        None => None,
    };

    diagnostics.watch(RENDER_NAME, render)?;
    diagnostics.watch(SAMPLER_NAME, sampler)?;
    if let Some(input) = input {
        diagnostics.watch(INPUT_NAME, input)?;
    }
    let diagnostics = spawner.spawn(
        DIAGNOSTICS_NAME,
        TaskConfig::new(DIAGNOSTICS_PRIORITY, DIAGNOSTICS_STACK),
        DiagnosticsTask::run,
        diagnostics,
    )?;

    info!("dashboard tasks spawned");
    Ok(Launched {
        tick,
        sampler,
        render,
        input,
        diagnostics,
    })
}

/// Write the error to the console and run the shutdown hook.
pub fn report_fatal<C: Console, H: ShutdownHook>(error: Error, console: &mut C, hook: &mut H) {
    error!("fatal: {}", error);
    let mut line: String<96> = String::new();
    let _ = write!(line, "fatal: {}", error);
    console.write_line(&line);
    hook.shutdown();
}

/// Report a bootstrap failure and stop the core for good.
pub fn fatal<C: Console, H: ShutdownHook>(error: Error, console: &mut C, hook: &mut H) -> ! {
    report_fatal(error, console, hook);
    kernel::halt()
}
