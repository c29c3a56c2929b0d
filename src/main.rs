//! # DashOS Demo Firmware
//!
//! Runs the dashboard on simulated collaborators: a synthetic
//! accelerometer, a pixel-counting panel and buttons nobody presses.
//! Swap them for board drivers implementing the `hal` traits.
//!
//! The view is picked at build time:
//!
//! | Feature | View |
//! |---------|------|
//! | (none) | live three-axis chart, with button input |
//! | `content-ticker` | stock ticker |
//! | `content-clock` | local clock |
//! | `content-world-clock` | four time zones |
//!
//! Console output goes over RTT through `defmt`.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use defmt_rtt as _;
use panic_halt as _;
use static_cell::StaticCell;

use dashos::config::SAMPLE_CAPACITY;
use dashos::content::{Content, ContentKind};
use dashos::hal::Console;
use dashos::kernel::{self, Kernel};
use dashos::params::RenderParams;
use dashos::sim::{CountingPanel, NoButtons, SyntheticSensor};
use dashos::system::{self, Launch, Launched, Shared};
use dashos::tasks::{DiagnosticsTask, InputTask, RenderTask, SamplerTask, TickTask};
use dashos::toolkit::HeadlessToolkit;
use dashos::Error;

const CONTENT: ContentKind = if cfg!(feature = "content-ticker") {
    ContentKind::Ticker
} else if cfg!(feature = "content-world-clock") {
    ContentKind::WorldClock
} else if cfg!(feature = "content-clock") {
    ContentKind::Clock
} else {
    ContentKind::Chart
};

const N: usize = SAMPLE_CAPACITY;

type Board = Shared<HeadlessToolkit, CountingPanel, N>;

static SHARED: StaticCell<Board> = StaticCell::new();
static TICK: StaticCell<TickTask<'static>> = StaticCell::new();
static SAMPLER: StaticCell<SamplerTask<'static, SyntheticSensor, N>> = StaticCell::new();
static RENDER: StaticCell<RenderTask<'static, HeadlessToolkit, CountingPanel, N>> =
    StaticCell::new();
static INPUT: StaticCell<InputTask<'static, NoButtons, HeadlessToolkit>> = StaticCell::new();
static DIAGNOSTICS: StaticCell<DiagnosticsTask<DefmtConsole, Kernel>> = StaticCell::new();

/// Console lines over RTT.
struct DefmtConsole;

impl Console for DefmtConsole {
    fn write_line(&mut self, line: &str) {
        defmt::println!("{=str}", line);
    }
}

#[entry]
fn main() -> ! {
    defmt::println!("Program start");

    let Some(cp) = cortex_m::Peripherals::take() else {
        defmt::error!("core peripherals already taken");
        kernel::halt();
    };

    if let Err(e) = boot() {
        system::fatal(e, &mut DefmtConsole, &mut halting);
    }

    kernel::start(cp)
}

fn halting() {
    defmt::error!("halting");
}

/// A view that cannot be built is as fatal as a failed boot.
fn render_fatal(error: Error) {
    system::report_fatal(error, &mut DefmtConsole, &mut halting);
}

/// Build the shared state and the task contexts, then spawn them.
fn boot() -> Result<Launched, Error> {
    kernel::init()?;

    let shared: &'static Board = SHARED.init(Shared::new(
        HeadlessToolkit::new(),
        CountingPanel::new(),
        RenderParams::default(),
    ));

    let tasks = Launch {
        tick: TICK.init(TickTask::new(&shared.clock)),
        sampler: SAMPLER.init(SamplerTask::new(&shared.samples, SyntheticSensor::new())),
        render: RENDER.init(RenderTask::new(
            &shared.clock,
            &shared.samples,
            &shared.render,
            &shared.panel,
            Content::new(CONTENT),
        )
        .with_fatal_report(render_fatal)),
        // Only the chart has parameters worth steering.
        input: match CONTENT {
            ContentKind::Chart => Some(INPUT.init(InputTask::new(&shared.render, NoButtons))),
            _ => None,
        },
        diagnostics: DIAGNOSTICS.init(DiagnosticsTask::new(DefmtConsole, Kernel)),
    };

    let launched = system::launch(&mut Kernel, tasks)?;
    defmt::info!("launched {} tasks", 4 + launched.input.is_some() as u32);
    Ok(launched)
}
