//! Render Task: owns the toolkit, drives the panel and keeps the content
//! view current.
//!
//! ## Cycle
//!
//! ```text
//!   every RENDER_PERIOD
//!     ├─► [Render]            toolkit.service(now, io)
//!     │      └─► [Panel]      PanelFlush: address window + pixels
//!     └─► refresh due?
//!            chart:  [Samples] ─► [Render]  replot the window
//!            other:  [Render]               redraw values
//! ```
//!
//! Parameter edits made by the Input Task are picked up at refresh time
//! by comparing the parameter revision with the one last applied.

use embedded_graphics::pixelcolor::Rgb565;

use crate::config::RENDER_PERIOD;
use crate::content::{Content, Frame};
use crate::error::Error;
use crate::hal::{Orientation, PanelDriver};
use crate::kernel;
use crate::params::RenderParams;
use crate::samples::SampleStore;
use crate::sync::{HeldLocks, Mutex};
use crate::time::{reached, LogicalClock, Periodic};
use crate::toolkit::{Area, DisplayConfig, FlushSink, NoPointer, Toolkit, ToolkitIo};

/// Everything behind the Render lock: the parameters the Input Task edits
/// and the toolkit whose service call must not run concurrently.
pub struct RenderState<T> {
    pub params: RenderParams,
    pub toolkit: T,
}

impl<T> RenderState<T> {
    pub const fn new(toolkit: T, params: RenderParams) -> Self {
        Self { params, toolkit }
    }
}

/// Flush bridge from the toolkit to the panel.
///
/// Runs inside `service`, with the Render lock already held through the
/// same ledger, and takes only the Panel lock.
pub struct PanelFlush<'a, P> {
    panel: &'a Mutex<P>,
    held: &'a HeldLocks,
}

impl<'a, P> PanelFlush<'a, P> {
    pub fn new(panel: &'a Mutex<P>, held: &'a HeldLocks) -> Self {
        Self { panel, held }
    }
}

impl<P: PanelDriver> FlushSink for PanelFlush<'_, P> {
    fn flush(&mut self, area: Area, pixels: &[Rgb565]) {
        let mut panel = self.panel.lock(self.held);
        panel.set_address_window(area.x0, area.y0, area.x1, area.y1);
        panel.write_pixels(pixels);
    }
}

/// Parameter state the widgets currently reflect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Applied {
    revision: u32,
    theme: usize,
}

impl Applied {
    fn of(params: &RenderParams) -> Self {
        Self {
            revision: params.revision(),
            theme: params.theme(),
        }
    }
}

/// Receives a render bring-up failure just before the core halts.
pub type FatalReport = fn(Error);

fn log_fatal(error: Error) {
    error!("render init failed: {}", error);
}

pub struct RenderTask<'a, T, P, const N: usize> {
    clock: &'a LogicalClock,
    samples: &'a Mutex<SampleStore<N>>,
    render: &'a Mutex<RenderState<T>>,
    panel: &'a Mutex<P>,
    content: Content,
    pointer: NoPointer,
    held: HeldLocks,
    last_refresh: Option<u32>,
    applied: Option<Applied>,
    on_fatal: FatalReport,
}

impl<'a, T: Toolkit, P: PanelDriver, const N: usize> RenderTask<'a, T, P, N> {
    pub fn new(
        clock: &'a LogicalClock,
        samples: &'a Mutex<SampleStore<N>>,
        render: &'a Mutex<RenderState<T>>,
        panel: &'a Mutex<P>,
        content: Content,
    ) -> Self {
        Self {
            clock,
            samples,
            render,
            panel,
            content,
            pointer: NoPointer::new(),
            held: HeldLocks::new(),
            last_refresh: None,
            applied: None,
            on_fatal: log_fatal,
        }
    }

    /// Replace the default report (the log only) for a failed bring-up.
    pub fn with_fatal_report(mut self, report: FatalReport) -> Self {
        self.on_fatal = report;
        self
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Bring up the toolkit and the panel, then build the view.
    pub fn init(&mut self) -> Result<(), Error> {
        self.render
            .lock(&self.held)
            .toolkit
            .init(&DisplayConfig::default());

        {
            let mut panel = self.panel.lock(&self.held);
            panel.begin();
            panel.set_orientation(Orientation::LandscapeInverted);
        }

        let mut render = self.render.lock(&self.held);
        let params = render.params;
        self.content.build(&mut render.toolkit, &params)?;
        render.toolkit.set_background(params.background());
        self.applied = Some(Applied::of(&params));
        info!("render: content ready");
        Ok(())
    }

    /// [`init`](Self::init), handing a failure to the fatal report.
    pub fn start(&mut self) -> Result<(), Error> {
        let result = self.init();
        if let Err(e) = result {
            (self.on_fatal)(e);
        }
        result
    }

    /// One render cycle. Returns whether the content was refreshed.
    pub fn cycle(&mut self) -> bool {
        let now = self.clock.now();

        {
            let mut render = self.render.lock(&self.held);
            let mut flush = PanelFlush::new(self.panel, &self.held);
            let mut io = ToolkitIo {
                flush: &mut flush,
                input: &mut self.pointer,
            };
            render.toolkit.service(now, &mut io);
        }

        if !self.refresh_due(now) {
            return false;
        }
        self.last_refresh = Some(now);

        if self.content.needs_samples() {
            let samples = self.samples.lock(&self.held);
            let mut render = self.render.lock(&self.held);
            refresh::<T, N>(
                &mut self.content,
                &mut self.applied,
                &mut render,
                Some(&*samples),
                now,
            );
        } else {
            let mut render = self.render.lock(&self.held);
            refresh::<T, N>(&mut self.content, &mut self.applied, &mut render, None, now);
        }
        true
    }

    fn refresh_due(&self, now: u32) -> bool {
        match (self.content.refresh_interval(), self.last_refresh) {
            (None, _) | (_, None) => true,
            (Some(interval), Some(last)) => reached(now, last.wrapping_add(interval.ticks())),
        }
    }

    pub fn run(task: &'static mut RenderTask<'static, T, P, N>) -> ! {
        if task.start().is_err() {
            kernel::halt();
        }
        let mut periodic = Periodic::new(kernel::now(), RENDER_PERIOD);
        loop {
            task.cycle();
            periodic.wait();
        }
    }
}

/// Apply pending parameter edits, then redraw the view's values.
fn refresh<T: Toolkit, const N: usize>(
    content: &mut Content,
    applied: &mut Option<Applied>,
    state: &mut RenderState<T>,
    samples: Option<&SampleStore<N>>,
    now: u32,
) {
    let params = state.params;
    let current = Applied::of(&params);
    if *applied != Some(current) {
        if applied.map(|a| a.theme) != Some(current.theme) {
            state.toolkit.set_background(params.background());
        }
        content.apply_params(&mut state.toolkit, &params);
        *applied = Some(current);
    }
    content.refresh(
        &mut state.toolkit,
        &Frame {
            now,
            params: &params,
            samples,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentKind;
    use crate::samples::Sample;
    use crate::sim::CountingPanel;
    use crate::sync::LockRank;
    use crate::time::Duration;
    use crate::hal::Console;
    use crate::toolkit::{HeadlessToolkit, LabelSpec};
    use core::cell::{Cell, RefCell};
    use embedded_graphics::pixelcolor::RgbColor;
    use std::string::{String, ToString};
    use std::thread;
    use std::vec::Vec;

    std::thread_local! {
        static REPORTED: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
        static HOOK_RAN: Cell<bool> = const { Cell::new(false) };
    }

    struct Recorder<'a>(&'a mut Vec<String>);

    impl Console for Recorder<'_> {
        fn write_line(&mut self, line: &str) {
            self.0.push(line.to_string());
        }
    }

    fn clear_reports() {
        REPORTED.with(|lines| lines.borrow_mut().clear());
        HOOK_RAN.with(|ran| ran.set(false));
    }

    fn record_fatal(error: Error) {
        REPORTED.with(|lines| {
            let mut lines = lines.borrow_mut();
            crate::system::report_fatal(error, &mut Recorder(&mut *lines), &mut || {
                HOOK_RAN.with(|ran| ran.set(true))
            });
        });
    }

    const N: usize = 5;

    struct Fixture {
        clock: LogicalClock,
        samples: Mutex<SampleStore<N>>,
        render: Mutex<RenderState<HeadlessToolkit>>,
        panel: Mutex<CountingPanel>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                clock: LogicalClock::new(),
                samples: Mutex::new(LockRank::Samples, SampleStore::new()),
                render: Mutex::new(
                    LockRank::Render,
                    RenderState::new(HeadlessToolkit::new(), RenderParams::new(N)),
                ),
                panel: Mutex::new(LockRank::Panel, CountingPanel::new()),
            }
        }

        fn task(&self, kind: ContentKind) -> RenderTask<'_, HeadlessToolkit, CountingPanel, N> {
            RenderTask::new(&self.clock, &self.samples, &self.render, &self.panel, Content::new(kind))
        }

        fn panel(&self) -> CountingPanel {
            let held = HeldLocks::new();
            let panel = self.panel.lock(&held).clone();
            panel
        }
    }

    #[test]
    fn test_init_brings_up_panel_and_view() {
        let fx = Fixture::new();
        let mut task = fx.task(ContentKind::Chart);
        task.init().unwrap();

        let panel = fx.panel();
        assert!(panel.begun);
        assert_eq!(panel.orientation, Some(Orientation::LandscapeInverted));
        assert_eq!(panel.pixels, 0);

        let held = HeldLocks::new();
        let render = fx.render.lock(&held);
        assert!(render.toolkit.is_initialized());
        assert_eq!(render.toolkit.chart_count(), 1);
        assert_eq!(render.toolkit.background(), render.params.background());
        drop(render);
        assert!(task.held.is_empty());
    }

    #[test]
    fn test_first_cycle_flushes_whole_screen_in_bands() {
        let fx = Fixture::new();
        let mut task = fx.task(ContentKind::Clock);
        task.init().unwrap();
        assert!(task.cycle());

        let panel = fx.panel();
        assert_eq!(panel.pixels, 320 * 240);
        // 3840-pixel buffer over 320-pixel rows: 12 rows per band.
        assert_eq!(panel.windows, 20);
        assert_eq!(panel.last_window, Some((0, 228, 319, 239)));
    }

    #[test]
    fn test_chart_refresh_plots_the_window() {
        let fx = Fixture::new();
        {
            let held = HeldLocks::new();
            let mut store = fx.samples.lock(&held);
            for i in 0..N {
                store.push(Sample::new(0.5 * i as f32, -0.25 * i as f32, 1.0));
            }
        }
        let mut task = fx.task(ContentKind::Chart);
        task.init().unwrap();
        assert!(task.cycle());

        let series = match task.content() {
            Content::Chart(view) => view.series().to_vec(),
            _ => unreachable!(),
        };
        let held = HeldLocks::new();
        let render = fx.render.lock(&held);
        let x: std::vec::Vec<i16> = render.toolkit.series_points(series[0]).unwrap().to_vec();
        let y: std::vec::Vec<i16> = render.toolkit.series_points(series[1]).unwrap().to_vec();
        let z: std::vec::Vec<i16> = render.toolkit.series_points(series[2]).unwrap().to_vec();
        assert_eq!(x, [0, 50, 100, 150, 200]);
        assert_eq!(y, [0, -25, -50, -75, -100]);
        assert_eq!(z, [100; N]);
    }

    #[test]
    fn test_chart_refreshes_every_cycle() {
        let fx = Fixture::new();
        let mut task = fx.task(ContentKind::Chart);
        task.init().unwrap();
        for _ in 0..3 {
            assert!(task.cycle());
        }
    }

    #[test]
    fn test_slow_content_waits_for_its_interval() {
        let fx = Fixture::new();
        let mut task = fx.task(ContentKind::Ticker);
        task.init().unwrap();

        assert!(task.cycle());
        fx.clock.advance(Duration::millis(980));
        assert!(!task.cycle());
        fx.clock.advance(Duration::millis(20));
        assert!(task.cycle());
        assert!(!task.cycle());
    }

    #[test]
    fn test_parameter_edits_reach_the_widgets() {
        let fx = Fixture::new();
        let mut task = fx.task(ContentKind::Chart);
        task.init().unwrap();
        let chart = match task.content() {
            Content::Chart(view) => view.chart().unwrap(),
            _ => unreachable!(),
        };

        let held = HeldLocks::new();
        {
            let mut render = fx.render.lock(&held);
            render.params.next_theme();
            render.params.zoom_in_vertical();
        }
        task.cycle();

        let render = fx.render.lock(&held);
        assert_eq!(render.toolkit.background(), render.params.background());
        assert_ne!(render.toolkit.background(), RenderParams::new(N).background());
        assert_eq!(render.toolkit.chart_range(chart), Some((-190, 190)));
        assert_eq!(render.toolkit.chart_point_count(chart), Some(5));
    }

    #[test]
    fn test_theme_edit_on_slow_content() {
        let fx = Fixture::new();
        let mut task = fx.task(ContentKind::WorldClock);
        task.init().unwrap();
        task.cycle();

        let held = HeldLocks::new();
        fx.render.lock(&held).params.next_theme();
        fx.clock.advance(Duration::millis(1000));
        assert!(task.cycle());

        let render = fx.render.lock(&held);
        assert_eq!(render.toolkit.background(), crate::params::PALETTE[1]);
    }

    #[test]
    fn test_render_runs_against_sampler_and_input() {
        let fx = Fixture::new();
        let mut task = fx.task(ContentKind::Chart);
        task.init().unwrap();

        thread::scope(|s| {
            s.spawn(|| {
                let held = HeldLocks::new();
                for i in 0..500 {
                    fx.samples.lock(&held).push(Sample::splat(i as f32 / 500.0));
                }
            });
            s.spawn(|| {
                let held = HeldLocks::new();
                for _ in 0..200 {
                    let mut render = fx.render.lock(&held);
                    render.params.next_theme();
                }
            });
            s.spawn(|| {
                for _ in 0..200 {
                    task.cycle();
                    fx.clock.advance(Duration::millis(20));
                }
                assert!(task.held.is_empty());
            });
        });

        let held = HeldLocks::new();
        let render = fx.render.lock(&held);
        assert_eq!(render.params.revision(), 200);
        assert!(fx.panel().pixels >= 320 * 240);
    }

    #[test]
    fn test_failed_bring_up_is_reported_before_halting() {
        clear_reports();
        let fx = Fixture::new();
        {
            let held = HeldLocks::new();
            let mut render = fx.render.lock(&held);
            while render
                .toolkit
                .create_label(&LabelSpec {
                    x: 0,
                    y: 0,
                    text: "",
                    color: Rgb565::WHITE,
                })
                .is_ok()
            {}
        }
        let mut task = fx.task(ContentKind::WorldClock).with_fatal_report(record_fatal);

        assert_eq!(task.start(), Err(Error::WidgetCapacity));
        assert!(task.held.is_empty());
        REPORTED.with(|lines| assert_eq!(*lines.borrow(), ["fatal: out of widget slots"]));
        assert!(HOOK_RAN.with(Cell::get));
    }

    #[test]
    fn test_successful_start_reports_nothing() {
        clear_reports();
        let fx = Fixture::new();
        let mut task = fx.task(ContentKind::Clock).with_fatal_report(record_fatal);
        assert_eq!(task.start(), Ok(()));
        REPORTED.with(|lines| assert!(lines.borrow().is_empty()));
        assert!(!HOOK_RAN.with(Cell::get));
    }
}
