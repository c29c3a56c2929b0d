//! # Graphics Toolkit Interface
//!
//! The Render Task drives a retained-mode widget toolkit through the
//! [`Toolkit`] trait. The toolkit owns all widget state; the task only
//! keeps the [`WidgetId`]/[`SeriesId`] handles it created.
//!
//! The toolkit reaches back out through two capabilities passed to every
//! [`Toolkit::service`] call:
//!
//! ```text
//!   RenderTask ──service(now, io)──► Toolkit
//!                                      │
//!                 io.flush.flush() ◄───┤  damaged area + pixels
//!                 io.input.read()  ◄───┘  pointer / encoder state
//! ```
//!
//! `service` runs with the Render lock held, so a [`FlushSink`] must never
//! ask for that lock; the panel flush bridge only takes the Panel lock.

use embedded_graphics::pixelcolor::Rgb565;

use crate::config::{DISPLAY_HEIGHT, DISPLAY_WIDTH, DRAW_BUFFER_PIXELS};
use crate::error::Error;

pub mod headless;

pub use headless::HeadlessToolkit;

// ---------------------------------------------------------------------------
// Geometry and configuration
// ---------------------------------------------------------------------------

/// Inclusive screen rectangle `(x0, y0)..=(x1, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Area {
    pub x0: u16,
    pub y0: u16,
    pub x1: u16,
    pub y1: u16,
}

impl Area {
    pub const fn width(&self) -> u16 {
        self.x1 - self.x0 + 1
    }

    pub const fn height(&self) -> u16 {
        self.y1 - self.y0 + 1
    }

    pub const fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }
}

/// Display resolution and draw-buffer size handed to [`Toolkit::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayConfig {
    pub width: u16,
    pub height: u16,
    /// Pixels the toolkit may render before it has to flush.
    pub buffer_pixels: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: DISPLAY_WIDTH,
            height: DISPLAY_HEIGHT,
            buffer_pixels: DRAW_BUFFER_PIXELS,
        }
    }
}

// ---------------------------------------------------------------------------
// Handles and widget specs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WidgetKind {
    Label,
    Chart,
}

/// Opaque handle to a widget created by the toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WidgetId {
    pub(crate) kind: WidgetKind,
    pub(crate) index: u8,
}

impl WidgetId {
    pub fn kind(&self) -> WidgetKind {
        self.kind
    }
}

/// Opaque handle to one data series of a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SeriesId {
    pub(crate) chart: WidgetId,
    pub(crate) index: u8,
}

impl SeriesId {
    pub fn chart(&self) -> WidgetId {
        self.chart
    }
}

/// A text label placed at `(x, y)` from the top-left corner.
#[derive(Debug, Clone, Copy)]
pub struct LabelSpec<'a> {
    pub x: i16,
    pub y: i16,
    pub text: &'a str,
    pub color: Rgb565,
}

/// A line chart centred on the screen.
#[derive(Debug, Clone, Copy)]
pub struct ChartSpec {
    pub width: u16,
    pub height: u16,
    pub y_min: i16,
    pub y_max: i16,
    pub point_count: u16,
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Where the toolkit sends rendered pixels. Returning from `flush` tells
/// the toolkit the buffer may be reused.
pub trait FlushSink {
    fn flush(&mut self, area: Area, pixels: &[Rgb565]);
}

/// State of the logical input device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputEvent {
    /// Encoder steps since the previous read.
    pub encoder_diff: i32,
    pub pressed: bool,
}

/// Where the toolkit polls pointer or encoder input.
pub trait InputSource {
    fn read(&mut self) -> InputEvent;
}

/// An encoder that never turns and is never pressed.
#[derive(Debug, Default)]
pub struct NoPointer {
    last_position: i32,
}

impl NoPointer {
    pub const fn new() -> Self {
        Self { last_position: 0 }
    }
}

impl InputSource for NoPointer {
    fn read(&mut self) -> InputEvent {
        let position = 0;
        let event = InputEvent {
            encoder_diff: position - self.last_position,
            pressed: false,
        };
        self.last_position = position;
        event
    }
}

/// Capabilities lent to the toolkit for one `service` call.
pub struct ToolkitIo<'a> {
    pub flush: &'a mut dyn FlushSink,
    pub input: &'a mut dyn InputSource,
}

// ---------------------------------------------------------------------------
// Toolkit
// ---------------------------------------------------------------------------

/// Retained-mode widget toolkit owned by the Render Task.
///
/// Operations on a handle the toolkit did not hand out are ignored.
pub trait Toolkit {
    /// Bring up the runtime for a display of the given geometry.
    fn init(&mut self, config: &DisplayConfig);

    /// Do pending work: timers, input, redraw. `now` is the logical clock
    /// in milliseconds.
    fn service(&mut self, now: u32, io: &mut ToolkitIo<'_>);

    /// Fill the whole screen behind all widgets.
    fn set_background(&mut self, color: Rgb565);

    fn create_label(&mut self, spec: &LabelSpec<'_>) -> Result<WidgetId, Error>;

    fn set_label_text(&mut self, label: WidgetId, text: &str);

    fn set_label_color(&mut self, label: WidgetId, color: Rgb565);

    fn create_chart(&mut self, spec: &ChartSpec) -> Result<WidgetId, Error>;

    fn add_series(&mut self, chart: WidgetId, color: Rgb565) -> Result<SeriesId, Error>;

    /// Vertical axis range, inclusive.
    fn set_chart_range(&mut self, chart: WidgetId, min: i16, max: i16);

    /// Points shown per series; older points scroll out.
    fn set_chart_point_count(&mut self, chart: WidgetId, count: u16);

    fn clear_series(&mut self, series: SeriesId);

    /// Append `value` as the newest point of `series`.
    fn push_point(&mut self, series: SeriesId, value: i16);

    /// Mark the chart for redraw after a batch of point updates.
    fn refresh_chart(&mut self, chart: WidgetId);
}
