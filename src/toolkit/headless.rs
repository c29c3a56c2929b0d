//! Fixed-capacity [`Toolkit`] that renders with `embedded-graphics`.
//!
//! Widgets live in `heapless` tables. Every change invalidates the
//! widget's screen rectangle; the next [`Toolkit::service`] call redraws
//! the union of those rectangles in bands of at most `buffer_pixels`
//! pixels and hands each band to the flush sink.

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Polyline, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use heapless::{Deque, String, Vec};

use super::{
    Area, ChartSpec, DisplayConfig, FlushSink, InputEvent, LabelSpec, SeriesId, Toolkit,
    ToolkitIo, WidgetId, WidgetKind,
};
use crate::config::{DRAW_BUFFER_PIXELS, SAMPLE_CAPACITY};
use crate::error::Error;

pub const MAX_LABELS: usize = 16;
pub const MAX_CHARTS: usize = 2;
pub const MAX_SERIES: usize = 4;
pub const MAX_POINTS: usize = SAMPLE_CAPACITY;
pub const LABEL_TEXT_CAPACITY: usize = 32;

const CHAR_WIDTH: u16 = 6;
const CHAR_HEIGHT: u16 = 10;

const FRAME_COLOR: Rgb565 = Rgb565::new(16, 32, 16);

struct Label {
    x: i16,
    y: i16,
    text: String<LABEL_TEXT_CAPACITY>,
    color: Rgb565,
}

struct Series {
    color: Rgb565,
    points: Deque<i16, MAX_POINTS>,
}

struct Chart {
    area: Area,
    y_min: i16,
    y_max: i16,
    point_count: u16,
    series: Vec<Series, MAX_SERIES>,
    refreshes: u32,
}

pub struct HeadlessToolkit {
    config: DisplayConfig,
    initialized: bool,
    background: Rgb565,
    labels: Vec<Label, MAX_LABELS>,
    charts: Vec<Chart, MAX_CHARTS>,
    dirty: Option<Area>,
    buffer: [Rgb565; DRAW_BUFFER_PIXELS],
    now: u32,
    last_input: InputEvent,
    service_count: u32,
    flush_count: u32,
    pixels_flushed: u64,
}

impl HeadlessToolkit {
    pub fn new() -> Self {
        Self {
            config: DisplayConfig::default(),
            initialized: false,
            background: Rgb565::BLACK,
            labels: Vec::new(),
            charts: Vec::new(),
            dirty: None,
            buffer: [Rgb565::BLACK; DRAW_BUFFER_PIXELS],
            now: 0,
            last_input: InputEvent::default(),
            service_count: 0,
            flush_count: 0,
            pixels_flushed: 0,
        }
    }

    fn screen(&self) -> Area {
        Area {
            x0: 0,
            y0: 0,
            x1: self.config.width - 1,
            y1: self.config.height - 1,
        }
    }

    fn invalidate(&mut self, area: Area) {
        self.dirty = Some(match self.dirty {
            None => area,
            Some(d) => Area {
                x0: d.x0.min(area.x0),
                y0: d.y0.min(area.y0),
                x1: d.x1.max(area.x1),
                y1: d.y1.max(area.y1),
            },
        });
    }

    /// Screen cells a label may cover, whatever its text, clipped to the
    /// display.
    fn label_area(&self, x: i16, y: i16) -> Option<Area> {
        let screen = self.screen();
        let x1 = i32::from(x) + i32::from(CHAR_WIDTH) * LABEL_TEXT_CAPACITY as i32 - 1;
        let y1 = i32::from(y) + i32::from(CHAR_HEIGHT) - 1;
        if x1 < 0 || y1 < 0 || i32::from(x) > i32::from(screen.x1) || i32::from(y) > i32::from(screen.y1) {
            return None;
        }
        Some(Area {
            x0: x.max(0) as u16,
            y0: y.max(0) as u16,
            x1: x1.min(i32::from(screen.x1)) as u16,
            y1: y1.min(i32::from(screen.y1)) as u16,
        })
    }

    fn invalidate_label(&mut self, index: usize) {
        if let Some(area) = self.labels.get(index).and_then(|l| self.label_area(l.x, l.y)) {
            self.invalidate(area);
        }
    }

    fn label_mut(&mut self, id: WidgetId) -> Option<&mut Label> {
        match id.kind {
            WidgetKind::Label => self.labels.get_mut(usize::from(id.index)),
            WidgetKind::Chart => None,
        }
    }

    fn chart_mut(&mut self, id: WidgetId) -> Option<&mut Chart> {
        match id.kind {
            WidgetKind::Chart => self.charts.get_mut(usize::from(id.index)),
            WidgetKind::Label => None,
        }
    }

    fn chart(&self, id: WidgetId) -> Option<&Chart> {
        match id.kind {
            WidgetKind::Chart => self.charts.get(usize::from(id.index)),
            WidgetKind::Label => None,
        }
    }

    fn series_mut(&mut self, id: SeriesId) -> Option<&mut Series> {
        self.chart_mut(id.chart)?
            .series
            .get_mut(usize::from(id.index))
    }

    fn invalidate_chart(&mut self, id: WidgetId) {
        if let Some(area) = self.chart(id).map(|c| c.area) {
            self.invalidate(area);
        }
    }

    /// Redraw `dirty` band by band and push each band to `sink`.
    fn redraw(&mut self, dirty: Area, sink: &mut dyn FlushSink) {
        let width = usize::from(dirty.width());
        let capacity = self.config.buffer_pixels.min(DRAW_BUFFER_PIXELS);
        let rows = (capacity / width).max(1) as u16;
        // A band must fit the buffer even when one row is wider than it.
        let width = width.min(capacity);
        let dirty = Area {
            x1: dirty.x0 + width as u16 - 1,
            ..dirty
        };

        let mut y0 = dirty.y0;
        loop {
            let y1 = (y0 + rows - 1).min(dirty.y1);
            let area = Area {
                y0,
                y1,
                ..dirty
            };
            let pixels = &mut self.buffer[..area.pixel_count()];
            pixels.fill(self.background);

            let mut band = Band {
                pixels,
                area,
                screen: Size::new(u32::from(self.config.width), u32::from(self.config.height)),
            };
            for chart in &self.charts {
                draw_chart(chart, &mut band);
            }
            for label in &self.labels {
                let style = MonoTextStyle::new(&FONT_6X10, label.color);
                let origin = Point::new(i32::from(label.x), i32::from(label.y));
                let _ = Text::with_baseline(&label.text, origin, style, Baseline::Top).draw(&mut band);
            }

            sink.flush(area, band.pixels);
            self.flush_count += 1;
            self.pixels_flushed += area.pixel_count() as u64;

            if y1 >= dirty.y1 {
                break;
            }
            y0 = y1 + 1;
        }
        trace!("redrew {} rows", dirty.height());
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn background(&self) -> Rgb565 {
        self.background
    }

    pub fn label_text(&self, id: WidgetId) -> Option<&str> {
        match id.kind {
            WidgetKind::Label => self.labels.get(usize::from(id.index)).map(|l| l.text.as_str()),
            WidgetKind::Chart => None,
        }
    }

    pub fn label_color(&self, id: WidgetId) -> Option<Rgb565> {
        match id.kind {
            WidgetKind::Label => self.labels.get(usize::from(id.index)).map(|l| l.color),
            WidgetKind::Chart => None,
        }
    }

    pub fn chart_range(&self, id: WidgetId) -> Option<(i16, i16)> {
        self.chart(id).map(|c| (c.y_min, c.y_max))
    }

    pub fn chart_point_count(&self, id: WidgetId) -> Option<u16> {
        self.chart(id).map(|c| c.point_count)
    }

    pub fn chart_area(&self, id: WidgetId) -> Option<Area> {
        self.chart(id).map(|c| c.area)
    }

    pub fn chart_refreshes(&self, id: WidgetId) -> Option<u32> {
        self.chart(id).map(|c| c.refreshes)
    }

    /// Points currently held by `series`, oldest first.
    pub fn series_points(&self, id: SeriesId) -> Option<Vec<i16, MAX_POINTS>> {
        let series = self.chart(id.chart)?.series.get(usize::from(id.index))?;
        Some(series.points.iter().copied().collect())
    }

    pub fn series_color(&self, id: SeriesId) -> Option<Rgb565> {
        let series = self.chart(id.chart)?.series.get(usize::from(id.index))?;
        Some(series.color)
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn chart_count(&self) -> usize {
        self.charts.len()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn service_count(&self) -> u32 {
        self.service_count
    }

    /// Logical time passed to the last `service` call.
    pub fn last_service_time(&self) -> u32 {
        self.now
    }

    pub fn last_input(&self) -> InputEvent {
        self.last_input
    }

    pub fn flush_count(&self) -> u32 {
        self.flush_count
    }

    pub fn pixels_flushed(&self) -> u64 {
        self.pixels_flushed
    }

    /// Area waiting for the next redraw.
    pub fn pending(&self) -> Option<Area> {
        self.dirty
    }
}

impl Default for HeadlessToolkit {
    fn default() -> Self {
        Self::new()
    }
}

impl Toolkit for HeadlessToolkit {
    fn init(&mut self, config: &DisplayConfig) {
        self.config = *config;
        self.initialized = true;
        let screen = self.screen();
        self.invalidate(screen);
        debug!("toolkit {}x{}", config.width, config.height);
    }

    fn service(&mut self, now: u32, io: &mut ToolkitIo<'_>) {
        self.now = now;
        self.service_count = self.service_count.wrapping_add(1);
        if !self.initialized {
            return;
        }
        self.last_input = io.input.read();
        if let Some(dirty) = self.dirty.take() {
            self.redraw(dirty, &mut *io.flush);
        }
    }

    fn set_background(&mut self, color: Rgb565) {
        self.background = color;
        let screen = self.screen();
        self.invalidate(screen);
    }

    fn create_label(&mut self, spec: &LabelSpec<'_>) -> Result<WidgetId, Error> {
        let mut label = Label {
            x: spec.x,
            y: spec.y,
            text: String::new(),
            color: spec.color,
        };
        set_truncated(&mut label.text, spec.text);
        let index = self.labels.len();
        self.labels.push(label).map_err(|_| Error::WidgetCapacity)?;
        self.invalidate_label(index);
        Ok(WidgetId {
            kind: WidgetKind::Label,
            index: index as u8,
        })
    }

    fn set_label_text(&mut self, label: WidgetId, text: &str) {
        let Some(l) = self.label_mut(label) else {
            return;
        };
        if l.text.as_str() == text {
            return;
        }
        set_truncated(&mut l.text, text);
        self.invalidate_label(usize::from(label.index));
    }

    fn set_label_color(&mut self, label: WidgetId, color: Rgb565) {
        let Some(l) = self.label_mut(label) else {
            return;
        };
        if l.color == color {
            return;
        }
        l.color = color;
        self.invalidate_label(usize::from(label.index));
    }

    fn create_chart(&mut self, spec: &ChartSpec) -> Result<WidgetId, Error> {
        let width = spec.width.clamp(1, self.config.width);
        let height = spec.height.clamp(1, self.config.height);
        let x0 = (self.config.width - width) / 2;
        let y0 = (self.config.height - height) / 2;
        let chart = Chart {
            area: Area {
                x0,
                y0,
                x1: x0 + width - 1,
                y1: y0 + height - 1,
            },
            y_min: spec.y_min,
            y_max: spec.y_max,
            point_count: spec.point_count.clamp(1, MAX_POINTS as u16),
            series: Vec::new(),
            refreshes: 0,
        };
        let area = chart.area;
        let index = self.charts.len();
        self.charts.push(chart).map_err(|_| Error::WidgetCapacity)?;
        self.invalidate(area);
        Ok(WidgetId {
            kind: WidgetKind::Chart,
            index: index as u8,
        })
    }

    fn add_series(&mut self, chart: WidgetId, color: Rgb565) -> Result<SeriesId, Error> {
        let c = self.chart_mut(chart).ok_or(Error::WidgetCapacity)?;
        let index = c.series.len();
        c.series
            .push(Series {
                color,
                points: Deque::new(),
            })
            .map_err(|_| Error::WidgetCapacity)?;
        Ok(SeriesId {
            chart,
            index: index as u8,
        })
    }

    fn set_chart_range(&mut self, chart: WidgetId, min: i16, max: i16) {
        let Some(c) = self.chart_mut(chart) else {
            return;
        };
        c.y_min = min.min(max);
        c.y_max = max.max(min);
        self.invalidate_chart(chart);
    }

    fn set_chart_point_count(&mut self, chart: WidgetId, count: u16) {
        let Some(c) = self.chart_mut(chart) else {
            return;
        };
        c.point_count = count.clamp(1, MAX_POINTS as u16);
        let keep = usize::from(c.point_count);
        for series in c.series.iter_mut() {
            while series.points.len() > keep {
                series.points.pop_front();
            }
        }
        self.invalidate_chart(chart);
    }

    fn clear_series(&mut self, series: SeriesId) {
        if let Some(s) = self.series_mut(series) {
            s.points.clear();
        }
    }

    fn push_point(&mut self, series: SeriesId, value: i16) {
        let Some(chart) = self.chart_mut(series.chart) else {
            return;
        };
        let keep = usize::from(chart.point_count);
        let Some(s) = chart.series.get_mut(usize::from(series.index)) else {
            return;
        };
        while s.points.len() >= keep {
            s.points.pop_front();
        }
        // Cannot fail: at most `keep - 1 < MAX_POINTS` points remain.
        let _ = s.points.push_back(value);
    }

    fn refresh_chart(&mut self, chart: WidgetId) {
        if let Some(c) = self.chart_mut(chart) {
            c.refreshes = c.refreshes.wrapping_add(1);
            self.invalidate_chart(chart);
        }
    }
}

fn set_truncated<const N: usize>(dst: &mut String<N>, text: &str) {
    dst.clear();
    for c in text.chars() {
        if dst.push(c).is_err() {
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Draw target covering one band of the screen; pixels outside the band
/// are dropped.
struct Band<'a> {
    pixels: &'a mut [Rgb565],
    area: Area,
    screen: Size,
}

impl OriginDimensions for Band<'_> {
    fn size(&self) -> Size {
        self.screen
    }
}

impl DrawTarget for Band<'_> {
    type Color = Rgb565;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (x0, y0) = (i32::from(self.area.x0), i32::from(self.area.y0));
        let (x1, y1) = (i32::from(self.area.x1), i32::from(self.area.y1));
        let stride = usize::from(self.area.width());
        for Pixel(p, color) in pixels {
            if p.x < x0 || p.x > x1 || p.y < y0 || p.y > y1 {
                continue;
            }
            let index = (p.y - y0) as usize * stride + (p.x - x0) as usize;
            self.pixels[index] = color;
        }
        Ok(())
    }
}

fn draw_chart(chart: &Chart, target: &mut Band<'_>) {
    let origin = Point::new(i32::from(chart.area.x0), i32::from(chart.area.y0));
    let size = Size::new(u32::from(chart.area.width()), u32::from(chart.area.height()));
    let _ = Rectangle::new(origin, size)
        .into_styled(PrimitiveStyle::with_stroke(FRAME_COLOR, 1))
        .draw(target);

    let w = i32::from(chart.area.width()) - 1;
    let h = i32::from(chart.area.height()) - 1;
    let span = (i32::from(chart.y_max) - i32::from(chart.y_min)).max(1);
    let steps = (i32::from(chart.point_count) - 1).max(1);

    for series in &chart.series {
        let points: Vec<Point, MAX_POINTS> = series
            .points
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let v = i32::from(v).clamp(i32::from(chart.y_min), i32::from(chart.y_max));
                Point::new(
                    origin.x + i as i32 * w / steps,
                    origin.y + (i32::from(chart.y_max) - v) * h / span,
                )
            })
            .collect();
        if points.len() < 2 {
            continue;
        }
        let _ = Polyline::new(&points)
            .into_styled(PrimitiveStyle::with_stroke(series.color, 1))
            .draw(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolkit::NoPointer;
    use std::vec::Vec as StdVec;

    #[derive(Default)]
    struct Recorder {
        areas: StdVec<Area>,
        pixels: StdVec<Rgb565>,
    }

    impl FlushSink for Recorder {
        fn flush(&mut self, area: Area, pixels: &[Rgb565]) {
            assert_eq!(pixels.len(), area.pixel_count());
            self.areas.push(area);
            self.pixels.extend_from_slice(pixels);
        }
    }

    fn service(tk: &mut HeadlessToolkit, now: u32, sink: &mut Recorder) {
        let mut input = NoPointer::new();
        let mut io = ToolkitIo {
            flush: sink,
            input: &mut input,
        };
        tk.service(now, &mut io);
    }

    fn ready() -> HeadlessToolkit {
        let mut tk = HeadlessToolkit::new();
        tk.init(&DisplayConfig::default());
        service(&mut tk, 0, &mut Recorder::default());
        tk
    }

    #[test]
    fn test_first_service_paints_whole_screen_in_bands() {
        let mut tk = HeadlessToolkit::new();
        tk.init(&DisplayConfig::default());
        tk.set_background(Rgb565::BLUE);
        let mut sink = Recorder::default();
        service(&mut tk, 40, &mut sink);

        // 3840-pixel buffer, 320-pixel rows: 12 rows per band.
        assert_eq!(sink.areas.len(), 20);
        assert_eq!(sink.areas[0], Area { x0: 0, y0: 0, x1: 319, y1: 11 });
        assert_eq!(sink.areas[19].y1, 239);
        assert_eq!(tk.pixels_flushed(), 320 * 240);
        assert!(sink.pixels.iter().all(|&p| p == Rgb565::BLUE));
        assert_eq!(tk.last_service_time(), 40);
        assert_eq!(tk.pending(), None);
    }

    #[test]
    fn test_nothing_to_flush_when_clean() {
        let mut tk = ready();
        let mut sink = Recorder::default();
        service(&mut tk, 20, &mut sink);
        assert!(sink.areas.is_empty());
        assert_eq!(tk.service_count(), 2);
    }

    #[test]
    fn test_label_update_flushes_only_its_area() {
        let mut tk = ready();
        let label = tk
            .create_label(&LabelSpec {
                x: 10,
                y: 20,
                text: "hello",
                color: Rgb565::WHITE,
            })
            .unwrap();
        service(&mut tk, 20, &mut Recorder::default());

        tk.set_label_text(label, "world");
        let mut sink = Recorder::default();
        service(&mut tk, 40, &mut sink);
        assert_eq!(sink.areas, [Area { x0: 10, y0: 20, x1: 201, y1: 29 }]);
        assert!(sink.pixels.contains(&Rgb565::WHITE));
        assert_eq!(tk.label_text(label), Some("world"));

        // Same text again: nothing to redraw.
        tk.set_label_text(label, "world");
        assert_eq!(tk.pending(), None);
    }

    #[test]
    fn test_label_text_is_truncated() {
        let mut tk = ready();
        let label = tk
            .create_label(&LabelSpec {
                x: 0,
                y: 0,
                text: "",
                color: Rgb565::RED,
            })
            .unwrap();
        tk.set_label_text(label, "0123456789012345678901234567890123456789");
        assert_eq!(tk.label_text(label).map(str::len), Some(LABEL_TEXT_CAPACITY));
    }

    #[test]
    fn test_label_table_capacity() {
        let mut tk = ready();
        let spec = LabelSpec {
            x: 0,
            y: 0,
            text: "x",
            color: Rgb565::RED,
        };
        for _ in 0..MAX_LABELS {
            tk.create_label(&spec).unwrap();
        }
        assert_eq!(tk.create_label(&spec), Err(Error::WidgetCapacity));
    }

    #[test]
    fn test_chart_points_scroll() {
        let mut tk = ready();
        let chart = tk
            .create_chart(&ChartSpec {
                width: 280,
                height: 200,
                y_min: -200,
                y_max: 200,
                point_count: 3,
            })
            .unwrap();
        assert_eq!(tk.chart_area(chart), Some(Area { x0: 20, y0: 20, x1: 299, y1: 219 }));
        let series = tk.add_series(chart, Rgb565::BLUE).unwrap();
        for v in 1..=5 {
            tk.push_point(series, v);
        }
        assert_eq!(tk.series_points(series).unwrap(), [3i16, 4, 5]);

        tk.set_chart_point_count(chart, 2);
        assert_eq!(tk.series_points(series).unwrap(), [4i16, 5]);

        tk.clear_series(series);
        assert!(tk.series_points(series).unwrap().is_empty());
    }

    #[test]
    fn test_chart_redraw_draws_series() {
        let mut tk = ready();
        let chart = tk
            .create_chart(&ChartSpec {
                width: 100,
                height: 100,
                y_min: -10,
                y_max: 10,
                point_count: 4,
            })
            .unwrap();
        let series = tk.add_series(chart, Rgb565::RED).unwrap();
        for v in [-10, 0, 10, 0] {
            tk.push_point(series, v);
        }
        tk.set_chart_range(chart, -10, 10);
        tk.refresh_chart(chart);
        assert_eq!(tk.chart_refreshes(chart), Some(1));

        let mut sink = Recorder::default();
        service(&mut tk, 20, &mut sink);
        assert!(sink.pixels.contains(&Rgb565::RED));
        let covered: usize = sink.areas.iter().map(Area::pixel_count).sum();
        assert_eq!(covered, 100 * 100);
    }

    #[test]
    fn test_wrong_handle_kind_is_ignored() {
        let mut tk = ready();
        let label = tk
            .create_label(&LabelSpec {
                x: 0,
                y: 0,
                text: "a",
                color: Rgb565::RED,
            })
            .unwrap();
        tk.set_chart_range(label, 0, 1);
        assert_eq!(tk.chart_range(label), None);
        assert_eq!(tk.add_series(label, Rgb565::RED), Err(Error::WidgetCapacity));
    }

    #[test]
    fn test_service_before_init_draws_nothing() {
        let mut tk = HeadlessToolkit::new();
        tk.set_background(Rgb565::GREEN);
        let mut sink = Recorder::default();
        service(&mut tk, 0, &mut sink);
        assert!(sink.areas.is_empty());
        assert!(!tk.is_initialized());
    }
}
