//! Live three-axis chart.

use embedded_graphics::pixelcolor::{Rgb565, RgbColor};

use crate::config::{CHART_HEIGHT, CHART_SCALE, CHART_WIDTH};
use crate::error::Error;
use crate::params::RenderParams;
use crate::samples::SampleStore;
use crate::toolkit::{ChartSpec, SeriesId, Toolkit, WidgetId};

/// Series colours for the x, y and z axes.
pub const SERIES_COLORS: [Rgb565; 3] = [Rgb565::BLUE, Rgb565::RED, Rgb565::GREEN];

pub struct ChartView {
    chart: Option<WidgetId>,
    series: heapless::Vec<SeriesId, 3>,
    /// Range and window last pushed to the chart.
    shown: Option<(i16, usize)>,
}

impl ChartView {
    pub const fn new() -> Self {
        Self {
            chart: None,
            series: heapless::Vec::new(),
            shown: None,
        }
    }

    pub fn chart(&self) -> Option<WidgetId> {
        self.chart
    }

    pub fn series(&self) -> &[SeriesId] {
        &self.series
    }

    pub fn build<T: Toolkit>(&mut self, toolkit: &mut T, params: &RenderParams) -> Result<(), Error> {
        let y = params.y_range();
        let chart = toolkit.create_chart(&ChartSpec {
            width: CHART_WIDTH,
            height: CHART_HEIGHT,
            y_min: -y,
            y_max: y,
            point_count: params.window() as u16,
        })?;
        for color in SERIES_COLORS {
            let series = toolkit.add_series(chart, color)?;
            self.series.push(series).map_err(|_| Error::WidgetCapacity)?;
        }
        self.chart = Some(chart);
        self.shown = Some((y, params.window()));
        Ok(())
    }

    pub fn apply_params<T: Toolkit>(&mut self, toolkit: &mut T, params: &RenderParams) {
        let Some(chart) = self.chart else {
            return;
        };
        let (y, window) = (params.y_range(), params.window());
        let (shown_y, shown_window) = self.shown.unwrap_or((0, 0));
        if y != shown_y {
            toolkit.set_chart_range(chart, -y, y);
        }
        if window != shown_window {
            toolkit.set_chart_point_count(chart, window as u16);
        }
        self.shown = Some((y, window));
    }

    /// Replot the last `window` samples, oldest first.
    pub fn refresh<T: Toolkit, const N: usize>(
        &mut self,
        toolkit: &mut T,
        samples: &SampleStore<N>,
        window: usize,
    ) {
        let Some(chart) = self.chart else {
            return;
        };
        for &series in &self.series {
            toolkit.clear_series(series);
        }
        for sample in samples.read_window(window) {
            for (&series, value) in self.series.iter().zip(sample.channels()) {
                toolkit.push_point(series, scale(value));
            }
        }
        toolkit.refresh_chart(chart);
    }
}

impl Default for ChartView {
    fn default() -> Self {
        Self::new()
    }
}

/// Sensor value to chart units. Out-of-range values saturate.
pub fn scale(value: f32) -> i16 {
    (value * CHART_SCALE) as i16
}
