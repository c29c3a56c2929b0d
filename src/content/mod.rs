//! # Content Views
//!
//! What the Render Task puts on screen. One skeleton drives every view;
//! the view is picked once at configuration time through [`ContentKind`].
//!
//! | View | Widgets | Refresh | Needs samples |
//! |------|---------|---------|---------------|
//! | Chart | one chart, three series | every render cycle | yes |
//! | Ticker | three labels per item | `SLOW_REFRESH` | no |
//! | Clock | two labels | `SLOW_REFRESH` | no |
//! | WorldClock | two labels per zone | `SLOW_REFRESH` | no |
//!
//! All widget calls happen with the Render lock held; the chart refresh
//! additionally holds the Samples lock, taken first.

use crate::config::SLOW_REFRESH;
use crate::error::Error;
use crate::params::RenderParams;
use crate::samples::SampleStore;
use crate::time::Duration;
use crate::toolkit::Toolkit;

pub mod chart;
pub mod clock;
pub mod ticker;

pub use chart::ChartView;
pub use clock::{ClockView, Zone, WORLD_ZONES};
pub use ticker::{TickerItem, TickerLayout, TickerView, ValueColorPolicy};

/// Which view to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ContentKind {
    Chart,
    Ticker,
    Clock,
    WorldClock,
}

/// Everything a refresh may look at.
pub struct Frame<'a, const N: usize> {
    /// Logical clock, milliseconds.
    pub now: u32,
    pub params: &'a RenderParams,
    /// Present only for views that asked for samples.
    pub samples: Option<&'a SampleStore<N>>,
}

/// The view selected for this build.
pub enum Content {
    Chart(ChartView),
    Ticker(TickerView),
    Clock(ClockView),
    WorldClock(ClockView),
}

impl Content {
    /// A view with its default settings.
    pub fn new(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Chart => Content::Chart(ChartView::new()),
            ContentKind::Ticker => Content::Ticker(TickerView::default()),
            ContentKind::Clock => Content::Clock(ClockView::single()),
            ContentKind::WorldClock => Content::WorldClock(ClockView::world()),
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            Content::Chart(_) => ContentKind::Chart,
            Content::Ticker(_) => ContentKind::Ticker,
            Content::Clock(_) => ContentKind::Clock,
            Content::WorldClock(_) => ContentKind::WorldClock,
        }
    }

    /// Whether a refresh reads the Sample Store.
    pub fn needs_samples(&self) -> bool {
        matches!(self, Content::Chart(_))
    }

    /// Time between refreshes; `None` means every render cycle.
    pub fn refresh_interval(&self) -> Option<Duration> {
        match self {
            Content::Chart(_) => None,
            _ => Some(SLOW_REFRESH),
        }
    }

    /// Create the view's widgets. Called once, from the Render Task's
    /// init phase.
    pub fn build<T: Toolkit>(&mut self, toolkit: &mut T, params: &RenderParams) -> Result<(), Error> {
        match self {
            Content::Chart(view) => view.build(toolkit, params),
            Content::Ticker(view) => view.build(toolkit),
            Content::Clock(view) | Content::WorldClock(view) => view.build(toolkit),
        }
    }

    /// Push parameter changes (range, window) to the widgets.
    pub fn apply_params<T: Toolkit>(&mut self, toolkit: &mut T, params: &RenderParams) {
        if let Content::Chart(view) = self {
            view.apply_params(toolkit, params);
        }
    }

    /// Recompute the displayed values.
    pub fn refresh<T: Toolkit, const N: usize>(&mut self, toolkit: &mut T, frame: &Frame<'_, N>) {
        match self {
            Content::Chart(view) => {
                if let Some(samples) = frame.samples {
                    view.refresh(toolkit, samples, frame.params.window());
                }
            }
            Content::Ticker(view) => view.refresh(toolkit),
            Content::Clock(view) | Content::WorldClock(view) => view.refresh(toolkit, frame.now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips() {
        for kind in [
            ContentKind::Chart,
            ContentKind::Ticker,
            ContentKind::Clock,
            ContentKind::WorldClock,
        ] {
            assert_eq!(Content::new(kind).kind(), kind);
        }
    }

    #[test]
    fn test_only_chart_reads_samples_every_cycle() {
        let chart = Content::new(ContentKind::Chart);
        assert!(chart.needs_samples());
        assert_eq!(chart.refresh_interval(), None);

        let clock = Content::new(ContentKind::WorldClock);
        assert!(!clock.needs_samples());
        assert_eq!(clock.refresh_interval(), Some(Duration::millis(1000)));
    }
}
