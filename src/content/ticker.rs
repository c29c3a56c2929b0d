//! Synthetic stock ticker.
//!
//! Each refresh draws a new price per item inside its `[min, max]` band
//! and shows it next to the signed change from the previous price.

use core::fmt::Write;

use embedded_graphics::pixelcolor::{Rgb565, RgbColor};
use heapless::{String, Vec};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::TICKER_SEED;
use crate::error::Error;
use crate::toolkit::{LabelSpec, Toolkit, WidgetId};

pub const MAX_ITEMS: usize = 4;

const ROW_TOP: i16 = 40;
const ROW_HEIGHT: i16 = 40;
const SYMBOL_X: i16 = 20;
const VALUE_X: i16 = 120;
const DELTA_X: i16 = 220;

/// One tracked symbol and the band its price moves in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickerItem {
    pub symbol: &'static str,
    pub min: i32,
    pub max: i32,
}

impl TickerItem {
    /// The same item with `min <= max`.
    fn normalized(self) -> Self {
        Self {
            min: self.min.min(self.max),
            max: self.min.max(self.max),
            ..self
        }
    }
}

pub const DEFAULT_ITEMS: [TickerItem; MAX_ITEMS] = [
    TickerItem { symbol: "AAPL", min: 150, max: 200 },
    TickerItem { symbol: "MSFT", min: 280, max: 340 },
    TickerItem { symbol: "GOOG", min: 120, max: 160 },
    TickerItem { symbol: "TSLA", min: 180, max: 260 },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickerLayout {
    /// Only the change is coloured.
    #[default]
    Compact,
    /// The price is coloured too, following [`ValueColorPolicy`].
    Detailed,
}

/// How the price label is coloured in the detailed layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValueColorPolicy {
    /// Red on a rise, green on a fall: the opposite of the change label.
    #[default]
    Inverted,
    /// Same colour as the change label.
    MatchDelta,
}

impl ValueColorPolicy {
    pub fn value_color(self, delta: i32) -> Rgb565 {
        match self {
            ValueColorPolicy::Inverted => {
                if delta >= 0 {
                    Rgb565::RED
                } else {
                    Rgb565::GREEN
                }
            }
            ValueColorPolicy::MatchDelta => delta_color(delta),
        }
    }
}

/// Green for a rise or no change, red for a fall.
pub fn delta_color(delta: i32) -> Rgb565 {
    if delta >= 0 {
        Rgb565::GREEN
    } else {
        Rgb565::RED
    }
}

struct Row {
    item: TickerItem,
    previous: Option<i32>,
    value_label: Option<WidgetId>,
    delta_label: Option<WidgetId>,
}

pub struct TickerView {
    rows: Vec<Row, MAX_ITEMS>,
    layout: TickerLayout,
    policy: ValueColorPolicy,
    rng: SmallRng,
}

impl TickerView {
    /// At most [`MAX_ITEMS`] of `items` are tracked. A band given upside
    /// down is flipped.
    pub fn new(items: &[TickerItem], layout: TickerLayout, policy: ValueColorPolicy, seed: u64) -> Self {
        let rows = items
            .iter()
            .take(MAX_ITEMS)
            .map(|&item| Row {
                item: item.normalized(),
                previous: None,
                value_label: None,
                delta_label: None,
            })
            .collect();
        Self {
            rows,
            layout,
            policy,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn layout(&self) -> TickerLayout {
        self.layout
    }

    pub fn build<T: Toolkit>(&mut self, toolkit: &mut T) -> Result<(), Error> {
        for (i, row) in self.rows.iter_mut().enumerate() {
            let y = ROW_TOP + i as i16 * ROW_HEIGHT;
            let label = |x, text| LabelSpec {
                x,
                y,
                text,
                color: Rgb565::WHITE,
            };
            toolkit.create_label(&label(SYMBOL_X, row.item.symbol))?;
            row.value_label = Some(toolkit.create_label(&label(VALUE_X, "--"))?);
            row.delta_label = Some(toolkit.create_label(&label(DELTA_X, "--"))?);
        }
        Ok(())
    }

    /// Draw new prices and update every row.
    pub fn refresh<T: Toolkit>(&mut self, toolkit: &mut T) {
        for row in self.rows.iter_mut() {
            let value = self.rng.random_range(row.item.min..=row.item.max);
            let delta = row.previous.map_or(0, |p| value - p);
            row.previous = Some(value);

            let (Some(value_label), Some(delta_label)) = (row.value_label, row.delta_label) else {
                continue;
            };

            let mut text: String<12> = String::new();
            let _ = write!(text, "{}", value);
            toolkit.set_label_text(value_label, &text);

            text.clear();
            let _ = write!(text, "{:+}", delta);
            toolkit.set_label_text(delta_label, &text);
            toolkit.set_label_color(delta_label, delta_color(delta));

            if self.layout == TickerLayout::Detailed {
                toolkit.set_label_color(value_label, self.policy.value_color(delta));
            }
        }
    }
}

impl Default for TickerView {
    fn default() -> Self {
        Self::new(
            &DEFAULT_ITEMS,
            TickerLayout::default(),
            ValueColorPolicy::default(),
            TICKER_SEED,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolkit::{DisplayConfig, HeadlessToolkit};

    fn built(layout: TickerLayout, policy: ValueColorPolicy) -> (HeadlessToolkit, TickerView) {
        let mut tk = HeadlessToolkit::new();
        tk.init(&DisplayConfig::default());
        let mut view = TickerView::new(&DEFAULT_ITEMS, layout, policy, 7);
        view.build(&mut tk).unwrap();
        (tk, view)
    }

    fn parse(tk: &HeadlessToolkit, label: Option<WidgetId>) -> i32 {
        tk.label_text(label.unwrap()).unwrap().parse().unwrap()
    }

    #[test]
    fn test_build_makes_three_labels_per_item() {
        let (tk, _) = built(TickerLayout::Compact, ValueColorPolicy::Inverted);
        assert_eq!(tk.label_count(), 3 * DEFAULT_ITEMS.len());
    }

    #[test]
    fn test_values_stay_in_band_and_deltas_add_up() {
        let (mut tk, mut view) = built(TickerLayout::Compact, ValueColorPolicy::Inverted);
        view.refresh(&mut tk);
        for _ in 0..50 {
            let before: std::vec::Vec<i32> = view.rows.iter().map(|r| parse(&tk, r.value_label)).collect();
            view.refresh(&mut tk);
            for (row, prev) in view.rows.iter().zip(before) {
                let value = parse(&tk, row.value_label);
                let delta = parse(&tk, row.delta_label);
                assert!((row.item.min..=row.item.max).contains(&value));
                assert_eq!(value - prev, delta);
                assert_eq!(tk.label_color(row.delta_label.unwrap()), Some(delta_color(delta)));
            }
        }
    }

    #[test]
    fn test_first_refresh_shows_zero_change() {
        let (mut tk, mut view) = built(TickerLayout::Compact, ValueColorPolicy::Inverted);
        view.refresh(&mut tk);
        let row = &view.rows[0];
        assert_eq!(tk.label_text(row.delta_label.unwrap()), Some("+0"));
        assert_eq!(tk.label_color(row.delta_label.unwrap()), Some(Rgb565::GREEN));
        // Compact layout leaves the price white.
        assert_eq!(tk.label_color(row.value_label.unwrap()), Some(Rgb565::WHITE));
    }

    #[test]
    fn test_detailed_layout_inverts_price_colour_by_default() {
        let (mut tk, mut view) = built(TickerLayout::Detailed, ValueColorPolicy::Inverted);
        view.refresh(&mut tk);
        let row = &view.rows[0];
        assert_eq!(tk.label_color(row.value_label.unwrap()), Some(Rgb565::RED));
        assert_eq!(tk.label_color(row.delta_label.unwrap()), Some(Rgb565::GREEN));
    }

    #[test]
    fn test_match_delta_policy() {
        assert_eq!(ValueColorPolicy::MatchDelta.value_color(3), Rgb565::GREEN);
        assert_eq!(ValueColorPolicy::MatchDelta.value_color(-3), Rgb565::RED);
        assert_eq!(ValueColorPolicy::Inverted.value_color(-3), Rgb565::GREEN);
    }

    #[test]
    fn test_same_seed_same_prices() {
        let (mut tk_a, mut a) = built(TickerLayout::Compact, ValueColorPolicy::Inverted);
        let (mut tk_b, mut b) = built(TickerLayout::Compact, ValueColorPolicy::Inverted);
        a.refresh(&mut tk_a);
        b.refresh(&mut tk_b);
        for (ra, rb) in a.rows.iter().zip(b.rows.iter()) {
            assert_eq!(ra.previous, rb.previous);
        }
    }

    #[test]
    fn test_reversed_band_is_flipped() {
        let items = [TickerItem { symbol: "REV", min: 90, max: 10 }];
        let mut tk = HeadlessToolkit::new();
        tk.init(&DisplayConfig::default());
        let mut view = TickerView::new(&items, TickerLayout::Compact, ValueColorPolicy::Inverted, 3);
        view.build(&mut tk).unwrap();
        assert_eq!((view.rows[0].item.min, view.rows[0].item.max), (10, 90));

        for _ in 0..50 {
            view.refresh(&mut tk);
            let value = parse(&tk, view.rows[0].value_label);
            assert!((10..=90).contains(&value));
        }
    }
}
