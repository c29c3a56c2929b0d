//! # Render Parameters
//!
//! Vertical zoom, visible window width and background theme. The Input
//! Task mutates them, the Render Task applies them; both hold the Render
//! lock while doing so. Every value is clamped on every change, and every
//! change that has an effect bumps [`RenderParams::revision`].

use embedded_graphics::pixelcolor::Rgb565;

use crate::config::{
    SAMPLE_CAPACITY, WINDOW_MIN, WINDOW_STEP, Y_RANGE_DEFAULT, Y_RANGE_MAX, Y_RANGE_MIN,
    Y_RANGE_STEP,
};

const fn rgb(r: u8, g: u8, b: u8) -> Rgb565 {
    Rgb565::new(r >> 3, g >> 2, b >> 3)
}

/// Background colours cycled by the center button.
pub const PALETTE: [Rgb565; 17] = [
    rgb(0x00, 0x00, 0x00), // black
    rgb(0xFF, 0xFF, 0xFF), // white
    rgb(0xFF, 0x00, 0x00), // red
    rgb(0x00, 0x80, 0x00), // green
    rgb(0x00, 0x00, 0xFF), // blue
    rgb(0xFF, 0xFF, 0x00), // yellow
    rgb(0x00, 0xFF, 0xFF), // cyan
    rgb(0xFF, 0x00, 0xFF), // magenta
    rgb(0x80, 0x80, 0x80), // gray
    rgb(0xC0, 0xC0, 0xC0), // silver
    rgb(0x80, 0x00, 0x00), // maroon
    rgb(0x80, 0x80, 0x00), // olive
    rgb(0x00, 0xFF, 0x00), // lime
    rgb(0x00, 0xFF, 0xFF), // aqua
    rgb(0x00, 0x80, 0x80), // teal
    rgb(0x00, 0x00, 0x80), // navy
    rgb(0x80, 0x00, 0x80), // purple
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RenderParams {
    y_range: i16,
    window: usize,
    window_max: usize,
    theme: usize,
    revision: u32,
}

impl RenderParams {
    /// Defaults for a sample ring of `window_max` slots: the full window,
    /// the default vertical range and the first palette entry.
    pub const fn new(window_max: usize) -> Self {
        let window_max = if window_max < WINDOW_MIN {
            WINDOW_MIN
        } else {
            window_max
        };
        Self {
            y_range: Y_RANGE_DEFAULT,
            window: window_max,
            window_max,
            theme: 0,
            revision: 0,
        }
    }

    /// Half-height of the chart's vertical axis.
    pub fn y_range(&self) -> i16 {
        self.y_range
    }

    /// Visible chart width in samples.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Index into [`PALETTE`].
    pub fn theme(&self) -> usize {
        self.theme
    }

    pub fn background(&self) -> Rgb565 {
        PALETTE[self.theme]
    }

    /// Number of effective changes so far.
    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn zoom_in_vertical(&mut self) -> bool {
        self.set_y_range(self.y_range - Y_RANGE_STEP)
    }

    pub fn zoom_out_vertical(&mut self) -> bool {
        self.set_y_range(self.y_range + Y_RANGE_STEP)
    }

    /// Show fewer samples.
    pub fn narrow_window(&mut self) -> bool {
        self.set_window(self.window.saturating_sub(WINDOW_STEP))
    }

    /// Show more samples.
    pub fn widen_window(&mut self) -> bool {
        self.set_window(self.window + WINDOW_STEP)
    }

    pub fn next_theme(&mut self) {
        self.theme = (self.theme + 1) % PALETTE.len();
        self.bump();
    }

    fn set_y_range(&mut self, value: i16) -> bool {
        let value = value.clamp(Y_RANGE_MIN, Y_RANGE_MAX);
        if value == self.y_range {
            return false;
        }
        self.y_range = value;
        self.bump();
        true
    }

    fn set_window(&mut self, value: usize) -> bool {
        let value = value.clamp(WINDOW_MIN, self.window_max);
        if value == self.window {
            return false;
        }
        self.window = value;
        self.bump();
        true
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

impl Default for RenderParams {
    fn default() -> Self {
        Self::new(SAMPLE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::pixelcolor::RgbColor;

    #[test]
    fn test_defaults() {
        let p = RenderParams::default();
        assert_eq!(p.y_range(), 200);
        assert_eq!(p.window(), 50);
        assert_eq!(p.background(), Rgb565::BLACK);
        assert_eq!(p.revision(), 0);
    }

    #[test]
    fn test_window_pins_at_floor() {
        let mut p = RenderParams::new(50);
        for _ in 0..100 {
            p.narrow_window();
        }
        assert_eq!(p.window(), 5);
        // 50 → 6 in 22 steps, then one clamp to 5; the rest change nothing.
        assert_eq!(p.revision(), 23);
    }

    #[test]
    fn test_window_pins_at_capacity() {
        let mut p = RenderParams::new(50);
        assert!(!p.widen_window());
        p.narrow_window();
        assert!(p.widen_window());
        assert!(!p.widen_window());
        assert_eq!(p.window(), 50);
    }

    #[test]
    fn test_y_range_clamps_both_ways() {
        let mut p = RenderParams::default();
        for _ in 0..100 {
            p.zoom_in_vertical();
        }
        assert_eq!(p.y_range(), 20);
        for _ in 0..100 {
            p.zoom_out_vertical();
        }
        assert_eq!(p.y_range(), 500);
    }

    #[test]
    fn test_theme_cycles() {
        let mut p = RenderParams::default();
        for _ in 0..PALETTE.len() {
            p.next_theme();
        }
        assert_eq!(p.theme(), 0);
        p.next_theme();
        assert_eq!(p.background(), Rgb565::WHITE);
    }

    #[test]
    fn test_tiny_capacity_still_has_a_floor() {
        let p = RenderParams::new(2);
        assert_eq!(p.window(), 5);
    }
}
