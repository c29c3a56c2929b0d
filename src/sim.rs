//! # Simulated Collaborators
//!
//! Stand-ins for the accelerometer, the display panel and the buttons.
//! The demo firmware runs on them when no board drivers are wired in, and
//! the tests use them as fakes.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::Rgb565;

use crate::hal::{ButtonState, Buttons, Orientation, PanelDriver, Sensor};
use crate::samples::Sample;

/// Gravity on z plus slow triangle waves on x and y, in g.
#[derive(Debug, Clone, Default)]
pub struct SyntheticSensor {
    step: u32,
    ready: bool,
}

impl SyntheticSensor {
    /// Readings per wave period.
    const PERIOD: u32 = 40;

    pub const fn new() -> Self {
        Self {
            step: 0,
            ready: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    fn triangle(step: u32) -> f32 {
        let half = Self::PERIOD / 2;
        let phase = step % Self::PERIOD;
        let ramp = if phase < half { phase } else { Self::PERIOD - phase };
        ramp as f32 / half as f32 * 2.0 - 1.0
    }
}

impl Sensor for SyntheticSensor {
    type Error = Infallible;

    fn init(&mut self) -> Result<(), Infallible> {
        self.ready = true;
        Ok(())
    }

    fn read(&mut self) -> Sample {
        let step = self.step;
        self.step = self.step.wrapping_add(1);
        Sample::new(
            Self::triangle(step) * 0.5,
            Self::triangle(step + Self::PERIOD / 4) * 0.5,
            1.0,
        )
    }
}

/// Panel that only counts what it is asked to do.
#[derive(Debug, Clone, Default)]
pub struct CountingPanel {
    pub begun: bool,
    pub orientation: Option<Orientation>,
    pub last_window: Option<(u16, u16, u16, u16)>,
    pub windows: u32,
    pub pixels: u64,
}

impl CountingPanel {
    pub const fn new() -> Self {
        Self {
            begun: false,
            orientation: None,
            last_window: None,
            windows: 0,
            pixels: 0,
        }
    }
}

impl PanelDriver for CountingPanel {
    fn begin(&mut self) {
        self.begun = true;
    }

    fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = Some(orientation);
    }

    fn set_address_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) {
        self.last_window = Some((x0, y0, x1, y1));
        self.windows += 1;
    }

    fn write_pixels(&mut self, pixels: &[Rgb565]) {
        self.pixels += pixels.len() as u64;
    }
}

/// Five-way button nobody touches.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoButtons;

impl Buttons for NoButtons {
    fn read(&mut self) -> ButtonState {
        ButtonState::RELEASED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_sensor_shape() {
        let mut sensor = SyntheticSensor::new();
        assert!(!sensor.is_ready());
        sensor.init().unwrap();
        assert!(sensor.is_ready());

        let first = sensor.read();
        assert_eq!(first.x, -0.5);
        assert_eq!(first.z, 1.0);
        for _ in 0..200 {
            let s = sensor.read();
            assert!((-0.5..=0.5).contains(&s.x));
            assert!((-0.5..=0.5).contains(&s.y));
        }
    }

    #[test]
    fn test_counting_panel() {
        let mut panel = CountingPanel::new();
        panel.begin();
        panel.set_address_window(0, 0, 9, 9);
        panel.write_pixels(&[Rgb565::new(0, 0, 0); 100]);
        assert!(panel.begun);
        assert_eq!(panel.last_window, Some((0, 0, 9, 9)));
        assert_eq!(panel.pixels, 100);
    }
}
