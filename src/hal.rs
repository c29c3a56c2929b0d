//! # Hardware Collaborators
//!
//! Narrow interfaces to everything outside the dashboard core: the
//! accelerometer, the display panel, the console and the five-way button.
//! Tasks only ever see these traits, so the same task code runs against
//! real drivers on the board and against [`crate::sim`] fakes in tests.

use embedded_graphics::pixelcolor::Rgb565;
use embedded_hal::digital::InputPin;

use crate::samples::Sample;

// ---------------------------------------------------------------------------
// Sensor
// ---------------------------------------------------------------------------

/// A three-axis sensor read by the Sampler Task.
pub trait Sensor {
    type Error;

    /// One-time bring-up, done during bootstrap before the Sampler Task
    /// exists.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Best-effort reading. Whatever comes back is stored as is.
    fn read(&mut self) -> Sample;
}

// ---------------------------------------------------------------------------
// Display panel
// ---------------------------------------------------------------------------

/// Panel rotation, numbered like the controller's MADCTL presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Orientation {
    Portrait = 0,
    Landscape = 1,
    PortraitInverted = 2,
    LandscapeInverted = 3,
}

impl Orientation {
    pub const fn rotation(self) -> u8 {
        self as u8
    }
}

/// Raw rectangular-blit protocol of the display panel.
///
/// Only ever called with the panel lock held.
pub trait PanelDriver {
    /// Power on and reset the controller.
    fn begin(&mut self);

    fn set_orientation(&mut self, orientation: Orientation);

    /// Select the inclusive rectangle `(x0, y0)..=(x1, y1)` for the next
    /// pixel stream.
    fn set_address_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16);

    /// Stream pixels into the current window, row by row.
    fn write_pixels(&mut self, pixels: &[Rgb565]);
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// Line-oriented, fire-and-forget text output.
pub trait Console {
    fn write_line(&mut self, line: &str);
}

// ---------------------------------------------------------------------------
// Buttons
// ---------------------------------------------------------------------------

/// Snapshot of the five-way button. `true` means pressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonState {
    pub center: bool,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl ButtonState {
    pub const RELEASED: ButtonState = ButtonState {
        center: false,
        up: false,
        down: false,
        left: false,
        right: false,
    };
}

/// Source of button snapshots polled by the Input Task.
pub trait Buttons {
    fn read(&mut self) -> ButtonState;
}

/// Five-way switch wired as five active-low inputs with pull-ups.
///
/// A pin that fails to read counts as released.
pub struct FiveWay<C, U, D, L, R> {
    center: C,
    up: U,
    down: D,
    left: L,
    right: R,
}

impl<C, U, D, L, R> FiveWay<C, U, D, L, R>
where
    C: InputPin,
    U: InputPin,
    D: InputPin,
    L: InputPin,
    R: InputPin,
{
    pub fn new(center: C, up: U, down: D, left: L, right: R) -> Self {
        Self {
            center,
            up,
            down,
            left,
            right,
        }
    }

    pub fn release(self) -> (C, U, D, L, R) {
        (self.center, self.up, self.down, self.left, self.right)
    }
}

fn pressed<P: InputPin>(pin: &mut P) -> bool {
    pin.is_low().unwrap_or(false)
}

impl<C, U, D, L, R> Buttons for FiveWay<C, U, D, L, R>
where
    C: InputPin,
    U: InputPin,
    D: InputPin,
    L: InputPin,
    R: InputPin,
{
    fn read(&mut self) -> ButtonState {
        ButtonState {
            center: pressed(&mut self.center),
            up: pressed(&mut self.up),
            down: pressed(&mut self.down),
            left: pressed(&mut self.left),
            right: pressed(&mut self.right),
        }
    }
}

// ---------------------------------------------------------------------------
// Shutdown
// ---------------------------------------------------------------------------

/// Last words before a fatal halt: flush logs, blank the backlight, and
/// so on. Runs once; the core stops right after.
pub trait ShutdownHook {
    fn shutdown(&mut self);
}

impl<F: FnMut()> ShutdownHook for F {
    fn shutdown(&mut self) {
        self()
    }
}
