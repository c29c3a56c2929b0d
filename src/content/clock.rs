//! Single and world clocks driven by the logical clock.

use core::fmt::Write;

use embedded_graphics::pixelcolor::{Rgb565, RgbColor};
use heapless::{String, Vec};

use crate::config::CLOCK_START_OF_DAY;
use crate::error::Error;
use crate::time::Elapsed;
use crate::toolkit::{LabelSpec, Toolkit, WidgetId};

pub const MAX_ZONES: usize = 4;

const SECONDS_PER_DAY: i64 = 86_400;

/// A named, fixed offset from the base time, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zone {
    pub name: &'static str,
    pub offset_s: i32,
}

pub const LOCAL_ZONE: Zone = Zone {
    name: "Local",
    offset_s: 0,
};

pub const WORLD_ZONES: [Zone; MAX_ZONES] = [
    Zone { name: "London", offset_s: 0 },
    Zone { name: "Beijing", offset_s: 8 * 3600 },
    Zone { name: "Tokyo", offset_s: 9 * 3600 },
    Zone { name: "New York", offset_s: -5 * 3600 },
];

/// Seconds into the day for a base time plus a zone offset.
pub fn time_of_day(elapsed_s: u64, start_of_day: u32, offset_s: i32) -> u32 {
    let total = (elapsed_s % SECONDS_PER_DAY as u64) as i64 + i64::from(start_of_day) + i64::from(offset_s);
    total.rem_euclid(SECONDS_PER_DAY) as u32
}

/// Zero-padded `HH:MM:SS`.
pub fn format_hms(seconds_of_day: u32) -> String<8> {
    let s = seconds_of_day % SECONDS_PER_DAY as u32;
    let mut out = String::new();
    let _ = write!(out, "{:02}:{:02}:{:02}", s / 3600, s / 60 % 60, s % 60);
    out
}

struct Slot {
    zone: Zone,
    time_label: Option<WidgetId>,
}

pub struct ClockView {
    slots: Vec<Slot, MAX_ZONES>,
    start_of_day: u32,
    elapsed: Elapsed,
}

impl ClockView {
    /// At most [`MAX_ZONES`] zones are shown.
    pub fn new(zones: &[Zone], start_of_day: u32) -> Self {
        Self {
            slots: zones
                .iter()
                .take(MAX_ZONES)
                .map(|&zone| Slot {
                    zone,
                    time_label: None,
                })
                .collect(),
            start_of_day,
            // The logical clock starts at zero on boot.
            elapsed: Elapsed::since(0),
        }
    }

    pub fn single() -> Self {
        Self::new(&[LOCAL_ZONE], CLOCK_START_OF_DAY)
    }

    pub fn world() -> Self {
        Self::new(&WORLD_ZONES, CLOCK_START_OF_DAY)
    }

    pub fn zone_count(&self) -> usize {
        self.slots.len()
    }

    pub fn build<T: Toolkit>(&mut self, toolkit: &mut T) -> Result<(), Error> {
        let rows = self.slots.len() as i16;
        let pitch = 200 / rows.max(1);
        for (i, slot) in self.slots.iter_mut().enumerate() {
            let y = 20 + i as i16 * pitch;
            toolkit.create_label(&LabelSpec {
                x: 40,
                y,
                text: slot.zone.name,
                color: Rgb565::WHITE,
            })?;
            let time = format_hms(time_of_day(0, self.start_of_day, slot.zone.offset_s));
            slot.time_label = Some(toolkit.create_label(&LabelSpec {
                x: 180,
                y,
                text: &time,
                color: Rgb565::WHITE,
            })?);
        }
        Ok(())
    }

    /// Fold in the logical clock reading `now` and update every zone.
    pub fn refresh<T: Toolkit>(&mut self, toolkit: &mut T, now: u32) {
        let elapsed_s = self.elapsed.update(now) / 1000;
        for slot in &self.slots {
            if let Some(label) = slot.time_label {
                let text = format_hms(time_of_day(elapsed_s, self.start_of_day, slot.zone.offset_s));
                toolkit.set_label_text(label, &text);
            }
        }
    }
}
