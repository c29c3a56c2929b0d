//! Input Task: polls the five-way button and edits the render parameters.
//!
//! | Button | Trigger | Action |
//! |--------|---------|--------|
//! | center | press edge | next background theme |
//! | up / down | held | zoom the vertical axis in / out |
//! | left / right | held | narrow / widen the chart window |
//!
//! Up beats down and left beats right when both are held. Each action
//! group takes the Render lock on its own, briefly. After any directional
//! action the task sleeps `DEBOUNCE_DELAY` before going on.

use crate::config::{DEBOUNCE_DELAY, INPUT_POLL_PERIOD};
use crate::hal::Buttons;
use crate::kernel;
use crate::sync::{HeldLocks, Mutex};
use crate::tasks::render::RenderState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Vertical {
    ZoomIn,
    ZoomOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Horizontal {
    Narrow,
    Widen,
}

/// What one poll did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputReport {
    pub theme: bool,
    pub vertical: Option<Vertical>,
    pub horizontal: Option<Horizontal>,
}

pub struct InputTask<'a, B, T> {
    render: &'a Mutex<RenderState<T>>,
    buttons: B,
    center_was_pressed: bool,
    held: HeldLocks,
}

impl<'a, B: Buttons, T> InputTask<'a, B, T> {
    pub fn new(render: &'a Mutex<RenderState<T>>, buttons: B) -> Self {
        Self {
            render,
            buttons,
            center_was_pressed: false,
            held: HeldLocks::new(),
        }
    }

    /// Read the buttons once and apply what they ask for.
    pub fn poll(&mut self) -> InputReport {
        let state = self.buttons.read();
        let mut report = InputReport::default();

        if state.center && !self.center_was_pressed {
            self.render.lock(&self.held).params.next_theme();
            report.theme = true;
        }
        self.center_was_pressed = state.center;

        report.vertical = if state.up {
            Some(Vertical::ZoomIn)
        } else if state.down {
            Some(Vertical::ZoomOut)
        } else {
            None
        };
        if let Some(action) = report.vertical {
            let mut render = self.render.lock(&self.held);
            match action {
                Vertical::ZoomIn => render.params.zoom_in_vertical(),
                Vertical::ZoomOut => render.params.zoom_out_vertical(),
            };
        }

        report.horizontal = if state.left {
            Some(Horizontal::Narrow)
        } else if state.right {
            Some(Horizontal::Widen)
        } else {
            None
        };
        if let Some(action) = report.horizontal {
            let mut render = self.render.lock(&self.held);
            match action {
                Horizontal::Narrow => render.params.narrow_window(),
                Horizontal::Widen => render.params.widen_window(),
            };
        }

        if report != InputReport::default() {
            trace!(
                "input: theme={} vertical={} horizontal={}",
                report.theme,
                report.vertical.is_some(),
                report.horizontal.is_some()
            );
        }
        report
    }

    pub fn run(task: &'static mut InputTask<'static, B, T>) -> ! {
        loop {
            let report = task.poll();
            if report.vertical.is_some() {
                kernel::delay(DEBOUNCE_DELAY);
            }
            if report.horizontal.is_some() {
                kernel::delay(DEBOUNCE_DELAY);
            }
            kernel::delay(INPUT_POLL_PERIOD);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::ButtonState;
    use crate::params::RenderParams;
    use crate::sync::LockRank;
    use std::collections::VecDeque;
    use std::thread;

    /// Replays a fixed sequence of snapshots, then reports all released.
    struct Script(VecDeque<ButtonState>);

    impl Script {
        fn new(states: &[ButtonState]) -> Self {
            Script(states.iter().copied().collect())
        }
    }

    impl Buttons for Script {
        fn read(&mut self) -> ButtonState {
            self.0.pop_front().unwrap_or(ButtonState::RELEASED)
        }
    }

    const CENTER: ButtonState = ButtonState {
        center: true,
        ..ButtonState::RELEASED
    };
    const UP: ButtonState = ButtonState {
        up: true,
        ..ButtonState::RELEASED
    };
    const UP_DOWN_LEFT_RIGHT: ButtonState = ButtonState {
        center: false,
        up: true,
        down: true,
        left: true,
        right: true,
    };
    const RIGHT: ButtonState = ButtonState {
        right: true,
        ..ButtonState::RELEASED
    };

    fn render_lock() -> Mutex<RenderState<()>> {
        Mutex::new(LockRank::Render, RenderState::new((), RenderParams::new(50)))
    }

    fn params(lock: &Mutex<RenderState<()>>) -> RenderParams {
        let held = HeldLocks::new();
        let params = lock.lock(&held).params;
        params
    }

    #[test]
    fn test_center_acts_on_press_edge_only() {
        let lock = render_lock();
        // Held across polls (a bounce between polls is invisible), released,
        // then pressed again.
        let mut task = InputTask::new(&lock, Script::new(&[CENTER, CENTER, CENTER, ButtonState::RELEASED, CENTER]));
        let themes: std::vec::Vec<bool> = (0..5).map(|_| task.poll().theme).collect();
        assert_eq!(themes, [true, false, false, false, true]);
        assert_eq!(params(&lock).theme(), 2);
    }

    #[test]
    fn test_directions_repeat_while_held() {
        let lock = render_lock();
        let mut task = InputTask::new(&lock, Script::new(&[UP; 3]));
        for _ in 0..3 {
            assert_eq!(task.poll().vertical, Some(Vertical::ZoomIn));
        }
        assert_eq!(params(&lock).y_range(), 170);
    }

    #[test]
    fn test_up_beats_down_and_left_beats_right() {
        let lock = render_lock();
        let mut task = InputTask::new(&lock, Script::new(&[UP_DOWN_LEFT_RIGHT]));
        let report = task.poll();
        assert_eq!(report.vertical, Some(Vertical::ZoomIn));
        assert_eq!(report.horizontal, Some(Horizontal::Narrow));
        assert_eq!(params(&lock).window(), 48);
    }

    #[test]
    fn test_widen_at_capacity_is_pinned() {
        let lock = render_lock();
        let mut task = InputTask::new(&lock, Script::new(&[RIGHT; 10]));
        for _ in 0..10 {
            task.poll();
        }
        let p = params(&lock);
        assert_eq!(p.window(), 50);
        assert_eq!(p.revision(), 0);
        assert!(task.held.is_empty());
    }

    #[test]
    fn test_no_input_no_change() {
        let lock = render_lock();
        let mut task = InputTask::new(&lock, Script::new(&[]));
        assert_eq!(task.poll(), InputReport::default());
        assert_eq!(params(&lock), RenderParams::new(50));
    }

    #[test]
    fn test_updates_survive_a_contending_reader() {
        // The reader plays the Render Task: it holds the lock, checks the
        // parameters are whole, and lets go.
        let lock: &'static Mutex<RenderState<()>> = Box::leak(Box::new(render_lock()));
        let presses = 400;

        let reader = thread::spawn(move || {
            let held = HeldLocks::new();
            let mut last = 0;
            for _ in 0..2_000 {
                let render = lock.lock(&held);
                let p = render.params;
                assert!(p.revision() >= last);
                assert!((20..=500).contains(&p.y_range()));
                last = p.revision();
            }
        });

        let script: std::vec::Vec<ButtonState> = (0..presses)
            .map(|i| if i % 2 == 0 { CENTER } else { ButtonState::RELEASED })
            .collect();
        let writer = thread::spawn(move || {
            let mut task = InputTask::new(lock, Script::new(&script));
            for _ in 0..presses {
                task.poll();
            }
        });
        writer.join().unwrap();
        reader.join().unwrap();

        // Every edge landed exactly once.
        let p = params(lock);
        assert_eq!(p.revision(), presses as u32 / 2);
        assert_eq!(p.theme(), (presses / 2) % crate::params::PALETTE.len());
    }
}
