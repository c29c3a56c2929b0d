//! Diagnostics Task: writes a stack headroom report to the console every
//! `DIAGNOSTICS_PERIOD`.
//!
//! ```text
//!
//! ******************************
//! [Stacks Free Bytes Remaining]
//! Render Task: 3012
//! Sampler Task: 1720
//! Input Task: 1804
//! Diagnostics Task: 812
//! ******************************
//! ```
//!
//! Read-only: takes no lock.

use core::fmt::Write;

use heapless::{String, Vec};

use crate::config::{DIAGNOSTICS_NAME, DIAGNOSTICS_PERIOD, MAX_TASKS};
use crate::error::Error;
use crate::hal::Console;
use crate::kernel::{self, StackProbe};
use crate::task::TaskId;
use crate::time::Periodic;

const RULE: &str = "******************************";
const HEADER: &str = "[Stacks Free Bytes Remaining]";

/// Longest report line: a task name plus the byte count.
const LINE_CAPACITY: usize = 48;

pub struct DiagnosticsTask<C, S> {
    console: C,
    probe: S,
    watched: Vec<(&'static str, TaskId), MAX_TASKS>,
}

impl<C: Console, S: StackProbe> DiagnosticsTask<C, S> {
    pub const fn new(console: C, probe: S) -> Self {
        Self {
            console,
            probe,
            watched: Vec::new(),
        }
    }

    /// Add a task to the report, after those already watched.
    pub fn watch(&mut self, name: &'static str, task: TaskId) -> Result<(), Error> {
        self.watched
            .push((name, task))
            .map_err(|_| Error::TaskTableFull)
    }

    pub fn watched(&self) -> &[(&'static str, TaskId)] {
        &self.watched
    }

    /// Write one full report.
    pub fn report(&mut self) {
        self.console.write_line("");
        self.console.write_line(RULE);
        self.console.write_line(HEADER);
        for &(name, task) in self.watched.iter() {
            write_entry(&mut self.console, name, self.probe.stack_headroom(task));
        }
        let own = self
            .probe
            .current_task()
            .and_then(|task| self.probe.stack_headroom(task));
        write_entry(&mut self.console, DIAGNOSTICS_NAME, own);
        self.console.write_line(RULE);
    }

    pub fn run(task: &'static mut DiagnosticsTask<C, S>) -> ! {
        let mut periodic = Periodic::new(kernel::now(), DIAGNOSTICS_PERIOD);
        loop {
            task.report();
            periodic.wait();
        }
    }
}

fn write_entry<C: Console>(console: &mut C, name: &str, headroom: Option<usize>) {
    let mut line: String<LINE_CAPACITY> = String::new();
    // A name too long for the line is cut short by the failed write.
    let _ = match headroom {
        Some(bytes) => write!(line, "{}: {}", name, bytes),
        None => write!(line, "{}: ?", name),
    };
    console.write_line(&line);
}
