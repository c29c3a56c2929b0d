//! Tick Source: advances the logical clock every `TICK_PERIOD`.
//! Takes no lock.

use crate::config::TICK_PERIOD;
use crate::kernel;
use crate::time::{Duration, LogicalClock, Periodic};

pub struct TickTask<'a> {
    clock: &'a LogicalClock,
    period: Duration,
}

impl<'a> TickTask<'a> {
    pub const fn new(clock: &'a LogicalClock) -> Self {
        Self::with_period(clock, TICK_PERIOD)
    }

    pub const fn with_period(clock: &'a LogicalClock, period: Duration) -> Self {
        Self { clock, period }
    }

    pub fn step(&mut self) {
        self.clock.advance(self.period);
    }

    pub fn run(task: &'static mut TickTask<'static>) -> ! {
        let mut periodic = Periodic::new(kernel::now(), task.period);
        loop {
            task.step();
            periodic.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_step_advances_one_period() {
        let clock = LogicalClock::new();
        let mut task = TickTask::new(&clock);
        for _ in 0..50 {
            task.step();
        }
        assert_eq!(clock.now(), 1000);
    }
}
