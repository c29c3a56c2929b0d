//! Sampler Task: reads the sensor every `SAMPLE_PERIOD` and pushes the
//! reading into the Sample Store under the Samples lock.

use crate::config::SAMPLE_PERIOD;
use crate::hal::Sensor;
use crate::kernel;
use crate::samples::{Sample, SampleStore};
use crate::sync::{HeldLocks, Mutex};
use crate::time::Periodic;

pub struct SamplerTask<'a, S, const N: usize> {
    store: &'a Mutex<SampleStore<N>>,
    sensor: S,
    held: HeldLocks,
}

impl<'a, S: Sensor, const N: usize> SamplerTask<'a, S, N> {
    pub fn new(store: &'a Mutex<SampleStore<N>>, sensor: S) -> Self {
        Self {
            store,
            sensor,
            held: HeldLocks::new(),
        }
    }

    /// The sensor, for one-time bring-up before the task is spawned.
    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    /// Take one reading and store it. The sensor is read outside the lock.
    pub fn step(&mut self) -> Sample {
        let sample = self.sensor.read();
        self.store.lock(&self.held).push(sample);
        sample
    }

    pub fn run(task: &'static mut SamplerTask<'static, S, N>) -> ! {
        let mut periodic = Periodic::new(kernel::now(), SAMPLE_PERIOD);
        loop {
            task.step();
            periodic.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SyntheticSensor;
    use crate::sync::LockRank;

    #[test]
    fn test_steps_land_in_store() {
        let store = Mutex::new(LockRank::Samples, SampleStore::<4>::new());
        let mut task = SamplerTask::new(&store, SyntheticSensor::new());
        let taken: std::vec::Vec<Sample> = (0..6).map(|_| task.step()).collect();

        let held = HeldLocks::new();
        let store = store.lock(&held);
        let window: std::vec::Vec<Sample> = store.read_window(4).collect();
        assert_eq!(window, taken[2..]);
        assert_eq!(store.next_index(), 2);
    }

    #[test]
    fn test_lock_is_released_between_steps() {
        let store = Mutex::new(LockRank::Samples, SampleStore::<4>::new());
        let mut task = SamplerTask::new(&store, SyntheticSensor::new());
        task.step();
        assert!(task.held.is_empty());
        // Another task can take the lock right away.
        let held = HeldLocks::new();
        drop(store.lock(&held));
    }
}
