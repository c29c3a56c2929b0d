//! # Sample Store
//!
//! Fixed-capacity ring of three-axis readings. The Sampler Task is the
//! only writer; the Render Task reads the most recent window. Both go
//! through the Samples lock in [`crate::system::Shared`].
//!
//! ```text
//!   slots:  [ s5 | s6 | s2 | s3 | s4 ]      N = 5
//!                      ▲
//!                 next_index = 2
//!
//!   read_window(3) → s4, s5, s6   (oldest first)
//! ```
//!
//! The ring never resets and never reports "full": a push always
//! overwrites the oldest slot. Slots never written still hold
//! [`Sample::ZERO`].

use core::iter::FusedIterator;

/// One reading, one value per axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Sample {
    pub const ZERO: Sample = Sample::splat(0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Same value on every axis.
    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v, z: v }
    }

    /// Axis values in series order: x, y, z.
    pub const fn channels(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Ring of the last `N` samples.
#[derive(Debug, Clone)]
pub struct SampleStore<const N: usize> {
    slots: [Sample; N],
    next_index: usize,
}

impl<const N: usize> SampleStore<N> {
    pub const fn new() -> Self {
        const { assert!(N > 0, "a sample store needs at least one slot") };
        Self {
            slots: [Sample::ZERO; N],
            next_index: 0,
        }
    }

    /// Overwrite the oldest slot and advance the cursor.
    pub fn push(&mut self, sample: Sample) {
        self.slots[self.next_index] = sample;
        self.next_index = (self.next_index + 1) % N;
    }

    /// The most recent `min(width, N)` samples, oldest first.
    pub fn read_window(&self, width: usize) -> Window<'_, N> {
        let width = width.min(N);
        Window {
            slots: &self.slots,
            index: (self.next_index + N - width) % N,
            remaining: width,
        }
    }

    /// The sample written last (zero before the first push).
    pub fn latest(&self) -> Sample {
        self.slots[(self.next_index + N - 1) % N]
    }

    /// Slot the next push will overwrite.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for SampleStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`SampleStore::read_window`].
#[derive(Debug, Clone)]
pub struct Window<'a, const N: usize> {
    slots: &'a [Sample; N],
    index: usize,
    remaining: usize,
}

impl<const N: usize> Iterator for Window<'_, N> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        if self.remaining == 0 {
            return None;
        }
        let sample = self.slots[self.index];
        self.index = (self.index + 1) % N;
        self.remaining -= 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<const N: usize> ExactSizeIterator for Window<'_, N> {}
impl<const N: usize> FusedIterator for Window<'_, N> {}
