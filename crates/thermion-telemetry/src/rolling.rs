// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fixed-size rolling window for numerical samples.

/// A fixed-capacity circular buffer that overwrites its oldest entry.
#[derive(Debug, Clone)]
pub struct RingBuffer<T, const N: usize> {
    data: [T; N],
    next: usize,
    len: usize,
}

impl<T: Default + Copy, const N: usize> RingBuffer<T, N> {
    /// Creates a new, empty ring buffer.
    pub fn new() -> Self {
        Self {
            data: [T::default(); N],
            next: 0,
            len: 0,
        }
    }

    /// Pushes a new value, overwriting the oldest one if full.
    pub fn push(&mut self, value: T) {
        self.data[self.next] = value;
        self.next = (self.next + 1) % N;
        self.len = (self.len + 1).min(N);
    }

    /// Number of values currently held.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if nothing has been pushed since creation or the last clear.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Forgets every value.
    pub fn clear(&mut self) {
        self.next = 0;
        self.len = 0;
    }

    /// The most recently pushed value.
    pub fn latest(&self) -> Option<T> {
        (self.len > 0).then(|| self.data[(self.next + N - 1) % N])
    }

    /// Values in chronological order (oldest to newest).
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let start = (self.next + N - self.len) % N;
        (0..self.len).map(move |i| &self.data[(start + i) % N])
    }
}

impl<T: Default + Copy, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<f32, N> {
    /// Arithmetic mean, or `0.0` when empty.
    pub fn average(&self) -> f32 {
        if self.len == 0 {
            return 0.0;
        }
        self.iter().sum::<f32>() / self.len as f32
    }

    /// Difference between the mean of the newest half and the oldest half.
    ///
    /// Positive when values are rising.
    pub fn trend(&self) -> f32 {
        if self.len < 2 {
            return 0.0;
        }
        let half = self.len / 2;
        let oldest: f32 = self.iter().take(half).sum::<f32>() / half as f32;
        let newest: f32 = self.iter().skip(self.len - half).sum::<f32>() / half as f32;
        newest - oldest
    }

    /// Population variance. High frame-time variance means stutter.
    pub fn variance(&self) -> f32 {
        if self.len < 2 {
            return 0.0;
        }
        let mean = self.average();
        self.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / self.len as f32
    }

    /// Smallest value, if any.
    pub fn min(&self) -> Option<f32> {
        self.iter().copied().reduce(f32::min)
    }

    /// Largest value, if any.
    pub fn max(&self) -> Option<f32> {
        self.iter().copied().reduce(f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_overwrites_oldest() {
        let mut rb = RingBuffer::<f32, 3>::new();
        for v in [1.0, 2.0, 3.0, 4.0] {
            rb.push(v);
        }
        let values: Vec<f32> = rb.iter().copied().collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
        assert_eq!(rb.len(), 3);
        assert_eq!(rb.latest(), Some(4.0));
    }

    #[test]
    fn test_partial_fill_order() {
        let mut rb = RingBuffer::<f32, 4>::new();
        rb.push(10.0);
        rb.push(20.0);
        let values: Vec<f32> = rb.iter().copied().collect();
        assert_eq!(values, vec![10.0, 20.0]);
        assert_eq!(rb.average(), 15.0);
    }

    #[test]
    fn test_trend() {
        let mut rb = RingBuffer::<f32, 4>::new();
        for v in [1.0, 1.1, 2.0, 2.1] {
            rb.push(v);
        }
        assert!((rb.trend() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_variance() {
        let mut steady = RingBuffer::<f32, 4>::new();
        for _ in 0..4 {
            steady.push(10.0);
        }
        assert_eq!(steady.variance(), 0.0);

        let mut stutter = RingBuffer::<f32, 4>::new();
        for v in [5.0, 15.0, 5.0, 15.0] {
            stutter.push(v);
        }
        assert!((stutter.variance() - 25.0).abs() < 0.001);
    }

    #[test]
    fn test_min_max() {
        let mut rb = RingBuffer::<f32, 4>::new();
        for v in [3.0, 1.0, 4.0, 1.5] {
            rb.push(v);
        }
        assert_eq!(rb.min(), Some(1.0));
        assert_eq!(rb.max(), Some(4.0));
    }

    #[test]
    fn test_empty_and_clear() {
        let mut rb = RingBuffer::<f32, 4>::new();
        assert!(rb.is_empty());
        assert_eq!(rb.average(), 0.0);
        assert_eq!(rb.trend(), 0.0);
        assert_eq!(rb.min(), None);
        assert_eq!(rb.latest(), None);

        rb.push(2.0);
        rb.clear();
        assert!(rb.is_empty());
        assert_eq!(rb.iter().count(), 0);
    }
}
