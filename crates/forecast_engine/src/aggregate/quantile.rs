//! Percentile estimation.
//!
//! Two interchangeable stores, both associatively mergeable:
//!
//! - **Exact**: every sample is retained; after sorting, the `p`-quantile is
//!   the linear interpolation at rank `p · (n − 1)`.
//! - **Sketch**: weighted centroids, at most `2 · capacity` of them. When the
//!   buffer overflows, the sorted centroids are compacted into contiguous,
//!   weight-balanced groups. A sketch that never overflowed answers exactly.
//!
//! Centroid `i` with weight `w_i` sits at rank `c_i + (w_i − 1) / 2`, where
//! `c_i` is the total weight before it; quantiles interpolate linearly between
//! adjacent centroid ranks. With unit weights this reduces to the exact rule.

use crate::config::PercentileMode;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Centroid {
    mean: f64,
    weight: f64,
}

/// Bounded-memory quantile summary.
#[derive(Clone, Debug, PartialEq)]
pub struct QuantileSketch {
    capacity: usize,
    centroids: Vec<Centroid>,
    sorted: bool,
}

impl QuantileSketch {
    /// Empty sketch keeping at most `2 · capacity` centroids.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            centroids: Vec::with_capacity(2 * capacity + 1),
            sorted: true,
        }
    }

    /// Number of retained centroids.
    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    /// True when no sample was added.
    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    /// Total weight (number of samples summarised).
    pub fn total_weight(&self) -> f64 {
        self.centroids.iter().map(|c| c.weight).sum()
    }

    /// Adds one sample.
    #[inline]
    pub fn push(&mut self, x: f64) {
        self.centroids.push(Centroid {
            mean: x,
            weight: 1.0,
        });
        self.sorted = false;
        if self.centroids.len() > 2 * self.capacity {
            self.compact();
        }
    }

    /// Folds another sketch into this one.
    pub fn merge(&mut self, other: &QuantileSketch) {
        self.centroids.extend_from_slice(&other.centroids);
        self.sorted = false;
        if self.centroids.len() > 2 * self.capacity {
            self.compact();
        }
    }

    fn sort(&mut self) {
        if !self.sorted {
            self.centroids.sort_by(|a, b| a.mean.total_cmp(&b.mean));
            self.sorted = true;
        }
    }

    /// Merges contiguous sorted centroids into groups of roughly
    /// `total / capacity` weight.
    ///
    /// A group closes as soon as adding the next centroid would exceed the
    /// target, so every two consecutive groups outweigh it and at most
    /// `2 · capacity` groups remain.
    fn compact(&mut self) {
        self.sort();
        let target = self.total_weight() / self.capacity as f64;

        let mut compacted: Vec<Centroid> = Vec::with_capacity(2 * self.capacity + 1);
        let mut current = self.centroids[0];
        for next in &self.centroids[1..] {
            if current.weight + next.weight <= target {
                let weight = current.weight + next.weight;
                current.mean += (next.mean - current.mean) * next.weight / weight;
                current.weight = weight;
            } else {
                compacted.push(current);
                current = *next;
            }
        }
        compacted.push(current);
        self.centroids = compacted;
    }

    /// Sorts the centroids; call once before querying.
    pub fn finalize(&mut self) {
        self.sort();
    }

    /// Interpolated `p`-quantile; requires [`finalize`](Self::finalize).
    pub fn quantile(&self, p: f64) -> f64 {
        let n = self.centroids.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return self.centroids[0].mean;
        }

        let rank = p.clamp(0.0, 1.0) * (self.total_weight() - 1.0);
        let mut before = 0.0;
        let mut previous: Option<(f64, f64)> = None;
        for c in &self.centroids {
            let position = before + (c.weight - 1.0) / 2.0;
            if rank <= position {
                return match previous {
                    None => c.mean,
                    Some((prev_pos, prev_mean)) => {
                        let t = (rank - prev_pos) / (position - prev_pos);
                        prev_mean + t * (c.mean - prev_mean)
                    }
                };
            }
            previous = Some((position, c.mean));
            before += c.weight;
        }
        self.centroids[n - 1].mean
    }
}

/// Percentile store selected by [`PercentileMode`].
#[derive(Clone, Debug, PartialEq)]
pub enum QuantileStore {
    /// All samples.
    Exact(Vec<f64>),
    /// Approximate summary.
    Sketch(QuantileSketch),
}

impl QuantileStore {
    /// Empty store for `mode`, reserving room for `expected` exact samples.
    pub fn new(mode: PercentileMode, expected: usize) -> Self {
        match mode {
            PercentileMode::Exact => QuantileStore::Exact(Vec::with_capacity(expected)),
            PercentileMode::Sketch { capacity } => {
                QuantileStore::Sketch(QuantileSketch::new(capacity))
            }
        }
    }

    /// Adds one sample.
    #[inline]
    pub fn push(&mut self, x: f64) {
        match self {
            QuantileStore::Exact(samples) => samples.push(x),
            QuantileStore::Sketch(sketch) => sketch.push(x),
        }
    }

    /// Appends another store; mixing an exact store with a sketch yields a sketch.
    pub fn merge(&mut self, other: &QuantileStore) {
        match (&mut *self, other) {
            (QuantileStore::Exact(a), QuantileStore::Exact(b)) => a.extend_from_slice(b),
            (QuantileStore::Sketch(a), QuantileStore::Sketch(b)) => a.merge(b),
            (QuantileStore::Sketch(a), QuantileStore::Exact(b)) => {
                b.iter().for_each(|&x| a.push(x));
            }
            (QuantileStore::Exact(a), QuantileStore::Sketch(b)) => {
                let mut sketch = b.clone();
                a.iter().for_each(|&x| sketch.push(x));
                *self = QuantileStore::Sketch(sketch);
            }
        }
    }

    /// Sorts the retained data; call once before querying.
    pub fn finalize(&mut self) {
        match self {
            QuantileStore::Exact(samples) => samples.sort_by(f64::total_cmp),
            QuantileStore::Sketch(sketch) => sketch.finalize(),
        }
    }

    /// Interpolated `p`-quantile; requires [`finalize`](Self::finalize).
    pub fn quantile(&self, p: f64) -> f64 {
        match self {
            QuantileStore::Exact(samples) => interpolate_sorted(samples, p),
            QuantileStore::Sketch(sketch) => sketch.quantile(p),
        }
    }
}

/// Linear interpolation at rank `p · (n − 1)` of a sorted slice.
pub fn interpolate_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let frac = rank - lo as f64;
            sorted[lo] + frac * (sorted[hi] - sorted[lo])
        }
    }
}
