//! Streaming moments.
//!
//! Welford's online update for a single stream and Chan et al.'s pairwise
//! combination for merging partial accumulators:
//!
//! ```text
//! δ     = mean_b - mean_a
//! mean  = mean_a + δ · n_b / n
//! M2    = M2_a + M2_b + δ² · n_a · n_b / n
//! ```

/// Running count, mean, variance, extremes and negative count of a stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
    negatives: u64,
}

impl Default for RunningStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            negatives: 0,
        }
    }
}

impl RunningStats {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one observation.
    #[inline]
    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
        self.min = self.min.min(x);
        self.max = self.max.max(x);
        if x < 0.0 {
            self.negatives += 1;
        }
    }

    /// Folds another accumulator into this one.
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        let n_a = self.count as f64;
        let n_b = other.count as f64;
        let n = n_a + n_b;
        let delta = other.mean - self.mean;

        self.mean += delta * n_b / n;
        self.m2 += other.m2 + delta * delta * n_a * n_b / n;
        self.count += other.count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.negatives += other.negatives;
    }

    /// Number of observations.
    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sample mean.
    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance with `n - 1` denominator; zero below two observations.
    #[inline]
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Sample standard deviation.
    #[inline]
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Smallest observation.
    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Largest observation.
    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Fraction of observations strictly below zero.
    #[inline]
    pub fn negative_fraction(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.negatives as f64 / self.count as f64
        }
    }
}
