//! Descriptive statistics over a numeric sample.
//!
//! Pure functions, no I/O. The analyzer builds one [`Sample`] per metric
//! and reuses it for every location, so sorting happens once per metric.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Distribution summary stored next to every percentile score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricStats {
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    pub standard_deviation: f64,
}

/// A sample held in ascending order.
#[derive(Debug, Clone)]
pub struct Sample {
    sorted: Vec<f64>,
}

impl Sample {
    pub fn new(mut values: Vec<f64>) -> Self {
        values.sort_by(f64::total_cmp);
        Self { sorted: values }
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Position of `value` in the sample as a percentage, 0.0 for an empty sample.
    ///
    /// The position is the first index whose element is `>= value`, so the
    /// smallest element scores 0 and the largest scores `100 * (n-1)/n`,
    /// never 100.
    pub fn percentile_rank(&self, value: f64) -> f64 {
        let position = self
            .sorted
            .partition_point(|x| x.total_cmp(&value) == Ordering::Less);
        pct(position, self.sorted.len())
    }

    /// Mean, median, mode and population standard deviation.
    ///
    /// Returns `None` for an empty sample.
    pub fn describe(&self) -> Option<MetricStats> {
        if self.sorted.is_empty() {
            return None;
        }
        let mean = mean(&self.sorted);
        Some(MetricStats {
            mean,
            median: self.median(),
            mode: self.mode(),
            standard_deviation: stddev(&self.sorted, mean),
        })
    }

    fn median(&self) -> f64 {
        let n = self.sorted.len();
        let mid = n / 2;
        if n % 2 == 0 {
            (self.sorted[mid - 1] + self.sorted[mid]) / 2.0
        } else {
            self.sorted[mid]
        }
    }

    // Ties between equally frequent values go to the smallest one.
    fn mode(&self) -> f64 {
        let mut best = self.sorted[0];
        let mut best_run = 0;
        let mut run_start = 0;

        for i in 1..=self.sorted.len() {
            let run_ended = i == self.sorted.len() || self.sorted[i] != self.sorted[run_start];
            if run_ended {
                let run = i - run_start;
                if run > best_run {
                    best = self.sorted[run_start];
                    best_run = run;
                }
                run_start = i;
            }
        }

        best
    }
}

/// Percentile rank of `value` within an unsorted sample.
pub fn percentile_rank(sample: &[f64], value: f64) -> f64 {
    Sample::new(sample.to_vec()).percentile_rank(value)
}

/// Summary statistics of an unsorted sample, `None` when it is empty.
pub fn describe(sample: &[f64]) -> Option<MetricStats> {
    Sample::new(sample.to_vec()).describe()
}

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the population standard deviation given a pre-computed mean.
/// Returns 0.0 for empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}
