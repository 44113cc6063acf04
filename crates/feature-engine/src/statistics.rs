//! Statistical Features Computation

/// Summary statistics for a batch of samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticalFeatures {
    /// Number of samples
    pub count: usize,
    /// Mean value
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
}

impl StatisticalFeatures {
    /// Compute statistical features from a slice of values
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;

        let min = values.iter().cloned().fold(f64::MAX, f64::min);
        let max = values.iter().cloned().fold(f64::MIN, f64::max);

        // Constant input: skip the summation so rounding cannot leak into std_dev
        if min == max {
            return Self {
                count: values.len(),
                mean: min,
                std_dev: 0.0,
                min,
                max,
            };
        }

        let mean = values.iter().sum::<f64>() / n;

        // Population variance (divide by n, not n - 1)
        let m2: f64 = values.iter().map(|&v| (v - mean) * (v - mean)).sum();
        let std_dev = (m2 / n).sqrt();

        Self {
            count: values.len(),
            mean,
            std_dev,
            min,
            max,
        }
    }
}

/// Running min/max over every sample pushed so far
#[derive(Debug, Clone, Default)]
pub struct RunningRange {
    min: Option<f64>,
    max: Option<f64>,
}

impl RunningRange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    /// Halfway point between the smallest and largest sample
    pub fn midpoint(&self) -> Option<f64> {
        match (self.min, self.max) {
            (Some(min), Some(max)) => Some(min + (max - min) * 0.5),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_computation() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let stats = StatisticalFeatures::compute(&values);
        assert!((stats.mean - 3.0).abs() < 0.001);
        assert_eq!(stats.count, 5);
    }

    #[test]
    fn test_population_std_dev() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = StatisticalFeatures::compute(&values);
        // Population std dev is exactly 2.0 for this dataset
        assert!((stats.std_dev - 2.0).abs() < 1e-12);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
    }

    #[test]
    fn test_constant_values_have_zero_spread() {
        let stats = StatisticalFeatures::compute(&[0.3; 50]);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.mean, 0.3);
    }

    #[test]
    fn test_empty_values() {
        let values: Vec<f64> = vec![];
        let stats = StatisticalFeatures::compute(&values);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.count, 0);
    }

    #[test]
    fn test_running_range_midpoint() {
        let mut range = RunningRange::new();
        assert_eq!(range.midpoint(), None);

        range.push(0.30);
        assert_eq!(range.midpoint(), Some(0.30));

        range.push(0.10);
        range.push(0.20);
        assert!((range.midpoint().unwrap() - 0.20).abs() < 1e-12);
        assert_eq!(range.min(), Some(0.10));
        assert_eq!(range.max(), Some(0.30));
    }
}
