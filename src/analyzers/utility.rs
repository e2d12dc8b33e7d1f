/// Computes the arithmetic mean of a slice of values. Returns `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Computes the median. Even-length input averages the two middle values.
/// Returns `None` for empty input.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// A column of a group in which missing values are skipped by every statistic.
#[derive(Debug, Clone, Default)]
pub struct NullSkipping {
    values: Vec<f64>,
    missing: usize,
}

impl NullSkipping {
    pub fn push(&mut self, value: Option<f64>) {
        match value {
            Some(v) => self.values.push(v),
            None => self.missing += 1,
        }
    }

    pub fn mean(&self) -> Option<f64> {
        mean(&self.values)
    }

    pub fn median(&self) -> Option<f64> {
        median(&self.values)
    }

    /// Sum of present values; `0.0` when every value is missing.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn missing(&self) -> usize {
        self.missing
    }
}
