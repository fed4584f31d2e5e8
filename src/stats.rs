use itertools::Itertools;

/// Summary over the present values of a numeric column.
#[derive(Debug, Clone, Default)]
pub struct NumericSummary {
    sorted: Vec<f64>,
    sum: f64,
}

impl NumericSummary {
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut summary = Self::default();
        for value in values {
            summary.sum += value;
            summary.sorted.push(value);
        }
        summary.sorted.sort_by(f64::total_cmp);
        summary
    }

    pub fn count(&self) -> usize {
        self.sorted.len()
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn mean(&self) -> Option<f64> {
        if self.sorted.is_empty() {
            None
        } else {
            Some(self.sum / self.sorted.len() as f64)
        }
    }

    pub fn median(&self) -> Option<f64> {
        if self.sorted.is_empty() {
            return None;
        }
        let mid = self.sorted.len() / 2;
        if self.sorted.len().is_multiple_of(2) {
            Some((self.sorted[mid - 1] + self.sorted[mid]) / 2.0)
        } else {
            Some(self.sorted[mid])
        }
    }

    /// Quantile with linear interpolation between closest ranks, `q` in
    /// `[0, 1]`.
    pub fn quantile(&self, q: f64) -> Option<f64> {
        if self.sorted.is_empty() {
            return None;
        }
        let q = q.clamp(0.0, 1.0);
        let position = q * (self.sorted.len() - 1) as f64;
        let lower = position.floor() as usize;
        let upper = position.ceil() as usize;
        let weight = position - lower as f64;
        Some(self.sorted[lower] + (self.sorted[upper] - self.sorted[lower]) * weight)
    }

    /// Sample standard deviation (n - 1 denominator).
    pub fn std_dev(&self) -> Option<f64> {
        let count = self.sorted.len();
        if count < 2 {
            return None;
        }
        if self.sorted[0] == self.sorted[count - 1] {
            return Some(0.0);
        }
        let mean = self.mean()?;
        let squared_deviations = self
            .sorted
            .iter()
            .map(|value| (value - mean).powi(2))
            .sum::<f64>();
        Some((squared_deviations / (count as f64 - 1.0)).sqrt())
    }
}

/// Most frequent value; ties go to the lexicographically smallest one.
pub fn mode<'a, I>(values: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    values
        .into_iter()
        .counts()
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(value, _)| value.to_string())
}
