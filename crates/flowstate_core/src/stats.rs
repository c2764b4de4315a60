use crate::error::{ForecastError, Result};
use serde_json::Value;

/// Number of trailing observations used for the short-term trend.
pub const TREND_WINDOW: usize = 5;

/// Ordered, non-empty sequence of primary-signal observations (most recent last).
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySeries {
    values: Vec<f64>,
}

impl HistorySeries {
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(ForecastError::invalid("History must contain at least one value"));
        }
        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::invalid(format!(
                "History value at index {} is not a finite number",
                idx
            )));
        }
        Ok(Self { values })
    }

    /// Coerces raw JSON elements into a history series.
    ///
    /// Numbers and numeric strings are accepted, everything else is rejected.
    pub fn from_json(raw: &[Value]) -> Result<Self> {
        Self::new(coerce_series(raw)?)
    }

    /// The built-in demonstration history.
    pub fn sample() -> Self {
        Self {
            values: crate::SAMPLE_HISTORY.to_vec(),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last(&self) -> f64 {
        // Non-empty by construction.
        self.values[self.values.len() - 1]
    }
}

impl TryFrom<Vec<f64>> for HistorySeries {
    type Error = ForecastError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::new(values)
    }
}

/// Converts a JSON scalar to `f64`, accepting numeric strings.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Coerces every element of a JSON array, reporting the first offending index.
pub fn coerce_series(raw: &[Value]) -> Result<Vec<f64>> {
    raw.iter()
        .enumerate()
        .map(|(idx, v)| coerce_number(v).ok_or_else(|| non_numeric(idx, v)))
        .collect()
}

fn non_numeric(idx: usize, value: &Value) -> ForecastError {
    ForecastError::invalid(format!(
        "Value at index {} is not numeric: {}",
        idx, value
    ))
}

/// Summary statistics of a history series used by the heuristic engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryStats {
    pub mean: f64,
    /// Population standard deviation (ddof = 0).
    pub std_dev: f64,
    /// `(last - mean(last 5)) / 5` when at least five values exist, otherwise 0.
    pub recent_trend: f64,
    pub last_value: f64,
}

impl HistoryStats {
    pub fn from_history(history: &HistorySeries) -> Self {
        let values = history.values();
        let last_value = history.last();
        let mean = mean_of(values);

        let squared: Vec<f64> = values
            .iter()
            .map(|&x| {
                let diff = x - mean;
                diff * diff
            })
            .collect();
        let variance = pairwise_sum(&squared) / values.len() as f64;

        let recent_trend = if values.len() >= TREND_WINDOW {
            let window = &values[values.len() - TREND_WINDOW..];
            (last_value - mean_of(window)) / TREND_WINDOW as f64
        } else {
            0.0
        };

        Self {
            mean,
            std_dev: variance.sqrt(),
            recent_trend,
            last_value,
        }
    }
}

/// Block size below which [`pairwise_sum`] stops splitting.
const PAIRWISE_BLOCK: usize = 128;

/// Sums `values` in a fixed blocked pairwise order.
///
/// Fewer than eight values are added left to right. Up to
/// [`PAIRWISE_BLOCK`] values go through eight interleaved accumulators that
/// are combined as a balanced tree, with the remainder added at the end.
/// Longer slices are split in two at a multiple of eight.
pub fn pairwise_sum(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 8 {
        return values.iter().fold(0.0, |acc, &v| acc + v);
    }
    if n > PAIRWISE_BLOCK {
        let mut half = n / 2;
        half -= half % 8;
        return pairwise_sum(&values[..half]) + pairwise_sum(&values[half..]);
    }

    let mut r = [0.0f64; 8];
    r.copy_from_slice(&values[..8]);
    let unrolled = n - n % 8;
    for chunk in values[8..unrolled].chunks_exact(8) {
        for (acc, &v) in r.iter_mut().zip(chunk) {
            *acc += v;
        }
    }
    let mut sum = ((r[0] + r[1]) + (r[2] + r[3])) + ((r[4] + r[5]) + (r[6] + r[7]));
    for &v in &values[unrolled..] {
        sum += v;
    }
    sum
}

fn mean_of(values: &[f64]) -> f64 {
    pairwise_sum(values) / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejects_empty_history() {
        let err = HistorySeries::new(vec![]).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_coerces_numeric_strings() {
        let raw = vec![json!(1), json!("2.5"), json!(3.0)];
        let history = HistorySeries::from_json(&raw).unwrap();
        assert_eq!(history.values(), &[1.0, 2.5, 3.0]);
    }

    #[test]
    fn test_rejects_non_numeric() {
        for bad in [json!("abc"), json!(null), json!(true), json!([1])] {
            let raw = vec![json!(1), bad];
            let err = HistorySeries::from_json(&raw).unwrap_err();
            assert!(err.to_string().contains("index 1"), "{}", err);
        }
    }

    #[test]
    fn test_single_value_stats() {
        let history = HistorySeries::new(vec![50.0]).unwrap();
        let stats = HistoryStats::from_history(&history);
        assert_eq!(stats.mean, 50.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.recent_trend, 0.0);
        assert_eq!(stats.last_value, 50.0);
    }

    #[test]
    fn test_short_history_has_no_trend() {
        let history = HistorySeries::new(vec![10.0, 20.0, 30.0, 40.0]).unwrap();
        let stats = HistoryStats::from_history(&history);
        assert_eq!(stats.recent_trend, 0.0);
        assert_eq!(stats.mean, 25.0);
        // sqrt(125)
        assert!((stats.std_dev - 11.180339887498949).abs() < 1e-12);
    }

    #[test]
    fn test_trend_uses_last_five() {
        let history = HistorySeries::new(vec![100.0, 1.0, 2.0, 3.0, 4.0, 10.0]).unwrap();
        let stats = HistoryStats::from_history(&history);
        // mean(last 5) = 4.0, (10 - 4) / 5 = 1.2
        assert!((stats.recent_trend - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_fractional_mean_uses_pairwise_order() {
        let history = HistorySeries::new(vec![
            82.9, 60.1, 73.4, 81.6, 66.9, 88.4, 87.0, 60.9, 60.8, 76.2, 88.2, 71.4,
        ])
        .unwrap();
        let stats = HistoryStats::from_history(&history);
        // A left-to-right sum gives 74.81666666666666.
        assert_eq!(stats.mean, 74.81666666666668);
    }

    #[test]
    fn test_pairwise_sum_small_and_blocked() {
        assert_eq!(pairwise_sum(&[]), 0.0);
        assert_eq!(pairwise_sum(&[0.1, 0.2, 0.3]), 0.1 + 0.2 + 0.3);

        let eleven = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0, 1.1];
        let expected = ((((0.1 + 0.2) + (0.3 + 0.4)) + ((0.5 + 0.6) + (0.7 + 0.8))) + 0.9 + 1.0)
            + 1.1;
        assert_eq!(pairwise_sum(&eleven), expected);
    }

    #[test]
    fn test_pairwise_sum_splits_long_slices() {
        let values: Vec<f64> = (0..300).map(|i| i as f64 * 0.1).collect();
        // 300 splits at 144.
        let expected = pairwise_sum(&values[..144]) + pairwise_sum(&values[144..]);
        assert_eq!(pairwise_sum(&values), expected);
        assert!((pairwise_sum(&values) - 4485.0).abs() < 1e-9);
    }
}
