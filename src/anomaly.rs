//! Z-score anomaly detection over raw ranges.
//!
//! Computes the sample mean and Bessel-corrected standard deviation of a
//! label-filtered raw range and flags every point whose |z| exceeds the
//! caller's threshold. Fewer than two matching points is a valid, empty
//! result: there is no distribution to score against.

use std::sync::Arc;

use serde::Serialize;

use crate::error::PipelineResult;
use crate::labels::Labels;
use crate::store::MetricStore;

/// Default z-score threshold.
pub const DEFAULT_THRESHOLD: f64 = 3.0;

/// Allowed threshold range; callers are clamped into it.
pub const THRESHOLD_RANGE: (f64, f64) = (1.0, 5.0);

/// One scored point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredPoint {
    pub timestamp: i64,
    pub value: f64,
    /// Rounded to 2 decimal places for presentation.
    pub z_score: f64,
    pub is_anomaly: bool,
}

/// Result of one detection run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyReport {
    pub metric_name: String,
    pub total_points: usize,
    pub anomalies_found: usize,
    /// Rounded to 2 decimal places for presentation.
    pub mean: f64,
    /// Sample standard deviation (n - 1), rounded to 2 decimal places.
    pub std_dev: f64,
    pub threshold: f64,
    pub points: Vec<ScoredPoint>,
}

impl AnomalyReport {
    fn empty(metric_name: &str, total_points: usize, threshold: f64) -> Self {
        Self {
            metric_name: metric_name.to_string(),
            total_points,
            anomalies_found: 0,
            mean: 0.0,
            std_dev: 0.0,
            threshold,
            points: Vec::new(),
        }
    }
}

/// Detector reading raw samples from a store.
#[derive(Clone)]
pub struct AnomalyDetector {
    store: Arc<dyn MetricStore>,
}

impl AnomalyDetector {
    /// Create a detector over the given store.
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self { store }
    }

    /// Score a raw range and flag outliers.
    ///
    /// # Parameters
    ///
    /// - `metric_name` - Metric to analyze
    /// - `start` - Range start, unix seconds (inclusive)
    /// - `end` - Range end, unix seconds (inclusive)
    /// - `threshold` - |z| above which a point is an anomaly; clamped to
    ///   [1.0, 5.0]
    /// - `labels` - Exact-match label filter
    ///
    /// # Returns
    ///
    /// Returns the scored report; zero statistics and no points when fewer
    /// than two samples match.
    pub fn detect(
        &self,
        metric_name: &str,
        start: i64,
        end: i64,
        threshold: f64,
        labels: &Labels,
    ) -> PipelineResult<AnomalyReport> {
        let threshold = threshold.clamp(THRESHOLD_RANGE.0, THRESHOLD_RANGE.1);
        let rows = self.store.scan_raw(metric_name, start, end, labels)?;

        if rows.len() < 2 {
            return Ok(AnomalyReport::empty(metric_name, rows.len(), threshold));
        }

        let n = rows.len() as f64;
        let mean = rows.iter().map(|r| r.value).sum::<f64>() / n;
        let variance = rows.iter().map(|r| (r.value - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let std_dev = variance.sqrt();

        let mut anomalies_found = 0;
        let points = rows
            .iter()
            .map(|row| {
                // Comparison at full precision; rounding is presentation only.
                let z = if std_dev > 0.0 { (row.value - mean) / std_dev } else { 0.0 };
                let is_anomaly = z.abs() > threshold;
                if is_anomaly {
                    anomalies_found += 1;
                }
                ScoredPoint {
                    timestamp: row.timestamp,
                    value: row.value,
                    z_score: round2(z),
                    is_anomaly,
                }
            })
            .collect();

        Ok(AnomalyReport {
            metric_name: metric_name.to_string(),
            total_points: rows.len(),
            anomalies_found,
            mean: round2(mean),
            std_dev: round2(std_dev),
            threshold,
            points,
        })
    }
}

/// Round to 2 decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, RawSample};

    fn store_with(values: &[f64]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (i, value) in values.iter().enumerate() {
            store
                .insert_raw(RawSample::new("cpu_usage", *value, i as i64 * 60, Labels::empty()))
                .expect("insert");
        }
        store
    }

    /// Test that a constant series has zero stdev and no anomalies.
    #[test]
    fn test_constant_series_no_anomalies() {
        let detector = AnomalyDetector::new(store_with(&[10.0, 10.0, 10.0, 10.0]));
        let report =
            detector.detect("cpu_usage", 0, 3600, 1.0, &Labels::empty()).expect("detect");

        assert_eq!(report.total_points, 4);
        assert_eq!(report.std_dev, 0.0);
        assert_eq!(report.anomalies_found, 0);
        assert!(report.points.iter().all(|p| p.z_score == 0.0 && !p.is_anomaly));
    }

    /// Test that a single outlier is flagged at threshold 1.5.
    #[test]
    fn test_single_outlier_flagged() {
        let detector = AnomalyDetector::new(store_with(&[1.0, 1.0, 1.0, 100.0]));
        let report =
            detector.detect("cpu_usage", 0, 3600, 1.5, &Labels::empty()).expect("detect");

        assert_eq!(report.anomalies_found, 1);
        let anomaly = report.points.iter().find(|p| p.is_anomaly).expect("one anomaly");
        assert_eq!(anomaly.value, 100.0);
    }

    /// Test the empty shape for fewer than two matching points.
    #[test]
    fn test_too_few_points_is_empty_shape() {
        let detector = AnomalyDetector::new(store_with(&[42.0]));
        let report =
            detector.detect("cpu_usage", 0, 3600, 3.0, &Labels::empty()).expect("detect");

        assert_eq!(report.total_points, 1);
        assert_eq!(report.anomalies_found, 0);
        assert_eq!(report.mean, 0.0);
        assert_eq!(report.std_dev, 0.0);
        assert!(report.points.is_empty());
    }

    /// Test Bessel-corrected stdev and rounded presentation values.
    #[test]
    fn test_sample_stdev_and_rounding() {
        let detector = AnomalyDetector::new(store_with(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]));
        let report =
            detector.detect("cpu_usage", 0, 3600, 3.0, &Labels::empty()).expect("detect");

        assert_eq!(report.mean, 5.0);
        // Sample variance of this classic set is 32/7.
        assert_eq!(report.std_dev, round2((32.0_f64 / 7.0).sqrt()));
    }

    /// Test that out-of-range thresholds are clamped.
    #[test]
    fn test_threshold_clamped() {
        let detector = AnomalyDetector::new(store_with(&[1.0, 2.0]));
        let report =
            detector.detect("cpu_usage", 0, 3600, 0.1, &Labels::empty()).expect("detect");
        assert_eq!(report.threshold, 1.0);

        let report =
            detector.detect("cpu_usage", 0, 3600, 99.0, &Labels::empty()).expect("detect");
        assert_eq!(report.threshold, 5.0);
    }
}
