//! Outlier detection on time series with a smoothed baseline
//!
//! A baseline is obtained by smoothing the series; timestamps whose residual
//! from the baseline exceeds a multiple of the whole-series standard
//! deviation are outliers.

use super::operations::{RunningStats, StatOperation};
use crate::check::CheckResult;
use crate::field::{is_missing, AxisNames, GriddedField, DEFAULT_SPVAL};
use crate::output::QcOutput;
use chrono::NaiveDateTime;
use ndarray::{Array1, ArrayView1, Axis};
use tracing::debug;

/// Smoother used to build the baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmoothingKind {
    /// `b[0] = s[0]`, `b[k] = a s[k] + (1 - a) b[k-1]` with `a = 1 / window`
    #[default]
    Exponential,
    /// Mean over `[k - window/2, k + window/2]`, clipped at the ends
    CenteredMovingAverage,
}

/// Configuration of the outlier detector
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierConfig {
    pub axes: AxisNames,
    pub smoothing: SmoothingKind,
    pub window: usize,
    /// Outliers lie further than `threshold * std` from the baseline
    pub threshold: f64,
    pub spval: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            axes: AxisNames::default(),
            smoothing: SmoothingKind::Exponential,
            window: 12,
            threshold: 3.0,
            spval: DEFAULT_SPVAL,
        }
    }
}

impl OutlierConfig {
    /// Centered moving average with a `2 * std` threshold
    pub fn moving_average() -> Self {
        Self {
            smoothing: SmoothingKind::CenteredMovingAverage,
            threshold: 2.0,
            ..Self::default()
        }
    }
}

/// Smoothed baseline of `series`; missing entries are NaN in the result.
///
/// The exponential smoother carries the baseline over missing entries, the
/// moving average leaves them out of its window.
pub fn smooth(series: ArrayView1<f64>, kind: SmoothingKind, window: usize, spval: f64) -> Array1<f64> {
    let n = series.len();
    let mut baseline = Array1::from_elem(n, f64::NAN);
    if window == 0 {
        return baseline;
    }
    match kind {
        SmoothingKind::Exponential => {
            #[allow(clippy::cast_precision_loss)]
            let alpha = 1.0 / window as f64;
            let mut previous: Option<f64> = None;
            for (k, &value) in series.iter().enumerate() {
                if is_missing(value, spval) {
                    continue;
                }
                let current = match previous {
                    None => value,
                    Some(b) => alpha * value + (1.0 - alpha) * b,
                };
                baseline[k] = current;
                previous = Some(current);
            }
        }
        SmoothingKind::CenteredMovingAverage => {
            let half = window / 2;
            for k in 0..n {
                if is_missing(series[k], spval) {
                    continue;
                }
                let lo = k.saturating_sub(half);
                let hi = (k + half).min(n - 1);
                let mut stats = RunningStats::default();
                for &v in series.slice(ndarray::s![lo..=hi]).iter() {
                    if !is_missing(v, spval) {
                        stats.push(v);
                    }
                }
                baseline[k] = stats.get(StatOperation::Mean);
            }
        }
    }
    baseline
}

/// Flags entries whose residual from the smoothed baseline exceeds
/// `threshold` times the standard deviation of the whole series.
pub fn detect_outliers(series: ArrayView1<f64>, config: &OutlierConfig) -> Vec<bool> {
    let baseline = smooth(series, config.smoothing, config.window, config.spval);
    let mut stats = RunningStats::default();
    for &v in series.iter().filter(|&&v| !is_missing(v, config.spval)) {
        stats.push(v);
    }
    let limit = config.threshold * stats.get(StatOperation::Std);
    series
        .iter()
        .zip(baseline.iter())
        .map(|(&s, &b)| !is_missing(s, config.spval) && (s - b).abs() > limit)
        .collect()
}

/// Run the outlier detector on each depth level of a `(time[, z])` field.
///
/// `tag_prefix` names the chart requests, which are suffixed with the depth
/// level when the field has one.
pub fn check_outliers(
    field: &GriddedField,
    tag_prefix: &str,
    config: &OutlierConfig,
    output: &mut dyn QcOutput,
) -> CheckResult {
    let mut result = CheckResult::new("check_outliers");
    let axes = &config.axes;
    if config.window == 0 {
        result.configuration("smoothing window must be at least 1");
        return result;
    }
    let Some(t_axis) = field.axis_index(&axes.time) else {
        result.not_applicable(format!(
            "'{}' has no '{}' axis to detect outliers along",
            field.name(),
            axes.time
        ));
        return result;
    };
    if let Some(extra) = field
        .dims()
        .iter()
        .find(|d| **d != axes.time && **d != axes.z)
    {
        result.configuration(format!(
            "'{}' must be a series over '{}' (and '{}'), found axis '{}'",
            field.name(),
            axes.time,
            axes.z,
            extra
        ));
        return result;
    }

    let nt = field.data().shape()[t_axis];
    let times: Vec<NaiveDateTime> = field
        .times(&axes.time)
        .map(<[NaiveDateTime]>::to_vec)
        .unwrap_or_default();
    let label = |t: usize| {
        times
            .get(t)
            .map_or_else(|| format!("index {}", t), |ts| ts.to_string())
    };

    let levels: Vec<(Option<usize>, ArrayView1<f64>)> = match field.axis_index(&axes.z) {
        Some(z_axis) => field
            .data()
            .axis_iter(Axis(z_axis))
            .enumerate()
            .filter_map(|(k, level)| level.into_dimensionality().ok().map(|l| (Some(k), l)))
            .collect(),
        None => field
            .data()
            .view()
            .into_dimensionality()
            .ok()
            .map(|l| vec![(None, l)])
            .unwrap_or_default(),
    };
    debug!(levels = levels.len(), nt, "outlier detection on {}", field.name());

    for (level, series) in levels {
        let flags = detect_outliers(series, config);
        let flagged: Vec<String> = flags
            .iter()
            .enumerate()
            .filter(|(_, f)| **f)
            .map(|(t, _)| label(t))
            .collect();
        if flagged.is_empty() {
            continue;
        }
        let (location, tag) = match level {
            Some(k) => (
                format!(" at depth level {}", k),
                format!("{}_lev{}", tag_prefix, k),
            ),
            None => (String::new(), tag_prefix.to_string()),
        };
        result.problem(format!(
            "outliers in '{}'{} at {}",
            field.name(),
            location,
            flagged.join(", ")
        ));
        if let Err(e) = output.render_outlier_chart(&times, series, &flags, &tag) {
            result.output(format!("failed to render outlier chart {}: {}", tag, e));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::FindingKind;
    use crate::output::MemoryOutput;
    use ndarray::{arr1, Array2, ArrayD, IxDyn};

    #[test]
    fn exponential_baseline_follows_recurrence() {
        let series = arr1(&[10.0, 22.0, 10.0]);
        let baseline = smooth(series.view(), SmoothingKind::Exponential, 12, 1e15);
        assert_eq!(baseline[0], 10.0);
        assert!((baseline[1] - 11.0).abs() < 1e-12);
        assert!((baseline[2] - (10.0 / 12.0 + 11.0 * 11.0 / 12.0)).abs() < 1e-12);
    }

    #[test]
    fn moving_average_clips_at_the_ends() {
        let series = arr1(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let baseline = smooth(series.view(), SmoothingKind::CenteredMovingAverage, 2, 1e15);
        assert!((baseline[0] - 1.5).abs() < 1e-12);
        assert!((baseline[2] - 3.0).abs() < 1e-12);
        assert!((baseline[4] - 4.5).abs() < 1e-12);
    }

    #[test]
    fn missing_entries_are_never_outliers() {
        let series = arr1(&[1.0, f64::NAN, 1.0, 1e15, 1.0]);
        let flags = detect_outliers(series.view(), &OutlierConfig::default());
        assert!(flags.iter().all(|f| !f));
    }

    #[test]
    fn moving_average_preset_flags_the_spike() {
        // std of the series is about 1.99, so 2 std sits near 4
        let mut series = Array1::from_elem(100, 10.0);
        series[50] = 30.0;
        let config = OutlierConfig::moving_average();
        assert_eq!(config.threshold, 2.0);
        let flags = detect_outliers(series.view(), &config);
        let flagged: Vec<usize> = flags
            .iter()
            .enumerate()
            .filter(|(_, f)| **f)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(flagged, vec![50]);
    }

    #[test]
    fn static_field_is_not_applicable() {
        let field = GriddedField::new("deptho", &[], ArrayD::from_elem(IxDyn(&[]), 4000.0)).unwrap();
        let mut output = MemoryOutput::default();
        let result = check_outliers(&field, "QC_outliers_deptho", &OutlierConfig::default(), &mut output);
        assert!(result.passed());
        assert!(result.has(FindingKind::NotApplicable));
        assert!(output.charts.is_empty());
    }

    #[test]
    fn spike_is_reported_per_depth_level() {
        let mut data = Array2::zeros((60, 3));
        data[[30, 1]] = 20.0;
        let field = GriddedField::new("thetao", &["time", "lev"], data.into_dyn()).unwrap();
        let mut output = MemoryOutput::default();
        let result = check_outliers(&field, "QC_outliers_thetao", &OutlierConfig::default(), &mut output);
        assert!(!result.passed());
        assert!(result.message().contains("at depth level 1 at index 30"));
        assert_eq!(result.message().lines().count(), 1);
        assert_eq!(output.charts.len(), 1);
        assert_eq!(output.charts[0].tag, "QC_outliers_thetao_lev1");
    }
}
