//! Time axis spacing checks against a declared sampling frequency

use crate::check::CheckResult;
use crate::dataset::Dataset;
use chrono::{NaiveDateTime, TimeDelta};
use std::fmt;
use std::str::FromStr;

/// Sampling frequencies understood by the time axis check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Hourly,
    ThreeHourly,
    SixHourly,
    Daily,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Inclusive bounds on the spacing between consecutive records
    #[must_use]
    pub fn bounds(self) -> (TimeDelta, TimeDelta) {
        match self {
            Self::Hourly => (TimeDelta::hours(1), TimeDelta::hours(1)),
            Self::ThreeHourly => (TimeDelta::hours(3), TimeDelta::hours(3)),
            Self::SixHourly => (TimeDelta::hours(6), TimeDelta::hours(6)),
            Self::Daily => (TimeDelta::days(1), TimeDelta::days(1)),
            Self::Monthly => (TimeDelta::days(28), TimeDelta::days(31)),
            Self::Yearly => (TimeDelta::days(365), TimeDelta::days(366)),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hourly => "1hr",
            Self::ThreeHourly => "3hr",
            Self::SixHourly => "6hr",
            Self::Daily => "day",
            Self::Monthly => "mon",
            Self::Yearly => "yr",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "1hr" | "hourly" | "1-hourly" => Ok(Self::Hourly),
            "3hr" | "3-hourly" | "3hourly" => Ok(Self::ThreeHourly),
            "6hr" | "6-hourly" | "6hourly" => Ok(Self::SixHourly),
            "day" | "daily" => Ok(Self::Daily),
            "mon" | "monthly" | "month" => Ok(Self::Monthly),
            "yr" | "yearly" | "annual" => Ok(Self::Yearly),
            _ => Err(format!("unsupported frequency '{}'", tag)),
        }
    }
}

/// How irregular gaps are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapReport {
    /// One line per irregular gap
    #[default]
    PerGap,
    /// A single line with the number of irregular gaps
    Summary,
}

/// Configuration of the time axis check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeAxisConfig {
    pub time: String,
    /// Overrides the dataset's `frequency` attribute
    pub frequency: Option<String>,
    pub report: GapReport,
}

impl Default for TimeAxisConfig {
    fn default() -> Self {
        Self {
            time: "time".to_string(),
            frequency: None,
            report: GapReport::PerGap,
        }
    }
}

fn describe_gap(gap: TimeDelta) -> String {
    #[allow(clippy::cast_precision_loss)]
    let days = gap.num_seconds() as f64 / 86_400.0;
    if gap.num_seconds() % 86_400 == 0 {
        format!("{} days", gap.num_days())
    } else {
        format!("{:.4} days", days)
    }
}

/// Check that every gap between consecutive timestamps lies within the
/// bounds of the frequency `tag`.
pub fn check_timeaxis(times: &[NaiveDateTime], tag: &str, config: &TimeAxisConfig) -> CheckResult {
    let mut result = CheckResult::new("check_timeaxis");
    let frequency = match tag.parse::<Frequency>() {
        Ok(f) => f,
        Err(e) => {
            result.configuration(e);
            return result;
        }
    };
    if times.len() < 2 {
        result.not_applicable(format!(
            "{} record(s) on the time axis, spacing not checked",
            times.len()
        ));
        return result;
    }

    let (min, max) = frequency.bounds();
    let mut irregular = 0_usize;
    for pair in times.windows(2) {
        let gap = pair[1].signed_duration_since(pair[0]);
        if gap < min || gap > max {
            irregular += 1;
            if config.report == GapReport::PerGap {
                result.problem(format!(
                    "records are not correctly spaced: {} between {} and {} (expected {} to {} for '{}')",
                    describe_gap(gap),
                    pair[0],
                    pair[1],
                    describe_gap(min),
                    describe_gap(max),
                    frequency
                ));
            }
        }
    }
    if irregular > 0 && config.report == GapReport::Summary {
        result.problem(format!(
            "records are not correctly spaced ({} irregular gaps for '{}')",
            irregular, frequency
        ));
    }
    result
}

/// Time axis check for a dataset, taking the frequency from its `frequency`
/// attribute unless the configuration overrides it.
pub fn check_dataset_timeaxis(ds: &Dataset, config: &TimeAxisConfig) -> CheckResult {
    let tag = config
        .frequency
        .as_deref()
        .or_else(|| ds.attribute_str("frequency"));
    let Some(tag) = tag else {
        let mut result = CheckResult::new("check_timeaxis");
        result.configuration("dataset declares no 'frequency' attribute");
        return result;
    };
    match ds.times(&config.time) {
        Some(times) => check_timeaxis(times, tag, config),
        None => {
            let mut result = CheckResult::new("check_timeaxis");
            if ds.coord(&config.time).is_some() {
                result.configuration(format!(
                    "coordinate '{}' holds no decoded timestamps",
                    config.time
                ));
            } else {
                result.not_applicable(format!("dataset has no '{}' coordinate", config.time));
            }
            result
        }
    }
}
