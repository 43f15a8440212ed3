//! Summary statistics of a field and the zero-field check

use super::operations::{StatOperation, SummarySeries};
use super::parallel::parallel_group_stats;
use crate::check::CheckResult;
use crate::errors::{AutoQcError, Result};
use crate::field::{AxisNames, GriddedField, DEFAULT_SPVAL};
use crate::output::{NamingScheme, QcOutput};
use chrono::Datelike;
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// How timesteps are grouped before reducing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    /// One group per timestep
    #[default]
    Timestep,
    /// One group per calendar year
    Year,
}

/// Configuration of the statistics check
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsConfig {
    pub axes: AxisNames,
    pub spval: f64,
    pub granularity: Granularity,
    /// Compare the mean and std of every group with the first one
    pub compare_first_year: bool,
    /// Relative tolerance of that comparison
    pub rtol: f64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            axes: AxisNames::default(),
            spval: DEFAULT_SPVAL,
            granularity: Granularity::Timestep,
            compare_first_year: false,
            rtol: 0.1,
        }
    }
}

/// Grouped summary of a field
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStatistics {
    pub field_name: String,
    pub granularity: Granularity,
    /// One label per group
    pub labels: Vec<String>,
    /// First and last calendar year covered, when timestamps are known
    pub years: Option<(i32, i32)>,
    /// mean, min, max and std series, then the std profile when the field has depth
    pub series: Vec<SummarySeries>,
    /// Labels of groups without a single valid value
    pub empty_groups: Vec<String>,
}

impl SummaryStatistics {
    /// The 1-D series of a statistic
    #[must_use]
    pub fn get(&self, op: StatOperation) -> Option<&SummarySeries> {
        self.series
            .iter()
            .find(|s| s.statistic == op && s.values.ndim() == 1)
    }

    /// Standard deviation per group and depth level
    #[must_use]
    pub fn std_profile(&self) -> Option<&SummarySeries> {
        self.series.iter().find(|s| s.values.ndim() == 2)
    }
}

struct Groups {
    dim: String,
    members: Vec<Vec<usize>>,
    labels: Vec<String>,
}

fn make_groups(field: &GriddedField, config: &StatisticsConfig, nt: usize) -> Result<Groups> {
    let time = &config.axes.time;
    if !field.has_axis(time) {
        return Ok(Groups {
            dim: "record".to_string(),
            members: vec![vec![0]],
            labels: vec!["static".to_string()],
        });
    }
    let times = field.times(time);
    match config.granularity {
        Granularity::Timestep => Ok(Groups {
            dim: time.clone(),
            members: (0..nt).map(|t| vec![t]).collect(),
            labels: (0..nt)
                .map(|t| {
                    times
                        .and_then(|ts| ts.get(t))
                        .map_or_else(|| t.to_string(), |ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                })
                .collect(),
        }),
        Granularity::Year => {
            let times = times.ok_or_else(|| AutoQcError::InvalidTime {
                reason: format!(
                    "'{}' has no decoded '{}' coordinate to group by year",
                    field.name(),
                    time
                ),
            })?;
            let mut by_year: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
            for (t, ts) in times.iter().enumerate().take(nt) {
                by_year.entry(ts.year()).or_default().push(t);
            }
            Ok(Groups {
                dim: "year".to_string(),
                labels: by_year.keys().map(|y| y.to_string()).collect(),
                members: by_year.into_values().collect(),
            })
        }
    }
}

/// Grouped mean/min/max/std of a field over its spatial axes.
pub fn compute_summary(field: &GriddedField, config: &StatisticsConfig) -> Result<SummaryStatistics> {
    let data = field.to_tzyx(&config.axes)?;
    let (nt, nz, _, _) = data.dim();
    let groups = make_groups(field, config, nt)?;
    debug!("summarising '{}' over {} groups", field.name(), groups.members.len());

    let stats = parallel_group_stats(&data, &groups.members, config.spval);

    let mut series = Vec::with_capacity(5);
    for op in StatOperation::ALL {
        let values: Array1<f64> = stats.iter().map(|g| g.total.get(op)).collect();
        series.push(SummarySeries {
            name: op.as_str().to_string(),
            statistic: op,
            field_name: field.name().to_string(),
            dims: vec![groups.dim.clone()],
            labels: groups.labels.clone(),
            values: values.into_dyn(),
        });
    }
    if field.has_axis(&config.axes.z) {
        let profile = Array2::from_shape_fn((stats.len(), nz), |(g, k)| {
            stats[g].per_level[k].get(StatOperation::Std)
        });
        series.push(SummarySeries {
            name: "std_profile".to_string(),
            statistic: StatOperation::Std,
            field_name: field.name().to_string(),
            dims: vec![groups.dim.clone(), config.axes.z.clone()],
            labels: groups.labels.clone(),
            values: profile.into_dyn(),
        });
    }

    let empty_groups = groups
        .labels
        .iter()
        .zip(&stats)
        .filter(|(_, g)| g.total.count() == 0)
        .map(|(label, _)| label.clone())
        .collect();

    let years = field.times(&config.axes.time).and_then(|ts| {
        let first = ts.iter().map(Datelike::year).min()?;
        let last = ts.iter().map(Datelike::year).max()?;
        Some((first, last))
    });

    Ok(SummaryStatistics {
        field_name: field.name().to_string(),
        granularity: config.granularity,
        labels: groups.labels,
        years,
        series,
        empty_groups,
    })
}

/// Check that the summary statistics of a field are not identically zero
/// and, optionally, that they stay close to the first group. Every summary
/// series is handed to `output`.
pub fn check_statistics(
    field: &GriddedField,
    naming: &NamingScheme,
    config: &StatisticsConfig,
    output: &mut dyn QcOutput,
) -> CheckResult {
    let mut result = CheckResult::new("check_statistics");
    let summary = match compute_summary(field, config) {
        Ok(s) => s,
        Err(e) => {
            result.configuration(format!("cannot summarise '{}': {}", field.name(), e));
            return result;
        }
    };

    for label in &summary.empty_groups {
        result.problem(format!("no valid data in '{}' for {}", field.name(), label));
    }

    for series in &summary.series {
        if series.is_identically_zero() {
            result.problem(format!(
                "{} of '{}' is zero for every {}",
                series.name,
                field.name(),
                series.dims[0]
            ));
        }
    }

    if config.compare_first_year {
        for op in [StatOperation::Mean, StatOperation::Std] {
            let Some(series) = summary.get(op) else { continue };
            let values: Vec<f64> = series.values.iter().copied().collect();
            let Some(&reference) = values.first() else { continue };
            for (value, label) in values.iter().zip(&series.labels).skip(1) {
                if (value - reference).abs() > config.rtol * reference.abs() {
                    result.problem(format!(
                        "{} of '{}' for {} differs from {} by more than {}%: {} vs {}",
                        series.name,
                        field.name(),
                        label,
                        series.labels[0],
                        config.rtol * 100.0,
                        value,
                        reference
                    ));
                }
            }
        }
    }

    for series in &summary.series {
        let name = naming.name(&series.name, field.name(), summary.years);
        match output.write_summary(&name, series) {
            Ok(()) => info!("handed summary {} to output", name),
            Err(e) => result.output(format!("failed to write summary {}: {}", name, e)),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Coordinate;
    use crate::output::{MemoryOutput, Provenance};
    use crate::metadata::MetadataDict;
    use chrono::NaiveDate;
    use ndarray::Array;

    fn monthly(n: usize) -> Vec<chrono::NaiveDateTime> {
        (0..n)
            .map(|i| {
                NaiveDate::from_ymd_opt(2000 + (i / 12) as i32, (i % 12) as u32 + 1, 15)
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .unwrap()
            })
            .collect()
    }

    fn field(values: impl Fn(usize, usize, usize) -> f64) -> GriddedField {
        let data = Array::from_shape_fn((24, 3, 4), |(t, y, x)| values(t, y, x)).into_dyn();
        GriddedField::new("tos", &["time", "lat", "lon"], data)
            .unwrap()
            .with_coord("time", Coordinate::time("time", monthly(24)))
            .unwrap()
    }

    fn naming() -> NamingScheme {
        NamingScheme::Provenance(Provenance::from_attributes(&MetadataDict::new()))
    }

    #[test]
    fn yearly_groups_follow_calendar_years() {
        let config = StatisticsConfig {
            granularity: Granularity::Year,
            ..StatisticsConfig::default()
        };
        let summary = compute_summary(&field(|t, _, _| (t / 12) as f64 + 1.0), &config).unwrap();
        assert_eq!(summary.labels, vec!["2000", "2001"]);
        assert_eq!(summary.years, Some((2000, 2001)));
        let mean = summary.get(StatOperation::Mean).unwrap();
        assert_eq!(mean.values.as_slice().unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn zero_field_fails() {
        let mut output = MemoryOutput::default();
        let result = check_statistics(
            &field(|_, _, _| 0.0),
            &naming(),
            &StatisticsConfig::default(),
            &mut output,
        );
        assert!(!result.passed());
        assert!(result.message().contains("mean of 'tos' is zero for every time"));
        assert_eq!(output.summaries.len(), 4);
        assert!(output.summaries[0].0.starts_with("QC_unknown-unknown_unknown_mean_tos_2000-2001"));
    }

    #[test]
    fn first_year_comparison_is_optional() {
        let drifting = field(|t, y, x| 10.0 + t as f64 + (y * 4 + x) as f64);
        let mut output = MemoryOutput::default();
        let default = check_statistics(&drifting, &naming(), &StatisticsConfig::default(), &mut output);
        assert!(default.passed(), "{}", default.message());

        let config = StatisticsConfig {
            granularity: Granularity::Year,
            compare_first_year: true,
            ..StatisticsConfig::default()
        };
        let compared = check_statistics(&drifting, &naming(), &config, &mut output);
        assert!(compared.message().contains("differs from 2000"));
    }
}
