//! Output strategy for derived summaries and outlier charts
//!
//! Checks never write files themselves. They hand summary series and outlier
//! chart requests to a [`QcOutput`], which the caller chooses: discard them,
//! keep them in memory, or write them to NetCDF
//! ([`NetCDFOutput`](crate::netcdf_io::NetCDFOutput)).

use crate::errors::Result;
use crate::metadata::MetadataDict;
use crate::statistics::SummarySeries;
use chrono::NaiveDateTime;
use ndarray::{Array1, ArrayView1};

/// Receiver of the side outputs of the statistics and outlier checks
pub trait QcOutput {
    /// Persist a summary series under `name`
    fn write_summary(&mut self, name: &str, summary: &SummarySeries) -> Result<()>;

    /// Render an outlier chart for one series; `outliers[i]` flags `series[i]`
    fn render_outlier_chart(
        &mut self,
        times: &[NaiveDateTime],
        series: ArrayView1<f64>,
        outliers: &[bool],
        tag: &str,
    ) -> Result<()>;
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl QcOutput for NullOutput {
    fn write_summary(&mut self, _name: &str, _summary: &SummarySeries) -> Result<()> {
        Ok(())
    }

    fn render_outlier_chart(
        &mut self,
        _times: &[NaiveDateTime],
        _series: ArrayView1<f64>,
        _outliers: &[bool],
        _tag: &str,
    ) -> Result<()> {
        Ok(())
    }
}

/// An outlier chart request kept by [`MemoryOutput`]
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub tag: String,
    pub times: Vec<NaiveDateTime>,
    pub series: Array1<f64>,
    pub outliers: Vec<bool>,
}

/// Keeps every summary and chart request so the caller can persist them later
#[derive(Debug, Default, Clone)]
pub struct MemoryOutput {
    pub summaries: Vec<(String, SummarySeries)>,
    pub charts: Vec<ChartRequest>,
}

impl QcOutput for MemoryOutput {
    fn write_summary(&mut self, name: &str, summary: &SummarySeries) -> Result<()> {
        self.summaries.push((name.to_string(), summary.clone()));
        Ok(())
    }

    fn render_outlier_chart(
        &mut self,
        times: &[NaiveDateTime],
        series: ArrayView1<f64>,
        outliers: &[bool],
        tag: &str,
    ) -> Result<()> {
        self.charts.push(ChartRequest {
            tag: tag.to_string(),
            times: times.to_vec(),
            series: series.to_owned(),
            outliers: outliers.to_vec(),
        });
        Ok(())
    }
}

/// Identifiers of the producing model run, used only for output names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub source_id: String,
    pub experiment_id: String,
    pub grid_label: String,
}

impl Provenance {
    /// Read `source_id`, `experiment_id` and `grid_label`; absent ones become `unknown`
    pub fn from_attributes(attributes: &MetadataDict) -> Self {
        let get = |key: &str| {
            attributes
                .get(key)
                .map_or_else(|| "unknown".to_string(), |v| v.to_string())
        };
        Self {
            source_id: get("source_id"),
            experiment_id: get("experiment_id"),
            grid_label: get("grid_label"),
        }
    }
}

/// How output names are built
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingScheme {
    /// `QC_{source_id}-{experiment_id}_{grid_label}_{statistic}_{field}_{yearMin}-{yearMax}`
    Provenance(Provenance),
    /// `QC_{statistic}_{field}_{nx}x{ny}_{firstTimestamp}`
    Grid {
        nx: usize,
        ny: usize,
        first_timestamp: Option<NaiveDateTime>,
    },
}

impl NamingScheme {
    /// Output name for one statistic of one field; spaces become underscores
    #[must_use]
    pub fn name(&self, statistic: &str, field_name: &str, years: Option<(i32, i32)>) -> String {
        let name = match self {
            NamingScheme::Provenance(p) => {
                let mut name = format!(
                    "QC_{}-{}_{}_{}_{}",
                    p.source_id, p.experiment_id, p.grid_label, statistic, field_name
                );
                if let Some((first, last)) = years {
                    name.push_str(&format!("_{}-{}", first, last));
                }
                name
            }
            NamingScheme::Grid {
                nx,
                ny,
                first_timestamp,
            } => {
                let stamp = first_timestamp
                    .map_or_else(|| "static".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string());
                format!("QC_{}_{}_{}x{}_{}", statistic, field_name, nx, ny, stamp)
            }
        };
        name.replace(' ', "_")
    }
}
