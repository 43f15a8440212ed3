//! NetCDF reading into a [`Dataset`] and writing of QC outputs
//!
//! Every numeric variable is read as `f64`. Coordinate variables (those named
//! after their only dimension, and those listed in a `coordinates` attribute)
//! are attached to the fields they lie on. Time coordinates with CF units
//! `<unit> since <date>` are decoded on the proleptic Gregorian calendar.

use crate::dataset::Dataset;
use crate::errors::{AutoQcError, Result};
use crate::field::{CoordValues, Coordinate, GriddedField};
use crate::metadata::{AttrValue, MetadataDict};
use crate::output::QcOutput;
use crate::statistics::SummarySeries;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Utc};
use ndarray::{ArrayD, ArrayView1, IxDyn};
use netcdf::{create, File};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const EPOCH_UNITS: &str = "days since 1970-01-01 00:00:00";

struct RawVariable {
    dims: Vec<String>,
    data: ArrayD<f64>,
    attributes: MetadataDict,
}

/// Open `path` and load it into memory.
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    let file = netcdf::open(path)?;
    info!("reading {}", path.display());
    dataset_from_file(&file)
}

/// Load every dimension, global attribute and numeric variable of `file`.
pub fn dataset_from_file(file: &File) -> Result<Dataset> {
    let mut ds = Dataset::new();
    for attr in file.attributes() {
        match attr.value() {
            Ok(value) => ds.set_attribute(attr.name(), AttrValue::from(value)),
            Err(e) => warn!("skipping global attribute '{}': {}", attr.name(), e),
        }
    }
    for dim in file.dimensions() {
        ds.add_dimension(&dim.name(), dim.len())?;
    }

    let mut raw: BTreeMap<String, RawVariable> = BTreeMap::new();
    for var in file.variables() {
        let name = var.name().to_string();
        let dims: Vec<String> = var
            .dimensions()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let values = match var.get_values::<f64, _>(..) {
            Ok(v) => v,
            Err(e) => {
                debug!("skipping non-numeric variable '{}': {}", name, e);
                continue;
            }
        };
        let data = ArrayD::from_shape_vec(IxDyn(&shape), values)?;
        let mut attributes = MetadataDict::new();
        for attr in var.attributes() {
            if let Ok(value) = attr.value() {
                attributes.insert(attr.name().to_string(), AttrValue::from(value));
            }
        }
        raw.insert(name, RawVariable { dims, data, attributes });
    }

    let mut coord_names: BTreeSet<String> = raw
        .iter()
        .filter(|(name, v)| v.dims.len() == 1 && v.dims[0] == **name)
        .map(|(name, _)| name.clone())
        .collect();
    for v in raw.values() {
        if let Some(listed) = v.attributes.get("coordinates").and_then(AttrValue::as_str) {
            coord_names.extend(
                listed
                    .split_whitespace()
                    .filter(|c| raw.contains_key(*c))
                    .map(str::to_string),
            );
        }
    }

    let mut coords: BTreeMap<String, Coordinate> = BTreeMap::new();
    for name in &coord_names {
        if let Some(v) = raw.get(name) {
            coords.insert(name.clone(), to_coordinate(name, v)?);
        }
    }

    for (name, v) in raw {
        if coord_names.contains(&name) {
            continue;
        }
        let mut field = GriddedField::from_parts(&name, v.dims, v.data)?;
        for (key, value) in v.attributes {
            field = field.with_attribute(&key, value);
        }
        for (cname, coord) in &coords {
            if coord.dims.iter().all(|d| field.has_axis(d)) {
                field = field.with_coord(cname, coord.clone())?;
            }
        }
        ds.add_field(field)?;
    }
    for (name, coord) in coords {
        if ds.coord(&name).is_none() {
            ds.add_coord(&name, coord)?;
        }
    }
    debug!(
        variables = ds.variables().len(),
        coords = ds.coords().len(),
        "dataset loaded"
    );
    Ok(ds)
}

fn to_coordinate(name: &str, v: &RawVariable) -> Result<Coordinate> {
    let units = v.attributes.get("units").and_then(AttrValue::as_str);
    if let (Some(units), 1) = (units, v.dims.len()) {
        if units.contains(" since ") {
            match decode_times(v.data.iter().copied(), units) {
                Ok(times) => return Ok(Coordinate::time(&v.dims[0], times)),
                Err(e) => warn!("keeping '{}' numeric: {}", name, e),
            }
        }
    }
    let dims: Vec<&str> = v.dims.iter().map(String::as_str).collect();
    Coordinate::grid(&dims, v.data.clone())
}

fn parse_reference_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim().trim_end_matches('Z').trim_end_matches(" UTC");
    const FORMATS: [&str; 5] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    for format in FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(text, format) {
            return Some(t);
        }
    }
    let date = text.split_whitespace().next()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Decode offsets in CF units `<days|hours|minutes|seconds> since <date>`.
pub fn decode_times(offsets: impl IntoIterator<Item = f64>, units: &str) -> Result<Vec<NaiveDateTime>> {
    let invalid = |reason: String| AutoQcError::InvalidTime { reason };
    let (unit, reference) = units
        .split_once(" since ")
        .ok_or_else(|| invalid(format!("unexpected time units format: '{}'", units)))?;
    let millis_per_unit = match unit.trim().to_lowercase().as_str() {
        "days" | "day" | "d" => 86_400_000.0,
        "hours" | "hour" | "h" => 3_600_000.0,
        "minutes" | "minute" | "min" => 60_000.0,
        "seconds" | "second" | "s" => 1_000.0,
        other => return Err(invalid(format!("unsupported time unit '{}'", other))),
    };
    let base = parse_reference_date(reference)
        .ok_or_else(|| invalid(format!("failed to parse reference date '{}'", reference)))?;

    offsets
        .into_iter()
        .map(|offset| {
            if !offset.is_finite() {
                return Err(invalid(format!("non-finite time offset {}", offset)));
            }
            #[allow(clippy::cast_possible_truncation)]
            let millis = (offset * millis_per_unit).round() as i64;
            TimeDelta::try_milliseconds(millis)
                .and_then(|delta| base.checked_add_signed(delta))
                .ok_or_else(|| invalid(format!("offset {} {} is out of range", offset, unit)))
        })
        .collect()
}

fn put_attr(var: &mut netcdf::VariableMut, key: &str, value: &AttrValue) -> Result<()> {
    use crate::metadata::Scalar;
    // fill markers must share the variable's type
    if key == "_FillValue" || key == "missing_value" {
        if let Some(fill) = value.as_f64() {
            var.put_attribute(key, fill)?;
        }
        return Ok(());
    }
    match value {
        AttrValue::Scalar(Scalar::Text(s)) => var.put_attribute(key, s.as_str())?,
        AttrValue::Scalar(Scalar::Int(i)) => var.put_attribute(key, *i)?,
        AttrValue::Scalar(Scalar::Float(x)) => var.put_attribute(key, *x)?,
        AttrValue::Array(values) => var.put_attribute(key, values.clone())?,
    };
    Ok(())
}

/// Days since the Unix epoch
fn epoch_days(times: &[NaiveDateTime]) -> Result<ArrayD<f64>> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| AutoQcError::Generic("invalid epoch".to_string()))?;
    #[allow(clippy::cast_precision_loss)]
    let days = times
        .iter()
        .map(|t| (*t - epoch).num_milliseconds() as f64 / 86_400_000.0)
        .collect();
    Ok(ArrayD::from_shape_vec(IxDyn(&[times.len()]), days)?)
}

fn put_times(var: &mut netcdf::VariableMut, times: &[NaiveDateTime]) -> Result<()> {
    var.put_attribute("units", EPOCH_UNITS)?;
    var.put_attribute("calendar", "proleptic_gregorian")?;
    var.put(epoch_days(times)?.view(), ..)?;
    Ok(())
}

/// Writes every summary and outlier chart to `{outdir}/{name}.nc`
#[derive(Debug, Clone)]
pub struct NetCDFOutput {
    outdir: PathBuf,
    written: Vec<PathBuf>,
}

impl NetCDFOutput {
    /// Create the writer and its output directory
    pub fn new(outdir: impl Into<PathBuf>) -> Result<Self> {
        let outdir = outdir.into();
        fs::create_dir_all(&outdir)?;
        Ok(Self {
            outdir,
            written: Vec::new(),
        })
    }

    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.outdir.join(format!("{}.nc", name))
    }

    /// Files written so far
    #[must_use]
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn create_file(&mut self, name: &str) -> Result<(netcdf::FileMut, PathBuf)> {
        let path = self.path_for(name);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        let file = create(&path)?;
        Ok((file, path))
    }

    fn finish(&mut self, mut file: netcdf::FileMut, path: PathBuf) -> Result<()> {
        file.add_attribute(
            "history",
            format!("Created by auto_qc on {}", Utc::now().to_rfc3339()),
        )?;
        debug!("wrote {}", path.display());
        self.written.push(path);
        Ok(())
    }
}

impl QcOutput for NetCDFOutput {
    fn write_summary(&mut self, name: &str, summary: &SummarySeries) -> Result<()> {
        let (mut file, path) = self.create_file(name)?;
        for (dim, &len) in summary.dims.iter().zip(summary.values.shape()) {
            file.add_dimension(dim, len)?;
        }
        let dims: Vec<&str> = summary.dims.iter().map(String::as_str).collect();
        let var_name = format!("{}_{}", summary.name, summary.field_name);
        let mut var = file.add_variable::<f64>(&var_name, &dims)?;
        var.put(summary.values.view(), ..)?;
        var.put_attribute("statistic", summary.statistic.as_str())?;
        var.put_attribute("source_variable", summary.field_name.as_str())?;
        var.put_attribute("labels", summary.labels.clone())?;
        self.finish(file, path)
    }

    fn render_outlier_chart(
        &mut self,
        times: &[NaiveDateTime],
        series: ArrayView1<f64>,
        outliers: &[bool],
        tag: &str,
    ) -> Result<()> {
        let (mut file, path) = self.create_file(tag)?;
        let n = series.len();
        file.add_dimension("time", n)?;

        if times.len() == n {
            let mut time = file.add_variable::<f64>("time", &["time"])?;
            put_times(&mut time, times)?;
        }

        let mut values = file.add_variable::<f64>("series", &["time"])?;
        values.put(series.into_dyn(), ..)?;
        values.put_attribute("tag", tag)?;

        let flags: ArrayD<i32> =
            ArrayD::from_shape_vec(IxDyn(&[n]), outliers.iter().map(|&o| i32::from(o)).collect())?;
        let mut flag = file.add_variable::<i32>("outlier", &["time"])?;
        flag.put(flags.view(), ..)?;
        flag.put_attribute("flag_values", vec![0_i32, 1])?;
        flag.put_attribute("flag_meanings", "regular outlier")?;
        self.finish(file, path)
    }
}

/// Write a gridded field (e.g. a spatial average) with its attributes and
/// the coordinates attached to it.
pub fn write_field(path: &Path, field: &GriddedField) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    let mut file = create(path)?;
    for (dim, &len) in field.dims().iter().zip(field.data().shape()) {
        file.add_dimension(dim, len)?;
    }
    let dims: Vec<&str> = field.dims().iter().map(String::as_str).collect();
    let mut var = file.add_variable::<f64>(field.name(), &dims)?;
    for (key, value) in field.attributes() {
        put_attr(&mut var, key, value)?;
    }
    var.put(field.data().view(), ..)?;

    for (name, coord) in field.coords() {
        if name == field.name() {
            continue;
        }
        let cdims: Vec<&str> = coord.dims.iter().map(String::as_str).collect();
        let mut cvar = file.add_variable::<f64>(name, &cdims)?;
        match &coord.values {
            CoordValues::Time(times) => put_times(&mut cvar, times)?,
            CoordValues::Numeric(values) => cvar.put(values.view(), ..)?,
        }
    }
    file.add_attribute(
        "history",
        format!("Created by auto_qc on {}", Utc::now().to_rfc3339()),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_since_decode() {
        let times = decode_times([0.0, 31.0], "days since 1850-01-01").unwrap();
        assert_eq!(times[1].to_string(), "1850-02-01 00:00:00");
    }

    #[test]
    fn hours_since_with_clock_time() {
        let times = decode_times([6.0], "hours since 2000-01-01 12:00:00").unwrap();
        assert_eq!(times[0].to_string(), "2000-01-01 18:00:00");
    }

    #[test]
    fn unknown_units_are_rejected() {
        assert!(decode_times([1.0], "fortnights since 2000-01-01").is_err());
        assert!(decode_times([1.0], "days after 2000-01-01").is_err());
    }

    #[test]
    fn non_finite_offsets_are_rejected() {
        let err = decode_times([0.0, f64::NAN], "days since 1850-01-01").unwrap_err();
        assert!(matches!(err, AutoQcError::InvalidTime { .. }));
        assert!(decode_times([f64::INFINITY], "days since 1850-01-01").is_err());
    }

    #[test]
    fn epoch_days_round_trip_through_decoding() {
        let times = decode_times([0.0, 0.5, 31.0], "days since 1980-01-01").unwrap();
        let days = epoch_days(&times).unwrap();
        let again = decode_times(days.iter().copied(), EPOCH_UNITS).unwrap();
        assert_eq!(again, times);
    }
}
