//! Gridded fields with named axes and coordinates

use crate::errors::{AutoQcError, Result};
use crate::metadata::{AttrValue, MetadataDict};
use chrono::NaiveDateTime;
use ndarray::{Array1, Array4, ArrayD, IxDyn};
use std::collections::BTreeMap;

/// Default sentinel for missing values
pub const DEFAULT_SPVAL: f64 = 1e15;

/// Returns true for entries that count as missing: non-finite or equal to the sentinel
#[inline]
#[must_use]
pub fn is_missing(value: f64, spval: f64) -> bool {
    !value.is_finite() || value == spval
}

/// Names of the x, y, z and time axes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisNames {
    pub x: String,
    pub y: String,
    pub z: String,
    pub time: String,
}

impl AxisNames {
    pub fn new(x: &str, y: &str, z: &str, time: &str) -> Self {
        Self {
            x: x.to_string(),
            y: y.to_string(),
            z: z.to_string(),
            time: time.to_string(),
        }
    }

    /// Role ("x", "y", "z", "time") of a dimension name, if it is one of the axes
    #[must_use]
    pub fn role_of(&self, dim: &str) -> Option<&'static str> {
        if dim == self.x {
            Some("x")
        } else if dim == self.y {
            Some("y")
        } else if dim == self.z {
            Some("z")
        } else if dim == self.time {
            Some("time")
        } else {
            None
        }
    }
}

impl Default for AxisNames {
    fn default() -> Self {
        Self::new("lon", "lat", "lev", "time")
    }
}

/// Values held by a coordinate
#[derive(Debug, Clone, PartialEq)]
pub enum CoordValues {
    Numeric(ArrayD<f64>),
    Time(Vec<NaiveDateTime>),
}

/// A coordinate variable: its dimensions and its values
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    pub dims: Vec<String>,
    pub values: CoordValues,
}

impl Coordinate {
    /// One-dimensional numeric coordinate along `dim`
    pub fn numeric(dim: &str, values: Vec<f64>) -> Self {
        Self {
            dims: vec![dim.to_string()],
            values: CoordValues::Numeric(Array1::from(values).into_dyn()),
        }
    }

    /// Multi-dimensional numeric coordinate (e.g. curvilinear lon/lat)
    pub fn grid(dims: &[&str], values: ArrayD<f64>) -> Result<Self> {
        if dims.len() != values.ndim() {
            return Err(AutoQcError::DimensionMismatch {
                message: format!(
                    "coordinate has {} dimension names for a {}-dimensional array",
                    dims.len(),
                    values.ndim()
                ),
            });
        }
        Ok(Self {
            dims: dims.iter().map(|d| d.to_string()).collect(),
            values: CoordValues::Numeric(values),
        })
    }

    /// Time coordinate along `dim`
    pub fn time(dim: &str, values: Vec<NaiveDateTime>) -> Self {
        Self {
            dims: vec![dim.to_string()],
            values: CoordValues::Time(values),
        }
    }

    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        match &self.values {
            CoordValues::Numeric(a) => a.shape().to_vec(),
            CoordValues::Time(t) => vec![t.len()],
        }
    }

    #[must_use]
    pub fn as_times(&self) -> Option<&[NaiveDateTime]> {
        match &self.values {
            CoordValues::Time(t) => Some(t),
            CoordValues::Numeric(_) => None,
        }
    }
}

/// An N-dimensional physical field with one name per axis
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedField {
    name: String,
    dims: Vec<String>,
    data: ArrayD<f64>,
    attributes: MetadataDict,
    coords: BTreeMap<String, Coordinate>,
}

impl GriddedField {
    /// Create a field, checking that every axis is named exactly once
    pub fn new(name: &str, dims: &[&str], data: ArrayD<f64>) -> Result<Self> {
        let dims: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
        Self::from_parts(name, dims, data)
    }

    pub(crate) fn from_parts(name: &str, dims: Vec<String>, data: ArrayD<f64>) -> Result<Self> {
        if dims.len() != data.ndim() {
            return Err(AutoQcError::DimensionMismatch {
                message: format!(
                    "variable '{}' has {} dimension names for a {}-dimensional array",
                    name,
                    dims.len(),
                    data.ndim()
                ),
            });
        }
        for (i, dim) in dims.iter().enumerate() {
            if dims[..i].contains(dim) {
                return Err(AutoQcError::DimensionMismatch {
                    message: format!("variable '{}' repeats dimension '{}'", name, dim),
                });
            }
        }
        Ok(Self {
            name: name.to_string(),
            dims,
            data,
            attributes: MetadataDict::new(),
            coords: BTreeMap::new(),
        })
    }

    /// Attach a coordinate; its dimensions must be axes of the field with matching lengths
    pub fn with_coord(mut self, name: &str, coord: Coordinate) -> Result<Self> {
        for (dim, len) in coord.dims.iter().zip(coord.shape()) {
            match self.axis_len(dim) {
                Some(n) if n == len => {}
                Some(n) => {
                    return Err(AutoQcError::DimensionMismatch {
                        message: format!(
                            "coordinate '{}' has length {} along '{}' but '{}' has {}",
                            name, len, dim, self.name, n
                        ),
                    })
                }
                None => {
                    return Err(AutoQcError::DimensionNotFound {
                        var: self.name.clone(),
                        dim: dim.clone(),
                    })
                }
            }
        }
        self.coords.insert(name.to_string(), coord);
        Ok(self)
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    #[must_use]
    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    #[must_use]
    pub fn attributes(&self) -> &MetadataDict {
        &self.attributes
    }

    #[must_use]
    pub fn coords(&self) -> &BTreeMap<String, Coordinate> {
        &self.coords
    }

    #[must_use]
    pub fn coord(&self, name: &str) -> Option<&Coordinate> {
        self.coords.get(name)
    }

    #[must_use]
    pub fn axis_index(&self, axis: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == axis)
    }

    #[must_use]
    pub fn has_axis(&self, axis: &str) -> bool {
        self.axis_index(axis).is_some()
    }

    #[must_use]
    pub fn axis_len(&self, axis: &str) -> Option<usize> {
        self.axis_index(axis).map(|i| self.data.shape()[i])
    }

    /// Index of a required axis
    pub fn require_axis(&self, axis: &str) -> Result<usize> {
        self.axis_index(axis)
            .ok_or_else(|| AutoQcError::DimensionNotFound {
                var: self.name.clone(),
                dim: axis.to_string(),
            })
    }

    /// Timestamps of the time coordinate named `time`, if it was decoded
    #[must_use]
    pub fn times(&self, time: &str) -> Option<&[NaiveDateTime]> {
        self.coords.get(time).and_then(Coordinate::as_times)
    }

    /// Coordinates whose dimensions all belong to `dims`
    pub(crate) fn coords_within(&self, dims: &[String]) -> Vec<(String, Coordinate)> {
        self.coords
            .iter()
            .filter(|(_, c)| c.dims.iter().all(|d| dims.contains(d)))
            .map(|(n, c)| (n.clone(), c.clone()))
            .collect()
    }

    /// Declared fill value (`_FillValue`, then `missing_value`)
    #[must_use]
    pub fn fill_value(&self) -> Option<f64> {
        self.attributes
            .get("_FillValue")
            .or_else(|| self.attributes.get("missing_value"))
            .and_then(AttrValue::as_f64)
    }

    /// Copy of the data with every non-finite entry replaced by `spval`
    #[must_use]
    pub fn normalized(&self, spval: f64) -> ArrayD<f64> {
        self.data
            .mapv(|v| if v.is_finite() { v } else { spval })
    }

    /// Standard-layout `(time, z, y, x)` copy of the data.
    ///
    /// Absent `time` or `z` axes become length-1 axes. The field must have
    /// `x` and `y` axes and no dimension outside the four configured names.
    pub fn to_tzyx(&self, axes: &AxisNames) -> Result<Array4<f64>> {
        let x = self.require_axis(&axes.x)?;
        let y = self.require_axis(&axes.y)?;
        if let Some(extra) = self.dims.iter().find(|d| axes.role_of(d).is_none()) {
            return Err(AutoQcError::UnsupportedAxis {
                var: self.name.clone(),
                dim: extra.clone(),
            });
        }
        let z = self.axis_index(&axes.z);
        let t = self.axis_index(&axes.time);

        let shape = self.data.shape();
        let nt = t.map_or(1, |i| shape[i]);
        let nz = z.map_or(1, |i| shape[i]);
        let (ny, nx) = (shape[y], shape[x]);

        let order: Vec<usize> = t.into_iter().chain(z).chain([y, x]).collect();
        let permuted = self.data.view().permuted_axes(IxDyn(&order));
        let owned = permuted.as_standard_layout().into_owned();
        Ok(owned.into_shape((nt, nz, ny, nx))?)
    }
}
