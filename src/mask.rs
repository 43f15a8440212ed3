//! Land/ocean mask checks
//!
//! The mask is never stored: it is the number of missing x-y points in each
//! `(time, depth)` slice of the field. A plausible ocean field has a surface
//! mask close to the land fraction of the Earth, the same mask at every
//! timestep, and no less land at depth than above.

use crate::check::CheckResult;
use crate::field::{is_missing, AxisNames, GriddedField, DEFAULT_SPVAL};
use crate::errors::Result;
use ndarray::{s, Array2};
use tracing::debug;

/// Fraction of the Earth's surface covered by land
pub const LAND_FRACTION: f64 = 0.29;

/// Configuration of the mask size check
#[derive(Debug, Clone, PartialEq)]
pub struct MaskConfig {
    pub axes: AxisNames,
    /// Sentinel marking missing (land) points
    pub spval: f64,
    /// Expected fraction of masked points at the surface
    pub expected_fraction: f64,
    /// Allowed band `(low, high)` around the expected mask size, as multipliers
    pub band: (f64, f64),
    /// Also run [`check_fill_value`]
    pub check_fill_value: bool,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            axes: AxisNames::default(),
            spval: DEFAULT_SPVAL,
            expected_fraction: LAND_FRACTION,
            band: (0.5, 1.5),
            check_fill_value: false,
        }
    }
}

impl MaskConfig {
    /// 30% band around the expected land fraction
    pub fn narrow() -> Self {
        Self {
            band: (0.7, 1.3),
            ..Self::default()
        }
    }

    /// 10% band around the expected land fraction
    pub fn strict() -> Self {
        Self {
            band: (0.9, 1.1),
            ..Self::default()
        }
    }

    pub fn with_axes(mut self, axes: AxisNames) -> Self {
        self.axes = axes;
        self
    }
}

/// Number of missing x-y points for every `(time, depth)` slice.
///
/// Non-finite entries are normalized to `spval` first, so NaN and sentinel
/// representations of missing data count the same.
pub fn mask_sizes(field: &GriddedField, axes: &AxisNames, spval: f64) -> Result<Array2<usize>> {
    let data = field.to_tzyx(axes)?;
    let data = data.mapv(|v| if v.is_finite() { v } else { spval });
    let (nt, nz, _, _) = data.dim();
    Ok(Array2::from_shape_fn((nt, nz), |(t, k)| {
        data.slice(s![t, k, .., ..])
            .iter()
            .filter(|&&v| v == spval)
            .count()
    }))
}

/// Check that the mask implied by missing values is plausible, constant in
/// time and non-decreasing with depth.
pub fn check_masksize(field: &GriddedField, config: &MaskConfig) -> CheckResult {
    let mut result = CheckResult::new("check_masksize");
    let axes = &config.axes;

    let masksize = match mask_sizes(field, axes, config.spval) {
        Ok(m) => m,
        Err(e) => {
            result.configuration(format!("cannot compute mask of '{}': {}", field.name(), e));
            return result;
        }
    };
    let (nt, nz) = masksize.dim();
    let nx = field.axis_len(&axes.x).unwrap_or(0);
    let ny = field.axis_len(&axes.y).unwrap_or(0);

    if nt == 0 || nz == 0 {
        result.not_applicable(format!("'{}' has an empty time or depth axis", field.name()));
        return result;
    }

    // realistic surface mask at the first record
    #[allow(clippy::cast_precision_loss)]
    let expected = config.expected_fraction * (nx * ny) as f64;
    let (low, high) = (config.band.0 * expected, config.band.1 * expected);
    let surface = masksize[[0, 0]];
    #[allow(clippy::cast_precision_loss)]
    let surface_f = surface as f64;
    debug!(surface, low, high, "surface mask size of {}", field.name());
    if !(low <= surface_f && surface_f <= high) {
        result.problem(format!(
            "mask size is not realistic: {} masked points at the surface, expected between {:.0} and {:.0}",
            surface, low, high
        ));
    }

    // constant in time
    let per_time: Vec<usize> = masksize.rows().into_iter().map(|row| row.sum()).collect();
    let changes: Vec<String> = per_time
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[0] != w[1])
        .map(|(i, _)| (i + 1).to_string())
        .collect();
    if !changes.is_empty() {
        result.problem(format!(
            "mask size is not constant in time (changes at time index {})",
            changes.join(", ")
        ));
    }

    // non-decreasing with depth
    if field.has_axis(&axes.z) {
        let first = masksize.row(0);
        let decreasing: Vec<String> = (1..nz)
            .filter(|&k| first[k] < first[k - 1])
            .map(|k| format!("{}->{}", k - 1, k))
            .collect();
        if !decreasing.is_empty() {
            result.problem(format!(
                "mask size is decreasing with depth (levels {})",
                decreasing.join(", ")
            ));
        }
    } else {
        result.not_applicable(format!(
            "'{}' has no '{}' axis, depth monotonicity not checked",
            field.name(),
            axes.z
        ));
    }

    if config.check_fill_value {
        result.merge(check_fill_value(field, config));
    }

    result
}

/// Check that a fill value is declared and that no valid value exceeds its magnitude.
pub fn check_fill_value(field: &GriddedField, config: &MaskConfig) -> CheckResult {
    let mut result = CheckResult::new("check_fill_value");
    let fill = match field.fill_value() {
        Some(fill) => fill,
        None => {
            result.configuration(format!(
                "'{}' declares no fill value, assuming {:e}",
                field.name(),
                config.spval
            ));
            config.spval
        }
    };

    let limit = fill.abs();
    let exceeding = field
        .data()
        .iter()
        .filter(|&&v| !is_missing(v, fill) && v != config.spval && v.abs() > limit)
        .count();
    if exceeding > 0 {
        result.problem(format!(
            "{} values of '{}' exceed the fill value magnitude {:e}",
            exceeding,
            field.name(),
            limit
        ));
    }
    result
}
