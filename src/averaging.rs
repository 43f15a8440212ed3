//! Area and volume weighted spatial means

use crate::dataset::Dataset;
use crate::errors::{AutoQcError, Result};
use crate::field::{is_missing, AxisNames, GriddedField, DEFAULT_SPVAL};
use ndarray::{ArrayD, IxDyn};
use tracing::debug;

/// Configuration of the spatial averages
#[derive(Debug, Clone, PartialEq)]
pub struct AveragingConfig {
    pub axes: AxisNames,
    pub spval: f64,
    /// Name of the cell area variable
    pub area: String,
    /// Name of the cell volume variable
    pub volume: String,
}

impl Default for AveragingConfig {
    fn default() -> Self {
        Self {
            axes: AxisNames::default(),
            spval: DEFAULT_SPVAL,
            area: "areacello".to_string(),
            volume: "volcello".to_string(),
        }
    }
}

fn find_weights<'a>(
    ds: &'a Dataset,
    weights: Option<&'a Dataset>,
    name: &str,
    var: &str,
) -> Result<&'a GriddedField> {
    weights
        .unwrap_or(ds)
        .field(name)
        .map_err(|_| AutoQcError::MissingWeights {
            weights: name.to_string(),
            var: var.to_string(),
        })
}

/// Spatial mean of `var`: volume weighted over x, y, z when the field has a
/// depth axis, area weighted over x, y otherwise.
///
/// Weights come from `weights` when given, else from `ds` itself.
pub fn compute_spatial_average(
    ds: &Dataset,
    var: &str,
    weights: Option<&Dataset>,
    config: &AveragingConfig,
) -> Result<GriddedField> {
    let field = ds.field(var)?;
    let axes = &config.axes;
    if field.has_axis(&axes.z) {
        let volume = find_weights(ds, weights, &config.volume, var)?;
        weighted_mean(field, volume, &[axes.x.as_str(), axes.y.as_str(), axes.z.as_str()], config.spval)
    } else {
        let area = find_weights(ds, weights, &config.area, var)?;
        weighted_mean(field, area, &[axes.x.as_str(), axes.y.as_str()], config.spval)
    }
}

/// Area weighted mean over x and y, keeping every other axis (depth included).
pub fn compute_horizontal_average(
    ds: &Dataset,
    var: &str,
    weights: Option<&Dataset>,
    config: &AveragingConfig,
) -> Result<GriddedField> {
    let field = ds.field(var)?;
    let area = find_weights(ds, weights, &config.area, var)?;
    weighted_mean(field, area, &[config.axes.x.as_str(), config.axes.y.as_str()], config.spval)
}

/// `sum(field * weights) / sum(weights)` over `axes`.
///
/// Entries where either the field or the weight is missing are left out of
/// both sums. The weights' dimensions must be a subset of the field's, with
/// the same lengths. The result keeps the field's other axes and the
/// coordinates that live on them.
pub fn weighted_mean(
    field: &GriddedField,
    weights: &GriddedField,
    axes: &[&str],
    spval: f64,
) -> Result<GriddedField> {
    for axis in axes {
        field.require_axis(axis)?;
    }
    let weight_axes: Vec<usize> = weights
        .dims()
        .iter()
        .map(|d| {
            let index = field.require_axis(d)?;
            if field.data().shape()[index] != weights.axis_len(d).unwrap_or(0) {
                return Err(AutoQcError::DimensionMismatch {
                    message: format!(
                        "weights '{}' and field '{}' differ in length along '{}'",
                        weights.name(),
                        field.name(),
                        d
                    ),
                });
            }
            Ok(index)
        })
        .collect::<Result<_>>()?;

    let kept_axes: Vec<usize> = (0..field.dims().len())
        .filter(|&i| !axes.contains(&field.dims()[i].as_str()))
        .collect();
    let kept_dims: Vec<String> = kept_axes.iter().map(|&i| field.dims()[i].clone()).collect();
    let kept_shape: Vec<usize> = kept_axes.iter().map(|&i| field.data().shape()[i]).collect();

    let mut numerator = ArrayD::<f64>::zeros(IxDyn(&kept_shape));
    let mut denominator = ArrayD::<f64>::zeros(IxDyn(&kept_shape));
    let mut kept_index = vec![0_usize; kept_axes.len()];
    let mut weight_index = vec![0_usize; weight_axes.len()];

    for (index, &value) in field.data().indexed_iter() {
        if is_missing(value, spval) {
            continue;
        }
        for (slot, &axis) in weight_index.iter_mut().zip(&weight_axes) {
            *slot = index[axis];
        }
        let weight = weights.data()[weight_index.as_slice()];
        if is_missing(weight, spval) {
            continue;
        }
        for (slot, &axis) in kept_index.iter_mut().zip(&kept_axes) {
            *slot = index[axis];
        }
        numerator[kept_index.as_slice()] += value * weight;
        denominator[kept_index.as_slice()] += weight;
    }

    if denominator.iter().any(|&w| w == 0.0) {
        return Err(AutoQcError::ZeroTotalWeight {
            var: field.name().to_string(),
        });
    }
    let mean = numerator / &denominator;
    debug!(
        "weighted mean of '{}' over {:?} by '{}'",
        field.name(),
        axes,
        weights.name()
    );

    let mut result = GriddedField::from_parts(field.name(), kept_dims.clone(), mean)?;
    for (name, coord) in field.coords_within(&kept_dims) {
        result = result.with_coord(&name, coord)?;
    }
    for (key, value) in field.attributes() {
        result = result.with_attribute(key, value.clone());
    }
    let method = axes.iter().map(|a| format!("{}:", a)).collect::<Vec<_>>().join(" ");
    Ok(result.with_attribute("cell_methods", format!("{} mean", method)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn area(values: Vec<f64>) -> GriddedField {
        let data = ArrayD::from_shape_vec(IxDyn(&[1, 2]), values).unwrap();
        GriddedField::new("areacello", &["lat", "lon"], data).unwrap()
    }

    #[test]
    fn area_weights_apply_per_timestep() {
        let data = Array::from_shape_vec((2, 1, 2), vec![1.0, 3.0, 2.0, 4.0])
            .unwrap()
            .into_dyn();
        let field = GriddedField::new("tos", &["time", "lat", "lon"], data).unwrap();
        let mean = weighted_mean(&field, &area(vec![1.0, 3.0]), &["lon", "lat"], 1e15).unwrap();
        assert_eq!(mean.dims(), &["time".to_string()]);
        assert_eq!(mean.data().as_slice().unwrap(), &[2.5, 3.5]);
    }

    #[test]
    fn missing_points_leave_both_sums() {
        let data = ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![f64::NAN, 5.0]).unwrap();
        let field = GriddedField::new("tos", &["lat", "lon"], data).unwrap();
        let mean = weighted_mean(&field, &area(vec![1.0, 3.0]), &["lon", "lat"], 1e15).unwrap();
        assert_eq!(mean.data()[IxDyn(&[])], 5.0);
    }

    #[test]
    fn zero_total_weight_is_an_error() {
        let data = ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![1.0, 5.0]).unwrap();
        let field = GriddedField::new("tos", &["lat", "lon"], data).unwrap();
        let result = weighted_mean(&field, &area(vec![0.0, 0.0]), &["lon", "lat"], 1e15);
        assert!(matches!(result, Err(AutoQcError::ZeroTotalWeight { .. })));
    }

    #[test]
    fn absent_weights_are_reported() {
        let mut ds = Dataset::new();
        let data = ArrayD::zeros(IxDyn(&[1, 2]));
        ds.add_field(GriddedField::new("tos", &["lat", "lon"], data).unwrap())
            .unwrap();
        let result = compute_spatial_average(&ds, "tos", None, &AveragingConfig::default());
        assert!(matches!(result, Err(AutoQcError::MissingWeights { .. })));
    }
}
