//! Detection of frozen or duplicated values through discrete differences
//!
//! A numerically produced field essentially never has an exactly zero
//! second difference. Runs of identical values along an axis do, which
//! points at a corrupted or mis-gridded field.

use crate::check::CheckResult;
use crate::field::{is_missing, AxisNames, GriddedField, DEFAULT_SPVAL};
use ndarray::{ArrayView1, Axis};
use tracing::debug;

/// Configuration of the continuity check
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuityConfig {
    pub axes: AxisNames,
    /// Which of x, y, z to check
    pub check_x: bool,
    pub check_y: bool,
    pub check_z: bool,
    /// Order of the discrete difference
    pub order: usize,
    pub spval: f64,
}

impl Default for ContinuityConfig {
    fn default() -> Self {
        Self {
            axes: AxisNames::default(),
            check_x: true,
            check_y: true,
            check_z: true,
            order: 2,
            spval: DEFAULT_SPVAL,
        }
    }
}

/// Coefficients of the `order`-th forward difference, `(-1)^(n-k) C(n, k)`
#[must_use]
pub fn difference_coefficients(order: usize) -> Vec<f64> {
    let mut coeffs = Vec::with_capacity(order + 1);
    let mut binom = 1.0_f64;
    for k in 0..=order {
        let sign = if (order - k) % 2 == 0 { 1.0 } else { -1.0 };
        coeffs.push(sign * binom);
        #[allow(clippy::cast_precision_loss)]
        {
            binom = binom * (order - k) as f64 / (k + 1) as f64;
        }
    }
    coeffs
}

/// Count of exactly zero differences along one lane, and of differences evaluated
fn zeros_in_lane(lane: ArrayView1<f64>, coeffs: &[f64], spval: f64) -> (usize, usize) {
    let mut zeros = 0;
    let mut evaluated = 0;
    for window in lane.windows(coeffs.len()) {
        if window.iter().any(|&v| is_missing(v, spval)) {
            continue;
        }
        let diff: f64 = window.iter().zip(coeffs).map(|(v, c)| v * c).sum();
        evaluated += 1;
        if diff == 0.0 {
            zeros += 1;
        }
    }
    (zeros, evaluated)
}

/// Check for exactly zero discrete differences along each configured axis.
pub fn check_second_derivative(field: &GriddedField, config: &ContinuityConfig) -> CheckResult {
    let mut result = CheckResult::new("check_second_derivative");
    if config.order == 0 {
        result.configuration("difference order must be at least 1");
        return result;
    }
    let coeffs = difference_coefficients(config.order);
    let axes = &config.axes;
    let selected = [
        ("x", &axes.x, config.check_x),
        ("y", &axes.y, config.check_y),
        ("z", &axes.z, config.check_z),
    ];

    for (role, name, enabled) in selected {
        if !enabled {
            continue;
        }
        let Some(index) = field.axis_index(name) else {
            if role == "x" {
                result.configuration(format!(
                    "'{}' has no '{}' axis to check for contiguous values",
                    field.name(),
                    name
                ));
            } else {
                result.not_applicable(format!("'{}' has no {} axis '{}'", field.name(), role, name));
            }
            continue;
        };
        let len = field.data().shape()[index];
        if len < coeffs.len() {
            result.not_applicable(format!(
                "{} axis '{}' has {} points, too short for a difference of order {}",
                role, name, len, config.order
            ));
            continue;
        }

        let (zeros, evaluated) = field
            .data()
            .lanes(Axis(index))
            .into_iter()
            .map(|lane| zeros_in_lane(lane, &coeffs, config.spval))
            .fold((0, 0), |acc, (z, e)| (acc.0 + z, acc.1 + e));
        debug!(zeros, evaluated, "differences along {} axis of {}", role, field.name());
        if zeros > 0 {
            result.problem(format!(
                "contiguous values along {} axis '{}' ({} of {} points)",
                role, name, zeros, evaluated
            ));
        }
    }
    result
}
