//! Metadata and dataset structure comparison against a reference
//!
//! Every discrepancy is recorded; nothing stops at the first one.

use crate::check::CheckResult;
use crate::dataset::Dataset;
use crate::field::{CoordValues, Coordinate};
use crate::metadata::MetadataDict;
use tracing::debug;

/// Compare two attribute dictionaries.
///
/// The key counts and key sets must agree, and every shared scalar value must
/// match. Array values are never compared.
pub fn compare_dict(current: &MetadataDict, reference: &MetadataDict) -> CheckResult {
    let mut result = CheckResult::new("compare_dict");
    compare_into(&mut result, current, reference, "");
    result
}

fn compare_into(result: &mut CheckResult, current: &MetadataDict, reference: &MetadataDict, scope: &str) {
    if current.len() != reference.len() {
        result.problem(format!(
            "number of keys{} differs between reference ({}) and current ({})",
            scope,
            reference.len(),
            current.len()
        ));
    }
    let missing: Vec<&str> = reference
        .keys()
        .filter(|k| !current.contains_key(*k))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        result.problem(format!("keys{} missing from current: {}", scope, missing.join(", ")));
    }
    let extra: Vec<&str> = current
        .keys()
        .filter(|k| !reference.contains_key(*k))
        .map(String::as_str)
        .collect();
    if !extra.is_empty() {
        result.problem(format!("keys{} missing from reference: {}", scope, extra.join(", ")));
    }
    for (key, value) in current {
        let Some(expected) = reference.get(key) else { continue };
        if !value.matches(expected) {
            result.problem(format!(
                "key {}{} differs between reference ({}) and current ({})",
                key, scope, expected, value
            ));
        }
    }
}

/// Compare dimension names and lengths.
pub fn compare_dataset_dims(current: &Dataset, reference: &Dataset) -> CheckResult {
    let mut result = CheckResult::new("compare_dataset_dims");
    for (dim, &len) in reference.dims() {
        match current.dims().get(dim) {
            None => result.problem(format!("dimension '{}' is missing from current", dim)),
            Some(&found) if found != len => result.problem(format!(
                "dimension '{}' differs between reference ({}) and current ({})",
                dim, len, found
            )),
            Some(_) => {}
        }
    }
    for dim in current.dims().keys() {
        if !reference.dims().contains_key(dim) {
            result.problem(format!("dimension '{}' is missing from reference", dim));
        }
    }
    result
}

fn same_values(a: &Coordinate, b: &Coordinate) -> bool {
    match (&a.values, &b.values) {
        (CoordValues::Numeric(x), CoordValues::Numeric(y)) => {
            x.shape() == y.shape()
                && x.iter()
                    .zip(y.iter())
                    .all(|(p, q)| p == q || (p.is_nan() && q.is_nan()))
        }
        (CoordValues::Time(x), CoordValues::Time(y)) => x == y,
        _ => false,
    }
}

/// Compare coordinate names and values.
///
/// Coordinates must be identical in dims, shape and values, except for
/// `time_name` which only has to be present on both sides.
pub fn compare_dataset_coords(current: &Dataset, reference: &Dataset, time_name: &str) -> CheckResult {
    let mut result = CheckResult::new("compare_dataset_coords");
    for (name, expected) in reference.coords() {
        let Some(found) = current.coord(name) else {
            result.problem(format!("coordinate '{}' is missing from current", name));
            continue;
        };
        if name == time_name {
            continue;
        }
        if found.dims != expected.dims {
            result.problem(format!(
                "coordinate '{}' lies on {:?} in reference but {:?} in current",
                name, expected.dims, found.dims
            ));
        } else if found.shape() != expected.shape() {
            result.problem(format!(
                "coordinate '{}' has shape {:?} in reference but {:?} in current",
                name,
                expected.shape(),
                found.shape()
            ));
        } else if !same_values(found, expected) {
            result.problem(format!("coordinate '{}' values differ from reference", name));
        }
    }
    for name in current.coords().keys() {
        if reference.coord(name).is_none() {
            result.problem(format!("coordinate '{}' is missing from reference", name));
        }
    }
    result
}

/// Full structural comparison: global attributes, dims, coords and the
/// attributes of every variable present in both datasets.
pub fn compare_datasets(current: &Dataset, reference: &Dataset, time_name: &str) -> CheckResult {
    let mut result = CheckResult::new("compare_datasets");
    compare_into(&mut result, current.attributes(), reference.attributes(), " in global attributes");
    result.merge(compare_dataset_dims(current, reference));
    result.merge(compare_dataset_coords(current, reference, time_name));

    for (name, expected) in reference.variables() {
        match current.variables().get(name) {
            None => result.problem(format!("variable '{}' is missing from current", name)),
            Some(found) => {
                let scope = format!(" of '{}'", name);
                compare_into(&mut result, found.attributes(), expected.attributes(), &scope);
            }
        }
    }
    for name in current.variables().keys() {
        if !reference.variables().contains_key(name) {
            result.problem(format!("variable '{}' is missing from reference", name));
        }
    }
    debug!(
        findings = result.findings().len(),
        "compared {} variables against reference",
        reference.variables().len()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::GriddedField;
    use crate::metadata::AttrValue;
    use ndarray::{ArrayD, IxDyn};

    fn dict(entries: &[(&str, AttrValue)]) -> MetadataDict {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn arrays_are_exempt() {
        let current = dict(&[("valid_range", AttrValue::from(vec![0.0, 1.0]))]);
        let reference = dict(&[("valid_range", AttrValue::from(vec![5.0]))]);
        assert!(compare_dict(&current, &reference).passed());
    }

    #[test]
    fn numeric_kinds_compare_by_value() {
        let current = dict(&[("a", AttrValue::from(1_i64))]);
        let reference = dict(&[("a", AttrValue::from(1.0))]);
        assert!(compare_dict(&current, &reference).passed());
    }

    #[test]
    fn missing_keys_are_named() {
        let current = dict(&[("a", AttrValue::from(1_i64))]);
        let reference = dict(&[("b", AttrValue::from(1_i64))]);
        let message = compare_dict(&current, &reference).message();
        assert!(message.contains("keys missing from current: b"));
        assert!(message.contains("keys missing from reference: a"));
    }

    fn dataset(lon: Vec<f64>) -> Dataset {
        let n = lon.len();
        let mut ds = Dataset::new().with_attribute("source_id", "ESM4");
        let field = GriddedField::new("tos", &["lon"], ArrayD::zeros(IxDyn(&[n])))
            .unwrap()
            .with_attribute("units", "degC")
            .with_coord("lon", Coordinate::numeric("lon", lon))
            .unwrap();
        ds.add_field(field).unwrap();
        ds
    }

    #[test]
    fn identical_datasets_pass() {
        let a = dataset(vec![0.0, 1.0]);
        let result = compare_datasets(&a, &a.clone(), "time");
        assert!(result.passed(), "{}", result.message());
    }

    #[test]
    fn coordinate_values_must_match() {
        let result = compare_dataset_coords(&dataset(vec![0.0, 1.0]), &dataset(vec![0.0, 2.0]), "time");
        assert!(result.message().contains("coordinate 'lon' values differ"));
    }

    #[test]
    fn dimension_lengths_must_match() {
        let result = compare_dataset_dims(&dataset(vec![0.0]), &dataset(vec![0.0, 1.0]));
        assert!(result
            .message()
            .contains("dimension 'lon' differs between reference (2) and current (1)"));
    }
}
