//! Behavioural tests of the auto_qc checks
//!
//! These exercise the public API the way a caller holding in-memory grids
//! would, one scenario per check.

use auto_qc::prelude::*;
use auto_qc::field::DEFAULT_SPVAL;
use auto_qc::statistics::detect_outliers;
use chrono::{NaiveDate, NaiveDateTime};
use ndarray::{Array, Array1, ArrayD};

/// 3 timesteps on a 10 x 10 grid whose first three columns are land
fn surface_field() -> ArrayD<f64> {
    Array::from_shape_fn((3, 10, 10), |(_, j, i)| {
        if i < 3 {
            DEFAULT_SPVAL
        } else {
            20.0 + j as f64
        }
    })
    .into_dyn()
}

fn tos(data: ArrayD<f64>) -> GriddedField {
    GriddedField::new("tos", &["time", "lat", "lon"], data).expect("valid field")
}

fn monthly(n: usize) -> Vec<NaiveDateTime> {
    (0..n)
        .map(|i| {
            NaiveDate::from_ymd_opt(1950 + (i / 12) as i32, (i % 12) as u32 + 1, 15)
                .and_then(|d| d.and_hms_opt(12, 0, 0))
                .expect("valid date")
        })
        .collect()
}

#[test]
fn test_valid_mask_passes_with_empty_message() {
    let result = check_masksize(&tos(surface_field()), &MaskConfig::default());
    assert!(result.passed());
    assert_eq!(result.message(), "");
}

#[test]
fn test_mask_mutated_at_one_timestep() {
    let mut data = surface_field();
    data[[1, 5, 5]] = DEFAULT_SPVAL;
    let result = check_masksize(&tos(data), &MaskConfig::default());
    assert!(!result.passed());
    assert!(result.message().contains("not constant in time"));
}

#[test]
fn test_nan_and_sentinel_count_as_the_same_mask() {
    let mut data = surface_field();
    data[[2, 0, 0]] = f64::NAN;
    let result = check_masksize(&tos(data), &MaskConfig::default());
    assert!(result.passed(), "{}", result.message());
}

#[test]
fn test_no_missing_values_needs_a_band_including_zero() {
    let data = Array::from_elem((2, 10, 10), 15.0).into_dyn();
    let field = tos(data);

    let result = check_masksize(&field, &MaskConfig::default());
    assert!(result.message().contains("mask size is not realistic"));

    let open_band = MaskConfig {
        band: (0.0, 1.5),
        ..MaskConfig::default()
    };
    assert!(check_masksize(&field, &open_band).passed());
}

#[test]
fn test_strict_band_is_narrower() {
    // 20 land points against an expected 29
    let data = Array::from_shape_fn((1, 10, 10), |(_, _, i)| if i < 2 { DEFAULT_SPVAL } else { 1.0 })
        .into_dyn();
    let field = tos(data);
    assert!(check_masksize(&field, &MaskConfig::default()).passed());
    assert!(!check_masksize(&field, &MaskConfig::strict()).passed());
}

#[test]
fn test_monthly_spacing_passes() {
    let result = check_timeaxis(&monthly(36), "mon", &TimeAxisConfig::default());
    assert!(result.passed(), "{}", result.message());
}

#[test]
fn test_one_irregular_gap_fails() {
    let mut times = monthly(24);
    times.remove(10);
    let result = check_timeaxis(&times, "mon", &TimeAxisConfig::default());
    assert!(!result.passed());
    assert_eq!(result.message().lines().count(), 1);
    assert!(result.message().contains("records are not correctly spaced"));
}

#[test]
fn test_dataset_frequency_attribute_drives_the_time_check() {
    let mut ds = Dataset::new().with_attribute("frequency", "mon");
    ds.add_coord("time", Coordinate::time("time", monthly(12)))
        .expect("time coordinate");
    assert!(check_dataset_timeaxis(&ds, &TimeAxisConfig::default()).passed());

    let daily = TimeAxisConfig {
        frequency: Some("day".to_string()),
        ..TimeAxisConfig::default()
    };
    assert!(!check_dataset_timeaxis(&ds, &daily).passed());
}

#[test]
fn test_constant_run_fails_naming_the_axis() {
    let mut data = Array::from_shape_fn((1, 6, 6), |(_, j, i)| (i * i + j * j) as f64).into_dyn();
    for i in 1..4 {
        data[[0, 2, i]] = 7.0;
    }
    let field = tos(data);
    let result = check_second_derivative(&field, &ContinuityConfig::default());
    assert!(!result.passed());
    assert!(result.message().contains("x axis 'lon'"));
}

#[test]
fn test_curved_field_passes() {
    let data = Array::from_shape_fn((2, 6, 6), |(_, j, i)| (i * i + j * j) as f64).into_dyn();
    let result = check_second_derivative(&tos(data), &ContinuityConfig::default());
    assert!(result.passed(), "{}", result.message());
}

/// Constant 10 with one spike at index 50 of a 100-long series
fn spiked_series() -> Array1<f64> {
    let mut series = Array1::from_elem(100, 10.0);
    series[50] = 30.0;
    series
}

#[test]
fn test_spike_is_the_only_outlier() {
    let flags = detect_outliers(spiked_series().view(), &OutlierConfig::default());
    let flagged: Vec<usize> = flags
        .iter()
        .enumerate()
        .filter(|(_, f)| **f)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(flagged, vec![50]);
}

#[test]
fn test_outlier_check_requests_a_chart() {
    let field = GriddedField::new("tos", &["time"], spiked_series().into_dyn())
        .expect("valid series")
        .with_coord("time", Coordinate::time("time", monthly(100)))
        .expect("time coordinate");
    let mut output = MemoryOutput::default();
    let result = check_outliers(&field, "QC_outliers_tos", &OutlierConfig::default(), &mut output);
    assert!(!result.passed());
    assert!(result.message().contains("1954-03-15 12:00:00"));
    assert_eq!(output.charts.len(), 1);
    assert_eq!(output.charts[0].tag, "QC_outliers_tos");
    assert_eq!(output.charts[0].outliers.iter().filter(|f| **f).count(), 1);
}

fn dict(entries: &[(&str, i64)]) -> MetadataDict {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), AttrValue::from(*v)))
        .collect()
}

#[test]
fn test_compare_dict_identical() {
    let result = compare_dict(&dict(&[("a", 1), ("b", 2)]), &dict(&[("a", 1), ("b", 2)]));
    assert!(result.passed());
    assert_eq!(result.message(), "");
}

#[test]
fn test_compare_dict_differing_value() {
    let result = compare_dict(&dict(&[("a", 1), ("b", 2)]), &dict(&[("a", 1), ("b", 3)]));
    assert!(!result.passed());
    assert!(result
        .message()
        .contains("key b differs between reference (3) and current (2)"));
}

#[test]
fn test_compare_dict_key_count_mismatch() {
    let result = compare_dict(&dict(&[("a", 1)]), &dict(&[("a", 1), ("b", 2)]));
    assert!(!result.passed());
    assert!(result
        .message()
        .contains("number of keys differs between reference (2) and current (1)"));
}

#[test]
fn test_statistics_reject_a_zero_field() {
    let field = tos(Array::zeros((3, 4, 4)).into_dyn());
    let naming = NamingScheme::Grid {
        nx: 4,
        ny: 4,
        first_timestamp: None,
    };
    let mut output = MemoryOutput::default();
    let result = check_statistics(&field, &naming, &StatisticsConfig::default(), &mut output);
    assert!(!result.passed());
    assert!(result.message().contains("max of 'tos' is zero"));
    assert!(output.summaries.iter().any(|(name, _)| name == "QC_mean_tos_4x4_static"));
}

#[test]
fn test_identical_inputs_give_identical_results() {
    let mut data = surface_field();
    data[[2, 4, 4]] = DEFAULT_SPVAL;
    let field = tos(data);
    let config = MaskConfig::default();
    assert_eq!(
        check_masksize(&field, &config).into_parts(),
        check_masksize(&field, &config).into_parts()
    );

    let continuity = ContinuityConfig::default();
    assert_eq!(
        check_second_derivative(&field, &continuity).into_parts(),
        check_second_derivative(&field, &continuity).into_parts()
    );
}

#[test]
fn test_error_display() {
    let err = AutoQcError::VariableNotFound {
        var: "tos".to_string(),
    };
    assert!(err.to_string().contains("Variable 'tos' not found"));

    let err = AutoQcError::DimensionNotFound {
        var: "tos".to_string(),
        dim: "lev".to_string(),
    };
    assert_eq!(err.to_string(), "Dimension 'lev' not found in variable 'tos'");
}
