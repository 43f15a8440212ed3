use auto_qc::prelude::*;
use auto_qc::averaging::compute_spatial_average;
use auto_qc::netcdf_io::write_field;
use auto_qc::statistics::Granularity;
use chrono::NaiveDate;
use ndarray::{Array1, Array2, Array3};
use netcdf::create;
use std::path::Path;
use tempfile::tempdir;

const FILL: f64 = 1e20;

/// Two years of monthly sea surface temperature on a 10 x 10 grid with three
/// land columns, a slight warming trend and a warm anomaly in January 1951.
fn write_test_file(path: &Path) {
    let base = NaiveDate::from_ymd_opt(1950, 1, 1).expect("valid date");
    let days: Vec<f64> = (0..24)
        .map(|i| {
            let mid = NaiveDate::from_ymd_opt(1950 + i / 12, (i % 12) as u32 + 1, 15)
                .expect("valid date");
            (mid - base).num_days() as f64
        })
        .collect();

    let tos = Array3::from_shape_fn((24, 10, 10), |(t, j, i)| {
        if i < 3 {
            FILL
        } else {
            let anomaly = if t == 12 { 5.0 } else { 0.0 };
            20.0 + 0.1 * (i * i + j * j) as f64 + 0.01 * t as f64 + anomaly
        }
    });

    let mut file = create(path).expect("Failed to create NetCDF file");
    file.add_dimension("time", 24).expect("Failed to add dimension time");
    file.add_dimension("lat", 10).expect("Failed to add dimension lat");
    file.add_dimension("lon", 10).expect("Failed to add dimension lon");

    file.add_attribute("frequency", "mon").expect("Failed to add attribute");
    file.add_attribute("source_id", "ESM4").expect("Failed to add attribute");
    file.add_attribute("experiment_id", "piControl").expect("Failed to add attribute");
    file.add_attribute("grid_label", "gn").expect("Failed to add attribute");

    let mut time = file
        .add_variable::<f64>("time", &["time"])
        .expect("Failed to add variable time");
    time.put_attribute("units", "days since 1950-01-01").expect("Failed to add units");
    time.put(Array1::from(days).view(), ..).expect("Failed to write time");

    let mut lat = file
        .add_variable::<f64>("lat", &["lat"])
        .expect("Failed to add variable lat");
    lat.put(Array1::linspace(-45.0, 45.0, 10).view(), ..)
        .expect("Failed to write lat");

    let mut lon = file
        .add_variable::<f64>("lon", &["lon"])
        .expect("Failed to add variable lon");
    lon.put(Array1::linspace(0.0, 324.0, 10).view(), ..)
        .expect("Failed to write lon");

    let mut area = file
        .add_variable::<f64>("areacello", &["lat", "lon"])
        .expect("Failed to add variable areacello");
    area.put(Array2::from_elem((10, 10), 1.0).view(), ..)
        .expect("Failed to write areacello");

    let mut var = file
        .add_variable::<f64>("tos", &["time", "lat", "lon"])
        .expect("Failed to add variable tos");
    var.put_attribute("_FillValue", FILL).expect("Failed to add fill value");
    var.put_attribute("units", "degC").expect("Failed to add units");
    var.put(tos.view(), ..).expect("Failed to write data");
}

#[test]
fn test_netcdf_round_trip_through_every_check() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("tos_Omon.nc");
    write_test_file(&file_path);

    let ds = read_dataset(&file_path).expect("Failed to read dataset");
    assert_eq!(ds.dims()["time"], 24);
    assert_eq!(ds.attribute_str("frequency"), Some("mon"));
    let times = ds.times("time").expect("decoded time axis");
    assert_eq!(times[0].to_string(), "1950-01-15 00:00:00");

    let field = ds.field("tos").expect("tos is loaded");
    assert!(field.coord("lat").is_some());
    let spval = field.fill_value().expect("declared fill value");
    assert_eq!(spval, FILL);

    let mask = MaskConfig {
        spval,
        check_fill_value: true,
        ..MaskConfig::default()
    };
    let result = check_masksize(field, &mask);
    assert!(result.passed(), "{}", result.message());

    let result = check_dataset_timeaxis(&ds, &TimeAxisConfig::default());
    assert!(result.passed(), "{}", result.message());

    let continuity = ContinuityConfig {
        spval,
        ..ContinuityConfig::default()
    };
    let result = check_second_derivative(field, &continuity);
    assert!(result.passed(), "{}", result.message());

    let outdir = temp_dir.path().join("qc");
    let mut output = NetCDFOutput::new(&outdir).expect("Failed to create output dir");
    let naming = NamingScheme::Provenance(Provenance::from_attributes(ds.attributes()));
    let statistics = StatisticsConfig {
        spval,
        granularity: Granularity::Year,
        ..StatisticsConfig::default()
    };
    let result = check_statistics(field, &naming, &statistics, &mut output);
    assert!(result.passed(), "{}", result.message());
    assert!(outdir.join("QC_ESM4-piControl_gn_mean_tos_1950-1951.nc").exists());
    assert!(outdir.join("QC_ESM4-piControl_gn_std_tos_1950-1951.nc").exists());

    let averaging = AveragingConfig {
        spval,
        ..AveragingConfig::default()
    };
    let series = compute_horizontal_average(&ds, "tos", None, &averaging)
        .expect("Failed to average tos");
    assert_eq!(series.dims(), &["time".to_string()]);

    let outliers = OutlierConfig {
        spval,
        ..OutlierConfig::default()
    };
    let tag = naming.name("outliers", "tos", None);
    let result = check_outliers(&series, &tag, &outliers, &mut output);
    assert!(!result.passed());
    assert!(result.message().contains("1951-01-15 00:00:00"));
    assert_eq!(result.message().lines().count(), 1);
    assert!(outdir.join("QC_ESM4-piControl_gn_outliers_tos.nc").exists());
    assert_eq!(output.written().len(), 5);
}

#[test]
fn test_spatial_mean_is_written_and_reread() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("tos_Omon.nc");
    write_test_file(&file_path);
    let ds = read_dataset(&file_path).expect("Failed to read dataset");

    let averaging = AveragingConfig {
        spval: FILL,
        ..AveragingConfig::default()
    };
    let mean = compute_spatial_average(&ds, "tos", None, &averaging).expect("Failed to average");
    let mean_path = temp_dir.path().join("spatial_mean.nc");
    write_field(&mean_path, &mean).expect("Failed to write spatial mean");

    let reread = read_dataset(&mean_path).expect("Failed to reread");
    let field = reread.field("tos").expect("tos is written");
    assert_eq!(field.data().len(), 24);
    assert_eq!(
        field.attributes().get("cell_methods").and_then(AttrValue::as_str),
        Some("lon: lat: mean")
    );
    assert!(reread.attribute_str("history").is_some());
    let times = field.times("time").expect("time coordinate is written");
    assert_eq!(times.len(), 24);
    assert_eq!(times[12].to_string(), "1951-01-15 00:00:00");
}

#[test]
fn test_metadata_against_itself_and_a_modified_copy() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("tos_Omon.nc");
    write_test_file(&file_path);
    let ds = read_dataset(&file_path).expect("Failed to read dataset");

    let result = compare_datasets(&ds, &ds.clone(), "time");
    assert!(result.passed(), "{}", result.message());

    let mut changed = ds.clone();
    changed.set_attribute("experiment_id", "historical");
    let result = compare_datasets(&changed, &ds, "time");
    assert!(!result.passed());
    assert!(result
        .message()
        .contains("key experiment_id in global attributes differs between reference (piControl) and current (historical)"));
}
