//! Entry point for the `autoqc` binary.
//! Handles CLI parsing, file loading, and dispatches the data or metadata checks.

use auto_qc::averaging::{compute_horizontal_average, compute_spatial_average, AveragingConfig};
use auto_qc::check::CheckResult;
use auto_qc::cli::{Args, Command, DataArgs, MetadataArgs};
use auto_qc::compare::compare_datasets;
use auto_qc::continuity::{check_second_derivative, ContinuityConfig};
use auto_qc::errors::AutoQcError;
use auto_qc::field::{AxisNames, DEFAULT_SPVAL};
use auto_qc::mask::{check_masksize, MaskConfig};
use auto_qc::metadata::{dict_to_json, MetadataDict};
use auto_qc::netcdf_io::{read_dataset, write_field, NetCDFOutput};
use auto_qc::output::{NamingScheme, NullOutput, Provenance, QcOutput};
use auto_qc::parallel::ParallelConfig;
use auto_qc::statistics::{
    check_outliers, check_statistics, OutlierConfig, SmoothingKind, StatisticsConfig,
};
use auto_qc::timeaxis::{check_dataset_timeaxis, TimeAxisConfig};
use clap::Parser;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// `RUST_LOG` overrides the default `info` (or `debug` when verbose).
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Global attributes of the checked file and every check result
type Report = (MetadataDict, Vec<CheckResult>);

fn run_data(args: &DataArgs) -> Result<Report, AutoQcError> {
    ParallelConfig::new(args.threads).setup_global_pool()?;

    let ds = read_dataset(&args.file)?;
    let weights = args.weights.as_deref().map(read_dataset).transpose()?;
    let field = ds.field(&args.variable)?;
    let axes = AxisNames::new(&args.x, &args.y, &args.z, &args.time);
    let spval = args
        .spval
        .or_else(|| field.fill_value())
        .unwrap_or(DEFAULT_SPVAL);
    info!("checking '{}' with missing value {:e}", field.name(), spval);

    let mut output: Box<dyn QcOutput> = match &args.outdir {
        Some(dir) => Box::new(NetCDFOutput::new(dir)?),
        None => Box::new(NullOutput),
    };
    let naming = NamingScheme::Provenance(Provenance::from_attributes(ds.attributes()));

    let mut results = Vec::new();
    let mask = MaskConfig {
        axes: axes.clone(),
        spval,
        expected_fraction: args.expected_fraction,
        band: args.band,
        check_fill_value: true,
    };
    results.push(check_masksize(field, &mask));

    let timeaxis = TimeAxisConfig {
        time: args.time.clone(),
        frequency: args.frequency.clone(),
        ..TimeAxisConfig::default()
    };
    results.push(check_dataset_timeaxis(&ds, &timeaxis));

    let continuity = ContinuityConfig {
        axes: axes.clone(),
        spval,
        ..ContinuityConfig::default()
    };
    results.push(check_second_derivative(field, &continuity));

    let statistics = StatisticsConfig {
        axes: axes.clone(),
        spval,
        granularity: args.granularity.into(),
        compare_first_year: args.compare_first_year,
        ..StatisticsConfig::default()
    };
    results.push(check_statistics(field, &naming, &statistics, output.as_mut()));

    let averaging = AveragingConfig {
        axes: axes.clone(),
        spval,
        area: args.area.clone(),
        volume: args.volume.clone(),
    };
    let preset = match SmoothingKind::from(args.smoothing) {
        SmoothingKind::Exponential => OutlierConfig::default(),
        SmoothingKind::CenteredMovingAverage => OutlierConfig::moving_average(),
    };
    let outliers = OutlierConfig {
        axes,
        window: args.window,
        threshold: args.threshold.unwrap_or(preset.threshold),
        spval,
        ..preset
    };
    match compute_horizontal_average(&ds, &args.variable, weights.as_ref(), &averaging) {
        Ok(series) => {
            let tag = naming.name("outliers", field.name(), None);
            results.push(check_outliers(&series, &tag, &outliers, output.as_mut()));
        }
        Err(e @ AutoQcError::MissingWeights { .. }) => {
            let mut skipped = CheckResult::new("check_outliers");
            skipped.not_applicable(e.to_string());
            results.push(skipped);
        }
        Err(e) => {
            let mut failed = CheckResult::new("check_outliers");
            failed.configuration(format!("cannot average '{}': {}", field.name(), e));
            results.push(failed);
        }
    }

    if let Some(dir) = &args.outdir {
        match compute_spatial_average(&ds, &args.variable, weights.as_ref(), &averaging) {
            Ok(mean) => {
                let path = dir.join(format!("{}.nc", naming.name("spatial_mean", field.name(), None)));
                write_field(&path, &mean)?;
                info!("saved spatial mean to {}", path.display());
            }
            Err(e) => warn!("spatial mean not written: {}", e),
        }
    }

    Ok((ds.attributes().clone(), results))
}

fn run_metadata(args: &MetadataArgs) -> Result<Report, AutoQcError> {
    let current = read_dataset(&args.file)?;
    let reference = read_dataset(&args.reference)?;
    let result = compare_datasets(&current, &reference, &args.time);
    Ok((current.attributes().clone(), vec![result]))
}

fn print_report(results: &[CheckResult]) {
    println!("\n===== QC Report =====");
    for result in results {
        if result.passed() {
            println!("✅ {}", result.name());
        } else {
            println!("❌ {}", result.name());
            for line in result.message().lines() {
                println!("   {}", line);
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args = Args::parse();
    init_logging(args.verbose);

    let (file, (attributes, results)) = match &args.command {
        Command::Data(data) => (data.file.clone(), run_data(data)?),
        Command::Metadata(meta) => (meta.file.clone(), run_metadata(meta)?),
    };

    let passed = results.iter().all(CheckResult::passed);
    if args.json {
        let report = json!({
            "file": file.display().to_string(),
            "passed": passed,
            "attributes": dict_to_json(&attributes),
            "checks": results.iter().map(CheckResult::to_json).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Checked {}", file.display());
        print_report(&results);
    }

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}
