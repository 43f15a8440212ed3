//! auto_qc: automated quality control of gridded climate model output
//!
//! A library of stateless checks operating on in-memory gridded fields and
//! their coordinates. Each check returns a [`CheckResult`](check::CheckResult)
//! holding a pass/fail verdict and every discrepancy it found, never stopping
//! at the first one.
//!
//! ## Checks
//!
//! - **Mask realism**: size, time constancy and depth monotonicity of the land mask
//! - **Fill values**: declared fill value and out-of-range valid data
//! - **Time axis**: record spacing against the declared output frequency
//! - **Continuity**: runs of constant values along x, y or z
//! - **Statistics**: grouped min/max/mean/std, rejecting identically zero fields
//! - **Outliers**: residuals from a smoothed baseline
//! - **Metadata**: attributes, dimensions and coordinates against a reference
//!
//! ## Module Organization
//!
//! - [`field`] and [`dataset`]: the data model
//! - [`metadata`]: attribute values and dictionaries
//! - [`check`]: accumulating check reports
//! - [`mask`], [`timeaxis`], [`continuity`], [`statistics`], [`compare`]: the checks
//! - [`averaging`]: area and volume weighted means
//! - [`output`]: the collaborator receiving summaries and outlier charts
//! - [`netcdf_io`]: NetCDF reading and writing
//! - [`parallel`]: thread pool configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//! ```rust,no_run
//! use auto_qc::prelude::*;
//! use std::path::Path;
//!
//! let ds = read_dataset(Path::new("tos_Omon.nc")).unwrap();
//! let field = ds.field("tos").unwrap();
//! let result = check_masksize(field, &MaskConfig::default());
//! let (passed, message) = result.into_parts();
//! println!("{} {}", passed, message);
//! ```

pub mod averaging;
pub mod check;
pub mod cli;
pub mod compare;
pub mod continuity;
pub mod dataset;
pub mod errors;
pub mod field;
pub mod mask;
pub mod metadata;
pub mod netcdf_io;
pub mod output;
pub mod parallel;
pub mod statistics;
pub mod timeaxis;

pub use errors::{AutoQcError, Result};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::averaging::{compute_horizontal_average, compute_spatial_average, AveragingConfig};
    pub use crate::check::{CheckResult, Finding, FindingKind};
    pub use crate::compare::{compare_dataset_coords, compare_dataset_dims, compare_datasets, compare_dict};
    pub use crate::continuity::{check_second_derivative, ContinuityConfig};
    pub use crate::dataset::Dataset;
    pub use crate::errors::{AutoQcError, Result};
    pub use crate::field::{AxisNames, Coordinate, GriddedField};
    pub use crate::mask::{check_fill_value, check_masksize, MaskConfig};
    pub use crate::metadata::{AttrValue, MetadataDict, Scalar};
    pub use crate::netcdf_io::{read_dataset, NetCDFOutput};
    pub use crate::output::{MemoryOutput, NamingScheme, NullOutput, Provenance, QcOutput};
    pub use crate::parallel::ParallelConfig;
    pub use crate::statistics::{
        check_outliers, check_statistics, OutlierConfig, StatOperation, StatisticsConfig,
    };
    pub use crate::timeaxis::{check_dataset_timeaxis, check_timeaxis, TimeAxisConfig};
}
