//! Asynchronous access to [libnetcdf](http://www.unidata.ucar.edu/software/netcdf/) files
//!
//! Every open file gets its own operation lane. Calls on the file, and on
//! any group, dimension, variable or attribute reached through it, are
//! queued on that lane when they are made and run one at a time in that
//! order. Each call returns a [`Pending`] future which resolves to the
//! outcome of that single operation. The futures do not depend on a
//! particular async runtime.
//!
//! Values cross the boundary as [`Value`] (one element) or [`Values`]
//! (a typed buffer). They are converted to the element type of the
//! variable or attribute when written, as long as no information is lost.
//!
//! # Examples
//!
//! ```no_run
//! # async fn run() -> netcdf_async::Result<()> {
//! use netcdf_async::{DimensionLength, NcType, Value};
//!
//! let file = netcdf_async::open("crabs.nc", "c!", Some("netcdf4")).await?;
//! let root = file.root().expect("file was just opened");
//!
//! root.add_dimension("time", DimensionLength::Unlimited).await?;
//! root.add_dimension("ncrabs", 10).await?;
//! let var = root
//!     .add_variable("coolness", NcType::Int, &["time", "ncrabs"])
//!     .await?;
//! var.add_attribute("units", NcType::Char, "Kelvin").await?;
//!
//! // Queued in order, awaited together
//! let first = var.write_slice([0, 0], [1, 10], vec![42_i32; 10]);
//! let second = var.write([1, 3], 7_i32);
//! first.await?;
//! second.await?;
//!
//! assert_eq!(var.read([1, 3]).await?, Value::Int(7));
//! file.close().await?;
//! # Ok(()) }
//! ```

#![warn(missing_docs)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::wildcard_imports)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

use std::ffi::CStr;
use std::path::Path;

pub mod attribute;
pub mod dimension;
pub mod error;
pub mod extent;
pub mod file;
pub mod group;
pub mod options;
pub mod types;
pub mod variable;

mod putget;
mod queue;
mod utils;

pub use attribute::{Attribute, AttributeValue, TypedAttribute};
pub use dimension::{Dimension, DimensionLength};
pub use error::{Error, Result};
pub use extent::Index;
pub use file::{File, FileFormat};
pub use group::Group;
pub use options::{CreateFormat, Mode, Options};
pub use queue::Pending;
pub use types::{NcType, Value, Values};
pub use variable::{ChecksumMode, Chunking, DeflateInfo, Endianness, FillMode, StorageMode, Variable};

/// Opens or creates a netcdf file.
///
/// `mode` is one of `"r"` (read), `"w"` (read and write), `"c"` (create,
/// fails if the file exists) or `"c!"` (create, replacing an existing
/// file). `format` only matters when creating and is one of `"classic"`,
/// `"classic64"`, `"netcdf4"` (the default) or `"netcdf4classic"`.
///
/// Unknown modes and formats fail before anything is queued.
pub fn open<P>(path: P, mode: &str, format: Option<&str>) -> Pending<File>
where
    P: AsRef<Path>,
{
    let mode = match mode.parse::<Mode>() {
        Ok(mode) => mode,
        Err(e) => return Pending::failed(e),
    };
    let format = match format.map(str::parse::<CreateFormat>).transpose() {
        Ok(format) => format.unwrap_or_default(),
        Err(e) => return Pending::failed(e),
    };
    open_with(path, mode, format)
}

/// Opens or creates a netcdf file with typed settings
pub fn open_with<P>(path: P, mode: Mode, format: CreateFormat) -> Pending<File>
where
    P: AsRef<Path>,
{
    File::open_with(path.as_ref(), mode, format)
}

/// Version string of the linked libnetcdf
pub fn library_version() -> String {
    let _l = utils::lock();
    // SAFETY: returns a pointer to a static, nul-terminated string
    let version = unsafe { CStr::from_ptr(netcdf_sys::nc_inq_libvers()) };
    version.to_string_lossy().into_owned()
}
