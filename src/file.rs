//! Open, create, and close netcdf files
#![allow(clippy::similar_names)]

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use netcdf_sys::*;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{self, checked_with_lock, Error};
use crate::group::Group;
use crate::options::{CreateFormat, Mode, Options};
use crate::queue::{OperationQueue, Pending};
use crate::utils::{get_ffi_from_path, with_lock};

/// Native file handle, closed when dropped
#[derive(Debug)]
pub(crate) struct RawFile {
    ncid: nc_type,
}

impl RawFile {
    fn open(path: &[u8], options: Options) -> error::Result<Self> {
        let mut ncid: nc_type = 0;
        checked_with_lock(|| unsafe { nc_open(path.as_ptr().cast(), options.bits(), &mut ncid) })?;
        Ok(Self { ncid })
    }

    fn create(path: &[u8], options: Options) -> error::Result<Self> {
        let mut ncid: nc_type = -1;
        checked_with_lock(|| unsafe {
            nc_create(path.as_ptr().cast(), options.bits(), &mut ncid)
        })?;
        Ok(Self { ncid })
    }

    pub(crate) fn ncid(&self) -> nc_type {
        self.ncid
    }

    fn format(&self) -> error::Result<FileFormat> {
        let mut format = 0;
        checked_with_lock(|| unsafe {
            nc_inq_format_extended(self.ncid, &mut format, std::ptr::null_mut())
        })?;
        Ok(FileFormat::from_id(format))
    }

    /// Releases the handle, reporting failures of `nc_close`
    pub(crate) fn close(self) -> error::Result<()> {
        let ncid = self.ncid;
        std::mem::forget(self);
        checked_with_lock(|| unsafe { nc_close(ncid) })
    }
}

impl Drop for RawFile {
    fn drop(&mut self) {
        let ncid = self.ncid;
        if let Err(e) = error::checked(with_lock(|| unsafe { nc_close(ncid) })) {
            warn!(ncid, error = %e, "closing dropped file failed");
        }
    }
}

/// Container format detected when the file was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum FileFormat {
    Unknown,
    NetCdf3,
    Hdf5,
    Hdf4,
    PNetCdf,
    Dap2,
    Dap4,
    Udf0,
    Udf1,
    Zarr,
    Undefined,
}

impl FileFormat {
    fn from_id(id: nc_type) -> Self {
        match id {
            NC_FORMATX_UNDEFINED => Self::Unknown,
            NC_FORMATX_NC3 => Self::NetCdf3,
            NC_FORMATX_NC_HDF5 => Self::Hdf5,
            NC_FORMATX_NC_HDF4 => Self::Hdf4,
            NC_FORMATX_PNETCDF => Self::PNetCdf,
            NC_FORMATX_DAP2 => Self::Dap2,
            NC_FORMATX_DAP4 => Self::Dap4,
            NC_FORMATX_UDF0 => Self::Udf0,
            NC_FORMATX_UDF1 => Self::Udf1,
            NC_FORMATX_NCZARR => Self::Zarr,
            _ => Self::Undefined,
        }
    }

    /// Short name of the format
    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::NetCdf3 => "netcdf3",
            Self::Hdf5 => "hdf5",
            Self::Hdf4 => "hdf4",
            Self::PNetCdf => "pnetcdf",
            Self::Dap2 => "dap2",
            Self::Dap4 => "dap4",
            Self::Udf0 => "udf0",
            Self::Udf1 => "udf1",
            Self::Zarr => "zarr",
            Self::Undefined => "?",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// State shared by a file and the lane serving it
#[derive(Debug)]
pub(crate) struct FileShared {
    queue: OperationQueue,
    closed: AtomicBool,
}

impl FileShared {
    fn submit<T, F>(&self, op: &'static str, f: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(nc_type) -> error::Result<T> + Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            return Pending::failed(Error::closed());
        }
        self.queue.enqueue(op, move |lane| f(lane.ncid()?))
    }
}

/// Non-owning handle to an open file, held by every proxy
#[derive(Debug, Clone)]
pub(crate) struct FileRef(Weak<FileShared>);

impl FileRef {
    /// Queues `f` on the file's lane. `f` receives the `ncid` of the file
    pub(crate) fn submit<T, F>(&self, op: &'static str, f: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(nc_type) -> error::Result<T> + Send + 'static,
    {
        match self.0.upgrade() {
            Some(shared) => shared.submit(op, f),
            None => Pending::failed(Error::closed()),
        }
    }
}

/// An open netcdf file.
///
/// All operations on the file and on the groups, dimensions, variables
/// and attributes reached through it are executed one at a time, in the
/// order they were called. Dropping the file closes it once the queued
/// operations are done.
#[derive(Debug)]
pub struct File {
    shared: Arc<FileShared>,
    name: String,
    mode: Mode,
    format: FileFormat,
    root: Mutex<Option<Group>>,
}

impl File {
    pub(crate) fn open_with(path: &Path, mode: Mode, format: CreateFormat) -> Pending<Self> {
        let cpath = match get_ffi_from_path(path) {
            Ok(cpath) => cpath,
            Err(e) => return Pending::failed(e),
        };
        let queue = match OperationQueue::spawn() {
            Ok(queue) => queue,
            Err(e) => return Pending::failed(e),
        };
        let name = path.to_string_lossy().into_owned();
        let options = mode.options(format);
        let shared = Arc::new(FileShared {
            queue: queue.clone(),
            closed: AtomicBool::new(false),
        });

        queue.enqueue("open", move |lane| {
            let raw = if mode.is_create() {
                RawFile::create(&cpath, options)?
            } else {
                RawFile::open(&cpath, options)?
            };
            let format = raw.format()?;
            let ncid = raw.ncid();
            lane.install(raw);
            debug!(ncid, path = %name, %mode, %format, "opened file");

            let root = Group::new(ncid, FileRef(Arc::downgrade(&shared)), "/".into());
            Ok(Self {
                shared,
                name,
                mode,
                format,
                root: Mutex::new(Some(root)),
            })
        })
    }

    /// Path used to open the file
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mode the file was opened with
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Detected container format
    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Root group, `None` once the file is closed
    pub fn root(&self) -> Option<Group> {
        self.root.lock().clone()
    }

    /// Closes the file after every operation queued before this call.
    /// Operations queued afterwards, and a second close, fail
    pub fn close(&self) -> Pending<()> {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return Pending::failed(Error::closed());
        }
        self.root.lock().take();
        let name = self.name.clone();
        self.shared.queue.enqueue("close", move |lane| {
            let raw = lane.release()?;
            debug!(ncid = raw.ncid(), path = %name, "closing file");
            raw.close()
        })
    }

    /// Leaves define mode, required by classic files before data is written
    pub fn data_mode(&self) -> Pending<()> {
        self.shared.submit("enddef", |ncid| {
            checked_with_lock(|| unsafe { nc_enddef(ncid) })
        })
    }

    /// Enters define mode to add dimensions, variables or attributes to
    /// a classic file
    pub fn define_mode(&self) -> Pending<()> {
        self.shared.submit("redef", |ncid| {
            checked_with_lock(|| unsafe { nc_redef(ncid) })
        })
    }

    /// Flushes buffered data to disk
    pub fn sync(&self) -> Pending<()> {
        self.shared.submit("sync", |ncid| {
            checked_with_lock(|| unsafe { nc_sync(ncid) })
        })
    }

    /// One-line description of the file
    pub fn inspect(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_closed() {
            write!(f, "[Closed {} file {}]", self.format, self.name)
        } else {
            write!(f, "[{} file {}]", self.format, self.name)
        }
    }
}
