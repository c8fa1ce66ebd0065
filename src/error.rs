//! Errors that can appear when interacting with netcdf files.
//! Native status codes are folded into a small set of failure kinds,
//! the message of the native library is kept verbatim.

use std::ffi::CStr;

use netcdf_sys::*;

use crate::types::NcType;
use crate::utils::with_lock;

/// Failure kinds surfaced by every operation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing file, group, variable, dimension or attribute
    #[error("{0}")]
    NotFound(String),
    /// Missing or invalid argument, or an operation invalid in the current mode
    #[error("{0}")]
    Validation(String),
    /// Value can not be represented as the requested element type
    #[error("{0}")]
    TypeMismatch(String),
    /// Operation on a closed file, double close or double definition
    #[error("{0}")]
    Usage(String),
    /// Any other status returned by libnetcdf
    #[error("{message} (status {code})")]
    Native {
        /// Status code returned by libnetcdf
        code: nc_type,
        /// Message from `nc_strerror`
        message: String,
    },
}

/// Result type used in this crate
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn closed() -> Self {
        Self::Usage("File already closed".into())
    }

    pub(crate) fn type_mismatch(expected: NcType, found: impl std::fmt::Display) -> Self {
        Self::TypeMismatch(format!("Can not represent {found} as {expected}"))
    }

    pub(crate) fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Status code of the native library, if this error came from it
    pub fn native_code(&self) -> Option<nc_type> {
        match self {
            Self::Native { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Message of libnetcdf for the given status
pub(crate) fn strerror(code: nc_type) -> String {
    let _l = crate::utils::lock();
    unsafe {
        let cmsg = nc_strerror(code);
        if cmsg.is_null() {
            return format!("Unknown error {code}");
        }
        CStr::from_ptr(cmsg).to_string_lossy().into_owned()
    }
}

impl From<nc_type> for Error {
    fn from(code: nc_type) -> Self {
        let message = strerror(code);
        match code {
            libc::ENOENT | NC_ENOTVAR | NC_EBADDIM | NC_ENOTATT | NC_EBADGRPID | NC_ENOGRP => {
                Self::NotFound(message)
            }
            NC_ENAMEINUSE | NC_EEXIST | NC_EPERM => Self::Usage(message),
            NC_EINDEFINE | NC_ENOTINDEFINE | NC_EINVAL | NC_EINVALCOORDS | NC_EEDGE
            | NC_ESTRIDE | NC_EMAXNAME | NC_EBADNAME => Self::Validation(message),
            NC_EBADTYPE | NC_ERANGE | NC_ECHAR => Self::TypeMismatch(message),
            code => Self::Native { code, message },
        }
    }
}

impl From<std::ffi::NulError> for Error {
    fn from(_: std::ffi::NulError) -> Self {
        Self::validation("String contains an interior nul byte")
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Self::validation("Name is not valid utf-8")
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(_: std::num::TryFromIntError) -> Self {
        Self::validation("Size does not fit the native integer type")
    }
}

/// Turn a status code into a `Result`
pub(crate) fn checked(err: nc_type) -> Result<()> {
    if err != NC_NOERR {
        return Err(err.into());
    }
    Ok(())
}

/// Runs `f` under the library lock and checks the returned status
pub(crate) fn checked_with_lock<F: FnOnce() -> nc_type>(f: F) -> Result<()> {
    checked(with_lock(f))
}
