//! Modes and formats used when opening or creating files

use std::fmt;
use std::str::FromStr;

use netcdf_sys::*;

use crate::error::{self, Error};

bitflags::bitflags! {
    /// Flags passed to libnetcdf when opening or creating a file
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Options: nc_type {
        /// Open with write permissions
        const WRITE = NC_WRITE;
        /// Refuse to overwrite an existing file
        const NOCLOBBER = NC_NOCLOBBER;
        /// Keep the file in memory, write on close
        const DISKLESS = NC_DISKLESS;
        /// Use 64 bit dimensions and sizes (`CDF-5` format)
        const _64BIT_DATA = NC_64BIT_DATA;
        /// Use 64 bit file offsets
        const _64BIT_OFFSET = NC_64BIT_OFFSET;
        /// Use a subset compatible with older software
        const CLASSIC = NC_CLASSIC_MODEL;
        /// Limits internal caching
        const SHARE = NC_SHARE;
        /// Use the `hdf5` storage format
        const NETCDF4 = NC_NETCDF4;
    }
}

/// How a file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `"r"`: read only
    Read,
    /// `"w"`: read and write an existing file
    Write,
    /// `"c"`: create, failing if the file exists
    Create,
    /// `"c!"`: create, replacing an existing file
    CreateOverwrite,
}

impl Mode {
    /// Mode string as accepted by [`crate::open`]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::Write => "w",
            Self::Create => "c",
            Self::CreateOverwrite => "c!",
        }
    }

    pub(crate) fn is_create(self) -> bool {
        matches!(self, Self::Create | Self::CreateOverwrite)
    }

    /// Native flags for this mode. The format only matters when creating
    pub fn options(self, format: CreateFormat) -> Options {
        match self {
            Self::Read => Options::empty(),
            Self::Write => Options::WRITE,
            Self::Create => format.options() | Options::NOCLOBBER,
            Self::CreateOverwrite => format.options(),
        }
    }
}

impl FromStr for Mode {
    type Err = Error;
    fn from_str(s: &str) -> error::Result<Self> {
        match s {
            "r" => Ok(Self::Read),
            "w" => Ok(Self::Write),
            "c" => Ok(Self::Create),
            "c!" => Ok(Self::CreateOverwrite),
            _ => Err(Error::validation("Unknown file mode")),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Container format of newly created files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreateFormat {
    /// `"classic"`: netCDF-3 classic
    Classic,
    /// `"classic64"`: netCDF-3 with 64 bit offsets
    Classic64,
    /// `"netcdf4"`: hdf5 backed netCDF-4
    #[default]
    NetCdf4,
    /// `"netcdf4classic"`: netCDF-4 restricted to the classic model
    NetCdf4Classic,
}

impl CreateFormat {
    fn options(self) -> Options {
        match self {
            Self::Classic => Options::empty(),
            Self::Classic64 => Options::_64BIT_OFFSET,
            Self::NetCdf4 => Options::NETCDF4,
            Self::NetCdf4Classic => Options::NETCDF4 | Options::CLASSIC,
        }
    }
}

impl FromStr for CreateFormat {
    type Err = Error;
    fn from_str(s: &str) -> error::Result<Self> {
        match s {
            "classic" => Ok(Self::Classic),
            "classic64" => Ok(Self::Classic64),
            "netcdf4" => Ok(Self::NetCdf4),
            "netcdf4classic" => Ok(Self::NetCdf4Classic),
            _ => Err(Error::validation("Unknown file format")),
        }
    }
}
