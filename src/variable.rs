//! Variables in the netcdf file
#![allow(clippy::similar_names)]

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use netcdf_sys::*;
use parking_lot::Mutex;

use crate::attribute::{self, Attribute, AttributeValue, Location, TypedAttribute};
use crate::dimension;
use crate::error::{self, checked_with_lock, Error};
use crate::extent::{self, Hyperslab, Index};
use crate::file::FileRef;
use crate::group;
use crate::putget;
use crate::queue::Pending;
use crate::types::{NcType, Value, Values};
use crate::utils::{name_from_bytes, short_name_to_bytes, with_lock, NameBuffer};

/// Enum for variables endianness
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Endianness {
    /// Native endianness, depends on machine architecture (x86_64 is Little)
    Native,
    /// Little endian
    Little,
    /// Big endian
    Big,
}

impl Endianness {
    fn from_id(id: nc_type) -> error::Result<Self> {
        match id {
            NC_ENDIAN_NATIVE => Ok(Self::Native),
            NC_ENDIAN_LITTLE => Ok(Self::Little),
            NC_ENDIAN_BIG => Ok(Self::Big),
            _ => Err(NC_EVARMETA.into()),
        }
    }

    fn id(self) -> nc_type {
        match self {
            Self::Native => NC_ENDIAN_NATIVE,
            Self::Little => NC_ENDIAN_LITTLE,
            Self::Big => NC_ENDIAN_BIG,
        }
    }
}

/// Checksum computed over each chunk
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChecksumMode {
    /// No checksum
    None,
    /// Fletcher32 checksum filter
    Fletcher32,
}

/// Layout of the data in the file
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StorageMode {
    /// One contiguous block
    Contiguous,
    /// Split in chunks of a given shape
    Chunked,
    /// Stored in the object header, only for small variables
    Compact,
}

impl StorageMode {
    fn from_id(id: nc_type) -> error::Result<Self> {
        match id {
            NC_CONTIGUOUS => Ok(Self::Contiguous),
            NC_CHUNKED => Ok(Self::Chunked),
            NC_COMPACT => Ok(Self::Compact),
            _ => Err(NC_EVARMETA.into()),
        }
    }

    fn id(self) -> nc_type {
        match self {
            Self::Contiguous => NC_CONTIGUOUS,
            Self::Chunked => NC_CHUNKED,
            Self::Compact => NC_COMPACT,
        }
    }
}

macro_rules! impl_names {
    ($t: ty, $what: literal, $($variant: ident => $name: literal),* $(,)?) => {
        impl $t {
            /// Name of the setting
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }

        impl FromStr for $t {
            type Err = Error;
            fn from_str(s: &str) -> error::Result<Self> {
                match s {
                    $($name => Ok(Self::$variant),)*
                    _ => Err(Error::validation(format!(concat!("Unknown ", $what, " \"{}\""), s))),
                }
            }
        }

        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

impl_names!(Endianness, "endianness", Native => "native", Little => "little", Big => "big");
impl_names!(ChecksumMode, "checksum mode", None => "none", Fletcher32 => "fletcher32");
impl_names!(
    StorageMode,
    "storage mode",
    Contiguous => "contiguous",
    Chunked => "chunked",
    Compact => "compact",
);

/// Storage layout, with the chunk shape when chunked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunking {
    /// Layout
    pub mode: StorageMode,
    /// Chunk length along each dimension, empty unless chunked
    pub sizes: Vec<usize>,
}

/// Compression settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeflateInfo {
    /// Byte shuffle before compressing
    pub shuffle: bool,
    /// Deflate (zlib) compression enabled
    pub deflate: bool,
    /// Compression level, between 0 and 9
    pub level: i32,
}

/// Fill value and whether unwritten elements are filled with it
#[derive(Debug, Clone, PartialEq)]
pub struct FillMode {
    /// Filling enabled
    pub enabled: bool,
    /// Value used for unwritten elements
    pub value: Value,
}

pub(crate) fn find(ncid: nc_type, cname: &NameBuffer) -> error::Result<Option<nc_type>> {
    let mut varid = 0;
    let e = with_lock(|| unsafe { nc_inq_varid(ncid, cname.as_ptr().cast(), &mut varid) });
    if e == NC_ENOTVAR {
        return Ok(None);
    }
    error::checked(e)?;
    Ok(Some(varid))
}

fn name_of(ncid: nc_type, varid: nc_type) -> error::Result<String> {
    let mut name: NameBuffer = [0; NC_MAX_NAME as usize + 1];
    checked_with_lock(|| unsafe { nc_inq_varname(ncid, varid, name.as_mut_ptr().cast()) })?;
    name_from_bytes(&name)
}

/// Builds the proxy of an existing variable
pub(crate) fn load(file: FileRef, ncid: nc_type, varid: nc_type) -> error::Result<Variable> {
    let mut xtype = 0;
    let mut ndims = 0;
    checked_with_lock(|| unsafe {
        nc_inq_var(
            ncid,
            varid,
            std::ptr::null_mut(),
            &mut xtype,
            &mut ndims,
            std::ptr::null_mut(),
            std::ptr::null_mut(),
        )
    })?;
    let mut dimids = vec![0; ndims.try_into()?];
    if ndims > 0 {
        checked_with_lock(|| unsafe { nc_inq_vardimid(ncid, varid, dimids.as_mut_ptr()) })?;
    }
    Ok(Variable {
        ncid,
        varid,
        typ: NcType::from_id(xtype)?,
        dimids: dimids.into(),
        file,
        name: Arc::new(Mutex::new(name_of(ncid, varid)?)),
    })
}

/// This struct defines a netCDF variable.
///
/// The element type and the dimensions of a variable never change, so
/// they are kept in the proxy. Everything else is read from the file
/// on each call.
#[derive(Debug, Clone)]
pub struct Variable {
    ncid: nc_type,
    varid: nc_type,
    typ: NcType,
    dimids: Arc<[nc_type]>,
    file: FileRef,
    name: Arc<Mutex<String>>,
}

impl Variable {
    fn submit<T, F>(&self, op: &'static str, f: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(nc_type, nc_type) -> error::Result<T> + Send + 'static,
    {
        let (ncid, varid) = (self.ncid, self.varid);
        self.file.submit(op, move |_| f(ncid, varid))
    }

    fn location(&self) -> Location {
        Location {
            ncid: self.ncid,
            varid: self.varid,
        }
    }

    fn rank(&self) -> usize {
        self.dimids.len()
    }

    /// Name of the variable as last seen
    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    /// Name of the variable
    pub fn get_name(&self) -> Pending<String> {
        let snapshot = Arc::clone(&self.name);
        self.submit("inq_varname", move |ncid, varid| {
            let name = name_of(ncid, varid)?;
            snapshot.lock().clone_from(&name);
            Ok(name)
        })
    }

    /// Renames the variable, returning the new name
    pub fn set_name(&self, new: &str) -> Pending<String> {
        let cnew = match short_name_to_bytes(new) {
            Ok(cnew) => cnew,
            Err(e) => return Pending::failed(e),
        };
        let snapshot = Arc::clone(&self.name);
        let new = new.to_owned();
        self.submit("rename_var", move |ncid, varid| {
            checked_with_lock(|| unsafe { nc_rename_var(ncid, varid, cnew.as_ptr().cast()) })?;
            snapshot.lock().clone_from(&new);
            Ok(new)
        })
    }

    /// Path of the owning group followed by the variable name
    pub fn get_path(&self) -> Pending<String> {
        self.submit("inq_var_path", |ncid, varid| {
            let parent = group::path_of(ncid)?;
            let name = name_of(ncid, varid)?;
            if parent == "/" {
                Ok(format!("/{name}"))
            } else {
                Ok(format!("{parent}/{name}"))
            }
        })
    }

    /// Element type of the variable
    pub fn get_type(&self) -> NcType {
        self.typ
    }

    /// Name and current length of each dimension, in order
    pub fn get_dimensions(&self) -> Pending<Vec<(String, usize)>> {
        let dimids = Arc::clone(&self.dimids);
        self.submit("inq_vardimid", move |ncid, _| {
            dimids
                .iter()
                .map(|&dimid| {
                    Ok((
                        dimension::name_of(ncid, dimid)?,
                        dimension::current_len(ncid, dimid)?,
                    ))
                })
                .collect()
        })
    }

    /// Every attribute of the variable with its stored type
    pub fn get_attributes(&self) -> Pending<HashMap<String, TypedAttribute>> {
        let loc = self.location();
        self.submit("inq_atts", move |_, _| attribute::all(loc))
    }

    /// Every attribute of the variable, values only
    pub fn get_attribute_values(&self) -> Pending<HashMap<String, AttributeValue>> {
        let loc = self.location();
        self.submit("inq_atts", move |_, _| {
            Ok(attribute::all(loc)?
                .into_iter()
                .map(|(name, att)| (name, att.value))
                .collect())
        })
    }

    /// Attribute called `name`
    pub fn get_attribute(&self, name: &str) -> Pending<Attribute> {
        attribute::lookup(&self.file, self.location(), name)
    }

    /// Adds an attribute stored as `typ`. Fails if the attribute exists
    pub fn add_attribute(
        &self,
        name: &str,
        typ: NcType,
        value: impl Into<AttributeValue>,
    ) -> Pending<HashMap<String, TypedAttribute>> {
        attribute::add(&self.file, self.location(), name, typ, value.into(), false)
    }

    /// Adds or replaces an attribute stored as `typ`
    pub fn set_attribute(
        &self,
        name: &str,
        typ: NcType,
        value: impl Into<AttributeValue>,
    ) -> Pending<HashMap<String, TypedAttribute>> {
        attribute::add(&self.file, self.location(), name, typ, value.into(), true)
    }

    /// Renames an attribute, returning the new name
    pub fn rename_attribute(&self, old: &str, new: &str) -> Pending<String> {
        attribute::rename(&self.file, self.location(), old, new)
    }

    /// Removes an attribute
    pub fn delete_attribute(&self, name: &str) -> Pending<()> {
        attribute::delete(&self.file, self.location(), name)
    }

    /// Reads a single element
    pub fn read(&self, index: impl Into<Index>) -> Pending<Value> {
        let index = match extent::point(index.into(), self.rank()) {
            Ok(index) => index,
            Err(e) => return Pending::failed(e),
        };
        let typ = self.typ;
        self.submit("get_var1", move |ncid, varid| {
            putget::get_value(ncid, varid, typ, &index)
        })
    }

    /// Writes a single element, converted to the type of the variable
    pub fn write(&self, index: impl Into<Index>, value: impl Into<Value>) -> Pending<()> {
        let index = match extent::point(index.into(), self.rank()) {
            Ok(index) => index,
            Err(e) => return Pending::failed(e),
        };
        let typ = self.typ;
        let value = value.into();
        self.submit("put_var1", move |ncid, varid| {
            putget::put_value(ncid, varid, typ, &index, value)
        })
    }

    /// Reads `count` elements starting at `start` along each dimension
    pub fn read_slice(&self, start: impl Into<Index>, count: impl Into<Index>) -> Pending<Values> {
        self.read_hyperslab(Hyperslab::new(start.into(), count.into(), None, self.rank()))
    }

    /// Writes `values` to the elements selected by `start` and `count`.
    /// Nothing is written unless `values` covers the selection exactly
    pub fn write_slice(
        &self,
        start: impl Into<Index>,
        count: impl Into<Index>,
        values: impl Into<Values>,
    ) -> Pending<()> {
        let slab = Hyperslab::new(start.into(), count.into(), None, self.rank());
        self.write_hyperslab(slab, values.into())
    }

    /// Reads `count` elements along each dimension, taking every
    /// `stride`-th element from `start`
    pub fn read_strided_slice(
        &self,
        start: impl Into<Index>,
        count: impl Into<Index>,
        stride: impl Into<Index>,
    ) -> Pending<Values> {
        self.read_hyperslab(Hyperslab::new(
            start.into(),
            count.into(),
            Some(stride.into()),
            self.rank(),
        ))
    }

    /// Writes every `stride`-th element from `start`. Elements in
    /// between keep their values
    pub fn write_strided_slice(
        &self,
        start: impl Into<Index>,
        count: impl Into<Index>,
        stride: impl Into<Index>,
        values: impl Into<Values>,
    ) -> Pending<()> {
        let slab = Hyperslab::new(start.into(), count.into(), Some(stride.into()), self.rank());
        self.write_hyperslab(slab, values.into())
    }

    fn read_hyperslab(&self, slab: error::Result<Hyperslab>) -> Pending<Values> {
        let slab = match slab {
            Ok(slab) => slab,
            Err(e) => return Pending::failed(e),
        };
        let typ = self.typ;
        self.submit("get_vars", move |ncid, varid| {
            putget::get_values(ncid, varid, typ, &slab)
        })
    }

    fn write_hyperslab(&self, slab: error::Result<Hyperslab>, values: Values) -> Pending<()> {
        let slab = match slab {
            Ok(slab) => slab,
            Err(e) => return Pending::failed(e),
        };
        if values.len() != slab.len() {
            return Pending::failed(Error::validation(format!(
                "Buffer holds {} element(s), the selection covers {}",
                values.len(),
                slab.len()
            )));
        }
        let typ = self.typ;
        self.submit("put_vars", move |ncid, varid| {
            putget::put_values(ncid, varid, typ, &slab, values)
        })
    }

    /// Byte order used in the file
    pub fn get_endianness(&self) -> Pending<Endianness> {
        self.submit("inq_var_endian", |ncid, varid| {
            let mut e = 0;
            checked_with_lock(|| unsafe { nc_inq_var_endian(ncid, varid, &mut e) })?;
            Endianness::from_id(e)
        })
    }

    /// Sets the byte order. Must be set before data is written
    pub fn set_endianness(&self, endianness: Endianness) -> Pending<()> {
        self.submit("def_var_endian", move |ncid, varid| {
            checked_with_lock(|| unsafe { nc_def_var_endian(ncid, varid, endianness.id()) })
        })
    }

    /// Checksum applied to the chunks
    pub fn get_checksum_mode(&self) -> Pending<ChecksumMode> {
        self.submit("inq_var_fletcher32", |ncid, varid| {
            let mut checksum = 0;
            checked_with_lock(|| unsafe { nc_inq_var_fletcher32(ncid, varid, &mut checksum) })?;
            Ok(if checksum == NC_NOCHECKSUM {
                ChecksumMode::None
            } else {
                ChecksumMode::Fletcher32
            })
        })
    }

    /// Enables or disables the checksum filter
    pub fn set_checksum_mode(&self, mode: ChecksumMode) -> Pending<()> {
        let checksum = match mode {
            ChecksumMode::None => NC_NOCHECKSUM,
            ChecksumMode::Fletcher32 => NC_FLETCHER32,
        };
        self.submit("def_var_fletcher32", move |ncid, varid| {
            checked_with_lock(|| unsafe { nc_def_var_fletcher32(ncid, varid, checksum) })
        })
    }

    /// Storage layout and chunk shape
    pub fn get_chunked(&self) -> Pending<Chunking> {
        let rank = self.rank();
        self.submit("inq_var_chunking", move |ncid, varid| {
            let mut storage = 0;
            let mut sizes = vec![0_usize; rank];
            checked_with_lock(|| unsafe {
                nc_inq_var_chunking(ncid, varid, &mut storage, sizes.as_mut_ptr())
            })?;
            let mode = StorageMode::from_id(storage)?;
            if mode != StorageMode::Chunked {
                sizes.clear();
            }
            Ok(Chunking { mode, sizes })
        })
    }

    /// Sets the storage layout. `sizes` gives the chunk length along
    /// each dimension and is only used for [`StorageMode::Chunked`]
    pub fn set_chunked(&self, mode: StorageMode, sizes: &[usize]) -> Pending<()> {
        let sizes = sizes.to_vec();
        if mode == StorageMode::Chunked {
            if sizes.len() != self.rank() {
                return Pending::failed(Error::validation(format!(
                    "Expected {} chunk size(s), got {}",
                    self.rank(),
                    sizes.len()
                )));
            }
            if sizes.contains(&0) {
                return Pending::failed(Error::validation("Chunk sizes must be positive"));
            }
        }
        self.submit("def_var_chunking", move |ncid, varid| {
            let ptr = if mode == StorageMode::Chunked {
                sizes.as_ptr()
            } else {
                std::ptr::null()
            };
            checked_with_lock(|| unsafe { nc_def_var_chunking(ncid, varid, mode.id(), ptr) })
        })
    }

    /// Compression settings
    pub fn get_deflate_info(&self) -> Pending<DeflateInfo> {
        self.submit("inq_var_deflate", |ncid, varid| {
            let (mut shuffle, mut deflate, mut level) = (0, 0, 0);
            checked_with_lock(|| unsafe {
                nc_inq_var_deflate(ncid, varid, &mut shuffle, &mut deflate, &mut level)
            })?;
            Ok(DeflateInfo {
                shuffle: shuffle != 0,
                deflate: deflate != 0,
                level,
            })
        })
    }

    /// Sets the compression. Levels go from 0 (none) to 9 (smallest)
    pub fn set_deflate_info(&self, shuffle: bool, deflate: bool, level: i32) -> Pending<()> {
        if !(0..=9).contains(&level) {
            return Pending::failed(Error::validation(format!(
                "Deflate level must be between 0 and 9, got {level}"
            )));
        }
        self.submit("def_var_deflate", move |ncid, varid| {
            checked_with_lock(|| unsafe {
                nc_def_var_deflate(ncid, varid, shuffle.into(), deflate.into(), level)
            })
        })
    }

    /// Value used for elements never written. Without an explicit fill
    /// value this is the default of the element type
    pub fn get_fill(&self) -> Pending<Value> {
        let typ = self.typ;
        self.submit("inq_var_fill", move |ncid, varid| {
            putget::get_fill(ncid, varid, typ).map(|(_, value)| value)
        })
    }

    /// Sets the fill value and enables filling
    pub fn set_fill(&self, value: impl Into<Value>) -> Pending<()> {
        self.set_fill_mode(value, true)
    }

    /// Fill value and whether filling is enabled
    pub fn get_fill_mode(&self) -> Pending<FillMode> {
        let typ = self.typ;
        self.submit("inq_var_fill", move |ncid, varid| {
            let (enabled, value) = putget::get_fill(ncid, varid, typ)?;
            Ok(FillMode { enabled, value })
        })
    }

    /// Sets the fill value, converted to the type of the variable, and
    /// whether filling is enabled
    pub fn set_fill_mode(&self, value: impl Into<Value>, enabled: bool) -> Pending<()> {
        let typ = self.typ;
        let value = value.into();
        self.submit("def_var_fill", move |ncid, varid| {
            putget::put_fill(ncid, varid, typ, enabled, value)
        })
    }

    /// One-line description of the variable
    pub fn inspect(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Variable {}, type {}, {} dimension(s)]",
            self.name.lock(),
            self.typ,
            self.rank()
        )
    }
}
