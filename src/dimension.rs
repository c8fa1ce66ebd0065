//! Interact with netcdf dimensions
#![allow(clippy::similar_names)]

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use netcdf_sys::*;
use parking_lot::Mutex;

use crate::error::{self, checked_with_lock, Error};
use crate::file::FileRef;
use crate::group;
use crate::queue::Pending;
use crate::utils::{name_from_bytes, short_name_to_bytes, with_lock, NameBuffer};

/// Length of a dimension as declared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionLength {
    /// Fixed, positive length
    Fixed(usize),
    /// Growable along this dimension
    Unlimited,
}

impl DimensionLength {
    /// Fixed length, `None` for unlimited dimensions
    pub fn fixed(self) -> Option<usize> {
        match self {
            Self::Fixed(n) => Some(n),
            Self::Unlimited => None,
        }
    }
}

impl From<usize> for DimensionLength {
    fn from(n: usize) -> Self {
        Self::Fixed(n)
    }
}

impl fmt::Display for DimensionLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{n}"),
            Self::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// Unlimited dimensions visible from `ncid`. Each netCDF-4 group only
/// reports its own, so the parents are searched too
pub(crate) fn unlimited_ids(mut ncid: nc_type) -> error::Result<Vec<nc_type>> {
    let mut ids = Vec::new();
    loop {
        let mut nunlim = 0;
        checked_with_lock(|| unsafe { nc_inq_unlimdims(ncid, &mut nunlim, std::ptr::null_mut()) })?;
        if nunlim > 0 {
            let mut unlim = vec![0; nunlim.try_into()?];
            checked_with_lock(|| unsafe {
                nc_inq_unlimdims(ncid, std::ptr::null_mut(), unlim.as_mut_ptr())
            })?;
            ids.extend(unlim);
        }
        match group::parent_of(ncid)? {
            Some(parent) => ncid = parent,
            None => return Ok(ids),
        }
    }
}

pub(crate) fn current_len(ncid: nc_type, dimid: nc_type) -> error::Result<usize> {
    let mut len = 0;
    checked_with_lock(|| unsafe { nc_inq_dimlen(ncid, dimid, &mut len) })?;
    Ok(len)
}

pub(crate) fn name_of(ncid: nc_type, dimid: nc_type) -> error::Result<String> {
    let mut name: NameBuffer = [0; NC_MAX_NAME as usize + 1];
    checked_with_lock(|| unsafe { nc_inq_dimname(ncid, dimid, name.as_mut_ptr().cast()) })?;
    name_from_bytes(&name)
}

fn length_of(ncid: nc_type, dimid: nc_type, unlimited: &[nc_type]) -> error::Result<DimensionLength> {
    if unlimited.contains(&dimid) {
        Ok(DimensionLength::Unlimited)
    } else {
        current_len(ncid, dimid).map(DimensionLength::Fixed)
    }
}

/// Dimensions defined directly in `ncid`
fn defined_at(ncid: nc_type) -> error::Result<Vec<nc_type>> {
    let mut ndims = 0;
    checked_with_lock(|| unsafe { nc_inq_dimids(ncid, &mut ndims, std::ptr::null_mut(), 0) })?;
    let mut dimids = vec![0; ndims.try_into()?];
    if ndims > 0 {
        checked_with_lock(|| unsafe {
            nc_inq_dimids(ncid, std::ptr::null_mut(), dimids.as_mut_ptr(), 0)
        })?;
    }
    Ok(dimids)
}

/// Name and declared length of every dimension in `ncid`. With
/// `include_parents` the dimensions of all ancestors are added, a
/// dimension in a nearer group shadows one with the same name further up
pub(crate) fn at_location(
    ncid: nc_type,
    include_parents: bool,
) -> error::Result<HashMap<String, DimensionLength>> {
    let unlimited = unlimited_ids(ncid)?;
    let mut dims = HashMap::new();
    let mut location = Some(ncid);
    while let Some(loc) = location {
        for dimid in defined_at(loc)? {
            let name = name_of(loc, dimid)?;
            if !dims.contains_key(&name) {
                let len = length_of(loc, dimid, &unlimited)?;
                dims.insert(name, len);
            }
        }
        location = if include_parents {
            group::parent_of(loc)?
        } else {
            None
        };
    }
    Ok(dims)
}

/// Looks up a dimension by name in `ncid` and its parents
pub(crate) fn find(ncid: nc_type, cname: &NameBuffer) -> error::Result<Option<nc_type>> {
    let mut dimid = 0;
    let e = with_lock(|| unsafe { nc_inq_dimid(ncid, cname.as_ptr().cast(), &mut dimid) });
    if e == NC_EBADDIM {
        return Ok(None);
    }
    error::checked(e)?;
    Ok(Some(dimid))
}

pub(crate) fn add_at(ncid: nc_type, cname: &NameBuffer, len: DimensionLength) -> error::Result<nc_type> {
    let len = match len {
        DimensionLength::Fixed(0) => {
            return Err(Error::validation(
                "Fixed dimensions must have a positive length, use DimensionLength::Unlimited",
            ))
        }
        DimensionLength::Fixed(n) => n,
        DimensionLength::Unlimited => NC_UNLIMITED,
    };
    let mut dimid = 0;
    checked_with_lock(|| unsafe { nc_def_dim(ncid, cname.as_ptr().cast(), len, &mut dimid) })?;
    Ok(dimid)
}

pub(crate) fn lookup(file: &FileRef, ncid: nc_type, name: &str) -> Pending<Dimension> {
    let cname = match short_name_to_bytes(name) {
        Ok(cname) => cname,
        Err(e) => return Pending::failed(e),
    };
    let name = name.to_owned();
    let handle = file.clone();
    file.submit("inq_dimid", move |_| {
        let dimid = find(ncid, &cname)?
            .ok_or_else(|| Error::not_found(format!("Dimension \"{name}\" not found")))?;
        Ok(Dimension {
            ncid,
            dimid,
            file: handle,
            name: Arc::new(Mutex::new(name)),
        })
    })
}

pub(crate) fn rename(file: &FileRef, ncid: nc_type, old: &str, new: &str) -> Pending<String> {
    let (cold, cnew) = match (short_name_to_bytes(old), short_name_to_bytes(new)) {
        (Ok(cold), Ok(cnew)) => (cold, cnew),
        (Err(e), _) | (_, Err(e)) => return Pending::failed(e),
    };
    let old = old.to_owned();
    let new = new.to_owned();
    file.submit("rename_dim", move |_| {
        let dimid = find(ncid, &cold)?
            .ok_or_else(|| Error::not_found(format!("Dimension \"{old}\" not found")))?;
        checked_with_lock(|| unsafe { nc_rename_dim(ncid, dimid, cnew.as_ptr().cast()) })?;
        Ok(new)
    })
}

/// Represents a netcdf dimension
#[derive(Debug, Clone)]
pub struct Dimension {
    ncid: nc_type,
    dimid: nc_type,
    file: FileRef,
    name: Arc<Mutex<String>>,
}

impl Dimension {
    /// Name of the dimension as last seen
    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    /// Current length. Unlimited dimensions grow as data is appended
    pub fn get_length(&self) -> Pending<usize> {
        let (ncid, dimid) = (self.ncid, self.dimid);
        self.file.submit("inq_dimlen", move |_| current_len(ncid, dimid))
    }

    /// Checks whether the dimension is growable
    pub fn is_unlimited(&self) -> Pending<bool> {
        let (ncid, dimid) = (self.ncid, self.dimid);
        self.file
            .submit("inq_unlimdims", move |_| Ok(unlimited_ids(ncid)?.contains(&dimid)))
    }

    /// Renames the dimension everywhere it is used, returning the new name
    pub fn set_name(&self, new: &str) -> Pending<String> {
        let cnew = match short_name_to_bytes(new) {
            Ok(cnew) => cnew,
            Err(e) => return Pending::failed(e),
        };
        let (ncid, dimid) = (self.ncid, self.dimid);
        let name = Arc::clone(&self.name);
        let new = new.to_owned();
        self.file.submit("rename_dim", move |_| {
            checked_with_lock(|| unsafe { nc_rename_dim(ncid, dimid, cnew.as_ptr().cast()) })?;
            name.lock().clone_from(&new);
            Ok(new)
        })
    }

    /// One-line description of the dimension
    pub fn inspect(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Dimension {}]", self.name.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths() {
        assert_eq!(DimensionLength::from(4), DimensionLength::Fixed(4));
        assert_eq!(DimensionLength::Fixed(4).fixed(), Some(4));
        assert_eq!(DimensionLength::Unlimited.fixed(), None);
        assert_eq!(DimensionLength::Unlimited.to_string(), "unlimited");
    }

    #[test]
    fn zero_length_is_rejected_before_any_native_call() {
        let cname = short_name_to_bytes("x").unwrap();
        let e = add_at(-1, &cname, DimensionLength::Fixed(0)).unwrap_err();
        assert!(matches!(e, Error::Validation(_)));
    }
}
