//! All netcdf items belong in the root group, which can
//! be interacted with to get the underlying data

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use netcdf_sys::*;
use parking_lot::Mutex;

use crate::attribute::{self, Attribute, AttributeValue, Location, TypedAttribute};
use crate::dimension::{self, Dimension, DimensionLength};
use crate::error::{self, checked_with_lock, Error};
use crate::file::FileRef;
use crate::queue::Pending;
use crate::types::NcType;
use crate::utils::{name_from_bytes, short_name_to_bytes, with_lock, NameBuffer};
use crate::variable::{self, Variable};

/// Parent of `ncid`, `None` for the root group
pub(crate) fn parent_of(ncid: nc_type) -> error::Result<Option<nc_type>> {
    let mut parent = 0;
    let e = with_lock(|| unsafe { nc_inq_grp_parent(ncid, &mut parent) });
    if e == NC_ENOGRP {
        return Ok(None);
    }
    error::checked(e)?;
    Ok(Some(parent))
}

pub(crate) fn name_of(ncid: nc_type) -> error::Result<String> {
    let mut name: NameBuffer = [0; NC_MAX_NAME as usize + 1];
    checked_with_lock(|| unsafe { nc_inq_grpname(ncid, name.as_mut_ptr().cast()) })?;
    name_from_bytes(&name)
}

/// Full path of a group, `/` for the root
pub(crate) fn path_of(mut ncid: nc_type) -> error::Result<String> {
    let mut stems = Vec::new();
    while let Some(parent) = parent_of(ncid)? {
        stems.push(name_of(ncid)?);
        ncid = parent;
    }
    stems.reverse();
    Ok(format!("/{}", stems.join("/")))
}

fn subgroup_ids(ncid: nc_type) -> error::Result<Vec<nc_type>> {
    let mut ngrps = 0;
    checked_with_lock(|| unsafe { nc_inq_grps(ncid, &mut ngrps, std::ptr::null_mut()) })?;
    let mut grps = vec![0; ngrps.try_into()?];
    if ngrps > 0 {
        checked_with_lock(|| unsafe { nc_inq_grps(ncid, std::ptr::null_mut(), grps.as_mut_ptr()) })?;
    }
    Ok(grps)
}

/// Main component of the netcdf format. Holds all variables,
/// attributes, and dimensions. A group can always see the parents
/// items, but a parent can not access a child's items.
///
/// A `Group` is a cheap handle: cloning it does not touch the file,
/// and it stays usable only while the file is open.
#[derive(Debug, Clone)]
pub struct Group {
    ncid: nc_type,
    file: FileRef,
    name: Arc<Mutex<String>>,
}

impl Group {
    pub(crate) fn new(ncid: nc_type, file: FileRef, name: String) -> Self {
        Self {
            ncid,
            file,
            name: Arc::new(Mutex::new(name)),
        }
    }

    /// Queues `f` with this group's `ncid`
    fn submit<T, F>(&self, op: &'static str, f: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(nc_type) -> error::Result<T> + Send + 'static,
    {
        let ncid = self.ncid;
        self.file.submit(op, move |_| f(ncid))
    }

    /// Name of the group, `/` for the root
    pub fn get_name(&self) -> Pending<String> {
        let snapshot = Arc::clone(&self.name);
        self.submit("inq_grpname", move |ncid| {
            let name = name_of(ncid)?;
            snapshot.lock().clone_from(&name);
            Ok(name)
        })
    }

    /// Renames the group, returning the new name
    pub fn set_name(&self, new: &str) -> Pending<String> {
        let cnew = match short_name_to_bytes(new) {
            Ok(cnew) => cnew,
            Err(e) => return Pending::failed(e),
        };
        let snapshot = Arc::clone(&self.name);
        let new = new.to_owned();
        self.submit("rename_grp", move |ncid| {
            checked_with_lock(|| unsafe { nc_rename_grp(ncid, cnew.as_ptr().cast()) })?;
            snapshot.lock().clone_from(&new);
            Ok(new)
        })
    }

    /// Full path of the group, computed from the current names
    pub fn get_path(&self) -> Pending<String> {
        self.submit("inq_grp_path", path_of)
    }

    /// Direct child group called `name`
    pub fn get_subgroup(&self, name: &str) -> Pending<Group> {
        if name.is_empty() {
            return Pending::failed(Error::validation("Expected subgroup name"));
        }
        let cname = match short_name_to_bytes(name) {
            Ok(cname) => cname,
            Err(e) => return Pending::failed(e),
        };
        let name = name.to_owned();
        let file = self.file.clone();
        self.submit("inq_grp_ncid", move |ncid| {
            let mut grpid = 0;
            let e = with_lock(|| unsafe { nc_inq_grp_ncid(ncid, cname.as_ptr().cast(), &mut grpid) });
            if e == NC_ENOGRP || e == NC_ENOTNC4 {
                return Err(Error::not_found(format!("Bad or missing group \"{name}\"")));
            }
            error::checked(e)?;
            Ok(Group::new(grpid, file, name))
        })
    }

    /// Every direct child group, by name
    pub fn get_subgroups(&self) -> Pending<HashMap<String, Group>> {
        let file = self.file.clone();
        self.submit("inq_grps", move |ncid| {
            subgroup_ids(ncid)?
                .into_iter()
                .map(|grpid| {
                    let name = name_of(grpid)?;
                    Ok((name.clone(), Group::new(grpid, file.clone(), name)))
                })
                .collect()
        })
    }

    /// Creates a child group
    pub fn add_subgroup(&self, name: &str) -> Pending<Group> {
        let cname = match short_name_to_bytes(name) {
            Ok(cname) => cname,
            Err(e) => return Pending::failed(e),
        };
        let name = name.to_owned();
        let file = self.file.clone();
        self.submit("def_grp", move |ncid| {
            let mut grpid = 0;
            checked_with_lock(|| unsafe { nc_def_grp(ncid, cname.as_ptr().cast(), &mut grpid) })?;
            Ok(Group::new(grpid, file, name))
        })
    }

    /// Dimensions of this group with their declared length. With
    /// `include_parents` the dimensions visible from the parents are
    /// included as well
    pub fn get_dimensions(&self, include_parents: bool) -> Pending<HashMap<String, DimensionLength>> {
        self.submit("inq_dimids", move |ncid| dimension::at_location(ncid, include_parents))
    }

    /// Dimension called `name`, in this group or a parent
    pub fn get_dimension(&self, name: &str) -> Pending<Dimension> {
        dimension::lookup(&self.file, self.ncid, name)
    }

    /// Adds a dimension, fixed or unlimited
    pub fn add_dimension(
        &self,
        name: &str,
        len: impl Into<DimensionLength>,
    ) -> Pending<HashMap<String, DimensionLength>> {
        let cname = match short_name_to_bytes(name) {
            Ok(cname) => cname,
            Err(e) => return Pending::failed(e),
        };
        let len = len.into();
        let name = name.to_owned();
        self.submit("def_dim", move |ncid| {
            dimension::add_at(ncid, &cname, len)?;
            Ok(HashMap::from([(name, len)]))
        })
    }

    /// Renames a dimension, returning the new name
    pub fn rename_dimension(&self, old: &str, new: &str) -> Pending<String> {
        dimension::rename(&self.file, self.ncid, old, new)
    }

    /// Every variable of this group, by name
    pub fn get_variables(&self) -> Pending<HashMap<String, Variable>> {
        let file = self.file.clone();
        self.submit("inq_varids", move |ncid| {
            let mut nvars = 0;
            checked_with_lock(|| unsafe { nc_inq_varids(ncid, &mut nvars, std::ptr::null_mut()) })?;
            let mut varids = vec![0; nvars.try_into()?];
            if nvars > 0 {
                checked_with_lock(|| unsafe {
                    nc_inq_varids(ncid, std::ptr::null_mut(), varids.as_mut_ptr())
                })?;
            }
            varids
                .into_iter()
                .map(|varid| {
                    let var = variable::load(file.clone(), ncid, varid)?;
                    Ok((var.name(), var))
                })
                .collect()
        })
    }

    /// Variable called `name` in this group
    pub fn get_variable(&self, name: &str) -> Pending<Variable> {
        let cname = match short_name_to_bytes(name) {
            Ok(cname) => cname,
            Err(e) => return Pending::failed(e),
        };
        let name = name.to_owned();
        let file = self.file.clone();
        self.submit("inq_varid", move |ncid| {
            let varid = variable::find(ncid, &cname)?
                .ok_or_else(|| Error::not_found(format!("Variable \"{name}\" not found")))?;
            variable::load(file, ncid, varid)
        })
    }

    /// Adds a variable of type `typ` spanning the named dimensions. An
    /// empty dimension list gives a scalar variable
    pub fn add_variable(&self, name: &str, typ: NcType, dims: &[&str]) -> Pending<Variable> {
        let cname = match short_name_to_bytes(name) {
            Ok(cname) => cname,
            Err(e) => return Pending::failed(e),
        };
        let dims = match dims
            .iter()
            .map(|d| short_name_to_bytes(d).map(|c| (c, (*d).to_owned())))
            .collect::<error::Result<Vec<_>>>()
        {
            Ok(dims) => dims,
            Err(e) => return Pending::failed(e),
        };
        let file = self.file.clone();
        self.submit("def_var", move |ncid| {
            let dimids = dims
                .iter()
                .map(|(cdim, dim)| {
                    dimension::find(ncid, cdim)?
                        .ok_or_else(|| Error::not_found(format!("Dimension \"{dim}\" not found")))
                })
                .collect::<error::Result<Vec<_>>>()?;
            let ndims: nc_type = dimids.len().try_into()?;
            let mut varid = 0;
            checked_with_lock(|| unsafe {
                nc_def_var(
                    ncid,
                    cname.as_ptr().cast(),
                    typ.id(),
                    ndims,
                    dimids.as_ptr(),
                    &mut varid,
                )
            })?;
            variable::load(file, ncid, varid)
        })
    }

    /// Every attribute of the group with its stored type
    pub fn get_attributes(&self) -> Pending<HashMap<String, TypedAttribute>> {
        self.submit("inq_atts", |ncid| attribute::all(Location::global(ncid)))
    }

    /// Every attribute of the group, values only
    pub fn get_attribute_values(&self) -> Pending<HashMap<String, AttributeValue>> {
        self.submit("inq_atts", |ncid| {
            Ok(attribute::all(Location::global(ncid))?
                .into_iter()
                .map(|(name, att)| (name, att.value))
                .collect())
        })
    }

    /// Attribute called `name`
    pub fn get_attribute(&self, name: &str) -> Pending<Attribute> {
        attribute::lookup(&self.file, Location::global(self.ncid), name)
    }

    /// Adds an attribute stored as `typ`. Fails if the attribute exists
    pub fn add_attribute(
        &self,
        name: &str,
        typ: NcType,
        value: impl Into<AttributeValue>,
    ) -> Pending<HashMap<String, TypedAttribute>> {
        let loc = Location::global(self.ncid);
        attribute::add(&self.file, loc, name, typ, value.into(), false)
    }

    /// Adds or replaces an attribute stored as `typ`
    pub fn set_attribute(
        &self,
        name: &str,
        typ: NcType,
        value: impl Into<AttributeValue>,
    ) -> Pending<HashMap<String, TypedAttribute>> {
        let loc = Location::global(self.ncid);
        attribute::add(&self.file, loc, name, typ, value.into(), true)
    }

    /// Renames an attribute, returning the new name
    pub fn rename_attribute(&self, old: &str, new: &str) -> Pending<String> {
        attribute::rename(&self.file, Location::global(self.ncid), old, new)
    }

    /// Removes an attribute
    pub fn delete_attribute(&self, name: &str) -> Pending<()> {
        attribute::delete(&self.file, Location::global(self.ncid), name)
    }

    /// One-line description of the group
    pub fn inspect(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Group {}]", self.name.lock())
    }
}
