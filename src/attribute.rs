//! Add and read attributes from netcdf groups and variables
#![allow(clippy::similar_names)]

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use netcdf_sys::*;
use parking_lot::Mutex;

use crate::error::{self, checked_with_lock, Error};
use crate::file::FileRef;
use crate::putget;
use crate::queue::Pending;
use crate::types::{NcType, Value, Values};
use crate::utils::{name_from_bytes, short_name_to_bytes, with_lock, NameBuffer};

/// Value of an attribute, a single element or an array
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Attribute holding exactly one element, or text
    Scalar(Value),
    /// Attribute holding zero or several elements
    Array(Values),
}

impl AttributeValue {
    /// Single elements become `Scalar`, anything else `Array`
    fn from_values(values: Values) -> Self {
        if values.len() == 1 {
            if let Some(v) = values.get(0) {
                return Self::Scalar(v);
            }
        }
        Self::Array(values)
    }

    fn into_values(self) -> error::Result<Values> {
        match self {
            Self::Array(values) => Ok(values),
            Self::Scalar(v) => {
                let typ = v.nc_type();
                Values::from_values(typ, vec![v])
            }
        }
    }
}

impl From<Value> for AttributeValue {
    fn from(v: Value) -> Self {
        Self::Scalar(v)
    }
}

impl From<Values> for AttributeValue {
    fn from(v: Values) -> Self {
        Self::Array(v)
    }
}

macro_rules! impl_from_element {
    ($($t: ty),* $(,)?) => {
        $(
            impl From<$t> for AttributeValue {
                fn from(x: $t) -> Self {
                    Self::Scalar(x.into())
                }
            }
            impl From<Vec<$t>> for AttributeValue {
                fn from(x: Vec<$t>) -> Self {
                    Self::Array(x.into())
                }
            }
        )*
    };
}
impl_from_element!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64, String);

impl From<&str> for AttributeValue {
    fn from(x: &str) -> Self {
        Self::Scalar(x.into())
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(x: Vec<&str>) -> Self {
        Self::Array(x.into())
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(Value::Str(s)) => write!(f, "{s:?}"),
            Self::Scalar(v) => write!(f, "{v}"),
            Self::Array(values) => {
                f.write_str("[")?;
                for (i, v) in values.clone().into_values().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Attribute value together with its stored element type
#[derive(Debug, Clone, PartialEq)]
pub struct TypedAttribute {
    /// Element type as stored in the file
    pub typ: NcType,
    /// The value
    pub value: AttributeValue,
}

/// Group (`NC_GLOBAL`) or variable an attribute is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Location {
    pub(crate) ncid: nc_type,
    pub(crate) varid: nc_type,
}

impl Location {
    pub(crate) fn global(ncid: nc_type) -> Self {
        Self {
            ncid,
            varid: NC_GLOBAL,
        }
    }

    fn names(self) -> error::Result<Vec<String>> {
        let mut natts = 0;
        checked_with_lock(|| unsafe { nc_inq_varnatts(self.ncid, self.varid, &mut natts) })?;
        (0..natts)
            .map(|attnum| {
                let mut name: NameBuffer = [0; NC_MAX_NAME as usize + 1];
                checked_with_lock(|| unsafe {
                    nc_inq_attname(self.ncid, self.varid, attnum, name.as_mut_ptr().cast())
                })?;
                name_from_bytes(&name)
            })
            .collect()
    }

    fn exists(self, cname: &NameBuffer) -> error::Result<bool> {
        let mut attid = 0;
        let e = with_lock(|| unsafe {
            nc_inq_attid(self.ncid, self.varid, cname.as_ptr().cast(), &mut attid)
        });
        if e == NC_ENOTATT {
            return Ok(false);
        }
        error::checked(e)?;
        Ok(true)
    }

    fn read(self, cname: &NameBuffer) -> error::Result<TypedAttribute> {
        let mut xtype = 0;
        let mut len = 0;
        let e = with_lock(|| unsafe {
            nc_inq_att(self.ncid, self.varid, cname.as_ptr().cast(), &mut xtype, &mut len)
        });
        if e == NC_ENOTATT {
            return Err(Error::not_found(format!(
                "Attribute \"{}\" not found",
                name_from_bytes(cname)?
            )));
        }
        error::checked(e)?;
        let typ = NcType::from_id(xtype)?;

        let value = match putget::get_att(self.ncid, self.varid, typ, cname, len)? {
            Values::Chars(text) => {
                let end = text.iter().position(|&c| c == 0).unwrap_or(text.len());
                AttributeValue::Scalar(Value::Str(
                    String::from_utf8_lossy(&text[..end]).into_owned(),
                ))
            }
            values => AttributeValue::from_values(values),
        };
        Ok(TypedAttribute { typ, value })
    }

    fn write(self, cname: &NameBuffer, typ: NcType, value: AttributeValue) -> error::Result<()> {
        let values = match (typ, value) {
            // Text attributes store the bytes of one string
            (NcType::Char, AttributeValue::Scalar(Value::Str(s))) => Values::Chars(s.into_bytes()),
            (NcType::Char, AttributeValue::Array(Values::Strs(v))) if v.len() == 1 => {
                Values::Chars(v.concat().into_bytes())
            }
            (_, value) => value.into_values()?,
        };
        putget::put_att(self.ncid, self.varid, typ, cname, values)
    }
}

pub(crate) fn all(loc: Location) -> error::Result<HashMap<String, TypedAttribute>> {
    loc.names()?
        .into_iter()
        .map(|name| {
            let cname = short_name_to_bytes(&name)?;
            Ok((name, loc.read(&cname)?))
        })
        .collect()
}

pub(crate) fn add(
    file: &FileRef,
    loc: Location,
    name: &str,
    typ: NcType,
    value: AttributeValue,
    overwrite: bool,
) -> Pending<HashMap<String, TypedAttribute>> {
    let cname = match short_name_to_bytes(name) {
        Ok(cname) => cname,
        Err(e) => return Pending::failed(e),
    };
    let name = name.to_owned();
    file.submit("put_att", move |_| {
        if !overwrite && loc.exists(&cname)? {
            return Err(Error::Usage(format!("Attribute \"{name}\" already exists")));
        }
        loc.write(&cname, typ, value)?;
        let stored = loc.read(&cname)?;
        Ok(HashMap::from([(name, stored)]))
    })
}

pub(crate) fn lookup(file: &FileRef, loc: Location, name: &str) -> Pending<Attribute> {
    let cname = match short_name_to_bytes(name) {
        Ok(cname) => cname,
        Err(e) => return Pending::failed(e),
    };
    let name = name.to_owned();
    let handle = file.clone();
    file.submit("inq_att", move |_| {
        if !loc.exists(&cname)? {
            return Err(Error::not_found(format!("Attribute \"{name}\" not found")));
        }
        Ok(Attribute {
            loc,
            file: handle,
            name: Arc::new(Mutex::new(name)),
        })
    })
}

pub(crate) fn rename(file: &FileRef, loc: Location, old: &str, new: &str) -> Pending<String> {
    let (cold, cnew) = match (short_name_to_bytes(old), short_name_to_bytes(new)) {
        (Ok(cold), Ok(cnew)) => (cold, cnew),
        (Err(e), _) | (_, Err(e)) => return Pending::failed(e),
    };
    let new = new.to_owned();
    file.submit("rename_att", move |_| {
        checked_with_lock(|| unsafe {
            nc_rename_att(loc.ncid, loc.varid, cold.as_ptr().cast(), cnew.as_ptr().cast())
        })?;
        Ok(new)
    })
}

pub(crate) fn delete(file: &FileRef, loc: Location, name: &str) -> Pending<()> {
    let cname = match short_name_to_bytes(name) {
        Ok(cname) => cname,
        Err(e) => return Pending::failed(e),
    };
    file.submit("del_att", move |_| {
        checked_with_lock(|| unsafe { nc_del_att(loc.ncid, loc.varid, cname.as_ptr().cast()) })
    })
}

/// Named attribute of a group or variable
#[derive(Debug, Clone)]
pub struct Attribute {
    loc: Location,
    file: FileRef,
    name: Arc<Mutex<String>>,
}

impl Attribute {
    /// Name of the attribute as last seen
    pub fn name(&self) -> String {
        self.name.lock().clone()
    }

    /// Reads the type and value
    pub fn get_value(&self) -> Pending<TypedAttribute> {
        let loc = self.loc;
        let cname = match short_name_to_bytes(&self.name()) {
            Ok(cname) => cname,
            Err(e) => return Pending::failed(e),
        };
        self.file.submit("get_att", move |_| loc.read(&cname))
    }

    /// Renames the attribute, returning the new name
    pub fn set_name(&self, new: &str) -> Pending<String> {
        let (cold, cnew) = match (short_name_to_bytes(&self.name()), short_name_to_bytes(new)) {
            (Ok(cold), Ok(cnew)) => (cold, cnew),
            (Err(e), _) | (_, Err(e)) => return Pending::failed(e),
        };
        let loc = self.loc;
        let name = Arc::clone(&self.name);
        let new = new.to_owned();
        self.file.submit("rename_att", move |_| {
            checked_with_lock(|| unsafe {
                nc_rename_att(loc.ncid, loc.varid, cold.as_ptr().cast(), cnew.as_ptr().cast())
            })?;
            name.lock().clone_from(&new);
            Ok(new)
        })
    }

    /// Removes the attribute from its group or variable
    pub fn delete(&self) -> Pending<()> {
        delete(&self.file, self.loc, &self.name())
    }

    /// One-line description of the attribute
    pub fn inspect(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Attribute {}]", self.name.lock())
    }
}
