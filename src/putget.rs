//! Moves values between typed buffers and libnetcdf, one generic
//! path per shape (single element, hyperslab, attribute, fill value)
#![allow(clippy::similar_names)]

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use netcdf_sys::*;

use crate::dimension;
use crate::error::{self, checked_with_lock, Error};
use crate::extent::Hyperslab;
use crate::types::{NcType, Value, Values};
use crate::utils::with_lock;

/// A fixed size element which libnetcdf reads and writes in place
pub(crate) trait Element: Copy + Default {
    const NCTYPE: NcType;

    unsafe fn get_var1(ncid: nc_type, varid: nc_type, index: *const usize, out: *mut Self) -> nc_type;
    unsafe fn put_var1(ncid: nc_type, varid: nc_type, index: *const usize, value: *const Self) -> nc_type;
    unsafe fn get_vars(
        ncid: nc_type,
        varid: nc_type,
        start: *const usize,
        count: *const usize,
        stride: *const isize,
        out: *mut Self,
    ) -> nc_type;
    unsafe fn put_vars(
        ncid: nc_type,
        varid: nc_type,
        start: *const usize,
        count: *const usize,
        stride: *const isize,
        values: *const Self,
    ) -> nc_type;
    unsafe fn get_att(ncid: nc_type, varid: nc_type, name: *const c_char, out: *mut Self) -> nc_type;
    unsafe fn put_att(
        ncid: nc_type,
        varid: nc_type,
        name: *const c_char,
        len: usize,
        values: *const Self,
    ) -> nc_type;

    fn into_value(self) -> Value;
    fn from_value(v: Value) -> Option<Self>;
    fn into_values(v: Vec<Self>) -> Values;
    fn from_values(v: Values) -> Option<Vec<Self>>;
}

macro_rules! impl_numeric {
    (
        $sized_type: ty,
        $variant: ident,
        $variants: ident,
        $nc_type: ident,
        $nc_get_var1_type: ident,
        $nc_put_var1_type: ident,
        $nc_get_vars_type: ident,
        $nc_put_vars_type: ident,
        $nc_get_att_type: ident,
        $nc_put_att_type: ident $(,)?
    ) => {
        impl Element for $sized_type {
            const NCTYPE: NcType = NcType::$variant;

            unsafe fn get_var1(
                ncid: nc_type,
                varid: nc_type,
                index: *const usize,
                out: *mut Self,
            ) -> nc_type {
                $nc_get_var1_type(ncid, varid, index, out)
            }
            unsafe fn put_var1(
                ncid: nc_type,
                varid: nc_type,
                index: *const usize,
                value: *const Self,
            ) -> nc_type {
                $nc_put_var1_type(ncid, varid, index, value)
            }
            unsafe fn get_vars(
                ncid: nc_type,
                varid: nc_type,
                start: *const usize,
                count: *const usize,
                stride: *const isize,
                out: *mut Self,
            ) -> nc_type {
                $nc_get_vars_type(ncid, varid, start, count, stride, out)
            }
            unsafe fn put_vars(
                ncid: nc_type,
                varid: nc_type,
                start: *const usize,
                count: *const usize,
                stride: *const isize,
                values: *const Self,
            ) -> nc_type {
                $nc_put_vars_type(ncid, varid, start, count, stride, values)
            }
            unsafe fn get_att(
                ncid: nc_type,
                varid: nc_type,
                name: *const c_char,
                out: *mut Self,
            ) -> nc_type {
                $nc_get_att_type(ncid, varid, name, out)
            }
            unsafe fn put_att(
                ncid: nc_type,
                varid: nc_type,
                name: *const c_char,
                len: usize,
                values: *const Self,
            ) -> nc_type {
                $nc_put_att_type(ncid, varid, name, $nc_type, len, values)
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }
            fn from_value(v: Value) -> Option<Self> {
                match v {
                    Value::$variant(x) => Some(x),
                    _ => None,
                }
            }
            fn into_values(v: Vec<Self>) -> Values {
                Values::$variants(v)
            }
            fn from_values(v: Values) -> Option<Vec<Self>> {
                match v {
                    Values::$variants(x) => Some(x),
                    _ => None,
                }
            }
        }
    };
}

impl_numeric!(
    i8,
    Byte,
    Bytes,
    NC_BYTE,
    nc_get_var1_schar,
    nc_put_var1_schar,
    nc_get_vars_schar,
    nc_put_vars_schar,
    nc_get_att_schar,
    nc_put_att_schar,
);
impl_numeric!(
    u8,
    UByte,
    UBytes,
    NC_UBYTE,
    nc_get_var1_uchar,
    nc_put_var1_uchar,
    nc_get_vars_uchar,
    nc_put_vars_uchar,
    nc_get_att_uchar,
    nc_put_att_uchar,
);
impl_numeric!(
    i16,
    Short,
    Shorts,
    NC_SHORT,
    nc_get_var1_short,
    nc_put_var1_short,
    nc_get_vars_short,
    nc_put_vars_short,
    nc_get_att_short,
    nc_put_att_short,
);
impl_numeric!(
    u16,
    UShort,
    UShorts,
    NC_USHORT,
    nc_get_var1_ushort,
    nc_put_var1_ushort,
    nc_get_vars_ushort,
    nc_put_vars_ushort,
    nc_get_att_ushort,
    nc_put_att_ushort,
);
impl_numeric!(
    i32,
    Int,
    Ints,
    NC_INT,
    nc_get_var1_int,
    nc_put_var1_int,
    nc_get_vars_int,
    nc_put_vars_int,
    nc_get_att_int,
    nc_put_att_int,
);
impl_numeric!(
    u32,
    UInt,
    UInts,
    NC_UINT,
    nc_get_var1_uint,
    nc_put_var1_uint,
    nc_get_vars_uint,
    nc_put_vars_uint,
    nc_get_att_uint,
    nc_put_att_uint,
);
impl_numeric!(
    i64,
    Int64,
    Int64s,
    NC_INT64,
    nc_get_var1_longlong,
    nc_put_var1_longlong,
    nc_get_vars_longlong,
    nc_put_vars_longlong,
    nc_get_att_longlong,
    nc_put_att_longlong,
);
impl_numeric!(
    u64,
    UInt64,
    UInt64s,
    NC_UINT64,
    nc_get_var1_ulonglong,
    nc_put_var1_ulonglong,
    nc_get_vars_ulonglong,
    nc_put_vars_ulonglong,
    nc_get_att_ulonglong,
    nc_put_att_ulonglong,
);
impl_numeric!(
    f32,
    Float,
    Floats,
    NC_FLOAT,
    nc_get_var1_float,
    nc_put_var1_float,
    nc_get_vars_float,
    nc_put_vars_float,
    nc_get_att_float,
    nc_put_att_float,
);
impl_numeric!(
    f64,
    Double,
    Doubles,
    NC_DOUBLE,
    nc_get_var1_double,
    nc_put_var1_double,
    nc_get_vars_double,
    nc_put_vars_double,
    nc_get_att_double,
    nc_put_att_double,
);

/// A `char` element, read and written through the `text` functions
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Text(u8);

impl Element for Text {
    const NCTYPE: NcType = NcType::Char;

    unsafe fn get_var1(ncid: nc_type, varid: nc_type, index: *const usize, out: *mut Self) -> nc_type {
        nc_get_var1_text(ncid, varid, index, out.cast())
    }
    unsafe fn put_var1(
        ncid: nc_type,
        varid: nc_type,
        index: *const usize,
        value: *const Self,
    ) -> nc_type {
        nc_put_var1_text(ncid, varid, index, value.cast())
    }
    unsafe fn get_vars(
        ncid: nc_type,
        varid: nc_type,
        start: *const usize,
        count: *const usize,
        stride: *const isize,
        out: *mut Self,
    ) -> nc_type {
        nc_get_vars_text(ncid, varid, start, count, stride, out.cast())
    }
    unsafe fn put_vars(
        ncid: nc_type,
        varid: nc_type,
        start: *const usize,
        count: *const usize,
        stride: *const isize,
        values: *const Self,
    ) -> nc_type {
        nc_put_vars_text(ncid, varid, start, count, stride, values.cast())
    }
    unsafe fn get_att(ncid: nc_type, varid: nc_type, name: *const c_char, out: *mut Self) -> nc_type {
        nc_get_att_text(ncid, varid, name, out.cast())
    }
    unsafe fn put_att(
        ncid: nc_type,
        varid: nc_type,
        name: *const c_char,
        len: usize,
        values: *const Self,
    ) -> nc_type {
        nc_put_att_text(ncid, varid, name, len, values.cast())
    }

    fn into_value(self) -> Value {
        Value::Char(self.0)
    }
    fn from_value(v: Value) -> Option<Self> {
        match v {
            Value::Char(x) => Some(Self(x)),
            _ => None,
        }
    }
    fn into_values(v: Vec<Self>) -> Values {
        Values::Chars(v.into_iter().map(|t| t.0).collect())
    }
    fn from_values(v: Values) -> Option<Vec<Self>> {
        match v {
            Values::Chars(x) => Some(x.into_iter().map(Self).collect()),
            _ => None,
        }
    }
}

/// Calls `$generic::<T>(args)` with `T` matching the element type,
/// string elements take the `String` branch
macro_rules! dispatch {
    ($typ: expr, $generic: ident ( $($arg: expr),* $(,)? ), String => $string: expr) => {
        match $typ {
            NcType::Byte => $generic::<i8>($($arg),*),
            NcType::Char => $generic::<Text>($($arg),*),
            NcType::Short => $generic::<i16>($($arg),*),
            NcType::Int => $generic::<i32>($($arg),*),
            NcType::Float => $generic::<f32>($($arg),*),
            NcType::Double => $generic::<f64>($($arg),*),
            NcType::UByte => $generic::<u8>($($arg),*),
            NcType::UShort => $generic::<u16>($($arg),*),
            NcType::UInt => $generic::<u32>($($arg),*),
            NcType::Int64 => $generic::<i64>($($arg),*),
            NcType::UInt64 => $generic::<u64>($($arg),*),
            NcType::String => $string,
        }
    };
}

fn unexpected(typ: NcType, found: NcType) -> Error {
    Error::type_mismatch(typ, format!("a value of type {found}"))
}

/// Copies strings handed out by libnetcdf and releases them
pub(crate) fn take_strings(ptrs: &mut [*mut c_char]) -> Vec<String> {
    let strings = ptrs
        .iter()
        .map(|&p| {
            if p.is_null() {
                String::new()
            } else {
                unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned()
            }
        })
        .collect();
    if !ptrs.is_empty() {
        with_lock(|| unsafe { nc_free_string(ptrs.len(), ptrs.as_mut_ptr()) });
    }
    strings
}

pub(crate) fn to_cstrings(values: Vec<String>) -> error::Result<Vec<CString>> {
    values
        .into_iter()
        .map(|s| CString::new(s).map_err(Error::from))
        .collect()
}

fn get_value_as<T: Element>(ncid: nc_type, varid: nc_type, index: &[usize]) -> error::Result<Value> {
    let mut out = T::default();
    checked_with_lock(|| unsafe { T::get_var1(ncid, varid, index.as_ptr(), &mut out) })?;
    Ok(out.into_value())
}

fn put_value_as<T: Element>(
    ncid: nc_type,
    varid: nc_type,
    index: &[usize],
    value: Value,
) -> error::Result<()> {
    let found = value.nc_type();
    let x = T::from_value(value).ok_or_else(|| unexpected(T::NCTYPE, found))?;
    checked_with_lock(|| unsafe { T::put_var1(ncid, varid, index.as_ptr(), &x) })
}

fn get_values_as<T: Element>(ncid: nc_type, varid: nc_type, slab: &Hyperslab) -> error::Result<Values> {
    let mut buf = vec![T::default(); slab.len()];
    if !buf.is_empty() {
        checked_with_lock(|| unsafe {
            T::get_vars(
                ncid,
                varid,
                slab.start.as_ptr(),
                slab.count.as_ptr(),
                slab.stride.as_ptr(),
                buf.as_mut_ptr(),
            )
        })?;
    }
    Ok(T::into_values(buf))
}

fn put_values_as<T: Element>(
    ncid: nc_type,
    varid: nc_type,
    slab: &Hyperslab,
    values: Values,
) -> error::Result<()> {
    let found = values.nc_type();
    let buf = T::from_values(values).ok_or_else(|| unexpected(T::NCTYPE, found))?;
    if buf.is_empty() {
        return Ok(());
    }
    checked_with_lock(|| unsafe {
        T::put_vars(
            ncid,
            varid,
            slab.start.as_ptr(),
            slab.count.as_ptr(),
            slab.stride.as_ptr(),
            buf.as_ptr(),
        )
    })
}

fn get_string_value(ncid: nc_type, varid: nc_type, index: &[usize]) -> error::Result<Value> {
    let mut ptr: *mut c_char = std::ptr::null_mut();
    checked_with_lock(|| unsafe { nc_get_var1_string(ncid, varid, index.as_ptr(), &mut ptr) })?;
    let mut strings = take_strings(&mut [ptr]);
    Ok(Value::Str(strings.pop().unwrap_or_default()))
}

fn put_string_value(ncid: nc_type, varid: nc_type, index: &[usize], value: Value) -> error::Result<()> {
    let found = value.nc_type();
    let Value::Str(s) = value else {
        return Err(unexpected(NcType::String, found));
    };
    let s = CString::new(s)?;
    let mut ptr = s.as_ptr();
    checked_with_lock(|| unsafe { nc_put_var1_string(ncid, varid, index.as_ptr(), &mut ptr) })
}

fn get_string_values(ncid: nc_type, varid: nc_type, slab: &Hyperslab) -> error::Result<Values> {
    let mut ptrs: Vec<*mut c_char> = vec![std::ptr::null_mut(); slab.len()];
    if !ptrs.is_empty() {
        checked_with_lock(|| unsafe {
            nc_get_vars_string(
                ncid,
                varid,
                slab.start.as_ptr(),
                slab.count.as_ptr(),
                slab.stride.as_ptr(),
                ptrs.as_mut_ptr(),
            )
        })?;
    }
    Ok(Values::Strs(take_strings(&mut ptrs)))
}

fn put_string_values(
    ncid: nc_type,
    varid: nc_type,
    slab: &Hyperslab,
    values: Values,
) -> error::Result<()> {
    let found = values.nc_type();
    let Values::Strs(strings) = values else {
        return Err(unexpected(NcType::String, found));
    };
    if strings.is_empty() {
        return Ok(());
    }
    let cstrings = to_cstrings(strings)?;
    let mut ptrs: Vec<*const c_char> = cstrings.iter().map(|s| s.as_ptr()).collect();
    checked_with_lock(|| unsafe {
        nc_put_vars_string(
            ncid,
            varid,
            slab.start.as_ptr(),
            slab.count.as_ptr(),
            slab.stride.as_ptr(),
            ptrs.as_mut_ptr(),
        )
    })
}

/// Reads the element at `index` of a variable of type `typ`
pub(crate) fn get_value(
    ncid: nc_type,
    varid: nc_type,
    typ: NcType,
    index: &[usize],
) -> error::Result<Value> {
    dispatch!(typ, get_value_as(ncid, varid, index), String => get_string_value(ncid, varid, index))
}

/// Writes `value` at `index`, converting it to `typ` first
pub(crate) fn put_value(
    ncid: nc_type,
    varid: nc_type,
    typ: NcType,
    index: &[usize],
    value: Value,
) -> error::Result<()> {
    let value = value.cast(typ)?;
    dispatch!(
        typ,
        put_value_as(ncid, varid, index, value),
        String => put_string_value(ncid, varid, index, value)
    )
}

/// Current length of every dimension of a variable
fn current_lens(ncid: nc_type, varid: nc_type) -> error::Result<Vec<usize>> {
    let mut ndims = 0;
    checked_with_lock(|| unsafe { nc_inq_varndims(ncid, varid, &mut ndims) })?;
    let mut dimids = vec![0; ndims.try_into()?];
    if ndims > 0 {
        checked_with_lock(|| unsafe { nc_inq_vardimid(ncid, varid, dimids.as_mut_ptr()) })?;
    }
    dimids
        .into_iter()
        .map(|dimid| dimension::current_len(ncid, dimid))
        .collect()
}

/// Reads the elements selected by `slab`. The selection is checked
/// against the current dimension lengths before the buffer is allocated
pub(crate) fn get_values(
    ncid: nc_type,
    varid: nc_type,
    typ: NcType,
    slab: &Hyperslab,
) -> error::Result<Values> {
    slab.check_within(&current_lens(ncid, varid)?)?;
    dispatch!(typ, get_values_as(ncid, varid, slab), String => get_string_values(ncid, varid, slab))
}

/// Writes `values` to the elements selected by `slab`. The number of
/// values must match the selection exactly
pub(crate) fn put_values(
    ncid: nc_type,
    varid: nc_type,
    typ: NcType,
    slab: &Hyperslab,
    values: Values,
) -> error::Result<()> {
    if values.len() != slab.len() {
        return Err(Error::validation(format!(
            "Buffer holds {} element(s), the selection covers {}",
            values.len(),
            slab.len()
        )));
    }
    let values = values.cast(typ)?;
    dispatch!(
        typ,
        put_values_as(ncid, varid, slab, values),
        String => put_string_values(ncid, varid, slab, values)
    )
}

fn get_fill_as<T: Element>(ncid: nc_type, varid: nc_type) -> error::Result<(bool, Value)> {
    let mut no_fill: nc_type = 0;
    let mut out = T::default();
    checked_with_lock(|| unsafe {
        nc_inq_var_fill(ncid, varid, &mut no_fill, std::ptr::addr_of_mut!(out).cast())
    })?;
    Ok((no_fill == 0, out.into_value()))
}

fn get_string_fill(ncid: nc_type, varid: nc_type) -> error::Result<(bool, Value)> {
    let mut no_fill: nc_type = 0;
    let mut ptr: *mut c_char = std::ptr::null_mut();
    checked_with_lock(|| unsafe {
        nc_inq_var_fill(ncid, varid, &mut no_fill, std::ptr::addr_of_mut!(ptr).cast())
    })?;
    let mut strings = take_strings(&mut [ptr]);
    Ok((no_fill == 0, Value::Str(strings.pop().unwrap_or_default())))
}

/// Whether filling is enabled, and the fill value
pub(crate) fn get_fill(ncid: nc_type, varid: nc_type, typ: NcType) -> error::Result<(bool, Value)> {
    dispatch!(typ, get_fill_as(ncid, varid), String => get_string_fill(ncid, varid))
}

fn put_fill_as<T: Element>(ncid: nc_type, varid: nc_type, value: Value) -> error::Result<()> {
    let found = value.nc_type();
    let x = T::from_value(value).ok_or_else(|| unexpected(T::NCTYPE, found))?;
    checked_with_lock(|| unsafe {
        nc_def_var_fill(ncid, varid, NC_FILL, std::ptr::addr_of!(x).cast())
    })
}

fn put_string_fill(ncid: nc_type, varid: nc_type, value: Value) -> error::Result<()> {
    let found = value.nc_type();
    let Value::Str(s) = value else {
        return Err(unexpected(NcType::String, found));
    };
    let s = CString::new(s)?;
    let ptr = s.as_ptr();
    checked_with_lock(|| unsafe {
        nc_def_var_fill(ncid, varid, NC_FILL, std::ptr::addr_of!(ptr).cast())
    })
}

/// Sets the fill value and whether filling is enabled. libnetcdf
/// ignores the value when filling is turned off, so it is stored first
pub(crate) fn put_fill(
    ncid: nc_type,
    varid: nc_type,
    typ: NcType,
    enabled: bool,
    value: Value,
) -> error::Result<()> {
    let value = value.cast(typ)?;
    dispatch!(
        typ,
        put_fill_as(ncid, varid, value),
        String => put_string_fill(ncid, varid, value)
    )?;
    if !enabled {
        checked_with_lock(|| unsafe {
            nc_def_var_fill(ncid, varid, NC_NOFILL, std::ptr::null_mut())
        })?;
    }
    Ok(())
}

fn get_att_as<T: Element>(
    ncid: nc_type,
    varid: nc_type,
    name: &[u8],
    len: usize,
) -> error::Result<Values> {
    let mut buf = vec![T::default(); len];
    if len > 0 {
        checked_with_lock(|| unsafe {
            T::get_att(ncid, varid, name.as_ptr().cast(), buf.as_mut_ptr())
        })?;
    }
    Ok(T::into_values(buf))
}

fn get_string_att(ncid: nc_type, varid: nc_type, name: &[u8], len: usize) -> error::Result<Values> {
    let mut ptrs: Vec<*mut c_char> = vec![std::ptr::null_mut(); len];
    if len > 0 {
        checked_with_lock(|| unsafe {
            nc_get_att_string(ncid, varid, name.as_ptr().cast(), ptrs.as_mut_ptr())
        })?;
    }
    Ok(Values::Strs(take_strings(&mut ptrs)))
}

/// Reads the `len` elements of attribute `name`. `name` must be nul-terminated
pub(crate) fn get_att(
    ncid: nc_type,
    varid: nc_type,
    typ: NcType,
    name: &[u8],
    len: usize,
) -> error::Result<Values> {
    dispatch!(
        typ,
        get_att_as(ncid, varid, name, len),
        String => get_string_att(ncid, varid, name, len)
    )
}

fn put_att_as<T: Element>(
    ncid: nc_type,
    varid: nc_type,
    name: &[u8],
    values: Values,
) -> error::Result<()> {
    let found = values.nc_type();
    let buf = T::from_values(values).ok_or_else(|| unexpected(T::NCTYPE, found))?;
    checked_with_lock(|| unsafe {
        T::put_att(ncid, varid, name.as_ptr().cast(), buf.len(), buf.as_ptr())
    })
}

fn put_string_att(ncid: nc_type, varid: nc_type, name: &[u8], values: Values) -> error::Result<()> {
    let found = values.nc_type();
    let Values::Strs(strings) = values else {
        return Err(unexpected(NcType::String, found));
    };
    let cstrings = to_cstrings(strings)?;
    let mut ptrs: Vec<*const c_char> = cstrings.iter().map(|s| s.as_ptr()).collect();
    checked_with_lock(|| unsafe {
        nc_put_att_string(ncid, varid, name.as_ptr().cast(), ptrs.len(), ptrs.as_mut_ptr())
    })
}

/// Writes attribute `name` with the values converted to `typ`
pub(crate) fn put_att(
    ncid: nc_type,
    varid: nc_type,
    typ: NcType,
    name: &[u8],
    values: Values,
) -> error::Result<()> {
    let values = values.cast(typ)?;
    dispatch!(
        typ,
        put_att_as(ncid, varid, name, values),
        String => put_string_att(ncid, varid, name, values)
    )
}
