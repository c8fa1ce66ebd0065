//! Element types of netcdf variables and attributes, and the values
//! and buffers they are marshalled to

use std::fmt;
use std::str::FromStr;

use netcdf_sys::*;

use crate::error::{self, Error};

/// Element type of a variable or attribute
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NcType {
    /// Signed 1 byte integer
    Byte,
    /// ISO/ASCII character
    Char,
    /// Signed 2 byte integer
    Short,
    /// Signed 4 byte integer
    Int,
    /// Single precision floating point number
    Float,
    /// Double precision floating point number
    Double,
    /// Unsigned 1 byte integer
    UByte,
    /// Unsigned 2 byte integer
    UShort,
    /// Unsigned 4 byte integer
    UInt,
    /// Signed 8 byte integer
    Int64,
    /// Unsigned 8 byte integer
    UInt64,
    /// Variable length string
    String,
}

impl NcType {
    /// All supported element types
    pub const ALL: [Self; 12] = [
        Self::Byte,
        Self::Char,
        Self::Short,
        Self::Int,
        Self::Float,
        Self::Double,
        Self::UByte,
        Self::UShort,
        Self::UInt,
        Self::Int64,
        Self::UInt64,
        Self::String,
    ];

    /// `netCDF` name of the type
    pub fn name(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Float => "float",
            Self::Double => "double",
            Self::UByte => "ubyte",
            Self::UShort => "ushort",
            Self::UInt => "uint",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::String => "string",
        }
    }

    /// `nc_type` of the type
    pub(crate) fn id(self) -> nc_type {
        match self {
            Self::Byte => NC_BYTE,
            Self::Char => NC_CHAR,
            Self::Short => NC_SHORT,
            Self::Int => NC_INT,
            Self::Float => NC_FLOAT,
            Self::Double => NC_DOUBLE,
            Self::UByte => NC_UBYTE,
            Self::UShort => NC_USHORT,
            Self::UInt => NC_UINT,
            Self::Int64 => NC_INT64,
            Self::UInt64 => NC_UINT64,
            Self::String => NC_STRING,
        }
    }

    pub(crate) fn from_id(id: nc_type) -> error::Result<Self> {
        Ok(match id {
            NC_BYTE => Self::Byte,
            NC_CHAR => Self::Char,
            NC_SHORT => Self::Short,
            NC_INT => Self::Int,
            NC_FLOAT => Self::Float,
            NC_DOUBLE => Self::Double,
            NC_UBYTE => Self::UByte,
            NC_USHORT => Self::UShort,
            NC_UINT => Self::UInt,
            NC_INT64 => Self::Int64,
            NC_UINT64 => Self::UInt64,
            NC_STRING => Self::String,
            x => {
                return Err(Error::TypeMismatch(format!(
                    "Unsupported element type id {x}"
                )))
            }
        })
    }

    /// Whether this is one of the integer types
    pub fn is_integer(self) -> bool {
        !matches!(
            self,
            Self::Char | Self::Float | Self::Double | Self::String
        )
    }
}

impl fmt::Display for NcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NcType {
    type Err = Error;
    fn from_str(s: &str) -> error::Result<Self> {
        Ok(match s {
            "byte" | "i1" | "b" | "B" => Self::Byte,
            "char" | "S1" => Self::Char,
            "short" | "i2" | "h" | "s" => Self::Short,
            "int" | "i4" | "i" | "l" => Self::Int,
            "float" | "f4" | "f" => Self::Float,
            "double" | "f8" | "d" => Self::Double,
            "ubyte" | "u1" => Self::UByte,
            "ushort" | "u2" => Self::UShort,
            "uint" | "u4" => Self::UInt,
            "int64" | "i8" => Self::Int64,
            "uint64" | "u8" => Self::UInt64,
            "string" => Self::String,
            _ => return Err(Error::validation(format!("Unknown type \"{s}\""))),
        })
    }
}

/// A single element of any supported type. 64 bit integers keep
/// their full range
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Byte(i8),
    Char(u8),
    Short(i16),
    Int(i32),
    Float(f32),
    Double(f64),
    UByte(u8),
    UShort(u16),
    UInt(u32),
    Int64(i64),
    UInt64(u64),
    Str(String),
}

/// A typed buffer of elements, one entry per logical element
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Bytes(Vec<i8>),
    Chars(Vec<u8>),
    Shorts(Vec<i16>),
    Ints(Vec<i32>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
    UBytes(Vec<u8>),
    UShorts(Vec<u16>),
    UInts(Vec<u32>),
    Int64s(Vec<i64>),
    UInt64s(Vec<u64>),
    Strs(Vec<String>),
}

/// Intermediate numeric form used when converting between element types
#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i128),
    Float(f64),
}

macro_rules! narrow_int {
    ($n: expr, $t: ty, $variant: ident) => {
        match $n {
            Number::Int(i) => <$t>::try_from(i).ok().map(Value::$variant),
            Number::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 {
                    #[allow(clippy::cast_possible_truncation)]
                    <$t>::try_from(f as i128).ok().map(Value::$variant)
                } else {
                    None
                }
            }
        }
    };
}

impl Number {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn to_value(self, typ: NcType) -> Option<Value> {
        match typ {
            NcType::Byte => narrow_int!(self, i8, Byte),
            NcType::Short => narrow_int!(self, i16, Short),
            NcType::Int => narrow_int!(self, i32, Int),
            NcType::UByte => narrow_int!(self, u8, UByte),
            NcType::UShort => narrow_int!(self, u16, UShort),
            NcType::UInt => narrow_int!(self, u32, UInt),
            NcType::Int64 => narrow_int!(self, i64, Int64),
            NcType::UInt64 => narrow_int!(self, u64, UInt64),
            NcType::Char => narrow_int!(self, u8, Char),
            NcType::Double => match self {
                Number::Float(f) => Some(Value::Double(f)),
                Number::Int(i) => {
                    let f = i as f64;
                    (f as i128 == i).then_some(Value::Double(f))
                }
            },
            NcType::Float => match self {
                Number::Float(f) => {
                    if f.is_finite() && f.abs() > f64::from(f32::MAX) {
                        None
                    } else {
                        Some(Value::Float(f as f32))
                    }
                }
                Number::Int(i) => {
                    let f = i as f32;
                    (f as i128 == i).then_some(Value::Float(f))
                }
            },
            NcType::String => None,
        }
    }
}

impl Value {
    /// Element type of this value
    pub fn nc_type(&self) -> NcType {
        match self {
            Self::Byte(_) => NcType::Byte,
            Self::Char(_) => NcType::Char,
            Self::Short(_) => NcType::Short,
            Self::Int(_) => NcType::Int,
            Self::Float(_) => NcType::Float,
            Self::Double(_) => NcType::Double,
            Self::UByte(_) => NcType::UByte,
            Self::UShort(_) => NcType::UShort,
            Self::UInt(_) => NcType::UInt,
            Self::Int64(_) => NcType::Int64,
            Self::UInt64(_) => NcType::UInt64,
            Self::Str(_) => NcType::String,
        }
    }

    fn as_number(&self) -> Option<Number> {
        Some(match *self {
            Self::Byte(x) => Number::Int(x.into()),
            Self::Short(x) => Number::Int(x.into()),
            Self::Int(x) => Number::Int(x.into()),
            Self::UByte(x) => Number::Int(x.into()),
            Self::UShort(x) => Number::Int(x.into()),
            Self::UInt(x) => Number::Int(x.into()),
            Self::Int64(x) => Number::Int(x.into()),
            Self::UInt64(x) => Number::Int(x.into()),
            Self::Float(x) => Number::Float(x.into()),
            Self::Double(x) => Number::Float(x),
            Self::Char(_) | Self::Str(_) => return None,
        })
    }

    /// Converts the value to `typ` if this can be done without losing
    /// information. Narrowing `double` to `float` rounds to the nearest
    /// representable value.
    pub fn cast(self, typ: NcType) -> error::Result<Self> {
        if self.nc_type() == typ {
            return Ok(self);
        }
        let converted = match (&self, typ) {
            (Self::Char(c), NcType::String) => Some(Self::Str(char::from(*c).to_string())),
            (Self::Str(s), NcType::Char) if s.len() == 1 => Some(Self::Char(s.as_bytes()[0])),
            (Self::Char(_) | Self::Str(_), _) | (_, NcType::String) => None,
            (v, typ) => v.as_number().and_then(|n| n.to_value(typ)),
        };
        converted.ok_or_else(|| Error::type_mismatch(typ, &self))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte(x) => write!(f, "{x} ({})", self.nc_type()),
            Self::Char(x) => write!(f, "'{}' (char)", char::from(*x).escape_default()),
            Self::Short(x) => write!(f, "{x} ({})", self.nc_type()),
            Self::Int(x) => write!(f, "{x} ({})", self.nc_type()),
            Self::Float(x) => write!(f, "{x} ({})", self.nc_type()),
            Self::Double(x) => write!(f, "{x} ({})", self.nc_type()),
            Self::UByte(x) => write!(f, "{x} ({})", self.nc_type()),
            Self::UShort(x) => write!(f, "{x} ({})", self.nc_type()),
            Self::UInt(x) => write!(f, "{x} ({})", self.nc_type()),
            Self::Int64(x) => write!(f, "{x} ({})", self.nc_type()),
            Self::UInt64(x) => write!(f, "{x} ({})", self.nc_type()),
            Self::Str(x) => write!(f, "{x:?} (string)"),
        }
    }
}

macro_rules! impl_from_scalar {
    ($($t: ty => $variant: ident, $variants: ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(x: $t) -> Self {
                    Self::$variant(x)
                }
            }
            impl From<Vec<$t>> for Values {
                fn from(x: Vec<$t>) -> Self {
                    Self::$variants(x)
                }
            }
        )*
    };
}

// `u8` is taken by `ubyte`, characters are constructed explicitly
impl From<i8> for Value {
    fn from(x: i8) -> Self {
        Self::Byte(x)
    }
}
impl From<Vec<i8>> for Values {
    fn from(x: Vec<i8>) -> Self {
        Self::Bytes(x)
    }
}
impl From<u8> for Value {
    fn from(x: u8) -> Self {
        Self::UByte(x)
    }
}
impl From<Vec<u8>> for Values {
    fn from(x: Vec<u8>) -> Self {
        Self::UBytes(x)
    }
}
impl_from_scalar! {
    i16 => Short, Shorts,
    i32 => Int, Ints,
    f32 => Float, Floats,
    f64 => Double, Doubles,
    u16 => UShort, UShorts,
    u32 => UInt, UInts,
    i64 => Int64, Int64s,
    u64 => UInt64, UInt64s,
    String => Str, Strs,
}

impl From<&str> for Value {
    fn from(x: &str) -> Self {
        Self::Str(x.to_owned())
    }
}

impl From<Vec<&str>> for Values {
    fn from(x: Vec<&str>) -> Self {
        Self::Strs(x.into_iter().map(str::to_owned).collect())
    }
}

macro_rules! values_match {
    ($values: expr, $v: ident => $body: expr) => {
        match $values {
            Values::Bytes($v) => $body,
            Values::Chars($v) => $body,
            Values::Shorts($v) => $body,
            Values::Ints($v) => $body,
            Values::Floats($v) => $body,
            Values::Doubles($v) => $body,
            Values::UBytes($v) => $body,
            Values::UShorts($v) => $body,
            Values::UInts($v) => $body,
            Values::Int64s($v) => $body,
            Values::UInt64s($v) => $body,
            Values::Strs($v) => $body,
        }
    };
}

impl Values {
    /// Empty buffer of the given element type
    pub fn empty(typ: NcType) -> Self {
        match typ {
            NcType::Byte => Self::Bytes(Vec::new()),
            NcType::Char => Self::Chars(Vec::new()),
            NcType::Short => Self::Shorts(Vec::new()),
            NcType::Int => Self::Ints(Vec::new()),
            NcType::Float => Self::Floats(Vec::new()),
            NcType::Double => Self::Doubles(Vec::new()),
            NcType::UByte => Self::UBytes(Vec::new()),
            NcType::UShort => Self::UShorts(Vec::new()),
            NcType::UInt => Self::UInts(Vec::new()),
            NcType::Int64 => Self::Int64s(Vec::new()),
            NcType::UInt64 => Self::UInt64s(Vec::new()),
            NcType::String => Self::Strs(Vec::new()),
        }
    }

    /// Element type of the buffer
    pub fn nc_type(&self) -> NcType {
        match self {
            Self::Bytes(_) => NcType::Byte,
            Self::Chars(_) => NcType::Char,
            Self::Shorts(_) => NcType::Short,
            Self::Ints(_) => NcType::Int,
            Self::Floats(_) => NcType::Float,
            Self::Doubles(_) => NcType::Double,
            Self::UBytes(_) => NcType::UByte,
            Self::UShorts(_) => NcType::UShort,
            Self::UInts(_) => NcType::UInt,
            Self::Int64s(_) => NcType::Int64,
            Self::UInt64s(_) => NcType::UInt64,
            Self::Strs(_) => NcType::String,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        values_match!(self, v => v.len())
    }

    /// Whether the buffer holds no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `i`
    pub fn get(&self, i: usize) -> Option<Value> {
        Some(match self {
            Self::Bytes(v) => Value::Byte(*v.get(i)?),
            Self::Chars(v) => Value::Char(*v.get(i)?),
            Self::Shorts(v) => Value::Short(*v.get(i)?),
            Self::Ints(v) => Value::Int(*v.get(i)?),
            Self::Floats(v) => Value::Float(*v.get(i)?),
            Self::Doubles(v) => Value::Double(*v.get(i)?),
            Self::UBytes(v) => Value::UByte(*v.get(i)?),
            Self::UShorts(v) => Value::UShort(*v.get(i)?),
            Self::UInts(v) => Value::UInt(*v.get(i)?),
            Self::Int64s(v) => Value::Int64(*v.get(i)?),
            Self::UInt64s(v) => Value::UInt64(*v.get(i)?),
            Self::Strs(v) => Value::Str(v.get(i)?.clone()),
        })
    }

    /// Splits the buffer into single values
    pub fn into_values(self) -> Vec<Value> {
        match self {
            Self::Bytes(v) => v.into_iter().map(Value::Byte).collect(),
            Self::Chars(v) => v.into_iter().map(Value::Char).collect(),
            Self::Shorts(v) => v.into_iter().map(Value::Short).collect(),
            Self::Ints(v) => v.into_iter().map(Value::Int).collect(),
            Self::Floats(v) => v.into_iter().map(Value::Float).collect(),
            Self::Doubles(v) => v.into_iter().map(Value::Double).collect(),
            Self::UBytes(v) => v.into_iter().map(Value::UByte).collect(),
            Self::UShorts(v) => v.into_iter().map(Value::UShort).collect(),
            Self::UInts(v) => v.into_iter().map(Value::UInt).collect(),
            Self::Int64s(v) => v.into_iter().map(Value::Int64).collect(),
            Self::UInt64s(v) => v.into_iter().map(Value::UInt64).collect(),
            Self::Strs(v) => v.into_iter().map(Value::Str).collect(),
        }
    }

    /// Collects values of a single type into a buffer. Every value
    /// must already be of type `typ`
    pub(crate) fn from_values(typ: NcType, values: Vec<Value>) -> error::Result<Self> {
        let mut out = Self::empty(typ);
        for v in values {
            match (&mut out, v) {
                (Self::Bytes(o), Value::Byte(x)) => o.push(x),
                (Self::Chars(o), Value::Char(x)) => o.push(x),
                (Self::Shorts(o), Value::Short(x)) => o.push(x),
                (Self::Ints(o), Value::Int(x)) => o.push(x),
                (Self::Floats(o), Value::Float(x)) => o.push(x),
                (Self::Doubles(o), Value::Double(x)) => o.push(x),
                (Self::UBytes(o), Value::UByte(x)) => o.push(x),
                (Self::UShorts(o), Value::UShort(x)) => o.push(x),
                (Self::UInts(o), Value::UInt(x)) => o.push(x),
                (Self::Int64s(o), Value::Int64(x)) => o.push(x),
                (Self::UInt64s(o), Value::UInt64(x)) => o.push(x),
                (Self::Strs(o), Value::Str(x)) => o.push(x),
                (_, v) => return Err(Error::type_mismatch(typ, v)),
            }
        }
        Ok(out)
    }

    /// Converts every element to `typ`, failing on the first element
    /// that does not fit
    pub fn cast(self, typ: NcType) -> error::Result<Self> {
        if self.nc_type() == typ {
            return Ok(self);
        }
        let values = self
            .into_values()
            .into_iter()
            .map(|v| v.cast(typ))
            .collect::<error::Result<Vec<_>>>()?;
        Self::from_values(typ, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for typ in NcType::ALL {
            assert_eq!(typ.name().parse::<NcType>().unwrap(), typ);
            assert_eq!(NcType::from_id(typ.id()).unwrap(), typ);
        }
        assert_eq!("i8".parse::<NcType>().unwrap(), NcType::Int64);
        assert_eq!("S1".parse::<NcType>().unwrap(), NcType::Char);
        assert!("complex".parse::<NcType>().is_err());
    }

    #[test]
    fn lossless_integer_casts() {
        assert_eq!(Value::Int(8).cast(NcType::Byte).unwrap(), Value::Byte(8));
        assert_eq!(
            Value::Int(-1).cast(NcType::Int64).unwrap(),
            Value::Int64(-1)
        );
        assert!(Value::Int(300).cast(NcType::Byte).is_err());
        assert!(Value::Int(-1).cast(NcType::UInt).is_err());
        assert!(Value::Double(1.5).cast(NcType::Int).is_err());
        assert_eq!(Value::Double(4.0).cast(NcType::Short).unwrap(), Value::Short(4));
    }

    #[test]
    fn wide_integers_stay_exact() {
        let big = Value::UInt64(u64::MAX);
        assert_eq!(big.clone().cast(NcType::UInt64).unwrap(), big);
        assert!(big.cast(NcType::Double).is_err());
        assert!(Value::Int64(i64::MAX).cast(NcType::Double).is_err());
        assert_eq!(
            Value::Int64(1 << 53).cast(NcType::Double).unwrap(),
            Value::Double(9_007_199_254_740_992.0)
        );
    }

    #[test]
    fn strings_do_not_become_numbers() {
        let e = Value::from("8").cast(NcType::Int).unwrap_err();
        assert!(matches!(e, Error::TypeMismatch(_)));
        assert!(Value::Int(8).cast(NcType::String).is_err());
        assert_eq!(Value::from("a").cast(NcType::Char).unwrap(), Value::Char(b'a'));
    }

    #[test]
    fn floats_narrow_within_range() {
        assert_eq!(
            Value::Double(0.5).cast(NcType::Float).unwrap(),
            Value::Float(0.5)
        );
        assert!(Value::Double(1e300).cast(NcType::Float).is_err());
    }

    #[test]
    fn buffers_cast_elementwise() {
        let v = Values::from(vec![1_i32, 2, 3]).cast(NcType::UByte).unwrap();
        assert_eq!(v, Values::UBytes(vec![1, 2, 3]));
        assert_eq!(v.len(), 3);
        assert_eq!(v.get(1), Some(Value::UByte(2)));

        let e = Values::from(vec![1_i32, 256]).cast(NcType::UByte).unwrap_err();
        assert!(matches!(e, Error::TypeMismatch(_)));
    }
}
