use crate::{Error, Result};

/// Type of a metadata column, decoded from the low five bits of its descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ElementType {
    Null,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    String,
    Bytes,
}

impl ElementType {
    /// Decode the type from a column descriptor byte (`(tag & 0x1f) - 0xf`).
    pub fn from_descriptor(descriptor: u8) -> Result<Self> {
        let code = (descriptor & 0x1F).checked_sub(0x0F);

        Ok(match code {
            Some(0) => Self::Null,
            Some(1) => Self::I8,
            Some(2) => Self::U8,
            Some(3) => Self::I16,
            Some(4) => Self::U16,
            Some(5) => Self::I32,
            Some(6) => Self::U32,
            Some(7) => Self::I64,
            Some(8) => Self::U64,
            Some(9) => Self::F32,
            Some(11) => Self::String,
            Some(12) => Self::Bytes,
            _ => return Err(Error::UnknownElementType(descriptor)),
        })
    }

    /// Inverse of [`ElementType::from_descriptor`], without storage bits.
    pub fn code(self) -> u8 {
        match self {
            Self::Null => 0,
            Self::I8 => 1,
            Self::U8 => 2,
            Self::I16 => 3,
            Self::U16 => 4,
            Self::I32 => 5,
            Self::U32 => 6,
            Self::I64 => 7,
            Self::U64 => 8,
            Self::F32 => 9,
            Self::String => 11,
            Self::Bytes => 12,
        }
    }
}

/// Where a column keeps its values, from the top three bits of its descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    /// No value; every row holds null.
    Null,
    /// One value shared by every row, stored inline in the column scan.
    Constant,
    /// One value per row, stored row-major after the column scan.
    PerRow,
}

impl StorageKind {
    pub fn from_descriptor(descriptor: u8) -> Option<Self> {
        match descriptor >> 5 {
            0 => Some(Self::Null),
            1 => Some(Self::Constant),
            2 => Some(Self::PerRow),
            _ => None,
        }
    }
}

/// Decoded value of one metadata cell.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ElementValue {
    #[default]
    Null,
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    String(String),
    Bytes(Vec<u8>),
}

impl ElementValue {
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Null => ElementType::Null,
            Self::I8(_) => ElementType::I8,
            Self::U8(_) => ElementType::U8,
            Self::I16(_) => ElementType::I16,
            Self::U16(_) => ElementType::U16,
            Self::I32(_) => ElementType::I32,
            Self::U32(_) => ElementType::U32,
            Self::I64(_) => ElementType::I64,
            Self::U64(_) => ElementType::U64,
            Self::F32(_) => ElementType::F32,
            Self::String(_) => ElementType::String,
            Self::Bytes(_) => ElementType::Bytes,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Any integer value reinterpreted as a `u32` (two's complement for signed types,
    /// truncated for 64-bit types).
    pub fn as_u32(&self) -> Option<u32> {
        Some(match *self {
            Self::I8(x) => x as u32,
            Self::U8(x) => x as u32,
            Self::I16(x) => x as u32,
            Self::U16(x) => x as u32,
            Self::I32(x) => x as u32,
            Self::U32(x) => x,
            Self::I64(x) => x as u32,
            Self::U64(x) => x as u32,
            _ => return None,
        })
    }

    /// Any integer value widened to `i64`. `U64` values above `i64::MAX` yield `None`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::I8(x) => Some(x as i64),
            Self::U8(x) => Some(x as i64),
            Self::I16(x) => Some(x as i64),
            Self::U16(x) => Some(x as i64),
            Self::I32(x) => Some(x as i64),
            Self::U32(x) => Some(x as i64),
            Self::I64(x) => Some(x),
            Self::U64(x) => i64::try_from(x).ok(),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Self::F32(x) => Some(x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(x) => Some(x.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(x) => Some(x.as_slice()),
            _ => None,
        }
    }
}

impl std::fmt::Display for ElementValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::I8(x) => write!(f, "{}", x),
            Self::U8(x) => write!(f, "{}", x),
            Self::I16(x) => write!(f, "{}", x),
            Self::U16(x) => write!(f, "{}", x),
            Self::I32(x) => write!(f, "{}", x),
            Self::U32(x) => write!(f, "{}", x),
            Self::I64(x) => write!(f, "{}", x),
            Self::U64(x) => write!(f, "{}", x),
            Self::F32(x) => write!(f, "{}", x),
            Self::String(x) => write!(f, "{:?}", x),
            Self::Bytes(x) => write!(f, "<{} bytes>", x.len()),
        }
    }
}

/// One named cell of a metadata row.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MetaElement {
    name: String,
    value: ElementValue,
}

impl MetaElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: ElementValue::Null,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &ElementValue {
        &self.value
    }

    pub fn set_value(&mut self, value: ElementValue) {
        self.value = value;
    }

    pub fn element_type(&self) -> ElementType {
        self.value.element_type()
    }
}
