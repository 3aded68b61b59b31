//! Mapping from native column types to Stata storage types and formats.

use crate::db::{DbColumnMetaData, NativeType};
use std::fmt;

/// The longest string Stata can store in one variable.
pub const MAX_STR_SIZE: i32 = 244;

/// Width of a value-translated column; labels are rendered as display text.
pub const TRANSLATED_STR_SIZE: i32 = 100;

/// A Stata storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StataType {
    Byte,
    Int,
    Long,
    Float,
    Double,
    /// Fixed-width string, e.g. `str20`.
    Str(i32),
}

impl StataType {
    /// Whether values are stored through the numeric setter.
    ///
    /// Everything that is not a string type is numeric in Stata.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, StataType::Str(_))
    }
}

impl fmt::Display for StataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StataType::Byte => write!(f, "byte"),
            StataType::Int => write!(f, "int"),
            StataType::Long => write!(f, "long"),
            StataType::Float => write!(f, "float"),
            StataType::Double => write!(f, "double"),
            StataType::Str(size) => write!(f, "str{}", size),
        }
    }
}

/// Map a probed column to its Stata storage type and display format.
///
/// The format masks are the ones Stata assigns by default for the same
/// storage types (as shown by `describe`).
pub fn map_type(meta: &DbColumnMetaData) -> (StataType, String) {
    match meta.native_type {
        NativeType::Date => (StataType::Double, "%td".to_string()),
        NativeType::Timestamp => (StataType::Double, "%tc".to_string()),
        NativeType::Varchar2 => {
            let size = meta.size.min(MAX_STR_SIZE);
            (StataType::Str(size), format!("%{}s", size))
        }
        NativeType::Number => {
            if meta.scale == 0 {
                if meta.precision <= 2 {
                    (StataType::Byte, "%8.0g".to_string())
                } else if meta.precision <= 4 {
                    (StataType::Int, "%8.0g".to_string())
                } else if meta.precision <= 9 {
                    (StataType::Long, "%12.0g".to_string())
                } else {
                    (StataType::Double, "%10.0g".to_string())
                }
            } else if meta.precision <= 7 {
                (StataType::Float, format!("%9.{}f", meta.scale))
            } else {
                (StataType::Double, format!("%10.{}f", meta.scale))
            }
        }
        NativeType::Integer => (StataType::Long, "%12.0g".to_string()),
        NativeType::Other => (
            StataType::Str(MAX_STR_SIZE),
            format!("%{}s", MAX_STR_SIZE),
        ),
    }
}

/// The mapping for a column whose values are translated through labels.
pub fn translated_type() -> (StataType, String) {
    (
        StataType::Str(TRANSLATED_STR_SIZE),
        format!("%{}s", TRANSLATED_STR_SIZE),
    )
}
