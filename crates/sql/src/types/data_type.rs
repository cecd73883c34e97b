//! SQL type codes and resolved type descriptors
//!
//! `TypeCode` is the fixed vocabulary of SQL and extended types the engine
//! understands; `TypeDescriptor` pairs a code with the length/precision/scale
//! attributes that are meaningful for it. Classification is table membership,
//! not inheritance: BOOLEAN is non-numeric here even though some aggregate
//! rules promote it (see `functions::aggregate`).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL and extended type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCode {
    // Integer family
    SmallInt,
    Int,
    BigInt,
    // Exact and approximate numerics
    Numeric,
    Float,
    Double,
    Money,
    // Character family
    Char,
    VarChar,
    Text,
    Name,
    // Bit strings
    Bit,
    VarBit,
    // Date/time family
    Date,
    Time,
    TimeTz,
    Timestamp,
    TimestampTz,
    Interval,
    // Booleans and raw bytes
    Boolean,
    Bytea,
    // Network types
    Inet,
    Cidr,
    MacAddr,
    // Spatial family
    Geometry,
    Box2d,
    Box3d,
    Point,
    LineString,
    Polygon,
    Path,
    Circle,
    // Misc extended types
    Uuid,
    Xml,
    Json,
    Oid,
    // NULL literal and not-yet-resolved expressions
    Null,
    Unknown,
}

impl TypeCode {
    /// Rank within the numeric widening order. Lower ranks widen into higher
    /// ones; the ordering int < bigint < numeric < float < double is load
    /// bearing for implicit casts downstream.
    fn numeric_rank(self) -> Option<u8> {
        match self {
            TypeCode::SmallInt => Some(0),
            TypeCode::Int => Some(1),
            TypeCode::BigInt => Some(2),
            TypeCode::Numeric => Some(3),
            TypeCode::Float => Some(4),
            TypeCode::Double => Some(5),
            _ => None,
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeCode::SmallInt => "SMALLINT",
            TypeCode::Int => "INT",
            TypeCode::BigInt => "BIGINT",
            TypeCode::Numeric => "NUMERIC",
            TypeCode::Float => "FLOAT",
            TypeCode::Double => "DOUBLE PRECISION",
            TypeCode::Money => "MONEY",
            TypeCode::Char => "CHAR",
            TypeCode::VarChar => "VARCHAR",
            TypeCode::Text => "TEXT",
            TypeCode::Name => "NAME",
            TypeCode::Bit => "BIT",
            TypeCode::VarBit => "VARBIT",
            TypeCode::Date => "DATE",
            TypeCode::Time => "TIME",
            TypeCode::TimeTz => "TIME WITH TIME ZONE",
            TypeCode::Timestamp => "TIMESTAMP",
            TypeCode::TimestampTz => "TIMESTAMP WITH TIME ZONE",
            TypeCode::Interval => "INTERVAL",
            TypeCode::Boolean => "BOOLEAN",
            TypeCode::Bytea => "BYTEA",
            TypeCode::Inet => "INET",
            TypeCode::Cidr => "CIDR",
            TypeCode::MacAddr => "MACADDR",
            TypeCode::Geometry => "GEOMETRY",
            TypeCode::Box2d => "BOX2D",
            TypeCode::Box3d => "BOX3D",
            TypeCode::Point => "POINT",
            TypeCode::LineString => "LINESTRING",
            TypeCode::Polygon => "POLYGON",
            TypeCode::Path => "PATH",
            TypeCode::Circle => "CIRCLE",
            TypeCode::Uuid => "UUID",
            TypeCode::Xml => "XML",
            TypeCode::Json => "JSON",
            TypeCode::Oid => "OID",
            TypeCode::Null => "NULL",
            TypeCode::Unknown => "UNKNOWN",
        };
        write!(f, "{}", name)
    }
}

/// A resolved SQL type: code plus the attributes that matter for it.
/// Length applies to character/bit types, precision and scale to NUMERIC.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub code: TypeCode,
    pub length: u32,
    pub precision: u32,
    pub scale: u32,
}

impl TypeDescriptor {
    pub fn new(code: TypeCode) -> Self {
        Self {
            code,
            length: 0,
            precision: 0,
            scale: 0,
        }
    }

    pub fn with_length(code: TypeCode, length: u32) -> Self {
        Self {
            code,
            length,
            precision: 0,
            scale: 0,
        }
    }

    pub fn numeric(precision: u32, scale: u32) -> Self {
        Self {
            code: TypeCode::Numeric,
            length: 0,
            precision,
            scale,
        }
    }

    /// The sole mutator. Descriptors attached to an expression are not
    /// changed afterwards except by documented normalization paths.
    pub fn set_type(&mut self, code: TypeCode, length: u32, precision: u32, scale: u32) {
        self.code = code;
        self.length = length;
        self.precision = precision;
        self.scale = scale;
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.code,
            TypeCode::SmallInt
                | TypeCode::Int
                | TypeCode::BigInt
                | TypeCode::Numeric
                | TypeCode::Float
                | TypeCode::Double
        )
    }

    pub fn is_exact_numeric(&self) -> bool {
        matches!(
            self.code,
            TypeCode::SmallInt | TypeCode::Int | TypeCode::BigInt | TypeCode::Numeric
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self.code,
            TypeCode::SmallInt | TypeCode::Int | TypeCode::BigInt
        )
    }

    pub fn is_character(&self) -> bool {
        matches!(
            self.code,
            TypeCode::Char | TypeCode::VarChar | TypeCode::Text | TypeCode::Name
        )
    }

    pub fn is_bit(&self) -> bool {
        matches!(self.code, TypeCode::Bit | TypeCode::VarBit)
    }

    pub fn is_date_time(&self) -> bool {
        matches!(
            self.code,
            TypeCode::Date
                | TypeCode::Time
                | TypeCode::TimeTz
                | TypeCode::Timestamp
                | TypeCode::TimestampTz
                | TypeCode::Interval
        )
    }

    pub fn is_spatial(&self) -> bool {
        matches!(
            self.code,
            TypeCode::Geometry
                | TypeCode::Box2d
                | TypeCode::Box3d
                | TypeCode::Point
                | TypeCode::LineString
                | TypeCode::Polygon
                | TypeCode::Path
                | TypeCode::Circle
        )
    }

    pub fn is_null(&self) -> bool {
        self.code == TypeCode::Null
    }

    /// Merge two numeric types into the wider one. Commutative; the result
    /// is at least as wide as both inputs. For NUMERIC operands the merged
    /// precision and scale are the componentwise maxima.
    pub fn merge_numeric(a: &TypeDescriptor, b: &TypeDescriptor) -> Result<TypeDescriptor> {
        let ra = a
            .code
            .numeric_rank()
            .ok_or_else(|| Error::InvalidDataType(a.code.to_string()))?;
        let rb = b
            .code
            .numeric_rank()
            .ok_or_else(|| Error::InvalidDataType(b.code.to_string()))?;

        let wider = if ra >= rb { a } else { b };
        let mut merged = TypeDescriptor::new(wider.code);
        if wider.code == TypeCode::Numeric {
            merged.precision = a.precision.max(b.precision);
            merged.scale = a.scale.max(b.scale);
        }
        Ok(merged)
    }

    /// SQL rendering of the type, as it appears in CAST targets.
    pub fn sql_name(&self) -> String {
        match self.code {
            TypeCode::Char | TypeCode::VarChar | TypeCode::Bit | TypeCode::VarBit
                if self.length > 0 =>
            {
                format!("{}({})", self.code, self.length)
            }
            TypeCode::Numeric if self.precision > 0 => {
                if self.scale > 0 {
                    format!("NUMERIC({}, {})", self.precision, self.scale)
                } else {
                    format!("NUMERIC({})", self.precision)
                }
            }
            _ => self.code.to_string(),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql_name())
    }
}
