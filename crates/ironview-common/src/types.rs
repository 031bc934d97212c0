//! Logical type system for IronView
//!
//! Every attribute of a feature schema has a LogicalType. Geometry-valued
//! attributes additionally carry the kind of shape they hold; their spatial
//! reference lives on the attribute descriptor, not on the type.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// The kind of shape held by a geometry-valued attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// Any shape
    Any,
    Point,
    LineString,
    Polygon,
}

/// Type of an attribute or expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogicalType {
    /// Type of the NULL literal
    Null,
    Boolean,
    Integer,
    BigInt,
    Float,
    Double,
    Varchar,
    Date,
    Timestamp,
    Geometry(GeometryKind),
    /// Return type of generic functions
    Any,
    /// Not yet inferred
    Unknown,
}

impl LogicalType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            LogicalType::Integer | LogicalType::BigInt | LogicalType::Float | LogicalType::Double
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, LogicalType::Integer | LogicalType::BigInt)
    }

    pub fn is_geometry(&self) -> bool {
        matches!(self, LogicalType::Geometry(_))
    }

    /// Placeholder types that say nothing about the value
    pub fn is_generic(&self) -> bool {
        matches!(self, LogicalType::Any | LogicalType::Unknown)
    }

    /// Result type of binary arithmetic over two numeric operand types.
    ///
    /// Integer with integer stays integer, any mix of integer and bigint
    /// widens to bigint, everything else is computed in double precision.
    pub fn promote_arithmetic(&self, other: &LogicalType) -> LogicalType {
        match (self, other) {
            (LogicalType::Integer, LogicalType::Integer) => LogicalType::Integer,
            (a, b) if a.is_integer() && b.is_integer() => LogicalType::BigInt,
            _ => LogicalType::Double,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Null => write!(f, "NULL"),
            LogicalType::Boolean => write!(f, "BOOLEAN"),
            LogicalType::Integer => write!(f, "INTEGER"),
            LogicalType::BigInt => write!(f, "BIGINT"),
            LogicalType::Float => write!(f, "FLOAT"),
            LogicalType::Double => write!(f, "DOUBLE"),
            LogicalType::Varchar => write!(f, "VARCHAR"),
            LogicalType::Date => write!(f, "DATE"),
            LogicalType::Timestamp => write!(f, "TIMESTAMP"),
            LogicalType::Geometry(GeometryKind::Any) => write!(f, "GEOMETRY"),
            LogicalType::Geometry(GeometryKind::Point) => write!(f, "POINT"),
            LogicalType::Geometry(GeometryKind::LineString) => write!(f, "LINESTRING"),
            LogicalType::Geometry(GeometryKind::Polygon) => write!(f, "POLYGON"),
            LogicalType::Any => write!(f, "ANY"),
            LogicalType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl FromStr for LogicalType {
    type Err = Error;

    /// Parse a type name as written in view declarations (case-insensitive)
    fn from_str(s: &str) -> Result<Self> {
        let ty = match s.trim().to_lowercase().as_str() {
            "boolean" | "bool" => LogicalType::Boolean,
            "integer" | "int" | "int4" => LogicalType::Integer,
            "bigint" | "long" | "int8" => LogicalType::BigInt,
            "float" | "real" => LogicalType::Float,
            "double" | "float8" => LogicalType::Double,
            "varchar" | "string" | "text" => LogicalType::Varchar,
            "date" => LogicalType::Date,
            "timestamp" => LogicalType::Timestamp,
            "geometry" => LogicalType::Geometry(GeometryKind::Any),
            "point" => LogicalType::Geometry(GeometryKind::Point),
            "linestring" => LogicalType::Geometry(GeometryKind::LineString),
            "polygon" => LogicalType::Geometry(GeometryKind::Polygon),
            _ => {
                return Err(Error::Configuration(format!("Unknown type name: {}", s)));
            }
        };
        Ok(ty)
    }
}

impl Default for LogicalType {
    fn default() -> Self {
        LogicalType::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric() {
        assert!(LogicalType::Integer.is_numeric());
        assert!(LogicalType::Double.is_numeric());
        assert!(!LogicalType::Varchar.is_numeric());
        assert!(!LogicalType::Geometry(GeometryKind::Point).is_numeric());
    }

    #[test]
    fn test_promote_arithmetic() {
        use LogicalType::*;
        assert_eq!(Integer.promote_arithmetic(&Integer), Integer);
        assert_eq!(Integer.promote_arithmetic(&BigInt), BigInt);
        assert_eq!(BigInt.promote_arithmetic(&BigInt), BigInt);
        assert_eq!(Integer.promote_arithmetic(&Double), Double);
        assert_eq!(Float.promote_arithmetic(&Integer), Double);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("Integer".parse::<LogicalType>().unwrap(), LogicalType::Integer);
        assert_eq!("LONG".parse::<LogicalType>().unwrap(), LogicalType::BigInt);
        assert_eq!(
            "Point".parse::<LogicalType>().unwrap(),
            LogicalType::Geometry(GeometryKind::Point)
        );
        assert!("blob".parse::<LogicalType>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(LogicalType::Integer.to_string(), "INTEGER");
        assert_eq!(LogicalType::Geometry(GeometryKind::Any).to_string(), "GEOMETRY");
    }
}
