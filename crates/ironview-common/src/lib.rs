//! IronView Common - Core types and utilities shared across all crates
//!
//! This crate provides the foundational types used throughout IronView:
//! - `LogicalType`: The attribute type system, including geometry types
//! - `Value`: Runtime value representation
//! - `Geometry`, `Envelope`, `Srid`: Spatial values and their reference codes
//! - `Error`: Unified error types

pub mod error;
pub mod geometry;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use geometry::{Coord, Envelope, Geometry, Shape, Srid};
pub use types::{GeometryKind, LogicalType};
pub use value::Value;
