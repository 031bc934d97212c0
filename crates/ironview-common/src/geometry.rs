//! Geometry values and spatial reference identifiers
//!
//! IronView never reprojects or otherwise computes on coordinates; geometries
//! are carried through views as opaque shapes tagged with the spatial
//! reference they were produced in. The only geometric operation offered is
//! the bounding envelope, which bounds and bbox filters need.

use crate::types::GeometryKind;
use std::fmt;

/// A spatial reference identifier (an EPSG-style code)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Srid(pub i32);

impl Srid {
    pub fn code(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Srid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

/// A single coordinate pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Coord { x, y }
    }
}

/// The coordinates of a geometry
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(Coord),
    LineString(Vec<Coord>),
    /// Exterior ring only
    Polygon(Vec<Coord>),
}

impl Shape {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Shape::Point(_) => GeometryKind::Point,
            Shape::LineString(_) => GeometryKind::LineString,
            Shape::Polygon(_) => GeometryKind::Polygon,
        }
    }

    fn coords(&self) -> &[Coord] {
        match self {
            Shape::Point(c) => std::slice::from_ref(c),
            Shape::LineString(cs) | Shape::Polygon(cs) => cs,
        }
    }
}

/// A geometry value with an optional attached spatial reference
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub shape: Shape,
    pub srid: Option<Srid>,
}

impl Geometry {
    pub fn new(shape: Shape) -> Self {
        Geometry { shape, srid: None }
    }

    pub fn point(x: f64, y: f64) -> Self {
        Geometry::new(Shape::Point(Coord::new(x, y)))
    }

    pub fn with_srid(mut self, srid: Srid) -> Self {
        self.srid = Some(srid);
        self
    }

    pub fn kind(&self) -> GeometryKind {
        self.shape.kind()
    }

    /// The bounding envelope, or None for a shape without coordinates
    pub fn envelope(&self) -> Option<Envelope> {
        let mut coords = self.shape.coords().iter();
        let first = coords.next()?;
        let mut env = Envelope::new(first.x, first.y, first.x, first.y);
        for c in coords {
            env.expand_to_include_coord(*c);
        }
        Some(env)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn ring(f: &mut fmt::Formatter<'_>, coords: &[Coord]) -> fmt::Result {
            for (i, c) in coords.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{} {}", c.x, c.y)?;
            }
            Ok(())
        }

        if let Some(srid) = self.srid {
            write!(f, "SRID={};", srid.code())?;
        }
        match &self.shape {
            Shape::Point(c) => write!(f, "POINT ({} {})", c.x, c.y),
            Shape::LineString(cs) => {
                write!(f, "LINESTRING (")?;
                ring(f, cs)?;
                write!(f, ")")
            }
            Shape::Polygon(cs) => {
                write!(f, "POLYGON ((")?;
                ring(f, cs)?;
                write!(f, "))")
            }
        }
    }
}

/// An axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Envelope {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn expand_to_include_coord(&mut self, c: Coord) {
        self.min_x = self.min_x.min(c.x);
        self.min_y = self.min_y.min(c.y);
        self.max_x = self.max_x.max(c.x);
        self.max_y = self.max_y.max(c.y);
    }

    pub fn expand_to_include(&mut self, other: &Envelope) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Merge an optional running envelope with another one
    pub fn union(acc: Option<Envelope>, other: &Envelope) -> Envelope {
        match acc {
            Some(mut env) => {
                env.expand_to_include(other);
                env
            }
            None => *other,
        }
    }

    /// The envelope as a closed polygon ring
    pub fn to_geometry(&self) -> Geometry {
        Geometry::new(Shape::Polygon(vec![
            Coord::new(self.min_x, self.min_y),
            Coord::new(self.max_x, self.min_y),
            Coord::new(self.max_x, self.max_y),
            Coord::new(self.min_x, self.max_y),
            Coord::new(self.min_x, self.min_y),
        ]))
    }
}
