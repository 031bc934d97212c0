//! Attribute definition

use ironview_common::{LogicalType, Srid};

/// One named, typed attribute of a feature schema
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDescriptor {
    /// Attribute name, unique within its schema
    pub name: String,
    /// Attribute type
    pub logical_type: LogicalType,
    /// Whether the attribute allows NULL values
    pub nullable: bool,
    /// Spatial reference of geometry-valued attributes
    pub srid: Option<Srid>,
    /// Free-form description
    pub description: Option<String>,
}

impl AttributeDescriptor {
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        AttributeDescriptor {
            name: name.into(),
            logical_type,
            nullable: true,
            srid: None,
            description: None,
        }
    }

    /// A geometry attribute in the given spatial reference
    pub fn geometry(name: impl Into<String>, logical_type: LogicalType, srid: Srid) -> Self {
        AttributeDescriptor::new(name, logical_type).with_srid(Some(srid))
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_srid(mut self, srid: Option<Srid>) -> Self {
        self.srid = srid;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// The same attribute under another name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        AttributeDescriptor {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn is_geometry(&self) -> bool {
        self.logical_type.is_geometry()
    }
}
