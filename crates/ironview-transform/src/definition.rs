//! Output attribute declarations

use ironview_common::{LogicalType, Srid, Value};
use ironview_expr::{visitor, Expression};
use std::collections::BTreeSet;

/// How an output attribute relates to the source, decided once when the
/// definition is built
#[derive(Debug, Clone, PartialEq)]
pub enum Mapping {
    /// Pass-through of the named source attribute
    Rename(String),
    /// Derived from the expression
    Computed,
    /// The same value for every feature
    Constant(Value),
}

/// One output attribute of a view: a name and the expression computing it
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub name: String,
    pub expression: Expression,
    pub mapping: Mapping,
    /// Explicit type, overriding inference
    pub logical_type: Option<LogicalType>,
    /// Explicit spatial reference, meaningful for geometry attributes
    pub srid: Option<Srid>,
    pub description: Option<String>,
}

impl Definition {
    pub fn new(name: impl Into<String>, expression: Expression) -> Self {
        let mapping = match &expression {
            Expression::AttributeRef(source) => Mapping::Rename(source.clone()),
            Expression::Literal(value) => Mapping::Constant(value.clone()),
            _ => Mapping::Computed,
        };
        Definition {
            name: name.into(),
            expression,
            mapping,
            logical_type: None,
            srid: None,
            description: None,
        }
    }

    /// An attribute copying `source` under a new name
    pub fn rename(name: impl Into<String>, source: impl Into<String>) -> Self {
        Definition::new(name, Expression::attribute(source))
    }

    pub fn with_type(mut self, logical_type: LogicalType) -> Self {
        self.logical_type = Some(logical_type);
        self
    }

    pub fn with_srid(mut self, srid: Srid) -> Self {
        self.srid = Some(srid);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The source attribute this definition renames, if it is a rename
    pub fn source_attribute(&self) -> Option<&str> {
        match &self.mapping {
            Mapping::Rename(source) => Some(source),
            _ => None,
        }
    }

    /// Whether writes through this attribute can be mapped back to the source
    pub fn is_invertible(&self) -> bool {
        matches!(self.mapping, Mapping::Rename(_))
    }

    /// Source attributes the expression reads
    pub fn required_attributes(&self) -> BTreeSet<String> {
        visitor::attribute_refs(&self.expression)
    }
}
