//! Feature schema management

use super::AttributeDescriptor;
use hashbrown::HashMap;
use ironview_common::{Error, Result};

/// The ordered attribute list of a feature type
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    /// Type name
    pub name: String,
    /// Attributes in declaration order
    attributes: Vec<AttributeDescriptor>,
    /// Attribute name -> position
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Create a schema, rejecting duplicate attribute names
    pub fn new(name: impl Into<String>, attributes: Vec<AttributeDescriptor>) -> Result<Self> {
        let name = name.into();
        let mut index = HashMap::with_capacity(attributes.len());
        for (idx, attr) in attributes.iter().enumerate() {
            if index.insert(attr.name.clone(), idx).is_some() {
                return Err(Error::Configuration(format!(
                    "Duplicate attribute {} in {}",
                    attr.name, name
                )));
            }
        }
        Ok(FeatureSchema {
            name,
            attributes,
            index,
        })
    }

    /// Get an attribute by name
    pub fn get_attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.index.get(name).map(|&idx| &self.attributes[idx])
    }

    /// Position of an attribute
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    /// Get the number of attributes
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Get attribute names
    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }

    /// The first geometry-valued attribute
    pub fn default_geometry(&self) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.is_geometry())
    }

    /// A schema holding only the named attributes, in the order given
    pub fn subset(&self, names: &[String]) -> Result<FeatureSchema> {
        let attributes = names
            .iter()
            .map(|n| {
                self.get_attribute(n)
                    .cloned()
                    .ok_or_else(|| Error::AttributeNotFound(format!("{}.{}", self.name, n)))
            })
            .collect::<Result<Vec<_>>>()?;
        FeatureSchema::new(self.name.clone(), attributes)
    }
}

impl PartialEq for FeatureSchema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.attributes == other.attributes
    }
}
