//! Features: one record of a feature type

use super::FeatureSchema;
use ironview_common::{Envelope, Value};
use std::sync::Arc;

/// A single record with values laid out in schema order
#[derive(Debug, Clone)]
pub struct Feature {
    /// Feature identifier, conventionally `<typeName>.<n>`
    pub id: String,
    schema: Arc<FeatureSchema>,
    values: Vec<Value>,
}

impl Feature {
    /// Build a feature; missing trailing values are padded with NULL
    pub fn new(id: impl Into<String>, schema: Arc<FeatureSchema>, mut values: Vec<Value>) -> Self {
        values.resize(schema.attribute_count(), Value::Null);
        Feature {
            id: id.into(),
            schema,
            values,
        }
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value of the named attribute, None when the schema lacks it
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).map(|idx| &self.values[idx])
    }

    /// Replace the value of the named attribute; returns false if absent
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.schema.index_of(name) {
            Some(idx) => {
                self.values[idx] = value;
                true
            }
            None => false,
        }
    }

    /// Envelope of the default geometry, if any
    pub fn bounds(&self) -> Option<Envelope> {
        let geom = self.schema.default_geometry()?;
        self.get(&geom.name)?.as_geometry()?.envelope()
    }

    /// The same feature reduced to `schema`, taking values by name
    pub fn retype(&self, schema: Arc<FeatureSchema>) -> Feature {
        let values = schema
            .attributes()
            .iter()
            .map(|a| self.get(&a.name).cloned().unwrap_or(Value::Null))
            .collect();
        Feature {
            id: self.id.clone(),
            schema,
            values,
        }
    }
}
