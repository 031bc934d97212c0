//! Declarative view definitions
//!
//! ```toml
//! name = "people_view"
//! sort_memory_limit = 50000
//!
//! [[attributes]]
//! name = "label"
//! expression = "concat(name, '!')"
//! type = "Varchar"
//! ```

use super::{Definition, ViewOptions};
use ironview_common::{Error, LogicalType, Result, Srid};
use ironview_expr::ExpressionFactory;
use ironview_parser::parse_expression;
use serde::Deserialize;

/// A view as declared in configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ViewConfig {
    pub name: String,
    #[serde(default)]
    pub sort_memory_limit: Option<usize>,
    #[serde(default)]
    pub attributes: Vec<AttributeConfig>,
}

/// One output attribute, in declaration order
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AttributeConfig {
    pub name: String,
    pub expression: String,
    #[serde(default, rename = "type")]
    pub logical_type: Option<String>,
    #[serde(default)]
    pub srid: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ViewConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Configuration(format!("Invalid view config: {}", e)))
    }

    /// Parse every attribute's expression into a definition
    pub fn definitions(&self, factory: &dyn ExpressionFactory) -> Result<Vec<Definition>> {
        self.attributes
            .iter()
            .map(|attr| attr.definition(factory))
            .collect()
    }

    pub fn options(&self) -> ViewOptions {
        let mut options = ViewOptions::default();
        if let Some(limit) = self.sort_memory_limit {
            options.sort_memory_limit = limit;
        }
        options
    }
}

impl AttributeConfig {
    fn definition(&self, factory: &dyn ExpressionFactory) -> Result<Definition> {
        let expression = parse_expression(&self.expression, factory).map_err(|e| {
            Error::Configuration(format!("Attribute {}: {}", self.name, e))
        })?;
        let mut def = Definition::new(self.name.clone(), expression);
        if let Some(name) = &self.logical_type {
            def = def.with_type(name.parse::<LogicalType>()?);
        }
        if let Some(code) = self.srid {
            def = def.with_srid(Srid(code));
        }
        if let Some(text) = &self.description {
            def = def.with_description(text.clone());
        }
        Ok(def)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mapping;
    use ironview_common::GeometryKind;
    use ironview_expr::DefaultExpressionFactory;

    const PEOPLE: &str = r#"
        name = "people_view"
        sort_memory_limit = 500

        [[attributes]]
        name = "who"
        expression = "name"

        [[attributes]]
        name = "label"
        expression = "concat(name, '!')"
        type = "varchar"
        description = "greeting"

        [[attributes]]
        name = "where"
        expression = "geom"
        type = "Point"
        srid = 4326
    "#;

    #[test]
    fn test_load_definitions() {
        let config = ViewConfig::from_toml(PEOPLE).unwrap();
        assert_eq!(config.name, "people_view");
        assert_eq!(config.options().sort_memory_limit, 500);

        let defs = config.definitions(&DefaultExpressionFactory::new()).unwrap();
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["who", "label", "where"]);
        assert_eq!(defs[0].mapping, Mapping::Rename("name".into()));
        assert_eq!(defs[1].mapping, Mapping::Computed);
        assert_eq!(defs[1].logical_type, Some(LogicalType::Varchar));
        assert_eq!(defs[1].description.as_deref(), Some("greeting"));
        assert_eq!(
            defs[2].logical_type,
            Some(LogicalType::Geometry(GeometryKind::Point))
        );
        assert_eq!(defs[2].srid, Some(Srid(4326)));
    }

    #[test]
    fn test_default_options() {
        let config = ViewConfig::from_toml("name = \"v\"").unwrap();
        assert!(config.attributes.is_empty());
        assert_eq!(config.options(), ViewOptions::default());
    }

    #[test]
    fn test_bad_config() {
        assert!(matches!(
            ViewConfig::from_toml("name = ").unwrap_err(),
            Error::Configuration(_)
        ));

        let bad_type = ViewConfig::from_toml(
            "name = \"v\"\n[[attributes]]\nname = \"a\"\nexpression = \"x\"\ntype = \"blob\"",
        )
        .unwrap();
        let err = bad_type
            .definitions(&DefaultExpressionFactory::new())
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let bad_expr = ViewConfig::from_toml(
            "name = \"v\"\n[[attributes]]\nname = \"a\"\nexpression = \"nosuchfn(x)\"",
        )
        .unwrap();
        let err = bad_expr
            .definitions(&DefaultExpressionFactory::new())
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
