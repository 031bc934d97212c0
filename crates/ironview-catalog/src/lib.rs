//! IronView Catalog - Feature schemas and records
//!
//! The catalog crate describes what flows through a view: attribute
//! descriptors, the ordered schema they form, and features laid out
//! against a schema.

mod attribute;
mod feature;
mod schema;

pub use attribute::AttributeDescriptor;
pub use feature::Feature;
pub use schema::FeatureSchema;

#[cfg(test)]
mod tests {
    use super::*;
    use ironview_common::{Geometry, GeometryKind, LogicalType, Srid, Value};
    use std::sync::Arc;

    fn people() -> Arc<FeatureSchema> {
        Arc::new(
            FeatureSchema::new(
                "people",
                vec![
                    AttributeDescriptor::new("id", LogicalType::Integer).with_nullable(false),
                    AttributeDescriptor::geometry(
                        "geom",
                        LogicalType::Geometry(GeometryKind::Point),
                        Srid(4326),
                    ),
                    AttributeDescriptor::new("name", LogicalType::Varchar),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_schema_lookup() {
        let schema = people();
        assert_eq!(schema.index_of("name"), Some(2));
        assert!(schema.get_attribute("missing").is_none());
        assert_eq!(schema.default_geometry().unwrap().name, "geom");
        assert_eq!(schema.attribute_names(), vec!["id", "geom", "name"]);
    }

    #[test]
    fn test_duplicate_attribute_rejected() {
        let result = FeatureSchema::new(
            "dup",
            vec![
                AttributeDescriptor::new("a", LogicalType::Integer),
                AttributeDescriptor::new("a", LogicalType::Varchar),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_subset_keeps_requested_order() {
        let schema = people();
        let subset = schema
            .subset(&["name".to_string(), "id".to_string()])
            .unwrap();
        assert_eq!(subset.attribute_names(), vec!["name", "id"]);
        assert!(schema.subset(&["nope".to_string()]).is_err());
    }

    #[test]
    fn test_feature_access_and_retype() {
        let schema = people();
        let mut feature = Feature::new(
            "people.1",
            schema.clone(),
            vec![
                Value::Integer(1),
                Value::Geometry(Geometry::point(3.0, 4.0)),
                Value::from("Paul"),
            ],
        );
        assert_eq!(feature.get("name"), Some(&Value::from("Paul")));
        assert!(feature.set("name", Value::from("Anne")));
        assert!(!feature.set("age", Value::Integer(3)));
        assert_eq!(feature.bounds().unwrap().min_x, 3.0);

        let narrow = Arc::new(schema.subset(&["name".to_string()]).unwrap());
        let retyped = feature.retype(narrow);
        assert_eq!(retyped.values(), &[Value::from("Anne")]);
        assert_eq!(retyped.id, "people.1");
    }

    #[test]
    fn test_feature_pads_missing_values() {
        let feature = Feature::new("people.2", people(), vec![Value::Integer(2)]);
        assert_eq!(feature.values().len(), 3);
        assert_eq!(feature.get("name"), Some(&Value::Null));
    }
}
