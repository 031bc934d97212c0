//! Static spatial reference propagation

use ironview_catalog::FeatureSchema;
use ironview_common::{Srid, Value};
use ironview_expr::{Expression, SET_SRID};

/// Works out which spatial reference a geometry-valued expression carries.
/// No coordinate math happens here: references are only propagated.
pub struct SridEvaluator<'a> {
    schema: &'a FeatureSchema,
}

impl<'a> SridEvaluator<'a> {
    pub fn new(schema: &'a FeatureSchema) -> Self {
        SridEvaluator { schema }
    }

    /// The reference of the last geometry source visited, depth first
    pub fn evaluate(&self, expr: &Expression) -> Option<Srid> {
        let mut current = None;
        self.visit(expr, &mut current);
        current
    }

    fn visit(&self, expr: &Expression, current: &mut Option<Srid>) {
        match expr {
            Expression::Literal(Value::Geometry(g)) => *current = g.srid,
            Expression::Literal(_) => {}

            Expression::AttributeRef(name) => {
                if let Some(attr) = self.schema.get_attribute(name) {
                    if attr.is_geometry() {
                        *current = attr.srid;
                    }
                }
            }

            Expression::Function { name, args, .. } => {
                for arg in args {
                    self.visit(arg, current);
                }
                if name == SET_SRID {
                    if let Some(code) = args
                        .get(1)
                        .and_then(Expression::as_literal)
                        .and_then(Value::as_i64)
                        .and_then(|code| i32::try_from(code).ok())
                    {
                        *current = Some(Srid(code));
                    }
                }
            }

            Expression::BinaryArithmetic { left, right, .. } => {
                self.visit(left, current);
                self.visit(right, current);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironview_catalog::AttributeDescriptor;
    use ironview_common::{Geometry, GeometryKind, LogicalType};
    use ironview_expr::{DefaultExpressionFactory, ExpressionFactory};

    fn schema() -> FeatureSchema {
        FeatureSchema::new(
            "src",
            vec![
                AttributeDescriptor::geometry(
                    "geom",
                    LogicalType::Geometry(GeometryKind::Point),
                    Srid(4326),
                ),
                AttributeDescriptor::new("name", LogicalType::Varchar),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_propagates_through_functions() {
        let s = schema();
        let factory = DefaultExpressionFactory::new();
        let env = factory
            .function("envelope", vec![Expression::attribute("geom")])
            .unwrap();
        assert_eq!(SridEvaluator::new(&s).evaluate(&env), Some(Srid(4326)));
    }

    #[test]
    fn test_set_srid_and_literals() {
        let s = schema();
        let factory = DefaultExpressionFactory::new();
        let tagged = factory
            .function(
                SET_SRID,
                vec![Expression::attribute("geom"), Expression::literal(3857)],
            )
            .unwrap();
        assert_eq!(SridEvaluator::new(&s).evaluate(&tagged), Some(Srid(3857)));

        let literal = Expression::literal(Geometry::point(1.0, 2.0).with_srid(Srid(2154)));
        assert_eq!(SridEvaluator::new(&s).evaluate(&literal), Some(Srid(2154)));
        assert_eq!(
            SridEvaluator::new(&s).evaluate(&Expression::attribute("name")),
            None
        );
    }

    #[test]
    fn test_out_of_range_code_is_ignored() {
        let s = schema();
        let factory = DefaultExpressionFactory::new();
        let tagged = factory
            .function(
                SET_SRID,
                vec![Expression::attribute("geom"), Expression::literal(5_000_000_000i64)],
            )
            .unwrap();
        assert_eq!(SridEvaluator::new(&s).evaluate(&tagged), Some(Srid(4326)));
    }
}
