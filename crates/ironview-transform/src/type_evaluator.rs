//! Static type inference over expression trees

use ironview_catalog::FeatureSchema;
use ironview_common::{Error, LogicalType, Result, Srid, Value};
use ironview_expr::{Expression, EXPLICIT_CONVERT};

/// Infers the type an expression produces against a source schema.
///
/// `Ok(None)` means the type cannot be known statically. Visiting a
/// geometry attribute records its spatial reference; when several are
/// visited the last one wins.
pub struct TypeEvaluator<'a> {
    schema: &'a FeatureSchema,
    srid: Option<Srid>,
}

impl<'a> TypeEvaluator<'a> {
    pub fn new(schema: &'a FeatureSchema) -> Self {
        TypeEvaluator { schema, srid: None }
    }

    /// Spatial reference of the last geometry attribute visited
    pub fn srid(&self) -> Option<Srid> {
        self.srid
    }

    pub fn evaluate(&mut self, expr: &Expression) -> Result<Option<LogicalType>> {
        match expr {
            Expression::Literal(Value::Null) => Ok(None),
            Expression::Literal(value) => Ok(Some(value.logical_type())),

            Expression::AttributeRef(name) => {
                let attr = self.schema.get_attribute(name).ok_or_else(|| {
                    Error::AttributeNotFound(format!("{}.{}", self.schema.name, name))
                })?;
                if attr.is_geometry() {
                    self.srid = attr.srid;
                }
                Ok(Some(attr.logical_type.clone()))
            }

            Expression::Function {
                name,
                args,
                return_type,
            } => {
                for arg in args {
                    self.evaluate(arg)?;
                }
                if !return_type.is_generic() {
                    return Ok(Some(return_type.clone()));
                }
                if name == EXPLICIT_CONVERT {
                    let target = args
                        .get(1)
                        .and_then(Expression::as_literal)
                        .and_then(Value::as_str)
                        .and_then(|t| t.parse::<LogicalType>().ok());
                    return Ok(target);
                }
                Ok(None)
            }

            Expression::BinaryArithmetic { left, right, .. } => {
                let l = self.operand_type(left)?;
                let r = self.operand_type(right)?;
                match (l, r) {
                    (Some(l), Some(r)) => Ok(Some(l.promote_arithmetic(&r))),
                    _ => Ok(None),
                }
            }
        }
    }

    /// Numeric type of an arithmetic operand
    fn operand_type(&mut self, expr: &Expression) -> Result<Option<LogicalType>> {
        let ty = match self.evaluate(expr)? {
            Some(ty) => ty,
            None => return Ok(None),
        };
        if ty.is_numeric() {
            return Ok(Some(ty));
        }
        match expr.as_literal() {
            Some(value) => Ok(Some(classify_number(&value.to_string()))),
            None => Ok(Some(LogicalType::Double)),
        }
    }
}

/// Numeric type of a literal written as text
fn classify_number(text: &str) -> LogicalType {
    let text = text.trim();
    if text.parse::<i32>().is_ok() {
        LogicalType::Integer
    } else if text.parse::<i64>().is_ok() {
        LogicalType::BigInt
    } else {
        LogicalType::Double
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironview_catalog::AttributeDescriptor;
    use ironview_common::GeometryKind;
    use ironview_expr::{
        ArithmeticOperator, DefaultExpressionFactory, ExpressionFactory,
    };

    fn schema() -> FeatureSchema {
        FeatureSchema::new(
            "src",
            vec![
                AttributeDescriptor::new("i", LogicalType::Integer),
                AttributeDescriptor::new("l", LogicalType::BigInt),
                AttributeDescriptor::new("d", LogicalType::Double),
                AttributeDescriptor::new("s", LogicalType::Varchar),
                AttributeDescriptor::geometry(
                    "g1",
                    LogicalType::Geometry(GeometryKind::Point),
                    Srid(4326),
                ),
                AttributeDescriptor::geometry(
                    "g2",
                    LogicalType::Geometry(GeometryKind::Point),
                    Srid(3857),
                ),
            ],
        )
        .unwrap()
    }

    fn add(l: Expression, r: Expression) -> Expression {
        DefaultExpressionFactory::new().arithmetic(l, ArithmeticOperator::Add, r)
    }

    fn infer(expr: &Expression) -> Option<LogicalType> {
        let s = schema();
        TypeEvaluator::new(&s).evaluate(expr).unwrap()
    }

    #[test]
    fn test_numeric_promotion() {
        let a = |n: &str| Expression::attribute(n);
        assert_eq!(infer(&add(a("i"), a("i"))), Some(LogicalType::Integer));
        assert_eq!(infer(&add(a("i"), a("l"))), Some(LogicalType::BigInt));
        assert_eq!(infer(&add(a("i"), a("d"))), Some(LogicalType::Double));
        assert_eq!(infer(&add(a("i"), a("s"))), Some(LogicalType::Double));
    }

    #[test]
    fn test_string_literal_reclassified() {
        let a = |n: &str| Expression::attribute(n);
        let lit = |v: &str| Expression::literal(v);
        assert_eq!(infer(&add(a("i"), lit("7"))), Some(LogicalType::Integer));
        assert_eq!(infer(&add(a("i"), lit("5000000000"))), Some(LogicalType::BigInt));
        assert_eq!(infer(&add(a("i"), lit("1.5"))), Some(LogicalType::Double));
        assert_eq!(infer(&add(a("i"), lit("abc"))), Some(LogicalType::Double));
    }

    #[test]
    fn test_function_types() {
        let factory = DefaultExpressionFactory::new();
        let concat = factory
            .function("concat", vec![Expression::attribute("s"), Expression::literal("!")])
            .unwrap();
        assert_eq!(infer(&concat), Some(LogicalType::Varchar));

        let convert = factory
            .function(
                EXPLICIT_CONVERT,
                vec![Expression::attribute("s"), Expression::literal("BigInt")],
            )
            .unwrap();
        assert_eq!(infer(&convert), Some(LogicalType::BigInt));

        let coalesce = factory
            .function("coalesce", vec![Expression::attribute("s")])
            .unwrap();
        assert_eq!(infer(&coalesce), None);
        assert_eq!(infer(&add(coalesce, Expression::literal(1))), None);
    }

    #[test]
    fn test_missing_attribute_fails_immediately() {
        let s = schema();
        let err = TypeEvaluator::new(&s)
            .evaluate(&Expression::attribute("nope"))
            .unwrap_err();
        assert!(matches!(err, Error::AttributeNotFound(_)));
    }

    #[test]
    fn test_last_geometry_reference_wins() {
        let s = schema();
        let factory = DefaultExpressionFactory::new();
        let expr = factory
            .function(
                "coalesce",
                vec![Expression::attribute("g1"), Expression::attribute("g2")],
            )
            .unwrap();
        let mut evaluator = TypeEvaluator::new(&s);
        evaluator.evaluate(&expr).unwrap();
        assert_eq!(evaluator.srid(), Some(Srid(3857)));
    }
}
