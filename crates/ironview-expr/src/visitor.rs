//! Tree traversals over expressions and filters
//!
//! Attribute reference collection drives projection (which input attributes a
//! read needs), and substitution rewrites references through a mapping.

use super::{Expression, Filter};
use ironview_common::Result;
use std::collections::BTreeSet;

/// Collect all attribute names referenced by an expression
pub fn collect_attribute_refs(expr: &Expression, refs: &mut BTreeSet<String>) {
    match expr {
        Expression::AttributeRef(name) => {
            refs.insert(name.clone());
        }
        Expression::Literal(_) => {}
        Expression::Function { args, .. } => {
            for arg in args {
                collect_attribute_refs(arg, refs);
            }
        }
        Expression::BinaryArithmetic { left, right, .. } => {
            collect_attribute_refs(left, refs);
            collect_attribute_refs(right, refs);
        }
    }
}

/// Attribute names referenced by an expression
pub fn attribute_refs(expr: &Expression) -> BTreeSet<String> {
    let mut refs = BTreeSet::new();
    collect_attribute_refs(expr, &mut refs);
    refs
}

/// Collect all attribute names referenced by a filter
pub fn collect_filter_refs(filter: &Filter, refs: &mut BTreeSet<String>) {
    match filter {
        Filter::Include | Filter::Exclude | Filter::Id(_) => {}
        Filter::Compare { left, right, .. } => {
            collect_attribute_refs(left, refs);
            collect_attribute_refs(right, refs);
        }
        Filter::Like { expr, .. } | Filter::IsNull(expr) | Filter::BBox { expr, .. } => {
            collect_attribute_refs(expr, refs);
        }
        Filter::Between { expr, low, high } => {
            collect_attribute_refs(expr, refs);
            collect_attribute_refs(low, refs);
            collect_attribute_refs(high, refs);
        }
        Filter::And(parts) | Filter::Or(parts) => {
            for p in parts {
                collect_filter_refs(p, refs);
            }
        }
        Filter::Not(inner) => collect_filter_refs(inner, refs),
    }
}

/// Replace every attribute reference with the expression `map` returns for it
pub fn substitute<F>(expr: &Expression, map: &mut F) -> Result<Expression>
where
    F: FnMut(&str) -> Result<Expression>,
{
    match expr {
        Expression::AttributeRef(name) => map(name),
        Expression::Literal(v) => Ok(Expression::Literal(v.clone())),
        Expression::Function {
            name,
            args,
            return_type,
        } => Ok(Expression::Function {
            name: name.clone(),
            args: args
                .iter()
                .map(|a| substitute(a, map))
                .collect::<Result<Vec<_>>>()?,
            return_type: return_type.clone(),
        }),
        Expression::BinaryArithmetic { left, op, right } => Ok(Expression::BinaryArithmetic {
            left: Box::new(substitute(left, map)?),
            op: *op,
            right: Box::new(substitute(right, map)?),
        }),
    }
}

/// Rewrite a filter, substituting attribute references in every expression
/// and passing feature ids through `map_id`
pub fn substitute_filter<F, G>(filter: &Filter, map: &mut F, map_id: &G) -> Result<Filter>
where
    F: FnMut(&str) -> Result<Expression>,
    G: Fn(&str) -> String,
{
    let rewritten = match filter {
        Filter::Include => Filter::Include,
        Filter::Exclude => Filter::Exclude,
        Filter::Compare { left, op, right } => Filter::Compare {
            left: substitute(left, map)?,
            op: *op,
            right: substitute(right, map)?,
        },
        Filter::Like {
            expr,
            pattern,
            negated,
        } => Filter::Like {
            expr: substitute(expr, map)?,
            pattern: pattern.clone(),
            negated: *negated,
        },
        Filter::IsNull(expr) => Filter::IsNull(substitute(expr, map)?),
        Filter::Between { expr, low, high } => Filter::Between {
            expr: substitute(expr, map)?,
            low: substitute(low, map)?,
            high: substitute(high, map)?,
        },
        Filter::Id(ids) => Filter::Id(ids.iter().map(|id| map_id(id)).collect()),
        Filter::BBox { expr, envelope } => Filter::BBox {
            expr: substitute(expr, map)?,
            envelope: *envelope,
        },
        Filter::And(parts) => Filter::And(
            parts
                .iter()
                .map(|p| substitute_filter(p, map, map_id))
                .collect::<Result<Vec<_>>>()?,
        ),
        Filter::Or(parts) => Filter::Or(
            parts
                .iter()
                .map(|p| substitute_filter(p, map, map_id))
                .collect::<Result<Vec<_>>>()?,
        ),
        Filter::Not(inner) => Filter::Not(Box::new(substitute_filter(inner, map, map_id)?)),
    };
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArithmeticOperator, ComparisonOperator};
    use ironview_common::{Error, LogicalType};

    fn sum(l: Expression, r: Expression) -> Expression {
        Expression::BinaryArithmetic {
            left: Box::new(l),
            op: ArithmeticOperator::Add,
            right: Box::new(r),
        }
    }

    #[test]
    fn test_collect_attribute_refs() {
        let expr = Expression::Function {
            name: "concat".to_string(),
            args: vec![
                Expression::attribute("a"),
                sum(Expression::attribute("c"), Expression::attribute("a")),
                Expression::literal(1),
            ],
            return_type: LogicalType::Varchar,
        };

        let refs = attribute_refs(&expr);
        assert_eq!(refs.len(), 2);
        assert!(refs.contains("a"));
        assert!(refs.contains("c"));
    }

    #[test]
    fn test_substitute() {
        let expr = sum(Expression::attribute("b"), Expression::literal(1));
        let out = substitute(&expr, &mut |name| {
            Ok(sum(Expression::attribute(name.to_uppercase()), Expression::literal(2)))
        })
        .unwrap();
        assert_eq!(
            out,
            sum(
                sum(Expression::attribute("B"), Expression::literal(2)),
                Expression::literal(1)
            )
        );
    }

    #[test]
    fn test_substitute_filter_propagates_errors_and_maps_ids() {
        let filter = Filter::And(vec![
            Filter::compare(
                Expression::attribute("x"),
                ComparisonOperator::GreaterThan,
                Expression::literal(3),
            ),
            Filter::ids(["v.1"]),
        ]);
        let out = substitute_filter(
            &filter,
            &mut |name| Ok(Expression::attribute(format!("src_{}", name))),
            &|id| id.replace("v.", "s."),
        )
        .unwrap();
        let mut refs = BTreeSet::new();
        collect_filter_refs(&out, &mut refs);
        assert!(refs.contains("src_x"));
        match out {
            Filter::And(parts) => assert_eq!(parts[1], Filter::ids(["s.1"])),
            other => panic!("Expected And, got {:?}", other),
        }

        let err = substitute_filter(
            &filter,
            &mut |name| Err(Error::AttributeNotFound(name.to_string())),
            &|id| id.to_string(),
        );
        assert!(err.is_err());
    }
}
