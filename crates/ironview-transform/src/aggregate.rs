//! Aggregate pushdown planning

use super::Transformer;
use ironview_common::Result;
use ironview_expr::visitor;
use ironview_storage::Aggregate;

/// How a view computes an aggregate
#[derive(Debug, Clone, PartialEq)]
pub enum AggregatePlan {
    /// Ask the source for this aggregate, already in source terms
    Delegate(Aggregate),
    /// Compute from the view's own features
    Local,
}

/// Decide how to compute `aggregate` over the view.
///
/// The aggregated expression is rewritten against the source, so computed
/// attributes delegate as well as renames. Attributes with a declared type
/// are converted after evaluation; aggregating those in the source would
/// yield unconverted values, so they are computed locally.
pub fn plan_aggregate(transformer: &Transformer, aggregate: &Aggregate) -> Result<AggregatePlan> {
    let expr = match aggregate.expression() {
        Some(expr) => expr,
        None => return Ok(AggregatePlan::Delegate(Aggregate::Count)),
    };
    let translated = transformer.translate_expression(expr)?;
    for name in visitor::attribute_refs(expr) {
        if let Some(def) = transformer.definition(&name) {
            if def.logical_type.is_some() {
                return Ok(AggregatePlan::Local);
            }
        }
    }
    Ok(AggregatePlan::Delegate(aggregate.with_expression(translated)))
}
