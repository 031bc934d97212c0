//! Aggregate requests and their local computation

use hashbrown::HashSet;
use ironview_catalog::Feature;
use ironview_common::{Result, Value};
use ironview_expr::{Evaluator, Expression, FunctionRegistry};
use std::fmt;

/// An aggregate over the features a query selects
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    Count,
    Min(Expression),
    Max(Expression),
    Distinct(Expression),
}

impl Aggregate {
    /// The aggregated expression, None for a plain count
    pub fn expression(&self) -> Option<&Expression> {
        match self {
            Aggregate::Count => None,
            Aggregate::Min(e) | Aggregate::Max(e) | Aggregate::Distinct(e) => Some(e),
        }
    }

    /// The same aggregate over a different expression
    pub fn with_expression(&self, expr: Expression) -> Aggregate {
        match self {
            Aggregate::Count => Aggregate::Count,
            Aggregate::Min(_) => Aggregate::Min(expr),
            Aggregate::Max(_) => Aggregate::Max(expr),
            Aggregate::Distinct(_) => Aggregate::Distinct(expr),
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::Count => write!(f, "count(*)"),
            Aggregate::Min(e) => write!(f, "min({})", e),
            Aggregate::Max(e) => write!(f, "max({})", e),
            Aggregate::Distinct(e) => write!(f, "distinct({})", e),
        }
    }
}

/// Outcome of an aggregate
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateResult {
    Count(u64),
    /// Min or max; NULL when no non-null value was seen
    Value(Value),
    /// Distinct values in first-seen order
    Distinct(Vec<Value>),
}

/// Accumulates an aggregate one feature at a time
pub struct AggregateCollector<'a> {
    aggregate: &'a Aggregate,
    evaluator: Evaluator<'a>,
    count: u64,
    best: Option<Value>,
    seen: HashSet<String>,
    distinct: Vec<Value>,
}

impl<'a> AggregateCollector<'a> {
    pub fn new(aggregate: &'a Aggregate, functions: &'a FunctionRegistry) -> Self {
        AggregateCollector {
            aggregate,
            evaluator: Evaluator::new(functions),
            count: 0,
            best: None,
            seen: HashSet::new(),
            distinct: Vec::new(),
        }
    }

    pub fn visit(&mut self, feature: &Feature) -> Result<()> {
        match self.aggregate {
            Aggregate::Count => self.count += 1,
            Aggregate::Min(expr) | Aggregate::Max(expr) => {
                let value = self.evaluator.evaluate(expr, feature)?;
                if value.is_null() {
                    return Ok(());
                }
                let want_min = matches!(self.aggregate, Aggregate::Min(_));
                let replace = match &self.best {
                    None => true,
                    Some(best) => match value.partial_cmp(best) {
                        Some(std::cmp::Ordering::Less) => want_min,
                        Some(std::cmp::Ordering::Greater) => !want_min,
                        _ => false,
                    },
                };
                if replace {
                    self.best = Some(value);
                }
            }
            Aggregate::Distinct(expr) => {
                let value = self.evaluator.evaluate(expr, feature)?;
                let key = format!("{:?}", value);
                if self.seen.insert(key) {
                    self.distinct.push(value);
                }
            }
        }
        Ok(())
    }

    pub fn finish(self) -> AggregateResult {
        match self.aggregate {
            Aggregate::Count => AggregateResult::Count(self.count),
            Aggregate::Min(_) | Aggregate::Max(_) => {
                AggregateResult::Value(self.best.unwrap_or(Value::Null))
            }
            Aggregate::Distinct(_) => AggregateResult::Distinct(self.distinct),
        }
    }
}

/// Compute an aggregate over already materialized features
pub fn aggregate_features<'f, I>(
    aggregate: &Aggregate,
    functions: &FunctionRegistry,
    features: I,
) -> Result<AggregateResult>
where
    I: IntoIterator<Item = &'f Feature>,
{
    let mut collector = AggregateCollector::new(aggregate, functions);
    for feature in features {
        collector.visit(feature)?;
    }
    Ok(collector.finish())
}
