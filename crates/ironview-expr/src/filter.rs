//! Filter (predicate) trees

use super::Expression;
use ironview_common::Envelope;
use std::collections::BTreeSet;
use std::fmt;

/// A boolean predicate selecting features
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Selects every feature
    Include,
    /// Selects nothing
    Exclude,

    /// Binary comparison
    Compare {
        left: Expression,
        op: ComparisonOperator,
        right: Expression,
    },

    /// SQL-style pattern match (`%` and `_` wildcards)
    Like {
        expr: Expression,
        pattern: String,
        negated: bool,
    },

    /// IS NULL
    IsNull(Expression),

    /// Inclusive range
    Between {
        expr: Expression,
        low: Expression,
        high: Expression,
    },

    /// Feature identifier membership
    Id(BTreeSet<String>),

    /// Geometry envelope intersects the given box
    BBox {
        expr: Expression,
        envelope: Envelope,
    },

    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl ComparisonOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOperator::Equal => "=",
            ComparisonOperator::NotEqual => "<>",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::LessThanOrEqual => "<=",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::GreaterThanOrEqual => ">=",
        }
    }
}

impl Filter {
    pub fn compare(left: Expression, op: ComparisonOperator, right: Expression) -> Self {
        Filter::Compare { left, op, right }
    }

    pub fn equal(left: Expression, right: Expression) -> Self {
        Filter::compare(left, ComparisonOperator::Equal, right)
    }

    /// Feature id filter over the given ids
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::Id(ids.into_iter().map(Into::into).collect())
    }

    pub fn is_include(&self) -> bool {
        matches!(self, Filter::Include)
    }

    /// Combine two filters with AND, folding away `Include`
    pub fn and(self, other: Filter) -> Filter {
        match (self, other) {
            (Filter::Include, f) | (f, Filter::Include) => f,
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), f) => {
                left.push(f);
                Filter::And(left)
            }
            (l, r) => Filter::And(vec![l, r]),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, parts: &[Filter], sep: &str) -> fmt::Result {
            write!(f, "(")?;
            for (i, p) in parts.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", sep)?;
                }
                write!(f, "{}", p)?;
            }
            write!(f, ")")
        }

        match self {
            Filter::Include => write!(f, "INCLUDE"),
            Filter::Exclude => write!(f, "EXCLUDE"),
            Filter::Compare { left, op, right } => write!(f, "{} {} {}", left, op.symbol(), right),
            Filter::Like {
                expr,
                pattern,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{} {}LIKE '{}'", expr, not, pattern)
            }
            Filter::IsNull(expr) => write!(f, "{} IS NULL", expr),
            Filter::Between { expr, low, high } => {
                write!(f, "{} BETWEEN {} AND {}", expr, low, high)
            }
            Filter::Id(ids) => {
                let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
                write!(f, "IN ({})", ids.join(", "))
            }
            Filter::BBox { expr, envelope } => write!(
                f,
                "BBOX({}, {}, {}, {}, {})",
                expr, envelope.min_x, envelope.min_y, envelope.max_x, envelope.max_y
            ),
            Filter::And(parts) => join(f, parts, "AND"),
            Filter::Or(parts) => join(f, parts, "OR"),
            Filter::Not(inner) => write!(f, "NOT ({})", inner),
        }
    }
}
