//! Expression evaluation

use super::{ArithmeticOperator, ComparisonOperator, Expression, Filter, FunctionRegistry};
use ironview_catalog::Feature;
use ironview_common::{Error, LogicalType, Result, Value};
use std::cmp::Ordering;

/// Evaluates expressions and filters against features
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    functions: &'a FunctionRegistry,
}

impl<'a> Evaluator<'a> {
    pub fn new(functions: &'a FunctionRegistry) -> Self {
        Evaluator { functions }
    }

    /// Evaluate an expression against a feature.
    ///
    /// References to attributes the feature does not carry evaluate to NULL.
    pub fn evaluate(&self, expr: &Expression, feature: &Feature) -> Result<Value> {
        match expr {
            Expression::Literal(value) => Ok(value.clone()),

            Expression::AttributeRef(name) => {
                Ok(feature.get(name).cloned().unwrap_or(Value::Null))
            }

            Expression::Function { name, args, .. } => {
                let def = self.functions.lookup(name)?;
                def.check_arity(args.len())?;
                let values = args
                    .iter()
                    .map(|a| self.evaluate(a, feature))
                    .collect::<Result<Vec<_>>>()?;
                def.invoke(&values)
            }

            Expression::BinaryArithmetic { left, op, right } => {
                let l = self.evaluate(left, feature)?;
                let r = self.evaluate(right, feature)?;
                evaluate_arithmetic(&l, *op, &r)
            }
        }
    }

    /// Whether a feature satisfies a filter
    pub fn matches(&self, filter: &Filter, feature: &Feature) -> Result<bool> {
        match filter {
            Filter::Include => Ok(true),
            Filter::Exclude => Ok(false),

            Filter::Compare { left, op, right } => {
                let l = self.evaluate(left, feature)?;
                let r = self.evaluate(right, feature)?;
                Ok(compare(&l, *op, &r))
            }

            Filter::Like {
                expr,
                pattern,
                negated,
            } => {
                let v = self.evaluate(expr, feature)?;
                if v.is_null() {
                    return Ok(false);
                }
                Ok(like_match(&v.to_string(), pattern) != *negated)
            }

            Filter::IsNull(expr) => Ok(self.evaluate(expr, feature)?.is_null()),

            Filter::Between { expr, low, high } => {
                let v = self.evaluate(expr, feature)?;
                let lo = self.evaluate(low, feature)?;
                let hi = self.evaluate(high, feature)?;
                Ok(compare(&v, ComparisonOperator::GreaterThanOrEqual, &lo)
                    && compare(&v, ComparisonOperator::LessThanOrEqual, &hi))
            }

            Filter::Id(ids) => Ok(ids.contains(&feature.id)),

            Filter::BBox { expr, envelope } => {
                let v = self.evaluate(expr, feature)?;
                Ok(v.as_geometry()
                    .and_then(|g| g.envelope())
                    .map_or(false, |env| env.intersects(envelope)))
            }

            Filter::And(parts) => {
                for p in parts {
                    if !self.matches(p, feature)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }

            Filter::Or(parts) => {
                for p in parts {
                    if self.matches(p, feature)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }

            Filter::Not(inner) => Ok(!self.matches(inner, feature)?),
        }
    }
}

/// Coerce a value for arithmetic: numbers stay as they are, strings are
/// parsed the way numeric literals are classified
fn numeric_operand(v: &Value) -> Result<Value> {
    match v {
        Value::Integer(_) | Value::BigInt(_) | Value::Double(_) => Ok(v.clone()),
        Value::Float(f) => Ok(Value::Double(*f as f64)),
        Value::Varchar(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i32>() {
                Ok(Value::Integer(i))
            } else if let Ok(i) = s.parse::<i64>() {
                Ok(Value::BigInt(i))
            } else {
                s.parse::<f64>().map(Value::Double).map_err(|_| Error::TypeMismatch {
                    expected: "numeric".to_string(),
                    got: format!("'{}'", s),
                })
            }
        }
        other => Err(Error::TypeMismatch {
            expected: "numeric".to_string(),
            got: other.logical_type().to_string(),
        }),
    }
}

fn overflow(op: ArithmeticOperator) -> Error {
    Error::Overflow {
        operation: format!("arithmetic {}", op.symbol()),
    }
}

/// Binary arithmetic with the same promotion rules the type evaluator uses.
/// Division or modulo by zero yields NULL.
pub(crate) fn evaluate_arithmetic(
    left: &Value,
    op: ArithmeticOperator,
    right: &Value,
) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    let l = numeric_operand(left)?;
    let r = numeric_operand(right)?;

    match l.logical_type().promote_arithmetic(&r.logical_type()) {
        LogicalType::Integer => {
            let (a, b) = match (&l, &r) {
                (Value::Integer(a), Value::Integer(b)) => (*a, *b),
                _ => return Err(Error::Internal("integer promotion".to_string())),
            };
            let out = match op {
                ArithmeticOperator::Add => a.checked_add(b),
                ArithmeticOperator::Subtract => a.checked_sub(b),
                ArithmeticOperator::Multiply => a.checked_mul(b),
                ArithmeticOperator::Divide | ArithmeticOperator::Modulo if b == 0 => {
                    return Ok(Value::Null)
                }
                ArithmeticOperator::Divide => a.checked_div(b),
                ArithmeticOperator::Modulo => a.checked_rem(b),
            };
            out.map(Value::Integer).ok_or_else(|| overflow(op))
        }
        LogicalType::BigInt => {
            let a = l.as_i64().unwrap_or_default();
            let b = r.as_i64().unwrap_or_default();
            let out = match op {
                ArithmeticOperator::Add => a.checked_add(b),
                ArithmeticOperator::Subtract => a.checked_sub(b),
                ArithmeticOperator::Multiply => a.checked_mul(b),
                ArithmeticOperator::Divide | ArithmeticOperator::Modulo if b == 0 => {
                    return Ok(Value::Null)
                }
                ArithmeticOperator::Divide => a.checked_div(b),
                ArithmeticOperator::Modulo => a.checked_rem(b),
            };
            out.map(Value::BigInt).ok_or_else(|| overflow(op))
        }
        _ => {
            let a = l.as_f64().unwrap_or_default();
            let b = r.as_f64().unwrap_or_default();
            let out = match op {
                ArithmeticOperator::Add => a + b,
                ArithmeticOperator::Subtract => a - b,
                ArithmeticOperator::Multiply => a * b,
                ArithmeticOperator::Divide | ArithmeticOperator::Modulo if b == 0.0 => {
                    return Ok(Value::Null)
                }
                ArithmeticOperator::Divide => a / b,
                ArithmeticOperator::Modulo => a % b,
            };
            Ok(Value::Double(out))
        }
    }
}

/// Order two values, parsing strings compared against numbers
fn order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Varchar(s), n) if n.as_f64().is_some() => {
            s.trim().parse::<f64>().ok()?.partial_cmp(&n.as_f64()?)
        }
        (n, Value::Varchar(s)) if n.as_f64().is_some() => {
            n.as_f64()?.partial_cmp(&s.trim().parse::<f64>().ok()?)
        }
        _ => left.partial_cmp(right),
    }
}

/// Comparison semantics for filters: NULL never matches, and values that
/// cannot be ordered against each other are only ever unequal
fn compare(left: &Value, op: ComparisonOperator, right: &Value) -> bool {
    if left.is_null() || right.is_null() {
        return false;
    }
    if let (Value::Geometry(a), Value::Geometry(b)) = (left, right) {
        return match op {
            ComparisonOperator::Equal => a == b,
            ComparisonOperator::NotEqual => a != b,
            _ => false,
        };
    }
    match order(left, right) {
        Some(o) => match op {
            ComparisonOperator::Equal => o == Ordering::Equal,
            ComparisonOperator::NotEqual => o != Ordering::Equal,
            ComparisonOperator::LessThan => o == Ordering::Less,
            ComparisonOperator::LessThanOrEqual => o != Ordering::Greater,
            ComparisonOperator::GreaterThan => o == Ordering::Greater,
            ComparisonOperator::GreaterThanOrEqual => o != Ordering::Less,
        },
        None => op == ComparisonOperator::NotEqual,
    }
}

/// SQL LIKE matching with `%` (any run) and `_` (any single character)
fn like_match(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    let (mut ti, mut pi) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '_' || p[pi] == t[ti]) {
            ti += 1;
            pi += 1;
        } else if pi < p.len() && p[pi] == '%' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '%' {
        pi += 1;
    }
    pi == p.len()
}
