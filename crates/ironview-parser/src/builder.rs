//! sqlparser AST to expression/filter trees

use ironview_common::{Envelope, Error, LogicalType, Result, Value};
use ironview_expr::{
    ArithmeticOperator, ComparisonOperator, Expression, ExpressionFactory, Filter,
    EXPLICIT_CONVERT,
};
use sqlparser::ast as sql;

fn unsupported(what: &str, expr: &sql::Expr) -> Error {
    Error::Parse(format!("Unsupported {}: {}", what, expr))
}

/// Build a value expression
pub fn build_expression(expr: &sql::Expr, factory: &dyn ExpressionFactory) -> Result<Expression> {
    match expr {
        sql::Expr::Value(value) => Ok(factory.literal(build_value(value)?)),

        sql::Expr::Identifier(ident) => Ok(factory.attribute(&ident.value)),

        sql::Expr::CompoundIdentifier(idents) => {
            let path: Vec<&str> = idents.iter().map(|i| i.value.as_str()).collect();
            Ok(factory.attribute(&path.join(".")))
        }

        sql::Expr::Nested(inner) => build_expression(inner, factory),

        sql::Expr::BinaryOp { left, op, right } => {
            let left = build_expression(left, factory)?;
            let right = build_expression(right, factory)?;
            let op = match op {
                sql::BinaryOperator::Plus => ArithmeticOperator::Add,
                sql::BinaryOperator::Minus => ArithmeticOperator::Subtract,
                sql::BinaryOperator::Multiply => ArithmeticOperator::Multiply,
                sql::BinaryOperator::Divide => ArithmeticOperator::Divide,
                sql::BinaryOperator::Modulo => ArithmeticOperator::Modulo,
                sql::BinaryOperator::StringConcat => {
                    return factory.function("concat", vec![left, right]);
                }
                _ => return Err(unsupported("operator in value expression", expr)),
            };
            Ok(factory.arithmetic(left, op, right))
        }

        sql::Expr::UnaryOp { op, expr: inner } => match op {
            sql::UnaryOperator::Plus => build_expression(inner, factory),
            sql::UnaryOperator::Minus => {
                let operand = build_expression(inner, factory)?;
                match operand {
                    Expression::Literal(v) => Ok(factory.literal(negate(v)?)),
                    other => Ok(factory.arithmetic(
                        factory.literal(Value::Integer(-1)),
                        ArithmeticOperator::Multiply,
                        other,
                    )),
                }
            }
            _ => Err(unsupported("operator in value expression", expr)),
        },

        sql::Expr::Function(func) => {
            let args = function_args(func)?
                .into_iter()
                .map(|a| build_expression(a, factory))
                .collect::<Result<Vec<_>>>()?;
            factory.function(&func.name.to_string(), args)
        }

        sql::Expr::Cast {
            expr: inner,
            data_type,
            ..
        } => {
            let target = build_type_name(data_type)?;
            let inner = build_expression(inner, factory)?;
            factory.function(
                EXPLICIT_CONVERT,
                vec![inner, factory.literal(Value::Varchar(target.to_string()))],
            )
        }

        _ => Err(unsupported("expression", expr)),
    }
}

/// Build a predicate
pub fn build_filter(expr: &sql::Expr, factory: &dyn ExpressionFactory) -> Result<Filter> {
    match expr {
        sql::Expr::Value(sql::Value::Boolean(true)) => Ok(Filter::Include),
        sql::Expr::Value(sql::Value::Boolean(false)) => Ok(Filter::Exclude),

        sql::Expr::Nested(inner) => build_filter(inner, factory),

        sql::Expr::BinaryOp { left, op, right } => {
            let comparison = match op {
                sql::BinaryOperator::And => {
                    let l = build_filter(left, factory)?;
                    return Ok(l.and(build_filter(right, factory)?));
                }
                sql::BinaryOperator::Or => {
                    let mut parts = Vec::new();
                    for side in [left, right] {
                        match build_filter(side, factory)? {
                            Filter::Or(nested) => parts.extend(nested),
                            f => parts.push(f),
                        }
                    }
                    return Ok(Filter::Or(parts));
                }
                sql::BinaryOperator::Eq => ComparisonOperator::Equal,
                sql::BinaryOperator::NotEq => ComparisonOperator::NotEqual,
                sql::BinaryOperator::Lt => ComparisonOperator::LessThan,
                sql::BinaryOperator::LtEq => ComparisonOperator::LessThanOrEqual,
                sql::BinaryOperator::Gt => ComparisonOperator::GreaterThan,
                sql::BinaryOperator::GtEq => ComparisonOperator::GreaterThanOrEqual,
                _ => return Err(unsupported("predicate", expr)),
            };
            Ok(Filter::compare(
                build_expression(left, factory)?,
                comparison,
                build_expression(right, factory)?,
            ))
        }

        sql::Expr::UnaryOp {
            op: sql::UnaryOperator::Not,
            expr: inner,
        } => Ok(Filter::Not(Box::new(build_filter(inner, factory)?))),

        sql::Expr::IsNull(inner) => Ok(Filter::IsNull(build_expression(inner, factory)?)),

        sql::Expr::IsNotNull(inner) => Ok(Filter::Not(Box::new(Filter::IsNull(
            build_expression(inner, factory)?,
        )))),

        sql::Expr::Between {
            expr: inner,
            negated,
            low,
            high,
        } => {
            let between = Filter::Between {
                expr: build_expression(inner, factory)?,
                low: build_expression(low, factory)?,
                high: build_expression(high, factory)?,
            };
            Ok(negate_if(between, *negated))
        }

        sql::Expr::InList {
            expr: inner,
            list,
            negated,
        } => {
            let target = build_expression(inner, factory)?;
            let parts = list
                .iter()
                .map(|item| Ok(Filter::equal(target.clone(), build_expression(item, factory)?)))
                .collect::<Result<Vec<_>>>()?;
            Ok(negate_if(Filter::Or(parts), *negated))
        }

        sql::Expr::Like {
            negated,
            expr: inner,
            pattern,
            ..
        } => match &**pattern {
            sql::Expr::Value(sql::Value::SingleQuotedString(p)) => Ok(Filter::Like {
                expr: build_expression(inner, factory)?,
                pattern: p.clone(),
                negated: *negated,
            }),
            other => Err(unsupported("LIKE pattern", other)),
        },

        sql::Expr::Function(func) => {
            let name = func.name.to_string().to_lowercase();
            let args = function_args(func)?;
            match name.as_str() {
                "bbox" => build_bbox(&args, factory),
                "id" => {
                    let ids = args
                        .iter()
                        .map(|a| match a {
                            sql::Expr::Value(sql::Value::SingleQuotedString(s)) => Ok(s.clone()),
                            sql::Expr::Value(sql::Value::Number(n, _)) => Ok(n.clone()),
                            other => Err(unsupported("feature id", other)),
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Filter::ids(ids))
                }
                _ => Err(unsupported("predicate", expr)),
            }
        }

        _ => Err(unsupported("predicate", expr)),
    }
}

fn negate_if(filter: Filter, negated: bool) -> Filter {
    if negated {
        Filter::Not(Box::new(filter))
    } else {
        filter
    }
}

/// `bbox(geom, minx, miny, maxx, maxy)`
fn build_bbox(args: &[&sql::Expr], factory: &dyn ExpressionFactory) -> Result<Filter> {
    if args.len() != 5 {
        return Err(Error::InvalidArguments(format!(
            "bbox() expects 5 arguments, got {}",
            args.len()
        )));
    }
    let expr = build_expression(args[0], factory)?;
    let mut coords = [0.0f64; 4];
    for (slot, arg) in coords.iter_mut().zip(&args[1..]) {
        let value = build_expression(arg, factory)?;
        *slot = value
            .as_literal()
            .and_then(Value::as_f64)
            .ok_or_else(|| Error::InvalidArguments(format!("bbox() coordinate {}", arg)))?;
    }
    Ok(Filter::BBox {
        expr,
        envelope: Envelope::new(coords[0], coords[1], coords[2], coords[3]),
    })
}

fn function_args(func: &sql::Function) -> Result<Vec<&sql::Expr>> {
    match &func.args {
        sql::FunctionArguments::List(arg_list) => arg_list
            .args
            .iter()
            .map(|arg| match arg {
                sql::FunctionArg::Unnamed(sql::FunctionArgExpr::Expr(e)) => Ok(e),
                other => Err(Error::Parse(format!(
                    "Unsupported argument to {}: {}",
                    func.name, other
                ))),
            })
            .collect(),
        sql::FunctionArguments::None => Ok(vec![]),
        sql::FunctionArguments::Subquery(_) => Err(Error::Parse(format!(
            "Subquery argument to {}",
            func.name
        ))),
    }
}

/// Literal values; numbers take the narrowest of integer, bigint, double
fn build_value(value: &sql::Value) -> Result<Value> {
    match value {
        sql::Value::Number(n, _) => {
            if let Ok(i) = n.parse::<i64>() {
                if i >= i32::MIN as i64 && i <= i32::MAX as i64 {
                    Ok(Value::Integer(i as i32))
                } else {
                    Ok(Value::BigInt(i))
                }
            } else if let Ok(f) = n.parse::<f64>() {
                Ok(Value::Double(f))
            } else {
                Err(Error::Parse(format!("Invalid number: {}", n)))
            }
        }
        sql::Value::SingleQuotedString(s) | sql::Value::DoubleQuotedString(s) => {
            Ok(Value::Varchar(s.clone()))
        }
        sql::Value::Boolean(b) => Ok(Value::Boolean(*b)),
        sql::Value::Null => Ok(Value::Null),
        _ => Err(Error::Parse(format!("Unsupported literal: {}", value))),
    }
}

fn negate(value: Value) -> Result<Value> {
    match value {
        Value::Integer(i) => Ok(Value::Integer(-i)),
        Value::BigInt(i) => Ok(Value::BigInt(-i)),
        Value::Double(f) => Ok(Value::Double(-f)),
        other => Err(Error::Parse(format!("Cannot negate {}", other))),
    }
}

/// Target type of a CAST, by name (`VARCHAR(10)` reads as `VARCHAR`)
fn build_type_name(data_type: &sql::DataType) -> Result<LogicalType> {
    let text = data_type.to_string();
    let base = text.split('(').next().unwrap_or_default();
    base.parse::<LogicalType>()
        .map_err(|_| Error::Parse(format!("Unsupported CAST target type: {}", text)))
}
