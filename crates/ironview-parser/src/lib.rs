//! IronView Parser - expression and filter text
//!
//! View declarations and queries carry expressions as text. This crate
//! parses them with sqlparser-rs and builds the `ironview-expr` trees through
//! an `ExpressionFactory`, so function names are resolved against the same
//! registry the view evaluates with.

use ironview_common::{Error, Result};
use ironview_expr::{Expression, ExpressionFactory, Filter};
use sqlparser::ast::Expr;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;

mod builder;

/// Parse a single SQL expression, rejecting trailing input
fn parse_sql_expr(text: &str) -> Result<Expr> {
    let dialect = GenericDialect {};
    let mut parser = Parser::new(&dialect)
        .try_with_sql(text)
        .map_err(|e| Error::Parse(e.to_string()))?;
    let expr = parser
        .parse_expr()
        .map_err(|e| Error::Parse(e.to_string()))?;

    let next = parser.peek_token();
    if next.token != Token::EOF {
        return Err(Error::Parse(format!(
            "Unexpected {} after expression '{}'",
            next.token, text
        )));
    }
    Ok(expr)
}

/// Parse value expression text, e.g. `concat(name, '!')` or `price * 2`
pub fn parse_expression(text: &str, factory: &dyn ExpressionFactory) -> Result<Expression> {
    let expr = parse_sql_expr(text)?;
    builder::build_expression(&expr, factory)
}

/// Parse predicate text, e.g. `age > 30 AND name LIKE 'P%'`
pub fn parse_filter(text: &str, factory: &dyn ExpressionFactory) -> Result<Filter> {
    let expr = parse_sql_expr(text)?;
    builder::build_filter(&expr, factory)
}
