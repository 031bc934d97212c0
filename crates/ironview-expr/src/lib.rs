//! IronView Expressions - the trees views are declared with
//!
//! Expressions compute a value from a feature; filters select features.
//! Both are closed enums traversed by plain recursive functions:
//! - `visitor`: attribute reference collection and substitution
//! - `evaluate`: runtime evaluation against a feature
//!
//! New nodes are built through an injected `ExpressionFactory`, which owns
//! the `FunctionRegistry` used to resolve function names and return types.

mod evaluate;
mod expression;
mod factory;
mod filter;
mod function;
pub mod visitor;

pub use evaluate::Evaluator;
pub use expression::{ArithmeticOperator, Expression};
pub use factory::{DefaultExpressionFactory, ExpressionFactory};
pub use filter::{ComparisonOperator, Filter};
pub use function::{cast_value, FunctionDef, FunctionRegistry, EXPLICIT_CONVERT, SET_SRID};
