//! Expression construction
//!
//! Components that need to build expressions receive an `ExpressionFactory`
//! at construction instead of reaching for a global registry, so tests can
//! substitute their own functions or count what gets built.

use super::{ArithmeticOperator, Expression, FunctionRegistry};
use ironview_common::{Result, Value};
use std::fmt;

/// Builds expression nodes, resolving function names to their signatures
pub trait ExpressionFactory: Send + Sync + fmt::Debug {
    /// The functions expressions built here may call
    fn functions(&self) -> &FunctionRegistry;

    fn literal(&self, value: Value) -> Expression {
        Expression::Literal(value)
    }

    fn attribute(&self, name: &str) -> Expression {
        Expression::AttributeRef(name.to_string())
    }

    /// A call to a registered function, checked against its arity
    fn function(&self, name: &str, args: Vec<Expression>) -> Result<Expression> {
        let def = self.functions().lookup(name)?;
        def.check_arity(args.len())?;
        Ok(Expression::Function {
            name: def.name.clone(),
            args,
            return_type: def.return_type.clone(),
        })
    }

    fn arithmetic(
        &self,
        left: Expression,
        op: ArithmeticOperator,
        right: Expression,
    ) -> Expression {
        Expression::BinaryArithmetic {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }
}

/// Factory over a fixed function registry (the built-ins by default)
#[derive(Debug, Clone)]
pub struct DefaultExpressionFactory {
    functions: FunctionRegistry,
}

impl DefaultExpressionFactory {
    pub fn new() -> Self {
        DefaultExpressionFactory {
            functions: FunctionRegistry::with_builtins(),
        }
    }

    pub fn with_registry(functions: FunctionRegistry) -> Self {
        DefaultExpressionFactory { functions }
    }
}

impl Default for DefaultExpressionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionFactory for DefaultExpressionFactory {
    fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironview_common::{Error, LogicalType};

    #[test]
    fn test_function_carries_declared_type() {
        let factory = DefaultExpressionFactory::new();
        let expr = factory
            .function("Concat", vec![factory.attribute("name"), factory.literal("!".into())])
            .unwrap();
        match expr {
            Expression::Function {
                name, return_type, ..
            } => {
                assert_eq!(name, "concat");
                assert_eq!(return_type, LogicalType::Varchar);
            }
            other => panic!("Expected Function, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_function() {
        let factory = DefaultExpressionFactory::with_registry(FunctionRegistry::new());
        let err = factory.function("concat", vec![]).unwrap_err();
        assert!(matches!(err, Error::FunctionNotFound(_)));
    }
}
