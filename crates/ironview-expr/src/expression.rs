//! Expression trees

use ironview_common::{LogicalType, Value};
use std::fmt;

/// An expression computing a value from a feature
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Constant value
    Literal(Value),

    /// Reference to an attribute of the input feature
    AttributeRef(String),

    /// Function call; `return_type` is the declared type, `Any` when generic
    Function {
        name: String,
        args: Vec<Expression>,
        return_type: LogicalType,
    },

    /// Binary arithmetic
    BinaryArithmetic {
        left: Box<Expression>,
        op: ArithmeticOperator,
        right: Box<Expression>,
    },
}

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl Expression {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn attribute(name: impl Into<String>) -> Self {
        Expression::AttributeRef(name.into())
    }

    /// The referenced attribute name if this is a bare attribute reference
    pub fn as_attribute(&self) -> Option<&str> {
        match self {
            Expression::AttributeRef(name) => Some(name),
            _ => None,
        }
    }

    /// The constant value if this is a literal
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Expression::Literal(v) => Some(v),
            _ => None,
        }
    }
}

impl ArithmeticOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Subtract => "-",
            ArithmeticOperator::Multiply => "*",
            ArithmeticOperator::Divide => "/",
            ArithmeticOperator::Modulo => "%",
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(Value::Varchar(s)) => write!(f, "'{}'", s.replace('\'', "''")),
            Expression::Literal(v) => write!(f, "{}", v),
            Expression::AttributeRef(name) => write!(f, "{}", name),
            Expression::Function { name, args, .. } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::BinaryArithmetic { left, op, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
        }
    }
}
