#![forbid(unsafe_code)]

//! Declarative expression language.
//!
//! Attribute values on a host element are expressions such as
//! `'myChart'`, `{color: 'red', margins: {top: 10}}`, `dims.byDay` or
//! `DateTime(2024, 0, 1, 0, 0, 0)`. They are parsed once into an [`Expr`]
//! tree and evaluated against an [`Environment`] on every scope tick.
//!
//! # Grammar
//!
//! ```text
//! expression  := conditional
//! conditional := or ( '?' expression ':' expression )?
//! or          := and ( '||' and )*
//! and         := equality ( '&&' equality )*
//! equality    := compare ( ( '==' | '!=' | '===' | '!==' ) compare )*
//! compare     := additive ( ( '<' | '<=' | '>' | '>=' ) additive )*
//! additive    := product ( ( '+' | '-' ) product )*
//! product     := unary ( ( '*' | '/' | '%' ) unary )*
//! unary       := ( '-' | '+' | '!' ) unary | postfix
//! postfix     := primary ( '.' name | '[' expression ']' | '(' args ')' )*
//! primary     := number | string | true | false | null | undefined
//!              | ident | '(' expression ')' | array | object
//! ```
//!
//! An empty source string parses to the `undefined` literal.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Result |
//! |---------|-------|--------|
//! | Unknown root identifier | scope not populated yet | [`EvalError::Unresolved`] |
//! | Property of `undefined`/`null` | dependency not populated yet | [`EvalError::Type`] |
//! | Missing object member | key absent | `Value::Undefined` |
//! | Calling a non-function | misconfiguration | [`EvalError::Type`] |
//! | Bad syntax | misconfiguration | [`EvalError::Parse`] |

mod eval;
mod lexer;
mod parser;

use std::fmt;

use crate::value::Value;

pub use eval::{Environment, evaluate};
pub use parser::parse;

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Identifier(String),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Syntax error with the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for ParseError {}

/// Failure while evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A root identifier has no binding in the environment.
    Unresolved(String),
    /// An operation was applied to a value of the wrong type.
    Type(String),
    /// The expression source did not parse.
    Parse(ParseError),
    /// A callable reported a failure.
    Call { function: String, message: String },
}

impl EvalError {
    /// Convenience constructor for errors raised inside a [`Callable`](crate::Callable).
    pub fn call(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Call {
            function: function.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved(name) => write!(f, "{name} is not defined"),
            Self::Type(msg) => write!(f, "type error: {msg}"),
            Self::Parse(err) => write!(f, "parse error: {err}"),
            Self::Call { function, message } => write!(f, "{function}: {message}"),
        }
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ParseError> for EvalError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

/// Outcome of evaluating one attribute expression in the current tick.
///
/// `Ready` never carries `Value::Undefined`: an undefined result is
/// indistinguishable from a dependency that has not been populated yet and is
/// reported as `Pending`.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Ready(Value),
    Pending,
    Errored(EvalError),
}

impl Evaluation {
    /// Classify a raw evaluation result.
    #[must_use]
    pub fn from_result(result: Result<Value, EvalError>) -> Self {
        match result {
            Ok(Value::Undefined) => Self::Pending,
            Ok(value) => Self::Ready(value),
            Err(err) => Self::Errored(err),
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The value, with `Pending` mapped back to `Undefined`.
    pub fn into_result(self) -> Result<Value, EvalError> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::Pending => Ok(Value::Undefined),
            Self::Errored(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_result_is_pending() {
        assert_eq!(Evaluation::from_result(Ok(Value::Undefined)), Evaluation::Pending);
        assert_eq!(
            Evaluation::from_result(Ok(Value::Null)),
            Evaluation::Ready(Value::Null)
        );
    }

    #[test]
    fn errors_stay_errors() {
        let err = EvalError::Unresolved("data".into());
        assert_eq!(
            Evaluation::from_result(Err(err.clone())),
            Evaluation::Errored(err)
        );
    }

    #[test]
    fn pending_round_trips_to_undefined() {
        assert_eq!(Evaluation::Pending.into_result(), Ok(Value::Undefined));
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            EvalError::Unresolved("dims".into()).to_string(),
            "dims is not defined"
        );
        assert_eq!(
            EvalError::call("Date", "invalid month").to_string(),
            "Date: invalid month"
        );
    }
}
