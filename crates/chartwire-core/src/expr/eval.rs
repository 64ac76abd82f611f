#![forbid(unsafe_code)]

//! Tree-walking evaluator.

use std::cmp::Ordering;

use super::{BinaryOp, EvalError, Expr, Literal, LogicalOp, UnaryOp};
use crate::value::{OptionMap, Value};

/// Source of identifier bindings for evaluation.
pub trait Environment {
    /// Value bound to `name`, or `None` when the name is unbound.
    ///
    /// A name bound to `Value::Undefined` returns `Some(Value::Undefined)`.
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl Environment for OptionMap {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// Evaluate `expr` against `env`.
///
/// # Errors
///
/// See the failure table in the [module docs](super).
pub fn evaluate(expr: &Expr, env: &dyn Environment) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(lit) => Ok(literal(lit)),
        Expr::Identifier(name) => env
            .lookup(name)
            .ok_or_else(|| EvalError::Unresolved(name.clone())),
        Expr::Member { object, property } => {
            let target = evaluate(object, env)?;
            property_of(&target, property)
        }
        Expr::Index { object, index } => {
            let target = evaluate(object, env)?;
            let key = evaluate(index, env)?;
            if let (Value::Array(items), Value::Number(n)) = (&target, &key) {
                if *n >= 0.0 && n.fract() == 0.0 {
                    return Ok(items.get(*n as usize).cloned().unwrap_or_default());
                }
            }
            property_of(&target, &key.to_string())
        }
        Expr::Call { callee, args } => {
            let func = evaluate(callee, env)?;
            let Value::Function(func) = func else {
                return Err(EvalError::Type(format!(
                    "{} is not a function",
                    describe(callee)
                )));
            };
            let args = args
                .iter()
                .map(|arg| evaluate(arg, env))
                .collect::<Result<Vec<_>, _>>()?;
            func.call(&args)
        }
        Expr::Array(items) => items
            .iter()
            .map(|item| evaluate(item, env))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Expr::Object(entries) => entries
            .iter()
            .map(|(key, value)| evaluate(value, env).map(|v| (key.clone(), v)))
            .collect::<Result<OptionMap, EvalError>>()
            .map(Value::Object),
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, env)?;
            Ok(match op {
                UnaryOp::Neg => Value::Number(-value.to_number()),
                UnaryOp::Plus => Value::Number(value.to_number()),
                UnaryOp::Not => Value::Bool(!value.truthy()),
            })
        }
        Expr::Binary { op, left, right } => {
            let left = evaluate(left, env)?;
            let right = evaluate(right, env)?;
            Ok(binary(*op, &left, &right))
        }
        Expr::Logical { op, left, right } => {
            let left = evaluate(left, env)?;
            match (op, left.truthy()) {
                (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                _ => evaluate(right, env),
            }
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            if evaluate(test, env)?.truthy() {
                evaluate(consequent, env)
            } else {
                evaluate(alternate, env)
            }
        }
    }
}

fn literal(lit: &Literal) -> Value {
    match lit {
        Literal::Undefined => Value::Undefined,
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::String(s.clone()),
    }
}

fn property_of(target: &Value, key: &str) -> Result<Value, EvalError> {
    match target {
        Value::Undefined | Value::Null => Err(EvalError::Type(format!(
            "cannot read property '{key}' of {}",
            target.type_name()
        ))),
        Value::Object(map) => Ok(map.get(key).cloned().unwrap_or_default()),
        Value::Array(items) if key == "length" => Ok(Value::Number(items.len() as f64)),
        Value::Array(items) => Ok(key
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i).cloned())
            .unwrap_or_default()),
        Value::String(s) if key == "length" => Ok(Value::Number(s.chars().count() as f64)),
        _ => Ok(Value::Undefined),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add if concatenates(left) || concatenates(right) => {
            Value::String(format!("{left}{right}"))
        }
        BinaryOp::Add => Value::Number(left.to_number() + right.to_number()),
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Lt => Value::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::Le => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gt => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::StrictEq => Value::Bool(left == right),
        BinaryOp::StrictNe => Value::Bool(left != right),
        BinaryOp::Eq => Value::Bool(loose_eq(left, right)),
        BinaryOp::Ne => Value::Bool(!loose_eq(left, right)),
    }
}

fn concatenates(value: &Value) -> bool {
    matches!(
        value,
        Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Date(_)
    )
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
        (Value::Number(_) | Value::Bool(_), Value::String(_))
        | (Value::String(_), Value::Number(_) | Value::Bool(_))
        | (Value::Bool(_), Value::Number(_))
        | (Value::Number(_), Value::Bool(_)) => left.to_number() == right.to_number(),
        _ => left == right,
    }
}

/// Short source-like rendering of a callee for error messages.
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(name) => name.clone(),
        Expr::Member { object, property } => format!("{}.{property}", describe(object)),
        Expr::Index { object, .. } => format!("{}[..]", describe(object)),
        Expr::Call { callee, .. } => format!("{}(..)", describe(callee)),
        _ => "expression".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse;
    use crate::value::Callable;

    fn env() -> OptionMap {
        let mut env = OptionMap::new();
        env.insert("five".into(), Value::Number(5.0));
        env.insert("label".into(), Value::from("day"));
        env.insert("nothing".into(), Value::Undefined);
        env.insert(
            "dims".into(),
            Value::from(serde_json::json!({"day": {"size": 7}, "list": [10, 20]})),
        );
        env.insert(
            "double".into(),
            Value::Function(Callable::new("double", |args| {
                Ok(Value::Number(
                    args.first().map_or(f64::NAN, Value::to_number) * 2.0,
                ))
            })),
        );
        env
    }

    fn eval(source: &str) -> Result<Value, EvalError> {
        evaluate(&parse(source).expect("parse"), &env())
    }

    #[test]
    fn literals() {
        assert_eq!(eval("5"), Ok(Value::Number(5.0)));
        assert_eq!(eval("'red'"), Ok(Value::from("red")));
        assert_eq!(eval("null"), Ok(Value::Null));
        assert_eq!(eval(""), Ok(Value::Undefined));
    }

    #[test]
    fn object_literal_builds_map() {
        let value = eval("{color: 'red', size: five}").unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map.get("color"), Some(&Value::from("red")));
        assert_eq!(map.get("size"), Some(&Value::Number(5.0)));
    }

    #[test]
    fn unbound_identifier_is_unresolved() {
        assert_eq!(eval("missing"), Err(EvalError::Unresolved("missing".into())));
    }

    #[test]
    fn bound_undefined_is_not_an_error() {
        assert_eq!(eval("nothing"), Ok(Value::Undefined));
    }

    #[test]
    fn member_of_undefined_is_type_error() {
        assert!(matches!(eval("nothing.size"), Err(EvalError::Type(_))));
    }

    #[test]
    fn missing_member_is_undefined() {
        assert_eq!(eval("dims.week"), Ok(Value::Undefined));
        assert_eq!(eval("dims.day.size"), Ok(Value::Number(7.0)));
    }

    #[test]
    fn indexing() {
        assert_eq!(eval("dims.list[1]"), Ok(Value::Number(20.0)));
        assert_eq!(eval("dims.list.length"), Ok(Value::Number(2.0)));
        assert_eq!(eval("dims['day'].size"), Ok(Value::Number(7.0)));
        assert_eq!(eval("dims.list[9]"), Ok(Value::Undefined));
    }

    #[test]
    fn calls() {
        assert_eq!(eval("double(five + 1)"), Ok(Value::Number(12.0)));
        assert_eq!(
            eval("label()"),
            Err(EvalError::Type("label is not a function".into()))
        );
    }

    #[test]
    fn arithmetic_and_concatenation() {
        assert_eq!(eval("five * 2 - 3 % 2"), Ok(Value::Number(9.0)));
        assert_eq!(eval("'by ' + label + five"), Ok(Value::from("by day5")));
        assert_eq!(eval("-five"), Ok(Value::Number(-5.0)));
    }

    #[test]
    fn comparison_and_equality() {
        assert_eq!(eval("five > 3 && five <= 5"), Ok(Value::Bool(true)));
        assert_eq!(eval("'5' == five"), Ok(Value::Bool(true)));
        assert_eq!(eval("'5' === five"), Ok(Value::Bool(false)));
        assert_eq!(eval("null == nothing"), Ok(Value::Bool(true)));
        assert_eq!(eval("'a' < 'b'"), Ok(Value::Bool(true)));
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_eq!(eval("nothing || 'fallback'"), Ok(Value::from("fallback")));
        assert_eq!(eval("false && missing"), Ok(Value::Bool(false)));
        assert_eq!(eval("five || missing"), Ok(Value::Number(5.0)));
    }

    #[test]
    fn conditional() {
        assert_eq!(eval("five > 4 ? 'big' : 'small'"), Ok(Value::from("big")));
        assert_eq!(eval("nothing ? missing : 0"), Ok(Value::Number(0.0)));
    }
}
