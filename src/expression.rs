use crate::ast::Value;
use crate::error::{At, ReduceError};

/// Evaluate a binary operation over two already-resolved operands.
///
/// Dispatch is by operator, then by the operand pair. Anything outside the
/// supported matrix comes back as `BadOperandTypes`; an operator not in the
/// language at all is `UnknownOperation`. The evaluator never panics.
pub fn evaluate(op: &str, left: &Value, right: &Value, at: At) -> Result<Value, ReduceError> {
    let result = match op {
        "+" => plus(left, right),
        "-" => minus(left, right),
        "*" => multiply(left, right),
        "/" => divide(left, right),
        "==" => equals(left, right).map(Value::Bool),
        "!=" => equals(left, right).map(|eq| Value::Bool(!eq)),
        "<" => compare(left, right, |o| o.is_lt()),
        "<=" => compare(left, right, |o| o.is_le()),
        ">" => compare(left, right, |o| o.is_gt()),
        ">=" => compare(left, right, |o| o.is_ge()),
        "&&" => bool_op(left, right, |a, b| a && b),
        "||" => bool_op(left, right, |a, b| a || b),
        _ => {
            return Err(ReduceError::UnknownOperation {
                op: op.to_string(),
                at,
            })
        }
    };

    result.ok_or_else(|| ReduceError::BadOperandTypes {
        op: op.to_string(),
        left_type: left.type_name(),
        right_type: right.type_name(),
        at,
    })
}

/// `+` sums integers and concatenates strings.
fn plus(a: &Value, b: &Value) -> Option<Value> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Some(Value::Int(a.wrapping_add(*b))),
        (Value::String(a), Value::String(b)) => Some(Value::String(format!("{}{}", a, b))),
        _ => None,
    }
}

fn minus(a: &Value, b: &Value) -> Option<Value> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Some(Value::Int(a.wrapping_sub(*b))),
        _ => None,
    }
}

fn multiply(a: &Value, b: &Value) -> Option<Value> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Some(Value::Int(a.wrapping_mul(*b))),
        _ => None,
    }
}

/// Integer division. Division by zero has no result and surfaces as
/// `BadOperandTypes` at the call site.
fn divide(a: &Value, b: &Value) -> Option<Value> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => a.checked_div(*b).map(Value::Int),
        _ => None,
    }
}

fn equals(a: &Value, b: &Value) -> Option<bool> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Some(a == b),
        (Value::String(a), Value::String(b)) => Some(a == b),
        _ => None,
    }
}

/// Ordering over integers and (lexicographically) strings.
fn compare(a: &Value, b: &Value, accept: fn(std::cmp::Ordering) -> bool) -> Option<Value> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Some(Value::Bool(accept(a.cmp(b)))),
        (Value::String(a), Value::String(b)) => Some(Value::Bool(accept(a.cmp(b)))),
        _ => None,
    }
}

fn bool_op(a: &Value, b: &Value, combine: fn(bool, bool) -> bool) -> Option<Value> {
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => Some(Value::Bool(combine(*a, *b))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> At {
        At::new("expr.ms", 3)
    }

    fn eval(op: &str, left: Value, right: Value) -> Result<Value, ReduceError> {
        evaluate(op, &left, &right, at())
    }

    #[test]
    fn arithmetic_on_ints() {
        assert_eq!(eval("+", Value::Int(2), Value::Int(3)), Ok(Value::Int(5)));
        assert_eq!(eval("-", Value::Int(2), Value::Int(3)), Ok(Value::Int(-1)));
        assert_eq!(eval("*", Value::Int(4), Value::Int(3)), Ok(Value::Int(12)));
        assert_eq!(eval("/", Value::Int(7), Value::Int(2)), Ok(Value::Int(3)));
    }

    #[test]
    fn plus_concatenates_strings() {
        assert_eq!(
            eval("+", Value::str("foo"), Value::str("bar")),
            Ok(Value::str("foobar"))
        );
    }

    #[test]
    fn equality() {
        assert_eq!(
            eval("==", Value::Int(2), Value::Int(2)),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            eval("!=", Value::str("a"), Value::str("b")),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn ordering_on_ints_and_strings() {
        assert_eq!(
            eval("<", Value::Int(1), Value::Int(2)),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            eval(">=", Value::Int(2), Value::Int(2)),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            eval("<=", Value::str("abc"), Value::str("abd")),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            eval(">", Value::str("b"), Value::str("a")),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn logical_ops_on_bools() {
        assert_eq!(
            eval("&&", Value::Bool(true), Value::Bool(false)),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            eval("||", Value::Bool(true), Value::Bool(false)),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn mismatched_operands_report_both_types() {
        let err = eval("+", Value::Int(5), Value::str("banana")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Bad types (int, string) supplied for operation '+' at expr.ms:3"
        );
    }

    #[test]
    fn logical_op_on_ints_is_rejected() {
        let err = eval("&&", Value::Int(1), Value::Int(1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Bad types (int, int) supplied for operation '&&' at expr.ms:3"
        );
    }

    #[test]
    fn division_by_zero_is_reported_not_panicked() {
        let err = eval("/", Value::Int(1), Value::Int(0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Bad types (int, int) supplied for operation '/' at expr.ms:3"
        );
    }

    #[test]
    fn unknown_operation() {
        let err = eval("%", Value::Int(1), Value::Int(2)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Encountered unknown operation '%' in expression at expr.ms:3"
        );
    }
}
