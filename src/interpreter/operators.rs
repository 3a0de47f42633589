//! Unary and binary operator semantics, kept separate from the AST walk so
//! the arithmetic/comparison table reads as one place rather than being
//! scattered across a giant `match` in `mod.rs`.

use crate::ast::{BinaryOp, UnaryOp};
use crate::error::LoxError;
use crate::lexer::Token;
use crate::runtime::Value;

pub fn unary(op: UnaryOp, _op_token: &Token, right: Value) -> Result<Value, LoxError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!right.is_truthy())),
        UnaryOp::Negate => match right {
            Value::Integer(n) => Ok(Value::Integer(-n)),
            Value::Float(n) => Ok(Value::Float(-n)),
            _ => Err(LoxError::runtime("Operand must be a number.")),
        },
    }
}

pub fn binary(op: BinaryOp, op_token: &Token, left: Value, right: Value) -> Result<Value, LoxError> {
    use BinaryOp::*;
    match op {
        Equal => Ok(Value::Bool(left.lox_eq(&right))),
        NotEqual => Ok(Value::Bool(!left.lox_eq(&right))),
        Add => add(op_token, left, right),
        Subtract => numeric(op_token, left, right, |a, b| a - b, |a, b| a - b),
        Multiply => numeric(op_token, left, right, |a, b| a * b, |a, b| a * b),
        Divide => divide(op_token, left, right),
        FloorDivide => floor_divide(op_token, left, right),
        Modulo => modulo(op_token, left, right),
        Power => power(op_token, left, right),
        Less => compare(op_token, left, right, |a, b| a < b),
        LessEqual => compare(op_token, left, right, |a, b| a <= b),
        Greater => compare(op_token, left, right, |a, b| a > b),
        GreaterEqual => compare(op_token, left, right, |a, b| a >= b),
    }
}

fn add(_op_token: &Token, left: Value, right: Value) -> Result<Value, LoxError> {
    match (&left, &right) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::string(format!("{a}{b}"))),
        (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a + b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(a + b)),
            _ => Err(LoxError::runtime("Operands must be two numbers or two strings.")),
        },
    }
}

fn numeric(
    _op_token: &Token,
    left: Value,
    right: Value,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, LoxError> {
    match (&left, &right) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(int_op(*a, *b))),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(float_op(a, b))),
            _ => Err(LoxError::runtime("Operands must be numbers.")),
        },
    }
}

fn divide(_op_token: &Token, left: Value, right: Value) -> Result<Value, LoxError> {
    let (a, b) = numeric_operands(&left, &right)?;
    if b == 0.0 {
        return Err(LoxError::runtime("Division by zero."));
    }
    Ok(Value::Float(a / b))
}

fn floor_divide(_op_token: &Token, left: Value, right: Value) -> Result<Value, LoxError> {
    if let (Value::Integer(a), Value::Integer(b)) = (&left, &right) {
        if *b == 0 {
            return Err(LoxError::runtime("Division by zero."));
        }
        return Ok(Value::Integer(a.div_euclid(*b)));
    }
    let (a, b) = numeric_operands(&left, &right)?;
    if b == 0.0 {
        return Err(LoxError::runtime("Division by zero."));
    }
    Ok(Value::Float((a / b).floor()))
}

fn modulo(_op_token: &Token, left: Value, right: Value) -> Result<Value, LoxError> {
    if let (Value::Integer(a), Value::Integer(b)) = (&left, &right) {
        if *b == 0 {
            return Err(LoxError::runtime("Division by zero."));
        }
        return Ok(Value::Integer(a.rem_euclid(*b)));
    }
    let (a, b) = numeric_operands(&left, &right)?;
    if b == 0.0 {
        return Err(LoxError::runtime("Division by zero."));
    }
    Ok(Value::Float(a - b * (a / b).floor()))
}

fn power(_op_token: &Token, left: Value, right: Value) -> Result<Value, LoxError> {
    if let (Value::Integer(a), Value::Integer(b)) = (&left, &right) {
        if *b >= 0 {
            return Ok(Value::Integer(a.pow(*b as u32)));
        }
    }
    let (a, b) = numeric_operands(&left, &right)?;
    Ok(Value::Float(a.powf(b)))
}

fn compare(_op_token: &Token, left: Value, right: Value, cmp: fn(f64, f64) -> bool) -> Result<Value, LoxError> {
    let (a, b) = numeric_operands(&left, &right)?;
    Ok(Value::Bool(cmp(a, b)))
}

fn numeric_operands(left: &Value, right: &Value) -> Result<(f64, f64), LoxError> {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(LoxError::runtime("Operands must be numbers.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind;

    fn token() -> Token {
        Token::synthetic(TokenKind::Plus, "+")
    }

    #[test]
    fn integer_add_stays_integer() {
        assert_eq!(
            binary(BinaryOp::Add, &token(), Value::Integer(1), Value::Integer(2)).unwrap(),
            Value::Integer(3)
        );
    }

    #[test]
    fn mixed_add_widens_to_float() {
        assert_eq!(
            binary(BinaryOp::Add, &token(), Value::Integer(1), Value::Float(2.5)).unwrap(),
            Value::Float(3.5)
        );
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(
            binary(BinaryOp::Add, &token(), Value::string("a"), Value::string("b")).unwrap(),
            Value::string("ab")
        );
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(binary(BinaryOp::Divide, &token(), Value::Integer(1), Value::Integer(0)).is_err());
    }

    #[test]
    fn true_division_always_yields_float() {
        assert_eq!(
            binary(BinaryOp::Divide, &token(), Value::Integer(4), Value::Integer(2)).unwrap(),
            Value::Float(2.0)
        );
    }

    #[test]
    fn integer_and_float_are_never_equal() {
        assert_eq!(
            binary(BinaryOp::Equal, &token(), Value::Integer(1), Value::Float(1.0)).unwrap(),
            Value::Bool(false)
        );
    }
}
