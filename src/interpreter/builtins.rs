//! The fixed built-in callable table, registered into the global
//! environment at interpreter construction. A closed list rather than
//! anything discovered by walking a directory, matching this project's
//! `runtime` module doc's "built-ins are a fixed table" design note.

use std::io::Write as _;
use std::rc::Rc;

use crate::error::LoxError;
use crate::runtime::{Builtin, Environment, HttpClient, Value};

use super::Interpreter;

fn define(env: &Environment, name: &'static str, arity: usize, func: impl Fn(&mut Interpreter, &[Value]) -> Result<Value, LoxError> + 'static) {
    env.define(
        name,
        Value::Builtin(Rc::new(Builtin {
            name,
            arity,
            func: Box::new(func),
        })),
    );
}

pub fn register(env: &Environment) {
    register_generic(env);
    register_math(env);
    register_io(env);
    register_http(env);
}

fn register_generic(env: &Environment) {
    define(env, "clock", 0, |_, _| {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| LoxError::runtime(format!("clock unavailable: {e}")))?;
        Ok(Value::Float(now.as_secs_f64()))
    });

    define(env, "len", 1, |_, args| match &args[0] {
        Value::Str(s) => Ok(Value::Integer(s.chars().count() as i64)),
        Value::Array(items) => Ok(Value::Integer(items.borrow().len() as i64)),
        Value::Hash(entries) => Ok(Value::Integer(entries.borrow().len() as i64)),
        other => Err(LoxError::runtime(format!("'{}' has no length.", other.type_name()))),
    });

    define(env, "str", 1, |_, args| Ok(Value::string(args[0].to_string())));

    define(env, "int", 1, |_, args| match &args[0] {
        Value::Integer(n) => Ok(Value::Integer(*n)),
        Value::Float(n) => Ok(Value::Integer(*n as i64)),
        Value::Bool(b) => Ok(Value::Integer(*b as i64)),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| LoxError::data_err(format!("cannot convert '{s}' to int."))),
        other => Err(LoxError::runtime(format!("cannot convert {} to int.", other.type_name()))),
    });

    define(env, "float", 1, |_, args| match &args[0] {
        Value::Integer(n) => Ok(Value::Float(*n as f64)),
        Value::Float(n) => Ok(Value::Float(*n)),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| LoxError::data_err(format!("cannot convert '{s}' to float."))),
        other => Err(LoxError::runtime(format!("cannot convert {} to float.", other.type_name()))),
    });

    define(env, "type", 1, |_, args| Ok(Value::string(args[0].type_name())));

    define(env, "array", 0, |_, _| Ok(Value::array(Vec::new())));
    define(env, "hash", 0, |_, _| Ok(Value::hash()));

    define(env, "ord", 1, |_, args| match &args[0] {
        Value::Str(s) if s.chars().count() == 1 => Ok(Value::Integer(s.chars().next().unwrap() as i64)),
        Value::Str(_) => Err(LoxError::runtime("'ord' expects a single-character string.")),
        other => Err(LoxError::runtime(format!("'ord' expects a string, got {}.", other.type_name()))),
    });

    define(env, "max", 2, |_, args| numeric_pair(&args[0], &args[1], f64::max));
    define(env, "min", 2, |_, args| numeric_pair(&args[0], &args[1], f64::min));

    define(env, "split", 2, |_, args| {
        let (Value::Str(s), Value::Str(sep)) = (&args[0], &args[1]) else {
            return Err(LoxError::runtime("'split' expects two strings."));
        };
        let parts = if sep.is_empty() {
            s.chars().map(|c| Value::string(c.to_string())).collect()
        } else {
            s.split(sep.as_ref()).map(Value::string).collect()
        };
        Ok(Value::array(parts))
    });
}

fn numeric_pair(a: &Value, b: &Value, pick: fn(f64, f64) -> f64) -> Result<Value, LoxError> {
    let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) else {
        return Err(LoxError::runtime("expected two numbers."));
    };
    if matches!((a, b), (Value::Integer(_), Value::Integer(_))) {
        Ok(Value::Integer(pick(x, y) as i64))
    } else {
        Ok(Value::Float(pick(x, y)))
    }
}

fn register_math(env: &Environment) {
    define(env, "abs", 1, |_, args| match &args[0] {
        Value::Integer(n) => Ok(Value::Integer(n.abs())),
        Value::Float(n) => Ok(Value::Float(n.abs())),
        other => Err(LoxError::runtime(format!("'abs' expects a number, got {}.", other.type_name()))),
    });

    define(env, "ceil", 1, |_, args| {
        Ok(Value::Integer(require_f64(&args[0], "ceil")?.ceil() as i64))
    });

    define(env, "floor", 1, |_, args| {
        Ok(Value::Integer(require_f64(&args[0], "floor")?.floor() as i64))
    });

    define(env, "pow", 2, |_, args| {
        let base = require_f64(&args[0], "pow")?;
        let exp = require_f64(&args[1], "pow")?;
        Ok(Value::Float(base.powf(exp)))
    });

    define(env, "round", 2, |_, args| {
        let value = require_f64(&args[0], "round")?;
        let Value::Integer(ndigits) = &args[1] else {
            return Err(LoxError::runtime("'round' expects an integer digit count."));
        };
        if *ndigits <= 0 {
            return Ok(Value::Integer(value.round() as i64));
        }
        let factor = 10f64.powi(*ndigits as i32);
        Ok(Value::Float((value * factor).round() / factor))
    });

    define(env, "divmod", 2, |_, args| {
        let (Value::Integer(a), Value::Integer(b)) = (&args[0], &args[1]) else {
            return Err(LoxError::runtime("'divmod' expects two integers."));
        };
        if *b == 0 {
            return Err(LoxError::runtime("Division by zero."));
        }
        Ok(Value::array(vec![Value::Integer(a.div_euclid(*b)), Value::Integer(a.rem_euclid(*b))]))
    });

    define(env, "median", 1, |_, args| {
        let mut values = require_number_array(&args[0], "median")?;
        if values.is_empty() {
            return Err(LoxError::data_err("'median' requires a non-empty array."));
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let mid = values.len() / 2;
        let median = if values.len() % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        };
        Ok(Value::Float(median))
    });

    define(env, "mean", 1, |_, args| {
        let values = require_number_array(&args[0], "mean")?;
        if values.is_empty() {
            return Err(LoxError::data_err("'mean' requires a non-empty array."));
        }
        Ok(Value::Float(values.iter().sum::<f64>() / values.len() as f64))
    });

    define(env, "mode", 1, |_, args| {
        let values = require_number_array(&args[0], "mode")?;
        if values.is_empty() {
            return Err(LoxError::data_err("'mode' requires a non-empty array."));
        }
        let mut best = values[0];
        let mut best_count = 0usize;
        for &candidate in &values {
            let count = values.iter().filter(|&&v| v == candidate).count();
            if count > best_count {
                best = candidate;
                best_count = count;
            }
        }
        Ok(Value::Float(best))
    });
}

fn require_f64(value: &Value, name: &str) -> Result<f64, LoxError> {
    value
        .as_f64()
        .ok_or_else(|| LoxError::runtime(format!("'{name}' expects a number, got {}.", value.type_name())))
}

fn require_number_array(value: &Value, name: &str) -> Result<Vec<f64>, LoxError> {
    let Value::Array(items) = value else {
        return Err(LoxError::runtime(format!("'{name}' expects an array.")));
    };
    items
        .borrow()
        .iter()
        .map(|v| v.as_f64().ok_or_else(|| LoxError::runtime(format!("'{name}' expects an array of numbers."))))
        .collect()
}

fn register_io(env: &Environment) {
    define(env, "input", 1, |_, args| {
        let Value::Str(prompt) = &args[0] else {
            return Err(LoxError::runtime("'input' expects a string prompt."));
        };
        print!("{prompt}");
        std::io::stdout()
            .flush()
            .map_err(|e| LoxError::io_err(format!("failed to flush stdout: {e}")))?;
        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .map_err(|e| LoxError::io_err(format!("failed to read stdin: {e}")))?;
        Ok(Value::string(line.trim_end_matches('\n').to_string()))
    });

    define(env, "read", 1, |_, args| {
        let path = require_path(&args[0])?;
        std::fs::read_to_string(path)
            .map(Value::string)
            .map_err(|e| LoxError::no_input(format!("cannot read '{path}': {e}")))
    });

    define(env, "read_lines", 1, |_, args| {
        let path = require_path(&args[0])?;
        let text = std::fs::read_to_string(path).map_err(|e| LoxError::no_input(format!("cannot read '{path}': {e}")))?;
        Ok(Value::array(text.lines().map(Value::string).collect()))
    });

    define(env, "write", 2, |_, args| {
        let path = require_path(&args[0])?;
        let Value::Str(text) = &args[1] else {
            return Err(LoxError::runtime("'write' expects a string body."));
        };
        std::fs::write(path, text.as_bytes()).map_err(|e| LoxError::io_err(format!("cannot write '{path}': {e}")))?;
        Ok(Value::Nil)
    });
}

fn require_path(value: &Value) -> Result<&str, LoxError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(LoxError::runtime(format!("expected a path string, got {}.", other.type_name()))),
    }
}

fn register_http(env: &Environment) {
    define(env, "requests", 0, |_, _| Ok(Value::HttpClient(HttpClient)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Depths;

    fn interpreter() -> Interpreter {
        Interpreter::new(Depths::new(), "")
    }

    #[test]
    fn clock_returns_a_float() {
        let mut interp = interpreter();
        let clock = interp.globals.get(&crate::lexer::Token::synthetic(crate::lexer::TokenKind::Identifier, "clock")).unwrap();
        let Value::Builtin(builtin) = clock else { panic!("clock should be a builtin") };
        assert!(matches!((builtin.func)(&mut interp, &[]), Ok(Value::Float(_))));
    }

    #[test]
    fn divmod_matches_floor_division() {
        assert_eq!(
            numeric_pair(&Value::Integer(7), &Value::Integer(3), f64::max).unwrap(),
            Value::Integer(7)
        );
    }

    #[test]
    fn mean_of_numeric_array() {
        let array = Value::array(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        assert_eq!(require_number_array(&array, "mean").unwrap(), vec![1.0, 2.0, 3.0]);
    }
}
