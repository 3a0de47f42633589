//! Method dispatch for the three container types that behave like
//! instances despite not being classes: strings, arrays and hashes.
//!
//! Each `call_*` function returns `None` when `method` isn't one of the
//! fixed names the container exposes, so the caller can fall through to a
//! generic "no such attribute" error the same way it would for a missing
//! instance field.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::LoxError;

use super::value::Value;

fn arity_error(method: &str, expected: usize, got: usize) -> LoxError {
    LoxError::runtime(format!(
        "'{method}' takes {expected} argument(s) but {got} were given."
    ))
}

pub fn call_string(s: &Rc<str>, method: &str, args: &[Value]) -> Option<Result<Value, LoxError>> {
    let result = match method {
        "lower" => Ok(Value::string(s.to_lowercase())),
        "upper" => Ok(Value::string(s.to_uppercase())),
        "replace" => (|| {
            if args.len() != 2 {
                return Err(arity_error("replace", 2, args.len()));
            }
            let (Value::Str(from), Value::Str(to)) = (&args[0], &args[1]) else {
                return Err(LoxError::runtime("'replace' expects two strings."));
            };
            Ok(Value::string(s.replace(from.as_ref(), to)))
        })(),
        "split" => (|| {
            if args.len() != 1 {
                return Err(arity_error("split", 1, args.len()));
            }
            let Value::Str(sep) = &args[0] else {
                return Err(LoxError::runtime("'split' expects a string separator."));
            };
            let parts = if sep.is_empty() {
                s.chars().map(|c| Value::string(c.to_string())).collect()
            } else {
                s.split(sep.as_ref()).map(Value::string).collect()
            };
            Ok(Value::array(parts))
        })(),
        "contains" => (|| {
            if args.len() != 1 {
                return Err(arity_error("contains", 1, args.len()));
            }
            let Value::Str(needle) = &args[0] else {
                return Err(LoxError::runtime("'contains' expects a string."));
            };
            Ok(Value::Bool(s.contains(needle.as_ref())))
        })(),
        "isalpha" => Ok(Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()))),
        "isdigit" => Ok(Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))),
        "isalnum" => Ok(Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric()))),
        "isdecimal" => Ok(Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))),
        "isidentifier" => Ok(Value::Bool(is_identifier(s))),
        "islower" => Ok(Value::Bool(
            s.chars().any(|c| c.is_ascii_alphabetic()) && s.chars().all(|c| !c.is_ascii_uppercase()),
        )),
        "isnumeric" => Ok(Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))),
        "isprintable" => Ok(Value::Bool(s.chars().all(|c| !c.is_ascii_control()))),
        "isspace" => Ok(Value::Bool(!s.is_empty() && s.chars().all(|c| c.is_ascii_whitespace()))),
        "istitle" => Ok(Value::Bool(is_title(s))),
        "isupper" => Ok(Value::Bool(
            s.chars().any(|c| c.is_ascii_alphabetic()) && s.chars().all(|c| !c.is_ascii_lowercase()),
        )),
        "isascii" => Ok(Value::Bool(s.is_ascii())),
        "get" => (|| {
            if args.len() != 1 {
                return Err(arity_error("get", 1, args.len()));
            }
            let chars: Vec<char> = s.chars().collect();
            let index = index_from(&args[0], chars.len())?;
            Ok(Value::string(chars[index].to_string()))
        })(),
        "set" => Err(LoxError::runtime("strings are immutable; 'set' is not supported.")),
        _ => return None,
    };
    Some(result)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_title(s: &str) -> bool {
    let mut prev_alpha = false;
    let mut saw_alpha = false;
    for c in s.chars() {
        if c.is_ascii_alphabetic() {
            saw_alpha = true;
            let expect_upper = !prev_alpha;
            if expect_upper != c.is_ascii_uppercase() {
                return false;
            }
            prev_alpha = true;
        } else {
            prev_alpha = false;
        }
    }
    saw_alpha
}

/// Orders two array elements for `sort`, matching the reference
/// implementation's generic comparison sort: numbers compare numerically,
/// strings compare lexically, and comparing across those two families (or
/// sorting any other type) is a runtime error rather than a silent
/// arbitrary order.
fn compare_for_sort(a: &Value, b: &Value) -> Result<std::cmp::Ordering, LoxError> {
    match (a, b) {
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => Ok(a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)),
            _ => Err(LoxError::runtime(
                "sort requires an array of all numbers or all strings.",
            )),
        },
    }
}

fn index_from(value: &Value, len: usize) -> Result<usize, LoxError> {
    let Value::Integer(i) = value else {
        return Err(LoxError::runtime("index must be an integer."));
    };
    let normalized = if *i < 0 { *i + len as i64 } else { *i };
    if normalized < 0 || normalized as usize >= len {
        return Err(LoxError::data_err(format!("index {i} out of range.")));
    }
    Ok(normalized as usize)
}

pub fn call_array(
    items: &Rc<RefCell<Vec<Value>>>,
    method: &str,
    args: &[Value],
) -> Option<Result<Value, LoxError>> {
    let result = match method {
        "append" => (|| {
            if args.len() != 1 {
                return Err(arity_error("append", 1, args.len()));
            }
            items.borrow_mut().push(args[0].clone());
            Ok(Value::Nil)
        })(),
        "insert" => (|| {
            if args.len() != 2 {
                return Err(arity_error("insert", 2, args.len()));
            }
            let len = items.borrow().len();
            let index = index_from(&args[0], len + 1)?;
            items.borrow_mut().insert(index, args[1].clone());
            Ok(Value::Nil)
        })(),
        "remove" => (|| {
            if args.len() != 1 {
                return Err(arity_error("remove", 1, args.len()));
            }
            let mut items = items.borrow_mut();
            let Some(pos) = items.iter().position(|v| v.lox_eq(&args[0])) else {
                return Err(LoxError::data_err("value not found in array."));
            };
            items.remove(pos);
            Ok(Value::Nil)
        })(),
        "contains" => (|| {
            if args.len() != 1 {
                return Err(arity_error("contains", 1, args.len()));
            }
            Ok(Value::Bool(items.borrow().iter().any(|v| v.lox_eq(&args[0]))))
        })(),
        "clear" => {
            items.borrow_mut().clear();
            Ok(Value::Nil)
        }
        "pop" => (|| {
            let mut items = items.borrow_mut();
            let len = items.len();
            if len == 0 {
                return Err(LoxError::data_err("pop from empty array."));
            }
            let index = if args.is_empty() {
                len - 1
            } else if args.len() == 1 {
                index_from(&args[0], len)?
            } else {
                return Err(arity_error("pop", 1, args.len()));
            };
            Ok(items.remove(index))
        })(),
        "reverse" => {
            items.borrow_mut().reverse();
            Ok(Value::Nil)
        }
        "sort" => (|| {
            let mut items = items.borrow_mut();
            let mut sorted = items.clone();
            let mut sort_err = None;
            sorted.sort_by(|a, b| match compare_for_sort(a, b) {
                Ok(ordering) => ordering,
                Err(err) => {
                    sort_err.get_or_insert(err);
                    std::cmp::Ordering::Equal
                }
            });
            if let Some(err) = sort_err {
                return Err(err);
            }
            *items = sorted;
            Ok(Value::Nil)
        })(),
        "join" => (|| {
            if args.len() != 1 {
                return Err(arity_error("join", 1, args.len()));
            }
            let Value::Str(sep) = &args[0] else {
                return Err(LoxError::runtime("'join' expects a string separator."));
            };
            let parts: Vec<String> = items.borrow().iter().map(|v| v.to_string()).collect();
            Ok(Value::string(parts.join(sep)))
        })(),
        "slice" => (|| {
            if args.len() != 2 {
                return Err(arity_error("slice", 2, args.len()));
            }
            let items = items.borrow();
            let len = items.len();
            let start = index_from(&args[0], len + 1)?;
            let end = index_from(&args[1], len + 1)?;
            if start > end {
                return Err(LoxError::data_err("slice start after end."));
            }
            Ok(Value::array(items[start..end].to_vec()))
        })(),
        "extend" => (|| {
            if args.len() != 1 {
                return Err(arity_error("extend", 1, args.len()));
            }
            let Value::Array(other) = &args[0] else {
                return Err(LoxError::runtime("'extend' expects an array."));
            };
            if Rc::ptr_eq(items, other) {
                return Err(LoxError::runtime("cannot extend an array with itself."));
            }
            items.borrow_mut().extend(other.borrow().iter().cloned());
            Ok(Value::Nil)
        })(),
        "copy" => Ok(Value::array(items.borrow().clone())),
        "get" => (|| {
            if args.len() != 1 {
                return Err(arity_error("get", 1, args.len()));
            }
            let items = items.borrow();
            let index = index_from(&args[0], items.len())?;
            Ok(items[index].clone())
        })(),
        "set" => (|| {
            if args.len() != 2 {
                return Err(arity_error("set", 2, args.len()));
            }
            let mut items = items.borrow_mut();
            let len = items.len();
            let index = index_from(&args[0], len)?;
            items[index] = args[1].clone();
            Ok(Value::Nil)
        })(),
        _ => return None,
    };
    Some(result)
}

pub fn call_hash(
    entries: &Rc<RefCell<Vec<(Value, Value)>>>,
    method: &str,
    args: &[Value],
) -> Option<Result<Value, LoxError>> {
    let result = match method {
        "get" => (|| {
            if args.len() != 1 {
                return Err(arity_error("get", 1, args.len()));
            }
            Ok(entries
                .borrow()
                .iter()
                .find(|(k, _)| k.lox_eq(&args[0]))
                .map(|(_, v)| v.clone())
                .unwrap_or(Value::Nil))
        })(),
        "set" => (|| {
            if args.len() != 2 {
                return Err(arity_error("set", 2, args.len()));
            }
            let mut entries = entries.borrow_mut();
            if let Some(slot) = entries.iter_mut().find(|(k, _)| k.lox_eq(&args[0])) {
                slot.1 = args[1].clone();
            } else {
                entries.push((args[0].clone(), args[1].clone()));
            }
            Ok(Value::Nil)
        })(),
        _ => return None,
    };
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_predicates() {
        assert_eq!(
            call_string(&"hello".into(), "isalpha", &[]).unwrap().unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call_string(&"Hello World".into(), "istitle", &[]).unwrap().unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn array_pop_out_of_range_is_data_err() {
        let items = Rc::new(RefCell::new(vec![Value::Integer(1)]));
        let err = call_array(&items, "pop", &[Value::Integer(5)]).unwrap().unwrap_err();
        assert_eq!(err.exit_code(), crate::error::ExitCode::DataErr);
    }

    #[test]
    fn hash_get_set_roundtrip() {
        let entries = Rc::new(RefCell::new(Vec::new()));
        call_hash(&entries, "set", &[Value::string("a"), Value::Integer(1)])
            .unwrap()
            .unwrap();
        let got = call_hash(&entries, "get", &[Value::string("a")]).unwrap().unwrap();
        assert_eq!(got, Value::Integer(1));
    }

    #[test]
    fn unknown_method_returns_none() {
        let items = Rc::new(RefCell::new(Vec::new()));
        assert!(call_array(&items, "nope", &[]).is_none());
    }
}
