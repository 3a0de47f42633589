//! A singly-linked chain of name→value frames.
//!
//! Closures can outlive the block that created them, so frames are shared
//! via `Rc<RefCell<_>>` rather than owned outright — the same shape the
//! wider Lox-in-Rust example pool uses for its environment chain.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::LoxError;
use crate::lexer::Token;

use super::Value;

#[derive(Debug)]
struct Frame {
    values: HashMap<String, Value>,
    enclosing: Option<Environment>,
}

#[derive(Debug, Clone)]
pub struct Environment(Rc<RefCell<Frame>>);

impl Environment {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(Frame {
            values: HashMap::new(),
            enclosing: None,
        })))
    }

    pub fn with_enclosing(enclosing: Environment) -> Self {
        Self(Rc::new(RefCell::new(Frame {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        })))
    }

    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().values.insert(name.into(), value);
    }

    fn ancestor(&self, distance: usize) -> Environment {
        let mut env = self.clone();
        for _ in 0..distance {
            let next = env
                .0
                .borrow()
                .enclosing
                .clone()
                .expect("resolver-computed distance exceeds the environment chain");
            env = next;
        }
        env
    }

    pub fn get_at(&self, distance: usize, name: &str) -> Value {
        self.ancestor(distance)
            .0
            .borrow()
            .values
            .get(name)
            .cloned()
            .unwrap_or(Value::Nil)
    }

    pub fn assign_at(&self, distance: usize, name: &Token, value: Value) {
        self.ancestor(distance)
            .0
            .borrow_mut()
            .values
            .insert(name.lexeme.clone(), value);
    }

    pub fn get(&self, name: &Token) -> Result<Value, LoxError> {
        if let Some(value) = self.0.borrow().values.get(&name.lexeme) {
            return Ok(value.clone());
        }
        if let Some(enclosing) = &self.0.borrow().enclosing {
            return enclosing.get(name);
        }
        Err(LoxError::runtime(format!(
            "Undefined variable '{}'.",
            name.lexeme
        )))
    }

    pub fn assign(&self, name: &Token, value: Value) -> Result<(), LoxError> {
        if self.0.borrow().values.contains_key(&name.lexeme) {
            self.0.borrow_mut().values.insert(name.lexeme.clone(), value);
            return Ok(());
        }
        let enclosing = self.0.borrow().enclosing.clone();
        if let Some(enclosing) = enclosing {
            return enclosing.assign(name, value);
        }
        Err(LoxError::runtime(format!(
            "Undefined variable '{}'.",
            name.lexeme
        )))
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind;

    fn token(name: &str) -> Token {
        Token::synthetic(TokenKind::Identifier, name)
    }

    #[test]
    fn inner_scope_shadows_without_overwriting_outer() {
        let outer = Environment::new();
        outer.define("a", Value::Integer(1));

        let inner = Environment::with_enclosing(outer.clone());
        inner.define("a", Value::Integer(2));

        assert_eq!(inner.get(&token("a")).unwrap(), Value::Integer(2));
        assert_eq!(outer.get(&token("a")).unwrap(), Value::Integer(1));
    }

    #[test]
    fn assign_walks_up_to_the_defining_frame() {
        let outer = Environment::new();
        outer.define("a", Value::Integer(1));
        let inner = Environment::with_enclosing(outer.clone());

        inner.assign(&token("a"), Value::Integer(9)).unwrap();

        assert_eq!(outer.get(&token("a")).unwrap(), Value::Integer(9));
    }

    #[test]
    fn unknown_name_is_a_runtime_error() {
        let env = Environment::new();
        assert!(env.get(&token("missing")).is_err());
    }
}
