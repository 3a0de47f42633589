//! Callable and instance shapes: plain functions, lambdas, classes and the
//! instances they produce.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Display;
use std::rc::Rc;

use crate::ast::FunctionDecl;

use super::environment::Environment;
use super::value::Value;

#[derive(Debug)]
pub struct LoxFunction {
    pub name: String,
    pub params: Vec<crate::lexer::Token>,
    pub body: Vec<crate::ast::Stmt>,
    pub closure: Environment,
    pub is_initializer: bool,
}

impl LoxFunction {
    pub fn new(decl: &FunctionDecl, closure: Environment, is_initializer: bool) -> Self {
        Self {
            name: decl.name.lexeme.clone(),
            params: decl.params.clone(),
            body: decl.body.clone(),
            closure,
            is_initializer,
        }
    }

    pub fn from_lambda(
        params: Vec<crate::lexer::Token>,
        body: Vec<crate::ast::Stmt>,
        closure: Environment,
    ) -> Self {
        Self {
            name: "lambda".into(),
            params,
            body,
            closure,
            is_initializer: false,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Returns a copy of this function whose closure has `this` (and, for a
    /// subclass method, `super`) bound to `instance` — the method-binding
    /// step that turns an unbound declaration into a callable bound method.
    pub fn bind(&self, instance: LoxInstance) -> LoxFunction {
        let env = Environment::with_enclosing(self.closure.clone());
        env.define("this", Value::Instance(instance));
        LoxFunction {
            name: self.name.clone(),
            params: self.params.clone(),
            body: self.body.clone(),
            closure: env,
            is_initializer: self.is_initializer,
        }
    }
}

#[derive(Debug)]
pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    pub methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }
        self.superclass.as_ref()?.find_method(name)
    }

    pub fn arity(&self) -> usize {
        self.find_method("init").map(|m| m.arity()).unwrap_or(0)
    }
}

#[derive(Debug)]
pub struct LoxInstanceData {
    pub class: Rc<LoxClass>,
    pub fields: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct LoxInstance(Rc<RefCell<LoxInstanceData>>);

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self(Rc::new(RefCell::new(LoxInstanceData {
            class,
            fields: HashMap::new(),
        })))
    }

    pub fn is_same(&self, other: &LoxInstance) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn class(&self) -> Rc<LoxClass> {
        self.0.borrow().class.clone()
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.0.borrow().fields.get(name).cloned()
    }

    pub fn set_field(&self, name: String, value: Value) {
        self.0.borrow_mut().fields.insert(name, value);
    }

    /// Property lookup used by `Get` expressions: fields shadow methods,
    /// and a found method is bound to this instance before being returned.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.get_field(name) {
            return Some(value);
        }
        let class = self.class();
        let method = class.find_method(name)?;
        Some(Value::Function(Rc::new(method.bind(self.clone()))))
    }
}

impl Display for LoxInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<{} instance at {:?}>",
            self.0.borrow().class.name,
            Rc::as_ptr(&self.0)
        )
    }
}
