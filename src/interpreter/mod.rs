//! AST walker: turns a resolved statement list into side effects.
//!
//! Follows the same chained-environment shape `runtime::environment` already
//! provides; this module is the piece that actually threads an
//! `Environment` through block, function, and class execution and evaluates
//! every expression form the parser produces.

mod builtins;
mod operators;

use std::rc::Rc;

use crate::ast::{ClassDecl, Expr, ExprKind, FunctionDecl, LiteralValue, LogicalOp, Stmt};
use crate::error::{LoxError, Position};
use crate::lexer::Token;
use crate::resolver::Depths;
use crate::runtime::class::{LoxClass, LoxFunction, LoxInstance};
use crate::runtime::{container, Environment, Value};

/// The result of executing a statement or evaluating an expression inside
/// the interpreter: either a plain `LoxError`, or one of the non-local
/// control-flow signals `return`/`break`/`continue` raise. Modeling these as
/// a discriminated outcome (rather than catching them as errors the way the
/// reference implementation's exception hierarchy does) keeps `try`/`catch`
/// from accidentally swallowing a `return` that passes through it.
pub enum Unwind {
    Error(LoxError),
    Return(Value),
    Break,
    Continue,
}

impl From<LoxError> for Unwind {
    fn from(err: LoxError) -> Self {
        Unwind::Error(err)
    }
}

pub type ExecResult<T> = Result<T, Unwind>;

pub struct Interpreter {
    pub globals: Environment,
    environment: Environment,
    depths: Depths,
    source: String,
}

impl Interpreter {
    pub fn new(depths: Depths, source: impl Into<String>) -> Self {
        let globals = Environment::new();
        builtins::register(&globals);
        Self {
            environment: globals.clone(),
            globals,
            depths,
            source: source.into(),
        }
    }

    /// Rebinds the resolver output and source text this interpreter
    /// consults, keeping `globals`/`environment` across calls. The REPL
    /// resolves each line independently but wants variables declared on one
    /// line visible on the next, so the environment chain has to survive
    /// while the depth map gets replaced.
    pub fn use_depths(&mut self, depths: Depths, source: impl Into<String>) {
        self.depths = depths;
        self.source = source.into();
    }

    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), LoxError> {
        for stmt in statements {
            match self.exec_stmt(stmt) {
                Ok(()) => {}
                Err(Unwind::Error(err)) => return Err(err),
                Err(Unwind::Return(_)) => {
                    return Err(LoxError::resolution("Cannot return from top-level code."));
                }
                Err(Unwind::Break) | Err(Unwind::Continue) => {
                    return Err(LoxError::resolution("Cannot break/continue outside of a loop."));
                }
            }
        }
        Ok(())
    }

    // ---- statements ----

    fn exec_stmts(&mut self, statements: &[Stmt]) -> ExecResult<()> {
        for stmt in statements {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    fn exec_block(&mut self, statements: &[Stmt], env: Environment) -> ExecResult<()> {
        let previous = std::mem::replace(&mut self.environment, env);
        let result = self.exec_stmts(statements);
        self.environment = previous;
        result
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> ExecResult<()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.eval(expr)?;
                Ok(())
            }
            Stmt::Print { expr } => {
                let value = self.eval(expr)?;
                println!("{value}");
                Ok(())
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Nil,
                };
                self.environment.define(name.lexeme.clone(), value);
                Ok(())
            }
            Stmt::Block(statements) => {
                let env = Environment::with_enclosing(self.environment.clone());
                self.exec_block(statements, env)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.exec_stmt(then_branch)
                } else if let Some(branch) = else_branch {
                    self.exec_stmt(branch)
                } else {
                    Ok(())
                }
            }
            Stmt::While { condition, body } => self.exec_while(condition, body),
            Stmt::Break { .. } => Err(Unwind::Break),
            Stmt::Continue { .. } => Err(Unwind::Continue),
            Stmt::Function(decl) => {
                let function = self.make_function(decl, false);
                self.environment.define(decl.name.lexeme.clone(), function);
                Ok(())
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Nil,
                };
                Err(Unwind::Return(value))
            }
            Stmt::Throw { value, .. } => {
                let value = self.eval(value)?;
                Err(LoxError::runtime(value.to_string()).into())
            }
            Stmt::Class(decl) => self.exec_class(decl),
            Stmt::Try {
                error_name,
                try_block,
                catch_block,
                finally_block,
            } => self.exec_try(error_name.as_ref(), try_block, catch_block.as_deref(), finally_block.as_deref()),
        }
    }

    /// `continue` inside a block-bodied loop re-runs the block's last
    /// statement (the desugared `for`-loop increment) before the condition
    /// is re-tested, matching the documented contract. A `continue` whose
    /// loop body isn't a block has nothing to re-run and is an error.
    fn exec_while(&mut self, condition: &Expr, body: &Stmt) -> ExecResult<()> {
        while self.eval(condition)?.is_truthy() {
            match self.exec_stmt(body) {
                Ok(()) => {}
                Err(Unwind::Break) => break,
                Err(Unwind::Continue) => {
                    let Stmt::Block(statements) = body else {
                        return Err(LoxError::runtime(
                            "'continue' requires a block-bodied loop.",
                        )
                        .into());
                    };
                    if let Some(last) = statements.last() {
                        let env = Environment::with_enclosing(self.environment.clone());
                        self.exec_block(std::slice::from_ref(last), env)?;
                    }
                }
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    fn exec_try(
        &mut self,
        error_name: Option<&Token>,
        try_block: &Stmt,
        catch_block: Option<&Stmt>,
        finally_block: Option<&Stmt>,
    ) -> ExecResult<()> {
        let result = match self.exec_stmt(try_block) {
            Err(Unwind::Error(err)) => {
                if let Some(catch_block) = catch_block {
                    if let Some(name) = error_name {
                        self.environment.define(name.lexeme.clone(), Value::string(err.message.clone()));
                    }
                    self.exec_stmt(catch_block)
                } else {
                    Err(Unwind::Error(err))
                }
            }
            other => other,
        };

        if let Some(finally_block) = finally_block {
            self.exec_stmt(finally_block)?;
        }
        result
    }

    fn exec_class(&mut self, decl: &ClassDecl) -> ExecResult<()> {
        let superclass = match &decl.superclass {
            Some(expr) => match self.eval(expr)? {
                Value::Class(class) => Some(class),
                other => {
                    return Err(LoxError::runtime(format!(
                        "Superclass must be a class, got '{}'.",
                        other.type_name()
                    ))
                    .into());
                }
            },
            None => None,
        };

        self.environment.define(decl.name.lexeme.clone(), Value::Nil);

        let method_env = if let Some(superclass) = &superclass {
            let env = Environment::with_enclosing(self.environment.clone());
            env.define("super", Value::Class(superclass.clone()));
            env
        } else {
            self.environment.clone()
        };

        let previous = std::mem::replace(&mut self.environment, method_env);
        let mut methods = std::collections::HashMap::new();
        for method in &decl.methods {
            let is_initializer = method.name.lexeme == "init";
            methods.insert(
                method.name.lexeme.clone(),
                Rc::new(LoxFunction::new(method, self.environment.clone(), is_initializer)),
            );
        }
        self.environment = previous;

        let class = Rc::new(LoxClass::new(decl.name.lexeme.clone(), superclass, methods));
        self.environment
            .assign(&decl.name, Value::Class(class))
            .map_err(Unwind::Error)
    }

    fn make_function(&self, decl: &FunctionDecl, is_initializer: bool) -> Value {
        Value::Function(Rc::new(LoxFunction::new(decl, self.environment.clone(), is_initializer)))
    }

    // ---- expressions ----

    fn eval(&mut self, expr: &Expr) -> ExecResult<Value> {
        match &expr.kind {
            ExprKind::Literal(value) => Ok(literal_value(value)),
            ExprKind::Grouping(inner) => self.eval(inner),
            ExprKind::Variable { name } => self.lookup_variable(expr.id, name),
            ExprKind::Assign { name, value } => {
                let value = self.eval(value)?;
                match self.depths.get(&expr.id) {
                    Some(&distance) => self.environment.assign_at(distance, name, value.clone()),
                    None => self.environment.assign(name, value.clone()).map_err(Unwind::Error)?,
                }
                Ok(value)
            }
            ExprKind::Logical { left, op, right } => {
                let left = self.eval(left)?;
                match op {
                    LogicalOp::Or if left.is_truthy() => Ok(left),
                    LogicalOp::And if !left.is_truthy() => Ok(left),
                    _ => self.eval(right),
                }
            }
            ExprKind::Unary { op, op_token, right } => {
                let right = self.eval(right)?;
                operators::unary(*op, op_token, right).map_err(Into::into)
            }
            ExprKind::Binary { left, op, op_token, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                operators::binary(*op, op_token, left, right).map_err(Into::into)
            }
            ExprKind::Call { callee, paren, args } => self.eval_call(callee, paren, args),
            ExprKind::Get { object, name } => {
                let object = self.eval(object)?;
                self.get_property(object, name).map_err(Into::into)
            }
            ExprKind::Set { object, name, value } => {
                let object = self.eval(object)?;
                let Value::Instance(instance) = object else {
                    return Err(LoxError::runtime("Only instances have fields.").into());
                };
                let value = self.eval(value)?;
                instance.set_field(name.lexeme.clone(), value.clone());
                Ok(value)
            }
            ExprKind::This { keyword } => self.lookup_variable(expr.id, keyword),
            ExprKind::Super { keyword, method } => self.eval_super(expr.id, keyword, method),
            ExprKind::Lambda { params, body } => Ok(Value::Function(Rc::new(LoxFunction::from_lambda(
                params.clone(),
                body.clone(),
                self.environment.clone(),
            )))),
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> ExecResult<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    /// `Call{Get{object, name}, args}` is special-cased so container methods
    /// (string/array/hash/HTTP client) can be dispatched without first
    /// turning them into a first-class bound-method `Value` — there's no
    /// heap value to bind such a method to, it's a dispatch on a fixed table
    /// keyed by the container's runtime type.
    fn eval_call(&mut self, callee: &Expr, paren: &Token, args: &[Expr]) -> ExecResult<Value> {
        if let ExprKind::Get { object, name } = &callee.kind {
            let receiver = self.eval(object)?;
            if let Some(result) = self.try_container_method(&receiver, name, args)? {
                return Ok(result);
            }
            let callee_value = self.get_property(receiver, name)?;
            return self.call_value(callee_value, paren, args);
        }
        let callee_value = self.eval(callee)?;
        self.call_value(callee_value, paren, args)
    }

    fn try_container_method(
        &mut self,
        receiver: &Value,
        name: &Token,
        arg_exprs: &[Expr],
    ) -> ExecResult<Option<Value>> {
        let dispatched = match receiver {
            Value::Array(items) => {
                let args = self.eval_args(arg_exprs)?;
                container::call_array(items, &name.lexeme, &args)
            }
            Value::Hash(entries) => {
                let args = self.eval_args(arg_exprs)?;
                container::call_hash(entries, &name.lexeme, &args)
            }
            Value::Str(s) => {
                let args = self.eval_args(arg_exprs)?;
                container::call_string(s, &name.lexeme, &args)
            }
            Value::HttpClient(client) if name.lexeme == "get" => {
                let args = self.eval_args(arg_exprs)?;
                let [Value::Str(url)] = args.as_slice() else {
                    return Err(LoxError::runtime("'get' expects a single string url.").into());
                };
                Some(client.get(url))
            }
            _ => return Ok(None),
        };
        match dispatched {
            Some(Ok(value)) => Ok(Some(value)),
            Some(Err(err)) => Err(err.into()),
            None => Ok(None),
        }
    }

    fn call_value(&mut self, callee: Value, paren: &Token, arg_exprs: &[Expr]) -> ExecResult<Value> {
        let args = self.eval_args(arg_exprs)?;
        match callee {
            Value::Function(function) => {
                self.check_arity(paren, function.arity(), args.len())?;
                self.call_function(&function, args)
            }
            Value::Class(class) => {
                self.check_arity(paren, class.arity(), args.len())?;
                let instance = LoxInstance::new(class.clone());
                if let Some(initializer) = class.find_method("init") {
                    self.call_function(&initializer.bind(instance.clone()), args)?;
                }
                Ok(Value::Instance(instance))
            }
            Value::Builtin(builtin) => {
                self.check_arity(paren, builtin.arity, args.len())?;
                (builtin.func)(self, &args).map_err(Into::into)
            }
            other => Err(self
                .runtime_error_at(paren, format!("Can only call functions and classes, got '{}'.", other.type_name()))
                .into()),
        }
    }

    fn check_arity(&self, paren: &Token, expected: usize, got: usize) -> ExecResult<()> {
        if expected != got {
            return Err(self
                .runtime_error_at(paren, format!("Expected {expected} argument(s) but got {got}."))
                .into());
        }
        Ok(())
    }

    fn call_function(&mut self, function: &LoxFunction, args: Vec<Value>) -> ExecResult<Value> {
        let call_env = Environment::with_enclosing(function.closure.clone());
        for (param, arg) in function.params.iter().zip(args) {
            call_env.define(param.lexeme.clone(), arg);
        }
        let previous = std::mem::replace(&mut self.environment, call_env);
        let result = self.exec_stmts(&function.body);
        self.environment = previous;

        if function.is_initializer {
            let this = function.closure.get_at(0, "this");
            return match result {
                Err(Unwind::Error(err)) => Err(Unwind::Error(err)),
                _ => Ok(this),
            };
        }
        match result {
            Ok(()) => Ok(Value::Nil),
            Err(Unwind::Return(value)) => Ok(value),
            Err(other) => Err(other),
        }
    }

    fn get_property(&mut self, object: Value, name: &Token) -> Result<Value, LoxError> {
        match object {
            Value::Instance(instance) => instance
                .get(&name.lexeme)
                .ok_or_else(|| LoxError::attribute(format!("Undefined property '{}'.", name.lexeme))),
            Value::Array(_) | Value::Hash(_) | Value::Str(_) | Value::HttpClient(_) => Err(LoxError::runtime(
                "Container methods must be called directly, e.g. 'x.append(1)'.",
            )),
            other => Err(LoxError::attribute(format!(
                "'{}' has no property '{}'.",
                other.type_name(),
                name.lexeme
            ))),
        }
    }

    fn lookup_variable(&self, id: crate::ast::NodeId, name: &Token) -> ExecResult<Value> {
        match self.depths.get(&id) {
            Some(&distance) => Ok(self.environment.get_at(distance, &name.lexeme)),
            None => self.environment.get(name).map_err(Into::into),
        }
    }

    fn eval_super(&mut self, id: crate::ast::NodeId, keyword: &Token, method: &Token) -> ExecResult<Value> {
        let distance = *self
            .depths
            .get(&id)
            .expect("resolver always records a depth for 'super'");
        let Value::Class(superclass) = self.environment.get_at(distance, &keyword.lexeme) else {
            unreachable!("resolver guarantees 'super' is bound to a class");
        };
        let Value::Instance(instance) = self.environment.get_at(distance - 1, "this") else {
            unreachable!("resolver guarantees 'this' is bound one scope inside 'super'");
        };
        superclass
            .find_method(&method.lexeme)
            .map(|m| Value::Function(Rc::new(m.bind(instance))))
            .ok_or_else(|| LoxError::attribute(format!("Undefined property '{}'.", method.lexeme)).into())
    }

    fn runtime_error_at(&self, token: &Token, message: impl Into<String>) -> LoxError {
        let source_line = self.source.lines().nth(token.line.saturating_sub(1));
        LoxError::runtime(message).at(Position::new(token.line, token.column), source_line)
    }
}

fn literal_value(value: &LiteralValue) -> Value {
    match value {
        LiteralValue::Nil => Value::Nil,
        LiteralValue::Bool(b) => Value::Bool(*b),
        LiteralValue::Integer(n) => Value::Integer(*n),
        LiteralValue::Number(n) => Value::Float(*n),
        LiteralValue::Str(s) => Value::string(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::scan;
    use crate::parser::parse;
    use crate::resolver::resolve;

    fn run(source: &str) -> Result<(), LoxError> {
        let tokens = scan(source).unwrap();
        let statements = parse(tokens, source).unwrap();
        let depths = resolve(&statements)?;
        Interpreter::new(depths, source).interpret(&statements)
    }

    #[test]
    fn arithmetic_and_print() {
        assert!(run("print 1 + 2 * 3;").is_ok());
    }

    #[test]
    fn closures_capture_their_defining_environment() {
        assert!(run(
            "fun make() { var i = 0; fun inc() { i = i + 1; return i; } return inc; }
             var counter = make();
             if (counter() != 1) { throw \"broken\"; }
             if (counter() != 2) { throw \"broken\"; }"
        )
        .is_ok());
    }

    #[test]
    fn classes_support_inheritance_and_super() {
        assert!(run(
            "class Animal { speak() { return \"...\"; } }
             class Dog < Animal { speak() { return super.speak() + \"woof\"; } }
             var d = Dog();
             if (d.speak() != \"...woof\") { throw \"broken\"; }"
        )
        .is_ok());
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        assert!(run("print 1 / 0;").is_err());
    }

    #[test]
    fn break_exits_the_loop() {
        assert!(run("var i = 0; while (true) { i = i + 1; if (i == 3) break; } if (i != 3) { throw \"broken\"; }").is_ok());
    }

    #[test]
    fn continue_reruns_the_for_increment() {
        assert!(run(
            "var sum = 0;
             for (var i = 0; i < 5; i = i + 1) {
                 if (i == 2) continue;
                 sum = sum + i;
             }
             if (sum != 8) { throw \"broken\"; }"
        )
        .is_ok());
    }

    #[test]
    fn try_catch_binds_the_error_message() {
        assert!(run(
            "var caught = nil;
             try { throw \"boom\"; } catch (e) { caught = e; }
             if (caught != \"boom\") { throw \"broken\"; }"
        )
        .is_ok());
    }

    #[test]
    fn array_index_get_and_set_roundtrip() {
        assert!(run(
            "var xs = array(); xs.append(1); xs.append(2);
             xs.set(0, 9);
             if (xs.get(0) != 9) { throw \"broken\"; }"
        )
        .is_ok());
    }

    #[test]
    fn calling_a_non_callable_is_a_runtime_error() {
        assert!(run("var x = 1; x();").is_err());
    }

    #[test]
    fn wrong_arity_is_a_runtime_error() {
        assert!(run("fun f(a, b) { return a; } f(1);").is_err());
    }
}
