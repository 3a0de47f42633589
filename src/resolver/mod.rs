//! Static pass: binds each variable-use site to a lexical scope distance
//! and rejects scoping mistakes that would otherwise only surface at
//! runtime (or not at all).

use std::collections::HashMap;

use crate::ast::{ClassDecl, Expr, ExprKind, FunctionDecl, NodeId, Stmt};
use crate::error::LoxError;
use crate::lexer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopType {
    None,
    While,
}

/// `use-site node id → number of enclosing scopes to skip`.
pub type Depths = HashMap<NodeId, usize>;

pub struct Resolver {
    scopes: Vec<HashMap<String, bool>>,
    depths: Depths,
    current_function: FunctionType,
    current_class: ClassType,
    current_loop: LoopType,
}

type ResolveResult = Result<(), LoxError>;

impl Resolver {
    pub fn new() -> Self {
        Self {
            scopes: Vec::new(),
            depths: Depths::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            current_loop: LoopType::None,
        }
    }

    pub fn resolve(mut self, statements: &[Stmt]) -> Result<Depths, LoxError> {
        self.resolve_stmts(statements)?;
        Ok(self.depths)
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) -> ResolveResult {
        let Some(scope) = self.scopes.last_mut() else {
            return Ok(());
        };
        if scope.contains_key(&name.lexeme) {
            return Err(LoxError::resolution(format!(
                "Variable '{}' already declared in this scope.",
                name.lexeme
            )));
        }
        scope.insert(name.lexeme.clone(), false);
        Ok(())
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn resolve_local(&mut self, id: NodeId, name: &str) {
        for (i, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                self.depths.insert(id, i);
                return;
            }
        }
    }

    fn resolve_stmts(&mut self, statements: &[Stmt]) -> ResolveResult {
        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }
        Ok(())
    }

    fn resolve_function(&mut self, function: &FunctionDecl, kind: FunctionType) -> ResolveResult {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &function.params {
            self.declare(param)?;
            self.define(param);
        }
        self.resolve_stmts(&function.body)?;
        self.end_scope();

        self.current_function = enclosing;
        Ok(())
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) -> ResolveResult {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_stmts(statements)?;
                self.end_scope();
            }
            Stmt::Class(decl) => self.resolve_class(decl)?,
            Stmt::Var { name, initializer } => {
                self.declare(name)?;
                if let Some(init) = initializer {
                    self.resolve_expr(init)?;
                }
                self.define(name);
            }
            Stmt::Function(decl) => {
                self.declare(&decl.name)?;
                self.define(&decl.name);
                self.resolve_function(decl, FunctionType::Function)?;
            }
            Stmt::Expression(expr) => self.resolve_expr(expr)?,
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(branch) = else_branch {
                    self.resolve_stmt(branch)?;
                }
            }
            Stmt::Print { expr } => self.resolve_expr(expr)?,
            Stmt::Throw { value, .. } => self.resolve_expr(value)?,
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    return Err(LoxError::resolution(format!(
                        "Cannot return from top-level code (line {}).",
                        keyword.line
                    )));
                }
                if let Some(value) = value {
                    if self.current_function == FunctionType::Initializer {
                        return Err(LoxError::resolution(
                            "Cannot return a value from an initializer.",
                        ));
                    }
                    self.resolve_expr(value)?;
                }
            }
            Stmt::While { condition, body } => {
                let enclosing = self.current_loop;
                self.current_loop = LoopType::While;
                self.resolve_expr(condition)?;
                self.resolve_stmt(body)?;
                self.current_loop = enclosing;
            }
            Stmt::Try {
                try_block,
                catch_block,
                finally_block,
                ..
            } => {
                self.resolve_stmt(try_block)?;
                if let Some(catch_block) = catch_block {
                    self.resolve_stmt(catch_block)?;
                }
                if let Some(finally_block) = finally_block {
                    self.resolve_stmt(finally_block)?;
                }
            }
            Stmt::Break { keyword } => {
                if self.current_loop == LoopType::None {
                    return Err(LoxError::resolution(format!(
                        "Cannot break outside of a loop (line {}).",
                        keyword.line
                    )));
                }
            }
            Stmt::Continue { keyword } => {
                if self.current_loop == LoopType::None {
                    return Err(LoxError::resolution(format!(
                        "Cannot continue outside of a loop (line {}).",
                        keyword.line
                    )));
                }
            }
        }
        Ok(())
    }

    fn resolve_class(&mut self, decl: &ClassDecl) -> ResolveResult {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(&decl.name)?;
        self.define(&decl.name);

        let has_superclass = decl.superclass.is_some();
        if let Some(superclass) = &decl.superclass {
            self.current_class = ClassType::Subclass;
            if let ExprKind::Variable { name } = &superclass.kind {
                if name.lexeme == decl.name.lexeme {
                    return Err(LoxError::resolution("A class cannot inherit from itself."));
                }
            }
            self.resolve_expr(superclass)?;
            self.begin_scope();
            self.scopes.last_mut().unwrap().insert("super".into(), true);
        }

        self.begin_scope();
        self.scopes.last_mut().unwrap().insert("this".into(), true);

        for method in &decl.methods {
            let kind = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, kind)?;
        }

        self.end_scope();
        if has_superclass {
            self.end_scope();
        }

        self.current_class = enclosing_class;
        Ok(())
    }

    fn resolve_expr(&mut self, expr: &Expr) -> ResolveResult {
        match &expr.kind {
            ExprKind::Variable { name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        return Err(LoxError::resolution(
                            "Cannot read local variable in its own initializer.",
                        ));
                    }
                }
                self.resolve_local(expr.id, &name.lexeme);
            }
            ExprKind::Assign { name, value } => {
                self.resolve_expr(value)?;
                self.resolve_local(expr.id, &name.lexeme);
            }
            ExprKind::Binary { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }
            ExprKind::Call { callee, args, .. } => {
                self.resolve_expr(callee)?;
                for arg in args {
                    self.resolve_expr(arg)?;
                }
            }
            ExprKind::Get { object, .. } => self.resolve_expr(object)?,
            ExprKind::Grouping(inner) => self.resolve_expr(inner)?,
            ExprKind::Literal(_) => {}
            ExprKind::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }
            ExprKind::Set { object, value, .. } => {
                self.resolve_expr(value)?;
                self.resolve_expr(object)?;
            }
            ExprKind::Super { keyword, .. } => {
                if self.current_class == ClassType::None {
                    return Err(LoxError::resolution("Cannot use 'super' outside of a class."));
                }
                if self.current_class != ClassType::Subclass {
                    return Err(LoxError::resolution(
                        "Cannot use 'super' in a class with no superclass.",
                    ));
                }
                self.resolve_local(expr.id, &keyword.lexeme);
            }
            ExprKind::This { keyword } => {
                if self.current_class == ClassType::None {
                    return Err(LoxError::resolution("Cannot use 'this' outside of a class."));
                }
                self.resolve_local(expr.id, &keyword.lexeme);
            }
            ExprKind::Unary { right, .. } => self.resolve_expr(right)?,
            ExprKind::Lambda { params, body } => {
                let enclosing = self.current_function;
                self.current_function = FunctionType::Function;
                self.begin_scope();
                for param in params {
                    self.declare(param)?;
                    self.define(param);
                }
                self.resolve_stmts(body)?;
                self.end_scope();
                self.current_function = enclosing;
            }
        }
        Ok(())
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

pub fn resolve(statements: &[Stmt]) -> Result<Depths, LoxError> {
    Resolver::new().resolve(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::scan;
    use crate::parser::parse;

    fn resolve_source(source: &str) -> Result<Depths, LoxError> {
        let stmts = parse(scan(source).unwrap(), source).unwrap();
        resolve(&stmts)
    }

    #[test]
    fn closure_capture_gets_a_depth() {
        let depths = resolve_source(
            "fun make() { var i = 0; fun inc() { i = i + 1; return i; } return inc; }",
        )
        .unwrap();
        assert!(!depths.is_empty());
    }

    #[test]
    fn return_at_top_level_is_an_error() {
        assert!(resolve_source("return 1;").is_err());
    }

    #[test]
    fn break_outside_loop_is_an_error() {
        assert!(resolve_source("break;").is_err());
    }

    #[test]
    fn this_outside_class_is_an_error() {
        assert!(resolve_source("print this;").is_err());
    }

    #[test]
    fn redeclaring_in_same_scope_is_an_error() {
        assert!(resolve_source("{ var a = 1; var a = 2; }").is_err());
    }

    #[test]
    fn self_inheritance_is_an_error() {
        assert!(resolve_source("class A < A {}").is_err());
    }

    #[test]
    fn resolving_twice_yields_the_same_depths() {
        let source = "fun make(){ var i=0; fun inc(){ i = i+1; return i; } return inc; }";
        let stmts = parse(scan(source).unwrap(), source).unwrap();
        let first = Resolver::new().resolve(&stmts).unwrap();
        let second = Resolver::new().resolve(&stmts).unwrap();
        assert_eq!(first, second);
    }
}
