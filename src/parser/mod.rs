//! Tokens → statement list, by recursive descent.
//!
//! The grammar mirrors the reference parser's recursive-descent shape one
//! rule per method, low-to-high precedence. Two statement forms — lambdas
//! and `try`/`catch`/`finally`/`throw` — exist as live AST variants that the
//! interpreter already knows how to execute but that the reference parser
//! never wires a grammar rule for; this parser adds that wiring (see
//! DESIGN.md).

use crate::ast::{BinaryOp, ClassDecl, Expr, FunctionDecl, LiteralValue, LogicalOp, Stmt, UnaryOp};
use crate::error::{LoxError, Position};
use crate::lexer::{Literal, Token, TokenKind};

const MAX_ARGS: usize = 255;

const SYNC_KEYWORDS: &[TokenKind] = &[
    TokenKind::Class,
    TokenKind::Fun,
    TokenKind::Var,
    TokenKind::For,
    TokenKind::If,
    TokenKind::While,
    TokenKind::Print,
    TokenKind::Return,
];

pub struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    source: &'a str,
    pub had_error: bool,
}

type ParseResult<T> = Result<T, LoxError>;

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, source: &'a str) -> Self {
        Self {
            tokens,
            current: 0,
            source,
            had_error: false,
        }
    }

    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            match self.declaration() {
                Ok(Some(stmt)) => statements.push(stmt),
                Ok(None) => {}
                Err(err) => {
                    log::error!("{err}");
                    self.had_error = true;
                    self.synchronize();
                }
            }
        }
        statements
    }

    // ---- token stream helpers ----

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn matches(&mut self, kinds: &[TokenKind]) -> bool {
        for &kind in kinds {
            if self.check(kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> ParseResult<&Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        Err(self.error_at_current(message))
    }

    fn error_at_current(&self, message: impl Into<String>) -> LoxError {
        self.error_at(self.peek().clone(), message)
    }

    fn error_at(&self, token: Token, message: impl Into<String>) -> LoxError {
        let source_line = self.source.lines().nth(token.line.saturating_sub(1));
        LoxError::syntax(message).at(Position::new(token.line, token.column), source_line)
    }

    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            if SYNC_KEYWORDS.contains(&self.peek().kind) {
                return;
            }
            self.advance();
        }
    }

    // ---- declarations ----

    fn declaration(&mut self) -> ParseResult<Option<Stmt>> {
        if self.matches(&[TokenKind::Var]) {
            return self.var_declaration().map(Some);
        }
        if self.matches(&[TokenKind::Fun]) {
            return self.function_declaration("function").map(|f| Some(Stmt::Function(f)));
        }
        if self.matches(&[TokenKind::Class]) {
            return self.class_declaration().map(Some);
        }
        self.statement().map(Some)
    }

    fn class_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expected class name.")?.clone();

        let superclass = if self.matches(&[TokenKind::Less]) {
            self.consume(TokenKind::Identifier, "Expected superclass name.")?;
            Some(Expr::variable(self.previous().clone()))
        } else {
            None
        };

        self.consume(TokenKind::LeftBrace, "Expected '{' before class body.")?;
        let mut methods = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            methods.push(self.function_declaration("method")?);
        }
        self.consume(TokenKind::RightBrace, "Expected '}' after class body.")?;

        Ok(Stmt::Class(ClassDecl {
            name,
            superclass,
            methods,
        }))
    }

    fn function_declaration(&mut self, kind: &str) -> ParseResult<FunctionDecl> {
        let name = self
            .consume(TokenKind::Identifier, &format!("Expected {kind} name."))?
            .clone();
        let params = self.parameter_list(kind, &name.lexeme)?;
        self.consume(TokenKind::LeftBrace, &format!("Expected '{{' before {kind} body."))?;
        let body = self.block()?;
        Ok(FunctionDecl { name, params, body })
    }

    fn parameter_list(&mut self, kind: &str, name: &str) -> ParseResult<Vec<Token>> {
        self.consume(TokenKind::LeftParen, &format!("Expected '(' after {kind} name."))?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= MAX_ARGS {
                    let err = self
                        .error_at_current(format!("Cannot have more than 255 parameters in {kind} {name}."));
                    log::error!("{err}");
                }
                params.push(
                    self.consume(TokenKind::Identifier, "Expected parameter name.")?
                        .clone(),
                );
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expected ')' after parameters.")?;
        Ok(params)
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expected variable name.")?.clone();
        let initializer = if self.matches(&[TokenKind::Equal]) {
            Some(self.assignment()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expected ';' after variable declaration.")?;
        Ok(Stmt::Var { name, initializer })
    }

    // ---- statements ----

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.matches(&[TokenKind::For]) {
            return self.for_statement();
        }
        if self.matches(&[TokenKind::If]) {
            return self.if_statement();
        }
        if self.matches(&[TokenKind::Print]) {
            return self.print_statement();
        }
        if self.matches(&[TokenKind::Return]) {
            return self.return_statement();
        }
        if self.matches(&[TokenKind::While]) {
            return self.while_statement();
        }
        if self.matches(&[TokenKind::Break]) {
            return self.break_statement();
        }
        if self.matches(&[TokenKind::Continue]) {
            return self.continue_statement();
        }
        if self.matches(&[TokenKind::Try]) {
            return self.try_statement();
        }
        if self.matches(&[TokenKind::Throw]) {
            return self.throw_statement();
        }
        if self.matches(&[TokenKind::LeftBrace]) {
            return Ok(Stmt::Block(self.block()?));
        }
        self.expression_statement()
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration()? {
                statements.push(stmt);
            }
        }
        self.consume(TokenKind::RightBrace, "Expected '}' after block.")?;
        Ok(statements)
    }

    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expected '(' after 'for'.")?;

        let initializer = if self.matches(&[TokenKind::Semicolon]) {
            None
        } else if self.matches(&[TokenKind::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenKind::Semicolon) {
            self.assignment()?
        } else {
            Expr::literal(LiteralValue::Bool(true))
        };
        self.consume(TokenKind::Semicolon, "Expected ';' after loop condition.")?;

        let increment = if !self.check(TokenKind::RightParen) {
            Some(self.assignment()?)
        } else {
            None
        };
        self.consume(TokenKind::RightParen, "Expected ')' after for clauses.")?;

        let mut body = self.statement()?;
        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }
        body = Stmt::While {
            condition,
            body: Box::new(body),
        };
        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }
        Ok(body)
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expected '(' after 'if'.")?;
        let condition = self.assignment()?;
        self.consume(TokenKind::RightParen, "Expected ')' after if condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.matches(&[TokenKind::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn print_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.assignment()?;
        self.consume(TokenKind::Semicolon, "Expected ';' after value.")?;
        Ok(Stmt::Print { expr })
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();
        let value = if !self.check(TokenKind::Semicolon) {
            Some(self.assignment()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expected ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expected '(' after 'while'.")?;
        let condition = self.assignment()?;
        self.consume(TokenKind::RightParen, "Expected ')' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    fn break_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();
        self.consume(TokenKind::Semicolon, "Expected ';' after 'break'.")?;
        Ok(Stmt::Break { keyword })
    }

    fn continue_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();
        self.consume(TokenKind::Semicolon, "Expected ';' after 'continue'.")?;
        Ok(Stmt::Continue { keyword })
    }

    fn throw_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();
        let value = self.assignment()?;
        self.consume(TokenKind::Semicolon, "Expected ';' after thrown value.")?;
        Ok(Stmt::Throw { keyword, value })
    }

    fn try_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftBrace, "Expected '{' after 'try'.")?;
        let try_block = Box::new(Stmt::Block(self.block()?));

        let mut error_name = None;
        let mut catch_block = None;
        if self.matches(&[TokenKind::Catch]) {
            self.consume(TokenKind::LeftParen, "Expected '(' after 'catch'.")?;
            error_name = Some(
                self.consume(TokenKind::Identifier, "Expected error variable name.")?
                    .clone(),
            );
            self.consume(TokenKind::RightParen, "Expected ')' after error variable name.")?;
            self.consume(TokenKind::LeftBrace, "Expected '{' after catch clause.")?;
            catch_block = Some(Box::new(Stmt::Block(self.block()?)));
        }

        let finally_block = if self.matches(&[TokenKind::Finally]) {
            self.consume(TokenKind::LeftBrace, "Expected '{' after 'finally'.")?;
            Some(Box::new(Stmt::Block(self.block()?)))
        } else {
            None
        };

        if catch_block.is_none() && finally_block.is_none() {
            return Err(self.error_at_current("Expected 'catch' or 'finally' after 'try' block."));
        }

        Ok(Stmt::Try {
            error_name,
            try_block,
            catch_block,
            finally_block,
        })
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.assignment()?;
        self.consume(TokenKind::Semicolon, "Expected ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    // ---- expressions, low to high precedence ----

    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.or()?;

        if self.matches(&[TokenKind::Equal]) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            return match expr.kind {
                crate::ast::ExprKind::Variable { name } => Ok(Expr::assign(name, value)),
                crate::ast::ExprKind::Get { object, name } => Ok(Expr::set(*object, name, value)),
                _ => Err(self.error_at(equals, "Invalid assignment target.")),
            };
        }

        Ok(expr)
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;
        while self.matches(&[TokenKind::Or]) {
            let right = self.and()?;
            expr = Expr::logical(expr, LogicalOp::Or, right);
        }
        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        while self.matches(&[TokenKind::And]) {
            let right = self.equality()?;
            expr = Expr::logical(expr, LogicalOp::And, right);
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;
        while self.matches(&[TokenKind::BangEqual, TokenKind::EqualEqual]) {
            let op_token = self.previous().clone();
            let op = if op_token.kind == TokenKind::BangEqual {
                BinaryOp::NotEqual
            } else {
                BinaryOp::Equal
            };
            let right = self.comparison()?;
            expr = Expr::binary(expr, op, op_token, right);
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;
        while self.matches(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let op_token = self.previous().clone();
            let op = match op_token.kind {
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                TokenKind::Less => BinaryOp::Less,
                _ => BinaryOp::LessEqual,
            };
            let right = self.term()?;
            expr = Expr::binary(expr, op, op_token, right);
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;
        while self.matches(&[TokenKind::Minus, TokenKind::Plus, TokenKind::Backslash]) {
            let op_token = self.previous().clone();
            let op = match op_token.kind {
                TokenKind::Minus => BinaryOp::Subtract,
                TokenKind::Plus => BinaryOp::Add,
                _ => BinaryOp::FloorDivide,
            };
            let right = self.factor()?;
            expr = Expr::binary(expr, op, op_token, right);
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;
        while self.matches(&[
            TokenKind::Slash,
            TokenKind::Star,
            TokenKind::Percent,
            TokenKind::Caret,
        ]) {
            let op_token = self.previous().clone();
            let op = match op_token.kind {
                TokenKind::Slash => BinaryOp::Divide,
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Percent => BinaryOp::Modulo,
                _ => BinaryOp::Power,
            };
            let right = self.unary()?;
            expr = Expr::binary(expr, op, op_token, right);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.matches(&[TokenKind::Bang, TokenKind::Minus]) {
            let op_token = self.previous().clone();
            let op = if op_token.kind == TokenKind::Bang {
                UnaryOp::Not
            } else {
                UnaryOp::Negate
            };
            let right = self.unary()?;
            return Ok(Expr::unary(op, op_token, right));
        }
        self.call()
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.matches(&[TokenKind::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.matches(&[TokenKind::Dot]) {
                let name = self
                    .consume(TokenKind::Identifier, "Expected property name after '.'.")?
                    .clone();
                expr = Expr::get(expr, name);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if args.len() >= MAX_ARGS {
                    let err = self.error_at_current("Cannot have more than 255 arguments.");
                    log::error!("{err}");
                }
                args.push(self.assignment()?);
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        let paren = self
            .consume(TokenKind::RightParen, "Expected ')' after arguments.")?
            .clone();
        Ok(Expr::call(callee, paren, args))
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        if self.matches(&[TokenKind::False]) {
            return Ok(Expr::literal(LiteralValue::Bool(false)));
        }
        if self.matches(&[TokenKind::True]) {
            return Ok(Expr::literal(LiteralValue::Bool(true)));
        }
        if self.matches(&[TokenKind::Nil]) {
            return Ok(Expr::literal(LiteralValue::Nil));
        }
        if self.matches(&[TokenKind::Number]) {
            return Ok(Expr::literal(match self.previous().literal.clone() {
                Some(Literal::Integer(n)) => LiteralValue::Integer(n),
                Some(Literal::Number(n)) => LiteralValue::Number(n),
                _ => unreachable!("NUMBER token without a numeric literal"),
            }));
        }
        if self.matches(&[TokenKind::String]) {
            return Ok(Expr::literal(match self.previous().literal.clone() {
                Some(Literal::Str(s)) => LiteralValue::Str(s),
                _ => unreachable!("STRING token without a string literal"),
            }));
        }
        if self.matches(&[TokenKind::Fun]) {
            return self.lambda();
        }
        if self.matches(&[TokenKind::Super]) {
            let keyword = self.previous().clone();
            self.consume(TokenKind::Dot, "Expected '.' after 'super'.")?;
            let method = self
                .consume(TokenKind::Identifier, "Expected superclass method name.")?
                .clone();
            return Ok(Expr::super_(keyword, method));
        }
        if self.matches(&[TokenKind::This]) {
            return Ok(Expr::this(self.previous().clone()));
        }
        if self.matches(&[TokenKind::Identifier]) {
            return Ok(Expr::variable(self.previous().clone()));
        }
        if self.matches(&[TokenKind::LeftParen]) {
            let expr = self.assignment()?;
            self.consume(TokenKind::RightParen, "Expected ')' after expression.")?;
            return Ok(Expr::grouping(expr));
        }

        Err(self.error_at_current(format!("Expected expression. Got '{}'.", self.peek().lexeme)))
    }

    fn lambda(&mut self) -> ParseResult<Expr> {
        let params = self.parameter_list("lambda", "<anonymous>")?;
        self.consume(TokenKind::LeftBrace, "Expected '{' before lambda body.")?;
        let body = self.block()?;
        Ok(Expr::lambda(params, body))
    }
}

pub fn parse(tokens: Vec<Token>, source: &str) -> Result<Vec<Stmt>, LoxError> {
    let mut parser = Parser::new(tokens, source);
    let statements = parser.parse();
    if parser.had_error {
        return Err(LoxError::syntax("One or more errors occurred while parsing."));
    }
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::scan;

    fn parse_source(source: &str) -> Vec<Stmt> {
        parse(scan(source).unwrap(), source).unwrap()
    }

    #[test]
    fn parses_precedence() {
        let stmts = parse_source("print 1 + 2 * 3;");
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn desugars_for_into_while() {
        let stmts = parse_source("for (var i = 0; i < 3; i = i + 1) print i;");
        assert!(matches!(stmts[0], Stmt::Block(_)));
    }

    #[test]
    fn rejects_invalid_assignment_target() {
        assert!(parse(scan("1 = 2;").unwrap(), "1 = 2;").is_err());
    }

    #[test]
    fn parses_class_with_superclass() {
        let stmts = parse_source("class A {} class B < A { greet() { print 1; } }");
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn parses_try_catch_finally() {
        let stmts = parse_source("try { throw \"boom\"; } catch (e) { print e; } finally { print \"done\"; }");
        assert!(matches!(stmts[0], Stmt::Try { .. }));
    }

    #[test]
    fn parses_lambda() {
        let stmts = parse_source("var f = fun (x) { return x; };");
        assert!(matches!(stmts[0], Stmt::Var { .. }));
    }
}
