//! Character stream → token stream.
//!
//! Follows the same cursor-over-`Peekable<Chars>` shape the rest of this
//! project's hand-written scanners use, rather than a grammar-driven parser
//! generator: a single forward pass with one character of lookahead.

mod token;

pub use token::*;

use crate::error::{LoxError, Position};

pub type LexResult<T> = Result<T, LoxError>;

#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    chars: Vec<char>,
    start: usize,
    current: usize,
    line: usize,
    column: usize,
    start_column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
            start_column: 1,
        }
    }

    pub fn scan_tokens(mut self) -> LexResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            self.start = self.current;
            self.start_column = self.column;

            match self.scan_token()? {
                Some(token) => tokens.push(token),
                None => continue,
            }

            if self.is_at_end() {
                break;
            }
        }

        tokens.push(Token::new(TokenKind::Eof, "", None, self.line, self.column));
        Ok(tokens)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn advance(&mut self) -> char {
        let c = self.chars[self.current];
        self.current += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.current).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.current + 1).copied()
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() != Some(expected) {
            return false;
        }
        self.advance();
        true
    }

    fn lexeme(&self) -> String {
        self.chars[self.start..self.current].iter().collect()
    }

    fn error_here(&self, message: impl Into<String>) -> LoxError {
        let source_line = self.source.lines().nth(self.line - 1);
        LoxError::syntax(message).at(Position::new(self.line, self.start_column), source_line)
    }

    fn make(&self, kind: TokenKind) -> Option<Token> {
        Some(Token::new(
            kind,
            self.lexeme(),
            None,
            self.line,
            self.start_column,
        ))
    }

    fn scan_token(&mut self) -> LexResult<Option<Token>> {
        let c = self.advance();

        Ok(match c {
            '(' => self.make(TokenKind::LeftParen),
            ')' => self.make(TokenKind::RightParen),
            '{' => self.make(TokenKind::LeftBrace),
            '}' => self.make(TokenKind::RightBrace),
            ',' => self.make(TokenKind::Comma),
            '.' => self.make(TokenKind::Dot),
            '-' => self.make(TokenKind::Minus),
            '+' => self.make(TokenKind::Plus),
            ';' => self.make(TokenKind::Semicolon),
            '*' => self.make(TokenKind::Star),
            '%' => self.make(TokenKind::Percent),
            '^' => self.make(TokenKind::Caret),
            '\\' => self.make(TokenKind::Backslash),
            '!' => {
                let kind = if self.matches('=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.make(kind)
            }
            '=' => {
                let kind = if self.matches('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.make(kind)
            }
            '<' => {
                let kind = if self.matches('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                self.make(kind)
            }
            '>' => {
                let kind = if self.matches('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.make(kind)
            }
            '/' => {
                if self.matches('/') {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                    None
                } else if self.matches('*') {
                    self.scan_block_comment()?;
                    None
                } else {
                    self.make(TokenKind::Slash)
                }
            }
            ' ' | '\t' | '\r' | '\n' => None,
            '"' | '\'' => return self.scan_string(c).map(Some),
            c if c.is_ascii_digit() => return self.scan_number().map(Some),
            c if c.is_alphabetic() || c == '_' => self.scan_identifier(),
            other => {
                return Err(self.error_here(format!("Unexpected character '{other}'.")));
            }
        })
    }

    fn scan_block_comment(&mut self) -> LexResult<()> {
        loop {
            if self.is_at_end() {
                return Err(self.error_here("Unterminated block comment."));
            }
            if self.peek() == Some('*') && self.peek_next() == Some('/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }
    }

    fn scan_string(&mut self, quote: char) -> LexResult<Token> {
        let mut value = String::new();
        while self.peek().is_some_and(|c| c != quote) {
            value.push(self.advance());
        }

        if self.is_at_end() {
            return Err(self.error_here("Unterminated string."));
        }

        self.advance(); // closing quote

        Ok(Token::new(
            TokenKind::String,
            self.lexeme(),
            Some(Literal::Str(value)),
            self.line,
            self.start_column,
        ))
    }

    fn scan_number(&mut self) -> LexResult<Token> {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if self.peek().is_some_and(|c| c.is_alphabetic() || c == '_') {
            return Err(self.error_here("Invalid number literal."));
        }

        let lexeme = self.lexeme();
        let literal = if is_float {
            Literal::Number(lexeme.parse().expect("lexer produced an invalid float"))
        } else {
            Literal::Integer(lexeme.parse().expect("lexer produced an invalid integer"))
        };

        Ok(Token::new(
            TokenKind::Number,
            lexeme,
            Some(literal),
            self.line,
            self.start_column,
        ))
    }

    fn scan_identifier(&mut self) -> Option<Token> {
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.advance();
        }

        let lexeme = self.lexeme();
        let kind = TokenKind::keyword(&lexeme).unwrap_or(TokenKind::Identifier);
        self.make(kind)
    }
}

pub fn scan(source: &str) -> LexResult<Vec<Token>> {
    Lexer::new(source).scan_tokens()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        scan(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_punctuation_and_operators() {
        assert_eq!(
            kinds("!= = == <= >= ^ \\"),
            vec![
                TokenKind::BangEqual,
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::Caret,
                TokenKind::Backslash,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn scans_keywords_vs_identifiers() {
        assert_eq!(
            kinds("var foo = nil;"),
            vec![
                TokenKind::Var,
                TokenKind::Identifier,
                TokenKind::Equal,
                TokenKind::Nil,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn scans_numbers() {
        let tokens = scan("1 2.5").unwrap();
        assert_eq!(tokens[0].literal, Some(Literal::Integer(1)));
        assert_eq!(tokens[1].literal, Some(Literal::Number(2.5)));
    }

    #[test]
    fn scans_strings_with_either_quote() {
        let tokens = scan("\"a\" 'b'").unwrap();
        assert_eq!(tokens[0].literal, Some(Literal::Str("a".into())));
        assert_eq!(tokens[1].literal, Some(Literal::Str("b".into())));
    }

    #[test]
    fn skips_comments() {
        assert_eq!(
            kinds("// hi\n/* block */ nil"),
            vec![TokenKind::Nil, TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(scan("\"unterminated").is_err());
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        assert!(scan("/* unterminated").is_err());
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = scan("var\nfoo").unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[1].column, 1);
    }
}
