pub mod ast;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod preprocessor;
pub mod resolver;
pub mod runtime;

use error::LoxError;
use interpreter::Interpreter;

/// Runs one unit of source text (a whole file, or one REPL line) against an
/// existing interpreter: preprocess, lex, parse, resolve, interpret. The
/// interpreter's environment chain is reused across calls so a REPL session
/// can build up state line by line.
pub fn run(source: &str, interpreter: &mut Interpreter) -> Result<(), LoxError> {
    let expanded = preprocessor::expand(source);
    let tokens = lexer::scan(&expanded)?;
    let statements = parser::parse(tokens, &expanded)?;
    let depths = resolver::resolve(&statements)?;
    interpreter.use_depths(depths, expanded);
    interpreter.interpret(&statements)
}
