//! The `lox` binary: runs a script file, or starts a REPL when none is
//! given.

mod cli;

use std::io::Write as _;

use cli::Cli;
use lox::error::ExitCode;
use lox::interpreter::Interpreter;
use lox::resolver::Depths;

fn main() {
    let args = Cli::init();
    simple_logger::init_with_level((&args.verbosity).into()).expect("logger already initialized");

    let exit_code = match &args.file {
        Some(path) => run_file(path),
        None => run_repl(),
    };

    std::process::exit(exit_code.code());
}

fn run_file(path: &std::path::Path) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            log::error!("cannot read '{}': {err}", path.display());
            return ExitCode::NoInput;
        }
    };

    let mut interpreter = Interpreter::new(Depths::new(), "");
    match lox::run(&source, &mut interpreter) {
        Ok(()) => ExitCode::Ok,
        Err(err) => {
            log::error!("{err}");
            err.exit_code()
        }
    }
}

fn run_repl() -> ExitCode {
    let mut interpreter = Interpreter::new(Depths::new(), "");
    let stdin = std::io::stdin();

    loop {
        print!("> ");
        if std::io::stdout().flush().is_err() {
            return ExitCode::IoErr;
        }

        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => return ExitCode::Ok,
            Ok(_) => {}
            Err(err) => {
                log::error!("failed to read input: {err}");
                return ExitCode::IoErr;
            }
        }

        if line.trim().is_empty() {
            continue;
        }

        if let Err(err) = lox::run(&line, &mut interpreter) {
            log::error!("{err}");
        }
    }
}
