use std::{
    cell::RefCell,
    io::{Read, Write},
    rc::Rc,
};

use annoy::interpreter::{ExecutionError, ExecutionErrorKind, Interpreter};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Execute a source file, feeding it stdin as its input bytes
    Run(RunArgs),
    /// Parse a source file and print its instruction tree
    Ast(AstArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    file: String,
}

#[derive(Debug, Args)]
struct AstArgs {
    file: String,
}

fn main() {
    let args = Cli::parse();

    let code = match &args.command {
        Command::Run(args) => run_command(args),
        Command::Ast(args) => ast_command(args),
    };

    std::process::exit(code);
}

fn run_command(args: &RunArgs) -> i32 {
    let source = match std::fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("annoy: could not read {}: {}", args.file, e);
            return 1;
        }
    };

    let mut input = Vec::new();
    if let Err(e) = std::io::stdin().read_to_end(&mut input) {
        eprintln!("annoy: could not read input: {}", e);
        return 1;
    }

    let output: Rc<RefCell<dyn Write>> = Rc::new(RefCell::new(std::io::stdout()));
    match interpret(&source, input, output) {
        Ok(()) => 0,
        Err(e) => {
            // Partial output is already flushed; the diagnostic goes to
            // stderr so the two streams never mix.
            eprintln!("{e}");
            e.exit_code()
        }
    }
}

fn ast_command(args: &AstArgs) -> i32 {
    let source = match std::fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("annoy: could not read {}: {}", args.file, e);
            return 1;
        }
    };

    let program = annoy::tokenizer::tokens(&source)
        .map_err(InterpretError::from)
        .and_then(|tokens| annoy::parser::program(&tokens).map_err(InterpretError::from));

    match program {
        Ok(program) => {
            print!("{program}");
            0
        }
        Err(e) => {
            eprintln!("{e}");
            e.exit_code()
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum InterpretError {
    #[error(transparent)]
    Tokenize(#[from] annoy::tokenizer::TokenizeError),
    #[error(transparent)]
    Parse(#[from] annoy::parser::ParseErrors),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl InterpretError {
    fn exit_code(&self) -> i32 {
        match self {
            InterpretError::Tokenize(_) | InterpretError::Parse(_) => 2,
            InterpretError::Execution(ExecutionError::Halted { kind, .. }) => match kind {
                ExecutionErrorKind::DisplayOfDismay { .. } => 3,
                ExecutionErrorKind::InputExhausted => 4,
                ExecutionErrorKind::Io(_) => 1,
            },
        }
    }
}

fn interpret(
    source: &str,
    input: Vec<u8>,
    output: Rc<RefCell<dyn Write>>,
) -> Result<(), InterpretError> {
    let tokens = annoy::tokenizer::tokens(source)?;
    let program = annoy::parser::program(&tokens)?;
    let mut interpreter = Interpreter::new(input, output);
    interpreter.interpret(&program)?;
    Ok(())
}
