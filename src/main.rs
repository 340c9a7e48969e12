use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rlox::ast::{Expr, Stmt};
use rlox::ast_printer::AstPrinter;
use rlox::error::Diagnostics;
use rlox::interpreter::Interpreter;
use rlox::parser::Parser;
use rlox::resolver::Resolver;
use rlox::scanner::{self, Scanner};
use rlox::token::Token;

/// Exit code for lexical, syntax, or resolution errors.
const EXIT_STATIC_ERROR: i32 = 65;

/// Exit code for runtime errors.
const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes a file, printing each token
    Tokenize { filename: PathBuf },

    /// Parses a file as a single expression and prints its AST
    Parse { filename: PathBuf },

    /// Evaluates a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs a file as a Lox program, or starts a REPL if no file is given
    Run { filename: Option<PathBuf> },
}

/// Reads the contents of a file into a byte buffer.
fn read_file(filename: &PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);

    let file: File =
        File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader: BufReader<File> = BufReader::new(file);
    let mut buf: Vec<u8> = Vec::new();

    let bytes: usize = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file: File = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module: &str = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rlox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));

            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to app.log");

    Ok(())
}

/// Scan a whole buffer, exiting with the static-error code if any lexical
/// error was reported. Shared by `parse` and `evaluate`.
fn scan_or_exit(source: &[u8]) -> Vec<Token<'_>> {
    let mut diags: Diagnostics = Diagnostics::new();
    let tokens: Vec<Token<'_>> = scanner::scan(source, &mut diags);

    if diags.had_error() {
        diags.eprint_all();
        std::process::exit(EXIT_STATIC_ERROR);
    }

    tokens
}

fn tokenize(filename: PathBuf) -> Result<()> {
    info!("Running Tokenize subcommand");

    let buf: Vec<u8> = read_file(&filename)?;
    let mut had_error: bool = false;

    for result in Scanner::new(&buf) {
        match result {
            Ok(token) => println!("{}", token),

            Err(e) => {
                had_error = true;
                eprintln!("{}", e);
            }
        }
    }

    if had_error {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC_ERROR);
        std::process::exit(EXIT_STATIC_ERROR);
    }

    Ok(())
}

fn parse(filename: PathBuf) -> Result<()> {
    info!("Running Parse subcommand");

    let buf: Vec<u8> = read_file(&filename)?;
    let tokens: Vec<Token<'_>> = scan_or_exit(&buf);

    match Parser::new(&tokens).parse_expression() {
        Ok(expr) => println!("{}", AstPrinter::print(&expr)),

        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(EXIT_STATIC_ERROR);
        }
    }

    Ok(())
}

fn evaluate(filename: PathBuf) -> Result<()> {
    info!("Running Evaluate subcommand");

    let buf: Vec<u8> = read_file(&filename)?;
    let tokens: Vec<Token<'_>> = scan_or_exit(&buf);

    let expr: Expr<'_> = match Parser::new(&tokens).parse_expression() {
        Ok(expr) => expr,

        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(EXIT_STATIC_ERROR);
        }
    };

    let mut interpreter: Interpreter<'_> = Interpreter::new();

    match interpreter.evaluate(&expr) {
        Ok(value) => println!("{}", value),

        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(EXIT_RUNTIME_ERROR);
        }
    }

    Ok(())
}

fn run_file(filename: PathBuf) -> Result<()> {
    info!("Running Run subcommand on {:?}", filename);

    let buf: Vec<u8> = read_file(&filename)?;

    let mut diags: Diagnostics = Diagnostics::new();
    let tokens: Vec<Token<'_>> = scanner::scan(&buf, &mut diags);
    let statements: Vec<Stmt<'_>> = Parser::new(&tokens).parse(&mut diags);

    Resolver::new().check(&statements, &mut diags);

    // Any accumulated static error suppresses execution of the run.
    if diags.had_error() {
        diags.eprint_all();
        std::process::exit(EXIT_STATIC_ERROR);
    }

    let mut interpreter: Interpreter<'_> = Interpreter::new();

    if let Err(e) = interpreter.interpret(&statements) {
        eprintln!("{}", e);
        std::process::exit(EXIT_RUNTIME_ERROR);
    }

    Ok(())
}

/// Interactive prompt: each line is scanned, parsed, and executed
/// independently against one persistent interpreter, so definitions
/// survive between entries. Errors are printed and the loop continues.
///
/// Line buffers, tokens, and statements are deliberately leaked to get the
/// `'static` lifetime the persistent interpreter needs; REPL input is
/// small and the process owns it for its whole life anyway.
fn repl() -> Result<()> {
    info!("Starting REPL");

    let mut interpreter: Interpreter<'static> = Interpreter::new();
    let stdin: io::Stdin = io::stdin();

    print!("> ");
    io::stdout().flush()?;

    for line in stdin.lock().lines() {
        let line: String = line?;

        if line.trim() == "exit" {
            break;
        }

        if !line.trim().is_empty() {
            let source: &'static [u8] = Box::leak(line.into_bytes().into_boxed_slice());

            let mut diags: Diagnostics = Diagnostics::new();
            let tokens: &'static [Token<'static>] =
                Vec::leak(scanner::scan(source, &mut diags));
            let statements: &'static [Stmt<'static>] =
                Vec::leak(Parser::new(tokens).parse(&mut diags));

            Resolver::new().check(statements, &mut diags);

            if diags.had_error() {
                diags.eprint_all();
            } else if let Err(e) = interpreter.interpret(statements) {
                // Runtime errors do not end the session.
                eprintln!("{}", e);
            }
        }

        print!("> ");
        io::stdout().flush()?;
    }

    info!("REPL session ended");

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.command {
        Commands::Tokenize { filename } => tokenize(filename),
        Commands::Parse { filename } => parse(filename),
        Commands::Evaluate { filename } => evaluate(filename),
        Commands::Run { filename } => match filename {
            Some(filename) => run_file(filename),
            None => repl(),
        },
    }
}
