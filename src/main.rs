use std::fs::File;
use std::io::Write;
use std::ops::Deref;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use treelox as lox;

use lox::ast_printer::AstPrinter;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;
use lox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Emit the token stream as JSON instead of one token per line
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: PathBuf },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },
}

/// Source bytes, memory‑mapped when possible.  Empty files skip the mapping
/// since a zero‑length mmap is rejected on some platforms.
enum SourceBuffer {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for SourceBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            SourceBuffer::Mapped(map) => map,
            SourceBuffer::Owned(buf) => buf,
        }
    }
}

/// Maps `filename` read‑only and validates it is UTF‑8 (the scanner slices
/// lexemes without rechecking).
fn read_source(filename: &PathBuf) -> Result<SourceBuffer> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let len = file
        .metadata()
        .context(format!("Failed to stat file {:?}", filename))?
        .len();

    if len == 0 {
        info!("File {:?} is empty, skipping mmap", filename);

        return Ok(SourceBuffer::Owned(Vec::new()));
    }

    // SAFETY: the mapping is read-only and outlives every borrowed token.
    let map = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    std::str::from_utf8(&map).context(format!("File {:?} is not valid UTF-8", filename))?;

    info!("Mapped {} bytes from {:?}", map.len(), filename);

    Ok(SourceBuffer::Mapped(map))
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Configure env_logger to write to file with module and source line
    Builder::new()
        .format(|buf, record| {
            // Strip 'treelox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("treelox::")
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
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");

    Ok(())
}

/// Drain the scanner, stopping at the first lexical error.  Used by every
/// subcommand that goes on to parse: a broken token stream is not worth
/// parsing, so the run halts here.
fn scan_or_exit(src: &[u8]) -> Vec<Token<'_>> {
    let mut tokens: Vec<Token<'_>> = Vec::new();

    for result in Scanner::new(src) {
        match result {
            Ok(token) => tokens.push(token),

            Err(e) => {
                debug!("Scan failed: {}", e);

                eprintln!("{}", e);
                std::process::exit(65);
            }
        }
    }

    tokens
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => {
            info!("Running Tokenize subcommand");

            let source = read_source(&filename)?;
            let mut tokens: Vec<Token<'_>> = Vec::new();
            let mut tokenized = true;

            // Unlike `run`, keep scanning past errors so the dump shows
            // everything recoverable.
            for result in Scanner::new(&source) {
                match result {
                    Ok(token) => {
                        if json {
                            tokens.push(token);
                        } else {
                            println!("{}", token);
                        }
                    }

                    Err(e) => {
                        tokenized = false;

                        eprintln!("{}", e);
                    }
                }
            }

            if json {
                let dump = serde_json::to_string_pretty(&tokens)
                    .context("Failed to serialise tokens")?;

                println!("{}", dump);
            }

            if !tokenized {
                debug!("Tokenization failed, exiting with code 65");

                std::process::exit(65);
            }

            info!("Tokenization completed successfully");
        }

        Commands::Parse { filename } => {
            info!("Running Parse subcommand");

            let source = read_source(&filename)?;
            let tokens = scan_or_exit(&source);
            let mut parser = Parser::new(&tokens);

            match parser.parse_expression() {
                Ok(expr) => {
                    let ast_str = AstPrinter::print(&expr);

                    debug!("AST: {}", ast_str);
                    println!("{}", ast_str);
                }

                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(65);
                }
            }

            info!("Parse subcommand completed");
        }

        Commands::Evaluate { filename } => {
            info!("Running Evaluate subcommand");

            let source = read_source(&filename)?;
            let tokens = scan_or_exit(&source);
            let mut parser = Parser::new(&tokens);

            let expr = match parser.parse_expression() {
                Ok(expr) => expr,

                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(65);
                }
            };

            // A bare expression has no local scopes, so no resolver pass:
            // every variable reference goes to the globals.
            let mut interpreter = Interpreter::new();

            match interpreter.evaluate(&expr) {
                Ok(value) => {
                    debug!("Evaluated to: {}", value);
                    println!("{}", value);
                }

                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(70);
                }
            }

            info!("Evaluate subcommand completed");
        }

        Commands::Run { filename } => {
            info!("Running Run subcommand");

            let source = read_source(&filename)?;
            let tokens = scan_or_exit(&source);

            let mut parser = Parser::new(&tokens);
            let (statements, parse_errors) = parser.parse();

            if !parse_errors.is_empty() {
                for e in &parse_errors {
                    eprintln!("{}", e);
                }

                std::process::exit(65);
            }

            info!("Parsed {} statements", statements.len());

            let bindings = match Resolver::new().resolve(&statements) {
                Ok(bindings) => bindings,

                Err(errors) => {
                    for e in &errors {
                        eprintln!("{}", e);
                    }

                    std::process::exit(65);
                }
            };

            let mut interpreter = Interpreter::new();
            interpreter.set_bindings(bindings);

            match interpreter.interpret(&statements) {
                Ok(()) => {
                    info!("Program executed successfully");
                }

                Err(e) => {
                    debug!("Runtime debug: {}", e);

                    eprintln!("{}", e);
                    std::process::exit(70);
                }
            }
        }
    }

    Ok(())
}
