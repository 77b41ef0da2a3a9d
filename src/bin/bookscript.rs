//! CLI wrapper for the bookscript engine.
//!
//! Usage:
//!   bookscript <file>                    # Run a script (or an encoded .bsc file)
//!   bookscript -e "code"                 # Evaluate code
//!   bookscript --dis <file>              # Print the disassembled bytecode
//!   bookscript --tokens <file>           # Print the parse tree
//!   bookscript --compile <file> <out>    # Write encoded bytecode
//!   bookscript                           # Start REPL (interactive mode)
//!
//! `--config <path>` may precede any of these to load limits and schemas.

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process;
use std::rc::Rc;

use chrono::NaiveDate;
use indexmap::IndexMap;

use bookscript::parser::parse_to_token_tree;
use bookscript::runner::ds::error::HostError;
use bookscript::runner::ds::operations::type_conversion::to_repr;
use bookscript::runner::ds::scope::Scope;
use bookscript::runner::ds::value::Value;
use bookscript::runner::plugin::types::{FieldKind, FieldSpec, HostData, UiCallbacks};
use bookscript::runner::plugin::{EngineConfig, HostEnvironment};
use bookscript::runner::vm::{compile, decode, encode, ByteCode, Runtime};

/// `ui` backed by the terminal.
struct TerminalUi;

impl TerminalUi {
    fn prompt(&self, label: &str) -> Result<String, HostError> {
        print!("{}: ", label);
        io::stdout()
            .flush()
            .map_err(|e| HostError::Other(e.to_string()))?;
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| HostError::Other(e.to_string()))?;
        Ok(line.trim().to_string())
    }
}

impl UiCallbacks for TerminalUi {
    fn display(&self, message: &str) -> Result<(), HostError> {
        println!("{}", message);
        Ok(())
    }

    fn get_data(&self, fields: &[FieldSpec]) -> Result<IndexMap<String, HostData>, HostError> {
        let mut answers = IndexMap::new();
        for field in fields {
            let input = self.prompt(&field.name)?;
            let invalid = || HostError::Invalid(format!("{}: `{}`", field.name, input));
            let data = match field.kind {
                FieldKind::Str => HostData::Str(input.clone()),
                FieldKind::Int => HostData::Int(input.parse().map_err(|_| invalid())?),
                FieldKind::Float => HostData::Float(input.parse().map_err(|_| invalid())?),
                FieldKind::Bool => HostData::Bool(matches!(
                    input.to_lowercase().as_str(),
                    "y" | "yes" | "true" | "1"
                )),
                FieldKind::Date => HostData::Date(
                    NaiveDate::parse_from_str(&input, "%Y-%m-%d").map_err(|_| invalid())?,
                ),
            };
            answers.insert(field.name.clone(), data);
        }
        Ok(answers)
    }
}

fn main() {
    let mut args: Vec<String> = env::args().skip(1).collect();

    let config = if args.len() >= 2 && args[0] == "--config" {
        let path = args[1].clone();
        args.drain(..2);
        match EngineConfig::load(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error in config '{}': {}", path, e);
                process::exit(1);
            }
        }
    } else {
        EngineConfig::new()
    };

    let globals = Scope::new();
    HostEnvironment::new(config.schema_registry())
        .with_ui(Rc::new(TerminalUi))
        .install(&globals);
    let mut runtime = config.runtime();

    match args.iter().map(|a| a.as_str()).collect::<Vec<_>>().as_slice() {
        [] => run_repl(&mut runtime, &globals),
        ["-h"] | ["--help"] => print_usage(),
        ["-e", code] | ["--eval", code] => {
            let bytecode = compile_or_exit(code);
            run_and_report(&mut runtime, &bytecode, &globals);
        }
        ["--dis", file] => {
            let bytecode = load_or_exit(file);
            print!("{}", bytecode.disassemble(file));
        }
        ["--tokens", file] => match parse_to_token_tree(&read_or_exit(file)) {
            Ok(tree) => println!("{}", tree),
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        },
        ["--compile", file, out] => {
            let bytecode = compile_or_exit(&read_or_exit(file));
            let bytes = match encode(&bytecode) {
                Ok(bytes) => bytes,
                Err(e) => {
                    eprintln!("Encoding error: {}", e);
                    process::exit(1);
                }
            };
            if let Err(e) = fs::write(out, bytes) {
                eprintln!("Error writing '{}': {}", out, e);
                process::exit(1);
            }
        }
        [file] => {
            let bytecode = load_or_exit(file);
            run_and_report(&mut runtime, &bytecode, &globals);
        }
        _ => {
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("bookscript - library scripting engine");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  bookscript [--config <path>] <file>               Run a script or .bsc file");
    eprintln!("  bookscript [--config <path>] -e \"code\"            Evaluate code");
    eprintln!("  bookscript --dis <file>                           Disassemble");
    eprintln!("  bookscript --tokens <file>                        Print the parse tree");
    eprintln!("  bookscript --compile <file> <out.bsc>             Write encoded bytecode");
    eprintln!("  bookscript [--config <path>]                      Start REPL");
}

fn read_or_exit(filename: &str) -> String {
    match fs::read_to_string(filename) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", filename, e);
            process::exit(1);
        }
    }
}

fn compile_or_exit(source: &str) -> ByteCode {
    match compile(source) {
        Ok(bytecode) => bytecode,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

/// Source files are compiled; `.bsc` files are decoded.
fn load_or_exit(filename: &str) -> ByteCode {
    if !filename.ends_with(".bsc") {
        return compile_or_exit(&read_or_exit(filename));
    }
    let bytes = match fs::read(filename) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", filename, e);
            process::exit(1);
        }
    };
    match decode(&bytes) {
        Ok(bytecode) => bytecode,
        Err(e) => {
            eprintln!("Invalid bytecode file '{}': {}", filename, e);
            process::exit(1);
        }
    }
}

fn run_and_report(runtime: &mut Runtime, bytecode: &ByteCode, globals: &Scope) {
    match runtime.execute(bytecode, globals, globals) {
        Ok(Value::Undefined) => {}
        Ok(value) => println!("{}", to_repr(&value)),
        Err(e) => {
            eprintln!("Runtime error: {}", e);
            process::exit(1);
        }
    }
}

fn run_repl(runtime: &mut Runtime, globals: &Scope) {
    println!("bookscript v{}", env!("CARGO_PKG_VERSION"));
    println!("Type code and press Enter. Type .exit to quit.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
        }

        let input = input.trim();
        if input == ".exit" || input == ".quit" {
            break;
        }
        if input.is_empty() {
            continue;
        }

        // Bare expressions echo their value.
        let bytecode = match compile(&format!("return {}", input)).or_else(|_| compile(input)) {
            Ok(bytecode) => bytecode,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        match runtime.execute(&bytecode, globals, globals) {
            Ok(Value::Undefined) => {}
            Ok(value) => println!("{}", to_repr(&value)),
            Err(e) => eprintln!("Runtime error: {}", e),
        }
    }

    println!("Goodbye!");
}
