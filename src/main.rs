//! Opal CLI: execute files, evaluate snippets, or run the REPL.

use std::env;
use std::fs;
use std::process;

use colored::Colorize;

use opal::bytecode::disassemble_bytecode;
use opal::error::OpalError;
use opal::repl::Repl;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI command to execute.
enum Command {
    /// Start the REPL
    Repl,
    /// Run a script file
    Run { file: String },
    /// Evaluate a string and print the result
    Eval { code: String },
    /// Print a file's compiled bytecode without running it
    Disasm { file: String },
}

fn print_usage() {
    eprintln!("Opal {} - a small bytecode-compiled language", VERSION);
    eprintln!();
    eprintln!("Usage: opal [script.opal]");
    eprintln!("       opal -e <code>");
    eprintln!("       opal --disasm <script.opal>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -e <code>        Evaluate code and print the result");
    eprintln!("  --disasm <file>  Print compiled bytecode without running");
    eprintln!("  -h, --help       Show this help");
    eprintln!("  --version        Show version");
    eprintln!();
    eprintln!("With no arguments, starts the REPL.");
}

fn parse_args() -> Result<Command, String> {
    let mut args = env::args().skip(1);

    let Some(first) = args.next() else {
        return Ok(Command::Repl);
    };

    match first.as_str() {
        "-h" | "--help" => {
            print_usage();
            process::exit(0);
        }
        "--version" => {
            println!("opal {}", VERSION);
            process::exit(0);
        }
        "-e" => match args.next() {
            Some(code) => Ok(Command::Eval { code }),
            None => Err("-e requires an argument".to_string()),
        },
        "--disasm" => match args.next() {
            Some(file) => Ok(Command::Disasm { file }),
            None => Err("--disasm requires a file".to_string()),
        },
        flag if flag.starts_with('-') => Err(format!("unknown option '{}'", flag)),
        file => Ok(Command::Run {
            file: file.to_string(),
        }),
    }
}

fn exit_code(err: &OpalError) -> i32 {
    match err {
        OpalError::Runtime(_) => 70,
        OpalError::Io(_) => 66,
        _ => 65,
    }
}

fn fail(err: OpalError) -> ! {
    eprintln!("{}", err.to_string().red());
    process::exit(exit_code(&err));
}

fn read_source(file: &str) -> String {
    match fs::read_to_string(file) {
        Ok(source) => source,
        Err(err) => fail(OpalError::Io(err)),
    }
}

fn main() {
    let command = match parse_args() {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{}", message.red());
            eprintln!();
            print_usage();
            process::exit(64);
        }
    };

    match command {
        Command::Repl => Repl::new().run(),

        Command::Run { file } => {
            let source = read_source(&file);
            if let Err(err) = opal::run(&source) {
                fail(err);
            }
        }

        Command::Eval { code } => match opal::run(&code) {
            Ok(value) => println!("{}", value),
            Err(err) => fail(err),
        },

        Command::Disasm { file } => {
            let source = read_source(&file);
            match opal::compile(&source) {
                Ok(bytecode) => print!("{}", disassemble_bytecode(&bytecode)),
                Err(err) => fail(err),
            }
        }
    }
}
