//! Interactive REPL with persistent session state.
//!
//! The symbol table, constant pool and globals array survive across
//! lines, so bindings from one line stay resolvable on the next. Parse
//! errors discard the line; runtime errors leave prior state intact.

use std::io::{self, Write};
use std::path::PathBuf;

use colored::Colorize;

use crate::bytecode::{disassemble_bytecode, Compiler, SymbolTable, Value, Vm};
use crate::error::OpalError;
use crate::lexer::Scanner;
use crate::parser::Parser;

const PROMPT: &str = ">> ";
const HISTORY_FILE: &str = ".opal_history";

pub struct Repl {
    symbol_table: SymbolTable,
    constants: Vec<Value>,
    globals: Vec<Value>,
    history: Vec<String>,
    history_file: PathBuf,
    show_disassembly: bool,
}

impl Repl {
    pub fn new() -> Self {
        // A throwaway compiler supplies the builtin-populated table.
        let (symbol_table, constants) = Compiler::new().into_state();

        let mut repl = Self {
            symbol_table,
            constants,
            globals: Vec::new(),
            history: Vec::new(),
            history_file: Self::history_path(),
            show_disassembly: false,
        };
        repl.load_history();
        repl
    }

    fn history_path() -> PathBuf {
        match dirs::home_dir() {
            Some(home) => home.join(HISTORY_FILE),
            None => PathBuf::from(HISTORY_FILE),
        }
    }

    fn load_history(&mut self) {
        if let Ok(content) = std::fs::read_to_string(&self.history_file) {
            for line in content.lines() {
                if !line.trim().is_empty() {
                    self.history.push(line.to_string());
                }
            }
        }
    }

    fn save_history(&self) {
        let _ = std::fs::write(&self.history_file, self.history.join("\n"));
    }

    /// Compile and run one line against the session state.
    pub fn eval(&mut self, source: &str) -> Result<Value, OpalError> {
        let tokens = Scanner::new(source).scan_tokens()?;
        let program = Parser::new(tokens).parse()?;

        let symbol_table = std::mem::take(&mut self.symbol_table);
        let constants = std::mem::take(&mut self.constants);
        let mut compiler = Compiler::new_with_state(symbol_table, constants);
        let compiled = compiler.compile(&program);
        let bytecode = compiler.bytecode();
        let (symbol_table, constants) = compiler.into_state();
        self.symbol_table = symbol_table;
        self.constants = constants;
        compiled?;

        if self.show_disassembly {
            print!("{}", disassemble_bytecode(&bytecode));
        }

        let globals = std::mem::take(&mut self.globals);
        let mut vm = Vm::new_with_globals_store(bytecode, globals);
        let outcome = vm.run();
        let value = vm.last_popped_stack_elem();
        self.globals = vm.into_globals();
        outcome?;
        Ok(value)
    }

    /// The interactive loop.
    pub fn run(&mut self) {
        println!("Opal {} - REPL", env!("CARGO_PKG_VERSION"));
        println!("Type .help for available commands.\n");

        let stdin = io::stdin();

        loop {
            print!("{}", PROMPT);
            if io::stdout().flush().is_err() {
                break;
            }

            let mut line = String::new();
            match stdin.read_line(&mut line) {
                Ok(0) => {
                    self.save_history();
                    println!("Goodbye!");
                    break;
                }
                Ok(_) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if !self.handle_line(line) {
                        break;
                    }
                }
                Err(err) => {
                    eprintln!("{}", format!("read error: {}", err).red());
                    break;
                }
            }
        }
    }

    /// Returns false when the REPL should exit.
    fn handle_line(&mut self, line: &str) -> bool {
        match line {
            "exit" | ".exit" | "quit" | ".quit" => {
                self.save_history();
                println!("Goodbye!");
                return false;
            }
            ".help" => {
                self.print_help();
                return true;
            }
            ".disasm" => {
                self.show_disassembly = !self.show_disassembly;
                println!(
                    "disassembly {}",
                    if self.show_disassembly { "on" } else { "off" }
                );
                return true;
            }
            _ => {}
        }

        self.history.push(line.to_string());
        match self.eval(line) {
            Ok(value) => println!("{}", value),
            Err(err) => eprintln!("{}", err.to_string().red()),
        }
        true
    }

    fn print_help(&self) {
        println!(".help     Show this help");
        println!(".disasm   Toggle bytecode disassembly for each line");
        println!(".exit     Leave the REPL (also: exit, quit, .quit)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repl() -> Repl {
        let (symbol_table, constants) = Compiler::new().into_state();
        Repl {
            symbol_table,
            constants,
            globals: Vec::new(),
            history: Vec::new(),
            history_file: PathBuf::from(HISTORY_FILE),
            show_disassembly: false,
        }
    }

    #[test]
    fn test_bindings_persist_across_lines() {
        let mut repl = repl();
        repl.eval("let a = 5;").expect("evals");
        assert_eq!(repl.eval("a + 2").expect("evals"), Value::Int(7));
    }

    #[test]
    fn test_functions_persist_across_lines() {
        let mut repl = repl();
        repl.eval("let double = fn(x) { x * 2 };").expect("evals");
        assert_eq!(repl.eval("double(21)").expect("evals"), Value::Int(42));
    }

    #[test]
    fn test_global_indices_stay_stable() {
        let mut repl = repl();
        repl.eval("let a = 1;").expect("evals");
        repl.eval("let b = 2;").expect("evals");
        repl.eval("let c = 3;").expect("evals");
        assert_eq!(repl.eval("a + b + c").expect("evals"), Value::Int(6));
    }

    #[test]
    fn test_error_leaves_state_usable() {
        let mut repl = repl();
        repl.eval("let a = 10;").expect("evals");
        assert!(repl.eval("undefined_name").is_err());
        assert!(repl.eval("1 + true").is_err());
        assert_eq!(repl.eval("a").expect("evals"), Value::Int(10));
    }

    #[test]
    fn test_builtins_resolve() {
        let mut repl = repl();
        assert_eq!(repl.eval("len([1, 2, 3])").expect("evals"), Value::Int(3));
    }
}
