//! Opal: a small dynamically-typed expression language.
//!
//! Source is lexed, parsed into an AST, compiled to compact bytecode and
//! executed by a stack-based virtual machine. Closures capture by value,
//! discovered at compile time through the symbol table's free-variable
//! promotion.

#![allow(clippy::new_without_default)]

pub mod ast;
pub mod bytecode;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod span;

use ast::Program;
use bytecode::{Bytecode, Compiler, Value, Vm};
use error::OpalError;
use lexer::Scanner;
use parser::Parser;

/// Lex and parse a source string.
pub fn parse(source: &str) -> Result<Program, OpalError> {
    let tokens = Scanner::new(source).scan_tokens()?;
    let program = Parser::new(tokens).parse()?;
    Ok(program)
}

/// Compile a source string to bytecode.
pub fn compile(source: &str) -> Result<Bytecode, OpalError> {
    let program = parse(source)?;
    let mut compiler = Compiler::new();
    compiler.compile(&program)?;
    Ok(compiler.bytecode())
}

/// Compile and run a source string, returning the last value the VM
/// popped — the value of the program's final statement.
pub fn run(source: &str) -> Result<Value, OpalError> {
    let bytecode = compile(source)?;
    let mut vm = Vm::new(bytecode);
    vm.run()?;
    Ok(vm.last_popped_stack_elem())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_end_to_end() {
        assert_eq!(run("1 + 2").expect("runs"), Value::Int(3));
        assert_eq!(
            run("let a = 10; let b = 20; a + b").expect("runs"),
            Value::Int(30)
        );
    }

    #[test]
    fn test_run_surfaces_phase_errors() {
        assert!(matches!(run("let 1 = 2;"), Err(OpalError::Parser(_))));
        assert!(matches!(run("nope"), Err(OpalError::Compile(_))));
        assert!(matches!(run("1 + true"), Err(OpalError::Runtime(_))));
        assert!(matches!(run("\"unterminated"), Err(OpalError::Lexer(_))));
    }
}
