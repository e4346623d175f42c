//! Bytecode compiler: transforms AST into bytecode.
//!
//! A single pass over the tree. Each function literal gets its own
//! compilation scope (instruction buffer plus peephole bookkeeping);
//! the symbol table is wrapped and unwrapped in lockstep with the scope
//! stack so identifier resolution always sees the correct nesting.

use std::rc::Rc;

use crate::ast::{Block, Expr, ExprKind, InfixOp, PrefixOp, Program, Stmt, StmtKind};
use crate::bytecode::builtins::BUILTINS;
use crate::bytecode::instruction::{make, Opcode};
use crate::bytecode::symbol_table::{Symbol, SymbolScope, SymbolTable};
use crate::bytecode::value::{CompiledFunction, Value};
use crate::error::CompileError;

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// The compiled artifact: the main instruction stream plus the constant
/// pool shared by every function in the program.
#[derive(Debug, Clone)]
pub struct Bytecode {
    pub instructions: Vec<u8>,
    pub constants: Vec<Value>,
}

/// Opcode and start position of an emitted instruction, recorded for
/// peephole edits.
#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    opcode: Opcode,
    position: usize,
}

/// Per-function instruction buffer.
#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Vec<u8>,
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
}

/// The bytecode compiler.
pub struct Compiler {
    constants: Vec<Value>,
    symbol_table: SymbolTable,
    scopes: Vec<CompilationScope>,
}

impl Compiler {
    /// Create a compiler with a fresh symbol table pre-populated with
    /// the builtin functions.
    pub fn new() -> Self {
        let mut symbol_table = SymbolTable::new();
        for (index, builtin) in BUILTINS.iter().enumerate() {
            symbol_table.define_builtin(index, builtin.name);
        }

        Self {
            constants: Vec::new(),
            symbol_table,
            scopes: vec![CompilationScope::default()],
        }
    }

    /// Create a compiler that continues from an existing symbol table
    /// and constant pool, for REPL sessions.
    pub fn new_with_state(symbol_table: SymbolTable, constants: Vec<Value>) -> Self {
        Self {
            constants,
            symbol_table,
            scopes: vec![CompilationScope::default()],
        }
    }

    /// Compile a program into the main scope.
    pub fn compile(&mut self, program: &Program) -> CompileResult<()> {
        for stmt in &program.statements {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    /// The compiled artifact. Callable repeatedly; each call snapshots
    /// the main scope and constants.
    pub fn bytecode(&self) -> Bytecode {
        Bytecode {
            instructions: self
                .scopes
                .first()
                .map(|scope| scope.instructions.clone())
                .unwrap_or_default(),
            constants: self.constants.clone(),
        }
    }

    /// Hand the symbol table and constant pool back to the caller, for
    /// the next REPL compilation.
    pub fn into_state(self) -> (SymbolTable, Vec<Value>) {
        (self.symbol_table, self.constants)
    }

    // ===== Statements =====

    fn compile_statement(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                self.compile_expression(expr)?;
                self.emit(Opcode::Pop, &[]);
            }

            StmtKind::Let { name, value } => {
                // Defined before the value compiles so the value can
                // refer to itself (recursive functions).
                let symbol = self.symbol_table.define(name);
                self.compile_expression(value)?;
                match symbol.scope {
                    SymbolScope::Global => self.emit(Opcode::SetGlobal, &[symbol.index]),
                    _ => self.emit(Opcode::SetLocal, &[symbol.index]),
                };
            }

            StmtKind::Return(value) => {
                self.compile_expression(value)?;
                self.emit(Opcode::ReturnValue, &[]);
            }
        }

        Ok(())
    }

    fn compile_block(&mut self, block: &Block) -> CompileResult<()> {
        for stmt in &block.statements {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    // ===== Expressions =====

    fn compile_expression(&mut self, expr: &Expr) -> CompileResult<()> {
        match &expr.kind {
            ExprKind::IntLiteral(value) => {
                let index = self.add_constant(Value::Int(*value))?;
                self.emit(Opcode::Constant, &[index]);
            }

            ExprKind::StringLiteral(value) => {
                let index = self.add_constant(Value::string(value.clone()))?;
                self.emit(Opcode::Constant, &[index]);
            }

            ExprKind::BoolLiteral(value) => {
                if *value {
                    self.emit(Opcode::True, &[]);
                } else {
                    self.emit(Opcode::False, &[]);
                }
            }

            ExprKind::Identifier(name) => {
                let symbol = self
                    .symbol_table
                    .resolve(name)
                    .ok_or_else(|| CompileError::UndefinedVariable(name.clone(), expr.span))?;
                self.load_symbol(&symbol);
            }

            ExprKind::Prefix { operator, right } => {
                self.compile_expression(right)?;
                match operator {
                    PrefixOp::Bang => self.emit(Opcode::Bang, &[]),
                    PrefixOp::Minus => self.emit(Opcode::Minus, &[]),
                };
            }

            ExprKind::Infix {
                left,
                operator,
                right,
            } => {
                // `<` has no opcode: compile operands in reverse and
                // reuse GreaterThan.
                if *operator == InfixOp::Less {
                    self.compile_expression(right)?;
                    self.compile_expression(left)?;
                    self.emit(Opcode::GreaterThan, &[]);
                    return Ok(());
                }

                self.compile_expression(left)?;
                self.compile_expression(right)?;
                match operator {
                    InfixOp::Add => self.emit(Opcode::Add, &[]),
                    InfixOp::Sub => self.emit(Opcode::Sub, &[]),
                    InfixOp::Mul => self.emit(Opcode::Mul, &[]),
                    InfixOp::Div => self.emit(Opcode::Div, &[]),
                    InfixOp::Greater => self.emit(Opcode::GreaterThan, &[]),
                    InfixOp::Equal => self.emit(Opcode::Equal, &[]),
                    InfixOp::NotEqual => self.emit(Opcode::NotEqual, &[]),
                    InfixOp::Less => unreachable!("handled above"),
                };
            }

            ExprKind::If {
                condition,
                consequence,
                alternative,
            } => {
                self.compile_expression(condition)?;

                // Placeholder target, patched once the consequence ends.
                let jump_not_truthy = self.emit(Opcode::JumpNotTruthy, &[9999]);

                self.compile_block(consequence)?;
                if self.last_instruction_is(Opcode::Pop) {
                    self.remove_last_pop();
                }

                // Both arms leave a value; the consequence jumps over
                // the alternative (a synthesized Null when absent).
                let jump = self.emit(Opcode::Jump, &[9999]);

                let after_consequence = self.current_instructions().len();
                self.change_operand(jump_not_truthy, Opcode::JumpNotTruthy, after_consequence)?;

                match alternative {
                    Some(alt) => {
                        self.compile_block(alt)?;
                        if self.last_instruction_is(Opcode::Pop) {
                            self.remove_last_pop();
                        }
                    }
                    None => {
                        self.emit(Opcode::Null, &[]);
                    }
                }

                let after_alternative = self.current_instructions().len();
                self.change_operand(jump, Opcode::Jump, after_alternative)?;
            }

            ExprKind::Function { parameters, body } => {
                self.enter_scope();
                for param in parameters {
                    self.symbol_table.define(param);
                }

                self.compile_block(body)?;

                // The body is an expression: its last value becomes the
                // return value. An empty body returns null.
                if self.last_instruction_is(Opcode::Pop) {
                    self.replace_last_pop_with_return();
                }
                if !self.last_instruction_is(Opcode::ReturnValue) {
                    self.emit(Opcode::Return, &[]);
                }

                let free_symbols = self.symbol_table.free_symbols.clone();
                let num_locals = self.symbol_table.num_definitions;
                let instructions = self.leave_scope();

                // Captured values go on the stack in the enclosing
                // scope, right before the closure is built.
                for symbol in &free_symbols {
                    self.load_symbol(symbol);
                }

                let function = CompiledFunction {
                    instructions,
                    num_locals,
                    num_parameters: parameters.len(),
                };
                let index = self.add_constant(Value::Function(Rc::new(function)))?;
                self.emit(Opcode::Closure, &[index, free_symbols.len()]);
            }

            ExprKind::Call { callee, arguments } => {
                self.compile_expression(callee)?;
                for arg in arguments {
                    self.compile_expression(arg)?;
                }
                self.emit(Opcode::Call, &[arguments.len()]);
            }

            ExprKind::Array(elements) => {
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(Opcode::Array, &[elements.len()]);
            }

            ExprKind::Hash(pairs) => {
                // Deterministic emission order regardless of source
                // order: sort keys by their printed form.
                let mut sorted: Vec<&(Expr, Expr)> = pairs.iter().collect();
                sorted.sort_by_key(|(key, _)| key.to_string());

                for (key, value) in sorted {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(Opcode::Hash, &[pairs.len() * 2]);
            }

            ExprKind::Index { object, index } => {
                self.compile_expression(object)?;
                self.compile_expression(index)?;
                self.emit(Opcode::Index, &[]);
            }
        }

        Ok(())
    }

    fn load_symbol(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Opcode::GetGlobal, &[symbol.index]),
            SymbolScope::Local => self.emit(Opcode::GetLocal, &[symbol.index]),
            SymbolScope::Builtin => self.emit(Opcode::GetBuiltin, &[symbol.index]),
            SymbolScope::Free => self.emit(Opcode::GetFree, &[symbol.index]),
        };
    }

    // ===== Emission =====

    fn add_constant(&mut self, value: Value) -> CompileResult<usize> {
        if self.constants.len() > u16::MAX as usize {
            return Err(CompileError::TooManyConstants);
        }
        self.constants.push(value);
        Ok(self.constants.len() - 1)
    }

    fn emit(&mut self, op: Opcode, operands: &[usize]) -> usize {
        let instruction = make(op, operands);
        let position = self.add_instruction(&instruction);
        self.set_last_instruction(op, position);
        position
    }

    fn add_instruction(&mut self, instruction: &[u8]) -> usize {
        let scope = self.current_scope();
        let position = scope.instructions.len();
        scope.instructions.extend_from_slice(instruction);
        position
    }

    fn set_last_instruction(&mut self, opcode: Opcode, position: usize) {
        let scope = self.current_scope();
        scope.previous_instruction = scope.last_instruction;
        scope.last_instruction = Some(EmittedInstruction { opcode, position });
    }

    fn last_instruction_is(&self, op: Opcode) -> bool {
        self.scopes
            .last()
            .and_then(|scope| scope.last_instruction)
            .is_some_and(|last| last.opcode == op)
    }

    fn remove_last_pop(&mut self) {
        let scope = self.current_scope();
        if let Some(last) = scope.last_instruction {
            scope.instructions.truncate(last.position);
            scope.last_instruction = scope.previous_instruction;
        }
    }

    fn replace_last_pop_with_return(&mut self) {
        let scope = self.current_scope();
        if let Some(last) = &mut scope.last_instruction {
            scope.instructions[last.position] = Opcode::ReturnValue as u8;
            last.opcode = Opcode::ReturnValue;
        }
    }

    /// Rewrite the operand of the instruction at `position` in place.
    /// `op` must be the opcode originally emitted there.
    fn change_operand(
        &mut self,
        position: usize,
        op: Opcode,
        operand: usize,
    ) -> CompileResult<()> {
        if operand > u16::MAX as usize {
            return Err(CompileError::JumpTooLarge(operand));
        }

        let instruction = make(op, &[operand]);
        let scope = self.current_scope();
        scope.instructions[position..position + instruction.len()]
            .copy_from_slice(&instruction);
        Ok(())
    }

    fn current_instructions(&self) -> &[u8] {
        self.scopes
            .last()
            .map(|scope| scope.instructions.as_slice())
            .unwrap_or_default()
    }

    fn current_scope(&mut self) -> &mut CompilationScope {
        // The main scope is created in the constructor and never popped.
        if self.scopes.is_empty() {
            self.scopes.push(CompilationScope::default());
        }
        self.scopes.last_mut().expect("scope stack is non-empty")
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        let outer = std::mem::take(&mut self.symbol_table);
        self.symbol_table = SymbolTable::new_enclosed(outer);
    }

    fn leave_scope(&mut self) -> Vec<u8> {
        let scope = self.scopes.pop().unwrap_or_default();
        let table = std::mem::take(&mut self.symbol_table);
        self.symbol_table = table.into_outer().unwrap_or_default();
        scope.instructions
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
