//! Stack-based virtual machine for executing bytecode.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::bytecode::builtins::BUILTINS;
use crate::bytecode::compiler::Bytecode;
use crate::bytecode::instruction::{read_u16, Opcode};
use crate::bytecode::value::{Closure, CompiledFunction, Value};
use crate::error::RuntimeError;

/// Maximum data stack depth, in values.
pub const STACK_SIZE: usize = 2048;
/// Globals array capacity; `SetGlobal`/`GetGlobal` operands are u16.
pub const GLOBALS_SIZE: usize = 65536;
/// Maximum call depth.
pub const MAX_FRAMES: usize = 1024;

/// Result type for VM operations.
pub type VmResult<T> = Result<T, RuntimeError>;

/// A call frame: the closure being executed, its instruction pointer,
/// and the stack index where its local region begins.
#[derive(Debug)]
struct Frame {
    closure: Rc<Closure>,
    ip: usize,
    base_pointer: usize,
}

impl Frame {
    fn new(closure: Rc<Closure>, base_pointer: usize) -> Self {
        Self {
            closure,
            ip: 0,
            base_pointer,
        }
    }
}

/// The virtual machine. `sp` always points at the next free stack slot:
/// the top of the stack is `stack[sp - 1]`, and a pop leaves the slot's
/// value in place so `last_popped_stack_elem` can read it.
pub struct Vm {
    constants: Vec<Value>,
    stack: Vec<Value>,
    sp: usize,
    globals: Vec<Value>,
    frames: Vec<Frame>,
}

impl Vm {
    /// Create a VM with a fresh globals array.
    pub fn new(bytecode: Bytecode) -> Self {
        Self::new_with_globals_store(bytecode, vec![Value::Null; GLOBALS_SIZE])
    }

    /// Create a VM reusing an existing globals array, so bindings
    /// survive across REPL lines.
    pub fn new_with_globals_store(bytecode: Bytecode, mut globals: Vec<Value>) -> Self {
        globals.resize(GLOBALS_SIZE, Value::Null);

        let main_function = CompiledFunction {
            instructions: bytecode.instructions,
            num_locals: 0,
            num_parameters: 0,
        };
        let main_closure = Rc::new(Closure::new(Rc::new(main_function)));

        Self {
            constants: bytecode.constants,
            stack: vec![Value::Null; STACK_SIZE],
            sp: 0,
            globals,
            frames: vec![Frame::new(main_closure, 0)],
        }
    }

    /// Hand the globals array back to the caller for the next VM.
    pub fn into_globals(self) -> Vec<Value> {
        self.globals
    }

    /// The value in the slot vacated by the most recent pop. After a
    /// program ending in an expression statement, this is that
    /// expression's value.
    pub fn last_popped_stack_elem(&self) -> Value {
        self.stack[self.sp].clone()
    }

    /// Execute until the main frame finishes or an error is raised.
    pub fn run(&mut self) -> VmResult<()> {
        while !self.frames.is_empty() {
            let frame = self.current_frame();
            let ip = frame.ip;
            let instructions = &frame.closure.function.instructions;
            if ip >= instructions.len() {
                break;
            }
            let byte = instructions[ip];
            let op = Opcode::from_u8(byte).ok_or(RuntimeError::InvalidOpcode(byte))?;
            self.current_frame_mut().ip += 1;

            match op {
                Opcode::Constant => {
                    let index = self.read_u16_operand();
                    let value = self.constants[index].clone();
                    self.push(value)?;
                }

                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => {
                    self.execute_binary_operation(op)?;
                }

                Opcode::Pop => {
                    self.pop()?;
                }

                Opcode::True => self.push(Value::Bool(true))?,
                Opcode::False => self.push(Value::Bool(false))?,
                Opcode::Null => self.push(Value::Null)?,

                Opcode::Equal | Opcode::NotEqual => {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    let equal = left == right;
                    self.push(Value::Bool(if op == Opcode::Equal { equal } else { !equal }))?;
                }

                Opcode::GreaterThan => {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    match (&left, &right) {
                        (Value::Int(l), Value::Int(r)) => self.push(Value::Bool(l > r))?,
                        _ => {
                            return Err(RuntimeError::UnsupportedBinaryTypes {
                                left: left.type_name(),
                                right: right.type_name(),
                            })
                        }
                    }
                }

                Opcode::Bang => {
                    let value = self.pop()?;
                    self.push(Value::Bool(!value.is_truthy()))?;
                }

                Opcode::Minus => {
                    let value = self.pop()?;
                    match value {
                        Value::Int(n) => self.push(Value::Int(n.wrapping_neg()))?,
                        other => {
                            return Err(RuntimeError::UnsupportedNegation(other.type_name()))
                        }
                    }
                }

                Opcode::Jump => {
                    let target = self.read_u16_operand();
                    self.current_frame_mut().ip = target;
                }

                Opcode::JumpNotTruthy => {
                    let target = self.read_u16_operand();
                    let condition = self.pop()?;
                    if !condition.is_truthy() {
                        self.current_frame_mut().ip = target;
                    }
                }

                Opcode::SetGlobal => {
                    let index = self.read_u16_operand();
                    self.globals[index] = self.pop()?;
                }

                Opcode::GetGlobal => {
                    let index = self.read_u16_operand();
                    let value = self.globals[index].clone();
                    self.push(value)?;
                }

                Opcode::SetLocal => {
                    let slot = self.read_u8_operand();
                    let base = self.current_frame().base_pointer;
                    self.stack[base + slot] = self.pop()?;
                }

                Opcode::GetLocal => {
                    let slot = self.read_u8_operand();
                    let base = self.current_frame().base_pointer;
                    let value = self.stack[base + slot].clone();
                    self.push(value)?;
                }

                Opcode::GetBuiltin => {
                    let index = self.read_u8_operand();
                    self.push(Value::Builtin(&BUILTINS[index]))?;
                }

                Opcode::GetFree => {
                    let index = self.read_u8_operand();
                    let value = self.current_frame().closure.free[index].clone();
                    self.push(value)?;
                }

                Opcode::Array => {
                    let count = self.read_u16_operand();
                    let elements = self.stack[self.sp - count..self.sp].to_vec();
                    self.sp -= count;
                    self.push(Value::Array(Rc::new(elements)))?;
                }

                Opcode::Hash => {
                    let count = self.read_u16_operand();
                    let hash = self.build_hash(self.sp - count, self.sp)?;
                    self.sp -= count;
                    self.push(hash)?;
                }

                Opcode::Index => {
                    let index = self.pop()?;
                    let left = self.pop()?;
                    let value = self.execute_index_expression(left, index)?;
                    self.push(value)?;
                }

                Opcode::Closure => {
                    let const_index = self.read_u16_operand();
                    let free_count = self.read_u8_operand();
                    self.push_closure(const_index, free_count)?;
                }

                Opcode::Call => {
                    let num_args = self.read_u8_operand();
                    self.execute_call(num_args)?;
                }

                Opcode::ReturnValue => {
                    let value = self.pop()?;
                    let frame = self.pop_frame();
                    self.sp = frame.base_pointer.saturating_sub(1);
                    self.push(value)?;
                }

                Opcode::Return => {
                    let frame = self.pop_frame();
                    self.sp = frame.base_pointer.saturating_sub(1);
                    self.push(Value::Null)?;
                }
            }
        }

        Ok(())
    }

    // ===== Operations =====

    fn execute_binary_operation(&mut self, op: Opcode) -> VmResult<()> {
        let right = self.pop()?;
        let left = self.pop()?;

        match (&left, &right) {
            (Value::Int(l), Value::Int(r)) => {
                let result = match op {
                    Opcode::Add => l.wrapping_add(*r),
                    Opcode::Sub => l.wrapping_sub(*r),
                    Opcode::Mul => l.wrapping_mul(*r),
                    _ => {
                        if *r == 0 {
                            return Err(RuntimeError::DivisionByZero);
                        }
                        l.wrapping_div(*r)
                    }
                };
                self.push(Value::Int(result))
            }
            (Value::String(l), Value::String(r)) if op == Opcode::Add => {
                self.push(Value::string(format!("{}{}", l, r)))
            }
            _ => Err(RuntimeError::UnsupportedBinaryTypes {
                left: left.type_name(),
                right: right.type_name(),
            }),
        }
    }

    fn build_hash(&self, start: usize, end: usize) -> VmResult<Value> {
        let mut pairs = IndexMap::with_capacity((end - start) / 2);

        let mut i = start;
        while i < end {
            let key = &self.stack[i];
            let hash_key = key
                .hash_key()
                .ok_or(RuntimeError::UnusableHashKey(key.type_name()))?;
            pairs.insert(hash_key, self.stack[i + 1].clone());
            i += 2;
        }

        Ok(Value::Hash(Rc::new(pairs)))
    }

    fn execute_index_expression(&self, left: Value, index: Value) -> VmResult<Value> {
        match (&left, &index) {
            (Value::Array(elements), Value::Int(i)) => {
                if *i < 0 || *i as usize >= elements.len() {
                    Ok(Value::Null)
                } else {
                    Ok(elements[*i as usize].clone())
                }
            }
            (Value::Hash(pairs), key) => {
                let hash_key = key
                    .hash_key()
                    .ok_or(RuntimeError::UnusableHashKey(key.type_name()))?;
                Ok(pairs.get(&hash_key).cloned().unwrap_or(Value::Null))
            }
            _ => Err(RuntimeError::IndexNotSupported(left.type_name())),
        }
    }

    fn push_closure(&mut self, const_index: usize, free_count: usize) -> VmResult<()> {
        let function = match &self.constants[const_index] {
            Value::Function(function) => Rc::clone(function),
            other => return Err(RuntimeError::NotCallable(other.type_name())),
        };

        let free = self.stack[self.sp - free_count..self.sp].to_vec();
        self.sp -= free_count;

        self.push(Value::Closure(Rc::new(Closure { function, free })))
    }

    fn execute_call(&mut self, num_args: usize) -> VmResult<()> {
        let callee = self.stack[self.sp - 1 - num_args].clone();
        match callee {
            Value::Closure(closure) => self.call_closure(closure, num_args),
            Value::Builtin(builtin) => {
                let args = self.stack[self.sp - num_args..self.sp].to_vec();
                let result = (builtin.func)(&args);
                self.sp = self.sp - num_args - 1;
                self.push(result)
            }
            other => Err(RuntimeError::NotCallable(other.type_name())),
        }
    }

    fn call_closure(&mut self, closure: Rc<Closure>, num_args: usize) -> VmResult<()> {
        if num_args != closure.function.num_parameters {
            return Err(RuntimeError::WrongArity {
                want: closure.function.num_parameters,
                got: num_args,
            });
        }
        if self.frames.len() >= MAX_FRAMES {
            return Err(RuntimeError::FrameOverflow);
        }

        let base_pointer = self.sp - num_args;
        if base_pointer + closure.function.num_locals > STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }

        // Arguments already sit in [base_pointer, base_pointer+num_args);
        // the remaining local slots are reserved above them.
        self.sp = base_pointer + closure.function.num_locals;
        self.frames.push(Frame::new(closure, base_pointer));
        Ok(())
    }

    // ===== Stack and frame primitives =====

    fn push(&mut self, value: Value) -> VmResult<()> {
        if self.sp >= STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> VmResult<Value> {
        if self.sp == 0 {
            return Err(RuntimeError::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.stack[self.sp].clone())
    }

    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("frame stack is non-empty")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("frame stack is non-empty")
    }

    fn pop_frame(&mut self) -> Frame {
        self.frames.pop().expect("frame stack is non-empty")
    }

    fn read_u8_operand(&mut self) -> usize {
        let frame = self.current_frame_mut();
        let value = frame.closure.function.instructions[frame.ip] as usize;
        frame.ip += 1;
        value
    }

    fn read_u16_operand(&mut self) -> usize {
        let frame = self.current_frame_mut();
        let value = read_u16(&frame.closure.function.instructions[frame.ip..]) as usize;
        frame.ip += 2;
        value
    }
}
