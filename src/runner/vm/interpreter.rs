//! Stack-based bytecode interpreter.
//!
//! Executes the bytecode emitted by the compiler with a flat dispatch loop.
//! Each call gets its own [`Frame`] (operand stack, element-context stack,
//! instruction pointer); the globals and locals scopes belong to the caller.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::iterator::{iterator_next, make_iterator};
use crate::runner::ds::object;
use crate::runner::ds::operations::type_conversion::to_boolean;
use crate::runner::ds::operations::{binary_op, unary_op};
use crate::runner::ds::scope::Scope;
use crate::runner::ds::value::{Kind, MapKey, Value};
use crate::runner::std_lib::builtin;

use super::bytecode::{BinaryOp, ByteCode, OpCode, UnaryOp};

pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Bounds on a single top-level execution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    /// Total instructions across all frames; `None` for no limit.
    pub max_instructions: Option<u64>,
    pub max_call_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_instructions: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// Cooperative cancellation flag, checked before every instruction. Clones
/// share the flag, so another thread may cancel a running script.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// In-memory sink for script output, shared between clones.
#[derive(Clone, Default)]
pub struct OutputBuffer(Rc<RefCell<Vec<u8>>>);

impl OutputBuffer {
    pub fn new() -> Self {
        OutputBuffer::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// State shared by every frame of one execution: limits, counters, the
/// cancel flag and the output sink used by `print`.
pub struct Runtime {
    limits: Limits,
    steps: u64,
    depth: usize,
    cancel: CancelToken,
    output: Box<dyn Write>,
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Runtime {
            limits: Limits::default(),
            steps: 0,
            depth: 0,
            cancel: CancelToken::new(),
            output: Box::new(io::stdout()),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_output<W: Write + 'static>(mut self, output: W) -> Self {
        self.output = Box::new(output);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn write_line(&mut self, text: &str) -> Result<(), RuntimeError> {
        writeln!(self.output, "{}", text)?;
        self.output.flush()?;
        Ok(())
    }

    /// Runs `bytecode` to its first RETURN, or to the end of the code, which
    /// yields `undefined`.
    pub fn execute(
        &mut self,
        bytecode: &ByteCode,
        globals: &Scope,
        locals: &Scope,
    ) -> Result<Value, RuntimeError> {
        Frame::new(bytecode, globals, locals).run(self)
    }

    /// Calls `callee` with positional arguments. Script functions run in a
    /// fresh local scope and see only `globals` besides their parameters.
    pub fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        globals: &Scope,
    ) -> Result<Value, RuntimeError> {
        match callee.kind() {
            Some(Kind::Function(function)) => {
                if args.len() != function.params.len() {
                    return Ok(Value::Undefined);
                }
                let locals = Scope::new();
                for (param, arg) in function.params.iter().zip(args) {
                    locals.set(function.bytecode.get_name(*param), arg);
                }
                if self.depth >= self.limits.max_call_depth {
                    return Err(RuntimeError::CallDepth(self.limits.max_call_depth));
                }
                self.depth += 1;
                let result = self.execute(&function.bytecode, globals, &locals);
                self.depth -= 1;
                result
            }
            Some(Kind::Native(native)) => (native.func)(self, globals, args),
            Some(Kind::Class(class)) => Ok(class.construct(&args)),
            _ => Ok(Value::Undefined),
        }
    }

    fn tick(&mut self) -> Result<(), RuntimeError> {
        if self.cancel.is_cancelled() {
            return Err(RuntimeError::Cancelled);
        }
        self.steps += 1;
        match self.limits.max_instructions {
            Some(max) if self.steps > max => Err(RuntimeError::InstructionLimit(max)),
            _ => Ok(()),
        }
    }
}

/// Executes `bytecode` with default limits, printing to stdout.
pub fn execute(bytecode: &ByteCode, globals: &Scope, locals: &Scope) -> Result<Value, RuntimeError> {
    Runtime::new().execute(bytecode, globals, locals)
}

/// Transient per-call state.
struct Frame<'a> {
    bytecode: &'a ByteCode,
    globals: &'a Scope,
    locals: &'a Scope,
    ip: usize,
    stack: Vec<Value>,
    elem_stack: Vec<Value>,
}

impl<'a> Frame<'a> {
    fn new(bytecode: &'a ByteCode, globals: &'a Scope, locals: &'a Scope) -> Self {
        Frame {
            bytecode,
            globals,
            locals,
            ip: 0,
            stack: Vec::with_capacity(16),
            elem_stack: vec![],
        }
    }

    fn run(&mut self, runtime: &mut Runtime) -> Result<Value, RuntimeError> {
        loop {
            if self.ip >= self.bytecode.code.len() {
                return Ok(Value::Undefined);
            }
            runtime.tick()?;

            let instr = self.bytecode.code[self.ip];
            let operand = instr.operand;
            self.ip += 1;

            match instr.op {
                OpCode::UnaryOp => {
                    let op = UnaryOp::from_id(operand)
                        .ok_or_else(|| malformed(format!("unary operator {}", operand)))?;
                    let v = self.pop();
                    self.stack.push(unary_op(op, &v));
                }
                OpCode::BinaryOp => {
                    let op = BinaryOp::from_id(operand)
                        .ok_or_else(|| malformed(format!("binary operator {}", operand)))?;
                    let b = self.pop();
                    let a = self.pop();
                    self.stack.push(binary_op(op, &a, &b));
                }
                OpCode::Contains => {
                    let container = self.pop();
                    let item = self.pop();
                    self.stack.push(object::contains(&container, &item));
                }
                OpCode::CallFunc => {
                    let args = self.pop_n(operand as usize);
                    let callee = self.pop();
                    let result = runtime.call_value(&callee, args, self.globals)?;
                    self.stack.push(result);
                }
                OpCode::JumpOnFalse => {
                    let v = self.pop();
                    if !to_boolean(&v) {
                        self.jump(operand)?;
                    }
                }
                OpCode::Jump => self.jump(operand)?,
                OpCode::SetVar => {
                    let name = self.name(operand)?;
                    let v = self.pop();
                    self.locals.set(name, v);
                }
                OpCode::SetAttr => {
                    let name = self.name(operand)?;
                    let value = self.pop();
                    let obj = self.pop();
                    object::set_attr(&obj, name, value)?;
                }
                OpCode::GetVar => {
                    let name = self.name(operand)?;
                    let v = self.resolve(name);
                    self.stack.push(v);
                }
                OpCode::GetConst => {
                    let v = self
                        .bytecode
                        .constants
                        .get(operand as usize)
                        .cloned()
                        .ok_or_else(|| malformed(format!("constant {}", operand)))?;
                    self.stack.push(v);
                }
                OpCode::EnterElem => {
                    let v = self.pop();
                    self.elem_stack.push(v);
                }
                OpCode::GetElem => {
                    let key = self.pop();
                    let obj = self.elem_stack.pop().unwrap_or(Value::Undefined);
                    let v = object::get_elem(&obj, &key)?;
                    self.stack.push(v);
                }
                OpCode::GetAttr => {
                    let name = self.name(operand)?;
                    let obj = self.pop();
                    self.stack.push(object::get_attr(&obj, name));
                }
                OpCode::MakeList => {
                    let items = self.pop_n(operand as usize);
                    let list = if instr.operand2 != 0 {
                        Value::frozen_list(items)
                    } else {
                        Value::list(items)
                    };
                    self.stack.push(list);
                }
                OpCode::MakeMap => {
                    let flat = self.pop_n(operand as usize * 2);
                    let map = make_map(flat, instr.operand2 != 0);
                    self.stack.push(map);
                }
                OpCode::Clear => self.stack.clear(),
                OpCode::GetIter => {
                    let v = self.pop();
                    self.stack.push(make_iterator(&v));
                }
                OpCode::ForIter => {
                    let it = self.pop();
                    match iterator_next(&it) {
                        Value::Undefined => self.jump(operand)?,
                        v => self.stack.push(v),
                    }
                }
                OpCode::Return => return Ok(self.pop()),
            }
        }
    }

    #[inline]
    fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or(Value::Undefined)
    }

    /// Pops the top `n` values, preserving their order.
    fn pop_n(&mut self, n: usize) -> Vec<Value> {
        let at = self.stack.len().saturating_sub(n);
        self.stack.split_off(at)
    }

    fn jump(&mut self, target: u32) -> Result<(), RuntimeError> {
        let target = target as usize;
        if target > self.bytecode.code.len() {
            return Err(malformed(format!("jump target {}", target)));
        }
        self.ip = target;
        Ok(())
    }

    fn name(&self, idx: u32) -> Result<&'a str, RuntimeError> {
        self.bytecode
            .names
            .get(idx as usize)
            .map(|s| s.as_str())
            .ok_or_else(|| malformed(format!("name {}", idx)))
    }

    /// Locals, globals, element contexts innermost first, builtins.
    fn resolve(&self, name: &str) -> Value {
        if let Some(v) = self.locals.get(name) {
            return v;
        }
        if let Some(v) = self.globals.get(name) {
            return v;
        }
        for context in self.elem_stack.iter().rev() {
            let v = object::elem_var(context, name);
            if !v.is_undefined() {
                return v;
            }
        }
        builtin(name).unwrap_or(Value::Undefined)
    }
}

/// Pairs up `key, value, key, value, ...`; any unhashable key makes the whole
/// literal `undefined`.
fn make_map(flat: Vec<Value>, frozen: bool) -> Value {
    let mut entries = IndexMap::new();
    let mut values = flat.into_iter();
    while let (Some(key), Some(value)) = (values.next(), values.next()) {
        match MapKey::new(key) {
            Some(key) => {
                entries.insert(key, value);
            }
            None => return Value::Undefined,
        }
    }
    if frozen {
        Value::frozen_map(entries)
    } else {
        Value::map(entries)
    }
}

fn malformed(what: String) -> RuntimeError {
    RuntimeError::MalformedBytecode(format!("invalid {}", what))
}
