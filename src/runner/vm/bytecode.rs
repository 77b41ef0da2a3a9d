//! Bytecode instruction set and the compiled unit the compiler emits and the
//! interpreter executes.
//!
//! Opcode, operator and constant ids are part of the binary format and must
//! not be renumbered.

use std::fmt;

use crate::runner::ds::operations::type_conversion::to_repr;
use crate::runner::ds::value::{Kind, Value};

/// Bytecode opcodes for the stack-based interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// Pop one value, push the unary operation on it (operand: [`UnaryOp`] id).
    UnaryOp = 0,
    /// Pop right then left, push the binary operation (operand: [`BinaryOp`] id).
    BinaryOp = 1,
    /// Pop container then item, push whether the container holds the item.
    Contains = 2,
    /// Pop `n` arguments and the callee, push the call result (operand: `n`).
    CallFunc = 3,
    /// Pop a value and jump if it is not truthy (operand: absolute target).
    JumpOnFalse = 4,
    /// Unconditional jump (operand: absolute target).
    Jump = 5,
    /// Pop a value into a local (operand: name index).
    SetVar = 6,
    /// Pop value then object and set the attribute (operand: name index).
    SetAttr = 7,
    /// Push a variable (operand: name index).
    GetVar = 8,
    /// Push a constant (operand: constant index).
    GetConst = 9,
    /// Move the top of the stack onto the element-context stack.
    EnterElem = 10,
    /// Pop the key, pop the element context, push `context[key]`.
    GetElem = 11,
    /// Pop an object, push its attribute (operand: name index).
    GetAttr = 12,
    /// Pop `n` values into a list (operands: `n`, frozen flag).
    MakeList = 13,
    /// Pop `n` key/value pairs into a map (operands: `n`, frozen flag).
    MakeMap = 14,
    /// Empty the operand stack.
    Clear = 15,
    /// Replace the top of the stack with an iterator over it.
    GetIter = 16,
    /// Pop an iterator; push its next value or jump when exhausted
    /// (operand: absolute target).
    ForIter = 17,
    /// Return the top of the stack, or `undefined` when it is empty.
    Return = 18,
}

impl OpCode {
    pub const ALL: [OpCode; 19] = [
        OpCode::UnaryOp,
        OpCode::BinaryOp,
        OpCode::Contains,
        OpCode::CallFunc,
        OpCode::JumpOnFalse,
        OpCode::Jump,
        OpCode::SetVar,
        OpCode::SetAttr,
        OpCode::GetVar,
        OpCode::GetConst,
        OpCode::EnterElem,
        OpCode::GetElem,
        OpCode::GetAttr,
        OpCode::MakeList,
        OpCode::MakeMap,
        OpCode::Clear,
        OpCode::GetIter,
        OpCode::ForIter,
        OpCode::Return,
    ];

    pub fn from_id(id: u8) -> Option<OpCode> {
        OpCode::ALL.get(id as usize).copied()
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Number of operands the instruction carries in the binary format.
    pub fn nargs(self) -> usize {
        match self {
            OpCode::Contains
            | OpCode::EnterElem
            | OpCode::GetElem
            | OpCode::Clear
            | OpCode::GetIter
            | OpCode::Return => 0,
            OpCode::MakeList | OpCode::MakeMap => 2,
            _ => 1,
        }
    }

    pub fn is_jump(self) -> bool {
        matches!(self, OpCode::Jump | OpCode::JumpOnFalse | OpCode::ForIter)
    }

    pub fn name(self) -> &'static str {
        match self {
            OpCode::UnaryOp => "UNARY_OP",
            OpCode::BinaryOp => "BINARY_OP",
            OpCode::Contains => "CONTAINS",
            OpCode::CallFunc => "CALL_FUNC",
            OpCode::JumpOnFalse => "JUMP_ON_FALSE",
            OpCode::Jump => "JUMP",
            OpCode::SetVar => "SET_VAR",
            OpCode::SetAttr => "SET_ATTR",
            OpCode::GetVar => "GET_VAR",
            OpCode::GetConst => "GET_CONST",
            OpCode::EnterElem => "ENTER_ELEM",
            OpCode::GetElem => "GET_ELEM",
            OpCode::GetAttr => "GET_ATTR",
            OpCode::MakeList => "MAKE_LIST",
            OpCode::MakeMap => "MAKE_MAP",
            OpCode::Clear => "CLEAR",
            OpCode::GetIter => "GET_ITER",
            OpCode::ForIter => "FOR_ITER",
            OpCode::Return => "RETURN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BinaryOp {
    Add = 0,
    Sub = 1,
    Mul = 2,
    Div = 3,
    LogicalAnd = 4,
    LogicalOr = 5,
    GreaterThan = 6,
    GreaterEqual = 7,
    LessThan = 8,
    LessEqual = 9,
    Equal = 10,
    NotEqual = 11,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 12] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::LogicalAnd,
        BinaryOp::LogicalOr,
        BinaryOp::GreaterThan,
        BinaryOp::GreaterEqual,
        BinaryOp::LessThan,
        BinaryOp::LessEqual,
        BinaryOp::Equal,
        BinaryOp::NotEqual,
    ];

    pub fn from_id(id: u32) -> Option<BinaryOp> {
        BinaryOp::ALL.get(id as usize).copied()
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::LogicalAnd => "land",
            BinaryOp::LogicalOr => "lor",
            BinaryOp::GreaterThan => "gt",
            BinaryOp::GreaterEqual => "ge",
            BinaryOp::LessThan => "lt",
            BinaryOp::LessEqual => "le",
            BinaryOp::Equal => "eq",
            BinaryOp::NotEqual => "ne",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UnaryOp {
    LogicalNot = 0,
    Plus = 1,
    Minus = 2,
}

impl UnaryOp {
    pub fn from_id(id: u32) -> Option<UnaryOp> {
        match id {
            0 => Some(UnaryOp::LogicalNot),
            1 => Some(UnaryOp::Plus),
            2 => Some(UnaryOp::Minus),
            _ => None,
        }
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::LogicalNot => "lnot",
            UnaryOp::Plus => "pos",
            UnaryOp::Minus => "neg",
        }
    }
}

/// A single bytecode instruction with up to two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: OpCode,
    pub operand: u32,
    pub operand2: u32,
}

impl Instruction {
    pub fn simple(op: OpCode) -> Self {
        Instruction {
            op,
            operand: 0,
            operand2: 0,
        }
    }

    pub fn with_operand(op: OpCode, operand: u32) -> Self {
        Instruction {
            op,
            operand,
            operand2: 0,
        }
    }

    pub fn with_two_operands(op: OpCode, operand: u32, operand2: u32) -> Self {
        Instruction {
            op,
            operand,
            operand2,
        }
    }

    pub fn operands(&self) -> Vec<u32> {
        match self.op.nargs() {
            0 => vec![],
            1 => vec![self.operand],
            _ => vec![self.operand, self.operand2],
        }
    }
}

/// A compiled unit: instructions, constant pool and name pool.
#[derive(Clone, Default)]
pub struct ByteCode {
    pub code: Vec<Instruction>,
    /// Literal values and nested functions, deduplicated by kind and value.
    pub constants: Vec<Value>,
    /// Variable and attribute names, deduplicated.
    pub names: Vec<String>,
}

impl ByteCode {
    pub fn new() -> Self {
        ByteCode::default()
    }

    /// Emit an instruction and return its index.
    pub fn emit(&mut self, instr: Instruction) -> usize {
        let idx = self.code.len();
        self.code.push(instr);
        idx
    }

    pub fn emit_op(&mut self, op: OpCode) -> usize {
        self.emit(Instruction::simple(op))
    }

    pub fn emit_with(&mut self, op: OpCode, operand: u32) -> usize {
        self.emit(Instruction::with_operand(op, operand))
    }

    pub fn emit_with_two(&mut self, op: OpCode, operand: u32, operand2: u32) -> usize {
        self.emit(Instruction::with_two_operands(op, operand, operand2))
    }

    /// Add a constant to the pool, reusing an equal one of the same kind.
    /// Functions are only ever reused by identity.
    pub fn add_constant(&mut self, value: Value) -> u32 {
        for (i, existing) in self.constants.iter().enumerate() {
            if same_constant(existing, &value) {
                return i as u32;
            }
        }
        let idx = self.constants.len();
        self.constants.push(value);
        idx as u32
    }

    /// Add a name to the deduplicated name table and return its index.
    pub fn add_name(&mut self, s: &str) -> u32 {
        for (i, existing) in self.names.iter().enumerate() {
            if existing == s {
                return i as u32;
            }
        }
        let idx = self.names.len();
        self.names.push(s.to_string());
        idx as u32
    }

    #[inline]
    pub fn get_name(&self, idx: u32) -> &str {
        self.names.get(idx as usize).map(|s| s.as_str()).unwrap_or("")
    }

    /// Point the jump at `jump_idx` to the current end of the code.
    pub fn patch_jump(&mut self, jump_idx: usize) {
        self.code[jump_idx].operand = self.code.len() as u32;
    }

    pub fn patch_operand(&mut self, idx: usize, operand: u32) {
        self.code[idx].operand = operand;
    }

    pub fn current_pos(&self) -> usize {
        self.code.len()
    }

    pub fn last_op(&self) -> Option<OpCode> {
        self.code.last().map(|i| i.op)
    }

    /// Render one instruction per line with names, constants and operators
    /// resolved. Nested functions follow their parent.
    pub fn disassemble(&self, name: &str) -> String {
        let mut out = format!("== {} ==\n", name);
        let mut nested = vec![];
        for (i, instr) in self.code.iter().enumerate() {
            let mut line = format!("{:04}  {:<14}", i, instr.op.name());
            match instr.op {
                OpCode::GetVar | OpCode::SetVar | OpCode::GetAttr | OpCode::SetAttr => {
                    line.push_str(&format!("{} \"{}\"", instr.operand, self.get_name(instr.operand)));
                }
                OpCode::GetConst => {
                    let rendered = match self.constants.get(instr.operand as usize) {
                        Some(v) => {
                            if let Some(Kind::Function(_)) = v.kind() {
                                nested.push(instr.operand);
                            }
                            to_repr(v)
                        }
                        None => "?".to_string(),
                    };
                    line.push_str(&format!("{} ({})", instr.operand, rendered));
                }
                OpCode::BinaryOp => {
                    let op_name = BinaryOp::from_id(instr.operand).map_or("?", |o| o.name());
                    line.push_str(&format!("{} ({})", instr.operand, op_name));
                }
                OpCode::UnaryOp => {
                    let op_name = UnaryOp::from_id(instr.operand).map_or("?", |o| o.name());
                    line.push_str(&format!("{} ({})", instr.operand, op_name));
                }
                OpCode::Jump | OpCode::JumpOnFalse | OpCode::ForIter => {
                    line.push_str(&format!("-> {:04}", instr.operand));
                }
                OpCode::CallFunc => {
                    line.push_str(&format!("argc={}", instr.operand));
                }
                OpCode::MakeList | OpCode::MakeMap => {
                    line.push_str(&format!(
                        "count={}{}",
                        instr.operand,
                        if instr.operand2 != 0 { " frozen" } else { "" }
                    ));
                }
                _ => {}
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
        nested.sort_unstable();
        nested.dedup();
        for idx in nested {
            if let Some(Kind::Function(f)) = self.constants[idx as usize].kind() {
                out.push_str(&f.bytecode.disassemble(&format!("{} const {}", name, idx)));
            }
        }
        out
    }
}

impl fmt::Debug for ByteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.disassemble("bytecode"))
    }
}

fn same_constant(a: &Value, b: &Value) -> bool {
    match (a.kind(), b.kind()) {
        (Some(Kind::Int(x)), Some(Kind::Int(y))) => x == y,
        (Some(Kind::Float(x)), Some(Kind::Float(y))) => x.to_bits() == y.to_bits(),
        (Some(Kind::Str(x)), Some(Kind::Str(y))) => x == y,
        _ => a.is(b),
    }
}
