//! Binary format for compiled scripts.
//!
//! ```text
//! bytecode  := version count instr* count const* count name*
//! instr     := opcode-byte int{nargs}
//! const     := INT int | FLOAT f64-le | STR int utf8 | FUNC int int* bytecode
//! name      := int utf8
//! ```
//!
//! Integers below 100 take one byte. Anything else is a marker byte
//! `100 + w` followed by `w` little-endian two's complement bytes, `w` being
//! the smallest signed width that holds the value. Byte 255 is reserved.

use crate::runner::ds::error::{DecodeError, EncodeError};
use crate::runner::ds::function_object::Function;
use crate::runner::ds::value::{Kind, Value};

use super::bytecode::{BinaryOp, ByteCode, Instruction, OpCode, UnaryOp};

pub const VERSION: i64 = 0;
/// Nested function literals deeper than this are rejected on decode.
pub const MAX_NESTING: usize = 64;

const SMALL_INT_LIMIT: i64 = 100;
const RESERVED_MARKER: u8 = 255;

/// Constant pool tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstType {
    Int = 0,
    Float = 1,
    Str = 2,
    Func = 3,
}

impl ConstType {
    pub fn from_id(id: i64) -> Option<ConstType> {
        match id {
            0 => Some(ConstType::Int),
            1 => Some(ConstType::Float),
            2 => Some(ConstType::Str),
            3 => Some(ConstType::Func),
            _ => None,
        }
    }

    pub fn id(self) -> i64 {
        self as i64
    }
}

pub fn encode(bytecode: &ByteCode) -> Result<Vec<u8>, EncodeError> {
    let mut out = vec![];
    write_bytecode(&mut out, bytecode)?;
    Ok(out)
}

pub fn decode(data: &[u8]) -> Result<ByteCode, DecodeError> {
    let mut reader = Reader { data, pos: 0 };
    let bytecode = reader.read_bytecode(0)?;
    match data.len() - reader.pos {
        0 => Ok(bytecode),
        rest => Err(DecodeError::TrailingBytes(rest)),
    }
}

// ── Writing ──────────────────────────────────────────────

fn signed_width(n: i64) -> usize {
    for w in 1..8 {
        let bits = 8 * w as u32;
        let min = -(1i64 << (bits - 1));
        let max = (1i64 << (bits - 1)) - 1;
        if n >= min && n <= max {
            return w;
        }
    }
    8
}

fn write_int(out: &mut Vec<u8>, n: i64) {
    if (0..SMALL_INT_LIMIT).contains(&n) {
        out.push(n as u8);
        return;
    }
    let w = signed_width(n);
    out.push(SMALL_INT_LIMIT as u8 + w as u8);
    out.extend_from_slice(&n.to_le_bytes()[..w]);
}

fn write_str(out: &mut Vec<u8>, s: &str) {
    write_int(out, s.len() as i64);
    out.extend_from_slice(s.as_bytes());
}

fn write_bytecode(out: &mut Vec<u8>, bytecode: &ByteCode) -> Result<(), EncodeError> {
    write_int(out, VERSION);

    write_int(out, bytecode.code.len() as i64);
    for instr in &bytecode.code {
        out.push(instr.op.id());
        for operand in instr.operands() {
            write_int(out, operand as i64);
        }
    }

    write_int(out, bytecode.constants.len() as i64);
    for constant in &bytecode.constants {
        match constant.kind() {
            Some(Kind::Int(n)) => {
                write_int(out, ConstType::Int.id());
                write_int(out, *n);
            }
            Some(Kind::Float(f)) => {
                write_int(out, ConstType::Float.id());
                out.extend_from_slice(&f.to_le_bytes());
            }
            Some(Kind::Str(s)) => {
                write_int(out, ConstType::Str.id());
                write_str(out, s);
            }
            Some(Kind::Function(function)) => {
                write_int(out, ConstType::Func.id());
                write_int(out, function.params.len() as i64);
                for param in &function.params {
                    write_int(out, *param as i64);
                }
                write_bytecode(out, &function.bytecode)?;
            }
            _ => return Err(EncodeError::UnsupportedConstant(constant.type_name())),
        }
    }

    write_int(out, bytecode.names.len() as i64);
    for name in &bytecode.names {
        write_str(out, name);
    }
    Ok(())
}

// ── Reading ──────────────────────────────────────────────

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or(DecodeError::UnexpectedEnd(self.data.len()))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_byte(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn read_int(&mut self) -> Result<i64, DecodeError> {
        let at = self.pos;
        let first = self.read_byte()?;
        if (first as i64) < SMALL_INT_LIMIT {
            return Ok(first as i64);
        }
        let w = (first - SMALL_INT_LIMIT as u8) as usize;
        if first == RESERVED_MARKER || w == 0 || w > 8 {
            return Err(DecodeError::ReservedMarker(at));
        }
        let bytes = self.take(w)?;
        let fill = if bytes[w - 1] & 0x80 != 0 { 0xff } else { 0 };
        let mut buf = [fill; 8];
        buf[..w].copy_from_slice(bytes);
        Ok(i64::from_le_bytes(buf))
    }

    /// An element count. Every element takes at least one byte, so counts
    /// beyond the remaining input are truncation.
    fn read_count(&mut self) -> Result<usize, DecodeError> {
        let n = self.read_int()?;
        if n < 0 || n as u64 > (self.data.len() - self.pos) as u64 {
            return Err(DecodeError::UnexpectedEnd(self.data.len()));
        }
        Ok(n as usize)
    }

    fn read_str(&mut self) -> Result<String, DecodeError> {
        let len = self.read_count()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
    }

    fn read_operand(&mut self, op: OpCode) -> Result<u32, DecodeError> {
        let n = self.read_int()?;
        if n < 0 || n > u32::MAX as i64 {
            return Err(invalid_operand(op, n));
        }
        Ok(n as u32)
    }

    fn read_bytecode(&mut self, depth: usize) -> Result<ByteCode, DecodeError> {
        if depth > MAX_NESTING {
            return Err(DecodeError::TooDeep(MAX_NESTING));
        }
        let version = self.read_int()?;
        if version != VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }

        let mut bytecode = ByteCode::new();
        let count = self.read_count()?;
        for _ in 0..count {
            let id = self.read_byte()?;
            let op = OpCode::from_id(id).ok_or(DecodeError::UnknownOpcode(id))?;
            let mut instr = Instruction::simple(op);
            if op.nargs() >= 1 {
                instr.operand = self.read_operand(op)?;
            }
            if op.nargs() >= 2 {
                instr.operand2 = self.read_operand(op)?;
            }
            bytecode.code.push(instr);
        }

        let count = self.read_count()?;
        for _ in 0..count {
            let constant = self.read_constant(depth)?;
            bytecode.constants.push(constant);
        }

        let count = self.read_count()?;
        for _ in 0..count {
            let name = self.read_str()?;
            bytecode.names.push(name);
        }

        validate(&bytecode)?;
        Ok(bytecode)
    }

    fn read_constant(&mut self, depth: usize) -> Result<Value, DecodeError> {
        let tag = self.read_int()?;
        let value = match ConstType::from_id(tag).ok_or(DecodeError::UnknownConstant(tag))? {
            ConstType::Int => Value::int(self.read_int()?),
            ConstType::Float => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(self.take(8)?);
                Value::float(f64::from_le_bytes(buf))
            }
            ConstType::Str => Value::string(self.read_str()?),
            ConstType::Func => {
                let count = self.read_count()?;
                let mut params = Vec::with_capacity(count);
                for _ in 0..count {
                    params.push(self.read_int()?);
                }
                let body = self.read_bytecode(depth + 1)?;
                let mut checked = Vec::with_capacity(params.len());
                for param in params {
                    if param < 0 || param as u64 >= body.names.len() as u64 {
                        return Err(DecodeError::InvalidOperand {
                            opcode: "FUNC".to_string(),
                            operand: param,
                        });
                    }
                    checked.push(param as u32);
                }
                Value::from_kind(Kind::Function(Function::new(body, checked)))
            }
        };
        Ok(value)
    }
}

fn invalid_operand(op: OpCode, operand: i64) -> DecodeError {
    DecodeError::InvalidOperand {
        opcode: op.name().to_string(),
        operand,
    }
}

/// Checks every operand against the pools, operator tables and code length,
/// so the interpreter never sees an out-of-range index from a decoded file.
fn validate(bytecode: &ByteCode) -> Result<(), DecodeError> {
    let code_len = bytecode.code.len();
    for instr in &bytecode.code {
        let operand = instr.operand as usize;
        let ok = match instr.op {
            OpCode::GetVar | OpCode::SetVar | OpCode::GetAttr | OpCode::SetAttr => {
                operand < bytecode.names.len()
            }
            OpCode::GetConst => operand < bytecode.constants.len(),
            OpCode::BinaryOp => BinaryOp::from_id(instr.operand).is_some(),
            OpCode::UnaryOp => UnaryOp::from_id(instr.operand).is_some(),
            OpCode::Jump | OpCode::JumpOnFalse | OpCode::ForIter => operand <= code_len,
            OpCode::MakeList | OpCode::MakeMap => instr.operand2 <= 1,
            _ => true,
        };
        if !ok {
            return Err(invalid_operand(instr.op, instr.operand as i64));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_bytes(n: i64) -> Vec<u8> {
        let mut out = vec![];
        write_int(&mut out, n);
        out
    }

    #[test]
    fn test_small_ints_take_one_byte() {
        assert_eq!(int_bytes(0), vec![0]);
        assert_eq!(int_bytes(99), vec![99]);
        assert_eq!(int_bytes(100), vec![101, 100]);
        assert_eq!(int_bytes(-1), vec![101, 0xff]);
        assert_eq!(int_bytes(128), vec![102, 0x80, 0x00]);
        assert_eq!(int_bytes(i64::MIN).len(), 9);
    }

    #[test]
    fn test_int_widths_read_back() {
        for n in &[0, 99, 100, 127, 128, -128, -129, 65535, i64::MAX, i64::MIN] {
            let bytes = int_bytes(*n);
            let mut reader = Reader {
                data: &bytes,
                pos: 0,
            };
            assert_eq!(reader.read_int().unwrap(), *n);
        }
    }

    #[test]
    fn test_reserved_marker_rejected() {
        let mut reader = Reader {
            data: &[255],
            pos: 0,
        };
        assert_eq!(reader.read_int(), Err(DecodeError::ReservedMarker(0)));
    }
}
