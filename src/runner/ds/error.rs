use std::io;

use thiserror::Error;

/// Syntax failure or an invalid assignment target.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("compiling error: {message}")]
pub struct CompilingError {
    pub message: String,
}

impl CompilingError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        CompilingError {
            message: message.into(),
        }
    }
}

/// Failures raised by the host application behind the interop layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("{entity}.{field} is read-only")]
    ReadOnly { entity: String, field: String },
    #[error("invalid data: {0}")]
    Invalid(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("host error: {0}")]
    Host(#[from] HostError),
    #[error("instruction limit of {0} exceeded")]
    InstructionLimit(u64),
    #[error("call depth limit of {0} exceeded")]
    CallDepth(usize),
    #[error("execution cancelled")]
    Cancelled,
    #[error("malformed bytecode: {0}")]
    MalformedBytecode(String),
    #[error("output failed: {0}")]
    Output(#[from] io::Error),
}

/// Failures while reading the binary bytecode format.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEnd(usize),
    #[error("unsupported format version {0}")]
    UnsupportedVersion(i64),
    #[error("reserved integer marker at byte {0}")]
    ReservedMarker(usize),
    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),
    #[error("unknown constant tag {0}")]
    UnknownConstant(i64),
    #[error("invalid operand {operand} for {opcode}")]
    InvalidOperand { opcode: String, operand: i64 },
    #[error("invalid utf-8 in string data")]
    InvalidUtf8,
    #[error("{0} trailing bytes")]
    TrailingBytes(usize),
    #[error("functions nested deeper than {0} levels")]
    TooDeep(usize),
}

/// A constant the binary format has no tag for.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("cannot encode a {0} constant")]
    UnsupportedConstant(&'static str),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Either phase of [`crate::run_script`] failing.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Compile(#[from] CompilingError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
