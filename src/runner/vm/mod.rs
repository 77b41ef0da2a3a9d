//! Bytecode pipeline.
//!
//! ```text
//! source → parser → AST → Compiler → ByteCode → Runtime → Value
//!                                      ↕
//!                               encoding (bytes)
//! ```

pub mod bytecode;
pub mod compiler;
pub mod encoding;
pub mod interpreter;

pub use self::bytecode::{BinaryOp, ByteCode, Instruction, OpCode, UnaryOp};
pub use self::compiler::{compile, Compiler};
pub use self::encoding::{decode, encode};
pub use self::interpreter::{execute, CancelToken, Limits, OutputBuffer, Runtime};
