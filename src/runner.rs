//! Everything past the parser: the value model, the bytecode pipeline and
//! the host layer.

pub mod api;
pub mod ds;
pub mod plugin;
pub mod std_lib;
pub mod vm;
