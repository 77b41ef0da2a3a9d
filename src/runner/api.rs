//! Entry points: compile source text, execute bytecode, or both at once.

use crate::runner::ds::error::ScriptError;
use crate::runner::ds::scope::Scope;
use crate::runner::ds::value::Value;
use crate::runner::vm::interpreter::Runtime;

pub use crate::runner::vm::compiler::compile;
pub use crate::runner::vm::interpreter::execute;

/// Compiles and runs `source` at top level, where the globals scope also
/// serves as the locals: assignments land in `globals`.
pub fn run_script(source: &str, globals: &Scope) -> Result<Value, ScriptError> {
    run_script_with(&mut Runtime::new(), source, globals)
}

/// Like [`run_script`], with the caller's limits, cancel token and output.
pub fn run_script_with(
    runtime: &mut Runtime,
    source: &str,
    globals: &Scope,
) -> Result<Value, ScriptError> {
    let bytecode = compile(source)?;
    Ok(runtime.execute(&bytecode, globals, globals)?)
}
