//! Console builtins.
//!
//! `print` writes to the output of the running [`Runtime`], so hosts and
//! tests can capture it.

use crate::runner::ds::error::RuntimeError;
use crate::runner::ds::function_object::NativeFunction;
use crate::runner::ds::operations::type_conversion::to_display_string;
use crate::runner::ds::scope::Scope;
use crate::runner::ds::value::Value;
use crate::runner::vm::interpreter::Runtime;

use super::core::Builtins;

pub fn register(builtins: &mut Builtins) {
    builtins.register("print", NativeFunction::new("print", print).into_value());
}

/// Format all arguments for console output.
fn format_args(args: &[Value]) -> String {
    args.iter()
        .map(to_display_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// print - space-separated display strings followed by a newline.
fn print(runtime: &mut Runtime, _globals: &Scope, args: Vec<Value>) -> Result<Value, RuntimeError> {
    runtime.write_line(&format_args(&args))?;
    Ok(Value::Undefined)
}
