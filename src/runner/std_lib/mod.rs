//! Builtin namespace.
//!
//! Names resolved after locals, globals and element contexts: the `true`,
//! `false` and `undefined` singletons, the builtin classes, iteration helpers
//! and console output.

pub mod console;
pub mod core;

pub use self::core::{builtin, builtin_names, iter_function, register_core_builtins, Builtins};
