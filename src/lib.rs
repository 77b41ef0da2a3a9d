//! # bookscript - embedded scripting for library records
//!
//! A small statement/expression language used to automate a library
//! application. It features:
//! - a PEG grammar (pest) producing a walk-ready AST
//! - a single-pass compiler emitting stack bytecode with back-patched jumps
//! - a compact binary encoding for compiled scripts
//! - a stack interpreter over a dynamically typed value model with
//!   reflected operator dispatch
//! - a host interop layer exposing record namespaces and UI callbacks behind
//!   attribute allow-lists
//!
//! ## Quick Start
//!
//! ```
//! use bookscript::runner::ds::scope::Scope;
//! use bookscript::runner::ds::value::Value;
//!
//! let globals = Scope::new();
//! let result = bookscript::run_script("x = 2; y = 3; return x+y", &globals).unwrap();
//! assert_eq!(result, Value::int(5));
//! ```
//!
//! ### Compiling and inspecting bytecode
//!
//! ```
//! let bytecode = bookscript::compile("x = a+b").unwrap();
//! println!("{}", bytecode.disassemble("example"));
//! assert_eq!(bytecode.names, vec!["a", "b", "x"]);
//! ```
//!
//! ### Exposing host data
//!
//! Hosts implement [`runner::plugin::types::ActionNamespace`] for each record
//! type and [`runner::plugin::types::UiCallbacks`] for user interaction, then
//! install them with [`runner::plugin::registry::HostEnvironment`]. Scripts
//! then write `Book[year > 2000 && author == "Ende"]` or
//! `ui.alert("done")`; anything outside the configured allow-lists reads as
//! `undefined`.
//!
//! ## Architecture
//!
//! - **[`parser`]** - pest grammar and AST types
//! - **[`runner`]** - value model, compiler, interpreter and host layer
//!   - **[`runner::ds`]** - values, objects, operator dispatch, scopes
//!   - **[`runner::vm`]** - bytecode, compiler, encoding, interpreter
//!   - **[`runner::plugin`]** - host interop and configuration
//!   - **[`runner::std_lib`]** - builtin namespace

#[macro_use]
extern crate lazy_static;

pub mod parser;
pub mod runner;

pub use runner::api::{compile, execute, run_script, run_script_with};
