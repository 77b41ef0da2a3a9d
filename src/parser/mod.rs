mod api;
pub mod ast;
#[allow(non_fmt_panics)]
#[cfg(test)]
mod unit_tests;

pub use api::{parse_to_ast, parse_to_pairs, parse_to_token_tree, Rule, ScriptParser};
