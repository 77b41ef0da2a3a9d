//! Runtime data structures: values, scopes, errors and the per-kind
//! attribute/element/operator protocols.

pub mod array_object;
pub mod date_object;
pub mod error;
pub mod function_object;
pub mod iterator;
pub mod map_object;
pub mod object;
pub mod operations;
pub mod scope;
pub mod string_object;
pub mod value;
