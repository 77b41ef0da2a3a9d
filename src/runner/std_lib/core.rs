//! Core builtins registration.

use indexmap::IndexMap;

use crate::runner::ds::function_object::{native_value, ClassKind, Function};
use crate::runner::ds::iterator::iterator_next;
use crate::runner::ds::value::{Kind, Value};
use crate::runner::vm::bytecode::{ByteCode, OpCode};

use super::console;

/// The builtin namespace, keyed by script name.
#[derive(Default)]
pub struct Builtins {
    values: IndexMap<&'static str, Value>,
}

impl Builtins {
    pub fn new() -> Self {
        Builtins::default()
    }

    pub fn register(&mut self, name: &'static str, value: Value) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.values.keys().copied().collect()
    }
}

thread_local! {
    // Values hold `Rc`s, so each thread builds its own namespace once.
    static ITER: Value = build_iter_function();
    static BUILTINS: Builtins = {
        let mut builtins = Builtins::new();
        register_core_builtins(&mut builtins);
        builtins
    };
}

/// Register all core builtins.
pub fn register_core_builtins(builtins: &mut Builtins) {
    builtins.register("true", Value::TRUE);
    builtins.register("false", Value::FALSE);
    builtins.register("undefined", Value::Undefined);

    register_classes(builtins);
    register_iteration(builtins);
    console::register(builtins);
}

fn register_classes(builtins: &mut Builtins) {
    builtins.register("int", ClassKind::Int.into_value());
    builtins.register("float", ClassKind::Float.into_value());
    builtins.register("str", ClassKind::Str.into_value());
    builtins.register("bool", ClassKind::Bool.into_value());
    builtins.register("list", ClassKind::List.into_value());
    builtins.register("map", ClassKind::Map.into_value());
    builtins.register("date", ClassKind::Date.into_value());

    let frozen_list = ClassKind::FrozenList.into_value();
    builtins.register("frozenlist", frozen_list.clone());
    builtins.register("flist", frozen_list);
    let frozen_map = ClassKind::FrozenMap.into_value();
    builtins.register("frozenmap", frozen_map.clone());
    builtins.register("fmap", frozen_map);
}

fn register_iteration(builtins: &mut Builtins) {
    builtins.register("iter", iter_function());
    builtins.register(
        "next",
        native_value("next", |args| {
            Ok(match args.as_slice() {
                [it] => iterator_next(it),
                _ => Value::Undefined,
            })
        }),
    );
    builtins.register(
        "len",
        native_value("len", |args| {
            let len = match args.as_slice() {
                [v] => match v.kind() {
                    Some(Kind::Str(s)) => Some(s.chars().count()),
                    Some(Kind::List(items)) => Some(items.borrow().len()),
                    Some(Kind::FrozenList(items)) => Some(items.len()),
                    Some(Kind::Map(entries)) => Some(entries.borrow().len()),
                    Some(Kind::FrozenMap(entries)) => Some(entries.len()),
                    _ => None,
                },
                _ => None,
            };
            Ok(len.map_or(Value::Undefined, |n| Value::int(n as i64)))
        }),
    );
    builtins.register(
        "type",
        native_value("type", |args| {
            Ok(match args.as_slice() {
                [v] => Value::string(v.type_name()),
                _ => Value::Undefined,
            })
        }),
    );
}

/// `iter(iterable)` as a script function: `GET_VAR iterable; GET_ITER;
/// RETURN`. Every call on one thread returns the same function value, so
/// for-loops share a single constant pool entry.
pub fn iter_function() -> Value {
    ITER.with(|f| f.clone())
}

fn build_iter_function() -> Value {
    let mut bytecode = ByteCode::new();
    let param = bytecode.add_name("iterable");
    bytecode.emit_with(OpCode::GetVar, param);
    bytecode.emit_op(OpCode::GetIter);
    bytecode.emit_op(OpCode::Return);
    Value::from_kind(Kind::Function(Function::new(bytecode, vec![param])))
}

/// Looks a name up in the builtin namespace.
pub fn builtin(name: &str) -> Option<Value> {
    BUILTINS.with(|b| b.get(name))
}

pub fn builtin_names() -> Vec<&'static str> {
    BUILTINS.with(|b| b.names())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singletons_are_registered() {
        assert!(builtin("true").unwrap().is(&Value::TRUE));
        assert!(builtin("undefined").unwrap().is_undefined());
        assert!(builtin("nope").is_none());
    }

    #[test]
    fn test_iter_function_is_shared() {
        assert!(iter_function().is(&iter_function()));
        assert!(builtin("iter").unwrap().is(&iter_function()));
    }

    #[test]
    fn test_frozen_aliases() {
        assert!(builtin("flist").unwrap().is(&builtin("frozenlist").unwrap()));
        assert!(builtin("fmap").unwrap().is(&builtin("frozenmap").unwrap()));
    }
}
