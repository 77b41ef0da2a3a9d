use crate::runner::ds::array_object::normalize_index;
use crate::runner::ds::function_object::bound_method;
use crate::runner::ds::value::Value;

/// `s[i]`: the i-th character, negative indices from the end.
pub fn get_elem(s: &str, key: &Value) -> Value {
    let i = match key.as_int() {
        Some(i) => i,
        None => return Value::Undefined,
    };
    let chars: Vec<char> = s.chars().collect();
    match normalize_index(i, chars.len()) {
        Some(idx) => Value::string(chars[idx].to_string()),
        None => Value::Undefined,
    }
}

fn text(v: &Value) -> &str {
    v.as_str().unwrap_or("")
}

pub fn get_method(s: &Value, name: &str) -> Option<Value> {
    let method = match name {
        "upper" => bound_method(name, s, |v, _args| Value::string(text(v).to_uppercase())),
        "lower" => bound_method(name, s, |v, _args| Value::string(text(v).to_lowercase())),
        "strip" => bound_method(name, s, |v, _args| Value::string(text(v).trim())),
        "split" => bound_method(name, s, |v, args| {
            let parts: Vec<Value> = match args {
                [] => text(v).split_whitespace().map(Value::string).collect(),
                [sep] => match sep.as_str() {
                    Some(sep) if !sep.is_empty() => text(v).split(sep).map(Value::string).collect(),
                    _ => return Value::Undefined,
                },
                _ => return Value::Undefined,
            };
            Value::list(parts)
        }),
        "replace" => bound_method(name, s, |v, args| match args {
            [from, to] => match (from.as_str(), to.as_str()) {
                (Some(from), Some(to)) if !from.is_empty() => {
                    Value::string(text(v).replace(from, to))
                }
                _ => Value::Undefined,
            },
            _ => Value::Undefined,
        }),
        "startswith" => bound_method(name, s, |v, args| match args {
            [prefix] => match prefix.as_str() {
                Some(p) => Value::boolean(text(v).starts_with(p)),
                None => Value::Undefined,
            },
            _ => Value::Undefined,
        }),
        "endswith" => bound_method(name, s, |v, args| match args {
            [suffix] => match suffix.as_str() {
                Some(p) => Value::boolean(text(v).ends_with(p)),
                None => Value::Undefined,
            },
            _ => Value::Undefined,
        }),
        _ => return None,
    };
    Some(method)
}
