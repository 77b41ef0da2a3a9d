extern crate bookscript;

use std::cell::Cell;
use std::rc::Rc;

use bookscript::run_script;
use bookscript::runner::ds::error::{RuntimeError, ScriptError};
use bookscript::runner::ds::function_object::NativeFunction;
use bookscript::runner::ds::scope::Scope;
use bookscript::runner::ds::value::Value;
use bookscript::runner::vm::{compile, CancelToken, Limits, OutputBuffer, Runtime};
use bookscript::run_script_with;

fn run(code: &str) -> Value {
    run_script(code, &Scope::new()).unwrap()
}

fn run_get_var(code: &str, var_name: &str) -> Value {
    let globals = Scope::new();
    run_script(code, &globals).unwrap();
    globals.get(var_name).unwrap_or(Value::Undefined)
}

fn runtime_error(runtime: &mut Runtime, code: &str) -> RuntimeError {
    match run_script_with(runtime, code, &Scope::new()) {
        Err(ScriptError::Runtime(e)) => e,
        other => panic!("expected a runtime error, got {:?}", other.map(|v| v.to_string())),
    }
}

#[test]
fn test_return_sum() {
    assert_eq!(run("x = 2; y = 3; return x+y"), Value::int(5));
}

#[test]
fn test_falling_off_the_end() {
    assert!(run("x = 1").is_undefined());
    assert!(run("").is_undefined());
    assert!(run("return").is_undefined());
}

#[test]
fn test_assignments_land_in_globals() {
    assert_eq!(run_get_var("x = 1; x = x + 41", "x"), Value::int(42));
}

#[test]
fn test_while_loop() {
    let code = r#"
        sum = 0
        i = 0
        while i < 10 {
            sum = sum + i
            i = i + 1
        }
    "#;
    assert_eq!(run_get_var(code, "sum"), Value::int(45));
}

#[test]
fn test_for_loops() {
    assert_eq!(
        run("total = 0; for n in [1, 2, 3] { total = total + n }; return total"),
        Value::int(6)
    );
    assert_eq!(
        run("s = \"\"; for k in [\"a\": 1, \"b\": 2] { s = s + k }; return s"),
        Value::string("ab")
    );
    assert_eq!(
        run("n = 0; for c in \"hello\" { n = n + 1 }; return n"),
        Value::int(5)
    );
}

#[test]
fn test_nested_for_loops_keep_their_iterators() {
    let code = r#"
        pairs = []
        for a in [1, 2] {
            for b in [3, 4] {
                pairs.append(a * b)
            }
        }
        return pairs
    "#;
    assert_eq!(
        run(code),
        Value::list(vec![
            Value::int(3),
            Value::int(4),
            Value::int(6),
            Value::int(8)
        ])
    );
}

#[test]
fn test_for_over_non_iterable_skips_body() {
    assert_eq!(
        run("n = 0; for x in 5 { n = n + 1 }; return n"),
        Value::int(0)
    );
}

#[test]
fn test_return_inside_loop() {
    let code = r#"
        find = fn(items, wanted) {
            for item in items {
                if item == wanted { return true }
            }
            return false
        }
        return [find([1, 2, 3], 2), find([1, 2, 3], 7)]
    "#;
    assert_eq!(run(code), Value::list(vec![Value::TRUE, Value::FALSE]));
}

#[test]
fn test_functions() {
    assert_eq!(
        run("add = fn(a, b) { return a + b }; return add(1, 2)"),
        Value::int(3)
    );
    assert!(run("f = fn() { x = 1 }; return f()").is_undefined());
    assert_eq!(
        run("fact = fn(n) { if n <= 1 { return 1 }; return n * fact(n - 1) }; return fact(10)"),
        Value::int(3628800)
    );
}

#[test]
fn test_arity_mismatch_is_undefined() {
    assert!(run("add = fn(a, b) { return a + b }; return add(1)").is_undefined());
    assert!(run("add = fn(a, b) { return a + b }; return add(1, 2, 3)").is_undefined());
}

#[test]
fn test_calling_a_non_callable_is_undefined() {
    assert!(run("x = 3; return x(1)").is_undefined());
}

#[test]
fn test_functions_see_globals_not_caller_locals() {
    assert_eq!(
        run("limit = 5; f = fn() { return limit }; return f()"),
        Value::int(5)
    );
    let code = r#"
        f = fn() { return secret }
        g = fn() { secret = 1; return f() }
        return g()
    "#;
    assert!(run(code).is_undefined());
}

#[test]
fn test_function_locals_do_not_leak() {
    assert!(run_get_var("f = fn() { inner = 1 }; f()", "inner").is_undefined());
}

fn counter(globals: &Scope) -> Rc<Cell<u32>> {
    let calls = Rc::new(Cell::new(0));
    let seen = calls.clone();
    globals.set(
        "f",
        NativeFunction::new("f", move |_rt, _g, _args| {
            seen.set(seen.get() + 1);
            Ok(Value::int(9))
        })
        .into_value(),
    );
    calls
}

#[test]
fn test_short_circuit_skips_calls() {
    for (code, expected_calls, expected) in vec![
        ("return false && f()", 0, Value::FALSE),
        ("return true || f()", 0, Value::TRUE),
        ("return true && f()", 1, Value::int(9)),
        ("return 0 || f()", 1, Value::int(9)),
        ("x = 1; r = x && f() && f(); return r", 2, Value::int(9)),
    ] {
        let globals = Scope::new();
        let calls = counter(&globals);
        assert_eq!(run_script(code, &globals).unwrap(), expected, "{}", code);
        assert_eq!(calls.get(), expected_calls, "{}", code);
    }
}

#[test]
fn test_logical_operators_return_operands() {
    assert_eq!(run("return 3 && 4"), Value::int(4));
    assert_eq!(run("return undefined || 7"), Value::int(7));
    assert_eq!(run("return \"\" or \"x\""), Value::string("x"));
    assert_eq!(run("return 0 and 1"), Value::int(0));
}

#[test]
fn test_print_output_is_captured() {
    let out = OutputBuffer::new();
    let mut runtime = Runtime::new().with_output(out.clone());
    run_script_with(&mut runtime, "print(\"a\", 1); print([1, \"b\"])", &Scope::new()).unwrap();
    assert_eq!(out.contents(), "a 1\n[1, \"b\"]\n");
}

#[test]
fn test_instruction_limit() {
    let limits = Limits {
        max_instructions: Some(1000),
        ..Limits::default()
    };
    let mut runtime = Runtime::new().with_limits(limits);
    let err = runtime_error(&mut runtime, "while true {}");
    assert!(matches!(err, RuntimeError::InstructionLimit(1000)));
}

#[test]
fn test_instruction_limit_allows_short_scripts() {
    let limits = Limits {
        max_instructions: Some(1000),
        ..Limits::default()
    };
    let mut runtime = Runtime::new().with_limits(limits);
    let result = run_script_with(&mut runtime, "x = 1; return x + 1", &Scope::new()).unwrap();
    assert_eq!(result, Value::int(2));
    assert!(runtime.steps() > 0);
}

#[test]
fn test_cancellation() {
    let token = CancelToken::new();
    let mut runtime = Runtime::new().with_cancel_token(token.clone());
    let globals = Scope::new();
    let stopper = token.clone();
    globals.set(
        "stop",
        NativeFunction::new("stop", move |_rt, _g, _args| {
            stopper.cancel();
            Ok(Value::Undefined)
        })
        .into_value(),
    );
    let bytecode = compile("stop(); while true {}").unwrap();
    let err = runtime.execute(&bytecode, &globals, &globals).unwrap_err();
    assert!(matches!(err, RuntimeError::Cancelled));
    assert!(token.is_cancelled());

    token.reset();
    let bytecode = compile("return 1").unwrap();
    assert_eq!(
        runtime.execute(&bytecode, &globals, &globals).unwrap(),
        Value::int(1)
    );
}

#[test]
fn test_call_depth_limit() {
    let limits = Limits {
        max_call_depth: 32,
        ..Limits::default()
    };
    let mut runtime = Runtime::new().with_limits(limits);
    let err = runtime_error(&mut runtime, "f = fn() { return f() }; return f()");
    assert!(matches!(err, RuntimeError::CallDepth(32)));
}

#[test]
fn test_builtins_can_be_shadowed() {
    assert_eq!(run("len = 3; return len"), Value::int(3));
    assert_eq!(run("return len([1, 2])"), Value::int(2));
}

#[test]
fn test_unknown_names_are_undefined() {
    assert!(run("return nothing_here").is_undefined());
    assert!(run("return nothing_here.attr").is_undefined());
}
