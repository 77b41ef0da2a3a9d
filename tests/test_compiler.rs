extern crate bookscript;

use std::cell::RefCell;
use std::rc::Rc;

use bookscript::runner::ds::function_object::native_value;
use bookscript::runner::ds::scope::Scope;
use bookscript::runner::ds::value::{Kind, Value};
use bookscript::runner::std_lib::iter_function;
use bookscript::runner::vm::{compile, BinaryOp, ByteCode, Instruction, OpCode, Runtime};

fn op(op: OpCode, operand: u32) -> Instruction {
    Instruction::with_operand(op, operand)
}

fn simple(op: OpCode) -> Instruction {
    Instruction::simple(op)
}

fn names(bc: &ByteCode) -> Vec<&str> {
    bc.names.iter().map(|n| n.as_str()).collect()
}

#[test]
fn test_assignment_of_binary_expression() {
    let bc = compile("x = a + b").unwrap();
    eprintln!("{}", bc.disassemble("test"));
    assert_eq!(
        bc.code,
        vec![
            op(OpCode::GetVar, 0),
            op(OpCode::GetVar, 1),
            op(OpCode::BinaryOp, BinaryOp::Add.id()),
            op(OpCode::SetVar, 2),
        ]
    );
    assert_eq!(names(&bc), vec!["a", "b", "x"]);
    assert!(bc.constants.is_empty());
}

#[test]
fn test_for_loop_layout() {
    let bc = compile("for x in lst{print(x)}").unwrap();
    eprintln!("{}", bc.disassemble("test"));
    assert_eq!(names(&bc), vec!["lst", "print", "x", ".for0"]);
    assert_eq!(bc.constants.len(), 1);
    assert!(bc.constants[0].is(&iter_function()));
    assert_eq!(
        bc.code,
        vec![
            op(OpCode::GetConst, 0),
            op(OpCode::GetVar, 0),
            op(OpCode::CallFunc, 1),
            op(OpCode::SetVar, 3),
            op(OpCode::GetVar, 3),
            op(OpCode::ForIter, 12),
            op(OpCode::SetVar, 2),
            op(OpCode::GetVar, 1),
            op(OpCode::GetVar, 2),
            op(OpCode::CallFunc, 1),
            simple(OpCode::Clear),
            op(OpCode::Jump, 4),
        ]
    );
}

const ELSE_IF_CHAIN: &str = "if x {a()} else if y {b()} else {c()}";

#[test]
fn test_else_if_chain_layout() {
    let bc = compile(ELSE_IF_CHAIN).unwrap();
    eprintln!("{}", bc.disassemble("test"));
    assert_eq!(names(&bc), vec!["x", "a", "y", "b", "c"]);
    assert_eq!(
        bc.code,
        vec![
            op(OpCode::GetVar, 0),
            op(OpCode::JumpOnFalse, 6),
            op(OpCode::GetVar, 1),
            op(OpCode::CallFunc, 0),
            simple(OpCode::Clear),
            op(OpCode::Jump, 15),
            op(OpCode::GetVar, 2),
            op(OpCode::JumpOnFalse, 12),
            op(OpCode::GetVar, 3),
            op(OpCode::CallFunc, 0),
            simple(OpCode::Clear),
            op(OpCode::Jump, 15),
            op(OpCode::GetVar, 4),
            op(OpCode::CallFunc, 0),
            simple(OpCode::Clear),
        ]
    );
}

#[test]
fn test_else_if_chain_runs_one_branch() {
    let bc = compile(ELSE_IF_CHAIN).unwrap();
    for (x, y, expected) in &[(true, true, "a"), (false, true, "b"), (false, false, "c")] {
        let calls = Rc::new(RefCell::new(vec![]));
        let globals = Scope::new();
        globals.set("x", Value::boolean(*x));
        globals.set("y", Value::boolean(*y));
        for name in &["a", "b", "c"] {
            let calls = calls.clone();
            let name = *name;
            globals.set(
                name,
                native_value(name, move |_args| {
                    calls.borrow_mut().push(name);
                    Ok(Value::Undefined)
                }),
            );
        }
        Runtime::new().execute(&bc, &globals, &globals).unwrap();
        assert_eq!(*calls.borrow(), vec![*expected]);
    }
}

#[test]
fn test_whitespace_and_separators_do_not_change_bytecode() {
    let compact = compile("if x{a()}else if y{b()}else{c()}").unwrap();
    let spaced = compile(
        r#"
        # pick one
        if x {
            a();
        }
        else if y {
            b()
        } else {
            c();;
        }
        "#,
    )
    .unwrap();
    assert_eq!(compact.code, spaced.code);
    assert_eq!(compact.names, spaced.names);
    assert_eq!(compact.code, compile(ELSE_IF_CHAIN).unwrap().code);
}

#[test]
fn test_constants_are_deduplicated_by_kind() {
    let bc = compile("a = 1; b = 1; c = 1.0; d = \"1\"; e = \"1\"").unwrap();
    assert_eq!(bc.constants.len(), 3);
    assert_eq!(bc.constants[0].type_name(), "int");
    assert_eq!(bc.constants[1].type_name(), "float");
    assert_eq!(bc.constants[2].type_name(), "str");
}

#[test]
fn test_function_literal_is_a_constant() {
    let bc = compile("add = fn(a, b) { return a + b }").unwrap();
    assert_eq!(
        bc.code,
        vec![op(OpCode::GetConst, 0), op(OpCode::SetVar, 0)]
    );
    assert_eq!(names(&bc), vec!["add"]);
    let function = match bc.constants[0].kind() {
        Some(Kind::Function(f)) => f,
        _ => panic!("expected a function constant"),
    };
    assert_eq!(function.params, vec![0, 1]);
    assert_eq!(function.param_names(), vec!["a", "b"]);
    assert_eq!(
        function.bytecode.code,
        vec![
            op(OpCode::GetVar, 0),
            op(OpCode::GetVar, 1),
            op(OpCode::BinaryOp, BinaryOp::Add.id()),
            simple(OpCode::Return),
        ]
    );
}

#[test]
fn test_lone_names_and_literals_emit_nothing() {
    let bc = compile("x; 1; \"s\"").unwrap();
    assert!(bc.code.is_empty());
    assert_eq!(names(&bc), vec!["x"]);
    assert_eq!(bc.constants.len(), 2);
}

#[test]
fn test_attribute_and_element_access() {
    let bc = compile("b.title = l[0]").unwrap();
    eprintln!("{}", bc.disassemble("test"));
    assert_eq!(
        bc.code,
        vec![
            op(OpCode::GetVar, 0),
            op(OpCode::GetVar, 1),
            simple(OpCode::EnterElem),
            op(OpCode::GetConst, 0),
            simple(OpCode::GetElem),
            op(OpCode::SetAttr, 2),
            simple(OpCode::Clear),
        ]
    );
    assert_eq!(names(&bc), vec!["b", "l", "title"]);
}

#[test]
fn test_collection_literals() {
    let bc = compile("a = frozen [1, 2]; m = [\"k\": 1]; e = [:]").unwrap();
    let makes: Vec<Instruction> = bc
        .code
        .iter()
        .filter(|i| i.op == OpCode::MakeList || i.op == OpCode::MakeMap)
        .cloned()
        .collect();
    assert_eq!(
        makes,
        vec![
            Instruction::with_two_operands(OpCode::MakeList, 2, 1),
            Instruction::with_two_operands(OpCode::MakeMap, 1, 0),
            Instruction::with_two_operands(OpCode::MakeMap, 0, 0),
        ]
    );
}

#[test]
fn test_compile_errors() {
    assert!(compile("x = ").is_err());
    assert!(compile("if x {").is_err());
    assert!(compile("fn = 3").is_err());
    assert!(compile("1 +* 2").is_err());
    let err = compile("while {}").unwrap_err();
    assert!(!err.to_string().is_empty());

    let err = compile(&format!("x = {}1", "-".repeat(5000))).unwrap_err();
    assert!(err.to_string().contains("nested deeper"));
    let sum = vec!["1"; 5000].join(" + ");
    assert!(compile(&format!("x = {}", sum)).is_err());
    let parens = format!("x = {}1{}", "(".repeat(20000), ")".repeat(20000));
    assert!(compile(&parens).is_err());
    let lists = format!("x = {}{}", "[".repeat(5000), "]".repeat(5000));
    assert!(compile(&lists).is_err());
    let calls = format!("x = f{}", "()".repeat(5000));
    assert!(compile(&calls).is_err());

    // ordinary nesting stays within the limits
    assert!(compile(&format!("x = {}1", "-".repeat(50))).is_ok());
    assert!(compile(&format!("x = {}", vec!["1"; 100].join(" + "))).is_ok());
    assert!(compile(&format!("x = {}1{}", "(".repeat(60), ")".repeat(60))).is_ok());
    assert!(compile("x = '((((' # [[[[\ny = 1").is_ok());
}
