use super::api::{parse_to_ast, Rule, ScriptParser, MAX_BRACKET_DEPTH, MAX_NESTING_DEPTH};
use super::ast::*;

use pest::consumes_to;
use pest::error::LineColLocation;
use pest::fails_with;
use pest::parses_to;

#[test]
fn test_integer() {
    parses_to! {
        parser: ScriptParser,
        input: "10",
        rule: Rule::integer,
        tokens: [
            integer(0, 2)
        ]
    };
}

#[test]
fn test_float() {
    parses_to! {
        parser: ScriptParser,
        input: "10.25",
        rule: Rule::float,
        tokens: [
            float(0, 5)
        ]
    };
}

#[test]
fn test_single_quoted_string() {
    parses_to! {
        parser: ScriptParser,
        input: "'it \"is\"'",
        rule: Rule::string,
        tokens: [
            string(0, 9)
        ]
    };
}

#[test]
fn test_identifier_with_keyword_prefix() {
    parses_to! {
        parser: ScriptParser,
        input: "format_1",
        rule: Rule::identifier,
        tokens: [
            identifier(0, 8)
        ]
    };
}

#[test]
fn test_keyword_is_not_identifier() {
    fails_with! {
        parser: ScriptParser,
        input: "for",
        rule: Rule::identifier,
        positives: vec![Rule::identifier],
        negatives: vec![],
        pos: 0
    };
}

#[test]
fn test_contains_operator() {
    parses_to! {
        parser: ScriptParser,
        input: "a in b",
        rule: Rule::cmp_expr,
        tokens: [
            cmp_expr(0, 6, [
                sum_expr(0, 1, [product(0, 1, [unary(0, 1, [postfix(0, 1, [identifier(0, 1)])])])]),
                cmp_op(2, 4, [kw_in(2, 4)]),
                sum_expr(5, 6, [product(5, 6, [unary(5, 6, [postfix(5, 6, [identifier(5, 6)])])])])
            ])
        ]
    };
}

#[test]
fn test_postfix_chain() {
    parses_to! {
        parser: ScriptParser,
        input: "a.b(c)[0]",
        rule: Rule::postfix,
        tokens: [
            postfix(0, 9, [
                identifier(0, 1),
                attr_access(1, 3, [identifier(2, 3)]),
                call_args(3, 6, [
                    or_expr(4, 5, [and_expr(4, 5, [cmp_expr(4, 5, [sum_expr(4, 5, [product(4, 5, [unary(4, 5, [postfix(4, 5, [identifier(4, 5)])])])])])])])
                ]),
                elem_access(6, 9, [
                    or_expr(7, 8, [and_expr(7, 8, [cmp_expr(7, 8, [sum_expr(7, 8, [product(7, 8, [unary(7, 8, [postfix(7, 8, [integer(7, 8)])])])])])])])
                ])
            ])
        ]
    };
}

fn ident(name: &str) -> ExpressionType {
    ExpressionType::Identifier(name.to_string())
}

fn first_statement(script: &str) -> StatementType {
    parse_to_ast(script).unwrap().body.remove(0)
}

#[test]
fn test_assignment_ast() {
    assert_eq!(
        first_statement("x = a + b"),
        StatementType::AssignVariable {
            name: "x".to_string(),
            value: ExpressionType::BinaryExpression {
                operator: BinaryOperator::Add,
                left: Box::new(ident("a")),
                right: Box::new(ident("b")),
            }
        }
    );
}

#[test]
fn test_attribute_assignment_ast() {
    assert_eq!(
        first_statement("book.title = 'Momo'"),
        StatementType::AssignAttribute {
            object: ident("book"),
            name: "title".to_string(),
            value: ExpressionType::Literal(LiteralType::StringLiteral("Momo".to_string())),
        }
    );
}

#[test]
fn test_invalid_assignment_target() {
    assert!(parse_to_ast("f() = 1").is_err());
    assert!(parse_to_ast("a[0] = 1").is_err());
}

#[test]
fn test_precedence() {
    // a || b && c == d + e * f
    let expected = ExpressionType::LogicalExpression {
        operator: LogicalOperator::Or,
        left: Box::new(ident("a")),
        right: Box::new(ExpressionType::LogicalExpression {
            operator: LogicalOperator::And,
            left: Box::new(ident("b")),
            right: Box::new(ExpressionType::BinaryExpression {
                operator: BinaryOperator::Equal,
                left: Box::new(ident("c")),
                right: Box::new(ExpressionType::BinaryExpression {
                    operator: BinaryOperator::Add,
                    left: Box::new(ident("d")),
                    right: Box::new(ExpressionType::BinaryExpression {
                        operator: BinaryOperator::Multiply,
                        left: Box::new(ident("e")),
                        right: Box::new(ident("f")),
                    }),
                }),
            }),
        }),
    };
    assert_eq!(
        first_statement("a || b && c == d + e * f"),
        StatementType::ExpressionStatement(expected)
    );
}

#[test]
fn test_word_operators() {
    assert_eq!(
        first_statement("a and b"),
        first_statement("a && b"),
    );
    assert_eq!(first_statement("a or b"), first_statement("a || b"));
}

#[test]
fn test_stacked_unary() {
    assert_eq!(
        first_statement("!-x"),
        StatementType::ExpressionStatement(ExpressionType::UnaryExpression {
            operator: UnaryOperator::Not,
            argument: Box::new(ExpressionType::UnaryExpression {
                operator: UnaryOperator::Minus,
                argument: Box::new(ident("x")),
            }),
        })
    );
}

#[test]
fn test_collections() {
    assert_eq!(
        first_statement("[:]"),
        StatementType::ExpressionStatement(ExpressionType::MapExpression {
            entries: vec![],
            frozen: false
        })
    );
    assert_eq!(
        first_statement("frozen [1, 2,]"),
        StatementType::ExpressionStatement(ExpressionType::ListExpression {
            elements: vec![
                ExpressionType::Literal(LiteralType::IntegerLiteral(1)),
                ExpressionType::Literal(LiteralType::IntegerLiteral(2)),
            ],
            frozen: true
        })
    );
    match first_statement("['a': 1]") {
        StatementType::ExpressionStatement(ExpressionType::MapExpression { entries, frozen }) => {
            assert!(!frozen);
            assert_eq!(entries.len(), 1);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_else_if_chain() {
    match first_statement("if x {a()} else if y {b()} else {c()}") {
        StatementType::IfStatement { alternate, .. } => match alternate.map(|a| *a) {
            Some(AlternateType::ElseIf(StatementType::IfStatement { alternate, .. })) => {
                assert!(matches!(
                    alternate.map(|a| *a),
                    Some(AlternateType::Else(_))
                ));
            }
            other => panic!("unexpected {:?}", other),
        },
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_statement_separators() {
    let program = parse_to_ast(";;x = 1; y = 2\nz = 3;;").unwrap();
    assert_eq!(program.body.len(), 3);
}

#[test]
fn test_comments_and_return() {
    let program = parse_to_ast("# leading comment\nreturn # trailing\n").unwrap();
    assert_eq!(program.body, vec![StatementType::ReturnStatement(None)]);
}

#[test]
fn test_function_literal() {
    match first_statement("f = fn(a, b) { return a }") {
        StatementType::AssignVariable {
            value: ExpressionType::FunctionExpression { params, body },
            ..
        } => {
            assert_eq!(params, vec!["a".to_string(), "b".to_string()]);
            assert_eq!(body.body.len(), 1);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(parse_to_ast("fn(a, a) {}").is_err());
}

#[test]
fn test_integer_overflow_is_error() {
    assert!(parse_to_ast("x = 99999999999999999999").is_err());
}

#[test]
fn test_syntax_error() {
    assert!(parse_to_ast("x = ").is_err());
    assert!(parse_to_ast("if x { y").is_err());
}

#[test]
fn test_nesting_limits_point_at_the_offending_line() {
    let unary = format!("x = 1\ny = {}1", "!".repeat(MAX_NESTING_DEPTH + 1));
    let err = parse_to_ast(&unary).unwrap_err();
    assert!(err.to_string().contains("nested deeper"));
    assert!(matches!(err.line_col, LineColLocation::Span((2, _), _)));

    let brackets = format!("x = 1\n\ny = {}", "[".repeat(MAX_BRACKET_DEPTH + 1));
    let err = parse_to_ast(&brackets).unwrap_err();
    assert!(matches!(err.line_col, LineColLocation::Pos((3, _))));

    let chain = vec!["a"; MAX_NESTING_DEPTH + 2].join(" or ");
    assert!(parse_to_ast(&chain).is_err());
    let elifs: String = (0..MAX_NESTING_DEPTH + 1)
        .map(|i| format!("if a{} {{}} else ", i))
        .collect::<String>()
        + "{}";
    assert!(parse_to_ast(&elifs).is_err());
    assert!(parse_to_ast("if a {} else if b {} else if c {} else {}").is_ok());
}
