use std::time::Instant;

use pest::error::{Error, ErrorVariant};
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

use super::ast::*;

#[derive(Parser)]
#[grammar = "parser/script_grammar.pest"] // relative to src
pub struct ScriptParser;

const TAB_WIDTH: usize = 2;

/// Renders the raw pest parse tree, one rule per line, indented by depth.
pub fn parse_to_token_tree(script: &str) -> Result<String, String> {
    let mut tree = vec![];
    let start = Instant::now();
    let result = ScriptParser::parse(Rule::script, script);
    let total_time = Instant::now().saturating_duration_since(start);
    eprintln!("Actual parse time is {}us", total_time.as_micros());

    match result {
        Ok(pairs) => {
            for pair in pairs {
                tree.push(pair_to_string(pair, 0).join("\n"));
            }
        }
        Err(rule) => {
            return Err(format!("Parse error due to {}", rule));
        }
    }
    Ok(tree.join("\n"))
}

fn pair_to_string(pair: Pair<Rule>, level: usize) -> Vec<String> {
    let mut tree = vec![];
    let span = pair.as_span();
    let rule_name = format!(
        "{:?} => ({},{}) #{:?}",
        pair.as_rule(),
        span.start(),
        span.end(),
        span.as_str()
    );
    let string_pads = " ".repeat(level * TAB_WIDTH);
    tree.push(format!("{}{}", string_pads, rule_name));
    for child_pair in pair.into_inner() {
        tree.append(pair_to_string(child_pair, level + 1).as_mut());
    }
    tree
}

pub fn parse_to_pairs(script: &str) -> Result<Pairs<Rule>, Error<Rule>> {
    ScriptParser::parse(Rule::script, script)
}

pub fn parse_to_ast(script: &str) -> Result<ProgramData, Error<Rule>> {
    check_bracket_depth(script)?;
    let mut pairs = ScriptParser::parse(Rule::script, script)?;
    let script_pair = match pairs.next() {
        Some(p) => p,
        None => {
            return Err(Error::new_from_pos(
                ErrorVariant::CustomError {
                    message: "Empty parse result".to_string(),
                },
                pest::Position::from_start(script),
            ))
        }
    };
    let meta = get_meta(&script_pair);
    let body = build_ast_from_statement_list(script_pair.into_inner(), 0)?;
    Ok(ProgramData { meta, body })
}

/// Brackets of any kind nested deeper than this are rejected before parsing.
pub const MAX_BRACKET_DEPTH: usize = 128;

/// Bound on the depth of the syntax tree. Every operator in a chain, every
/// unary operator and every bracket counts one level.
pub const MAX_NESTING_DEPTH: usize = 256;

fn check_bracket_depth(script: &str) -> Result<(), Error<Rule>> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut in_comment = false;
    for (at, c) in script.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            _ if in_comment => in_comment = c != '\n',
            (None, '#') => in_comment = true,
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '(') | (None, '[') | (None, '{') => {
                depth += 1;
                if depth > MAX_BRACKET_DEPTH {
                    let message = format!("Brackets nested deeper than {}", MAX_BRACKET_DEPTH);
                    let pos = pest::Position::new(script, at)
                        .unwrap_or_else(|| pest::Position::from_start(script));
                    return Err(Error::new_from_pos(ErrorVariant::CustomError { message }, pos));
                }
            }
            (None, ')') | (None, ']') | (None, '}') => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

fn check_depth(depth: usize, pair: &Pair<Rule>) -> Result<(), Error<Rule>> {
    if depth > MAX_NESTING_DEPTH {
        Err(get_custom_error(
            format!("Expression nested deeper than {}", MAX_NESTING_DEPTH),
            pair,
        ))
    } else {
        Ok(())
    }
}

/// Operator count of a `left (op right)*` chain.
fn chain_length(pair: &Pair<Rule>) -> usize {
    pair.clone().into_inner().count() / 2
}

fn get_meta(pair: &Pair<Rule>) -> Meta {
    Meta {
        start_index: pair.as_span().start(),
        end_index: pair.as_span().end(),
    }
}

fn get_unexpected_error(id: i32, pair: &Pair<Rule>) -> Error<Rule> {
    let message = format!("Unexpected state reached [{:?}] - {}", pair.as_rule(), id);
    Error::new_from_span(ErrorVariant::CustomError { message }, pair.as_span())
}

fn get_custom_error(message: String, pair: &Pair<Rule>) -> Error<Rule> {
    Error::new_from_span(ErrorVariant::CustomError { message }, pair.as_span())
}

/// Pulls the next child of `parent`, failing with a span-tagged error if the
/// tree is shorter than the grammar promises.
fn next_inner<'i>(
    id: i32,
    parent: &Pair<'i, Rule>,
    iter: &mut Pairs<'i, Rule>,
) -> Result<Pair<'i, Rule>, Error<Rule>> {
    iter.next().ok_or_else(|| get_unexpected_error(id, parent))
}

fn build_ast_from_statement_list(
    pairs: Pairs<Rule>,
    depth: usize,
) -> Result<Vec<StatementType>, Error<Rule>> {
    let mut statements = vec![];
    for pair in pairs {
        match pair.as_rule() {
            Rule::EOI => {}
            _ => statements.push(build_ast_from_statement(pair, depth)?),
        }
    }
    Ok(statements)
}

fn build_ast_from_block(pair: Pair<Rule>, depth: usize) -> Result<BlockStatementData, Error<Rule>> {
    check_depth(depth + 1, &pair)?;
    let meta = get_meta(&pair);
    Ok(BlockStatementData {
        meta,
        body: build_ast_from_statement_list(pair.into_inner(), depth + 1)?,
    })
}

fn build_ast_from_statement(pair: Pair<Rule>, depth: usize) -> Result<StatementType, Error<Rule>> {
    let depth = depth + 1;
    match pair.as_rule() {
        Rule::if_stmt => build_ast_from_if_statement(pair, depth),
        Rule::while_stmt => {
            let mut inner = pair.clone().into_inner();
            let _kw = next_inner(1, &pair, &mut inner)?;
            let test = build_ast_from_expression(next_inner(2, &pair, &mut inner)?, depth)?;
            let body = build_ast_from_block(next_inner(3, &pair, &mut inner)?, depth)?;
            Ok(StatementType::WhileStatement { test, body })
        }
        Rule::for_stmt => {
            let mut inner = pair.clone().into_inner();
            let _kw = next_inner(4, &pair, &mut inner)?;
            let variable = next_inner(5, &pair, &mut inner)?.as_str().to_string();
            let _kw_in = next_inner(6, &pair, &mut inner)?;
            let iterable = build_ast_from_expression(next_inner(7, &pair, &mut inner)?, depth)?;
            let body = build_ast_from_block(next_inner(8, &pair, &mut inner)?, depth)?;
            Ok(StatementType::ForInStatement {
                variable,
                iterable,
                body,
            })
        }
        Rule::return_stmt => {
            let mut inner = pair.into_inner();
            // first child is the keyword
            inner.next();
            Ok(StatementType::ReturnStatement(match inner.next() {
                Some(p) => Some(build_ast_from_expression(p, depth)?),
                None => None,
            }))
        }
        Rule::assign_stmt => build_ast_from_assignment(pair, depth),
        Rule::expr_stmt => {
            let mut inner = pair.clone().into_inner();
            Ok(StatementType::ExpressionStatement(build_ast_from_expression(
                next_inner(9, &pair, &mut inner)?,
                depth,
            )?))
        }
        _ => Err(get_unexpected_error(10, &pair)),
    }
}

fn build_ast_from_if_statement(pair: Pair<Rule>, depth: usize) -> Result<StatementType, Error<Rule>> {
    check_depth(depth, &pair)?;
    let mut inner = pair.clone().into_inner();
    let _kw = next_inner(11, &pair, &mut inner)?;
    let test = build_ast_from_expression(next_inner(12, &pair, &mut inner)?, depth)?;
    let consequent = build_ast_from_block(next_inner(13, &pair, &mut inner)?, depth)?;
    let alternate = match inner.next() {
        None => None,
        Some(_kw_else) => {
            let else_pair = next_inner(14, &pair, &mut inner)?;
            Some(Box::new(match else_pair.as_rule() {
                Rule::if_stmt => {
                    AlternateType::ElseIf(build_ast_from_if_statement(else_pair, depth + 1)?)
                }
                Rule::block => AlternateType::Else(build_ast_from_block(else_pair, depth)?),
                _ => return Err(get_unexpected_error(15, &else_pair)),
            }))
        }
    };
    Ok(StatementType::IfStatement {
        test,
        consequent,
        alternate,
    })
}

fn build_ast_from_assignment(pair: Pair<Rule>, depth: usize) -> Result<StatementType, Error<Rule>> {
    let mut inner = pair.clone().into_inner();
    let target_pair = next_inner(16, &pair, &mut inner)?;
    let _op = next_inner(17, &pair, &mut inner)?;
    let value = build_ast_from_expression(next_inner(18, &pair, &mut inner)?, depth)?;
    match build_ast_from_postfix(target_pair.clone(), depth)? {
        ExpressionType::Identifier(name) => Ok(StatementType::AssignVariable { name, value }),
        ExpressionType::MemberExpression { object, property } => {
            Ok(StatementType::AssignAttribute {
                object: *object,
                name: property,
                value,
            })
        }
        _ => Err(get_custom_error(
            format!("Cannot assign to {:?}", target_pair.as_str()),
            &target_pair,
        )),
    }
}

/// `depth` is how deep the resulting node may sit in the tree.
fn build_ast_from_expression(pair: Pair<Rule>, depth: usize) -> Result<ExpressionType, Error<Rule>> {
    check_depth(depth, &pair)?;
    match pair.as_rule() {
        Rule::or_expr | Rule::and_expr => build_ast_from_logical_expression(pair, depth),
        Rule::cmp_expr | Rule::sum_expr | Rule::product => {
            build_ast_from_binary_expression(pair, depth)
        }
        Rule::unary => build_ast_from_unary_expression(pair, depth),
        Rule::postfix => build_ast_from_postfix(pair, depth),
        _ => build_ast_from_primary(pair, depth),
    }
}

fn build_ast_from_logical_expression(pair: Pair<Rule>, depth: usize) -> Result<ExpressionType, Error<Rule>> {
    // the chain folds to the left, so the first operand sits deepest
    let depth = depth + chain_length(&pair);
    check_depth(depth, &pair)?;
    let mut inner = pair.clone().into_inner();
    let mut left = build_ast_from_expression(next_inner(19, &pair, &mut inner)?, depth)?;
    while let Some(op_pair) = inner.next() {
        let operator = match op_pair.as_rule() {
            Rule::or_op => LogicalOperator::Or,
            Rule::and_op => LogicalOperator::And,
            _ => return Err(get_unexpected_error(20, &op_pair)),
        };
        let right = build_ast_from_expression(next_inner(21, &pair, &mut inner)?, depth)?;
        left = ExpressionType::LogicalExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        };
    }
    Ok(left)
}

fn build_ast_from_binary_expression(pair: Pair<Rule>, depth: usize) -> Result<ExpressionType, Error<Rule>> {
    let depth = depth + chain_length(&pair);
    check_depth(depth, &pair)?;
    let mut inner = pair.clone().into_inner();
    let mut left = build_ast_from_expression(next_inner(22, &pair, &mut inner)?, depth)?;
    while let Some(op_pair) = inner.next() {
        let right = build_ast_from_expression(next_inner(23, &pair, &mut inner)?, depth)?;
        let operator = match op_pair.as_str() {
            "in" => {
                left = ExpressionType::ContainsExpression {
                    item: Box::new(left),
                    container: Box::new(right),
                };
                continue;
            }
            "+" => BinaryOperator::Add,
            "-" => BinaryOperator::Subtract,
            "*" => BinaryOperator::Multiply,
            "/" => BinaryOperator::Divide,
            ">" => BinaryOperator::GreaterThan,
            ">=" => BinaryOperator::GreaterThanEqual,
            "<" => BinaryOperator::LessThan,
            "<=" => BinaryOperator::LessThanEqual,
            "==" => BinaryOperator::Equal,
            "!=" => BinaryOperator::NotEqual,
            _ => return Err(get_unexpected_error(24, &op_pair)),
        };
        left = ExpressionType::BinaryExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        };
    }
    Ok(left)
}

fn build_ast_from_unary_expression(pair: Pair<Rule>, depth: usize) -> Result<ExpressionType, Error<Rule>> {
    let mut operators = vec![];
    let mut operand = None;
    for inner_pair in pair.clone().into_inner() {
        match inner_pair.as_rule() {
            Rule::unary_op => {
                operators.push(match inner_pair.as_str() {
                    "!" => UnaryOperator::Not,
                    "-" => UnaryOperator::Minus,
                    "+" => UnaryOperator::Plus,
                    _ => return Err(get_unexpected_error(25, &inner_pair)),
                });
                check_depth(depth + operators.len(), &inner_pair)?;
            }
            _ => {
                operand = Some(build_ast_from_expression(
                    inner_pair,
                    depth + operators.len(),
                )?)
            }
        }
    }
    let mut expression = operand.ok_or_else(|| get_unexpected_error(26, &pair))?;
    // innermost operator binds first
    for operator in operators.into_iter().rev() {
        expression = ExpressionType::UnaryExpression {
            operator,
            argument: Box::new(expression),
        };
    }
    Ok(expression)
}

fn build_ast_from_postfix(pair: Pair<Rule>, depth: usize) -> Result<ExpressionType, Error<Rule>> {
    let depth = depth + pair.clone().into_inner().count().saturating_sub(1);
    check_depth(depth, &pair)?;
    let mut inner = pair.clone().into_inner();
    let mut expression = build_ast_from_primary(next_inner(27, &pair, &mut inner)?, depth)?;
    for suffix in inner {
        expression = match suffix.as_rule() {
            Rule::call_args => ExpressionType::CallExpression {
                callee: Box::new(expression),
                arguments: suffix
                    .into_inner()
                    .map(|arg| build_ast_from_expression(arg, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?,
            },
            Rule::attr_access => {
                let mut suffix_inner = suffix.clone().into_inner();
                ExpressionType::MemberExpression {
                    object: Box::new(expression),
                    property: next_inner(28, &suffix, &mut suffix_inner)?
                        .as_str()
                        .to_string(),
                }
            }
            Rule::elem_access => {
                let mut suffix_inner = suffix.clone().into_inner();
                ExpressionType::ElementExpression {
                    object: Box::new(expression),
                    index: Box::new(build_ast_from_expression(
                        next_inner(29, &suffix, &mut suffix_inner)?,
                        depth + 1,
                    )?),
                }
            }
            _ => return Err(get_unexpected_error(30, &suffix)),
        };
    }
    Ok(expression)
}

fn build_ast_from_primary(pair: Pair<Rule>, depth: usize) -> Result<ExpressionType, Error<Rule>> {
    match pair.as_rule() {
        Rule::integer => match pair.as_str().parse::<i64>() {
            Ok(n) => Ok(ExpressionType::Literal(LiteralType::IntegerLiteral(n))),
            Err(_) => Err(get_custom_error(
                format!("Integer literal {} is out of range", pair.as_str()),
                &pair,
            )),
        },
        Rule::float => match pair.as_str().parse::<f64>() {
            Ok(f) => Ok(ExpressionType::Literal(LiteralType::FloatLiteral(f))),
            Err(_) => Err(get_unexpected_error(31, &pair)),
        },
        Rule::string => {
            let s = pair.as_str();
            Ok(ExpressionType::Literal(LiteralType::StringLiteral(
                s[1..s.len() - 1].to_string(),
            )))
        }
        Rule::identifier => Ok(ExpressionType::Identifier(pair.as_str().to_string())),
        Rule::list_lit => build_ast_from_list_literal(pair, false, depth),
        Rule::map_lit => build_ast_from_map_literal(pair, false, depth),
        Rule::frozen_collection => {
            let mut inner = pair.clone().into_inner();
            let _kw = next_inner(32, &pair, &mut inner)?;
            let collection = next_inner(33, &pair, &mut inner)?;
            match collection.as_rule() {
                Rule::list_lit => build_ast_from_list_literal(collection, true, depth),
                Rule::map_lit => build_ast_from_map_literal(collection, true, depth),
                _ => Err(get_unexpected_error(34, &collection)),
            }
        }
        Rule::func_lit => {
            let mut inner = pair.clone().into_inner();
            let _kw = next_inner(35, &pair, &mut inner)?;
            let params_pair = next_inner(36, &pair, &mut inner)?;
            let mut params: Vec<String> = vec![];
            for p in params_pair.into_inner() {
                let name = p.as_str().to_string();
                if params.contains(&name) {
                    return Err(get_custom_error(
                        format!("Duplicate parameter name {}", name),
                        &p,
                    ));
                }
                params.push(name);
            }
            let body = build_ast_from_block(next_inner(37, &pair, &mut inner)?, depth)?;
            Ok(ExpressionType::FunctionExpression { params, body })
        }
        Rule::or_expr
        | Rule::and_expr
        | Rule::cmp_expr
        | Rule::sum_expr
        | Rule::product
        | Rule::unary
        | Rule::postfix => build_ast_from_expression(pair, depth + 1),
        _ => Err(get_unexpected_error(38, &pair)),
    }
}

fn build_ast_from_list_literal(
    pair: Pair<Rule>,
    frozen: bool,
    depth: usize,
) -> Result<ExpressionType, Error<Rule>> {
    let elements = pair
        .into_inner()
        .map(|element| build_ast_from_expression(element, depth + 1))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ExpressionType::ListExpression { elements, frozen })
}

fn build_ast_from_map_literal(
    pair: Pair<Rule>,
    frozen: bool,
    depth: usize,
) -> Result<ExpressionType, Error<Rule>> {
    let mut entries = vec![];
    for map_pair in pair.into_inner() {
        let mut inner = map_pair.clone().into_inner();
        let key = build_ast_from_expression(next_inner(39, &map_pair, &mut inner)?, depth + 1)?;
        let value = build_ast_from_expression(next_inner(40, &map_pair, &mut inner)?, depth + 1)?;
        entries.push((key, value));
    }
    Ok(ExpressionType::MapExpression { entries, frozen })
}
