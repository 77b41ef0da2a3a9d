//! AST-to-bytecode compiler.
//!
//! Walks the AST once and emits stack bytecode. Forward jumps are emitted
//! with a placeholder operand and back-patched through the index returned at
//! emission time; every jump target is an absolute instruction index.

use std::mem;

use crate::parser::ast::{
    AlternateType, BinaryOperator, BlockStatementData, ExpressionType, LiteralType,
    LogicalOperator, ProgramData, StatementType, UnaryOperator,
};
use crate::parser::parse_to_ast;
use crate::runner::ds::error::CompilingError;
use crate::runner::ds::function_object::Function;
use crate::runner::ds::value::{Kind, Value};
use crate::runner::std_lib::core::iter_function;

use super::bytecode::{BinaryOp, ByteCode, OpCode, UnaryOp};

/// Parses and compiles a whole script.
pub fn compile(source: &str) -> Result<ByteCode, CompilingError> {
    let program = parse_to_ast(source).map_err(|e| CompilingError::new(e.to_string()))?;
    Ok(Compiler::new().compile_program(&program))
}

/// The bytecode compiler. One instance compiles one script; function
/// literals swap in a fresh [`ByteCode`] while their body is compiled.
pub struct Compiler {
    bytecode: ByteCode,
    /// Nesting depth of element index expressions being compiled.
    elem_depth: usize,
    /// Nesting depth of short-circuit logical operators being compiled.
    logical_depth: usize,
    /// Position the most recently patched forward jump lands on.
    jump_target: Option<usize>,
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Compiler {
            bytecode: ByteCode::new(),
            elem_depth: 0,
            logical_depth: 0,
            jump_target: None,
        }
    }

    pub fn compile_program(mut self, program: &ProgramData) -> ByteCode {
        self.compile_statements(&program.body);
        self.bytecode
    }

    // ── Statements ───────────────────────────────────────────

    fn compile_statements(&mut self, body: &[StatementType]) {
        for stmt in body {
            self.compile_statement(stmt);
        }
    }

    fn compile_block(&mut self, block: &BlockStatementData) {
        self.compile_statements(&block.body);
    }

    fn compile_statement(&mut self, stmt: &StatementType) {
        match stmt {
            StatementType::ExpressionStatement(expr) => {
                self.compile_expression(expr);
                self.finish_statement();
            }
            StatementType::AssignVariable { name, value } => {
                self.compile_expression(value);
                let idx = self.bytecode.add_name(name);
                self.bytecode.emit_with(OpCode::SetVar, idx);
                self.finish_statement();
            }
            StatementType::AssignAttribute {
                object,
                name,
                value,
            } => {
                self.compile_expression(object);
                self.compile_expression(value);
                let idx = self.bytecode.add_name(name);
                self.bytecode.emit_with(OpCode::SetAttr, idx);
                self.finish_statement();
            }
            StatementType::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                self.compile_if(test, consequent, alternate.as_deref());
            }
            StatementType::WhileStatement { test, body } => {
                self.compile_while(test, body);
            }
            StatementType::ForInStatement {
                variable,
                iterable,
                body,
            } => {
                self.compile_for_in(variable, iterable, body);
            }
            StatementType::ReturnStatement(argument) => {
                if let Some(expr) = argument {
                    self.compile_expression(expr);
                }
                self.bytecode.emit_op(OpCode::Return);
            }
        }
    }

    /// Keeps the operand stack statement-local. A trailing pure push is
    /// dropped, a trailing control instruction already leaves the stack
    /// balanced, anything else gets a CLEAR.
    fn finish_statement(&mut self) {
        let jump_lands_at_end = self.jump_target == Some(self.bytecode.current_pos());
        match self.bytecode.last_op() {
            None => {}
            Some(OpCode::GetVar) | Some(OpCode::GetConst) if !jump_lands_at_end => {
                self.bytecode.code.pop();
            }
            Some(OpCode::JumpOnFalse)
            | Some(OpCode::SetVar)
            | Some(OpCode::Jump)
            | Some(OpCode::Clear) => {}
            Some(_) => {
                self.bytecode.emit_op(OpCode::Clear);
            }
        }
    }

    // ── Control flow ─────────────────────────────────────────

    /// Points a forward jump at the next instruction to be emitted.
    fn patch_jump(&mut self, jump_idx: usize) {
        self.bytecode.patch_jump(jump_idx);
        self.jump_target = Some(self.bytecode.current_pos());
    }

    fn compile_if(
        &mut self,
        test: &ExpressionType,
        consequent: &BlockStatementData,
        alternate: Option<&AlternateType>,
    ) {
        self.compile_expression(test);
        let jump_to_else = self.bytecode.emit_with(OpCode::JumpOnFalse, 0);

        self.compile_block(consequent);

        if let Some(alt) = alternate {
            let jump_over_else = self.bytecode.emit_with(OpCode::Jump, 0);
            self.patch_jump(jump_to_else);
            match alt {
                AlternateType::ElseIf(stmt) => self.compile_statement(stmt),
                AlternateType::Else(block) => self.compile_block(block),
            }
            self.patch_jump(jump_over_else);
        } else {
            self.patch_jump(jump_to_else);
        }
    }

    fn compile_while(&mut self, test: &ExpressionType, body: &BlockStatementData) {
        let loop_start = self.bytecode.current_pos();
        self.compile_expression(test);
        let exit_jump = self.bytecode.emit_with(OpCode::JumpOnFalse, 0);

        self.compile_block(body);

        self.bytecode.emit_with(OpCode::Jump, loop_start as u32);
        self.patch_jump(exit_jump);
    }

    /// `for x in e {body}` becomes
    /// `iter(e)` stored in a hidden local, then a FOR_ITER loop over it.
    /// The hidden name is `.forN` with `N` the number of loops nested in the
    /// body, so enclosing loops never share it. Both names are registered
    /// after the body and patched in.
    fn compile_for_in(
        &mut self,
        variable: &str,
        iterable: &ExpressionType,
        body: &BlockStatementData,
    ) {
        let iter_idx = self.bytecode.add_constant(iter_function());
        self.bytecode.emit_with(OpCode::GetConst, iter_idx);
        self.compile_expression(iterable);
        self.bytecode.emit_with(OpCode::CallFunc, 1);
        let store_hidden = self.bytecode.emit_with(OpCode::SetVar, 0);

        let loop_head = self.bytecode.emit_with(OpCode::GetVar, 0);
        let for_iter = self.bytecode.emit_with(OpCode::ForIter, 0);
        let store_var = self.bytecode.emit_with(OpCode::SetVar, 0);

        let body_start = self.bytecode.current_pos();
        self.compile_block(body);
        let nested = self.bytecode.code[body_start..]
            .iter()
            .filter(|i| i.op == OpCode::ForIter)
            .count();

        self.bytecode.emit_with(OpCode::Jump, loop_head as u32);
        self.patch_jump(for_iter);

        let hidden_idx = self.bytecode.add_name(&format!(".for{}", nested));
        let var_idx = self.bytecode.add_name(variable);
        self.bytecode.patch_operand(store_hidden, hidden_idx);
        self.bytecode.patch_operand(loop_head, hidden_idx);
        self.bytecode.patch_operand(store_var, var_idx);
    }

    // ── Expressions ──────────────────────────────────────────

    fn compile_expression(&mut self, expr: &ExpressionType) {
        match expr {
            ExpressionType::Literal(lit) => self.compile_literal(lit),
            ExpressionType::Identifier(name) => {
                let idx = self.bytecode.add_name(name);
                self.bytecode.emit_with(OpCode::GetVar, idx);
            }
            ExpressionType::ListExpression { elements, frozen } => {
                for element in elements {
                    self.compile_expression(element);
                }
                self.bytecode
                    .emit_with_two(OpCode::MakeList, elements.len() as u32, *frozen as u32);
            }
            ExpressionType::MapExpression { entries, frozen } => {
                for (key, value) in entries {
                    self.compile_expression(key);
                    self.compile_expression(value);
                }
                self.bytecode
                    .emit_with_two(OpCode::MakeMap, entries.len() as u32, *frozen as u32);
            }
            ExpressionType::FunctionExpression { params, body } => {
                self.compile_function(params, body);
            }
            ExpressionType::UnaryExpression { operator, argument } => {
                self.compile_expression(argument);
                let op = match operator {
                    UnaryOperator::Not => UnaryOp::LogicalNot,
                    UnaryOperator::Plus => UnaryOp::Plus,
                    UnaryOperator::Minus => UnaryOp::Minus,
                };
                self.bytecode.emit_with(OpCode::UnaryOp, op.id());
            }
            ExpressionType::BinaryExpression {
                operator,
                left,
                right,
            } => {
                self.compile_expression(left);
                self.compile_expression(right);
                self.bytecode
                    .emit_with(OpCode::BinaryOp, binary_op(*operator).id());
            }
            ExpressionType::LogicalExpression {
                operator,
                left,
                right,
            } => self.compile_logical(*operator, left, right),
            ExpressionType::ContainsExpression { item, container } => {
                self.compile_expression(item);
                self.compile_expression(container);
                self.bytecode.emit_op(OpCode::Contains);
            }
            ExpressionType::CallExpression { callee, arguments } => {
                self.compile_expression(callee);
                for arg in arguments {
                    self.compile_expression(arg);
                }
                self.bytecode
                    .emit_with(OpCode::CallFunc, arguments.len() as u32);
            }
            ExpressionType::MemberExpression { object, property } => {
                self.compile_expression(object);
                let idx = self.bytecode.add_name(property);
                self.bytecode.emit_with(OpCode::GetAttr, idx);
            }
            ExpressionType::ElementExpression { object, index } => {
                self.compile_expression(object);
                self.bytecode.emit_op(OpCode::EnterElem);
                self.elem_depth += 1;
                self.compile_expression(index);
                self.elem_depth -= 1;
                self.bytecode.emit_op(OpCode::GetElem);
            }
        }
    }

    fn compile_literal(&mut self, lit: &LiteralType) {
        let value = match lit {
            LiteralType::IntegerLiteral(n) => Value::int(*n),
            LiteralType::FloatLiteral(f) => Value::float(*f),
            LiteralType::StringLiteral(s) => Value::string(s.as_str()),
        };
        let idx = self.bytecode.add_constant(value);
        self.bytecode.emit_with(OpCode::GetConst, idx);
    }

    /// `&&` and `||`. Operands without calls are evaluated eagerly through
    /// the value-level `land`/`lor`, as are operands inside an element index
    /// where they combine search queries. Otherwise the right operand only
    /// runs when needed; the left value is kept in a hidden local.
    fn compile_logical(
        &mut self,
        operator: LogicalOperator,
        left: &ExpressionType,
        right: &ExpressionType,
    ) {
        let op = match operator {
            LogicalOperator::And => BinaryOp::LogicalAnd,
            LogicalOperator::Or => BinaryOp::LogicalOr,
        };
        if self.elem_depth > 0 || !right.contains_call() {
            self.compile_expression(left);
            self.compile_expression(right);
            self.bytecode.emit_with(OpCode::BinaryOp, op.id());
            return;
        }

        self.compile_expression(left);
        let hidden = self
            .bytecode
            .add_name(&format!(".sc{}", self.logical_depth));
        self.logical_depth += 1;
        self.bytecode.emit_with(OpCode::SetVar, hidden);
        self.bytecode.emit_with(OpCode::GetVar, hidden);
        let branch = self.bytecode.emit_with(OpCode::JumpOnFalse, 0);
        match operator {
            LogicalOperator::And => {
                self.compile_expression(right);
                let to_end = self.bytecode.emit_with(OpCode::Jump, 0);
                self.patch_jump(branch);
                self.bytecode.emit_with(OpCode::GetVar, hidden);
                self.patch_jump(to_end);
            }
            LogicalOperator::Or => {
                self.bytecode.emit_with(OpCode::GetVar, hidden);
                let to_end = self.bytecode.emit_with(OpCode::Jump, 0);
                self.patch_jump(branch);
                self.compile_expression(right);
                self.patch_jump(to_end);
            }
        }
        self.logical_depth -= 1;
    }

    /// Compiles the body into its own [`ByteCode`] and pushes the resulting
    /// function as a constant of the enclosing one.
    fn compile_function(&mut self, params: &[String], body: &BlockStatementData) {
        let enclosing = mem::replace(&mut self.bytecode, ByteCode::new());
        let elem_depth = mem::replace(&mut self.elem_depth, 0);
        let logical_depth = mem::replace(&mut self.logical_depth, 0);
        let jump_target = self.jump_target.take();

        let param_idxs: Vec<u32> = params.iter().map(|p| self.bytecode.add_name(p)).collect();
        self.compile_block(body);

        let function_code = mem::replace(&mut self.bytecode, enclosing);
        self.elem_depth = elem_depth;
        self.logical_depth = logical_depth;
        self.jump_target = jump_target;

        let function = Value::from_kind(Kind::Function(Function::new(function_code, param_idxs)));
        let idx = self.bytecode.add_constant(function);
        self.bytecode.emit_with(OpCode::GetConst, idx);
    }
}

fn binary_op(operator: BinaryOperator) -> BinaryOp {
    match operator {
        BinaryOperator::Add => BinaryOp::Add,
        BinaryOperator::Subtract => BinaryOp::Sub,
        BinaryOperator::Multiply => BinaryOp::Mul,
        BinaryOperator::Divide => BinaryOp::Div,
        BinaryOperator::GreaterThan => BinaryOp::GreaterThan,
        BinaryOperator::GreaterThanEqual => BinaryOp::GreaterEqual,
        BinaryOperator::LessThan => BinaryOp::LessThan,
        BinaryOperator::LessThanEqual => BinaryOp::LessEqual,
        BinaryOperator::Equal => BinaryOp::Equal,
        BinaryOperator::NotEqual => BinaryOp::NotEqual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(bc: &ByteCode) -> Vec<(OpCode, u32)> {
        bc.code.iter().map(|i| (i.op, i.operand)).collect()
    }

    #[test]
    fn test_statement_boundary_drops_pure_push() {
        let bc = compile("a; f(); x = 1").unwrap();
        assert_eq!(
            ops(&bc),
            vec![
                (OpCode::GetVar, 1),
                (OpCode::CallFunc, 0),
                (OpCode::Clear, 0),
                (OpCode::GetConst, 0),
                (OpCode::SetVar, 2),
            ]
        );
    }

    #[test]
    fn test_while_jumps_back_to_condition() {
        let bc = compile("while c { f() }").unwrap();
        assert_eq!(
            ops(&bc),
            vec![
                (OpCode::GetVar, 0),
                (OpCode::JumpOnFalse, 6),
                (OpCode::GetVar, 1),
                (OpCode::CallFunc, 0),
                (OpCode::Clear, 0),
                (OpCode::Jump, 0),
            ]
        );
    }

    #[test]
    fn test_nested_loops_get_distinct_hidden_names() {
        let bc = compile("for a in x { for b in a { f(b) } }").unwrap();
        assert!(bc.names.contains(&".for0".to_string()));
        assert!(bc.names.contains(&".for1".to_string()));
    }

    #[test]
    fn test_short_circuit_only_when_right_side_calls() {
        let eager = compile("r = a && b").unwrap();
        assert_eq!(
            ops(&eager),
            vec![
                (OpCode::GetVar, 0),
                (OpCode::GetVar, 1),
                (OpCode::BinaryOp, BinaryOp::LogicalAnd.id()),
                (OpCode::SetVar, 2),
            ]
        );
        let lazy = compile("a && f()").unwrap();
        assert!(lazy.code.iter().any(|i| i.op == OpCode::JumpOnFalse));
        assert_eq!(lazy.last_op(), Some(OpCode::Clear));
    }

    #[test]
    fn test_push_a_jump_lands_behind_is_kept() {
        let bc = compile("a && f()\nb\nif c { d }\ne").unwrap();
        let first_clear = bc.code.iter().position(|i| i.op == OpCode::Clear).unwrap();
        assert_eq!(bc.code[first_clear - 1].op, OpCode::GetVar);
        assert_eq!(bc.code[first_clear - 2].op, OpCode::Jump);
        assert_eq!(bc.code[first_clear - 2].operand as usize, first_clear);
        assert_eq!(bc.last_op(), Some(OpCode::JumpOnFalse));
        assert_eq!(bc.code.last().unwrap().operand as usize, bc.code.len());
    }

    #[test]
    fn test_long_scripts_keep_statements_balanced() {
        let script: String = (0..3000)
            .map(|i| format!("if a{} {{ b }} else {{ c }}\nx{}\ny = x{} || f()\n", i, i, i))
            .collect();
        let bc = compile(&script).unwrap();
        let len = bc.code.len() as u32;
        assert!(bc
            .code
            .iter()
            .filter(|i| i.op.is_jump())
            .all(|i| i.operand <= len));
        assert_eq!(bc.last_op(), Some(OpCode::SetVar));
    }

    #[test]
    fn test_element_index_keeps_logical_ops_eager() {
        let bc = compile("Book[year > f() && x]").unwrap();
        assert!(!bc.code.iter().any(|i| i.op == OpCode::JumpOnFalse));
        assert!(bc.code.iter().any(|i| i.op == OpCode::EnterElem));
    }
}
