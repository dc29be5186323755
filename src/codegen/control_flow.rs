//! `if` and `while` lowering.
//!
//! Conditions are special-cased by shape. Literal conditions are folded and
//! the dead side is never emitted; comparisons jump on the flags of one
//! `cmp`; anything else is evaluated and compared with 1.

use crate::ast::*;
use crate::codegen::assembly::Operand;
use crate::codegen::error::CodegenError;
use crate::codegen::function::FunctionGenerator;

enum Condition {
    Constant(bool),
    Compare(BinaryOp, NodeRef, NodeRef),
    /// Any other boolean expression
    Value,
}

impl<'a> FunctionGenerator<'a> {
    fn classify(&self, condition: NodeRef) -> Condition {
        match self.ast.get_kind(condition) {
            NodeKind::LiteralBool(value) => Condition::Constant(*value),
            NodeKind::BinaryOp(op, left, right) if op.is_comparison() => Condition::Compare(*op, *left, *right),
            _ => Condition::Value,
        }
    }

    /// ```text
    ///     <jump to else when false>
    ///     then
    ///     jmp end          ; only with an else block
    /// else:
    ///     else
    /// end:
    /// ```
    pub(crate) fn lower_if(&mut self, stmt: &IfStmt) -> Result<(), CodegenError> {
        match self.classify(stmt.condition) {
            Condition::Constant(true) => self.lower_statement(stmt.then_block),
            Condition::Constant(false) => stmt
                .else_block
                .map_or(Ok(()), |else_block| self.lower_statement(else_block)),
            condition => {
                let else_label = self.new_label();
                self.jump_unless(stmt.condition, condition, &else_label)?;
                self.lower_statement(stmt.then_block)?;
                match stmt.else_block {
                    Some(else_block) => {
                        let end_label = self.new_label();
                        self.emit("jmp", vec![Operand::Label(end_label.clone())]);
                        self.asm.label(else_label);
                        self.lower_statement(else_block)?;
                        self.asm.label(end_label);
                    }
                    None => self.asm.label(else_label),
                }
                Ok(())
            }
        }
    }

    /// ```text
    ///     jmp cond
    /// body:
    ///     body
    /// cond:
    ///     <jump to body when true>
    /// ```
    pub(crate) fn lower_while(&mut self, stmt: &WhileStmt) -> Result<(), CodegenError> {
        match self.classify(stmt.condition) {
            Condition::Constant(false) => Ok(()),
            Condition::Constant(true) => {
                let body_label = self.new_label();
                self.asm.label(body_label.clone());
                self.lower_statement(stmt.body)?;
                self.emit("jmp", vec![Operand::Label(body_label)]);
                Ok(())
            }
            condition => {
                let body_label = self.new_label();
                let condition_label = self.new_label();
                self.emit("jmp", vec![Operand::Label(condition_label.clone())]);
                self.asm.label(body_label.clone());
                self.lower_statement(stmt.body)?;
                self.asm.label(condition_label);
                self.jump_if(stmt.condition, condition, &body_label)
            }
        }
    }

    fn jump_unless(&mut self, node: NodeRef, condition: Condition, target: &str) -> Result<(), CodegenError> {
        let mnemonic = match condition {
            Condition::Compare(op, left, right) => {
                self.compare(node, op, left, right)?;
                inverted_jump(op)
            }
            _ => {
                self.test_true(node)?;
                "jne"
            }
        };
        self.emit(mnemonic, vec![Operand::Label(target.to_string())]);
        Ok(())
    }

    fn jump_if(&mut self, node: NodeRef, condition: Condition, target: &str) -> Result<(), CodegenError> {
        let mnemonic = match condition {
            Condition::Compare(op, left, right) => {
                self.compare(node, op, left, right)?;
                direct_jump(op)
            }
            _ => {
                self.test_true(node)?;
                "je"
            }
        };
        self.emit(mnemonic, vec![Operand::Label(target.to_string())]);
        Ok(())
    }

    fn compare(&mut self, node: NodeRef, op: BinaryOp, left: NodeRef, right: NodeRef) -> Result<(), CodegenError> {
        self.reject_text_operator(node, op, left)?;
        let lhs = self.lower_expression(left)?;
        let rhs = self.lower_expression(right)?;
        self.emit("cmp", vec![Operand::Reg(lhs), Operand::Reg(rhs)]);
        self.registers.release(rhs);
        self.registers.release(lhs);
        Ok(())
    }

    fn test_true(&mut self, node: NodeRef) -> Result<(), CodegenError> {
        let value = self.lower_expression(node)?;
        self.emit("cmp", vec![Operand::Reg(value), Operand::Imm(1)]);
        self.registers.release(value);
        Ok(())
    }
}

fn direct_jump(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Equal => "je",
        BinaryOp::Unequal => "jne",
        BinaryOp::Lesser => "jl",
        BinaryOp::LesserEq => "jle",
        BinaryOp::Greater => "jg",
        _ => "jge",
    }
}

fn inverted_jump(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Equal => "jne",
        BinaryOp::Unequal => "je",
        BinaryOp::Lesser => "jge",
        BinaryOp::LesserEq => "jg",
        BinaryOp::Greater => "jle",
        _ => "jl",
    }
}
