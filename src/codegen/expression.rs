//! Expression lowering.
//!
//! Every expression is computed into a freshly claimed scratch register that
//! the consumer releases. Places (variables, fields, array elements) are
//! lowered to a [`Location`] first and loaded or stored from there.

use log::trace;

use crate::ast::*;
use crate::codegen::assembly::{Address, Operand, Width};
use crate::codegen::error::CodegenError;
use crate::codegen::frame::Storage;
use crate::codegen::function::FunctionGenerator;
use crate::codegen::register::{ARGUMENT_REGISTERS, Register};
use crate::semantic::builtins::BUILTINS;
use crate::semantic::CallTarget;

/// Where a place's value is read from and written to
#[derive(Debug, Clone)]
pub enum Location {
    Register(Register),
    Memory(Address),
}

/// A lowered place. `temp` holds a computed base address and must be
/// released once the place has been used.
#[derive(Debug)]
pub struct Place {
    pub location: Location,
    pub temp: Option<Register>,
}

impl<'a> FunctionGenerator<'a> {
    pub(crate) fn lower_expression(&mut self, node: NodeRef) -> Result<Register, CodegenError> {
        match self.ast.get_kind(node) {
            NodeKind::LiteralInt(value) => {
                let register = self.scratch(node)?;
                self.emit("mov", vec![Operand::Reg(register), Operand::Imm(*value)]);
                Ok(register)
            }
            NodeKind::LiteralBool(value) => {
                let register = self.scratch(node)?;
                self.emit("mov", vec![Operand::Reg(register), Operand::Imm(*value as i64)]);
                Ok(register)
            }
            NodeKind::LiteralString(value) => {
                let label = self.asm.intern_string(*value);
                let register = self.scratch(node)?;
                self.emit(
                    "lea",
                    vec![Operand::Reg(register), Operand::Addr(Address::symbol(label))],
                );
                Ok(register)
            }
            NodeKind::Variable(_) | NodeKind::FieldAccess(..) | NodeKind::ArrayAccess(..) => {
                let ty = self.type_of(node)?;
                if ty.is_record() {
                    return Err(CodegenError::Unsupported {
                        what: "record value outside of assignment".to_string(),
                        location: self.ast.get_span(node),
                    });
                }
                let place = self.lower_place(node)?;
                let target = match place.temp {
                    Some(temp) => temp,
                    None => self.scratch(node)?,
                };
                self.load(&place.location, &ty, target, node)?;
                Ok(target)
            }
            NodeKind::UnaryOp(op, operand) => self.lower_unary(node, *op, *operand),
            NodeKind::BinaryOp(op, left, right) => self.lower_binary(node, *op, *left, *right),
            NodeKind::Call(_) => self.lower_call(node)?.ok_or_else(|| CodegenError::Unsupported {
                what: "value of a void call".to_string(),
                location: self.ast.get_span(node),
            }),
            _ => Err(CodegenError::Unsupported {
                what: "statement in expression position".to_string(),
                location: self.ast.get_span(node),
            }),
        }
    }

    fn lower_unary(&mut self, node: NodeRef, op: UnaryOp, operand: NodeRef) -> Result<Register, CodegenError> {
        match op {
            UnaryOp::Minus => {
                let value = self.lower_expression(operand)?;
                self.emit("neg", vec![Operand::Reg(value)]);
                Ok(value)
            }
            UnaryOp::Not => {
                let value = self.lower_expression(operand)?;
                self.emit("xor", vec![Operand::Reg(value), Operand::Imm(1)]);
                Ok(value)
            }
            UnaryOp::PreIncrement | UnaryOp::PreDecrement | UnaryOp::PostIncrement | UnaryOp::PostDecrement => {
                let mnemonic = match op {
                    UnaryOp::PreIncrement | UnaryOp::PostIncrement => "add",
                    _ => "sub",
                };
                let ty = self.type_of(operand)?;
                let place = self.lower_place(operand)?;
                let value = self.scratch(node)?;
                self.load(&place.location, &ty, value, operand)?;
                if matches!(op, UnaryOp::PreIncrement | UnaryOp::PreDecrement) {
                    self.emit(mnemonic, vec![Operand::Reg(value), Operand::Imm(1)]);
                    self.store(&place.location, &ty, value, operand)?;
                } else {
                    let updated = self.scratch(node)?;
                    self.emit("mov", vec![Operand::Reg(updated), Operand::Reg(value)]);
                    self.emit(mnemonic, vec![Operand::Reg(updated), Operand::Imm(1)]);
                    self.store(&place.location, &ty, updated, operand)?;
                    self.registers.release(updated);
                }
                self.release_place(place);
                Ok(value)
            }
        }
    }

    /// Text values are pointers to interned literals, so equal text shares
    /// one address and `==`/`!=` compare addresses. Ordering and
    /// concatenation are not lowered.
    pub(crate) fn reject_text_operator(&self, node: NodeRef, op: BinaryOp, left: NodeRef) -> Result<(), CodegenError> {
        if matches!(op, BinaryOp::Equal | BinaryOp::Unequal) {
            return Ok(());
        }
        if self.type_of(left)? == Type::String {
            return Err(CodegenError::Unsupported {
                what: format!("operator '{}' on text", op),
                location: self.ast.get_span(node),
            });
        }
        Ok(())
    }

    fn lower_binary(
        &mut self,
        node: NodeRef,
        op: BinaryOp,
        left: NodeRef,
        right: NodeRef,
    ) -> Result<Register, CodegenError> {
        self.reject_text_operator(node, op, left)?;
        let lhs = self.lower_expression(left)?;
        let rhs = self.lower_expression(right)?;
        match op {
            BinaryOp::Plus => self.emit("add", vec![Operand::Reg(lhs), Operand::Reg(rhs)]),
            BinaryOp::Minus => self.emit("sub", vec![Operand::Reg(lhs), Operand::Reg(rhs)]),
            BinaryOp::Times => self.emit("imul", vec![Operand::Reg(lhs), Operand::Reg(rhs)]),
            BinaryOp::And => self.emit("and", vec![Operand::Reg(lhs), Operand::Reg(rhs)]),
            BinaryOp::Or => self.emit("or", vec![Operand::Reg(lhs), Operand::Reg(rhs)]),
            BinaryOp::Div | BinaryOp::Mod => return self.lower_division(node, op, lhs, rhs),
            comparison => {
                self.emit("cmp", vec![Operand::Reg(lhs), Operand::Reg(rhs)]);
                self.emit(set_instruction(comparison), vec![Operand::Reg8(lhs)]);
                self.emit("movzx", vec![Operand::Reg(lhs), Operand::Reg8(lhs)]);
            }
        }
        self.registers.release(rhs);
        Ok(lhs)
    }

    /// `idiv` works on `rdx:rax`; both are saved around it when they hold
    /// other values.
    fn lower_division(
        &mut self,
        node: NodeRef,
        op: BinaryOp,
        dividend: Register,
        divisor: Register,
    ) -> Result<Register, CodegenError> {
        let divisor = if divisor == Register::Rax {
            let moved = self.scratch(node)?;
            self.emit("mov", vec![Operand::Reg(moved), Operand::Reg(divisor)]);
            self.registers.release(divisor);
            moved
        } else {
            divisor
        };

        let save_rax = dividend != Register::Rax && self.registers.is_in_use(Register::Rax);
        let save_rdx = self.registers.is_in_use(Register::Rdx);
        if save_rax {
            self.emit("push", vec![Operand::Reg(Register::Rax)]);
        }
        if save_rdx {
            self.emit("push", vec![Operand::Reg(Register::Rdx)]);
        }
        if dividend != Register::Rax {
            self.emit("mov", vec![Operand::Reg(Register::Rax), Operand::Reg(dividend)]);
        }
        self.emit("cqo", vec![]);
        self.emit("idiv", vec![Operand::Reg(divisor)]);
        let result = if op == BinaryOp::Div { Register::Rax } else { Register::Rdx };
        if dividend != result {
            self.emit("mov", vec![Operand::Reg(dividend), Operand::Reg(result)]);
        }
        if save_rdx {
            self.emit("pop", vec![Operand::Reg(Register::Rdx)]);
        }
        if save_rax {
            self.emit("pop", vec![Operand::Reg(Register::Rax)]);
        }
        self.registers.release(divisor);
        Ok(dividend)
    }

    /// Lower an assignable expression to the location holding its value
    pub(crate) fn lower_place(&mut self, node: NodeRef) -> Result<Place, CodegenError> {
        match self.ast.get_kind(node) {
            NodeKind::Variable(_) => {
                let symbol = self.symbol_of(node)?;
                let place = match (symbol.storage, symbol.is_reference) {
                    (Storage::Global(name), _) => Place {
                        location: Location::Memory(Address::symbol(name)),
                        temp: None,
                    },
                    (Storage::Register(register), false) => Place {
                        location: Location::Register(register),
                        temp: None,
                    },
                    (Storage::Register(register), true) => Place {
                        location: Location::Memory(Address::register(register)),
                        temp: None,
                    },
                    (Storage::Frame(offset), false) => Place {
                        location: Location::Memory(Address::frame(offset)),
                        temp: None,
                    },
                    (Storage::Frame(offset), true) => {
                        let pointer = self.scratch(node)?;
                        self.emit(
                            "mov",
                            vec![
                                Operand::Reg(pointer),
                                Operand::Mem(Width::Qword, Address::frame(offset)),
                            ],
                        );
                        Place {
                            location: Location::Memory(Address::register(pointer)),
                            temp: Some(pointer),
                        }
                    }
                };
                Ok(place)
            }
            NodeKind::FieldAccess(base, field) => {
                let Type::Record(record) = self.type_of(*base)? else {
                    return Err(self.unsupported_place(node));
                };
                let (offset, _) = self
                    .types
                    .field(record, *field)
                    .ok_or_else(|| self.unsupported_place(node))?;
                let base = self.lower_place(*base)?;
                match base.location {
                    Location::Memory(address) => Ok(Place {
                        location: Location::Memory(address.offset_by(offset)),
                        temp: base.temp,
                    }),
                    Location::Register(_) => Err(self.unsupported_place(node)),
                }
            }
            NodeKind::ArrayAccess(base, index) => {
                let element = self.type_of(node)?;
                let element_size = self.size_of(&element, node)?;
                let pointer = self.lower_expression(*base)?;
                let offset = self.lower_expression(*index)?;
                self.emit("imul", vec![Operand::Reg(offset), Operand::Imm(element_size as i64)]);
                self.emit("add", vec![Operand::Reg(pointer), Operand::Reg(offset)]);
                self.registers.release(offset);
                Ok(Place {
                    location: Location::Memory(Address::register(pointer)),
                    temp: Some(pointer),
                })
            }
            _ => Err(self.unsupported_place(node)),
        }
    }

    fn unsupported_place(&self, node: NodeRef) -> CodegenError {
        CodegenError::Unsupported {
            what: "this kind of assignable expression".to_string(),
            location: self.ast.get_span(node),
        }
    }

    pub(crate) fn release_place(&mut self, place: Place) {
        if let Some(temp) = place.temp {
            self.registers.release(temp);
        }
    }

    /// Address of a place in a register, for reference arguments
    fn lower_address(&mut self, node: NodeRef) -> Result<Register, CodegenError> {
        let place = self.lower_place(node)?;
        let Location::Memory(address) = place.location else {
            return Err(CodegenError::Unsupported {
                what: "address of a register value".to_string(),
                location: self.ast.get_span(node),
            });
        };
        let target = match place.temp {
            Some(temp) => temp,
            None => self.scratch(node)?,
        };
        self.emit("lea", vec![Operand::Reg(target), Operand::Addr(address)]);
        Ok(target)
    }

    pub(crate) fn load(
        &mut self,
        location: &Location,
        ty: &Type,
        target: Register,
        node: NodeRef,
    ) -> Result<(), CodegenError> {
        match location {
            Location::Register(source) => {
                self.emit("mov", vec![Operand::Reg(target), Operand::Reg(*source)]);
            }
            Location::Memory(address) => {
                let width = Width::of_size(self.size_of(ty, node)?);
                let destination = match width {
                    Width::Dword => Operand::Reg32(target),
                    Width::Qword => Operand::Reg(target),
                };
                self.emit("mov", vec![destination, Operand::Mem(width, address.clone())]);
            }
        }
        Ok(())
    }

    pub(crate) fn store(
        &mut self,
        location: &Location,
        ty: &Type,
        value: Register,
        node: NodeRef,
    ) -> Result<(), CodegenError> {
        match location {
            Location::Register(destination) => {
                self.emit("mov", vec![Operand::Reg(*destination), Operand::Reg(value)]);
            }
            Location::Memory(address) => {
                let width = Width::of_size(self.size_of(ty, node)?);
                let source = match width {
                    Width::Dword => Operand::Reg32(value),
                    Width::Qword => Operand::Reg(value),
                };
                self.emit("mov", vec![Operand::Mem(width, address.clone()), source]);
            }
        }
        Ok(())
    }

    /// `lhs = rhs` for record values, copied field by field
    pub(crate) fn copy_record(&mut self, lhs: NodeRef, rhs: NodeRef, record: NameId) -> Result<(), CodegenError> {
        if matches!(self.ast.get_kind(rhs), NodeKind::Call(_)) {
            return Err(CodegenError::Unsupported {
                what: "record-typed return value".to_string(),
                location: self.ast.get_span(rhs),
            });
        }
        let source = self.lower_place(rhs)?;
        let destination = self.lower_place(lhs)?;
        let (Location::Memory(from), Location::Memory(to)) = (&source.location, &destination.location) else {
            return Err(self.unsupported_place(lhs));
        };
        let (from, to) = (from.clone(), to.clone());
        let scratch = self.scratch(lhs)?;
        self.copy_fields(&from, &to, record, scratch, lhs)?;
        self.registers.release(scratch);
        self.release_place(destination);
        self.release_place(source);
        Ok(())
    }

    pub(crate) fn copy_fields(
        &mut self,
        from: &Address,
        to: &Address,
        record: NameId,
        scratch: Register,
        node: NodeRef,
    ) -> Result<(), CodegenError> {
        let fields = self.types.fields(record).ok_or_else(|| self.unsupported_place(node))?;
        for (offset, ty) in fields {
            let (from, to) = (from.offset_by(offset), to.offset_by(offset));
            match ty {
                Type::Record(inner) => self.copy_fields(&from, &to, inner, scratch, node)?,
                ty => {
                    self.load(&Location::Memory(from), &ty, scratch, node)?;
                    self.store(&Location::Memory(to), &ty, scratch, node)?;
                }
            }
        }
        Ok(())
    }

    /// Lower a call and return the register holding its result, if any.
    ///
    /// Live registers are pushed first, then the arguments in reverse order;
    /// the first six are popped into the argument registers and the rest
    /// stay on the stack for the callee. `rsp` is 16-aligned at the `call`.
    pub(crate) fn lower_call(&mut self, node: NodeRef) -> Result<Option<Register>, CodegenError> {
        let NodeKind::Call(call) = self.ast.get_kind(node) else {
            return Ok(None);
        };
        let location = self.ast.get_span(node);
        let unresolved = || CodegenError::Unsupported {
            what: format!("unresolved call to '{}'", call.name),
            location,
        };

        // records passed by value also travel as addresses
        let (label, by_address, returns_value) = match self.info.call_target(node).ok_or_else(unresolved)? {
            CallTarget::Function(definition) => {
                let callee = self.ast.function(definition).ok_or_else(unresolved)?;
                if callee.return_type.is_record() {
                    return Err(CodegenError::Unsupported {
                        what: "record-typed return value".to_string(),
                        location,
                    });
                }
                let by_address: Vec<bool> = callee
                    .params
                    .iter()
                    .map(|&p| {
                        self.ast
                            .declaration(p)
                            .is_some_and(|decl| decl.is_reference || decl.ty.is_record())
                    })
                    .collect();
                let label = self.labels.get(&definition).cloned().ok_or_else(unresolved)?;
                (label, by_address, callee.return_type != Type::Void)
            }
            CallTarget::Builtin(name) => {
                let builtin = BUILTINS
                    .iter()
                    .find(|b| b.name == name.as_str())
                    .ok_or_else(unresolved)?;
                (
                    builtin.name.to_string(),
                    vec![false; call.args.len()],
                    builtin.return_type != Type::Void,
                )
            }
        };
        trace!("FunctionGenerator: call {} with {} arguments", label, call.args.len());

        let saved = self.registers.live();
        for &register in &saved {
            self.push(register);
        }
        let stack_arguments = call.args.len().saturating_sub(ARGUMENT_REGISTERS.len()) as u32;
        let padded = (self.stack_depth + stack_arguments) % 2 == 1;
        if padded {
            self.emit("sub", vec![Operand::Reg(Register::Rsp), Operand::Imm(8)]);
            self.stack_depth += 1;
        }

        for (&arg, &address) in call.args.iter().zip(&by_address).rev() {
            if address && matches!(self.ast.get_kind(arg), NodeKind::Call(_)) {
                return Err(CodegenError::Unsupported {
                    what: "record-typed return value".to_string(),
                    location: self.ast.get_span(arg),
                });
            }
            let value = if address {
                self.lower_address(arg)?
            } else {
                self.lower_expression(arg)?
            };
            self.push(value);
            self.registers.release(value);
        }
        for &register in ARGUMENT_REGISTERS.iter().take(call.args.len()) {
            self.emit("pop", vec![Operand::Reg(register)]);
            self.stack_depth -= 1;
        }

        self.emit("call", vec![Operand::Label(label)]);

        let dropped = stack_arguments + padded as u32;
        if dropped > 0 {
            self.emit("add", vec![Operand::Reg(Register::Rsp), Operand::Imm(8 * dropped as i64)]);
            self.stack_depth -= dropped;
        }

        let result = if returns_value {
            let result = self.scratch(node)?;
            if result != Register::Rax {
                self.emit("mov", vec![Operand::Reg(result), Operand::Reg(Register::Rax)]);
            }
            Some(result)
        } else {
            None
        };

        for &register in saved.iter().rev() {
            self.emit("pop", vec![Operand::Reg(register)]);
            self.stack_depth -= 1;
        }
        Ok(result)
    }

    fn push(&mut self, register: Register) {
        self.emit("push", vec![Operand::Reg(register)]);
        self.stack_depth += 1;
    }
}

fn set_instruction(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Equal => "sete",
        BinaryOp::Unequal => "setne",
        BinaryOp::Lesser => "setl",
        BinaryOp::LesserEq => "setle",
        BinaryOp::Greater => "setg",
        BinaryOp::GreaterEq => "setge",
        _ => "setnz",
    }
}
