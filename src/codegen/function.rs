//! Per-function generation state, prologue/epilogue and statements.

use hashbrown::HashMap;
use log::{debug, trace};

use crate::ast::*;
use crate::codegen::assembly::{Address, Assembly, Operand, Width};
use crate::codegen::error::CodegenError;
use crate::codegen::frame::{CopiedParameter, Frame, Storage, Symbol};
use crate::codegen::layout::TypeLayout;
use crate::codegen::register::{Register, RegisterFile};
use crate::codegen::{ENTRY_LABEL, user_symbol};
use crate::semantic::symbol_table::{SymbolKind, SymbolTable, VariableStorage};

/// Lowers one function. Owns the register file, frame layout and label
/// counter of that function; all three die with it.
pub struct FunctionGenerator<'a> {
    pub(crate) ast: &'a Ast,
    pub(crate) info: &'a SemanticInfo,
    pub(crate) symbol_table: &'a SymbolTable,
    pub(crate) types: &'a TypeLayout<'a>,
    /// Labels of every function in the unit
    pub(crate) labels: &'a HashMap<NodeRef, String>,
    pub(crate) asm: &'a mut Assembly,
    pub(crate) registers: RegisterFile,
    pub(crate) frame: Frame,
    next_label: u32,
    /// 8-byte slots currently pushed below the local area
    pub(crate) stack_depth: u32,
    is_entry: bool,
}

impl<'a> FunctionGenerator<'a> {
    pub fn new(
        ast: &'a Ast,
        info: &'a SemanticInfo,
        symbol_table: &'a SymbolTable,
        types: &'a TypeLayout<'a>,
        labels: &'a HashMap<NodeRef, String>,
        asm: &'a mut Assembly,
    ) -> Self {
        FunctionGenerator {
            ast,
            info,
            symbol_table,
            types,
            labels,
            asm,
            registers: RegisterFile::new(),
            frame: Frame::default(),
            next_label: 0,
            stack_depth: 0,
            is_entry: false,
        }
    }

    pub fn generate(mut self, func_ref: NodeRef, label: &str) -> Result<(), CodegenError> {
        let Some(func) = self.ast.function(func_ref) else {
            return Ok(());
        };
        self.is_entry = label == ENTRY_LABEL;
        self.frame = Frame::layout(self.ast, func, self.info, self.symbol_table, self.types)?;
        let parameter_registers: Vec<_> = self.frame.parameter_registers().collect();
        for register in parameter_registers {
            self.registers.claim(register)?;
        }

        self.asm.label(label);
        self.emit_prologue()?;

        for &statement in &func.body {
            self.lower_statement(statement)?;
        }

        let ends_with_return = func
            .body
            .last()
            .is_some_and(|&last| matches!(self.ast.get_kind(last), NodeKind::Return(_)));
        if !ends_with_return {
            trace!("FunctionGenerator: implicit return in {}", label);
            if self.is_entry {
                self.emit_exit(Operand::Imm(0));
            } else {
                self.emit_epilogue();
            }
        }
        debug!(
            "FunctionGenerator: {} done, frame {} bytes, {} labels",
            label, self.frame.size, self.next_label
        );
        Ok(())
    }

    pub(crate) fn emit(&mut self, mnemonic: &'static str, operands: Vec<Operand>) {
        self.asm.emit(mnemonic, operands);
    }

    pub(crate) fn new_label(&mut self) -> String {
        let label = format!(".L{}", self.next_label);
        self.next_label += 1;
        label
    }

    /// Claim a scratch register for a value computed for `node`
    pub(crate) fn scratch(&mut self, node: NodeRef) -> Result<Register, CodegenError> {
        self.registers.claim_scratch().ok_or(CodegenError::OutOfRegisters {
            location: self.ast.get_span(node),
        })
    }

    pub(crate) fn type_of(&self, node: NodeRef) -> Result<Type, CodegenError> {
        self.info.type_of(node).cloned().ok_or_else(|| CodegenError::Unsupported {
            what: "expression without a type".to_string(),
            location: self.ast.get_span(node),
        })
    }

    pub(crate) fn size_of(&self, ty: &Type, node: NodeRef) -> Result<u32, CodegenError> {
        self.types.size_of(ty).ok_or_else(|| CodegenError::Unsupported {
            what: format!("storage for type {}", ty),
            location: self.ast.get_span(node),
        })
    }

    /// Storage of the declaration a `Variable` node refers to
    pub(crate) fn symbol_of(&self, node: NodeRef) -> Result<Symbol, CodegenError> {
        let unbound = || CodegenError::Unsupported {
            what: "variable without storage".to_string(),
            location: self.ast.get_span(node),
        };
        let entry_ref = self.info.resolved_entry(node).ok_or_else(unbound)?;
        let entry = self.symbol_table.get_symbol_entry(entry_ref);
        match &entry.kind {
            SymbolKind::Variable {
                ty,
                storage: VariableStorage::Global,
                ..
            } => Ok(Symbol {
                storage: Storage::Global(user_symbol(entry.name)),
                ty: ty.clone(),
                is_reference: false,
            }),
            SymbolKind::Variable { declaration, .. } => self.frame.symbol(*declaration).cloned().ok_or_else(unbound),
            _ => Err(unbound()),
        }
    }

    fn emit_prologue(&mut self) -> Result<(), CodegenError> {
        self.emit("push", vec![Operand::Reg(Register::Rbp)]);
        self.emit("mov", vec![Operand::Reg(Register::Rbp), Operand::Reg(Register::Rsp)]);
        if self.frame.size > 0 {
            self.emit("sub", vec![Operand::Reg(Register::Rsp), Operand::Imm(self.frame.size as i64)]);
        }
        if self.is_entry {
            // no return address was pushed
            self.emit("and", vec![Operand::Reg(Register::Rsp), Operand::Imm(-16)]);
        }
        for homed in self.frame.homed.clone() {
            let source = match homed.width {
                Width::Dword => Operand::Reg32(homed.register),
                Width::Qword => Operand::Reg(homed.register),
            };
            self.emit("mov", vec![Operand::Mem(homed.width, homed.address), source]);
        }
        for copied in self.frame.copied.clone() {
            self.copy_in(&copied)?;
        }
        Ok(())
    }

    /// Copy a by-value record argument from the caller's address into its slot
    fn copy_in(&mut self, copied: &CopiedParameter) -> Result<(), CodegenError> {
        let source = match copied.source {
            Storage::Register(register) => Operand::Reg(register),
            Storage::Frame(offset) => Operand::Mem(Width::Qword, Address::frame(offset)),
            Storage::Global(_) => return Ok(()),
        };
        self.registers.claim(Register::R11)?;
        self.registers.claim(Register::Rax)?;
        self.emit("mov", vec![Operand::Reg(Register::R11), source]);
        self.copy_fields(
            &Address::register(Register::R11),
            &copied.address,
            copied.record,
            Register::Rax,
            copied.param,
        )?;
        self.registers.release(Register::Rax);
        self.registers.release(Register::R11);
        Ok(())
    }

    fn emit_epilogue(&mut self) {
        self.emit("mov", vec![Operand::Reg(Register::Rsp), Operand::Reg(Register::Rbp)]);
        self.emit("pop", vec![Operand::Reg(Register::Rbp)]);
        self.emit("ret", vec![]);
    }

    /// End the process with `code` as exit status
    fn emit_exit(&mut self, code: Operand) {
        self.emit("mov", vec![Operand::Reg(Register::Rdi), code]);
        self.emit("call", vec![Operand::Label("_exit".to_string())]);
    }

    pub(crate) fn lower_statement(&mut self, node: NodeRef) -> Result<(), CodegenError> {
        match self.ast.get_kind(node) {
            NodeKind::Block(statements) => statements.iter().try_for_each(|&s| self.lower_statement(s)),
            NodeKind::DeclarationStatement(decl) => self.lower_local_declaration(*decl),
            NodeKind::Assignment(lhs, rhs) => self.lower_assignment(*lhs, *rhs),
            NodeKind::CallStatement(call) => {
                if let Some(result) = self.lower_call(*call)? {
                    self.registers.release(result);
                }
                Ok(())
            }
            NodeKind::If(stmt) => self.lower_if(stmt),
            NodeKind::While(stmt) => self.lower_while(stmt),
            NodeKind::Return(value) => self.lower_return(*value),
            NodeKind::EmptyStatement | NodeKind::Dummy => Ok(()),
            NodeKind::Declaration(_) | NodeKind::Function(_) | NodeKind::Record(_) | NodeKind::Unit(_) => Ok(()),
            _ => {
                let value = self.lower_expression(node)?;
                self.registers.release(value);
                Ok(())
            }
        }
    }

    /// Locals start out zeroed each time their declaration runs
    fn lower_local_declaration(&mut self, decl_ref: NodeRef) -> Result<(), CodegenError> {
        let Some(symbol) = self.frame.symbol(decl_ref).cloned() else {
            return Ok(());
        };
        let Storage::Frame(offset) = symbol.storage else {
            return Ok(());
        };
        self.zero_fill(Address::frame(offset), &symbol.ty, decl_ref)
    }

    fn zero_fill(&mut self, address: Address, ty: &Type, node: NodeRef) -> Result<(), CodegenError> {
        if let Type::Record(name) = ty {
            let fields = self.types.fields(*name).ok_or_else(|| CodegenError::Unsupported {
                what: format!("layout of record '{}'", name),
                location: self.ast.get_span(node),
            })?;
            for (offset, field_ty) in fields {
                self.zero_fill(address.offset_by(offset), &field_ty, node)?;
            }
            return Ok(());
        }
        let width = Width::of_size(self.size_of(ty, node)?);
        self.emit("mov", vec![Operand::Mem(width, address), Operand::Imm(0)]);
        Ok(())
    }

    fn lower_assignment(&mut self, lhs: NodeRef, rhs: NodeRef) -> Result<(), CodegenError> {
        let ty = self.type_of(lhs)?;
        if let Type::Record(name) = ty {
            return self.copy_record(lhs, rhs, name);
        }
        let value = self.lower_expression(rhs)?;
        let place = self.lower_place(lhs)?;
        self.store(&place.location, &ty, value, lhs)?;
        self.release_place(place);
        self.registers.release(value);
        Ok(())
    }

    fn lower_return(&mut self, value: Option<NodeRef>) -> Result<(), CodegenError> {
        let value = match value {
            Some(value) if self.type_of(value)? == Type::Void => {
                // `return f();` in a void function
                if let Some(result) = self.lower_call(value)? {
                    self.registers.release(result);
                }
                None
            }
            other => other,
        };

        if self.is_entry {
            let code = match value {
                None => Operand::Imm(0),
                Some(value) => match self.immediate(value) {
                    Some(constant) => Operand::Imm(constant),
                    None => Operand::Reg(self.lower_expression(value)?),
                },
            };
            self.emit_exit(code.clone());
            if let Operand::Reg(register) = code {
                self.registers.release(register);
            }
            return Ok(());
        }

        if let Some(value) = value {
            let ty = self.type_of(value)?;
            if ty.is_record() {
                return Err(CodegenError::Unsupported {
                    what: "record-typed return value".to_string(),
                    location: self.ast.get_span(value),
                });
            }
            match self.immediate(value) {
                Some(constant) => self.emit("mov", vec![Operand::Reg(Register::Rax), Operand::Imm(constant)]),
                None => {
                    let result = self.lower_expression(value)?;
                    if result != Register::Rax {
                        self.emit("mov", vec![Operand::Reg(Register::Rax), Operand::Reg(result)]);
                    }
                    self.registers.release(result);
                }
            }
        }
        self.emit_epilogue();
        Ok(())
    }

    /// Constant value of a literal integer or boolean
    pub(crate) fn immediate(&self, node: NodeRef) -> Option<i64> {
        match self.ast.get_kind(node) {
            NodeKind::LiteralInt(value) => Some(*value),
            NodeKind::LiteralBool(value) => Some(*value as i64),
            _ => None,
        }
    }
}
