//! Storage assignment for the parameters and locals of one function.

use hashbrown::{HashMap, HashSet};
use log::trace;

use crate::ast::*;
use crate::codegen::assembly::{Address, Width};
use crate::codegen::error::CodegenError;
use crate::codegen::layout::{POINTER_SIZE, TypeLayout};
use crate::codegen::register::{ARGUMENT_REGISTERS, Register};
use crate::semantic::symbol_table::{SymbolKind, SymbolTable};
use crate::semantic::CallTarget;

/// Where a variable lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// Named cell in `.bss`
    Global(String),
    /// A parameter kept in its argument register
    Register(Register),
    /// Offset from `rbp`
    Frame(i32),
}

/// Storage assigned to one declaration. For reference parameters the
/// storage holds the address of the referenced place.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub storage: Storage,
    pub ty: Type,
    pub is_reference: bool,
}

/// A register parameter copied into a frame slot on entry
#[derive(Debug, Clone)]
pub struct HomedParameter {
    pub register: Register,
    pub address: Address,
    pub width: Width,
}

/// A record parameter passed by value. The caller passes the address of
/// its record; the prologue copies the fields into the callee's own slot.
#[derive(Debug, Clone)]
pub struct CopiedParameter {
    pub param: NodeRef,
    /// Holds the caller's address: an argument register or a stack slot
    pub source: Storage,
    pub address: Address,
    pub record: NameId,
}

#[derive(Debug, Default)]
pub struct Frame {
    symbols: HashMap<NodeRef, Symbol>,
    /// 16-aligned size of the local area
    pub size: u32,
    pub homed: Vec<HomedParameter>,
    pub copied: Vec<CopiedParameter>,
}

impl Frame {
    /// Assign storage to every parameter and local of `func`.
    ///
    /// Parameters 0..6 stay in their argument registers unless the body
    /// passes them to a reference parameter; those get a frame slot so they
    /// have an address. Parameters 6.. are read from the caller's frame.
    /// Records passed by value always get a slot of their own.
    pub fn layout(
        ast: &Ast,
        func: &FunctionData,
        info: &SemanticInfo,
        symbol_table: &SymbolTable,
        types: &TypeLayout,
    ) -> Result<Frame, CodegenError> {
        let address_taken = address_taken_variables(ast, func, info, symbol_table);
        let mut frame = Frame::default();
        let mut offset: u32 = 0;

        for (index, &param) in func.params.iter().enumerate() {
            let Some(decl) = ast.declaration(param) else {
                continue;
            };
            let incoming = match ARGUMENT_REGISTERS.get(index) {
                Some(&register) => Storage::Register(register),
                None => Storage::Frame(16 + 8 * (index - ARGUMENT_REGISTERS.len()) as i32),
            };
            if let (Type::Record(record), false) = (&decl.ty, decl.is_reference) {
                let size = slot_size(types, decl, ast.get_span(param))?;
                let slot = allocate(&mut offset, size, &decl.ty);
                frame.copied.push(CopiedParameter {
                    param,
                    source: incoming,
                    address: Address::frame(slot),
                    record: *record,
                });
                frame.insert(param, decl, Storage::Frame(slot));
                continue;
            }
            let storage = match incoming {
                Storage::Register(register) if address_taken.contains(&param) => {
                    let size = slot_size(types, decl, ast.get_span(param))?;
                    let slot = allocate(&mut offset, size, &decl.ty);
                    frame.homed.push(HomedParameter {
                        register,
                        address: Address::frame(slot),
                        width: Width::of_size(size),
                    });
                    Storage::Frame(slot)
                }
                other => other,
            };
            frame.insert(param, decl, storage);
        }

        for &statement in &func.body {
            let mut locals = Vec::new();
            ast.walk(statement, &mut |_, kind| {
                if let NodeKind::DeclarationStatement(decl) = kind {
                    locals.push(*decl);
                }
            });
            for local in locals {
                let Some(decl) = ast.declaration(local) else {
                    continue;
                };
                let size = slot_size(types, decl, ast.get_span(local))?;
                let slot = allocate(&mut offset, size, &decl.ty);
                frame.insert(local, decl, Storage::Frame(slot));
            }
        }

        frame.size = offset.next_multiple_of(16);
        trace!("Frame: '{}' needs {} bytes", func.name, frame.size);
        Ok(frame)
    }

    fn insert(&mut self, decl_ref: NodeRef, decl: &DeclarationData, storage: Storage) {
        trace!("Frame: '{}' -> {:?}", decl.name, storage);
        self.symbols.insert(
            decl_ref,
            Symbol {
                storage,
                ty: decl.ty.clone(),
                is_reference: decl.is_reference,
            },
        );
    }

    pub fn symbol(&self, decl_ref: NodeRef) -> Option<&Symbol> {
        self.symbols.get(&decl_ref)
    }

    /// Registers owned by parameters for the whole function
    pub fn parameter_registers(&self) -> impl Iterator<Item = Register> + '_ {
        self.symbols.values().filter_map(|symbol| match symbol.storage {
            Storage::Register(register) => Some(register),
            _ => None,
        })
    }
}

fn slot_size(types: &TypeLayout, decl: &DeclarationData, location: SourceSpan) -> Result<u32, CodegenError> {
    if decl.is_reference {
        return Ok(POINTER_SIZE);
    }
    types.size_of(&decl.ty).ok_or_else(|| CodegenError::Unsupported {
        what: format!("storage for '{}' of type {}", decl.name, decl.ty),
        location,
    })
}

/// Reserve `size` bytes below the ones already taken; returns the `rbp` offset
fn allocate(offset: &mut u32, size: u32, ty: &Type) -> i32 {
    let align = if *ty == Type::Boolean { 4 } else { 8 };
    *offset = (*offset + size).next_multiple_of(align);
    -(*offset as i32)
}

/// Declarations of variables the body passes to reference parameters
fn address_taken_variables(
    ast: &Ast,
    func: &FunctionData,
    info: &SemanticInfo,
    symbol_table: &SymbolTable,
) -> HashSet<NodeRef> {
    let mut taken = HashSet::new();
    for &statement in &func.body {
        ast.walk(statement, &mut |node_ref, kind| {
            let NodeKind::Call(call) = kind else {
                return;
            };
            let Some(CallTarget::Function(callee)) = info.call_target(node_ref) else {
                return;
            };
            let Some(callee) = ast.function(callee) else {
                return;
            };
            for (&arg, &param) in call.args.iter().zip(&callee.params) {
                let by_reference = ast.declaration(param).is_some_and(|decl| decl.is_reference);
                if !by_reference || !matches!(ast.get_kind(arg), NodeKind::Variable(_)) {
                    continue;
                }
                let Some(entry) = info.resolved_entry(arg) else {
                    continue;
                };
                if let SymbolKind::Variable { declaration, .. } = symbol_table.get_symbol_entry(entry).kind {
                    taken.insert(declaration);
                }
            }
        });
    }
    taken
}
