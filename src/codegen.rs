//! Code generation module.
//!
//! Lowers a bound and checked program to x86-64 assembly in NASM syntax:
//! - [`assembly`]: operands, instructions and the output sections
//! - [`register`]: the per-function register file
//! - [`layout`] / [`frame`]: type sizes and storage for declarations
//! - [`function`], [`expression`], [`control_flow`]: lowering proper
//!
//! Each function gets a fresh `FunctionGenerator` holding its register file,
//! frame and label counter. Nothing is shared between two functions except
//! the output buffer.

pub mod assembly;
pub mod control_flow;
pub mod error;
pub mod expression;
pub mod frame;
pub mod function;
pub mod layout;
pub mod register;

pub use error::CodegenError;

use hashbrown::HashMap;
use log::debug;

use crate::ast::{Ast, NameId, NodeRef, SemanticInfo};
use crate::codegen::assembly::Assembly;
use crate::codegen::function::FunctionGenerator;
use crate::codegen::layout::TypeLayout;
use crate::semantic::builtins::BUILTINS;
use crate::semantic::symbol_table::SymbolTable;

/// Symbol the entry function is emitted under
pub const ENTRY_LABEL: &str = "_start";

/// Prefix of every global and function symbol taken from the program, so
/// user names never clash with externs, string constants or NASM keywords.
const USER_PREFIX: &str = "mj_";

/// Assembly symbol for the user-declared global or function `name`
pub(crate) fn user_symbol(name: NameId) -> String {
    format!("{}{}", USER_PREFIX, name)
}

/// Program-level generator: externs, globals, function labels.
pub struct CodeGenerator<'a> {
    ast: &'a Ast,
    info: &'a SemanticInfo,
    symbol_table: &'a SymbolTable,
    types: TypeLayout<'a>,
    labels: HashMap<NodeRef, String>,
    assembly: Assembly,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(ast: &'a Ast, info: &'a SemanticInfo, symbol_table: &'a SymbolTable) -> Self {
        CodeGenerator {
            ast,
            info,
            symbol_table,
            types: TypeLayout::new(symbol_table),
            labels: HashMap::new(),
            assembly: Assembly::new(),
        }
    }

    /// Generate the complete assembly file
    pub fn generate(mut self) -> Result<String, CodegenError> {
        let Some(unit) = self.ast.unit() else {
            return Ok(self.assembly.finish());
        };

        for builtin in &BUILTINS {
            self.assembly.declare_extern(builtin.name);
        }
        self.assembly.declare_global(ENTRY_LABEL);

        for &global in &unit.globals {
            let Some(decl) = self.ast.declaration(global) else {
                continue;
            };
            let size = self.types.size_of(&decl.ty).ok_or_else(|| CodegenError::Unsupported {
                what: format!("storage for global '{}' of type {}", decl.name, decl.ty),
                location: self.ast.get_span(global),
            })?;
            self.assembly.reserve(user_symbol(decl.name), size);
        }

        self.assign_function_labels(&unit.functions);

        for &func_ref in &unit.functions {
            let Some(label) = self.labels.get(&func_ref).cloned() else {
                continue;
            };
            debug!("CodeGenerator: emitting '{}'", label);
            FunctionGenerator::new(
                self.ast,
                self.info,
                self.symbol_table,
                &self.types,
                &self.labels,
                &mut self.assembly,
            )
            .generate(func_ref, &label)?;
        }

        Ok(self.assembly.finish())
    }

    /// `main` becomes the entry symbol. A name used by one function is
    /// emitted as `mj_name`; overloads are numbered `mj_name@k` in
    /// declaration order.
    fn assign_function_labels(&mut self, functions: &[NodeRef]) {
        let mut counts: HashMap<_, usize> = HashMap::new();
        for &func_ref in functions {
            if let Some(func) = self.ast.function(func_ref) {
                *counts.entry(func.name).or_default() += 1;
            }
        }

        let mut seen: HashMap<_, usize> = HashMap::new();
        for &func_ref in functions {
            let Some(func) = self.ast.function(func_ref) else {
                continue;
            };
            let k = seen.entry(func.name).or_default();
            let label = if func.name.as_str() == "main" {
                ENTRY_LABEL.to_string()
            } else if counts[&func.name] == 1 {
                user_symbol(func.name)
            } else {
                format!("{}@{}", user_symbol(func.name), k)
            };
            *k += 1;
            debug!("CodeGenerator: '{}' labelled {}", func.name, label);
            self.labels.insert(func_ref, label);
        }
    }
}

/// Lower a checked program to NASM text
pub fn generate_assembly(ast: &Ast, info: &SemanticInfo, symbol_table: &SymbolTable) -> Result<String, CodegenError> {
    CodeGenerator::new(ast, info, symbol_table).generate()
}
