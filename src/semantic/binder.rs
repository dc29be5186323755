//! Pass 1: scope construction and name binding.
//!
//! The binder walks the unit depth-first. Globals, records and functions are
//! registered in the global scope; each record and each function opens one
//! child scope that is seeded with its own name and holds its fields, or its
//! parameters plus every local declared anywhere in its body. Variable uses
//! are resolved against the scope chain as they are met.
//!
//! The pass stops at the first error. Besides the symbol table it produces a
//! [`SemanticInfo`] with the scope of every analyzed node and the declaration
//! entry of every variable use.

use log::debug;

use crate::ast::*;
use crate::diagnostic::{DiagnosticEngine, SemanticError};
use crate::semantic::builtins;
use crate::semantic::symbol_table::{
    FunctionSignature, RecordField, ScopeId, SymbolEntryRef, SymbolKind, SymbolTable, VariableStorage,
};

/// Run pass 1 over `ast`, reporting the first error into `diag`.
pub fn run_binder(ast: &Ast, diag: &mut DiagnosticEngine, symbol_table: &mut SymbolTable) -> SemanticInfo {
    builtins::register_builtins(symbol_table);

    let mut binder = Binder {
        ast,
        symbol_table,
        info: SemanticInfo::with_capacity(ast.len()),
    };
    if let Err(error) = binder.bind_unit(ast.get_root()) {
        debug!("Binder: stopped at first error: {}", error);
        diag.report_error(error);
    }
    binder.info
}

struct Binder<'a> {
    ast: &'a Ast,
    symbol_table: &'a mut SymbolTable,
    info: SemanticInfo,
}

impl<'a> Binder<'a> {
    fn record_scope(&mut self, node_ref: NodeRef) {
        self.info.scopes[node_ref.index()] = Some(self.symbol_table.current_scope());
    }

    fn bind_unit(&mut self, root: NodeRef) -> Result<(), SemanticError> {
        let NodeKind::Unit(unit) = self.ast.get_kind(root) else {
            return Ok(());
        };
        self.record_scope(root);

        for &global in &unit.globals {
            self.declare_variable(global, VariableStorage::Global)?;
        }
        for &record in &unit.records {
            self.bind_record(record)?;
        }
        for &function in &unit.functions {
            self.bind_function(function)?;
        }
        Ok(())
    }

    /// Register a `Declaration` node in the current scope
    fn declare_variable(&mut self, decl_ref: NodeRef, storage: VariableStorage) -> Result<(), SemanticError> {
        let Some(decl) = self.ast.declaration(decl_ref) else {
            return Ok(());
        };
        let span = self.ast.get_span(decl_ref);
        self.ensure_unique_in_scope(decl.name, span)?;
        self.record_scope(decl_ref);
        self.symbol_table.add_symbol(
            decl.name,
            SymbolKind::Variable {
                ty: decl.ty.clone(),
                is_reference: decl.is_reference,
                storage,
                declaration: decl_ref,
            },
            span,
        );
        Ok(())
    }

    fn ensure_unique_in_scope(&self, name: NameId, span: SourceSpan) -> Result<(), SemanticError> {
        let scope = self.symbol_table.current_scope();
        match self.symbol_table.lookup_symbol_in_scope(name, scope) {
            Some(existing) => Err(SemanticError::Redefinition {
                name,
                first_def: self.symbol_table.get_symbol_entry(existing).def_span,
                second_def: span,
            }),
            None => Ok(()),
        }
    }

    fn bind_record(&mut self, record_ref: NodeRef) -> Result<(), SemanticError> {
        let Some(record) = self.ast.record(record_ref) else {
            return Ok(());
        };
        let span = self.ast.get_span(record_ref);
        debug!("Binder: record '{}'", record.name);

        self.ensure_unique_in_scope(record.name, span)?;
        self.record_scope(record_ref);
        let fields = record
            .fields
            .iter()
            .filter_map(|&field| self.ast.declaration(field))
            .map(|decl| RecordField {
                name: decl.name,
                ty: decl.ty.clone(),
            })
            .collect();
        let entry = self.symbol_table.add_symbol(
            record.name,
            SymbolKind::Record {
                fields,
                declaration: record_ref,
            },
            span,
        );

        self.symbol_table.push_scope();
        self.symbol_table.alias_symbol(record.name, entry);
        let result = record
            .fields
            .iter()
            .try_for_each(|&field| self.declare_variable(field, VariableStorage::Field));
        self.symbol_table.pop_scope();
        result
    }

    fn bind_function(&mut self, func_ref: NodeRef) -> Result<(), SemanticError> {
        let Some(func) = self.ast.function(func_ref) else {
            return Ok(());
        };
        let span = self.ast.get_span(func_ref);
        debug!("Binder: function '{}'", func.name);

        if func.name.as_str() == "main" {
            if func.return_type != Type::Integer {
                return Err(SemanticError::InvalidMainReturnType {
                    found: func.return_type.clone(),
                    location: span,
                });
            }
            if !func.params.is_empty() {
                return Err(SemanticError::MainHasParameters { location: span });
            }
        }

        let signature = FunctionSignature {
            return_type: func.return_type.clone(),
            params: func
                .params
                .iter()
                .filter_map(|&p| self.ast.declaration(p).cloned())
                .collect(),
            definition: Some(func_ref),
        };
        self.record_scope(func_ref);
        let entry = self.register_overload(func.name, signature, span)?;

        let function_scope = self.symbol_table.push_scope();
        self.symbol_table.alias_symbol(func.name, entry);
        let result = self.bind_function_body(func, function_scope);
        self.symbol_table.pop_scope();
        result?;

        if func.return_type != Type::Void && func.name.as_str() != "main" && !has_top_level_return(self.ast, &func.body)
        {
            return Err(SemanticError::MissingReturn {
                name: func.name,
                location: span,
            });
        }
        Ok(())
    }

    /// Add `signature` to the overload set `name` in the current scope
    fn register_overload(
        &mut self,
        name: NameId,
        signature: FunctionSignature,
        span: SourceSpan,
    ) -> Result<SymbolEntryRef, SemanticError> {
        let scope = self.symbol_table.current_scope();
        let Some(existing) = self.symbol_table.lookup_symbol_in_scope(name, scope) else {
            return Ok(self.symbol_table.add_symbol(
                name,
                SymbolKind::Function {
                    overloads: vec![signature],
                },
                span,
            ));
        };

        let entry = self.symbol_table.get_symbol_entry_mut(existing);
        let first_def = entry.def_span;
        let SymbolKind::Function { overloads } = &mut entry.kind else {
            return Err(SemanticError::Redefinition {
                name,
                first_def,
                second_def: span,
            });
        };
        let duplicate = overloads
            .iter()
            .any(|other| other.return_type == signature.return_type && other.params == signature.params);
        if duplicate {
            return Err(SemanticError::DuplicateFunction {
                name,
                signature: signature.param_list(),
                location: span,
            });
        }
        debug!("Binder: overload #{} of '{}'", overloads.len() + 1, name);
        overloads.push(signature);
        Ok(existing)
    }

    fn bind_function_body(&mut self, func: &FunctionData, scope: ScopeId) -> Result<(), SemanticError> {
        for (index, &param) in func.params.iter().enumerate() {
            self.declare_variable(param, VariableStorage::Parameter(index as u32))?;
        }
        for &statement in &func.body {
            self.bind_node(statement)?;
        }
        debug_assert_eq!(self.symbol_table.current_scope(), scope);
        Ok(())
    }

    /// Bind a statement or expression inside a function body
    fn bind_node(&mut self, node_ref: NodeRef) -> Result<(), SemanticError> {
        self.record_scope(node_ref);
        match self.ast.get_kind(node_ref) {
            NodeKind::DeclarationStatement(decl) => self.declare_variable(*decl, VariableStorage::Local),
            NodeKind::Variable(name) => self.resolve_variable(node_ref, *name),
            NodeKind::LiteralInt(_) | NodeKind::LiteralString(_) | NodeKind::LiteralBool(_) => Ok(()),
            NodeKind::EmptyStatement | NodeKind::Dummy => Ok(()),
            NodeKind::FieldAccess(base, _) => self.bind_node(*base),
            NodeKind::ArrayAccess(base, index) => {
                self.bind_node(*base)?;
                self.bind_node(*index)
            }
            NodeKind::UnaryOp(_, operand) => self.bind_node(*operand),
            NodeKind::BinaryOp(_, left, right) | NodeKind::Assignment(left, right) => {
                self.bind_node(*left)?;
                self.bind_node(*right)
            }
            NodeKind::Call(call) => call.args.iter().try_for_each(|&arg| self.bind_node(arg)),
            NodeKind::CallStatement(call) => self.bind_node(*call),
            NodeKind::Block(statements) => statements.iter().try_for_each(|&s| self.bind_node(s)),
            NodeKind::If(stmt) => {
                self.bind_node(stmt.condition)?;
                self.bind_node(stmt.then_block)?;
                stmt.else_block.map_or(Ok(()), |else_block| self.bind_node(else_block))
            }
            NodeKind::While(stmt) => {
                self.bind_node(stmt.condition)?;
                self.bind_node(stmt.body)
            }
            NodeKind::Return(value) => value.map_or(Ok(()), |value| self.bind_node(value)),
            // entities never appear below a statement
            NodeKind::Declaration(_) | NodeKind::Function(_) | NodeKind::Record(_) | NodeKind::Unit(_) => Ok(()),
        }
    }

    fn resolve_variable(&mut self, node_ref: NodeRef, name: NameId) -> Result<(), SemanticError> {
        let location = self.ast.get_span(node_ref);
        let Some((entry_ref, scope)) = self.symbol_table.lookup_symbol(name) else {
            return Err(SemanticError::UndeclaredIdentifier { name, location });
        };
        if !matches!(self.symbol_table.get_symbol_entry(entry_ref).kind, SymbolKind::Variable { .. }) {
            return Err(SemanticError::NotAVariable { name, location });
        }
        debug!("Binder: '{}' resolved in scope {}", name, scope.get());
        self.info.resolved[node_ref.index()] = Some(entry_ref);
        Ok(())
    }
}

/// Shallow return check: a top-level `return`, or a top-level `if` whose
/// then-block or else-block directly contains one. Loops and nested blocks
/// are not inspected.
pub fn has_top_level_return(ast: &Ast, body: &[NodeRef]) -> bool {
    let block_returns = |block: NodeRef| match ast.get_kind(block) {
        NodeKind::Block(statements) => statements
            .iter()
            .any(|&s| matches!(ast.get_kind(s), NodeKind::Return(_))),
        _ => false,
    };
    body.iter().any(|&statement| match ast.get_kind(statement) {
        NodeKind::Return(_) => true,
        NodeKind::If(stmt) => block_returns(stmt.then_block) || stmt.else_block.is_some_and(block_returns),
        _ => false,
    })
}
