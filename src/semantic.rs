//! Semantic analysis module.
//!
//! Two passes run over the finished AST:
//! - the binder ([`binder`]) builds the scope tree, registers every
//!   declaration, function and record, resolves variable uses and validates
//!   function shape (entry point, missing return, duplicates);
//! - the type checker ([`type_checker`]) computes expression types, resolves
//!   call overloads and removes the builtin stubs again.
//!
//! Both passes stop at the first error. Their results live in
//! [`SemanticInfo`], a side table indexed like the AST arena.

pub mod binder;
pub mod builtins;
pub mod operators;
pub mod symbol_table;
pub mod type_checker;

pub use binder::run_binder;
pub use symbol_table::{
    FunctionSignature, RecordField, ScopeId, SymbolEntry, SymbolEntryRef, SymbolKind, SymbolTable, VariableStorage,
};
pub use type_checker::run_type_checker;

use crate::ast::{NameId, NodeRef, Type};

/// Resolved target of a call expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget {
    /// A user-defined `Function` node
    Function(NodeRef),
    /// An externally implemented runtime primitive
    Builtin(NameId),
}

/// Per-node results of semantic analysis, indexed by `NodeRef::index()`.
#[derive(Debug, Clone, Default)]
pub struct SemanticInfo {
    /// Scope every analyzed node was analyzed in
    pub scopes: Vec<Option<ScopeId>>,
    /// Declaration entry a `Variable` node refers to
    pub resolved: Vec<Option<SymbolEntryRef>>,
    /// Type of every expression node, filled by the checker
    pub types: Vec<Option<Type>>,
    /// Overload chosen for every `Call` node, filled by the checker
    pub call_targets: Vec<Option<CallTarget>>,
}

impl SemanticInfo {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            scopes: vec![None; n],
            resolved: vec![None; n],
            types: vec![None; n],
            call_targets: vec![None; n],
        }
    }

    pub fn scope_of(&self, node_ref: NodeRef) -> Option<ScopeId> {
        self.scopes.get(node_ref.index()).copied().flatten()
    }

    pub fn resolved_entry(&self, node_ref: NodeRef) -> Option<SymbolEntryRef> {
        self.resolved.get(node_ref.index()).copied().flatten()
    }

    pub fn type_of(&self, node_ref: NodeRef) -> Option<&Type> {
        self.types.get(node_ref.index())?.as_ref()
    }

    pub fn call_target(&self, node_ref: NodeRef) -> Option<CallTarget> {
        self.call_targets.get(node_ref.index()).copied().flatten()
    }
}
