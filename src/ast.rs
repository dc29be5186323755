//! Abstract Syntax Tree (AST) for MiniJ programs.
//!
//! The AST is a flattened arena: every node lives in `Ast::kinds` and refers to
//! its children through `NodeRef` indices. Semantic passes never mutate node
//! kinds; their results are kept in a side table (`SemanticInfo`) keyed by the
//! same indices.
//!
//! - [`nodes`]: node definitions and operator enums
//! - [`types`]: the closed MiniJ type model
//! - [`visitor`]: child enumeration shared by every pass
//! - [`dumper`]: indented text outline of a tree

use std::num::NonZeroU32;

/// Represents an interned string using symbol_table crate.
pub type NameId = symbol_table::GlobalSymbol;

pub use crate::semantic::SemanticInfo;
pub use crate::source_manager::{SourceId, SourceLoc, SourceSpan};

pub mod dumper;
pub mod nodes;
pub mod types;
pub mod visitor;

pub use nodes::*;
pub use types::Type;

/// The flattened AST storage.
#[derive(Clone, Debug, Default)]
pub struct Ast {
    pub kinds: Vec<NodeKind>,
    pub spans: Vec<SourceSpan>,
    pub semantic_info: Option<SemanticInfo>, // Populated by the binder and checker
}

impl Ast {
    /// Create a new empty AST
    pub fn new() -> Self {
        Ast::default()
    }

    /// Add a node to the AST and return its reference
    pub(crate) fn push_node(&mut self, kind: NodeKind, span: SourceSpan) -> NodeRef {
        let index = self.kinds.len() as u32 + 1; // Start from 1 for NonZeroU32
        self.kinds.push(kind);
        self.spans.push(span);
        NodeRef::new(index).expect("NodeRef overflow")
    }

    /// Add a dummy node to the AST and return its reference
    pub(crate) fn push_dummy(&mut self, span: SourceSpan) -> NodeRef {
        self.push_node(NodeKind::Dummy, span)
    }

    /// Overwrite a placeholder created with `push_dummy`
    pub(crate) fn replace_node(&mut self, node_ref: NodeRef, kind: NodeKind, span: SourceSpan) {
        self.kinds[node_ref.index()] = kind;
        self.spans[node_ref.index()] = span;
    }

    /// Get node kind by reference
    pub fn get_kind(&self, node_ref: NodeRef) -> &NodeKind {
        &self.kinds[node_ref.index()]
    }

    /// Get node span by reference
    pub fn get_span(&self, node_ref: NodeRef) -> SourceSpan {
        self.spans[node_ref.index()]
    }

    /// get root node ref
    pub fn get_root(&self) -> NodeRef {
        NodeRef::ROOT
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// The unit stored at the root, if the tree has been built
    pub fn unit(&self) -> Option<&UnitData> {
        match self.kinds.first() {
            Some(NodeKind::Unit(unit)) => Some(unit),
            _ => None,
        }
    }

    /// Declaration payload of a `Declaration` node
    pub fn declaration(&self, node_ref: NodeRef) -> Option<&DeclarationData> {
        match self.get_kind(node_ref) {
            NodeKind::Declaration(decl) => Some(decl),
            _ => None,
        }
    }

    pub fn function(&self, node_ref: NodeRef) -> Option<&FunctionData> {
        match self.get_kind(node_ref) {
            NodeKind::Function(func) => Some(func),
            _ => None,
        }
    }

    pub fn record(&self, node_ref: NodeRef) -> Option<&RecordData> {
        match self.get_kind(node_ref) {
            NodeKind::Record(record) => Some(record),
            _ => None,
        }
    }

    /// attach semantic info side table for AST
    pub fn attach_semantic_info(&mut self, semantic_info: SemanticInfo) {
        self.semantic_info = Some(semantic_info);
    }

    /// Get the type the checker computed for an expression node
    pub fn get_resolved_type(&self, node_ref: NodeRef) -> Option<&Type> {
        self.semantic_info.as_ref()?.types.get(node_ref.index())?.as_ref()
    }
}

/// Node reference type for referencing child nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(NonZeroU32);

impl NodeRef {
    pub const ROOT: NodeRef = NodeRef(NonZeroU32::new(1).unwrap());

    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    pub fn index(self) -> usize {
        (self.get() - 1) as usize
    }
}
