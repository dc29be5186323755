//! Symbol table management and scope handling.
//!
//! Scopes form a tree rooted at the global scope: one child per function and
//! per record. Blocks inside a function do not open scopes, so every local of
//! a function lives in the function's single scope.

use hashbrown::HashMap;
use std::num::NonZeroU32;

use log::debug;

use crate::ast::types::RecordLookup;
use crate::ast::*;

pub type SymbolEntryRef = NonZeroU32;

/// A resolved symbol entry
#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub name: NameId,
    pub kind: SymbolKind,
    pub scope_id: ScopeId, // scope where it's defined
    pub def_span: SourceSpan,
}

/// Defines the kind of symbol.
#[derive(Debug, Clone)]
pub enum SymbolKind {
    Variable {
        ty: Type,
        is_reference: bool,
        storage: VariableStorage,
        declaration: NodeRef,
    },
    /// All overloads sharing one name in one scope
    Function { overloads: Vec<FunctionSignature> },
    Record {
        fields: Vec<RecordField>,
        declaration: NodeRef,
    },
}

/// Where a variable was declared, which decides its storage class later on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableStorage {
    Global,
    Parameter(u32),
    Local,
    Field,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub return_type: Type,
    pub params: Vec<DeclarationData>,
    /// `None` for builtin stubs
    pub definition: Option<NodeRef>,
}

impl FunctionSignature {
    pub fn is_builtin(&self) -> bool {
        self.definition.is_none()
    }

    /// Parameter types as they would be written in source, e.g. `int, R&`
    pub fn param_list(&self) -> String {
        self.params
            .iter()
            .map(|p| format!("{}{}", p.ty, if p.is_reference { "&" } else { "" }))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: NameId,
    pub ty: Type,
}

/// Scope ID for efficient scope references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(NonZeroU32);

impl ScopeId {
    pub const GLOBAL: Self = Self(NonZeroU32::new(1).unwrap());

    pub fn new(id: u32) -> Option<Self> {
        NonZeroU32::new(id).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// Scope information
#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub symbols: HashMap<NameId, SymbolEntryRef>,
}

/// Symbol table using flattened storage
#[derive(Debug)]
pub struct SymbolTable {
    pub entries: Vec<SymbolEntry>,
    pub scopes: Vec<Scope>,
    current_scope_id: ScopeId,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            entries: Vec::new(),
            scopes: vec![Scope {
                parent: None,
                symbols: HashMap::new(),
            }],
            current_scope_id: ScopeId::GLOBAL,
        }
    }

    /// Open a child scope of the current one and make it current
    pub fn push_scope(&mut self) -> ScopeId {
        self.scopes.push(Scope {
            parent: Some(self.current_scope_id),
            symbols: HashMap::new(),
        });
        let new_scope_id = ScopeId::new(self.scopes.len() as u32).expect("ScopeId overflow");
        self.current_scope_id = new_scope_id;
        debug!(
            "SymbolTable: Pushed new scope. New current_scope_id: {}",
            self.current_scope_id.get()
        );
        new_scope_id
    }

    pub fn pop_scope(&mut self) -> Option<ScopeId> {
        let before = self.current_scope_id;
        let parent = self.get_scope(before).parent?;
        self.current_scope_id = parent;
        debug!(
            "SymbolTable: Popped scope. Old current_scope_id: {}, New current_scope_id: {}",
            before.get(),
            parent.get()
        );
        Some(parent)
    }

    pub fn current_scope(&self) -> ScopeId {
        self.current_scope_id
    }

    pub fn get_scope(&self, scope_id: ScopeId) -> &Scope {
        &self.scopes[scope_id.get() as usize - 1]
    }

    fn get_scope_mut(&mut self, scope_id: ScopeId) -> &mut Scope {
        &mut self.scopes[scope_id.get() as usize - 1]
    }

    /// Add a new entry to the current scope
    pub fn add_symbol(&mut self, name: NameId, kind: SymbolKind, def_span: SourceSpan) -> SymbolEntryRef {
        let scope_id = self.current_scope_id;
        let entry_ref = self.push_symbol_entry(SymbolEntry {
            name,
            kind,
            scope_id,
            def_span,
        });
        debug!("SymbolTable: Added '{}' to scope {}", name, scope_id.get());
        self.get_scope_mut(scope_id).symbols.insert(name, entry_ref);
        entry_ref
    }

    /// Make an existing entry visible under `name` in the current scope as well
    pub fn alias_symbol(&mut self, name: NameId, entry_ref: SymbolEntryRef) {
        let scope_id = self.current_scope_id;
        self.get_scope_mut(scope_id).symbols.insert(name, entry_ref);
    }

    pub fn lookup_symbol(&self, name: NameId) -> Option<(SymbolEntryRef, ScopeId)> {
        self.lookup_symbol_from(name, self.current_scope_id)
    }

    /// Resolve `name` starting at `start_scope` and walking outwards
    pub fn lookup_symbol_from(&self, name: NameId, start_scope: ScopeId) -> Option<(SymbolEntryRef, ScopeId)> {
        let mut scope_id = start_scope;
        loop {
            let scope = self.get_scope(scope_id);
            if let Some(&entry_ref) = scope.symbols.get(&name) {
                return Some((entry_ref, scope_id));
            }
            scope_id = scope.parent?;
        }
    }

    pub fn lookup_symbol_in_scope(&self, name: NameId, scope_id: ScopeId) -> Option<SymbolEntryRef> {
        self.get_scope(scope_id).symbols.get(&name).copied()
    }

    /// Nearest function overload set named `name`, skipping shadowing variables
    pub fn lookup_function(&self, name: NameId, start_scope: ScopeId) -> Option<&[FunctionSignature]> {
        let mut scope_id = Some(start_scope);
        while let Some(id) = scope_id {
            let scope = self.get_scope(id);
            if let Some(&entry_ref) = scope.symbols.get(&name)
                && let SymbolKind::Function { overloads } = &self.get_symbol_entry(entry_ref).kind
            {
                return Some(overloads);
            }
            scope_id = scope.parent;
        }
        None
    }

    /// Record declared in the global scope
    pub fn lookup_record(&self, name: NameId) -> Option<&[RecordField]> {
        let entry_ref = self.lookup_symbol_in_scope(name, ScopeId::GLOBAL)?;
        match &self.get_symbol_entry(entry_ref).kind {
            SymbolKind::Record { fields, .. } => Some(fields),
            _ => None,
        }
    }

    fn push_symbol_entry(&mut self, entry: SymbolEntry) -> SymbolEntryRef {
        self.entries.push(entry);
        SymbolEntryRef::new(self.entries.len() as u32).expect("SymbolEntryRef overflow")
    }

    pub fn get_symbol_entry(&self, index: SymbolEntryRef) -> &SymbolEntry {
        &self.entries[(index.get() - 1) as usize]
    }

    pub fn get_symbol_entry_mut(&mut self, index: SymbolEntryRef) -> &mut SymbolEntry {
        &mut self.entries[(index.get() - 1) as usize]
    }

    /// Drop builtin stubs from every overload set; names left without any
    /// overload disappear from their scope.
    pub fn remove_builtin_functions(&mut self) {
        let mut emptied = Vec::new();
        for (i, entry) in self.entries.iter_mut().enumerate() {
            if let SymbolKind::Function { overloads } = &mut entry.kind {
                let before = overloads.len();
                overloads.retain(|sig| !sig.is_builtin());
                if overloads.len() != before {
                    debug!("SymbolTable: Removed builtin stub(s) for '{}'", entry.name);
                }
                if overloads.is_empty() {
                    emptied.push((entry.name, entry.scope_id, i));
                }
            }
        }
        for (name, scope_id, index) in emptied {
            let entry_ref = SymbolEntryRef::new(index as u32 + 1).expect("SymbolEntryRef overflow");
            let scope = self.get_scope_mut(scope_id);
            if scope.symbols.get(&name) == Some(&entry_ref) {
                scope.symbols.remove(&name);
            }
        }
    }

    /// Number of scopes, including the global one
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }
}

impl RecordLookup for SymbolTable {
    fn record_field_types(&self, name: NameId) -> Option<Vec<&Type>> {
        self.lookup_record(name)
            .map(|fields| fields.iter().map(|field| &field.ty).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(ty: Type) -> SymbolKind {
        SymbolKind::Variable {
            ty,
            is_reference: false,
            storage: VariableStorage::Local,
            declaration: NodeRef::ROOT,
        }
    }

    #[test]
    fn lookup_walks_to_enclosing_scopes() {
        let mut table = SymbolTable::new();
        let x = NameId::new("x");
        let global = table.add_symbol(x, variable(Type::Integer), SourceSpan::empty());

        let inner = table.push_scope();
        assert_eq!(table.lookup_symbol(x), Some((global, ScopeId::GLOBAL)));
        assert_eq!(table.lookup_symbol_in_scope(x, inner), None);

        let shadow = table.add_symbol(x, variable(Type::Boolean), SourceSpan::empty());
        assert_eq!(table.lookup_symbol(x), Some((shadow, inner)));

        assert_eq!(table.pop_scope(), Some(ScopeId::GLOBAL));
        assert_eq!(table.lookup_symbol(x), Some((global, ScopeId::GLOBAL)));
        assert_eq!(table.pop_scope(), None);
    }

    #[test]
    fn removing_builtins_keeps_user_overloads() {
        let mut table = SymbolTable::new();
        let name = NameId::new("writeInt");
        let builtin = FunctionSignature {
            return_type: Type::Void,
            params: vec![],
            definition: None,
        };
        let user = FunctionSignature {
            definition: Some(NodeRef::ROOT),
            ..builtin.clone()
        };
        table.add_symbol(
            name,
            SymbolKind::Function {
                overloads: vec![builtin.clone(), user.clone()],
            },
            SourceSpan::empty(),
        );
        let only_builtin = NameId::new("readInt");
        table.add_symbol(
            only_builtin,
            SymbolKind::Function { overloads: vec![builtin] },
            SourceSpan::empty(),
        );

        table.remove_builtin_functions();

        assert_eq!(table.lookup_function(name, ScopeId::GLOBAL), Some(&[user][..]));
        assert_eq!(table.lookup_symbol(only_builtin), None);
    }
}
