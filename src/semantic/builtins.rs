//! Runtime primitives implemented outside the compiled program.
//!
//! The binder registers one stub per primitive so calls to them resolve; the
//! checker drops the stubs once every call has been resolved. The generator
//! only needs their names for `extern` lines.

use crate::ast::{DeclarationData, NameId, Type};
use crate::semantic::symbol_table::{FunctionSignature, SymbolKind, SymbolTable};
use crate::source_manager::SourceSpan;

/// A builtin function: name, return type and parameter types
pub struct Builtin {
    pub name: &'static str,
    pub return_type: Type,
    pub params: &'static [Type],
}

pub const BUILTINS: [Builtin; 5] = [
    Builtin {
        name: "readInt",
        return_type: Type::Integer,
        params: &[],
    },
    Builtin {
        name: "readChar",
        return_type: Type::Integer,
        params: &[],
    },
    Builtin {
        name: "writeInt",
        return_type: Type::Void,
        params: &[Type::Integer],
    },
    Builtin {
        name: "writeChar",
        return_type: Type::Void,
        params: &[Type::Integer],
    },
    Builtin {
        name: "_exit",
        return_type: Type::Void,
        params: &[Type::Integer],
    },
];

impl Builtin {
    pub fn signature(&self) -> FunctionSignature {
        FunctionSignature {
            return_type: self.return_type.clone(),
            params: self
                .params
                .iter()
                .map(|ty| DeclarationData {
                    name: NameId::new("x"),
                    ty: ty.clone(),
                    is_reference: false,
                })
                .collect(),
            definition: None,
        }
    }
}

pub fn is_builtin(name: NameId) -> bool {
    BUILTINS.iter().any(|b| b.name == name.as_str())
}

/// Register every builtin stub in the current (global) scope
pub fn register_builtins(symbol_table: &mut SymbolTable) {
    for builtin in &BUILTINS {
        symbol_table.add_symbol(
            NameId::new(builtin.name),
            SymbolKind::Function {
                overloads: vec![builtin.signature()],
            },
            SourceSpan::empty(),
        );
    }
}
