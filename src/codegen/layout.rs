//! Storage sizes and record field offsets as the generator lays them out.

use crate::ast::{NameId, Type};
use crate::semantic::symbol_table::SymbolTable;

/// Strings and arrays are stored as pointers
pub const POINTER_SIZE: u32 = 8;

pub struct TypeLayout<'a> {
    symbol_table: &'a SymbolTable,
}

impl<'a> TypeLayout<'a> {
    pub fn new(symbol_table: &'a SymbolTable) -> Self {
        TypeLayout { symbol_table }
    }

    /// Bytes a value of `ty` occupies in memory. Records are packed in
    /// field order. `None` for void and for self-containing records.
    pub fn size_of(&self, ty: &Type) -> Option<u32> {
        ty.storage_size(self.symbol_table, Some(POINTER_SIZE))
    }

    /// Byte offset and type of `field` inside `record`
    pub fn field(&self, record: NameId, field: NameId) -> Option<(i32, Type)> {
        let mut offset = 0;
        for candidate in self.symbol_table.lookup_record(record)? {
            if candidate.name == field {
                return Some((offset as i32, candidate.ty.clone()));
            }
            offset += self.size_of(&candidate.ty)?;
        }
        None
    }

    /// Fields of `record` with their offsets, in declaration order
    pub fn fields(&self, record: NameId) -> Option<Vec<(i32, Type)>> {
        let mut offset = 0;
        let mut fields = Vec::new();
        for field in self.symbol_table.lookup_record(record)? {
            fields.push((offset as i32, field.ty.clone()));
            offset += self.size_of(&field.ty)?;
        }
        Some(fields)
    }
}
