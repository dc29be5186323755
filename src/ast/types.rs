//! The MiniJ type model.
//!
//! Types form a closed set compared structurally: two arrays are equal when
//! their element types are, two records when their names are. There are no
//! implicit conversions anywhere in the language.

use std::fmt;

use serde::{Serialize, Serializer};

use super::NameId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Boolean,
    Integer,
    String,
    Array(Box<Type>),
    Record(NameId),
}

/// Field type lookup for records, used by the size query.
pub trait RecordLookup {
    fn record_field_types(&self, name: NameId) -> Option<Vec<&Type>>;
}

impl Type {
    pub fn array_of(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    pub fn is_record(&self) -> bool {
        matches!(self, Type::Record(_))
    }

    /// Innermost non-array type (`int[][]` -> `int`)
    pub fn base_type(&self) -> &Type {
        match self {
            Type::Array(element) => element.base_type(),
            other => other,
        }
    }

    /// Storage size in bytes.
    ///
    /// Scalars have a fixed size, records are the recursive sum of their
    /// fields. Strings, arrays and void have no modeled size and yield `None`,
    /// as does a record that is unknown or contains itself.
    pub fn size(&self, records: &dyn RecordLookup) -> Option<u32> {
        self.storage_size(records, None)
    }

    /// Like [`Type::size`], but strings and arrays occupy `handle_size`
    /// bytes when it is given (they are stored as pointers).
    pub fn storage_size(&self, records: &dyn RecordLookup, handle_size: Option<u32>) -> Option<u32> {
        let mut visiting = Vec::new();
        self.size_inner(records, handle_size, &mut visiting)
    }

    fn size_inner(&self, records: &dyn RecordLookup, handle_size: Option<u32>, visiting: &mut Vec<NameId>) -> Option<u32> {
        match self {
            Type::Boolean => Some(4),
            Type::Integer => Some(8),
            Type::Void => None,
            Type::String | Type::Array(_) => handle_size,
            Type::Record(name) => {
                if visiting.contains(name) {
                    return None;
                }
                visiting.push(*name);
                let mut total = 0;
                for field in records.record_field_types(*name)? {
                    total += field.size_inner(records, handle_size, visiting)?;
                }
                visiting.pop();
                Some(total)
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Boolean => write!(f, "bool"),
            Type::Integer => write!(f, "int"),
            Type::String => write!(f, "text"),
            Type::Array(element) => write!(f, "{}[]", element),
            Type::Record(name) => write!(f, "{}", name),
        }
    }
}

impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
