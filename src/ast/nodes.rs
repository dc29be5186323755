//! AST node definitions.
//!
//! `NodeKind` is a closed sum type; every pass is one exhaustive `match` over
//! it. Large payloads live in separate structs to keep the enum small.

use std::fmt;

use thin_vec::ThinVec;

use super::{NameId, NodeRef, Type};

#[derive(Debug, Clone)]
pub enum NodeKind {
    // --- Constants ---
    LiteralInt(i64),
    LiteralString(NameId),
    LiteralBool(bool),

    // --- Expressions ---
    Variable(NameId),
    FieldAccess(NodeRef /* base */, NameId /* field */),
    ArrayAccess(NodeRef /* base */, NodeRef /* index */),
    UnaryOp(UnaryOp, NodeRef),
    BinaryOp(BinaryOp, NodeRef, NodeRef),
    Call(CallExpr),

    // --- Statements ---
    Block(ThinVec<NodeRef>),
    DeclarationStatement(NodeRef /* Declaration */),
    Assignment(NodeRef /* lhs */, NodeRef /* rhs */),
    CallStatement(NodeRef /* Call */),
    If(IfStmt),
    While(WhileStmt),
    Return(Option<NodeRef>),
    EmptyStatement,

    // --- Entities ---
    Declaration(DeclarationData),
    Function(FunctionData),
    Record(RecordData),

    // --- Top Level ---
    Unit(UnitData),

    // --- Dummy Node ---
    Dummy,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub name: NameId,
    pub args: ThinVec<NodeRef>,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: NodeRef,
    pub then_block: NodeRef,          // always a Block
    pub else_block: Option<NodeRef>, // always a Block
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub condition: NodeRef,
    pub body: NodeRef, // always a Block
}

/// `(identifier, type, is_reference)`; equality covers all three fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclarationData {
    pub name: NameId,
    pub ty: Type,
    pub is_reference: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionData {
    pub name: NameId,
    pub return_type: Type,
    pub params: ThinVec<NodeRef>, // Declaration nodes
    pub body: ThinVec<NodeRef>,   // statements, including DeclarationStatements
}

#[derive(Debug, Clone)]
pub struct RecordData {
    pub name: NameId,
    pub fields: ThinVec<NodeRef>, // Declaration nodes
}

#[derive(Debug, Clone, Default)]
pub struct UnitData {
    pub globals: ThinVec<NodeRef>,
    pub records: ThinVec<NodeRef>,
    pub functions: ThinVec<NodeRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Minus,
    Not,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

impl UnaryOp {
    pub fn is_increment_or_decrement(self) -> bool {
        !matches!(self, UnaryOp::Minus | UnaryOp::Not)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Plus,
    Minus,
    Times,
    Div,
    Mod,
    Equal,
    Unequal,
    Lesser,
    LesserEq,
    Greater,
    GreaterEq,
    And,
    Or,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 13] = [
        BinaryOp::Plus,
        BinaryOp::Minus,
        BinaryOp::Times,
        BinaryOp::Div,
        BinaryOp::Mod,
        BinaryOp::Equal,
        BinaryOp::Unequal,
        BinaryOp::Lesser,
        BinaryOp::LesserEq,
        BinaryOp::Greater,
        BinaryOp::GreaterEq,
        BinaryOp::And,
        BinaryOp::Or,
    ];

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::Unequal
                | BinaryOp::Lesser
                | BinaryOp::LesserEq
                | BinaryOp::Greater
                | BinaryOp::GreaterEq
        )
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Equal | BinaryOp::Unequal)
    }

    /// Source spelling of the operator
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Times => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Equal => "==",
            BinaryOp::Unequal => "!=",
            BinaryOp::Lesser => "<",
            BinaryOp::LesserEq => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::PreIncrement | UnaryOp::PostIncrement => "++",
            UnaryOp::PreDecrement | UnaryOp::PostDecrement => "--",
        };
        f.write_str(s)
    }
}
