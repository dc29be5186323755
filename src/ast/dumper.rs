//! AST Dumper module
//!
//! Renders the flattened AST as one line per node, in storage order, with
//! child references printed as node numbers.

use std::fmt::Write;

use crate::ast::{Ast, NodeKind, NodeRef};

/// Dumper for AST
pub struct AstDumper;

impl AstDumper {
    /// Dump the AST to a string, skipping dummy nodes
    pub fn dump(ast: &Ast) -> String {
        let mut out = String::new();
        for (i, kind) in ast.kinds.iter().enumerate() {
            if matches!(kind, NodeKind::Dummy) {
                continue;
            }
            let _ = writeln!(out, "{}: {}", i + 1, Self::format_kind(kind));
        }
        out
    }

    /// Dump the AST to stdout
    pub fn print(ast: &Ast) {
        print!("{}", Self::dump(ast));
    }

    fn refs(refs: &[NodeRef]) -> String {
        refs.iter().map(|r| r.get().to_string()).collect::<Vec<_>>().join(", ")
    }

    fn format_kind(kind: &NodeKind) -> String {
        match kind {
            NodeKind::LiteralInt(value) => format!("LiteralInt({})", value),
            NodeKind::LiteralString(value) => format!("LiteralString({:?})", value.as_str()),
            NodeKind::LiteralBool(value) => format!("LiteralBool({})", value),
            NodeKind::Variable(name) => format!("Variable({})", name),
            NodeKind::FieldAccess(base, field) => format!("FieldAccess({}, {})", base.get(), field),
            NodeKind::ArrayAccess(base, index) => format!("ArrayAccess({}, {})", base.get(), index.get()),
            NodeKind::UnaryOp(op, operand) => format!("UnaryOp({:?}, {})", op, operand.get()),
            NodeKind::BinaryOp(op, left, right) => {
                format!("BinaryOp({:?}, {}, {})", op, left.get(), right.get())
            }
            NodeKind::Call(call) => format!("Call({}, [{}])", call.name, Self::refs(&call.args)),
            NodeKind::Block(statements) => format!("Block([{}])", Self::refs(statements)),
            NodeKind::DeclarationStatement(decl) => format!("DeclarationStatement({})", decl.get()),
            NodeKind::Assignment(lhs, rhs) => format!("Assignment({}, {})", lhs.get(), rhs.get()),
            NodeKind::CallStatement(call) => format!("CallStatement({})", call.get()),
            NodeKind::If(stmt) => format!(
                "If(condition={}, then={}, else={})",
                stmt.condition.get(),
                stmt.then_block.get(),
                stmt.else_block.map(|r| r.get().to_string()).unwrap_or("none".to_string())
            ),
            NodeKind::While(stmt) => format!("While(condition={}, body={})", stmt.condition.get(), stmt.body.get()),
            NodeKind::Return(expr) => format!(
                "Return({})",
                expr.map(|r| r.get().to_string()).unwrap_or("void".to_string())
            ),
            NodeKind::EmptyStatement => "EmptyStatement".to_string(),
            NodeKind::Declaration(decl) => format!(
                "Declaration({} {}{})",
                decl.ty,
                if decl.is_reference { "&" } else { "" },
                decl.name
            ),
            NodeKind::Function(func) => format!(
                "Function({} {}, params=[{}], body=[{}])",
                func.return_type,
                func.name,
                Self::refs(&func.params),
                Self::refs(&func.body)
            ),
            NodeKind::Record(record) => format!("Record({}, fields=[{}])", record.name, Self::refs(&record.fields)),
            NodeKind::Unit(unit) => format!(
                "Unit(globals=[{}], records=[{}], functions=[{}])",
                Self::refs(&unit.globals),
                Self::refs(&unit.records),
                Self::refs(&unit.functions)
            ),
            NodeKind::Dummy => "DUMMY".to_string(),
        }
    }
}
