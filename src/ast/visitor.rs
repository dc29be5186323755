//! Child enumeration for AST nodes.
//!
//! Every pass walks the tree with its own exhaustive `match`; this helper is
//! the one place that knows where children live inside each variant, and is
//! used by generic walks such as invariant checks and node collection.

use crate::ast::{Ast, NodeKind, NodeRef};

impl NodeKind {
    /// Call `f` for each direct child of this node, in source order.
    pub fn visit_children(&self, mut f: impl FnMut(NodeRef)) {
        match self {
            NodeKind::LiteralInt(_)
            | NodeKind::LiteralString(_)
            | NodeKind::LiteralBool(_)
            | NodeKind::Variable(_)
            | NodeKind::EmptyStatement
            | NodeKind::Declaration(_)
            | NodeKind::Dummy => {}
            NodeKind::FieldAccess(base, _) => f(*base),
            NodeKind::ArrayAccess(base, index) => {
                f(*base);
                f(*index);
            }
            NodeKind::UnaryOp(_, operand) => f(*operand),
            NodeKind::BinaryOp(_, left, right) => {
                f(*left);
                f(*right);
            }
            NodeKind::Call(call) => call.args.iter().copied().for_each(f),
            NodeKind::Block(statements) => statements.iter().copied().for_each(f),
            NodeKind::DeclarationStatement(decl) => f(*decl),
            NodeKind::Assignment(lhs, rhs) => {
                f(*lhs);
                f(*rhs);
            }
            NodeKind::CallStatement(call) => f(*call),
            NodeKind::If(stmt) => {
                f(stmt.condition);
                f(stmt.then_block);
                if let Some(else_block) = stmt.else_block {
                    f(else_block);
                }
            }
            NodeKind::While(stmt) => {
                f(stmt.condition);
                f(stmt.body);
            }
            NodeKind::Return(expr) => {
                if let Some(expr) = expr {
                    f(*expr);
                }
            }
            NodeKind::Function(func) => {
                func.params.iter().copied().for_each(&mut f);
                func.body.iter().copied().for_each(f);
            }
            NodeKind::Record(record) => record.fields.iter().copied().for_each(f),
            NodeKind::Unit(unit) => {
                unit.globals.iter().copied().for_each(&mut f);
                unit.records.iter().copied().for_each(&mut f);
                unit.functions.iter().copied().for_each(f);
            }
        }
    }
}

impl Ast {
    /// Pre-order walk of the subtree rooted at `node_ref`.
    pub fn walk(&self, node_ref: NodeRef, f: &mut impl FnMut(NodeRef, &NodeKind)) {
        let kind = self.get_kind(node_ref);
        f(node_ref, kind);
        kind.visit_children(|child| self.walk(child, f));
    }
}
