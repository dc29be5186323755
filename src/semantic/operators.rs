//! Operator typing rules.
//!
//! MiniJ has no implicit conversions: binary operands must have equal types,
//! and each operator accepts only a few of those types.

use crate::ast::{BinaryOp, Type, UnaryOp};

/// Result type of `left op right`, or `None` if the operator does not apply
pub fn binary_result(op: BinaryOp, left: &Type, right: &Type) -> Option<Type> {
    if left != right {
        return None;
    }
    let operand = left;
    match op {
        BinaryOp::Plus => matches!(operand, Type::Integer | Type::String).then(|| operand.clone()),
        BinaryOp::Minus | BinaryOp::Times | BinaryOp::Div | BinaryOp::Mod => {
            matches!(operand, Type::Integer).then_some(Type::Integer)
        }
        BinaryOp::And | BinaryOp::Or => matches!(operand, Type::Boolean | Type::Integer).then(|| operand.clone()),
        BinaryOp::Lesser | BinaryOp::LesserEq | BinaryOp::Greater | BinaryOp::GreaterEq => {
            matches!(operand, Type::Integer | Type::String).then_some(Type::Boolean)
        }
        BinaryOp::Equal | BinaryOp::Unequal => {
            matches!(operand, Type::Boolean | Type::Integer | Type::String).then_some(Type::Boolean)
        }
    }
}

/// Result type of a unary operator applied to `operand`
pub fn unary_result(op: UnaryOp, operand: &Type) -> Option<Type> {
    match op {
        UnaryOp::Not => matches!(operand, Type::Boolean).then_some(Type::Boolean),
        UnaryOp::Minus
        | UnaryOp::PreIncrement
        | UnaryOp::PreDecrement
        | UnaryOp::PostIncrement
        | UnaryOp::PostDecrement => matches!(operand, Type::Integer).then_some(Type::Integer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NameId;

    #[test]
    fn mismatched_operands_never_combine() {
        for op in BinaryOp::ALL {
            assert_eq!(binary_result(op, &Type::Integer, &Type::Boolean), None, "{op}");
            assert_eq!(binary_result(op, &Type::String, &Type::Integer), None, "{op}");
        }
    }

    #[test]
    fn aggregates_are_rejected_by_every_operator() {
        let record = Type::Record(NameId::new("R"));
        let array = Type::array_of(Type::Integer);
        for op in BinaryOp::ALL {
            assert_eq!(binary_result(op, &record, &record), None, "{op}");
            assert_eq!(binary_result(op, &array, &array), None, "{op}");
        }
    }

    #[test]
    fn unary_operators() {
        assert_eq!(unary_result(UnaryOp::Not, &Type::Boolean), Some(Type::Boolean));
        assert_eq!(unary_result(UnaryOp::Not, &Type::Integer), None);
        assert_eq!(unary_result(UnaryOp::Minus, &Type::Integer), Some(Type::Integer));
        assert_eq!(unary_result(UnaryOp::PostIncrement, &Type::String), None);
    }
}
