//! The complete binary operator matrix, checked through the pipeline.

use super::test_utils::{run_pass, run_pipeline};
use crate::ast::{BinaryOp, NodeKind, NodeRef};
use crate::driver::artifact::CompilePhase;

const OPERAND_TYPES: [&str; 5] = ["bool", "int", "text", "R", "int[]"];

/// Result type of `a op b` with both operands of type `ty`
fn expected_result(op: BinaryOp, ty: &'static str) -> Option<&'static str> {
    use BinaryOp::*;
    match (op, ty) {
        (Plus, "int" | "text") => Some(ty),
        (Minus | Times | Div | Mod, "int") => Some("int"),
        (And | Or, "bool" | "int") => Some(ty),
        (Lesser | LesserEq | Greater | GreaterEq, "int" | "text") => Some("bool"),
        (Equal | Unequal, "bool" | "int" | "text") => Some("bool"),
        _ => None,
    }
}

fn probe(op: BinaryOp, left: &str, right: &str, result: &str) -> String {
    format!(
        "record R {{ int f; }}\nvoid probe() {left} a; {right} b; {result} r; {{ r = a {op} b; }}\nint main() {{ return 0; }}",
        op = op.symbol()
    )
}

#[test]
fn test_binary_operator_matrix() {
    for op in BinaryOp::ALL {
        for ty in OPERAND_TYPES {
            match expected_result(op, ty) {
                Some(result) => {
                    let artifact = run_pass(&probe(op, ty, ty, result), CompilePhase::TypeCheck);
                    let ast = artifact.ast.expect("ast");
                    let info = ast.semantic_info.as_ref().expect("semantic info");
                    let binary = (1..=ast.len() as u32)
                        .filter_map(NodeRef::new)
                        .find(|&n| matches!(ast.get_kind(n), NodeKind::BinaryOp(..)))
                        .expect("binary node");
                    assert_eq!(
                        info.type_of(binary).map(|t| t.to_string()).as_deref(),
                        Some(result),
                        "{ty} {op} {ty}"
                    );
                }
                None => {
                    let (driver, outcome) = run_pipeline(&probe(op, ty, ty, "int"), CompilePhase::TypeCheck);
                    assert!(outcome.is_err(), "{ty} {op} {ty} should be rejected");
                    let diagnostics = driver.get_diagnostics();
                    assert_eq!(
                        diagnostics[0].message,
                        format!("Operator '{}' cannot be applied to {ty} and {ty}", op.symbol()),
                    );
                }
            }
        }
    }
}

#[test]
fn test_operands_must_have_the_same_type() {
    let pairs = [("int", "bool"), ("text", "int"), ("bool", "text"), ("int", "int[]")];
    for op in BinaryOp::ALL {
        for (left, right) in pairs {
            let (driver, outcome) = run_pipeline(&probe(op, left, right, "int"), CompilePhase::TypeCheck);
            assert!(outcome.is_err(), "{left} {op} {right} should be rejected");
            assert_eq!(
                driver.get_diagnostics()[0].message,
                format!("Operator '{}' cannot be applied to {left} and {right}", op.symbol()),
            );
        }
    }
}

#[test]
fn test_comparison_feeds_logical_operator() {
    run_pass(
        "int main() int a; bool b; { b = a < 1 && a != 0 || !(a >= 3); return 0; }",
        CompilePhase::TypeCheck,
    );
}
