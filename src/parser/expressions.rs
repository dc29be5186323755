//! Expression parsing module
//!
//! Pratt parser for MiniJ expressions. Prefix operators and primaries are
//! handled in `parse_prefix`, binary operators by the binding-power loop.

use log::trace;
use thin_vec::ThinVec;

use crate::ast::*;
use crate::diagnostic::ParseError;
use crate::lexer::TokenKind;

use super::Parser;

/// Binding power for Pratt parser operator precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BindingPower(u8);

impl BindingPower {
    pub const MIN: Self = Self(0);
    pub const LOGICAL_OR: Self = Self(1);
    pub const LOGICAL_AND: Self = Self(2);
    pub const EQUALITY: Self = Self(3);
    pub const RELATIONAL: Self = Self(4);
    pub const ADDITIVE: Self = Self(5);
    pub const MULTIPLICATIVE: Self = Self(6);
    pub const UNARY: Self = Self(7);
}

/// Binary operator and binding power for a token, if it is an infix operator.
/// All MiniJ binary operators are left-associative.
fn infix_operator(kind: TokenKind) -> Option<(BinaryOp, BindingPower)> {
    let entry = match kind {
        TokenKind::LogicOr => (BinaryOp::Or, BindingPower::LOGICAL_OR),
        TokenKind::LogicAnd => (BinaryOp::And, BindingPower::LOGICAL_AND),
        TokenKind::Equal => (BinaryOp::Equal, BindingPower::EQUALITY),
        TokenKind::NotEqual => (BinaryOp::Unequal, BindingPower::EQUALITY),
        TokenKind::Less => (BinaryOp::Lesser, BindingPower::RELATIONAL),
        TokenKind::LessEqual => (BinaryOp::LesserEq, BindingPower::RELATIONAL),
        TokenKind::Greater => (BinaryOp::Greater, BindingPower::RELATIONAL),
        TokenKind::GreaterEqual => (BinaryOp::GreaterEq, BindingPower::RELATIONAL),
        TokenKind::Plus => (BinaryOp::Plus, BindingPower::ADDITIVE),
        TokenKind::Minus => (BinaryOp::Minus, BindingPower::ADDITIVE),
        TokenKind::Star => (BinaryOp::Times, BindingPower::MULTIPLICATIVE),
        TokenKind::Slash => (BinaryOp::Div, BindingPower::MULTIPLICATIVE),
        TokenKind::Percent => (BinaryOp::Mod, BindingPower::MULTIPLICATIVE),
        _ => return None,
    };
    Some(entry)
}

/// Main expression parsing using Pratt algorithm
pub(super) fn parse_expression(parser: &mut Parser, min_binding_power: BindingPower) -> Result<NodeRef, ParseError> {
    trace!("parse_expression: min_binding_power={}", min_binding_power.0);
    let mut left = parse_prefix(parser)?;

    while let Some(token) = parser.try_current_token() {
        let Some((op, binding_power)) = infix_operator(token.kind) else {
            break;
        };
        if binding_power <= min_binding_power {
            break;
        }
        parser.advance();
        let right = parse_expression(parser, binding_power)?;
        let span = parser.ast.get_span(left).merge(parser.ast.get_span(right));
        left = parser.push_node(NodeKind::BinaryOp(op, left, right), span);
    }

    Ok(left)
}

fn parse_prefix(parser: &mut Parser) -> Result<NodeRef, ParseError> {
    let token = parser.current_token()?;

    let prefix_op = match token.kind {
        TokenKind::Minus => Some(UnaryOp::Minus),
        TokenKind::Not => Some(UnaryOp::Not),
        TokenKind::Increment => Some(UnaryOp::PreIncrement),
        TokenKind::Decrement => Some(UnaryOp::PreDecrement),
        _ => None,
    };
    if let Some(op) = prefix_op {
        parser.advance();
        let operand = parse_expression(parser, BindingPower::UNARY)?;
        let span = token.span.merge(parser.ast.get_span(operand));
        return Ok(parser.push_node(NodeKind::UnaryOp(op, operand), span));
    }

    let primary = parse_primary(parser)?;
    parse_postfix(parser, primary)
}

/// Postfix `++` / `--`
fn parse_postfix(parser: &mut Parser, operand: NodeRef) -> Result<NodeRef, ParseError> {
    let op = match parser.current_token_kind() {
        Some(TokenKind::Increment) => UnaryOp::PostIncrement,
        Some(TokenKind::Decrement) => UnaryOp::PostDecrement,
        _ => return Ok(operand),
    };
    let end = parser.advance().map_or(SourceSpan::empty(), |t| t.span);
    let span = parser.ast.get_span(operand).merge(end);
    Ok(parser.push_node(NodeKind::UnaryOp(op, operand), span))
}

fn parse_primary(parser: &mut Parser) -> Result<NodeRef, ParseError> {
    let token = parser.current_token()?;
    match token.kind {
        TokenKind::IntegerConstant(value) => {
            parser.advance();
            Ok(parser.push_node(NodeKind::LiteralInt(value), token.span))
        }
        TokenKind::StringConstant(value) => {
            parser.advance();
            Ok(parser.push_node(NodeKind::LiteralString(value), token.span))
        }
        TokenKind::True | TokenKind::False => {
            parser.advance();
            let value = token.kind == TokenKind::True;
            Ok(parser.push_node(NodeKind::LiteralBool(value), token.span))
        }
        TokenKind::LeftParen => {
            parser.advance();
            let inner = parse_expression(parser, BindingPower::MIN)?;
            parser.expect(TokenKind::RightParen)?;
            Ok(inner)
        }
        TokenKind::Identifier(_) if parser.peek_token(0).map(|t| t.kind) == Some(TokenKind::LeftParen) => {
            parse_call(parser)
        }
        TokenKind::Identifier(_) => parse_memory_access(parser),
        _ => Err(parser.unexpected("expression")),
    }
}

/// `call: ID '(' (expression (',' expression)*)? ')'`
pub(super) fn parse_call(parser: &mut Parser) -> Result<NodeRef, ParseError> {
    let (name, start) = parser.expect_name()?;
    parser.expect(TokenKind::LeftParen)?;

    let mut args = ThinVec::new();
    if !parser.is_token(TokenKind::RightParen) {
        loop {
            args.push(parse_expression(parser, BindingPower::MIN)?);
            if parser.accept(TokenKind::Comma).is_none() {
                break;
            }
        }
    }
    let end = parser.expect(TokenKind::RightParen)?.span;

    Ok(parser.push_node(NodeKind::Call(CallExpr { name, args }), start.merge(end)))
}

/// `memoryAccess: ID ('.' ID | '[' expression ']')*`
pub(super) fn parse_memory_access(parser: &mut Parser) -> Result<NodeRef, ParseError> {
    let (name, span) = parser.expect_name()?;
    let mut access = parser.push_node(NodeKind::Variable(name), span);

    loop {
        if parser.accept(TokenKind::Dot).is_some() {
            let (field, end) = parser.expect_name()?;
            let span = parser.ast.get_span(access).merge(end);
            access = parser.push_node(NodeKind::FieldAccess(access, field), span);
        } else if parser.accept(TokenKind::LeftBracket).is_some() {
            let index = parse_expression(parser, BindingPower::MIN)?;
            let end = parser.expect(TokenKind::RightBracket)?.span;
            let span = parser.ast.get_span(access).merge(end);
            access = parser.push_node(NodeKind::ArrayAccess(access, index), span);
        } else {
            return Ok(access);
        }
    }
}
