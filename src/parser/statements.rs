//! Statement parsing

use log::trace;
use thin_vec::{ThinVec, thin_vec};

use crate::ast::*;
use crate::diagnostic::ParseError;
use crate::lexer::TokenKind;

use super::{BindingPower, Parser, expressions};

/// `statement: assignment | callStatement | return | if | while | block | ';'`
pub(super) fn parse_statement(parser: &mut Parser) -> Result<NodeRef, ParseError> {
    let token = parser.current_token()?;
    trace!("parse_statement: {:?}", token.kind);

    match token.kind {
        TokenKind::LeftBrace => parse_block(parser),
        TokenKind::If => parse_if(parser),
        TokenKind::While => parse_while(parser),
        TokenKind::Return => parse_return(parser),
        TokenKind::Semicolon => {
            parser.advance();
            Ok(parser.push_node(NodeKind::EmptyStatement, token.span))
        }
        TokenKind::Identifier(_) if parser.peek_token(0).map(|t| t.kind) == Some(TokenKind::LeftParen) => {
            let call = expressions::parse_call(parser)?;
            let end = parser.expect(TokenKind::Semicolon)?.span;
            Ok(parser.push_node(NodeKind::CallStatement(call), token.span.merge(end)))
        }
        TokenKind::Identifier(_) => parse_assignment(parser),
        _ => Err(parser.unexpected("statement")),
    }
}

/// `block: '{' statement* '}'`
fn parse_block(parser: &mut Parser) -> Result<NodeRef, ParseError> {
    let start = parser.expect(TokenKind::LeftBrace)?.span;
    let mut statements = ThinVec::new();
    while !parser.is_token(TokenKind::RightBrace) {
        statements.push(parse_statement(parser)?);
    }
    let end = parser.expect(TokenKind::RightBrace)?.span;
    Ok(parser.push_node(NodeKind::Block(statements), start.merge(end)))
}

/// Parse a branch or loop body, wrapping a lone statement into a block
fn parse_body(parser: &mut Parser) -> Result<NodeRef, ParseError> {
    if parser.is_token(TokenKind::LeftBrace) {
        return parse_block(parser);
    }
    let statement = parse_statement(parser)?;
    let span = parser.ast.get_span(statement);
    Ok(parser.push_node(NodeKind::Block(thin_vec![statement]), span))
}

fn parse_condition(parser: &mut Parser) -> Result<NodeRef, ParseError> {
    parser.expect(TokenKind::LeftParen)?;
    let condition = expressions::parse_expression(parser, BindingPower::MIN)?;
    parser.expect(TokenKind::RightParen)?;
    Ok(condition)
}

/// `if: 'if' '(' expression ')' statement ('else' statement)?`
fn parse_if(parser: &mut Parser) -> Result<NodeRef, ParseError> {
    let start = parser.expect(TokenKind::If)?.span;
    let condition = parse_condition(parser)?;
    let then_block = parse_body(parser)?;
    let else_block = if parser.accept(TokenKind::Else).is_some() {
        Some(parse_body(parser)?)
    } else {
        None
    };
    let end = parser.ast.get_span(else_block.unwrap_or(then_block));
    Ok(parser.push_node(
        NodeKind::If(IfStmt {
            condition,
            then_block,
            else_block,
        }),
        start.merge(end),
    ))
}

/// `while: 'while' '(' expression ')' statement`
fn parse_while(parser: &mut Parser) -> Result<NodeRef, ParseError> {
    let start = parser.expect(TokenKind::While)?.span;
    let condition = parse_condition(parser)?;
    let body = parse_body(parser)?;
    let end = parser.ast.get_span(body);
    Ok(parser.push_node(NodeKind::While(WhileStmt { condition, body }), start.merge(end)))
}

/// `return: 'return' expression? ';'`
fn parse_return(parser: &mut Parser) -> Result<NodeRef, ParseError> {
    let start = parser.expect(TokenKind::Return)?.span;
    let value = if parser.is_token(TokenKind::Semicolon) {
        None
    } else {
        Some(expressions::parse_expression(parser, BindingPower::MIN)?)
    };
    let end = parser.expect(TokenKind::Semicolon)?.span;
    Ok(parser.push_node(NodeKind::Return(value), start.merge(end)))
}

/// `assignment: memoryAccess '=' expression ';'`
fn parse_assignment(parser: &mut Parser) -> Result<NodeRef, ParseError> {
    let target = expressions::parse_memory_access(parser)?;
    parser.expect(TokenKind::Assign)?;
    let value = expressions::parse_expression(parser, BindingPower::MIN)?;
    let end = parser.expect(TokenKind::Semicolon)?.span;
    let span = parser.ast.get_span(target).merge(end);
    Ok(parser.push_node(NodeKind::Assignment(target, value), span))
}
