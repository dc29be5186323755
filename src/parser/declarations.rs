//! Declaration parsing: unit members, records, functions, parameters and types.

use log::debug;
use thin_vec::ThinVec;

use crate::ast::*;
use crate::diagnostic::ParseError;
use crate::lexer::TokenKind;

use super::{Parser, statements};

/// Parse `member*` until end of input
pub(super) fn parse_members(parser: &mut Parser) -> Result<UnitData, ParseError> {
    let mut unit = UnitData::default();

    while let Some(token) = parser.try_current_token() {
        match token.kind {
            TokenKind::Semicolon => {
                parser.advance();
            }
            TokenKind::Record => unit.records.push(parse_record(parser)?),
            TokenKind::Void => {
                parser.advance();
                unit.functions
                    .push(parse_function_rest(parser, Type::Void, token.span)?);
            }
            kind if kind.is_type_start() => {
                let ty = parse_type(parser)?;
                if parser.peek_token(0).map(|t| t.kind) == Some(TokenKind::LeftParen) {
                    unit.functions.push(parse_function_rest(parser, ty, token.span)?);
                } else {
                    unit.globals.push(parse_declaration_rest(parser, ty, token.span)?);
                }
            }
            _ => return Err(parser.unexpected("declaration, record or function")),
        }
    }

    Ok(unit)
}

/// `type: ('int' | 'bool' | 'text' | ID) ('[' ']')*`
pub(super) fn parse_type(parser: &mut Parser) -> Result<Type, ParseError> {
    let token = parser.current_token()?;
    let mut ty = match token.kind {
        TokenKind::Int => Type::Integer,
        TokenKind::Bool => Type::Boolean,
        TokenKind::Text => Type::String,
        TokenKind::Identifier(name) => Type::Record(name),
        _ => return Err(parser.unexpected("type")),
    };
    parser.advance();

    while parser.is_token(TokenKind::LeftBracket) {
        parser.advance();
        parser.expect(TokenKind::RightBracket)?;
        ty = Type::array_of(ty);
    }
    Ok(ty)
}

/// Whether the upcoming tokens start a declaration rather than a statement.
///
/// `int`, `bool` and `text` always do. A record type name does when it is
/// followed by another identifier (`Point p;`) or by `[]` (`Point[] ps;`).
pub(super) fn starts_declaration(parser: &Parser) -> bool {
    match parser.current_token_kind() {
        Some(TokenKind::Int | TokenKind::Bool | TokenKind::Text) => true,
        Some(TokenKind::Identifier(_)) => match parser.peek_token(0).map(|t| t.kind) {
            Some(TokenKind::Identifier(_)) => true,
            Some(TokenKind::LeftBracket) => {
                parser.peek_token(1).map(|t| t.kind) == Some(TokenKind::RightBracket)
            }
            _ => false,
        },
        _ => false,
    }
}

/// `declaration: type ID ';'`
pub(super) fn parse_declaration(parser: &mut Parser) -> Result<NodeRef, ParseError> {
    let start = parser.current_token()?.span;
    let ty = parse_type(parser)?;
    parse_declaration_rest(parser, ty, start)
}

fn parse_declaration_rest(parser: &mut Parser, ty: Type, start: SourceSpan) -> Result<NodeRef, ParseError> {
    let (name, _) = parser.expect_name()?;
    let end = parser.expect(TokenKind::Semicolon)?.span;
    Ok(parser.push_node(
        NodeKind::Declaration(DeclarationData {
            name,
            ty,
            is_reference: false,
        }),
        start.merge(end),
    ))
}

/// A declaration wrapped in a `DeclarationStatement`
pub(super) fn parse_declaration_statement(parser: &mut Parser) -> Result<NodeRef, ParseError> {
    let decl = parse_declaration(parser)?;
    let span = parser.ast.get_span(decl);
    Ok(parser.push_node(NodeKind::DeclarationStatement(decl), span))
}

/// `record: 'record' ID '{' declaration* '}'`
fn parse_record(parser: &mut Parser) -> Result<NodeRef, ParseError> {
    let start = parser.expect(TokenKind::Record)?.span;
    let (name, _) = parser.expect_name()?;
    debug!("parse_record: {}", name);
    parser.expect(TokenKind::LeftBrace)?;

    let mut fields = ThinVec::new();
    while !parser.is_token(TokenKind::RightBrace) {
        fields.push(parse_declaration(parser)?);
    }
    let end = parser.expect(TokenKind::RightBrace)?.span;

    Ok(parser.push_node(NodeKind::Record(RecordData { name, fields }), start.merge(end)))
}

/// `parameter: type '&'? ID`
fn parse_parameter(parser: &mut Parser) -> Result<NodeRef, ParseError> {
    let start = parser.current_token()?.span;
    let ty = parse_type(parser)?;
    let is_reference = parser.accept(TokenKind::Ampersand).is_some();
    let (name, end) = parser.expect_name()?;
    Ok(parser.push_node(
        NodeKind::Declaration(DeclarationData { name, ty, is_reference }),
        start.merge(end),
    ))
}

/// Everything after the return type:
/// `ID '(' parameters ')' declarationStatement* '{' declarationStatement* statement* '}'`
fn parse_function_rest(parser: &mut Parser, return_type: Type, start: SourceSpan) -> Result<NodeRef, ParseError> {
    let (name, _) = parser.expect_name()?;
    debug!("parse_function: {}", name);

    parser.expect(TokenKind::LeftParen)?;
    let mut params = ThinVec::new();
    if !parser.is_token(TokenKind::RightParen) {
        loop {
            params.push(parse_parameter(parser)?);
            if parser.accept(TokenKind::Comma).is_none() {
                break;
            }
        }
    }
    parser.expect(TokenKind::RightParen)?;

    let mut body = ThinVec::new();
    while starts_declaration(parser) {
        body.push(parse_declaration_statement(parser)?);
    }

    parser.expect(TokenKind::LeftBrace)?;
    while starts_declaration(parser) {
        body.push(parse_declaration_statement(parser)?);
    }
    while !parser.is_token(TokenKind::RightBrace) {
        body.push(statements::parse_statement(parser)?);
    }
    let end = parser.expect(TokenKind::RightBrace)?.span;

    Ok(parser.push_node(
        NodeKind::Function(FunctionData {
            name,
            return_type,
            params,
            body,
        }),
        start.merge(end),
    ))
}
