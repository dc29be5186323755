//! Parser module for MiniJ
//!
//! A hand-written recursive descent parser that builds the flattened `Ast`
//! directly. Declarations, statements and expressions live in their own
//! submodules; expressions use a Pratt loop driven by `BindingPower`.

use crate::ast::*;
use crate::diagnostic::ParseError;
use crate::lexer::{Token, TokenKind};
use log::debug;

pub mod declarations;
pub mod expressions;
pub mod statements;

pub(crate) use expressions::BindingPower;

/// Main parser structure
pub struct Parser<'arena, 'src> {
    tokens: &'src [Token],
    current_idx: usize,
    ast: &'arena mut Ast,
}

impl<'arena, 'src> Parser<'arena, 'src> {
    /// Create a new parser
    pub fn new(tokens: &'src [Token], ast: &'arena mut Ast) -> Self {
        Parser {
            tokens,
            current_idx: 0,
            ast,
        }
    }

    /// Get the current token (returns None if at end of input)
    fn try_current_token(&self) -> Option<Token> {
        self.tokens.get(self.current_idx).copied()
    }

    /// Get the current token (returns error if at end of input)
    fn current_token(&self) -> Result<Token, ParseError> {
        self.try_current_token().ok_or_else(|| ParseError::UnexpectedEof {
            location: self.previous_token_span(),
        })
    }

    /// Get the current token kind
    fn current_token_kind(&self) -> Option<TokenKind> {
        self.try_current_token().map(|t| t.kind)
    }

    /// Get the location of the previous token, or an empty span if not available.
    fn previous_token_span(&self) -> SourceSpan {
        self.current_idx
            .checked_sub(1)
            .and_then(|idx| self.tokens.get(idx))
            .map_or(SourceSpan::empty(), |token| token.span)
    }

    /// Peek at the token after the current one without consuming anything
    fn peek_token(&self, next_index: u32) -> Option<&Token> {
        self.tokens.get(self.current_idx + 1 + next_index as usize)
    }

    /// Advance to the next token and return previous token
    fn advance(&mut self) -> Option<Token> {
        let token = self.try_current_token()?;
        self.current_idx += 1;
        Some(token)
    }

    /// Accept a specific token kind if found, consume it and return it, otherwise nothing happens
    fn accept(&mut self, accepted: TokenKind) -> Option<Token> {
        if self.current_token_kind() == Some(accepted) {
            self.advance()
        } else {
            None
        }
    }

    /// Expect a specific token kind, consume it if found
    fn expect(&mut self, expected: TokenKind) -> Result<Token, ParseError> {
        let token = self.current_token()?;
        if token.kind == expected {
            self.advance();
            Ok(token)
        } else {
            Err(ParseError::UnexpectedToken {
                expected_tokens: format!("{:?}", expected),
                found: token.kind,
                location: token.span,
            })
        }
    }

    /// Check if current token matches the given kind
    fn is_token(&self, kind: TokenKind) -> bool {
        self.current_token_kind() == Some(kind)
    }

    /// Consume an identifier and return its name
    fn expect_name(&mut self) -> Result<(NameId, SourceSpan), ParseError> {
        let token = self.current_token()?;
        match token.kind {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok((name, token.span))
            }
            found => Err(ParseError::UnexpectedToken {
                expected_tokens: "identifier".to_string(),
                found,
                location: token.span,
            }),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.try_current_token() {
            Some(token) => ParseError::UnexpectedToken {
                expected_tokens: expected.to_string(),
                found: token.kind,
                location: token.span,
            },
            None => ParseError::UnexpectedEof {
                location: self.previous_token_span(),
            },
        }
    }

    pub(crate) fn push_node(&mut self, kind: NodeKind, span: SourceSpan) -> NodeRef {
        self.ast.push_node(kind, span)
    }

    /// Parse a whole compilation unit. The unit is stored at `NodeRef::ROOT`.
    pub fn parse_unit(&mut self) -> Result<NodeRef, ParseError> {
        debug!("parse_unit: {} tokens", self.tokens.len());
        let root = self.ast.push_dummy(SourceSpan::empty());
        let unit = declarations::parse_members(self)?;
        let span = match (self.tokens.first(), self.tokens.last()) {
            (Some(first), Some(last)) => first.span.merge(last.span),
            _ => SourceSpan::empty(),
        };
        self.ast.replace_node(root, NodeKind::Unit(unit), span);
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::dumper::AstDumper;
    use crate::lexer::Lexer;
    use crate::source_manager::SourceId;

    fn parse(source: &str) -> Result<Ast, ParseError> {
        let tokens = Lexer::new(source.as_bytes(), SourceId::new(2)).tokenize_all()?;
        let mut ast = Ast::new();
        Parser::new(&tokens, &mut ast).parse_unit()?;
        Ok(ast)
    }

    fn dump(source: &str) -> String {
        AstDumper::dump(&parse(source).expect("parse failed"))
    }

    #[test]
    fn parses_members_in_category_order() {
        insta::assert_snapshot!(dump("int g; record R { int a; bool b; } void f() { }"), @r"
        1: Unit(globals=[2], records=[5], functions=[6])
        2: Declaration(int g)
        3: Declaration(int a)
        4: Declaration(bool b)
        5: Record(R, fields=[3, 4])
        6: Function(void f, params=[], body=[])
        ");
    }

    #[test]
    fn parses_parameters_and_locals() {
        insta::assert_snapshot!(dump("int f(int a, R & r) int pre; { int[] xs; return a; }"), @r"
        1: Unit(globals=[], records=[], functions=[10])
        2: Declaration(int a)
        3: Declaration(R &r)
        4: Declaration(int pre)
        5: DeclarationStatement(4)
        6: Declaration(int[] xs)
        7: DeclarationStatement(6)
        8: Variable(a)
        9: Return(8)
        10: Function(int f, params=[2, 3], body=[5, 7, 9])
        ");
    }

    #[test]
    fn respects_operator_precedence() {
        insta::assert_snapshot!(dump("void f() { x = 1 + 2 * -3 < 4 && !b || c; }"), @r"
        1: Unit(globals=[], records=[], functions=[17])
        2: Variable(x)
        3: LiteralInt(1)
        4: LiteralInt(2)
        5: LiteralInt(3)
        6: UnaryOp(Minus, 5)
        7: BinaryOp(Times, 4, 6)
        8: BinaryOp(Plus, 3, 7)
        9: LiteralInt(4)
        10: BinaryOp(Lesser, 8, 9)
        11: Variable(b)
        12: UnaryOp(Not, 11)
        13: BinaryOp(And, 10, 12)
        14: Variable(c)
        15: BinaryOp(Or, 13, 14)
        16: Assignment(2, 15)
        17: Function(void f, params=[], body=[16])
        ");
    }

    #[test]
    fn wraps_single_statement_branches_in_blocks() {
        insta::assert_snapshot!(dump("void f() { if (c) x = 1; else ; while (true) g(); }"), @r"
        1: Unit(globals=[], records=[], functions=[15])
        2: Variable(c)
        3: Variable(x)
        4: LiteralInt(1)
        5: Assignment(3, 4)
        6: Block([5])
        7: EmptyStatement
        8: Block([7])
        9: If(condition=2, then=6, else=8)
        10: LiteralBool(true)
        11: Call(g, [])
        12: CallStatement(11)
        13: Block([12])
        14: While(condition=10, body=13)
        15: Function(void f, params=[], body=[9, 14])
        ");
    }

    #[test]
    fn parses_memory_access_chains() {
        insta::assert_snapshot!(dump("void f() { a.b[i + 1].c = s.t; }"), @r"
        1: Unit(globals=[], records=[], functions=[12])
        2: Variable(a)
        3: FieldAccess(2, b)
        4: Variable(i)
        5: LiteralInt(1)
        6: BinaryOp(Plus, 4, 5)
        7: ArrayAccess(3, 6)
        8: FieldAccess(7, c)
        9: Variable(s)
        10: FieldAccess(9, t)
        11: Assignment(8, 10)
        12: Function(void f, params=[], body=[11])
        ");
    }

    #[test]
    fn reports_syntax_errors() {
        let err = parse("void f( { }").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }), "{err}");

        let err = parse("int x").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }), "{err}");

        let err = parse("void f() { 1 = 2; }").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }), "{err}");
    }
}
