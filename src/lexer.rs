use log::trace;

use crate::ast::NameId;
use crate::diagnostic::ParseError;
use crate::source_manager::{SourceId, SourceSpan};

/// MiniJ token kinds
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    // === LITERALS ===
    IntegerConstant(i64),
    StringConstant(NameId), // Interned, escapes already decoded

    // === IDENTIFIERS ===
    Identifier(NameId),

    // === KEYWORDS ===
    Void,
    Int,
    Bool,
    Text,
    Record,
    If,
    Else,
    While,
    Return,
    True,
    False,

    // === OPERATORS ===
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Increment,
    Decrement,
    Not,
    Ampersand,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
    LogicAnd,
    LogicOr,
    Assign,
    Dot,

    // === PUNCTUATION ===
    Colon,
    Comma,
    Semicolon,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
}

impl TokenKind {
    /// Tokens that can begin a type in a declaration
    pub fn is_type_start(&self) -> bool {
        matches!(
            self,
            TokenKind::Int | TokenKind::Bool | TokenKind::Text | TokenKind::Identifier(_)
        )
    }
}

/// Token with source location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: SourceSpan,
}

fn keyword(text: &str) -> Option<TokenKind> {
    let kind = match text {
        "void" => TokenKind::Void,
        "int" => TokenKind::Int,
        "bool" => TokenKind::Bool,
        "text" => TokenKind::Text,
        "record" => TokenKind::Record,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "return" => TokenKind::Return,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => return None,
    };
    Some(kind)
}

/// Lexer turning a MiniJ source buffer into tokens
pub struct Lexer<'src> {
    source: &'src [u8],
    source_id: SourceId,
    pos: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src [u8], source_id: SourceId) -> Self {
        Lexer {
            source,
            source_id,
            pos: 0,
        }
    }

    fn span(&self, start: usize, end: usize) -> SourceSpan {
        SourceSpan::new_with_length(self.source_id, start as u32, (end - start) as u32)
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.source.get(self.pos + 1).copied()
    }

    /// Tokenize the whole buffer, stopping at the first lexical error
    pub fn tokenize_all(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            trace!("lexer: {:?}", token.kind);
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match (self.peek(), self.peek_next()) {
                (Some(c), _) if c.is_ascii_whitespace() => self.pos += 1,
                (Some(b'/'), Some(b'/')) => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        match (self.peek(), self.peek_next()) {
                            (Some(b'*'), Some(b'/')) => {
                                self.pos += 2;
                                break;
                            }
                            (Some(_), _) => self.pos += 1,
                            (None, _) => {
                                return Err(ParseError::UnterminatedComment {
                                    location: self.span(start, self.pos),
                                });
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        self.skip_trivia()?;
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let kind = if c.is_ascii_alphabetic() || c == b'_' {
            self.lex_word()
        } else if c.is_ascii_digit() {
            self.lex_integer(start)?
        } else if c == b'"' {
            self.lex_string(start)?
        } else {
            self.lex_punctuation(start)?
        };

        Ok(Some(Token {
            kind,
            span: self.span(start, self.pos),
        }))
    }

    fn lex_word(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        // identifiers are ASCII by construction
        let text = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or_default();
        keyword(text).unwrap_or_else(|| TokenKind::Identifier(NameId::new(text)))
    }

    fn lex_integer(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
        match text.parse::<i64>() {
            Ok(value) => Ok(TokenKind::IntegerConstant(value)),
            Err(_) => Err(ParseError::InvalidIntegerConstant {
                text,
                location: self.span(start, self.pos),
            }),
        }
    }

    fn lex_string(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        self.pos += 1; // opening quote
        let mut value = Vec::new();
        loop {
            match self.peek() {
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    let escaped = match self.peek_next() {
                        Some(b'n') => b'\n',
                        Some(b't') => b'\t',
                        Some(b'0') => 0,
                        Some(b'\\') => b'\\',
                        Some(b'"') => b'"',
                        Some(other) => other,
                        None => {
                            return Err(ParseError::UnterminatedString {
                                location: self.span(start, self.pos),
                            });
                        }
                    };
                    value.push(escaped);
                    self.pos += 2;
                }
                Some(b'\n') | None => {
                    return Err(ParseError::UnterminatedString {
                        location: self.span(start, self.pos),
                    });
                }
                Some(c) => {
                    value.push(c);
                    self.pos += 1;
                }
            }
        }
        let text = String::from_utf8_lossy(&value);
        Ok(TokenKind::StringConstant(NameId::new(&text)))
    }

    fn lex_punctuation(&mut self, start: usize) -> Result<TokenKind, ParseError> {
        let c = self.source[start];
        let next = self.peek_next();
        let (kind, len) = match (c, next) {
            (b'+', Some(b'+')) => (TokenKind::Increment, 2),
            (b'-', Some(b'-')) => (TokenKind::Decrement, 2),
            (b'=', Some(b'=')) => (TokenKind::Equal, 2),
            (b'!', Some(b'=')) => (TokenKind::NotEqual, 2),
            (b'<', Some(b'=')) => (TokenKind::LessEqual, 2),
            (b'>', Some(b'=')) => (TokenKind::GreaterEqual, 2),
            (b'&', Some(b'&')) => (TokenKind::LogicAnd, 2),
            (b'|', Some(b'|')) => (TokenKind::LogicOr, 2),
            (b'+', _) => (TokenKind::Plus, 1),
            (b'-', _) => (TokenKind::Minus, 1),
            (b'*', _) => (TokenKind::Star, 1),
            (b'/', _) => (TokenKind::Slash, 1),
            (b'%', _) => (TokenKind::Percent, 1),
            (b'!', _) => (TokenKind::Not, 1),
            (b'&', _) => (TokenKind::Ampersand, 1),
            (b'<', _) => (TokenKind::Less, 1),
            (b'>', _) => (TokenKind::Greater, 1),
            (b'=', _) => (TokenKind::Assign, 1),
            (b'.', _) => (TokenKind::Dot, 1),
            (b':', _) => (TokenKind::Colon, 1),
            (b',', _) => (TokenKind::Comma, 1),
            (b';', _) => (TokenKind::Semicolon, 1),
            (b'(', _) => (TokenKind::LeftParen, 1),
            (b')', _) => (TokenKind::RightParen, 1),
            (b'[', _) => (TokenKind::LeftBracket, 1),
            (b']', _) => (TokenKind::RightBracket, 1),
            (b'{', _) => (TokenKind::LeftBrace, 1),
            (b'}', _) => (TokenKind::RightBrace, 1),
            _ => {
                let rest = String::from_utf8_lossy(&self.source[start..]);
                let ch = rest.chars().next().unwrap_or('\u{fffd}');
                return Err(ParseError::UnexpectedCharacter {
                    ch,
                    location: self.span(start, start + ch.len_utf8()),
                });
            }
        };
        self.pos += len;
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source.as_bytes(), SourceId::new(2))
            .tokenize_all()
            .expect("lexing failed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_keywords_and_identifiers() {
        assert_eq!(
            kinds("int text record foo_1"),
            vec![
                TokenKind::Int,
                TokenKind::Text,
                TokenKind::Record,
                TokenKind::Identifier(NameId::new("foo_1"))
            ]
        );
    }

    #[test]
    fn lexes_compound_operators() {
        assert_eq!(
            kinds("a++ <= != && || -- &"),
            vec![
                TokenKind::Identifier(NameId::new("a")),
                TokenKind::Increment,
                TokenKind::LessEqual,
                TokenKind::NotEqual,
                TokenKind::LogicAnd,
                TokenKind::LogicOr,
                TokenKind::Decrement,
                TokenKind::Ampersand,
            ]
        );
    }

    #[test]
    fn skips_comments() {
        assert_eq!(
            kinds("1 // line\n /* block\n comment */ 2"),
            vec![TokenKind::IntegerConstant(1), TokenKind::IntegerConstant(2)]
        );
    }

    #[test]
    fn decodes_string_escapes() {
        assert_eq!(
            kinds(r#""a\n\"b""#),
            vec![TokenKind::StringConstant(NameId::new("a\n\"b"))]
        );
    }

    #[test]
    fn reports_lexical_errors() {
        let err = Lexer::new(b"int #", SourceId::new(2)).tokenize_all().unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedCharacter { ch: '#', .. }));

        let err = Lexer::new(b"\"open", SourceId::new(2)).tokenize_all().unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedString { .. }));

        let err = Lexer::new(b"/* open", SourceId::new(2)).tokenize_all().unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedComment { .. }));

        let err = Lexer::new(b"99999999999999999999", SourceId::new(2))
            .tokenize_all()
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidIntegerConstant { .. }));
    }
}
