use crate::ast::{NameId, Type};
use crate::lexer::TokenKind;
use crate::source_manager::{SourceManager, SourceSpan};

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Note,
}

/// Individual diagnostic
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub location: SourceSpan,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, location: SourceSpan) -> Self {
        Diagnostic {
            level: DiagnosticLevel::Error,
            message: message.into(),
            location,
        }
    }
}

/// Parse errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected_tokens}, found {found:?}")]
    UnexpectedToken {
        expected_tokens: String,
        found: TokenKind,
        location: SourceSpan,
    },

    #[error("Unexpected End of File")]
    UnexpectedEof { location: SourceSpan },

    #[error("Invalid integer constant: {text}")]
    InvalidIntegerConstant { text: String, location: SourceSpan },

    #[error("Unterminated string constant")]
    UnterminatedString { location: SourceSpan },

    #[error("Unterminated block comment")]
    UnterminatedComment { location: SourceSpan },

    #[error("Unexpected character '{ch}'")]
    UnexpectedCharacter { ch: char, location: SourceSpan },
}

impl ParseError {
    pub fn location(&self) -> SourceSpan {
        match self {
            ParseError::UnexpectedToken { location, .. } => *location,
            ParseError::UnexpectedEof { location } => *location,
            ParseError::InvalidIntegerConstant { location, .. } => *location,
            ParseError::UnterminatedString { location } => *location,
            ParseError::UnterminatedComment { location } => *location,
            ParseError::UnexpectedCharacter { location, .. } => *location,
        }
    }
}

impl From<ParseError> for Diagnostic {
    fn from(error: ParseError) -> Self {
        Diagnostic::error(error.to_string(), error.location())
    }
}

/// Binding and type errors
#[derive(Debug, thiserror::Error)]
pub enum SemanticError {
    // --- binding ---
    #[error("Undeclared identifier '{name}'")]
    UndeclaredIdentifier { name: NameId, location: SourceSpan },
    #[error("'{name}' is not a variable")]
    NotAVariable { name: NameId, location: SourceSpan },
    #[error("Redefinition of '{name}'")]
    Redefinition {
        name: NameId,
        first_def: SourceSpan,
        second_def: SourceSpan,
    },
    #[error("Duplicate function '{name}({signature})'")]
    DuplicateFunction {
        name: NameId,
        signature: String,
        location: SourceSpan,
    },
    #[error("Function 'main' must return int, found {found}")]
    InvalidMainReturnType { found: Type, location: SourceSpan },
    #[error("Function 'main' must not have parameters")]
    MainHasParameters { location: SourceSpan },
    #[error("Missing return statement in function '{name}'")]
    MissingReturn { name: NameId, location: SourceSpan },
    #[error("Undefined record '{name}'")]
    UndefinedRecord { name: NameId, location: SourceSpan },

    // --- typing ---
    #[error("Condition of '{construct}' must be bool, found {found}")]
    ConditionNotBoolean {
        construct: &'static str,
        found: Type,
        location: SourceSpan,
    },
    #[error("Return type mismatch: expected {expected}, found {found}")]
    ReturnTypeMismatch {
        expected: Type,
        found: Type,
        location: SourceSpan,
    },
    #[error("Type mismatch in assignment: cannot assign {found} to {expected}")]
    AssignmentMismatch {
        expected: Type,
        found: Type,
        location: SourceSpan,
    },
    #[error("No matching function for call to '{name}({arguments})'")]
    NoMatchingFunction {
        name: NameId,
        arguments: String,
        location: SourceSpan,
    },
    #[error("Field access on non-record type {found}")]
    NotARecord { found: Type, location: SourceSpan },
    #[error("Record '{record}' has no field '{field}'")]
    UnknownField {
        record: NameId,
        field: NameId,
        location: SourceSpan,
    },
    #[error("Indexing non-array type {found}")]
    NotAnArray { found: Type, location: SourceSpan },
    #[error("Array index must be int, found {found}")]
    InvalidIndex { found: Type, location: SourceSpan },
    #[error("Operator '{op}' cannot be applied to {left} and {right}")]
    InvalidBinaryOp {
        op: &'static str,
        left: Type,
        right: Type,
        location: SourceSpan,
    },
    #[error("Operator '{op}' cannot be applied to {operand}")]
    InvalidUnaryOp {
        op: String,
        operand: Type,
        location: SourceSpan,
    },
    #[error("Not assignable: {operation}")]
    NotAssignable { operation: String, location: SourceSpan },
}

impl SemanticError {
    pub fn location(&self) -> SourceSpan {
        match self {
            SemanticError::UndeclaredIdentifier { location, .. } => *location,
            SemanticError::NotAVariable { location, .. } => *location,
            SemanticError::Redefinition { second_def, .. } => *second_def,
            SemanticError::DuplicateFunction { location, .. } => *location,
            SemanticError::InvalidMainReturnType { location, .. } => *location,
            SemanticError::MainHasParameters { location } => *location,
            SemanticError::MissingReturn { location, .. } => *location,
            SemanticError::UndefinedRecord { location, .. } => *location,
            SemanticError::ConditionNotBoolean { location, .. } => *location,
            SemanticError::ReturnTypeMismatch { location, .. } => *location,
            SemanticError::AssignmentMismatch { location, .. } => *location,
            SemanticError::NoMatchingFunction { location, .. } => *location,
            SemanticError::NotARecord { location, .. } => *location,
            SemanticError::UnknownField { location, .. } => *location,
            SemanticError::NotAnArray { location, .. } => *location,
            SemanticError::InvalidIndex { location, .. } => *location,
            SemanticError::InvalidBinaryOp { location, .. } => *location,
            SemanticError::InvalidUnaryOp { location, .. } => *location,
            SemanticError::NotAssignable { location, .. } => *location,
        }
    }
}

/// Diagnostic engine collecting errors from every phase
pub struct DiagnosticEngine {
    pub diagnostics: Vec<Diagnostic>,
}

impl Default for DiagnosticEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        DiagnosticEngine {
            diagnostics: Vec::new(),
        }
    }

    pub fn report_error(&mut self, error: SemanticError) {
        let first_def = match &error {
            SemanticError::Redefinition { first_def, .. } if !first_def.is_builtin() => Some(*first_def),
            _ => None,
        };
        self.diagnostics
            .push(Diagnostic::error(error.to_string(), error.location()));
        if let Some(location) = first_def {
            self.report_note("previous definition is here".to_string(), location);
        }
    }

    pub fn report_parse_error(&mut self, error: ParseError) {
        self.diagnostics.push(error.into());
    }

    pub fn report_note(&mut self, message: String, location: SourceSpan) {
        self.diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Note,
            message,
            location,
        });
    }

    pub fn report_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.level == DiagnosticLevel::Error)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Configurable error formatter
#[derive(Default)]
pub struct ErrorFormatter {
    /// Quote the offending source text under each diagnostic
    pub show_source: bool,
    pub show_notes: bool,
}

impl ErrorFormatter {
    /// Format a single diagnostic as `level: message at file:line:col`
    pub fn format_diagnostic(&self, diag: &Diagnostic, source_manager: &SourceManager) -> String {
        let level_str = match diag.level {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Note => "note",
        };

        let mut result = format!("{}: {}", level_str, diag.message);

        if let Some(file_info) = source_manager.get_file_info(diag.location.source_id()) {
            let (line, col) = source_manager
                .get_line_column(diag.location.start())
                .unwrap_or((1, 1));
            let filename = file_info.path.to_str().unwrap_or("<invalid>");
            result.push_str(&format!(" at {}:{}:{}", filename, line, col));
        }

        if self.show_source {
            let excerpt = source_manager.get_source_text(diag.location);
            if !excerpt.is_empty() {
                for line in excerpt.lines() {
                    result.push_str("\n  | ");
                    result.push_str(line);
                }
            }
        }

        result
    }

    fn is_visible(&self, diag: &Diagnostic) -> bool {
        diag.level == DiagnosticLevel::Error || self.show_notes
    }

    /// Format multiple diagnostics
    pub fn format_diagnostics(&self, diagnostics: &[Diagnostic], source_manager: &SourceManager) -> String {
        diagnostics
            .iter()
            .filter(|diag| self.is_visible(diag))
            .map(|diag| self.format_diagnostic(diag, source_manager))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Print all diagnostics to stderr
    pub fn print_diagnostics(&self, diagnostics: &[Diagnostic], source_manager: &SourceManager) {
        for diag in diagnostics.iter().filter(|diag| self.is_visible(diag)) {
            eprintln!("{}", self.format_diagnostic(diag, source_manager));
        }
    }
}
