use thiserror::Error;

use crate::codegen::register::Register;
use crate::diagnostic::Diagnostic;
use crate::source_manager::SourceSpan;

/// An error that can occur during code generation. Any of them aborts
/// compilation.
#[derive(Error, Debug)]
pub enum CodegenError {
    /// A register was claimed while another value still owns it.
    #[error("internal error: register {register} is already in use")]
    RegisterInUse { register: Register },
    /// Every scratch register holds a live value.
    #[error("out of registers while lowering expression")]
    OutOfRegisters { location: SourceSpan },
    /// A construct with no lowering.
    #[error("{what} is not supported by the code generator")]
    Unsupported { what: String, location: SourceSpan },
}

impl CodegenError {
    pub fn location(&self) -> SourceSpan {
        match self {
            CodegenError::RegisterInUse { .. } => SourceSpan::empty(),
            CodegenError::OutOfRegisters { location } => *location,
            CodegenError::Unsupported { location, .. } => *location,
        }
    }
}

impl From<CodegenError> for Diagnostic {
    fn from(error: CodegenError) -> Self {
        Diagnostic::error(error.to_string(), error.location())
    }
}
