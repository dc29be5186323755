use crate::ast::{Ast, SourceId};
use crate::semantic::SymbolTable;

/// compilation outputs for all source files
pub struct PipelineOutputs {
    pub units: indexmap::IndexMap<SourceId, CompileArtifact>,
}

/// Last phase the pipeline runs
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CompilePhase {
    Parse,
    Bind,
    TypeCheck,
    #[default]
    Codegen,
}

/// outputs for a single compilation unit
#[derive(Default)]
pub struct CompileArtifact {
    /// Tree, with semantic info attached once binding ran
    pub ast: Option<Ast>,
    pub symbol_table: Option<SymbolTable>,
    pub assembly: Option<String>,
}
