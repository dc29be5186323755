//! Core compilation pipeline orchestration module
//!
//! This module contains the main compiler driver that runs lexing, parsing,
//! both semantic passes and code generation, stopping at the first phase
//! that reports an error.

use std::io::Read;

use indexmap::IndexMap;
use log::debug;

use crate::ast::dumper::AstDumper;
use crate::ast::{Ast, NodeKind, NodeRef, SemanticInfo, SourceId};
use crate::codegen::generate_assembly;
use crate::diagnostic::{Diagnostic, DiagnosticEngine, ErrorFormatter};
use crate::lexer::{Lexer, Token};
use crate::parser::Parser;
use crate::semantic::{SymbolTable, run_binder, run_type_checker};
use crate::source_manager::SourceManager;

use super::artifact::{CompileArtifact, CompilePhase, PipelineOutputs};
use super::cli::CompileConfig;

/// Name diagnostics use for a program read from standard input
const STDIN_NAME: &str = "<stdin>";

/// Main compiler driver
pub struct CompilerDriver {
    config: CompileConfig,
    diagnostics: DiagnosticEngine,
    pub(crate) source_manager: SourceManager,
}

impl CompilerDriver {
    /// Create a new compiler driver from CLI arguments
    pub fn new(cli: super::cli::Cli) -> Self {
        Self::from_config(cli.into_config())
    }

    /// Create a new compiler driver from configuration
    pub fn from_config(config: CompileConfig) -> Self {
        CompilerDriver {
            diagnostics: DiagnosticEngine::new(),
            source_manager: SourceManager::new(),
            config,
        }
    }

    pub fn run_pipeline(&mut self, stop_after: CompilePhase) -> Result<PipelineOutputs, PipelineError> {
        let mut outputs = PipelineOutputs { units: IndexMap::new() };

        if self.config.input_files.is_empty() {
            let mut buffer = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buffer)
                .map_err(PipelineError::IoError)?;
            let source_id = self.source_manager.add_buffer(buffer, STDIN_NAME);
            let unit_output = self.run_translation_unit(source_id, stop_after)?;
            outputs.units.insert(source_id, unit_output);
            return Ok(outputs);
        }

        let input_files = self.config.input_files.clone();
        for input_file in input_files {
            let source_id = self
                .source_manager
                .add_file_from_path(&input_file)
                .map_err(PipelineError::IoError)?;

            let unit_output = self.run_translation_unit(source_id, stop_after)?;
            outputs.units.insert(source_id, unit_output);
        }

        Ok(outputs)
    }

    fn run_translation_unit(
        &mut self,
        source_id: SourceId,
        stop_after: CompilePhase,
    ) -> Result<CompileArtifact, PipelineError> {
        let mut out = CompileArtifact::default();

        let tokens = self.run_lexer(source_id)?;
        let ast = self.run_parser(&tokens)?;
        if self.config.dump_ast {
            AstDumper::print(&ast);
        }
        if stop_after == CompilePhase::Parse {
            out.ast = Some(ast);
            return Ok(out);
        }

        // pass 1
        let mut symbol_table = SymbolTable::new();
        let mut info = self.run_binder(&ast, &mut symbol_table)?;
        if stop_after == CompilePhase::Bind {
            out.ast = Some(with_info(ast, info));
            out.symbol_table = Some(symbol_table);
            return Ok(out);
        }

        // pass 2
        self.run_type_checker(&ast, &mut symbol_table, &mut info)?;
        if stop_after == CompilePhase::TypeCheck {
            out.ast = Some(with_info(ast, info));
            out.symbol_table = Some(symbol_table);
            return Ok(out);
        }

        let assembly = self.run_codegen(&ast, &info, &symbol_table)?;
        out.ast = Some(with_info(ast, info));
        out.symbol_table = Some(symbol_table);
        out.assembly = Some(assembly);
        Ok(out)
    }

    fn run_lexer(&mut self, source_id: SourceId) -> Result<Vec<Token>, PipelineError> {
        let buffer = self.source_manager.get_buffer(source_id);
        match Lexer::new(buffer, source_id).tokenize_all() {
            Ok(tokens) => Ok(tokens),
            Err(e) => {
                self.diagnostics.report_parse_error(e);
                Err(PipelineError::Fatal)
            }
        }
    }

    fn run_parser(&mut self, tokens: &[Token]) -> Result<Ast, PipelineError> {
        let mut ast = Ast::new();
        let mut parser = Parser::new(tokens, &mut ast);
        if let Err(e) = parser.parse_unit() {
            self.diagnostics.report_parse_error(e);
            return Err(PipelineError::Fatal);
        }

        Ok(ast)
    }

    fn run_binder(&mut self, ast: &Ast, symbol_table: &mut SymbolTable) -> Result<SemanticInfo, PipelineError> {
        let info = run_binder(ast, &mut self.diagnostics, symbol_table);
        self.check_diagnostics_and_return_if_error()?;
        debug!("binder: {} scopes, {} entries", symbol_table.scope_count(), symbol_table.entries.len());
        Ok(info)
    }

    fn run_type_checker(
        &mut self,
        ast: &Ast,
        symbol_table: &mut SymbolTable,
        info: &mut SemanticInfo,
    ) -> Result<(), PipelineError> {
        run_type_checker(ast, &mut self.diagnostics, symbol_table, info);
        self.check_diagnostics_and_return_if_error()?;

        // invariant validations
        // every call must have a resolved overload
        #[cfg(debug_assertions)]
        for (node_ref, kind) in (1..).filter_map(NodeRef::new).zip(&ast.kinds) {
            if let NodeKind::Call(call) = kind
                && info.call_target(node_ref).is_none()
            {
                panic!(
                    "ICE: call to '{}' still not resolved: {:?}",
                    call.name,
                    self.source_manager.get_line_column(ast.get_span(node_ref).start())
                );
            }
        }
        Ok(())
    }

    fn run_codegen(
        &mut self,
        ast: &Ast,
        info: &SemanticInfo,
        symbol_table: &SymbolTable,
    ) -> Result<String, PipelineError> {
        match generate_assembly(ast, info, symbol_table) {
            Ok(assembly) => Ok(assembly),
            Err(e) => {
                self.diagnostics.report_diagnostic(Diagnostic::from(e));
                Err(PipelineError::Fatal)
            }
        }
    }

    /// Check if there are any diagnostics errors and return PipelineError::Fatal if there are
    fn check_diagnostics_and_return_if_error(&self) -> Result<(), PipelineError> {
        if self.diagnostics.has_errors() {
            Err(PipelineError::Fatal)
        } else {
            Ok(())
        }
    }

    /// Run the compilation process for all input files and write the
    /// assembly. Diagnostics are printed if any error occurs.
    pub fn run(&mut self) -> Result<(), DriverError> {
        match self.run_pipeline(self.config.stop_after) {
            Ok(outputs) => {
                self.print_diagnostics();
                for (index, (_source_id, artifact)) in outputs.units.into_iter().enumerate() {
                    let Some(assembly) = artifact.assembly else {
                        continue;
                    };
                    let input = self.config.input_files.get(index).map(|path| path.as_path());
                    match self.config.output_for(input) {
                        Some(path) => {
                            debug!("writing {}", path.display());
                            std::fs::write(&path, assembly).map_err(|e| {
                                DriverError::IoError(format!("Failed to write {}: {}", path.display(), e))
                            })?;
                        }
                        None => print!("{}", assembly),
                    }
                }
                Ok(())
            }
            Err(PipelineError::IoError(io_err)) => Err(DriverError::IoError(io_err.to_string())),
            Err(PipelineError::Fatal) => {
                self.print_diagnostics();
                Err(DriverError::CompilationFailed)
            }
        }
    }

    /// Get diagnostics for testing
    #[cfg(test)]
    pub(crate) fn get_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.diagnostics().to_vec()
    }

    /// Verbose runs also print notes and the offending source text
    fn formatter(&self) -> ErrorFormatter {
        ErrorFormatter {
            show_source: self.config.verbose,
            show_notes: self.config.verbose,
        }
    }

    /// Diagnostics rendered the way they are printed
    pub fn format_diagnostics(&self) -> String {
        self.formatter()
            .format_diagnostics(self.diagnostics.diagnostics(), &self.source_manager)
    }

    /// Print accumulated diagnostics without returning an error
    pub(crate) fn print_diagnostics(&self) {
        self.formatter()
            .print_diagnostics(self.diagnostics.diagnostics(), &self.source_manager);
    }
}

fn with_info(mut ast: Ast, info: SemanticInfo) -> Ast {
    ast.attach_semantic_info(info);
    ast
}

/// Error types for the compiler driver
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Compilation failed due to errors")]
    CompilationFailed,
}

/// Error that will stop the compilation pipeline
#[derive(Debug)]
pub enum PipelineError {
    Fatal,
    IoError(std::io::Error),
}
