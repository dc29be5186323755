use std::fmt::Write;

use crate::driver::artifact::{CompileArtifact, CompilePhase, PipelineOutputs};
use crate::driver::cli::CompileConfig;
use crate::driver::compiler::CompilerDriver;

pub fn setup_driver(source: &str, phase: CompilePhase) -> CompilerDriver {
    let mut config = CompileConfig::from_source_code(source.to_string()).expect("temporary source file");
    config.stop_after = phase;
    CompilerDriver::from_config(config)
}

pub fn run_pipeline(source: &str, phase: CompilePhase) -> (CompilerDriver, Result<PipelineOutputs, String>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut driver = setup_driver(source, phase);
    let result = driver.run_pipeline(phase).map_err(|e| format!("{:?}", e));
    (driver, result)
}

pub fn run_pipeline_success(source: &str, phase: CompilePhase) -> (CompilerDriver, PipelineOutputs) {
    let (driver, result) = run_pipeline(source, phase);
    match result {
        Ok(output) => (driver, output),
        Err(e) => {
            driver.print_diagnostics();
            panic!("Compilation failed: {}", e);
        }
    }
}

/// Artifact of the only unit in `source`
pub fn run_pass(source: &str, phase: CompilePhase) -> CompileArtifact {
    let (_, outputs) = run_pipeline_success(source, phase);
    outputs.units.into_values().next().expect("No units in output")
}

/// Run up to `phase`, expect failure, and expect `message` in the first error
pub fn run_fail_with_message(source: &str, phase: CompilePhase, message: &str) {
    let (driver, result) = run_pipeline(source, phase);
    assert!(result.is_err(), "expected compilation to fail with '{}'", message);
    let diagnostics = driver.get_diagnostics();
    let first = diagnostics.first().expect("failure without diagnostics");
    assert!(
        first.message.contains(message),
        "expected '{}' in '{}'",
        message,
        first.message
    );
}

/// Generated assembly for `source`
pub fn setup_asm(source: &str) -> String {
    run_pass(source, CompilePhase::Codegen)
        .assembly
        .expect("No assembly generated")
}

/// Only the `.text` section of the generated assembly
pub fn setup_text(source: &str) -> String {
    let asm = setup_asm(source);
    let start = asm.find("section .text\n").expect("no text section") + "section .text\n".len();
    asm[start..].to_string()
}

/// Diagnostics of a run, one block per diagnostic
pub fn setup_diagnostics_output(source: &str, phase: CompilePhase) -> String {
    let (driver, _) = run_pipeline(source, phase);
    let diagnostics = driver.get_diagnostics();
    let mut out = format!("Diagnostics count: {}\n", diagnostics.len());
    for diag in &diagnostics {
        let (line, col) = driver
            .source_manager
            .get_line_column(diag.location.start())
            .unwrap_or((0, 0));
        let _ = write!(
            out,
            "\nLevel: {:?}\nMessage: {}\nLocation: {}:{}\n",
            diag.level, diag.message, line, col
        );
    }
    out
}
