//! Driver behavior: phase stops, output files and error reporting.

use super::test_utils::{run_pass, run_pipeline, setup_driver};
use crate::driver::artifact::CompilePhase;
use crate::driver::cli::CompileConfig;
use crate::driver::compiler::{CompilerDriver, DriverError, PipelineError};

const PROGRAM: &str = "int main() { writeInt(42); return 0; }";

#[test]
fn test_each_phase_stops_where_asked() {
    let parsed = run_pass(PROGRAM, CompilePhase::Parse);
    assert!(parsed.ast.is_some_and(|ast| ast.semantic_info.is_none()));
    assert!(parsed.symbol_table.is_none());

    let bound = run_pass(PROGRAM, CompilePhase::Bind);
    assert!(bound.symbol_table.is_some());
    let ast = bound.ast.expect("ast");
    let info = ast.semantic_info.as_ref().expect("semantic info");
    assert!(info.types.iter().all(Option::is_none));

    let checked = run_pass(PROGRAM, CompilePhase::TypeCheck);
    assert!(checked.assembly.is_none());
    let ast = checked.ast.expect("ast");
    let info = ast.semantic_info.as_ref().expect("semantic info");
    assert!(info.call_targets.iter().any(Option::is_some));

    let generated = run_pass(PROGRAM, CompilePhase::Codegen);
    assert!(generated.assembly.is_some_and(|asm| asm.contains("call writeInt")));
}

#[test]
fn test_parse_error_stops_the_pipeline() {
    let (driver, result) = run_pipeline("int main() { return 0 }", CompilePhase::Codegen);
    assert!(result.is_err());
    let diagnostics = driver.get_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.starts_with("Unexpected token"));
}

#[test]
fn test_binder_error_skips_type_checking() {
    // the assignment mismatch is never reported
    let (driver, result) = run_pipeline(
        "int main() bool b; { b = 1; return missing; }",
        CompilePhase::Codegen,
    );
    assert!(result.is_err());
    let diagnostics = driver.get_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message, "Undeclared identifier 'missing'");
}

#[test]
fn test_formatted_diagnostics_name_the_file() {
    let mut driver = setup_driver("int main() {\n  return true;\n}\n", CompilePhase::Codegen);
    assert!(driver.run_pipeline(CompilePhase::Codegen).is_err());
    let formatted = driver.format_diagnostics();
    assert!(formatted.starts_with("error: Return type mismatch: expected int, found bool at "));
    assert!(formatted.ends_with(".mj:2:3"));
}

#[test]
fn test_missing_input_is_an_io_error() {
    let mut config = CompileConfig::from_source_code(String::new()).expect("config");
    config.input_files = vec!["does/not/exist.mj".into()];
    let mut driver = CompilerDriver::from_config(config);
    assert!(matches!(
        driver.run_pipeline(CompilePhase::Codegen),
        Err(PipelineError::IoError(_))
    ));
    assert!(matches!(driver.run(), Err(DriverError::IoError(_))));
}

#[test]
fn test_run_writes_assembly_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("out.asm");
    let mut config = CompileConfig::from_source_code(PROGRAM.to_string()).expect("config");
    config.output_path = Some(output.clone());

    CompilerDriver::from_config(config).run().expect("compilation succeeds");
    let written = std::fs::read_to_string(&output).expect("assembly written");
    assert!(written.starts_with("DEFAULT REL\nbits 64\n"));
    assert!(written.contains("global _start\n"));
}

#[test]
fn test_run_defaults_output_next_to_input() {
    let config = CompileConfig::from_source_code(PROGRAM.to_string()).expect("config");
    let expected = config.input_files[0].with_extension("asm");
    CompilerDriver::from_config(config).run().expect("compilation succeeds");
    let written = std::fs::read_to_string(&expected).expect("assembly written");
    let _ = std::fs::remove_file(&expected);
    assert!(written.contains("_start:\n"));
}

#[test]
fn test_check_mode_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("out.asm");
    let mut config = CompileConfig::from_source_code(PROGRAM.to_string()).expect("config");
    config.output_path = Some(output.clone());
    config.stop_after = CompilePhase::TypeCheck;

    CompilerDriver::from_config(config).run().expect("checking succeeds");
    assert!(!output.exists());
}

#[test]
fn test_failed_run_reports_compilation_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("out.asm");
    let mut config = CompileConfig::from_source_code("int main() { return x; }".to_string()).expect("config");
    config.output_path = Some(output.clone());

    assert!(matches!(
        CompilerDriver::from_config(config).run(),
        Err(DriverError::CompilationFailed)
    ));
    assert!(!output.exists());
}

#[test]
fn test_verbose_diagnostics_show_notes_and_source() {
    let mut config = CompileConfig::from_source_code("int main() int a; int a; { return 0; }".to_string()).expect("config");
    config.verbose = true;
    let mut driver = CompilerDriver::from_config(config);
    assert!(driver.run_pipeline(CompilePhase::Codegen).is_err());

    let formatted = driver.format_diagnostics();
    let lines: Vec<_> = formatted.lines().collect();
    assert_eq!(lines.len(), 4, "{}", formatted);
    assert!(lines[0].starts_with("error: Redefinition of 'a' at ") && lines[0].ends_with(":1:19"));
    assert_eq!(lines[1], "  | int a;");
    assert!(lines[2].starts_with("note: previous definition is here at ") && lines[2].ends_with(":1:12"));
    assert_eq!(lines[3], "  | int a;");
}
