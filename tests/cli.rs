use assert_cmd::Command;
use predicates::prelude::*;

fn source_file(dir: &tempfile::TempDir, name: &str, source: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, source).expect("write source");
    path
}

#[test]
fn test_writes_assembly_to_stdout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = source_file(&dir, "ok.mj", "int main() { writeInt(7); return 0; }");
    Command::cargo_bin("minijc")
        .expect("binary")
        .arg(&input)
        .arg("-o")
        .arg("-")
        .assert()
        .success()
        .stdout(predicate::str::contains("global _start").and(predicate::str::contains("call writeInt")));
}

#[test]
fn test_writes_assembly_next_to_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = source_file(&dir, "prog.mj", "int main() { return 3; }");
    Command::cargo_bin("minijc").expect("binary").arg(&input).assert().success();
    let asm = std::fs::read_to_string(dir.path().join("prog.asm")).expect("prog.asm");
    assert!(asm.contains("    mov rdi, 3\n    call _exit\n"));
}

#[test]
fn test_semantic_error_exits_with_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = source_file(&dir, "bad.mj", "int main() {\n  return missing;\n}\n");
    let assert = Command::cargo_bin("minijc")
        .expect("binary")
        .env_remove("RUST_LOG")
        .arg(&input)
        .assert()
        .failure()
        .code(1);
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    let lines: Vec<&str> = stderr.lines().collect();
    assert_eq!(lines.len(), 1, "{stderr}");
    assert!(lines[0].starts_with("error: Undeclared identifier 'missing' at "), "{stderr}");
    assert!(lines[0].ends_with("bad.mj:2:10"), "{stderr}");
    assert!(!dir.path().join("bad.asm").exists());
}

#[test]
fn test_reads_program_from_stdin() {
    Command::cargo_bin("minijc")
        .expect("binary")
        .write_stdin("int main() { writeInt(5); return 0; }")
        .assert()
        .success()
        .stdout(predicate::str::contains("_start:").and(predicate::str::contains("    mov rax, 5\n    push rax\n    pop rdi\n    call writeInt\n")));
}

#[test]
fn test_stdin_errors_name_stdin() {
    Command::cargo_bin("minijc")
        .expect("binary")
        .env_remove("RUST_LOG")
        .write_stdin("int main() {\n  return missing;\n}\n")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("<stdin>:2:10").and(predicate::str::contains("Compilation failed").not()));
}

#[test]
fn test_check_flag_emits_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = source_file(&dir, "checked.mj", "int main() { return 0; }");
    Command::cargo_bin("minijc")
        .expect("binary")
        .arg(&input)
        .arg("--check")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert!(!dir.path().join("checked.asm").exists());
}

#[test]
fn test_dump_ast_prints_tree() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = source_file(&dir, "dump.mj", "int main() { return 0; }");
    Command::cargo_bin("minijc")
        .expect("binary")
        .arg(&input)
        .arg("--dump-ast")
        .arg("--check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Function"));
}

#[test]
fn test_missing_file_fails() {
    Command::cargo_bin("minijc")
        .expect("binary")
        .arg("no/such/file.mj")
        .assert()
        .failure()
        .stderr(predicate::str::contains("I/O error"));
}
