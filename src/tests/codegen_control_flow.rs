//! `if` / `while` shapes, constant folding and returns.

use super::test_utils::setup_text;

#[test]
fn test_if_true_emits_only_then_branch() {
    let text = setup_text("int main() { if (true) { writeInt(1); } else { writeInt(2); } return 0; }");
    insta::assert_snapshot!(text, @r"
    _start:
        push rbp
        mov rbp, rsp
        and rsp, -16
        mov rax, 1
        push rax
        pop rdi
        call writeInt
        mov rdi, 0
        call _exit
    ");
}

#[test]
fn test_if_false_emits_only_else_branch() {
    let text = setup_text("int main() { if (false) { writeInt(1); } else { writeInt(2); } return 0; }");
    assert!(text.contains("    mov rax, 2\n"));
    assert!(!text.contains("    mov rax, 1\n"));
    assert!(!text.contains(".L"));

    let text = setup_text("int main() { if (false) { writeInt(1); } return 0; }");
    assert!(!text.contains("writeInt"));
}

#[test]
fn test_if_else_on_comparison() {
    let text = setup_text(
        r#"
        int main() int a; {
            a = readInt();
            if (a < 10) { a = 1; } else { a = 2; }
            return a;
        }
        "#,
    );
    insta::assert_snapshot!(text, @r"
    _start:
        push rbp
        mov rbp, rsp
        sub rsp, 16
        and rsp, -16
        mov QWORD [rbp-8], 0
        call readInt
        mov QWORD [rbp-8], rax
        mov rax, QWORD [rbp-8]
        mov rbx, 10
        cmp rax, rbx
        jge .L0
        mov rax, 1
        mov QWORD [rbp-8], rax
        jmp .L1
    .L0:
        mov rax, 2
        mov QWORD [rbp-8], rax
    .L1:
        mov rax, QWORD [rbp-8]
        mov rdi, rax
        call _exit
    ");
}

#[test]
fn test_if_on_bool_value() {
    let text = setup_text("int main() bool b; { b = true; if (b) { writeInt(1); } return 0; }");
    insta::assert_snapshot!(text, @r"
    _start:
        push rbp
        mov rbp, rsp
        sub rsp, 16
        and rsp, -16
        mov DWORD [rbp-4], 0
        mov rax, 1
        mov DWORD [rbp-4], eax
        mov eax, DWORD [rbp-4]
        cmp rax, 1
        jne .L0
        mov rax, 1
        push rax
        pop rdi
        call writeInt
    .L0:
        mov rdi, 0
        call _exit
    ");
}

#[test]
fn test_while_loop_checks_condition_at_the_bottom() {
    let text = setup_text(
        r#"
        int main() int i; {
            i = 0;
            while (i < 3) { i = i + 1; }
            return i;
        }
        "#,
    );
    insta::assert_snapshot!(text, @r"
    _start:
        push rbp
        mov rbp, rsp
        sub rsp, 16
        and rsp, -16
        mov QWORD [rbp-8], 0
        mov rax, 0
        mov QWORD [rbp-8], rax
        jmp .L1
    .L0:
        mov rax, QWORD [rbp-8]
        mov rbx, 1
        add rax, rbx
        mov QWORD [rbp-8], rax
    .L1:
        mov rax, QWORD [rbp-8]
        mov rbx, 3
        cmp rax, rbx
        jl .L0
        mov rax, QWORD [rbp-8]
        mov rdi, rax
        call _exit
    ");
}

#[test]
fn test_while_constant_conditions() {
    let text = setup_text("int main() { while (false) { writeInt(1); } return 0; }");
    assert!(!text.contains("writeInt"));
    assert!(!text.contains(".L"));

    let text = setup_text("int main() { while (true) { writeInt(1); } }");
    insta::assert_snapshot!(text, @r"
    _start:
        push rbp
        mov rbp, rsp
        and rsp, -16
    .L0:
        mov rax, 1
        push rax
        pop rdi
        call writeInt
        jmp .L0
        mov rdi, 0
        call _exit
    ");
}

#[test]
fn test_while_on_bool_value_jumps_when_true() {
    let text = setup_text("int main() bool go; { go = readInt() == 0; while (go) { go = false; } return 0; }");
    assert!(text.contains("    cmp rax, 1\n    je .L0\n"));
}

#[test]
fn test_labels_restart_in_every_function() {
    let text = setup_text(
        r#"
        void f(int a) { if (a == 1) { writeInt(a); } }
        int main() int b; { b = readInt(); if (b != 0) { f(b); } return 0; }
        "#,
    );
    assert_eq!(text.matches(".L0:").count(), 2);
    assert!(!text.contains(".L1"));
    assert!(text.contains("    jne .L0\n"));
    assert!(text.contains("    je .L0\n"));
}

#[test]
fn test_implicit_return_appends_epilogue() {
    let text = setup_text("void f() { writeInt(1); } int main() { f(); return 0; }");
    assert!(text.starts_with(
        "mj_f:\n    push rbp\n    mov rbp, rsp\n    mov rax, 1\n    push rax\n    pop rdi\n    call writeInt\n    mov rsp, rbp\n    pop rbp\n    ret\n_start:\n"
    ));
}

#[test]
fn test_return_inside_branch_keeps_implicit_epilogue() {
    let text = setup_text("void f(int a) { if (a > 0) { return; } writeInt(a); } int main() { f(1); return 0; }");
    // one epilogue for the early return, one at the end
    assert_eq!(text.matches("    ret\n").count(), 2);
}

#[test]
fn test_void_call_returned_from_void_function() {
    let text = setup_text("void f() { } void g() { return f(); } int main() { g(); return 0; }");
    assert!(text.contains("mj_g:\n    push rbp\n    mov rbp, rsp\n    call mj_f\n    mov rsp, rbp\n    pop rbp\n    ret\n"));
}
