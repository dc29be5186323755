use minijc::driver::{CompileConfig, CompilePhase, CompilerDriver, PipelineError};

fn compile(source: &str) -> (CompilerDriver, Result<Option<String>, PipelineError>) {
    let config = CompileConfig::from_source_code(source.to_string()).expect("temporary source");
    let mut driver = CompilerDriver::from_config(config);
    let result = driver
        .run_pipeline(CompilePhase::Codegen)
        .map(|outputs| outputs.units.into_values().next().and_then(|unit| unit.assembly));
    (driver, result)
}

/// Assert that `needles` appear in `haystack` in this order
fn assert_in_order(haystack: &str, needles: &[&str]) {
    let mut rest = haystack;
    for needle in needles {
        let position = rest
            .find(needle)
            .unwrap_or_else(|| panic!("'{}' missing or out of order in:\n{}", needle, haystack));
        rest = &rest[position + needle.len()..];
    }
}

#[test]
fn test_return_type_mismatch_is_reported() {
    let (driver, result) = compile("int f(int x) { return \"oops\"; }\nint main() { return f(1); }");
    assert!(matches!(result, Err(PipelineError::Fatal)));
    let diagnostics = driver.format_diagnostics();
    assert!(
        diagnostics.contains("error: Return type mismatch: expected int, found text"),
        "{}",
        diagnostics
    );
    assert!(diagnostics.contains(".mj:1:16"), "{}", diagnostics);
}

#[test]
fn test_matching_return_produces_function_body() {
    let (_, result) = compile("int f(int x) { return 1; }\nint main() { return f(1); }");
    let asm = result.expect("compiles").expect("assembly");
    assert_in_order(
        &asm,
        &[
            "\nmj_f:\n",
            "    push rbp\n",
            "    mov rbp, rsp\n",
            "    mov rax, 1\n",
            "    mov rsp, rbp\n",
            "    pop rbp\n",
            "    ret\n",
            "_start:\n",
            "    call mj_f\n",
            "    call _exit\n",
        ],
    );
}

#[test]
fn test_program_using_every_construct() {
    let source = r#"
        record Account { int balance; bool frozen; }
        Account savings;
        text banner;

        void deposit(Account & account, int amount) {
            if (account.frozen) { return; }
            account.balance = account.balance + amount;
        }

        int interest(int balance, int rate) { return balance * rate / 100; }
        bool interest(int balance) { return balance > 1000; }

        int main() int year; int[] history; {
            banner = "savings";
            year = 0;
            while (year < 10) {
                deposit(savings, interest(savings.balance, 5));
                year = year + 1;
            }
            if (interest(savings.balance)) {
                writeInt(savings.balance);
            } else {
                writeChar(33);
            }
            return savings.balance % 256;
        }
    "#;
    let (driver, result) = compile(source);
    let asm = match result {
        Ok(asm) => asm.expect("assembly"),
        Err(_) => panic!("{}", driver.format_diagnostics()),
    };

    assert_in_order(
        &asm,
        &[
            "section .data\n",
            "str0: db \"savings\", 0\n",
            "section .bss\n",
            "mj_savings: resb 12\n",
            "mj_banner: resb 8\n",
            "section .text\n",
            "mj_deposit:\n",
            "mj_interest@0:\n",
            "mj_interest@1:\n",
            "_start:\n",
        ],
    );
    assert!(asm.contains("    call mj_interest@0\n"));
    assert!(asm.contains("    call mj_interest@1\n"));
    assert!(asm.contains("    call mj_deposit\n"));
    assert!(asm.contains("    idiv "));
}

#[test]
fn test_records_by_value_and_text_equality_compile() {
    let source = r#"
        record P { int x; int y; }
        int sum(P p) { return p.x + p.y; }
        bool same(text a) { return a == "x"; }
        int main() P q; bool b; {
            q.x = 1;
            q.y = 2;
            b = same("x");
            return sum(q);
        }
    "#;
    let (driver, result) = compile(source);
    let asm = match result {
        Ok(asm) => asm.expect("assembly"),
        Err(_) => panic!("{}", driver.format_diagnostics()),
    };
    assert_in_order(
        &asm,
        &[
            "mj_sum:\n",
            "    mov r11, rdi\n",
            "mj_same:\n",
            "    sete al\n",
            "_start:\n",
            "    call mj_same\n",
            "    lea rax, [rbp-16]\n",
            "    call mj_sum\n",
        ],
    );
}

#[test]
fn test_check_only_pipeline_has_no_assembly() {
    let config = CompileConfig::from_source_code("int main() { return 0; }".to_string()).expect("temporary source");
    let mut driver = CompilerDriver::from_config(config);
    let outputs = driver.run_pipeline(CompilePhase::TypeCheck).expect("checks");
    let unit = outputs.units.into_values().next().expect("one unit");
    assert!(unit.assembly.is_none());
    assert!(unit.symbol_table.is_some());
}
