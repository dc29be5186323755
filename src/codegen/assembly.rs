//! NASM text model: operands, instructions and the section buffers of one
//! output file.

use std::fmt::{self, Write as _};

use indexmap::IndexMap;

use crate::ast::NameId;
use crate::codegen::register::Register;

/// Base of a memory operand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Base {
    Register(Register),
    /// A `.bss`/`.data` symbol, addressed relative to `rip`
    Symbol(String),
}

/// `[base + offset]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub base: Base,
    pub offset: i32,
}

impl Address {
    pub fn frame(offset: i32) -> Self {
        Address {
            base: Base::Register(Register::Rbp),
            offset,
        }
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Address {
            base: Base::Symbol(name.into()),
            offset: 0,
        }
    }

    pub fn register(register: Register) -> Self {
        Address {
            base: Base::Register(register),
            offset: 0,
        }
    }

    pub fn offset_by(&self, delta: i32) -> Self {
        Address {
            base: self.base.clone(),
            offset: self.offset + delta,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.base {
            Base::Register(register) => write!(f, "[{}", register)?,
            Base::Symbol(name) => write!(f, "[{}", name)?,
        }
        match self.offset {
            0 => write!(f, "]"),
            offset if offset < 0 => write!(f, "-{}]", -offset),
            offset => write!(f, "+{}]", offset),
        }
    }
}

/// Operand width of a memory access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Dword,
    Qword,
}

impl Width {
    pub fn of_size(size: u32) -> Self {
        if size == 4 { Width::Dword } else { Width::Qword }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Reg(Register),
    /// 32-bit view of a register
    Reg32(Register),
    /// 8-bit view of a register
    Reg8(Register),
    Imm(i64),
    /// Sized memory access
    Mem(Width, Address),
    /// Unsized address, for `lea`
    Addr(Address),
    Label(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(register) => f.write_str(register.name()),
            Operand::Reg32(register) => f.write_str(register.dword_name()),
            Operand::Reg8(register) => f.write_str(register.byte_name()),
            Operand::Imm(value) => write!(f, "{}", value),
            Operand::Mem(Width::Dword, address) => write!(f, "DWORD {}", address),
            Operand::Mem(Width::Qword, address) => write!(f, "QWORD {}", address),
            Operand::Addr(address) => write!(f, "{}", address),
            Operand::Label(label) => f.write_str(label),
        }
    }
}

/// One line of the `.text` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Label(String),
    Instruction(&'static str, Vec<Operand>),
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Label(label) => write!(f, "{}:", label),
            Line::Instruction(mnemonic, operands) => {
                write!(f, "    {}", mnemonic)?;
                for (i, operand) in operands.iter().enumerate() {
                    let separator = if i == 0 { " " } else { ", " };
                    write!(f, "{}{}", separator, operand)?;
                }
                Ok(())
            }
        }
    }
}

/// The output file under construction.
#[derive(Debug, Default)]
pub struct Assembly {
    externs: Vec<&'static str>,
    globals: Vec<String>,
    /// String constants by content, in first-use order
    strings: IndexMap<NameId, String>,
    bss: Vec<(String, u32)>,
    text: Vec<Line>,
}

impl Assembly {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_extern(&mut self, name: &'static str) {
        self.externs.push(name);
    }

    pub fn declare_global(&mut self, name: impl Into<String>) {
        self.globals.push(name.into());
    }

    /// Reserve `size` zeroed bytes under `name`
    pub fn reserve(&mut self, name: impl Into<String>, size: u32) {
        self.bss.push((name.into(), size));
    }

    /// Label of the constant holding `value`; equal strings share one.
    pub fn intern_string(&mut self, value: NameId) -> String {
        let next = self.strings.len();
        self.strings.entry(value).or_insert_with(|| format!("str{}", next)).clone()
    }

    pub fn label(&mut self, label: impl Into<String>) {
        self.text.push(Line::Label(label.into()));
    }

    pub fn emit(&mut self, mnemonic: &'static str, operands: Vec<Operand>) {
        self.text.push(Line::Instruction(mnemonic, operands));
    }

    /// Render the whole file: header, `.data`, `.bss`, `.text`
    pub fn finish(&self) -> String {
        let mut out = String::new();
        out.push_str("DEFAULT REL\nbits 64\n");
        for name in &self.externs {
            let _ = writeln!(out, "extern {}", name);
        }
        for name in &self.globals {
            let _ = writeln!(out, "global {}", name);
        }

        out.push_str("\nsection .data\n");
        for (value, label) in &self.strings {
            let _ = writeln!(out, "{}: db {}", label, nasm_bytes(value.as_str()));
        }

        out.push_str("\nsection .bss\nalignb 8\n");
        for (name, size) in &self.bss {
            let _ = writeln!(out, "{}: resb {}", name, size);
        }

        out.push_str("\nsection .text\n");
        for line in &self.text {
            let _ = writeln!(out, "{}", line);
        }
        out
    }
}

/// `db` operand list for a zero-terminated string: printable runs are
/// quoted, every other byte is written as a number.
fn nasm_bytes(value: &str) -> String {
    let mut parts = Vec::new();
    let mut run = String::new();
    for byte in value.bytes() {
        if (0x20..0x7f).contains(&byte) && byte != b'"' {
            run.push(byte as char);
        } else {
            if !run.is_empty() {
                parts.push(format!("\"{}\"", std::mem::take(&mut run)));
            }
            parts.push(byte.to_string());
        }
    }
    if !run.is_empty() {
        parts.push(format!("\"{}\"", run));
    }
    parts.push("0".to_string());
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_operands() {
        assert_eq!(Address::frame(-12).to_string(), "[rbp-12]");
        assert_eq!(Address::frame(24).to_string(), "[rbp+24]");
        assert_eq!(Address::symbol("count").to_string(), "[count]");
        let line = Line::Instruction(
            "mov",
            vec![Operand::Mem(Width::Dword, Address::frame(-4)), Operand::Reg32(Register::R10)],
        );
        assert_eq!(line.to_string(), "    mov DWORD [rbp-4], r10d");
        assert_eq!(Line::Instruction("ret", vec![]).to_string(), "    ret");
    }

    #[test]
    fn escapes_string_constants() {
        assert_eq!(nasm_bytes("hi"), "\"hi\", 0");
        assert_eq!(nasm_bytes("a\nb"), "\"a\", 10, \"b\", 0");
        assert_eq!(nasm_bytes("say \"x\""), "\"say \", 34, \"x\", 34, 0");
        assert_eq!(nasm_bytes(""), "0");
    }

    #[test]
    fn equal_strings_share_a_label() {
        let mut asm = Assembly::new();
        assert_eq!(asm.intern_string(NameId::new("a")), "str0");
        assert_eq!(asm.intern_string(NameId::new("b")), "str1");
        assert_eq!(asm.intern_string(NameId::new("a")), "str0");
    }
}
