//! A MiniJ compiler implemented in Rust.
//!
//! Source text is lexed and parsed into a flattened AST, bound and type
//! checked in two passes, and lowered to x86-64 NASM assembly.

pub mod ast;
pub mod codegen;
pub mod diagnostic;
pub mod driver;
pub mod lexer;
pub mod parser;
pub mod semantic;
pub mod source_manager;
