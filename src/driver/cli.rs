//! CLI parsing and configuration module
//!
//! This module handles command-line argument parsing using clap and
//! provides configuration structures for the compiler driver.

use clap::Parser as CliParser;
use std::path::{Path, PathBuf};

use super::artifact::CompilePhase;

/// CLI interface using clap
#[derive(CliParser, Debug)]
#[clap(name = "minijc", about = "MiniJ compiler emitting x86-64 NASM assembly")]
pub struct Cli {
    /// Input MiniJ source file; standard input when omitted
    #[clap(value_parser)]
    pub input_file: Option<PathBuf>,

    /// Output file for the assembly (`-` for stdout)
    #[clap(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print the AST after parsing
    #[clap(long)]
    pub dump_ast: bool,

    /// Stop after type checking, emit nothing
    #[clap(long)]
    pub check: bool,

    /// Enable debug logging
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(Debug)]
pub struct CompileConfig {
    /// Empty means the program is read from standard input
    pub input_files: Vec<PathBuf>,
    /// Defaults to the input path with an `.asm` extension
    pub output_path: Option<PathBuf>,
    pub dump_ast: bool,
    pub stop_after: CompilePhase,
    pub verbose: bool,
    _temp_file: Option<tempfile::TempPath>,
}

impl CompileConfig {
    /// Configuration compiling `source` from a temporary `.mj` file
    pub fn from_source_code(source: String) -> std::io::Result<Self> {
        use std::io::Write;
        let mut tmpfile = tempfile::Builder::new().suffix(".mj").tempfile()?;
        write!(tmpfile, "{}", source)?;
        let temp_path = tmpfile.into_temp_path();
        let path = temp_path.to_path_buf();

        Ok(Self {
            input_files: vec![path],
            output_path: None,
            dump_ast: false,
            stop_after: CompilePhase::default(),
            verbose: false,
            _temp_file: Some(temp_path),
        })
    }

    /// Where the assembly for `input` goes; `None` means stdout.
    /// A program read from standard input goes to stdout unless `-o` is given.
    pub fn output_for(&self, input: Option<&Path>) -> Option<PathBuf> {
        match &self.output_path {
            Some(path) if path.as_os_str() == "-" => None,
            Some(path) => Some(path.clone()),
            None => input.map(|input| input.with_extension("asm")),
        }
    }
}

impl Cli {
    pub fn into_config(self) -> CompileConfig {
        let stop_after = if self.check {
            CompilePhase::TypeCheck
        } else {
            CompilePhase::Codegen
        };

        CompileConfig {
            input_files: self.input_file.into_iter().collect(),
            output_path: self.output,
            dump_ast: self.dump_ast,
            stop_after,
            verbose: self.verbose,
            _temp_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_flag_stops_after_type_checking() {
        let cli = Cli::parse_from(["minijc", "prog.mj", "--check"]);
        let config = cli.into_config();
        assert_eq!(config.stop_after, CompilePhase::TypeCheck);
        assert_eq!(config.input_files, vec![PathBuf::from("prog.mj")]);
    }

    #[test]
    fn output_defaults_next_to_input() {
        let config = Cli::parse_from(["minijc", "dir/prog.mj"]).into_config();
        assert_eq!(
            config.output_for(Some(Path::new("dir/prog.mj"))),
            Some(PathBuf::from("dir/prog.asm"))
        );

        let config = Cli::parse_from(["minijc", "prog.mj", "-o", "-"]).into_config();
        assert_eq!(config.output_for(Some(Path::new("prog.mj"))), None);
    }

    #[test]
    fn missing_input_reads_stdin() {
        let config = Cli::parse_from(["minijc"]).into_config();
        assert!(config.input_files.is_empty());
        assert_eq!(config.output_for(None), None);

        let config = Cli::parse_from(["minijc", "-o", "out.asm"]).into_config();
        assert_eq!(config.output_for(None), Some(PathBuf::from("out.asm")));
    }
}
