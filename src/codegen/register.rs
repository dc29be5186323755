//! x86-64 registers and the per-function allocation state.

use std::fmt;

use log::trace;

use crate::codegen::error::CodegenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    Rdi,
    Rsi,
    Rdx,
    Rcx,
    R8,
    R9,
    Rax,
    Rbx,
    R10,
    R11,
    R12,
    Rbp,
    Rsp,
}

/// Registers carrying the first arguments of a call, in order
pub const ARGUMENT_REGISTERS: [Register; 6] = [
    Register::Rdi,
    Register::Rsi,
    Register::Rdx,
    Register::Rcx,
    Register::R8,
    Register::R9,
];

/// Registers handed out to expression temporaries
pub const SCRATCH_REGISTERS: [Register; 5] = [
    Register::Rax,
    Register::Rbx,
    Register::R10,
    Register::R11,
    Register::R12,
];

const TRACKED: usize = ARGUMENT_REGISTERS.len() + SCRATCH_REGISTERS.len();

impl Register {
    pub fn name(self) -> &'static str {
        match self {
            Register::Rdi => "rdi",
            Register::Rsi => "rsi",
            Register::Rdx => "rdx",
            Register::Rcx => "rcx",
            Register::R8 => "r8",
            Register::R9 => "r9",
            Register::Rax => "rax",
            Register::Rbx => "rbx",
            Register::R10 => "r10",
            Register::R11 => "r11",
            Register::R12 => "r12",
            Register::Rbp => "rbp",
            Register::Rsp => "rsp",
        }
    }

    /// Low 32 bits
    pub fn dword_name(self) -> &'static str {
        match self {
            Register::Rdi => "edi",
            Register::Rsi => "esi",
            Register::Rdx => "edx",
            Register::Rcx => "ecx",
            Register::R8 => "r8d",
            Register::R9 => "r9d",
            Register::Rax => "eax",
            Register::Rbx => "ebx",
            Register::R10 => "r10d",
            Register::R11 => "r11d",
            Register::R12 => "r12d",
            Register::Rbp => "ebp",
            Register::Rsp => "esp",
        }
    }

    /// Low 8 bits
    pub fn byte_name(self) -> &'static str {
        match self {
            Register::Rdi => "dil",
            Register::Rsi => "sil",
            Register::Rdx => "dl",
            Register::Rcx => "cl",
            Register::R8 => "r8b",
            Register::R9 => "r9b",
            Register::Rax => "al",
            Register::Rbx => "bl",
            Register::R10 => "r10b",
            Register::R11 => "r11b",
            Register::R12 => "r12b",
            Register::Rbp => "bpl",
            Register::Rsp => "spl",
        }
    }

    /// Slot in the in-use table; the frame and stack pointers are never tracked.
    fn slot(self) -> Option<usize> {
        match self {
            Register::Rbp | Register::Rsp => None,
            other => Some(other as usize),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// In-use flags of every allocatable register.
///
/// One value exists per function being generated; it is dropped when that
/// function is done.
#[derive(Debug, Default)]
pub struct RegisterFile {
    in_use: [bool; TRACKED],
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_use(&self, register: Register) -> bool {
        register.slot().is_some_and(|slot| self.in_use[slot])
    }

    /// Claim a specific register, failing if it already holds a value.
    pub fn claim(&mut self, register: Register) -> Result<(), CodegenError> {
        let Some(slot) = register.slot() else {
            return Err(CodegenError::RegisterInUse { register });
        };
        if self.in_use[slot] {
            return Err(CodegenError::RegisterInUse { register });
        }
        trace!("RegisterFile: claim {}", register);
        self.in_use[slot] = true;
        Ok(())
    }

    /// Claim the first free scratch register
    pub fn claim_scratch(&mut self) -> Option<Register> {
        let register = SCRATCH_REGISTERS.into_iter().find(|&r| !self.is_in_use(r))?;
        self.claim(register).ok()?;
        Some(register)
    }

    pub fn release(&mut self, register: Register) {
        if let Some(slot) = register.slot() {
            debug_assert!(self.in_use[slot], "releasing free register {register}");
            trace!("RegisterFile: release {}", register);
            self.in_use[slot] = false;
        }
    }

    /// Registers holding a value, in table order
    pub fn live(&self) -> Vec<Register> {
        ARGUMENT_REGISTERS
            .into_iter()
            .chain(SCRATCH_REGISTERS)
            .filter(|&r| self.is_in_use(r))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_registers_are_handed_out_in_order() {
        let mut registers = RegisterFile::new();
        let claimed: Vec<_> = std::iter::from_fn(|| registers.claim_scratch()).collect();
        assert_eq!(claimed, SCRATCH_REGISTERS);
        assert_eq!(registers.claim_scratch(), None);

        registers.release(Register::R10);
        assert_eq!(registers.claim_scratch(), Some(Register::R10));
    }

    #[test]
    fn claiming_an_owned_register_fails() {
        let mut registers = RegisterFile::new();
        registers.claim(Register::Rdi).unwrap();
        assert!(matches!(
            registers.claim(Register::Rdi),
            Err(CodegenError::RegisterInUse {
                register: Register::Rdi
            })
        ));
        assert!(registers.claim(Register::Rbp).is_err());
    }

    #[test]
    fn live_registers_list_arguments_first() {
        let mut registers = RegisterFile::new();
        registers.claim(Register::Rbx).unwrap();
        registers.claim(Register::Rsi).unwrap();
        assert_eq!(registers.live(), vec![Register::Rsi, Register::Rbx]);
    }
}
