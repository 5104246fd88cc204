use thiserror::Error;

/// Everything that can stop the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Chip8Error {
    #[error("ROM is too large ({size} bytes), max size is {max} bytes")]
    RomTooLarge { size: usize, max: usize },

    #[error("stack overflow: more than 16 nested subroutine calls")]
    StackOverflow,

    #[error("stack underflow: return with an empty call stack")]
    StackUnderflow,

    #[error("memory access out of bounds at address {address:#06X}")]
    OutOfBoundsAccess { address: usize },

    #[error("unknown opcode {opcode:#06X}")]
    UnknownOpcode { opcode: u16 },
}

/// A fatal error together with the address of the instruction that raised it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{error} (pc {pc:#05X})")]
pub struct Fault {
    pub pc: u16,
    #[source]
    pub error: Chip8Error,
}
