//! A CHIP-8 interpreter core.
//!
//! [`ChipState`] owns the whole machine and executes the 35 standard opcodes, with
//! the historically ambiguous ones selected through [`Quirks`]. [`Scheduler`] runs
//! it against wall-clock time for any [`Host`]; `ChipState` also implements
//! [`chip8_base::Interpreter`] so it can be handed straight to `chip8_base::run`.

pub mod interpreter;
pub mod scheduler;

pub use interpreter::{Chip8Error, ChipState, Config, Fault, Framebuffer, Quirks, Status};
pub use scheduler::{Host, Scheduler};
