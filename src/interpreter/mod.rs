pub mod config;
pub mod decode;
pub mod error;
mod execute;
pub mod font;
pub mod memory;

use chip8_base::{Display, Interpreter, Keys, Pixel};
use log::{debug, error, trace};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::time::Duration;

pub use config::{Config, Quirks, FRAME_RATE};
pub use decode::Instruction;
pub use error::{Chip8Error, Fault};
pub use memory::{Memory, MAX_ROM_SIZE, PROGRAM_ADDR};

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;
pub const STACK_DEPTH: usize = 16;

/// Monochrome framebuffer, indexed as [y][x]
pub type Framebuffer = [[bool; DISPLAY_WIDTH]; DISPLAY_HEIGHT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Nothing loaded yet
    Idle,
    Running,
    /// Stopped by a fatal error; only a fresh ROM load clears this
    Halted(Fault),
}

/// The whole machine: memory, registers, stack, timers, display and keypad.
///
/// One instance owns everything for one loaded program. The random source used
/// by CXNN is injected so runs can be replayed.
pub struct ChipState<R = StdRng> {
    memory: Memory,
    program_counter: u16,
    stack: Vec<u16>,
    registers: [u8; 16],
    index_register: u16,
    delay_timer: u8,
    sound_timer: u8,
    display: Framebuffer,
    frame_ready: bool,
    keys: Keys,
    config: Config,
    rng: R,
    status: Status,
}

impl ChipState<StdRng> {
    pub fn new(config: Config) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: RngCore> ChipState<R> {
    pub fn with_rng(config: Config, rng: R) -> Self {
        ChipState {
            memory: Memory::new(),
            program_counter: PROGRAM_ADDR,
            stack: Vec::with_capacity(STACK_DEPTH),
            registers: [0; 16],
            index_register: 0,
            delay_timer: 0,
            sound_timer: 0,
            display: [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
            frame_ready: false,
            keys: [false; 16],
            config,
            rng,
            status: Status::Idle,
        }
    }

    /// Reset the machine and copy `rom` to 0x200.
    ///
    /// An oversized ROM is rejected and leaves the current state untouched.
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<&mut Self, Chip8Error> {
        let memory = Memory::with_program(rom)?;

        self.memory = memory;
        self.program_counter = PROGRAM_ADDR;
        self.stack.clear();
        self.registers = [0; 16];
        self.index_register = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.display = [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
        self.frame_ready = true;
        self.status = Status::Running;
        debug!("loaded {} byte ROM at {:#05X}", rom.len(), PROGRAM_ADDR);
        Ok(self)
    }

    pub fn set_key(&mut self, key: u8, pressed: bool) {
        if let Some(k) = self.keys.get_mut(key as usize) {
            *k = pressed;
        }
    }

    pub fn set_keys(&mut self, keys: Keys) {
        self.keys = keys;
    }

    /// Fetch, decode and execute a single instruction.
    ///
    /// Does nothing while idle. Once halted, keeps returning the fault that
    /// stopped the machine.
    pub fn step_instruction(&mut self) -> Result<(), Fault> {
        match self.status {
            Status::Idle => return Ok(()),
            Status::Halted(fault) => return Err(fault),
            Status::Running => {}
        }

        let pc = self.program_counter;
        if let Err(error) = self.fetch().and_then(|ins| self.execute(ins)) {
            let fault = Fault { pc, error };
            error!("halted: {}", fault);
            self.status = Status::Halted(fault);
            return Err(fault);
        }
        Ok(())
    }

    /// One 60Hz tick: count the timers down, then run a batch of instructions.
    ///
    /// The batch is never interrupted part way except by a fault.
    pub fn frame(&mut self) -> Result<(), Fault> {
        if let Status::Halted(fault) = self.status {
            return Err(fault);
        }

        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);

        for _ in 0..self.config.instructions_per_frame() {
            self.step_instruction()?;
        }
        Ok(())
    }

    fn fetch(&mut self) -> Result<Instruction, Chip8Error> {
        let word = self.memory.word(self.program_counter as usize)?;
        trace!("{:#05X}: {:04X}", self.program_counter, word);
        self.program_counter += 2;
        Ok(Instruction::from(word))
    }

    /// Whether the framebuffer changed since the last call
    pub fn take_frame_ready(&mut self) -> bool {
        std::mem::take(&mut self.frame_ready)
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.display
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.display[y % DISPLAY_HEIGHT][x % DISPLAY_WIDTH]
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn sound_on(&self) -> bool {
        self.sound_timer > 0
    }

    pub fn registers(&self) -> &[u8; 16] {
        &self.registers
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub fn index_register(&self) -> u16 {
        self.index_register
    }

    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn keys(&self) -> &Keys {
        &self.keys
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.status, Status::Halted(_))
    }

    fn to_display(&self) -> Display {
        let mut display = [[Pixel::default(); DISPLAY_WIDTH]; DISPLAY_HEIGHT];
        for (row, pixels) in display.iter_mut().zip(self.display.iter()) {
            for (pixel, &on) in row.iter_mut().zip(pixels.iter()) {
                *pixel = Pixel::try_from(on as u8).unwrap_or_default();
            }
        }
        display
    }
}

impl<R: RngCore> Interpreter for ChipState<R> {
    /// Driven once per frame by the window
    fn step(&mut self, keys: &Keys) -> Option<Display> {
        if self.is_halted() {
            return None;
        }
        self.set_keys(*keys);
        // the fault is logged where it happens; the window just stops updating
        self.frame().ok()?;
        if self.take_frame_ready() {
            Some(self.to_display())
        } else {
            None
        }
    }

    fn speed(&self) -> Duration {
        Duration::from_secs_f64(1_f64 / FRAME_RATE as f64)
    }

    fn buzzer_active(&self) -> bool {
        self.sound_on()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;
    use rand::rngs::mock::StepRng;

    fn chip(rom: &[u8]) -> ChipState<StepRng> {
        let mut chip = ChipState::with_rng(Config::default(), StepRng::new(0, 1));
        chip.load_rom(rom).unwrap();
        chip
    }

    #[test]
    fn add_scenario() {
        let mut chip = chip(&[0x60, 0x0A, 0x61, 0x05, 0x80, 0x14]);
        for _ in 0..3 {
            chip.step_instruction().unwrap();
        }
        assert_eq!(chip.registers()[0x0], 15);
        assert_eq!(chip.registers()[0xF], 0);
        assert_eq!(chip.program_counter(), 0x206);
    }

    #[test]
    fn font_glyph_scenario() {
        let mut chip = chip(&[0xA0, 0x50, 0xF0, 0x29]);
        chip.step_instruction().unwrap();
        chip.step_instruction().unwrap();
        assert_eq!(chip.index_register(), 0x050);
    }

    #[test]
    fn call_then_return_scenario() {
        let mut chip = chip(&[0x22, 0x00]);
        chip.step_instruction().unwrap();
        assert_eq!(chip.stack(), &[0x202]);
        assert_eq!(chip.program_counter(), 0x200);

        chip.memory.slice_mut(0x200, 2).unwrap().copy_from_slice(&[0x00, 0xEE]);
        chip.step_instruction().unwrap();
        assert!(chip.stack().is_empty());
        assert_eq!(chip.program_counter(), 0x202);
    }

    #[test]
    fn new_engines_are_independent() {
        let mut a = chip(&[0x60, 0x01]);
        let b = chip(&[0x60, 0x02]);
        a.step_instruction().unwrap();
        assert_eq!(a.registers()[0], 1);
        assert_eq!(b.registers()[0], 0);
    }

    #[test]
    fn idle_engine_does_nothing() {
        let mut chip = ChipState::with_rng(Config::default(), StepRng::new(0, 1));
        assert_eq!(chip.status(), Status::Idle);
        chip.step_instruction().unwrap();
        assert_eq!(chip.program_counter(), 0x200);
    }

    #[test]
    fn oversized_rom_keeps_prior_state() {
        let mut chip = chip(&[0x60, 0x2A]);
        chip.step_instruction().unwrap();

        let err = chip.load_rom(&vec![0; MAX_ROM_SIZE + 1]).err();
        assert_eq!(
            err,
            Some(Chip8Error::RomTooLarge {
                size: MAX_ROM_SIZE + 1,
                max: MAX_ROM_SIZE
            })
        );
        assert_eq!(chip.registers()[0], 0x2A);
        assert_eq!(chip.program_counter(), 0x202);
        assert_eq!(chip.status(), Status::Running);
    }

    #[test]
    fn reload_resets_state() {
        let mut chip = chip(&[0x60, 0x2A, 0x22, 0x00]);
        chip.step_instruction().unwrap();
        chip.step_instruction().unwrap();
        chip.load_rom(&[0x00, 0xE0]).unwrap();
        assert_eq!(chip.registers(), &[0; 16]);
        assert!(chip.stack().is_empty());
        assert_eq!(chip.program_counter(), 0x200);
        assert_eq!(chip.memory().read(0x202), Ok(0));
    }

    #[test]
    fn halt_reports_faulting_pc_and_sticks() {
        // 0x200: CALL 0x204, 0x204: RET, RET
        let mut chip = chip(&[0x22, 0x04, 0x00, 0x00, 0x00, 0xEE, 0x00, 0xEE]);
        chip.step_instruction().unwrap();
        chip.step_instruction().unwrap();
        assert_eq!(chip.program_counter(), 0x202);
        chip.memory.slice_mut(0x202, 2).unwrap().copy_from_slice(&[0x00, 0xEE]);

        let fault = Fault {
            pc: 0x202,
            error: Chip8Error::StackUnderflow,
        };
        assert_eq!(chip.step_instruction(), Err(fault));
        assert_eq!(chip.status(), Status::Halted(fault));
        assert_eq!(chip.step_instruction(), Err(fault));
        assert_eq!(chip.frame(), Err(fault));
        assert_eq!(chip.program_counter(), 0x204);
    }

    #[test]
    fn fetch_off_the_end_of_memory() {
        let mut chip = chip(&[0x1F, 0xFF]);
        chip.step_instruction().unwrap();
        assert_eq!(
            chip.step_instruction(),
            Err(Fault {
                pc: 0xFFF,
                error: Chip8Error::OutOfBoundsAccess { address: 0x1000 }
            })
        );
    }

    #[test]
    fn frame_runs_one_batch() {
        // 7001 in a loop: ADD V0, 1; JP 0x200
        let mut chip = chip(&[0x70, 0x01, 0x12, 0x00]);
        chip.frame().unwrap();
        // 11 instructions: six adds, five jumps
        assert_eq!(chip.registers()[0], 6);
    }

    #[test]
    fn frame_counts_timers_down() {
        // LD V0, 3; LD DT, V0; LD ST, V0; JP 0x206
        let mut chip = chip(&[0x60, 0x03, 0xF0, 0x15, 0xF0, 0x18, 0x12, 0x06]);
        chip.frame().unwrap();
        assert_eq!(chip.delay_timer(), 3);
        assert!(chip.sound_on());
        chip.frame().unwrap();
        chip.frame().unwrap();
        assert_eq!(chip.delay_timer(), 1);
        chip.frame().unwrap();
        assert_eq!(chip.delay_timer(), 0);
        assert_eq!(chip.sound_timer(), 0);
        assert!(!chip.sound_on());
    }

    #[quickcheck]
    fn timers_never_go_below_zero(start: u8, ticks: u16) -> bool {
        // LD V0, start; LD DT, V0; LD ST, V0; JP 0x206
        let mut chip = chip(&[0x60, start, 0xF0, 0x15, 0xF0, 0x18, 0x12, 0x06]);
        let ticks = ticks % 400 + 1;
        for _ in 0..ticks {
            chip.frame().unwrap();
        }
        // the first tick decrements before the program has set the timers
        let expected = start.saturating_sub((ticks - 1).min(255) as u8);
        chip.delay_timer() == expected && chip.sound_timer() == expected
    }

    #[test]
    fn wait_for_key_blocks_across_frames() {
        let mut chip = chip(&[0xF3, 0x0A]);
        for _ in 0..5 {
            chip.frame().unwrap();
        }
        assert_eq!(chip.program_counter(), 0x200);

        chip.set_key(0x7, true);
        chip.step_instruction().unwrap();
        assert_eq!(chip.program_counter(), 0x202);
        assert_eq!(chip.registers()[0x3], 0x7);
    }

    #[test]
    fn set_key_ignores_out_of_range() {
        let mut chip = chip(&[]);
        chip.set_key(0x10, true);
        assert_eq!(chip.keys(), &[false; 16]);
        chip.set_key(0xF, true);
        assert!(chip.keys()[0xF]);
    }

    #[test]
    fn frame_ready_after_draw() {
        // LD I, font 0; DRW V0, V0, 5
        let mut chip = chip(&[0xA0, 0x50, 0xD0, 0x05]);
        assert!(chip.take_frame_ready());
        assert!(!chip.take_frame_ready());
        chip.step_instruction().unwrap();
        assert!(!chip.take_frame_ready());
        chip.step_instruction().unwrap();
        assert!(chip.take_frame_ready());
        assert!(chip.pixel(0, 0));
    }

    #[test]
    fn interpreter_step_returns_display_on_change() {
        let mut chip = chip(&[0xA0, 0x50, 0xD0, 0x05, 0x12, 0x04]);
        chip.take_frame_ready();
        let keys = [false; 16];
        assert!(Interpreter::step(&mut chip, &keys).is_some());
        assert!(Interpreter::step(&mut chip, &keys).is_none());
        assert_eq!(chip.speed(), Duration::from_secs_f64(1_f64 / 60_f64));
        assert!(!chip.buzzer_active());
    }

    #[test]
    fn interpreter_step_stops_after_fault() {
        let mut chip = chip(&[0x00, 0xEE]);
        let keys = [false; 16];
        assert!(Interpreter::step(&mut chip, &keys).is_none());
        assert!(chip.is_halted());
        assert!(Interpreter::step(&mut chip, &keys).is_none());
    }

    #[test]
    fn seeded_engines_agree() {
        let config = Config {
            seed: Some(8),
            ..Config::default()
        };
        let rom = [0xC0, 0xFF, 0xC1, 0xFF, 0xC2, 0xFF];
        let mut a = ChipState::new(config);
        let mut b = ChipState::new(config);
        a.load_rom(&rom).unwrap();
        b.load_rom(&rom).unwrap();
        for _ in 0..3 {
            a.step_instruction().unwrap();
            b.step_instruction().unwrap();
        }
        assert_eq!(a.registers(), b.registers());
    }
}
