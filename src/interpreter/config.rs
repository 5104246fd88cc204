/// Timers and the display both run at 60Hz
pub const FRAME_RATE: u32 = 60;

pub const DEFAULT_INSTRUCTIONS_PER_SECOND: u32 = 700;

/// Historically ambiguous opcodes, resolved one way or the other.
///
/// The default is the "modern" profile most ROMs written after the 1990s expect.
/// Use [`Quirks::cosmac_vip`] for programs written against the original interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quirks {
    /// 8XY6/8XYE copy VY into VX before shifting
    pub legacy_shift: bool,
    /// BNNN behaves as BXNN and adds VX instead of V0
    pub legacy_jump_with_vx: bool,
    /// FX1E sets VF when I runs past 0xFFF
    pub index_overflow_flag: bool,
    /// FX55/FX65 leave I pointing one past the last register touched
    pub legacy_store_load_advances_index: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Quirks {
            legacy_shift: false,
            legacy_jump_with_vx: false,
            index_overflow_flag: true,
            legacy_store_load_advances_index: false,
        }
    }
}

impl Quirks {
    pub fn cosmac_vip() -> Self {
        Quirks {
            legacy_shift: true,
            legacy_jump_with_vx: false,
            index_overflow_flag: false,
            legacy_store_load_advances_index: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub quirks: Quirks,
    pub instructions_per_second: u32,
    /// Seed for CXNN; `None` draws one from the OS
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            quirks: Quirks::default(),
            instructions_per_second: DEFAULT_INSTRUCTIONS_PER_SECOND,
            seed: None,
        }
    }
}

impl Config {
    /// Size of the instruction batch run on every frame tick
    pub fn instructions_per_frame(&self) -> u32 {
        (self.instructions_per_second / FRAME_RATE).max(1)
    }
}
