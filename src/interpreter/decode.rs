/// A fetched instruction word split into its fixed bit-fields.
///
/// ```text
///  15..12  11..8  7..4  3..0
///    C       X     Y     N
///                 \___NN___/
///          \______NNN______/
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u16,
    /// category
    pub c: u8,
    pub x: usize,
    pub y: usize,
    pub n: u8,
    pub nn: u8,
    pub nnn: u16,
}

impl Instruction {
    pub fn decode(msb: u8, lsb: u8) -> Self {
        Instruction {
            opcode: u16::from_be_bytes([msb, lsb]),
            c: msb >> 4,
            x: (msb & 0xF) as usize,
            y: (lsb >> 4) as usize,
            n: lsb & 0xF,
            nn: lsb,
            nnn: ((msb as u16 & 0xF) << 8) | lsb as u16,
        }
    }

    // Break into 4 nibbles for matching
    pub fn nibbles(&self) -> (u8, u8, u8, u8) {
        (self.c, self.x as u8, self.y as u8, self.n)
    }
}

impl From<u16> for Instruction {
    fn from(word: u16) -> Self {
        let [msb, lsb] = word.to_be_bytes();
        Instruction::decode(msb, lsb)
    }
}
