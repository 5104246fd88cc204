/// Where the hex digit glyphs live in memory
pub const FONT_ADDR: u16 = 0x50;

/// Bytes per glyph
pub const GLYPH_SIZE: u16 = 5;

pub const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Address of the glyph for the low nibble of `digit`
pub fn glyph_addr(digit: u8) -> u16 {
    FONT_ADDR + (digit & 0xF) as u16 * GLYPH_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyphs_are_five_bytes_apart() {
        assert_eq!(glyph_addr(0x0), 0x50);
        assert_eq!(glyph_addr(0x1), 0x55);
        assert_eq!(glyph_addr(0xF), 0x9B);
    }

    #[test]
    fn glyph_uses_low_nibble_only() {
        assert_eq!(glyph_addr(0x3A), glyph_addr(0xA));
    }
}
