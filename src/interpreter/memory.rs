use super::error::Chip8Error;
use super::font::{FONT, FONT_ADDR};

pub const MEMORY_SIZE: usize = 4096;

/// Programs are loaded here and execution starts here
pub const PROGRAM_ADDR: u16 = 0x200;

pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - PROGRAM_ADDR as usize;

// NB. addresses are usize here so callers can hand over I + offset without
//     worrying about it overflowing u16 first

/// 4K of RAM, with the font baked in below the program area.
///
/// Every access is bounds checked; nothing wraps around the top of memory.
#[derive(Clone)]
pub struct Memory {
    bytes: [u8; MEMORY_SIZE],
}

impl Memory {
    pub fn new() -> Self {
        let mut bytes = [0_u8; MEMORY_SIZE];
        let font_addr = FONT_ADDR as usize;
        bytes[font_addr..font_addr + FONT.len()].copy_from_slice(&FONT);
        Memory { bytes }
    }

    /// Fresh memory with `rom` copied to 0x200
    pub fn with_program(rom: &[u8]) -> Result<Self, Chip8Error> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(Chip8Error::RomTooLarge {
                size: rom.len(),
                max: MAX_ROM_SIZE,
            });
        }
        let mut memory = Memory::new();
        let start = PROGRAM_ADDR as usize;
        memory.bytes[start..start + rom.len()].copy_from_slice(rom);
        Ok(memory)
    }

    pub fn read(&self, addr: usize) -> Result<u8, Chip8Error> {
        self.bytes
            .get(addr)
            .copied()
            .ok_or(Chip8Error::OutOfBoundsAccess { address: addr })
    }

    pub fn write(&mut self, addr: usize, value: u8) -> Result<(), Chip8Error> {
        let byte = self
            .bytes
            .get_mut(addr)
            .ok_or(Chip8Error::OutOfBoundsAccess { address: addr })?;
        *byte = value;
        Ok(())
    }

    /// `len` bytes starting at `addr`; the whole range must be in memory
    pub fn slice(&self, addr: usize, len: usize) -> Result<&[u8], Chip8Error> {
        let end = Self::end_of(addr, len)?;
        Ok(&self.bytes[addr..end])
    }

    pub fn slice_mut(&mut self, addr: usize, len: usize) -> Result<&mut [u8], Chip8Error> {
        let end = Self::end_of(addr, len)?;
        Ok(&mut self.bytes[addr..end])
    }

    /// Big-endian instruction word at `addr`
    pub fn word(&self, addr: usize) -> Result<u16, Chip8Error> {
        let bytes = self.slice(addr, 2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn end_of(addr: usize, len: usize) -> Result<usize, Chip8Error> {
        let end = addr + len;
        if end > MEMORY_SIZE {
            // report the first byte that doesn't exist
            return Err(Chip8Error::OutOfBoundsAccess {
                address: addr.max(MEMORY_SIZE),
            });
        }
        Ok(end)
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn memory_zeroed_outside_font() {
        let m = Memory::new();
        assert_eq!(m.bytes[..0x50], [0; 0x50]);
        assert_eq!(m.bytes[0x200..], [0; 0xe00]);
    }

    #[test]
    fn font_is_resident() {
        let m = Memory::new();
        assert_eq!(m.slice(0x50, 5).unwrap(), &[0xF0, 0x90, 0x90, 0x90, 0xF0]);
        assert_eq!(m.slice(0x9B, 5).unwrap(), &[0xF0, 0x80, 0xF0, 0x80, 0x80]);
    }

    #[test]
    fn program_load_ok() {
        let m = Memory::with_program(&[0x00, 0xE0]).unwrap();
        assert_eq!(m.word(0x200).unwrap(), 0x00E0);
    }

    #[test]
    fn largest_rom_fits() {
        let rom = vec![0xAB; MAX_ROM_SIZE];
        let m = Memory::with_program(&rom).unwrap();
        assert_eq!(m.read(0xFFF).unwrap(), 0xAB);
    }

    #[test]
    fn rom_too_large() {
        let rom = vec![0; MAX_ROM_SIZE + 1];
        assert_eq!(
            Memory::with_program(&rom).err(),
            Some(Chip8Error::RomTooLarge {
                size: 3585,
                max: 3584
            })
        );
    }

    #[test]
    fn read_past_end() {
        let m = Memory::new();
        assert_eq!(
            m.read(0x1000),
            Err(Chip8Error::OutOfBoundsAccess { address: 0x1000 })
        );
    }

    #[test]
    fn word_straddling_end() {
        let m = Memory::new();
        assert_eq!(
            m.word(0xFFF),
            Err(Chip8Error::OutOfBoundsAccess { address: 0x1000 })
        );
    }

    #[test]
    fn write_then_read() {
        let mut m = Memory::new();
        m.write(0x300, 0x42).unwrap();
        assert_eq!(m.read(0x300), Ok(0x42));
        assert!(m.write(0x1000, 0x42).is_err());
    }

    #[test]
    fn slice_mut_writes_through() {
        let mut m = Memory::new();
        m.slice_mut(0x400, 3).unwrap().copy_from_slice(&[1, 2, 3]);
        assert_eq!(m.slice(0x400, 3).unwrap(), &[1, 2, 3]);
        assert!(m.slice_mut(0xFFE, 3).is_err());
    }

    #[quickcheck]
    fn load_rom_copies_verbatim(rom: Vec<u8>) -> bool {
        let rom: Vec<u8> = rom.into_iter().take(MAX_ROM_SIZE).collect();
        let m = Memory::with_program(&rom).unwrap();
        m.slice(0x200, rom.len()).unwrap() == rom.as_slice()
    }
}
