use rand::{Rng, RngCore};

use super::decode::Instruction;
use super::error::Chip8Error;
use super::font;
use super::{ChipState, DISPLAY_HEIGHT, DISPLAY_WIDTH, STACK_DEPTH};

impl<R: RngCore> ChipState<R> {
    /// Runs one decoded instruction. The program counter already points past it.
    pub(super) fn execute(&mut self, ins: Instruction) -> Result<(), Chip8Error> {
        let Instruction { x, y, n, nn, nnn, .. } = ins;
        let quirks = self.config.quirks;

        match ins.nibbles() {
            // 00E0 CLS: clear display
            (0x0, 0x0, 0xE, 0x0) => {
                self.display = [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
                self.frame_ready = true;
            }
            // 00EE RET: return from subroutine
            (0x0, 0x0, 0xE, 0xE) => {
                self.program_counter = self.stack.pop().ok_or(Chip8Error::StackUnderflow)?;
            }
            // 0nnn SYS addr: native routine on the original hardware, ignored
            (0x0, ..) => {}
            // 1nnn JP addr: jump to location nnn
            (0x1, ..) => self.program_counter = nnn,
            // 2nnn CALL addr: call subroutine at nnn
            (0x2, ..) => {
                if self.stack.len() == STACK_DEPTH {
                    return Err(Chip8Error::StackOverflow);
                }
                self.stack.push(self.program_counter);
                self.program_counter = nnn;
            }
            // 3xkk SE Vx, byte: skip next instruction if Vx = kk
            (0x3, ..) => self.skip_if(self.registers[x] == nn),
            // 4xkk SNE Vx, byte: skip next instruction if Vx != kk
            (0x4, ..) => self.skip_if(self.registers[x] != nn),
            // 5xy0 SE Vx, Vy: skip next instruction if Vx = Vy
            (0x5, _, _, 0x0) => self.skip_if(self.registers[x] == self.registers[y]),
            // 6xkk LD Vx, byte: set Vx = kk
            (0x6, ..) => self.registers[x] = nn,
            // 7xkk ADD Vx, byte: set Vx = Vx + kk, VF untouched
            (0x7, ..) => self.registers[x] = self.registers[x].wrapping_add(nn),
            // 8xy0 LD Vx, Vy
            (0x8, _, _, 0x0) => self.registers[x] = self.registers[y],
            // 8xy1 OR Vx, Vy
            (0x8, _, _, 0x1) => self.registers[x] |= self.registers[y],
            // 8xy2 AND Vx, Vy
            (0x8, _, _, 0x2) => self.registers[x] &= self.registers[y],
            // 8xy3 XOR Vx, Vy
            (0x8, _, _, 0x3) => self.registers[x] ^= self.registers[y],
            // 8xy4 ADD Vx, Vy: set Vx = Vx + Vy, set VF = carry
            (0x8, _, _, 0x4) => {
                let (sum, carry) = self.registers[x].overflowing_add(self.registers[y]);
                self.registers[x] = sum;
                self.registers[0xF] = carry as u8;
            }
            // 8xy5 SUB Vx, Vy: set Vx = Vx - Vy, set VF = NOT borrow
            (0x8, _, _, 0x5) => {
                let (vx, vy) = (self.registers[x], self.registers[y]);
                self.registers[x] = vx.wrapping_sub(vy);
                self.registers[0xF] = (vx >= vy) as u8;
            }
            // 8xy6 SHR Vx {, Vy}: set Vx = Vx SHR 1, VF = the bit shifted out
            (0x8, _, _, 0x6) => {
                let value = self.shift_source(x, y);
                self.registers[x] = value >> 1;
                self.registers[0xF] = value & 0x1;
            }
            // 8xy7 SUBN Vx, Vy: set Vx = Vy - Vx, set VF = NOT borrow
            (0x8, _, _, 0x7) => {
                let (vx, vy) = (self.registers[x], self.registers[y]);
                self.registers[x] = vy.wrapping_sub(vx);
                self.registers[0xF] = (vy >= vx) as u8;
            }
            // 8xyE SHL Vx {, Vy}: set Vx = Vx SHL 1, VF = the bit shifted out
            (0x8, _, _, 0xE) => {
                let value = self.shift_source(x, y);
                self.registers[x] = value << 1;
                self.registers[0xF] = value >> 7;
            }
            // 9xy0 SNE Vx, Vy: skip next instruction if Vx != Vy
            (0x9, _, _, 0x0) => self.skip_if(self.registers[x] != self.registers[y]),
            // Annn LD I, addr
            (0xA, ..) => self.index_register = nnn,
            // Bnnn JP V0, addr (or Bxnn JP Vx, addr)
            (0xB, ..) => {
                let offset = if quirks.legacy_jump_with_vx {
                    self.registers[x]
                } else {
                    self.registers[0]
                };
                self.program_counter = nnn + offset as u16;
            }
            // Cxkk RND Vx, byte: set Vx = random byte AND kk
            (0xC, ..) => self.registers[x] = self.rng.gen::<u8>() & nn,
            // Dxyn DRW Vx, Vy, nibble
            (0xD, ..) => self.draw(x, y, n)?,
            // Ex9E SKP Vx: skip next instruction if key Vx is pressed
            (0xE, _, 0x9, 0xE) => self.skip_if(self.key_pressed(self.registers[x])),
            // ExA1 SKNP Vx: skip next instruction if key Vx is not pressed
            (0xE, _, 0xA, 0x1) => self.skip_if(!self.key_pressed(self.registers[x])),
            // Fx07 LD Vx, DT
            (0xF, _, 0x0, 0x7) => self.registers[x] = self.delay_timer,
            // Fx0A LD Vx, K: wait for a key press by running this instruction again
            (0xF, _, 0x0, 0xA) => match self.keys.iter().position(|&pressed| pressed) {
                Some(key) => self.registers[x] = key as u8,
                None => self.program_counter -= 2,
            },
            // Fx15 LD DT, Vx
            (0xF, _, 0x1, 0x5) => self.delay_timer = self.registers[x],
            // Fx18 LD ST, Vx
            (0xF, _, 0x1, 0x8) => self.sound_timer = self.registers[x],
            // Fx1E ADD I, Vx
            (0xF, _, 0x1, 0xE) => {
                let sum = self.index_register as usize + self.registers[x] as usize;
                self.index_register = u16::try_from(sum)
                    .map_err(|_| Chip8Error::OutOfBoundsAccess { address: sum })?;
                if quirks.index_overflow_flag && self.index_register >= 0x1000 {
                    self.registers[0xF] = 1;
                }
            }
            // Fx29 LD F, Vx: set I = location of sprite for digit Vx
            (0xF, _, 0x2, 0x9) => self.index_register = font::glyph_addr(self.registers[x]),
            // Fx33 LD B, Vx: BCD of Vx at I, I+1, I+2
            (0xF, _, 0x3, 0x3) => {
                let value = self.registers[x];
                self.memory
                    .slice_mut(self.index_register as usize, 3)?
                    .copy_from_slice(&[value / 100, (value / 10) % 10, value % 10]);
            }
            // Fx55 LD [I], Vx: store V0 through Vx starting at I
            (0xF, _, 0x5, 0x5) => {
                self.memory
                    .slice_mut(self.index_register as usize, x + 1)?
                    .copy_from_slice(&self.registers[..=x]);
                self.advance_index_after_transfer(x);
            }
            // Fx65 LD Vx, [I]: read V0 through Vx starting at I
            (0xF, _, 0x6, 0x5) => {
                self.registers[..=x]
                    .copy_from_slice(self.memory.slice(self.index_register as usize, x + 1)?);
                self.advance_index_after_transfer(x);
            }
            _ => return Err(Chip8Error::UnknownOpcode { opcode: ins.opcode }),
        }
        Ok(())
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.program_counter += 2;
        }
    }

    fn key_pressed(&self, key: u8) -> bool {
        self.keys.get(key as usize).copied().unwrap_or(false)
    }

    fn shift_source(&self, x: usize, y: usize) -> u8 {
        if self.config.quirks.legacy_shift {
            self.registers[y]
        } else {
            self.registers[x]
        }
    }

    fn advance_index_after_transfer(&mut self, x: usize) {
        if self.config.quirks.legacy_store_load_advances_index {
            self.index_register += x as u16 + 1;
        }
    }

    /// XOR an `height` row sprite from I onto the screen at (Vx, Vy).
    ///
    /// The start position wraps onto the screen; the sprite itself is clipped at
    /// the right and bottom edges. VF ends up 1 if any lit pixel was turned off.
    fn draw(&mut self, x: usize, y: usize, height: u8) -> Result<(), Chip8Error> {
        let left = self.registers[x] as usize % DISPLAY_WIDTH;
        let top = self.registers[y] as usize % DISPLAY_HEIGHT;
        self.registers[0xF] = 0;

        let sprite = self
            .memory
            .slice(self.index_register as usize, height as usize)?;
        for (row, bits) in sprite.iter().enumerate() {
            let pix_y = top + row;
            if pix_y >= DISPLAY_HEIGHT {
                break;
            }
            for col in 0..8 {
                let pix_x = left + col;
                if pix_x >= DISPLAY_WIDTH {
                    break;
                }
                if bits & (0x80 >> col) == 0 {
                    continue;
                }
                let pixel = &mut self.display[pix_y][pix_x];
                if *pixel {
                    // collision
                    self.registers[0xF] = 1;
                }
                *pixel = !*pixel;
            }
        }
        self.frame_ready = true;
        Ok(())
    }
}
