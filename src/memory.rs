use crate::error::{Error, Result};
use std::io;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// Represents the flat address space the machine executes out of.
pub trait MemoryMap {
    /// write a chunk of bytes into "RAM"; panics if it runs off the end
    fn write(&mut self, data: &[u8], addr: u16) {
        self.get_rw_slice(addr, data.len()).copy_from_slice(data);
    }

    /// single byte; the address wraps at 12 bits
    fn get_byte(&self, addr: u16) -> u8 {
        self.get_ro_slice(addr & ADDR_MASK, 1)[0]
    }

    /// single byte; the address wraps at 12 bits
    fn set_byte(&mut self, addr: u16, value: u8) {
        self.get_rw_slice(addr & ADDR_MASK, 1)[0] = value;
    }

    /// get a big-endian two-byte word (instructions, stack)
    fn get_word(&self, addr: u16) -> u16 {
        ((self.get_byte(addr) as u16) << 8) | (self.get_byte(addr.wrapping_add(1)) as u16)
    }

    /// store a big-endian two-byte word
    fn set_word(&mut self, addr: u16, word: u16) {
        self.set_byte(addr, (word >> 8) as u8);
        self.set_byte(addr.wrapping_add(1), word as u8);
    }

    /// get a r/w slice of the underlying memory (heap)
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8];

    /// get a r/o slice of the underlying memory (heap)
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8];
}

/// Defines the 4K memory map
///   0x0000-0x004f  hex digit font
///   0x0050-0x01ff  reserved (interpreter)
///   0x0200-0x0e9f  program
///   0x0ea0-0x0eff  call stack
///   0x0f00-0x0fff  display
///
/// the display is not a copy: it is the last page of this same buffer
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
    pub program_addr: u16,
    pub stack_addr: u16,
    pub display_addr: u16,
    pub font_addr: u16,
}

impl MemoryMap for Chip8MemoryMap {
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8] {
        let a = addr as usize;
        &mut self.bytes[a..(a + len)]
    }
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8] {
        let a = addr as usize;
        &self.bytes[a..(a + len)]
    }
}

/// how much RAM we have
pub const RAM_SIZE_BYTES: usize = 4096;

/// 12-bit address space
pub const ADDR_MASK: u16 = 0x0fff;

/// where the program is loaded
pub const PROGRAM_ADDR: u16 = 0x0200;

/// base of the call stack; SP is a byte offset from here
pub const STACK_ADDR: u16 = 0x0ea0;

/// framebuffer page
pub const DISPLAY_ADDR: u16 = 0x0f00;
pub const DISPLAY_SIZE_BYTES: usize = 0x100;

/// programs must end before the stack
pub const MAX_PROGRAM_BYTES: usize = (STACK_ADDR - PROGRAM_ADDR) as usize;

pub const FONT_ADDR: u16 = 0x000;
pub const FONT_GLYPH_BYTES: u16 = 5;

impl Chip8MemoryMap {
    /// zeroed RAM with the font baked into the reserved low page
    pub fn new() -> Self {
        let mut mm = Chip8MemoryMap {
            bytes: vec![0u8; RAM_SIZE_BYTES].into_boxed_slice(),
            program_addr: PROGRAM_ADDR,
            stack_addr: STACK_ADDR,
            display_addr: DISPLAY_ADDR,
            font_addr: FONT_ADDR,
        };
        mm.write(&CHIP8_CONTEMPORARY_FONT, FONT_ADDR);
        mm
    }

    /// load a program at 0x200, rejecting anything that would reach the stack
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        if buf.len() > MAX_PROGRAM_BYTES {
            return Err(Error::RomTooLarge {
                size: buf.len(),
                max: MAX_PROGRAM_BYTES,
            });
        }
        self.write(&buf, self.program_addr);
        Ok(buf.len())
    }

    /// address of the glyph for the low nibble of `digit`
    pub fn glyph_addr(&self, digit: u8) -> u16 {
        self.font_addr + (digit & 0xf) as u16 * FONT_GLYPH_BYTES
    }

    /// the framebuffer view over the display page
    pub fn display(&self) -> &[u8] {
        self.get_ro_slice(self.display_addr, DISPLAY_SIZE_BYTES)
    }

    pub fn display_mut(&mut self) -> &mut [u8] {
        let addr = self.display_addr;
        self.get_rw_slice(addr, DISPLAY_SIZE_BYTES)
    }
}

impl Default for Chip8MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

#[rustfmt::skip]
const CHIP8_CONTEMPORARY_FONT: [u8; 80] = [
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_zeroed() {
        let m = Chip8MemoryMap::new();
        // NB. memory is zeroed from 0x200 because before that we bake in the font
        assert_eq!(m.bytes[0x200..], [0; 0xe00]);
        assert_eq!(m.bytes[0x50..0x200], [0; 0x1b0]);
    }

    #[test]
    fn test_font_baked_in() {
        let m = Chip8MemoryMap::new();
        assert_eq!(m.get_ro_slice(m.glyph_addr(0x0), 5), &[0xf0, 0x90, 0x90, 0x90, 0xf0]);
        assert_eq!(m.glyph_addr(0xa), 0x32);
        // only the low nibble picks a glyph
        assert_eq!(m.glyph_addr(0x1f), m.glyph_addr(0xf));
    }

    #[test]
    fn test_read_word() {
        let mut m = Chip8MemoryMap::new();
        m.write(&[0, 1, 2, 3, 4, 5, 6, 7], 0x300);
        assert_eq!(m.get_word(0x304), 0x0405);
    }

    #[test]
    fn test_word_round_trips_and_wraps() {
        let mut m = Chip8MemoryMap::new();
        m.set_word(0xeA2, 0x0abc);
        assert_eq!(m.get_ro_slice(0xea2, 2), &[0x0a, 0xbc]);
        assert_eq!(m.get_word(0xea2), 0x0abc);

        // last cell then first cell
        m.set_word(0xfff, 0x1234);
        assert_eq!(m.get_byte(0xfff), 0x12);
        assert_eq!(m.get_byte(0x000), 0x34);
    }

    #[test]
    fn test_byte_address_wraps_at_12_bits() {
        let mut m = Chip8MemoryMap::new();
        m.set_byte(0x1300, 0xaa);
        assert_eq!(m.get_byte(0x0300), 0xaa);
    }

    #[test]
    #[should_panic]
    fn test_write_too_much_panic() {
        let mut dst = Chip8MemoryMap::new();
        dst.write(&[0; 8], 4089);
    }

    #[test]
    fn test_program_load_ok() -> Result<()> {
        let mut dst = Chip8MemoryMap::new();
        let mut prog: &[u8] = &[0x00, 0xe0]; // clear screen
        assert_eq!(dst.load_program(&mut prog)?, 2);
        assert_eq!(dst.get_ro_slice(0x200, 2), &[0x00, 0xe0]);
        Ok(())
    }

    #[test]
    fn test_program_load_fills_to_stack() -> Result<()> {
        let mut dst = Chip8MemoryMap::new();
        let rom = vec![0xee; MAX_PROGRAM_BYTES];
        dst.load_program(&mut rom.as_slice())?;
        assert_eq!(dst.get_byte(STACK_ADDR - 1), 0xee);
        assert_eq!(dst.get_byte(STACK_ADDR), 0x00);
        Ok(())
    }

    #[test]
    fn test_program_load_rejects_oversized() {
        let mut dst = Chip8MemoryMap::new();
        let rom = vec![0xee; MAX_PROGRAM_BYTES + 1];
        match dst.load_program(&mut rom.as_slice()) {
            Err(Error::RomTooLarge { size, max }) => {
                assert_eq!(size, 0xca1);
                assert_eq!(max, 0xca0);
            }
            other => panic!("expected RomTooLarge, got {:?}", other),
        }
        // nothing was written
        assert_eq!(dst.get_byte(0x200), 0x00);
    }

    #[test]
    fn test_display_aliases_memory() {
        let mut m = Chip8MemoryMap::new();
        m.display_mut()[0x10] = 0xa5;
        assert_eq!(m.get_byte(0xf10), 0xa5);
        m.set_byte(0xfff, 0x3c);
        assert_eq!(m.display()[0xff], 0x3c);
        assert_eq!(m.display().len(), 256);
    }

    #[test]
    fn test_mem_layout() {
        let m = Chip8MemoryMap::new();
        assert_eq!(m.program_addr, 0x0200);
        assert_eq!(m.stack_addr, 0x0ea0);
        assert_eq!(m.display_addr, 0x0f00);
        assert_eq!(m.font_addr, 0x0000);
    }
}
