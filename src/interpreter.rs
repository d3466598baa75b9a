//! # interpreter
//!
//! Architectural state and the fetch/decode/dispatch cycle. One call to
//! [`Machine::step`] runs at most one instruction; everything else (timers,
//! key scanning, drawing the screen, pacing) is driven from outside.
//!
//! State:
//!  - 4K of memory; the last page (0xf00-0xfff) *is* the framebuffer
//!  - V0..VF 8 bit registers, VF doubles as the carry/borrow/collision flag
//!  - I, a 12 bit address register kept in a u16
//!  - PC, starting at 0x200
//!  - SP, a byte offset into the stack page at 0xea0; each slot is a 2 byte word
//!  - DT and ST, which only change when an instruction or the host writes them
//!  - K and K_prev, the current key snapshot and the one taken when a key wait began
use crate::error::Result;
use crate::instruction::{Instruction, Operation};
use crate::memory::{self, Chip8MemoryMap, MemoryMap, ADDR_MASK};
use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;
pub const DISPLAY_ROW_BYTES: usize = DISPLAY_WIDTH / 8;

const FLAG: usize = 0xf;

/// deepest SP that still fits a whole word inside 0xea0-0xeff
const STACK_TOP_OFFSET: u8 = 0x5e;

/// how an executed instruction moves the program counter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Advance {
    /// consume this instruction
    Next,
    /// consume this one, and the next one too if the condition held
    SkipIf(bool),
    /// PC := addr
    Jump(u16),
    /// run this instruction again next cycle
    Stay,
}

pub struct Machine {
    pub memory: Chip8MemoryMap,
    pub v: [u8; 16],
    pub i: u16,
    pub pc: u16,
    pub sp: u8,
    pub dt: u8,
    pub st: u8,
    pub keys: [bool; 16],
    pub keys_prev: [bool; 16],
    pub waiting_for_key_press: bool,
    rng: StdRng,
}

impl Machine {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// deterministic RND, for tests and replays
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let memory = Chip8MemoryMap::new();
        let pc = memory.program_addr;
        Machine {
            memory,
            v: [0; 16],
            i: 0,
            pc,
            sp: 0,
            dt: 0,
            st: 0,
            keys: [false; 16],
            keys_prev: [false; 16],
            waiting_for_key_press: false,
            rng,
        }
    }

    /// load a program image at 0x200
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize> {
        let len = self.memory.load_program(reader)?;
        debug!(
            "loaded {} byte program at {:03x}",
            len, self.memory.program_addr
        );
        Ok(len)
    }

    /// the 64x32 1bpp framebuffer, row-major, 8 bytes a row
    pub fn framebuffer(&self) -> &[u8] {
        self.memory.display()
    }

    /// is the pixel at (x, y) lit
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        let byte = self.framebuffer()[y * DISPLAY_ROW_BYTES + x / 8];
        (byte >> (7 - x % 8)) & 1 == 1
    }

    /// replace the whole key snapshot
    pub fn set_keys(&mut self, keys: [bool; 16]) {
        self.keys = keys;
    }

    pub fn press(&mut self, key: u8) {
        self.keys[(key & 0xf) as usize] = true;
    }

    pub fn release(&mut self, key: u8) {
        self.keys[(key & 0xf) as usize] = false;
    }

    /// the host should be making a noise
    pub fn sound_active(&self) -> bool {
        self.st > 0
    }

    /// the instruction PC currently points at
    pub fn fetch(&self) -> Instruction {
        Instruction::from(self.memory.get_word(self.pc))
    }

    /// execute exactly one instruction and hand back what it was
    pub fn step(&mut self) -> Operation {
        if self.pc >= memory::STACK_ADDR {
            warn!("PC {:03x} is outside the program area", self.pc);
        }
        let ins = self.fetch();
        let op = Operation::decode(ins);
        trace!("{:03x} {:04x} {}", self.pc, ins.word, op);
        self.execute(op);
        op
    }

    /// run an already decoded operation as if it had been fetched at PC
    pub fn execute(&mut self, op: Operation) {
        let advance = self.dispatch(op);
        self.pc = match advance {
            Advance::Next => self.pc.wrapping_add(2),
            Advance::SkipIf(true) => self.pc.wrapping_add(4),
            Advance::SkipIf(false) => self.pc.wrapping_add(2),
            Advance::Jump(addr) => addr,
            Advance::Stay => self.pc,
        } & ADDR_MASK;
    }

    fn dispatch(&mut self, op: Operation) -> Advance {
        match op {
            Operation::Cls => {
                self.memory.display_mut().fill(0);
                Advance::Next
            }
            Operation::Ret => self.ret(),
            Operation::Jp(addr) => Advance::Jump(addr),
            Operation::Call(addr) => self.call(addr),
            Operation::SeImm(x, kk) => Advance::SkipIf(self.v[x as usize] == kk),
            Operation::SneImm(x, kk) => Advance::SkipIf(self.v[x as usize] != kk),
            Operation::SeReg(x, y) => Advance::SkipIf(self.v[x as usize] == self.v[y as usize]),
            Operation::LdImm(x, kk) => {
                self.v[x as usize] = kk;
                Advance::Next
            }
            Operation::AddImm(x, kk) => {
                self.v[x as usize] = self.v[x as usize].wrapping_add(kk);
                Advance::Next
            }
            Operation::LdReg(x, y) => {
                self.v[x as usize] = self.v[y as usize];
                Advance::Next
            }
            Operation::Or(x, y) => {
                self.v[x as usize] |= self.v[y as usize];
                Advance::Next
            }
            Operation::And(x, y) => {
                self.v[x as usize] &= self.v[y as usize];
                Advance::Next
            }
            Operation::Xor(x, y) => {
                self.v[x as usize] ^= self.v[y as usize];
                Advance::Next
            }
            Operation::AddReg(x, y) => {
                let (sum, carry) = self.v[x as usize].overflowing_add(self.v[y as usize]);
                self.set_with_flag(x, sum, carry)
            }
            Operation::Sub(x, y) => {
                let (a, b) = (self.v[x as usize], self.v[y as usize]);
                self.set_with_flag(x, a.wrapping_sub(b), a > b)
            }
            Operation::Shr(x, _) => {
                let a = self.v[x as usize];
                self.set_with_flag(x, a >> 1, a & 0x1 == 1)
            }
            Operation::Subn(x, y) => {
                let (a, b) = (self.v[x as usize], self.v[y as usize]);
                self.set_with_flag(x, b.wrapping_sub(a), b > a)
            }
            Operation::Shl(x, _) => {
                let a = self.v[x as usize];
                self.set_with_flag(x, a << 1, a & 0x80 != 0)
            }
            Operation::SneReg(x, y) => Advance::SkipIf(self.v[x as usize] != self.v[y as usize]),
            Operation::LdI(addr) => {
                self.i = addr;
                Advance::Next
            }
            Operation::JpV0(addr) => Advance::Jump(addr + self.v[0] as u16),
            Operation::Rnd(x, kk) => {
                self.v[x as usize] = self.rng.gen::<u8>() & kk;
                Advance::Next
            }
            Operation::Drw(x, y, n) => self.draw(x, y, n),
            Operation::Skp(x) => Advance::SkipIf(self.key_for(x)),
            Operation::Sknp(x) => Advance::SkipIf(!self.key_for(x)),
            Operation::LdVxDt(x) => {
                self.v[x as usize] = self.dt;
                Advance::Next
            }
            Operation::LdVxK(x) => self.wait_for_key(x),
            Operation::LdDtVx(x) => {
                self.dt = self.v[x as usize];
                Advance::Next
            }
            Operation::LdStVx(x) => {
                self.st = self.v[x as usize];
                Advance::Next
            }
            Operation::AddIVx(x) => {
                let sum = (self.i & ADDR_MASK).wrapping_add(self.v[x as usize] as u16);
                self.i = sum & ADDR_MASK;
                self.v[FLAG] = (sum > ADDR_MASK) as u8;
                Advance::Next
            }
            Operation::LdFVx(x) => {
                self.i = self.memory.glyph_addr(self.v[x as usize]);
                Advance::Next
            }
            Operation::LdBVx(x) => {
                let value = self.v[x as usize];
                self.memory.set_byte(self.i, value / 100);
                self.memory.set_byte(self.i.wrapping_add(1), (value / 10) % 10);
                self.memory.set_byte(self.i.wrapping_add(2), value % 10);
                Advance::Next
            }
            Operation::LdMemVx(x) => {
                for r in 0..=x as usize {
                    self.memory.set_byte(self.i.wrapping_add(r as u16), self.v[r]);
                }
                Advance::Next
            }
            Operation::LdVxMem(x) => {
                for r in 0..=x as usize {
                    self.v[r] = self.memory.get_byte(self.i.wrapping_add(r as u16));
                }
                Advance::Next
            }
            Operation::Sys(_) | Operation::Unknown(_) => self.not_implemented(op),
        }
    }

    /// result first, flag last, so VF holds the flag even when x is F
    fn set_with_flag(&mut self, x: u8, value: u8, flag: bool) -> Advance {
        self.v[x as usize] = value;
        self.v[FLAG] = flag as u8;
        Advance::Next
    }

    fn call(&mut self, addr: u16) -> Advance {
        if self.sp >= STACK_TOP_OFFSET {
            warn!("stack overflow calling {:03x} from {:03x}", addr, self.pc);
        }
        self.sp = self.sp.wrapping_add(2);
        let slot = self.memory.stack_addr.wrapping_add(self.sp as u16);
        self.memory.set_word(slot, self.pc.wrapping_add(2));
        debug!("CALL {:03x}, SP={:02x}", addr, self.sp);
        Advance::Jump(addr)
    }

    fn ret(&mut self) -> Advance {
        if self.sp == 0 {
            warn!("stack underflow returning from {:03x}", self.pc);
        }
        let slot = self.memory.stack_addr.wrapping_add(self.sp as u16);
        let addr = self.memory.get_word(slot);
        self.sp = self.sp.wrapping_sub(2);
        debug!("RET to {:03x}, SP={:02x}", addr, self.sp);
        Advance::Jump(addr)
    }

    fn key_for(&self, x: u8) -> bool {
        self.keys[(self.v[x as usize] & 0xf) as usize]
    }

    /// Fx0A spans cycles: the first pass snapshots K and stalls, later passes
    /// stall until some key differs from the snapshot
    fn wait_for_key(&mut self, x: u8) -> Advance {
        if !self.waiting_for_key_press {
            self.keys_prev = self.keys;
            self.waiting_for_key_press = true;
            debug!("waiting for key into V{:X}", x);
            return Advance::Stay;
        }
        let changed = self
            .keys
            .iter()
            .zip(self.keys_prev.iter())
            .position(|(now, then)| now != then);
        match changed {
            Some(key) => {
                self.v[x as usize] = key as u8;
                self.waiting_for_key_press = false;
                debug!("key {:x} into V{:X}", key, x);
                Advance::Next
            }
            None => Advance::Stay,
        }
    }

    /// XOR an 8 pixel wide, n row sprite from [I] onto the screen at (Vx, Vy).
    /// Pixels falling off an edge wrap round to the other side.
    fn draw(&mut self, x: u8, y: u8, n: u8) -> Advance {
        let ox = self.v[x as usize] as usize % DISPLAY_WIDTH;
        let oy = self.v[y as usize] as usize % DISPLAY_HEIGHT;
        let shift = ox % 8;
        let mut collision = false;
        for row in 0..n as u16 {
            let sprite = self.memory.get_byte(self.i.wrapping_add(row));
            let line = (oy + row as usize) % DISPLAY_HEIGHT;
            let left = line * DISPLAY_ROW_BYTES + ox / 8;
            let right = line * DISPLAY_ROW_BYTES + (ox / 8 + 1) % DISPLAY_ROW_BYTES;

            let fb = self.memory.display_mut();
            let hi = sprite >> shift;
            collision |= (fb[left] & hi) != 0;
            fb[left] ^= hi;
            if shift != 0 {
                let lo = sprite << (8 - shift);
                collision |= (fb[right] & lo) != 0;
                fb[right] ^= lo;
            }
        }
        self.v[FLAG] = collision as u8;
        Advance::Next
    }

    fn not_implemented(&mut self, op: Operation) -> Advance {
        // SYS calls into native code, and whatever else doesn't decode
        warn!("ignoring unimplemented instruction {} at {:03x}", op, self.pc);
        Advance::Next
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}
