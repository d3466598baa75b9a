//! # instruction
//!
//! Every instruction is one big-endian 16 bit word. The top nibble picks the
//! class; the rest are operand fields:
//!
//! ```text
//!   c x y n     c   class                 (high byte, high nibble)
//!               x   register Vx           (high byte, low nibble)
//!               y   register Vy           (low byte, high nibble)
//!               n   4 bit immediate       (low byte, low nibble)
//!               kk  8 bit immediate       (low byte)
//!               nnn 12 bit address        (x, y and n together)
//! ```
//!
//! Decoding happens once per cycle into a closed [`Operation`]; the machine and
//! the disassembler both match on it, so they can't disagree about encoding.
use std::fmt;

/// raw operand fields of one fetched word
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub word: u16,
}

impl Instruction {
    pub fn new(hi: u8, lo: u8) -> Self {
        Instruction {
            word: ((hi as u16) << 8) | lo as u16,
        }
    }

    pub fn class(&self) -> u8 {
        (self.word >> 12) as u8
    }

    pub fn x(&self) -> u8 {
        ((self.word >> 8) & 0xf) as u8
    }

    pub fn y(&self) -> u8 {
        ((self.word >> 4) & 0xf) as u8
    }

    pub fn n(&self) -> u8 {
        (self.word & 0xf) as u8
    }

    pub fn kk(&self) -> u8 {
        (self.word & 0xff) as u8
    }

    pub fn nnn(&self) -> u16 {
        self.word & 0x0fff
    }
}

impl From<u16> for Instruction {
    fn from(word: u16) -> Self {
        Instruction { word }
    }
}

/// One variant per behaviour. Register operands are indices 0..16, addresses
/// are 12 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// 00E0
    Cls,
    /// 00EE
    Ret,
    /// 0nnn, native code on the original hardware; never executed
    Sys(u16),
    /// 1nnn
    Jp(u16),
    /// 2nnn
    Call(u16),
    /// 3xkk
    SeImm(u8, u8),
    /// 4xkk
    SneImm(u8, u8),
    /// 5xy_
    SeReg(u8, u8),
    /// 6xkk
    LdImm(u8, u8),
    /// 7xkk
    AddImm(u8, u8),
    /// 8xy0
    LdReg(u8, u8),
    /// 8xy1
    Or(u8, u8),
    /// 8xy2
    And(u8, u8),
    /// 8xy3
    Xor(u8, u8),
    /// 8xy4
    AddReg(u8, u8),
    /// 8xy5
    Sub(u8, u8),
    /// 8xy6
    Shr(u8, u8),
    /// 8xy7
    Subn(u8, u8),
    /// 8xyE
    Shl(u8, u8),
    /// 9xy_
    SneReg(u8, u8),
    /// Annn
    LdI(u16),
    /// Bnnn
    JpV0(u16),
    /// Cxkk
    Rnd(u8, u8),
    /// Dxyn
    Drw(u8, u8, u8),
    /// Ex9E
    Skp(u8),
    /// ExA1
    Sknp(u8),
    /// Fx07
    LdVxDt(u8),
    /// Fx0A
    LdVxK(u8),
    /// Fx15
    LdDtVx(u8),
    /// Fx18
    LdStVx(u8),
    /// Fx1E
    AddIVx(u8),
    /// Fx29
    LdFVx(u8),
    /// Fx33
    LdBVx(u8),
    /// Fx55
    LdMemVx(u8),
    /// Fx65
    LdVxMem(u8),
    /// anything else
    Unknown(u16),
}

impl Operation {
    pub fn decode(ins: Instruction) -> Operation {
        let (x, y) = (ins.x(), ins.y());
        match ins.class() {
            // only the low byte picks CLS/RET, x is ignored
            0x0 => match ins.kk() {
                0xe0 => Operation::Cls,
                0xee => Operation::Ret,
                _ => Operation::Sys(ins.nnn()),
            },
            0x1 => Operation::Jp(ins.nnn()),
            0x2 => Operation::Call(ins.nnn()),
            0x3 => Operation::SeImm(x, ins.kk()),
            0x4 => Operation::SneImm(x, ins.kk()),
            0x5 => Operation::SeReg(x, y),
            0x6 => Operation::LdImm(x, ins.kk()),
            0x7 => Operation::AddImm(x, ins.kk()),
            0x8 => match ins.n() {
                0x0 => Operation::LdReg(x, y),
                0x1 => Operation::Or(x, y),
                0x2 => Operation::And(x, y),
                0x3 => Operation::Xor(x, y),
                0x4 => Operation::AddReg(x, y),
                0x5 => Operation::Sub(x, y),
                0x6 => Operation::Shr(x, y),
                0x7 => Operation::Subn(x, y),
                0xe => Operation::Shl(x, y),
                _ => Operation::Unknown(ins.word),
            },
            0x9 => Operation::SneReg(x, y),
            0xa => Operation::LdI(ins.nnn()),
            0xb => Operation::JpV0(ins.nnn()),
            0xc => Operation::Rnd(x, ins.kk()),
            0xd => Operation::Drw(x, y, ins.n()),
            0xe => match ins.kk() {
                0x9e => Operation::Skp(x),
                0xa1 => Operation::Sknp(x),
                _ => Operation::Unknown(ins.word),
            },
            0xf => match ins.kk() {
                0x07 => Operation::LdVxDt(x),
                0x0a => Operation::LdVxK(x),
                0x15 => Operation::LdDtVx(x),
                0x18 => Operation::LdStVx(x),
                0x1e => Operation::AddIVx(x),
                0x29 => Operation::LdFVx(x),
                0x33 => Operation::LdBVx(x),
                0x55 => Operation::LdMemVx(x),
                0x65 => Operation::LdVxMem(x),
                _ => Operation::Unknown(ins.word),
            },
            // class is a nibble, so this is unreachable in practice
            _ => Operation::Unknown(ins.word),
        }
    }
}

impl From<u16> for Operation {
    fn from(word: u16) -> Self {
        Operation::decode(Instruction::from(word))
    }
}

/// classic mnemonics
impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Operation::Cls => write!(f, "CLS"),
            Operation::Ret => write!(f, "RET"),
            Operation::Sys(a) => write!(f, "SYS {:03x}", a),
            Operation::Jp(a) => write!(f, "JP {:03x}", a),
            Operation::Call(a) => write!(f, "CALL {:03x}", a),
            Operation::SeImm(x, kk) => write!(f, "SE V{:X}, {:02x}", x, kk),
            Operation::SneImm(x, kk) => write!(f, "SNE V{:X}, {:02x}", x, kk),
            Operation::SeReg(x, y) => write!(f, "SE V{:X}, V{:X}", x, y),
            Operation::LdImm(x, kk) => write!(f, "LD V{:X}, {:02x}", x, kk),
            Operation::AddImm(x, kk) => write!(f, "ADD V{:X}, {:02x}", x, kk),
            Operation::LdReg(x, y) => write!(f, "LD V{:X}, V{:X}", x, y),
            Operation::Or(x, y) => write!(f, "OR V{:X}, V{:X}", x, y),
            Operation::And(x, y) => write!(f, "AND V{:X}, V{:X}", x, y),
            Operation::Xor(x, y) => write!(f, "XOR V{:X}, V{:X}", x, y),
            Operation::AddReg(x, y) => write!(f, "ADD V{:X}, V{:X}", x, y),
            Operation::Sub(x, y) => write!(f, "SUB V{:X}, V{:X}", x, y),
            Operation::Shr(x, y) => write!(f, "SHR V{:X}, V{:X}", x, y),
            Operation::Subn(x, y) => write!(f, "SUBN V{:X}, V{:X}", x, y),
            Operation::Shl(x, y) => write!(f, "SHL V{:X}, V{:X}", x, y),
            Operation::SneReg(x, y) => write!(f, "SNE V{:X}, V{:X}", x, y),
            Operation::LdI(a) => write!(f, "LD I, {:03x}", a),
            Operation::JpV0(a) => write!(f, "JP V0, {:03x}", a),
            Operation::Rnd(x, kk) => write!(f, "RND V{:X}, {:02x}", x, kk),
            Operation::Drw(x, y, n) => write!(f, "DRW V{:X}, V{:X}, {:x}", x, y, n),
            Operation::Skp(x) => write!(f, "SKP V{:X}", x),
            Operation::Sknp(x) => write!(f, "SKNP V{:X}", x),
            Operation::LdVxDt(x) => write!(f, "LD V{:X}, DT", x),
            Operation::LdVxK(x) => write!(f, "LD V{:X}, K", x),
            Operation::LdDtVx(x) => write!(f, "LD DT, V{:X}", x),
            Operation::LdStVx(x) => write!(f, "LD ST, V{:X}", x),
            Operation::AddIVx(x) => write!(f, "ADD I, V{:X}", x),
            Operation::LdFVx(x) => write!(f, "LD F, V{:X}", x),
            Operation::LdBVx(x) => write!(f, "LD B, V{:X}", x),
            Operation::LdMemVx(x) => write!(f, "LD [I], V{:X}", x),
            Operation::LdVxMem(x) => write!(f, "LD V{:X}, [I]", x),
            Operation::Unknown(w) => write!(f, "DW {:04x}", w),
        }
    }
}

/// one line of a listing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Disassembled {
    pub addr: u16,
    pub word: u16,
    pub op: Operation,
}

impl fmt::Display for Disassembled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x} {:02x} {:02x} {}",
            self.addr,
            self.word >> 8,
            self.word & 0xff,
            self.op
        )
    }
}

/// walk a flat code buffer two bytes at a time, labelling each word with the
/// address it would have once loaded at `origin`. A trailing odd byte is dropped.
pub fn disassemble(code: &[u8], origin: u16) -> impl Iterator<Item = Disassembled> + '_ {
    code.chunks_exact(2).enumerate().map(move |(i, pair)| {
        let ins = Instruction::new(pair[0], pair[1]);
        Disassembled {
            addr: origin.wrapping_add((i * 2) as u16),
            word: ins.word,
            op: Operation::decode(ins),
        }
    })
}
