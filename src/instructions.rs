//! Static knowledge about the DCPU-16 instruction set: the opcode keywords the
//! assembler understands and the operand field codes assigned to each register
//! addressing form.
//!
//! A basic instruction word is laid out as `bbbbbbaaaaaaoooo` where `o` is the
//! opcode, `a` the first operand field and `b` the second. Non-basic
//! instructions put 0 in `o`, the extended opcode in `a` and their single
//! operand in `b`.
use super::*;
use lazy_static::lazy_static;

/// Field code selecting "next word" (literal or symbol value).
pub const FIELD_NEXT_WORD: u8 = 0x1f;
/// Field code selecting "[next word]".
pub const FIELD_NEXT_WORD_INDIRECT: u8 = 0x1e;
/// Field code for the short literal 0; literals 0..=31 are encoded as this plus the value.
pub const FIELD_SHORT_LITERAL: u8 = 0x20;
pub const SHORT_LITERAL_LIMIT: u64 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// one of the 15 two-operand instructions; holds its opcode index
    Basic(u16),
    /// a single-operand instruction from the non-basic opcode space
    Extended(u16),
    /// literal data
    Dat,
    /// set the assembly origin
    Org,
}
impl Opcode {
    pub fn from_name(name: &str) -> Option<Opcode> { OPCODES.get(name).copied() }
    pub fn name(&self) -> &'static str {
        OPCODE_NAMES
            .iter()
            .find(|(_, op)| op == self)
            .map_or("???", |(name, _)| *name)
    }
}
impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.name()) }
}

const OPCODE_NAMES: [(&str, Opcode); 18] = [
    ("set", Opcode::Basic(0x1)),
    ("add", Opcode::Basic(0x2)),
    ("sub", Opcode::Basic(0x3)),
    ("mul", Opcode::Basic(0x4)),
    ("div", Opcode::Basic(0x5)),
    ("mod", Opcode::Basic(0x6)),
    ("shl", Opcode::Basic(0x7)),
    ("shr", Opcode::Basic(0x8)),
    ("and", Opcode::Basic(0x9)),
    ("bor", Opcode::Basic(0xa)),
    ("xor", Opcode::Basic(0xb)),
    ("ife", Opcode::Basic(0xc)),
    ("ifn", Opcode::Basic(0xd)),
    ("ifg", Opcode::Basic(0xe)),
    ("ifb", Opcode::Basic(0xf)),
    ("jsr", Opcode::Extended(0x1)),
    ("dat", Opcode::Dat),
    ("org", Opcode::Org),
];

lazy_static! {
    static ref OPCODES: HashMap<&'static str, Opcode> = OPCODE_NAMES.iter().copied().collect();
    /// registers used directly, e.g. `set a, 1`
    static ref DIRECT_REGS: HashMap<&'static str, u8> = HashMap::from([
        ("a", 0x00),
        ("b", 0x01),
        ("c", 0x02),
        ("x", 0x03),
        ("y", 0x04),
        ("z", 0x05),
        ("i", 0x06),
        ("j", 0x07),
        ("sp", 0x1b),
        ("pc", 0x1c),
        ("o", 0x1d),
    ]);
    /// registers used as a pointer, e.g. `set [a], 1`; includes the stack pop/peek/push forms
    static ref INDIRECT_REGS: HashMap<&'static str, u8> = HashMap::from([
        ("a", 0x08),
        ("b", 0x09),
        ("c", 0x0a),
        ("x", 0x0b),
        ("y", 0x0c),
        ("z", 0x0d),
        ("i", 0x0e),
        ("j", 0x0f),
        ("sp+", 0x18),
        ("sp", 0x19),
        ("-sp", 0x1a),
    ]);
    /// general registers used as a base with an offset, e.g. `set [a+4], 1`
    static ref OFFSET_REGS: HashMap<&'static str, u8> = HashMap::from([
        ("a", 0x10),
        ("b", 0x11),
        ("c", 0x12),
        ("x", 0x13),
        ("y", 0x14),
        ("z", 0x15),
        ("i", 0x16),
        ("j", 0x17),
    ]);
}

pub fn direct_register(name: &str) -> Option<u8> { DIRECT_REGS.get(name).copied() }
pub fn indirect_register(name: &str) -> Option<u8> { INDIRECT_REGS.get(name).copied() }
pub fn offset_register(name: &str) -> Option<u8> { OFFSET_REGS.get(name).copied() }

/// Build a basic instruction word from its opcode index and two operand fields.
pub fn basic_word(op: u16, a: u8, b: u8) -> u16 { op | ((a as u16) << 4) | ((b as u16) << 10) }
/// Build a non-basic instruction word from its extended opcode index and operand field.
pub fn extended_word(op: u16, a: u8) -> u16 { (op << 4) | ((a as u16) << 10) }
