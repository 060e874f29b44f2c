//! Operand encoding. Every operand of an instruction becomes a 6-bit field in
//! the instruction word, possibly followed by one extra word holding a literal
//! or a reference to a symbol whose address isn't known yet.
use super::instructions::*;
use super::parse::{Operand, Term};
use super::*;

/// A word destined for the memory image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Word {
    /// a concrete value
    Literal(u16),
    /// the (eventual) address of the named symbol
    Symbol(String),
}
impl From<&Term> for Word {
    fn from(t: &Term) -> Self {
        match t {
            Term::Number(n) => Word::Literal(low_word(*n)),
            Term::Ident(s) => Word::Symbol(s.clone()),
        }
    }
}
impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Word::Literal(u) => write!(f, "{:04x}", u),
            Word::Symbol(s) => write!(f, "<{}>", s),
        }
    }
}

/// Truncate a literal to the 16 bits the machine can hold.
pub fn low_word(n: u64) -> u16 { (n & 0xffff) as u16 }

/// The result of encoding one operand.
#[derive(Debug, PartialEq, Eq)]
pub struct Encoding {
    /// 6-bit operand field
    pub field: u8,
    /// words that follow the instruction word, in order
    pub extra: Vec<Word>,
}
impl Encoding {
    fn inline(field: u8) -> Self { Encoding { field, extra: Vec::new() } }
    fn with_word(field: u8, word: Word) -> Self {
        Encoding {
            field,
            extra: vec![word],
        }
    }
}

/// Encode an operand. Literals below 32 are packed into the field itself;
/// anything else that isn't a register form takes an extra word.
pub fn encode_operand(operand: &Operand) -> Result<Encoding, Error> {
    match operand {
        Operand::Number(n) if *n < SHORT_LITERAL_LIMIT => Ok(Encoding::inline(FIELD_SHORT_LITERAL + *n as u8)),
        Operand::Number(n) => Ok(Encoding::with_word(FIELD_NEXT_WORD, Word::Literal(low_word(*n)))),
        Operand::Ident(name) => Ok(direct_register(name).map_or_else(
            || Encoding::with_word(FIELD_NEXT_WORD, Word::Symbol(name.clone())),
            Encoding::inline,
        )),
        Operand::MemRef(inner) => encode_indirect(inner).ok_or_else(|| cannot_encode(operand)),
        Operand::Str(_) | Operand::Add(..) => Err(cannot_encode(operand)),
    }
}
fn encode_indirect(inner: &Operand) -> Option<Encoding> {
    match inner {
        Operand::Number(n) => Some(Encoding::with_word(
            FIELD_NEXT_WORD_INDIRECT,
            Word::Literal(low_word(*n)),
        )),
        Operand::Ident(name) => Some(indirect_register(name).map_or_else(
            || Encoding::with_word(FIELD_NEXT_WORD_INDIRECT, Word::Symbol(name.clone())),
            Encoding::inline,
        )),
        // exactly one side must be a general register; the other side is the offset
        Operand::Add(a, b) => match (term_offset_register(a), term_offset_register(b)) {
            (Some(field), None) => Some(Encoding::with_word(field, b.into())),
            (None, Some(field)) => Some(Encoding::with_word(field, a.into())),
            _ => None,
        },
        Operand::Str(_) | Operand::MemRef(_) => None,
    }
}
fn term_offset_register(t: &Term) -> Option<u8> {
    match t {
        Term::Ident(name) => offset_register(name),
        Term::Number(_) => None,
    }
}
fn cannot_encode(operand: &Operand) -> Error { encoding_err!("cannot encode operand `{}`", operand) }
