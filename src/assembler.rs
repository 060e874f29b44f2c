//! Assembling a DCPU-16 program is a single pass over the source:
//!
//!  1. Each line is parsed into an optional label and an optional instruction
//!  2. A label is defined at the current origin (closing the local scope if it's global)
//!  3. The instruction's operands are encoded and its words written at the origin
//!  4. Any word that refers to a symbol that isn't known yet becomes a fixup
//!
//! Fixups on local symbols are resolved each time a new global symbol is
//! defined; the rest are resolved once the whole source has been read. The
//! output is the image from address 0 up to the highest address reached.
use super::instructions::{self, Opcode};
use super::obj::{encode_operand, low_word, Word};
use super::parse::{Instruction, Operand, Parser};
use super::program::*;
use super::*;

use regex::Regex;

/// Everything that changes while a program is being assembled.
struct AssemblerState {
    origin: u32,     // where the next word goes
    high_water: u32, // highest origin left behind by an org
    line: usize,     // current source line (1-based)
    symbols: SymbolTable,
    image: MemoryImage,
}
impl AssemblerState {
    fn new() -> Self {
        AssemblerState {
            origin: 0,
            high_water: 0,
            line: 0,
            symbols: SymbolTable::new(),
            image: MemoryImage::new(),
        }
    }
    /// The current origin as a machine address.
    fn address(&self) -> Result<u16, Error> {
        u16::try_from(self.origin).map_err(|_| overflow_err!("program extends past address $ffff"))
    }
    /// The address a label at the origin stands for. A label may sit just past
    /// the last word of memory, in which case it wraps to 0.
    fn label_address(&self) -> u16 { low_word(self.origin as u64) }
    /// Write a word at the origin (or note that the word must be fixed up later) and advance.
    fn emit(&mut self, word: Word) -> Result<(), Error> {
        let addr = self.address()?;
        match word {
            Word::Literal(value) => self.image.write(addr, value),
            Word::Symbol(symbol) => self.symbols.record_fixup(addr, &symbol, self.line),
        }
        self.origin += 1;
        Ok(())
    }
}

/// The container for our assembler methods.
pub struct Assembler {
    parser: Parser,
    re_comment_or_blank_line: Regex, // matches a line that is blank or only contains a comment
}
impl Assembler {
    pub fn new() -> Assembler {
        Assembler {
            parser: Parser::new(),
            re_comment_or_blank_line: Regex::new(r"^\s*(?:;.*)?$").unwrap(),
        }
    }

    /// Assemble the given source text into a Program. The first error aborts the build.
    pub fn assemble_program(&self, src: &str) -> Result<Program, Error> {
        let mut state = AssemblerState::new();
        for (i, text) in src.split('\n').enumerate() {
            state.line = i + 1;
            self.assemble_line(&mut state, text)
                .map_err(|e| e.at_line(state.line))?;
        }
        state.symbols.finalize(&mut state.image)?;
        let len = state.high_water.max(state.origin);
        verbose_println!("{} words assembled", len);
        Ok(Program {
            image: state.image.into_words(len as usize),
            symbols: state.symbols.into_history(),
        })
    }

    fn assemble_line(&self, state: &mut AssemblerState, text: &str) -> Result<(), Error> {
        if self.re_comment_or_blank_line.is_match(text) {
            return Ok(());
        }
        let line = self.parser.parse_line(text)?;
        if let Some(label) = line.label.as_ref() {
            let addr = state.label_address();
            state.symbols.define(label, addr, state.line, &mut state.image)?;
        }
        if let Some(inst) = line.instruction.as_ref() {
            let start = state.origin;
            self.process_instruction(state, inst)?;
            if config::ARGS.verbose && inst.op != Opcode::Org {
                let words = (start..state.origin)
                    .map(|a| format!("{:04x}", state.image.read(a as u16)))
                    .collect::<Vec<String>>()
                    .join(" ");
                verbose_println!("{:04x}: {:24} {}", start, words, text.trim());
            }
        }
        Ok(())
    }

    /// Dispatch on the operation and write the resulting words into the image.
    fn process_instruction(&self, state: &mut AssemblerState, inst: &Instruction) -> Result<(), Error> {
        match inst.op {
            Opcode::Org => self.process_org(state, inst),
            Opcode::Dat => self.process_dat(state, inst),
            Opcode::Extended(op) => {
                check_arity(inst, 1)?;
                let a = encode_operand(&inst.operands[0])?;
                state.emit(Word::Literal(instructions::extended_word(op, a.field)))?;
                for w in a.extra {
                    state.emit(w)?;
                }
                Ok(())
            }
            Opcode::Basic(op) => {
                check_arity(inst, 2)?;
                let a = encode_operand(&inst.operands[0])?;
                let b = encode_operand(&inst.operands[1])?;
                state.emit(Word::Literal(instructions::basic_word(op, a.field, b.field)))?;
                // extra words for operand a come before those for operand b
                for w in a.extra.into_iter().chain(b.extra) {
                    state.emit(w)?;
                }
                Ok(())
            }
        }
    }

    /// org only moves the origin; its operand must be a literal address.
    fn process_org(&self, state: &mut AssemblerState, inst: &Instruction) -> Result<(), Error> {
        check_arity(inst, 1)?;
        match &inst.operands[0] {
            Operand::Number(n) => {
                if *n > MEMORY_WORDS as u64 {
                    return Err(overflow_err!("org address {:#x} is outside of memory", n));
                }
                state.high_water = state.high_water.max(state.origin);
                state.origin = *n as u32;
                Ok(())
            }
            other => Err(line_err!(
                state.line,
                ErrorKind::OrgOperand,
                format!("{} can't evaluate `{}` as an org address", red!("Org Error"), other)
            )),
        }
    }

    /// dat writes numbers, the characters of strings and symbol addresses verbatim.
    fn process_dat(&self, state: &mut AssemblerState, inst: &Instruction) -> Result<(), Error> {
        for operand in &inst.operands {
            match operand {
                Operand::Number(n) => state.emit(Word::Literal(low_word(*n)))?,
                Operand::Str(s) => {
                    for c in s.chars() {
                        state.emit(Word::Literal(low_word(c as u64)))?;
                    }
                }
                Operand::Ident(name) => state.emit(Word::Symbol(name.clone()))?,
                Operand::Add(..) | Operand::MemRef(_) => {
                    return Err(encoding_err!("cannot encode operand `{}` as data", operand))
                }
            }
        }
        Ok(())
    }
}

fn check_arity(inst: &Instruction, expected: usize) -> Result<(), Error> {
    if inst.operands.len() == expected {
        return Ok(());
    }
    Err(arity_err!(
        "\"{}\" takes {} operand{} but {} {} given",
        inst.op,
        expected,
        if expected == 1 { "" } else { "s" },
        inst.operands.len(),
        if inst.operands.len() == 1 { "was" } else { "were" }
    ))
}

/// Assemble source text into the little-endian bytes of its memory image.
///
/// This is the entry point for callers that only want the image. The command
/// line driver uses [`Assembler::assemble_program`] instead since it also needs
/// the symbols.
#[allow(dead_code)]
pub fn assemble(src: &str) -> Result<Vec<u8>, Error> { Ok(Assembler::new().assemble_program(src)?.to_bytes()) }

#[cfg(test)]
mod tests {
    use super::*;
    fn words(src: &str) -> Vec<u16> {
        Assembler::new()
            .assemble_program(src)
            .unwrap_or_else(|e| panic!("failed to assemble: {}", e))
            .image
    }
    fn fails(src: &str, kind: ErrorKind) -> Error {
        match Assembler::new().assemble_program(src) {
            Err(e) => {
                assert_eq!(e.kind, kind, "unexpected error: {}", e);
                e
            }
            Ok(p) => panic!("expected {:?} but assembled {:04x?}", kind, p.image),
        }
    }

    #[test]
    fn short_immediate() {
        assert_eq!(assemble("set a, 5").unwrap(), vec![0x01, 0x94]);
        assert_eq!(words("set a, 31"), vec![0xfc01]);
        assert_eq!(words("set a, 32"), vec![0x7c01, 0x0020]);
    }
    #[test]
    fn string_data() {
        assert_eq!(words("dat \"AB\""), vec![0x41, 0x42]);
        assert_eq!(words("dat 'hi', 0, 0x12345"), vec![0x68, 0x69, 0, 0x2345]);
    }
    #[test]
    fn forward_reference() {
        let src = "jsr foo\nfoo: set a, 1";
        assert_eq!(words(src), vec![0x7c10, 0x0002, 0x8401]);
        let e = fails("jsr foo\nbar: set a, 1", ErrorKind::UnresolvedSymbol);
        assert!(e.msg.contains("foo"));
        assert_eq!(e.line, Some(1));
        let e = fails("set a, 1\n  dat missing_symbol", ErrorKind::UnresolvedSymbol);
        assert!(e.msg.contains("missing_symbol"));
        assert_eq!(e.line, Some(2));
    }
    #[test]
    fn extra_word_order() {
        // operand a's word comes before operand b's
        let src = "set [0x1000], foo\nfoo: dat 7";
        assert_eq!(words(src), vec![0x7de1, 0x1000, 0x0003, 7]);
    }
    #[test]
    fn org_and_high_water() {
        let p = Assembler::new().assemble_program("org 0x200\nL: dat 1").unwrap();
        assert_eq!(p.image.len(), 0x201);
        assert_eq!(p.image[0x200], 1);
        assert_eq!(p.symbols[0].name, "L");
        assert_eq!(p.symbols[0].addr, 0x200);
        assert_eq!(p.to_bytes().len(), 2 * 0x201);
        // moving back keeps the furthest origin reached
        assert_eq!(words("org 0x200\ndat 1\norg 0x10").len(), 0x201);
        // the origin left behind at the end counts even though nothing was written there
        assert_eq!(words("dat 1\norg 0x10").len(), 0x10);
        assert_eq!(words("org 0x10\norg 0").len(), 0x10);
        assert_eq!(words("org 0x10\ndat 5\norg 0\ndat 6"), {
            let mut v = vec![0; 0x11];
            v[0] = 6;
            v[0x10] = 5;
            v
        });
    }
    #[test]
    fn local_scopes() {
        let src = "
f:      set pc, .end
.end:   set a, 1
g:      set pc, .end
.end:   dat 0";
        assert_eq!(words(src), vec![0x7dc1, 2, 0x8401, 0x7dc1, 5, 0]);
        // a local defined after the next global can't satisfy an earlier reference
        let e = fails("f: set pc, .later\ng: dat 0\n.later: dat 1", ErrorKind::UnresolvedSymbol);
        assert!(e.msg.contains(".later"));
        // local references before the first global resolve at the end
        assert_eq!(words("dat .x\n.x: dat 9"), vec![1, 9]);
    }
    #[test]
    fn arity() {
        let e = fails("set a", ErrorKind::Arity);
        assert_eq!(e.line, Some(1));
        fails("set a, b, c", ErrorKind::Arity);
        fails("\n\njsr a, b", ErrorKind::Arity);
        fails("org 1, 2", ErrorKind::Arity);
    }
    #[test]
    fn org_requires_literal() {
        let e = fails("start: dat 0\norg start", ErrorKind::OrgOperand);
        assert_eq!(e.line, Some(2));
        fails("org [0x10]", ErrorKind::OrgOperand);
    }
    #[test]
    fn unencodable_operands() {
        fails("set \"a\", 1", ErrorKind::Encoding);
        fails("set a, b+1", ErrorKind::Encoding);
        fails("dat [a]", ErrorKind::Encoding);
        fails("dat a+1", ErrorKind::Encoding);
    }
    #[test]
    fn parse_error_aborts() {
        let e = fails("set a, 1\nthis is not assembly\nset b, foo", ErrorKind::Parse);
        assert_eq!(e.line, Some(2));
    }
    #[test]
    fn address_space_overflow() {
        assert_eq!(words("org 0xffff\ndat 1").len(), 0x10000);
        fails("org 0xffff\ndat 1, 2", ErrorKind::Overflow);
        fails("org 0x10001", ErrorKind::Overflow);
        // the write fails, not the label in front of it
        let e = fails("org 0x10000\nend:\ndat 0", ErrorKind::Overflow);
        assert_eq!(e.line, Some(3));
        fails("org 0x10000\nend: dat 0", ErrorKind::Overflow);
    }
    #[test]
    fn label_after_full_memory() {
        let p = Assembler::new()
            .assemble_program("jsr end\norg 0xffff\ndat 1\nend:")
            .unwrap_or_else(|e| panic!("failed to assemble: {}", e));
        assert_eq!(p.image.len(), 0x10000);
        assert_eq!(p.image[0xffff], 1);
        // the address past the end wraps to 0
        assert_eq!(p.image[1], 0);
        assert_eq!(p.symbols[0].name, "end");
        assert_eq!(p.symbols[0].addr, 0);
    }
    #[test]
    fn crlf_and_comments() {
        let src = "; header\r\nset a, 1 ; one\r\n\r\n  ;indented comment\r\ndat 2\r\n";
        assert_eq!(words(src), vec![0x8401, 2]);
        assert!(words("").is_empty());
    }
    #[test]
    fn idempotent() {
        let src = "start: set a, msg\nset pc, start\nmsg: dat \"hello\", 0";
        assert_eq!(assemble(src).unwrap(), assemble(src).unwrap());
    }
    #[test]
    fn sample_program() {
        let src = "
        ; Try some basic stuff
        set a, 0x30              ; 7c01 0030
        set [0x1000], 0x20       ; 7de1 1000 0020
        sub a, [0x1000]          ; 7803 1000
        ifn a, 0x10              ; c00d
           set pc, crash         ; 7dc1 001a
        ; Do a loopy thing
        set i, 10                ; a861
        set a, 0x2000            ; 7c01 2000
loop:   set [0x2000+i], [a]      ; 2161 2000
        sub i, 1                 ; 8463
        ifn i, 0                 ; 806d
           set pc, loop          ; 7dc1 000d
        ; Call a subroutine
        set x, 0x4               ; 9031
        jsr testsub              ; 7c10 0018
        set pc, crash            ; 7dc1 001a
testsub: shl x, 4                ; 9037
        set pc, [sp+]            ; 61c1
crash:  set pc, crash            ; 7dc1 001a
";
        let expected: Vec<u16> = vec![
            0x7c01, 0x0030, 0x7de1, 0x1000, 0x0020, 0x7803, 0x1000, 0xc00d, 0x7dc1, 0x001a, 0xa861, 0x7c01,
            0x2000, 0x2161, 0x2000, 0x8463, 0x806d, 0x7dc1, 0x000d, 0x9031, 0x7c10, 0x0018, 0x7dc1, 0x001a,
            0x9037, 0x61c1, 0x7dc1, 0x001a,
        ];
        assert_eq!(words(src), expected);
    }
}
