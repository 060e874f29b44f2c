use super::*;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

/// Number of addressable words
pub const MEMORY_WORDS: usize = 0x10000;

/// The full 64K word address space of the target machine. Words that are never
/// written stay zero.
pub struct MemoryImage {
    words: Vec<u16>,
}
impl MemoryImage {
    pub fn new() -> Self {
        MemoryImage {
            words: vec![0; MEMORY_WORDS],
        }
    }
    pub fn write(&mut self, addr: u16, value: u16) { self.words[addr as usize] = value; }
    pub fn read(&self, addr: u16) -> u16 { self.words[addr as usize] }
    /// Consume the image, keeping only the first `len` words.
    pub fn into_words(mut self, len: usize) -> Vec<u16> {
        self.words.truncate(len);
        self.words
    }
}

/// Symbols whose names begin with '.' are local to the span between two global definitions.
pub fn is_local(name: &str) -> bool { name.starts_with('.') }

/// A pending write of a symbol's address into the image.
#[derive(Debug)]
struct Fixup {
    symbol: String,
    line: usize, // the line on which the reference appears
}

/// One symbol definition, kept for listings and symbol files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub addr: u16,
    pub scope: Option<String>, // for a local symbol, the global that owns it
    pub line: usize,
}
impl Symbol {
    pub fn qualified_name(&self) -> String {
        match self.scope.as_ref() {
            Some(scope) if is_local(&self.name) => format!("{}{}", scope, self.name),
            _ => self.name.clone(),
        }
    }
}
impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04} {:04x} {}", self.line, self.addr, self.qualified_name())
    }
}

/// Symbol definitions plus the references that couldn't be resolved when they
/// were encountered. Local references are resolved whenever a new global scope
/// begins; global references are resolved at the end of the program.
#[derive(Debug, Default)]
pub struct SymbolTable {
    local: HashMap<String, u16>,
    global: HashMap<String, u16>,
    fixups: BTreeMap<u16, Fixup>,
    scope: Option<String>,
    history: Vec<Symbol>,
}
impl SymbolTable {
    pub fn new() -> Self { SymbolTable::default() }
    /// Define a symbol at the given address. Defining a global symbol closes
    /// the current local scope, so every pending local reference must resolve now.
    pub fn define(&mut self, name: &str, addr: u16, line: usize, image: &mut MemoryImage) -> Result<(), Error> {
        if is_local(name) {
            if let Some(old) = self.local.insert(name.to_string(), addr) {
                warn!("line {}: local symbol \"{}\" redefined (was {:04x})", line, name, old);
            }
        } else {
            self.flush_locals(image)?;
            if let Some(old) = self.global.insert(name.to_string(), addr) {
                warn!("line {}: symbol \"{}\" redefined (was {:04x})", line, name, old);
            }
            self.scope = Some(name.to_string());
        }
        self.history.push(Symbol {
            name: name.to_string(),
            addr,
            scope: self.scope.clone(),
            line,
        });
        Ok(())
    }
    /// Note that the word at `addr` must receive the address of `symbol` once it's known.
    pub fn record_fixup(&mut self, addr: u16, symbol: &str, line: usize) {
        self.fixups.insert(
            addr,
            Fixup {
                symbol: symbol.to_string(),
                line,
            },
        );
    }
    /// Resolve everything that's still pending. Called once at the end of the program.
    pub fn finalize(&mut self, image: &mut MemoryImage) -> Result<(), Error> {
        self.flush_locals(image)?;
        self.flush(image, false)?;
        debug_assert!(self.fixups.is_empty());
        Ok(())
    }
    #[cfg(test)]
    pub fn pending(&self) -> usize { self.fixups.len() }
    pub fn into_history(self) -> Vec<Symbol> { self.history }
    fn flush_locals(&mut self, image: &mut MemoryImage) -> Result<(), Error> {
        self.flush(image, true)?;
        self.local.clear();
        Ok(())
    }
    /// Resolve all local (or all global) fixups. Fails on the lowest address whose symbol is unknown.
    fn flush(&mut self, image: &mut MemoryImage, local: bool) -> Result<(), Error> {
        let table = if local { &self.local } else { &self.global };
        let mut resolved = Vec::new();
        for (&addr, fixup) in self.fixups.iter().filter(|(_, f)| is_local(&f.symbol) == local) {
            let value = table
                .get(&fixup.symbol)
                .ok_or_else(|| unresolved_err!(Some(fixup.line), fixup.symbol))?;
            image.write(addr, *value);
            resolved.push(addr);
        }
        for addr in resolved {
            self.fixups.remove(&addr);
        }
        Ok(())
    }
}

/// The outcome of a successful assembly: the meaningful part of the memory
/// image and every symbol that was defined along the way.
#[derive(Debug)]
pub struct Program {
    pub image: Vec<u16>,
    pub symbols: Vec<Symbol>,
}
impl Program {
    /// Serialize the image as little-endian words.
    pub fn to_bytes(&self) -> Vec<u8> { self.image.iter().flat_map(|w| w.to_le_bytes()).collect() }
    pub fn write_image(&self, w: &mut dyn Write) -> Result<(), Error> {
        w.write_all(&self.to_bytes())?;
        w.flush()?;
        Ok(())
    }
    pub fn dump_symbols(&self, w: &mut dyn Write) -> Result<(), Error> {
        if self.symbols.is_empty() {
            writeln!(w, "No symbols.")?;
            return Ok(());
        }
        writeln!(w, "{} symbols defined:", self.symbols.len())?;
        writeln!(w, blue!("{:4} {:4} {}"), "LINE", "ADDR", "SYMBOL")?;
        for s in &self.symbols {
            writeln!(w, "{}", s)?;
        }
        Ok(())
    }
    /// Write a symbol file with one "ADDR,name" line per definition, sorted by address.
    pub fn write_sym_file(&self, path: &Path) -> Result<(), Error> {
        let mut symbols: Vec<&Symbol> = self.symbols.iter().collect();
        symbols.sort_by_key(|s| s.addr);
        let mut file = File::create(path)?;
        self.write_sym(&mut file, &symbols)?;
        info!("wrote symbol file: {}", path.display());
        Ok(())
    }
    fn write_sym(&self, w: &mut dyn Write, symbols: &[&Symbol]) -> Result<(), Error> {
        for s in symbols {
            writeln!(w, "{:04X},{}", s.addr, s.qualified_name())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn define(st: &mut SymbolTable, img: &mut MemoryImage, name: &str, addr: u16) {
        st.define(name, addr, 1, img).unwrap_or_else(|e| panic!("{}", e));
    }
    #[test]
    fn global_definition_flushes_locals() {
        let mut st = SymbolTable::new();
        let mut img = MemoryImage::new();
        define(&mut st, &mut img, "main", 0);
        st.record_fixup(1, ".loop", 2);
        st.record_fixup(2, "later", 2);
        define(&mut st, &mut img, ".loop", 0x10);
        assert_eq!(st.pending(), 2);
        define(&mut st, &mut img, "next", 0x20);
        // the local reference was resolved; the global one is still pending
        assert_eq!(img.read(1), 0x10);
        assert_eq!(st.pending(), 1);
        define(&mut st, &mut img, "later", 0x30);
        st.finalize(&mut img).unwrap();
        assert_eq!(img.read(2), 0x30);
        assert_eq!(st.pending(), 0);
    }
    #[test]
    fn locals_do_not_cross_global_boundaries() {
        let mut st = SymbolTable::new();
        let mut img = MemoryImage::new();
        define(&mut st, &mut img, "first", 0);
        st.record_fixup(0, ".done", 7);
        let e = st.define("second", 4, 9, &mut img).unwrap_err();
        assert_eq!(e.kind, ErrorKind::UnresolvedSymbol);
        assert!(e.msg.contains(".done"));
        // reported against the line of the reference
        assert_eq!(e.line, Some(7));
    }
    #[test]
    fn local_table_is_cleared() {
        let mut st = SymbolTable::new();
        let mut img = MemoryImage::new();
        define(&mut st, &mut img, ".x", 5);
        define(&mut st, &mut img, "g", 6);
        st.record_fixup(9, ".x", 3);
        let e = st.finalize(&mut img).unwrap_err();
        assert_eq!(e.kind, ErrorKind::UnresolvedSymbol);
    }
    #[test]
    fn unresolved_global() {
        let mut st = SymbolTable::new();
        let mut img = MemoryImage::new();
        st.record_fixup(3, "nowhere", 1);
        let e = st.finalize(&mut img).unwrap_err();
        assert_eq!(e.kind, ErrorKind::UnresolvedSymbol);
        assert!(e.msg.contains("nowhere"));
    }
    #[test]
    fn history_tracks_scopes() {
        let mut st = SymbolTable::new();
        let mut img = MemoryImage::new();
        define(&mut st, &mut img, ".pre", 0);
        define(&mut st, &mut img, "f", 1);
        define(&mut st, &mut img, ".loop", 2);
        let names: Vec<String> = st.into_history().iter().map(|s| s.qualified_name()).collect();
        assert_eq!(names, vec![".pre", "f", "f.loop"]);
    }
    #[test]
    fn redefinition_keeps_latest() {
        let mut st = SymbolTable::new();
        let mut img = MemoryImage::new();
        define(&mut st, &mut img, "dup", 1);
        define(&mut st, &mut img, "dup", 2);
        st.record_fixup(0, "dup", 3);
        st.finalize(&mut img).unwrap();
        assert_eq!(img.read(0), 2);
    }
    #[test]
    fn image_bytes_are_little_endian() {
        let p = Program {
            image: vec![0x1234, 0x0041, 0],
            symbols: Vec::new(),
        };
        assert_eq!(p.to_bytes(), vec![0x34, 0x12, 0x41, 0x00, 0x00, 0x00]);
        let mut out = Vec::new();
        p.write_image(&mut out).unwrap();
        assert_eq!(out, p.to_bytes());
    }
    #[test]
    fn sym_file_format() {
        let p = Program {
            image: Vec::new(),
            symbols: vec![
                Symbol {
                    name: "start".to_string(),
                    addr: 0x200,
                    scope: Some("start".to_string()),
                    line: 1,
                },
                Symbol {
                    name: ".loop".to_string(),
                    addr: 0x1f,
                    scope: Some("start".to_string()),
                    line: 2,
                },
            ],
        };
        let mut symbols: Vec<&Symbol> = p.symbols.iter().collect();
        symbols.sort_by_key(|s| s.addr);
        let mut out = Vec::new();
        p.write_sym(&mut out, &symbols).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "001F,start.loop\n0200,start\n");
    }
}
