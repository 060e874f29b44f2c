use std::fmt;

/// Simple custom Error for the assembler
pub struct Error {
    pub kind: ErrorKind,
    /// 1-based source line the error belongs to (if known)
    pub line: Option<usize>,
    pub msg: String,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    /// line doesn't match the statement grammar
    Parse,
    /// wrong number of operands for an operation
    Arity,
    /// operand has no valid encoding
    Encoding,
    /// ORG operand isn't a literal address
    OrgOperand,
    /// reference to a symbol that was never defined in its scope
    UnresolvedSymbol,
    /// the program ran off the end of the address space
    Overflow,
    /// underlying io error
    IO,
}

impl Error {
    pub fn new(kind: ErrorKind, line: Option<usize>, message: &str) -> Error {
        Error {
            kind,
            line,
            msg: String::from(message),
        }
    }
    /// Attach a line number unless the error already carries one.
    pub fn at_line(mut self, line: usize) -> Error {
        self.line.get_or_insert(line);
        self
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self { Error::new(ErrorKind::IO, None, e.to_string().as_str()) }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {:?}: {}", red!("asm::Error"), self.kind, self)
    }
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(line) = self.line {
            write!(f, "line {}: ", line)?;
        }
        write!(f, "{}", self.msg)
    }
}
impl std::error::Error for Error {}
