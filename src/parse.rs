use super::instructions::Opcode;
use super::*;

use regex::Regex;
use std::{iter::Peekable, vec::IntoIter};

type TokenIter = Peekable<IntoIter<Token>>;

/// The first step in parsing a line is tokenization. Everything from a `;`
/// outside of a string literal to the end of the line is a comment and never
/// becomes a token.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Token {
    Ident(String),
    Number(u64),
    Str(String),
    Comma,
    Colon,
    Plus,
    LBracket,
    RBracket,
}
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{}", s),
            Token::Number(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::Plus => write!(f, "+"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
        }
    }
}

/// One side of an additive expression. Only numbers and identifiers may be added.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Term {
    Number(u64),
    Ident(String),
}
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::Number(n) => write!(f, "{}", n),
            Term::Ident(s) => write!(f, "{}", s),
        }
    }
}

/// The value of a single operand as written in the source.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Operand {
    /// numeric literal; not truncated until it's encoded
    Number(u64),
    /// register or symbol name
    Ident(String),
    /// string literal with the quotes stripped
    Str(String),
    /// `term + term`, used for register-plus-offset addressing
    Add(Term, Term),
    /// `[value]`
    MemRef(Box<Operand>),
}
impl From<Term> for Operand {
    fn from(t: Term) -> Self {
        match t {
            Term::Number(n) => Operand::Number(n),
            Term::Ident(s) => Operand::Ident(s),
        }
    }
}
impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Number(n) => write!(f, "{}", n),
            Operand::Ident(s) => write!(f, "{}", s),
            Operand::Str(s) => write!(f, "\"{}\"", s),
            Operand::Add(a, b) => write!(f, "{}+{}", a, b),
            Operand::MemRef(inner) => write!(f, "[{}]", inner),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Instruction {
    pub op: Opcode,
    pub operands: Vec<Operand>,
}
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.op)?;
        let mut sep = " ";
        for o in &self.operands {
            write!(f, "{}{}", sep, o)?;
            sep = ", ";
        }
        Ok(())
    }
}

/// The parsed form of one source line. Both parts are optional; a blank or
/// comment-only line has neither.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Line {
    pub label: Option<String>,
    pub instruction: Option<Instruction>,
}

fn is_ident_char(c: char) -> bool { c.is_ascii_alphanumeric() || c == '_' || c == '.' }
/// A string is a well-formed value but has no encoding as part of a sum.
fn string_in_expression(s: &str) -> Error {
    encoding_err!("cannot encode operand: string \"{}\" can't be part of an expression", s)
}

/// The container for parsing methods.
pub struct Parser {
    re_ident: Regex,
    re_number: Regex,
}
impl Parser {
    pub fn new() -> Self {
        Parser {
            re_ident: Regex::new(r"^[A-Za-z_.][A-Za-z0-9_.]*").unwrap(),
            re_number: Regex::new(r"^(?:0x([0-9a-fA-F]+)|([0-9]+))").unwrap(),
        }
    }
    /// Parses one line of source.
    ///
    /// Grammar:
    /// ```text
    ///  line = [ident ":"] [opcode operand ("," operand)*] [";" comment]
    ///  operand = value | "[" value "]"
    ///  value = string | term ["+" term]
    ///  term = number | ident
    ///  number = /0x[0-9a-fA-F]+/ | /[0-9]+/
    ///  ident = "sp+" | "-sp" | /[a-zA-Z_.][a-zA-Z0-9_.]*/
    /// ```
    ///
    /// The whole line must match; anything left over is an error.
    pub fn parse_line(&self, src: &str) -> Result<Line, Error> {
        let tokens = self.tokenize(src)?;
        let mut line = Line::default();
        let has_label = matches!(tokens.as_slice(), [Token::Ident(_), Token::Colon, ..]);
        let mut token_iter = tokens.into_iter().peekable();
        if has_label {
            if let Some(Token::Ident(name)) = token_iter.next() {
                line.label = Some(name);
            }
            // consume the colon
            token_iter.next();
        }
        match token_iter.next() {
            None => return Ok(line),
            Some(Token::Ident(name)) => {
                let op =
                    Opcode::from_name(&name).ok_or_else(|| parse_err!("unknown operation \"{}\"", name))?;
                let operands = self.parse_operand_list(&mut token_iter)?;
                line.instruction = Some(Instruction { op, operands });
            }
            Some(t) => return Err(parse_err!("unexpected \"{}\"", t)),
        }
        if let Some(t) = token_iter.next() {
            return Err(parse_err!("unexpected \"{}\" after instruction", t));
        }
        Ok(line)
    }
    /// Parses a comma delimited list of at least one operand.
    fn parse_operand_list(&self, token_iter: &mut TokenIter) -> Result<Vec<Operand>, Error> {
        let mut operands = vec![self.parse_operand(token_iter)?];
        while token_iter.peek() == Some(&Token::Comma) {
            token_iter.next();
            operands.push(self.parse_operand(token_iter)?);
        }
        Ok(operands)
    }
    /// ```text
    ///     operand = value | "[" value "]"
    /// ```
    fn parse_operand(&self, token_iter: &mut TokenIter) -> Result<Operand, Error> {
        if token_iter.peek() != Some(&Token::LBracket) {
            return self.parse_value(token_iter);
        }
        token_iter.next();
        let value = self.parse_value(token_iter)?;
        // consume the closing bracket (whether or not it's the right token)
        if token_iter.next() != Some(Token::RBracket) {
            return Err(parse_err!("closing ']' not found"));
        }
        Ok(Operand::MemRef(Box::new(value)))
    }
    /// ```text
    ///     value = string | term ["+" term]
    /// ```
    fn parse_value(&self, token_iter: &mut TokenIter) -> Result<Operand, Error> {
        if let Some(Token::Str(_)) = token_iter.peek() {
            if let Some(Token::Str(s)) = token_iter.next() {
                if token_iter.peek() == Some(&Token::Plus) {
                    return Err(string_in_expression(&s));
                }
                return Ok(Operand::Str(s));
            }
        }
        let left = self.parse_term(token_iter)?;
        if token_iter.peek() != Some(&Token::Plus) {
            return Ok(left.into());
        }
        token_iter.next();
        let right = self.parse_term(token_iter)?;
        Ok(Operand::Add(left, right))
    }
    fn parse_term(&self, token_iter: &mut TokenIter) -> Result<Term, Error> {
        match token_iter.next() {
            Some(Token::Number(n)) => Ok(Term::Number(n)),
            Some(Token::Ident(s)) => Ok(Term::Ident(s)),
            Some(Token::Str(s)) => Err(string_in_expression(&s)),
            Some(t) => Err(parse_err!("expected number or identifier but found \"{}\"", t)),
            None => Err(parse_err!("missing operand")),
        }
    }

    /// Tokenize the given line and return a Vec<Token>.
    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, Error> {
        let mut output = Vec::new();
        let mut rest = input;
        loop {
            rest = rest.trim_start_matches(|c: char| c.is_whitespace());
            let ch = match rest.chars().next() {
                Some(ch) => ch,
                None => break,
            };
            let punct = match ch {
                ',' => Some(Token::Comma),
                ':' => Some(Token::Colon),
                '+' => Some(Token::Plus),
                '[' => Some(Token::LBracket),
                ']' => Some(Token::RBracket),
                _ => None,
            };
            if let Some(t) = punct {
                output.push(t);
                rest = &rest[1..];
                continue;
            }
            let len = match ch {
                // the rest of the line is a comment
                ';' => break,
                '"' | '\'' => {
                    let (s, len) = self.get_string(rest)?;
                    output.push(Token::Str(s));
                    len
                }
                '-' => {
                    // the push form is the only thing that may start with '-'
                    if rest.starts_with("-sp") && !rest[3..].starts_with(is_ident_char) {
                        output.push(Token::Ident("-sp".to_string()));
                        3
                    } else {
                        return Err(parse_err!("unexpected character '-'"));
                    }
                }
                '0'..='9' => {
                    let (n, len) = self.get_number(rest)?;
                    output.push(Token::Number(n));
                    len
                }
                c if is_ident_char(c) => {
                    let ident = self.re_ident.find(rest).map_or("", |m| m.as_str());
                    let after = &rest[ident.len()..];
                    // "sp+" (pop) binds tighter than "sp" followed by an addition
                    if ident == "sp" && after.starts_with('+') && !after[1..].starts_with(is_ident_char) {
                        output.push(Token::Ident("sp+".to_string()));
                        3
                    } else {
                        output.push(Token::Ident(ident.to_string()));
                        ident.len()
                    }
                }
                c => return Err(parse_err!("unexpected character '{}'", c)),
            };
            rest = &rest[len..];
        }
        Ok(output)
    }
    fn get_number(&self, s: &str) -> Result<(u64, usize), Error> {
        let c = self
            .re_number
            .captures(s)
            .ok_or_else(|| parse_err!("invalid number \"{}\"", s))?;
        let len = c.get(0).map_or(0, |m| m.end());
        let parsed = if let Some(hex) = c.get(1) {
            u64::from_str_radix(hex.as_str(), 16)
        } else {
            s[..len].parse::<u64>()
        };
        let n = parsed.map_err(|_| parse_err!("numeric constant \"{}\" too large", &s[..len]))?;
        Ok((n, len))
    }
    /// Reads a quoted string starting at the beginning of `s`. Returns the
    /// contents (without quotes) and the number of bytes consumed. A backslash
    /// keeps the character after it in the string, quote or not, and a doubled
    /// quote is kept as both characters.
    fn get_string(&self, s: &str) -> Result<(String, usize), Error> {
        let mut chars = s.char_indices().peekable();
        let quote = chars.next().map_or('"', |(_, c)| c);
        let mut contents = String::new();
        while let Some((i, c)) = chars.next() {
            if c == quote {
                if chars.peek().map(|&(_, next)| next) != Some(quote) {
                    return Ok((contents, i + c.len_utf8()));
                }
                chars.next();
                contents.push(c);
                contents.push(c);
                continue;
            }
            contents.push(c);
            if c == '\\' {
                if let Some((_, escaped)) = chars.next() {
                    contents.push(escaped);
                }
            }
        }
        Err(parse_err!("unterminated string {}", s))
    }
}
