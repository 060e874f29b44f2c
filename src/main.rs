//! # A DCPU-16 Assembler written in Rust.
//!
//! ## Getting Started
//! To assemble a program into a binary image:
//! ```text
//! cargo run -- -o program.bin /path/to/program.asm
//! ```
//! ...or if you've already built the binary then just...
//! ```text
//! dcpu-asm -o program.bin /path/to/program.asm
//! ```
//! Several source files may be given; they're assembled as if they were one
//! file, in the order listed. Use `-` to read source from stdin or to write
//! the image to stdout.
//! ## Options
//! Help for command line options is available using -h or --help.
#[macro_use]
mod macros;
mod assembler;
mod config;
mod error;
mod instructions;
mod obj;
mod parse;
mod program;
use crate::assembler::Assembler;
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::result::Result;
pub(crate) use crate::error::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // process_files does all the work
    if let Err(e) = process_files(&config::ARGS.files, &config::ARGS.output) {
        eprintln!("{}", e);
        return Err(Box::new(e));
    }
    Ok(())
}
/// process_files reads the sources, assembles them and writes the results
fn process_files(files: &[String], output: &str) -> Result<(), Error> {
    let src = read_sources(files)?;
    info!("Assembling {}", files.join(", "));
    let program = Assembler::new().assemble_program(&src)?;
    if config::ARGS.list {
        // keep the listing out of the image if the image is going to stdout
        if config::to_stdout() {
            program.dump_symbols(&mut io::stderr())?;
        } else {
            program.dump_symbols(&mut io::stdout())?;
        }
    }
    if config::to_stdout() {
        program.write_image(&mut io::stdout().lock())?;
        if config::ARGS.write_sym {
            warn!("no symbol file is written when the image goes to stdout");
        }
        return Ok(());
    }
    let mut file = File::create(output)?;
    program.write_image(&mut file)?;
    info!("wrote {} words to {}", program.image.len(), output);
    if config::ARGS.write_sym {
        program.write_sym_file(&Path::new(output).with_extension("sym"))?;
    }
    Ok(())
}
/// Read each source in order and join them into one program. "-" is stdin.
fn read_sources(files: &[String]) -> Result<String, Error> {
    let mut sources = Vec::with_capacity(files.len());
    for f in files {
        let src = if f == "-" {
            let mut s = String::new();
            io::stdin().read_to_string(&mut s)?;
            s
        } else {
            fs::read_to_string(f).map_err(|e| Error::new(ErrorKind::IO, None, &format!("{}: {}", f, e)))?
        };
        verbose_println!("read {} lines from {}", src.lines().count(), f);
        sources.push(src);
    }
    Ok(sources.join("\n"))
}
