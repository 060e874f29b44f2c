use clap::Parser;
use lazy_static::lazy_static;

#[derive(Parser, Debug)]
#[command(author,version,about,long_about=None)]
pub struct Args {
    /// Assembly source file(s), concatenated in the order given ('-' reads stdin)
    #[arg(required = true)]
    pub files: Vec<String>,

    /// File to receive the binary image ('-' writes to stdout)
    #[arg(short, long, default_value = "a.bin")]
    pub output: String,

    /// Print the symbol table after a successful build
    #[arg(short, long)]
    pub list: bool,

    /// Enable verbose output (traces every assembled line)
    #[arg(short, long)]
    pub verbose: bool,

    /// Write a symbol file (<output>.sym) alongside the image
    #[arg(short, long)]
    pub write_sym: bool,
}

lazy_static! {
    pub static ref ARGS: Args = if cfg!(test) {
        // manually set parameters for running tests
        Args::parse_from(["test", "-", "--output", "-"])
    } else {
        Args::parse()
    };
}

pub fn to_stdout() -> bool { ARGS.output == "-" }
