#![allow(unused_macros, dead_code)]
// All console diagnostics go to stderr because stdout may be carrying the assembled image.
macro_rules! verbose_println {
    ($($p:expr),+) => {
        if config::ARGS.verbose {
            eprintln!($($p),+);
        }
    }
}
macro_rules! info {
    ($($p:expr),+) => {
        eprintln!(concat!(blue!("INFO"),": {}"),format_args!($($p),+))
    }
}

macro_rules! warn {
    ($($p:expr),+) => {
        eprintln!(concat!(yellow!("WARNING"),": {}"),format_args!($($p),+))
    }
}
macro_rules! line_err {
    ($line:expr, $kind:expr, $msg:expr) => {
        crate::Error::new($kind, Some($line), format!("{}", $msg).as_str())
    };
}
macro_rules! parse_err {
    ($($msg:expr),+) => {
        crate::Error::new(
            crate::ErrorKind::Parse,
            None,
            format!("{} {}", red!("Parse Error"), format!($($msg),+)).as_str(),
        )
    };
}
macro_rules! arity_err {
    ($($msg:expr),+) => {
        crate::Error::new(
            crate::ErrorKind::Arity,
            None,
            format!("{} {}", red!("Arity Error"), format!($($msg),+)).as_str(),
        )
    };
}
macro_rules! encoding_err {
    ($($msg:expr),+) => {
        crate::Error::new(
            crate::ErrorKind::Encoding,
            None,
            format!("{} {}", red!("Encoding Error"), format!($($msg),+)).as_str(),
        )
    };
}
macro_rules! overflow_err {
    ($($msg:expr),+) => {
        crate::Error::new(
            crate::ErrorKind::Overflow,
            None,
            format!("{} {}", red!("Overflow Error"), format!($($msg),+)).as_str(),
        )
    };
}
macro_rules! unresolved_err {
    ($line:expr, $sym:expr) => {
        crate::Error::new(
            crate::ErrorKind::UnresolvedSymbol,
            $line,
            format!("{} \"{}\"", red!("Unresolved Symbol"), $sym).as_str(),
        )
    };
}
macro_rules! color {
    ($color: literal, $msg: expr) => {
        concat!("\x1b[", $color, "m", $msg, "\x1b[0m")
    };
}
macro_rules! red {
    ($msg:expr) => {
        color!(91, $msg)
    };
}
macro_rules! green {
    ($msg:expr) => {
        color!(92, $msg)
    };
}
macro_rules! yellow {
    ($msg:expr) => {
        color!(93, $msg)
    };
}
macro_rules! blue {
    ($msg:expr) => {
        color!(94, $msg)
    };
}
