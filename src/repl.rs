//! Interactive stdin mode: one logical line in, one preprocessed line out,
//! sharing a single macro table and conditional stack across the session.

use std::io::{self, Write};

use fpx_core::clock::Clock;
use fpx_core::paths::PathResolver;
use fpx_core::{Config, Driver, PpError};

const BANNER: &str = "fpx interactive mode -- type `quit` or an empty line to exit";

pub fn run(cfg: Config, diag: &dyn fpx_core::diag::Diagnostics, clock: &dyn Clock, paths: &dyn PathResolver) -> io::Result<()> {
    println!("{BANNER}");
    let mut driver = Driver::new(cfg, diag, clock, paths);
    let stdin = io::stdin();

    loop {
        print!("[in] ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("quit") {
            break;
        }

        let mut out = Vec::new();
        match driver.run(format!("{trimmed}\n").as_bytes(), "<stdin>", &mut out, &mut io::stdout()) {
            Ok(()) => {
                print!("[out] {}", String::from_utf8_lossy(&out));
                io::stdout().flush()?;
            }
            Err(PpError::Fatal(msg)) => {
                println!("[error] {msg}");
                break;
            }
            Err(PpError::Io(e)) => return Err(e),
        }
    }
    Ok(())
}
