//! Interactive prompts

use console::Term;
use std::io;

/// Ask a yes/no question on the terminal
///
/// Returns `default` without asking when stderr is not a terminal, so
/// scripted runs never block on input.
pub fn confirm(prompt: &str, default: bool) -> io::Result<bool> {
    let term = Term::stderr();
    if !term.is_term() {
        return Ok(default);
    }

    let hint = if default { "[Y/n]" } else { "[y/N]" };
    loop {
        term.write_str(&format!("{prompt} {hint} "))?;
        let line = term.read_line()?;
        match parse_answer(&line, default) {
            Some(answer) => return Ok(answer),
            None => term.write_line("Please answer y or n.")?,
        }
    }
}

/// Interpret a typed answer; `None` means it was not understood
pub fn parse_answer(input: &str, default: bool) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}
