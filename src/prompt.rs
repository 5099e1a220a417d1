use std::io::{self, BufRead, Write};

use crate::error::DasError;
use crate::sync::Confirm;

/// Asks on the terminal: prompt on stdout, answer from stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePrompt;

impl Confirm for ConsolePrompt {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, DasError> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        ask(&mut input, &mut output, prompt, default).map_err(|err| DasError::Prompt(err.to_string()))
    }
}

/// Answers every question the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&self, _prompt: &str, _default: bool) -> Result<bool, DasError> {
        Ok(self.0)
    }
}

/// Takes the default answer without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptDefaults;

impl Confirm for AcceptDefaults {
    fn confirm(&self, _prompt: &str, default: bool) -> Result<bool, DasError> {
        Ok(default)
    }
}

pub fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    default: bool,
) -> io::Result<bool> {
    let choices = if default { "[y]|n" } else { "[n]|y" };
    loop {
        write!(output, "{prompt} {choices}: ")?;
        output.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no answer on standard input",
            ));
        }
        match line.trim_end_matches(['\r', '\n']) {
            "" => return Ok(default),
            "y" | "Y" => return Ok(true),
            "n" | "N" => return Ok(false),
            _ => writeln!(output, "please enter y or n.")?,
        }
    }
}
