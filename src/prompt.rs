//! Confirmation prompts
//!
//! Every mutating step of a migration asks before it runs.

use crossterm::style::Stylize;
use std::io::{self, BufRead, Write};

/// Decides whether a mutating step may run
pub trait Confirm {
    fn confirm(&mut self, message: &str) -> bool;
}

/// Answers every prompt the same way (`--yes`, or `false` for a dry run)
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&mut self, message: &str) -> bool {
        tracing::debug!("auto-answering '{}' with {}", message, self.0);
        self.0
    }
}

/// Asks on the terminal. Default is No.
pub struct StdinConfirm<R, W> {
    input: R,
    output: W,
}

impl StdinConfirm<io::StdinLock<'static>, io::Stderr> {
    pub fn new() -> Self {
        Self {
            input: io::stdin().lock(),
            output: io::stderr(),
        }
    }
}

impl Default for StdinConfirm<io::StdinLock<'static>, io::Stderr> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: BufRead, W: Write> StdinConfirm<R, W> {
    pub fn with_io(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for StdinConfirm<R, W> {
    fn confirm(&mut self, message: &str) -> bool {
        if write!(self.output, "{} {} ", message.bold(), "(y/N):".dark_grey()).is_err() {
            return false;
        }
        let _ = self.output.flush();

        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        }
    }
}
