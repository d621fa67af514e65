//! Interactive operator confirmation

use crate::Result;
use std::io::{self, BufRead, Write};

pub trait Prompter {
    /// Ask a yes/no question; only an answer starting with `y` means yes
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Prompts on stdout and reads the answer from stdin
#[derive(Debug, Clone, Default)]
pub struct StdinPrompter;

impl StdinPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for StdinPrompter {
    fn confirm(&self, question: &str) -> Result<bool> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", question)?;
        stdout.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(is_yes(&answer))
    }
}

pub(crate) fn is_yes(answer: &str) -> bool {
    answer.trim().to_lowercase().starts_with('y')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes("Yes"));
        assert!(is_yes("  yep"));
        assert!(!is_yes(""));
        assert!(!is_yes("\n"));
        assert!(!is_yes("n"));
        assert!(!is_yes("sure"));
    }
}
