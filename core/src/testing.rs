//! Fake collaborators for unit tests

use crate::exec::{CommandLine, CommandOutput, CommandRunner};
use crate::prompt::Prompter;
use crate::{Error, Result};
use std::cell::RefCell;
use std::collections::VecDeque;

/// Records every command instead of running it. Commands whose display form
/// contains a registered pattern exit with status 1.
#[derive(Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<CommandLine>>,
    failing: Vec<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(pattern: &str) -> Self {
        Self {
            calls: RefCell::default(),
            failing: vec![pattern.to_string()],
        }
    }

    pub fn calls(&self) -> Vec<CommandLine> {
        self.calls.borrow().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(CommandLine::display).collect()
    }

    pub fn count_matching(&self, pattern: &str) -> usize {
        self.commands().iter().filter(|c| c.contains(pattern)).count()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, cmd: &CommandLine) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(cmd.clone());
        let display = cmd.display();
        let exit_code = if self.failing.iter().any(|p| display.contains(p.as_str())) {
            1
        } else {
            0
        };
        Ok(CommandOutput {
            exit_code,
            stdout: String::new(),
            stderr: if exit_code == 0 {
                String::new()
            } else {
                "simulated failure".to_string()
            },
        })
    }
}

/// Answers confirmation prompts from a script and records the questions
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: RefCell<VecDeque<bool>>,
    questions: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: RefCell::new(answers.iter().copied().collect()),
            questions: RefCell::default(),
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.borrow().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, question: &str) -> Result<bool> {
        self.questions.borrow_mut().push(question.to_string());
        self.answers
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| Error::validation(format!("unexpected prompt: {}", question)))
    }
}
