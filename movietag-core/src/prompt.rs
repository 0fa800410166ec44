use crate::error::AppError;
use std::io::{self, BufRead, IsTerminal, Write};

/// Interactive questions asked while ingesting a file.
pub trait Prompt {
    fn input(&mut self, prompt: &str) -> Result<String, AppError>;

    /// Yes/no question; anything but an explicit yes counts as no.
    fn confirm(&mut self, question: &str) -> Result<bool, AppError>;
}

/// Uses dialoguer on a terminal and plain line reads when stdin is piped.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    fn attended() -> bool {
        io::stdin().is_terminal() && dialoguer::console::user_attended_stderr()
    }

    fn lines() -> LinePrompt<io::StdinLock<'static>, io::Stderr> {
        LinePrompt::new(io::stdin().lock(), io::stderr())
    }
}

impl Prompt for TerminalPrompt {
    fn input(&mut self, prompt: &str) -> Result<String, AppError> {
        if !Self::attended() {
            return Self::lines().input(prompt);
        }
        dialoguer::Input::<String>::new()
            .with_prompt(prompt)
            .interact_text()
            .map_err(|e| AppError::Prompt(e.to_string()))
    }

    fn confirm(&mut self, question: &str) -> Result<bool, AppError> {
        if !Self::attended() {
            return Self::lines().confirm(question);
        }
        dialoguer::Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
            .map_err(|e| AppError::Prompt(e.to_string()))
    }
}

/// Line-oriented prompt over any reader, e.g. answers piped on stdin.
pub struct LinePrompt<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Next line without its terminator; `None` at end of input.
    fn read_answer(&mut self) -> Result<Option<String>, AppError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn input(&mut self, prompt: &str) -> Result<String, AppError> {
        write!(self.writer, "{}: ", prompt)?;
        self.writer.flush()?;
        self.read_answer()?
            .ok_or_else(|| AppError::Prompt("unexpected end of input".to_string()))
    }

    fn confirm(&mut self, question: &str) -> Result<bool, AppError> {
        write!(self.writer, "{} (y/N)? ", question)?;
        self.writer.flush()?;
        Ok(self
            .read_answer()?
            .map(|answer| answer.starts_with(['y', 'Y']))
            .unwrap_or(false))
    }
}
