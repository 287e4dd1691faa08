//! Interactive input.
//!
//! [`LineInput`] is what the chat loop reads from.  [`ReadlineInput`] backs it
//! with `rustyline` for the terminal; tests substitute scripted input.  The
//! credential prompt goes through `dialoguer` so the secret is never echoed.

use dialoguer::Password;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::error::{Error, Result};
use crate::render::Renderer;

/// Default minimum length for validated prompts and secrets.
pub const DEFAULT_MIN_LENGTH: usize = 3;

/// Default maximum length for validated prompts.
pub const DEFAULT_MAX_LENGTH: usize = 200;

/// One result of reading a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A line of text, without its newline.
    Line(String),
    /// The user pressed Ctrl+C at the prompt.
    Interrupted,
    /// The input was closed (Ctrl+D).
    Eof,
}

/// A source of lines for the chat loop.
pub trait LineInput {
    /// Shows `prompt` and reads one line.
    fn read_line(&mut self, prompt: &str) -> Result<InputEvent>;
}

/// Line input backed by a `rustyline` editor with in-memory history.
pub struct ReadlineInput {
    editor: DefaultEditor,
}

impl ReadlineInput {
    /// Creates a new editor on the controlling terminal.
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().map_err(readline_error)?;
        Ok(Self { editor })
    }
}

impl LineInput for ReadlineInput {
    fn read_line(&mut self, prompt: &str) -> Result<InputEvent> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(InputEvent::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(InputEvent::Interrupted),
            Err(ReadlineError::Eof) => Ok(InputEvent::Eof),
            Err(err) => Err(readline_error(err)),
        }
    }
}

fn readline_error(err: ReadlineError) -> Error {
    match err {
        ReadlineError::Io(err) => Error::io("failed to read input", err),
        other => Error::io(
            "failed to read input",
            std::io::Error::other(other.to_string()),
        ),
    }
}

/// Checks that the trimmed `value` has between `min` and `max` characters.
///
/// A `max` below `min` is raised to `min`.  Returns the trimmed value, or the
/// message to show before asking again.
pub fn validate_length(value: &str, min: usize, max: usize) -> std::result::Result<String, String> {
    let max = max.max(min);
    let value = value.trim();
    let length = value.chars().count();
    if length < min {
        Err(format!("Value too short (min {min})"))
    } else if length > max {
        Err(format!("Value too long (max {max})"))
    } else {
        Ok(value.to_string())
    }
}

/// Reads a trimmed line whose length lies in `min..=max`, asking again until it does.
///
/// # Errors
///
/// Returns [`Error::Cancelled`] if the user interrupts or closes the input.
pub fn read_validated(
    input: &mut dyn LineInput,
    renderer: &mut dyn Renderer,
    prompt: &str,
    min: usize,
    max: usize,
) -> Result<String> {
    loop {
        match input.read_line(prompt)? {
            InputEvent::Line(line) => match validate_length(&line, min, max) {
                Ok(value) => return Ok(value),
                Err(message) => renderer.display_error(&message),
            },
            InputEvent::Interrupted | InputEvent::Eof => {
                return Err(Error::cancelled("input closed during setup"));
            }
        }
    }
}

/// Reads a secret without echoing it, asking again until it is long enough.
///
/// # Errors
///
/// Returns an I/O error if the terminal cannot be read.
pub fn read_secret(renderer: &mut dyn Renderer, prompt: &str) -> Result<String> {
    loop {
        let secret = Password::new()
            .with_prompt(prompt)
            .interact()
            .map_err(|err| {
                Error::io(
                    "failed to read secret",
                    std::io::Error::other(err.to_string()),
                )
            })?;
        match validate_length(&secret, DEFAULT_MIN_LENGTH, usize::MAX) {
            Ok(secret) => return Ok(secret),
            Err(message) => renderer.display_error(&message),
        }
    }
}
