//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction that allows
//! for different output styles.  The default implementation writes to stdout
//! and optionally uses ANSI escape codes for the banner, prompts and errors.

use std::io::{self, Stdout, Write};

use crate::types::UsageStats;

/// ANSI escape code for bold text.
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text (used for usage statistics).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for red text (used for errors and the banner).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape sequence that clears the screen and homes the cursor.
const ANSI_CLEAR: &str = "\x1b[2J\x1b[H";

/// Title printed by [`Renderer::write_header`].
const BANNER_TITLE: &str = "GitHub Models Chat";

/// Trait for rendering chat output.
///
/// The chat session only writes through this trait, which keeps terminal
/// styling out of the conversation logic and lets tests record output.
pub trait Renderer: Send {
    /// Print the application banner, clearing the screen first if asked.
    fn write_header(&mut self, clear_screen: bool);

    /// Print the label that introduces a streamed reply.
    fn write_assistant_header(&mut self);

    /// Print a chunk of response text.
    ///
    /// This is called incrementally as fragments are streamed from the API.
    fn write_fragment(&mut self, text: &str);

    /// Print an error message.
    fn display_error(&mut self, error: &str);

    /// Print token usage for the last exchange.
    fn display_usage(&mut self, usage: &UsageStats);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when a response is complete.
    fn finish_response(&mut self) {}
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn styled(&self, style: &str, text: &str) -> String {
        if self.use_color {
            format!("{style}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn write_header(&mut self, clear_screen: bool) {
        if clear_screen && self.use_color {
            print!("{ANSI_CLEAR}");
        }
        let rule = "=".repeat(BANNER_TITLE.len() + 4);
        println!("{}", self.styled(ANSI_RED, &rule));
        println!(
            "{}",
            self.styled(&format!("{ANSI_BOLD}{ANSI_RED}"), &format!("  {BANNER_TITLE}"))
        );
        println!("{}", self.styled(ANSI_RED, &rule));
        println!();
        self.flush();
    }

    fn write_assistant_header(&mut self) {
        println!("\n{}", self.styled(ANSI_BOLD, "AI:"));
        self.flush();
    }

    fn write_fragment(&mut self, text: &str) {
        print!("{text}");
        self.flush();
    }

    fn display_error(&mut self, error: &str) {
        eprintln!("\n{}", self.styled(ANSI_RED, error));
    }

    fn display_usage(&mut self, usage: &UsageStats) {
        println!();
        for line in usage_lines(usage) {
            println!("{}", self.styled(ANSI_DIM, &line));
        }
        println!();
        self.flush();
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
        self.flush();
    }

    fn finish_response(&mut self) {
        println!();
        self.flush();
    }
}

/// The lines printed for a usage report.
pub fn usage_lines(usage: &UsageStats) -> Vec<String> {
    vec![
        "--- Usage ---".to_string(),
        format!("Prompt Tokens: {}", group_thousands(usage.prompt_tokens.into())),
        format!(
            "Completion Tokens: {}",
            group_thousands(usage.completion_tokens.into())
        ),
        format!("Total Tokens: {}", group_thousands(usage.total_tokens.into())),
    ]
}

/// Formats `n` with comma thousands separators.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
