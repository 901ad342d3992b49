//! Output rendering abstraction for revue.
//!
//! Defines the [`Renderer`] trait that decouples the control loop from the
//! display layer. [`StdoutRenderer`] prints to the terminal as the model
//! streams.

use colored::Colorize;
use std::io::{self, Write};

use crate::format::format_tool_outcome;
use crate::message::ToolCall;
use crate::tools::ToolResult;

/// Everything the control loop shows the human while it works.
pub trait Renderer {
    /// Render a single content fragment as it arrives.
    fn render_token(&mut self, token: &str);

    /// Called when a streamed model turn is complete.
    fn render_done(&mut self);

    /// Called once per attempted tool call, after it ran.
    fn render_tool(&mut self, call: &ToolCall, result: &ToolResult);

    /// A control-loop event worth telling the human about.
    fn render_notice(&mut self, text: &str);

    /// Called when an error occurs.
    fn render_error(&mut self, err: &str);
}

/// Renders streaming model output directly to stdout.
///
/// Each fragment is printed immediately with an explicit flush so the user
/// sees a "typing" effect.
#[derive(Default)]
pub struct StdoutRenderer {
    fragments: usize,
}

impl StdoutRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for StdoutRenderer {
    fn render_token(&mut self, token: &str) {
        if self.fragments == 0 {
            print!("{} ", "revue:".cyan().bold());
        }
        print!("{}", token);
        // Flush immediately so each fragment appears as it arrives
        io::stdout().flush().ok();
        self.fragments += 1;
    }

    fn render_done(&mut self) {
        if self.fragments > 0 {
            println!();
            println!();
        }
        self.fragments = 0;
    }

    fn render_tool(&mut self, call: &ToolCall, result: &ToolResult) {
        println!("{}", format_tool_outcome(call, result));
    }

    fn render_notice(&mut self, text: &str) {
        println!("{}", text.dimmed());
    }

    fn render_error(&mut self, err: &str) {
        eprintln!();
        eprintln!("{} {}", "error:".red().bold(), err);
    }
}

/// Collects everything rendered, for assertions.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingRenderer {
    pub text: String,
    pub turns: usize,
    pub tools: Vec<(String, bool)>,
    pub notices: Vec<String>,
    pub errors: Vec<String>,
}

#[cfg(test)]
impl Renderer for RecordingRenderer {
    fn render_token(&mut self, token: &str) {
        self.text.push_str(token);
    }

    fn render_done(&mut self) {
        self.turns += 1;
    }

    fn render_tool(&mut self, call: &ToolCall, result: &ToolResult) {
        self.tools.push((call.name().to_string(), result.is_ok()));
    }

    fn render_notice(&mut self, text: &str) {
        self.notices.push(text.to_string());
    }

    fn render_error(&mut self, err: &str) {
        self.errors.push(err.to_string());
    }
}
