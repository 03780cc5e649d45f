//! Terminal styling for CLI output

use indicatif::ProgressStyle;
use owo_colors::{OwoColorize, Stream};
use std::fmt::Display;

/// Check mark for completed steps
pub const CHECK: &str = "✓";

/// Cross for failed steps
pub const CROSS: &str = "✘";

/// Warning sign
pub const WARN: &str = "⚠";

/// Semantic styles for CLI output, applied only when stdout supports color
pub trait Stylize {
    /// Bold, for names the operator should notice
    fn emphasis(&self) -> String;
    /// Dimmed, for secondary details
    fn muted(&self) -> String;
    /// Cyan, for branches, versions and links
    fn accent(&self) -> String;
    /// Green
    fn success(&self) -> String;
    /// Yellow
    fn warn(&self) -> String;
    /// Red
    fn error(&self) -> String;
}

impl<T: Display> Stylize for T {
    fn emphasis(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.bold())
            .to_string()
    }

    fn muted(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.dimmed())
            .to_string()
    }

    fn accent(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.cyan())
            .to_string()
    }

    fn success(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.green())
            .to_string()
    }

    fn warn(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.yellow())
            .to_string()
    }

    fn error(&self) -> String {
        self.if_supports_color(Stream::Stderr, |t| t.red())
            .to_string()
    }
}

/// Styled check mark
pub fn check() -> String {
    CHECK.success()
}

/// Styled cross
pub fn cross() -> String {
    CROSS.error()
}

/// Styled warning sign
pub fn warning() -> String {
    WARN.warn()
}

/// Style for spinners shown while waiting on the forge
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner().tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}
