//! Terminal styling for command output.

use colored::{ColoredString, Colorize};

/// Width of [`Theme::rule`] lines.
const RULE_WIDTH: usize = 60;

/// Styling helpers shared by every command.
pub(crate) struct Theme;

impl Theme {
    /// A section title.
    pub(crate) fn header(text: &str) -> ColoredString {
        text.bold().cyan()
    }

    /// A completed action.
    pub(crate) fn ok(text: &str) -> String {
        format!("{} {text}", "✓".green().bold())
    }

    /// A fatal error.
    pub(crate) fn fail(text: &str) -> String {
        format!("{} {}", "✗".red().bold(), text.red())
    }

    /// Something the user should look at.
    pub(crate) fn warn(text: &str) -> String {
        format!("{} {}", "!".yellow().bold(), text.yellow())
    }

    /// Neutral status.
    pub(crate) fn note(text: &str) -> String {
        format!("{} {text}", "·".blue())
    }

    /// Secondary detail such as paths.
    pub(crate) fn muted(text: &str) -> ColoredString {
        text.dimmed()
    }

    /// A horizontal rule under a header.
    pub(crate) fn rule() -> ColoredString {
        "─".repeat(RULE_WIDTH).dimmed()
    }

    /// A plugin identity: archive hashes in cyan, local ones in magenta.
    pub(crate) fn identity(text: &str, local: bool) -> ColoredString {
        if local { text.magenta() } else { text.cyan() }
    }

    /// A cache directory a pass adds.
    pub(crate) fn added(text: &str) -> String {
        format!("{} {text}", "+".green().bold())
    }

    /// A cache directory a pass removes.
    pub(crate) fn removed(text: &str) -> String {
        format!("{} {}", "-".red().bold(), text.dimmed())
    }
}
