//! Terminal output for human readers.
//!
//! Progress goes to stdout and is suppressed in quiet mode; errors go to stderr. Logging is
//! separate and never written here.

use colored::Colorize;
use std::io::{self, Write};

/// Colored terminal output.
#[derive(Debug, Clone)]
pub struct OutputManager {
    quiet: bool,
}

impl OutputManager {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    fn out(&self, line: impl std::fmt::Display) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(io::stdout().lock(), "{}", line)
    }

    /// Print section header
    pub fn section(&self, title: &str) -> io::Result<()> {
        self.out(format!("==> {}", title).bold())
    }

    /// Print progress message
    pub fn progress(&self, message: &str) -> io::Result<()> {
        self.out(format!("{} {}", "•".cyan(), message))
    }

    /// Print success message
    pub fn success(&self, message: &str) -> io::Result<()> {
        self.out(format!("{} {}", "✓".green().bold(), message))
    }

    /// Print warning message
    pub fn warn(&self, message: &str) -> io::Result<()> {
        self.out(format!("{} {}", "warning:".yellow().bold(), message))
    }

    /// Print indented text
    pub fn indent(&self, message: &str) -> io::Result<()> {
        self.out(format!("    {}", message))
    }

    /// Print an error to stderr, regardless of quiet mode
    pub fn error(&self, message: &str) -> io::Result<()> {
        writeln!(io::stderr().lock(), "{} {}", "Error:".red().bold(), message)
    }

    /// Print a GitHub Actions workflow command (`::warning::...`), regardless of quiet mode
    pub fn annotation(&self, level: &str, title: &str, message: &str) -> io::Result<()> {
        let message = message.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A");
        writeln!(io::stdout().lock(), "::{} title={}::{}", level, title, message)
    }

    /// Print a raw line to stdout, regardless of quiet mode
    pub fn line(&self, line: &str) -> io::Result<()> {
        writeln!(io::stdout().lock(), "{}", line)
    }
}
