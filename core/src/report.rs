//! Tagged status output shared by every script.

use crate::{ErrorKind, Result};
use colored::Colorize;
use std::fmt;
use std::io::{self, IsTerminal, Write};

/// Fixed prefix of a status line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Tag {
    Ok,
    Error,
    Warn,
    Info,
}

impl Tag {
    pub fn label(self) -> &'static str {
        match self {
            Tag::Ok => "[OK]",
            Tag::Error => "[ERROR]",
            Tag::Warn => "[WARN]",
            Tag::Info => "[INFO]",
        }
    }

    /// Recognise the tag a line starts with, if any.
    pub fn parse_line(line: &str) -> Option<(Tag, &str)> {
        [Tag::Ok, Tag::Error, Tag::Warn, Tag::Info]
            .into_iter()
            .find_map(|tag| {
                line.strip_prefix(tag.label())
                    .map(|rest| (tag, rest.trim_start()))
            })
    }

    fn painted(self) -> String {
        let label = self.label();
        match self {
            Tag::Ok => label.green().bold().to_string(),
            Tag::Error => label.red().bold().to_string(),
            Tag::Warn => label.yellow().bold().to_string(),
            Tag::Info => label.cyan().to_string(),
        }
    }
}

/// The status line a finished script printed last, if its output ends in one.
pub fn final_status(stdout: &str) -> Option<(Tag, &str)> {
    let last = stdout.lines().rev().find(|line| !line.trim().is_empty())?;
    Tag::parse_line(last.trim_end())
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Final status of a handler that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub tag: Tag,
    pub message: String,
}

impl Outcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            tag: Tag::Ok,
            message: message.into(),
        }
    }

    /// A success with nothing to show, e.g. an empty history database.
    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            tag: Tag::Warn,
            message: message.into(),
        }
    }
}

/// Write one line. A reader that went away (`mdtable big.csv | head -1`)
/// must not turn into a panic, so write errors are dropped.
fn write_line(out: &mut impl Write, text: &str) {
    if let Err(err) = writeln!(out, "{text}").and_then(|()| out.flush()) {
        if err.kind() != io::ErrorKind::BrokenPipe {
            tracing::debug!(%err, "dropped output line");
        }
    }
}

enum Sink {
    Stdout,
    Capture {
        out: Vec<String>,
        err: Vec<String>,
    },
}

/// Writes status lines and payload either to the terminal or to memory.
pub struct Reporter {
    sink: Sink,
    color: bool,
}

impl Reporter {
    /// Reporter for a real process; colour only on an interactive terminal.
    pub fn stdout() -> Self {
        let color = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self {
            sink: Sink::Stdout,
            color,
        }
    }

    /// Reporter that keeps everything in memory.
    pub fn capture() -> Self {
        Self {
            sink: Sink::Capture {
                out: Vec::new(),
                err: Vec::new(),
            },
            color: false,
        }
    }

    pub fn info(&mut self, message: impl AsRef<str>) {
        self.status(Tag::Info, message.as_ref());
    }

    pub fn warn(&mut self, message: impl AsRef<str>) {
        self.status(Tag::Warn, message.as_ref());
    }

    /// Untagged payload such as a rendered table or a JSON document.
    pub fn raw(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref().trim_end_matches('\n');
        match &mut self.sink {
            Sink::Stdout => write_line(&mut io::stdout().lock(), text),
            Sink::Capture { out, .. } => out.extend(text.lines().map(str::to_owned)),
        }
    }

    /// Diagnostics that accompany an error; go to stderr.
    pub fn detail(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref().trim_end_matches('\n');
        match &mut self.sink {
            Sink::Stdout => write_line(&mut io::stderr().lock(), text),
            Sink::Capture { err, .. } => err.extend(text.lines().map(str::to_owned)),
        }
    }

    /// Print the single final status line and return the exit code.
    pub fn finish(&mut self, result: Result<Outcome>) -> i32 {
        match result {
            Ok(outcome) => {
                self.status(outcome.tag, &outcome.message);
                0
            }
            Err(err) => {
                tracing::debug!(?err, "script failed");
                self.status(Tag::Error, &err.to_string());
                err.kind().exit_code()
            }
        }
    }

    /// Report a failed argument parse. Help and version requests succeed.
    pub fn usage(&mut self, err: clap::Error) -> i32 {
        use clap::error::ErrorKind as ClapKind;

        let rendered = err.render().to_string();
        match err.kind() {
            ClapKind::DisplayHelp | ClapKind::DisplayVersion => {
                self.raw(rendered);
                0
            }
            ClapKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                self.detail(rendered);
                self.status(Tag::Error, "A subcommand or argument is required");
                ErrorKind::Invocation.exit_code()
            }
            _ => {
                let mut lines = rendered.lines();
                let headline = lines
                    .next()
                    .unwrap_or_default()
                    .trim_start_matches("error:")
                    .trim();
                self.status(Tag::Error, headline);
                let rest: Vec<&str> = lines.skip_while(|line| line.trim().is_empty()).collect();
                if !rest.is_empty() {
                    self.detail(rest.join("\n"));
                }
                ErrorKind::Invocation.exit_code()
            }
        }
    }

    /// Captured stdout lines; empty for a terminal reporter.
    pub fn lines(&self) -> &[String] {
        match &self.sink {
            Sink::Stdout => &[],
            Sink::Capture { out, .. } => out,
        }
    }

    /// Captured stderr lines; empty for a terminal reporter.
    pub fn diagnostics(&self) -> &[String] {
        match &self.sink {
            Sink::Stdout => &[],
            Sink::Capture { err, .. } => err,
        }
    }

    /// Captured lines carrying the given tag.
    pub fn tagged(&self, tag: Tag) -> Vec<&str> {
        self.lines()
            .iter()
            .filter_map(|line| match Tag::parse_line(line) {
                Some((found, rest)) if found == tag => Some(rest),
                _ => None,
            })
            .collect()
    }

    fn status(&mut self, tag: Tag, message: &str) {
        let label = if self.color {
            tag.painted()
        } else {
            tag.label().to_string()
        };
        let line = format!("{label} {message}");
        match &mut self.sink {
            Sink::Stdout => write_line(&mut io::stdout().lock(), &line),
            Sink::Capture { out, .. } => out.push(line),
        }
    }
}
