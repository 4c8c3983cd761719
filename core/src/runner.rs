//! Command runner abstractions.

use crate::{Error, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::process::Command;
use std::rc::Rc;

/// Captured result of one external program run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Pass successful output through, turn anything else into an error.
    pub fn check(self, program: &str) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        let last = self
            .stderr
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .map(|line| line.trim().to_string());
        let message = match (last, self.status) {
            (Some(line), _) => line,
            (None, Some(code)) => format!("exited with status {code}"),
            (None, None) => "terminated by signal".to_string(),
        };
        Err(Error::Command {
            program: program.to_string(),
            message,
        })
    }
}

/// Trait describing how scripts execute external programs.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// Runs programs as real child processes and captures their output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        tracing::debug!(program, ?args, "spawning");
        let output = Command::new(program).args(args).output().map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                Error::MissingTool(program.to_string())
            } else {
                Error::Io(err)
            }
        })?;
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// One call seen by a [`RecordingRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Debug, Default)]
struct Recording {
    calls: Vec<Invocation>,
    replies: VecDeque<Result<CommandOutput>>,
}

/// Runner that records every call and replays queued replies instead of
/// spawning anything. Clones share the same recording.
///
/// With no reply queued a call succeeds with empty output.
#[derive(Debug, Default, Clone)]
pub struct RecordingRunner {
    inner: Rc<RefCell<Recording>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply with the given stdout.
    pub fn reply_ok(&self, stdout: impl Into<String>) -> &Self {
        self.reply(Ok(CommandOutput {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }))
    }

    /// Queue a reply with a non-zero exit status.
    pub fn reply_status(&self, status: i32, stderr: impl Into<String>) -> &Self {
        self.reply(Ok(CommandOutput {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }))
    }

    pub fn reply(&self, reply: Result<CommandOutput>) -> &Self {
        self.inner.borrow_mut().replies.push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.inner.borrow().calls.clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(Invocation {
            program: program.to_string(),
            args: args.to_vec(),
        });
        inner.replies.pop_front().unwrap_or_else(|| {
            Ok(CommandOutput {
                status: Some(0),
                ..CommandOutput::default()
            })
        })
    }
}
