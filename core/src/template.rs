//! The CLI script template: parse arguments, dispatch to the handler,
//! report the outcome. Every utility binary is one [`Script`] driven by
//! [`main`].

use crate::report::{Outcome, Reporter};
use crate::runner::{CommandRunner, ProcessRunner};
use crate::{logging, Config, Result};
use std::ffi::OsString;
use std::process::ExitCode;

/// Everything a handler may touch while it runs.
pub struct Context {
    pub reporter: Reporter,
    pub config: Config,
    pub runner: Box<dyn CommandRunner>,
}

impl Context {
    pub fn new(reporter: Reporter, config: Config, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            reporter,
            config,
            runner,
        }
    }

    /// In-memory context for tests and embedding.
    pub fn capture(config: Config, runner: impl CommandRunner + 'static) -> Self {
        Self::new(Reporter::capture(), config, Box::new(runner))
    }
}

/// A single-purpose utility.
pub trait Script: clap::Parser {
    /// Checks clap cannot express declaratively. Runs before any effect.
    fn validate(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }

    /// Perform the one external effect and describe how it went.
    fn run(self, ctx: &mut Context) -> Result<Outcome>;
}

/// Parse `argv` into a script. `Err` carries the exit code already reported.
pub fn parse<S, I, T>(argv: I, reporter: &mut Reporter) -> std::result::Result<S, i32>
where
    S: Script,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    S::try_parse_from(argv).map_err(|err| reporter.usage(err))
}

/// Validate, run and report a parsed script.
pub fn execute<S: Script>(script: S, ctx: &mut Context) -> i32 {
    let result = script.validate(ctx).and_then(|()| script.run(ctx));
    ctx.reporter.finish(result)
}

/// Parse and execute against an existing context.
pub fn run_with<S, I, T>(argv: I, ctx: &mut Context) -> i32
where
    S: Script,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match parse::<S, _, _>(argv, &mut ctx.reporter) {
        Ok(script) => execute(script, ctx),
        Err(code) => code,
    }
}

/// Process entry point shared by every utility binary.
pub fn main<S: Script>() -> ExitCode {
    logging::init();

    let mut reporter = Reporter::stdout();
    let script = match parse::<S, _, _>(std::env::args_os(), &mut reporter) {
        Ok(script) => script,
        Err(code) => return exit(code),
    };
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => return exit(reporter.finish(Err(err))),
    };

    let mut ctx = Context::new(reporter, config, Box::new(ProcessRunner::new()));
    exit(execute(script, &mut ctx))
}

fn exit(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
