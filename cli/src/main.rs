use clap::Parser;
use scriptkit_core::config::{load_config, CONFIG_ENV};
use scriptkit_core::report::final_status;
use scriptkit_core::template::{self, Context, Script};
use scriptkit_core::{Error, ErrorKind, Outcome, Registry, Result, Tag};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Launcher for the scriptkit utilities.
///
/// Everything after the module name is passed to it untouched; put `--`
/// before the module's own flags when they clash with ours (e.g. `--help`).
#[derive(Debug, Parser)]
#[command(name = "scriptkit", version)]
struct Launcher {
    /// Path to a scriptkit config file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory holding generated module manifests.
    #[arg(long)]
    modules_dir: Option<PathBuf>,
    /// List available modules.
    #[arg(long, conflicts_with = "run")]
    list_modules: bool,
    /// Run a specific module by identifier.
    #[arg(long, value_name = "MODULE")]
    run: Option<String>,
    /// Arguments passed to the module.
    #[arg(
        value_name = "ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        requires = "run"
    )]
    args: Vec<String>,
}

impl Launcher {
    fn registry(&self, ctx: &Context) -> Registry {
        let dir = self
            .modules_dir
            .clone()
            .unwrap_or_else(|| ctx.config.modules_dir.clone());
        Registry::new(dir)
    }
}

fn list_modules(ctx: &mut Context, registry: &Registry) -> Result<Outcome> {
    let modules = registry.modules()?;
    let mut category = "";
    for module in &modules {
        if module.category != category {
            category = module.category.as_str();
            ctx.reporter.raw(format!("{category}:"));
        }
        ctx.reporter
            .raw(format!("  {:<18} {}", module.id, module.description));
    }
    Ok(Outcome::ok(format!("{} module(s) available", modules.len())))
}

/// Directory of the running executable; sibling utilities are looked up
/// there before `PATH`.
fn bin_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

fn run_module(ctx: &mut Context, registry: &Registry, id: &str, args: &[String]) -> Result<Outcome> {
    let module = registry
        .find(id)?
        .ok_or_else(|| Error::invocation(format!("Unknown module: {id} (see --list-modules)")))?;
    let program = module
        .resolve_command(bin_dir().as_deref())
        .to_string_lossy()
        .into_owned();
    tracing::info!(module = %module.id, %program, "launching module");

    let output = ctx.runner.run(&program, args)?;
    let status = final_status(&output.stdout);

    // Relay everything but the child's final status; ours replaces it.
    let mut lines: Vec<&str> = output.stdout.lines().collect();
    if status.is_some() {
        if let Some(last) = lines.iter().rposition(|line| !line.trim().is_empty()) {
            lines.truncate(last);
        }
    }
    if !lines.is_empty() {
        ctx.reporter.raw(lines.join("\n"));
    }
    if !output.stderr.trim().is_empty() {
        ctx.reporter.detail(&output.stderr);
    }

    let code = output.status;
    match (status, code) {
        (Some((Tag::Error, message)), _) | (Some((_, message)), Some(1..)) => {
            let message = format!("{}: {message}", module.id);
            if code == Some(ErrorKind::Invocation.exit_code()) {
                Err(Error::Invocation(message))
            } else {
                Err(Error::Operation(message))
            }
        }
        (Some((Tag::Warn, message)), _) => Ok(Outcome::warn(message)),
        (Some((_, message)), _) => Ok(Outcome::ok(message)),
        (None, Some(0)) => Ok(Outcome::ok(format!("{} finished", module.id))),
        (None, Some(2)) => Err(Error::invocation(format!("{} rejected its arguments", module.id))),
        (None, Some(code)) => Err(Error::operation(format!("{} exited with status {code}", module.id))),
        (None, None) => Err(Error::operation(format!("{} was terminated by a signal", module.id))),
    }
}

impl Script for Launcher {
    fn validate(&self, _ctx: &Context) -> Result<()> {
        if !self.list_modules && self.run.is_none() {
            return Err(Error::invocation(
                "Nothing to do: pass --list-modules or --run <MODULE>",
            ));
        }
        Ok(())
    }

    fn run(self, ctx: &mut Context) -> Result<Outcome> {
        if let Some(path) = &self.config {
            ctx.config = load_config(path)?;
            ctx.config.apply_env();
        }
        let registry = self.registry(ctx);
        match &self.run {
            Some(id) => run_module(ctx, &registry, id, &self.args),
            None => list_modules(ctx, &registry),
        }
    }
}

fn main() -> ExitCode {
    // `--config` must win over `$SCRIPTKIT_CONFIG` before the template loads
    // configuration. Exported, it also reaches the launched module.
    if let Ok(Launcher {
        config: Some(path), ..
    }) = Launcher::try_parse_from(std::env::args_os())
    {
        std::env::set_var(CONFIG_ENV, path);
    }
    template::main::<Launcher>()
}
