use clap::{Parser, ValueEnum};
use std::process::{Command, ExitCode};

#[derive(Debug, Parser)]
#[command(about = "Utility tasks for developing the scriptkit workspace")]
struct Xtask {
    /// Task to run
    #[arg(value_enum)]
    task: Task,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Task {
    /// cargo fmt over the whole workspace
    Format,
    /// Build every binary
    Build,
    /// Formatting check plus clippy with warnings denied
    Check,
    /// Run the test suite
    Test,
}

impl Task {
    fn steps(self) -> Vec<Vec<&'static str>> {
        match self {
            Task::Format => vec![vec!["fmt", "--all"]],
            Task::Build => vec![vec!["build", "--workspace", "--bins"]],
            Task::Check => vec![
                vec!["fmt", "--all", "--check"],
                vec!["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
            ],
            Task::Test => vec![vec!["test", "--workspace"]],
        }
    }
}

fn main() -> ExitCode {
    let cli = Xtask::parse();
    let cargo = std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string());

    for args in cli.task.steps() {
        println!("[INFO] {cargo} {}", args.join(" "));
        match Command::new(&cargo).args(&args).status() {
            Ok(status) if status.success() => {}
            Ok(status) => {
                println!("[ERROR] cargo {} failed ({status})", args[0]);
                return ExitCode::from(1);
            }
            Err(err) => {
                println!("[ERROR] cannot run {cargo}: {err}");
                return ExitCode::from(1);
            }
        }
    }
    println!("[OK] {:?} finished", cli.task);
    ExitCode::SUCCESS
}
