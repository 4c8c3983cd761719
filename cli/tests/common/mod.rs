//! Common test utilities

use assert_cmd::Command;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// A scratch working directory with an empty `scriptkit.toml`, so runs
/// never pick up a developer's own configuration.
pub fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("scriptkit.toml"), "").unwrap();
    dir
}

/// Command for one of the workspace binaries, isolated in `dir`.
pub fn bin(name: &str, dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin(name).unwrap();
    cmd.current_dir(dir)
        .env_remove("SCRIPTKIT_CONFIG")
        .env_remove("OPENWEATHER_API_KEY")
        .env_remove("ANTHROPIC_API_KEY")
        .env("NO_COLOR", "1");
    cmd
}

/// Number of stdout lines starting with `tag`.
pub fn count_tagged(stdout: &[u8], tag: &str) -> usize {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| line.starts_with(tag))
        .count()
}
