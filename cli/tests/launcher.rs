//! The `scriptkit` launcher against the real utility binaries.

mod common;

use common::{bin, count_tagged, workspace};
use predicates::prelude::*;
use std::fs;

#[test]
fn lists_modules() {
    let dir = workspace();
    bin("scriptkit", dir.path())
        .arg("--list-modules")
        .assert()
        .success()
        .stdout(predicate::str::contains("File Tools:"))
        .stdout(predicate::str::contains("weather-alert"))
        .stdout(predicate::str::contains("[OK] 12 module(s) available"));
}

#[test]
fn generated_manifests_are_listed() {
    let dir = workspace();
    let module = dir.path().join("modules/word-count");
    fs::create_dir_all(&module).unwrap();
    fs::write(
        module.join("module.toml"),
        "name = \"Word Count\"\ndescription = \"Count words\"\ncategory = \"Generated\"\n",
    )
    .unwrap();

    bin("scriptkit", dir.path())
        .args(["--list-modules", "--modules-dir", "modules"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated:"))
        .stdout(predicate::str::contains("word-count"))
        .stdout(predicate::str::contains("[OK] 13 module(s) available"));
}

#[test]
fn config_flag_overrides_a_broken_config_env() {
    let dir = workspace();
    fs::write(dir.path().join("broken.toml"), "http_timeout_secs = \"soon\"").unwrap();
    fs::write(dir.path().join("good.toml"), "modules_dir = \"mods\"\n").unwrap();
    let module = dir.path().join("mods/word-count");
    fs::create_dir_all(&module).unwrap();
    fs::write(
        module.join("module.toml"),
        "name = \"Word Count\"\ndescription = \"Count words\"\ncategory = \"Generated\"\n",
    )
    .unwrap();

    bin("scriptkit", dir.path())
        .env("SCRIPTKIT_CONFIG", "broken.toml")
        .args(["--config", "good.toml", "--list-modules"])
        .assert()
        .success()
        .stdout(predicate::str::contains("word-count"))
        .stdout(predicate::str::contains("[OK] 13 module(s) available"));
}

#[test]
fn runs_a_module_and_mirrors_success() {
    let dir = workspace();
    fs::write(dir.path().join("t.json"), r#"[{"k": "v"}]"#).unwrap();

    let output = bin("scriptkit", dir.path())
        .args(["--run", "mdtable", "t.json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("| k |"));
    assert_eq!(count_tagged(&output.stdout, "[OK]"), 1);
}

#[test]
fn mirrors_module_failure_kind() {
    let dir = workspace();

    let output = bin("scriptkit", dir.path())
        .args(["--run", "mdtable", "t.xlsx"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(count_tagged(&output.stdout, "[ERROR]"), 1);

    let output = bin("scriptkit", dir.path())
        .args(["--run", "mdtable", "absent.csv"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(count_tagged(&output.stdout, "[ERROR]"), 1);
}

#[test]
fn nothing_to_do_is_an_invocation_error() {
    let dir = workspace();
    bin("scriptkit", dir.path())
        .assert()
        .code(2)
        .stdout(predicate::str::contains("[ERROR] Nothing to do"));
}
