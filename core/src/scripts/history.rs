//! Markdown journal generated from recent Chrome history.

use super::{arg, require_exists};
use crate::template::{Context, Script};
use crate::{Error, Outcome, Result};
use chrono::NaiveDate;
use clap::Parser;
use serde::Deserialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Generate a markdown journal from Chrome browsing history.
#[derive(Debug, Parser)]
#[command(name = "history-journal", version)]
pub struct HistoryJournal {
    /// Path to the Chrome History database (defaults to the current user's profile)
    #[arg(short, long)]
    pub db_path: Option<PathBuf>,
    /// Output directory for the journal file
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,
    /// Maximum number of entries
    #[arg(short = 'n', long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..))]
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Visit {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Chrome's default profile history for the current user and platform.
pub fn default_history_path() -> Option<PathBuf> {
    let base = directories::BaseDirs::new()?;
    let path = if cfg!(target_os = "windows") {
        base.data_local_dir()
            .join("Google/Chrome/User Data/Default/History")
    } else if cfg!(target_os = "macos") {
        base.data_dir().join("Google/Chrome/Default/History")
    } else {
        base.config_dir().join("google-chrome/Default/History")
    };
    Some(path)
}

pub fn history_query(limit: u32) -> String {
    format!(
        "SELECT url, title, last_visit_time FROM urls ORDER BY last_visit_time DESC LIMIT {limit}"
    )
}

/// `sqlite3 -json` prints nothing at all for an empty result set.
pub fn parse_rows(stdout: &str) -> Result<Vec<Visit>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(stdout)?)
}

pub fn render_journal(date: NaiveDate, visits: &[Visit]) -> String {
    let mut out = format!("# Journal for {}\n\n", date.format("%Y-%m-%d"));
    for visit in visits {
        let title = visit
            .title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or("Untitled");
        let _ = writeln!(out, "- [{title}]({})", visit.url);
    }
    out
}

pub fn journal_path(output_dir: &Path, date: NaiveDate) -> PathBuf {
    output_dir.join(format!("journal_{}.md", date.format("%Y-%m-%d")))
}

/// Query a private copy; the browser keeps the live file locked.
fn read_history(ctx: &Context, db_path: &Path, limit: u32) -> Result<Vec<Visit>> {
    let copy = tempfile::Builder::new()
        .prefix("scriptkit-history")
        .suffix(".db")
        .tempfile()?;
    std::fs::copy(db_path, copy.path())?;

    let program = &ctx.config.tools.sqlite3;
    let args = vec![
        "-readonly".to_string(),
        "-json".to_string(),
        arg(copy.path()),
        history_query(limit),
    ];
    let output = ctx.runner.run(program, &args)?.check(program)?;
    parse_rows(&output.stdout)
}

impl Script for HistoryJournal {
    fn run(self, ctx: &mut Context) -> Result<Outcome> {
        let db_path = match self.db_path {
            Some(path) => path,
            None => default_history_path()
                .ok_or_else(|| Error::operation("cannot determine the Chrome profile directory"))?,
        };
        require_exists(&db_path)?;

        ctx.reporter.info(format!("Reading history from {}", db_path.display()));
        let visits = read_history(ctx, &db_path, self.limit)?;
        if visits.is_empty() {
            return Ok(Outcome::warn("No history entries found"));
        }

        let today = chrono::Local::now().date_naive();
        std::fs::create_dir_all(&self.output_dir)?;
        let path = journal_path(&self.output_dir, today);
        std::fs::write(&path, render_journal(today, &visits))?;

        Ok(Outcome::ok(format!(
            "Journal generated: {} ({} entries)",
            path.display(),
            visits.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Tag;
    use crate::template::run_with;
    use crate::{Config, RecordingRunner};

    #[test]
    fn renders_bullets_with_untitled_fallback() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let visits = vec![
            Visit {
                url: "https://docs.rs".into(),
                title: Some("Docs.rs".into()),
            },
            Visit {
                url: "https://example.com".into(),
                title: Some("  ".into()),
            },
            Visit {
                url: "https://blank.org".into(),
                title: None,
            },
        ];
        assert_eq!(
            render_journal(date, &visits),
            "# Journal for 2024-03-09\n\n- [Docs.rs](https://docs.rs)\n- [Untitled](https://example.com)\n- [Untitled](https://blank.org)\n"
        );
    }

    #[test]
    fn parses_sqlite_json_rows() {
        let rows = parse_rows(
            r#"[{"url":"https://a.test","title":"A","last_visit_time":13350000000000000},
{"url":"https://b.test","title":null,"last_visit_time":13340000000000000}]"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].title, None);
        assert!(parse_rows("\n").unwrap().is_empty());
    }

    fn history_db(dir: &Path) -> PathBuf {
        let db = dir.join("History");
        std::fs::write(&db, b"SQLite format 3\0").unwrap();
        db
    }

    #[test]
    fn writes_todays_journal() {
        let dir = tempfile::tempdir().unwrap();
        let db = history_db(dir.path());
        let runner = RecordingRunner::new();
        runner.reply_ok(r#"[{"url":"https://a.test","title":"A","last_visit_time":1}]"#);
        let mut ctx = Context::capture(Config::default(), runner.clone());

        let code = run_with::<HistoryJournal, _, _>(
            [
                "history-journal",
                "-d",
                db.to_str().unwrap(),
                "-o",
                dir.path().to_str().unwrap(),
                "-n",
                "5",
            ],
            &mut ctx,
        );

        assert_eq!(code, 0);
        let call = &runner.calls()[0];
        assert_eq!(call.program, "sqlite3");
        assert!(call.args.last().unwrap().ends_with("LIMIT 5"));
        assert_ne!(call.args[2], db.to_str().unwrap());

        let journal = journal_path(dir.path(), chrono::Local::now().date_naive());
        assert!(std::fs::read_to_string(journal).unwrap().contains("- [A](https://a.test)"));
        assert_eq!(ctx.reporter.tagged(Tag::Ok).len(), 1);
    }

    #[test]
    fn empty_history_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let db = history_db(dir.path());
        let runner = RecordingRunner::new();
        runner.reply_ok("");
        let mut ctx = Context::capture(Config::default(), runner);

        let code = run_with::<HistoryJournal, _, _>(
            ["history-journal", "-d", db.to_str().unwrap(), "-o", dir.path().to_str().unwrap()],
            &mut ctx,
        );

        assert_eq!(code, 0);
        assert_eq!(ctx.reporter.tagged(Tag::Warn), ["No history entries found"]);
        assert!(ctx.reporter.tagged(Tag::Ok).is_empty());
    }

    #[test]
    fn locked_or_corrupt_database_fails() {
        let dir = tempfile::tempdir().unwrap();
        let db = history_db(dir.path());
        let runner = RecordingRunner::new();
        runner.reply_status(1, "Error: file is not a database");
        let mut ctx = Context::capture(Config::default(), runner);

        let code = run_with::<HistoryJournal, _, _>(
            ["history-journal", "-d", db.to_str().unwrap()],
            &mut ctx,
        );

        assert_eq!(code, 1);
        assert_eq!(
            ctx.reporter.tagged(Tag::Error),
            ["`sqlite3` failed: Error: file is not a database"]
        );
    }

    #[test]
    fn zero_limit_is_rejected() {
        let mut ctx = Context::capture(Config::default(), RecordingRunner::new());
        assert_eq!(run_with::<HistoryJournal, _, _>(["history-journal", "-n", "0"], &mut ctx), 2);
    }
}
