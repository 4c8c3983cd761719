//! Meeting notes from a recorded audio file, transcribed by whisper.cpp.

use super::{arg, preview, require_exists};
use crate::template::{Context, Script};
use crate::{Error, Outcome, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

/// Transcribe a meeting recording into a notes file.
#[derive(Debug, Parser)]
#[command(name = "meeting-notes", version)]
pub struct MeetingNotes {
    /// Recording to transcribe (16 kHz WAV works everywhere)
    pub audio: PathBuf,
    /// Output text file
    #[arg(short, long, default_value = "meeting_notes.txt")]
    pub output: PathBuf,
    /// Speech model file (defaults to `[meeting] model` in the config)
    #[arg(short, long)]
    pub model: Option<PathBuf>,
    /// Spoken language code, or `auto`
    #[arg(short, long)]
    pub language: Option<String>,
}

pub fn whisper_args(model: &Path, audio: &Path, language: &str) -> Vec<String> {
    vec![
        "-m".to_string(),
        arg(model),
        "-l".to_string(),
        language.to_string(),
        "-nt".to_string(),
        "-np".to_string(),
        "-f".to_string(),
        arg(audio),
    ]
}

/// Transcript lines without padding and without whisper's non-speech
/// markers such as `[BLANK_AUDIO]` or `(music)`.
pub fn clean_transcript(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let marker = (line.starts_with('[') && line.ends_with(']'))
                || (line.starts_with('(') && line.ends_with(')'));
            !marker
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl Script for MeetingNotes {
    fn validate(&self, _ctx: &Context) -> Result<()> {
        if self.language.as_deref().is_some_and(|l| l.trim().is_empty()) {
            return Err(Error::invocation("--language must not be empty"));
        }
        Ok(())
    }

    fn run(self, ctx: &mut Context) -> Result<Outcome> {
        require_exists(&self.audio)?;
        let model = self
            .model
            .clone()
            .unwrap_or_else(|| ctx.config.meeting.model.clone());
        require_exists(&model)?;
        let language = self
            .language
            .clone()
            .unwrap_or_else(|| ctx.config.meeting.language.clone());

        ctx.reporter
            .info(format!("Transcribing {}...", self.audio.display()));
        let program = ctx.config.tools.whisper.clone();
        let output = ctx
            .runner
            .run(&program, &whisper_args(&model, &self.audio, &language))?
            .check(&program)?;

        let text = clean_transcript(&output.stdout);
        if text.is_empty() {
            return Ok(Outcome::warn("No speech detected"));
        }

        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.output, format!("{text}\n"))?;

        ctx.reporter.info(format!(
            "Transcribed: {}",
            preview(&text.replace('\n', " "), 100)
        ));
        Ok(Outcome::ok(format!(
            "Meeting notes saved to {}",
            self.output.display()
        )))
    }
}
