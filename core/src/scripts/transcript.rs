//! YouTube transcript downloader.

use crate::http;
use crate::template::{Context, Script};
use crate::{Error, Outcome, Result};
use clap::{Parser, Subcommand, ValueEnum};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Download YouTube video transcripts.
#[derive(Debug, Parser)]
#[command(name = "yt-transcript", version, arg_required_else_help = true)]
pub struct YtTranscript {
    #[command(subcommand)]
    pub command: TranscriptCommand,
}

#[derive(Debug, Subcommand)]
pub enum TranscriptCommand {
    /// Download a transcript
    Download {
        /// YouTube URL or video ID
        url: String,
        /// Output filename
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Language codes to try in order (e.g. en es fr)
        #[arg(short, long, num_args = 1..)]
        languages: Vec<String>,
        /// Include timestamps (text format only)
        #[arg(short, long)]
        timestamps: bool,
    },
    /// List available transcripts
    List {
        /// YouTube URL or video ID
        url: String,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Srt,
    Json,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Text => "txt",
            Format::Srt => "srt",
            Format::Json => "json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub language_code: String,
    pub language: String,
    pub generated: bool,
}

fn video_id_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?:youtube\.com/watch\?v=|youtu\.be/)([^&\n?]+)",
            r"youtube\.com/embed/([^&\n?]+)",
            r"^([a-zA-Z0-9_-]{11})$",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("static regex"))
        .collect()
    })
}

/// Accepts watch, short and embed URLs or a bare 11 character id.
pub fn extract_video_id(url: &str) -> Option<String> {
    video_id_patterns()
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .map(|caps| caps[1].to_string())
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Event {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    #[serde(default)]
    segs: Vec<Seg>,
}

#[derive(Debug, Deserialize)]
struct Seg {
    #[serde(default)]
    utf8: String,
}

/// Parse a `json3` timedtext document. Events without text are dropped.
pub fn parse_timedtext(body: &str) -> Result<Vec<Segment>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let doc: TimedText = serde_json::from_str(body)?;
    Ok(doc
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|seg| seg.utf8.as_str()).collect();
            let text = text.replace('\n', " ").trim().to_string();
            (!text.is_empty()).then(|| Segment {
                text,
                start: event.t_start_ms as f64 / 1000.0,
                duration: event.d_duration_ms as f64 / 1000.0,
            })
        })
        .collect())
}

/// Parse the track list document (`type=list`).
pub fn parse_track_list(body: &str) -> Vec<Track> {
    static TRACK: OnceLock<Regex> = OnceLock::new();
    static ATTR: OnceLock<Regex> = OnceLock::new();
    let track = TRACK.get_or_init(|| Regex::new(r"<track\b([^>]*)/?>").expect("static regex"));
    let attr = ATTR.get_or_init(|| Regex::new(r#"(\w+)="([^"]*)""#).expect("static regex"));

    track
        .captures_iter(body)
        .filter_map(|caps| {
            let attrs = &caps[1];
            let lookup = |name: &str| {
                attr.captures_iter(attrs)
                    .find(|c| &c[1] == name)
                    .map(|c| super::text::decode_entities(&c[2]))
            };
            let language_code = lookup("lang_code")?;
            let language = lookup("lang_translated")
                .or_else(|| lookup("lang_original"))
                .unwrap_or_else(|| language_code.clone());
            let generated = lookup("kind").is_some_and(|kind| kind == "asr");
            Some(Track {
                language_code,
                language,
                generated,
            })
        })
        .collect()
}

pub fn format_transcript(segments: &[Segment], format: Format, timestamps: bool) -> Result<String> {
    Ok(match format {
        Format::Json => serde_json::to_string_pretty(segments)
            .map_err(|err| Error::operation(format!("cannot encode transcript: {err}")))?,
        Format::Srt => segments
            .iter()
            .enumerate()
            .map(|(i, seg)| {
                format!(
                    "{}\n{} --> {}\n{}\n",
                    i + 1,
                    srt_time(seg.start),
                    srt_time(seg.start + seg.duration),
                    seg.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Format::Text if timestamps => segments
            .iter()
            .map(|seg| format!("[{}s] {}", seg.start as u64, seg.text))
            .collect::<Vec<_>>()
            .join("\n"),
        Format::Text => segments
            .iter()
            .map(|seg| seg.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

/// `HH:MM:SS,mmm`
fn srt_time(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0).round() as u64;
    let (hours, rest) = (total_ms / 3_600_000, total_ms % 3_600_000);
    let (minutes, rest) = (rest / 60_000, rest % 60_000);
    let (secs, millis) = (rest / 1000, rest % 1000);
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

fn fetch(ctx: &Context, params: &[(&str, &str)]) -> Result<String> {
    let endpoint = &ctx.config.transcript.endpoint;
    tracing::debug!(%endpoint, ?params, "fetching timedtext");
    let response = http::client(&ctx.config)?.get(endpoint).query(params).send()?;
    Ok(http::check(response)?.text()?)
}

/// First language that yields a non-empty transcript wins.
pub fn get_transcript(ctx: &Context, video_id: &str, languages: &[String]) -> Result<Vec<Segment>> {
    let defaults = ["en".to_string()];
    let languages = if languages.is_empty() { &defaults[..] } else { languages };

    for lang in languages {
        let body = fetch(ctx, &[("v", video_id), ("lang", lang.as_str()), ("fmt", "json3")])?;
        let segments = parse_timedtext(&body)?;
        if !segments.is_empty() {
            return Ok(segments);
        }
    }
    Err(Error::operation(format!(
        "No transcript for {video_id} in: {} (video may not have captions)",
        languages.join(", ")
    )))
}

pub fn list_tracks(ctx: &Context, video_id: &str) -> Result<Vec<Track>> {
    let body = fetch(ctx, &[("v", video_id), ("type", "list")])?;
    Ok(parse_track_list(&body))
}

fn video_id(url: &str) -> Result<String> {
    extract_video_id(url)
        .ok_or_else(|| Error::invocation(format!("Could not extract video ID from: {url}")))
}

impl Script for YtTranscript {
    fn validate(&self, _ctx: &Context) -> Result<()> {
        let url = match &self.command {
            TranscriptCommand::Download { url, .. } | TranscriptCommand::List { url } => url,
        };
        video_id(url).map(|_| ())
    }

    fn run(self, ctx: &mut Context) -> Result<Outcome> {
        match self.command {
            TranscriptCommand::Download {
                url,
                output,
                format,
                languages,
                timestamps,
            } => {
                let id = video_id(&url)?;
                ctx.reporter.info(format!("Downloading transcript for video: {id}"));
                let segments = get_transcript(ctx, &id, &languages)?;
                ctx.reporter.info(format!("Found {} transcript segments", segments.len()));

                let formatted = format_transcript(&segments, format, timestamps)?;
                let output = output.unwrap_or_else(|| {
                    PathBuf::from(format!("transcript_{id}.{}", format.extension()))
                });
                std::fs::write(&output, formatted)?;
                Ok(Outcome::ok(format!("Transcript saved to {}", output.display())))
            }
            TranscriptCommand::List { url } => {
                let id = video_id(&url)?;
                let tracks = list_tracks(ctx, &id)?;
                if tracks.is_empty() {
                    return Ok(Outcome::warn(format!("No transcripts available for {id}")));
                }
                ctx.reporter.info("Available transcripts:");
                for track in &tracks {
                    let kind = if track.generated { "(auto-generated)" } else { "(manual)" };
                    ctx.reporter
                        .raw(format!("  {}: {} {kind}", track.language_code, track.language));
                }
                Ok(Outcome::ok(format!("{} transcript(s) available", tracks.len())))
            }
        }
    }
}
