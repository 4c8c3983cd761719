//! Video and audio downloads through yt-dlp.

use super::arg;
use crate::template::{Context, Script};
use crate::{Outcome, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

/// Download videos from YouTube and other platforms.
#[derive(Debug, Parser)]
#[command(name = "video-grab", version)]
pub struct VideoGrab {
    /// Video or playlist URL
    pub url: String,
    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,
    /// Video quality
    #[arg(short, long, value_enum, default_value_t = Quality::Best)]
    pub quality: Quality,
    /// Extract audio only (MP3)
    #[arg(short, long)]
    pub audio_only: bool,
    /// Download the entire playlist
    #[arg(short, long)]
    pub playlist: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Quality {
    Best,
    #[value(name = "1080p")]
    P1080,
    #[value(name = "720p")]
    P720,
    #[value(name = "480p")]
    P480,
}

impl Quality {
    fn height(self) -> Option<u32> {
        match self {
            Quality::Best => None,
            Quality::P1080 => Some(1080),
            Quality::P720 => Some(720),
            Quality::P480 => Some(480),
        }
    }

    fn label(self) -> String {
        self.height()
            .map(|h| format!("{h}p"))
            .unwrap_or_else(|| "best".to_string())
    }
}

/// Arguments for a single yt-dlp run.
pub fn ytdlp_args(
    url: &str,
    output_dir: &Path,
    quality: Quality,
    audio_only: bool,
    playlist: bool,
) -> Vec<String> {
    let format = match (audio_only, quality.height()) {
        (true, _) => "bestaudio/best".to_string(),
        (false, None) => "bestvideo+bestaudio/best".to_string(),
        (false, Some(h)) => format!("bestvideo[height<={h}]+bestaudio/best[height<={h}]"),
    };
    let template = output_dir.join("%(uploader)s").join("%(title)s.%(ext)s");

    let mut args = vec!["-f".to_string(), format, "-o".to_string(), arg(&template)];
    if audio_only {
        args.extend(
            ["-x", "--audio-format", "mp3", "--audio-quality", "192K"].map(String::from),
        );
    } else {
        args.extend(["--merge-output-format", "mp4"].map(String::from));
    }
    args.push(if playlist { "--yes-playlist" } else { "--no-playlist" }.to_string());
    args.push("--".to_string());
    args.push(url.to_string());
    args
}

impl Script for VideoGrab {
    fn run(self, ctx: &mut Context) -> Result<Outcome> {
        std::fs::create_dir_all(&self.output_dir)?;

        ctx.reporter.info(format!("Downloading from: {}", self.url));
        ctx.reporter.info(format!(
            "Quality: {}, Audio only: {}, Playlist: {}",
            self.quality.label(),
            self.audio_only,
            self.playlist
        ));

        let program = ctx.config.tools.yt_dlp.clone();
        let args = ytdlp_args(
            &self.url,
            &self.output_dir,
            self.quality,
            self.audio_only,
            self.playlist,
        );
        ctx.runner.run(&program, &args)?.check(&program)?;

        Ok(Outcome::ok(format!(
            "Download completed into {}",
            self.output_dir.display()
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
    fn height_limits_the_format_selector() {
        let args = ytdlp_args("u", Path::new("out"), Quality::P720, false, false);
        assert_eq!(args[1], "bestvideo[height<=720]+bestaudio/best[height<=720]");
        assert!(args.contains(&"--merge-output-format".to_string()));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert_eq!(args.last().unwrap(), "u");
    }

    #[test]
    fn audio_only_extracts_mp3() {
        let args = ytdlp_args("u", Path::new("."), Quality::Best, true, true);
        assert_eq!(args[1], "bestaudio/best");
        assert!(args.windows(2).any(|w| w == ["--audio-format", "mp3"]));
        assert!(args.contains(&"--yes-playlist".to_string()));
    }

    #[test]
    fn url_is_never_read_as_an_option() {
        let args = ytdlp_args("--exec=rm", Path::new("-out"), Quality::Best, false, false);
        assert_eq!(args[args.len() - 2..], ["--", "--exec=rm"]);
        assert!(args[3].starts_with("./-out"));
    }

    #[test]
    fn runs_ytdlp_once() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new();
        let mut ctx = Context::capture(Config::default(), runner.clone());

        let code = run_with::<VideoGrab, _, _>(
            [
                "video-grab",
                "https://youtu.be/x",
                "-o",
                dir.path().to_str().unwrap(),
                "-q",
                "480p",
            ],
            &mut ctx,
        );

        assert_eq!(code, 0);
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "yt-dlp");
        assert_eq!(ctx.reporter.tagged(Tag::Ok).len(), 1);
    }

    #[test]
    fn failed_download_reports_stderr() {
        let runner = RecordingRunner::new();
        runner.reply_status(1, "ERROR: Unsupported URL: https://nope");
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = Context::capture(Config::default(), runner);

        let code = run_with::<VideoGrab, _, _>(
            ["video-grab", "https://nope", "-o", dir.path().to_str().unwrap()],
            &mut ctx,
        );

        assert_eq!(code, 1);
        assert_eq!(
            ctx.reporter.tagged(Tag::Error),
            ["`yt-dlp` failed: ERROR: Unsupported URL: https://nope"]
        );
    }

    #[test]
    fn unknown_quality_is_rejected_by_the_parser() {
        let runner = RecordingRunner::new();
        let mut ctx = Context::capture(Config::default(), runner.clone());
        let code = run_with::<VideoGrab, _, _>(["video-grab", "u", "-q", "4k"], &mut ctx);
        assert_eq!(code, 2);
        assert!(runner.calls().is_empty());
    }
}
