//! Configuration models and loaders for the toolbox.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SCRIPTKIT_CONFIG";
/// Config file picked up from the working directory.
pub const LOCAL_CONFIG: &str = "scriptkit.toml";

/// High-level configuration shared by every script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Where generated module manifests live.
    pub modules_dir: PathBuf,
    /// Timeout applied to every HTTP request.
    pub http_timeout_secs: u64,
    pub weather: WeatherConfig,
    pub transcript: TranscriptConfig,
    pub generator: GeneratorConfig,
    pub meeting: MeetingConfig,
    pub tools: ToolPaths,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modules_dir: PathBuf::from("modules"),
            http_timeout_secs: 30,
            weather: WeatherConfig::default(),
            transcript: TranscriptConfig::default(),
            generator: GeneratorConfig::default(),
            meeting: MeetingConfig::default(),
            tools: ToolPaths::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub endpoint: String,
    pub units: String,
    pub api_key: Option<String>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openweathermap.org/data/2.5/forecast".into(),
            units: "metric".into(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TranscriptConfig {
    pub endpoint: String,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.youtube.com/api/timedtext".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    /// Directory that receives generated script sources. Kept outside every
    /// workspace package so an unbuildable script never joins the build.
    pub output_dir: PathBuf,
    /// Directory holding the scripts shown to the model as style examples.
    pub examples_dir: PathBuf,
    pub api_key: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.anthropic.com/v1/messages".into(),
            model: "claude-sonnet-4-20250514".into(),
            max_tokens: 4096,
            output_dir: PathBuf::from("generated"),
            examples_dir: PathBuf::from("core/src/scripts"),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MeetingConfig {
    /// whisper.cpp model used for transcription.
    pub model: PathBuf,
    pub language: String,
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("models/ggml-base.en.bin"),
            language: "en".into(),
        }
    }
}

/// Names (or absolute paths) of the external programs scripts shell out to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolPaths {
    pub yt_dlp: String,
    pub qrencode: String,
    pub zbarimg: String,
    pub exiftool: String,
    pub sqlite3: String,
    pub pdftotext: String,
    pub espeak: String,
    pub magick: String,
    pub whisper: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            yt_dlp: "yt-dlp".into(),
            qrencode: "qrencode".into(),
            zbarimg: "zbarimg".into(),
            exiftool: "exiftool".into(),
            sqlite3: "sqlite3".into(),
            pdftotext: "pdftotext".into(),
            espeak: "espeak-ng".into(),
            magick: "magick".into(),
            whisper: "whisper-cli".into(),
        }
    }
}

impl Config {
    /// Load the effective configuration for a script run.
    ///
    /// `.env` is read first, then the first config file found among
    /// `$SCRIPTKIT_CONFIG`, `./scriptkit.toml` and the platform config
    /// directory. API keys from the environment override the file.
    pub fn load() -> Result<Config> {
        let _ = dotenvy::dotenv();

        let mut config = match locate_config() {
            Some(path) => load_config(&path)?,
            None => Config::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Overlay API keys from the process environment.
    pub fn apply_env(&mut self) {
        if let Some(key) = non_empty_env("OPENWEATHER_API_KEY") {
            self.weather.api_key = Some(key);
        }
        if let Some(key) = non_empty_env("ANTHROPIC_API_KEY") {
            self.generator.api_key = Some(key);
        }
    }
}

/// Attempt to load configuration from the provided path.
///
/// Expected TOML keys:
/// - `modules_dir`, `http_timeout_secs`
/// - `[weather]`, `[transcript]`, `[generator]` endpoint settings
/// - `[meeting]` transcription model and language
/// - `[tools]` external program names
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|err| Error::Config {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    parse_config(&text).map_err(|err| Error::Config {
        path: path.to_path_buf(),
        message: err.message().to_string(),
    })
}

pub fn parse_config(text: &str) -> std::result::Result<Config, toml::de::Error> {
    toml::from_str(text)
}

fn locate_config() -> Option<PathBuf> {
    if let Some(explicit) = env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(explicit));
    }
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.is_file() {
        return Some(local);
    }
    directories::ProjectDirs::from("", "", "scriptkit")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .filter(|path| path.is_file())
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
