//! Module registry: the built-in catalogue plus manifests found on disk.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of a module manifest inside its module directory.
pub const MANIFEST: &str = "module.toml";

/// Metadata describing a module shown by the launcher and the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Module {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    /// `builtin` for shipped utilities, `rust` for generated sources.
    pub script_kind: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Program to launch; a binary name or a path.
    pub command: String,
    /// Named argument templates, e.g. `help = "--help"`.
    pub actions: BTreeMap<String, String>,
    /// Directory the manifest was loaded from; empty for builtins.
    #[serde(skip)]
    pub root: PathBuf,
}

impl Module {
    fn builtin(
        id: &str,
        name: &str,
        category: &str,
        description: &str,
        actions: &[(&str, &str)],
    ) -> Self {
        let mut all = BTreeMap::from([("help".to_string(), "--help".to_string())]);
        all.extend(
            actions
                .iter()
                .map(|(name, args)| (name.to_string(), args.to_string())),
        );
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            category: category.into(),
            script_kind: "builtin".into(),
            enabled: true,
            command: id.into(),
            actions: all,
            root: PathBuf::new(),
        }
    }

    /// Path of the program to launch. A sibling of `bin_dir` wins over a
    /// bare name resolved through `PATH`.
    pub fn resolve_command(&self, bin_dir: Option<&Path>) -> PathBuf {
        let command = Path::new(&self.command);
        if command.components().count() > 1 {
            return if command.is_relative() && !self.root.as_os_str().is_empty() {
                self.root.join(command)
            } else {
                command.to_path_buf()
            };
        }
        if let Some(dir) = bin_dir {
            let sibling = dir.join(format!("{}{}", self.command, std::env::consts::EXE_SUFFIX));
            if sibling.is_file() {
                return sibling;
            }
        }
        command.to_path_buf()
    }

    /// Split an action's argument template into arguments.
    pub fn action_args(&self, action: &str) -> Option<Vec<String>> {
        self.actions.get(action).map(|template| split_args(template))
    }
}

fn enabled_by_default() -> bool {
    true
}

/// Registry handle that knows where module manifests live on disk.
#[derive(Debug, Clone)]
pub struct Registry {
    pub modules_dir: PathBuf,
}

impl Registry {
    /// Create a new registry pointing at the provided modules directory.
    pub fn new(modules_dir: PathBuf) -> Self {
        Self { modules_dir }
    }

    /// Builtins plus discovered manifests, sorted by category then name.
    /// A manifest reusing a builtin id replaces the builtin.
    pub fn modules(&self) -> Result<Vec<Module>> {
        let mut by_id: BTreeMap<String, Module> = builtin_modules()
            .into_iter()
            .map(|module| (module.id.clone(), module))
            .collect();
        for module in discover_modules(&self.modules_dir)? {
            by_id.insert(module.id.clone(), module);
        }

        let mut modules: Vec<Module> = by_id.into_values().filter(|m| m.enabled).collect();
        modules.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));
        Ok(modules)
    }

    pub fn find(&self, id: &str) -> Result<Option<Module>> {
        Ok(self.modules()?.into_iter().find(|module| module.id == id))
    }
}

/// The utilities shipped with the toolbox.
pub fn builtin_modules() -> Vec<Module> {
    vec![
        Module::builtin(
            "article-pod",
            "Articles to Audio",
            "Content Tools",
            "Convert a web article to a spoken audio file",
            &[("convert", "https://example.com/article -o article.wav")],
        ),
        Module::builtin(
            "video-grab",
            "Video Downloader",
            "Content Tools",
            "Download videos or audio with yt-dlp",
            &[("download", "https://youtube.com/watch?v=dQw4w9WgXcQ -q 720p")],
        ),
        Module::builtin(
            "yt-transcript",
            "YouTube Transcript",
            "Content Tools",
            "Download video transcripts as text, SRT or JSON",
            &[
                ("download", "download dQw4w9WgXcQ -f text"),
                ("list", "list dQw4w9WgXcQ"),
            ],
        ),
        Module::builtin(
            "qr-tool",
            "QR Code Tool",
            "Content Tools",
            "Generate, batch-generate and scan QR codes",
            &[
                ("generate", "generate https://example.com -o qrcode.png"),
                ("scan", "scan qrcode.png"),
            ],
        ),
        Module::builtin(
            "meeting-notes",
            "Meeting Notes",
            "Content Tools",
            "Transcribe a meeting recording into a notes file",
            &[("transcribe", "meeting.wav -o meeting_notes.txt")],
        ),
        Module::builtin(
            "handwrite",
            "Text to Handwriting",
            "Content Tools",
            "Render text as a handwriting-style image",
            &[("render", "\"Dear diary\" -o handwriting.png")],
        ),
        Module::builtin(
            "exif-edit",
            "EXIF Editor",
            "File Tools",
            "View or strip image metadata",
            &[("view", "view photo.jpg"), ("strip", "strip photo.jpg -o clean.jpg")],
        ),
        Module::builtin(
            "resume-parse",
            "Resume Parser",
            "File Tools",
            "Extract contact details and skills from a resume",
            &[("parse", "resume.pdf -o resume.json")],
        ),
        Module::builtin(
            "mdtable",
            "Markdown Table Generator",
            "File Tools",
            "Convert CSV or JSON into a markdown table",
            &[("convert", "data.csv -a lcr")],
        ),
        Module::builtin(
            "weather-alert",
            "Weather Alert",
            "Web Tools",
            "Check the 24 hour forecast for rain, snow and extremes",
            &[("check", "London -v")],
        ),
        Module::builtin(
            "history-journal",
            "Browser History Journal",
            "Web Tools",
            "Turn recent Chrome history into a markdown journal",
            &[("journal", "-n 50")],
        ),
        Module::builtin(
            "script-gen",
            "Script Generator",
            "Developer Tools",
            "Ask an AI model for a new utility in the house style",
            &[("generate", "\"convert CSV files to JSON\" --dry-run")],
        ),
    ]
}

/// Read `<dir>/<module>/module.toml` manifests. A missing directory holds
/// no modules.
pub fn discover_modules(dir: impl AsRef<Path>) -> Result<Vec<Module>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.join(MANIFEST).is_file())
        .collect();
    entries.sort();

    entries
        .into_iter()
        .map(|root| load_manifest(&root))
        .collect()
}

fn load_manifest(root: &Path) -> Result<Module> {
    let path = root.join(MANIFEST);
    let text = std::fs::read_to_string(&path)?;
    let mut module: Module = toml::from_str(&text)
        .map_err(|err| Error::malformed(format!("{}: {}", path.display(), err.message())))?;
    if module.id.is_empty() {
        module.id = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    if module.name.is_empty() {
        module.name = module.id.clone();
    }
    if module.command.is_empty() {
        module.command = module.id.clone();
    }
    module.root = root.to_path_buf();
    Ok(module)
}

/// Write a manifest for `module` under `dir/<id>/module.toml`.
pub fn write_manifest(dir: impl AsRef<Path>, module: &Module) -> Result<PathBuf> {
    let root = dir.as_ref().join(&module.id);
    std::fs::create_dir_all(&root)?;
    let path = root.join(MANIFEST);
    let text = toml::to_string_pretty(module)
        .map_err(|err| Error::operation(format!("cannot encode manifest: {err}")))?;
    std::fs::write(&path, text)?;
    Ok(path)
}

/// Split on whitespace, keeping double- or single-quoted runs together.
pub fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_word = false;

    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_word = true;
            }
            None if ch.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(ch);
                in_word = true;
            }
        }
    }
    if in_word {
        args.push(current);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_have_help_and_unique_ids() {
        let modules = builtin_modules();
        let mut ids: Vec<&str> = modules.iter().map(|m| m.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), modules.len());
        assert!(modules.iter().all(|m| m.actions.contains_key("help")));
    }

    #[test]
    fn missing_dir_discovers_nothing() {
        let modules = discover_modules("/no/such/modules/dir").unwrap();
        assert!(modules.is_empty());
    }

    #[test]
    fn manifests_are_discovered_and_override_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("csv-to-json");
        std::fs::create_dir_all(&csv).unwrap();
        std::fs::write(
            csv.join(MANIFEST),
            r#"
name = "CSV to JSON"
category = "Generated"
script_kind = "rust"
"#,
        )
        .unwrap();
        let weather = dir.path().join("weather-alert");
        std::fs::create_dir_all(&weather).unwrap();
        std::fs::write(weather.join(MANIFEST), "name = \"Weather\"\nenabled = false\n").unwrap();
        std::fs::create_dir_all(dir.path().join("not-a-module")).unwrap();

        let registry = Registry::new(dir.path().to_path_buf());
        let modules = registry.modules().unwrap();

        let generated = modules.iter().find(|m| m.id == "csv-to-json").unwrap();
        assert_eq!(generated.command, "csv-to-json");
        assert_eq!(generated.root, csv);
        assert!(modules.iter().all(|m| m.id != "weather-alert"));
        assert!(modules.iter().all(|m| m.id != "not-a-module"));

        let categories: Vec<&str> = modules.iter().map(|m| m.category.as_str()).collect();
        let mut sorted = categories.clone();
        sorted.sort();
        assert_eq!(categories, sorted);
    }

    #[test]
    fn written_manifests_round_trip_through_discovery() {
        let dir = tempfile::tempdir().unwrap();
        let mut module = Module::builtin("word-count", "Word Count", "Generated", "Count words", &[]);
        module.script_kind = "rust".into();
        write_manifest(dir.path(), &module).unwrap();

        let found = discover_modules(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Word Count");
        assert_eq!(found[0].action_args("help").unwrap(), ["--help"]);
    }

    #[test]
    fn split_args_keeps_quoted_runs() {
        assert_eq!(
            split_args(r#"generate "hello world" -o 'my file.png'"#),
            ["generate", "hello world", "-o", "my file.png"]
        );
        assert_eq!(split_args(r#"""#), [""]);
        assert!(split_args("   ").is_empty());
    }

    #[test]
    fn resolve_command_prefers_sibling_binary() {
        let dir = tempfile::tempdir().unwrap();
        let module = builtin_modules().remove(0);
        let sibling = dir
            .path()
            .join(format!("{}{}", module.command, std::env::consts::EXE_SUFFIX));
        assert_eq!(module.resolve_command(Some(dir.path())), PathBuf::from(&module.command));

        std::fs::write(&sibling, "").unwrap();
        assert_eq!(module.resolve_command(Some(dir.path())), sibling);
    }
}
