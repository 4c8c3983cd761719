//! AI-assisted generator for new utilities written against the script
//! template.
//!
//! The description is sent to the messages API together with a few
//! existing handlers as style examples. The reply is cleaned up, written
//! as a new binary source and registered with a `module.toml` manifest.

use crate::registry::{self, Module};
use crate::template::{Context, Script};
use crate::{http, Error, Outcome, Result};
use clap::Parser;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const API_VERSION: &str = "2023-06-01";
const EXAMPLE_FILES: &[&str] = &["qr.rs", "weather.rs", "exif.rs"];
const EXAMPLE_CHARS: usize = 500;
const MAX_OPTIONS: usize = 5;

/// Crate roots that never need a Cargo dependency.
const BUILTIN_ROOTS: &[&str] = &["std", "core", "alloc", "crate", "self", "super", "scriptkit_core"];

pub const SYSTEM_PROMPT: &str = r#"You are an expert Rust developer adding a utility to the scriptkit toolbox.

CRITICAL REQUIREMENTS:
1. File header: the file starts with `//!` doc comments. The first line is a
   short description of what the utility does.

2. Structure: one clap derive parser implementing `scriptkit_core::Script`,
   and a `main` that hands it to the shared template:

   use clap::Parser;
   use scriptkit_core::template::{self, Context, Script};
   use scriptkit_core::{Error, Outcome, Result};
   use std::process::ExitCode;

   /// One-line description shown by --help.
   #[derive(Debug, Parser)]
   #[command(name = "tool-name", version)]
   struct Tool {
       /// Positional input
       input: std::path::PathBuf,
       /// Optional flag
       #[arg(short, long)]
       output: Option<std::path::PathBuf>,
   }

   impl Script for Tool {
       fn validate(&self, _ctx: &Context) -> Result<()> {
           Ok(())
       }

       fn run(self, ctx: &mut Context) -> Result<Outcome> {
           ctx.reporter.info("Working...");
           Ok(Outcome::ok("Done"))
       }
   }

   fn main() -> ExitCode {
       template::main::<Tool>()
   }

3. Rules:
   - Never print the final status yourself; return Ok(Outcome) or Err(Error).
   - Error::invocation for bad arguments, Error::operation or Error::malformed
     when the work itself fails. Propagate with `?`, never unwrap.
   - Progress lines go through ctx.reporter.info / ctx.reporter.warn.
   - External programs run through ctx.runner, never std::process directly.
   - ASCII-only output.

Generate ONLY the complete Rust source. No explanations, no markdown fences."#;

/// Generate a new utility from a plain-language description.
#[derive(Debug, Parser)]
#[command(name = "script-gen", version)]
pub struct ScriptGen {
    /// What the new utility should do
    pub description: String,
    /// Directory that receives the generated source
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Number of existing scripts to include as style examples
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=3))]
    pub examples: u8,
    /// Anthropic API key (or set ANTHROPIC_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
    /// Print the generated code without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Post-processed model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    pub code: String,
    pub filename: String,
    pub dependencies: Vec<String>,
    pub usage: String,
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

pub fn build_prompt(description: &str, examples: &[String]) -> String {
    let mut prompt = format!(
        "Create a Rust utility for the scriptkit toolbox based on this description:\n\n{description}\n\n\
REQUIREMENTS:\n\
- Follow the structure from the system prompt exactly\n\
- clap derive for every argument, no hardcoded values\n\
- Return Outcome or Error, never print the final status line\n\
- `//!` doc header describing the utility\n"
    );
    if !examples.is_empty() {
        prompt.push_str("\nEXAMPLE SCRIPTS TO MATCH STYLE:\n");
        for example in examples {
            prompt.push_str(&format!("\n---\n{}\n", http::truncate(example, EXAMPLE_CHARS)));
        }
    }
    prompt.push_str("\nOUTPUT FORMAT:\nReturn ONLY valid Rust code. Start with the //! header.");
    prompt
}

/// First `limit` house scripts that exist under `dir`.
pub fn load_examples(dir: &Path, limit: usize) -> Vec<String> {
    EXAMPLE_FILES
        .iter()
        .map(|name| dir.join(name))
        .filter_map(|path| std::fs::read_to_string(path).ok())
        .take(limit)
        .collect()
}

/// Code inside the first markdown fence, or the whole reply when unfenced.
pub fn extract_code(text: &str) -> String {
    static RUST_FENCE: OnceLock<Regex> = OnceLock::new();
    static ANY_FENCE: OnceLock<Regex> = OnceLock::new();

    let fenced = if text.contains("```rust") {
        regex(&RUST_FENCE, r"(?s)```rust[ \t]*\r?\n(.*?)```").captures(text)
    } else if text.contains("```") {
        regex(&ANY_FENCE, r"(?s)```[a-z]*[ \t]*\r?\n(.*?)```").captures(text)
    } else {
        None
    };
    match fenced {
        Some(caps) => caps[1].trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Third-party crates named by `use` and `extern crate` lines, sorted.
pub fn extract_dependencies(code: &str) -> Vec<String> {
    static USE: OnceLock<Regex> = OnceLock::new();
    let pattern = regex(&USE, r"(?m)^\s*(?:pub\s+)?(?:use|extern\s+crate)\s+:{0,2}([A-Za-z_][A-Za-z0-9_]*)");

    pattern
        .captures_iter(code)
        .map(|caps| caps[1].to_string())
        .filter(|root| !BUILTIN_ROOTS.contains(&root.as_str()))
        .map(|root| root.replace('_', "-"))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Kebab-case file name from the first doc line, else the description.
pub fn generate_filename(description: &str, code: &str) -> String {
    static WORD: OnceLock<Regex> = OnceLock::new();
    let source = code
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("//!"))
        .map(str::trim)
        .filter(|doc| !doc.is_empty())
        .unwrap_or(description);

    let words: Vec<String> = regex(&WORD, r"[A-Za-z0-9]+")
        .find_iter(source)
        .take(4)
        .map(|m| m.as_str().to_lowercase())
        .collect();
    if words.is_empty() {
        return "generated-script.rs".to_string();
    }
    format!("{}.rs", words.join("-"))
}

/// Usage line plus up to five documented options, read from clap fields.
pub fn usage_instructions(bin_name: &str, code: &str) -> String {
    static FIELD: OnceLock<Regex> = OnceLock::new();
    let field = regex(
        &FIELD,
        r"(?m)^[ \t]*///[ \t]*(?P<doc>[^\n]*)\n(?P<attrs>(?:[ \t]*#\[[^\n]*\]\n)*)[ \t]*(?:pub\s+)?(?P<name>[a-z_][a-z0-9_]*)\s*:",
    );

    let mut positionals = Vec::new();
    let mut options = Vec::new();
    for caps in field.captures_iter(code) {
        let name = &caps["name"];
        let attrs = &caps["attrs"];
        if attrs.contains("command(") {
            continue;
        }
        if attrs.contains("arg(") && (attrs.contains("long") || attrs.contains("short")) {
            options.push(format!("--{}: {}", name.replace('_', "-"), caps["doc"].trim()));
        } else {
            positionals.push(format!("<{}>", name.to_uppercase()));
        }
    }

    let mut usage = bin_name.to_string();
    for positional in positionals {
        usage.push(' ');
        usage.push_str(&positional);
    }
    if !options.is_empty() {
        usage.push_str("\n\nOptions:");
        for option in options.iter().take(MAX_OPTIONS) {
            usage.push_str("\n  ");
            usage.push_str(option);
        }
    }
    usage
}

pub fn post_process(description: &str, reply: &str) -> Generated {
    let code = extract_code(reply);
    let filename = generate_filename(description, &code);
    let bin_name = filename.trim_end_matches(".rs");
    Generated {
        dependencies: extract_dependencies(&code),
        usage: usage_instructions(bin_name, &code),
        filename,
        code,
    }
}

fn request_code(ctx: &Context, api_key: &str, prompt: String) -> Result<String> {
    let generator = &ctx.config.generator;
    let body = MessageRequest {
        model: &generator.model,
        max_tokens: generator.max_tokens,
        system: SYSTEM_PROMPT,
        messages: vec![Message {
            role: "user",
            content: prompt,
        }],
    };
    tracing::debug!(endpoint = %generator.endpoint, model = %generator.model, "requesting script");

    let response = http::client(&ctx.config)?
        .post(&generator.endpoint)
        .header("x-api-key", api_key)
        .header("anthropic-version", API_VERSION)
        .json(&body)
        .send()?;
    let reply: MessageResponse = http::check(response)?.json()?;

    let text: String = reply
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .map(|block| block.text)
        .collect();
    if text.trim().is_empty() {
        return Err(Error::malformed("model returned no text"));
    }
    Ok(text)
}

fn manifest_for(description: &str, generated: &Generated) -> Module {
    let id = generated.filename.trim_end_matches(".rs").to_string();
    let name = id
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    Module {
        name,
        description: description.to_string(),
        category: "Generated".into(),
        script_kind: "rust".into(),
        enabled: true,
        command: id.clone(),
        actions: BTreeMap::from([("help".to_string(), "--help".to_string())]),
        id,
        root: PathBuf::new(),
    }
}

impl Script for ScriptGen {
    fn validate(&self, ctx: &Context) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(Error::invocation("Description must not be empty"));
        }
        if self.api_key.is_none() && ctx.config.generator.api_key.is_none() {
            return Err(Error::invocation(
                "API key required: pass --api-key or set ANTHROPIC_API_KEY",
            ));
        }
        Ok(())
    }

    fn run(self, ctx: &mut Context) -> Result<Outcome> {
        let api_key = self
            .api_key
            .clone()
            .or_else(|| ctx.config.generator.api_key.clone())
            .ok_or_else(|| Error::invocation("API key required"))?;
        let output_dir = self
            .output_dir
            .clone()
            .unwrap_or_else(|| ctx.config.generator.output_dir.clone());

        let examples = load_examples(&ctx.config.generator.examples_dir, usize::from(self.examples));
        ctx.reporter.info(format!(
            "Generating script with {} example(s)...",
            examples.len()
        ));
        let reply = request_code(ctx, &api_key, build_prompt(&self.description, &examples))?;
        let generated = post_process(&self.description, &reply);

        let path = output_dir.join(&generated.filename);
        if !self.dry_run && path.exists() && !self.force {
            return Err(Error::operation(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }

        if generated.dependencies.is_empty() {
            ctx.reporter.info("Dependencies: none beyond the workspace");
        } else {
            ctx.reporter
                .info(format!("Dependencies: {}", generated.dependencies.join(", ")));
        }
        ctx.reporter.info("Usage:");
        ctx.reporter.raw(&generated.usage);

        if self.dry_run {
            ctx.reporter.raw(&generated.code);
            return Ok(Outcome::ok(format!(
                "Generated {} (dry run, nothing written)",
                generated.filename
            )));
        }

        std::fs::create_dir_all(&output_dir)?;
        std::fs::write(&path, format!("{}\n", generated.code))?;
        let manifest = registry::write_manifest(
            &ctx.config.modules_dir,
            &manifest_for(&self.description, &generated),
        )?;
        ctx.reporter
            .info(format!("Registered module: {}", manifest.display()));

        Ok(Outcome::ok(format!("Script saved to {}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Tag;
    use crate::template::run_with;
    use crate::{Config, RecordingRunner, Registry};
    use httpmock::prelude::*;
    use serde_json::json;

    const REPLY: &str = r#"Here you go:

```rust
//! Count words in text files
use clap::Parser;
use scriptkit_core::template::{self, Context, Script};
use scriptkit_core::{Outcome, Result};
use walkdir::WalkDir;
use std::process::ExitCode;

/// Count words.
#[derive(Debug, Parser)]
#[command(name = "count-words", version)]
struct CountWords {
    /// Directory to scan
    dir: std::path::PathBuf,
    /// Only count files with this extension
    #[arg(short, long)]
    ext: Option<String>,
    /// Print per-file totals
    #[arg(short, long)]
    per_file: bool,
}
```
"#;

    #[test]
    fn fences_are_removed() {
        assert!(extract_code(REPLY).starts_with("//! Count words in text files"));
        assert!(extract_code(REPLY).ends_with('}'));
        assert_eq!(extract_code("  fn main() {}\n"), "fn main() {}");
        assert_eq!(extract_code("```\nfn main() {}\n```"), "fn main() {}");
    }

    #[test]
    fn dependencies_skip_workspace_and_std() {
        let code = extract_code(REPLY);
        assert_eq!(extract_dependencies(&code), ["clap", "walkdir"]);
        assert_eq!(
            extract_dependencies("use serde_json::Value;\nextern crate rand;\nuse ::regex::Regex;"),
            ["rand", "regex", "serde-json"]
        );
    }

    #[test]
    fn filename_comes_from_the_doc_header() {
        let code = extract_code(REPLY);
        assert_eq!(generate_filename("ignored", &code), "count-words-in-text.rs");
        assert_eq!(
            generate_filename("Rename photos by EXIF date!", "fn main() {}"),
            "rename-photos-by-exif.rs"
        );
        assert_eq!(generate_filename("!!!", ""), "generated-script.rs");
    }

    #[test]
    fn usage_lists_positionals_and_options() {
        let code = extract_code(REPLY);
        assert_eq!(
            usage_instructions("count-words-in-text", &code),
            "count-words-in-text <DIR>\n\nOptions:\n  --ext: Only count files with this extension\n  --per-file: Print per-file totals"
        );
    }

    #[test]
    fn prompt_truncates_examples() {
        let long = "x".repeat(800);
        let prompt = build_prompt("make tea", &[long]);
        assert!(prompt.contains("make tea"));
        assert!(prompt.contains(&format!("{}...", "x".repeat(500))));
        assert!(!prompt.contains(&"x".repeat(501)));
    }

    fn context(server: &MockServer, dir: &Path) -> Context {
        let mut config = Config::default();
        config.generator.endpoint = server.url("/v1/messages");
        config.generator.api_key = Some("sk-test".into());
        config.generator.output_dir = dir.join("bin");
        config.generator.examples_dir = dir.join("no-examples");
        config.modules_dir = dir.join("modules");
        Context::capture(config, RecordingRunner::new())
    }

    fn mock_reply(server: &MockServer) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1/messages")
                .header("x-api-key", "sk-test")
                .header("anthropic-version", API_VERSION);
            then.status(200).json_body(json!({
                "content": [{ "type": "text", "text": REPLY }]
            }));
        })
    }

    #[test]
    fn writes_source_and_registers_module() {
        let server = MockServer::start();
        let mock = mock_reply(&server);
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&server, dir.path());

        let code = run_with::<ScriptGen, _, _>(["script-gen", "count words in text files"], &mut ctx);

        mock.assert();
        assert_eq!(code, 0);
        let source = dir.path().join("bin/count-words-in-text.rs");
        assert!(std::fs::read_to_string(&source).unwrap().contains("struct CountWords"));

        let module = Registry::new(dir.path().join("modules"))
            .find("count-words-in-text")
            .unwrap()
            .unwrap();
        assert_eq!(module.category, "Generated");
        assert_eq!(module.name, "Count Words In Text");
        assert_eq!(module.command, "count-words-in-text");
        assert_eq!(
            ctx.reporter.tagged(Tag::Ok),
            [format!("Script saved to {}", source.display()).as_str()]
        );
    }

    #[test]
    fn existing_file_needs_force() {
        let server = MockServer::start();
        mock_reply(&server);
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/count-words-in-text.rs"), "old").unwrap();

        let mut ctx = context(&server, dir.path());
        let code = run_with::<ScriptGen, _, _>(["script-gen", "count words"], &mut ctx);
        assert_eq!(code, 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("bin/count-words-in-text.rs")).unwrap(),
            "old"
        );

        let mut ctx = context(&server, dir.path());
        let code = run_with::<ScriptGen, _, _>(["script-gen", "count words", "--force"], &mut ctx);
        assert_eq!(code, 0);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let server = MockServer::start();
        mock_reply(&server);
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&server, dir.path());

        let code = run_with::<ScriptGen, _, _>(["script-gen", "count words", "--dry-run"], &mut ctx);

        assert_eq!(code, 0);
        assert!(!dir.path().join("bin").exists());
        assert!(!dir.path().join("modules").exists());
        assert!(ctx.reporter.lines().iter().any(|l| l == "struct CountWords {"));
    }

    #[test]
    fn missing_key_is_an_invocation_error() {
        let server = MockServer::start();
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&server, dir.path());
        ctx.config.generator.api_key = None;

        assert_eq!(run_with::<ScriptGen, _, _>(["script-gen", "anything"], &mut ctx), 2);
    }

    #[test]
    fn api_error_is_an_operation_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(529).body(r#"{"type":"error","error":{"type":"overloaded_error"}}"#);
        });
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&server, dir.path());

        let code = run_with::<ScriptGen, _, _>(["script-gen", "anything"], &mut ctx);

        assert_eq!(code, 1);
        assert!(ctx.reporter.tagged(Tag::Error)[0].starts_with("HTTP 529"));
    }
}
