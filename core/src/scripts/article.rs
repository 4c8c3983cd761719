//! Web article to speech.

use super::arg;
use super::text::{decode_entities, squash_whitespace, strip_tags};
use crate::http;
use crate::template::{Context, Script};
use crate::{Error, Outcome, Result};
use clap::Parser;
use regex::Regex;
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Convert web articles to audio.
#[derive(Debug, Parser)]
#[command(name = "article-pod", version)]
pub struct ArticlePod {
    /// URL of the article to convert
    pub url: String,
    /// Output audio file
    #[arg(short, long, default_value = "article.wav")]
    pub output: PathBuf,
}

/// Readable text of every `<p>` element, one paragraph per line.
///
/// A paragraph without `</p>` ends where HTML implies it: at the next
/// `<p>`, at a block-level tag, at a closing container tag or at the end
/// of the document.
pub fn extract_paragraphs(html: &str) -> Vec<String> {
    static OPEN: OnceLock<Regex> = OnceLock::new();
    static END: OnceLock<Regex> = OnceLock::new();
    let open = OPEN.get_or_init(|| Regex::new(r"(?i)<p\b[^>]*>").expect("static regex"));
    let end = END.get_or_init(|| {
        Regex::new(
            r"(?i)</p\s*>|<p\b|</?(?:address|article|aside|blockquote|body|div|dl|fieldset|figure|footer|form|h[1-6]|header|hr|html|li|main|nav|ol|pre|section|table|td|th|ul)\b",
        )
        .expect("static regex")
    });

    open.find_iter(html)
        .map(|start| {
            let body = &html[start.end()..];
            let stop = end.find(body).map_or(body.len(), |m| m.start());
            squash_whitespace(&decode_entities(&strip_tags(&body[..stop])))
        })
        .filter(|text| !text.is_empty())
        .collect()
}

fn fetch_article(ctx: &Context, url: &str) -> Result<String> {
    tracing::debug!(url, "fetching article");
    let response = http::client(&ctx.config)?.get(url).send()?;
    Ok(http::check(response)?.text()?)
}

impl Script for ArticlePod {
    fn validate(&self, _ctx: &Context) -> Result<()> {
        if self.url.starts_with("http://") || self.url.starts_with("https://") {
            Ok(())
        } else {
            Err(Error::invocation(format!("Not an http(s) URL: {}", self.url)))
        }
    }

    fn run(self, ctx: &mut Context) -> Result<Outcome> {
        ctx.reporter.info(format!("Fetching article from {}...", self.url));
        let html = fetch_article(ctx, &self.url)?;

        let paragraphs = extract_paragraphs(&html);
        if paragraphs.is_empty() {
            return Err(Error::malformed("No paragraphs found in article"));
        }
        let text = paragraphs.join("\n");
        ctx.reporter
            .info(format!("Converting {} characters to speech...", text.chars().count()));

        let mut script = tempfile::Builder::new()
            .prefix("scriptkit-article")
            .suffix(".txt")
            .tempfile()?;
        script.write_all(text.as_bytes())?;
        script.flush()?;

        let program = &ctx.config.tools.espeak;
        let args = vec![
            "-w".to_string(),
            arg(&self.output),
            "-f".to_string(),
            arg(script.path()),
        ];
        ctx.runner.run(program, &args)?.check(program)?;

        if !self.output.exists() {
            return Err(Error::operation(format!(
                "{program} finished but {} was not written",
                self.output.display()
            )));
        }
        Ok(Outcome::ok(format!("Audio saved to {}", self.output.display())))
    }
}
