//! Render text as a handwriting-style image with ImageMagick.

use super::{arg, require_exists};
use crate::template::{Context, Script};
use crate::{Error, Outcome, Result};
use clap::{ArgGroup, Parser};
use std::path::{Path, PathBuf};

const DEFAULT_INK: Rgb = Rgb(0, 0, 139);
const JITTER: i64 = 2;
/// Upper bound for every pixel flag; keeps page geometry well inside `u64`.
const MAX_PIXELS: i64 = 20_000;

const FONT_CANDIDATES: &[&str] = &[
    "fonts/handwriting.ttf",
    "/usr/share/fonts/truetype/handwriting/handwriting.ttf",
    "/usr/share/fonts/truetype/dancing-script/DancingScript-Regular.ttf",
    "/Library/Fonts/Bradley Hand Bold.ttf",
    "C:/Windows/Fonts/segoesc.ttf",
];

/// Convert text to a handwriting-style image.
#[derive(Debug, Parser)]
#[command(name = "handwrite", version)]
#[command(group(ArgGroup::new("source").required(true).args(["text", "file"])))]
pub struct Handwrite {
    /// Text to convert
    pub text: Option<String>,
    /// Read text from a file
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// Output image file
    #[arg(short, long, default_value = "handwriting.png")]
    pub output: PathBuf,
    /// Font size
    #[arg(short = 's', long, default_value_t = 40, value_parser = pixels(1))]
    pub font_size: u32,
    /// Line spacing in pixels
    #[arg(short = 'l', long, default_value_t = 60, value_parser = pixels(1))]
    pub line_spacing: u32,
    /// Text colour (name or #hex)
    #[arg(short = 'c', long, default_value = "darkblue")]
    pub color: String,
    /// Paper colour (name or #hex)
    #[arg(short = 'p', long, default_value = "cream")]
    pub paper: String,
    /// Image width
    #[arg(short = 'w', long, default_value_t = 800, value_parser = pixels(1))]
    pub width: u32,
    /// Page margin
    #[arg(long, default_value_t = 50, value_parser = pixels(0))]
    pub margin: u32,
    /// Explicit font file
    #[arg(long)]
    pub font: Option<PathBuf>,
    /// Disable the per-line position variation
    #[arg(long)]
    pub no_variation: bool,
}

fn pixels(min: i64) -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(min..=MAX_PIXELS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    fn magick(self) -> String {
        format!("rgb({},{},{})", self.0, self.1, self.2)
    }
}

/// Named palette colour or `#rrggbb`.
pub fn parse_color(spec: &str) -> Option<Rgb> {
    let spec = spec.trim();
    if let Some(hex) = spec.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        return Some(Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?));
    }
    let rgb = match spec.to_lowercase().as_str() {
        "black" => Rgb(0, 0, 0),
        "white" => Rgb(255, 255, 255),
        "blue" => Rgb(0, 0, 255),
        "darkblue" => Rgb(0, 0, 139),
        "navy" => Rgb(0, 0, 128),
        "red" => Rgb(200, 0, 0),
        "green" => Rgb(0, 100, 0),
        "gray" | "grey" => Rgb(128, 128, 128),
        "cream" => Rgb(255, 253, 208),
        "ivory" => Rgb(255, 255, 240),
        "beige" => Rgb(245, 245, 220),
        _ => return None,
    };
    Some(rgb)
}

/// Word-wrap each paragraph to roughly fit `width` pixels.
pub fn wrap_lines(text: &str, width: u32, margin: u32, font_size: u32) -> Vec<String> {
    let usable = u64::from(width).saturating_sub(2 * u64::from(margin)).max(1);
    let max_chars = (usable * 2 / u64::from(font_size.max(1))).max(1) as usize;

    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
            if !current.is_empty() && needed > max_chars {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    lines
}

/// Per-line `(dx, dy)` offsets in `-JITTER..=JITTER`, stable for a given text.
pub fn jitter(text: &str, count: usize) -> Vec<(i64, i64)> {
    let mut state = fnv1a(text.as_bytes()) | 1;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state % (2 * JITTER as u64 + 1)) as i64 - JITTER
    };
    (0..count).map(|_| (next(), next())).collect()
}

/// 64-bit FNV-1a.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Text for `-annotate`, drawn literally: ImageMagick expands `%` escapes
/// and backslashes, and reads a file for text starting with `@`.
pub fn annotate_text(line: &str) -> String {
    let escaped = line.replace('\\', "\\\\").replace('%', "%%");
    match escaped.strip_prefix('@') {
        Some(rest) => format!("\\@{rest}"),
        None => escaped,
    }
}

pub struct Page<'a> {
    pub lines: &'a [String],
    pub offsets: &'a [(i64, i64)],
    pub font: Option<&'a Path>,
    pub ink: Rgb,
    pub paper: Rgb,
    pub width: u32,
    pub margin: u32,
    pub font_size: u32,
    pub line_spacing: u32,
}

/// ImageMagick arguments drawing `lines` on a blank page into `output`.
pub fn magick_args(page: &Page<'_>, output: &Path) -> Vec<String> {
    let height = 2 * u64::from(page.margin)
        + (page.lines.len() as u64).saturating_mul(u64::from(page.line_spacing));
    let mut args = vec![
        "-size".to_string(),
        format!("{}x{height}", page.width),
        format!("xc:{}", page.paper.magick()),
    ];
    if let Some(font) = page.font {
        args.push("-font".to_string());
        args.push(arg(font));
    }
    args.extend([
        "-pointsize".to_string(),
        page.font_size.to_string(),
        "-fill".to_string(),
        page.ink.magick(),
        "-gravity".to_string(),
        "NorthWest".to_string(),
    ]);

    for (index, line) in page.lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        let (dx, dy) = page.offsets.get(index).copied().unwrap_or((0, 0));
        let x = (i64::from(page.margin) + dx).max(0);
        let y = (i64::from(page.margin) + index as i64 * i64::from(page.line_spacing) + dy).max(0);
        args.push("-annotate".to_string());
        args.push(format!("+{x}+{y}"));
        args.push(annotate_text(line));
    }
    args.push(arg(output));
    args
}

fn find_font(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
}

impl Handwrite {
    fn source_text(&self) -> Result<String> {
        match (&self.text, &self.file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(file)) => {
                require_exists(file)?;
                Ok(std::fs::read_to_string(file)?)
            }
            (None, None) => Err(Error::invocation("Provide text or --file")),
        }
    }

    fn colour(ctx: &mut Context, spec: &str, fallback: Rgb) -> Rgb {
        parse_color(spec).unwrap_or_else(|| {
            ctx.reporter
                .warn(format!("Unknown colour '{spec}', using rgb{:?}", (fallback.0, fallback.1, fallback.2)));
            fallback
        })
    }
}

impl Script for Handwrite {
    fn validate(&self, _ctx: &Context) -> Result<()> {
        if let Some(font) = &self.font {
            require_exists(font).map_err(|_| {
                Error::invocation(format!("Font file not found: {}", font.display()))
            })?;
        }
        Ok(())
    }

    fn run(self, ctx: &mut Context) -> Result<Outcome> {
        let text = self.source_text()?;
        if text.trim().is_empty() {
            return Err(Error::malformed("no text to render"));
        }

        let ink = Self::colour(ctx, &self.color, DEFAULT_INK);
        let paper = Self::colour(ctx, &self.paper, Rgb(255, 253, 208));
        let font = find_font(self.font.as_deref());
        if font.is_none() {
            ctx.reporter
                .warn("Handwriting font not found, using default font");
        }

        let lines = wrap_lines(&text, self.width, self.margin, self.font_size);
        let offsets = if self.no_variation {
            Vec::new()
        } else {
            jitter(&text, lines.len())
        };
        let page = Page {
            lines: &lines,
            offsets: &offsets,
            font: font.as_deref(),
            ink,
            paper,
            width: self.width,
            margin: self.margin,
            font_size: self.font_size,
            line_spacing: self.line_spacing,
        };

        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let program = &ctx.config.tools.magick;
        ctx.runner
            .run(program, &magick_args(&page, &self.output))?
            .check(program)?;

        Ok(Outcome::ok(format!(
            "Handwriting image saved to {}",
            self.output.display()
        )))
    }
}
