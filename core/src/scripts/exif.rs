//! View and strip image metadata with exiftool.

use super::{arg, extension, require_exists};
use crate::template::{Context, Script};
use crate::{Error, Outcome, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "bmp"];

const KEY_FIELDS: &[&str] = &[
    "ModifyDate",
    "DateTimeOriginal",
    "Make",
    "Model",
    "LensModel",
    "FNumber",
    "ExposureTime",
    "ISO",
    "FocalLength",
    "Flash",
    "WhiteBalance",
];

/// View and edit EXIF metadata.
#[derive(Debug, Parser)]
#[command(name = "exif-edit", version, arg_required_else_help = true)]
pub struct ExifEdit {
    #[command(subcommand)]
    pub command: ExifCommand,
}

#[derive(Debug, Subcommand)]
pub enum ExifCommand {
    /// View EXIF data
    View {
        /// Image file
        image: PathBuf,
        /// Show all EXIF tags
        #[arg(short, long)]
        verbose: bool,
    },
    /// Remove EXIF data
    Strip {
        /// Image file
        image: PathBuf,
        /// Output file (modifies the original when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Remove the orientation tag as well
        #[arg(long)]
        no_orientation: bool,
    },
    /// Strip EXIF data from every image in a directory
    Batch {
        /// Directory of images
        dir: PathBuf,
        /// Output directory (modifies in place when omitted)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Remove the orientation tag as well
        #[arg(long)]
        no_orientation: bool,
    },
}

/// Tags reported by `exiftool -json`, minus its bookkeeping keys.
pub fn parse_tags(stdout: &str) -> Result<Map<String, Value>> {
    let documents: Vec<Map<String, Value>> = serde_json::from_str(stdout)?;
    let mut tags = documents.into_iter().next().unwrap_or_default();
    tags.retain(|key, _| key != "SourceFile" && key != "ExifToolVersion");
    Ok(tags)
}

fn show(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Display lines: key fields first, then GPS, then (verbose) the rest.
pub fn describe(tags: &Map<String, Value>, verbose: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for key in KEY_FIELDS {
        if let Some(value) = tags.get(*key) {
            lines.push(format!("{key}: {}", show(value)));
        }
    }

    let gps: Vec<(&String, &Value)> = tags.iter().filter(|(k, _)| k.starts_with("GPS")).collect();
    if !gps.is_empty() {
        lines.push("GPS Info:".to_string());
        for (key, value) in gps {
            lines.push(format!("  {key}: {}", show(value)));
        }
    }

    if verbose {
        let rest: Vec<_> = tags
            .iter()
            .filter(|(k, _)| !KEY_FIELDS.contains(&k.as_str()) && !k.starts_with("GPS"))
            .collect();
        if !rest.is_empty() {
            lines.push("All EXIF Tags:".to_string());
            for (key, value) in rest {
                lines.push(format!("  {key}: {}", show(value)));
            }
        }
    }
    lines
}

pub fn strip_args(target: &Path, keep_orientation: bool) -> Vec<String> {
    let mut args = vec!["-all=".to_string()];
    if keep_orientation {
        args.extend(["-tagsfromfile", "@", "-Orientation"].map(String::from));
    }
    args.push("-overwrite_original".to_string());
    args.push(arg(target));
    args
}

/// Image files directly inside `dir`, sorted by name.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && IMAGE_EXTENSIONS.contains(&extension(&path).as_str()) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

fn view(ctx: &mut Context, image: &Path, verbose: bool) -> Result<Outcome> {
    require_exists(image)?;
    let program = ctx.config.tools.exiftool.clone();
    let args = vec![
        "-json".to_string(),
        "-a".to_string(),
        "-EXIF:all".to_string(),
        arg(image),
    ];
    let output = ctx.runner.run(&program, &args)?.check(&program)?;
    let tags = parse_tags(&output.stdout)?;
    if tags.is_empty() {
        return Ok(Outcome::warn("No EXIF data found"));
    }

    ctx.reporter.info(format!("EXIF Data for: {}", image.display()));
    for line in describe(&tags, verbose) {
        ctx.reporter.raw(line);
    }
    Ok(Outcome::ok(format!("{} EXIF tag(s) read", tags.len())))
}

/// Strip one image, copying it to `output` first when given.
fn strip_one(ctx: &Context, image: &Path, output: Option<&Path>, keep_orientation: bool) -> Result<PathBuf> {
    let target = match output {
        Some(output) => {
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(image, output)?;
            output.to_path_buf()
        }
        None => image.to_path_buf(),
    };
    let program = &ctx.config.tools.exiftool;
    ctx.runner
        .run(program, &strip_args(&target, keep_orientation))?
        .check(program)?;
    Ok(target)
}

fn strip(ctx: &mut Context, image: &Path, output: Option<&Path>, keep_orientation: bool) -> Result<Outcome> {
    require_exists(image)?;
    let target = strip_one(ctx, image, output, keep_orientation)?;
    Ok(Outcome::ok(format!("EXIF data stripped: {}", target.display())))
}

fn batch(ctx: &mut Context, dir: &Path, output_dir: Option<&Path>, keep_orientation: bool) -> Result<Outcome> {
    if !dir.is_dir() {
        return Err(Error::NotFound(dir.to_path_buf()));
    }
    let images = list_images(dir)?;
    if images.is_empty() {
        return Ok(Outcome::warn(format!("No images found in {}", dir.display())));
    }
    if let Some(out) = output_dir {
        std::fs::create_dir_all(out)?;
    }

    for image in &images {
        let output = match (output_dir, image.file_name()) {
            (Some(out), Some(name)) => Some(out.join(name)),
            _ => None,
        };
        let target = strip_one(ctx, image, output.as_deref(), keep_orientation)?;
        ctx.reporter.info(format!("Stripped: {}", target.display()));
    }
    Ok(Outcome::ok(format!("Processed {} images", images.len())))
}

impl Script for ExifEdit {
    fn run(self, ctx: &mut Context) -> Result<Outcome> {
        match self.command {
            ExifCommand::View { image, verbose } => view(ctx, &image, verbose),
            ExifCommand::Strip {
                image,
                output,
                no_orientation,
            } => strip(ctx, &image, output.as_deref(), !no_orientation),
            ExifCommand::Batch {
                dir,
                output_dir,
                no_orientation,
            } => batch(ctx, &dir, output_dir.as_deref(), !no_orientation),
        }
    }
}
