//! QR code generation and scanning through qrencode and zbarimg.

use super::{arg, require_exists};
use crate::template::{Context, Script};
use crate::{Error, Outcome, Result};
use clap::{Parser, Subcommand};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// zbarimg exits with this status when the image holds no symbol.
const ZBAR_NOTHING_FOUND: i32 = 4;

/// Generate and scan QR codes.
#[derive(Debug, Parser)]
#[command(name = "qr-tool", version, arg_required_else_help = true)]
pub struct QrTool {
    #[command(subcommand)]
    pub command: QrCommand,
}

#[derive(Debug, Subcommand)]
pub enum QrCommand {
    /// Generate a single QR code
    Generate {
        /// Data to encode
        data: String,
        /// Output file
        #[arg(short, long, default_value = "qrcode.png")]
        output: PathBuf,
        /// Module size in pixels
        #[arg(short, long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
        size: u32,
        /// Quiet zone width in modules
        #[arg(short, long, default_value_t = 4)]
        border: u32,
    },
    /// Generate QR codes from a CSV file with `data` and optional `filename` columns
    Batch {
        /// CSV file
        csv: PathBuf,
        /// Output directory
        #[arg(short, long, default_value = "qrcodes")]
        output_dir: PathBuf,
    },
    /// Decode the QR codes in an image
    Scan {
        /// Image file
        image: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub data: String,
    pub filename: String,
}

pub fn qrencode_args(data: &str, output: &Path, size: u32, border: u32) -> Vec<String> {
    vec![
        "-o".to_string(),
        arg(output),
        "-s".to_string(),
        size.to_string(),
        "-m".to_string(),
        border.to_string(),
        "-l".to_string(),
        "L".to_string(),
        "--".to_string(),
        data.to_string(),
    ]
}

/// zbarimg arguments: QR symbols only, XML output so payloads spanning
/// several lines stay whole.
pub fn zbarimg_args(image: &Path) -> Vec<String> {
    ["--quiet", "--xml", "-Sdisable", "-Sqrcode.enable"]
        .into_iter()
        .map(String::from)
        .chain([arg(image)])
        .collect()
}

/// Payloads of every `<symbol>` in zbarimg's XML report, in order.
pub fn parse_symbols(xml: &str) -> Vec<String> {
    static DATA: OnceLock<Regex> = OnceLock::new();
    let data = DATA.get_or_init(|| {
        Regex::new(r"(?s)<data(?:\s[^>]*)?><!\[CDATA\[(.*?)\]\]></data>").expect("static regex")
    });
    data.captures_iter(xml)
        // zbarimg splits a payload containing `]]>` across CDATA sections.
        .map(|caps| caps[1].replace("]]]]><![CDATA[>", "]]>"))
        .filter(|payload| !payload.is_empty())
        .collect()
}

/// Rows of a batch file. `filename` falls back to `qr_{n}.png`, and `.png`
/// is appended when missing.
pub fn read_batch(path: &Path) -> Result<Vec<BatchEntry>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let data_col = headers
        .iter()
        .position(|h| h.trim() == "data")
        .ok_or_else(|| Error::malformed("CSV must have a 'data' column"))?;
    let name_col = headers.iter().position(|h| h.trim() == "filename");

    let mut entries = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let data = record.get(data_col).unwrap_or_default().to_string();
        let mut filename = name_col
            .and_then(|col| record.get(col))
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("qr_{}", index + 1));
        if !filename.to_lowercase().ends_with(".png") {
            filename.push_str(".png");
        }
        entries.push(BatchEntry { data, filename });
    }
    Ok(entries)
}

fn encode(ctx: &Context, data: &str, output: &Path, size: u32, border: u32) -> Result<()> {
    let program = &ctx.config.tools.qrencode;
    ctx.runner
        .run(program, &qrencode_args(data, output, size, border))?
        .check(program)?;
    Ok(())
}

fn generate(ctx: &mut Context, data: &str, output: &Path, size: u32, border: u32) -> Result<Outcome> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    encode(ctx, data, output, size, border)?;
    Ok(Outcome::ok(format!("QR code saved to {}", output.display())))
}

fn batch(ctx: &mut Context, csv: &Path, output_dir: &Path) -> Result<Outcome> {
    require_exists(csv)?;
    let entries = read_batch(csv)?;
    if entries.is_empty() {
        return Ok(Outcome::warn(format!("No rows found in {}", csv.display())));
    }

    std::fs::create_dir_all(output_dir)?;
    for entry in &entries {
        let output = output_dir.join(&entry.filename);
        encode(ctx, &entry.data, &output, 10, 4)?;
        ctx.reporter.info(format!("Generated: {}", output.display()));
    }
    Ok(Outcome::ok(format!(
        "Generated {} QR codes in {}",
        entries.len(),
        output_dir.display()
    )))
}

fn scan(ctx: &mut Context, image: &Path) -> Result<Outcome> {
    require_exists(image)?;
    let program = ctx.config.tools.zbarimg.clone();
    let output = ctx.runner.run(&program, &zbarimg_args(image))?;
    if output.status == Some(ZBAR_NOTHING_FOUND) {
        return Ok(Outcome::warn("No QR codes found in image"));
    }
    let output = output.check(&program)?;

    let decoded = parse_symbols(&output.stdout);
    if decoded.is_empty() {
        return Ok(Outcome::warn("No QR codes found in image"));
    }
    for data in &decoded {
        // One status line per symbol.
        let shown = data.trim_end().replace("\r\n", "\n").replace('\n', "\\n");
        ctx.reporter.info(format!("Decoded: {shown}"));
    }
    Ok(Outcome::ok(format!("Decoded {} QR code(s)", decoded.len())))
}

impl Script for QrTool {
    fn run(self, ctx: &mut Context) -> Result<Outcome> {
        match self.command {
            QrCommand::Generate {
                data,
                output,
                size,
                border,
            } => generate(ctx, &data, &output, size, border),
            QrCommand::Batch { csv, output_dir } => batch(ctx, &csv, &output_dir),
            QrCommand::Scan { image } => scan(ctx, &image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Tag;
    use crate::template::run_with;
    use crate::{Config, RecordingRunner};

    fn context() -> (Context, RecordingRunner) {
        let runner = RecordingRunner::new();
        (Context::capture(Config::default(), runner.clone()), runner)
    }

    #[test]
    fn generate_passes_size_and_border() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("codes/site.png");
        let (mut ctx, runner) = context();

        let code = run_with::<QrTool, _, _>(
            [
                "qr-tool",
                "generate",
                "https://example.com",
                "-o",
                output.to_str().unwrap(),
                "-s",
                "6",
                "-b",
                "2",
            ],
            &mut ctx,
        );

        assert_eq!(code, 0);
        assert!(dir.path().join("codes").is_dir());
        let call = &runner.calls()[0];
        assert_eq!(call.program, "qrencode");
        assert_eq!(call.args, qrencode_args("https://example.com", &output, 6, 2));
        assert_eq!(ctx.reporter.tagged(Tag::Ok).len(), 1);
    }

    #[test]
    fn batch_names_rows_and_appends_png() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("codes.csv");
        std::fs::write(&csv, "data,filename\nhello,greeting\nworld,\nbye,bye.PNG\n").unwrap();

        let entries = read_batch(&csv).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, ["greeting.png", "qr_2.png", "bye.PNG"]);
    }

    #[test]
    fn batch_requires_a_data_column() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("codes.csv");
        std::fs::write(&csv, "text\nhello\n").unwrap();
        let (mut ctx, runner) = context();

        let code = run_with::<QrTool, _, _>(["qr-tool", "batch", csv.to_str().unwrap()], &mut ctx);

        assert_eq!(code, 1);
        assert_eq!(
            ctx.reporter.tagged(Tag::Error),
            ["Malformed input: CSV must have a 'data' column"]
        );
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn batch_generates_one_code_per_row() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("codes.csv");
        let out = dir.path().join("out");
        std::fs::write(&csv, "data\na\nb\n").unwrap();
        let (mut ctx, runner) = context();

        let code = run_with::<QrTool, _, _>(
            ["qr-tool", "batch", csv.to_str().unwrap(), "-o", out.to_str().unwrap()],
            &mut ctx,
        );

        assert_eq!(code, 0);
        assert_eq!(runner.calls().len(), 2);
        assert_eq!(ctx.reporter.tagged(Tag::Info).len(), 2);
        assert_eq!(
            ctx.reporter.tagged(Tag::Ok),
            [format!("Generated 2 QR codes in {}", out.display()).as_str()]
        );
    }

    const TWO_SYMBOLS: &str = "<barcodes xmlns='http://zbar.sourceforge.net/2008/barcode'>
<source href='codes.png'>
<index num='0'>
<symbol type='QR-Code' quality='1' orientation='UP'><data><![CDATA[https://example.com]]></data></symbol>
<symbol type='QR-Code' quality='1' orientation='UP'><data><![CDATA[BEGIN:VCARD
FN:Ada
END:VCARD]]></data></symbol>
</index>
</source>
</barcodes>
";

    #[test]
    fn scan_lists_each_decoded_payload() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("codes.png");
        std::fs::write(&image, b"png").unwrap();
        let (mut ctx, runner) = context();
        runner.reply_ok(TWO_SYMBOLS);

        let code = run_with::<QrTool, _, _>(["qr-tool", "scan", image.to_str().unwrap()], &mut ctx);

        assert_eq!(code, 0);
        assert_eq!(runner.calls()[0].args, zbarimg_args(&image));
        assert!(runner.calls()[0].args.contains(&"-Sqrcode.enable".to_string()));
        let infos = ctx.reporter.tagged(Tag::Info);
        assert_eq!(infos[0], "Decoded: https://example.com");
        assert_eq!(infos[1], "Decoded: BEGIN:VCARD\\nFN:Ada\\nEND:VCARD");
        assert_eq!(ctx.reporter.tagged(Tag::Ok), ["Decoded 2 QR code(s)"]);
    }

    #[test]
    fn multi_line_payload_is_one_symbol() {
        let symbols = parse_symbols(TWO_SYMBOLS);
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[1], "BEGIN:VCARD\nFN:Ada\nEND:VCARD");
    }

    #[test]
    fn dash_data_is_encoded_not_parsed() {
        let args = qrencode_args("-V", Path::new("-o.png"), 10, 4);
        assert_eq!(args[1], "./-o.png");
        assert_eq!(args[args.len() - 2..], ["--", "-V"]);
    }

    #[test]
    fn scan_without_codes_warns() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("blank.png");
        std::fs::write(&image, b"png").unwrap();
        let (mut ctx, runner) = context();
        runner.reply_status(ZBAR_NOTHING_FOUND, "");

        let code = run_with::<QrTool, _, _>(["qr-tool", "scan", image.to_str().unwrap()], &mut ctx);

        assert_eq!(code, 0);
        assert_eq!(ctx.reporter.tagged(Tag::Warn), ["No QR codes found in image"]);
    }

    #[test]
    fn scan_of_missing_image_fails() {
        let (mut ctx, runner) = context();
        let code = run_with::<QrTool, _, _>(["qr-tool", "scan", "/no/such/image.png"], &mut ctx);
        assert_eq!(code, 1);
        assert_eq!(
            ctx.reporter.tagged(Tag::Error),
            ["File not found: /no/such/image.png"]
        );
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn no_subcommand_is_an_invocation_error() {
        let (mut ctx, _) = context();
        assert_eq!(run_with::<QrTool, _, _>(["qr-tool"], &mut ctx), 2);
    }
}
