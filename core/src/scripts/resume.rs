//! Resume parser: pulls contact details, skills and education out of PDF,
//! DOCX or plain-text resumes.

use super::text::{decode_entities, strip_tags};
use super::{arg, extension, preview, require_exists};
use crate::template::{Context, Script};
use crate::{Error, Outcome, Result};
use clap::Parser;
use regex::Regex;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const RAW_PREVIEW: usize = 500;

const SKILLS: &[&str] = &[
    "python", "javascript", "java", "c++", "c#", "ruby", "php", "swift", "kotlin", "rust", "go",
    "react", "angular", "vue", "node", "django", "flask", "spring", "sql", "mongodb",
    "postgresql", "mysql", "redis", "aws", "azure", "gcp", "docker", "kubernetes", "git",
    "agile", "scrum", "jira", "machine learning", "ai", "data analysis", "statistics",
];

const EDUCATION: &[&str] = &[
    "university", "college", "bachelor", "master", "phd", "degree", "b.s.", "m.s.", "b.a.",
    "m.a.",
];

const JOB_TITLES: &[&str] = &["engineer", "developer", "manager", "specialist"];

/// Parse resumes and extract structured data.
#[derive(Debug, Parser)]
#[command(name = "resume-parse", version)]
pub struct ResumeParse {
    /// Resume file (PDF, DOCX or TXT)
    pub resume: PathBuf,
    /// Output JSON file (prints to the console when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Include the start of the raw text in the output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumeData {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub urls: Vec<String>,
    pub skills: Vec<String>,
    pub education: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

pub fn extract_email(text: &str) -> Option<String> {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    regex(&EMAIL, r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
        .find(text)
        .map(|m| m.as_str().to_string())
}

pub fn extract_phone(text: &str) -> Option<String> {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    regex(
        &PHONE,
        r"\+?\d{1,3}[-.\s]?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}|\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}",
    )
    .find(text)
    .map(|m| m.as_str().trim().to_string())
}

pub fn extract_urls(text: &str) -> Vec<String> {
    static URL: OnceLock<Regex> = OnceLock::new();
    regex(
        &URL,
        r"https?://(?:www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b[-a-zA-Z0-9()@:%_+.~#?&/=]*",
    )
    .find_iter(text)
    .map(|m| m.as_str().to_string())
    .collect()
}

/// First non-empty line, if it is short and does not read like a job title.
pub fn extract_name(text: &str) -> Option<String> {
    let first = text.lines().map(str::trim).find(|line| !line.is_empty())?;
    let lower = first.to_lowercase();
    let short = first.split_whitespace().count() <= 4;
    let title = JOB_TITLES.iter().any(|word| lower.contains(word));
    (short && !title).then(|| first.to_string())
}

/// Known skills, matched as whole words, title-cased, in list order.
pub fn extract_skills(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    SKILLS
        .iter()
        .filter(|skill| contains_word(&lower, skill))
        .map(|skill| title_case(skill))
        .collect()
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut boundary = true;
    for ch in text.chars() {
        if boundary {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        boundary = !ch.is_alphabetic();
    }
    out
}

pub fn extract_education(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            EDUCATION.iter().any(|word| lower.contains(word))
        })
        .map(|line| line.trim().to_string())
        .collect()
}

pub fn parse_text(text: &str, include_raw: bool) -> ResumeData {
    ResumeData {
        name: extract_name(text),
        email: extract_email(text),
        phone: extract_phone(text),
        urls: extract_urls(text),
        skills: extract_skills(text),
        education: extract_education(text),
        raw_text: include_raw.then(|| preview(text, RAW_PREVIEW)),
    }
}

/// Paragraph text of a `.docx` file, one paragraph per line.
pub fn docx_text(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut xml = String::new();
    archive.by_name("word/document.xml")?.read_to_string(&mut xml)?;

    let with_breaks = xml.replace("</w:p>", "\n").replace("<w:tab/>", "\t");
    Ok(decode_entities(&strip_tags(&with_breaks)))
}

fn extract_text(ctx: &Context, path: &Path) -> Result<String> {
    match extension(path).as_str() {
        "pdf" => {
            let program = &ctx.config.tools.pdftotext;
            let args = vec!["-layout".to_string(), arg(path), "-".to_string()];
            Ok(ctx.runner.run(program, &args)?.check(program)?.stdout)
        }
        "docx" => docx_text(path),
        _ => Ok(std::fs::read_to_string(path)?),
    }
}

impl Script for ResumeParse {
    fn validate(&self, _ctx: &Context) -> Result<()> {
        match extension(&self.resume).as_str() {
            "pdf" | "docx" | "txt" => Ok(()),
            _ => Err(Error::invocation("File must be .pdf, .docx or .txt")),
        }
    }

    fn run(self, ctx: &mut Context) -> Result<Outcome> {
        require_exists(&self.resume)?;
        ctx.reporter.info(format!("Parsing resume: {}", self.resume.display()));

        let text = extract_text(ctx, &self.resume)?;
        if text.trim().is_empty() {
            return Err(Error::malformed("no text could be extracted from the resume"));
        }
        let data = parse_text(&text, self.verbose);
        let json = serde_json::to_string_pretty(&data)?;

        match self.output {
            Some(output) => {
                std::fs::write(&output, json)?;
                Ok(Outcome::ok(format!("Resume data saved to {}", output.display())))
            }
            None => {
                ctx.reporter.raw(json);
                Ok(Outcome::ok(format!(
                    "Parsed resume: {} skill(s), {} education line(s)",
                    data.skills.len(),
                    data.education.len()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Tag;
    use crate::template::run_with;
    use crate::{Config, RecordingRunner};
    use std::io::Write;

    const RESUME: &str = "Ada Lovelace
ada@example.org | +1 555-123-4567
https://github.com/ada

Skills: Rust, Python, SQL, Machine Learning, Docker
Maintained analytical engine notes.

Education
University of London, Mathematics
";

    #[test]
    fn extracts_contact_details() {
        let data = parse_text(RESUME, false);
        assert_eq!(data.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(data.email.as_deref(), Some("ada@example.org"));
        assert_eq!(data.phone.as_deref(), Some("+1 555-123-4567"));
        assert_eq!(data.urls, ["https://github.com/ada"]);
        assert_eq!(data.raw_text, None);
    }

    #[test]
    fn skills_match_whole_words_only() {
        let data = parse_text(RESUME, false);
        assert_eq!(
            data.skills,
            ["Python", "Rust", "Sql", "Docker", "Machine Learning"]
        );
        assert!(!data.skills.contains(&"Ai".to_string()));
        assert!(!data.skills.contains(&"Java".to_string()));
    }

    #[test]
    fn symbol_skills_are_found() {
        assert_eq!(extract_skills("C++ and C# daily"), ["C++", "C#"]);
    }

    #[test]
    fn job_title_first_line_is_not_a_name() {
        assert_eq!(extract_name("\n  Senior Software Engineer\nBob"), None);
        assert_eq!(extract_name("one two three four five"), None);
    }

    #[test]
    fn education_lines_are_kept_verbatim() {
        assert_eq!(extract_education(RESUME), ["University of London, Mathematics"]);
    }

    #[test]
    fn reads_docx_paragraphs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.docx");
        let file = std::fs::File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(
            br#"<w:document><w:body><w:p><w:r><w:t>Grace Hopper</w:t></w:r></w:p><w:p><w:r><w:t>grace@navy.mil &amp; COBOL</w:t></w:r></w:p></w:body></w:document>"#,
        )
        .unwrap();
        zip.finish().unwrap();

        let text = docx_text(&path).unwrap();
        assert_eq!(text.lines().next(), Some("Grace Hopper"));
        assert!(text.contains("grace@navy.mil & COBOL"));
    }

    #[test]
    fn pdf_goes_through_pdftotext() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        let runner = RecordingRunner::new();
        runner.reply_ok(RESUME);
        let mut ctx = Context::capture(Config::default(), runner.clone());

        let code = run_with::<ResumeParse, _, _>(
            ["resume-parse".into(), path.into_os_string(), "-v".into()],
            &mut ctx,
        );

        assert_eq!(code, 0);
        assert_eq!(runner.calls()[0].program, "pdftotext");
        assert!(ctx.reporter.lines().iter().any(|l| l.contains("\"raw_text\"")));
        assert_eq!(ctx.reporter.tagged(Tag::Ok).len(), 1);
    }

    #[test]
    fn unsupported_extension_is_an_invocation_error() {
        let mut ctx = Context::capture(Config::default(), RecordingRunner::new());
        assert_eq!(run_with::<ResumeParse, _, _>(["resume-parse", "cv.odt"], &mut ctx), 2);
    }

    #[test]
    fn writes_json_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cv.txt");
        let output = dir.path().join("cv.json");
        std::fs::write(&input, RESUME).unwrap();
        let mut ctx = Context::capture(Config::default(), RecordingRunner::new());

        let code = run_with::<ResumeParse, _, _>(
            [
                "resume-parse".into(),
                input.into_os_string(),
                "-o".into(),
                output.clone().into_os_string(),
            ],
            &mut ctx,
        );

        assert_eq!(code, 0);
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(json["email"], "ada@example.org");
        assert!(json.get("raw_text").is_none());
    }
}
