//! Handlers for every shipped utility. Each submodule holds one clap
//! parser implementing [`Script`](crate::Script); the binaries in the cli
//! crate only hand it to [`template::main`](crate::template::main).

pub mod article;
pub mod exif;
pub mod handwriting;
pub mod history;
pub mod mdtable;
pub mod meeting;
pub mod qr;
pub mod resume;
pub mod scriptgen;
pub mod text;
pub mod transcript;
pub mod video;
pub mod weather;

use crate::{Error, Result};
use std::path::Path;

/// Fail with "file not found" unless `path` exists.
pub(crate) fn require_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(Error::NotFound(path.to_path_buf()))
    }
}

/// Lower-cased extension of `path`, empty when there is none.
pub(crate) fn extension(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// `text` cut to `max` characters with a trailing `...` when shortened.
pub(crate) fn preview(text: &str, max: usize) -> String {
    crate::http::truncate(text, max)
}

/// Convert a path into a process argument. A relative path starting with
/// `-` gets a `./` prefix so the tool cannot read it as an option.
pub(crate) fn arg(path: &Path) -> String {
    let text = path.to_string_lossy();
    if text.starts_with('-') {
        format!("./{text}")
    } else {
        text.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_paths_never_look_like_options() {
        assert_eq!(arg(Path::new("-V.png")), "./-V.png");
        assert_eq!(arg(Path::new("--all=.jpg")), "./--all=.jpg");
        assert_eq!(arg(Path::new("photos/a.jpg")), "photos/a.jpg");
        assert_eq!(arg(Path::new("/tmp/-x.jpg")), "/tmp/-x.jpg");
    }
}
