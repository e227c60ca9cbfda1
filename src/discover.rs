//! Input discovery: list character and animation files to process.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{BatchError, BatchResult};

/// Return `true` when `file_name` is `<base>.<ext>` with a word-character base name and a
/// case-insensitive extension match.
pub fn matches_input(file_name: &str, ext: &str) -> bool {
    let Some((base, file_ext)) = file_name.rsplit_once('.') else {
        return false;
    };
    !base.is_empty()
        && base.chars().all(|c| c.is_alphanumeric() || c == '_')
        && file_ext.eq_ignore_ascii_case(ext)
}

/// Files in `dir` (non-recursive) accepted by [`matches_input`], sorted by file name.
///
/// Non-conforming names are skipped silently.
pub fn list_inputs(dir: &Path, ext: &str) -> BatchResult<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("read directory '{}'", dir.display()))?;

    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("list directory '{}'", dir.display()))?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !matches_input(&name, ext) {
            continue;
        }
        let is_file = entry
            .file_type()
            .with_context(|| format!("stat '{}'", entry.path().display()))?
            .is_file();
        if is_file {
            out.push(entry.path());
        }
    }
    out.sort();
    Ok(out)
}

/// Like [`list_inputs`], but an empty result is a configuration error.
pub fn require_inputs(dir: &Path, ext: &str, what: &str) -> BatchResult<Vec<PathBuf>> {
    let files = list_inputs(dir, ext)?;
    if files.is_empty() {
        return Err(BatchError::configuration(format!(
            "no {what} files matching '*.{ext}' in '{}'",
            dir.display()
        )));
    }
    Ok(files)
}

/// File name without its last extension.
pub fn file_base(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
