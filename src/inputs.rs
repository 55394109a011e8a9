//! Input collection for the CLI.
//!
//! Turns command-line paths into an ordered list of [`SourceFile`]s:
//!
//! - A file is taken as is, in the position it was given.
//! - A directory contributes its images (one level deep, hidden files
//!   skipped) in natural filename order, so `shot-2.jpg` comes before
//!   `shot-10.jpg`.
//!
//! Only directory listings are sorted. Explicit files keep the caller's
//! order; the stitch core itself never reorders anything.

use crate::imaging::supported_input_extensions;
use crate::types::SourceFile;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Input not found: {0}")]
    NotFound(PathBuf),
    #[error("No images found in {0}")]
    EmptyDirectory(PathBuf),
}

/// Whether `path` has an extension one of the compiled-in decoders reads.
pub fn is_supported_image(path: &Path) -> bool {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    supported_input_extensions().contains(&ext.as_str())
}

/// Image files directly inside `dir`, in natural order.
pub fn list_directory(dir: &Path) -> Result<Vec<PathBuf>, InputError> {
    let mut images = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && entry.file_type().is_file() && is_supported_image(entry.path()) {
            images.push(entry.into_path());
        }
    }
    images.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));
    Ok(images)
}

/// Expand `paths` into image files, keeping argument order.
pub fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>, InputError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let listed = list_directory(path)?;
            if listed.is_empty() {
                return Err(InputError::EmptyDirectory(path.clone()));
            }
            files.extend(listed);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(InputError::NotFound(path.clone()));
        }
    }
    Ok(files)
}

/// Read every expanded path into memory.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<SourceFile>, InputError> {
    expand_paths(paths)?
        .into_iter()
        .map(|path| {
            let bytes = fs::read(&path).map_err(|source| InputError::Io {
                path: path.clone(),
                source,
            })?;
            Ok(SourceFile::new(file_name(&path), bytes))
        })
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Compare names with digit runs taken as numbers.
///
/// Text runs compare case-insensitively; exact ties fall back to a plain
/// byte comparison so the order is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut left, mut right) = (a, b);
    loop {
        match (left.is_empty(), right.is_empty()) {
            (true, true) => return a.cmp(b),
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }

        let (l_chunk, l_rest) = split_chunk(left);
        let (r_chunk, r_rest) = split_chunk(right);
        let l_digits = l_chunk.starts_with(|c: char| c.is_ascii_digit());
        let r_digits = r_chunk.starts_with(|c: char| c.is_ascii_digit());

        let ordering = match (l_digits, r_digits) {
            (true, true) => {
                let l = l_chunk.trim_start_matches('0');
                let r = r_chunk.trim_start_matches('0');
                l.len().cmp(&r.len()).then_with(|| l.cmp(r))
            }
            // Numbers sort before words
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => l_chunk.to_lowercase().cmp(&r_chunk.to_lowercase()),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
        left = l_rest;
        right = r_rest;
    }
}

/// Split off the leading run of digits or non-digits.
fn split_chunk(s: &str) -> (&str, &str) {
    let digits = s.starts_with(|c: char| c.is_ascii_digit());
    let end = s
        .find(|c: char| c.is_ascii_digit() != digits)
        .unwrap_or(s.len());
    s.split_at(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, name.as_bytes()).unwrap();
        path
    }

    // =========================================================================
    // natural_cmp
    // =========================================================================

    #[test]
    fn digits_compare_numerically() {
        let mut names = vec!["shot-10.jpg", "shot-2.jpg", "shot-1.jpg", "shot-002b.jpg"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(
            names,
            vec!["shot-1.jpg", "shot-2.jpg", "shot-002b.jpg", "shot-10.jpg"]
        );
    }

    #[test]
    fn text_compares_case_insensitively() {
        assert_eq!(natural_cmp("Beta.png", "alpha.png"), Ordering::Greater);
        assert_eq!(natural_cmp("IMG_9.jpg", "img_10.jpg"), Ordering::Less);
    }

    #[test]
    fn order_is_total() {
        assert_ne!(natural_cmp("a01", "a1"), Ordering::Equal);
        assert_eq!(natural_cmp("same", "same"), Ordering::Equal);
        assert_eq!(natural_cmp("a", "a1"), Ordering::Less);
    }

    // =========================================================================
    // Directory listing
    // =========================================================================

    #[test]
    fn directory_lists_images_in_natural_order() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "page-10.png");
        touch(tmp.path(), "page-9.jpg");
        touch(tmp.path(), "notes.txt");
        touch(tmp.path(), ".hidden.jpg");
        fs::create_dir(tmp.path().join("sub")).unwrap();
        touch(&tmp.path().join("sub"), "page-1.jpg");

        let listed: Vec<String> = list_directory(tmp.path())
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(listed, vec!["page-9.jpg", "page-10.png"]);
    }

    #[test]
    fn explicit_files_keep_argument_order() {
        let tmp = TempDir::new().unwrap();
        let b = touch(tmp.path(), "b.jpg");
        let a = touch(tmp.path(), "a.jpg");

        let inputs = collect_inputs(&[b, a]).unwrap();
        let names: Vec<&str> = inputs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b.jpg", "a.jpg"]);
        assert_eq!(&inputs[0].bytes[..], b"b.jpg");
    }

    #[test]
    fn mixed_files_and_directories() {
        let tmp = TempDir::new().unwrap();
        let cover = touch(tmp.path(), "cover.jpg");
        let pages = tmp.path().join("pages");
        fs::create_dir(&pages).unwrap();
        touch(&pages, "2.jpg");
        touch(&pages, "1.jpg");

        let expanded = expand_paths(&[cover, pages]).unwrap();
        let names: Vec<String> = expanded.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["cover.jpg", "1.jpg", "2.jpg"]);
    }

    #[test]
    fn missing_path_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = expand_paths(&[tmp.path().join("nope.jpg")]);
        assert!(matches!(result, Err(InputError::NotFound(_))));
    }

    #[test]
    fn directory_without_images_is_error() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "readme.md");
        let result = expand_paths(&[tmp.path().to_path_buf()]);
        assert!(matches!(result, Err(InputError::EmptyDirectory(_))));
    }
}
