//! Workbook discovery under an attachments directory

use anyhow::{Context, Result};
use glob::{MatchOptions, glob_with};
use regex::Regex;
use std::path::{Path, PathBuf};

/// Find workbooks below `directory`.
///
/// With a `folder_pattern`, only first-level folders whose name matches it
/// are searched (e.g. one folder per year). Office lock files (`~$...`) are
/// skipped. Results are sorted so runs are reproducible.
pub fn find_workbooks(
    directory: &Path,
    folder_pattern: Option<&Regex>,
    extensions: &[String],
) -> Result<Vec<PathBuf>> {
    let roots: Vec<PathBuf> = match folder_pattern {
        Some(pattern) => std::fs::read_dir(directory)
            .with_context(|| format!("Failed to read directory: {}", directory.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .filter(|path| {
                path.file_name()
                    .is_some_and(|name| pattern.is_match(&name.to_string_lossy()))
            })
            .collect(),
        None => vec![directory.to_path_buf()],
    };

    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let mut files = Vec::new();
    for root in roots {
        for extension in extensions {
            let pattern = format!(
                "{}/**/*.{}",
                glob::Pattern::escape(&root.to_string_lossy()),
                extension.trim_start_matches('.')
            );
            let entries = glob_with(&pattern, options)
                .with_context(|| format!("Invalid search pattern: {}", pattern))?;
            for entry in entries.filter_map(|e| e.ok()) {
                if entry.is_file() && !is_lock_file(&entry) {
                    files.push(entry);
                }
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn is_lock_file(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with("~$"))
}
