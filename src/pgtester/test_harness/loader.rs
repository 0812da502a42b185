//! Test specification discovery and loading
//!
//! Paths may name files or directories. Directories are walked recursively in
//! name order after resolving symlinks, and every file found is parsed as one
//! or more YAML documents. Without paths the documents are read from stdin.

use super::error::{TestHarnessError, TestHarnessResult};
use super::spec::{GroupDocument, TestGroup};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Source name used for documents read from standard input
pub const STDIN_SOURCE: &str = "(stdin)";

/// Parse every non-empty document of a YAML stream into a test group
///
/// Documents that are empty (or contain only `null`) are skipped and do not
/// consume an index.
pub fn from_str(content: &str, source: &str) -> TestHarnessResult<Vec<TestGroup>> {
    let mut groups = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let parsed = Option::<GroupDocument>::deserialize(document)
            .map_err(|e| TestHarnessError::from(e).with_source(source))?;
        let Some(parsed) = parsed else {
            log::debug!("skipping empty document in {}", source);
            continue;
        };
        groups.push(parsed.into_group(source, groups.len())?);
    }
    log::debug!("{} test group(s) read from {}", groups.len(), source);
    Ok(groups)
}

/// Parse a stream, naming its groups after `source`
pub fn from_reader(mut reader: impl Read, source: &str) -> TestHarnessResult<Vec<TestGroup>> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|e| TestHarnessError::from(e).with_source(source))?;
    from_str(&content, source)
}

/// Load the groups of a single file
pub fn from_file(path: impl AsRef<Path>) -> TestHarnessResult<Vec<TestGroup>> {
    let path = path.as_ref();
    let name = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| TestHarnessError::IoError {
        message: e.to_string(),
        path: name.clone(),
    })?;
    from_str(&content, &name)
}

/// Load a file, or every file below a directory in sorted order
pub fn from_file_or_dir(path: impl AsRef<Path>) -> TestHarnessResult<Vec<TestGroup>> {
    let path = path.as_ref();
    log::info!("Parsing yaml from {}", path.display());
    let resolved = std::fs::canonicalize(path).map_err(|e| TestHarnessError::IoError {
        message: e.to_string(),
        path: path.display().to_string(),
    })?;

    if !resolved.is_dir() {
        return from_file(&resolved);
    }

    let mut entries: Vec<PathBuf> = std::fs::read_dir(&resolved)
        .and_then(|dir| {
            dir.map(|entry| entry.map(|e| e.path()))
                .collect::<Result<Vec<_>, _>>()
        })
        .map_err(|e| TestHarnessError::IoError {
            message: e.to_string(),
            path: resolved.display().to_string(),
        })?;
    entries.sort();

    let mut groups = Vec::new();
    for entry in entries {
        groups.extend(from_file_or_dir(&entry)?);
    }
    Ok(groups)
}

/// Read test groups from standard input
pub fn from_stdin() -> TestHarnessResult<Vec<TestGroup>> {
    log::info!("Parsing yaml from stdin");
    from_reader(std::io::stdin().lock(), STDIN_SOURCE)
}

/// Load every group named by `paths` (stdin when empty)
///
/// `force_debug` turns on debug logging for every group, in addition to
/// groups that ask for it themselves.
pub fn load_groups(paths: &[PathBuf], force_debug: bool) -> TestHarnessResult<Vec<TestGroup>> {
    let mut groups = if paths.is_empty() {
        from_stdin()?
    } else {
        let mut all = Vec::new();
        for path in paths {
            all.extend(from_file_or_dir(path)?);
        }
        all
    };

    for group in &mut groups {
        group.debug = group.debug || force_debug;
    }
    Ok(groups)
}
