use crate::error::HarnessError;
use crate::types::{FixtureKind, TestPair};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Program files end in this suffix; the partner query file swaps it.
pub const SOURCE_SUFFIX: &str = "_source.txt";
pub const QUERIES_SUFFIX: &str = "_queries.txt";

// A fixture counts as intentionally invalid only when its path carries
// both markers, as plain case-sensitive substrings.
const INVALID_MARKER: &str = "invalid";
const LANGUAGE_MARKER: &str = "simple";

/// Partner query file for a program file, by suffix substitution.
/// Pure name rewriting; the caller decides whether the file exists.
pub fn deduce_partner(program: &Path) -> Option<PathBuf> {
    let name = program.file_name()?.to_str()?;
    let stem = name.strip_suffix(SOURCE_SUFFIX)?;
    Some(program.with_file_name(format!("{stem}{QUERIES_SUFFIX}")))
}

/// Classify a fixture from its path alone; the content is never inspected.
pub fn fixture_kind(program: &Path) -> FixtureKind {
    let text = program.to_string_lossy();
    if text.contains(INVALID_MARKER) && text.contains(LANGUAGE_MARKER) {
        FixtureKind::ExpectedFailure
    } else {
        FixtureKind::Normal
    }
}

/// Resolve a user-supplied path into the ordered list of test pairs.
///
/// A file plus an existing query file is a single case; a missing or
/// omitted query file is deduced by suffix substitution. A directory is
/// scanned for `*_source.txt` files, orphans are skipped with a
/// diagnostic, and pairs come back sorted by program path so repeated
/// runs see the same order.
pub fn discover(program: &Path, queries: Option<&Path>) -> Result<Vec<TestPair>, HarnessError> {
    if program.is_dir() {
        if queries.is_some() {
            return Err(HarnessError::Config(
                "an explicit query file cannot be combined with a test directory".to_string(),
            ));
        }
        return discover_directory(program);
    }
    if !program.is_file() {
        return Err(HarnessError::Discovery(format!(
            "program file {} does not exist",
            program.display()
        )));
    }
    let queries = match queries {
        Some(q) if q.is_file() => q.to_path_buf(),
        _ => {
            let deduced = deduce_partner(program).ok_or_else(|| {
                HarnessError::Discovery(format!(
                    "{} does not end in {SOURCE_SUFFIX}; pass the query file explicitly",
                    program.display()
                ))
            })?;
            if !deduced.is_file() {
                return Err(HarnessError::Discovery(format!(
                    "deduced query file {} does not exist",
                    deduced.display()
                )));
            }
            deduced
        }
    };
    Ok(vec![TestPair {
        program: program.to_path_buf(),
        queries,
    }])
}

fn discover_directory(dir: &Path) -> Result<Vec<TestPair>, HarnessError> {
    let mut programs: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| {
            HarnessError::Discovery(format!("cannot walk {}: {e}", dir.display()))
        })?;
        if entry.file_type().is_file()
            && entry.file_name().to_string_lossy().ends_with(SOURCE_SUFFIX)
        {
            programs.push(entry.into_path());
        }
    }
    if programs.is_empty() {
        return Err(HarnessError::Discovery(format!(
            "no *{SOURCE_SUFFIX} files under {}",
            dir.display()
        )));
    }
    // Directory listings are not inherently ordered.
    programs.sort();

    let mut pairs = Vec::new();
    for program in programs {
        let Some(partner) = deduce_partner(&program) else {
            continue;
        };
        if partner.is_file() {
            pairs.push(TestPair {
                program,
                queries: partner,
            });
        } else {
            warn!(
                program = %program.display(),
                missing = %partner.display(),
                "skipping program file without a partner query file"
            );
        }
    }
    if pairs.is_empty() {
        return Err(HarnessError::Discovery(format!(
            "no program file under {} has a partner query file",
            dir.display()
        )));
    }
    Ok(pairs)
}
