use crate::classify;
use crate::discover;
use crate::engine::{ensure_output_writable, Engine};
use crate::error::HarnessError;
use crate::types::{RunReport, TestPair};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Settings for one batch run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Where the engine writes its result document, shared by every case.
    pub output: PathBuf,
    pub allow_overwrite: bool,
    /// Stage the final result document into this directory after the run.
    pub stage_dir: Option<PathBuf>,
}

/// Drive every pair to completion, in order, one subprocess at a time.
///
/// Configuration problems abort before the first spawn; per-case engine
/// failures are classified into that case's report so the batch always
/// finishes and the full picture is printed.
pub fn run_pairs(
    engine: &Engine,
    pairs: &[TestPair],
    opts: &RunOptions,
) -> Result<RunReport, HarnessError> {
    engine.validate()?;
    ensure_output_writable(&opts.output, opts.allow_overwrite)?;

    let mut report = RunReport::default();
    for (idx, pair) in pairs.iter().enumerate() {
        // After the first case the output file is this run's own artifact.
        // Clear it so a later engine run that writes nothing is never
        // credited with the previous case's document.
        if idx > 0 && opts.output.exists() {
            fs::remove_file(&opts.output).map_err(|e| {
                HarnessError::io(
                    format!("cannot reset output file {}", opts.output.display()),
                    e,
                )
            })?;
        }
        let kind = discover::fixture_kind(&pair.program);
        info!(
            program = %pair.program.display(),
            queries = %pair.queries.display(),
            "running case"
        );
        let outcome = engine.run_case(&pair.program, &pair.queries, &opts.output);
        report.cases.push(classify::classify(pair, kind, &outcome));
    }

    if let Some(dir) = &opts.stage_dir {
        stage_artifact(&opts.output, dir)?;
    }
    Ok(report)
}

fn stage_artifact(output: &Path, dir: &Path) -> Result<(), HarnessError> {
    if !output.is_file() {
        warn!(output = %output.display(), "no result document to stage");
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| {
        HarnessError::io(
            format!("cannot create artifact directory {}", dir.display()),
            e,
        )
    })?;
    let name = output.file_name().unwrap_or_else(|| OsStr::new("out.xml"));
    let dest = dir.join(name);
    if fs::rename(output, &dest).is_err() {
        // Rename fails across filesystems; fall back to copy + remove.
        fs::copy(output, &dest).map_err(|e| {
            HarnessError::io(format!("cannot stage artifact into {}", dest.display()), e)
        })?;
        if let Err(e) = fs::remove_file(output) {
            warn!(output = %output.display(), error = %e, "staged a copy; original left behind");
        }
    }
    info!(artifact = %dest.display(), "result document staged");
    Ok(())
}
