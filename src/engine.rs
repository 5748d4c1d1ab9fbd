use crate::document;
use crate::error::HarnessError;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::debug;
use wait_timeout::ChildExt;

/// What one engine invocation means to the classifier: either a parsed
/// result document, or no usable document at all. Nonzero exit, spawn
/// failure, a missing output file and unparsable output all land in the
/// second bucket; the exit code alone never decides pass/fail.
#[derive(Debug)]
pub enum EngineOutcome {
    Document(document::Node),
    NoDocument { diagnostic: String },
}

/// Captured status and streams from one subprocess run.
#[derive(Debug)]
pub struct EngineRun {
    pub success: bool,
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

/// The external analyzer, invoked as `engine <program> <queries> <output>`.
#[derive(Debug, Clone)]
pub struct Engine {
    pub exe: String,
    /// Kill the subprocess after this long. Off by default; the engine
    /// carries its own per-query timeouts in the query file.
    pub timeout: Option<Duration>,
    /// Swallow engine stderr instead of echoing it through.
    pub quiet: bool,
}

impl Engine {
    pub fn new(exe: impl Into<String>) -> Self {
        Self {
            exe: exe.into(),
            timeout: None,
            quiet: false,
        }
    }

    /// Resolve the executable the way a shell would: as a path when the
    /// name contains a separator, otherwise via PATH lookup.
    pub fn resolved_exe(&self) -> Option<PathBuf> {
        if self.exe.contains(std::path::MAIN_SEPARATOR)
            || self.exe.starts_with("./")
            || self.exe.starts_with(".\\")
        {
            let p = PathBuf::from(&self.exe);
            return p.is_file().then_some(p);
        }
        which::which(&self.exe).ok()
    }

    /// Fail fast before any case runs when the engine cannot be found.
    pub fn validate(&self) -> Result<(), HarnessError> {
        self.resolved_exe().map(|_| ()).ok_or_else(|| {
            HarnessError::Config(format!(
                "engine executable '{}' not found; pass --engine",
                self.exe
            ))
        })
    }

    fn invoke(&self, program: &Path, queries: &Path, output: &Path) -> std::io::Result<EngineRun> {
        let mut cmd = Command::new(&self.exe);
        cmd.arg(program)
            .arg(queries)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        let mut timed_out = None;
        if let Some(timeout) = self.timeout {
            if child.wait_timeout(timeout)?.is_none() {
                let _ = child.kill();
                timed_out = Some(timeout);
            }
        }
        let out = child.wait_with_output()?;
        let status = match timed_out {
            Some(timeout) => format!("timed out after {} s", timeout.as_secs()),
            None => out.status.to_string(),
        };
        Ok(EngineRun {
            success: timed_out.is_none() && out.status.success(),
            status,
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }

    /// One test-case invocation. Every failure mode folds into
    /// `NoDocument` so a batch never aborts on a misbehaving engine.
    pub fn run_case(&self, program: &Path, queries: &Path, output: &Path) -> EngineOutcome {
        let run = match self.invoke(program, queries, output) {
            Ok(run) => run,
            Err(e) => {
                return EngineOutcome::NoDocument {
                    diagnostic: format!("failed to start '{}': {e}", self.exe),
                }
            }
        };
        if !self.quiet && !run.stderr.is_empty() {
            eprint!("{}", run.stderr);
        }
        if !run.stdout.is_empty() {
            debug!(stdout = %run.stdout.trim_end(), "engine output");
        }
        if !run.success {
            return EngineOutcome::NoDocument {
                diagnostic: diagnostic_text(&run),
            };
        }
        let bytes = match std::fs::read(output) {
            Ok(bytes) => bytes,
            Err(e) => {
                return EngineOutcome::NoDocument {
                    diagnostic: format!(
                        "engine exited cleanly but wrote no result document to {}: {e}",
                        output.display()
                    ),
                }
            }
        };
        match document::parse_document(&bytes) {
            Ok(root) => EngineOutcome::Document(root),
            Err(e) => EngineOutcome::NoDocument {
                diagnostic: format!("unparsable result document: {e}"),
            },
        }
    }

    /// Oracle-mode invocation for answer synthesis; here a dead engine is
    /// fatal rather than a per-case verdict.
    pub fn run_oracle(
        &self,
        program: &Path,
        queries: &Path,
        output: &Path,
    ) -> Result<EngineRun, HarnessError> {
        self.invoke(program, queries, output)
            .map_err(|e| HarnessError::io(format!("failed to run '{}'", self.exe), e))
    }
}

fn diagnostic_text(run: &EngineRun) -> String {
    let stderr = run.stderr.trim();
    if stderr.is_empty() {
        format!("engine failed ({})", run.status)
    } else {
        format!("engine failed ({}): {stderr}", run.status)
    }
}

/// No-clobber precondition on the output path, checked before the first
/// subprocess is spawned.
pub fn ensure_output_writable(path: &Path, allow_overwrite: bool) -> Result<(), HarnessError> {
    if path.exists() && !allow_overwrite {
        return Err(HarnessError::OutputExists(path.to_path_buf()));
    }
    Ok(())
}
