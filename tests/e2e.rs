#![cfg(unix)]

use anyhow::Result;
use spa_test::discover::discover;
use spa_test::engine::{ensure_output_writable, Engine};
use spa_test::error::HarnessError;
use spa_test::runner::{run_pairs, RunOptions};
use spa_test::synth;
use spa_test::types::{CaseStatus, TestPair};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

// Stand-in engine: a shell script taking the same three positional
// arguments as the real analyzer.
fn stub_engine(dir: &Path, body: &str) -> Result<Engine> {
    let path = dir.join("engine.sh");
    fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
    let mut perm = fs::metadata(&path)?.permissions();
    perm.set_mode(0o755);
    fs::set_permissions(&path, perm)?;
    Ok(Engine::new(path.to_string_lossy().into_owned()))
}

fn fixture(dir: &Path, program_name: &str) -> Result<TestPair> {
    let program = dir.join(program_name);
    let queries = dir.join(
        program_name
            .strip_suffix("_source.txt")
            .map(|stem| format!("{stem}_queries.txt"))
            .unwrap_or_else(|| "queries.txt".to_string()),
    );
    fs::write(&program, "procedure main { x = 1; }")?;
    fs::write(&queries, "1 - tc\nstmt s; Select s\n\n5, 7, 9\n5000\n")?;
    Ok(TestPair { program, queries })
}

fn opts(dir: &Path) -> RunOptions {
    RunOptions {
        output: dir.join("out.xml"),
        allow_overwrite: false,
        stage_dir: None,
    }
}

#[test]
fn valid_program_with_one_passing_query() -> Result<()> {
    let dir = tempdir()?;
    let engine = stub_engine(
        dir.path(),
        r#"printf '<test_results><query><id>1</id><passed/></query></test_results>' > "$3""#,
    )?;
    let pair = fixture(dir.path(), "loop_source.txt")?;

    let report = run_pairs(&engine, &[pair], &opts(dir.path()))?;
    assert!(report.all_passed());
    assert_eq!(report.cases[0].status, CaseStatus::Passed);
    assert_eq!(report.cases[0].total, 1);
    assert_eq!(report.cases[0].passed_queries(), 1);
    Ok(())
}

#[test]
fn failing_queries_are_reported_by_id() -> Result<()> {
    let dir = tempdir()?;
    let engine = stub_engine(
        dir.path(),
        r#"printf '<test_results><query><id>1</id><passed/></query><query><id>2</id><failed/></query></test_results>' > "$3""#,
    )?;
    let pair = fixture(dir.path(), "loop_source.txt")?;

    let report = run_pairs(&engine, &[pair], &opts(dir.path()))?;
    assert!(!report.all_passed());
    assert_eq!(report.cases[0].status, CaseStatus::FailedPragmaViolation);
    assert_eq!(report.cases[0].failing_ids, vec!["2"]);
    assert_eq!(report.cases[0].total, 2);
    Ok(())
}

#[test]
fn crashing_engine_on_an_invalid_fixture_counts_as_a_pass() -> Result<()> {
    let dir = tempdir()?;
    let engine = stub_engine(dir.path(), "echo 'semantic error' >&2; exit 1")?;
    let pair = fixture(dir.path(), "invalid_simple_source.txt")?;

    let report = run_pairs(&engine, &[pair], &opts(dir.path()))?;
    assert!(report.all_passed());
    assert_eq!(report.cases[0].status, CaseStatus::PassedAsExpectedFailure);
    Ok(())
}

#[test]
fn accepted_invalid_fixture_is_a_failure_regardless_of_verdicts() -> Result<()> {
    let dir = tempdir()?;
    let engine = stub_engine(
        dir.path(),
        r#"printf '<test_results><query><id>1</id><passed/></query></test_results>' > "$3""#,
    )?;
    let pair = fixture(dir.path(), "invalid_simple_source.txt")?;

    let report = run_pairs(&engine, &[pair], &opts(dir.path()))?;
    assert!(!report.all_passed());
    assert_eq!(report.cases[0].status, CaseStatus::FailedPragmaViolation);
    Ok(())
}

#[test]
fn malformed_document_is_an_unexpected_parse_error() -> Result<()> {
    let dir = tempdir()?;
    let engine = stub_engine(dir.path(), r#"printf 'not a document' > "$3""#)?;
    let pair = fixture(dir.path(), "loop_source.txt")?;

    let report = run_pairs(&engine, &[pair], &opts(dir.path()))?;
    assert_eq!(report.cases[0].status, CaseStatus::ParseErrorUnexpected);
    assert!(report.cases[0]
        .diagnostic
        .as_deref()
        .unwrap()
        .contains("unparsable"));
    Ok(())
}

#[test]
fn crashing_engine_on_a_normal_fixture_surfaces_its_stderr() -> Result<()> {
    let dir = tempdir()?;
    let engine = stub_engine(dir.path(), "echo 'cannot open source' >&2; exit 3")?;
    let pair = fixture(dir.path(), "loop_source.txt")?;

    let report = run_pairs(&engine, &[pair], &opts(dir.path()))?;
    assert_eq!(report.cases[0].status, CaseStatus::ParseErrorUnexpected);
    assert!(report.cases[0]
        .diagnostic
        .as_deref()
        .unwrap()
        .contains("cannot open source"));
    Ok(())
}

#[test]
fn existing_output_blocks_the_run_before_any_spawn() -> Result<()> {
    let dir = tempdir()?;
    let marker = dir.path().join("spawned");
    let engine = stub_engine(
        dir.path(),
        &format!(r#"touch '{}'; exit 0"#, marker.display()),
    )?;
    let pair = fixture(dir.path(), "loop_source.txt")?;
    let run_opts = opts(dir.path());
    fs::write(&run_opts.output, "leftover")?;

    assert!(matches!(
        run_pairs(&engine, &[pair.clone()], &run_opts),
        Err(HarnessError::OutputExists(_))
    ));
    assert!(!marker.exists(), "engine must not have been spawned");

    let report = run_pairs(
        &engine,
        &[pair],
        &RunOptions {
            allow_overwrite: true,
            ..run_opts
        },
    )?;
    assert_eq!(report.cases.len(), 1);
    assert!(marker.exists());
    Ok(())
}

#[test]
fn directory_batch_reuses_the_output_path_across_cases() -> Result<()> {
    let dir = tempdir()?;
    let engine = stub_engine(
        dir.path(),
        r#"printf '<test_results><query><id>1</id><passed/></query></test_results>' > "$3""#,
    )?;
    fixture(dir.path(), "a_source.txt")?;
    fixture(dir.path(), "b_source.txt")?;

    let pairs = discover(dir.path(), None)?;
    assert_eq!(pairs.len(), 2);
    let run_opts = opts(dir.path());
    let report = run_pairs(&engine, &pairs, &run_opts)?;
    assert_eq!(report.cases.len(), 2);
    assert!(report.all_passed());
    // The last case's artifact stays on disk.
    assert!(run_opts.output.is_file());
    Ok(())
}

#[test]
fn serve_staging_moves_the_artifact() -> Result<()> {
    let dir = tempdir()?;
    let engine = stub_engine(
        dir.path(),
        r#"printf '<test_results><query><id>1</id><passed/></query></test_results>' > "$3""#,
    )?;
    let pair = fixture(dir.path(), "loop_source.txt")?;
    let stage = dir.path().join("artifacts");
    let run_opts = RunOptions {
        stage_dir: Some(stage.clone()),
        ..opts(dir.path())
    };

    run_pairs(&engine, &[pair], &run_opts)?;
    assert!(stage.join("out.xml").is_file());
    assert!(!run_opts.output.exists());
    Ok(())
}

#[test]
fn hung_engine_is_killed_after_the_configured_timeout() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = stub_engine(dir.path(), "exec sleep 5")?;
    engine.timeout = Some(Duration::from_secs(1));
    let pair = fixture(dir.path(), "loop_source.txt")?;

    let report = run_pairs(&engine, &[pair], &opts(dir.path()))?;
    assert_eq!(report.cases[0].status, CaseStatus::ParseErrorUnexpected);
    assert!(report.cases[0]
        .diagnostic
        .as_deref()
        .unwrap()
        .contains("timed out"));
    Ok(())
}

#[test]
fn missing_engine_fails_validation_before_the_run() {
    let engine = Engine::new("definitely-not-a-real-engine-binary");
    assert!(matches!(
        engine.validate(),
        Err(HarnessError::Config(_))
    ));
}

#[test]
fn oracle_run_synthesizes_regrouped_answers() -> Result<()> {
    let dir = tempdir()?;
    let engine = stub_engine(
        dir.path(),
        r#"printf '<r/>' > "$3"
echo 'Your answer: a1 b1 a2 b2'
echo 'Your answer: v1 v2 v3'"#,
    )?;
    let program = dir.path().join("gen_source.txt");
    fs::write(&program, "procedure main { x = 1; }")?;
    let queries = vec![
        "assign a; variable b; Select <a, b> such that Uses(a, b)".to_string(),
        "variable v; Select v".to_string(),
    ];

    let records = synth::synthesize(
        &engine,
        &program,
        &queries,
        &dir.path().join("generated_queries.txt"),
        &dir.path().join("oracle_out.xml"),
    )?;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].answer.as_deref(), Some("a1 b1, a2 b2"));
    assert_eq!(records[1].answer.as_deref(), Some("v1, v2, v3"));
    Ok(())
}

#[test]
fn scaffold_file_is_reused_as_the_oracle_query_file() -> Result<()> {
    let dir = tempdir()?;
    // The stub checks its second argument exists before answering.
    let engine = stub_engine(
        dir.path(),
        r#"test -f "$2" || exit 9
printf '<r/>' > "$3"
echo 'Your answer: x'"#,
    )?;
    let program = dir.path().join("gen_source.txt");
    fs::write(&program, "")?;
    let out = dir.path().join("generated_queries.txt");

    let records = synth::synthesize(
        &engine,
        &program,
        &["variable v; Select v".to_string()],
        &out,
        &dir.path().join("oracle_out.xml"),
    )?;
    assert_eq!(records[0].answer.as_deref(), Some("x"));
    assert!(out.is_file());
    Ok(())
}

#[test]
fn oracle_output_guard_honors_the_override_flag() -> Result<()> {
    let dir = tempdir()?;
    let existing = dir.path().join("oracle_out.xml");
    fs::write(&existing, "stale")?;
    assert!(matches!(
        ensure_output_writable(&existing, false),
        Err(HarnessError::OutputExists(_))
    ));
    ensure_output_writable(&existing, true)?;
    Ok(())
}
