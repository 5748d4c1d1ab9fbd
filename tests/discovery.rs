use anyhow::Result;
use spa_test::discover::discover;
use spa_test::error::HarnessError;
use std::fs;
use tempfile::tempdir;

#[test]
fn directory_pairs_and_skips_orphans() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("p_source.txt"), "procedure p { x = 1; }")?;
    fs::write(dir.path().join("p_queries.txt"), "")?;
    fs::write(dir.path().join("q_source.txt"), "procedure q { y = 2; }")?;

    let pairs = discover(dir.path(), None)?;
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].program, dir.path().join("p_source.txt"));
    assert_eq!(pairs[0].queries, dir.path().join("p_queries.txt"));
    Ok(())
}

#[test]
fn directory_order_is_sorted_by_program_path() -> Result<()> {
    let dir = tempdir()?;
    for name in ["b", "a", "c"] {
        fs::write(dir.path().join(format!("{name}_source.txt")), "")?;
        fs::write(dir.path().join(format!("{name}_queries.txt")), "")?;
    }
    let pairs = discover(dir.path(), None)?;
    let names: Vec<String> = pairs.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["a_source", "b_source", "c_source"]);
    Ok(())
}

#[test]
fn directory_without_program_files_is_a_discovery_failure() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("notes.txt"), "nothing to run")?;
    assert!(matches!(
        discover(dir.path(), None),
        Err(HarnessError::Discovery(_))
    ));
    Ok(())
}

#[test]
fn explicit_pair_is_taken_verbatim() -> Result<()> {
    let dir = tempdir()?;
    let program = dir.path().join("anything.txt");
    let queries = dir.path().join("some_queries_elsewhere.txt");
    fs::write(&program, "")?;
    fs::write(&queries, "")?;

    let pairs = discover(&program, Some(&queries))?;
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].queries, queries);
    Ok(())
}

#[test]
fn partner_is_deduced_when_queries_are_omitted() -> Result<()> {
    let dir = tempdir()?;
    let program = dir.path().join("loop_source.txt");
    let partner = dir.path().join("loop_queries.txt");
    fs::write(&program, "")?;
    fs::write(&partner, "")?;

    let pairs = discover(&program, None)?;
    assert_eq!(pairs[0].queries, partner);
    Ok(())
}

#[test]
fn missing_queries_path_falls_back_to_the_deduced_partner() -> Result<()> {
    let dir = tempdir()?;
    let program = dir.path().join("loop_source.txt");
    let partner = dir.path().join("loop_queries.txt");
    fs::write(&program, "")?;
    fs::write(&partner, "")?;

    let pairs = discover(&program, Some(&dir.path().join("nope_queries.txt")))?;
    assert_eq!(pairs[0].queries, partner);
    Ok(())
}

#[test]
fn missing_deduced_partner_is_a_discovery_failure() -> Result<()> {
    let dir = tempdir()?;
    let program = dir.path().join("loop_source.txt");
    fs::write(&program, "")?;
    assert!(matches!(
        discover(&program, None),
        Err(HarnessError::Discovery(_))
    ));
    Ok(())
}

#[test]
fn missing_program_file_is_a_discovery_failure() {
    assert!(matches!(
        discover(std::path::Path::new("no/such/file_source.txt"), None),
        Err(HarnessError::Discovery(_))
    ));
}

#[test]
fn directory_with_explicit_queries_is_ambiguous() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("p_source.txt"), "")?;
    fs::write(dir.path().join("p_queries.txt"), "")?;
    assert!(matches!(
        discover(dir.path(), Some(&dir.path().join("p_queries.txt"))),
        Err(HarnessError::Config(_))
    ));
    Ok(())
}
