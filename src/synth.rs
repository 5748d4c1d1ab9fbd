//! Answer synthesis: reconstruct literal expected-answer strings from an
//! oracle run of the engine, regrouping its flat answer tokens into
//! tuples whose arity comes from the query's own selection clause.

use crate::engine::Engine;
use crate::error::HarnessError;
use crate::queryset::QueryRecord;
use std::fs;
use std::path::Path;
use tracing::warn;

/// The engine reports each query's raw answer on a stdout line carrying
/// this marker.
const ANSWER_MARKER: &str = "Your answer";

/// Tuple arity of a query's results, from its `<`...`>` selection clause.
/// A query without one selects a single synonym.
pub fn result_arity(query: &str) -> usize {
    let Some(start) = query.find('<') else {
        return 1;
    };
    let Some(len) = query[start + 1..].find('>') else {
        return 1;
    };
    query[start + 1..start + 1 + len].split(',').count()
}

/// Partition a whitespace-flattened answer into arity-sized tuples:
/// tokens within a tuple joined by a space, tuples joined by ", ".
///
/// A token count that does not divide evenly is a data-integrity warning,
/// not a crash; the short tail tuple is kept as-is.
pub fn regroup_answer(raw: &str, arity: usize) -> String {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let arity = arity.max(1);
    if !tokens.is_empty() && tokens.len() % arity != 0 {
        warn!(
            tokens = tokens.len(),
            arity, "raw answer does not divide evenly into tuples"
        );
    }
    tokens
        .chunks(arity)
        .map(|chunk| chunk.join(" "))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pull raw answers out of the engine's oracle-run stdout, in order.
pub fn extract_answers(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| line.contains(ANSWER_MARKER))
        .filter_map(|line| line.split(':').nth(1))
        .map(|ans| ans.trim().to_string())
        .collect()
}

/// Non-empty lines of a plain query-list file.
pub fn read_query_list(path: &Path) -> Result<Vec<String>, HarnessError> {
    let content = fs::read_to_string(path)
        .map_err(|e| HarnessError::io(format!("cannot read query list {}", path.display()), e))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

/// Unanswered scaffold records, one per query, in query order.
pub fn scaffold_records(queries: &[String]) -> Vec<QueryRecord> {
    queries
        .iter()
        .enumerate()
        .map(|(i, q)| QueryRecord::generated(i + 1, q.clone()))
        .collect()
}

fn answered_records(queries: &[String], answers: &[String]) -> Vec<QueryRecord> {
    queries
        .iter()
        .zip(answers)
        .enumerate()
        .map(|(i, (q, raw))| {
            let mut record = QueryRecord::generated(i + 1, q.clone());
            record.answer = Some(regroup_answer(raw, result_arity(q)));
            record
        })
        .collect()
}

/// Full pipeline: write the scaffold, run the engine over it once, and
/// regroup its reported answers into final records.
pub fn synthesize(
    engine: &Engine,
    program: &Path,
    queries: &[String],
    scaffold_path: &Path,
    oracle_output: &Path,
) -> Result<Vec<QueryRecord>, HarnessError> {
    let scaffold = crate::queryset::render(&scaffold_records(queries));
    fs::write(scaffold_path, scaffold).map_err(|e| {
        HarnessError::io(
            format!("cannot write scaffold {}", scaffold_path.display()),
            e,
        )
    })?;
    let run = engine.run_oracle(program, scaffold_path, oracle_output)?;
    if !run.success {
        warn!(status = %run.status, "oracle run did not exit cleanly; answers may be partial");
    }
    let answers = extract_answers(&run.stdout);
    if answers.len() != queries.len() {
        warn!(
            queries = queries.len(),
            answers = answers.len(),
            "oracle run reported a different number of answers than queries"
        );
    }
    Ok(answered_records(queries, &answers))
}
