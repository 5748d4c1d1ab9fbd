//! The query-set file format read by the engine and produced by answer
//! synthesis: one record per query, each a header line (`«id» - «name»`),
//! the query text, a blank line, the expected-answer line (empty while no
//! oracle exists), and the timeout line; records separated by a blank line.

use crate::error::HarnessError;

/// Advisory per-query timeout handed to the engine, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord {
    pub id: usize,
    pub name: String,
    pub text: String,
    pub answer: Option<String>,
    pub timeout_ms: u64,
}

impl QueryRecord {
    /// Record for a synthesized test case, before any answer is known.
    pub fn generated(id: usize, text: impl Into<String>) -> Self {
        Self {
            id,
            name: format!("generated TC {id}"),
            text: text.into(),
            answer: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

pub fn render(records: &[QueryRecord]) -> String {
    let mut out = String::new();
    for (i, r) in records.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("{} - {}\n", r.id, r.name));
        out.push_str(&r.text);
        out.push_str("\n\n");
        out.push_str(r.answer.as_deref().unwrap_or(""));
        out.push('\n');
        out.push_str(&r.timeout_ms.to_string());
        out.push('\n');
    }
    out
}

pub fn parse(input: &str) -> Result<Vec<QueryRecord>, HarnessError> {
    let lines: Vec<&str> = input.lines().collect();
    let mut records = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if lines[i].trim().is_empty() {
            i += 1;
            continue;
        }
        if i + 4 >= lines.len() {
            return Err(HarnessError::QuerySet(format!(
                "truncated record starting at line {}",
                i + 1
            )));
        }
        let header = lines[i];
        let (id_part, name) = header.split_once(" - ").ok_or_else(|| {
            HarnessError::QuerySet(format!("bad header on line {}: {header:?}", i + 1))
        })?;
        let id: usize = id_part.trim().parse().map_err(|_| {
            HarnessError::QuerySet(format!("bad record id on line {}: {id_part:?}", i + 1))
        })?;
        if !lines[i + 2].trim().is_empty() {
            return Err(HarnessError::QuerySet(format!(
                "expected a blank line after the query on line {}",
                i + 3
            )));
        }
        let answer_line = lines[i + 3].trim();
        let timeout_ms: u64 = lines[i + 4].trim().parse().map_err(|_| {
            HarnessError::QuerySet(format!(
                "bad timeout on line {}: {:?}",
                i + 5,
                lines[i + 4]
            ))
        })?;
        records.push(QueryRecord {
            id,
            name: name.trim().to_string(),
            text: lines[i + 1].to_string(),
            answer: (!answer_line.is_empty()).then(|| answer_line.to_string()),
            timeout_ms,
        });
        i += 5;
    }
    Ok(records)
}
