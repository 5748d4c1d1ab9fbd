use crate::types::{CaseReport, CaseStatus, RunReport};
use colored::Colorize;

pub fn render_case(c: &CaseReport) -> String {
    let mut out = String::new();
    match c.status {
        CaseStatus::Passed => {
            out.push_str(&format!(
                "{} {} ({}/{})\n",
                "[OK]".green().bold(),
                c.name.green(),
                c.passed_queries(),
                c.total
            ));
        }
        CaseStatus::PassedAsExpectedFailure => {
            out.push_str(&format!(
                "{} {} {}\n",
                "[OK]".green().bold(),
                c.name.green(),
                "(rejected as expected)".dimmed()
            ));
        }
        CaseStatus::FailedPragmaViolation => {
            out.push_str(&format!(
                "{} {} ({}/{})\n",
                "[FAIL]".red().bold(),
                c.name.red().bold(),
                c.passed_queries(),
                c.total
            ));
            if !c.failing_ids.is_empty() {
                out.push_str(&format!(
                    "  {} {}\n",
                    "failing :".bold(),
                    c.failing_ids.join(", ")
                ));
            }
            if let Some(d) = &c.diagnostic {
                out.push_str(&format!("  {} {}\n", "reason  :".bold(), d));
            }
        }
        CaseStatus::Failed | CaseStatus::ParseErrorUnexpected => {
            out.push_str(&format!(
                "{} {}\n",
                "[FAIL]".red().bold(),
                c.name.red().bold()
            ));
            if let Some(d) = &c.diagnostic {
                out.push_str(&format!("  {} {}\n", "error   :".bold(), d.red()));
            }
        }
    }
    out
}

/// One line per case in discovery order; in multi-case mode a closing
/// summary line, with "all tests passed" reserved for a clean run.
pub fn render_run(run: &RunReport, multi: bool) -> String {
    let mut out = String::new();
    for c in &run.cases {
        out.push_str(&render_case(c));
    }
    if multi {
        if run.all_passed() {
            out.push_str(&format!("{}\n", "all tests passed".green().bold()));
        } else {
            out.push_str(&format!(
                "{}\n",
                format!("{} of {} cases failed", run.failed_cases(), run.cases.len())
                    .red()
                    .bold()
            ));
        }
    }
    out
}

pub fn print_human(run: &RunReport, multi: bool) {
    print!("{}", render_run(run, multi));
}

pub fn render_json(run: &RunReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&serde_json::json!({
        "total": run.cases.len(),
        "passed": run.cases.len() - run.failed_cases(),
        "failed": run.failed_cases(),
        "all_passed": run.all_passed(),
        "cases": run.cases,
    }))
}
