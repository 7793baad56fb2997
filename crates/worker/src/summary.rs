//! End-of-run summary for the operator.

use std::fmt::Write;

use agentmint_core::naming::token_label;
use agentmint_core::types::TokenId;
use agentmint_pipeline::report::RunReport;

const RULE: &str = "==================================================";

/// Render the summary printed to stdout after a run.
pub fn render(report: &RunReport, collection_size: TokenId) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(
        out,
        "{}",
        if report.is_aborted() {
            "GENERATION ABORTED"
        } else {
            "GENERATION COMPLETE"
        }
    );
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Successful: {}", report.succeeded.len());
    let _ = writeln!(out, "Failed:     {}", report.failed.len());
    let _ = writeln!(out, "Skipped:    {}", report.skipped.len());

    if !report.without_prompt.is_empty() {
        let _ = writeln!(out, "No prompt:  {}", report.without_prompt.len());
    }

    if let Some(elapsed) = report.elapsed() {
        let _ = writeln!(out, "Elapsed:    {}s", elapsed.num_seconds());
    }

    if let Some(abort) = &report.aborted {
        let _ = writeln!(
            out,
            "\nStopped at {}: {}",
            token_label(abort.token_id, collection_size),
            abort.error
        );
    }

    if let Some(ids) = report.redo_argument() {
        let _ = writeln!(out, "\nFailed IDs (re-run with --redo {ids}):");
        for failed in &report.failed {
            let _ = writeln!(
                out,
                "  {} [{}] {}",
                token_label(failed.token_id, collection_size),
                failed.error.kind(),
                failed.error
            );
        }
    }

    out
}
