// reviewer-core/src/format.rs

//! Turns an [`ExecutionOutcome`] into the text a tool call returns.
//!
//! Two policies:
//!
//! * **Summary** (successful runs): the status tag and the first line of
//!   stdout, cut to 80 characters. Successful runs are frequent and rarely
//!   interesting.
//! * **Full** (failures, and coverage runs): the status tag followed by the
//!   whole error-preferring stream with ANSI escapes removed, capped at
//!   100 KiB by keeping the head and the tail.
//!
//! Every report starts with the status tag (`Success` or `Failed (exit N)`)
//! followed by the action name in brackets.

use crate::exec::ExecutionOutcome;
use crate::utils::{first_line, truncate_string};
use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;
use std::fmt;

/// Maximum characters of the first output line in a summary report.
pub const SUMMARY_LINE_MAX_CHARS: usize = 80;

/// Maximum bytes of stream content in a full report (100 KiB).
pub const FULL_REPORT_MAX_BYTES: usize = 100 * 1024;

lazy_static! {
    static ref ANSI_REGEX: Regex =
        Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").expect("ANSI regex is valid");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPolicy {
    Summary,
    Full,
}

/// Summary for clean exits unless the caller forces the full report.
pub fn select_policy(exit_code: i32, force_full: bool) -> ReportPolicy {
    if exit_code == 0 && !force_full {
        ReportPolicy::Summary
    } else {
        ReportPolicy::Full
    }
}

/// Rendered report text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedReport {
    pub text: String,
}

impl fmt::Display for FormattedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<FormattedReport> for String {
    fn from(report: FormattedReport) -> Self {
        report.text
    }
}

pub fn status_tag(exit_code: i32) -> String {
    if exit_code == 0 {
        "Success".to_string()
    } else {
        format!("Failed (exit {})", exit_code)
    }
}

fn header(outcome: &ExecutionOutcome, action: &str) -> String {
    format!("{} [{}]", status_tag(outcome.exit_code), action)
}

/// One-line report: status plus the first line of stdout (success) or
/// stderr (failure).
pub fn format_summary(outcome: &ExecutionOutcome, action: &str) -> FormattedReport {
    let mut parts = vec![header(outcome, action)];
    let stream = if outcome.success() {
        &outcome.stdout
    } else {
        &outcome.stderr
    };
    let line = first_line(stream);
    if !line.is_empty() {
        parts.push(truncate_string(line, SUMMARY_LINE_MAX_CHARS));
    }
    FormattedReport {
        text: parts.join(" | "),
    }
}

/// Status plus the complete stderr (or stdout when stderr is blank), ANSI
/// stripped and size capped.
pub fn format_full(outcome: &ExecutionOutcome, action: &str) -> FormattedReport {
    let stderr = outcome.stderr.trim();
    let body = if stderr.is_empty() {
        outcome.stdout.trim()
    } else {
        stderr
    };
    let stripped = strip_ansi(body);
    let body = truncate_middle(&stripped, FULL_REPORT_MAX_BYTES);

    let mut text = header(outcome, action);
    if !body.is_empty() {
        text.push_str("\n\n");
        text.push_str(&body);
    }
    FormattedReport { text }
}

pub fn format_outcome(outcome: &ExecutionOutcome, action: &str, force_full: bool) -> FormattedReport {
    match select_policy(outcome.exit_code, force_full) {
        ReportPolicy::Summary => format_summary(outcome, action),
        ReportPolicy::Full => format_full(outcome, action),
    }
}

pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    ANSI_REGEX.replace_all(text, "")
}

/// Keeps the first and last `max_bytes / 2` bytes of `text` and replaces the
/// middle with a marker naming how many bytes were elided.
pub fn truncate_middle(text: &str, max_bytes: usize) -> Cow<'_, str> {
    if text.len() <= max_bytes {
        return Cow::Borrowed(text);
    }
    let half = max_bytes / 2;

    let mut head_end = half;
    while !text.is_char_boundary(head_end) {
        head_end -= 1;
    }
    let mut tail_start = text.len() - half;
    while !text.is_char_boundary(tail_start) {
        tail_start += 1;
    }

    Cow::Owned(format!(
        "{}\n\n[... truncated {} bytes ...]\n\n{}",
        &text[..head_end],
        tail_start - head_end,
        &text[tail_start..]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(stdout: &str, stderr: &str, exit_code: i32) -> ExecutionOutcome {
        ExecutionOutcome {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code,
        }
    }

    #[test]
    fn test_policy_selection() {
        assert_eq!(select_policy(0, false), ReportPolicy::Summary);
        assert_eq!(select_policy(0, true), ReportPolicy::Full);
        assert_eq!(select_policy(1, false), ReportPolicy::Full);
        assert_eq!(select_policy(-1, false), ReportPolicy::Full);
    }

    #[test]
    fn test_summary_success_takes_first_stdout_line() {
        let report = format_summary(&outcome("Test output\nSecond line", "", 0), "Test");
        assert_eq!(report.text, "Success [Test] | Test output");
    }

    #[test]
    fn test_summary_truncates_long_line() {
        let report = format_summary(&outcome(&"a".repeat(100), "", 0), "Test");
        assert_eq!(report.text, format!("Success [Test] | {}...", "a".repeat(77)));
    }

    #[test]
    fn test_summary_failure_uses_stderr() {
        let report = format_summary(
            &outcome("ignored", "Error: Test failed\nDetails here", 1),
            "Test",
        );
        assert_eq!(report.text, "Failed (exit 1) [Test] | Error: Test failed");
    }

    #[test]
    fn test_summary_without_output() {
        assert_eq!(format_summary(&outcome("", "", 2), "Lint").text, "Failed (exit 2) [Lint]");
        assert_eq!(format_summary(&outcome("  \n", "", 0), "Lint").text, "Success [Lint]");
    }

    #[test]
    fn test_full_includes_whole_stream() {
        let err = "Error: Test failed\nStack trace:\n  at file.js:10\n  at runner.js:20";
        let report = format_full(&outcome("", err, 1), "Test");
        assert_eq!(report.text, format!("Failed (exit 1) [Test]\n\n{}", err));
    }

    #[test]
    fn test_full_strips_ansi() {
        let report = format_full(&outcome("", "\x1b[31mError: Test failed\x1b[0m", 1), "Test");
        assert_eq!(report.text, "Failed (exit 1) [Test]\n\nError: Test failed");
    }

    #[test]
    fn test_full_prefers_stderr_then_stdout() {
        let report = format_full(&outcome("stdout content", "stderr content", 1), "Test");
        assert_eq!(report.text, "Failed (exit 1) [Test]\n\nstderr content");

        let report = format_full(&outcome("stdout content", "  \n", 1), "Test");
        assert_eq!(report.text, "Failed (exit 1) [Test]\n\nstdout content");
    }

    #[test]
    fn test_full_truncates_large_output_keeping_both_ends() {
        let big = format!("START{}END", "x".repeat(200_000));
        let report = format_full(&outcome("", &big, 1), "Test");
        let header = "Failed (exit 1) [Test]\n\n";
        assert!(report.text.starts_with(header));
        assert!(report.text.contains("START"));
        assert!(report.text.ends_with("END"));
        assert!(report.text.contains("[... truncated "));
        assert!(report.text.contains(" bytes ...]"));

        let body = &report.text[header.len()..];
        assert!(body.len() <= FULL_REPORT_MAX_BYTES + 64);
    }

    #[test]
    fn test_truncate_middle_counts_elided_bytes() {
        let text = "0123456789";
        assert_eq!(truncate_middle(text, 10), "0123456789");
        assert_eq!(truncate_middle(text, 4), "01\n\n[... truncated 6 bytes ...]\n\n89");
    }

    #[test]
    fn test_truncate_middle_respects_char_boundaries() {
        let text = "ééééé"; // 10 bytes, 2 per char
        let cut = truncate_middle(text, 5);
        // half = 2 bytes: one char from each end.
        assert_eq!(cut, "é\n\n[... truncated 6 bytes ...]\n\né");
    }

    #[test]
    fn test_coverage_success_uses_full_report() {
        let out = outcome("line one\nline two\nCoverage: 91%", "", 0);
        let report = format_outcome(&out, "Test", true);
        assert_eq!(
            report.text,
            "Success [Test]\n\nline one\nline two\nCoverage: 91%"
        );
    }

    #[test]
    fn test_every_failure_starts_with_failed_tag() {
        for code in [1, 2, 124, 130, -1, 255] {
            let report = format_outcome(&outcome("out", "err", code), "Test", false);
            assert!(
                report.text.starts_with(&format!("Failed (exit {})", code)),
                "unexpected report: {}",
                report.text
            );
        }
        let report = format_outcome(&outcome("out", "", 0), "Test", false);
        assert!(report.text.starts_with("Success"));
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let out = outcome("some\noutput", "\x1b[1mwarn\x1b[0m\nmore", 3);
        assert_eq!(format_outcome(&out, "Lint", false), format_outcome(&out, "Lint", false));
        let ok = outcome("fine", "", 0);
        assert_eq!(format_outcome(&ok, "Lint", false), format_outcome(&ok, "Lint", false));
    }
}
