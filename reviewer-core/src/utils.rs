// reviewer-core/src/utils.rs
//! General utility functions.

/// Cuts `input` to at most `max_chars` characters, the last three being
/// `...` when anything was dropped.
pub fn truncate_string(input: &str, max_chars: usize) -> String {
    if input.chars().count() > max_chars {
        // Too small for "..." plus content: hard cut without the ellipsis.
        if max_chars < 3 {
            input.chars().take(max_chars).collect::<String>()
        } else {
            format!(
                "{}...",
                input.chars().take(max_chars - 3).collect::<String>()
            )
        }
    } else {
        input.to_string()
    }
}

/// Returns the first line of `input` after trimming surrounding whitespace.
pub fn first_line(input: &str) -> &str {
    input.trim().lines().next().unwrap_or_default()
}

/// Quotes `arg` for a POSIX shell using single quotes.
///
/// `it's` becomes `'it'\''s'`.
pub fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Escapes `text` for use inside an AppleScript double-quoted string literal.
pub fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_report_lines() {
        assert_eq!(truncate_string("Tests: 12 passed", 80), "Tests: 12 passed");
        assert_eq!(truncate_string(&"a".repeat(80), 80), "a".repeat(80));
        assert_eq!(truncate_string(&"a".repeat(100), 80), format!("{}...", "a".repeat(77)));
    }

    #[test]
    fn test_truncate_tiny_limits_and_multibyte() {
        assert_eq!(truncate_string("error: boom", 3), "...");
        assert_eq!(truncate_string("error: boom", 2), "er");
        assert_eq!(truncate_string("✓✓✓✓✓✓", 5), "✓✓...");
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("\n  one\ntwo\n"), "one");
        assert_eq!(first_line(""), "");
        assert_eq!(first_line("   \n  "), "");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("hello world"), "'hello world'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("$(rm -rf /)"), "'$(rm -rf /)'");
    }

    #[test]
    fn test_applescript_escape() {
        assert_eq!(applescript_escape(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(applescript_escape(r"a\b"), r"a\\b");
    }
}
