//! Process output scanning.

use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Escape sequences emitted by colorizing terminals.
const ANSI_PATTERN: &str =
    r"[\x1b\x{9b}][\[()#;?]*(?:[0-9]{1,4}(?:;[0-9]{0,4})*)?[0-9A-ORZcf-nqry=><]";

/// Detects the success marker in diagnostic output.
#[derive(Debug, Clone)]
pub struct OutputScanner {
    ansi: Regex,
    marker: String,
}

impl OutputScanner {
    pub fn new(marker: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            ansi: Regex::new(ANSI_PATTERN)?,
            marker: marker.into(),
        })
    }

    pub fn strip_ansi<'a>(&self, text: &'a str) -> std::borrow::Cow<'a, str> {
        self.ansi.replace_all(text, "")
    }

    /// Whether `line`, once uncolored and left-trimmed, starts with the marker.
    pub fn is_success_line(&self, line: &str) -> bool {
        self.strip_ansi(line).trim_start().starts_with(&self.marker)
    }
}

/// One-way success flag of a single run.
///
/// Shared between the stream reader and the task judging the exit.
#[derive(Debug, Default)]
pub struct SuccessLatch {
    ok: AtomicBool,
}

impl SuccessLatch {
    pub fn observe(&self, scanner: &OutputScanner, line: &str) {
        if !self.is_ok() && scanner.is_success_line(line) {
            self.ok.store(true, Ordering::Release);
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok.load(Ordering::Acquire)
    }
}

/// Turn bare `\n` into `\r\n`, leaving existing `\r\n` alone.
pub fn normalize_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut previous = None;
    for c in text.chars() {
        if c == '\n' && previous != Some('\r') {
            out.push('\r');
        }
        out.push(c);
        previous = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> OutputScanner {
        OutputScanner::new("PASS").unwrap()
    }

    #[test]
    fn test_strip_ansi() {
        let colored = "\x1b[0m\x1b[7m\x1b[1m\x1b[32m PASS \x1b[39m\x1b[22m\x1b[27m\x1b[0m test/spec/a-spec.ts";
        assert_eq!(scanner().strip_ansi(colored), " PASS  test/spec/a-spec.ts");
    }

    #[test]
    fn test_success_line_detection() {
        let scanner = scanner();
        assert!(scanner.is_success_line("PASS test/spec/a-spec.ts\n"));
        assert!(scanner.is_success_line("\x1b[1m\x1b[32m  PASS\x1b[39m ok"));
        assert!(!scanner.is_success_line("FAIL test/spec/a-spec.ts"));
        assert!(!scanner.is_success_line("Tests: 1 PASS"));
    }

    #[test]
    fn test_marker_is_matched_literally() {
        let scanner = OutputScanner::new("[ok](").unwrap();
        assert!(scanner.is_success_line("\x1b[32m[ok]( all good"));
        assert!(!scanner.is_success_line("ok all good"));
    }

    #[test]
    fn test_latch_is_monotonic() {
        let scanner = scanner();
        let latch = SuccessLatch::default();
        latch.observe(&scanner, "RUNS a-spec.ts");
        assert!(!latch.is_ok());
        latch.observe(&scanner, "PASS a-spec.ts");
        latch.observe(&scanner, "FAIL b-spec.ts");
        assert!(latch.is_ok());
    }

    #[test]
    fn test_normalize_newlines() {
        assert_eq!(normalize_newlines("a\nb\r\nc"), "a\r\nb\r\nc");
        assert_eq!(normalize_newlines("no newline"), "no newline");
        assert_eq!(normalize_newlines("\n"), "\r\n");
    }
}
