//! Captured analyzer output.
//!
//! The analyzer writes one diagnostic per line to its error stream. Lines are
//! split out of the captured bytes in emission order, optionally trimmed, and
//! relayed unchanged. [`DiagnosticLine::severity`] is a convenience for
//! callers that want a summary; relaying never depends on it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single line written by the analyzer to its diagnostic stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosticLine(String);

/// Severity recognised from Verilator's message prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    /// `%Error: ...` or `%Error-CODE: ...`.
    Error,
    /// `%Warning-CODE: ...`, with the warning category.
    Warning(String),
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning(code) => write!(f, "warning[{code}]"),
        }
    }
}

impl DiagnosticLine {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_text(self) -> String {
        self.0
    }

    /// Parses the `%Error` / `%Warning-CODE` prefix, if present.
    ///
    /// Continuation lines (source excerpts, carets, `... See the manual`)
    /// carry no prefix and return `None`.
    #[must_use]
    pub fn severity(&self) -> Option<Severity> {
        let rest = self.0.strip_prefix('%')?;
        let (tag, _) = rest.split_once(':')?;
        if tag == "Error" || tag.starts_with("Error-") {
            return Some(Severity::Error);
        }
        let code = tag.strip_prefix("Warning-")?;
        if code.is_empty() {
            return None;
        }
        Some(Severity::Warning(code.to_string()))
    }

    /// Returns `true` when the line mentions `needle` anywhere in its text.
    #[must_use]
    pub fn mentions(&self, needle: &str) -> bool {
        self.0.contains(needle)
    }
}

impl fmt::Display for DiagnosticLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What to do with the last captured diagnostic line before relaying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrimPolicy {
    /// Relay every captured line.
    #[default]
    KeepAll,
    /// Drop the final line whenever at least one line was captured.
    DropLast,
}

impl TrimPolicy {
    /// Parses the configuration spelling (`keep-all`, `drop-last`).
    #[must_use]
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.to_ascii_lowercase().as_str() {
            "keep-all" | "keep" => Some(Self::KeepAll),
            "drop-last" | "drop" => Some(Self::DropLast),
            _ => None,
        }
    }

    /// Applies the policy in place.
    pub fn apply(self, lines: &mut Vec<DiagnosticLine>) {
        if self == Self::DropLast {
            lines.pop();
        }
    }
}

impl fmt::Display for TrimPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TrimPolicy::KeepAll => "keep-all",
            TrimPolicy::DropLast => "drop-last",
        };
        f.write_str(text)
    }
}

/// Splits captured stream bytes into lines.
///
/// Invalid UTF-8 is replaced rather than rejected. A trailing newline does not
/// produce an empty final line, and `\r\n` endings are normalised.
#[must_use]
pub fn split_lines(captured: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(captured)
        .lines()
        .map(str::to_owned)
        .collect()
}

/// Splits the captured error stream into diagnostics and applies `policy`.
#[must_use]
pub fn collect_diagnostics(captured: &[u8], policy: TrimPolicy) -> Vec<DiagnosticLine> {
    let mut lines: Vec<DiagnosticLine> = split_lines(captured)
        .into_iter()
        .map(DiagnosticLine::new)
        .collect();
    policy.apply(&mut lines);
    lines
}

/// Counts of recognised severities, used for summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityCounts {
    pub errors: usize,
    pub warnings: usize,
}

impl SeverityCounts {
    #[must_use]
    pub fn tally<'a>(lines: impl IntoIterator<Item = &'a DiagnosticLine>) -> Self {
        let mut counts = Self::default();
        for line in lines {
            match line.severity() {
                Some(Severity::Error) => counts.errors += 1,
                Some(Severity::Warning(_)) => counts.warnings += 1,
                None => {}
            }
        }
        counts
    }
}
