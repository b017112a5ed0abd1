//! Error types and parse diagnostics
//!
//! Two failure channels exist side by side. Hard failures (I/O, unknown file
//! extension, missing document path) are returned as [`InscriptError`] through
//! `Result`. Malformed *content* never aborts a parse: each bad line becomes a
//! [`Diagnostic`] that is reported through the process-wide hook and collected
//! into the list returned from `load`, and parsing continues with the next
//! line.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt;
use std::sync::RwLock;

/// Errors that can occur outside of per-line parsing
#[derive(Debug)]
pub enum InscriptError {
    /// No registered format claims the file extension
    UnknownFormat(String),
    /// A disk operation was requested on a document created without a path
    MissingPath,
    /// Underlying filesystem failure, wrapped with the offending path
    Io(String),
}

impl std::error::Error for InscriptError {}

impl fmt::Display for InscriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InscriptError::UnknownFormat(name) => {
                write!(f, "Couldn't auto-detect file format by extension for file: {}", name)
            }
            InscriptError::MissingPath => {
                write!(f, "Attempted a disk operation on a document with no path")
            }
            InscriptError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl From<std::io::Error> for InscriptError {
    fn from(e: std::io::Error) -> Self {
        InscriptError::Io(e.to_string())
    }
}

/// A codec refused or failed to convert a piece of inline text
///
/// Every built-in codec fails with this type on malformed input; none of them
/// substitute sentinel values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecError {
    message: String,
}

impl CodecError {
    pub fn new(message: impl Into<String>) -> Self {
        CodecError { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::error::Error for CodecError {}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// A line-scoped parse error record
///
/// Diagnostics are non-fatal: the engines collect them and keep parsing.
/// `position` is 1-based, matching what editors display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    position: usize,
    line: String,
    message: String,
}

impl Diagnostic {
    /// Create a diagnostic from a 0-based line index and its raw text
    pub fn new(index: usize, line: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic {
            position: index + 1,
            line: line.into(),
            message: message.into(),
        }
    }

    /// 1-based source line position
    pub fn position(&self) -> usize {
        self.position
    }

    /// The raw source line the error occurred on
    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// JSON rendering for tooling that consumes diagnostics programmatically
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Send this diagnostic through the process-wide hook
    pub fn report(&self) {
        let hook = DIAGNOSTIC_HOOK.read().expect("diagnostic hook poisoned");
        (*hook)(self);
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to parse line {}\n {}: {}", self.position, self.message, self.line)
    }
}

type DiagnosticHook = Box<dyn Fn(&Diagnostic) + Send + Sync>;

static DIAGNOSTIC_HOOK: Lazy<RwLock<DiagnosticHook>> =
    Lazy::new(|| RwLock::new(Box::new(|diagnostic| eprintln!("{}", diagnostic))));

/// Replace the process-wide diagnostic handler
///
/// The default handler writes the two-line message to stderr. The hook is
/// invoked once per diagnostic during `load`, in addition to the diagnostic
/// list being returned to the caller.
pub fn set_diagnostic_hook(hook: impl Fn(&Diagnostic) + Send + Sync + 'static) {
    let mut slot = DIAGNOSTIC_HOOK.write().expect("diagnostic hook poisoned");
    *slot = Box::new(hook);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_position_is_one_based() {
        let diagnostic = Diagnostic::new(0, "port = x", "bad value");
        assert_eq!(diagnostic.position(), 1);
    }

    #[test]
    fn diagnostic_display_is_two_lines() {
        let diagnostic = Diagnostic::new(4, "key = ???", "Invalid list");
        assert_eq!(
            diagnostic.to_string(),
            "Failed to parse line 5\n Invalid list: key = ???"
        );
    }

    #[test]
    fn diagnostic_serializes_to_json() {
        let diagnostic = Diagnostic::new(2, "a = [", "Invalid list");
        let json = diagnostic.to_json();
        assert!(json.contains("\"position\": 3"));
        assert!(json.contains("Invalid list"));
    }
}
