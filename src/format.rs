//! File format engines
//!
//! A format engine turns raw lines into the node tree and back. Both
//! built-in engines are recursive descent over a line array, not a token
//! stream: structural boundaries (section depth, list bounds) are recovered
//! from indentation and brace counting alone.
//!
//! Formats are selected by file extension through the [`FormatRegistry`];
//! `ds` maps to the brace-delimited DataScript syntax, `yaml`/`yml` to the
//! YAML subset.

pub mod datascript;
pub mod yaml;

pub use datascript::DataScriptFormat;
pub use yaml::YamlFormat;

use crate::error::Diagnostic;
use crate::node::SectionNode;
use crate::value::ValueRegistry;
use std::sync::Arc;

/// Per-engine configuration
///
/// One options value is handed to each engine at construction; nothing here
/// is process-wide. The indent unit is both what the writer emits and what
/// the parser demands: a line indented with anything other than
/// `indent_unit x depth` is a structural error.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    pub indent_unit: String,
}

impl FormatOptions {
    pub fn indent(&self, depth: usize) -> String {
        self.indent_unit.repeat(depth)
    }
}

impl Default for FormatOptions {
    fn default() -> Self {
        FormatOptions {
            indent_unit: "  ".to_string(),
        }
    }
}

/// A parser/writer pair for one concrete surface syntax
pub trait FileFormat {
    /// Parse every line into children of `root`
    ///
    /// Returns the per-line diagnostics; a line that fails produces a
    /// diagnostic and parsing continues with the rest of the document.
    fn load(
        &self,
        reader: &LineReader,
        root: &mut SectionNode,
        registry: &ValueRegistry,
    ) -> Vec<Diagnostic>;

    /// Serialize the tree under `root` back to text
    fn save(&self, root: &SectionNode, registry: &ValueRegistry) -> String;

    /// File extensions (without the dot) this format claims
    fn extensions(&self) -> &[&str];
}

/// Random-access read-only view over a document's lines
///
/// Used for lookahead during parsing. Out-of-bounds reads return an empty
/// line rather than failing, which keeps the scan loops free of bounds
/// bookkeeping.
pub struct LineReader {
    lines: Vec<String>,
}

impl LineReader {
    pub fn new(text: &str) -> Self {
        LineReader {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn read(&self, position: usize) -> &str {
        self.lines.get(position).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// Append-only text builder used by the writers
pub struct SourceWriter {
    content: String,
}

impl SourceWriter {
    pub fn new() -> Self {
        SourceWriter {
            content: String::new(),
        }
    }

    pub fn write(&mut self, text: &str) -> &mut Self {
        self.content.push_str(text);
        self
    }

    pub fn newline(&mut self) -> &mut Self {
        self.content.push('\n');
        self
    }

    pub fn finish(self) -> String {
        self.content
    }
}

impl Default for SourceWriter {
    fn default() -> Self {
        SourceWriter::new()
    }
}

/// Extension-keyed registry of available formats
pub struct FormatRegistry {
    formats: Vec<Arc<dyn FileFormat>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        FormatRegistry {
            formats: Vec::new(),
        }
    }

    /// Registry holding the two built-in engines with default options
    pub fn with_defaults() -> Self {
        let mut registry = FormatRegistry::new();
        registry.register(Arc::new(DataScriptFormat::default()));
        registry.register(Arc::new(YamlFormat::default()));
        registry
    }

    pub fn register(&mut self, format: Arc<dyn FileFormat>) -> &mut Self {
        self.formats.push(format);
        self
    }

    /// Find the format claiming an extension (without the dot)
    pub fn by_extension(&self, extension: &str) -> Option<Arc<dyn FileFormat>> {
        self.formats
            .iter()
            .find(|format| format.extensions().contains(&extension))
            .cloned()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        FormatRegistry::with_defaults()
    }
}

/// Leading whitespace of a line
pub(crate) fn leading_indent(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Split off an inline-comment tail, ignoring markers inside quoted runs
pub(crate) fn split_inline_comment<'a>(text: &'a str, marker: &str) -> (&'a str, Option<String>) {
    let mut quote: Option<char> = None;
    for (index, c) in text.char_indices() {
        match c {
            '\'' | '"' => match quote {
                Some(q) if q == c => quote = None,
                Some(_) => {}
                None => quote = Some(c),
            },
            _ => {
                if quote.is_none() && text[index..].starts_with(marker) {
                    let comment = text[index + marker.len()..].trim().to_string();
                    return (text[..index].trim(), Some(comment));
                }
            }
        }
    }
    (text, None)
}

/// Shared bookkeeping threaded through one parse run
///
/// `processed` marks consumed line positions so the outer scan skips lines
/// a recursive call already claimed; `errors` collects the non-fatal
/// per-line diagnostics.
pub(crate) struct ParseState {
    pub processed: std::collections::HashSet<usize>,
    pub errors: Vec<Diagnostic>,
}

impl ParseState {
    pub fn new() -> Self {
        ParseState {
            processed: std::collections::HashSet::new(),
            errors: Vec::new(),
        }
    }

    /// Report a diagnostic through the hook and keep it for the caller
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        diagnostic.report();
        self.errors.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_is_lenient_out_of_bounds() {
        let reader = LineReader::new("a\nb");
        assert_eq!(reader.read(0), "a");
        assert_eq!(reader.read(1), "b");
        assert_eq!(reader.read(5), "");
        assert_eq!(reader.len(), 2);
    }

    #[test]
    fn registry_selects_by_extension() {
        let registry = FormatRegistry::with_defaults();
        assert!(registry.by_extension("ds").is_some());
        assert!(registry.by_extension("yaml").is_some());
        assert!(registry.by_extension("yml").is_some());
        assert!(registry.by_extension("toml").is_none());
    }

    #[test]
    fn inline_comment_split_skips_quoted_runs() {
        assert_eq!(
            split_inline_comment("port = 1 // tcp", " //"),
            ("port = 1", Some("tcp".to_string()))
        );
        assert_eq!(
            split_inline_comment("s = 'a //b'", " //"),
            ("s = 'a //b'", None)
        );
        assert_eq!(
            split_inline_comment("s = 'a //b' // real", " //"),
            ("s = 'a //b'", Some("real".to_string()))
        );
    }

    #[test]
    fn indent_scales_with_depth() {
        let options = FormatOptions::default();
        assert_eq!(options.indent(0), "");
        assert_eq!(options.indent(2), "    ");
    }
}
