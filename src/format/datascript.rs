//! The brace-delimited DataScript syntax (`.ds`)
//!
//! One logical entry per non-blank line:
//!
//! ```text
//! // standalone comment, attaches to the next entry
//! server { // inline comment
//!   port = 8080
//!   tags = [a, b, c]
//!   empty {}
//! }
//! ```
//!
//! `key { ... }` opens a section, `key = value` is a scalar, `key = [ ... ]`
//! is a list whose elements may continue across physical lines until the
//! closing `]`. A literal `Null` value (or list element) encodes absence: it
//! produces no node. A lone `...` line is an ignorable continuation marker.

use crate::error::Diagnostic;
use crate::format::{
    leading_indent, split_inline_comment, FileFormat, FormatOptions, LineReader, ParseState,
    SourceWriter,
};
use crate::node::{ConfigNode, ScalarNode, ScalarValue, SectionNode};
use crate::value::ValueRegistry;
use indexmap::IndexSet;

pub struct DataScriptFormat {
    options: FormatOptions,
}

impl DataScriptFormat {
    pub fn new(options: FormatOptions) -> Self {
        DataScriptFormat { options }
    }
}

impl Default for DataScriptFormat {
    fn default() -> Self {
        DataScriptFormat::new(FormatOptions::default())
    }
}

impl FileFormat for DataScriptFormat {
    fn load(
        &self,
        reader: &LineReader,
        root: &mut SectionNode,
        registry: &ValueRegistry,
    ) -> Vec<Diagnostic> {
        let mut state = ParseState::new();
        let mut pending = IndexSet::new();

        for position in 0..reader.len() {
            if state.processed.contains(&position) {
                continue;
            }
            if reader.read(position).trim().is_empty() {
                state.processed.insert(position);
                continue;
            }
            self.parse_node(position, reader, registry, root, 0, &mut pending, &mut state);
        }

        state.errors
    }

    fn save(&self, root: &SectionNode, registry: &ValueRegistry) -> String {
        let mut writer = SourceWriter::new();
        for node in root.children() {
            self.write_node(&mut writer, node, 0, registry);
        }
        writer.finish()
    }

    fn extensions(&self) -> &[&str] {
        &["ds"]
    }
}

impl DataScriptFormat {
    /// Parse one structural entry, recursing into section bodies
    ///
    /// `pending` is the standalone-comment accumulator for the current
    /// nesting level; it is flushed onto the next node this call produces.
    #[allow(clippy::too_many_arguments)]
    fn parse_node(
        &self,
        position: usize,
        reader: &LineReader,
        registry: &ValueRegistry,
        parent: &mut SectionNode,
        depth: usize,
        pending: &mut IndexSet<String>,
        state: &mut ParseState,
    ) {
        if !state.processed.insert(position) {
            return;
        }
        let raw = reader.read(position);

        let expected = self.options.indent(depth);
        if !raw.starts_with(expected.as_str()) {
            state.emit(Diagnostic::new(
                position,
                raw,
                format!(
                    "Invalid indentation, expected '{}' but found '{}'",
                    expected,
                    leading_indent(raw)
                ),
            ));
            return;
        }

        let trimmed = raw.trim();
        if let Some(comment) = trimmed.strip_prefix("//") {
            pending.insert(comment.trim().to_string());
            return;
        }

        let (text, inline_comment) = split_inline_comment(trimmed, " //");

        if text == "..." {
            return;
        }

        match text.split_once('=') {
            None => self.parse_section_entry(
                position,
                text,
                inline_comment,
                reader,
                registry,
                parent,
                depth,
                pending,
                state,
            ),
            Some((key_part, value_part)) => {
                let key = key_part.trim().to_string();
                let value = value_part.trim();
                self.parse_scalar_entry(
                    position,
                    &key,
                    value,
                    inline_comment,
                    reader,
                    registry,
                    parent,
                    pending,
                    state,
                );
            }
        }
    }

    /// Handle a line without `=`: a section opener, an empty section, or junk
    #[allow(clippy::too_many_arguments)]
    fn parse_section_entry(
        &self,
        position: usize,
        text: &str,
        inline_comment: Option<String>,
        reader: &LineReader,
        registry: &ValueRegistry,
        parent: &mut SectionNode,
        depth: usize,
        pending: &mut IndexSet<String>,
        state: &mut ParseState,
    ) {
        let key = text.replace(['{', '}'], " ").trim().to_string();

        if text.replace(' ', "").ends_with("{}") {
            let mut section = SectionNode::new(key);
            flush_comments(&mut section.comments, pending);
            attach_inline(&mut section.inline_comments, inline_comment);
            parent.insert(ConfigNode::Section(section));
            return;
        }

        if !text.ends_with('{') {
            state.emit(Diagnostic::new(position, reader.read(position), "Invalid syntax"));
            return;
        }

        // Scan forward with a brace-depth counter to find the matching close.
        // Comment lines and inline-comment tails don't count toward depth.
        let mut brace_depth = 1;
        let mut close = None;
        for scan in position + 1..reader.len() {
            let scanned = reader.read(scan).trim();
            if scanned.starts_with("//") {
                continue;
            }
            let (scanned, _) = split_inline_comment(scanned, " //");
            if scanned.ends_with('{') {
                brace_depth += 1;
            } else if scanned == "}" {
                brace_depth -= 1;
                if brace_depth == 0 {
                    close = Some(scan);
                    break;
                }
            }
        }
        let close = match close {
            Some(close) => close,
            None => {
                state.emit(Diagnostic::new(
                    position,
                    reader.read(position),
                    "Unterminated section",
                ));
                return;
            }
        };

        let mut section = SectionNode::new(key);
        flush_comments(&mut section.comments, pending);
        attach_inline(&mut section.inline_comments, inline_comment);

        let mut child_pending = IndexSet::new();
        for child_position in position + 1..close {
            if state.processed.contains(&child_position) {
                continue;
            }
            if reader.read(child_position).trim().is_empty() {
                state.processed.insert(child_position);
                continue;
            }
            self.parse_node(
                child_position,
                reader,
                registry,
                &mut section,
                depth + 1,
                &mut child_pending,
                state,
            );
        }
        state.processed.insert(close);

        parent.insert(ConfigNode::Section(section));
    }

    /// Handle a `key = value` line: list, empty list, absence, or scalar
    #[allow(clippy::too_many_arguments)]
    fn parse_scalar_entry(
        &self,
        position: usize,
        key: &str,
        value: &str,
        inline_comment: Option<String>,
        reader: &LineReader,
        registry: &ValueRegistry,
        parent: &mut SectionNode,
        pending: &mut IndexSet<String>,
        state: &mut ParseState,
    ) {
        if value.replace(' ', "") == "[]" {
            let mut node = ScalarNode::new(key, ScalarValue::List(Vec::new()));
            flush_comments(&mut node.comments, pending);
            attach_inline(&mut node.inline_comments, inline_comment);
            parent.insert(ConfigNode::Scalar(node));
            return;
        }

        if value.starts_with('[') {
            // Accumulate raw text across physical lines until the closing
            // bracket appears.
            let mut content = value.to_string();
            let mut continuation = position;
            while !content.trim_end().ends_with(']') {
                continuation += 1;
                if continuation >= reader.len() {
                    state.emit(Diagnostic::new(position, reader.read(position), "Invalid list"));
                    return;
                }
                content.push_str(reader.read(continuation).trim());
                state.processed.insert(continuation);
            }

            let inner = content.trim();
            let inner = inner[1..inner.len() - 1].trim();
            let mut list = Vec::new();
            if !inner.is_empty() {
                for element in inner.split(',') {
                    let element = element.trim();
                    if element.is_empty() || element.eq_ignore_ascii_case("null") {
                        continue;
                    }
                    match registry.resolve(element) {
                        Ok(parsed) => list.push(parsed),
                        Err(error) => {
                            state.emit(Diagnostic::new(
                                position,
                                reader.read(position),
                                error.message(),
                            ));
                            return;
                        }
                    }
                }
            }

            let mut node = ScalarNode::new(key, ScalarValue::List(list));
            flush_comments(&mut node.comments, pending);
            attach_inline(&mut node.inline_comments, inline_comment);
            parent.insert(ConfigNode::Scalar(node));
            return;
        }

        // A blank or literal Null value encodes absence: no node at all.
        if value.is_empty() || value.eq_ignore_ascii_case("null") {
            return;
        }

        match registry.resolve(value) {
            Ok(parsed) => {
                let mut node = ScalarNode::new(key, ScalarValue::Single(parsed));
                flush_comments(&mut node.comments, pending);
                attach_inline(&mut node.inline_comments, inline_comment);
                parent.insert(ConfigNode::Scalar(node));
            }
            Err(error) => {
                state.emit(Diagnostic::new(position, reader.read(position), error.message()));
            }
        }
    }

    fn write_node(
        &self,
        writer: &mut SourceWriter,
        node: &ConfigNode,
        depth: usize,
        registry: &ValueRegistry,
    ) {
        let indent = self.options.indent(depth);

        for comment in node.comments() {
            writer.write(&indent).write("// ").write(comment).newline();
        }

        match node {
            ConfigNode::Section(section) => {
                if section.children().is_empty() {
                    writer.write(&indent).write(section.key()).write(" {}");
                    write_inline_comments(writer, node);
                    writer.newline();
                    return;
                }

                writer.write(&indent).write(section.key()).write(" {");
                write_inline_comments(writer, node);
                writer.newline();

                for child in section.children() {
                    self.write_node(writer, child, depth + 1, registry);
                }

                writer.write(&indent).write("}").newline();
            }
            ConfigNode::Scalar(scalar) => match scalar.value() {
                ScalarValue::List(list) if list.is_empty() => {
                    writer.write(&indent).write(scalar.key()).write(" = []");
                    write_inline_comments(writer, node);
                    writer.newline();
                }
                ScalarValue::List(list) => {
                    writer.write(&indent).write(scalar.key()).write(" = [");
                    write_inline_comments(writer, node);
                    writer.newline();

                    let element_indent = format!("{}{}", indent, self.options.indent(1));
                    for (index, element) in list.iter().enumerate() {
                        writer.write(&element_indent).write(&registry.render(element));
                        if index != list.len() - 1 {
                            writer.write(",");
                        }
                        writer.newline();
                    }

                    writer.write(&indent).write("]").newline();
                }
                ScalarValue::Single(value) => {
                    writer
                        .write(&indent)
                        .write(scalar.key())
                        .write(" = ")
                        .write(&registry.render(value));
                    write_inline_comments(writer, node);
                    writer.newline();
                }
            },
        }
    }
}

pub(crate) fn flush_comments(target: &mut IndexSet<String>, pending: &mut IndexSet<String>) {
    target.extend(pending.drain(..));
}

pub(crate) fn attach_inline(target: &mut IndexSet<String>, inline_comment: Option<String>) {
    if let Some(comment) = inline_comment {
        target.insert(comment);
    }
}

/// Append ` // a b c` when the node carries inline comments
fn write_inline_comments(writer: &mut SourceWriter, node: &ConfigNode) {
    if !node.inline_comments().is_empty() {
        let joined: Vec<&str> = node.inline_comments().iter().map(String::as_str).collect();
        writer.write(" // ").write(&joined.join(" "));
    }
}
