//! The YAML-subset syntax (`.yaml`, `.yml`)
//!
//! A restricted YAML grammar that shares the engine's node model:
//!
//! ```text
//! # standalone comment
//! server: # inline comment
//!   port: 8080
//!   tags:
//!     - a
//!     - b
//!   hosts: [alpha, beta]
//! ```
//!
//! `key: value` is a scalar; `key:` followed by a deeper-indented block opens
//! a section, or a block list when the deeper lines are `- ` items. The
//! owning key of a block list is threaded through the lookahead, never
//! re-derived from the previous physical line. `key:` with no deeper block
//! re-parses as an empty section. `---` and `...` document markers are
//! ignored.

use crate::error::Diagnostic;
use crate::format::datascript::{attach_inline, flush_comments};
use crate::format::{
    leading_indent, split_inline_comment, FileFormat, FormatOptions, LineReader, ParseState,
    SourceWriter,
};
use crate::node::{ConfigNode, ScalarNode, ScalarValue, SectionNode};
use crate::value::ValueRegistry;
use indexmap::IndexSet;

pub struct YamlFormat {
    options: FormatOptions,
}

impl YamlFormat {
    pub fn new(options: FormatOptions) -> Self {
        YamlFormat { options }
    }
}

impl Default for YamlFormat {
    fn default() -> Self {
        YamlFormat::new(FormatOptions::default())
    }
}

impl FileFormat for YamlFormat {
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
        &["yaml", "yml"]
    }
}

impl YamlFormat {
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
        if let Some(comment) = trimmed.strip_prefix('#') {
            pending.insert(comment.trim().to_string());
            return;
        }

        let (text, inline_comment) = split_inline_comment(trimmed, " #");

        if text == "---" || text == "..." {
            return;
        }

        let (key_part, value_part) = match text.split_once(':') {
            Some(parts) => parts,
            None => {
                let message = if text.starts_with('-') {
                    "List item without an owning key"
                } else {
                    "Invalid YAML syntax"
                };
                state.emit(Diagnostic::new(position, raw, message));
                return;
            }
        };
        let key = key_part.trim().to_string();
        let value = value_part.trim();

        if value.is_empty() {
            self.parse_block(
                position,
                &key,
                inline_comment,
                reader,
                registry,
                parent,
                depth,
                pending,
                state,
            );
            return;
        }

        if value == "[]" {
            let mut node = ScalarNode::new(key, ScalarValue::List(Vec::new()));
            flush_comments(&mut node.comments, pending);
            attach_inline(&mut node.inline_comments, inline_comment);
            parent.insert(ConfigNode::Scalar(node));
            return;
        }

        if value.starts_with('[') {
            self.parse_inline_list(
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
            return;
        }

        if value.eq_ignore_ascii_case("null") {
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
                state.emit(Diagnostic::new(position, raw, error.message()));
            }
        }
    }

    /// `key:` with a blank value: section, block list, or empty section
    ///
    /// The next structural line (blank and comment lines skipped) decides.
    /// Strictly deeper indentation means a nested block (a block list when
    /// it is a `-` item, a section otherwise); anything else means an empty
    /// section. The recursion hands control back on the first line at or
    /// below this line's indentation.
    #[allow(clippy::too_many_arguments)]
    fn parse_block(
        &self,
        position: usize,
        key: &str,
        inline_comment: Option<String>,
        reader: &LineReader,
        registry: &ValueRegistry,
        parent: &mut SectionNode,
        depth: usize,
        pending: &mut IndexSet<String>,
        state: &mut ParseState,
    ) {
        let own_indent = leading_indent(reader.read(position)).len();

        let lookahead = next_structural_line(reader, position + 1)
            .filter(|&next| leading_indent(reader.read(next)).len() > own_indent);

        let Some(first_child) = lookahead else {
            let mut section = SectionNode::new(key);
            flush_comments(&mut section.comments, pending);
            attach_inline(&mut section.inline_comments, inline_comment);
            parent.insert(ConfigNode::Section(section));
            return;
        };

        if reader.read(first_child).trim().starts_with('-') {
            self.parse_block_list(
                position,
                key,
                inline_comment,
                reader,
                registry,
                parent,
                pending,
                state,
            );
            return;
        }

        let mut section = SectionNode::new(key);
        flush_comments(&mut section.comments, pending);
        attach_inline(&mut section.inline_comments, inline_comment);

        let mut child_pending = IndexSet::new();
        let mut child_position = position + 1;
        while child_position < reader.len() {
            let child_line = reader.read(child_position);
            if child_line.trim().is_empty() {
                state.processed.insert(child_position);
                child_position += 1;
                continue;
            }
            if leading_indent(child_line).len() <= own_indent {
                break;
            }
            if !state.processed.contains(&child_position) {
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
            child_position += 1;
        }

        parent.insert(ConfigNode::Section(section));
    }

    /// Consume consecutive `- value` lines into a list scalar owned by `key`
    #[allow(clippy::too_many_arguments)]
    fn parse_block_list(
        &self,
        position: usize,
        key: &str,
        inline_comment: Option<String>,
        reader: &LineReader,
        registry: &ValueRegistry,
        parent: &mut SectionNode,
        pending: &mut IndexSet<String>,
        state: &mut ParseState,
    ) {
        let own_indent = leading_indent(reader.read(position)).len();
        let mut list = Vec::new();

        let mut item_position = position + 1;
        while item_position < reader.len() {
            let line = reader.read(item_position);
            let trimmed = line.trim();
            if trimmed.is_empty() {
                state.processed.insert(item_position);
                item_position += 1;
                continue;
            }
            // comment lines inside the item run attach to the list node
            if leading_indent(line).len() > own_indent {
                if let Some(comment) = trimmed.strip_prefix('#') {
                    pending.insert(comment.trim().to_string());
                    state.processed.insert(item_position);
                    item_position += 1;
                    continue;
                }
            }
            if leading_indent(line).len() <= own_indent || !trimmed.starts_with('-') {
                break;
            }

            let element = trimmed[1..].trim();
            if !element.eq_ignore_ascii_case("null") {
                match registry.resolve(element) {
                    Ok(parsed) => list.push(parsed),
                    Err(error) => {
                        state.emit(Diagnostic::new(item_position, line, error.message()));
                        // mark the remaining items consumed so they don't
                        // rescan as stray entries
                        let mut rest = item_position;
                        while rest < reader.len() && reader.read(rest).trim().starts_with('-') {
                            state.processed.insert(rest);
                            rest += 1;
                        }
                        return;
                    }
                }
            }

            state.processed.insert(item_position);
            item_position += 1;
        }

        let mut node = ScalarNode::new(key, ScalarValue::List(list));
        flush_comments(&mut node.comments, pending);
        attach_inline(&mut node.inline_comments, inline_comment);
        parent.insert(ConfigNode::Scalar(node));
    }

    /// `key: [ ... ]` with the same multi-line continuation rule as the
    /// DataScript engine
    #[allow(clippy::too_many_arguments)]
    fn parse_inline_list(
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
                        state.emit(Diagnostic::new(position, reader.read(position), error.message()));
                        return;
                    }
                }
            }
        }

        let mut node = ScalarNode::new(key, ScalarValue::List(list));
        flush_comments(&mut node.comments, pending);
        attach_inline(&mut node.inline_comments, inline_comment);
        parent.insert(ConfigNode::Scalar(node));
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
            writer.write(&indent).write("# ").write(comment).newline();
        }

        match node {
            ConfigNode::Section(section) => {
                writer.write(&indent).write(section.key()).write(":");
                write_inline_comments(writer, node);
                writer.newline();

                for child in section.children() {
                    self.write_node(writer, child, depth + 1, registry);
                }
            }
            ConfigNode::Scalar(scalar) => match scalar.value() {
                ScalarValue::List(list) if list.is_empty() => {
                    writer.write(&indent).write(scalar.key()).write(": []");
                    write_inline_comments(writer, node);
                    writer.newline();
                }
                ScalarValue::List(list) => {
                    writer.write(&indent).write(scalar.key()).write(":");
                    write_inline_comments(writer, node);
                    writer.newline();

                    let item_indent = format!("{}{}", indent, self.options.indent(1));
                    for element in list {
                        writer
                            .write(&item_indent)
                            .write("- ")
                            .write(&registry.render(element))
                            .newline();
                    }
                }
                ScalarValue::Single(value) => {
                    writer
                        .write(&indent)
                        .write(scalar.key())
                        .write(": ")
                        .write(&registry.render(value));
                    write_inline_comments(writer, node);
                    writer.newline();
                }
            },
        }
    }
}

/// First line at or after `from` that is neither blank nor a `#` comment
fn next_structural_line(reader: &LineReader, from: usize) -> Option<usize> {
    (from..reader.len()).find(|&position| {
        let trimmed = reader.read(position).trim();
        !trimmed.is_empty() && !trimmed.starts_with('#')
    })
}

/// Append ` # a b c` when the node carries inline comments
fn write_inline_comments(writer: &mut SourceWriter, node: &ConfigNode) {
    if !node.inline_comments().is_empty() {
        let joined: Vec<&str> = node.inline_comments().iter().map(String::as_str).collect();
        writer.write(" # ").write(&joined.join(" "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn parse(text: &str) -> (SectionNode, Vec<Diagnostic>) {
        let format = YamlFormat::default();
        let registry = ValueRegistry::with_defaults();
        let mut root = SectionNode::new("*");
        let errors = format.load(&LineReader::new(text), &mut root, &registry);
        (root, errors)
    }

    fn render(root: &SectionNode) -> String {
        YamlFormat::default().save(root, &ValueRegistry::with_defaults())
    }

    #[test]
    fn parses_mappings_and_block_lists() {
        let (root, errors) = parse("server:\n  port: 8080\n  tags:\n    - a\n    - b\n");
        assert!(errors.is_empty());
        assert_eq!(root.get::<i32>("server.port"), Some(8080));
        assert_eq!(
            root.get_list::<String>("server.tags"),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn block_list_key_is_threaded_across_blank_gaps() {
        // blank lines between the header and the first item must not
        // confuse list ownership
        let (root, errors) = parse("tags:\n\n    - a\n    - b\n");
        assert!(errors.is_empty());
        assert_eq!(
            root.get_list::<String>("tags"),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn comment_between_list_header_and_items_stays_with_the_list() {
        let (root, errors) = parse("tags:\n  # which tags\n  - a\n  - b\n");
        assert!(errors.is_empty(), "unexpected diagnostics: {:?}", errors);
        assert_eq!(
            root.get_list::<String>("tags"),
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(root.comments_of("tags"), vec!["which tags".to_string()]);
    }

    #[test]
    fn hash_inside_quoted_strings_is_not_a_comment() {
        let (root, errors) = parse("s: 'a #b'\n");
        assert!(errors.is_empty());
        assert_eq!(root.get::<String>("s"), Some("a #b".to_string()));
        assert!(root.inline_comments_of("s").is_empty());
    }

    #[test]
    fn key_without_body_is_an_empty_section() {
        let (root, errors) = parse("empty:\nnext: 1\n");
        assert!(errors.is_empty());
        let section = root.section("empty").expect("empty section");
        assert!(section.children().is_empty());
        assert_eq!(root.get::<i32>("next"), Some(1));
        // and it round-trips as a bare header line
        assert_eq!(render(&root), "empty:\nnext: 1\n");
    }

    #[test]
    fn inline_lists_continue_across_lines() {
        let (root, errors) = parse("nums: [1,\n  2,\n  3]\n");
        assert!(errors.is_empty());
        assert_eq!(root.get_list::<i32>("nums"), vec![1, 2, 3]);
    }

    #[test]
    fn comments_and_inline_comments_round_trip() {
        let (root, errors) = parse("# about server\nserver: # inline note\n  port: 8080\n");
        assert!(errors.is_empty());
        assert_eq!(root.comments_of("server"), vec!["about server".to_string()]);
        assert_eq!(
            root.inline_comments_of("server"),
            vec!["inline note".to_string()]
        );
        let rendered = render(&root);
        assert_eq!(rendered, "# about server\nserver: # inline note\n  port: 8080\n");
    }

    #[test]
    fn document_markers_are_ignored() {
        let (root, errors) = parse("---\na: 1\n...\n");
        assert!(errors.is_empty());
        assert_eq!(root.get::<i32>("a"), Some(1));
    }

    #[test]
    fn null_scalars_and_elements_are_elided() {
        let (root, errors) = parse("gone: null\ntags: [a, Null, b]\n");
        assert!(errors.is_empty());
        assert!(!root.contains("gone"));
        assert_eq!(
            root.get_list::<String>("tags"),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn recursion_stops_at_shallower_indentation() {
        let (root, errors) = parse("outer:\n  inner:\n    deep: 1\n  sibling: 2\ntop: 3\n");
        assert!(errors.is_empty());
        assert_eq!(root.get::<i32>("outer.inner.deep"), Some(1));
        assert_eq!(root.get::<i32>("outer.sibling"), Some(2));
        assert_eq!(root.get::<i32>("top"), Some(3));
    }

    #[test]
    fn invalid_lines_produce_diagnostics_and_parse_continues() {
        let (root, errors) = parse("just some text\nport: 8080\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message(), "Invalid YAML syntax");
        assert_eq!(root.get::<i32>("port"), Some(8080));
    }

    #[test]
    fn typed_values_parse_in_yaml_too() {
        let (root, errors) = parse("ratio: 1.5D\nbig: 12L\nflag: true\n");
        assert!(errors.is_empty());
        assert_eq!(root.get::<f64>("ratio"), Some(1.5));
        assert_eq!(root.get::<i64>("big"), Some(12));
        assert_eq!(root.get::<bool>("flag"), Some(true));
    }

    #[test]
    fn render_parse_render_is_idempotent() {
        let mut root = SectionNode::new("*");
        root.set("server.port", 8080);
        root.set("server.tags", ScalarValue::list(["a", "b"]));
        root.set("flag", Value::Bool(true));
        root.set_comments_of("server", ["main block"]);

        let first = render(&root);
        let (reparsed, errors) = parse(&first);
        assert!(errors.is_empty());
        assert_eq!(render(&reparsed), first);
    }
}
