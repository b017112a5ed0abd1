//! # inscript
//!
//! A comment-preserving configuration document engine. Text in one of two
//! surface syntaxes (the brace-delimited DataScript format or a YAML subset)
//! parses into a tree of sections and scalars, the tree is navigated and
//! edited through dotted paths, and serializes back to text with every
//! standalone and inline comment intact.
//!
//! ```rust,ignore
//! use inscript::Inscript;
//!
//! let mut doc = Inscript::from_path("server.ds")?;
//! doc.load_from_disk()?;
//! let port: Option<i32> = doc.root().get("server.port");
//! doc.root_mut().set("server.port", 9090);
//! doc.save_to_disk()?;
//! ```
//!
//! Parsing is deliberately tolerant: malformed lines produce [`Diagnostic`]s
//! (returned from `load` and reported through a replaceable process-wide
//! hook) while the rest of the document still parses.

pub mod error;
pub mod format;
pub mod inscript;
pub mod node;
pub mod section;
pub mod value;

pub use error::{set_diagnostic_hook, CodecError, Diagnostic, InscriptError};
pub use format::{
    DataScriptFormat, FileFormat, FormatOptions, FormatRegistry, LineReader, SourceWriter,
    YamlFormat,
};
pub use inscript::Inscript;
pub use node::{ConfigNode, ScalarNode, ScalarValue, SectionNode, ROOT_KEY};
pub use value::{FromValue, InlineCodec, StructuredCodec, Value, ValueKind, ValueRegistry};
