//! Document facade
//!
//! An [`Inscript`] owns one document tree, the codec registry used to parse
//! and render its values, and the format engine chosen for its surface
//! syntax. All I/O happens here, outside the recursive parsing core: the
//! whole source is read into memory before parsing begins and the whole
//! rendered text is written after serialization ends.

use crate::error::{Diagnostic, InscriptError};
use crate::format::{FileFormat, FormatRegistry, LineReader};
use crate::node::SectionNode;
use crate::value::ValueRegistry;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct Inscript {
    path: Option<PathBuf>,
    root: SectionNode,
    registry: ValueRegistry,
    format: Arc<dyn FileFormat>,
}

impl Inscript {
    /// Create a document bound to a path, auto-detecting the format from the
    /// file extension (`ds`, `yaml`, `yml`)
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, InscriptError> {
        let path = path.into();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        let format = FormatRegistry::with_defaults()
            .by_extension(extension)
            .ok_or_else(|| InscriptError::UnknownFormat(path.display().to_string()))?;
        Ok(Inscript::build(Some(path), format))
    }

    /// Create an unbound document with an explicit format
    pub fn with_format(format: Arc<dyn FileFormat>) -> Self {
        Inscript::build(None, format)
    }

    /// Create a path-bound document with an explicit format
    pub fn with_format_at(format: Arc<dyn FileFormat>, path: impl Into<PathBuf>) -> Self {
        Inscript::build(Some(path.into()), format)
    }

    fn build(path: Option<PathBuf>, format: Arc<dyn FileFormat>) -> Self {
        Inscript {
            path,
            root: SectionNode::root(),
            registry: ValueRegistry::with_defaults(),
            format,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn root(&self) -> &SectionNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut SectionNode {
        &mut self.root
    }

    pub fn registry(&self) -> &ValueRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ValueRegistry {
        &mut self.registry
    }

    /// Parse the bound file, replacing the current tree
    ///
    /// A missing file is a no-op (the document stays empty); parse problems
    /// come back as diagnostics, not errors.
    pub fn load_from_disk(&mut self) -> Result<Vec<Diagnostic>, InscriptError> {
        let path = self.path.as_ref().ok_or(InscriptError::MissingPath)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(path)
            .map_err(|e| InscriptError::Io(format!("{}: {}", path.display(), e)))?;
        Ok(self.load_from_str(&text))
    }

    /// Parse the given text, replacing the current tree
    pub fn load_from_str(&mut self, text: &str) -> Vec<Diagnostic> {
        self.root.clear();
        let reader = LineReader::new(text);
        self.format.load(&reader, &mut self.root, &self.registry)
    }

    /// Serialize the tree and write it to the bound path, creating the file
    /// if absent
    pub fn save_to_disk(&self) -> Result<(), InscriptError> {
        let path = self.path.as_ref().ok_or(InscriptError::MissingPath)?;
        let text = self.save_to_string();
        fs::write(path, text)
            .map_err(|e| InscriptError::Io(format!("{}: {}", path.display(), e)))
    }

    pub fn save_to_string(&self) -> String {
        self.format.save(&self.root, &self.registry)
    }

    /// Decode the section at a dotted path into an application type through
    /// its registered structured codec
    pub fn get_object<T: 'static>(&self, path: &str) -> Option<T> {
        let section = self.root.section(path)?;
        self.registry.decode_section(section)
    }

    /// Encode an application type into the section at a dotted path
    ///
    /// Any existing node under the path is removed first. Returns false when
    /// no structured codec is registered for `T`.
    pub fn set_object<T: 'static>(&mut self, path: &str, value: &T) -> bool {
        if self.registry.structured::<T>().is_none() {
            return false;
        }
        self.root.unset(path);
        let section = self.root.create_section(path);
        self.registry.encode_section(value, section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::StructuredCodec;

    #[derive(Debug, PartialEq)]
    struct Endpoint {
        host: String,
        port: i32,
    }

    fn endpoint_codec() -> StructuredCodec<Endpoint> {
        StructuredCodec::new(
            |section| {
                Some(Endpoint {
                    host: section.get::<String>("host")?,
                    port: section.get::<i32>("port")?,
                })
            },
            |endpoint, section| {
                section.set("host", endpoint.host.clone());
                section.set("port", endpoint.port);
            },
        )
    }

    #[test]
    fn detects_format_by_extension() {
        assert!(Inscript::from_path("config.ds").is_ok());
        assert!(Inscript::from_path("config.yaml").is_ok());
        assert!(Inscript::from_path("config.yml").is_ok());
        assert!(matches!(
            Inscript::from_path("config.ini"),
            Err(InscriptError::UnknownFormat(_))
        ));
    }

    #[test]
    fn load_replaces_previous_tree() {
        let mut doc = Inscript::from_path("config.ds").unwrap();
        doc.load_from_str("a = 1\n");
        doc.load_from_str("b = 2\n");
        assert!(!doc.root().contains("a"));
        assert_eq!(doc.root().get::<i32>("b"), Some(2));
    }

    #[test]
    fn structured_codec_round_trips_through_sections() {
        let mut doc = Inscript::from_path("config.ds").unwrap();
        doc.registry_mut().register_structured(endpoint_codec());

        let endpoint = Endpoint {
            host: "localhost".to_string(),
            port: 5432,
        };
        assert!(doc.set_object("db.primary", &endpoint));
        assert_eq!(doc.get_object::<Endpoint>("db.primary"), Some(endpoint));
        assert_eq!(doc.root().get::<i32>("db.primary.port"), Some(5432));
    }

    #[test]
    fn set_object_without_codec_is_refused() {
        let mut doc = Inscript::from_path("config.ds").unwrap();
        assert!(!doc.set_object("db", &Endpoint {
            host: "x".to_string(),
            port: 1,
        }));
        assert!(!doc.root().contains("db"));
    }

    #[test]
    fn unbound_document_refuses_disk_operations() {
        let format = FormatRegistry::with_defaults().by_extension("ds").unwrap();
        let mut doc = Inscript::with_format(format);
        assert!(matches!(doc.load_from_disk(), Err(InscriptError::MissingPath)));
        assert!(matches!(doc.save_to_disk(), Err(InscriptError::MissingPath)));
    }
}
