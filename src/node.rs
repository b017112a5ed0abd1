//! Document node model
//!
//! A parsed document is a tree of [`ConfigNode`]s: sections own an ordered
//! list of named children, scalars own a single value or an ordered list of
//! values. Every node carries two comment sets (standalone and inline), both
//! insertion-ordered and de-duplicated. Sibling keys are unique; inserting
//! under an existing key removes the old node first.
//!
//! The tree is a strict ownership hierarchy. There is no separate destroy
//! operation: removing a node from its parent's children is the only way a
//! node goes away.

use crate::value::Value;
use indexmap::IndexSet;

/// Key of the distinguished root section
///
/// The root exists only as the top of a document; creating a child section
/// under this key (case-insensitive) is a contract violation and panics.
pub const ROOT_KEY: &str = "*";

/// A tree node, either a section or a scalar
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNode {
    Section(SectionNode),
    Scalar(ScalarNode),
}

impl ConfigNode {
    pub fn key(&self) -> &str {
        match self {
            ConfigNode::Section(section) => &section.key,
            ConfigNode::Scalar(scalar) => &scalar.key,
        }
    }

    pub fn comments(&self) -> &IndexSet<String> {
        match self {
            ConfigNode::Section(section) => &section.comments,
            ConfigNode::Scalar(scalar) => &scalar.comments,
        }
    }

    pub fn comments_mut(&mut self) -> &mut IndexSet<String> {
        match self {
            ConfigNode::Section(section) => &mut section.comments,
            ConfigNode::Scalar(scalar) => &mut scalar.comments,
        }
    }

    pub fn inline_comments(&self) -> &IndexSet<String> {
        match self {
            ConfigNode::Section(section) => &section.inline_comments,
            ConfigNode::Scalar(scalar) => &scalar.inline_comments,
        }
    }

    pub fn inline_comments_mut(&mut self) -> &mut IndexSet<String> {
        match self {
            ConfigNode::Section(section) => &mut section.inline_comments,
            ConfigNode::Scalar(scalar) => &mut scalar.inline_comments,
        }
    }

    pub fn is_section(&self) -> bool {
        matches!(self, ConfigNode::Section(_))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, ConfigNode::Scalar(_))
    }

    pub fn as_section(&self) -> Option<&SectionNode> {
        match self {
            ConfigNode::Section(section) => Some(section),
            ConfigNode::Scalar(_) => None,
        }
    }

    pub fn as_section_mut(&mut self) -> Option<&mut SectionNode> {
        match self {
            ConfigNode::Section(section) => Some(section),
            ConfigNode::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarNode> {
        match self {
            ConfigNode::Scalar(scalar) => Some(scalar),
            ConfigNode::Section(_) => None,
        }
    }

    pub fn as_scalar_mut(&mut self) -> Option<&mut ScalarNode> {
        match self {
            ConfigNode::Scalar(scalar) => Some(scalar),
            ConfigNode::Section(_) => None,
        }
    }
}

/// A section: ordered collection of named child nodes
///
/// Children keep insertion order; serialization emits them in exactly this
/// order. This is not a sorted structure.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionNode {
    pub(crate) key: String,
    pub(crate) comments: IndexSet<String>,
    pub(crate) inline_comments: IndexSet<String>,
    pub(crate) children: Vec<ConfigNode>,
}

impl SectionNode {
    pub fn new(key: impl Into<String>) -> Self {
        SectionNode {
            key: key.into(),
            comments: IndexSet::new(),
            inline_comments: IndexSet::new(),
            children: Vec::new(),
        }
    }

    /// The distinguished root section; only documents construct this
    pub(crate) fn root() -> Self {
        SectionNode::new(ROOT_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_root(&self) -> bool {
        self.key == ROOT_KEY
    }

    pub fn comments(&self) -> &IndexSet<String> {
        &self.comments
    }

    pub fn comments_mut(&mut self) -> &mut IndexSet<String> {
        &mut self.comments
    }

    pub fn inline_comments(&self) -> &IndexSet<String> {
        &self.inline_comments
    }

    pub fn inline_comments_mut(&mut self) -> &mut IndexSet<String> {
        &mut self.inline_comments
    }

    /// Children in insertion order
    pub fn children(&self) -> &[ConfigNode] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<ConfigNode> {
        &mut self.children
    }

    /// Insert a child, replacing any sibling with the same key
    ///
    /// Replacement is unset-then-insert: the old node's comments are not
    /// carried over to the new one.
    pub fn insert(&mut self, node: ConfigNode) {
        self.children.retain(|child| child.key() != node.key());
        self.children.push(node);
    }

    /// Remove and return the child with the given exact key
    pub fn remove(&mut self, key: &str) -> Option<ConfigNode> {
        let index = self.children.iter().position(|child| child.key() == key)?;
        Some(self.children.remove(index))
    }

    /// Drop all children
    pub fn clear(&mut self) {
        self.children.clear();
    }
}

/// A scalar: one value, or one ordered list of values
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarNode {
    pub(crate) key: String,
    pub(crate) comments: IndexSet<String>,
    pub(crate) inline_comments: IndexSet<String>,
    pub(crate) value: ScalarValue,
}

impl ScalarNode {
    pub fn new(key: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        ScalarNode {
            key: key.into(),
            comments: IndexSet::new(),
            inline_comments: IndexSet::new(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &ScalarValue {
        &self.value
    }

    /// Replace the payload, leaving key and comments untouched
    pub fn set_value(&mut self, value: impl Into<ScalarValue>) {
        self.value = value.into();
    }

    pub fn comments(&self) -> &IndexSet<String> {
        &self.comments
    }

    pub fn comments_mut(&mut self) -> &mut IndexSet<String> {
        &mut self.comments
    }

    pub fn inline_comments(&self) -> &IndexSet<String> {
        &self.inline_comments
    }

    pub fn inline_comments_mut(&mut self) -> &mut IndexSet<String> {
        &mut self.inline_comments
    }
}

/// Payload of a scalar node
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Single(Value),
    List(Vec<Value>),
}

impl ScalarValue {
    /// Build a list payload from any iterable of convertible values
    pub fn list<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        ScalarValue::List(values.into_iter().map(Into::into).collect())
    }

    pub fn as_single(&self) -> Option<&Value> {
        match self {
            ScalarValue::Single(value) => Some(value),
            ScalarValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            ScalarValue::List(values) => Some(values),
            ScalarValue::Single(_) => None,
        }
    }
}

impl From<Value> for ScalarValue {
    fn from(value: Value) -> Self {
        ScalarValue::Single(value)
    }
}

macro_rules! impl_scalar_from {
    ($($ty:ty),* $(,)?) => {
        $(impl From<$ty> for ScalarValue {
            fn from(value: $ty) -> Self {
                ScalarValue::Single(value.into())
            }
        })*
    };
}

impl_scalar_from!(bool, i8, i16, i32, i64, f32, f64, char, Vec<u8>, uuid::Uuid, String, &str);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_sibling_with_same_key() {
        let mut section = SectionNode::new("server");
        let mut old = ScalarNode::new("port", 8080);
        old.comments_mut().insert("old comment".to_string());
        section.insert(ConfigNode::Scalar(old));
        section.insert(ConfigNode::Scalar(ScalarNode::new("port", 9090)));

        assert_eq!(section.children().len(), 1);
        let scalar = section.children()[0].as_scalar().unwrap();
        assert_eq!(scalar.value().as_single(), Some(&Value::Int(9090)));
        // Fresh node, no comment carry-over.
        assert!(scalar.comments().is_empty());
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut section = SectionNode::new("s");
        for key in ["zebra", "apple", "mango"] {
            section.insert(ConfigNode::Scalar(ScalarNode::new(key, 1)));
        }
        let keys: Vec<&str> = section.children().iter().map(|n| n.key()).collect();
        assert_eq!(keys, vec!["zebra", "apple", "mango"]);
    }

    #[test]
    fn comments_deduplicate_but_keep_order() {
        let mut node = ScalarNode::new("k", 1);
        node.comments_mut().insert("first".to_string());
        node.comments_mut().insert("second".to_string());
        node.comments_mut().insert("first".to_string());
        let comments: Vec<&str> = node.comments().iter().map(|s| s.as_str()).collect();
        assert_eq!(comments, vec!["first", "second"]);
    }

    #[test]
    fn remove_is_the_only_deletion() {
        let mut section = SectionNode::new("s");
        section.insert(ConfigNode::Scalar(ScalarNode::new("a", 1)));
        let removed = section.remove("a").unwrap();
        assert_eq!(removed.key(), "a");
        assert!(section.children().is_empty());
        assert!(section.remove("a").is_none());
    }
}
