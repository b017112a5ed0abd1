//! Section navigation
//!
//! The public tree-editing surface: dotted-path lookup, creation and removal,
//! typed get/set, structural iteration, and comment accessors. A dotted path
//! like `a.b.c` resolves each intermediate segment as a section; every
//! operation fails soft (returns `None`, an empty collection, or does
//! nothing) at the first segment that does not resolve, instead of raising.
//!
//! These are inherent methods on [`SectionNode`]; with node variants as a
//! closed enum there is nothing for a separate wrapper object to add.

use crate::node::{ConfigNode, ScalarNode, ScalarValue, SectionNode, ROOT_KEY};
use crate::value::FromValue;

impl SectionNode {
    /// Direct child with the given exact key
    pub fn node(&self, key: &str) -> Option<&ConfigNode> {
        self.children.iter().find(|child| child.key() == key)
    }

    pub fn node_mut(&mut self, key: &str) -> Option<&mut ConfigNode> {
        self.children.iter_mut().find(|child| child.key() == key)
    }

    /// Node at a dotted path; intermediate segments must be sections
    pub fn node_at(&self, path: &str) -> Option<&ConfigNode> {
        let (parent, key) = self.resolve_parent(path)?;
        parent.node(key)
    }

    pub fn node_at_mut(&mut self, path: &str) -> Option<&mut ConfigNode> {
        let (prefix, key) = split_path(path);
        let parent = match prefix {
            Some(prefix) => self.section_mut(prefix)?,
            None => self,
        };
        parent.node_mut(key)
    }

    /// Section at a dotted path
    pub fn section(&self, path: &str) -> Option<&SectionNode> {
        let mut current = self;
        for part in path.split('.') {
            current = current.node(part)?.as_section()?;
        }
        Some(current)
    }

    pub fn section_mut(&mut self, path: &str) -> Option<&mut SectionNode> {
        let mut current = self;
        for part in path.split('.') {
            current = current.node_mut(part)?.as_section_mut()?;
        }
        Some(current)
    }

    /// Section at a dotted path, creating missing segments along the way
    ///
    /// A non-section node occupying a segment key is replaced by a fresh
    /// empty section (sibling keys are unique).
    ///
    /// # Panics
    ///
    /// Panics when any segment equals the reserved root key,
    /// case-insensitively. The root cannot be created through this API.
    pub fn create_section(&mut self, path: &str) -> &mut SectionNode {
        let mut current = self;
        for part in path.split('.') {
            if part.eq_ignore_ascii_case(ROOT_KEY) {
                panic!("Illegal attempt to create a root section");
            }
            let exists = current
                .node(part)
                .map(|node| node.is_section())
                .unwrap_or(false);
            if !exists {
                current.insert(ConfigNode::Section(SectionNode::new(part)));
            }
            current = current
                .node_mut(part)
                .and_then(|node| node.as_section_mut())
                .expect("section inserted above");
        }
        current
    }

    /// Typed single-value getter
    ///
    /// Returns `None` when the path does not resolve, the node is not a
    /// scalar, the payload is a list, or the value is of a different kind.
    pub fn get<T: FromValue>(&self, path: &str) -> Option<T> {
        let value = self.node_at(path)?.as_scalar()?.value().as_single()?;
        T::from_value(value)
    }

    /// Typed list getter; empty when the path or element types don't line up
    pub fn get_list<T: FromValue>(&self, path: &str) -> Vec<T> {
        self.node_at(path)
            .and_then(|node| node.as_scalar())
            .and_then(|scalar| scalar.value().as_list())
            .and_then(|values| values.iter().map(T::from_value).collect())
            .unwrap_or_default()
    }

    /// Set a scalar at a dotted path, creating intermediate sections
    ///
    /// Any existing node under the final key is removed first; the new node
    /// starts with empty comment sets.
    pub fn set(&mut self, path: &str, value: impl Into<ScalarValue>) -> &mut Self {
        let (prefix, key) = split_path(path);
        let parent = match prefix {
            Some(prefix) => self.create_section(prefix),
            None => &mut *self,
        };
        parent.insert(ConfigNode::Scalar(ScalarNode::new(key, value)));
        self
    }

    /// Remove the node at a dotted path; no-op when it doesn't resolve
    pub fn unset(&mut self, path: &str) -> &mut Self {
        let (prefix, key) = split_path(path);
        let parent = match prefix {
            Some(prefix) => match self.section_mut(prefix) {
                Some(section) => section,
                None => return self,
            },
            None => &mut *self,
        };
        parent.remove(key);
        self
    }

    pub fn contains(&self, path: &str) -> bool {
        self.node_at(path).is_some()
    }

    pub fn is_section_at(&self, path: &str) -> bool {
        self.node_at(path).map(ConfigNode::is_section).unwrap_or(false)
    }

    pub fn is_scalar_at(&self, path: &str) -> bool {
        self.node_at(path).map(ConfigNode::is_scalar).unwrap_or(false)
    }

    /// Keys of the direct children, in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(ConfigNode::key)
    }

    /// Direct child sections, in insertion order
    pub fn sections(&self) -> impl Iterator<Item = &SectionNode> {
        self.children.iter().filter_map(ConfigNode::as_section)
    }

    pub fn sections_mut(&mut self) -> impl Iterator<Item = &mut SectionNode> {
        self.children.iter_mut().filter_map(ConfigNode::as_section_mut)
    }

    /// Direct child scalars, in insertion order
    pub fn scalars(&self) -> impl Iterator<Item = &ScalarNode> {
        self.children.iter().filter_map(ConfigNode::as_scalar)
    }

    pub fn scalars_mut(&mut self) -> impl Iterator<Item = &mut ScalarNode> {
        self.children.iter_mut().filter_map(ConfigNode::as_scalar_mut)
    }

    /// Standalone comments of the node at a dotted path
    pub fn comments_of(&self, path: &str) -> Vec<String> {
        self.node_at(path)
            .map(|node| node.comments().iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Replace (not merge) the standalone comments of the node at a path
    pub fn set_comments_of<I, S>(&mut self, path: &str, comments: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(node) = self.node_at_mut(path) {
            let set = node.comments_mut();
            set.clear();
            set.extend(comments.into_iter().map(Into::into));
        }
        self
    }

    /// Inline comments of the node at a dotted path
    pub fn inline_comments_of(&self, path: &str) -> Vec<String> {
        self.node_at(path)
            .map(|node| node.inline_comments().iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Replace the inline comments of the node at a path
    pub fn set_inline_comments_of<I, S>(&mut self, path: &str, comments: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(node) = self.node_at_mut(path) {
            let set = node.inline_comments_mut();
            set.clear();
            set.extend(comments.into_iter().map(Into::into));
        }
        self
    }

    fn resolve_parent<'a, 'b>(&'a self, path: &'b str) -> Option<(&'a SectionNode, &'b str)> {
        let (prefix, key) = split_path(path);
        let parent = match prefix {
            Some(prefix) => self.section(prefix)?,
            None => self,
        };
        Some((parent, key))
    }
}

/// Split `a.b.c` into (`a.b`, `c`); a plain key has no prefix
fn split_path(path: &str) -> (Option<&str>, &str) {
    match path.rsplit_once('.') {
        Some((prefix, key)) => (Some(prefix), key),
        None => (None, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn dotted_set_and_get() {
        let mut root = SectionNode::new("cfg");
        root.set("a.b.c", 5);
        assert_eq!(root.get::<i32>("a.b.c"), Some(5));
        assert!(root.is_section_at("a"));
        assert!(root.section("a.b").is_some());
    }

    #[test]
    fn missing_intermediate_fails_soft() {
        let mut root = SectionNode::new("cfg");
        root.set("a.b.c", 5);
        assert_eq!(root.get::<i32>("a.x.c"), None);
        assert!(root.section("a.x").is_none());
        assert!(root.get_list::<i32>("a.x.c").is_empty());
        // unset through a missing segment does nothing
        root.unset("a.x.c");
        assert_eq!(root.get::<i32>("a.b.c"), Some(5));
    }

    #[test]
    fn get_with_wrong_type_is_none() {
        let mut root = SectionNode::new("cfg");
        root.set("port", 8080);
        assert_eq!(root.get::<String>("port"), None);
        assert_eq!(root.get::<i32>("port"), Some(8080));
    }

    #[test]
    fn set_replaces_and_drops_comments() {
        let mut root = SectionNode::new("cfg");
        root.set("port", 8080);
        root.set_comments_of("port", ["listen port"]);
        root.set("port", 9090);
        assert_eq!(root.get::<i32>("port"), Some(9090));
        assert!(root.comments_of("port").is_empty());
    }

    #[test]
    fn get_list_roundtrip() {
        let mut root = SectionNode::new("cfg");
        root.set("tags", ScalarValue::list(["a", "b", "c"]));
        assert_eq!(
            root.get_list::<String>("tags"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        // single value is not a list
        root.set("one", 1);
        assert!(root.get_list::<i32>("one").is_empty());
    }

    #[test]
    #[should_panic(expected = "root section")]
    fn creating_root_key_panics() {
        let mut root = SectionNode::new("cfg");
        root.create_section("*");
    }

    #[test]
    fn create_section_reuses_existing() {
        let mut root = SectionNode::new("cfg");
        root.create_section("a.b");
        root.set("a.b.x", 1);
        root.create_section("a.b");
        assert_eq!(root.get::<i32>("a.b.x"), Some(1));
    }

    #[test]
    fn structural_iteration_preserves_order() {
        let mut root = SectionNode::new("cfg");
        root.set("first", 1);
        root.create_section("middle");
        root.set("last", Value::Bool(true));
        assert_eq!(root.keys().collect::<Vec<_>>(), vec!["first", "middle", "last"]);
        assert_eq!(root.sections().count(), 1);
        assert_eq!(root.scalars().count(), 2);
    }

    #[test]
    fn comment_replacement_is_whole_collection() {
        let mut root = SectionNode::new("cfg");
        root.set("key", 1);
        root.set_comments_of("key", ["one", "two"]);
        root.set_comments_of("key", ["three"]);
        assert_eq!(root.comments_of("key"), vec!["three".to_string()]);
    }
}
