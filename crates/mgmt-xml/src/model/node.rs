//! The canonical value tree.
//!
//! A [`ModelNode`] is either undefined, a scalar, an ordered list or an ordered
//! object of named children. Resource trees keep child-type names and
//! attribute names side by side in the same object, so a security realm node
//! looks like `{"server-identity" => {"ssl" => {...}}, "authentication" => {...}}`.

use std::fmt;

use indexmap::IndexMap;

/// A node in the configuration tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ModelNode {
    #[default]
    Undefined,
    Boolean(bool),
    Int(i64),
    String(String),
    /// An unresolved `${...}` expression, kept verbatim.
    Expression(String),
    List(Vec<ModelNode>),
    Object(IndexMap<String, ModelNode>),
}

impl ModelNode {
    /// Creates an empty object node.
    pub fn object() -> Self {
        ModelNode::Object(IndexMap::new())
    }

    /// Returns true unless this node is [`ModelNode::Undefined`].
    pub fn is_defined(&self) -> bool {
        !matches!(self, ModelNode::Undefined)
    }

    /// Returns the named child of an object node.
    pub fn get(&self, key: &str) -> Option<&ModelNode> {
        match self {
            ModelNode::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Follows a sequence of keys, returning `None` at the first missing step.
    pub fn get_path(&self, keys: &[&str]) -> Option<&ModelNode> {
        keys.iter().try_fold(self, |node, key| node.get(key))
    }

    /// Returns a mutable reference to the named child, creating it (and turning
    /// this node into an object) when needed.
    pub fn get_mut_or_insert(&mut self, key: &str) -> &mut ModelNode {
        match self {
            ModelNode::Object(map) => map.entry(key.to_string()).or_default(),
            node => {
                *node = ModelNode::object();
                node.get_mut_or_insert(key)
            }
        }
    }

    /// Sets the named child, turning this node into an object when needed.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ModelNode>) {
        let key = key.into();
        *self.get_mut_or_insert(&key) = value.into();
    }

    /// Removes the named child of an object node.
    pub fn remove(&mut self, key: &str) -> Option<ModelNode> {
        match self {
            ModelNode::Object(map) => map.shift_remove(key),
            _ => None,
        }
    }

    /// Returns true if the named child exists and is defined.
    pub fn has_defined(&self, key: &str) -> bool {
        self.get(key).is_some_and(ModelNode::is_defined)
    }

    /// Returns true if the named child is an object with at least one entry.
    pub fn has_children(&self, key: &str) -> bool {
        self.get(key).is_some_and(|child| !child.is_empty())
    }

    /// Iterates the keys of an object node in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.children().map(|(key, _)| key)
    }

    /// Iterates the `(name, child)` pairs of an object node in insertion order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &ModelNode)> {
        let map = match self {
            ModelNode::Object(map) => Some(map),
            _ => None,
        };
        map.into_iter()
            .flat_map(|map| map.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// Number of entries in an object or list node; zero for everything else.
    pub fn len(&self) -> usize {
        match self {
            ModelNode::Object(map) => map.len(),
            ModelNode::List(items) => items.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ModelNode::String(s) | ModelNode::Expression(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ModelNode::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ModelNode::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Renders a scalar as the token it would occupy in a document.
    pub fn to_xml_string(&self) -> Option<String> {
        match self {
            ModelNode::Boolean(b) => Some(b.to_string()),
            ModelNode::Int(i) => Some(i.to_string()),
            ModelNode::String(s) | ModelNode::Expression(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl From<bool> for ModelNode {
    fn from(value: bool) -> Self {
        ModelNode::Boolean(value)
    }
}

impl From<i64> for ModelNode {
    fn from(value: i64) -> Self {
        ModelNode::Int(value)
    }
}

impl From<&str> for ModelNode {
    fn from(value: &str) -> Self {
        ModelNode::String(value.to_string())
    }
}

impl From<String> for ModelNode {
    fn from(value: String) -> Self {
        ModelNode::String(value)
    }
}

impl fmt::Display for ModelNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelNode::Undefined => f.write_str("undefined"),
            ModelNode::Boolean(b) => write!(f, "{b}"),
            ModelNode::Int(i) => write!(f, "{i}"),
            ModelNode::String(s) => write!(f, "{s:?}"),
            ModelNode::Expression(s) => write!(f, "expression {s:?}"),
            ModelNode::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            ModelNode::Object(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, " {key:?} => {value}")?;
                }
                if !map.is_empty() {
                    f.write_str(" ")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_vivify_and_path() {
        let mut root = ModelNode::Undefined;
        root.get_mut_or_insert("core-service")
            .get_mut_or_insert("management")
            .set("name", "x");

        assert_eq!(
            root.get_path(&["core-service", "management", "name"]),
            Some(&ModelNode::from("x"))
        );
        assert!(root.get_path(&["core-service", "other"]).is_none());
        assert!(root.has_defined("core-service"));
    }

    #[test]
    fn test_has_defined_ignores_undefined_children() {
        let mut node = ModelNode::object();
        node.set("a", ModelNode::Undefined);
        node.set("b", 1i64);
        assert!(!node.has_defined("a"));
        assert!(node.has_defined("b"));
        assert!(!node.has_defined("c"));
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let mut node = ModelNode::object();
        node.set("z", true);
        node.set("a", false);
        node.set("m", 3i64);
        let keys: Vec<_> = node.keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_has_children_on_empty_object() {
        let mut node = ModelNode::object();
        node.set("handler", ModelNode::object());
        assert!(node.has_defined("handler"));
        assert!(!node.has_children("handler"));
    }

    #[test]
    fn test_xml_tokens() {
        assert_eq!(ModelNode::from(true).to_xml_string().as_deref(), Some("true"));
        assert_eq!(ModelNode::Int(514).to_xml_string().as_deref(), Some("514"));
        assert_eq!(
            ModelNode::Expression("${port:9999}".into()).to_xml_string().as_deref(),
            Some("${port:9999}")
        );
        assert_eq!(ModelNode::object().to_xml_string(), None);
    }

    #[test]
    fn test_display() {
        let mut node = ModelNode::object();
        node.set("path", "users.properties");
        node.set("plain-text", true);
        assert_eq!(
            node.to_string(),
            r#"{ "path" => "users.properties", "plain-text" => true }"#
        );
    }
}
