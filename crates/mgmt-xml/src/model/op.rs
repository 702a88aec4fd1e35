//! Operation types.
//!
//! Operations are the replay log produced by the parser. Order is significant:
//! an operation may target an address created by an earlier one in the same
//! list.

use std::fmt;

use indexmap::IndexMap;

use crate::model::{Address, ModelNode};

/// Operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Creates the resource at the address.
    Add,
    /// Sets one attribute of an existing resource.
    WriteAttribute,
}

impl OperationKind {
    /// Returns the operation name as used in management requests.
    pub fn name(self) -> &'static str {
        match self {
            OperationKind::Add => "add",
            OperationKind::WriteAttribute => "write-attribute",
        }
    }
}

/// A single add-resource or write-attribute instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub kind: OperationKind,
    pub address: Address,
    pub attributes: IndexMap<String, ModelNode>,
}

impl Operation {
    /// Creates an add operation with no attributes.
    pub fn add(address: Address) -> Self {
        Self {
            kind: OperationKind::Add,
            address,
            attributes: IndexMap::new(),
        }
    }

    /// Creates a write-attribute operation for a single attribute.
    pub fn write_attribute(
        address: Address,
        name: impl Into<String>,
        value: impl Into<ModelNode>,
    ) -> Self {
        let mut attributes = IndexMap::with_capacity(1);
        attributes.insert(name.into(), value.into());
        Self {
            kind: OperationKind::WriteAttribute,
            address,
            attributes,
        }
    }

    /// Sets an attribute, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ModelNode>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ModelNode> {
        self.attributes.get(name)
    }

    pub fn has_defined(&self, name: &str) -> bool {
        self.get(name).is_some_and(ModelNode::is_defined)
    }

    /// Renders the operation as a management request node:
    /// `{"operation" => "add", "address" => [...], ...}` or, for writes,
    /// `{"operation" => "write-attribute", "address" => [...], "name" => .., "value" => ..}`.
    pub fn to_model_node(&self) -> ModelNode {
        let mut node = ModelNode::object();
        node.set("operation", self.kind.name());
        let address = self
            .address
            .pairs()
            .into_iter()
            .map(|(k, v)| {
                let mut pair = ModelNode::object();
                pair.set(k, v);
                pair
            })
            .collect();
        node.set("address", ModelNode::List(address));
        match self.kind {
            OperationKind::Add => {
                for (name, value) in &self.attributes {
                    node.set(name.as_str(), value.clone());
                }
            }
            OperationKind::WriteAttribute => {
                for (name, value) in &self.attributes {
                    node.set("name", name.as_str());
                    node.set("value", value.clone());
                }
            }
        }
        node
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.name(), self.address)?;
        for (i, (name, value)) in self.attributes.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{name}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_attribute_request() {
        let op = Operation::write_attribute(
            Address::from_pairs([("core-service", "management"), ("access", "authorization")]),
            "provider",
            "rbac",
        );
        let node = op.to_model_node();
        assert_eq!(node.get("operation").and_then(ModelNode::as_str), Some("write-attribute"));
        assert_eq!(node.get("name").and_then(ModelNode::as_str), Some("provider"));
        assert_eq!(node.get("value").and_then(ModelNode::as_str), Some("rbac"));
        assert_eq!(node.get("address").map(ModelNode::len), Some(2));
    }

    #[test]
    fn test_add_request_carries_attributes() {
        let mut op = Operation::add(Address::from_pairs([("security-realm", "R")]));
        op.set("path", "users.properties");
        op.set("plain-text", true);
        assert!(op.has_defined("plain-text"));

        let node = op.to_model_node();
        assert_eq!(node.get("plain-text"), Some(&ModelNode::Boolean(true)));
        assert_eq!(
            op.to_string(),
            r#"add /security-realm=R path="users.properties", plain-text=true"#
        );
    }
}
