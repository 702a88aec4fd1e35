//! Builder API for operation lists.
//!
//! Provides a fluent interface for writing the operation list a document is
//! expected to produce, or for generating operations programmatically.
//!
//! # Example
//!
//! ```rust
//! use mgmt_xml::model::{Address, OperationsBuilder};
//!
//! let management = Address::root().append("core-service", "management");
//! let ops = OperationsBuilder::new(management)
//!     .add(&[("security-realm", "ManagementRealm")], |a| a)
//!     .add(
//!         &[("security-realm", "ManagementRealm"), ("authentication", "properties")],
//!         |a| a.string("path", "mgmt-users.properties").boolean("plain-text", false),
//!     )
//!     .build();
//! assert_eq!(ops.len(), 2);
//! ```

use indexmap::IndexMap;

use crate::model::{Address, ModelNode, Operation, OperationKind};

/// Builder for an ordered operation list anchored at a base address.
#[derive(Debug, Clone)]
pub struct OperationsBuilder {
    base: Address,
    ops: Vec<Operation>,
}

impl OperationsBuilder {
    /// Creates a builder whose relative paths resolve under `base`.
    pub fn new(base: Address) -> Self {
        Self {
            base,
            ops: Vec::new(),
        }
    }

    fn resolve(&self, path: &[(&str, &str)]) -> Address {
        path.iter()
            .fold(self.base.clone(), |addr, (k, v)| addr.append(*k, *v))
    }

    /// Adds an add operation at `path` (relative to the base), with attributes
    /// supplied by a builder function.
    pub fn add<F>(mut self, path: &[(&str, &str)], f: F) -> Self
    where
        F: FnOnce(AttributesBuilder) -> AttributesBuilder,
    {
        let builder = f(AttributesBuilder::new());
        self.ops.push(Operation {
            kind: OperationKind::Add,
            address: self.resolve(path),
            attributes: builder.attributes,
        });
        self
    }

    /// Adds a write-attribute operation at `path` (relative to the base).
    pub fn write_attribute(
        mut self,
        path: &[(&str, &str)],
        name: &str,
        value: impl Into<ModelNode>,
    ) -> Self {
        let address = self.resolve(path);
        self.ops.push(Operation::write_attribute(address, name, value));
        self
    }

    /// Adds a raw operation directly.
    pub fn op(mut self, op: Operation) -> Self {
        self.ops.push(op);
        self
    }

    /// Returns the number of operations added so far.
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    pub fn build(self) -> Vec<Operation> {
        self.ops
    }
}

/// Builder for the attribute map of an add operation.
#[derive(Debug, Clone, Default)]
pub struct AttributesBuilder {
    attributes: IndexMap<String, ModelNode>,
}

impl AttributesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an arbitrary value.
    pub fn value(mut self, name: &str, value: ModelNode) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }

    pub fn string(self, name: &str, value: &str) -> Self {
        self.value(name, ModelNode::from(value))
    }

    pub fn boolean(self, name: &str, value: bool) -> Self {
        self.value(name, ModelNode::Boolean(value))
    }

    pub fn int(self, name: &str, value: i64) -> Self {
        self.value(name, ModelNode::Int(value))
    }

    /// Sets an unresolved `${...}` expression.
    pub fn expression(self, name: &str, value: &str) -> Self {
        self.value(name, ModelNode::Expression(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_resolve_under_base() {
        let base = Address::root().append("core-service", "management");
        let ops = OperationsBuilder::new(base.clone())
            .add(&[("ldap-connection", "corp")], |a| {
                a.string("url", "ldap://corp:389").int("port", 389)
            })
            .write_attribute(&[("access", "authorization")], "provider", "rbac")
            .build();

        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].kind, OperationKind::Add);
        assert_eq!(ops[0].address, base.append("ldap-connection", "corp"));
        assert_eq!(ops[0].get("port"), Some(&ModelNode::Int(389)));
        assert_eq!(ops[1].kind, OperationKind::WriteAttribute);
        assert_eq!(ops[1].get("provider").and_then(ModelNode::as_str), Some("rbac"));
    }

    #[test]
    fn test_attribute_order_preserved() {
        let ops = OperationsBuilder::new(Address::root())
            .add(&[("a", "b")], |a| {
                a.boolean("z", true).expression("y", "${x}").string("x", "1")
            })
            .build();
        let names: Vec<_> = ops[0].attributes.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["z", "y", "x"]);
    }
}
