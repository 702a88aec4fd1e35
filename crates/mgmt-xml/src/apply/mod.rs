//! Operation replay.
//!
//! Builds the model tree an operation list describes, with the same
//! existence rules a running server enforces:
//! - `add` needs an existing (or built-in) parent and a free address
//! - `write-attribute` needs an existing (or built-in) target and exactly
//!   one attribute
//!
//! A resource at `a=b/c=d` lives at `root["a"]["b"]["c"]["d"]`, next to the
//! attributes of its parent.

use std::sync::Arc;

use log::trace;

use crate::descriptor::DescriptorRegistry;
use crate::error::ApplyError;
use crate::model::{Address, ModelNode, Operation, OperationKind};

/// Replays operation lists into model trees.
#[derive(Debug, Clone)]
pub struct ModelApplier {
    registry: Arc<DescriptorRegistry>,
}

impl ModelApplier {
    pub fn new(registry: Arc<DescriptorRegistry>) -> Self {
        Self { registry }
    }

    /// Applies `ops` to an empty tree.
    pub fn apply(&self, ops: &[Operation]) -> Result<ModelNode, ApplyError> {
        let mut root = ModelNode::object();
        self.apply_to(&mut root, ops)?;
        Ok(root)
    }

    /// Applies `ops` to an existing tree, in order. On error the tree keeps
    /// the operations applied before the failing one.
    pub fn apply_to(&self, root: &mut ModelNode, ops: &[Operation]) -> Result<(), ApplyError> {
        for op in ops {
            trace!("apply {op}");
            match op.kind {
                OperationKind::Add => self.add(root, op)?,
                OperationKind::WriteAttribute => self.write(root, op)?,
            }
        }
        Ok(())
    }

    fn add(&self, root: &mut ModelNode, op: &Operation) -> Result<(), ApplyError> {
        let address = &op.address;
        if address.is_empty() || exists(root, address) {
            return Err(ApplyError::DuplicateResource {
                address: address.clone(),
            });
        }
        let parent = address.parent();
        if !exists(root, &parent) && !self.registry.is_builtin(&parent) {
            return Err(ApplyError::NoSuchParent {
                address: address.clone(),
            });
        }
        let node = resource_mut(root, address);
        *node = ModelNode::object();
        for (name, value) in &op.attributes {
            node.set(name.as_str(), value.clone());
        }
        Ok(())
    }

    fn write(&self, root: &mut ModelNode, op: &Operation) -> Result<(), ApplyError> {
        let address = &op.address;
        let Some((name, value)) = op.attributes.first().filter(|_| op.attributes.len() == 1)
        else {
            return Err(ApplyError::MalformedWrite {
                address: address.clone(),
                count: op.attributes.len(),
            });
        };
        if !exists(root, address) && !self.registry.is_builtin(address) {
            return Err(ApplyError::NoSuchResource {
                address: address.clone(),
            });
        }
        resource_mut(root, address).set(name.as_str(), value.clone());
        Ok(())
    }
}

fn keys(address: &Address) -> Vec<&str> {
    address.pairs().into_iter().flat_map(|(k, v)| [k, v]).collect()
}

fn exists(root: &ModelNode, address: &Address) -> bool {
    root.get_path(&keys(address)).is_some_and(ModelNode::is_defined)
}

/// Returns the node for `address`, creating empty objects along the way.
fn resource_mut<'a>(root: &'a mut ModelNode, address: &Address) -> &'a mut ModelNode {
    let node = keys(address)
        .into_iter()
        .fold(root, |node, key| node.get_mut_or_insert(key));
    if !node.is_defined() {
        *node = ModelNode::object();
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OperationsBuilder;

    fn applier() -> ModelApplier {
        ModelApplier::new(Arc::new(DescriptorRegistry::standard()))
    }

    fn management() -> Address {
        Address::root().append("core-service", "management")
    }

    #[test]
    fn test_add_builds_nested_tree() {
        let ops = OperationsBuilder::new(management())
            .add(&[("security-realm", "R")], |a| a)
            .add(&[("security-realm", "R"), ("authentication", "local")], |a| {
                a.string("default-user", "$local")
            })
            .build();
        let tree = applier().apply(&ops).unwrap();
        let realm = tree
            .get_path(&["core-service", "management", "security-realm", "R"])
            .unwrap();
        assert_eq!(
            realm.get_path(&["authentication", "local", "default-user"]),
            Some(&ModelNode::from("$local"))
        );
    }

    #[test]
    fn test_add_without_attributes_creates_resource() {
        let ops = OperationsBuilder::new(management())
            .add(&[("security-realm", "R")], |a| a)
            .build();
        let tree = applier().apply(&ops).unwrap();
        let realm = tree.get_path(&["core-service", "management", "security-realm", "R"]);
        assert_eq!(realm, Some(&ModelNode::object()));
    }

    #[test]
    fn test_duplicate_add() {
        let ops = OperationsBuilder::new(management())
            .add(&[("ldap-connection", "c")], |a| a.string("url", "ldap://a"))
            .add(&[("ldap-connection", "c")], |a| a.string("url", "ldap://b"))
            .build();
        assert!(matches!(
            applier().apply(&ops),
            Err(ApplyError::DuplicateResource { .. })
        ));
    }

    #[test]
    fn test_add_needs_parent() {
        let ops = OperationsBuilder::new(management())
            .add(&[("security-realm", "R"), ("authentication", "local")], |a| a)
            .build();
        assert!(matches!(
            applier().apply(&ops),
            Err(ApplyError::NoSuchParent { .. })
        ));
    }

    #[test]
    fn test_write_to_builtin_resource() {
        let ops = OperationsBuilder::new(management())
            .write_attribute(&[("access", "authorization")], "provider", "rbac")
            .write_attribute(
                &[
                    ("access", "authorization"),
                    ("constraint", "application-classification"),
                    ("type", "naming"),
                    ("classification", "jndi-view"),
                ],
                "configured-application",
                true,
            )
            .build();
        let tree = applier().apply(&ops).unwrap();
        let authorization = tree
            .get_path(&["core-service", "management", "access", "authorization"])
            .unwrap();
        assert_eq!(authorization.get("provider"), Some(&ModelNode::from("rbac")));
        assert_eq!(
            authorization.get_path(&[
                "constraint",
                "application-classification",
                "type",
                "naming",
                "classification",
                "jndi-view",
                "configured-application"
            ]),
            Some(&ModelNode::Boolean(true))
        );
    }

    #[test]
    fn test_write_requires_resource() {
        let ops = OperationsBuilder::new(management())
            .write_attribute(&[("security-realm", "missing")], "x", "y")
            .build();
        assert!(matches!(
            applier().apply(&ops),
            Err(ApplyError::NoSuchResource { .. })
        ));
    }

    #[test]
    fn test_malformed_write() {
        let mut op = Operation::write_attribute(management(), "a", "b");
        op.set("c", "d");
        assert_eq!(
            applier().apply(&[op]),
            Err(ApplyError::MalformedWrite {
                address: management(),
                count: 2
            })
        );
    }
}
