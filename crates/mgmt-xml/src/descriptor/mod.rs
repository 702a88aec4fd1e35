//! Attribute descriptors and the registry that holds them.

mod attribute;
mod registry;

pub use attribute::{AttributeDescriptor, ValueKind};
pub use registry::{DescriptorRegistry, ResourceDescriptor, ResourceKind};
