//! Dependencies between schema objects.

mod resolver;

pub use resolver::DependencyResolver;

use crate::metadata::NodeId;

/// Which side of the relationship to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Objects the node depends on.
    DependsOn,
    /// Objects that depend on the node.
    DependedOnBy,
}

/// A dependency on (or of) another object, optionally narrowed to fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    target: NodeId,
    fields: Vec<String>,
}

impl Dependency {
    /// Whole-object dependency.
    pub fn new(target: NodeId) -> Self {
        Self {
            target,
            fields: Vec::new(),
        }
    }

    /// Dependency on specific fields.
    pub fn with_fields(target: NodeId, fields: Vec<String>) -> Self {
        Self { target, fields }
    }

    /// The other object.
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Field names in discovery order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Append a field.
    pub fn add_field(&mut self, field: impl Into<String>) {
        self.fields.push(field.into());
    }

    /// Fields joined with `", "`.
    pub fn field_list(&self) -> String {
        self.fields.join(", ")
    }
}
