//! Change notifications for metadata nodes.

use std::sync::Arc;

use super::NodeId;

/// Receives change notifications for the nodes it is subscribed to.
///
/// Delivery is synchronous and fire-and-forget; no ordering is guaranteed
/// between observers of the same node.
pub trait NodeObserver: Send + Sync {
    /// The node was renamed or its description was rewritten.
    fn node_changed(&self, node: NodeId);

    /// The node was dropped from the tree.
    fn node_removed(&self, _node: NodeId) {}
}

/// Handle returned by [`MetadataTree::subscribe`](super::MetadataTree::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

pub(crate) type ObserverList = Vec<(ObserverId, Arc<dyn NodeObserver>)>;
