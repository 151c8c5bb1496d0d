use serde::Serialize;

use super::ConfigNode;

/// Configuration tree of a layer descriptor.
///
/// Nodes own their children. The link from a node to its parent is the parent's layer path, which
/// is resolved with [`ConfigTree::parent_of`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigTree {
    /// Top level nodes.
    pub roots: Vec<ConfigNode>,
}

impl ConfigTree {
    /// Creates a tree with the given top level nodes.
    pub fn new(roots: Vec<ConfigNode>) -> Self {
        Self { roots }
    }

    /// Node with the given path.
    pub fn find(&self, layer_path: &str) -> Option<&ConfigNode> {
        self.roots.iter().find_map(|root| root.find(layer_path))
    }

    /// Parent of the node with the given path.
    pub fn parent_of(&self, layer_path: &str) -> Option<&ConfigNode> {
        let parent_path = self.find(layer_path)?.common().parent_path.as_deref()?;
        self.find(parent_path)
    }

    /// All nodes in depth-first order.
    pub fn iter(&self) -> impl Iterator<Item = &ConfigNode> {
        let mut stack: Vec<&ConfigNode> = self.roots.iter().rev().collect();
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children().iter().rev());
            Some(node)
        })
    }

    /// Leaf nodes in depth-first order.
    pub fn leaves(&self) -> impl Iterator<Item = &ConfigNode> {
        self.iter().filter(|node| !node.is_group())
    }

    /// Whether every node is either processed or failed.
    pub fn is_settled(&self) -> bool {
        self.roots.iter().all(ConfigNode::is_settled)
    }
}
