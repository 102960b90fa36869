//! Six face quadtrees over a slotmap arena.
//!
//! Nodes reference each other through [`NodeId`] handles, so the scheduler and
//! patches can name nodes without borrowing the tree.

pub mod key;
pub mod node;
pub mod tree;
pub(crate) mod traversal;

pub use key::NodeKey;
pub use node::QuadTreeNode;
pub use tree::QuadTree;

slotmap::new_key_type! {
  /// Handle of a node in a [`QuadTree`].
  pub struct NodeId;
}
