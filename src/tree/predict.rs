//! Tree Traversal
//!
//! Walking a feature vector down the tree, with a stopping rule on the
//! number of training data points seen by each node.
use super::tree::DecisionTree;
use crate::constants::LEAF_LEVEL;
use crate::data::FeatureVector;
use crate::errors::CartError;
use crate::node::Node;

fn count(node: &Node) -> i64 {
    i64::try_from(node.data_count()).unwrap_or(i64::MAX)
}

impl DecisionTree {
    /// Pass the feature vector through the tree and return the node it
    /// stopped at.
    ///
    /// Descends while the current node is a decision node holding more than
    /// `min_data` data points. If that overshoots to a node holding fewer than
    /// `min_data`, the parent is returned instead. The result holds at least
    /// `min_data` data points unless it is the root. Any `min_data` below zero
    /// walks down to a leaf.
    pub fn interpret_to_node<F: FeatureVector + ?Sized>(&self, fv: &F, min_data: i64) -> Result<&Node, CartError> {
        let mut current = self.root();
        let mut prev: Option<&Node> = None;

        while let Node::Decision(decision) = current {
            if count(current) <= min_data {
                break;
            }
            prev = Some(current);
            current = decision.next_node(fv)?;
        }

        // Usually we have gone one level too far.
        if count(current) < min_data {
            if let Some(p) = prev {
                current = p;
            }
        }

        debug_assert!(count(current) >= min_data || std::ptr::eq(current, self.root()));
        Ok(current)
    }

    /// Walk all the way down to a leaf.
    pub fn interpret_to_leaf<F: FeatureVector + ?Sized>(&self, fv: &F) -> Result<&Node, CartError> {
        self.interpret_to_node(fv, LEAF_LEVEL)
    }
}
