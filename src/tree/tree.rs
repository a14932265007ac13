use crate::constants::{INDENT, MAX_DEPTH};
use crate::errors::CartError;
use crate::node::{DecisionNode, LeafNode, Node, Predicate};
use log::debug;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display};

/// A classification tree owning its root node.
#[derive(Clone, Debug, PartialEq)]
pub struct DecisionTree {
    root: Node,
}

/// Serialized form of a tree: nodes in breadth-first order, root first,
/// children referred to by position.
#[derive(Deserialize, Serialize)]
struct TreeData {
    nodes: Vec<FlatNode>,
}

#[derive(Deserialize, Serialize)]
enum FlatNode {
    Decision {
        data_count: usize,
        predicate: Predicate,
        children: Vec<usize>,
    },
    Leaf(LeafNode),
}

impl From<&DecisionTree> for TreeData {
    fn from(tree: &DecisionTree) -> Self {
        let mut order: Vec<&Node> = vec![tree.root()];
        let mut i = 0;
        while i < order.len() {
            let node = order[i];
            order.extend(node.children());
            i += 1;
        }
        let mut next_child = 1;
        let nodes = order
            .into_iter()
            .map(|node| match node {
                Node::Leaf(leaf) => FlatNode::Leaf(leaf.clone()),
                Node::Decision(d) => {
                    let n_children = d.children().len();
                    let children = (next_child..next_child + n_children).collect();
                    next_child += n_children;
                    FlatNode::Decision {
                        data_count: node.data_count(),
                        predicate: *d.predicate(),
                        children,
                    }
                }
            })
            .collect();
        TreeData { nodes }
    }
}

impl TryFrom<TreeData> for DecisionTree {
    type Error = CartError;

    /// Rebuild the nodes bottom-up. Children must come after their parent and
    /// be used exactly once.
    fn try_from(data: TreeData) -> Result<Self, Self::Error> {
        let n = data.nodes.len();
        if n == 0 {
            return Err(CartError::InvalidNode("tree without nodes".to_string()));
        }
        let mut built: Vec<Option<(Node, usize)>> = (0..n).map(|_| None).collect();
        for (i, flat) in data.nodes.into_iter().enumerate().rev() {
            let (node, height) = match flat {
                FlatNode::Leaf(leaf) => (Node::from(leaf), 0),
                FlatNode::Decision {
                    data_count,
                    predicate,
                    children,
                } => {
                    let mut nodes = Vec::with_capacity(children.len());
                    let mut height = 0;
                    for c in children {
                        let (child, child_height) = built
                            .get_mut(c)
                            .filter(|_| c > i)
                            .and_then(Option::take)
                            .ok_or_else(|| CartError::InvalidNode(format!("node {} has an invalid child {}", i, c)))?;
                        height = height.max(child_height + 1);
                        nodes.push(child);
                    }
                    if height > MAX_DEPTH {
                        return Err(CartError::InvalidNode(format!("tree deeper than {} levels", MAX_DEPTH)));
                    }
                    (DecisionNode::new(data_count, predicate, nodes)?.into(), height)
                }
            };
            built[i] = Some((node, height));
        }
        let (root, _) = built[0].take().ok_or_else(|| CartError::InvalidNode("missing root".to_string()))?;
        if built.iter().any(Option::is_some) {
            return Err(CartError::InvalidNode("nodes not reachable from the root".to_string()));
        }
        DecisionTree::new(root.into_root())
    }
}

impl Serialize for DecisionTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TreeData::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DecisionTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let data = TreeData::deserialize(deserializer)?;
        DecisionTree::try_from(data).map_err(serde::de::Error::custom)
    }
}

impl DecisionTree {
    /// Create a tree from a node that was flagged as root beforehand.
    pub fn new(root: Node) -> Result<Self, CartError> {
        if !root.is_root() {
            return Err(CartError::NotRoot);
        }
        root.validate()?;
        debug!(
            "Built tree with {} nodes, depth {}, {} data points at the root.",
            root.n_nodes(),
            root.depth(),
            root.data_count()
        );
        Ok(DecisionTree { root })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn n_nodes(&self) -> usize {
        self.root.n_nodes()
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn n_leaves(&self) -> usize {
        let mut n = 0;
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            if node.is_leaf() {
                n += 1;
            }
            stack.extend(node.children());
        }
        n
    }
}

impl Display for DecisionTree {
    /// One line per node in pre-order, indented by depth.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut print_buffer: Vec<(&Node, usize)> = vec![(&self.root, 0)];
        while let Some((node, depth)) = print_buffer.pop() {
            writeln!(f, "{}{}", INDENT.repeat(depth), node)?;
            print_buffer.extend(node.children().iter().rev().map(|c| (c, depth + 1)));
        }
        Ok(())
    }
}
