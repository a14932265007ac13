use crate::constants::MAX_DEPTH;
use crate::data::FeatureVector;
use crate::errors::CartError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The test a decision node applies to one feature.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
pub enum Predicate {
    /// Two children: the first if the value is below the threshold, else the second.
    LessThan { feature: usize, threshold: f64 },
    /// Two children: the first if the categorical code equals `value`, else the second.
    Equals { feature: usize, value: u32 },
    /// One child per categorical code.
    OneOf { feature: usize },
}

impl Predicate {
    pub fn feature(&self) -> usize {
        match self {
            Predicate::LessThan { feature, .. } | Predicate::Equals { feature, .. } | Predicate::OneOf { feature } => {
                *feature
            }
        }
    }

    /// The number of children the predicate needs, `None` if any non-zero count works.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Predicate::LessThan { .. } | Predicate::Equals { .. } => Some(2),
            Predicate::OneOf { .. } => None,
        }
    }

    /// Pick the position of the child to descend into.
    pub fn select<F: FeatureVector + ?Sized>(&self, fv: &F, n_children: usize) -> Result<usize, CartError> {
        let feature = self.feature();
        let v = match fv.value(feature) {
            Some(v) if !v.is_nan() => v,
            _ => return Err(CartError::MissingFeature(feature)),
        };
        match self {
            Predicate::LessThan { threshold, .. } => Ok(if v < *threshold { 0 } else { 1 }),
            Predicate::Equals { value, .. } => Ok(if v == f64::from(*value) { 0 } else { 1 }),
            Predicate::OneOf { .. } => {
                if v < 0.0 || v.fract() != 0.0 || v >= n_children as f64 {
                    Err(CartError::ChildOutOfRange {
                        feature,
                        value: v,
                        n_children,
                    })
                } else {
                    Ok(v as usize)
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DecisionNode {
    data_count: usize,
    is_root: bool,
    predicate: Predicate,
    children: Vec<Node>,
}

/// Leaf holding parallel symbol ids and probabilities.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct LeafNode {
    data_count: usize,
    is_root: bool,
    indices: Vec<usize>,
    probabilities: Vec<f32>,
}

/// Trees are stored flat when serialized, see `DecisionTree`.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Decision(DecisionNode),
    Leaf(LeafNode),
}

impl DecisionNode {
    pub fn new(data_count: usize, predicate: Predicate, children: Vec<Node>) -> Result<Self, CartError> {
        let node = DecisionNode {
            data_count,
            is_root: false,
            predicate,
            children,
        };
        node.check_children()?;
        Ok(node)
    }

    fn check_children(&self) -> Result<(), CartError> {
        if self.children.is_empty() {
            return Err(CartError::InvalidNode("decision node without children".to_string()));
        }
        if let Some(n) = self.predicate.arity() {
            if self.children.len() != n {
                return Err(CartError::InvalidNode(format!(
                    "predicate {:?} needs {} children, found {}",
                    self.predicate,
                    n,
                    self.children.len()
                )));
            }
        }
        Ok(())
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Get the child selected by the feature vector.
    pub fn next_node<F: FeatureVector + ?Sized>(&self, fv: &F) -> Result<&Node, CartError> {
        let idx = self.predicate.select(fv, self.children.len())?;
        Ok(&self.children[idx])
    }
}

impl LeafNode {
    pub fn new(data_count: usize, indices: Vec<usize>, probabilities: Vec<f32>) -> Result<Self, CartError> {
        let leaf = LeafNode {
            data_count,
            is_root: false,
            indices,
            probabilities,
        };
        leaf.check_lengths()?;
        Ok(leaf)
    }

    fn check_lengths(&self) -> Result<(), CartError> {
        if self.indices.len() != self.probabilities.len() {
            return Err(CartError::InvalidNode(format!(
                "leaf has {} indices but {} probabilities",
                self.indices.len(),
                self.probabilities.len()
            )));
        }
        Ok(())
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn probabilities(&self) -> &[f32] {
        &self.probabilities
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The symbol id with the highest probability.
    ///
    /// Ties go to the first entry seen. Probabilities at or below zero never
    /// win, so a leaf without a positive probability yields its first id.
    /// `None` for an empty leaf.
    pub fn most_probable(&self) -> Option<usize> {
        let mut best = *self.indices.first()?;
        let mut max_prob = 0f32;
        for (idx, prob) in self.indices.iter().zip(self.probabilities.iter()) {
            if *prob > max_prob {
                max_prob = *prob;
                best = *idx;
            }
        }
        Some(best)
    }
}

impl Node {
    pub fn data_count(&self) -> usize {
        match self {
            Node::Decision(n) => n.data_count,
            Node::Leaf(n) => n.data_count,
        }
    }

    pub fn is_root(&self) -> bool {
        match self {
            Node::Decision(n) => n.is_root,
            Node::Leaf(n) => n.is_root,
        }
    }

    /// Flag this node as the root of a tree.
    pub fn set_is_root(&mut self, is_root: bool) {
        match self {
            Node::Decision(n) => n.is_root = is_root,
            Node::Leaf(n) => n.is_root = is_root,
        }
    }

    pub fn into_root(mut self) -> Self {
        self.set_is_root(true);
        self
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match self {
            Node::Leaf(n) => Some(n),
            Node::Decision(_) => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Decision(n) => &n.children,
            Node::Leaf(_) => &[],
        }
    }

    /// Number of nodes in the subtree, this node included.
    pub fn n_nodes(&self) -> usize {
        1 + self.children().iter().map(Node::n_nodes).sum::<usize>()
    }

    /// Number of edges on the longest path down to a leaf.
    pub fn depth(&self) -> usize {
        self.children().iter().map(|c| c.depth() + 1).max().unwrap_or(0)
    }

    /// Check the structural constraints of the whole subtree.
    ///
    /// No node below this one may be flagged as root, no child may hold
    /// more data than its parent, and no path may be longer than `MAX_DEPTH`.
    pub fn validate(&self) -> Result<(), CartError> {
        let mut stack: Vec<(&Node, usize)> = vec![(self, 0)];
        while let Some((node, depth)) = stack.pop() {
            if depth > MAX_DEPTH {
                return Err(CartError::InvalidNode(format!("tree deeper than {} levels", MAX_DEPTH)));
            }
            match node {
                Node::Decision(n) => n.check_children()?,
                Node::Leaf(n) => n.check_lengths()?,
            }
            for child in node.children() {
                if child.is_root() {
                    return Err(CartError::InvalidNode("only the top node may be flagged as root".to_string()));
                }
                if child.data_count() > node.data_count() {
                    return Err(CartError::InvalidNode(format!(
                        "child holds {} data points but its parent only {}",
                        child.data_count(),
                        node.data_count()
                    )));
                }
                stack.push((child, depth + 1));
            }
        }
        Ok(())
    }

    /// Write the one-line form of this node, without children or newline.
    pub(crate) fn write_line<W: fmt::Write>(&self, out: &mut W, feature_name: &str) -> fmt::Result {
        match self {
            Node::Leaf(leaf) => {
                write!(out, "leaf {}", leaf.data_count)?;
                for (idx, prob) in leaf.indices.iter().zip(leaf.probabilities.iter()) {
                    write!(out, " {}:{}", idx, prob)?;
                }
                Ok(())
            }
            Node::Decision(d) => match d.predicate {
                Predicate::LessThan { threshold, .. } => {
                    write!(out, "decision {} {} < {}", d.data_count, feature_name, threshold)
                }
                Predicate::Equals { value, .. } => write!(out, "decision {} {} == {}", d.data_count, feature_name, value),
                Predicate::OneOf { .. } => {
                    write!(out, "decision {} {} in {}", d.data_count, feature_name, d.children.len())
                }
            },
        }
    }
}

impl fmt::Display for Node {
    /// Features are written by number, as `f<number>`.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Node::Decision(d) => format!("f{}", d.predicate.feature()),
            Node::Leaf(_) => String::new(),
        };
        self.write_line(f, &name)
    }
}

impl From<DecisionNode> for Node {
    fn from(n: DecisionNode) -> Self {
        Node::Decision(n)
    }
}

impl From<LeafNode> for Node {
    fn from(n: LeafNode) -> Self {
        Node::Leaf(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(count: usize, indices: Vec<usize>, probabilities: Vec<f32>) -> Node {
        LeafNode::new(count, indices, probabilities).unwrap().into()
    }

    #[test]
    fn test_most_probable_strict_tie_break() {
        let l = LeafNode::new(3, vec![5, 2, 7], vec![0.3, 0.3, 0.9]).unwrap();
        assert_eq!(l.most_probable(), Some(7));
        let l = LeafNode::new(3, vec![5, 2, 7], vec![0.4, 0.4, 0.1]).unwrap();
        assert_eq!(l.most_probable(), Some(5));
    }

    #[test]
    fn test_most_probable_floor_fallback() {
        let l = LeafNode::new(3, vec![4, 1, 2], vec![0.0, 0.0, 0.0]).unwrap();
        assert_eq!(l.most_probable(), Some(4));
        let l = LeafNode::new(2, vec![8, 1], vec![-1.0, -0.5]).unwrap();
        assert_eq!(l.most_probable(), Some(8));
        let l = LeafNode::new(2, vec![8, 1], vec![f32::NAN, 0.2]).unwrap();
        assert_eq!(l.most_probable(), Some(1));
        let l = LeafNode::new(0, vec![], vec![]).unwrap();
        assert_eq!(l.most_probable(), None);
    }

    #[test]
    fn test_leaf_length_mismatch() {
        assert!(matches!(
            LeafNode::new(1, vec![0, 1], vec![1.0]),
            Err(CartError::InvalidNode(_))
        ));
    }

    #[test]
    fn test_decision_children_checked() {
        let p = Predicate::LessThan {
            feature: 0,
            threshold: 1.0,
        };
        assert!(DecisionNode::new(2, p, vec![]).is_err());
        assert!(DecisionNode::new(2, p, vec![leaf(1, vec![0], vec![1.0])]).is_err());
        let n = DecisionNode::new(4, Predicate::OneOf { feature: 0 }, vec![leaf(1, vec![0], vec![1.0])]).unwrap();
        assert_eq!(n.children().len(), 1);
    }

    #[test]
    fn test_predicate_select() {
        let lt = Predicate::LessThan {
            feature: 1,
            threshold: 2.5,
        };
        assert_eq!(lt.select(&vec![0.0, 1.0], 2).unwrap(), 0);
        assert_eq!(lt.select(&vec![0.0, 2.5], 2).unwrap(), 1);
        assert!(matches!(lt.select(&vec![0.0], 2), Err(CartError::MissingFeature(1))));
        assert!(matches!(lt.select(&vec![0.0, f64::NAN], 2), Err(CartError::MissingFeature(1))));

        let eq = Predicate::Equals { feature: 0, value: 3 };
        assert_eq!(eq.select(&vec![3.0], 2).unwrap(), 0);
        assert_eq!(eq.select(&vec![4.0], 2).unwrap(), 1);

        let one_of = Predicate::OneOf { feature: 0 };
        assert_eq!(one_of.select(&vec![2.0], 3).unwrap(), 2);
        assert!(matches!(one_of.select(&vec![3.0], 3), Err(CartError::ChildOutOfRange { .. })));
        assert!(matches!(one_of.select(&vec![-1.0], 3), Err(CartError::ChildOutOfRange { .. })));
        assert!(matches!(one_of.select(&vec![0.5], 3), Err(CartError::ChildOutOfRange { .. })));
    }

    #[test]
    fn test_display() {
        let p = Predicate::LessThan {
            feature: 3,
            threshold: 0.25,
        };
        let n: Node = DecisionNode::new(10, p, vec![leaf(4, vec![0, 2], vec![0.5, 0.5]), leaf(6, vec![1], vec![1.0])])
            .unwrap()
            .into();
        assert_eq!(n.to_string(), "decision 10 f3 < 0.25");
        assert_eq!(n.children()[0].to_string(), "leaf 4 0:0.5 2:0.5");
        let one_of: Node = DecisionNode::new(10, Predicate::OneOf { feature: 0 }, vec![leaf(1, vec![], vec![])])
            .unwrap()
            .into();
        assert_eq!(one_of.to_string(), "decision 10 f0 in 1");
    }

    #[test]
    fn test_validate_depth_limit() {
        let mut node = leaf(1, vec![0], vec![1.0]);
        for _ in 0..MAX_DEPTH {
            node = DecisionNode::new(1, Predicate::OneOf { feature: 0 }, vec![node]).unwrap().into();
        }
        assert!(node.validate().is_ok());
        let node: Node = DecisionNode::new(1, Predicate::OneOf { feature: 0 }, vec![node]).unwrap().into();
        assert!(matches!(node.validate(), Err(CartError::InvalidNode(_))));
    }

    #[test]
    fn test_validate() {
        let p = Predicate::Equals { feature: 0, value: 1 };
        let ok: Node = DecisionNode::new(10, p, vec![leaf(4, vec![0], vec![1.0]), leaf(6, vec![1], vec![1.0])])
            .unwrap()
            .into();
        assert!(ok.validate().is_ok());
        assert_eq!(ok.n_nodes(), 3);
        assert_eq!(ok.depth(), 1);

        let too_big: Node = DecisionNode::new(5, p, vec![leaf(4, vec![0], vec![1.0]), leaf(6, vec![1], vec![1.0])])
            .unwrap()
            .into();
        assert!(matches!(too_big.validate(), Err(CartError::InvalidNode(_))));

        let nested_root: Node = DecisionNode::new(
            10,
            p,
            vec![leaf(4, vec![0], vec![1.0]).into_root(), leaf(6, vec![1], vec![1.0])],
        )
        .unwrap()
        .into();
        assert!(matches!(nested_root.validate(), Err(CartError::InvalidNode(_))));
    }
}
