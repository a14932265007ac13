//! String Prediction Tree
//!
//! A classification tree whose leaves hold symbol ids, together with the
//! symbol table that turns the ids into labels. The text form is the symbol
//! table header followed by the tree body.
use crate::config::{CartIO, InconsistencyPolicy, PredictionConfig};
use crate::data::{FeatureDefinition, FeatureVector};
use crate::errors::CartError;
use crate::node::Node;
use crate::symbols::SymbolTable;
use crate::tree::text::{read_tree, write_node, BodyLines};
use crate::tree::tree::DecisionTree;
use log::{debug, error, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::{BufRead, Read};
use std::path::Path;

/// Outcome of resolving the most probable label for a feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    Label(&'a str),
    /// The leaf predicted a symbol id the symbol table has no label for.
    Inconsistent { symbol: usize, n_symbols: usize },
}

impl<'a> Resolution<'a> {
    pub fn label(&self) -> Option<&'a str> {
        match self {
            Resolution::Label(label) => Some(*label),
            Resolution::Inconsistent { .. } => None,
        }
    }

    pub fn into_result(self) -> Result<&'a str, CartError> {
        match self {
            Resolution::Label(label) => Ok(label),
            Resolution::Inconsistent { symbol, n_symbols } => Err(CartError::SymbolOutOfRange { symbol, n_symbols }),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(try_from = "StringPredictionTreeData")]
pub struct StringPredictionTree {
    tree: DecisionTree,
    features: FeatureDefinition,
    symbols: SymbolTable,
}

#[derive(Deserialize)]
struct StringPredictionTreeData {
    tree: DecisionTree,
    features: FeatureDefinition,
    symbols: SymbolTable,
}

impl TryFrom<StringPredictionTreeData> for StringPredictionTree {
    type Error = CartError;

    fn try_from(data: StringPredictionTreeData) -> Result<Self, Self::Error> {
        StringPredictionTree::from_parts(data.tree, data.features, data.symbols)
    }
}

impl CartIO for StringPredictionTree {}

impl StringPredictionTree {
    /// * `root` - The root node, flagged as root beforehand.
    /// * `features` - The features the decision nodes refer to.
    /// * `symbols` - Labels for the symbol ids at the leaves.
    pub fn new(root: Node, features: FeatureDefinition, symbols: SymbolTable) -> Result<Self, CartError> {
        Self::from_parts(DecisionTree::new(root)?, features, symbols)
    }

    pub fn from_parts(tree: DecisionTree, features: FeatureDefinition, symbols: SymbolTable) -> Result<Self, CartError> {
        let mut max_symbol = None;
        let mut stack = vec![tree.root()];
        while let Some(node) = stack.pop() {
            match node {
                Node::Decision(d) => {
                    let feature = d.predicate().feature();
                    if feature >= features.len() {
                        return Err(CartError::InvalidNode(format!(
                            "feature number {} is not part of a definition with {} features",
                            feature,
                            features.len()
                        )));
                    }
                }
                Node::Leaf(l) => max_symbol = max_symbol.max(l.indices().iter().max().copied()),
            }
            stack.extend(node.children());
        }
        if let Some(max_symbol) = max_symbol.filter(|s| *s >= symbols.len()) {
            warn!(
                "Leaves refer to symbol id {}, but the symbol table only has {} labels.",
                max_symbol,
                symbols.len()
            );
        }
        debug!(
            "Built string prediction tree with {} labels and {} nodes.",
            symbols.len(),
            tree.n_nodes()
        );
        Ok(StringPredictionTree {
            tree,
            features,
            symbols,
        })
    }

    /// Read a tree from its text form: the symbol table header (optionally
    /// preceded by one blank line) followed by the tree body.
    pub fn from_text(text: &str, features: &FeatureDefinition) -> Result<Self, CartError> {
        let lines: Vec<&str> = text.lines().collect();
        let (symbols, next) = SymbolTable::read_header(&lines)?;
        let root = read_tree(BodyLines::new(&lines[next..], next + 1), features)?;
        Self::new(root, features.clone(), symbols)
    }

    /// Read the text form from a stream. Bytes that are not UTF-8 are a
    /// format error on the line they occur in.
    pub fn from_reader<R: BufRead>(mut reader: R, features: &FeatureDefinition) -> Result<Self, CartError> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| CartError::UnableToRead(e.to_string()))?;
        Self::from_text(&decode_text(bytes)?, features)
    }

    pub fn load_text<P: AsRef<Path>>(path: P, features: &FeatureDefinition) -> Result<Self, CartError> {
        let bytes = fs::read(path).map_err(|e| CartError::UnableToRead(e.to_string()))?;
        Self::from_text(&decode_text(bytes)?, features)
    }

    pub fn save_text<P: AsRef<Path>>(&self, path: P) -> Result<(), CartError> {
        fs::write(path, self.to_string()).map_err(|e| CartError::UnableToWrite(e.to_string()))
    }

    pub fn tree(&self) -> &DecisionTree {
        &self.tree
    }

    pub fn features(&self) -> &FeatureDefinition {
        &self.features
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Walk the tree with the configured minimum number of data points.
    pub fn interpret<F: FeatureVector + ?Sized>(&self, fv: &F, config: &PredictionConfig) -> Result<&Node, CartError> {
        self.tree.interpret_to_node(fv, config.min_data)
    }

    /// The id of the most probable symbol at the leaf the feature vector reaches.
    pub fn most_probable_symbol<F: FeatureVector + ?Sized>(&self, fv: &F) -> Result<usize, CartError> {
        let node = self.tree.interpret_to_leaf(fv)?;
        let leaf = node
            .as_leaf()
            .ok_or_else(|| CartError::InvalidNode("traversal stopped above the leaves".to_string()))?;
        leaf.most_probable().ok_or(CartError::EmptyLeaf)
    }

    pub fn resolve<F: FeatureVector + ?Sized>(&self, fv: &F) -> Result<Resolution<'_>, CartError> {
        let symbol = self.most_probable_symbol(fv)?;
        Ok(match self.symbols.get(symbol) {
            Some(label) => Resolution::Label(label),
            None => Resolution::Inconsistent {
                symbol,
                n_symbols: self.symbols.len(),
            },
        })
    }

    /// The most probable label, with a symbol id outside the symbol table
    /// handled as `config.on_inconsistency` says.
    pub fn most_probable_string<F: FeatureVector + ?Sized>(
        &self,
        fv: &F,
        config: &PredictionConfig,
    ) -> Result<Option<&str>, CartError> {
        match self.resolve(fv)? {
            Resolution::Label(label) => Ok(Some(label)),
            Resolution::Inconsistent { symbol, n_symbols } => match config.on_inconsistency {
                InconsistencyPolicy::Fail => Err(CartError::SymbolOutOfRange { symbol, n_symbols }),
                InconsistencyPolicy::Log => {
                    error!(
                        "Most probable symbol id {} is bigger than the biggest id {} ('{}') of the symbol table.",
                        symbol,
                        n_symbols - 1,
                        self.symbols.get(n_symbols - 1).unwrap_or_default()
                    );
                    Ok(None)
                }
            },
        }
    }

    fn predict_single_threaded<F: FeatureVector>(
        &self,
        fvs: &[F],
        config: &PredictionConfig,
    ) -> Vec<Result<Option<&str>, CartError>> {
        fvs.iter().map(|fv| self.most_probable_string(fv, config)).collect()
    }

    fn predict_parallel<F: FeatureVector + Sync>(
        &self,
        fvs: &[F],
        config: &PredictionConfig,
    ) -> Vec<Result<Option<&str>, CartError>> {
        fvs.par_iter().map(|fv| self.most_probable_string(fv, config)).collect()
    }

    /// Most probable labels for many feature vectors, in input order.
    pub fn predict_batch<F: FeatureVector + Sync>(
        &self,
        fvs: &[F],
        parallel: bool,
        config: &PredictionConfig,
    ) -> Vec<Result<Option<&str>, CartError>> {
        if parallel {
            self.predict_parallel(fvs, config)
        } else {
            self.predict_single_threaded(fvs, config)
        }
    }
}

fn decode_text(bytes: Vec<u8>) -> Result<String, CartError> {
    String::from_utf8(bytes).map_err(|e| {
        let valid = e.utf8_error().valid_up_to();
        let line = e.as_bytes()[..valid].iter().filter(|b| **b == b'\n').count() + 1;
        CartError::format(line, format!("invalid UTF-8 after byte {}", valid))
    })
}

impl fmt::Display for StringPredictionTree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbols)?;
        write_node(f, self.tree.root(), &self.features, 0)
    }
}
