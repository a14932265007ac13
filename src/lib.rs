// Modules
pub mod config;
pub mod constants;
pub mod data;
pub mod errors;
pub mod node;
pub mod string_tree;
pub mod symbols;
pub mod tree;

// Individual classes, and functions
pub use config::{CartIO, InconsistencyPolicy, PredictionConfig};
pub use data::{FeatureDefinition, FeatureVector};
pub use errors::CartError;
pub use node::{DecisionNode, LeafNode, Node, Predicate};
pub use string_tree::{Resolution, StringPredictionTree};
pub use symbols::SymbolTable;
pub use tree::tree::DecisionTree;
