//! Errors
//!
//! Custom error types used throughout the `stringcart` crate.
use thiserror::Error;

/// Errors that can occur while reading, writing or evaluating a tree.
#[derive(Debug, Error)]
pub enum CartError {
    /// Malformed symbol-table header or tree body. `line` is 1-based.
    #[error("Format error on line {line}: {message}")]
    Format { line: usize, message: String },
    /// The node handed to a tree constructor is not flagged as root.
    #[error("Tried to set a non-root node as root of the tree.")]
    NotRoot,
    /// A node violates a structural constraint of the tree.
    #[error("Invalid node: {0}")]
    InvalidNode(String),
    /// A label cannot be stored in a symbol table.
    #[error("Invalid symbol table: {0}")]
    InvalidSymbol(String),
    /// The most probable symbol id has no entry in the symbol table.
    #[error("Predicted symbol id {symbol} is out of range for a symbol table of {n_symbols} labels.")]
    SymbolOutOfRange { symbol: usize, n_symbols: usize },
    /// Label resolution reached a leaf without any entries.
    #[error("Reached a leaf that holds no symbols.")]
    EmptyLeaf,
    /// A decision node needs a feature the vector does not provide.
    #[error("Feature number {0} is missing from the feature vector.")]
    MissingFeature(usize),
    /// A feature name is not part of the feature definition.
    #[error("Unknown feature {0}.")]
    UnknownFeature(String),
    /// A categorical value selects a child the node does not have.
    #[error("Feature number {feature} has value {value}, but the node only has {n_children} children.")]
    ChildOutOfRange {
        feature: usize,
        value: f64,
        n_children: usize,
    },
    /// Unable to write model.
    #[error("Unable to write model: {0}")]
    UnableToWrite(String),
    /// Unable to read model.
    #[error("Unable to read model: {0}")]
    UnableToRead(String),
}

impl CartError {
    pub(crate) fn format<S: Into<String>>(line: usize, message: S) -> Self {
        CartError::Format {
            line,
            message: message.into(),
        }
    }
}
