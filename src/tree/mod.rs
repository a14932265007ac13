pub mod predict;
pub mod text;
pub mod tree;
