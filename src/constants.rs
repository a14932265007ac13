pub const ENC_LINE_START: &str = ";;target={";
pub const ENC_LINE_END: &str = "}\n";
/// Minimum-data sentinel below every valid data count: traversal always reaches a leaf.
pub const LEAF_LEVEL: i64 = -1;
pub const INDENT: &str = "  ";
/// Deepest tree accepted from any source, in edges below the root.
pub const MAX_DEPTH: usize = 256;
