//! Symbol Table
//!
//! Maps the symbol ids stored at the leaves to label strings, and reads and
//! writes the header line carrying that mapping:
//!
//! ```text
//! ;;target={0:'label_a',1:'label_b',2:'label_c'}
//! ```
//!
//! The numbers in the header are ignored on read. The i-th label gets id `i`.
use crate::constants::{ENC_LINE_END, ENC_LINE_START};
use crate::errors::CartError;
use serde::{Deserialize, Serialize};
use std::fmt;

const QUOTE: char = '\'';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct SymbolTable {
    labels: Vec<String>,
}

impl SymbolTable {
    /// Labels may not contain an apostrophe or a line break; the header has no
    /// way to escape them.
    pub fn new(labels: Vec<String>) -> Result<Self, CartError> {
        if labels.is_empty() {
            return Err(CartError::InvalidSymbol("a symbol table needs at least one label".to_string()));
        }
        if let Some(bad) = labels.iter().find(|l| l.contains(QUOTE) || l.contains(['\n', '\r'])) {
            return Err(CartError::InvalidSymbol(format!("label {:?} cannot be encoded", bad)));
        }
        Ok(SymbolTable { labels })
    }

    pub fn from_labels(labels: &[&str]) -> Result<Self, CartError> {
        Self::new(labels.iter().map(|l| l.to_string()).collect())
    }

    /// Parse a header line. `line_number` is used for error reporting only.
    pub fn parse_header(line: &str, line_number: usize) -> Result<Self, CartError> {
        let line = line.trim_end_matches(['\n', '\r']);
        let rest = line
            .strip_prefix(ENC_LINE_START)
            .ok_or_else(|| CartError::format(line_number, "missing symbol-table header"))?;
        let invalid = || CartError::format(line_number, "invalid symbol-table encoding");

        // Drop the leading `<id>:'` of the first entry.
        let (first_id, body) = rest.split_once(QUOTE).ok_or_else(invalid)?;
        if !is_id_prefix(first_id) {
            return Err(invalid());
        }

        // Alternating label and delimiter: `,<id>:` between entries, `}` at the end.
        let pieces: Vec<&str> = body.split(QUOTE).collect();
        if pieces.len() % 2 != 0 {
            return Err(invalid());
        }
        let n = pieces.len() / 2;
        let mut labels = Vec::with_capacity(n);
        for (i, pair) in pieces.chunks(2).enumerate() {
            let delimiter = pair[1];
            let valid = if i + 1 == n {
                delimiter == "}"
            } else {
                delimiter.strip_prefix(',').map_or(false, is_id_prefix)
            };
            if !valid {
                return Err(invalid());
            }
            labels.push(pair[0].to_string());
        }
        Ok(SymbolTable { labels })
    }

    /// Read the header from the first lines of a stream. One blank line is
    /// allowed before it. Returns the table and the position of the first line
    /// after the header.
    pub fn read_header(lines: &[&str]) -> Result<(Self, usize), CartError> {
        let mut cursor = 0;
        if lines.first().map_or(false, |l| l.trim_end_matches('\r').is_empty()) {
            cursor += 1;
        }
        let line = lines
            .get(cursor)
            .ok_or_else(|| CartError::format(cursor + 1, "missing symbol-table header"))?;
        let table = Self::parse_header(line, cursor + 1)?;
        Ok((table, cursor + 1))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, symbol: usize) -> Option<&str> {
        self.labels.get(symbol).map(String::as_str)
    }

    /// Position of a label, the first one if it appears twice.
    pub fn symbol_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// `<digits>:`
fn is_id_prefix(s: &str) -> bool {
    match s.strip_suffix(':') {
        Some(digits) => !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

impl fmt::Display for SymbolTable {
    /// The header line, ids renumbered from zero, newline included.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(ENC_LINE_START)?;
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:'{}'", i, label)?;
        }
        f.write_str(ENC_LINE_END)
    }
}

impl TryFrom<Vec<String>> for SymbolTable {
    type Error = CartError;

    fn try_from(labels: Vec<String>) -> Result<Self, Self::Error> {
        SymbolTable::new(labels)
    }
}

impl From<SymbolTable> for Vec<String> {
    fn from(table: SymbolTable) -> Self {
        table.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format_error(r: Result<SymbolTable, CartError>) -> bool {
        matches!(r, Err(CartError::Format { .. }))
    }

    #[test]
    fn test_parse_header() {
        let table = SymbolTable::parse_header(";;target={0:'a',1:'b',2:'c'}\n", 1).unwrap();
        assert_eq!(table.labels(), &["a", "b", "c"]);
        assert_eq!(table.get(1), Some("b"));
        assert_eq!(table.get(3), None);
        assert_eq!(table.symbol_of("c"), Some(2));
    }

    #[test]
    fn test_parse_header_ignores_ids() {
        let table = SymbolTable::parse_header(";;target={99:'x',3:'y'}", 1).unwrap();
        assert_eq!(table.labels(), &["x", "y"]);
    }

    #[test]
    fn test_parse_header_odd_labels() {
        let table = SymbolTable::parse_header(";;target={0:'',1:'a b',2:'}',3:',1:'}", 1).unwrap();
        assert_eq!(table.labels(), &["", "a b", "}", ",1:"]);
        let table = SymbolTable::parse_header(";;target={0:'_'}\r", 1).unwrap();
        assert_eq!(table.labels(), &["_"]);
    }

    #[test]
    fn test_parse_header_errors() {
        assert!(format_error(SymbolTable::parse_header(";;target={0:'a',1:'b'", 1)));
        assert!(format_error(SymbolTable::parse_header(";;target={0:'a',1:'b'}x", 1)));
        assert!(format_error(SymbolTable::parse_header(";;target={0:'it's',1:'b'}", 1)));
        assert!(format_error(SymbolTable::parse_header(";;target={0:'a';1:'b'}", 1)));
        assert!(format_error(SymbolTable::parse_header(";;target={0:'a',x:'b'}", 1)));
        assert!(format_error(SymbolTable::parse_header(";;target={:'a'}", 1)));
        assert!(format_error(SymbolTable::parse_header(";;target={}", 1)));
        assert!(format_error(SymbolTable::parse_header(";;target={0:'a'},1:'b'}", 1)));
        match SymbolTable::parse_header("decision 3 a < 1", 7) {
            Err(CartError::Format { line, message }) => {
                assert_eq!(line, 7);
                assert_eq!(message, "missing symbol-table header");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_read_header_blank_line() {
        let (table, next) = SymbolTable::read_header(&["", ";;target={0:'a'}", "leaf 1 0:1"]).unwrap();
        assert_eq!(table.labels(), &["a"]);
        assert_eq!(next, 2);
        let (_, next) = SymbolTable::read_header(&[";;target={0:'a'}"]).unwrap();
        assert_eq!(next, 1);
        assert!(SymbolTable::read_header(&["", "", ";;target={0:'a'}"]).is_err());
        assert!(SymbolTable::read_header(&[""]).is_err());
        assert!(SymbolTable::read_header(&[]).is_err());
    }

    #[test]
    fn test_display_renumbers() {
        let table = SymbolTable::parse_header(";;target={99:'x',3:'y',7:'z'}", 1).unwrap();
        assert_eq!(table.to_string(), ";;target={0:'x',1:'y',2:'z'}\n");
        let again = SymbolTable::parse_header(&table.to_string(), 1).unwrap();
        assert_eq!(again, table);
    }

    #[test]
    fn test_new_rejects_unencodable_labels() {
        assert!(matches!(SymbolTable::from_labels(&["it's"]), Err(CartError::InvalidSymbol(_))));
        assert!(matches!(SymbolTable::from_labels(&["a\nb"]), Err(CartError::InvalidSymbol(_))));
        assert!(matches!(SymbolTable::from_labels(&[]), Err(CartError::InvalidSymbol(_))));
        assert!(serde_json::from_str::<SymbolTable>(r#"["ok","it's"]"#).is_err());
        let table: SymbolTable = serde_json::from_str(r#"["H-H%","L-L%"]"#).unwrap();
        assert_eq!(table.len(), 2);
    }
}
