//! History input: a lazy stream of JSON transactions.
//!
//! A history file holds one JSON [`Transaction`] object after another,
//! typically one per line. Objects are decoded on demand so arbitrarily long
//! histories are never held in memory.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde_json::de::IoRead;
use serde_json::StreamDeserializer;

use crate::edit::Transaction;
use crate::error::{DecapError, DecapResult};

/// Pull iterator over the transactions of a history stream.
///
/// Yields `Err` once for the first undecodable record and then stops.
pub struct HistoryReader<R: Read> {
    stream: StreamDeserializer<'static, IoRead<R>, Transaction>,
    /// Transactions decoded so far; names the failing record in errors.
    index: usize,
    failed: bool,
}

impl<R: Read> HistoryReader<R> {
    pub fn new(reader: R) -> Self {
        HistoryReader {
            stream: serde_json::Deserializer::from_reader(reader).into_iter::<Transaction>(),
            index: 0,
            failed: false,
        }
    }
}

impl HistoryReader<BufReader<File>> {
    /// Open a history file.
    pub fn open(path: &Path) -> DecapResult<Self> {
        let file = File::open(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => DecapError::file_not_found(path.display().to_string()),
            _ => DecapError::from(err),
        })?;
        tracing::debug!("reading history from {}", path.display());
        Ok(HistoryReader::new(BufReader::new(file)))
    }
}

impl<R: Read> Iterator for HistoryReader<R> {
    type Item = DecapResult<Transaction>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.stream.next()? {
            Ok(transaction) => {
                self.index += 1;
                Some(Ok(transaction))
            }
            Err(err) => {
                self.failed = true;
                if err.is_io() {
                    return Some(Err(DecapError::internal(format!(
                        "reading history: {}",
                        err
                    ))));
                }
                Some(Err(DecapError::malformed_history(format!(
                    "transaction #{}: {}",
                    self.index, err
                ))))
            }
        }
    }
}

/// Decode a complete in-memory history.
pub fn parse_history(input: &str) -> DecapResult<Vec<Transaction>> {
    HistoryReader::new(input.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::Edit;

    const TWO_LINES: &str = r#"{"revision_id": "r0", "edits": [{"edit": "add_node", "node": {"kind": "unit", "path": "A.java"}}]}
{"revision_id": "r1", "edits": [{"edit": "remove_node", "id": "A.java"}]}
"#;

    #[test]
    fn reads_line_delimited_transactions() {
        let transactions = parse_history(TWO_LINES).unwrap();
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[1].revision_id, "r1");
        assert_eq!(transactions[1].edits, vec![Edit::remove_node("A.java")]);
    }

    #[test]
    fn reads_concatenated_objects() {
        let input = r#"{"revision_id":"a"}{"revision_id":"b","edits":[]}"#;
        let ids: Vec<String> = parse_history(input)
            .unwrap()
            .into_iter()
            .map(|t| t.revision_id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn empty_input_is_empty_history() {
        assert!(parse_history("").unwrap().is_empty());
        assert!(parse_history("\n  \n").unwrap().is_empty());
    }

    #[test]
    fn malformed_record_names_its_position() {
        let input = format!("{}{{\"revision_id\": 7}}\n", TWO_LINES);
        let mut reader = HistoryReader::new(input.as_bytes());
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().unwrap().is_ok());
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, DecapError::MalformedHistory { .. }));
        assert!(err.to_string().contains("transaction #2"));
        assert!(reader.next().is_none());
    }

    #[test]
    fn unknown_edit_kind_is_malformed() {
        let input = r#"{"revision_id": "r0", "edits": [{"edit": "rename_node", "id": "A"}]}"#;
        let err = parse_history(input).unwrap_err();
        assert_eq!(err.error_code().code(), 4);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = HistoryReader::open(Path::new("/nonexistent/decap/history.jsonl"))
            .err()
            .unwrap();
        assert!(matches!(err, DecapError::FileNotFound { .. }));
    }
}
