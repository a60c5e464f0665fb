//! Line-delimited JSON datasets on top of an [`ObjectStore`].
//!
//! - Reads are lenient: a line that does not decode is logged and skipped.
//! - Writes are whole-object: the ordered records are encoded one per line and
//!   stored in a single `put`, replacing any previous object at the uri.
//! - Non-ASCII text is written literally, never `\u`-escaped.

use thiserror::Error;
use tracing::{debug, info, warn};

use batchinfer_core::{InputRecord, OutputRecord};

use crate::object_store::{ObjectStore, ObjectStoreError, ObjectUri};

/// Longest slice of a bad line echoed into the log.
const MAX_LOGGED_LINE: usize = 256;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error(transparent)]
    Store(#[from] ObjectStoreError),

    #[error("dataset {uri} is not valid UTF-8: {source}")]
    Encoding {
        uri: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("failed to encode record {record_id:?}: {source}")]
    Encode {
        record_id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Outcome of decoding one dataset body.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub records: Vec<InputRecord>,
    /// 1-based line numbers that failed to decode.
    pub skipped_lines: Vec<usize>,
}

/// Decode every non-blank line independently.
pub fn decode_lines(text: &str) -> Decoded {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = Vec::new();
    let mut skipped_lines = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_number = idx + 1;
        if line.trim().is_empty() {
            debug!(line_number, "skipping blank line");
            continue;
        }
        match serde_json::from_str::<InputRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(
                    line_number,
                    error = %e,
                    line = %truncate(line, MAX_LOGGED_LINE),
                    "failed to parse dataset line; skipping"
                );
                skipped_lines.push(line_number);
            }
        }
    }

    Decoded {
        records,
        skipped_lines,
    }
}

/// Encode records one per line, joined by `\n` with no trailing newline.
pub fn encode_lines(records: &[OutputRecord]) -> Result<String, DatasetError> {
    let mut lines = Vec::with_capacity(records.len());
    for record in records {
        let line = serde_json::to_string(record).map_err(|source| DatasetError::Encode {
            record_id: record.record_id.clone(),
            source,
        })?;
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Reads input datasets and writes output datasets through one store.
#[derive(Debug, Clone)]
pub struct DatasetIo<S> {
    store: S,
}

impl<S: ObjectStore> DatasetIo<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn read(&self, uri: &ObjectUri) -> Result<Vec<InputRecord>, DatasetError> {
        let body = self.store.get(uri)?;
        let text = String::from_utf8(body).map_err(|source| DatasetError::Encoding {
            uri: uri.to_string(),
            source,
        })?;

        let decoded = decode_lines(&text);
        info!(
            uri = %uri,
            records = decoded.records.len(),
            skipped = decoded.skipped_lines.len(),
            "dataset read"
        );
        Ok(decoded.records)
    }

    pub fn write(&self, records: &[OutputRecord], uri: &ObjectUri) -> Result<(), DatasetError> {
        let body = encode_lines(records)?;
        self.store.put(uri, body.as_bytes())?;
        info!(uri = %uri, records = records.len(), "dataset written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::object_store::InMemoryObjectStore;

    fn uri(s: &str) -> ObjectUri {
        ObjectUri::parse(s).unwrap()
    }

    #[test]
    fn malformed_line_is_skipped_and_neighbours_survive() {
        let text = concat!(
            r#"{"recordId":"a","modelInput":{"x":1}}"#,
            "\n",
            r#"{"recordId":"b","modelInput":"#,
            "\n",
            r#"{"recordId":"c","modelInput":{"x":3}}"#,
        );

        let decoded = decode_lines(text);

        let ids: Vec<_> = decoded.records.iter().map(|r| r.record_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(decoded.skipped_lines, vec![2]);
    }

    #[test]
    fn non_object_lines_are_skipped() {
        let decoded = decode_lines("42\n[1,2]\n{\"recordId\":\"z\",\"modelInput\":{\"k\":1}}");
        assert_eq!(decoded.records.len(), 1);
        assert_eq!(decoded.skipped_lines, vec![1, 2]);
    }

    #[test]
    fn numeric_record_id_and_null_input_still_decode() {
        let decoded = decode_lines("{\"recordId\":7,\"modelInput\":{\"k\":1}}\n{\"recordId\":\"n\",\"modelInput\":null}");

        assert!(decoded.skipped_lines.is_empty());
        assert_eq!(decoded.records[0].record_id, "7");
        assert_eq!(decoded.records[1].echo(), serde_json::Value::Null);
    }

    #[test]
    fn blank_lines_and_crlf_are_tolerated() {
        let text = "\u{feff}{\"recordId\":\"a\",\"modelInput\":{\"x\":1}}\r\n\r\n{\"recordId\":\"b\",\"modelInput\":{\"x\":2}}\r\n";
        let decoded = decode_lines(text);
        assert_eq!(decoded.records.len(), 2);
        assert!(decoded.skipped_lines.is_empty());
    }

    #[test]
    fn multibyte_text_is_written_literally() {
        let out = OutputRecord::success("t", json!({"text": "你好"}), json!({"text": "Привет"}));
        let body = encode_lines(&[out]).unwrap();
        assert!(body.contains("你好"));
        assert!(body.contains("Привет"));
        assert!(!body.contains("\\u"));
    }

    #[test]
    fn write_is_overwrite_idempotent() {
        let io = DatasetIo::new(InMemoryObjectStore::new());
        let target = uri("s3://b/out/a.jsonl.out");
        let two = vec![
            OutputRecord::success("1", json!({}), json!({})),
            OutputRecord::success("2", json!({}), json!({})),
        ];
        let one = vec![OutputRecord::success("3", json!({}), json!({}))];

        io.write(&two, &target).unwrap();
        io.write(&one, &target).unwrap();

        let text = io.store().text(&target).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains(r#""recordId":"3""#));
    }

    #[test]
    fn read_missing_object_is_an_error() {
        let io = DatasetIo::new(InMemoryObjectStore::new());
        let err = io.read(&uri("s3://b/in/missing.jsonl")).unwrap_err();
        assert!(matches!(err, DatasetError::Store(ObjectStoreError::NotFound(_))));
    }

    #[test]
    fn invalid_utf8_is_fatal_for_the_file() {
        let store = InMemoryObjectStore::new();
        let target = uri("s3://b/in/bad.jsonl");
        store.put(&target, &[0xff, 0xfe, b'\n']).unwrap();

        let err = DatasetIo::new(store).read(&target).unwrap_err();
        assert!(matches!(err, DatasetError::Encoding { .. }));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
