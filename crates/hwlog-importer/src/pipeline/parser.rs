//! Streaming delimited-text parser
//!
//! Turns the source byte stream into one header event, a sequence of row
//! events, and an end event. The header transform unconditionally renames
//! position 0 to [`TIME_COLUMN`]; the discard window consumes a configured
//! number of lines right after the header without ever delivering them.

use csv_async::{AsyncReader, AsyncReaderBuilder, StringRecord};
use hwlog_common::{ImportError, Result};
use tokio::io::AsyncRead;
use tracing::trace;

/// Canonical name for the first column, whatever the file calls it.
pub const TIME_COLUMN: &str = "time";

/// One parsed data line, field-aligned to the session's header set.
pub type RawRow = Vec<String>;

/// Incremental CSV reader over an async byte stream.
pub struct CsvRowStream<R: AsyncRead + Unpin + Send> {
    reader: AsyncReader<R>,
    discard_remaining: usize,
    rows_delivered: u64,
}

impl<R: AsyncRead + Unpin + Send> CsvRowStream<R> {
    /// Wrap a byte stream; `discard_rows` lines after the header are
    /// consumed but never surfaced as row events.
    pub fn new(reader: R, discard_rows: usize) -> Self {
        let reader = AsyncReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .buffer_capacity(1 << 20)
            .create_reader(reader);

        Self {
            reader,
            discard_remaining: discard_rows,
            rows_delivered: 0,
        }
    }

    /// The header event: first line, with the transform applied.
    ///
    /// Must be called before [`next_row`](Self::next_row).
    pub async fn headers(&mut self) -> Result<Vec<String>> {
        let raw = self
            .reader
            .headers()
            .await
            .map_err(|e| ImportError::parse(0, format!("header line unreadable: {e}")))?;

        if raw.is_empty() {
            return Err(ImportError::parse(0, "input contains no header row"));
        }

        Ok(canonical_headers(raw))
    }

    /// The next row event, or `None` at the end event.
    ///
    /// Field-count mismatches abort the stream with a parse error carrying
    /// the number of rows delivered so far.
    pub async fn next_row(&mut self) -> Result<Option<RawRow>> {
        let mut record = StringRecord::new();

        loop {
            let has_record = self
                .reader
                .read_record(&mut record)
                .await
                .map_err(|e| ImportError::parse(self.rows_delivered, e.to_string()))?;

            if !has_record {
                return Ok(None);
            }

            if self.discard_remaining > 0 {
                self.discard_remaining -= 1;
                trace!(line = ?record.position().map(|p| p.line()), "Discarding post-header line");
                continue;
            }

            self.rows_delivered += 1;
            return Ok(Some(record.iter().map(str::to_string).collect()));
        }
    }

    /// Data rows delivered so far (discard-window lines excluded).
    pub fn rows_delivered(&self) -> u64 {
        self.rows_delivered
    }
}

/// Header transform: position 0 becomes [`TIME_COLUMN`], the rest pass
/// through unchanged.
pub fn canonical_headers(raw: &StringRecord) -> Vec<String> {
    raw.iter()
        .enumerate()
        .map(|(i, name)| {
            if i == 0 {
                TIME_COLUMN.to_string()
            } else {
                name.to_string()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(input: &'static str, discard: usize) -> CsvRowStream<&'static [u8]> {
        CsvRowStream::new(input.as_bytes(), discard)
    }

    #[tokio::test]
    async fn test_header_transform_renames_position_zero() {
        let mut rows = stream("timestamp,voltage,current\n", 0);
        let headers = rows.headers().await.unwrap();
        assert_eq!(headers, vec!["time", "voltage", "current"]);
    }

    #[tokio::test]
    async fn test_header_transform_is_unconditional() {
        // Even a first column already called "time", or something else
        // entirely, maps to the canonical name
        let mut rows = stream("anything_at_all,b\n", 0);
        assert_eq!(rows.headers().await.unwrap(), vec!["time", "b"]);
    }

    #[tokio::test]
    async fn test_rows_follow_headers() {
        let mut rows = stream("ts,v\n1,2\n3,4\n", 0);
        rows.headers().await.unwrap();

        assert_eq!(rows.next_row().await.unwrap(), Some(vec!["1".into(), "2".into()]));
        assert_eq!(rows.next_row().await.unwrap(), Some(vec!["3".into(), "4".into()]));
        assert_eq!(rows.next_row().await.unwrap(), None);
        assert_eq!(rows.rows_delivered(), 2);
    }

    #[tokio::test]
    async fn test_discard_window_drops_lines_after_header() {
        // The units line under the header is consumed but never delivered
        let mut rows = stream("ts,v\ns,volts\n1,2\n", 1);
        rows.headers().await.unwrap();

        assert_eq!(rows.next_row().await.unwrap(), Some(vec!["1".into(), "2".into()]));
        assert_eq!(rows.next_row().await.unwrap(), None);
        assert_eq!(rows.rows_delivered(), 1);
    }

    #[tokio::test]
    async fn test_discard_window_can_exceed_input() {
        let mut rows = stream("ts,v\n1,2\n", 5);
        rows.headers().await.unwrap();
        assert_eq!(rows.next_row().await.unwrap(), None);
        assert_eq!(rows.rows_delivered(), 0);
    }

    #[tokio::test]
    async fn test_field_count_mismatch_is_parse_error() {
        let mut rows = stream("ts,v\n1,2\n1,2,3\n", 0);
        rows.headers().await.unwrap();

        rows.next_row().await.unwrap();
        let err = rows.next_row().await.unwrap_err();
        match err {
            ImportError::Parse { rows_processed, .. } => assert_eq!(rows_processed, 1),
            other => panic!("unexpected variant: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let mut rows = stream("", 0);
        assert!(rows.headers().await.is_err());
    }
}
