//! Pipeline behavior tests
//!
//! Drive the parser, accumulator, and session tracker together over
//! in-memory CSV input, with write tasks stubbed out, and check the
//! batching and completion contracts end to end.

use hwlog_common::ImportError;
use hwlog_importer::db::schema::{required_columns, validate_columns};
use hwlog_importer::pipeline::batcher::BatchAccumulator;
use hwlog_importer::pipeline::parser::CsvRowStream;
use hwlog_importer::pipeline::session::{SessionState, SessionTracker};

/// Run the ingest loop the way the pipeline does, submitting each batch as
/// a stub write task that commits every row.
async fn drive(
    input: String,
    discard_rows: usize,
    batch_size: usize,
) -> (Vec<String>, Vec<usize>, u64, u64) {
    let mut rows = CsvRowStream::new(std::io::Cursor::new(input.into_bytes()), discard_rows);
    let headers = rows.headers().await.expect("headers");

    let mut accumulator = BatchAccumulator::new(batch_size);
    let mut tracker = SessionTracker::new();
    let mut batch_sizes = Vec::new();

    loop {
        match rows.next_row().await.expect("row") {
            Some(row) => {
                if let Some(batch) = accumulator.push(row) {
                    batch_sizes.push(batch.len());
                    let committed = batch.len() as u64;
                    tracker.register(tokio::spawn(async move { Ok(committed) }));
                }
            },
            None => {
                let remainder = accumulator.finish();
                batch_sizes.push(remainder.len());
                let committed = remainder.len() as u64;
                tracker.register(tokio::spawn(async move { Ok(committed) }));
                break;
            },
        }
    }

    tracker.advance(SessionState::Draining);
    let committed = tracker.drain().await.expect("drain");

    (headers, batch_sizes, rows.rows_delivered(), committed)
}

fn csv_with_rows(header: &str, units: Option<&str>, data_rows: usize) -> String {
    let mut out = String::from(header);
    out.push('\n');
    if let Some(units) = units {
        out.push_str(units);
        out.push('\n');
    }
    for i in 0..data_rows {
        out.push_str(&format!("{i},3.3\n"));
    }
    out
}

#[tokio::test]
async fn three_rows_land_in_one_final_batch() {
    // Scenario: header `timestamp,voltage`, units row, 3 data rows
    let input = csv_with_rows("timestamp,voltage", Some("s,volts"), 3);
    let (headers, batch_sizes, delivered, committed) = drive(input, 1, 5000).await;

    assert_eq!(headers, vec!["time", "voltage"]);
    assert_eq!(batch_sizes, vec![3]);
    assert_eq!(delivered, 3);
    assert_eq!(committed, 3);
}

#[tokio::test]
async fn twelve_thousand_rows_partition_into_three_batches() {
    let input = csv_with_rows("ts,v", None, 12_000);
    let (_, batch_sizes, delivered, committed) = drive(input, 0, 5000).await;

    assert_eq!(batch_sizes, vec![5000, 5000, 2000]);
    assert_eq!(delivered, 12_000);
    assert_eq!(committed, 12_000);
}

#[tokio::test]
async fn exact_multiple_still_submits_trailing_empty_batch() {
    let input = csv_with_rows("ts,v", None, 10_000);
    let (_, batch_sizes, delivered, _) = drive(input, 0, 5000).await;

    assert_eq!(batch_sizes, vec![5000, 5000, 0]);
    assert_eq!(delivered, 10_000);
}

#[tokio::test]
async fn batch_row_totals_always_sum_to_input_size() {
    for n in [0usize, 1, 4999, 5000, 5001, 9999] {
        let input = csv_with_rows("ts,v", None, n);
        let (_, batch_sizes, delivered, committed) = drive(input, 0, 5000).await;

        assert_eq!(batch_sizes.iter().sum::<usize>(), n, "n = {n}");
        assert_eq!(delivered, n as u64);
        assert_eq!(committed, n as u64);
        // Every batch but the last is exactly the threshold
        for size in &batch_sizes[..batch_sizes.len() - 1] {
            assert_eq!(*size, 5000);
        }
    }
}

#[tokio::test]
async fn discard_window_rows_are_not_counted_or_written() {
    let input = csv_with_rows("ts,v", Some("s,volts"), 10);
    let (_, batch_sizes, delivered, committed) = drive(input, 1, 4).await;

    assert_eq!(delivered, 10);
    assert_eq!(committed, 10);
    assert_eq!(batch_sizes, vec![4, 4, 2]);
}

#[tokio::test]
async fn reimport_appends_rather_than_deduplicates() {
    // Two passes over the identical input each deliver N rows; nothing in
    // the pipeline drops previously seen data.
    let input = csv_with_rows("ts,v", None, 25);

    let (_, _, first, _) = drive(input.clone(), 0, 10).await;
    let (_, _, second, _) = drive(input, 0, 10).await;

    assert_eq!(first, 25);
    assert_eq!(second, 25);
}

#[tokio::test]
async fn parse_error_carries_rows_processed_so_far() {
    let mut input = csv_with_rows("ts,v", None, 5);
    input.push_str("one,two,three\n");

    let mut rows = CsvRowStream::new(std::io::Cursor::new(input.into_bytes()), 0);
    rows.headers().await.unwrap();

    let mut seen = 0u64;
    let err = loop {
        match rows.next_row().await {
            Ok(Some(_)) => seen += 1,
            Ok(None) => panic!("expected a parse failure"),
            Err(e) => break e,
        }
    };

    assert_eq!(seen, 5);
    match err {
        ImportError::Parse { rows_processed, .. } => assert_eq!(rows_processed, 5),
        other => panic!("unexpected variant: {other}"),
    }
}

#[tokio::test]
async fn no_submission_after_a_write_failure() {
    let mut tracker = SessionTracker::new();
    let flag = tracker.failure_flag();

    tracker.register(tokio::spawn(async move {
        flag.store(true, std::sync::atomic::Ordering::SeqCst);
        Err(ImportError::write(120, "statement too large"))
    }));

    let err = tracker.drain().await.unwrap_err();
    match err {
        ImportError::Write { rows_committed, .. } => assert_eq!(rows_committed, 120),
        other => panic!("unexpected variant: {other}"),
    }
    assert!(tracker.has_failed());
}

#[test]
fn existing_table_must_match_required_set_exactly() {
    // Existing {id, time, voltage} vs incoming headers timestamp,voltage,current
    let headers: Vec<String> = vec!["time".into(), "voltage".into(), "current".into()];
    let existing: Vec<String> = vec!["id".into(), "time".into(), "voltage".into()];

    assert_eq!(
        required_columns(&headers),
        vec!["current", "id", "time", "voltage"]
    );
    assert!(matches!(
        validate_columns(&existing, &headers),
        Err(ImportError::SchemaMismatch { .. })
    ));

    // The same table with the missing column present validates
    let repaired: Vec<String> = vec!["id".into(), "time".into(), "voltage".into(), "current".into()];
    assert!(validate_columns(&repaired, &headers).is_ok());
}
