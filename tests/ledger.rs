use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{TimeZone, Utc};

use ds_mirror::contract::MockObjectStoreGateway;
use ds_mirror::ledger::{changelog_key, is_unchanged, ChangelogRecord, FreshnessLedger};

#[test]
fn changelog_lives_under_the_dataset_prefix() {
    assert_eq!(
        changelog_key("stocks-daily-price"),
        "ds/stocks-daily-price/changelog"
    );
}

#[tokio::test]
async fn absent_object_reads_as_no_record() {
    let mut store = MockObjectStoreGateway::new();
    store
        .expect_get()
        .withf(|key| key == "ds/stocks-daily-price/changelog")
        .returning(|_| Ok(None));

    let ledger = FreshnessLedger::new(&store);
    let record = ledger.read("stocks-daily-price").await.unwrap();
    assert!(record.is_none());
}

#[tokio::test]
async fn corrupt_object_reads_as_no_record() {
    let mut store = MockObjectStoreGateway::new();
    store
        .expect_get()
        .returning(|_| Ok(Some(Bytes::from_static(b"{not valid json"))));

    let ledger = FreshnessLedger::new(&store);
    let record = ledger.read("stocks-daily-price").await.unwrap();
    assert!(record.is_none());
}

#[tokio::test]
async fn write_then_read_round_trips() {
    let written: Arc<Mutex<Option<(String, Bytes, String)>>> = Arc::new(Mutex::new(None));

    let mut store = MockObjectStoreGateway::new();
    let sink = written.clone();
    store.expect_put().returning(move |key, body, content_type| {
        *sink.lock().unwrap() = Some((key.to_string(), body, content_type.to_string()));
        Ok(())
    });

    let last_update = Utc.with_ymd_and_hms(2024, 2, 21, 0, 0, 0).unwrap();
    let processed_at = Utc.with_ymd_and_hms(2024, 2, 22, 6, 30, 0).unwrap();

    let ledger = FreshnessLedger::new(&store);
    ledger
        .write(
            "stocks-daily-price",
            "paperswithbacktest/Stocks-Daily-Price",
            last_update,
            processed_at,
        )
        .await
        .unwrap();

    let (key, body, content_type) = written.lock().unwrap().take().unwrap();
    assert_eq!(key, "ds/stocks-daily-price/changelog");
    assert_eq!(content_type, "application/json");

    let record: ChangelogRecord = serde_json::from_slice(&body).unwrap();
    assert_eq!(record.repo_id, "paperswithbacktest/Stocks-Daily-Price");
    assert_eq!(record.last_update, last_update);
    assert_eq!(record.processed_at, processed_at);
    assert!(record.processed_at >= record.last_update);
}

#[test]
fn unchanged_requires_a_record_at_least_as_new_as_the_source() {
    let last_modified = Utc.with_ymd_and_hms(2024, 2, 21, 0, 0, 0).unwrap();
    let record = |last_update| ChangelogRecord {
        repo_id: "paperswithbacktest/Stocks-Daily-Price".to_string(),
        last_update,
        processed_at: Utc.with_ymd_and_hms(2024, 2, 22, 0, 0, 0).unwrap(),
    };

    // Record equal to or newer than the source: skip.
    assert!(is_unchanged(Some(&record(last_modified)), last_modified));
    let newer = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    assert!(is_unchanged(Some(&record(newer)), last_modified));

    // Older record or no record at all: reprocess.
    let older = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    assert!(!is_unchanged(Some(&record(older)), last_modified));
    assert!(!is_unchanged(None, last_modified));
}
