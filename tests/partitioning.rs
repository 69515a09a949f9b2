use chrono::NaiveDate;

use ds_mirror::contract::PriceRow;
use ds_mirror::errors::MirrorError;
use ds_mirror::partition::{
    partition_rows, recent_window, PartitionKey, RECENT_WINDOW_MONTHS,
};

fn row(date: &str) -> PriceRow {
    PriceRow {
        symbol: "AAPL".to_string(),
        date: date.to_string(),
        open: 1.0,
        high: 2.0,
        low: 0.5,
        close: 1.5,
        volume: 100.0,
        adj_close: None,
    }
}

#[test]
fn same_month_dates_yield_identical_keys() {
    let first = PartitionKey::from_raw_date("2024-03-01").unwrap();
    let last = PartitionKey::from_raw_date("2024-03-31").unwrap();
    assert_eq!(first, last);
}

#[test]
fn keys_render_as_year_dot_month() {
    assert_eq!(PartitionKey::new(2024, 3).to_string(), "2024.03");
    assert_eq!(PartitionKey::new(2023, 12).to_string(), "2023.12");
}

#[test]
fn key_order_matches_chronological_order() {
    let older = PartitionKey::from_raw_date("2023-12-31").unwrap();
    let newer = PartitionKey::from_raw_date("2024-01-01").unwrap();
    assert!(older < newer);
}

#[test]
fn rfc3339_timestamps_are_accepted() {
    let from_date = PartitionKey::from_raw_date("2024-02-20").unwrap();
    let from_ts = PartitionKey::from_raw_date("2024-02-20T15:30:00+00:00").unwrap();
    assert_eq!(from_date, from_ts);
}

#[test]
fn unparsable_date_is_rejected() {
    let err = PartitionKey::from_raw_date("not-a-date").unwrap_err();
    assert!(matches!(err, MirrorError::MalformedDate { value } if value == "not-a-date"));
}

#[test]
fn recent_window_covers_current_and_previous_five_months() {
    let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    let window = recent_window(today, RECENT_WINDOW_MONTHS);
    let rendered: Vec<String> = window.iter().map(|k| k.to_string()).collect();
    assert_eq!(
        rendered,
        vec!["2024.03", "2024.02", "2024.01", "2023.12", "2023.11", "2023.10"]
    );
}

#[test]
fn recent_window_wraps_year_boundary() {
    let today = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let window = recent_window(today, 3);
    let rendered: Vec<String> = window.iter().map(|k| k.to_string()).collect();
    assert_eq!(rendered, vec!["2024.01", "2023.12", "2023.11"]);
}

#[test]
fn rows_group_by_calendar_month() {
    let rows = vec![row("2024-01-10"), row("2024-02-20"), row("2024-01-25")];
    let partitions = partition_rows(rows).unwrap();
    assert_eq!(partitions.len(), 2);

    let january = PartitionKey::new(2024, 1);
    let february = PartitionKey::new(2024, 2);
    assert_eq!(partitions[&january].len(), 2);
    assert_eq!(partitions[&february].len(), 1);
}

#[test]
fn one_malformed_date_aborts_partitioning() {
    let rows = vec![row("2024-01-10"), row("garbage"), row("2024-02-20")];
    let err = partition_rows(rows).unwrap_err();
    assert!(matches!(err, MirrorError::MalformedDate { .. }));
}
