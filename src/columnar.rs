//! Parquet encoding for partition files.
//!
//! One partition's rows become one zstd-compressed parquet file. The schema
//! is the row schema as fetched from the source; the grouping month is
//! implied by the object key and never stored as a column.

use std::io::Cursor;
use std::sync::Arc;

use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;

use crate::contract::{PartitionEncoder, PriceRow};
use crate::errors::MirrorError;

fn price_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("symbol", DataType::Utf8, false),
        Field::new("date", DataType::Utf8, false),
        Field::new("open", DataType::Float64, false),
        Field::new("high", DataType::Float64, false),
        Field::new("low", DataType::Float64, false),
        Field::new("close", DataType::Float64, false),
        Field::new("volume", DataType::Float64, false),
        Field::new("adj_close", DataType::Float64, true),
    ]))
}

pub struct ParquetEncoder {
    compression_level: i32,
}

impl ParquetEncoder {
    pub fn new(compression_level: i32) -> Self {
        ParquetEncoder { compression_level }
    }

    fn writer_properties(&self) -> Result<WriterProperties, MirrorError> {
        let level = ZstdLevel::try_new(self.compression_level)
            .map_err(|e| MirrorError::Encode(format!("invalid zstd level: {e}")))?;
        Ok(WriterProperties::builder()
            .set_compression(Compression::ZSTD(level))
            .build())
    }
}

impl PartitionEncoder for ParquetEncoder {
    fn encode(&self, rows: &[PriceRow]) -> Result<Bytes, MirrorError> {
        let schema = price_schema();

        let symbols = StringArray::from(rows.iter().map(|r| r.symbol.as_str()).collect::<Vec<_>>());
        let dates = StringArray::from(rows.iter().map(|r| r.date.as_str()).collect::<Vec<_>>());
        let opens = Float64Array::from(rows.iter().map(|r| r.open).collect::<Vec<_>>());
        let highs = Float64Array::from(rows.iter().map(|r| r.high).collect::<Vec<_>>());
        let lows = Float64Array::from(rows.iter().map(|r| r.low).collect::<Vec<_>>());
        let closes = Float64Array::from(rows.iter().map(|r| r.close).collect::<Vec<_>>());
        let volumes = Float64Array::from(rows.iter().map(|r| r.volume).collect::<Vec<_>>());
        let adj_closes = Float64Array::from(rows.iter().map(|r| r.adj_close).collect::<Vec<_>>());

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(symbols),
                Arc::new(dates),
                Arc::new(opens),
                Arc::new(highs),
                Arc::new(lows),
                Arc::new(closes),
                Arc::new(volumes),
                Arc::new(adj_closes),
            ],
        )
        .map_err(|e| MirrorError::Encode(format!("record batch construction failed: {e}")))?;

        let mut cursor = Cursor::new(Vec::<u8>::new());
        let props = self.writer_properties()?;
        let mut writer = ArrowWriter::try_new(&mut cursor, schema, Some(props))
            .map_err(|e| MirrorError::Encode(format!("parquet writer init failed: {e}")))?;
        writer
            .write(&batch)
            .map_err(|e| MirrorError::Encode(format!("parquet write failed: {e}")))?;
        writer
            .close()
            .map_err(|e| MirrorError::Encode(format!("parquet close failed: {e}")))?;

        Ok(Bytes::from(cursor.into_inner()))
    }
}
