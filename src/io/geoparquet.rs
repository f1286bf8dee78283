// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! GeoParquet encoding.
//!
//! Records are written as a single Arrow record batch with WKB geometries
//! and the `geo` file metadata GeoParquet 1.0 readers expect.

use super::wkb;
use crate::models::aoi::AoiRecord;
use anyhow::{ensure, Context, Result};
use arrow_array::{Array, ArrayRef, BinaryArray, RecordBatch, StringArray, TimestampMicrosecondArray};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

const GEOMETRY_COLUMN: &str = "geometry";

fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
}

/// Timestamps are read zone-less; naive values from other writers are UTC.
fn read_timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Microsecond, None)
}

fn schema() -> Schema {
    Schema::new(vec![
        Field::new("name", DataType::Utf8, true),
        Field::new("timestamp", timestamp_type(), false),
        Field::new(GEOMETRY_COLUMN, DataType::Binary, false),
    ])
}

/// File-level `geo` metadata.
#[derive(Debug, Serialize, Deserialize)]
struct GeoMetadata {
    #[serde(default)]
    version: String,
    primary_column: String,
    columns: BTreeMap<String, GeoColumn>,
}

/// Metadata for one geometry column.
#[derive(Debug, Serialize, Deserialize)]
struct GeoColumn {
    encoding: String,
    #[serde(default)]
    geometry_types: BTreeSet<String>,
    /// PROJJSON; absent or null means OGC:CRS84.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    crs: Option<Value>,
}

/// Build the `geo` metadata describing the geometry column.
fn geo_metadata(records: &[AoiRecord]) -> GeoMetadata {
    let geometry_types = records
        .iter()
        .map(|r| wkb::type_name(&r.geometry).to_string())
        .collect();

    let column = GeoColumn {
        encoding: "WKB".to_string(),
        geometry_types,
        crs: None,
    };
    GeoMetadata {
        version: "1.0.0".to_string(),
        primary_column: GEOMETRY_COLUMN.to_string(),
        columns: BTreeMap::from([(GEOMETRY_COLUMN.to_string(), column)]),
    }
}

/// Serialize records as GeoParquet file bytes.
pub fn encode(records: &[AoiRecord]) -> Result<Vec<u8>> {
    let schema = Arc::new(schema());

    let names: StringArray = records.iter().map(|r| Some(r.name.as_str())).collect();
    let timestamps = TimestampMicrosecondArray::from(
        records
            .iter()
            .map(|r| r.timestamp.timestamp_micros())
            .collect::<Vec<_>>(),
    )
    .with_timezone("UTC");
    let geometries = records
        .iter()
        .map(|r| wkb::encode(&r.geometry))
        .collect::<Result<Vec<_>>>()?;
    let geometries = BinaryArray::from_iter_values(geometries);

    let columns: Vec<ArrayRef> = vec![Arc::new(names), Arc::new(timestamps), Arc::new(geometries)];
    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_key_value_metadata(Some(vec![KeyValue::new(
            "geo".to_string(),
            serde_json::to_string(&geo_metadata(records))?,
        )]))
        .build();

    let mut writer = ArrowWriter::try_new(Vec::new(), schema, Some(props))?;
    if batch.num_rows() > 0 {
        writer.write(&batch)?;
    }
    let bytes = writer.into_inner()?;
    Ok(bytes)
}

/// Parse GeoParquet file bytes into records, in row order.
pub fn decode(bytes: &[u8]) -> Result<Vec<AoiRecord>> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::copy_from_slice(bytes))?;

    let geo = builder
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .and_then(|kv| kv.iter().find(|entry| entry.key == "geo"))
        .and_then(|entry| entry.value.as_deref())
        .context("missing GeoParquet 'geo' metadata")?;
    let geo: GeoMetadata =
        serde_json::from_str(geo).context("malformed GeoParquet 'geo' metadata")?;
    let geometry_column = check_geo_metadata(&geo)?;

    let mut records = Vec::new();
    for batch in builder.build()? {
        let batch = batch?;
        read_batch(&batch, &geometry_column, &mut records)?;
    }
    Ok(records)
}

/// Validate the `geo` metadata and return the primary geometry column.
fn check_geo_metadata(geo: &GeoMetadata) -> Result<String> {
    let primary = &geo.primary_column;
    let column = geo
        .columns
        .get(primary)
        .with_context(|| format!("'geo' metadata does not describe column {:?}", primary))?;

    ensure!(
        column.encoding.eq_ignore_ascii_case("wkb"),
        "unsupported geometry encoding {:?}",
        column.encoding
    );

    if let Some(crs) = column.crs.as_ref().filter(|crs| !crs.is_null()) {
        let code = &crs["id"]["code"];
        let geographic =
            code.as_i64() == Some(4326) || matches!(code.as_str(), Some("4326") | Some("CRS84"));
        ensure!(geographic, "unsupported coordinate reference system {}", crs["id"]);
    }
    Ok(primary.clone())
}

fn read_batch(batch: &RecordBatch, geometry_column: &str, out: &mut Vec<AoiRecord>) -> Result<()> {
    let names = column_as(batch, "name", &DataType::Utf8)?;
    let names = names
        .as_any()
        .downcast_ref::<StringArray>()
        .context("name column is not text")?;

    let timestamps = column_as(batch, "timestamp", &read_timestamp_type())?;
    let timestamps = timestamps
        .as_any()
        .downcast_ref::<TimestampMicrosecondArray>()
        .context("timestamp column is not a timestamp")?;

    let geometries = column_as(batch, geometry_column, &DataType::Binary)?;
    let geometries = geometries
        .as_any()
        .downcast_ref::<BinaryArray>()
        .context("geometry column is not binary")?;

    let read_row = |row: usize| -> Result<AoiRecord> {
        let name = if names.is_null(row) {
            String::new()
        } else {
            names.value(row).to_string()
        };

        ensure!(!timestamps.is_null(row), "no timestamp");
        let timestamp = DateTime::<Utc>::from_timestamp_micros(timestamps.value(row))
            .context("timestamp out of range")?;

        ensure!(!geometries.is_null(row), "no geometry");
        let geometry = wkb::decode(geometries.value(row))?;

        Ok(AoiRecord {
            name,
            timestamp,
            geometry,
        })
    };

    for row in 0..batch.num_rows() {
        match read_row(row) {
            Ok(record) => out.push(record),
            Err(err) => log::warn!("Skipping Parquet row {} of batch: {:#}", row, err),
        }
    }
    Ok(())
}

/// Fetch a column by name, cast to the type this module reads.
fn column_as(batch: &RecordBatch, name: &str, data_type: &DataType) -> Result<ArrayRef> {
    let column = batch
        .column_by_name(name)
        .with_context(|| format!("missing column {:?}", name))?;
    if column.data_type() == data_type {
        return Ok(column.clone());
    }
    let cast = arrow_cast::cast::cast(column, data_type)
        .with_context(|| format!("column {:?} has type {}", name, column.data_type()))?;
    Ok(cast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::aoi::tests::{at, square};
    use crate::models::aoi::AoiCollection;
    use arrow_array::{LargeBinaryArray, TimestampMillisecondArray, TimestampNanosecondArray};
    use serde_json::json;

    fn sample() -> AoiCollection {
        let mut collection = AoiCollection::new();
        collection.append("North".into(), at(1_700_000_000), square(13.3, 52.5, 0.05));
        collection.append("South".into(), at(1_700_000_001), square(13.3, 52.4, 0.05));
        collection
    }

    #[test]
    fn test_encode_decode_keeps_records() {
        let collection = sample();
        let bytes = encode(collection.records()).unwrap();
        assert!(bytes.starts_with(b"PAR1"));
        assert_eq!(decode(&bytes).unwrap().as_slice(), collection.records());
    }

    #[test]
    fn test_geo_metadata_written() {
        let bytes = encode(sample().records()).unwrap();
        let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(bytes)).unwrap();
        let geo = builder
            .metadata()
            .file_metadata()
            .key_value_metadata()
            .and_then(|kv| kv.iter().find(|e| e.key == "geo"))
            .and_then(|e| e.value.clone())
            .unwrap();
        let geo: Value = serde_json::from_str(&geo).unwrap();
        assert_eq!(geo["primary_column"], "geometry");
        assert_eq!(geo["columns"]["geometry"]["encoding"], "WKB");
        assert_eq!(geo["columns"]["geometry"]["geometry_types"], json!(["Polygon"]));
    }

    #[test]
    fn test_empty_collection() {
        let bytes = encode(&[]).unwrap();
        assert!(decode(&bytes).unwrap().is_empty());
    }

    /// File bytes for one row written with another writer's column types.
    fn foreign_file(timestamp: Field, timestamps: ArrayRef, geo: &str) -> Vec<u8> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("name", DataType::Utf8, true),
            timestamp,
            Field::new("geometry", DataType::LargeBinary, false),
        ]));
        let wkb_bytes = wkb::encode(square(0.0, 0.0, 1.0).geometry()).unwrap();
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec![None::<&str>])),
            timestamps,
            Arc::new(LargeBinaryArray::from_iter_values([wkb_bytes])),
        ];
        let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

        let props = WriterProperties::builder()
            .set_key_value_metadata(Some(vec![KeyValue::new("geo".to_string(), geo.to_string())]))
            .build();
        let mut writer = ArrowWriter::try_new(Vec::new(), schema, Some(props)).unwrap();
        writer.write(&batch).unwrap();
        writer.into_inner().unwrap()
    }

    #[test]
    fn test_reads_naive_nanosecond_timestamps() {
        // pandas writes naive nanosecond timestamps and large binary.
        let bytes = foreign_file(
            Field::new("timestamp", DataType::Timestamp(TimeUnit::Nanosecond, None), false),
            Arc::new(TimestampNanosecondArray::from(vec![1_700_000_000_000_000_000])),
            &serde_json::to_string(&geo_metadata(&[])).unwrap(),
        );

        let records = decode(&bytes).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "");
        assert_eq!(records[0].timestamp, at(1_700_000_000));
        assert_eq!(&records[0].geometry, square(0.0, 0.0, 1.0).geometry());
    }

    #[test]
    fn test_reads_offset_timestamps_and_projjson_crs() {
        let geo = r#"{
            "version": "1.0.0",
            "primary_column": "geometry",
            "columns": {"geometry": {
                "encoding": "WKB",
                "geometry_types": ["Polygon"],
                "bbox": [0.0, 0.0, 1.0, 1.0],
                "crs": {"type": "GeographicCRS", "name": "WGS 84",
                        "id": {"authority": "EPSG", "code": 4326}}
            }}
        }"#;
        let bytes = foreign_file(
            Field::new(
                "timestamp",
                DataType::Timestamp(TimeUnit::Millisecond, Some("+00:00".into())),
                false,
            ),
            Arc::new(
                TimestampMillisecondArray::from(vec![1_700_000_000_250]).with_timezone("+00:00"),
            ),
            geo,
        );

        let records = decode(&bytes).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].timestamp,
            at(1_700_000_000) + chrono::Duration::milliseconds(250)
        );
    }

    #[test]
    fn test_rows_without_geometry_are_skipped() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("name", DataType::Utf8, true),
            Field::new("timestamp", timestamp_type(), false),
            Field::new("geometry", DataType::Binary, true),
        ]));
        let wkb_bytes = wkb::encode(square(0.0, 0.0, 1.0).geometry()).unwrap();
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec![Some("kept"), Some("empty")])),
            Arc::new(
                TimestampMicrosecondArray::from(vec![1_700_000_000_000_000, 1_700_000_001_000_000])
                    .with_timezone("UTC"),
            ),
            Arc::new(BinaryArray::from(vec![Some(wkb_bytes.as_slice()), None])),
        ];
        let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
        let props = WriterProperties::builder()
            .set_key_value_metadata(Some(vec![KeyValue::new(
                "geo".to_string(),
                serde_json::to_string(&geo_metadata(&[])).unwrap(),
            )]))
            .build();
        let mut writer = ArrowWriter::try_new(Vec::new(), schema, Some(props)).unwrap();
        writer.write(&batch).unwrap();
        let bytes = writer.into_inner().unwrap();

        let records = decode(&bytes).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "kept");
    }

    #[test]
    fn test_rejects_projected_crs() {
        let geo = json!({
            "primary_column": "geometry",
            "columns": {"geometry": {
                "encoding": "WKB",
                "crs": {"id": {"authority": "EPSG", "code": 3857}}
            }}
        });
        let geo: GeoMetadata = serde_json::from_value(geo).unwrap();
        assert!(check_geo_metadata(&geo).is_err());

        let geo = json!({
            "primary_column": "geometry",
            "columns": {"geometry": {
                "encoding": "WKB",
                "crs": {"id": {"authority": "EPSG", "code": 4326}}
            }}
        });
        let geo: GeoMetadata = serde_json::from_value(geo).unwrap();
        assert_eq!(check_geo_metadata(&geo).unwrap(), "geometry");
    }

    #[test]
    fn test_encode_is_deterministic() {
        let collection = sample();
        assert_eq!(
            encode(collection.records()).unwrap(),
            encode(collection.records()).unwrap()
        );
    }
}
