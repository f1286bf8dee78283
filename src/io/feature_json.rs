// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! GeoJSON feature collection encoding.

use crate::models::aoi::AoiRecord;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject, JsonValue};

const CRS84_URN: &str = "urn:ogc:def:crs:OGC:1.3:CRS84";

/// Serialize records as a pretty-printed GeoJSON feature collection.
pub fn encode(records: &[AoiRecord]) -> Result<Vec<u8>> {
    let features = records.iter().map(to_feature).collect();

    let mut foreign_members = JsonObject::new();
    foreign_members.insert(
        "crs".to_string(),
        serde_json::json!({
            "type": "name",
            "properties": { "name": CRS84_URN }
        }),
    );

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign_members),
    };
    let json = serde_json::to_vec_pretty(&collection)?;
    Ok(json)
}

/// Parse a GeoJSON feature collection into records, in file order.
///
/// Features without a usable geometry or timestamp are skipped.
pub fn decode(bytes: &[u8]) -> Result<Vec<AoiRecord>> {
    let text = std::str::from_utf8(bytes).context("GeoJSON is not valid UTF-8")?;
    let collection = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection,
        _ => bail!("expected a GeoJSON FeatureCollection"),
    };

    if let Some(crs) = collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("crs"))
    {
        check_crs(crs)?;
    }

    let mut records = Vec::with_capacity(collection.features.len());
    for (i, feature) in collection.features.into_iter().enumerate() {
        match from_feature(feature) {
            Ok(record) => records.push(record),
            Err(err) => log::warn!("Skipping GeoJSON feature {}: {:#}", i, err),
        }
    }
    Ok(records)
}

/// The GeoJSON geometry object of a geometry, for display.
pub fn geometry_json(geometry: &geo::Geometry<f64>) -> JsonValue {
    let geometry = geojson::Geometry::new(geojson::Value::from(geometry));
    serde_json::to_value(&geometry).unwrap_or(JsonValue::Null)
}

fn to_feature(record: &AoiRecord) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), JsonValue::from(record.name.clone()));
    properties.insert(
        "timestamp".to_string(),
        JsonValue::from(format_timestamp(&record.timestamp)),
    );

    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(&record.geometry))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn from_feature(feature: Feature) -> Result<AoiRecord> {
    let properties = feature.properties.unwrap_or_default();

    let name = match properties.get("name") {
        Some(JsonValue::String(name)) => name.clone(),
        Some(JsonValue::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    let timestamp = properties
        .get("timestamp")
        .context("feature has no timestamp")
        .and_then(parse_timestamp)?;
    let geometry = feature.geometry.context("feature has no geometry")?;
    let geometry = geo::Geometry::<f64>::try_from(geometry)?;

    Ok(AoiRecord {
        name,
        timestamp,
        geometry,
    })
}

fn check_crs(crs: &JsonValue) -> Result<()> {
    let name = crs
        .pointer("/properties/name")
        .and_then(JsonValue::as_str)
        .unwrap_or_default();
    let normalized = name.to_ascii_uppercase();
    if normalized.ends_with("CRS84") || normalized.ends_with("4326") {
        Ok(())
    } else {
        bail!("unsupported coordinate reference system {:?}", name)
    }
}

pub(crate) fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Accepts RFC 3339 strings, naive ISO-8601 strings (taken as UTC) and
/// epoch milliseconds.
pub(crate) fn parse_timestamp(value: &JsonValue) -> Result<DateTime<Utc>> {
    match value {
        JsonValue::String(text) => parse_timestamp_str(text),
        JsonValue::Number(millis) => millis
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .with_context(|| format!("timestamp {} out of range", millis)),
        other => bail!("unsupported timestamp value {}", other),
    }
}

pub(crate) fn parse_timestamp_str(text: &str) -> Result<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .with_context(|| format!("invalid timestamp {:?}", text))?;
    Ok(naive.and_utc())
}
