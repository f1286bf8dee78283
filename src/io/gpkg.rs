// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! GeoPackage encoding.
//!
//! A GeoPackage is an SQLite database with a few metadata tables and one
//! feature table. Geometries are stored as GeoPackage binary blobs (see
//! [`wkb::encode_gpkg`]).

use super::{feature_json::format_timestamp, feature_json::parse_timestamp_str, wkb};
use crate::models::aoi::{AoiRecord, EPSG_4326};
use anyhow::{Context, Result};
use geo::BoundingRect;
use rusqlite::{params, Connection, OpenFlags};
use std::io::Write;
use std::path::Path;

/// Table name of the single feature layer.
pub const LAYER: &str = "aois";
const GEOMETRY_COLUMN: &str = "geom";

/// "GPKG" in ASCII.
const APPLICATION_ID: i32 = 0x4750_4B47;
const USER_VERSION: i32 = 10400;

const SCHEMA: &str = r#"
CREATE TABLE gpkg_spatial_ref_sys (
    srs_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL PRIMARY KEY,
    organization TEXT NOT NULL,
    organization_coordsys_id INTEGER NOT NULL,
    definition TEXT NOT NULL,
    description TEXT
);
CREATE TABLE gpkg_contents (
    table_name TEXT NOT NULL PRIMARY KEY,
    data_type TEXT NOT NULL,
    identifier TEXT UNIQUE,
    description TEXT DEFAULT '',
    last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    min_x DOUBLE,
    min_y DOUBLE,
    max_x DOUBLE,
    max_y DOUBLE,
    srs_id INTEGER,
    CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
CREATE TABLE gpkg_geometry_columns (
    table_name TEXT NOT NULL,
    column_name TEXT NOT NULL,
    geometry_type_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL,
    z TINYINT NOT NULL,
    m TINYINT NOT NULL,
    CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name),
    CONSTRAINT fk_gc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
    CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
CREATE TABLE aois (
    fid INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    geom GEOMETRY,
    name TEXT,
    timestamp DATETIME
);
"#;

const WGS84_WKT: &str = concat!(
    r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,"#,
    r#"AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,"#,
    r#"AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,"#,
    r#"AUTHORITY["EPSG","9122"]],AXIS["Latitude",NORTH],AXIS["Longitude",EAST],"#,
    r#"AUTHORITY["EPSG","4326"]]"#
);

/// Write records to a new GeoPackage at `path`, which must not hold data.
pub fn write_path(records: &[AoiRecord], path: &Path) -> Result<()> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    write(&mut conn, records)?;
    conn.close().map_err(|(_, e)| e)?;
    Ok(())
}

/// Read every feature of the first feature layer at `path`.
pub fn read_path(path: &Path) -> Result<Vec<AoiRecord>> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("failed to open {}", path.display()))?;
    read(&conn)
}

/// Encode records as GeoPackage file bytes.
pub fn encode(records: &[AoiRecord]) -> Result<Vec<u8>> {
    let scratch = tempfile::NamedTempFile::new()?;
    write_path(records, scratch.path())?;
    let bytes = std::fs::read(scratch.path())?;
    Ok(bytes)
}

/// Decode GeoPackage file bytes.
pub fn decode(bytes: &[u8]) -> Result<Vec<AoiRecord>> {
    let mut scratch = tempfile::NamedTempFile::new()?;
    scratch.write_all(bytes)?;
    scratch.flush()?;
    read_path(scratch.path())
}

fn write(conn: &mut Connection, records: &[AoiRecord]) -> Result<()> {
    conn.pragma_update(None, "application_id", APPLICATION_ID)?;
    conn.pragma_update(None, "user_version", USER_VERSION)?;

    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA)?;

    tx.execute(
        "INSERT INTO gpkg_spatial_ref_sys VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params!["Undefined cartesian SRS", -1, "NONE", -1, "undefined", "undefined cartesian coordinate reference system"],
    )?;
    tx.execute(
        "INSERT INTO gpkg_spatial_ref_sys VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params!["Undefined geographic SRS", 0, "NONE", 0, "undefined", "undefined geographic coordinate reference system"],
    )?;
    tx.execute(
        "INSERT INTO gpkg_spatial_ref_sys VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params!["WGS 84 geodetic", EPSG_4326, "EPSG", EPSG_4326, WGS84_WKT, "longitude/latitude coordinates in decimal degrees on the WGS 84 spheroid"],
    )?;

    let extent = records
        .iter()
        .filter_map(|r| r.geometry.bounding_rect())
        .reduce(|a, b| {
            geo::Rect::new(
                geo::coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                geo::coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            )
        });
    let last_change = records
        .iter()
        .map(|r| r.timestamp)
        .max()
        .unwrap_or_default();

    tx.execute(
        "INSERT INTO gpkg_contents
            (table_name, data_type, identifier, description, last_change, min_x, min_y, max_x, max_y, srs_id)
         VALUES (?1, 'features', ?1, '', ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            LAYER,
            format_timestamp(&last_change),
            extent.map(|r| r.min().x),
            extent.map(|r| r.min().y),
            extent.map(|r| r.max().x),
            extent.map(|r| r.max().y),
            EPSG_4326,
        ],
    )?;
    tx.execute(
        "INSERT INTO gpkg_geometry_columns VALUES (?1, ?2, 'GEOMETRY', ?3, 0, 0)",
        params![LAYER, GEOMETRY_COLUMN, EPSG_4326],
    )?;

    {
        let mut insert =
            tx.prepare("INSERT INTO aois (geom, name, timestamp) VALUES (?1, ?2, ?3)")?;
        for record in records {
            insert.execute(params![
                wkb::encode_gpkg(&record.geometry, EPSG_4326)?,
                record.name,
                format_timestamp(&record.timestamp),
            ])?;
        }
    }

    tx.commit()?;
    Ok(())
}

fn read(conn: &Connection) -> Result<Vec<AoiRecord>> {
    let (table, column): (String, String) = conn
        .query_row(
            "SELECT c.table_name, g.column_name
             FROM gpkg_contents c
             JOIN gpkg_geometry_columns g ON g.table_name = c.table_name
             WHERE c.data_type = 'features'
             ORDER BY c.rowid
             LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .context("no feature layer in GeoPackage")?;

    let sql = format!(
        "SELECT {geom}, name, timestamp FROM {table} ORDER BY rowid",
        geom = quote_ident(&column),
        table = quote_ident(&table),
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;

    let mut records = Vec::new();
    let mut index = 0;
    while let Some(row) = rows.next()? {
        match read_row(row) {
            Ok(record) => records.push(record),
            Err(err) => log::warn!("Skipping feature {} of {}: {:#}", index, table, err),
        }
        index += 1;
    }
    log::debug!("Read {} of {} features from layer {}", records.len(), index, table);
    Ok(records)
}

fn read_row(row: &rusqlite::Row<'_>) -> Result<AoiRecord> {
    let blob: Option<Vec<u8>> = row.get(0)?;
    let name: Option<String> = row.get(1)?;
    let timestamp: Option<String> = row.get(2)?;

    let geometry = wkb::decode_gpkg(&blob.context("feature has no geometry")?)?;
    let timestamp = parse_timestamp_str(&timestamp.context("feature has no timestamp")?)?;
    Ok(AoiRecord {
        name: name.unwrap_or_default(),
        timestamp,
        geometry,
    })
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
