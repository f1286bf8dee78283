// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Well-known binary encoding for polygons and multipolygons.
//!
//! Both the GeoPackage and GeoParquet files store geometries as WKB.
//! Only the two areal 2D types an AOI can have are accepted.

use anyhow::{bail, Context, Result};
use geo::{BoundingRect, Geometry};
use geozero::wkb::{GpkgWkb, Wkb};
use geozero::{CoordDimensions, ToGeo, ToWkb};

/// Encode a polygon or multipolygon as little-endian ISO WKB.
pub fn encode(geometry: &Geometry<f64>) -> Result<Vec<u8>> {
    ensure_areal(geometry)?;
    let bytes = geometry.to_wkb(CoordDimensions::xy())?;
    Ok(bytes)
}

/// Decode a WKB polygon or multipolygon in either byte order.
pub fn decode(bytes: &[u8]) -> Result<Geometry<f64>> {
    let geometry = Wkb(bytes.to_vec()).to_geo().context("malformed WKB")?;
    ensure_areal(&geometry)?;
    Ok(geometry)
}

/// Encode as a GeoPackage geometry blob with an XY envelope.
pub fn encode_gpkg(geometry: &Geometry<f64>, srs_id: i32) -> Result<Vec<u8>> {
    ensure_areal(geometry)?;
    let envelope = geometry
        .bounding_rect()
        .context("geometry has no envelope")?;
    let blob = geometry.to_gpkg_wkb(
        CoordDimensions::xy(),
        Some(srs_id),
        vec![
            envelope.min().x,
            envelope.max().x,
            envelope.min().y,
            envelope.max().y,
        ],
    )?;
    Ok(blob)
}

/// Decode a GeoPackage geometry blob.
pub fn decode_gpkg(blob: &[u8]) -> Result<Geometry<f64>> {
    let geometry = GpkgWkb(blob.to_vec())
        .to_geo()
        .context("malformed GeoPackage geometry")?;
    ensure_areal(&geometry)?;
    Ok(geometry)
}

fn ensure_areal(geometry: &Geometry<f64>) -> Result<()> {
    match geometry {
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => Ok(()),
        other => bail!("unsupported geometry type: {}", type_name(other)),
    }
}

pub(crate) fn type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
