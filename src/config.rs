// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Application settings.

use crate::models::drawing::LonLat;
use std::path::PathBuf;

/// Raster tiles drawn under the map, in XYZ numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Basemap {
    /// URL with `{z}`, `{x}` and `{y}` placeholders.
    pub url_template: String,
    pub attribution: String,
}

impl Default for Basemap {
    fn default() -> Self {
        Self {
            url_template: "https://a.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}.png".to_string(),
            attribution: "© OpenStreetMap contributors © CARTO".to_string(),
        }
    }
}

/// Fixed settings the app starts with.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding `aois.gpkg`, `aois.geojson` and `aois.parquet`.
    pub data_dir: PathBuf,
    pub title: String,
    pub map_center: LonLat,
    pub map_zoom: f64,
    /// `None` draws a plain graticule instead.
    pub basemap: Option<Basemap>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            title: "Draw Your Area of Interest".to_string(),
            // Berlin
            map_center: LonLat::new(13.405, 52.52),
            map_zoom: 5.0,
            basemap: Some(Basemap::default()),
        }
    }
}
