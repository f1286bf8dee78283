// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Reading and writing the AOI dataset.
//!
//! The dataset is kept in three formats side by side. Loading picks the
//! first file that exists (GeoPackage, then GeoJSON, then Parquet);
//! saving rewrites all three.

pub mod feature_json;
pub mod geoparquet;
pub mod gpkg;
pub mod wkb;

use crate::error::AoiError;
use crate::models::aoi::AoiCollection;
use crate::models::aoi::AoiRecord;
use crate::util::validation::{classify, Validity};
use anyhow::{Context, Result};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

/// On-disk formats of the dataset, in load preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    GeoPackage,
    GeoJson,
    Parquet,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::GeoPackage, Format::GeoJson, Format::Parquet];

    /// Fixed file name used both on disk and for downloads.
    pub fn file_name(self) -> &'static str {
        match self {
            Format::GeoPackage => "aois.gpkg",
            Format::GeoJson => "aois.geojson",
            Format::Parquet => "aois.parquet",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::GeoPackage => "gpkg",
            Format::GeoJson => "geojson",
            Format::Parquet => "parquet",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Format::GeoPackage => "application/geopackage+sqlite3",
            Format::GeoJson => "application/geo+json",
            Format::Parquet => "application/octet-stream",
        }
    }

    /// Serialize the full collection in this format.
    pub fn encode(self, collection: &AoiCollection) -> Result<Vec<u8>> {
        let records = collection.records();
        match self {
            Format::GeoPackage => gpkg::encode(records),
            Format::GeoJson => feature_json::encode(records),
            Format::Parquet => geoparquet::encode(records),
        }
    }

    /// Parse raw records; validity is not checked here.
    pub fn decode(self, bytes: &[u8]) -> Result<Vec<AoiRecord>> {
        match self {
            Format::GeoPackage => gpkg::decode(bytes),
            Format::GeoJson => feature_json::decode(bytes),
            Format::Parquet => geoparquet::decode(bytes),
        }
    }

    fn read_path(self, path: &Path) -> Result<Vec<AoiRecord>> {
        match self {
            // SQLite reads the file in place
            Format::GeoPackage => gpkg::read_path(path),
            _ => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                self.decode(&bytes)
            }
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Format::GeoPackage => "GeoPackage",
            Format::GeoJson => "GeoJSON",
            Format::Parquet => "Parquet",
        };
        f.write_str(label)
    }
}

/// Locations of the three dataset files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetPaths {
    dir: PathBuf,
}

impl DatasetPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, format: Format) -> PathBuf {
        self.dir.join(format.file_name())
    }
}

/// Result of loading the dataset at startup.
#[derive(Debug, Clone, Default)]
pub struct LoadedDataset {
    pub collection: AoiCollection,
    /// Format the collection was read from, `None` on first run.
    pub source: Option<Format>,
    /// Existing files that could not be decoded. Saving over them would
    /// lose their contents.
    pub unreadable: Vec<Format>,
}

/// Load the collection from the first readable dataset file.
///
/// Missing files are the normal first-run state and yield an empty
/// collection. A file that cannot be decoded is logged, listed in
/// `unreadable` and skipped in favour of the next format. Records that
/// fail to decode or have invalid geometry are dropped.
pub fn load_dataset(paths: &DatasetPaths) -> LoadedDataset {
    let mut unreadable = Vec::new();
    for format in Format::ALL {
        let path = paths.path(format);
        if !path.exists() {
            continue;
        }

        let records = match format.read_path(&path) {
            Ok(records) => records,
            Err(source) => {
                let err = AoiError::Decode { format, source };
                log::error!("Skipping {}: {}", path.display(), err);
                unreadable.push(format);
                continue;
            }
        };

        let mut collection = AoiCollection::new();
        for record in records {
            match classify(&record.geometry) {
                Validity::Valid(geometry) => {
                    collection.append(record.name, record.timestamp, geometry)
                }
                other => log::warn!(
                    "Dropping AOI {:?} from {}: geometry is {:?}",
                    record.name,
                    path.display(),
                    other
                ),
            }
        }

        log::info!("Loaded {} AOIs from {}", collection.len(), path.display());
        return LoadedDataset {
            collection,
            source: Some(format),
            unreadable,
        };
    }

    if unreadable.is_empty() {
        log::info!("No dataset in {}, starting empty", paths.dir().display());
    }
    LoadedDataset {
        unreadable,
        ..LoadedDataset::default()
    }
}

/// Rewrite all three dataset files from the collection.
///
/// Every format is encoded and staged in a temporary file next to its
/// target before any target is touched, so a failure while encoding or
/// staging leaves the previous files intact. The GeoPackage, which the
/// loader prefers, is replaced last.
pub fn persist_dataset(collection: &AoiCollection, paths: &DatasetPaths) -> Result<(), AoiError> {
    let persistence =
        |format: Format| move |source: anyhow::Error| AoiError::Persistence { format, source };

    std::fs::create_dir_all(paths.dir())
        .with_context(|| format!("failed to create {}", paths.dir().display()))
        .map_err(persistence(Format::GeoPackage))?;

    let mut staged = Vec::with_capacity(Format::ALL.len());
    for format in [Format::GeoJson, Format::Parquet, Format::GeoPackage] {
        let file = stage(collection, paths, format).map_err(persistence(format))?;
        staged.push((format, file));
    }

    for (format, file) in staged {
        let target = paths.path(format);
        file.persist(&target)
            .with_context(|| format!("failed to replace {}", target.display()))
            .map_err(persistence(format))?;
    }

    log::info!("Wrote {} AOIs to {}", collection.len(), paths.dir().display());
    Ok(())
}

fn stage(
    collection: &AoiCollection,
    paths: &DatasetPaths,
    format: Format,
) -> Result<tempfile::NamedTempFile> {
    let bytes = format.encode(collection)?;
    let mut file = tempfile::Builder::new()
        .prefix(".aois-")
        .suffix(&format!(".{}.tmp", format.extension()))
        .tempfile_in(paths.dir())?;
    file.write_all(&bytes)?;
    file.as_file().sync_all()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::aoi::tests::{at, square};

    fn sample(n: usize) -> AoiCollection {
        let mut collection = AoiCollection::new();
        for i in 0..n {
            let offset = i as f64;
            collection.append(
                collection.default_name(),
                at(1_700_000_000 + i as i64),
                square(13.0 + offset, 52.0, 0.5),
            );
        }
        collection
    }

    #[test]
    fn test_missing_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_dataset(&DatasetPaths::new(dir.path()));
        assert!(loaded.collection.is_empty());
        assert_eq!(loaded.source, None);
    }

    #[test]
    fn test_persist_writes_all_formats() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DatasetPaths::new(dir.path());
        let collection = sample(2);

        persist_dataset(&collection, &paths).unwrap();

        for format in Format::ALL {
            let records = format.read_path(&paths.path(format)).unwrap();
            assert_eq!(records.as_slice(), collection.records(), "{}", format);
        }

        // nothing staged is left behind
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_load_prefers_geopackage() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DatasetPaths::new(dir.path());

        persist_dataset(&sample(1), &paths).unwrap();
        std::fs::write(paths.path(Format::GeoJson), Format::GeoJson.encode(&sample(3)).unwrap())
            .unwrap();

        let loaded = load_dataset(&paths);
        assert_eq!(loaded.source, Some(Format::GeoPackage));
        assert_eq!(loaded.collection.len(), 1);
    }

    #[test]
    fn test_load_each_format_alone() {
        let collection = sample(2);
        for format in Format::ALL {
            let dir = tempfile::tempdir().unwrap();
            let paths = DatasetPaths::new(dir.path());
            std::fs::write(paths.path(format), format.encode(&collection).unwrap()).unwrap();

            let loaded = load_dataset(&paths);
            assert_eq!(loaded.source, Some(format));
            assert_eq!(loaded.collection, collection, "{}", format);
        }
    }

    #[test]
    fn test_corrupt_file_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DatasetPaths::new(dir.path());
        std::fs::write(paths.path(Format::GeoPackage), b"not a database").unwrap();
        std::fs::write(paths.path(Format::GeoJson), Format::GeoJson.encode(&sample(2)).unwrap())
            .unwrap();

        let loaded = load_dataset(&paths);
        assert_eq!(loaded.source, Some(Format::GeoJson));
        assert_eq!(loaded.collection.len(), 2);
        assert_eq!(loaded.unreadable, [Format::GeoPackage]);
    }

    #[test]
    fn test_unreadable_only_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DatasetPaths::new(dir.path());
        std::fs::write(paths.path(Format::Parquet), b"PAR1 truncated").unwrap();

        let loaded = load_dataset(&paths);
        assert!(loaded.collection.is_empty());
        assert_eq!(loaded.source, None);
        assert_eq!(loaded.unreadable, [Format::Parquet]);
    }

    #[test]
    fn test_undecodable_features_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DatasetPaths::new(dir.path());
        let doc = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature",
                 "properties": {"name": "keep1", "timestamp": "2024-01-01T00:00:00Z"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
                {"type": "Feature",
                 "properties": {"name": "no geometry", "timestamp": "2024-01-01T00:00:00Z"},
                 "geometry": null},
                {"type": "Feature",
                 "properties": {"name": "keep2", "timestamp": "2024-01-02T00:00:00Z"},
                 "geometry": {"type": "Polygon", "coordinates": [[[2,0],[3,0],[3,1],[2,1],[2,0]]]}}
            ]
        }"#;
        std::fs::write(paths.path(Format::GeoJson), doc).unwrap();

        let loaded = load_dataset(&paths);
        assert_eq!(loaded.source, Some(Format::GeoJson));
        assert!(loaded.unreadable.is_empty());
        let names: Vec<&str> = loaded.collection.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["keep1", "keep2"]);
    }

    #[test]
    fn test_multipolygon_round_trips_through_every_format() {
        let parts = |x: f64| match square(x, 52.0, 0.5).into_inner() {
            geo::Geometry::Polygon(poly) => poly,
            other => panic!("unexpected {:?}", other),
        };
        let multi = geo::Geometry::MultiPolygon(geo::MultiPolygon::new(vec![parts(13.0), parts(14.0)]));
        let geometry = match classify(&multi) {
            Validity::Valid(geometry) => geometry,
            other => panic!("multipolygon classified as {:?}", other),
        };
        let mut collection = sample(1);
        collection.append("Two lakes".into(), at(1_700_000_500), geometry);

        let dir = tempfile::tempdir().unwrap();
        let paths = DatasetPaths::new(dir.path());
        persist_dataset(&collection, &paths).unwrap();

        for format in Format::ALL {
            let only = tempfile::tempdir().unwrap();
            std::fs::copy(paths.path(format), only.path().join(format.file_name())).unwrap();
            let loaded = load_dataset(&DatasetPaths::new(only.path()));
            assert_eq!(loaded.source, Some(format));
            assert_eq!(loaded.collection, collection, "{}", format);
            assert!(matches!(
                loaded.collection.last().map(|r| &r.geometry),
                Some(geo::Geometry::MultiPolygon(_))
            ));
        }
    }

    #[test]
    fn test_invalid_records_are_dropped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DatasetPaths::new(dir.path());
        let doc = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature",
                 "properties": {"name": "bowtie", "timestamp": "2024-01-01T00:00:00Z"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,1],[1,0],[0,1],[0,0]]]}},
                {"type": "Feature",
                 "properties": {"name": "ok", "timestamp": "2024-01-01T00:00:00Z"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}}
            ]
        }"#;
        std::fs::write(paths.path(Format::GeoJson), doc).unwrap();

        let loaded = load_dataset(&paths);
        let names: Vec<&str> = loaded.collection.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["ok"]);
    }

    #[test]
    fn test_failed_replace_keeps_previous_geopackage() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DatasetPaths::new(dir.path().join("data"));
        persist_dataset(&sample(1), &paths).unwrap();

        // a directory squatting on the GeoPackage target makes its rename fail
        std::fs::remove_file(paths.path(Format::GeoPackage)).unwrap();
        std::fs::create_dir(paths.path(Format::GeoPackage)).unwrap();
        std::fs::write(paths.path(Format::GeoPackage).join("keep"), b"x").unwrap();

        let err = persist_dataset(&sample(2), &paths).unwrap_err();
        assert!(matches!(
            err,
            AoiError::Persistence {
                format: Format::GeoPackage,
                ..
            }
        ));
        assert!(paths.path(Format::GeoPackage).join("keep").exists());
    }

    #[test]
    fn test_format_labels() {
        assert_eq!(Format::GeoJson.to_string(), "GeoJSON");
        assert_eq!(Format::GeoPackage.mime_type(), "application/geopackage+sqlite3");
        assert_eq!(Format::Parquet.file_name(), "aois.parquet");
    }
}
