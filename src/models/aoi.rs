// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Area of interest records and the append-only collection that holds them.

use crate::util::validation::ValidGeometry;
use chrono::{DateTime, Utc};
use geo::Geometry;

/// EPSG code of the only coordinate reference system the dataset uses.
pub const EPSG_4326: i32 = 4326;

/// A named, timestamped polygon in longitude/latitude.
#[derive(Debug, Clone, PartialEq)]
pub struct AoiRecord {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub geometry: Geometry<f64>,
}

impl AoiRecord {
    /// Build a record from a geometry that already passed validation.
    pub fn new(name: String, timestamp: DateTime<Utc>, geometry: ValidGeometry) -> Self {
        Self {
            name,
            timestamp,
            geometry: geometry.into_inner(),
        }
    }
}

/// Ordered collection of saved AOIs.
///
/// Records can only be appended, and only with a [`ValidGeometry`], so
/// every geometry held here is non-empty and valid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AoiCollection {
    records: Vec<AoiRecord>,
}

impl AoiCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record at the end of the collection.
    pub fn append(&mut self, name: String, timestamp: DateTime<Utc>, geometry: ValidGeometry) {
        self.records.push(AoiRecord::new(name, timestamp, geometry));
    }

    /// Name suggested for the next record: `AOI {n}` with n = len + 1.
    pub fn default_name(&self) -> String {
        format!("AOI {}", self.records.len() + 1)
    }

    pub fn records(&self) -> &[AoiRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&AoiRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Latest timestamp in the collection, if any.
    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.records.iter().map(|r| r.timestamp).max()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AoiRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a AoiCollection {
    type Item = &'a AoiRecord;
    type IntoIter = std::slice::Iter<'a, AoiRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
