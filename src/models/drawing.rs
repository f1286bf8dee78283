// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Transient drawings made on the map.
//!
//! The drawing buffer lives as long as the map widget and is separate from
//! the saved collection: it holds every shape sketched so far, and only
//! the last one that has not been saved yet is considered current.

use geo::{Coord, Geometry, LineString, Polygon};

/// A longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<LonLat> for Coord<f64> {
    fn from(p: LonLat) -> Self {
        Coord { x: p.lon, y: p.lat }
    }
}

/// Kind of shape a drawing was made with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Polygon,
    Rectangle,
}

/// One finished or in-progress shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    pub kind: ShapeKind,
    pub vertices: Vec<LonLat>,
    pub saved: bool,
}

impl Drawing {
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            vertices: Vec::new(),
            saved: false,
        }
    }

    /// Axis-aligned rectangle spanned by two opposite corners.
    pub fn rectangle(a: LonLat, b: LonLat) -> Self {
        let (west, east) = (a.lon.min(b.lon), a.lon.max(b.lon));
        let (south, north) = (a.lat.min(b.lat), a.lat.max(b.lat));
        Self {
            kind: ShapeKind::Rectangle,
            vertices: vec![
                LonLat::new(west, south),
                LonLat::new(east, south),
                LonLat::new(east, north),
                LonLat::new(west, north),
            ],
            saved: false,
        }
    }

    pub fn add_vertex(&mut self, point: LonLat) {
        self.vertices.push(point);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// A polygon needs three vertices before it can be closed.
    pub fn can_close(&self) -> bool {
        self.vertices.len() >= 3
    }

    /// The drawing as a closed polygon; empty if there are no vertices.
    pub fn to_geometry(&self) -> Geometry<f64> {
        let ring: Vec<Coord<f64>> = self.vertices.iter().copied().map(Coord::from).collect();
        // LineString is closed by Polygon::new
        Geometry::Polygon(Polygon::new(LineString::new(ring), vec![]))
    }
}

/// Every shape drawn during the lifetime of the map widget.
#[derive(Debug, Clone, Default)]
pub struct DrawingBuffer {
    finished: Vec<Drawing>,
    in_progress: Option<Drawing>,
}

impl DrawingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex to the polygon being drawn, starting one if needed.
    pub fn add_polygon_vertex(&mut self, point: LonLat) {
        self.in_progress
            .get_or_insert_with(|| Drawing::new(ShapeKind::Polygon))
            .add_vertex(point);
    }

    /// Close the in-progress polygon. Returns false if it is too short.
    pub fn finish_polygon(&mut self) -> bool {
        match self.in_progress.take() {
            Some(drawing) if drawing.can_close() => {
                log::info!("Finished polygon with {} vertices", drawing.vertex_count());
                self.finished.push(drawing);
                true
            }
            other => {
                self.in_progress = other;
                false
            }
        }
    }

    pub fn push(&mut self, drawing: Drawing) {
        self.finished.push(drawing);
    }

    pub fn cancel(&mut self) {
        self.in_progress = None;
    }

    /// Forget every drawing, finished or not.
    pub fn clear(&mut self) {
        self.finished.clear();
        self.in_progress = None;
    }

    pub fn all(&self) -> &[Drawing] {
        &self.finished
    }

    pub fn in_progress(&self) -> Option<&Drawing> {
        self.in_progress.as_ref()
    }

    /// The most recent drawing, unless it has already been saved.
    pub fn current(&self) -> Option<&Drawing> {
        self.finished.last().filter(|d| !d.saved)
    }

    pub fn mark_current_saved(&mut self) {
        if let Some(drawing) = self.finished.last_mut() {
            drawing.saved = true;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.finished.is_empty() && self.in_progress.is_none()
    }
}
