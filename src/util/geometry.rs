// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module converts between longitude/latitude and screen positions
//! using the Web Mercator projection slippy maps use.

use crate::models::drawing::LonLat;
use std::f64::consts::PI;

/// Side length of one map tile in points.
pub const TILE_SIZE: f64 = 256.0;
pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 18.0;
/// Latitude limit of the Web Mercator square.
pub const MAX_LATITUDE: f64 = 85.051_128_78;
/// Highest tile level tile servers commonly publish.
const MAX_TILE_ZOOM: u8 = 19;

/// Project to normalized Web Mercator, both axes in 0..1, y pointing south.
pub fn mercator(point: LonLat) -> (f64, f64) {
    let lat = point.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (point.lon + 180.0) / 360.0;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0;
    (x, y)
}

/// Inverse of [`mercator`].
pub fn inverse_mercator(x: f64, y: f64) -> LonLat {
    let lon = x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees();
    LonLat::new(lon, lat)
}

/// One basemap tile in XYZ numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileId {
    /// Fill a `{z}/{x}/{y}` URL template.
    pub fn url(&self, template: &str) -> String {
        template
            .replace("{z}", &self.zoom.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

/// A tile and where it lands on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePlacement {
    pub id: TileId,
    /// Top-left corner in screen points.
    pub min: (f64, f64),
    /// Side length in screen points.
    pub size: f64,
}

/// A view onto the map: centre and fractional zoom level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center: LonLat,
    pub zoom: f64,
}

impl MapView {
    pub fn new(center: LonLat, zoom: f64) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    /// Size of the whole world in points at this zoom.
    pub fn world_size(&self) -> f64 {
        TILE_SIZE * 2f64.powf(self.zoom)
    }

    /// Screen position of a point, for a viewport of the given size whose
    /// centre sits at `origin`.
    pub fn to_screen(&self, point: LonLat, origin: (f64, f64)) -> (f64, f64) {
        let world = self.world_size();
        let (cx, cy) = mercator(self.center);
        let (px, py) = mercator(point);
        (origin.0 + (px - cx) * world, origin.1 + (py - cy) * world)
    }

    /// Longitude/latitude under a screen position.
    pub fn to_lonlat(&self, screen: (f64, f64), origin: (f64, f64)) -> LonLat {
        let world = self.world_size();
        let (cx, cy) = mercator(self.center);
        let x = cx + (screen.0 - origin.0) / world;
        let y = (cy + (screen.1 - origin.1) / world).clamp(0.0, 1.0);
        inverse_mercator(x, y)
    }

    /// Move the view by a screen-space drag delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let world = self.world_size();
        let (cx, cy) = mercator(self.center);
        let x = cx - dx / world;
        let y = (cy - dy / world).clamp(0.0, 1.0);
        self.center = inverse_mercator(x, y);
    }

    /// Zoom by `delta` levels, keeping the point under `anchor` fixed.
    pub fn zoom_about(&mut self, delta: f64, anchor: (f64, f64), origin: (f64, f64)) {
        let before = self.to_lonlat(anchor, origin);
        self.zoom = (self.zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM);
        let (ax, ay) = self.to_screen(before, origin);
        self.pan(anchor.0 - ax, anchor.1 - ay);
    }

    /// A view showing the whole bounding box inside a viewport.
    pub fn fit(min: LonLat, max: LonLat, viewport: (f64, f64), padding: f64) -> Self {
        let (x0, y1) = mercator(min);
        let (x1, y0) = mercator(max);
        let center = inverse_mercator((x0 + x1) / 2.0, (y0 + y1) / 2.0);

        let span_x = (x1 - x0).abs().max(1e-9);
        let span_y = (y1 - y0).abs().max(1e-9);
        let usable_w = (viewport.0 - 2.0 * padding).max(1.0);
        let usable_h = (viewport.1 - 2.0 * padding).max(1.0);
        let world = (usable_w / span_x).min(usable_h / span_y);
        let zoom = (world / TILE_SIZE).log2();
        Self::new(center, zoom)
    }

    /// Tiles covering a viewport of `size` points centred on `origin`.
    ///
    /// Tiles come from the nearest whole zoom level and are scaled to the
    /// fractional zoom of the view.
    pub fn visible_tiles(&self, origin: (f64, f64), size: (f64, f64)) -> Vec<TilePlacement> {
        let zoom = (self.zoom.round().max(0.0) as u8).min(MAX_TILE_ZOOM);
        let count = 1u32 << zoom;
        let tile_size = self.world_size() / f64::from(count);

        // screen position of the world's top-left corner
        let (cx, cy) = mercator(self.center);
        let left = origin.0 - cx * self.world_size();
        let top = origin.1 - cy * self.world_size();

        let range = |start: f64, end: f64, offset: f64| {
            let first = ((start - offset) / tile_size).floor().max(0.0) as u32;
            let last = ((end - offset) / tile_size).floor().min(f64::from(count - 1));
            if last < 0.0 {
                return first..first;
            }
            first..(last as u32 + 1)
        };
        let xs = range(origin.0 - size.0 / 2.0, origin.0 + size.0 / 2.0, left);
        let ys = range(origin.1 - size.1 / 2.0, origin.1 + size.1 / 2.0, top);

        let mut tiles = Vec::new();
        for y in ys {
            for x in xs.clone() {
                tiles.push(TilePlacement {
                    id: TileId { x, y, zoom },
                    min: (
                        left + f64::from(x) * tile_size,
                        top + f64::from(y) * tile_size,
                    ),
                    size: tile_size,
                });
            }
        }
        tiles
    }

    /// Graticule spacing in degrees that gives a handful of lines.
    pub fn graticule_step(&self) -> f64 {
        const STEPS: [f64; 9] = [0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0];
        let degrees_per_point = 360.0 / self.world_size();
        let target = degrees_per_point * 120.0;
        STEPS
            .iter()
            .copied()
            .find(|step| *step >= target)
            .unwrap_or(30.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: (f64, f64) = (400.0, 300.0);

    #[test]
    fn test_mercator_roundtrip() {
        let berlin = LonLat::new(13.405, 52.52);
        let (x, y) = mercator(berlin);
        let back = inverse_mercator(x, y);
        assert!((back.lon - berlin.lon).abs() < 1e-9);
        assert!((back.lat - berlin.lat).abs() < 1e-9);
    }

    #[test]
    fn test_mercator_corners() {
        let (x, y) = mercator(LonLat::new(0.0, 0.0));
        assert!((x - 0.5).abs() < 1e-12);
        assert!((y - 0.5).abs() < 1e-12);

        let (x, y) = mercator(LonLat::new(-180.0, MAX_LATITUDE));
        assert!(x.abs() < 1e-12);
        assert!(y.abs() < 1e-6);
    }

    #[test]
    fn test_center_projects_to_origin() {
        let view = MapView::new(LonLat::new(13.405, 52.52), 5.0);
        let (sx, sy) = view.to_screen(view.center, ORIGIN);
        assert!((sx - ORIGIN.0).abs() < 1e-9);
        assert!((sy - ORIGIN.1).abs() < 1e-9);
    }

    #[test]
    fn test_screen_roundtrip() {
        let view = MapView::new(LonLat::new(13.405, 52.52), 7.5);
        let point = LonLat::new(14.0, 51.9);
        let screen = view.to_screen(point, ORIGIN);
        let back = view.to_lonlat(screen, ORIGIN);
        assert!((back.lon - point.lon).abs() < 1e-9);
        assert!((back.lat - point.lat).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let mut view = MapView::new(LonLat::new(0.0, 0.0), 4.0);
        let anchor = (500.0, 250.0);
        let under = view.to_lonlat(anchor, ORIGIN);

        view.zoom_about(1.5, anchor, ORIGIN);
        let (ax, ay) = view.to_screen(under, ORIGIN);
        assert!((ax - anchor.0).abs() < 1e-6);
        assert!((ay - anchor.1).abs() < 1e-6);
        assert_eq!(view.zoom, 5.5);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut view = MapView::new(LonLat::new(0.0, 0.0), 40.0);
        assert_eq!(view.zoom, MAX_ZOOM);
        view.zoom_about(-100.0, ORIGIN, ORIGIN);
        assert_eq!(view.zoom, MIN_ZOOM);
    }

    #[test]
    fn test_tile_url() {
        let tile = TileId { x: 17, y: 10, zoom: 5 };
        assert_eq!(
            tile.url("https://tiles.example/{z}/{x}/{y}.png"),
            "https://tiles.example/5/17/10.png"
        );
    }

    #[test]
    fn test_whole_world_tiles() {
        // zoom 1: the world is 512 points square and fits a 600x600 viewport
        let view = MapView::new(LonLat::new(0.0, 0.0), 1.0);
        let tiles = view.visible_tiles((300.0, 300.0), (600.0, 600.0));

        assert_eq!(tiles.len(), 4);
        assert_eq!(tiles[0].id, TileId { x: 0, y: 0, zoom: 1 });
        assert_eq!(tiles[0].min, (44.0, 44.0));
        assert_eq!(tiles[3].id, TileId { x: 1, y: 1, zoom: 1 });
        assert_eq!(tiles[3].min, (300.0, 300.0));
        assert!(tiles.iter().all(|t| t.size == 256.0));
    }

    #[test]
    fn test_tiles_cover_berlin_viewport() {
        let view = MapView::new(LonLat::new(13.405, 52.52), 5.4);
        let viewport = (800.0, 600.0);
        let origin = (400.0, 300.0);
        let tiles = view.visible_tiles(origin, viewport);

        assert!(tiles.iter().all(|t| t.id.zoom == 5));
        // the tile holding the centre is present and contains it
        let (cx, cy) = origin;
        let centre = tiles
            .iter()
            .find(|t| {
                (t.min.0..t.min.0 + t.size).contains(&cx) && (t.min.1..t.min.1 + t.size).contains(&cy)
            })
            .unwrap();
        assert_eq!((centre.id.x, centre.id.y), (17, 10));
        // every tile overlaps the viewport
        for t in &tiles {
            assert!(t.min.0 < viewport.0 && t.min.0 + t.size > 0.0);
            assert!(t.min.1 < viewport.1 && t.min.1 + t.size > 0.0);
        }
    }

    #[test]
    fn test_fit_contains_box() {
        let min = LonLat::new(13.0, 52.0);
        let max = LonLat::new(14.0, 53.0);
        let viewport = (300.0, 200.0);
        let view = MapView::fit(min, max, viewport, 10.0);

        let origin = (viewport.0 / 2.0, viewport.1 / 2.0);
        for corner in [min, max] {
            let (x, y) = view.to_screen(corner, origin);
            assert!((9.0..=291.0).contains(&x), "x = {}", x);
            assert!((9.0..=191.0).contains(&y), "y = {}", y);
        }
    }
}
