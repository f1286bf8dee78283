// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Map canvas for sketching areas of interest.
//!
//! This module provides the main map area where users pan, zoom and draw
//! polygons or rectangles on top of a tile basemap and the saved AOIs.

use crate::app::Tool;
use crate::config::Basemap;
use crate::models::aoi::AoiCollection;
use crate::models::drawing::{Drawing, DrawingBuffer, LonLat};
use crate::util::geometry::MapView;
use geo::Geometry;

const BACKGROUND: egui::Color32 = egui::Color32::from_rgb(18, 18, 24);
const GRATICULE: egui::Color32 = egui::Color32::from_rgb(44, 44, 56);
pub const SAVED_COLOR: egui::Color32 = egui::Color32::from_rgb(0, 255, 170);
const DRAWING_COLOR: egui::Color32 = egui::Color32::from_rgb(120, 120, 140);
const CURRENT_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 0, 200);

/// Distance in points within which a click on the first vertex closes a polygon.
const CLOSE_RADIUS: f32 = 8.0;

/// Result of map interaction.
pub enum MapAction {
    None,
    AddVertex(LonLat),
    ClosePolygon,
    FinishRectangle(LonLat, LonLat),
}

/// Map state that survives between frames.
pub struct MapState {
    pub view: MapView,
    /// First corner of a rectangle being dragged out.
    rect_anchor: Option<LonLat>,
    /// Pointer position while dragging a rectangle.
    rect_cursor: Option<LonLat>,
}

impl MapState {
    pub fn new(view: MapView) -> Self {
        Self {
            view,
            rect_anchor: None,
            rect_cursor: None,
        }
    }
}

fn origin_of(rect: egui::Rect) -> (f64, f64) {
    (rect.center().x as f64, rect.center().y as f64)
}

fn to_pos(view: &MapView, point: LonLat, origin: (f64, f64)) -> egui::Pos2 {
    let (x, y) = view.to_screen(point, origin);
    egui::pos2(x as f32, y as f32)
}

fn to_lonlat(view: &MapView, pos: egui::Pos2, origin: (f64, f64)) -> LonLat {
    view.to_lonlat((pos.x as f64, pos.y as f64), origin)
}

/// Display the map and handle mouse interactions.
pub fn show(
    ui: &mut egui::Ui,
    state: &mut MapState,
    current_tool: Tool,
    collection: &AoiCollection,
    drawings: &DrawingBuffer,
    basemap: Option<&Basemap>,
) -> MapAction {
    let mut action = MapAction::None;

    // Leave room for the status line below the map
    let height = (ui.available_height() - 24.0).max(320.0);
    let size = egui::vec2(ui.available_width(), height);
    let (response, painter) = ui.allocate_painter(size, egui::Sense::click_and_drag());
    let rect = response.rect;
    let origin = origin_of(rect);

    // Zoom with the scroll wheel around the pointer
    if let Some(hover) = response.hover_pos() {
        let scroll = ui.input(|i| i.smooth_scroll_delta.y);
        if scroll != 0.0 {
            state
                .view
                .zoom_about(scroll as f64 / 200.0, (hover.x as f64, hover.y as f64), origin);
        }
    }

    // Panning: pan tool with the primary button, any tool with the secondary
    let pan_primary = current_tool == Tool::Pan
        || (current_tool == Tool::Polygon && drawings.in_progress().is_none());
    if (pan_primary && response.dragged_by(egui::PointerButton::Primary))
        || response.dragged_by(egui::PointerButton::Secondary)
    {
        let delta = response.drag_delta();
        state.view.pan(delta.x as f64, delta.y as f64);
    }

    match current_tool {
        Tool::Polygon => {
            if response.double_clicked() {
                action = MapAction::ClosePolygon;
            } else if response.clicked() {
                if let Some(pos) = response.interact_pointer_pos() {
                    let near_first = |first: &LonLat| {
                        to_pos(&state.view, *first, origin).distance(pos) <= CLOSE_RADIUS
                    };
                    let closes = drawings
                        .in_progress()
                        .is_some_and(|d| d.can_close() && d.vertices.first().is_some_and(near_first));
                    action = if closes {
                        MapAction::ClosePolygon
                    } else {
                        MapAction::AddVertex(to_lonlat(&state.view, pos, origin))
                    };
                }
            }
        }
        Tool::Rectangle => {
            if response.drag_started_by(egui::PointerButton::Primary) {
                state.rect_anchor = response
                    .interact_pointer_pos()
                    .map(|pos| to_lonlat(&state.view, pos, origin));
            }
            if response.dragged_by(egui::PointerButton::Primary) {
                state.rect_cursor = response
                    .interact_pointer_pos()
                    .map(|pos| to_lonlat(&state.view, pos, origin));
            }
            if response.drag_stopped_by(egui::PointerButton::Primary) {
                if let (Some(a), Some(b)) = (state.rect_anchor.take(), state.rect_cursor.take()) {
                    action = MapAction::FinishRectangle(a, b);
                }
            }
        }
        Tool::Pan => {}
    }

    // Background, then tiles or a graticule
    painter.rect_filled(rect, 0.0, BACKGROUND);
    match basemap {
        Some(basemap) => draw_basemap(ui, &painter, basemap, &state.view, rect),
        None => draw_graticule(&painter, &state.view, rect),
    }

    // Saved AOIs
    for record in collection {
        draw_geometry(&painter, &record.geometry, &state.view, origin, SAVED_COLOR);
    }

    // Drawing buffer; the current one is highlighted
    let last = drawings.all().len().saturating_sub(1);
    for (i, drawing) in drawings.all().iter().enumerate() {
        if drawing.saved {
            continue;
        }
        let color = if i == last { CURRENT_COLOR } else { DRAWING_COLOR };
        draw_drawing(&painter, drawing, &state.view, origin, color, false);
    }
    if let Some(drawing) = drawings.in_progress() {
        draw_drawing(&painter, drawing, &state.view, origin, CURRENT_COLOR, true);
    }
    if let (Some(a), Some(b)) = (state.rect_anchor, state.rect_cursor) {
        let preview = Drawing::rectangle(a, b);
        draw_drawing(&painter, &preview, &state.view, origin, CURRENT_COLOR, false);
    }

    // Status line
    ui.horizontal(|ui| {
        ui.label(format!("Current tool: {:?}", current_tool));
        ui.separator();
        ui.label(format!("Zoom {:.1}", state.view.zoom));
        if let Some(hover) = response.hover_pos() {
            let p = to_lonlat(&state.view, hover, origin);
            ui.separator();
            ui.label(format!("lon {:.5}, lat {:.5}", p.lon, p.lat));
        }
    });

    action
}

/// Paint the basemap tiles covering `rect`, with the attribution in the corner.
pub fn draw_basemap(
    ui: &mut egui::Ui,
    painter: &egui::Painter,
    basemap: &Basemap,
    view: &MapView,
    rect: egui::Rect,
) {
    let mut tiles_ui = ui.child_ui(rect, *ui.layout(), None);
    tiles_ui.set_clip_rect(rect.intersect(ui.clip_rect()));

    let size = (rect.width() as f64, rect.height() as f64);
    for tile in view.visible_tiles(origin_of(rect), size) {
        let min = egui::pos2(tile.min.0 as f32, tile.min.1 as f32);
        let tile_rect = egui::Rect::from_min_size(min, egui::Vec2::splat(tile.size as f32));
        egui::Image::new(tile.id.url(&basemap.url_template))
            .show_loading_spinner(false)
            .paint_at(&tiles_ui, tile_rect);
    }

    painter.text(
        rect.right_bottom() - egui::vec2(4.0, 2.0),
        egui::Align2::RIGHT_BOTTOM,
        &basemap.attribution,
        egui::FontId::proportional(10.0),
        egui::Color32::from_gray(160),
    );
}

fn draw_graticule(painter: &egui::Painter, view: &MapView, rect: egui::Rect) {
    let origin = origin_of(rect);
    let step = view.graticule_step();
    let top_left = to_lonlat(view, rect.left_top(), origin);
    let bottom_right = to_lonlat(view, rect.right_bottom(), origin);
    let stroke = egui::Stroke::new(1.0, GRATICULE);

    let mut lon = (top_left.lon / step).floor() * step;
    while lon <= bottom_right.lon {
        let x = to_pos(view, LonLat::new(lon, 0.0), origin).x;
        painter.line_segment([egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())], stroke);
        lon += step;
    }

    let mut lat = (bottom_right.lat / step).floor() * step;
    while lat <= top_left.lat {
        let y = to_pos(view, LonLat::new(0.0, lat), origin).y;
        painter.line_segment([egui::pos2(rect.left(), y), egui::pos2(rect.right(), y)], stroke);
        lat += step;
    }
}

/// Draw the rings of a polygon or multipolygon.
pub fn draw_geometry(
    painter: &egui::Painter,
    geometry: &Geometry<f64>,
    view: &MapView,
    origin: (f64, f64),
    color: egui::Color32,
) {
    let polygons: Vec<&geo::Polygon<f64>> = match geometry {
        Geometry::Polygon(poly) => vec![poly],
        Geometry::MultiPolygon(multi) => multi.0.iter().collect(),
        _ => return,
    };

    let stroke = egui::Stroke::new(2.0, color);
    for poly in polygons {
        for ring in std::iter::once(poly.exterior()).chain(poly.interiors()) {
            let points: Vec<egui::Pos2> = ring
                .coords()
                .map(|c| to_pos(view, LonLat::new(c.x, c.y), origin))
                .collect();
            painter.add(egui::Shape::line(points, stroke));
        }
    }
}

/// Draw a drawing's outline and vertices.
fn draw_drawing(
    painter: &egui::Painter,
    drawing: &Drawing,
    view: &MapView,
    origin: (f64, f64),
    color: egui::Color32,
    is_in_progress: bool,
) {
    if drawing.vertices.is_empty() {
        return;
    }

    let mut points: Vec<egui::Pos2> = drawing
        .vertices
        .iter()
        .map(|p| to_pos(view, *p, origin))
        .collect();

    // In-progress polygons stay open
    if !is_in_progress {
        points.push(points[0]);
    }
    painter.add(egui::Shape::line(points.clone(), egui::Stroke::new(2.0, color)));

    let vertex_color = if is_in_progress {
        egui::Color32::WHITE
    } else {
        color
    };
    for point in &points {
        painter.circle_filled(*point, 4.0, vertex_color);
        painter.circle_stroke(*point, 4.0, egui::Stroke::new(1.0, egui::Color32::BLACK));
    }
}
