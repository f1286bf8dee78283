// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Saved AOI viewer: attribute table, preview map and downloads.
//!
//! Everything here is derived from the in-memory collection on every
//! frame. Download payloads are encoded from the collection when the
//! button is pressed, not read back from the dataset files.

use crate::error::AoiError;
use crate::config::Basemap;
use crate::io::{feature_json::format_timestamp, Format};
use crate::models::{aoi::AoiCollection, drawing::LonLat};
use crate::ui::map::{draw_basemap, draw_geometry, SAVED_COLOR};
use crate::util::geometry::MapView;
use geo::BoundingRect;
use std::path::PathBuf;

/// Download buttons, in display order.
pub const DOWNLOADS: [Format; 3] = [Format::GeoJson, Format::GeoPackage, Format::Parquet];

/// One row of the attribute table; geometry is left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub index: usize,
    pub name: String,
    pub timestamp: String,
}

/// Attribute table rows for the collection.
pub fn table_rows(collection: &AoiCollection) -> Vec<TableRow> {
    collection
        .iter()
        .enumerate()
        .map(|(index, record)| TableRow {
            index,
            name: record.name.clone(),
            timestamp: format_timestamp(&record.timestamp),
        })
        .collect()
}

/// Bounding box of every geometry, as south-west and north-east corners.
pub fn extent(collection: &AoiCollection) -> Option<(LonLat, LonLat)> {
    collection
        .iter()
        .filter_map(|r| r.geometry.bounding_rect())
        .map(|r| (LonLat::new(r.min().x, r.min().y), LonLat::new(r.max().x, r.max().y)))
        .reduce(|(a0, a1), (b0, b1)| {
            (
                LonLat::new(a0.lon.min(b0.lon), a0.lat.min(b0.lat)),
                LonLat::new(a1.lon.max(b1.lon), a1.lat.max(b1.lat)),
            )
        })
}

/// Bytes a download button hands out for the given format.
pub fn download_payload(collection: &AoiCollection, format: Format) -> Result<Vec<u8>, AoiError> {
    format
        .encode(collection)
        .map_err(|source| AoiError::Export { format, source })
}

/// Result of viewer interaction.
pub enum CollectionAction {
    None,
    Download(Format, PathBuf),
}

/// Display the saved AOIs. Renders nothing for an empty collection.
pub fn show(
    ui: &mut egui::Ui,
    collection: &AoiCollection,
    basemap: Option<&Basemap>,
) -> CollectionAction {
    let mut action = CollectionAction::None;
    if collection.is_empty() {
        return action;
    }

    ui.heading("📦 Saved AOIs");

    egui::ScrollArea::vertical()
        .id_source("aoi_table")
        .max_height(180.0)
        .show(ui, |ui| {
            egui::Grid::new("aoi_table_grid")
                .striped(true)
                .num_columns(3)
                .show(ui, |ui| {
                    ui.strong("#");
                    ui.strong("name");
                    ui.strong("timestamp");
                    ui.end_row();

                    for row in table_rows(collection) {
                        ui.label(row.index.to_string());
                        ui.label(row.name);
                        ui.monospace(row.timestamp);
                        ui.end_row();
                    }
                });
        });

    ui.add_space(8.0);
    show_preview(ui, collection, basemap);
    ui.add_space(8.0);

    ui.horizontal_wrapped(|ui| {
        for format in DOWNLOADS {
            let button = ui
                .button(format!("⬇ Download {}", format))
                .on_hover_text(format!("{} ({})", format.file_name(), format.mime_type()));
            if button.clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter(format.to_string(), &[format.extension()])
                    .set_file_name(format.file_name())
                    .save_file()
                {
                    action = CollectionAction::Download(format, path);
                }
            }
        }
    });

    action
}

/// Small non-interactive map fitted to every saved geometry.
fn show_preview(ui: &mut egui::Ui, collection: &AoiCollection, basemap: Option<&Basemap>) {
    let size = egui::vec2(ui.available_width(), 200.0);
    let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
    let rect = response.rect;
    painter.rect_filled(rect, 4.0, egui::Color32::from_rgb(18, 18, 24));

    let Some((min, max)) = extent(collection) else {
        return;
    };
    let view = MapView::fit(min, max, (rect.width() as f64, rect.height() as f64), 12.0);
    let origin = (rect.center().x as f64, rect.center().y as f64);
    let painter = painter.with_clip_rect(rect);
    if let Some(basemap) = basemap {
        draw_basemap(ui, &painter, basemap, &view, rect);
    }
    for record in collection {
        draw_geometry(&painter, &record.geometry, &view, origin, SAVED_COLOR);
    }
}
