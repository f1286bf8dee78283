// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! This module contains the main application structure that implements
//! the egui::App trait. Each frame runs the whole pipeline against the
//! session: map input, validation, the save form, then the saved AOIs.

use crate::config::{AppConfig, Basemap};
use crate::error::AoiError;
use crate::io::{load_dataset, DatasetPaths, Format};
use crate::models::drawing::Drawing;
use crate::models::session::{Session, StatusMessage};
use crate::ui::{collection, inspector, map, toolbar};
use crate::util::geometry::MapView;
use std::path::PathBuf;

/// Current map tool selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Pan,
    Polygon,
    Rectangle,
}

/// Main application state.
pub struct AoiApp {
    title: String,

    /// Currently selected map tool
    current_tool: Tool,

    /// Saved collection, drawings and form state
    session: Session,

    /// Map view and in-flight gestures
    map: map::MapState,

    basemap: Option<Basemap>,
}

impl AoiApp {
    /// Create the app, loading the dataset from the configured directory.
    pub fn new(config: AppConfig) -> Self {
        let paths = DatasetPaths::new(config.data_dir);
        let loaded = load_dataset(&paths);
        if let Some(format) = loaded.source {
            log::info!("Dataset loaded from {}", paths.path(format).display());
        }

        Self {
            title: config.title,
            current_tool: Tool::Polygon,
            session: Session::new(loaded, paths),
            map: map::MapState::new(MapView::new(config.map_center, config.map_zoom)),
            basemap: config.basemap,
        }
    }

    /// Write one download payload to the chosen path.
    fn download(&mut self, format: Format, path: PathBuf) {
        let result = collection::download_payload(self.session.collection(), format)
            .and_then(|bytes| {
                std::fs::write(&path, bytes).map_err(|e| AoiError::Export {
                    format,
                    source: e.into(),
                })
            });

        match result {
            Ok(()) => log::info!("Downloaded {} to {}", format, path.display()),
            Err(e) => {
                log::error!("Download failed: {}", e);
                self.session.status = Some(StatusMessage::Error(e.to_string()));
            }
        }
    }

    fn handle_map_action(&mut self, action: map::MapAction) {
        let drawings = &mut self.session.drawings;
        match action {
            map::MapAction::AddVertex(point) => {
                drawings.add_polygon_vertex(point);
                log::debug!("Added vertex at ({:.5}, {:.5})", point.lon, point.lat);
            }
            map::MapAction::ClosePolygon => {
                if drawings.finish_polygon() {
                    self.session.on_new_drawing();
                }
            }
            map::MapAction::FinishRectangle(a, b) => {
                drawings.push(Drawing::rectangle(a, b));
                log::info!("Finished rectangle, total drawings: {}", drawings.all().len());
                self.session.on_new_drawing();
            }
            map::MapAction::None => {}
        }
    }
}

impl eframe::App for AoiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.separator();
                ui.heading(format!("🗺 {}", self.title));
            });
        });

        // Toolbar
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            let has_drawings = !self.session.drawings.is_empty();
            if let toolbar::ToolbarAction::ClearDrawings =
                toolbar::show(ui, &mut self.current_tool, has_drawings)
            {
                self.session.drawings.clear();
                self.session.on_new_drawing();
                log::info!("Cleared drawings");
            }
        });

        egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            let collection = self.session.collection();
            let mut text = format!(
                "{} AOIs saved in {}",
                collection.len(),
                self.session.paths().dir().display()
            );
            if let Some(latest) = collection.latest_timestamp() {
                text.push_str(&format!(", last at {}", latest.format("%Y-%m-%d %H:%M:%S UTC")));
            }
            ui.label(egui::RichText::new(text).weak());
        });

        // Current geometry and saved AOIs (right side)
        let (inspector_action, collection_action) = egui::SidePanel::right("aois")
            .default_width(340.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .show(ui, |ui| {
                        let inspector_action = inspector::show(ui, &mut self.session);
                        ui.separator();
                        let collection_action = collection::show(
                            ui,
                            self.session.collection(),
                            self.basemap.as_ref(),
                        );
                        (inspector_action, collection_action)
                    })
                    .inner
            })
            .inner;

        if let inspector::InspectorAction::Save = inspector_action {
            self.session.save_and_report();
        }
        if let collection::CollectionAction::Download(format, path) = collection_action {
            self.download(format, path);
        }

        // Escape abandons the polygon being drawn
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.session.drawings.cancel();
        }

        // Main map (center)
        let map_action = egui::CentralPanel::default()
            .show(ctx, |ui| {
                map::show(
                    ui,
                    &mut self.map,
                    self.current_tool,
                    self.session.collection(),
                    &self.session.drawings,
                    self.basemap.as_ref(),
                )
            })
            .inner;

        self.handle_map_action(map_action);
    }
}
