// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! AOI Sketcher - draw, validate and collect Areas of Interest.
//!
//! A cross-platform desktop application for sketching polygons on a map
//! and keeping them as a growing dataset in GeoPackage, GeoJSON and
//! GeoParquet form.

mod app;
mod config;
mod error;
mod io;
mod models;
mod ui;
mod util;

use anyhow::Result;
use app::AoiApp;
use config::AppConfig;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let config = AppConfig::default();
    log::info!("Using data directory {}", config.data_dir.display());

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title(config.title.clone()),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "AOI Sketcher",
        options,
        Box::new(|cc| {
            // Basemap tiles are fetched and decoded by the egui_extras loaders
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(AoiApp::new(config)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
