// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Current geometry panel.
//!
//! Shows the raw GeoJSON of the shape the save action applies to, the
//! validation verdict, and the name field with the save button.

use crate::error::AoiError;
use crate::io::feature_json;
use crate::models::session::{Session, StatusMessage};
use crate::util::validation::Validity;

const ERROR_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 90, 90);
const SUCCESS_COLOR: egui::Color32 = egui::Color32::from_rgb(0, 255, 170);

/// Result of panel interaction.
pub enum InspectorAction {
    None,
    Save,
}

/// Display the current geometry and the save form.
pub fn show(ui: &mut egui::Ui, session: &mut Session) -> InspectorAction {
    let mut action = InspectorAction::None;

    let Some(drawing) = session.current_drawing() else {
        if session.drawings.all().is_empty() {
            ui.label("ℹ Use the drawing tool (upper left) to sketch your Area of Interest.");
        } else {
            ui.label("ℹ Draw another shape to add a new Area of Interest.");
        }
        show_status(ui, &session.status);
        return action;
    };

    let geometry = drawing.to_geometry();
    ui.heading("📝 Current Geometry");
    egui::CollapsingHeader::new("GeoJSON")
        .default_open(false)
        .show(ui, |ui| {
            let json = feature_json::geometry_json(&geometry);
            let text = serde_json::to_string_pretty(&json).unwrap_or_default();
            egui::ScrollArea::vertical()
                .max_height(200.0)
                .show(ui, |ui| ui.monospace(text));
        });

    match session.classify_current() {
        Some(Validity::Empty) => error_label(ui, &AoiError::EmptyGeometry),
        Some(Validity::SelfInvalid) => error_label(ui, &AoiError::InvalidGeometry),
        Some(Validity::Valid(_)) => {
            let default_name = session.default_name();
            let name = session.pending_name.get_or_insert(default_name);

            ui.label("Give this AOI a name");
            ui.text_edit_singleline(name);

            if ui.button("💾 Save AOI").clicked() {
                action = InspectorAction::Save;
            }
        }
        None => {}
    }

    show_status(ui, &session.status);
    action
}

fn error_label(ui: &mut egui::Ui, err: &AoiError) {
    ui.colored_label(ERROR_COLOR, format!("❌ {}", err));
}

fn show_status(ui: &mut egui::Ui, status: &Option<StatusMessage>) {
    match status {
        Some(StatusMessage::Success(text)) => {
            ui.colored_label(SUCCESS_COLOR, format!("✅ {}", text));
        }
        Some(StatusMessage::Error(text)) => {
            ui.colored_label(ERROR_COLOR, format!("❌ {}", text));
        }
        None => {}
    }
}
