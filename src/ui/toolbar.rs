// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar and tool selection UI.
//!
//! Only the polygon and rectangle drawing tools exist; lines, circles and
//! markers are not offered, and drawn shapes cannot be edited.

use crate::app::Tool;

/// Result of toolbar interaction.
pub enum ToolbarAction {
    None,
    ClearDrawings,
}

/// Display the toolbar with tool selection buttons.
pub fn show(ui: &mut egui::Ui, current_tool: &mut Tool, has_drawings: bool) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        ui.label("Tools:");

        ui.separator();

        if ui.selectable_label(*current_tool == Tool::Pan, "✋ Pan").clicked() {
            *current_tool = Tool::Pan;
        }

        if ui.selectable_label(*current_tool == Tool::Polygon, "▱ Polygon").clicked() {
            *current_tool = Tool::Polygon;
        }

        if ui.selectable_label(*current_tool == Tool::Rectangle, "▭ Rectangle").clicked() {
            *current_tool = Tool::Rectangle;
        }

        ui.separator();

        if ui
            .add_enabled(has_drawings, egui::Button::new("🗑 Clear drawings"))
            .clicked()
        {
            action = ToolbarAction::ClearDrawings;
        }

        ui.separator();

        let tool_text = match current_tool {
            Tool::Pan => "Drag to move the map, scroll to zoom",
            Tool::Polygon => "Click to add vertices, double-click or click the first vertex to close",
            Tool::Rectangle => "Drag from one corner to the opposite corner",
        };

        ui.label(egui::RichText::new(tool_text).italics().weak());
    });

    action
}
