// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Error taxonomy surfaced to the user interface.

use crate::io::Format;
use std::path::PathBuf;

/// Errors that end an interaction with a user-visible message.
#[derive(Debug, thiserror::Error)]
pub enum AoiError {
    #[error("Geometry is empty. Please draw a valid polygon.")]
    EmptyGeometry,

    #[error("Geometry is invalid. Please simplify or redraw and avoid self intersections and holes.")]
    InvalidGeometry,

    #[error("Failed to save the {format} file: {source:#}")]
    Persistence {
        format: Format,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to read {format} data: {source:#}")]
    Decode {
        format: Format,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to export {format}: {source:#}")]
    Export {
        format: Format,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "The existing {format} file {} could not be read, so saving is disabled to keep it \
         from being overwritten. Repair it or move it aside, then restart.",
        .path.display()
    )]
    UnreadableDataset { format: Format, path: PathBuf },

    #[error("There is no valid drawing to save")]
    NothingToSave,
}
