// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Per-session state shared by every step of the UI pipeline.
//!
//! The session owns the saved collection, the transient drawings and the
//! pending AOI name. It is created once when the app starts and handed by
//! reference to each step on every frame.

use super::aoi::{AoiCollection, AoiRecord};
use super::drawing::{Drawing, DrawingBuffer};
use crate::error::AoiError;
use crate::io::{persist_dataset, DatasetPaths, Format, LoadedDataset};
use crate::util::validation::{classify, Validity};
use chrono::{SubsecRound, Utc};

/// Message shown under the current geometry after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    Success(String),
    Error(String),
}

/// Everything the app remembers between frames.
#[derive(Debug)]
pub struct Session {
    paths: DatasetPaths,
    collection: AoiCollection,
    pub drawings: DrawingBuffer,
    /// Name typed by the user; `None` means "use the default name".
    pub pending_name: Option<String>,
    pub status: Option<StatusMessage>,
    /// Dataset files that failed to load; saves are refused while any exist.
    unreadable: Vec<Format>,
}

impl Session {
    pub fn new(loaded: LoadedDataset, paths: DatasetPaths) -> Self {
        let mut session = Self {
            paths,
            collection: loaded.collection,
            drawings: DrawingBuffer::new(),
            pending_name: None,
            status: None,
            unreadable: loaded.unreadable,
        };
        if let Err(err) = session.check_writable() {
            log::error!("{}", err);
            session.status = Some(StatusMessage::Error(err.to_string()));
        }
        session
    }

    /// Fails if saving would overwrite a dataset file that did not load.
    pub fn check_writable(&self) -> Result<(), AoiError> {
        match self.unreadable.first() {
            Some(&format) => Err(AoiError::UnreadableDataset {
                format,
                path: self.paths.path(format),
            }),
            None => Ok(()),
        }
    }

    pub fn collection(&self) -> &AoiCollection {
        &self.collection
    }

    pub fn paths(&self) -> &DatasetPaths {
        &self.paths
    }

    /// The drawing the save action applies to, if any.
    pub fn current_drawing(&self) -> Option<&Drawing> {
        self.drawings.current()
    }

    /// Validate the current drawing.
    pub fn classify_current(&self) -> Option<Validity> {
        self.current_drawing().map(|d| classify(&d.to_geometry()))
    }

    pub fn default_name(&self) -> String {
        self.collection.default_name()
    }

    /// Name the next save will use, exactly as typed; empty falls back to
    /// the default.
    pub fn effective_name(&self) -> String {
        match self.pending_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.default_name(),
        }
    }

    /// Called when a new shape is finished on the map.
    pub fn on_new_drawing(&mut self) {
        self.pending_name = None;
        if self.check_writable().is_ok() {
            self.status = None;
        }
    }

    /// Append the current drawing as a record and rewrite the dataset.
    ///
    /// The session only changes if all files were written.
    pub fn save_current(&mut self) -> Result<&AoiRecord, AoiError> {
        self.check_writable()?;
        let geometry = self
            .classify_current()
            .ok_or(AoiError::NothingToSave)?
            .into_result()?;
        let name = self.effective_name();

        // stored formats keep microseconds
        let timestamp = Utc::now().trunc_subsecs(6);

        let mut updated = self.collection.clone();
        updated.append(name, timestamp, geometry);
        persist_dataset(&updated, &self.paths)?;

        self.collection = updated;
        self.drawings.mark_current_saved();
        self.pending_name = None;

        let saved = self
            .collection
            .last()
            .ok_or(AoiError::NothingToSave)?;
        log::info!("Saved AOI {:?}, total: {}", saved.name, self.collection.len());
        Ok(saved)
    }

    /// Run a save and record its outcome as the status message.
    pub fn save_and_report(&mut self) {
        let status = match self.save_current() {
            Ok(record) => StatusMessage::Success(format!("Saved AOI '{}' to files.", record.name)),
            Err(err) => {
                log::error!("Save failed: {}", err);
                StatusMessage::Error(err.to_string())
            }
        };
        self.status = Some(status);
    }
}
