// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometry sanity checks run before a drawing may be saved.

use crate::error::AoiError;
use geo::{Geometry, HasDimensions, Validation};

/// A polygon or multipolygon that is non-empty and valid.
///
/// Only [`classify`] hands these out.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidGeometry(Geometry<f64>);

impl ValidGeometry {
    #[cfg(test)]
    pub fn geometry(&self) -> &Geometry<f64> {
        &self.0
    }

    pub fn into_inner(self) -> Geometry<f64> {
        self.0
    }
}

/// Outcome of validating a candidate geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Validity {
    Empty,
    SelfInvalid,
    Valid(ValidGeometry),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid(_))
    }

    pub fn into_result(self) -> Result<ValidGeometry, AoiError> {
        match self {
            Validity::Empty => Err(AoiError::EmptyGeometry),
            Validity::SelfInvalid => Err(AoiError::InvalidGeometry),
            Validity::Valid(geometry) => Ok(geometry),
        }
    }
}

/// Classify a geometry as empty, invalid, or valid.
///
/// Only areal geometries can be AOIs; anything else that is non-empty is
/// reported as invalid. Nothing is repaired.
pub fn classify(geometry: &Geometry<f64>) -> Validity {
    if geometry.is_empty() {
        return Validity::Empty;
    }

    let areal = matches!(geometry, Geometry::Polygon(_) | Geometry::MultiPolygon(_));
    if !areal || !geometry.is_valid() {
        return Validity::SelfInvalid;
    }

    Validity::Valid(ValidGeometry(geometry.clone()))
}
