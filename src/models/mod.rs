// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data models: saved AOIs, drawings and the session tying them together.

pub mod aoi;
pub mod drawing;
pub mod session;
