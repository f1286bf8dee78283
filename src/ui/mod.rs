// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! UI components for the AOI sketcher.

pub mod collection;
pub mod inspector;
pub mod map;
pub mod toolbar;
