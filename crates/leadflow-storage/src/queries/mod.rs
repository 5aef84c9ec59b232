// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules over the storage schema.

pub mod agents;
pub mod distribution;
pub mod leads;
pub mod presence;
