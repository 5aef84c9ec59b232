// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drop-folder lead ingestion.
//!
//! External producers drop one JSON file per lead into a watched directory.
//! The watcher validates the small typed field set, preserves the full
//! object as the lead's opaque payload, persists it, and hands it to the
//! engine's automatic-assignment path.

pub mod parser;
pub mod watcher;

pub use parser::parse_lead;
pub use watcher::{DropFolderWatcher, IngestStats};
