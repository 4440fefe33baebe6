//! Command handlers for the histree CLI.
//!
//! Capture and restore commands live in `snapshot`, read-only views in
//! `history`.

pub mod history;
pub mod logging;
pub mod snapshot;

pub use history::*;
pub use logging::*;
pub use snapshot::*;
