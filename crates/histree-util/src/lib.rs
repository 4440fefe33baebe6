//! Shared utilities for histree.
//!
//! This crate provides common utilities used across the histree workspace:
//! - Logging setup with tracing
//! - Data directory resolution and path utilities
//! - RAII-based timing for operation measurement

pub mod log;
pub mod path;
pub mod timing;

pub use timing::TimingGuard;
