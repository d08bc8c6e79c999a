//! Core engine types and utilities for the Space Capital flight scene.
//!
//! This crate provides the foundational types used across the engine crates:
//! - Frame timing with clamped deltas
//! - Clocks (monotonic and manually driven)
//! - Cooperative cancellation for scheduled frame loops

pub mod cancel;
pub mod time;

pub use cancel::*;
pub use time::*;

// Re-export commonly used types
pub use glam::Vec2;
