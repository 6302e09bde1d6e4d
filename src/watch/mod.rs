// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - The watch profiles of the watch entries and their anchored glob rules.
//! - Wiring up a debounced, cross-platform filesystem watcher.
//! - Reducing each debounced batch to task triggers, each task at most once.
//!
//! It does **not** know about task dependencies; it only turns filesystem
//! changes into task-level triggers.

pub mod event_handler;
pub mod path_utils;
pub mod patterns;
pub mod rules;
pub mod watcher;

pub use patterns::{AnchoredPattern, RuleSpec, WatchRule};
pub use rules::{WatchProfile, WatchSet};
pub use watcher::{WatcherHandle, spawn_watcher};
