//! # Domain Models
//!
//! This crate contains pure domain types with minimal dependencies (`serde`, `serde_json`).
//! Keep it free of I/O and async. It holds data, the persisted key layout and a couple of
//! pure helpers.

pub mod config;
pub mod constants;
pub mod keys;
pub mod module;
pub mod value;

/// Every persisted value and every bus payload is plain JSON.
pub type Value = serde_json::Value;

/// A flat JSON object, used for the flag mapping and for settings records.
pub type Record = serde_json::Map<String, serde_json::Value>;
