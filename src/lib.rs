//! # Simdsv
//!
//! SIMD-accelerated CSV parsing core.
//!
//! This crate turns a contiguous byte buffer into a column-oriented, typed
//! representation of a CSV (or similar delimited) file. Field boundaries are
//! located 64 bytes at a time with bitmask kernels that honor quoting and
//! backslash escaping across block boundaries, and scalar fallbacks produce
//! identical output everywhere SIMD is unavailable.
//!
//! ## Module Organization
//!
//! - [`scan`] - Pure 64-byte block kernels: equality bitmasks, escape-parity
//!   masks, inclusive prefix XOR
//! - [`fields`] - The boundary-scanning [`FieldScanner`] iterator with its
//!   per-block boundary cache
//! - [`line`] - Row parsing: unescaping, trimming, null detection, column
//!   dispatch
//! - [`infer`] - Per-column type inference over a bounded row sample
//! - [`format`] - Format-string (strptime-style) datetime parsing
//! - [`config`] - The [`CsvOptions`] value
//!
//! ## Quick Start
//!
//! ```
//! use simdsv::{CsvOptions, FieldScanner};
//!
//! let data = b"name,city\nada,london\n";
//! let options = CsvOptions::default();
//!
//! let fields: Vec<_> = FieldScanner::new(data, &options).collect();
//! assert_eq!(fields.len(), 4);
//! assert_eq!(fields[2].bytes(data), b"ada");
//! ```
//!
//! ## Scope
//!
//! The core is a library with no I/O of its own: callers hand it borrowed
//! byte buffers and column builders, and drive it row by row. Splitting a
//! file into chunks, memory mapping, and storage layout belong to callers.
//!
//! ## Features
//!
//! - `serde` - Enable serialization/deserialization for configuration types
//! - `scalar-scan` - Force the scalar block kernels (for benchmarking)

// =============================================================================
// Core modules (leaves first)
// =============================================================================

/// 64-byte block kernels for boundary scanning.
pub mod scan;

/// Configuration for CSV parsing.
pub mod config;

/// Field boundary scanning.
pub mod fields;

/// Row parsing against column builders.
pub mod line;

/// Type inference over a row sample.
pub mod infer;

/// Format-string datetime parsing.
pub mod format;

// =============================================================================
// Public re-exports (convenience)
// =============================================================================

pub use config::CsvOptions;
pub use fields::{Field, FieldScanner};
pub use format::{parse_time, FormatError, FormatLocale, FormatParser, ParsedDateTime};
pub use infer::{DataType, TypeInference};
pub use line::{LineParser, RowReport};

// =============================================================================
// Core traits
// =============================================================================

/// Capability interface for column builders.
///
/// The core appends exactly one value (or NULL) per column per row; storage
/// layout, typed coercion, and failure policy are the builder's concern.
/// Builders must accept arbitrary byte values.
///
/// ```
/// use simdsv::ColumnSink;
///
/// #[derive(Default)]
/// struct Utf8Column {
///     values: Vec<Option<String>>,
/// }
///
/// impl ColumnSink for Utf8Column {
///     fn append(&mut self, value: &[u8]) {
///         self.values.push(Some(String::from_utf8_lossy(value).into_owned()));
///     }
///
///     fn append_null(&mut self) {
///         self.values.push(None);
///     }
/// }
/// ```
pub trait ColumnSink {
    /// Append one parsed value.
    fn append(&mut self, value: &[u8]);

    /// Append a NULL.
    fn append_null(&mut self);
}
