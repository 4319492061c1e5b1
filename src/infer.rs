//! Probabilistic type inference over a bounded row sample.
//!
//! Each sampled field is classified into a [`DataType`], and per-column types
//! widen monotonically across rows: once a column reaches STRING nothing
//! lowers it. Inference never fails; anything unclassifiable is STRING.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use indexmap::IndexSet;

use crate::config::CsvOptions;
use crate::fields::FieldScanner;
use crate::line::{clean_field, split_literals};

/// Column data type, ordered by the widening lattice.
///
/// `Unknown < Na < Bool < Int32 < Int64 < Float64 < String` form a chain;
/// `Date` and `Timestamp` widen only with themselves (or NA/UNKNOWN) and any
/// other pairing goes to `String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DataType {
    /// No evidence yet. Becomes STRING if the sample ends without any.
    Unknown,
    /// Only null literals observed; absorbed by any other type.
    Na,
    Bool,
    Int32,
    Int64,
    Float64,
    Date,
    Timestamp,
    String,
}

impl DataType {
    /// Least upper bound of two observations in the widening lattice.
    pub fn widen(self, other: DataType) -> DataType {
        use DataType as T;
        match (self, other) {
            (a, b) if a == b => a,
            (T::Unknown, b) => b,
            (a, T::Unknown) => a,
            (T::Na, b) => b,
            (a, T::Na) => a,
            (T::Date, _) | (_, T::Date) | (T::Timestamp, _) | (_, T::Timestamp) => T::String,
            // Remaining pairs are distinct members of the chain.
            (a, b) => a.max(b),
        }
    }
}

/// Classifies fields and reduces per-column types over a row sample.
pub struct TypeInference {
    options: CsvOptions,
    null_set: IndexSet<Box<[u8]>>,
    true_set: IndexSet<Box<[u8]>>,
    false_set: IndexSet<Box<[u8]>>,
    empty_is_null: bool,
}

impl TypeInference {
    /// Build an inference engine, precomputing the literal sets.
    pub fn new(options: CsvOptions) -> Self {
        let (null_set, empty_is_null, _) = split_literals(&options.null_values);
        let (true_set, _, _) = split_literals(&options.true_values);
        let (false_set, _, _) = split_literals(&options.false_values);
        Self {
            options,
            null_set,
            true_set,
            false_set,
            empty_is_null,
        }
    }

    /// Classify a single field value.
    pub fn infer_field(&self, value: &[u8]) -> DataType {
        if value.is_empty() {
            return DataType::Na;
        }
        if self.null_set.contains(value) {
            return DataType::Na;
        }
        if self.true_set.contains(value) || self.false_set.contains(value) {
            return DataType::Bool;
        }

        if let Some(t) = self.classify_integer(value) {
            return t;
        }
        if self.parses_as_float(value) {
            return DataType::Float64;
        }
        if is_date_shaped(value) {
            return DataType::Date;
        }
        if is_timestamp_shaped(value) {
            return DataType::Timestamp;
        }

        DataType::String
    }

    /// Sample up to `max_rows` rows from `data` (typically the post-header
    /// range), widening `n_columns` column types. Blank lines and comment
    /// lines are skipped without counting against the sample.
    pub fn infer_from_sample(
        &self,
        data: &[u8],
        n_columns: usize,
        max_rows: usize,
    ) -> Vec<DataType> {
        let mut types = vec![DataType::Unknown; n_columns];
        if data.is_empty() || n_columns == 0 {
            finish_types(&mut types);
            return types;
        }

        let eol = self.options.eol;
        let comment = self.options.comment.as_bytes();
        let mut scratch = Vec::new();
        let mut offset = 0usize;
        let mut rows_sampled = 0usize;

        while offset < data.len() && rows_sampled < max_rows {
            if let Some(next) = skip_blank_line(data, offset, eol) {
                offset = next;
                continue;
            }
            if starts_with_comment(&data[offset..], comment) {
                offset = skip_to_next_line(data, offset, eol);
                continue;
            }

            // Classify one row's fields in place.
            let row = &data[offset..];
            let mut scanner = FieldScanner::new(row, &self.options);
            let mut col = 0usize;
            loop {
                let Some(field) = scanner.next() else { break };
                let row_ended = field.end() >= row.len() || row[field.end()] == eol;
                if col < n_columns {
                    let value =
                        clean_field(&self.options, row, &field, row_ended, &mut scratch);
                    types[col] = types[col].widen(self.infer_field(value));
                    col += 1;
                }
                if row_ended {
                    break;
                }
            }

            let consumed = row.len() - scanner.remaining();
            offset += consumed.max(1);
            rows_sampled += 1;
        }

        finish_types(&mut types);
        types
    }

    /// Integer leg of the classifier: optional sign plus decimal digits.
    ///
    /// Magnitude accumulation stops past 2^31 so the INT32 decision can admit
    /// `-2147483648` while sending `2147483648` to INT64.
    fn classify_integer(&self, value: &[u8]) -> Option<DataType> {
        let (negative, digits) = match value[0] {
            b'-' => (true, &value[1..]),
            b'+' => (false, &value[1..]),
            _ => (false, value),
        };
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return None;
        }

        if !self.options.guess_integer {
            return Some(DataType::Float64);
        }

        // Max int32 is 10 digits.
        if digits.len() <= 10 {
            let mut magnitude = 0u64;
            let mut overflow = false;
            for &d in digits {
                magnitude = magnitude * 10 + u64::from(d - b'0');
                if magnitude > 2_147_483_648 {
                    overflow = true;
                    break;
                }
            }
            let in_range = magnitude <= 2_147_483_647 || (negative && magnitude == 2_147_483_648);
            if !overflow && in_range {
                return Some(DataType::Int32);
            }
        }
        Some(DataType::Int64)
    }

    /// Float leg: full-length parse with the configured decimal mark.
    fn parses_as_float(&self, value: &[u8]) -> bool {
        let mut bytes = value;
        if bytes.first() == Some(&b'+') {
            bytes = &bytes[1..];
        }
        if bytes.is_empty() {
            return false;
        }

        let mark = self.options.decimal_mark;
        if mark == b'.' {
            return fast_float::parse::<f64, _>(bytes).is_ok();
        }
        // With an alien decimal mark a '.' stops the parse mid-value, so the
        // full-length requirement already rules these out.
        if bytes.contains(&b'.') {
            return false;
        }
        let normalized: Vec<u8> = bytes
            .iter()
            .map(|&b| if b == mark { b'.' } else { b })
            .collect();
        fast_float::parse::<f64, _>(&normalized).is_ok()
    }
}

fn finish_types(types: &mut [DataType]) {
    for t in types {
        if *t == DataType::Unknown {
            *t = DataType::String;
        }
    }
}

/// Exactly `DDDD-DD-DD` or `DDDD/DD/DD` with matching separators.
fn is_date_shaped(value: &[u8]) -> bool {
    value.len() == 10
        && (value[4] == b'-' || value[4] == b'/')
        && value[7] == value[4]
        && [0, 1, 2, 3, 5, 6, 8, 9]
            .iter()
            .all(|&i| value[i].is_ascii_digit())
}

/// `DDDD-DD-DD[T ]DD:DD:DD` prefix with matching date separators; fractional
/// seconds and timezone suffixes ride along unchecked.
fn is_timestamp_shaped(value: &[u8]) -> bool {
    value.len() >= 19
        && (value[4] == b'-' || value[4] == b'/')
        && value[7] == value[4]
        && (value[10] == b'T' || value[10] == b' ')
        && value[13] == b':'
        && value[16] == b':'
        && [11, 12, 14, 15, 17, 18]
            .iter()
            .all(|&i| value[i].is_ascii_digit())
}

/// When the line at `offset` holds only spaces, tabs, and carriage returns,
/// return the offset just past its terminator.
fn skip_blank_line(data: &[u8], offset: usize, eol: u8) -> Option<usize> {
    let mut i = offset;
    while i < data.len() && matches!(data[i], b' ' | b'\t' | b'\r') {
        i += 1;
    }
    if i >= data.len() {
        // Whitespace ran to the end of the sample.
        (i > offset).then_some(i)
    } else if data[i] == eol {
        Some(i + 1)
    } else {
        None
    }
}

/// Whether `data` starts with the (non-empty) comment prefix.
fn starts_with_comment(data: &[u8], comment: &[u8]) -> bool {
    !comment.is_empty() && data.len() >= comment.len() && data.starts_with(comment)
}

/// Offset past the current line's terminator, handling `eol`, `\r` + `eol`,
/// and bare `\r`.
fn skip_to_next_line(data: &[u8], mut offset: usize, eol: u8) -> usize {
    while offset < data.len() && data[offset] != eol && data[offset] != b'\r' {
        offset += 1;
    }
    if offset < data.len() && data[offset] == b'\r' {
        offset += 1;
        if offset < data.len() && data[offset] == eol {
            offset += 1;
        }
    } else if offset < data.len() && data[offset] == eol {
        offset += 1;
    }
    offset
}
