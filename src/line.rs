//! Row parsing: unescaping, trimming, null detection, column dispatch.
//!
//! [`LineParser`] consumes the [`FieldScanner`](crate::FieldScanner) iterator
//! for one logical row and appends each field to a matching column builder.
//! Structural anomalies never fail: short rows are NULL-padded, long rows
//! truncate at the column count, and an unterminated quote is reported as a
//! row-level flag with the partial field still delivered.

use indexmap::IndexSet;

use crate::config::CsvOptions;
use crate::fields::{Field, FieldScanner};
use crate::ColumnSink;

/// Outcome of parsing one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowReport {
    /// Fields parsed from the input before NULL padding.
    pub parsed: usize,
    /// The row ended inside an unterminated quoted field.
    pub open_quote: bool,
}

/// Parses one logical row at a time against a fixed set of column builders.
pub struct LineParser {
    options: CsvOptions,
    null_set: IndexSet<Box<[u8]>>,
    empty_is_null: bool,
    max_null_length: usize,
}

impl LineParser {
    /// Build a parser, precomputing the null-literal set from
    /// `options.null_values`.
    pub fn new(options: CsvOptions) -> Self {
        let (null_set, empty_is_null, max_null_length) = split_literals(&options.null_values);
        Self {
            options,
            null_set,
            empty_is_null,
            max_null_length,
        }
    }

    /// Parser configuration.
    pub fn options(&self) -> &CsvOptions {
        &self.options
    }

    /// Parse the first logical row of `bytes` as column names.
    ///
    /// Fields are unescaped and, when `trim_ws` is set, trimmed. Invalid
    /// UTF-8 is replaced lossily.
    pub fn parse_header(&self, bytes: &[u8]) -> Vec<String> {
        let mut headers = Vec::new();
        if bytes.is_empty() {
            return headers;
        }

        let mut scanner = FieldScanner::new(bytes, &self.options);
        let mut scratch = Vec::new();
        while let Some(field) = scanner.next() {
            let row_ended = self.row_ended(bytes, &field);
            let value = self.clean_field(bytes, &field, row_ended, &mut scratch);
            headers.push(String::from_utf8_lossy(value).into_owned());
            if row_ended {
                break;
            }
        }
        headers
    }

    /// Parse one row, appending exactly one value (or NULL) per column.
    ///
    /// Fields beyond the column count are discarded; missing trailing fields
    /// append NULL. Empty input appends nothing, mirroring the scanner's
    /// empty-field emission being a terminator artifact rather than data.
    pub fn parse_line(&self, bytes: &[u8], columns: &mut [Box<dyn ColumnSink>]) -> RowReport {
        if bytes.is_empty() || columns.is_empty() {
            return RowReport {
                parsed: 0,
                open_quote: false,
            };
        }

        let mut scanner = FieldScanner::new(bytes, &self.options);
        let mut scratch = Vec::new();
        let mut index = 0usize;

        while let Some(field) = scanner.next() {
            let row_ended = self.row_ended(bytes, &field);
            if index < columns.len() {
                let value = self.clean_field(bytes, &field, row_ended, &mut scratch);
                if self.is_null_value(value) {
                    columns[index].append_null();
                } else {
                    columns[index].append(value);
                }
                index += 1;
            }
            // Past the column count we keep consuming to the row terminator
            // and drop the excess fields.
            if row_ended {
                break;
            }
        }

        let parsed = index;
        for column in columns.iter_mut().skip(index) {
            column.append_null();
        }

        RowReport {
            parsed,
            open_quote: scanner.finished_inside_quote(),
        }
    }

    /// Whether `field` is the last of its row: it ran to the end of the
    /// input, or its boundary byte is the row terminator.
    fn row_ended(&self, bytes: &[u8], field: &Field) -> bool {
        field.end() >= bytes.len() || bytes[field.end()] == self.options.eol
    }

    /// Trim, strip quotes, and unescape one raw field.
    fn clean_field<'s>(
        &self,
        bytes: &'s [u8],
        field: &Field,
        row_ended: bool,
        scratch: &'s mut Vec<u8>,
    ) -> &'s [u8] {
        clean_field(&self.options, bytes, field, row_ended, scratch)
    }

    /// NULL literal check on the cleaned value.
    fn is_null_value(&self, value: &[u8]) -> bool {
        if value.is_empty() {
            return self.empty_is_null;
        }
        // Null literals are short; skip the set probe for anything longer.
        if value.len() > self.max_null_length {
            return false;
        }
        self.null_set.contains(value)
    }
}

/// Split a comma-separated literal list into a lookup set.
///
/// An empty element (including an empty list) flags empty-is-null; the
/// longest literal's length feeds the membership fast path.
pub(crate) fn split_literals(list: &str) -> (IndexSet<Box<[u8]>>, bool, usize) {
    let mut set = IndexSet::new();
    let mut empty = false;
    let mut max_len = 0;
    for literal in list.split(',') {
        if literal.is_empty() {
            empty = true;
        } else {
            max_len = max_len.max(literal.len());
            set.insert(literal.as_bytes().to_vec().into_boxed_slice());
        }
    }
    (set, empty, max_len)
}

/// Trim, strip quotes, and unescape one raw field into a borrowed or scratch
/// slice.
///
/// `row_ended` enables the CR pre-trim: a `\r` left before the row
/// terminator belongs to the line ending, not the field.
pub(crate) fn clean_field<'s>(
    options: &CsvOptions,
    bytes: &'s [u8],
    field: &Field,
    row_ended: bool,
    scratch: &'s mut Vec<u8>,
) -> &'s [u8] {
    let mut raw = field.bytes(bytes);

    if row_ended && raw.last() == Some(&b'\r') {
        raw = &raw[..raw.len() - 1];
    }

    if options.trim_ws {
        raw = trim_ascii_ws(raw);
    }

    if options.escape_backslash {
        if raw.contains(&b'\\') {
            scratch.clear();
            unescape_backslash(raw, options.quote, scratch);
            return scratch;
        }
        // No escapes present; only the outer quotes may need stripping.
        return strip_outer_quotes(raw, options.quote);
    }

    // Quoted-ness is judged on the trimmed bytes: padding before the opening
    // quote clears the scanner's flag but the quotes still wrap the value.
    let quoted =
        field.needs_unescape || (options.quote != 0 && raw.first() == Some(&options.quote));
    if quoted {
        let inner = strip_outer_quotes(raw, options.quote);
        if options.quote != 0 && inner.contains(&options.quote) {
            scratch.clear();
            unescape_doubled(inner, options.quote, scratch);
            return scratch;
        }
        return inner;
    }

    raw
}

fn trim_ascii_ws(mut value: &[u8]) -> &[u8] {
    while let Some((&first, rest)) = value.split_first() {
        if first == b' ' || first == b'\t' {
            value = rest;
        } else {
            break;
        }
    }
    while let Some((&last, rest)) = value.split_last() {
        if last == b' ' || last == b'\t' {
            value = rest;
        } else {
            break;
        }
    }
    value
}

/// Strip a surrounding quote pair, leaving unbalanced quotes alone.
fn strip_outer_quotes(value: &[u8], quote: u8) -> &[u8] {
    if quote != 0 && value.len() >= 2 && value[0] == quote && value[value.len() - 1] == quote {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Doubled-quote unescaping: `""` inside a quoted field becomes `"`.
fn unescape_doubled(inner: &[u8], quote: u8, out: &mut Vec<u8>) {
    out.reserve(inner.len());
    let mut i = 0;
    while i < inner.len() {
        let c = inner[i];
        out.push(c);
        if c == quote && i + 1 < inner.len() && inner[i + 1] == quote {
            i += 2;
        } else {
            i += 1;
        }
    }
}

/// Backslash unescaping: `\\` `\n` `\t` `\r` map to their characters, any
/// other escaped byte maps to itself (which covers the quote). Outer quotes
/// are dropped, escaped or embedded quotes are kept.
fn unescape_backslash(value: &[u8], quote: u8, out: &mut Vec<u8>) {
    let value = strip_outer_quotes(value, quote);
    out.reserve(value.len());
    let mut i = 0;
    while i < value.len() {
        let c = value[i];
        if c == b'\\' && i + 1 < value.len() {
            let next = value[i + 1];
            out.push(match next {
                b'n' => b'\n',
                b't' => b'\t',
                b'r' => b'\r',
                other => other,
            });
            i += 2;
        } else {
            out.push(c);
            i += 1;
        }
    }
}
