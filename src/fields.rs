//! Field boundary scanning.
//!
//! [`FieldScanner`] walks a byte slice and yields one [`Field`] per boundary
//! (separator or row terminator outside quotes and not escaped), in ascending
//! byte order. The hot path scans 64 bytes at a time with the block kernels
//! in [`crate::scan`] and caches every boundary found in the block, so
//! subsequent calls consume the cache without re-scanning.
//!
//! The scanner does not distinguish the last field of a row from an interior
//! field; callers observe row termination by inspecting the byte at
//! `field.end()`.

use crate::config::CsvOptions;
use crate::scan::{self, BLOCK_SIZE};

/// A single field located by [`FieldScanner`].
///
/// Offsets index the scanned input slice. The field bytes exclude the
/// boundary byte that ended it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Byte offset of the field start.
    pub start: usize,
    /// Field length in bytes.
    pub len: usize,
    /// The field starts with the quote character; quote stripping and
    /// unescaping may be required.
    pub needs_unescape: bool,
}

impl Field {
    /// Offset one past the last field byte (the boundary byte, if any).
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// The bytes of this field within the scanned input.
    #[inline]
    pub fn bytes<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.start..self.start + self.len]
    }
}

/// Iterator over field boundaries in a byte slice.
///
/// Single-byte separators take the SIMD hot path; multi-byte separators fall
/// back to a scalar scan that honors quote toggling and doubled-quote
/// escaping.
pub struct FieldScanner<'a> {
    data: &'a [u8],
    cursor: usize,
    separator: u8,
    quote_char: u8,
    quoting: bool,
    eol_char: u8,
    escape_backslash: bool,
    finished: bool,
    finished_inside_quote: bool,
    /// Whether the most recently consumed boundary byte was the row
    /// terminator. A trailing terminator closes the final row instead of
    /// opening a phantom empty field.
    last_end_was_eol: bool,
    /// End-of-field positions remaining in the current block, relative to
    /// `cursor`. Bits at positions already consumed are zero.
    previous_valid_ends: u64,
    /// 1 iff the last byte of the previous block was an unterminated escape.
    prev_escaped: u64,
    multi_sep: Option<Box<[u8]>>,
}

impl<'a> FieldScanner<'a> {
    /// Create a scanner over `data` with the given options.
    pub fn new(data: &'a [u8], options: &CsvOptions) -> Self {
        let sep_bytes = options.separator.as_bytes();
        let (separator, multi_sep) = match options.separator_byte() {
            Some(b) => (b, None),
            None if sep_bytes.len() > 1 => (0, Some(sep_bytes.to_vec().into_boxed_slice())),
            None => (b',', None),
        };

        Self {
            data,
            cursor: 0,
            separator,
            quote_char: options.quote,
            quoting: options.quote != 0,
            eol_char: options.eol,
            escape_backslash: options.escape_backslash,
            finished: false,
            finished_inside_quote: false,
            last_end_was_eol: false,
            previous_valid_ends: 0,
            prev_escaped: 0,
            multi_sep,
        }
    }

    /// Bytes not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    /// The scanner has yielded its final field.
    #[inline]
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// The input ended while a quoted field was still open.
    ///
    /// Meaningful once [`finished`](Self::finished) is true. The partial
    /// field is still emitted; policy is the caller's.
    #[inline]
    pub fn finished_inside_quote(&self) -> bool {
        self.finished_inside_quote
    }

    /// Emit the field ending at the boundary `pos` bytes past the cursor and
    /// step over the boundary byte.
    #[inline]
    fn emit(&mut self, pos: usize, needs_unescape: bool) -> Field {
        let field = Field {
            start: self.cursor,
            len: pos,
            needs_unescape,
        };
        self.last_end_was_eol = self.data[self.cursor + pos] == self.eol_char;
        self.cursor += pos + 1;
        field
    }

    /// Terminate at end of input with nothing left to scan.
    fn finish(&mut self) -> Option<Field> {
        self.finished = true;
        if self.last_end_was_eol {
            // The final row was closed by its terminator.
            return None;
        }
        // A trailing separator (or empty input) leaves one empty field.
        Some(Field {
            start: self.cursor,
            len: 0,
            needs_unescape: false,
        })
    }

    /// Terminate with the unbounded final field.
    fn finish_with(&mut self, needs_unescape: bool) -> Option<Field> {
        self.finished = true;
        let rest = &self.data[self.cursor..];
        // A quoted field that consumed the rest of the input is unclosed
        // unless it both starts and ends with the quote byte.
        if needs_unescape
            && !(rest.len() >= 2
                && rest[0] == self.quote_char
                && rest[rest.len() - 1] == self.quote_char)
        {
            self.finished_inside_quote = true;
        }
        let field = Field {
            start: self.cursor,
            len: rest.len(),
            needs_unescape,
        };
        self.cursor = self.data.len();
        Some(field)
    }

    /// Distance from the cursor to the next boundary, or `remaining()` when
    /// none exists.
    ///
    /// Per 64-byte block: build the separator/terminator mask, drop escaped
    /// bytes, drop bytes inside quotes (inclusive prefix XOR of the quote
    /// mask, corrected by the entering carry), then either consume the first
    /// set bit and cache the rest, or advance a full block. The tail runs the
    /// same state machine byte-at-a-time.
    fn scan_to_boundary(&mut self) -> usize {
        let data = &self.data[self.cursor..];
        let mut total = 0usize;
        let mut inside_quote = false;
        self.prev_escaped = 0;

        while data.len() - total > BLOCK_SIZE {
            let block = &data[total..total + BLOCK_SIZE];

            let mut end_mask = scan::scan_eq2(block, self.separator, self.eol_char);

            let mut escaped = 0u64;
            if self.escape_backslash {
                let bs_mask = scan::scan_eq(block, b'\\');
                let masks = scan::compute_escape_masks(bs_mask, self.prev_escaped);
                escaped = masks.escaped;
                self.prev_escaped = masks.carry;
                end_mask &= !escaped;
            }

            if self.quoting {
                // Escaped quotes do not toggle quote state.
                let quote_mask = scan::scan_eq(block, self.quote_char) & !escaped;
                let mut in_quote_mask = scan::prefix_xor_inclusive(quote_mask);
                if inside_quote {
                    in_quote_mask = !in_quote_mask;
                }
                inside_quote = in_quote_mask >> 63 != 0;
                end_mask &= !in_quote_mask;
            }

            if end_mask != 0 {
                let pos = end_mask.trailing_zeros() as usize;
                self.previous_valid_ends = if pos == BLOCK_SIZE - 1 {
                    0
                } else {
                    end_mask >> (pos + 1)
                };
                return total + pos;
            }
            total += BLOCK_SIZE;
        }

        // Scalar tail, continuing the same escape and quote state.
        let bytes = &data[total..];
        let mut in_quote = inside_quote;
        let mut i = 0usize;

        if self.escape_backslash {
            if self.prev_escaped != 0 && !bytes.is_empty() {
                // Last block ended mid-escape; the first byte is escaped.
                i = 1;
            }
            while i < bytes.len() {
                let c = bytes[i];
                if c == b'\\' && i + 1 < bytes.len() {
                    i += 2;
                    continue;
                }
                if self.quoting && c == self.quote_char {
                    in_quote = !in_quote;
                }
                if !in_quote && (c == self.separator || c == self.eol_char) {
                    return total + i;
                }
                i += 1;
            }
        } else {
            while i < bytes.len() {
                let c = bytes[i];
                if self.quoting && c == self.quote_char {
                    in_quote = !in_quote;
                }
                if !in_quote && (c == self.separator || c == self.eol_char) {
                    return total + i;
                }
                i += 1;
            }
        }

        data.len()
    }

    /// Scalar scan for multi-byte separators.
    fn next_multi_byte(&mut self) -> Option<Field> {
        if self.remaining() == 0 {
            return self.finish();
        }

        let data = self.data;
        let cursor = self.cursor;
        let bytes = &data[cursor..];
        let sep_len = self.multi_sep.as_ref().map_or(0, |s| s.len());
        let needs_unescape = self.quoting && bytes[0] == self.quote_char;

        let mut in_quote = false;
        let mut i = 0usize;
        while i < bytes.len() {
            let c = bytes[i];
            if self.quoting && c == self.quote_char {
                if in_quote && i + 1 < bytes.len() && bytes[i + 1] == self.quote_char {
                    // Doubled quote stays inside the field.
                    i += 2;
                    continue;
                }
                in_quote = !in_quote;
            }
            if !in_quote {
                if c == self.eol_char {
                    let field = Field {
                        start: cursor,
                        len: i,
                        needs_unescape,
                    };
                    self.last_end_was_eol = true;
                    self.cursor = cursor + i + 1;
                    return Some(field);
                }
                if i + sep_len <= bytes.len()
                    && self
                        .multi_sep
                        .as_deref()
                        .is_some_and(|sep| &bytes[i..i + sep_len] == sep)
                {
                    let field = Field {
                        start: cursor,
                        len: i,
                        needs_unescape,
                    };
                    self.last_end_was_eol = false;
                    self.cursor = cursor + i + sep_len;
                    return Some(field);
                }
            }
            i += 1;
        }

        self.finish_with(needs_unescape)
    }
}

impl<'a> Iterator for FieldScanner<'a> {
    type Item = Field;

    fn next(&mut self) -> Option<Field> {
        if self.finished {
            return None;
        }

        if self.multi_sep.is_some() {
            return self.next_multi_byte();
        }

        // Hot path: consume a boundary cached by the last block scan.
        if self.previous_valid_ends != 0 {
            let ends = self.previous_valid_ends;
            let pos = ends.trailing_zeros() as usize;
            self.previous_valid_ends = if pos == 63 { 0 } else { ends >> (pos + 1) };
            let needs_unescape = self.quoting && self.data[self.cursor] == self.quote_char;
            return Some(self.emit(pos, needs_unescape));
        }

        if self.remaining() == 0 {
            return self.finish();
        }

        let needs_unescape = self.quoting && self.data[self.cursor] == self.quote_char;
        let pos = self.scan_to_boundary();
        if pos >= self.remaining() {
            return self.finish_with(needs_unescape);
        }
        Some(self.emit(pos, needs_unescape))
    }
}
