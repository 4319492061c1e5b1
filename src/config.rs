//! Configuration for CSV parsing.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for CSV parsing, captured at parser construction.
///
/// This is a plain value: cheap to clone, no hidden state. All parsing
/// components take it by reference.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CsvOptions {
    /// Field delimiter. A single byte takes the fast path; longer strings use
    /// a scalar scan.
    pub separator: String,
    /// Quote byte (default: `b'"'`). 0 disables quoting entirely.
    pub quote: u8,
    /// Row terminator byte (default: `b'\n'`). A `\r` before it is trimmed
    /// from the field.
    pub eol: u8,
    /// When true, `\` escapes the following byte and quote toggling ignores
    /// escaped quotes. When false, a quote inside a quoted field is escaped
    /// by doubling.
    pub escape_backslash: bool,
    /// Comma-separated literals that map to NULL. An empty element enables
    /// empty-is-null.
    pub null_values: String,
    /// Comma-separated literals that classify as BOOL true.
    pub true_values: String,
    /// Comma-separated literals that classify as BOOL false.
    pub false_values: String,
    /// Comment prefix; rows starting with it are skipped by type inference.
    /// Empty disables comment handling.
    pub comment: String,
    /// Trim ASCII space/tab around each field.
    pub trim_ws: bool,
    /// When false, integer-shaped values infer as FLOAT64.
    pub guess_integer: bool,
    /// Byte used as the decimal point for float parsing (default: `b'.'`).
    pub decimal_mark: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            separator: ",".to_string(),
            quote: b'"',
            eol: b'\n',
            escape_backslash: false,
            null_values: String::new(),
            true_values: "true,TRUE,True".to_string(),
            false_values: "false,FALSE,False".to_string(),
            comment: String::new(),
            trim_ws: true,
            guess_integer: true,
            decimal_mark: b'.',
        }
    }
}

impl CsvOptions {
    /// Create a CSV configuration (comma-separated).
    pub fn csv() -> Self {
        Self::default()
    }

    /// Create a TSV configuration (tab-separated).
    pub fn tsv() -> Self {
        Self {
            separator: "\t".to_string(),
            ..Self::default()
        }
    }

    /// Create a PSV configuration (pipe-separated).
    pub fn psv() -> Self {
        Self {
            separator: "|".to_string(),
            ..Self::default()
        }
    }

    /// Set the field delimiter.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Set the quote byte. 0 disables quoting.
    pub fn with_quote(mut self, quote: u8) -> Self {
        self.quote = quote;
        self
    }

    /// Set the row terminator byte.
    pub fn with_eol(mut self, eol: u8) -> Self {
        self.eol = eol;
        self
    }

    /// Enable or disable backslash escaping.
    pub fn with_escape_backslash(mut self, escape_backslash: bool) -> Self {
        self.escape_backslash = escape_backslash;
        self
    }

    /// Set the comma-separated NULL literals.
    pub fn with_null_values(mut self, null_values: impl Into<String>) -> Self {
        self.null_values = null_values.into();
        self
    }

    /// Set the comma-separated BOOL true literals.
    pub fn with_true_values(mut self, true_values: impl Into<String>) -> Self {
        self.true_values = true_values.into();
        self
    }

    /// Set the comma-separated BOOL false literals.
    pub fn with_false_values(mut self, false_values: impl Into<String>) -> Self {
        self.false_values = false_values.into();
        self
    }

    /// Set the comment prefix.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Enable or disable whitespace trimming.
    pub fn with_trim_ws(mut self, trim_ws: bool) -> Self {
        self.trim_ws = trim_ws;
        self
    }

    /// Enable or disable integer guessing.
    pub fn with_guess_integer(mut self, guess_integer: bool) -> Self {
        self.guess_integer = guess_integer;
        self
    }

    /// Set the decimal mark byte.
    pub fn with_decimal_mark(mut self, decimal_mark: u8) -> Self {
        self.decimal_mark = decimal_mark;
        self
    }

    /// The separator fast-path byte, when the separator is a single byte.
    pub(crate) fn separator_byte(&self) -> Option<u8> {
        let bytes = self.separator.as_bytes();
        if bytes.len() == 1 {
            Some(bytes[0])
        } else {
            None
        }
    }
}
