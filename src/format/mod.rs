//! Format-string datetime parsing.
//!
//! [`FormatParser`] compiles a strptime-style format string once at
//! construction into a token sequence; [`FormatParser::parse`] walks the
//! tokens against an input value and yields a [`ParsedDateTime`] on a full
//! match. Parsing mutates no shared state, so a parser can be shared across
//! threads.
//!
//! Whitespace in the format matches zero or more whitespace bytes in the
//! input. The whole input must be consumed, and the resulting calendar date
//! must be valid (leap years and month lengths are checked).

mod datetime;
mod locale;

pub use datetime::ParsedDateTime;
pub use locale::FormatLocale;

use std::fmt;
use std::sync::OnceLock;

use datetime::days_in_month;

/// Compiled format element.
///
/// Composite specifiers (`%D` `%F` `%T` `%R`) expand to primitive sequences
/// at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    /// Exact byte match.
    Literal(u8),
    /// Zero or more whitespace bytes.
    Whitespace,
    /// `%Y`: exactly 4 digits.
    Year4,
    /// `%y`: exactly 2 digits; <69 maps to 2000+, else 1900+.
    Year2,
    /// `%m`: 1-2 digits.
    Month,
    /// `%d`: 1-2 digits.
    Day,
    /// `%e`: optional leading space then 1-2 digits.
    DayPadded,
    /// `%H`: 1-2 digits, 0-23.
    Hour,
    /// `%I`: 1-2 digits, 1-12; stored modulo 12 for AM/PM resolution.
    Hour12,
    /// `%M`: 1-2 digits, 0-59.
    Minute,
    /// `%S`: 1-2 digits, 0-59.
    Second,
    /// `%OS`: seconds then optional `.` and fractional digits.
    SecondFrac,
    /// `%p`: locale AM/PM literal.
    AmPm,
    /// `%b`: locale month abbreviation.
    MonthAbbrev,
    /// `%B`: locale full month name.
    MonthName,
    /// `%a`: locale day abbreviation, consumed but not stored.
    WeekdayAbbrev,
    /// `%A`: locale full day name, consumed but not stored.
    WeekdayName,
    /// `%z`: `Z` or `±HH[:]MM`.
    TzOffset,
    /// `%Z`: a run of non-whitespace, not interpreted.
    TzName,
}

/// Error compiling a format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// A `%` specifier this parser does not support.
    UnknownSpecifier(u8),
    /// The format string ended inside a specifier.
    TruncatedSpecifier,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::UnknownSpecifier(b) => {
                write!(f, "unknown format specifier '%{}'", *b as char)
            }
            FormatError::TruncatedSpecifier => {
                write!(f, "format string ends inside a specifier")
            }
        }
    }
}

impl std::error::Error for FormatError {}

/// Format-string datetime parser.
///
/// Immutable after construction; `parse` is `&self` and thread-safe.
#[derive(Debug)]
pub struct FormatParser {
    format: String,
    tokens: Vec<Token>,
    locale: FormatLocale,
}

impl FormatParser {
    /// Compile `format` against `locale`.
    pub fn new(format: &str, locale: FormatLocale) -> Result<Self, FormatError> {
        let tokens = compile(format.as_bytes())?;
        Ok(Self {
            format: format.to_string(),
            tokens,
            locale,
        })
    }

    /// The format string this parser was compiled from.
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Parse `value` against the compiled format.
    ///
    /// Returns `None` unless the format matches, the input is fully
    /// consumed, and the date components form a valid calendar date.
    pub fn parse(&self, value: &[u8]) -> Option<ParsedDateTime> {
        let mut dt = ParsedDateTime::default();
        let mut pos = 0usize;
        // None until %p matches; then false = AM, true = PM.
        let mut am_pm: Option<bool> = None;

        for &token in &self.tokens {
            match token {
                Token::Whitespace => {
                    while pos < value.len() && value[pos].is_ascii_whitespace() {
                        pos += 1;
                    }
                }
                Token::Literal(c) => {
                    if value.get(pos) != Some(&c) {
                        return None;
                    }
                    pos += 1;
                }
                Token::Year4 => {
                    let (v, n) = parse_digits(value, &mut pos, 4);
                    if n != 4 {
                        return None;
                    }
                    dt.year = v as i32;
                }
                Token::Year2 => {
                    let (v, n) = parse_digits(value, &mut pos, 2);
                    if n != 2 {
                        return None;
                    }
                    dt.year = expand_two_digit_year(v);
                }
                Token::Month => {
                    let (v, n) = parse_digits(value, &mut pos, 2);
                    if n == 0 {
                        return None;
                    }
                    dt.month = v;
                }
                Token::Day => {
                    let (v, n) = parse_digits(value, &mut pos, 2);
                    if n == 0 {
                        return None;
                    }
                    dt.day = v;
                }
                Token::DayPadded => {
                    if value.get(pos) == Some(&b' ') {
                        pos += 1;
                    }
                    let (v, n) = parse_digits(value, &mut pos, 2);
                    if n == 0 {
                        return None;
                    }
                    dt.day = v;
                }
                Token::Hour => {
                    let (v, n) = parse_digits(value, &mut pos, 2);
                    if n == 0 || v > 23 {
                        return None;
                    }
                    dt.hour = v;
                }
                Token::Hour12 => {
                    let (v, n) = parse_digits(value, &mut pos, 2);
                    if n == 0 || !(1..=12).contains(&v) {
                        return None;
                    }
                    dt.hour = v % 12;
                }
                Token::Minute => {
                    let (v, n) = parse_digits(value, &mut pos, 2);
                    if n == 0 || v > 59 {
                        return None;
                    }
                    dt.minute = v;
                }
                Token::Second => {
                    let (v, n) = parse_digits(value, &mut pos, 2);
                    if n == 0 || v > 59 {
                        return None;
                    }
                    dt.second = v;
                }
                Token::SecondFrac => {
                    let (v, n) = parse_digits(value, &mut pos, 2);
                    if n == 0 || v > 59 {
                        return None;
                    }
                    dt.second = v;
                    if value.get(pos) == Some(&b'.') {
                        pos += 1;
                        let mut frac = 0.0f64;
                        let mut place = 0.1f64;
                        let mut count = 0;
                        while pos < value.len() && value[pos].is_ascii_digit() && count < 6 {
                            frac += f64::from(value[pos] - b'0') * place;
                            place *= 0.1;
                            pos += 1;
                            count += 1;
                        }
                        // Digits past microsecond precision are consumed and
                        // dropped.
                        while pos < value.len() && value[pos].is_ascii_digit() {
                            pos += 1;
                        }
                        dt.fractional_seconds = frac;
                    }
                }
                Token::AmPm => {
                    if let Some(n) = match_ci(value, pos, &self.locale.am) {
                        am_pm = Some(false);
                        pos += n;
                    } else if let Some(n) = match_ci(value, pos, &self.locale.pm) {
                        am_pm = Some(true);
                        pos += n;
                    } else {
                        return None;
                    }
                }
                Token::MonthAbbrev => {
                    let n = match_name_list(value, pos, &self.locale.month_abbrev)?;
                    dt.month = n.0 as u32 + 1;
                    pos += n.1;
                }
                Token::MonthName => {
                    let n = match_name_list(value, pos, &self.locale.month_names)?;
                    dt.month = n.0 as u32 + 1;
                    pos += n.1;
                }
                Token::WeekdayAbbrev => {
                    let n = match_name_list(value, pos, &self.locale.day_abbrev)?;
                    pos += n.1;
                }
                Token::WeekdayName => {
                    let n = match_name_list(value, pos, &self.locale.day_names)?;
                    pos += n.1;
                }
                Token::TzOffset => {
                    pos = self.parse_tz_offset(value, pos, &mut dt)?;
                }
                Token::TzName => {
                    while pos < value.len() && !value[pos].is_ascii_whitespace() {
                        pos += 1;
                    }
                }
            }
        }

        match am_pm {
            Some(true) if dt.hour != 12 => dt.hour += 12,
            Some(false) if dt.hour == 12 => dt.hour = 0,
            _ => {}
        }

        if pos != value.len() {
            return None;
        }
        if !(1..=12).contains(&dt.month) {
            return None;
        }
        if dt.day < 1 || dt.day > days_in_month(dt.year, dt.month) {
            return None;
        }

        Some(dt)
    }

    /// `Z`, or sign + 2-digit hours + optional `:` + optional 2-digit
    /// minutes. Returns the new input position.
    fn parse_tz_offset(&self, value: &[u8], mut pos: usize, dt: &mut ParsedDateTime) -> Option<usize> {
        if value.get(pos) == Some(&b'Z') {
            dt.tz_offset_minutes = 0;
            return Some(pos + 1);
        }
        let negative = match value.get(pos) {
            Some(&b'+') => false,
            Some(&b'-') => true,
            _ => return None,
        };
        pos += 1;

        let (hours, n) = parse_digits(value, &mut pos, 2);
        if n != 2 {
            return None;
        }
        if value.get(pos) == Some(&b':') {
            pos += 1;
        }
        let mut minutes = 0;
        if value.get(pos).is_some_and(u8::is_ascii_digit) {
            let (m, n) = parse_digits(value, &mut pos, 2);
            if n != 2 {
                return None;
            }
            minutes = m;
        }

        let mut offset = (hours * 60 + minutes) as i32;
        if negative {
            offset = -offset;
        }
        dt.tz_offset_minutes = offset;
        Some(pos)
    }
}

/// Expand a format string into tokens.
fn compile(format: &[u8]) -> Result<Vec<Token>, FormatError> {
    let mut tokens = Vec::with_capacity(format.len());
    let mut i = 0usize;
    while i < format.len() {
        let c = format[i];
        if c.is_ascii_whitespace() {
            tokens.push(Token::Whitespace);
            i += 1;
            continue;
        }
        if c != b'%' {
            tokens.push(Token::Literal(c));
            i += 1;
            continue;
        }

        i += 1;
        let Some(&spec) = format.get(i) else {
            return Err(FormatError::TruncatedSpecifier);
        };
        i += 1;
        match spec {
            b'Y' => tokens.push(Token::Year4),
            b'y' => tokens.push(Token::Year2),
            b'm' => tokens.push(Token::Month),
            b'd' => tokens.push(Token::Day),
            b'e' => tokens.push(Token::DayPadded),
            b'H' => tokens.push(Token::Hour),
            b'I' => tokens.push(Token::Hour12),
            b'M' => tokens.push(Token::Minute),
            b'S' => tokens.push(Token::Second),
            b'O' => {
                if format.get(i) != Some(&b'S') {
                    return Err(FormatError::UnknownSpecifier(b'O'));
                }
                i += 1;
                tokens.push(Token::SecondFrac);
            }
            b'p' => tokens.push(Token::AmPm),
            b'b' => tokens.push(Token::MonthAbbrev),
            b'B' => tokens.push(Token::MonthName),
            b'a' => tokens.push(Token::WeekdayAbbrev),
            b'A' => tokens.push(Token::WeekdayName),
            b'z' => tokens.push(Token::TzOffset),
            b'Z' => tokens.push(Token::TzName),
            b'%' => tokens.push(Token::Literal(b'%')),
            b'D' => tokens.extend_from_slice(&[
                Token::Month,
                Token::Literal(b'/'),
                Token::Day,
                Token::Literal(b'/'),
                Token::Year2,
            ]),
            b'F' => tokens.extend_from_slice(&[
                Token::Year4,
                Token::Literal(b'-'),
                Token::Month,
                Token::Literal(b'-'),
                Token::Day,
            ]),
            b'T' => tokens.extend_from_slice(&[
                Token::Hour,
                Token::Literal(b':'),
                Token::Minute,
                Token::Literal(b':'),
                Token::Second,
            ]),
            b'R' => tokens.extend_from_slice(&[
                Token::Hour,
                Token::Literal(b':'),
                Token::Minute,
            ]),
            other => return Err(FormatError::UnknownSpecifier(other)),
        }
    }
    Ok(tokens)
}

/// Parse up to `max` digits at `*pos`, advancing it. Returns the value and
/// the digit count.
fn parse_digits(value: &[u8], pos: &mut usize, max: usize) -> (u32, usize) {
    let mut result = 0u32;
    let mut count = 0usize;
    while count < max && *pos < value.len() && value[*pos].is_ascii_digit() {
        result = result * 10 + u32::from(value[*pos] - b'0');
        *pos += 1;
        count += 1;
    }
    (result, count)
}

/// POSIX two-digit year pivot.
fn expand_two_digit_year(v: u32) -> i32 {
    if v < 69 {
        2000 + v as i32
    } else {
        1900 + v as i32
    }
}

/// ASCII case-insensitive prefix match; returns the matched length.
fn match_ci(value: &[u8], pos: usize, target: &str) -> Option<usize> {
    let target = target.as_bytes();
    let rest = value.get(pos..)?;
    if rest.len() < target.len() {
        return None;
    }
    rest[..target.len()]
        .eq_ignore_ascii_case(target)
        .then_some(target.len())
}

/// First locale name matching at `pos`; returns (index, matched length).
fn match_name_list(value: &[u8], pos: usize, names: &[String]) -> Option<(usize, usize)> {
    names
        .iter()
        .enumerate()
        .find_map(|(i, name)| match_ci(value, pos, name).map(|n| (i, n)))
}

/// Clock times tried by [`parse_time`], most common first. `%H` variants go
/// ahead of `%I` so unambiguous 24-hour values never consult AM/PM.
const TIME_FORMATS: [&str; 4] = ["%H:%M:%OS", "%H:%M", "%I:%M:%OS %p", "%I:%M %p"];

static TIME_PARSERS: OnceLock<Vec<FormatParser>> = OnceLock::new();

/// Parse a clock time (`HH:MM[:SS[.frac]]`, optional AM/PM, optional leading
/// `-` for negative durations) to microseconds since midnight.
pub fn parse_time(value: &[u8]) -> Option<i64> {
    let mut bytes = value;
    let mut negative = false;
    if bytes.first() == Some(&b'-') {
        negative = true;
        bytes = &bytes[1..];
    }

    let parsers = TIME_PARSERS.get_or_init(|| {
        let locale = FormatLocale::english();
        TIME_FORMATS
            .iter()
            .map(|f| {
                FormatParser::new(f, locale.clone()).expect("time formats are valid")
            })
            .collect()
    });

    for parser in parsers {
        if let Some(mut dt) = parser.parse(bytes) {
            dt.is_negative = negative;
            let micros = dt.to_seconds_since_midnight_micros();
            return Some(if negative { -micros } else { micros });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(format: &str, value: &str) -> Option<ParsedDateTime> {
        FormatParser::new(format, FormatLocale::english())
            .unwrap()
            .parse(value.as_bytes())
    }

    #[test]
    fn test_iso_date() {
        let dt = parse("%Y-%m-%d", "2024-02-29").unwrap();
        assert_eq!((dt.year, dt.month, dt.day), (2024, 2, 29));
    }

    #[test]
    fn test_composite_f() {
        let dt = parse("%F", "2024-02-29").unwrap();
        assert_eq!((dt.year, dt.month, dt.day), (2024, 2, 29));
    }

    #[test]
    fn test_invalid_day_rejected() {
        assert!(parse("%F", "2024-02-30").is_none());
        assert!(parse("%F", "2023-02-29").is_none());
        assert!(parse("%F", "1900-02-29").is_none());
        assert!(parse("%F", "2024-04-31").is_none());
        assert!(parse("%F", "2024-13-01").is_none());
        assert!(parse("%F", "2024-00-10").is_none());
        assert!(parse("%F", "2024-01-00").is_none());
    }

    #[test]
    fn test_full_timestamp_with_fraction_and_zone() {
        let dt = parse("%Y-%m-%dT%H:%M:%OS%z", "2024-02-29T13:45:06.5Z").unwrap();
        assert_eq!((dt.year, dt.month, dt.day), (2024, 2, 29));
        assert_eq!((dt.hour, dt.minute, dt.second), (13, 45, 6));
        assert!((dt.fractional_seconds - 0.5).abs() < 1e-9);
        assert_eq!(dt.tz_offset_minutes, 0);
    }

    #[test]
    fn test_fractional_seconds_precision() {
        let dt = parse("%H:%M:%OS", "01:02:03.123456789").unwrap();
        assert!((dt.fractional_seconds - 0.123456).abs() < 1e-9);

        let dt = parse("%H:%M:%OS", "01:02:03").unwrap();
        assert_eq!(dt.fractional_seconds, 0.0);
    }

    #[test]
    fn test_tz_offsets() {
        let dt = parse("%Y-%m-%d %z", "2024-01-01 +05:30").unwrap();
        assert_eq!(dt.tz_offset_minutes, 330);
        let dt = parse("%Y-%m-%d %z", "2024-01-01 -0800").unwrap();
        assert_eq!(dt.tz_offset_minutes, -480);
        let dt = parse("%Y-%m-%d %z", "2024-01-01 +05").unwrap();
        assert_eq!(dt.tz_offset_minutes, 300);
        // A single minute digit is malformed.
        assert!(parse("%Y-%m-%d %z", "2024-01-01 +053").is_none());
    }

    #[test]
    fn test_tz_name_consumed() {
        let dt = parse("%Y-%m-%d %Z", "2024-01-01 UTC").unwrap();
        assert_eq!(dt.tz_offset_minutes, 0);
    }

    #[test]
    fn test_two_digit_year_pivot() {
        assert_eq!(parse("%y", "68").unwrap().year, 2068);
        assert_eq!(parse("%y", "69").unwrap().year, 1969);
        assert_eq!(parse("%y", "99").unwrap().year, 1999);
        assert_eq!(parse("%y", "00").unwrap().year, 2000);
    }

    #[test]
    fn test_composite_d() {
        let dt = parse("%D", "2/29/24").unwrap();
        assert_eq!((dt.year, dt.month, dt.day), (2024, 2, 29));
    }

    #[test]
    fn test_month_names() {
        let dt = parse("%B %e, %Y", "February 29, 2024").unwrap();
        assert_eq!((dt.year, dt.month, dt.day), (2024, 2, 29));
        let dt = parse("%d %b %Y", "29 feb 2024").unwrap();
        assert_eq!(dt.month, 2);
        assert!(parse("%d %b %Y", "29 xxx 2024").is_none());
    }

    #[test]
    fn test_weekday_consumed_not_stored() {
        let dt = parse("%a, %d %b %Y", "Thu, 29 Feb 2024").unwrap();
        assert_eq!((dt.year, dt.month, dt.day), (2024, 2, 29));
        let dt = parse("%A %F", "Thursday 2024-02-29").unwrap();
        assert_eq!(dt.day, 29);
    }

    #[test]
    fn test_am_pm_resolution() {
        let dt = parse("%I:%M %p", "2:15 PM").unwrap();
        assert_eq!(dt.hour, 14);
        let dt = parse("%I:%M %p", "12:00 AM").unwrap();
        assert_eq!(dt.hour, 0);
        let dt = parse("%I:%M %p", "12:00 PM").unwrap();
        assert_eq!(dt.hour, 12);
        let dt = parse("%I:%M %p", "9:30 am").unwrap();
        assert_eq!(dt.hour, 9);
        assert!(parse("%I:%M %p", "13:00 PM").is_none());
        assert!(parse("%I:%M %p", "0:00 PM").is_none());
    }

    #[test]
    fn test_whitespace_matches_zero_or_more() {
        assert!(parse("%Y %m", "2024  07").is_some());
        assert!(parse("%Y %m", "202407").is_some());
        assert!(parse("%H:%M %p", "2:15PM").is_some());
    }

    #[test]
    fn test_literal_percent() {
        let dt = parse("%Y%%", "2024%").unwrap();
        assert_eq!(dt.year, 2024);
        assert!(parse("%Y%%", "2024x").is_none());
    }

    #[test]
    fn test_input_must_be_fully_consumed() {
        assert!(parse("%Y-%m-%d", "2024-01-01x").is_none());
        assert!(parse("%Y-%m-%d", "2024-01-01 ").is_none());
        assert!(parse("%Y-%m-%d", "2024-01").is_none());
    }

    #[test]
    fn test_hour_and_minute_bounds() {
        assert!(parse("%T", "23:59:59").is_some());
        assert!(parse("%T", "24:00:00").is_none());
        assert!(parse("%T", "12:60:00").is_none());
        assert!(parse("%T", "12:00:60").is_none());
        let dt = parse("%R", "07:45").unwrap();
        assert_eq!((dt.hour, dt.minute), (7, 45));
    }

    #[test]
    fn test_compile_errors() {
        let locale = FormatLocale::english();
        assert_eq!(
            FormatParser::new("%Q", locale.clone()).unwrap_err(),
            FormatError::UnknownSpecifier(b'Q')
        );
        assert_eq!(
            FormatParser::new("%Y-%", locale.clone()).unwrap_err(),
            FormatError::TruncatedSpecifier
        );
        assert_eq!(
            FormatParser::new("%Ox", locale).unwrap_err(),
            FormatError::UnknownSpecifier(b'O')
        );
    }

    #[test]
    fn test_parse_time_table() {
        assert_eq!(parse_time(b"14:30:00"), Some(52_200_000_000));
        assert_eq!(parse_time(b"00:00:00"), Some(0));
        assert_eq!(parse_time(b"23:59:59"), Some(86_399_000_000));
        assert_eq!(parse_time(b"23:59:59.999"), Some(86_399_999_000));
        assert_eq!(parse_time(b"12:00:00.123456"), Some(43_200_123_456));
        assert_eq!(parse_time(b"14:30"), Some(52_200_000_000));
        assert_eq!(parse_time(b"2:15:30 PM"), Some(51_330_000_000));
        assert_eq!(parse_time(b"02:15:30 PM"), Some(51_330_000_000));
        assert_eq!(parse_time(b"2:15:30 pm"), Some(51_330_000_000));
        assert_eq!(parse_time(b"9:30:00 AM"), Some(34_200_000_000));
        assert_eq!(parse_time(b"9:30:00 am"), Some(34_200_000_000));
        assert_eq!(parse_time(b"12:00:00 AM"), Some(0));
        assert_eq!(parse_time(b"12:00:00 PM"), Some(43_200_000_000));
    }

    #[test]
    fn test_parse_time_rejects_invalid() {
        assert_eq!(parse_time(b"24:00:00"), None);
        assert_eq!(parse_time(b"12:60:00"), None);
        assert_eq!(parse_time(b"12:00:60"), None);
        assert_eq!(parse_time(b""), None);
        assert_eq!(parse_time(b"hello"), None);
        assert_eq!(parse_time(b"12345"), None);
        assert_eq!(parse_time(b"13:00:00 PM"), None);
        assert_eq!(parse_time(b"0:00:00 PM"), None);
    }

    #[test]
    fn test_parse_time_negative_duration() {
        assert_eq!(parse_time(b"-1:23:45"), Some(-5_025_000_000));
    }

    #[test]
    fn test_parser_is_shareable() {
        fn assert_sync<T: Sync + Send>() {}
        assert_sync::<FormatParser>();
    }
}
