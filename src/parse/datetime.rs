use crate::datetime::{Date, DateTime, DateTimeField, DateTimeField::*, Offset, Time};
use crate::error::FmtChar;
use crate::lex::{CharIter, Pos, Span};
use crate::parse::Partial;
use crate::Error;

/// Continue parsing a date-time after the first two digits. These could
/// either be part of the year of a date, or the hour of a time.
pub(crate) fn continue_parsing_date_time(
    chars: &mut CharIter,
    span: Span,
    two_digits: u16,
) -> Result<Partial, Error> {
    let y2 = match chars.next() {
        Some((_, c @ '0'..='9')) => c as u16 - '0' as u16,
        Some((_, ':')) => {
            let hour = two_digits as u8;
            let time = continue_parsing_local_time(chars, span, hour)?;
            return Ok(Partial::PartialTime(time));
        }
        Some((i, c)) => return invalid_char_error(c, span, i),
        None => return Err(Error::DateTimeIncomplete(Year, span.end)),
    };

    let y3 = match chars.next() {
        Some((_, c @ '0'..='9')) => c as u16 - '0' as u16,
        Some((i, c)) => return invalid_char_error(c, span, i),
        None => return Err(Error::DateTimeIncomplete(Year, span.end)),
    };
    let year = 100 * two_digits + 10 * y2 + y3;

    expect_char(chars, span, Year, '-')?;

    continue_parsing_date_time_after_year(chars, span, year)
}

/// Continue parsing after the `-` separator following the year.
pub(crate) fn continue_parsing_date_time_after_year(
    chars: &mut CharIter,
    span: Span,
    year: u16,
) -> Result<Partial, Error> {
    let (month, _) = expect_two_digit_num(chars, span)
        .map_err(|e| e.kind(Month))?
        .check_range(1..=12)
        .map_err(|e| e.kind(Month))?;

    expect_char(chars, span, Month, '-')?;

    let (day, _) = expect_two_digit_num(chars, span)
        .map_err(|e| e.kind(Day))?
        .check_range(1..=31)
        .map_err(|e| e.kind(Day))?;

    let date = Date { year, month, day };

    let (time, offset) = match chars.next() {
        Some((_, 'T' | 't')) => parse_time_and_offset(chars, span)?,
        Some((i, c)) => return invalid_char_error(c, span, i),
        None => return Ok(Partial::PartialDate(date)),
    };

    match offset {
        Some(offset) => {
            let val = DateTime::OffsetDateTime(date, time, offset);
            Ok(Partial::DateTime(val))
        }
        None => Ok(Partial::PartialDateTime(date, time)),
    }
}

/// Continue parsing a local time *without* offset (finding one is an error),
/// after the `:` separator following the hour.
pub(crate) fn continue_parsing_local_time(
    chars: &mut CharIter,
    span: Span,
    hour: u8,
) -> Result<Time, Error> {
    let hour_span = Span::from_pos_len(span.start, 2);
    (hour, hour_span).check_range(0..=23).map_err(|e| e.kind(Hour))?;

    let time = continue_parsing_time(chars, span, hour)?;
    error_on_offset(chars, span)?;
    Ok(time)
}

pub(crate) fn parse_time_and_offset(
    chars: &mut CharIter,
    span: Span,
) -> Result<(Time, Option<Offset>), Error> {
    let time = {
        let (hour, _) = expect_two_digit_num(chars, span)
            .map_err(|e| e.kind(Hour))?
            .check_range(0..=23)
            .map_err(|e| e.kind(Hour))?;

        expect_char(chars, span, Hour, ':')?;

        continue_parsing_time(chars, span, hour)?
    };

    let offset = try_to_parse_offset(chars, span)?;

    Ok((time, offset))
}

/// NOTE: This intentionally doesn't consume offsets, and quietly returns
/// just the time when one follows. The caller checks any remaining offset.
fn continue_parsing_time(chars: &mut CharIter, span: Span, hour: u8) -> Result<Time, Error> {
    let (minute, _) = expect_two_digit_num(chars, span)
        .map_err(|e| e.kind(Minute))?
        .check_range(0..=59)
        .map_err(|e| e.kind(Minute))?;

    expect_char(chars, span, Minute, ':')?;

    let (second, _) = expect_two_digit_num(chars, span)
        .map_err(|e| e.kind(Second))?
        .check_range(0..=59)
        .map_err(|e| e.kind(Second))?;

    match chars.peek() {
        Some((_, 'Z' | 'z' | '+' | '-')) => (),
        Some(&(i, c)) => return invalid_char_error(c, span, i),
        None => (),
    }

    Ok(Time {
        hour,
        minute,
        second,
        nanos: 0,
    })
}

/// Parses the sub-second digits following the dot of a date-time literal,
/// plus an optional offset when a date is present.
pub(crate) fn parse_subsec_part(
    subsec_lit: &str,
    subsec_span: Span,
    date: Option<Date>,
    mut time: Time,
) -> Result<DateTime, Error> {
    let mut chars = subsec_lit.char_indices().peekable();
    let val = match date {
        Some(date) => {
            let nanos = parse_subsec(&mut chars, subsec_span)?;
            let offset = try_to_parse_offset(&mut chars, subsec_span)?;
            time.nanos = nanos;
            DateTime::from_optional_offset(date, time, offset)
        }
        None => {
            let nanos = parse_subsec(&mut chars, subsec_span)?;
            error_on_offset(&mut chars, subsec_span)?;
            time.nanos = nanos;
            DateTime::LocalTime(time)
        }
    };

    Ok(val)
}

/// Parses sub-second digits up to nano second precision, truncating the
/// rest.
fn parse_subsec(chars: &mut CharIter, span: Span) -> Result<u32, Error> {
    let mut subsec_digits = 0;
    let mut subsec = 0;
    while let Some(&(i, c)) = chars.peek() {
        match c {
            '0'..='9' => {
                if subsec_digits < 9 {
                    subsec *= 10;
                    subsec += c as u32 - '0' as u32;
                    subsec_digits += 1;
                }
                chars.next();
            }
            'Z' | 'z' | '+' | '-' => break,
            _ => return invalid_char_error(c, span, i),
        }
    }

    if subsec_digits == 0 {
        return Err(Error::DateTimeMissingSubsec(span.end));
    }

    let nanos = subsec * 10_u32.pow(9 - subsec_digits);
    Ok(nanos)
}

fn try_to_parse_offset(chars: &mut CharIter, span: Span) -> Result<Option<Offset>, Error> {
    match chars.next() {
        Some((_, 'Z' | 'z')) => Ok(Some(Offset::Utc)),
        Some((_, '+')) => {
            let minutes = parse_offset(chars, span)?;
            Ok(Some(Offset::Custom(minutes)))
        }
        Some((_, '-')) => {
            let minutes = parse_offset(chars, span)?;
            Ok(Some(Offset::Custom(-minutes)))
        }
        Some((i, c)) => invalid_char_error(c, span, i),
        None => Ok(None),
    }
}

fn parse_offset(chars: &mut CharIter, span: Span) -> Result<i16, Error> {
    let (hour, _) = expect_two_digit_num(chars, span)
        .map_err(|e| e.kind(OffsetHour))?
        .check_range(0..=23)
        .map_err(|e| e.kind(OffsetHour))?;

    expect_char(chars, span, OffsetHour, ':')?;

    let (minute, _) = expect_two_digit_num(chars, span)
        .map_err(|e| e.kind(OffsetMinute))?
        .check_range(0..=59)
        .map_err(|e| e.kind(OffsetMinute))?;

    Ok(60 * hour as i16 + minute as i16)
}

fn error_on_offset(chars: &mut CharIter, span: Span) -> Result<(), Error> {
    match chars.next() {
        Some((i, 'Z' | 'z' | '+' | '-')) => {
            let pos = span.start.plus(i as u32);
            Err(Error::LocalTimeOffset(pos))
        }
        Some((i, c)) => invalid_char_error(c, span, i),
        None => Ok(()),
    }
}

fn invalid_char_error<T>(char: char, span: Span, offset: usize) -> Result<T, Error> {
    let pos = span.start.plus(offset as u32);
    Err(Error::InvalidCharInDateTime(FmtChar(char), pos))
}

fn expect_char(
    chars: &mut CharIter,
    span: Span,
    after: DateTimeField,
    expected: char,
) -> Result<(), Error> {
    match chars.next() {
        Some((_, c)) if c == expected => Ok(()),
        Some((i, c)) => {
            let pos = span.start.plus(i as u32);
            Err(Error::DateTimeExpectedCharFound {
                after,
                expected: FmtChar(expected),
                found: FmtChar(c),
                pos,
            })
        }
        None => Err(Error::DateTimeMissingChar(
            after,
            FmtChar(expected),
            span.end,
        )),
    }
}

struct ExpectNumError(ExpectNumErrorKind, Pos);
enum ExpectNumErrorKind {
    Incomplete,
    Invalid(char),
}

impl ExpectNumError {
    fn kind(self, field: DateTimeField) -> Error {
        match self.0 {
            ExpectNumErrorKind::Incomplete => Error::DateTimeIncomplete(field, self.1),
            ExpectNumErrorKind::Invalid(c) => Error::InvalidCharInDateTime(FmtChar(c), self.1),
        }
    }
}

fn expect_two_digit_num(
    chars: &mut impl Iterator<Item = (usize, char)>,
    span: Span,
) -> Result<(u8, Span), ExpectNumError> {
    use ExpectNumErrorKind::*;

    let Some((start_offset, c)) = chars.next() else {
        return Err(ExpectNumError(Incomplete, span.end));
    };
    let d0 = match c {
        '0'..='9' => c as u8 - b'0',
        _ => {
            let pos = span.start.plus(start_offset as u32);
            return Err(ExpectNumError(Invalid(c), pos));
        }
    };

    let Some((_, c)) = chars.next() else {
        return Err(ExpectNumError(Incomplete, span.end));
    };
    let d1 = match c {
        '0'..='9' => c as u8 - b'0',
        _ => {
            let pos = span.start.plus(start_offset as u32);
            return Err(ExpectNumError(Invalid(c), pos));
        }
    };

    let start = span.start.plus(start_offset as u32);
    let end = start.plus(2);
    let span = Span { start, end };
    Ok(((10 * d0 + d1), span))
}

struct NumRangeError(u8, Span);

impl NumRangeError {
    fn kind(self, field: DateTimeField) -> Error {
        let range = match field {
            Month => (1, 12),
            Day => (1, 31),
            Hour | OffsetHour => (0, 23),
            Minute | Second | OffsetMinute => (0, 59),
            Year => (0, u8::MAX),
        };
        Error::DateTimeOutOfRange(field, self.0, range, self.1)
    }
}

trait NumRangeCheck: Sized {
    fn check_range(self, num_range: std::ops::RangeInclusive<u8>) -> Result<Self, NumRangeError>;
}

impl NumRangeCheck for (u8, Span) {
    fn check_range(self, num_range: std::ops::RangeInclusive<u8>) -> Result<Self, NumRangeError> {
        if !num_range.contains(&self.0) {
            return Err(NumRangeError(self.0, self.1));
        }
        Ok(self)
    }
}
