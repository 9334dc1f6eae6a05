use crate::error::{FmtChar, FmtStr};
use crate::lex::{CharIter, Span};
use crate::parse::{datetime, Partial};
use crate::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntPrefix {
    Binary = 1,
    Octal = 3,
    Hexadecimal = 4,
}

impl IntPrefix {
    #[inline(always)]
    pub fn bits(&self) -> u32 {
        *self as u32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Sign {
    Positive,
    Negative,
}

impl Sign {
    #[inline(always)]
    fn val(&self) -> i64 {
        match self {
            Sign::Positive => 1,
            Sign::Negative => -1,
        }
    }
}

/// Interprets a literal token in value position as a number or the start of
/// a date-time. `true`/`false`/`inf`/`nan` literals are matched by the
/// caller before this is reached.
pub(crate) fn parse_num_or_date(lit: &str, span: Span) -> Result<Partial, Error> {
    let mut chars = lit.char_indices().peekable();
    let first = match chars.next() {
        Some((_, c)) => c,
        None => unreachable!("literal tokens are never empty"),
    };

    match first {
        '+' | '-' => {
            let sign = match first {
                '+' => Sign::Positive,
                _ => Sign::Negative,
            };

            match chars.next() {
                Some((_, '0')) => parse_prefixed_int_or_date(chars, lit, span, Some(sign)),
                Some((_, c @ '1'..='9')) => {
                    let num = (c as u32 - '0' as u32) as i64;
                    parse_decimal_int_float_or_date(chars, lit, span, num, Some(sign))
                }
                Some((i, '_')) => Err(Error::MisplacedUnderscore(span.start.plus(i as u32))),
                Some((i, c)) => Err(Error::InvalidCharInNum(
                    FmtChar(c),
                    span.start.plus(i as u32),
                )),
                None => Err(Error::MissingDigitsAfterSign(span.end)),
            }
        }
        '0' => parse_prefixed_int_or_date(chars, lit, span, None),
        '1'..='9' => {
            let num = (first as u32 - '0' as u32) as i64;
            parse_decimal_int_float_or_date(chars, lit, span, num, None)
        }
        '_' => Err(Error::MisplacedUnderscore(span.start)),
        _ => Err(Error::InvalidLiteral(FmtStr::from_str(lit), span)),
    }
}

/// Everything after a leading `0`: a radix prefix, a float exponent, or the
/// continuation of a date or time.
fn parse_prefixed_int_or_date(
    mut chars: CharIter,
    lit: &str,
    span: Span,
    sign: Option<Sign>,
) -> Result<Partial, Error> {
    let Some((i, c)) = chars.next() else {
        return Ok(Partial::Int(0));
    };
    match c {
        'b' | 'o' | 'x' => {
            if sign.is_some() {
                return Err(Error::PrefixedIntSigned(span.start));
            }

            let prefix = match c {
                'b' => IntPrefix::Binary,
                'o' => IntPrefix::Octal,
                _ => IntPrefix::Hexadecimal,
            };
            let val = parse_prefixed_int_literal(chars, span, prefix)?;
            Ok(Partial::PrefixedInt(val))
        }
        'e' | 'E' => validate_float_exponent(chars, span),
        '0'..='9' if sign.is_none() => {
            let two_digits = c as u16 - '0' as u16;
            match datetime::continue_parsing_date_time(&mut chars, span, two_digits) {
                Ok(v) => Ok(v),
                // all-digit literals like `01` are malformed integers, not
                // malformed dates
                Err(_) if lit.bytes().all(|b| b.is_ascii_digit() || b == b'_') => {
                    Err(Error::InvalidLeadingZero(span.start))
                }
                Err(e) => Err(e),
            }
        }
        '0'..='9' => Err(Error::InvalidLeadingZero(span.start.plus(1))),
        '_' => Err(Error::InvalidLeadingZero(
            span.start.plus(sign.is_some() as u32),
        )),
        _ if sign.is_some() => Err(Error::InvalidCharInNum(
            FmtChar(c),
            span.start.plus(i as u32),
        )),
        _ => Err(Error::InvalidIntRadix(FmtChar(c), span.start.plus(i as u32))),
    }
}

fn parse_decimal_int_float_or_date(
    mut chars: CharIter,
    lit: &str,
    span: Span,
    mut int_accum: i64,
    sign: Option<Sign>,
) -> Result<Partial, Error> {
    #[derive(PartialEq, Eq)]
    enum NumParseState {
        Int,
        OverflowOrFloat,
    }

    let sign_val = sign.map_or(1, |s| s.val());
    int_accum *= sign_val;
    let mut parse_state = NumParseState::Int;
    let mut last_underscore = false;
    loop {
        let Some((i, c)) = chars.next() else { break };

        match c {
            '0'..='9' => {
                match parse_state {
                    NumParseState::Int => {
                        let digit = (c as u32) - ('0' as u32);
                        let val = int_accum
                            .checked_mul(10)
                            .and_then(|v| v.checked_add(sign_val * digit as i64));
                        match val {
                            Some(val) => int_accum = val,
                            // only valid if this turns out to be a float
                            None => parse_state = NumParseState::OverflowOrFloat,
                        }
                    }
                    NumParseState::OverflowOrFloat => {}
                }
            }
            'e' | 'E' => {
                if last_underscore {
                    let pos = span.start.plus(i as u32).minus(1);
                    return Err(Error::MisplacedUnderscore(pos));
                }

                return validate_float_exponent(chars, span);
            }
            ':' if sign.is_none() && i == 2 => {
                let hour = int_accum as u8;
                let time = datetime::continue_parsing_local_time(&mut chars, span, hour)?;
                return Ok(Partial::PartialTime(time));
            }
            '-' if sign.is_none() && i == 4 => {
                let year = int_accum as u16;
                return datetime::continue_parsing_date_time_after_year(&mut chars, span, year);
            }
            ':' if sign.is_none() => {
                let pos = span.start.plus(i as u32);
                return Err(Error::DateTimeIncomplete(
                    crate::datetime::DateTimeField::Hour,
                    pos,
                ));
            }
            '-' if sign.is_none() => {
                let pos = span.start.plus(i as u32);
                return Err(Error::DateTimeIncomplete(
                    crate::datetime::DateTimeField::Year,
                    pos,
                ));
            }
            '_' => {
                if last_underscore {
                    let pos = span.start.plus(i as u32);
                    return Err(Error::MisplacedUnderscore(pos));
                }
            }
            _ => {
                let pos = span.start.plus(i as u32);
                return Err(Error::InvalidCharInNum(FmtChar(c), pos));
            }
        }

        last_underscore = c == '_';
    }

    if last_underscore {
        let pos = span.end.minus(1);
        return Err(Error::MisplacedUnderscore(pos));
    }

    match parse_state {
        NumParseState::Int => Ok(Partial::Int(int_accum)),
        NumParseState::OverflowOrFloat => Ok(Partial::OverflowOrFloat),
    }
}

fn parse_prefixed_int_literal(
    mut chars: CharIter,
    span: Span,
    prefix: IntPrefix,
) -> Result<i64, Error> {
    let radix: u32 = 1 << prefix.bits();
    let mut accum: u64 = 0;
    let mut last_underscore = false;

    for j in 0.. {
        let Some((i, c)) = chars.next() else {
            if j == 0 {
                return Err(Error::EmptyPrefixedInt(span.end));
            }

            break;
        };

        let digit = match c {
            '0'..='9' => {
                let n = c as u32 - '0' as u32;
                if n >= radix {
                    let pos = span.start.plus(i as u32);
                    return Err(Error::IntDigitOutOfRange(prefix, FmtChar(c), pos));
                }
                n
            }
            'a'..='f' => {
                let n = 10 + c as u32 - 'a' as u32;
                if n >= radix {
                    let pos = span.start.plus(i as u32);
                    return Err(Error::IntDigitOutOfRange(prefix, FmtChar(c), pos));
                }
                n
            }
            'A'..='F' => {
                let n = 10 + c as u32 - 'A' as u32;
                if n >= radix {
                    let pos = span.start.plus(i as u32);
                    return Err(Error::IntDigitOutOfRange(prefix, FmtChar(c), pos));
                }
                n
            }
            '_' => {
                if j == 0 || last_underscore {
                    let pos = span.start.plus(i as u32);
                    return Err(Error::MisplacedUnderscore(pos));
                }
                last_underscore = true;
                continue;
            }
            _ => {
                let pos = span.start.plus(i as u32);
                return Err(Error::InvalidCharInNum(FmtChar(c), pos));
            }
        };

        if accum > (i64::MAX as u64) >> prefix.bits() {
            return Err(Error::IntOverflow(span));
        }
        accum = (accum << prefix.bits()) + digit as u64;

        last_underscore = false;
    }

    if last_underscore {
        let pos = span.end.minus(1);
        return Err(Error::MisplacedUnderscore(pos));
    }

    Ok(accum as i64)
}

fn validate_float_exponent(mut chars: CharIter, span: Span) -> Result<Partial, Error> {
    if let Some((_, '-' | '+')) = chars.peek() {
        chars.next();
    }

    let mut digits = 0;
    let mut last_underscore = false;
    for j in 0.. {
        let Some((i, c)) = chars.next() else { break };

        match c {
            '0'..='9' => digits += 1,
            '_' => {
                if j == 0 || last_underscore {
                    let pos = span.start.plus(i as u32);
                    return Err(Error::MisplacedUnderscore(pos));
                }
            }
            _ => {
                let pos = span.start.plus(i as u32);
                return Err(Error::InvalidCharInNum(FmtChar(c), pos));
            }
        }

        last_underscore = c == '_';
    }

    if last_underscore {
        let pos = span.end.minus(1);
        return Err(Error::MisplacedUnderscore(pos));
    }
    if digits == 0 {
        return Err(Error::MissingDigitsAfterSign(span.end));
    }

    Ok(Partial::FloatWithExp)
}

/// Validates the digits following the dot of a float literal, including an
/// optional exponent.
pub(crate) fn validate_float_fractional_part(lit: &str, span: Span) -> Result<(), Error> {
    let mut chars = lit.char_indices().peekable();
    let mut last_underscore = false;
    loop {
        let Some((i, c)) = chars.next() else { break };

        match c {
            '0'..='9' => {}
            'e' | 'E' => {
                if i == 0 {
                    return Err(Error::MissingFloatFractionalPart(span.start));
                }
                if last_underscore {
                    let pos = span.start.plus(i as u32 - 1);
                    return Err(Error::MisplacedUnderscore(pos));
                }

                return validate_float_exponent(chars, span).map(|_| ());
            }
            '_' => {
                if i == 0 || last_underscore {
                    let pos = span.start.plus(i as u32);
                    return Err(Error::MisplacedUnderscore(pos));
                }
            }
            _ => {
                let pos = span.start.plus(i as u32);
                return Err(Error::InvalidCharInNum(FmtChar(c), pos));
            }
        }

        last_underscore = c == '_';
    }

    if last_underscore {
        let pos = span.end.minus(1);
        return Err(Error::MisplacedUnderscore(pos));
    }

    Ok(())
}
