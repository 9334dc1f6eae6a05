use std::fmt::Write as _;
use std::ops::Deref;

use crate::datetime::DateTimeField;
use crate::lex::{Pos, Quote, Span};
use crate::parse::num::IntPrefix;
use crate::value::Datatype;

/// Everything that can go wrong while decoding or encoding a document.
///
/// Variants are fine-grained so messages can point at the offending
/// construct; [`Error::kind`] groups them into coarse categories for
/// programmatic matching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    // tokenizing
    UnterminatedString(Quote, Pos, Pos),
    InvalidEscapeChar(FmtChar, Pos),
    InvalidUnicodeEscapeChar(FmtChar, Pos),
    InvalidUnicodeCodepoint(u32, Span),
    UnfinishedEscapeSequence(Span),
    UnexpectedChar(FmtChar, Pos),
    InvalidUtf8(Pos),

    // document structure
    ExpectedEqFound(FmtStr, Span),
    ExpectedKeyFound(FmtStr, Span),
    ExpectedValueFound(FmtStr, Span),
    ExpectedRightSquareFound(FmtStr, Span),
    ExpectedRightCurlyFound(FmtStr, Span),
    ExpectedNewlineFound(FmtStr, Span),
    MissingComma(Pos),
    InlineTableTrailingComma(Pos),
    MultilineStringKey(Span),
    InvalidCharInKey(FmtChar, Pos),

    // numbers
    InvalidLeadingZero(Pos),
    MisplacedUnderscore(Pos),
    MissingDigitsAfterSign(Pos),
    InvalidIntRadix(FmtChar, Pos),
    EmptyPrefixedInt(Pos),
    IntDigitOutOfRange(IntPrefix, FmtChar, Pos),
    PrefixedIntSigned(Pos),
    IntOverflow(Span),
    MissingFloatFractionalPart(Pos),
    InvalidCharInNum(FmtChar, Pos),
    InvalidLiteral(FmtStr, Span),

    // date-times
    InvalidCharInDateTime(FmtChar, Pos),
    DateTimeIncomplete(DateTimeField, Pos),
    DateTimeExpectedCharFound {
        after: DateTimeField,
        expected: FmtChar,
        found: FmtChar,
        pos: Pos,
    },
    DateTimeMissingChar(DateTimeField, FmtChar, Pos),
    DateTimeOutOfRange(DateTimeField, u8, (u8, u8), Span),
    DateTimeMissingSubsec(Pos),
    LocalTimeOffset(Pos),

    // table scoping
    DuplicateKey {
        path: FmtStr,
        orig: Span,
        new: Span,
    },
    DuplicateTable {
        path: FmtStr,
        orig: Span,
        new: Span,
    },
    TypeConflict {
        path: FmtStr,
        existing: Datatype,
        orig: Span,
        new: Span,
    },
    ExtendInlineTable {
        path: FmtStr,
        orig: Span,
        new: Span,
    },
    ExtendStaticArray {
        path: FmtStr,
        orig: Span,
        new: Span,
    },

    // strict arrays
    HeterogeneousArray {
        expected: Datatype,
        found: Datatype,
        span: Span,
    },
    HeterogeneousArrayValue {
        path: FmtStr,
        expected: Datatype,
        found: Datatype,
    },

    // encoding
    NonTableRoot(Datatype),
}

/// The coarse error categories of the public contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    UnterminatedString,
    InvalidEscape,
    InvalidUtf8,
    DuplicateKey,
    DuplicateTable,
    TypeConflict,
    ExtendSealed,
    HeterogeneousArray,
    InvalidNumber,
    InvalidDateTime,
    UnknownValueType,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use Error::*;

        match self {
            UnterminatedString(..) => ErrorKind::UnterminatedString,
            InvalidEscapeChar(..)
            | InvalidUnicodeEscapeChar(..)
            | InvalidUnicodeCodepoint(..)
            | UnfinishedEscapeSequence(_) => ErrorKind::InvalidEscape,
            UnexpectedChar(..) => ErrorKind::Syntax,
            InvalidUtf8(_) => ErrorKind::InvalidUtf8,

            ExpectedEqFound(..)
            | ExpectedKeyFound(..)
            | ExpectedValueFound(..)
            | ExpectedRightSquareFound(..)
            | ExpectedRightCurlyFound(..)
            | ExpectedNewlineFound(..)
            | MissingComma(_)
            | InlineTableTrailingComma(_)
            | MultilineStringKey(_)
            | InvalidCharInKey(..)
            | InvalidLiteral(..) => ErrorKind::Syntax,

            InvalidLeadingZero(_)
            | MisplacedUnderscore(_)
            | MissingDigitsAfterSign(_)
            | InvalidIntRadix(..)
            | EmptyPrefixedInt(_)
            | IntDigitOutOfRange(..)
            | PrefixedIntSigned(_)
            | IntOverflow(_)
            | MissingFloatFractionalPart(_)
            | InvalidCharInNum(..) => ErrorKind::InvalidNumber,

            InvalidCharInDateTime(..)
            | DateTimeIncomplete(..)
            | DateTimeExpectedCharFound { .. }
            | DateTimeMissingChar(..)
            | DateTimeOutOfRange(..)
            | DateTimeMissingSubsec(_)
            | LocalTimeOffset(_) => ErrorKind::InvalidDateTime,

            DuplicateKey { .. } => ErrorKind::DuplicateKey,
            DuplicateTable { .. } => ErrorKind::DuplicateTable,
            TypeConflict { .. } => ErrorKind::TypeConflict,
            ExtendInlineTable { .. } | ExtendStaticArray { .. } => ErrorKind::ExtendSealed,

            HeterogeneousArray { .. } | HeterogeneousArrayValue { .. } => {
                ErrorKind::HeterogeneousArray
            }

            NonTableRoot(_) => ErrorKind::UnknownValueType,
        }
    }

    /// The source location of the error. `None` for encoding errors, which
    /// have no position in any document.
    pub fn span(&self) -> Option<Span> {
        use Error::*;

        match self {
            UnterminatedString(_, _, p) => Some(Span::pos(*p)),
            InvalidEscapeChar(_, p) => Some(Span::pos(*p)),
            InvalidUnicodeEscapeChar(_, p) => Some(Span::pos(*p)),
            InvalidUnicodeCodepoint(_, s) => Some(*s),
            UnfinishedEscapeSequence(s) => Some(*s),
            UnexpectedChar(_, p) => Some(Span::pos(*p)),
            InvalidUtf8(p) => Some(Span::pos(*p)),

            ExpectedEqFound(_, s) => Some(*s),
            ExpectedKeyFound(_, s) => Some(*s),
            ExpectedValueFound(_, s) => Some(*s),
            ExpectedRightSquareFound(_, s) => Some(*s),
            ExpectedRightCurlyFound(_, s) => Some(*s),
            ExpectedNewlineFound(_, s) => Some(*s),
            MissingComma(p) => Some(Span::pos(*p)),
            InlineTableTrailingComma(p) => Some(Span::pos(*p)),
            MultilineStringKey(s) => Some(*s),
            InvalidCharInKey(_, p) => Some(Span::pos(*p)),

            InvalidLeadingZero(p) => Some(Span::pos(*p)),
            MisplacedUnderscore(p) => Some(Span::pos(*p)),
            MissingDigitsAfterSign(p) => Some(Span::pos(*p)),
            InvalidIntRadix(_, p) => Some(Span::pos(*p)),
            EmptyPrefixedInt(p) => Some(Span::pos(*p)),
            IntDigitOutOfRange(_, _, p) => Some(Span::pos(*p)),
            PrefixedIntSigned(p) => Some(Span::pos(*p)),
            IntOverflow(s) => Some(*s),
            MissingFloatFractionalPart(p) => Some(Span::pos(*p)),
            InvalidCharInNum(_, p) => Some(Span::pos(*p)),
            InvalidLiteral(_, s) => Some(*s),

            InvalidCharInDateTime(_, p) => Some(Span::pos(*p)),
            DateTimeIncomplete(_, p) => Some(Span::pos(*p)),
            DateTimeExpectedCharFound { pos, .. } => Some(Span::pos(*pos)),
            DateTimeMissingChar(_, _, p) => Some(Span::pos(*p)),
            DateTimeOutOfRange(_, _, _, s) => Some(*s),
            DateTimeMissingSubsec(p) => Some(Span::pos(*p)),
            LocalTimeOffset(p) => Some(Span::pos(*p)),

            DuplicateKey { new, .. } => Some(*new),
            DuplicateTable { new, .. } => Some(*new),
            TypeConflict { new, .. } => Some(*new),
            ExtendInlineTable { new, .. } => Some(*new),
            ExtendStaticArray { new, .. } => Some(*new),

            HeterogeneousArray { span, .. } => Some(*span),
            HeterogeneousArrayValue { .. } => None,

            NonTableRoot(_) => None,
        }
    }

    /// 1-based line of the error site, when the error has one.
    pub fn line(&self) -> Option<u32> {
        self.span().map(|s| s.start.line + 1)
    }

    fn description(&self, f: &mut impl std::fmt::Write) -> std::fmt::Result {
        use Error::*;

        match self {
            UnterminatedString(quote, _, _) => {
                write!(f, "unterminated string literal, missing `{quote}`")
            }
            InvalidEscapeChar(char, _) => write!(
                f,
                "invalid escape character `{char}`, expected one of: `u`, `U`, `b`, `t`, `n`, `f`, `r`, `\"`, `\\`"
            ),
            InvalidUnicodeEscapeChar(char, _) => write!(
                f,
                "invalid character `{char}` in unicode escape sequence, valid characters are `a-f`, `A-F` and `0-9`"
            ),
            InvalidUnicodeCodepoint(cp, _) => {
                write!(f, "invalid unicode code point `0x{cp:x}`")
            }
            UnfinishedEscapeSequence(_) => write!(f, "unfinished escape sequence"),
            UnexpectedChar(char, _) => write!(f, "unexpected character `{char}`"),
            InvalidUtf8(_) => write!(f, "input is not valid UTF-8"),

            ExpectedEqFound(token, _) => write!(f, "expected `=`, found `{token}`"),
            ExpectedKeyFound(token, _) => write!(f, "expected a key, found `{token}`"),
            ExpectedValueFound(token, _) => write!(f, "expected a value, found `{token}`"),
            ExpectedRightSquareFound(token, _) => write!(f, "expected `]`, found `{token}`"),
            ExpectedRightCurlyFound(token, _) => write!(f, "expected `}}`, found `{token}`"),
            ExpectedNewlineFound(token, _) => write!(f, "expected a line break, found `{token}`"),
            MissingComma(_) => write!(f, "missing comma (`,`)"),
            InlineTableTrailingComma(_) => {
                write!(f, "trailing commas aren't permitted in inline tables")
            }
            MultilineStringKey(_) => write!(f, "multi-line strings cannot be used as keys"),
            InvalidCharInKey(char, _) => write!(
                f,
                "invalid character `{char}` in key, valid characters are `a-z`, `A-Z`, `0-9`, `_` and `-`"
            ),

            InvalidLeadingZero(_) => {
                write!(f, "decimal integers cannot start with a leading zero")
            }
            MisplacedUnderscore(_) => write!(
                f,
                "underscores in number literals need a digit on both sides"
            ),
            MissingDigitsAfterSign(_) => {
                write!(f, "missing digit after sign, expected at least one")
            }
            InvalidIntRadix(char, _) => write!(
                f,
                "invalid integer radix `{char}`, valid radices are `b`, `o` and `x`"
            ),
            EmptyPrefixedInt(_) => write!(f, "missing integer digits, expected at least one"),
            IntDigitOutOfRange(prefix, char, _) => match prefix {
                IntPrefix::Binary => write!(
                    f,
                    "binary digit `{char}` out of range, valid digits are `0` and `1`"
                ),
                IntPrefix::Octal => write!(
                    f,
                    "octal digit `{char}` out of range, valid digits are `0-7`"
                ),
                IntPrefix::Hexadecimal => write!(
                    f,
                    "hexadecimal digit `{char}` out of range, valid digits are `0-9`, `a-f` and `A-F`"
                ),
            },
            PrefixedIntSigned(_) => write!(
                f,
                "signs are not permitted for binary, octal, and hexadecimal integers"
            ),
            IntOverflow(_) => write!(
                f,
                "integer literal overflow, number doesn't fit into a 64-bit signed integer"
            ),
            MissingFloatFractionalPart(_) => write!(
                f,
                "missing fractional part of float literal, expected at least one digit"
            ),
            InvalidCharInNum(char, _) => {
                write!(f, "invalid character `{char}` in number literal")
            }
            InvalidLiteral(lit, _) => write!(f, "invalid literal `{lit}`"),

            InvalidCharInDateTime(char, _) => {
                write!(f, "invalid character `{char}` in date-time")
            }
            DateTimeIncomplete(field, _) => {
                write!(f, "incomplete date-time, {field} is missing digits")
            }
            DateTimeExpectedCharFound {
                after,
                expected,
                found,
                ..
            } => write!(
                f,
                "invalid character `{found}` in date-time after {after}, expected `{expected}`"
            ),
            DateTimeMissingChar(field, expected, _) => write!(
                f,
                "incomplete date-time, missing character `{expected}` after {field}"
            ),
            DateTimeOutOfRange(field, val, (min, max), _) => write!(
                f,
                "date-time {field} `{val}` out of range, the valid range is `{min}..={max}`"
            ),
            DateTimeMissingSubsec(_) => write!(
                f,
                "missing date-time fractional second, expected at least one digit"
            ),
            LocalTimeOffset(_) => write!(f, "local times don't permit an offset"),

            DuplicateKey { path, .. } => write!(f, "duplicate key `{path}`"),
            DuplicateTable { path, .. } => write!(f, "table `{path}` is already defined"),
            TypeConflict { path, existing, .. } => {
                write!(f, "`{path}` is already defined as a {existing}")
            }
            ExtendInlineTable { path, .. } => {
                write!(f, "cannot extend the inline table `{path}`")
            }
            ExtendStaticArray { path, .. } => {
                write!(f, "cannot extend the array `{path}`")
            }

            HeterogeneousArray {
                expected, found, ..
            } => write!(
                f,
                "mixed types in array, expected {expected} elements but found a {found}"
            ),
            HeterogeneousArrayValue {
                path,
                expected,
                found,
            } => write!(
                f,
                "mixed types in array `{path}`, expected {expected} elements but found a {found}"
            ),

            NonTableRoot(datatype) => {
                write!(f, "cannot encode a {datatype} at the document root")
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.description(f)?;
        if let Some(line) = self.line() {
            write!(f, " at line {line}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

/// Wrapper that escapes control characters when displayed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct FmtChar(pub char);

impl std::fmt::Display for FmtChar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            '\u{8}' => f.write_str("\\b"),
            '\t' => f.write_str("\\t"),
            '\n' => f.write_str("\\n"),
            '\u{C}' => f.write_str("\\f"),
            '\r' => f.write_str("\\r"),
            '\x00'..='\x1f' | '\x7f' => write!(f, "\\x{:02x}", self.0 as u8),
            c => f.write_char(c),
        }
    }
}

impl From<char> for FmtChar {
    fn from(value: char) -> Self {
        Self(value)
    }
}

impl Deref for FmtChar {
    type Target = char;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Wrapper that escapes control characters when displayed.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct FmtStr(pub Box<str>);

impl std::fmt::Display for FmtStr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for c in self.0.chars() {
            std::fmt::Display::fmt(&FmtChar(c), f)?;
        }
        Ok(())
    }
}

impl FmtStr {
    pub fn from_string(value: String) -> Self {
        Self(value.into_boxed_str())
    }

    pub fn from_str(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<&str> for FmtStr {
    fn from(value: &str) -> Self {
        Self::from_str(value)
    }
}

impl Deref for FmtStr {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
