use std::borrow::Cow;

use crate::error::FmtChar;
use crate::Error;

#[cfg(test)]
mod test;

pub(crate) type CharIter<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Tokens<'a> {
    pub tokens: Vec<Token>,
    pub strings: Vec<StringToken<'a>>,
    pub literals: Vec<&'a str>,
    pub eof: Token,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Token {
    pub ty: TokenType,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TokenType {
    String(StringId),
    /// A run of non-whitespace, non-punctuation characters. Whether this is a
    /// key or a scalar literal is decided by the parser based on position.
    LiteralOrIdent(LiteralId),
    SquareLeft,
    SquareRight,
    CurlyLeft,
    CurlyRight,
    Equal,
    Comma,
    Dot,
    Newline,
    EOF,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct StringId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LiteralId(pub u32);

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct StringToken<'a> {
    pub quote: Quote,
    /// The literal exactly as it is written in the document.
    pub lit: &'a str,
    /// The text with escape sequences evaluated.
    pub text: Cow<'a, str>,
    pub text_span: Span,
}

impl TokenType {
    pub(crate) fn display(
        &self,
        f: &mut impl std::fmt::Write,
        strings: &[StringToken<'_>],
        literals: &[&str],
    ) -> std::fmt::Result {
        match self {
            TokenType::String(id) => f.write_str(strings[id.0 as usize].lit),
            TokenType::LiteralOrIdent(id) => f.write_str(literals[id.0 as usize]),
            TokenType::SquareLeft => f.write_char('['),
            TokenType::SquareRight => f.write_char(']'),
            TokenType::CurlyLeft => f.write_char('{'),
            TokenType::CurlyRight => f.write_char('}'),
            TokenType::Equal => f.write_char('='),
            TokenType::Comma => f.write_char(','),
            TokenType::Dot => f.write_char('.'),
            TokenType::Newline => f.write_str("\\n"),
            TokenType::EOF => f.write_str("EOF"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    #[inline(always)]
    pub fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    #[inline(always)]
    pub fn from_pos_len(start: Pos, len: u32) -> Self {
        Self {
            start,
            end: start.plus(len),
        }
    }

    #[inline(always)]
    pub fn pos(pos: Pos) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    #[inline(always)]
    pub fn ascii_char(pos: Pos) -> Self {
        Self {
            start: pos,
            end: pos.plus(1),
        }
    }

    #[inline(always)]
    pub fn across(a: Self, b: Self) -> Self {
        Self {
            start: a.start,
            end: b.end,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pos {
    /// 0-based index of line
    pub line: u32,
    /// utf-8 byte index within the line
    pub char: u32,
}

impl Pos {
    pub const ZERO: Self = Self::new(0, 0);

    #[inline(always)]
    pub const fn new(line: u32, char: u32) -> Self {
        Self { line, char }
    }

    #[inline(always)]
    pub fn after(&self, c: char) -> Self {
        Self {
            line: self.line,
            char: self.char + c.len_utf8() as u32,
        }
    }

    #[inline(always)]
    pub fn plus(&self, n: u32) -> Self {
        Self {
            line: self.line,
            char: self.char + n,
        }
    }

    #[inline(always)]
    pub fn minus(&self, n: u32) -> Self {
        Self {
            line: self.line,
            char: self.char - n,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quote {
    /// "
    Basic,
    /// """
    BasicMultiline,
    /// '
    Literal,
    /// '''
    LiteralMultiline,
}

impl std::fmt::Display for Quote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quote::Basic => f.write_str("\""),
            Quote::BasicMultiline => f.write_str("\"\"\""),
            Quote::Literal => f.write_str("'"),
            Quote::LiteralMultiline => f.write_str("'''"),
        }
    }
}

impl Quote {
    pub fn len(&self) -> u32 {
        match self {
            Quote::Basic | Quote::Literal => 1,
            Quote::BasicMultiline | Quote::LiteralMultiline => 3,
        }
    }

    pub fn is_basic(&self) -> bool {
        matches!(self, Self::Basic | Self::BasicMultiline)
    }

    pub fn is_multiline(&self) -> bool {
        matches!(self, Self::BasicMultiline | Self::LiteralMultiline)
    }

    pub fn matches(&self, c: char) -> bool {
        self.char() == c
    }

    pub fn char(&self) -> char {
        match self {
            Quote::Basic | Quote::BasicMultiline => '"',
            Quote::Literal | Quote::LiteralMultiline => '\'',
        }
    }

    fn multiline(&self) -> Self {
        match self {
            Quote::Basic | Quote::BasicMultiline => Self::BasicMultiline,
            Quote::Literal | Quote::LiteralMultiline => Self::LiteralMultiline,
        }
    }
}

#[derive(Debug)]
struct Lexer<'a> {
    input: &'a str,
    chars: CharIter<'a>,

    line_idx: u32,
    line_byte_start: usize,
    byte_pos: usize,

    in_lit: bool,
    lit_start: Pos,
    lit_byte_start: usize,

    tokens: Vec<Token>,
    strings: Vec<StringToken<'a>>,
    literals: Vec<&'a str>,
}

#[derive(Debug)]
struct StrState {
    /// Only set once the decoded text diverges from the input slice, so
    /// escape-free strings borrow from the input.
    text: Option<String>,
    text_start: Pos,
    text_byte_start: usize,
    quote: Quote,
}

impl StrState {
    fn push_char(&mut self, c: char) {
        if let Some(text) = &mut self.text {
            text.push(c);
        }
    }

    /// Switch to an owned text buffer containing everything decoded so far.
    fn make_owned(&mut self, input: &str, up_to: usize) {
        if self.text.is_none() {
            self.text = Some(String::from(&input[self.text_byte_start..up_to]));
        }
    }
}

/// Turns the document into a flat token stream. The first malformed
/// construct aborts the whole run, nothing is recovered.
pub(crate) fn lex(input: &str) -> Result<Tokens<'_>, Error> {
    let mut lexer = Lexer::new(input);
    while let Some(c) = lexer.next() {
        match c {
            '\n' => {
                lexer.newline_token();
                lexer.newline();
            }
            '\r' => {
                lexer.end_literal();
                if lexer.peek() != Some('\n') {
                    return Err(Error::UnexpectedChar(FmtChar('\r'), lexer.pos()));
                }
                lexer.newline_token();
                lexer.next();
                lexer.newline();
            }
            '\t' | ' ' => lexer.end_literal(),
            '"' | '\'' => {
                lexer.end_literal();

                lexer.lit_byte_start = lexer.byte_pos;
                lexer.lit_start = lexer.pos();
                let mut quote = match c {
                    '"' => Quote::Basic,
                    _ => Quote::Literal,
                };
                if Some(c) == lexer.peek() {
                    lexer.next();

                    if Some(c) == lexer.peek() {
                        lexer.next();
                        quote = quote.multiline();
                    } else {
                        // just an empty string
                        let text_span = Span::pos(lexer.pos());
                        let lit_end = lexer.byte_pos + 1;
                        let id = lexer.store_string(StringToken {
                            quote,
                            lit: &input[lexer.lit_byte_start..lit_end],
                            text: Cow::Borrowed(""),
                            text_span,
                        });
                        lexer.tokens.push(Token {
                            span: Span::from_pos_len(lexer.lit_start, 2),
                            ty: TokenType::String(id),
                        });
                        continue;
                    }
                }

                // a newline right after the opening quotes of a multi-line
                // string is not part of the text
                let stripped = quote.is_multiline() && lexer.strip_leading_newline();
                let (text_start, text_byte_start) = if stripped {
                    (lexer.pos(), lexer.byte_pos)
                } else {
                    (lexer.pos().plus(1), lexer.byte_pos + 1)
                };
                let mut str_state = StrState {
                    text: None,
                    text_start,
                    text_byte_start,
                    quote,
                };
                lexer.string(&mut str_state)?;
            }
            '[' => lexer.char_token(TokenType::SquareLeft),
            ']' => lexer.char_token(TokenType::SquareRight),
            '{' => lexer.char_token(TokenType::CurlyLeft),
            '}' => lexer.char_token(TokenType::CurlyRight),
            '=' => lexer.char_token(TokenType::Equal),
            '.' => lexer.char_token(TokenType::Dot),
            ',' => lexer.char_token(TokenType::Comma),
            '#' => lexer.comment()?,
            _ => lexer.start_literal(),
        }
    }

    lexer.end_literal();

    let eof = Token {
        ty: TokenType::EOF,
        span: Span::pos(lexer.pos()),
    };
    Ok(Tokens {
        tokens: lexer.tokens,
        strings: lexer.strings,
        literals: lexer.literals,
        eof,
    })
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            line_idx: 0,
            line_byte_start: 0,
            byte_pos: 0,
            tokens: Vec::new(),
            strings: Vec::new(),
            literals: Vec::new(),
            in_lit: false,
            lit_start: Pos::ZERO,
            lit_byte_start: 0,
        }
    }

    fn newline(&mut self) {
        self.line_idx += 1;
        self.byte_pos += 1;
        self.line_byte_start = self.byte_pos;
    }

    fn store_string(&mut self, string: StringToken<'a>) -> StringId {
        let id = self.strings.len();
        self.strings.push(string);
        StringId(id as u32)
    }

    fn store_literal(&mut self, lit: &'a str) -> LiteralId {
        let id = self.literals.len();
        self.literals.push(lit);
        LiteralId(id as u32)
    }

    fn next(&mut self) -> Option<char> {
        match self.chars.next() {
            Some((ci, c)) => {
                self.byte_pos = ci;
                Some(c)
            }
            None => {
                self.byte_pos = self.input.len();
                None
            }
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_second(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().map(|(_, c)| c)
    }

    fn pos(&self) -> Pos {
        Pos {
            line: self.line_idx,
            char: (self.byte_pos - self.line_byte_start) as u32,
        }
    }

    /// Consumes a single LF or CRLF directly following the opening quotes of
    /// a multi-line string. Afterwards `byte_pos` points at the first text
    /// byte.
    fn strip_leading_newline(&mut self) -> bool {
        match self.peek() {
            Some('\n') => {
                self.next();
                self.newline();
                true
            }
            Some('\r') if self.peek_second() == Some('\n') => {
                self.next();
                self.next();
                self.newline();
                true
            }
            _ => false,
        }
    }

    fn string(&mut self, str: &mut StrState) -> Result<(), Error> {
        loop {
            let Some(c) = self.next() else {
                return Err(Error::UnterminatedString(
                    str.quote,
                    self.lit_start,
                    self.pos(),
                ));
            };

            if str.quote.matches(c) {
                let text_end = self.byte_pos;
                if str.quote.is_multiline() {
                    if Some(str.quote.char()) == self.peek() {
                        self.next();
                    } else {
                        str.push_char(c);
                        continue;
                    }

                    if Some(str.quote.char()) == self.peek() {
                        self.next();
                    } else {
                        str.push_char(c);
                        str.push_char(c);
                        continue;
                    }
                }

                let lit_end = self.byte_pos + 1;
                self.end_string(str, text_end, lit_end);
                return Ok(());
            } else if c == '\n' {
                if !str.quote.is_multiline() {
                    return Err(Error::UnterminatedString(
                        str.quote,
                        self.lit_start,
                        self.pos(),
                    ));
                }

                str.push_char(c);
                self.newline();
            } else if c == '\r' {
                if !str.quote.is_multiline() || self.peek() != Some('\n') {
                    return Err(Error::UnexpectedChar(FmtChar('\r'), self.pos()));
                }

                // CRLF inside multi-line strings decodes as a plain LF
                str.make_owned(self.input, self.byte_pos);
                self.next();
                str.push_char('\n');
                self.newline();
            } else if str.quote.is_basic() && c == '\\' {
                str.make_owned(self.input, self.byte_pos);
                self.string_escape(str, self.pos())?;
            } else {
                str.push_char(c);
            }
        }
    }

    fn string_escape(&mut self, str: &mut StrState, esc_start: Pos) -> Result<(), Error> {
        let Some(c) = self.next() else {
            return Err(Error::UnfinishedEscapeSequence(Span::new(
                esc_start,
                self.pos(),
            )));
        };

        match c {
            'u' => return self.string_escape_unicode(str, esc_start, 4),
            'U' => return self.string_escape_unicode(str, esc_start, 8),
            'b' => str.push_char('\u{8}'),
            't' => str.push_char('\t'),
            'n' => str.push_char('\n'),
            'f' => str.push_char('\u{C}'),
            'r' => str.push_char('\r'),
            '"' => str.push_char('"'),
            '\\' => str.push_char('\\'),
            '\r' if str.quote.is_multiline() && self.peek() == Some('\n') => {
                self.next();
                self.newline();
                self.eat_continuation_whitespace()?;
            }
            '\n' => {
                if !str.quote.is_multiline() {
                    return Err(Error::UnterminatedString(
                        str.quote,
                        self.lit_start,
                        self.pos(),
                    ));
                }

                // the newline was escaped, also discard any whitespace at
                // the start of the following lines
                self.newline();
                self.eat_continuation_whitespace()?;
            }
            _ => return Err(Error::InvalidEscapeChar(FmtChar(c), self.pos())),
        }

        Ok(())
    }

    fn eat_continuation_whitespace(&mut self) -> Result<(), Error> {
        loop {
            match self.peek() {
                Some(' ' | '\t') => {
                    self.next();
                }
                Some('\n') => {
                    self.next();
                    self.newline();
                }
                Some('\r') => {
                    self.next();
                    if self.peek() != Some('\n') {
                        return Err(Error::UnexpectedChar(FmtChar('\r'), self.pos()));
                    }
                    self.next();
                    self.newline();
                }
                _ => return Ok(()),
            }
        }
    }

    fn string_escape_unicode(
        &mut self,
        str: &mut StrState,
        esc_start: Pos,
        num_chars: u8,
    ) -> Result<(), Error> {
        let mut remaining = num_chars;
        let mut cp = 0;
        let mut last = '\0';
        while remaining > 0 {
            let Some(c) = self.next() else {
                return Err(Error::UnfinishedEscapeSequence(Span::new(
                    esc_start,
                    self.pos(),
                )));
            };
            remaining -= 1;
            last = c;

            let offset = remaining as u32 * 4;
            match c {
                '0'..='9' => cp += (c as u32 - '0' as u32) << offset,
                'a'..='f' => cp += (c as u32 - 'a' as u32 + 10) << offset,
                'A'..='F' => cp += (c as u32 - 'A' as u32 + 10) << offset,
                _ => return Err(Error::InvalidUnicodeEscapeChar(FmtChar(c), self.pos())),
            }
        }

        match char::from_u32(cp) {
            Some(char) => str.push_char(char),
            // unpaired surrogates decode leniently as the replacement
            // character, everything else out of range is refused
            None if (0xD800..=0xDFFF).contains(&cp) => str.push_char('\u{FFFD}'),
            None => {
                return Err(Error::InvalidUnicodeCodepoint(
                    cp,
                    Span::new(esc_start, self.pos().after(last)),
                ));
            }
        }

        Ok(())
    }

    fn start_literal(&mut self) {
        if !self.in_lit {
            self.lit_byte_start = self.byte_pos;
            self.lit_start = self.pos();
            self.in_lit = true;
        }
    }

    fn end_literal(&mut self) {
        if !self.in_lit {
            return;
        }
        let lit = &self.input[self.lit_byte_start..self.byte_pos];
        let span = Span::new(self.lit_start, self.pos());
        let id = self.store_literal(lit);
        self.tokens.push(Token {
            span,
            ty: TokenType::LiteralOrIdent(id),
        });

        self.in_lit = false;
    }

    fn end_string(&mut self, str: &mut StrState, text_byte_end: usize, lit_byte_end: usize) {
        let lit = &self.input[self.lit_byte_start..lit_byte_end];

        let text = match str.text.take() {
            Some(text) => Cow::Owned(text),
            None => Cow::Borrowed(&self.input[str.text_byte_start..text_byte_end]),
        };

        let lit_span = Span {
            start: self.lit_start,
            end: Pos {
                line: self.line_idx,
                char: (lit_byte_end - self.line_byte_start) as u32,
            },
        };
        let text_span = Span {
            start: str.text_start,
            end: Pos {
                line: self.line_idx,
                char: (text_byte_end - self.line_byte_start) as u32,
            },
        };

        let id = self.store_string(StringToken {
            quote: str.quote,
            lit,
            text,
            text_span,
        });
        self.tokens.push(Token {
            span: lit_span,
            ty: TokenType::String(id),
        });

        self.in_lit = false;
    }

    fn char_token(&mut self, ty: TokenType) {
        self.end_literal();

        self.tokens.push(Token {
            span: Span::ascii_char(self.pos()),
            ty,
        });
    }

    fn newline_token(&mut self) {
        self.end_literal();

        let start = self.pos();
        let end = Pos {
            line: start.line + 1,
            char: 0,
        };
        self.tokens.push(Token {
            span: Span { start, end },
            ty: TokenType::Newline,
        });
    }

    /// Comments never become tokens, everything up to the line end is
    /// discarded. The terminating newline is left for the main loop.
    fn comment(&mut self) -> Result<(), Error> {
        self.end_literal();

        loop {
            match self.peek() {
                None | Some('\n') => return Ok(()),
                Some('\r') => {
                    if self.peek_second() == Some('\n') {
                        self.next();
                        return Ok(());
                    }
                    self.next();
                    return Err(Error::UnexpectedChar(FmtChar('\r'), self.pos()));
                }
                Some(_) => {
                    self.next();
                }
            }
        }
    }
}
