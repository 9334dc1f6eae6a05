use crate::datetime::{Date, DateTime, Time};
use crate::error::{FmtChar, FmtStr};
use crate::lex::{
    self, LiteralId, Pos, Span, StringId, StringToken, Token, TokenType, Tokens,
};
use crate::map::{self, ArrayNode, Node, TableNode, TableOrigin};
use crate::value::{array_type_mismatch, Table, Value};
use crate::{Error, Options};

pub(crate) mod datetime;
pub(crate) mod num;
#[cfg(test)]
mod test;

/// One segment of a (possibly dotted) key, with escapes already evaluated.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Ident<'a> {
    pub text: &'a str,
    pub span: Span,
}

/// A key as written on the left hand side of an assignment or inside a
/// table header. Always holds at least one segment.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Key<'a> {
    pub idents: Vec<Ident<'a>>,
}

/// A scalar literal that may continue in the following tokens: floats are
/// split at the fractional dot, date-times at the sub-second dot or the
/// space between date and time.
pub(crate) enum Partial {
    Int(i64),
    PrefixedInt(i64),
    /// Doesn't fit an `i64`, only valid as the integral part of a float.
    OverflowOrFloat,
    /// A float with an exponent, no fractional part may follow.
    FloatWithExp,
    /// A complete date-time including an offset.
    DateTime(DateTime),
    /// Just the date, might be followed by a space separated time token.
    PartialDate(Date),
    /// Date and time, might be followed by sub-second digits.
    PartialDateTime(Date, Time),
    /// A local time, might be followed by sub-second digits.
    PartialTime(Time),
}

#[derive(Debug)]
struct Parser<'a> {
    strings: &'a [StringToken<'a>],
    literals: &'a [&'a str],
    tokens: &'a [Token],
    cursor: usize,
    eof: Token,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a Tokens<'a>) -> Self {
        Self {
            strings: &tokens.strings,
            literals: &tokens.literals,
            tokens: &tokens.tokens,
            cursor: 0,
            eof: tokens.eof,
        }
    }

    fn next(&mut self) -> Token {
        if self.cursor < self.tokens.len() {
            let t = self.tokens[self.cursor];
            self.cursor += 1;
            t
        } else {
            self.eof
        }
    }

    fn peek(&mut self) -> Token {
        if self.cursor < self.tokens.len() {
            self.tokens[self.cursor]
        } else {
            self.eof
        }
    }

    fn string(&self, id: StringId) -> &'a StringToken<'a> {
        &self.strings[id.0 as usize]
    }

    fn literal(&self, id: LiteralId) -> &'a str {
        self.literals[id.0 as usize]
    }

    fn token_fmt(&self, ty: TokenType) -> FmtStr {
        let mut string = String::new();
        _ = ty.display(&mut string, self.strings, self.literals);
        FmtStr::from_string(string)
    }
}

/// Decodes a whole document into its root table. The first error aborts the
/// parse, no partial tree is ever returned.
pub(crate) fn parse(input: &str, options: &Options) -> Result<Table, Error> {
    let tokens = lex::lex(input)?;
    let mut parser = Parser::new(&tokens);

    let mut root = TableNode::new(TableOrigin::Root);
    let mut path: Vec<String> = Vec::new();

    let mut newline_required = false;
    loop {
        if newline_required {
            match parser.peek() {
                t if t.ty == TokenType::Newline => {
                    parser.next();
                }
                t if t.ty == TokenType::EOF => break,
                t => {
                    return Err(Error::ExpectedNewlineFound(parser.token_fmt(t.ty), t.span));
                }
            }
            newline_required = false;
        }

        let token = parser.peek();
        match token.ty {
            TokenType::SquareLeft => {
                let l_square = parser.next();

                // `[ [a] ]` is not an array of tables header
                let second = parser.peek();
                let array = second.ty == TokenType::SquareLeft
                    && l_square.span.end == second.span.start;
                if array {
                    parser.next();
                }

                let key = parse_key(&mut parser)?;

                let r_square = match parser.peek() {
                    t if t.ty == TokenType::SquareRight => parser.next(),
                    t => {
                        return Err(Error::ExpectedRightSquareFound(
                            parser.token_fmt(t.ty),
                            t.span,
                        ));
                    }
                };
                if array {
                    match parser.peek() {
                        t if t.ty == TokenType::SquareRight
                            && r_square.span.end == t.span.start =>
                        {
                            parser.next();
                        }
                        t => {
                            return Err(Error::ExpectedRightSquareFound(
                                parser.token_fmt(t.ty),
                                t.span,
                            ));
                        }
                    }
                    map::open_array_entry(&mut root, &key)?;
                } else {
                    map::open_table(&mut root, &key)?;
                }

                path.clear();
                path.extend(key.idents.iter().map(|i| i.text.to_string()));
                newline_required = true;
            }
            TokenType::Newline => {
                parser.next();
            }
            TokenType::EOF => break,
            _ => {
                let key = parse_key(&mut parser)?;
                match parser.peek() {
                    t if t.ty == TokenType::Equal => {
                        parser.next();
                    }
                    t => return Err(Error::ExpectedEqFound(parser.token_fmt(t.ty), t.span)),
                }
                let node = parse_node(&mut parser, options)?;

                let table = map::current_table(&mut root, &path);
                map::insert_entry(table, &path, &key, node)?;
                newline_required = true;
            }
        }
    }

    Ok(root.into_table())
}

fn parse_key<'t>(parser: &mut Parser<'t>) -> Result<Key<'t>, Error> {
    let mut idents = Vec::new();
    loop {
        let token = parser.peek();
        let ident = match token.ty {
            TokenType::String(id) => {
                let str = parser.string(id);
                if str.quote.is_multiline() {
                    return Err(Error::MultilineStringKey(token.span));
                }
                Ident {
                    text: str.text.as_ref(),
                    span: token.span,
                }
            }
            TokenType::LiteralOrIdent(id) => {
                let lit = parser.literal(id);
                let invalid_char = lit
                    .char_indices()
                    .find(|(_, c)| !matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-'));

                if let Some((i, c)) = invalid_char {
                    let pos = token.span.start.plus(i as u32);
                    return Err(Error::InvalidCharInKey(FmtChar(c), pos));
                }

                Ident {
                    text: lit,
                    span: token.span,
                }
            }
            _ => {
                return Err(Error::ExpectedKeyFound(parser.token_fmt(token.ty), token.span));
            }
        };
        parser.next();
        idents.push(ident);

        match parser.peek() {
            t if t.ty == TokenType::Dot => {
                parser.next();
            }
            _ => return Ok(Key { idents }),
        }
    }
}

fn parse_node(parser: &mut Parser<'_>, options: &Options) -> Result<Node, Error> {
    let token = parser.peek();
    let node = match token.ty {
        TokenType::String(id) => {
            parser.next();
            let str = parser.string(id);
            Node::Val(Value::String(str.text.to_string()))
        }
        TokenType::LiteralOrIdent(id) => {
            let token = parser.next();
            let lit = parser.literal(id);

            match lit {
                "true" => Node::Val(inflate_bool(options, true)),
                "false" => Node::Val(inflate_bool(options, false)),
                // the sign of nan is not preserved
                "nan" | "+nan" | "-nan" => Node::Val(Value::Float(f64::NAN)),
                "inf" | "+inf" => Node::Val(Value::Float(f64::INFINITY)),
                "-inf" => Node::Val(Value::Float(f64::NEG_INFINITY)),
                _ => match num::parse_num_or_date(lit, token.span)? {
                    Partial::PrefixedInt(i) | Partial::Int(i)
                        if !fraction_follows(parser, token.span) =>
                    {
                        Node::Val(Value::Int(i))
                    }
                    Partial::PrefixedInt(_) | Partial::Int(_) => {
                        Node::Val(parse_float_fraction(parser, lit, token.span)?)
                    }
                    Partial::OverflowOrFloat => {
                        if !fraction_follows(parser, token.span) {
                            return Err(Error::IntOverflow(token.span));
                        }
                        Node::Val(parse_float_fraction(parser, lit, token.span)?)
                    }
                    Partial::FloatWithExp => match lit.replace('_', "").parse() {
                        Ok(v) => Node::Val(Value::Float(v)),
                        Err(_) => {
                            return Err(Error::InvalidLiteral(
                                FmtStr::from_str(lit),
                                token.span,
                            ));
                        }
                    },
                    Partial::DateTime(val) => Node::Val(inflate_datetime(options, val)),
                    Partial::PartialDate(date) => {
                        Node::Val(parse_time_part(parser, options, token.span, date)?)
                    }
                    Partial::PartialDateTime(date, time) => Node::Val(parse_subsec_part(
                        parser,
                        options,
                        token.span,
                        Some(date),
                        time,
                    )?),
                    Partial::PartialTime(time) => {
                        Node::Val(parse_subsec_part(parser, options, token.span, None, time)?)
                    }
                },
            }
        }
        TokenType::SquareLeft => {
            let l_par = parser.next().span;

            let mut values = Vec::new();
            let r_par = loop {
                while parser.peek().ty == TokenType::Newline {
                    parser.next();
                }
                if parser.peek().ty == TokenType::SquareRight {
                    break parser.next().span;
                }

                let node = parse_node(parser, options)?;
                values.push(node.into_value());

                while parser.peek().ty == TokenType::Newline {
                    parser.next();
                }
                match parser.peek() {
                    t if t.ty == TokenType::Comma => {
                        parser.next();
                    }
                    t if t.ty == TokenType::SquareRight => break parser.next().span,
                    t if t.ty == TokenType::EOF => {
                        return Err(Error::ExpectedRightSquareFound(
                            parser.token_fmt(t.ty),
                            t.span,
                        ));
                    }
                    t => return Err(Error::MissingComma(t.span.start)),
                }
            };

            if options.strict_arrays {
                if let Some((expected, found)) = array_type_mismatch(&values) {
                    return Err(Error::HeterogeneousArray {
                        expected,
                        found,
                        span: Span::across(l_par, r_par),
                    });
                }
            }

            // closed with `]`, no later syntax may extend this
            Node::Array(ArrayNode::Inline(values))
        }
        TokenType::CurlyLeft => {
            parser.next();

            let mut table = TableNode::new(TableOrigin::Inline);
            let mut comma: Option<Pos> = None;
            loop {
                let t = parser.peek();
                if t.ty == TokenType::CurlyRight {
                    if let Some(pos) = comma {
                        return Err(Error::InlineTableTrailingComma(pos));
                    }
                    break;
                }
                if t.ty == TokenType::Newline || t.ty == TokenType::EOF {
                    return Err(Error::ExpectedRightCurlyFound(
                        parser.token_fmt(t.ty),
                        t.span,
                    ));
                }

                let key = parse_key(parser)?;
                match parser.peek() {
                    t if t.ty == TokenType::Equal => {
                        parser.next();
                    }
                    t => return Err(Error::ExpectedEqFound(parser.token_fmt(t.ty), t.span)),
                }
                let node = parse_node(parser, options)?;
                map::insert_entry(&mut table, &[], &key, node)?;

                match parser.peek() {
                    t if t.ty == TokenType::Comma => {
                        comma = Some(parser.next().span.start);
                    }
                    t if t.ty == TokenType::CurlyRight => break,
                    t if t.ty == TokenType::Newline || t.ty == TokenType::EOF => {
                        return Err(Error::ExpectedRightCurlyFound(
                            parser.token_fmt(t.ty),
                            t.span,
                        ));
                    }
                    t => return Err(Error::MissingComma(t.span.start)),
                }
            }
            parser.next();

            // closed with `}`, sealed from here on
            Node::Table(table)
        }
        _ => {
            return Err(Error::ExpectedValueFound(parser.token_fmt(token.ty), token.span));
        }
    };

    Ok(node)
}

/// Whether the next token is a `.` directly following the current literal,
/// which makes the literal the integral part of a float.
fn fraction_follows(parser: &mut Parser<'_>, int_span: Span) -> bool {
    let t = parser.peek();
    t.ty == TokenType::Dot && int_span.end == t.span.start
}

/// Joins `<int>.<frac>` back together after the lexer split the float at
/// the dot.
fn parse_float_fraction(
    parser: &mut Parser<'_>,
    int_lit: &str,
    int_span: Span,
) -> Result<Value, Error> {
    let dot = parser.next();

    let frac = parser.peek();
    let frac_lit = match frac.ty {
        TokenType::LiteralOrIdent(id) if dot.span.end == frac.span.start => {
            parser.next();
            parser.literal(id)
        }
        _ => return Err(Error::MissingFloatFractionalPart(dot.span.end)),
    };

    num::validate_float_fractional_part(frac_lit, frac.span)?;

    let lit = format!("{int_lit}.{frac_lit}");
    match lit.replace('_', "").parse() {
        Ok(val) => Ok(Value::Float(val)),
        Err(_) => Err(Error::InvalidLiteral(
            FmtStr::from_string(lit),
            Span::across(int_span, frac.span),
        )),
    }
}

/// The date and time of an RFC 3339 timestamp may be separated by a space
/// instead of `T`, in which case the time is inside the next token.
fn parse_time_part(
    parser: &mut Parser<'_>,
    options: &Options,
    date_span: Span,
    date: Date,
) -> Result<Value, Error> {
    let token = parser.peek();
    let (time_lit, time_span) = match token.ty {
        TokenType::LiteralOrIdent(id)
            if token.span.start.line == date_span.end.line
                && token.span.start.char == date_span.end.char + 1 =>
        {
            parser.next();
            (parser.literal(id), token.span)
        }
        _ => return Ok(inflate_datetime(options, DateTime::LocalDate(date))),
    };

    let mut chars = time_lit.char_indices().peekable();
    let (time, offset) = datetime::parse_time_and_offset(&mut chars, time_span)?;

    if let Some(offset) = offset {
        let val = DateTime::OffsetDateTime(date, time, offset);
        return Ok(inflate_datetime(options, val));
    }

    parse_subsec_part(
        parser,
        options,
        Span::across(date_span, time_span),
        Some(date),
        time,
    )
}

fn parse_subsec_part(
    parser: &mut Parser<'_>,
    options: &Options,
    span: Span,
    date: Option<Date>,
    time: Time,
) -> Result<Value, Error> {
    let dot = match parser.peek() {
        t if t.ty == TokenType::Dot && span.end == t.span.start => parser.next(),
        _ => {
            let val = match date {
                Some(date) => DateTime::LocalDateTime(date, time),
                None => DateTime::LocalTime(time),
            };
            return Ok(inflate_datetime(options, val));
        }
    };

    let token = parser.peek();
    let subsec_lit = match token.ty {
        TokenType::LiteralOrIdent(id) if dot.span.end == token.span.start => {
            parser.next();
            parser.literal(id)
        }
        _ => return Err(Error::DateTimeMissingSubsec(dot.span.end)),
    };

    let val = datetime::parse_subsec_part(subsec_lit, token.span, date, time)?;
    Ok(inflate_datetime(options, val))
}

fn inflate_bool(options: &Options, val: bool) -> Value {
    match &options.inflate_boolean {
        Some(hook) => hook(val),
        None => Value::Bool(val),
    }
}

fn inflate_datetime(options: &Options, val: DateTime) -> Value {
    match &options.inflate_datetime {
        Some(hook) => hook(&val),
        None => Value::DateTime(val),
    }
}
