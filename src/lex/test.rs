use super::*;

use pretty_assertions::assert_eq;

fn check(input: &str, expected: Tokens<'_>) {
    let tokens = lex(input).unwrap();
    assert_eq!(tokens, expected);
}

fn check_err(input: &str, expected: Error) {
    let error = lex(input).unwrap_err();
    assert_eq!(error, expected);
}

fn check_str(input: &str, expected_lit: &str, expected_text: &str) {
    let tokens = lex(input).unwrap();
    assert_eq!(tokens.tokens.len(), 1, "{tokens:#?}");

    let token = tokens.tokens.into_iter().next().unwrap();
    match token.ty {
        TokenType::String(id) => {
            let str = &tokens.strings[id.0 as usize];
            assert_eq!(str.lit, expected_lit, "literals don't match");
            assert_eq!(str.text, expected_text, "text doesn't match");
        }
        t => panic!("found token type {t:?}, expected a string"),
    }
}

#[test]
fn assign_int() {
    check(
        "port = 8080",
        Tokens {
            tokens: vec![
                Token {
                    ty: TokenType::LiteralOrIdent(LiteralId(0)),
                    span: Span {
                        start: Pos { line: 0, char: 0 },
                        end: Pos { line: 0, char: 4 },
                    },
                },
                Token {
                    ty: TokenType::Equal,
                    span: Span {
                        start: Pos { line: 0, char: 5 },
                        end: Pos { line: 0, char: 6 },
                    },
                },
                Token {
                    ty: TokenType::LiteralOrIdent(LiteralId(1)),
                    span: Span {
                        start: Pos { line: 0, char: 7 },
                        end: Pos { line: 0, char: 11 },
                    },
                },
            ],
            strings: vec![],
            literals: vec!["port", "8080"],
            eof: Token {
                ty: TokenType::EOF,
                span: Span::pos(Pos { line: 0, char: 11 }),
            },
        },
    );
}

#[test]
fn table_header() {
    check(
        "[server]\n",
        Tokens {
            tokens: vec![
                Token {
                    ty: TokenType::SquareLeft,
                    span: Span {
                        start: Pos { line: 0, char: 0 },
                        end: Pos { line: 0, char: 1 },
                    },
                },
                Token {
                    ty: TokenType::LiteralOrIdent(LiteralId(0)),
                    span: Span {
                        start: Pos { line: 0, char: 1 },
                        end: Pos { line: 0, char: 7 },
                    },
                },
                Token {
                    ty: TokenType::SquareRight,
                    span: Span {
                        start: Pos { line: 0, char: 7 },
                        end: Pos { line: 0, char: 8 },
                    },
                },
                Token {
                    ty: TokenType::Newline,
                    span: Span {
                        start: Pos { line: 0, char: 8 },
                        end: Pos { line: 1, char: 0 },
                    },
                },
            ],
            strings: vec![],
            literals: vec!["server"],
            eof: Token {
                ty: TokenType::EOF,
                span: Span::pos(Pos { line: 1, char: 0 }),
            },
        },
    );
}

#[test]
fn float_is_split_at_the_dot() {
    let tokens = lex("ratio=0.25").unwrap();
    let types: Vec<TokenType> = tokens.tokens.iter().map(|t| t.ty).collect();
    assert_eq!(
        types,
        [
            TokenType::LiteralOrIdent(LiteralId(0)),
            TokenType::Equal,
            TokenType::LiteralOrIdent(LiteralId(1)),
            TokenType::Dot,
            TokenType::LiteralOrIdent(LiteralId(2)),
        ]
    );
    assert_eq!(tokens.literals, ["ratio", "0", "25"]);
}

#[test]
fn comments_are_skipped() {
    let tokens = lex("# intro\nkey = 3 # trailing\n").unwrap();
    let types: Vec<TokenType> = tokens.tokens.iter().map(|t| t.ty).collect();
    assert_eq!(
        types,
        [
            TokenType::Newline,
            TokenType::LiteralOrIdent(LiteralId(0)),
            TokenType::Equal,
            TokenType::LiteralOrIdent(LiteralId(1)),
            TokenType::Newline,
        ]
    );
    assert_eq!(tokens.literals, ["key", "3"]);
}

#[test]
fn crlf_normalizes_to_a_single_newline_token() {
    let tokens = lex("a = 1\r\nb = 2\r\n").unwrap();
    let newlines = tokens
        .tokens
        .iter()
        .filter(|t| t.ty == TokenType::Newline)
        .count();
    assert_eq!(newlines, 2);
    assert_eq!(tokens.eof.span, Span::pos(Pos { line: 2, char: 0 }));
}

#[test]
fn empty_basic_string() {
    check_str(r#""""#, r#""""#, "");
}

#[test]
fn empty_literal_string() {
    check_str("''", "''", "");
}

#[test]
fn basic_string_without_escapes_borrows() {
    let tokens = lex(r#""hello world""#).unwrap();
    match &tokens.strings[0].text {
        Cow::Borrowed(text) => assert_eq!(*text, "hello world"),
        Cow::Owned(_) => panic!("escape free strings shouldn't allocate"),
    }
}

#[test]
fn basic_string_escapes() {
    check_str(r#""a\tb\nc""#, r#""a\tb\nc""#, "a\tb\nc");
    check_str(r#""say \"hi\"""#, r#""say \"hi\"""#, "say \"hi\"");
    check_str(r#""back\\slash""#, r#""back\\slash""#, "back\\slash");
}

#[test]
fn literal_string_decodes_nothing() {
    check_str(r#"'C:\temp\new'"#, r#"'C:\temp\new'"#, "C:\\temp\\new");
}

#[test]
fn unicode_escapes() {
    check_str(r#""\u0041\u00e9""#, r#""\u0041\u00e9""#, "Aé");
    check_str(r#""\U0001F600""#, r#""\U0001F600""#, "\u{1F600}");
}

#[test]
fn unpaired_surrogate_decodes_to_replacement_char() {
    check_str(r#""\uD800""#, r#""\uD800""#, "\u{FFFD}");
    check_str(r#""\uDFFF!""#, r#""\uDFFF!""#, "\u{FFFD}!");
}

#[test]
fn out_of_range_codepoint_is_refused() {
    check_err(
        r#"a = "\UFFFFFFFF""#,
        Error::InvalidUnicodeCodepoint(
            0xFFFFFFFF,
            Span {
                start: Pos { line: 0, char: 5 },
                end: Pos { line: 0, char: 15 },
            },
        ),
    );
}

#[test]
fn multiline_string_strips_one_leading_newline() {
    check_str("\"\"\"\nfoo\"\"\"", "\"\"\"\nfoo\"\"\"", "foo");
    check_str("'''\r\nbar'''", "'''\r\nbar'''", "bar");
    // only a single one
    check_str("\"\"\"\n\nfoo\"\"\"", "\"\"\"\n\nfoo\"\"\"", "\nfoo");
}

#[test]
fn multiline_string_keeps_inner_newlines() {
    check_str("'''a\nb'''", "'''a\nb'''", "a\nb");
    check_str("\"\"\"a\r\nb\"\"\"", "\"\"\"a\r\nb\"\"\"", "a\nb");
}

#[test]
fn multiline_line_continuation() {
    check_str("\"\"\"a\\\n   b\"\"\"", "\"\"\"a\\\n   b\"\"\"", "ab");
    // the continuation also eats blank lines
    check_str("\"\"\"a\\\n\n\n  b\"\"\"", "\"\"\"a\\\n\n\n  b\"\"\"", "ab");
}

#[test]
fn single_quotes_inside_multiline_string() {
    check_str("\"\"\"a\"b\"\"\"", "\"\"\"a\"b\"\"\"", "a\"b");
    check_str("'''it''s'''", "'''it''s'''", "it''s");
}

#[test]
fn unterminated_basic_string() {
    check_err(
        r#"a = "abc"#,
        Error::UnterminatedString(Quote::Basic, Pos { line: 0, char: 4 }, Pos { line: 0, char: 8 }),
    );
}

#[test]
fn newline_terminates_single_line_string() {
    check_err(
        "a = \"abc\nb = 1",
        Error::UnterminatedString(Quote::Basic, Pos { line: 0, char: 4 }, Pos { line: 0, char: 8 }),
    );
}

#[test]
fn invalid_escape_char() {
    check_err(
        r#"a = "\x41""#,
        Error::InvalidEscapeChar(FmtChar('x'), Pos { line: 0, char: 6 }),
    );
}

#[test]
fn unfinished_escape_sequence() {
    check_err(
        r#"a = "\u00"#,
        Error::UnfinishedEscapeSequence(Span {
            start: Pos { line: 0, char: 5 },
            end: Pos { line: 0, char: 9 },
        }),
    );
}

#[test]
fn bare_carriage_return() {
    check_err(
        "a = 1\rb = 2",
        Error::UnexpectedChar(FmtChar('\r'), Pos { line: 0, char: 5 }),
    );
}
