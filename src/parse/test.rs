use pretty_assertions::assert_eq;

use crate::datetime::{Date, DateTime, Offset, Time};
use crate::{parse, parse_with, ErrorKind, Options, Table, Value};

fn check<const N: usize>(input: &str, expected: [(&str, Value); N]) {
    let expected: Table = expected
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    assert_eq!(expected, parse(input).unwrap());
}

fn check_error(input: &str, kind: ErrorKind, line: u32) {
    let error = parse(input).unwrap_err();
    assert_eq!(kind, error.kind(), "{error}");
    assert_eq!(Some(line), error.line(), "{error}");
}

fn table<const N: usize>(entries: [(&str, Value); N]) -> Value {
    Value::Table(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

#[test]
fn scalar_assignments() {
    check(
        "\
int = 42
neg = -17
plus = +8
float = 3.5
exp = 2e3
neg_exp = 1e-2
bool = true
off = false
str = \"hi\"
",
        [
            ("int", Value::Int(42)),
            ("neg", Value::Int(-17)),
            ("plus", Value::Int(8)),
            ("float", Value::Float(3.5)),
            ("exp", Value::Float(2e3)),
            ("neg_exp", Value::Float(1e-2)),
            ("bool", Value::Bool(true)),
            ("off", Value::Bool(false)),
            ("str", Value::String("hi".to_string())),
        ],
    );
}

#[test]
fn int_radices() {
    check(
        "hex = 0x2A\noct = 0o17\nbin = 0b1010\nzero = 0\n",
        [
            ("hex", Value::Int(42)),
            ("oct", Value::Int(15)),
            ("bin", Value::Int(10)),
            ("zero", Value::Int(0)),
        ],
    );
}

#[test]
fn underscores_between_digits() {
    check(
        "big = 1_000_000\nfrac = 1_0.2_5\nhex = 0xdead_beef\n",
        [
            ("big", Value::Int(1_000_000)),
            ("frac", Value::Float(10.25)),
            ("hex", Value::Int(0xdead_beef)),
        ],
    );
}

#[test]
fn integer_limits() {
    check(
        "max = 9223372036854775807\nmin = -9223372036854775808\n",
        [
            ("max", Value::Int(i64::MAX)),
            ("min", Value::Int(i64::MIN)),
        ],
    );
}

#[test]
fn integer_overflow() {
    check_error("a = 9223372036854775808", ErrorKind::InvalidNumber, 1);
    check_error("a = -9223372036854775809", ErrorKind::InvalidNumber, 1);
    check_error("a = 0x8000000000000000", ErrorKind::InvalidNumber, 1);
}

#[test]
fn non_finite_floats() {
    let map = parse("a = inf\nb = -inf\nc = nan\nd = -nan\n").unwrap();
    assert_eq!(map["a"], Value::Float(f64::INFINITY));
    assert_eq!(map["b"], Value::Float(f64::NEG_INFINITY));
    assert!(matches!(map["c"], Value::Float(f) if f.is_nan()));
    assert!(matches!(map["d"], Value::Float(f) if f.is_nan()));
}

#[test]
fn malformed_numbers() {
    check_error("a = 01", ErrorKind::InvalidNumber, 1);
    check_error("a = 1_", ErrorKind::InvalidNumber, 1);
    check_error("a = _1", ErrorKind::InvalidNumber, 1);
    check_error("a = 1__0", ErrorKind::InvalidNumber, 1);
    check_error("a = 1._5", ErrorKind::InvalidNumber, 1);
    check_error("a = +", ErrorKind::InvalidNumber, 1);
    check_error("a = 0xg", ErrorKind::InvalidNumber, 1);
    check_error("a = 0b2", ErrorKind::InvalidNumber, 1);
    check_error("a = -0x1", ErrorKind::InvalidNumber, 1);
    check_error("a = 1.", ErrorKind::InvalidNumber, 1);
}

#[test]
fn strings() {
    check(
        "\
basic = \"one\\ttwo\"
literal = 'C:\\net'
empty = \"\"
",
        [
            ("basic", Value::String("one\ttwo".to_string())),
            ("literal", Value::String("C:\\net".to_string())),
            ("empty", Value::String(String::new())),
        ],
    );
}

#[test]
fn multiline_string_strips_leading_newline() {
    check("x=\"\"\"\nfoo\"\"\"", [("x", Value::String("foo".to_string()))]);
}

#[test]
fn multiline_string_line_continuations() {
    check(
        "y=\"\"\"\\\n   how now \\\n     brown \\\nbureaucrat.\\\n\"\"\"",
        [("y", Value::String("how now brown bureaucrat.".to_string()))],
    );
}

#[test]
fn offset_date_times() {
    check(
        "\
utc = 1979-05-27T07:32:00Z
custom = 1979-05-27T00:32:00-07:00
subsec = 1979-05-27T00:32:00.999999-07:00
lower = 1979-05-27t07:32:00z
",
        [
            (
                "utc",
                Value::DateTime(DateTime::OffsetDateTime(
                    Date::new(1979, 5, 27),
                    Time::new(7, 32, 0, 0),
                    Offset::Utc,
                )),
            ),
            (
                "custom",
                Value::DateTime(DateTime::OffsetDateTime(
                    Date::new(1979, 5, 27),
                    Time::new(0, 32, 0, 0),
                    Offset::Custom(-420),
                )),
            ),
            (
                "subsec",
                Value::DateTime(DateTime::OffsetDateTime(
                    Date::new(1979, 5, 27),
                    Time::new(0, 32, 0, 999_999_000),
                    Offset::Custom(-420),
                )),
            ),
            (
                "lower",
                Value::DateTime(DateTime::OffsetDateTime(
                    Date::new(1979, 5, 27),
                    Time::new(7, 32, 0, 0),
                    Offset::Utc,
                )),
            ),
        ],
    );
}

#[test]
fn local_date_times() {
    check(
        "\
ldt = 1979-05-27T07:32:00
ld = 1979-05-27
lt = 07:32:00
ltf = 00:32:00.999999
spaced = 1979-05-27 07:32:00
",
        [
            (
                "ldt",
                Value::DateTime(DateTime::LocalDateTime(
                    Date::new(1979, 5, 27),
                    Time::new(7, 32, 0, 0),
                )),
            ),
            ("ld", Value::DateTime(DateTime::LocalDate(Date::new(1979, 5, 27)))),
            ("lt", Value::DateTime(DateTime::LocalTime(Time::new(7, 32, 0, 0)))),
            (
                "ltf",
                Value::DateTime(DateTime::LocalTime(Time::new(0, 32, 0, 999_999_000))),
            ),
            (
                "spaced",
                Value::DateTime(DateTime::LocalDateTime(
                    Date::new(1979, 5, 27),
                    Time::new(7, 32, 0, 0),
                )),
            ),
        ],
    );
}

#[test]
fn malformed_date_times() {
    check_error("a = 2024-13-01", ErrorKind::InvalidDateTime, 1);
    check_error("a = 2024-00-01", ErrorKind::InvalidDateTime, 1);
    check_error("a = 2024-01-32", ErrorKind::InvalidDateTime, 1);
    check_error("a = 24:00:00", ErrorKind::InvalidDateTime, 1);
    check_error("a = 07:60:00", ErrorKind::InvalidDateTime, 1);
    check_error("a = 07:32", ErrorKind::InvalidDateTime, 1);
    check_error("a = 07:32:00Z", ErrorKind::InvalidDateTime, 1);
    check_error("a = 1979-05-27T07:32:00+24:30", ErrorKind::InvalidDateTime, 1);
    check_error("a = 07:32:00.", ErrorKind::InvalidDateTime, 1);
}

#[test]
fn static_arrays() {
    check(
        "\
ints = [1, 2, 3]
trailing = [1, 2,]
nested = [[1], [2, 3]]
empty = []
",
        [
            (
                "ints",
                Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
            ),
            ("trailing", Value::Array(vec![Value::Int(1), Value::Int(2)])),
            (
                "nested",
                Value::Array(vec![
                    Value::Array(vec![Value::Int(1)]),
                    Value::Array(vec![Value::Int(2), Value::Int(3)]),
                ]),
            ),
            ("empty", Value::Array(vec![])),
        ],
    );
}

#[test]
fn multiline_array_with_comments() {
    check(
        "\
a = [
    1, # one
    # a whole comment line
    2,
]
",
        [("a", Value::Array(vec![Value::Int(1), Value::Int(2)]))],
    );
}

#[test]
fn heterogeneous_arrays_accepted_by_default() {
    check(
        "a = [1, \"two\"]",
        [(
            "a",
            Value::Array(vec![Value::Int(1), Value::String("two".to_string())]),
        )],
    );
}

#[test]
fn strict_arrays_reject_mixed_types() {
    let options = Options::new().with_strict_arrays(true);
    let error = parse_with("a = [1, \"two\"]", &options).unwrap_err();
    assert_eq!(ErrorKind::HeterogeneousArray, error.kind());
    assert_eq!(Some(1), error.line());

    // date-time sub-variants count as distinct types
    let error = parse_with("a = [1979-05-27, 07:32:00]", &options).unwrap_err();
    assert_eq!(ErrorKind::HeterogeneousArray, error.kind());

    // nested arrays are all just arrays
    let ok = parse_with("a = [[1], [\"two\"]]", &options);
    assert!(ok.is_ok());
}

#[test]
fn inline_tables() {
    check(
        "point = { x = 1, y = 2 }",
        [("point", table([("x", Value::Int(1)), ("y", Value::Int(2))]))],
    );
    check("empty = {}", [("empty", table([]))]);
    check(
        "dotted = { a.b = 1 }",
        [("dotted", table([("a", table([("b", Value::Int(1))]))]))],
    );
}

#[test]
fn inline_table_syntax_errors() {
    check_error("a = { x = 1, }", ErrorKind::Syntax, 1);
    check_error("a = { x = 1\n}", ErrorKind::Syntax, 1);
    check_error("a = { x = 1 y = 2 }", ErrorKind::Syntax, 1);
    check_error("a = { x = 1", ErrorKind::Syntax, 1);
}

#[test]
fn dotted_keys() {
    check(
        "a.b.c = 1\na.b.d = 2\n",
        [(
            "a",
            table([("b", table([("c", Value::Int(1)), ("d", Value::Int(2))]))]),
        )],
    );
    check(
        "site.\"google.com\" = true",
        [("site", table([("google.com", Value::Bool(true))]))],
    );
}

#[test]
fn bare_keys() {
    check("1234 = 5", [("1234", Value::Int(5))]);
    check("key-with-dash = 1", [("key-with-dash", Value::Int(1))]);
    check("'quoted key' = 1", [("quoted key", Value::Int(1))]);
}

#[test]
fn invalid_keys() {
    check_error("ké = 1", ErrorKind::Syntax, 1);
    check_error("\"\"\"k\"\"\" = 1", ErrorKind::Syntax, 1);
    check_error("= 1", ErrorKind::Syntax, 1);
    check_error("a. = 1", ErrorKind::Syntax, 1);
}

#[test]
fn table_headers() {
    check(
        "\
title = \"TOML Example\"
[owner]
name = \"Tom\"
dob = 1979-05-27T07:32:00-08:00
",
        [
            ("title", Value::String("TOML Example".to_string())),
            (
                "owner",
                table([
                    ("name", Value::String("Tom".to_string())),
                    (
                        "dob",
                        Value::DateTime(DateTime::OffsetDateTime(
                            Date::new(1979, 5, 27),
                            Time::new(7, 32, 0, 0),
                            Offset::Custom(-480),
                        )),
                    ),
                ]),
            ),
        ],
    );
}

#[test]
fn super_table_defined_after_sub_table() {
    check(
        "\
[a.b]
x = 1
[a]
y = 2
",
        [(
            "a",
            table([("b", table([("x", Value::Int(1))])), ("y", Value::Int(2))]),
        )],
    );
}

#[test]
fn array_of_tables() {
    check(
        "\
[[products]]
name=\"Hammer\"
sku=738594937

[[products]]

[[products]]
name=\"Nail\"
sku=284758393
color=\"gray\"
",
        [(
            "products",
            Value::Array(vec![
                table([
                    ("name", Value::String("Hammer".to_string())),
                    ("sku", Value::Int(738594937)),
                ]),
                table([]),
                table([
                    ("name", Value::String("Nail".to_string())),
                    ("sku", Value::Int(284758393)),
                    ("color", Value::String("gray".to_string())),
                ]),
            ]),
        )],
    );
}

#[test]
fn sub_tables_attach_to_the_latest_array_entry() {
    check(
        "\
[[fruit]]
name = \"apple\"
[fruit.physical]
color = \"red\"

[[fruit]]
name = \"banana\"
[fruit.physical]
color = \"yellow\"
",
        [(
            "fruit",
            Value::Array(vec![
                table([
                    ("name", Value::String("apple".to_string())),
                    ("physical", table([("color", Value::String("red".to_string()))])),
                ]),
                table([
                    ("name", Value::String("banana".to_string())),
                    (
                        "physical",
                        table([("color", Value::String("yellow".to_string()))]),
                    ),
                ]),
            ]),
        )],
    );
}

#[test]
fn missing_newline_between_assignments() {
    check_error("a = 1 b = 2", ErrorKind::Syntax, 1);
}

#[test]
fn unterminated_header() {
    check_error("[abc = 1\n", ErrorKind::Syntax, 1);
    check_error("[[abc]\n", ErrorKind::Syntax, 1);
}

#[test]
fn error_lines_point_at_the_offending_line() {
    check_error("a = 1\nb = 2\nc = ]\n", ErrorKind::Syntax, 3);
    check_error("[a]\nx = 1\n\n[a]\n", ErrorKind::DuplicateTable, 4);
    check_error("a = \"one\nb = 2", ErrorKind::UnterminatedString, 1);
}

#[test]
fn inflate_boolean_hook() {
    let options = Options::new()
        .with_inflate_boolean(|b| Value::String(if b { "yes" } else { "no" }.to_string()));
    let map = parse_with("a = true\nb = false\n", &options).unwrap();
    assert_eq!(map["a"], Value::String("yes".to_string()));
    assert_eq!(map["b"], Value::String("no".to_string()));
}

#[test]
fn inflate_datetime_hook() {
    let options = Options::new().with_inflate_datetime(|dt| Value::String(dt.to_string()));
    let map = parse_with("a = 1979-05-27 07:32:00.5Z", &options).unwrap();
    assert_eq!(map["a"], Value::String("1979-05-27T07:32:00.5Z".to_string()));
}
