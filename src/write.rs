use std::fmt::Write as _;

use crate::error::FmtStr;
use crate::value::{array_type_mismatch, Table, Value};
use crate::{Error, Options};


/// Renders a value tree as a canonical document. Keys are emitted in
/// lexicographic order, so output is byte-stable for equal trees no matter
/// how they were produced.
pub(crate) fn write(root: &Value, options: &Options) -> Result<String, Error> {
    let Value::Table(table) = root else {
        return Err(Error::NonTableRoot(root.datatype()));
    };

    let mut out = String::new();
    write_table(&mut out, table, &mut Vec::new(), options)?;
    Ok(out)
}

fn write_table(
    out: &mut String,
    table: &Table,
    path: &mut Vec<String>,
    options: &Options,
) -> Result<(), Error> {
    let mut keys: Vec<&str> = table.keys().map(|k| k.as_str()).collect();
    keys.sort_unstable();

    let mut scalars = Vec::new();
    let mut arrays = Vec::new();
    let mut empty_tables = Vec::new();
    let mut table_arrays = Vec::new();
    let mut tables = Vec::new();

    for key in keys {
        let value = &table[key];
        match value {
            Value::Table(t) if t.is_empty() => empty_tables.push(key),
            Value::Table(t) => tables.push((key, t)),
            Value::Array(values) => {
                if options.strict_arrays {
                    if let Some((expected, found)) = array_type_mismatch(values) {
                        return Err(Error::HeterogeneousArrayValue {
                            path: join_key_path(path, key),
                            expected,
                            found,
                        });
                    }
                }

                let element_tables: Vec<&Table> =
                    values.iter().filter_map(Value::as_table).collect();
                if element_tables.is_empty() {
                    arrays.push((key, values.iter().collect::<Vec<_>>()));
                } else if element_tables.len() == values.len() {
                    table_arrays.push((key, element_tables));
                } else {
                    // a mixed array is split: the non-table elements stay in
                    // an inline array, the tables become `[[key]]` sections
                    let rest: Vec<&Value> = values
                        .iter()
                        .filter(|v| v.as_table().is_none())
                        .collect();
                    arrays.push((key, rest));
                    table_arrays.push((key, element_tables));
                }
            }
            _ => scalars.push((key, value)),
        }
    }

    for (key, value) in scalars {
        let entry_path = join_key_path(path, key);
        write_key(out, key);
        out.push_str(" = ");
        write_value(out, value, &entry_path, options)?;
        out.push('\n');
    }

    for (key, values) in arrays {
        let entry_path = join_key_path(path, key);
        write_key(out, key);
        out.push_str(" = [");
        for (i, value) in values.into_iter().enumerate() {
            if i != 0 {
                out.push_str(", ");
            }
            write_value(out, value, &entry_path, options)?;
        }
        out.push_str("]\n");
    }

    // inline `key = {}` entries have to come before any header, a line
    // after a header would belong to that table
    for key in empty_tables {
        write_key(out, key);
        out.push_str(" = {}\n");
    }

    for (key, entries) in table_arrays {
        for entry in entries {
            out.push_str("[[");
            write_header_path(out, path, key);
            out.push_str("]]\n");

            path.push(key.to_string());
            write_table(out, entry, path, options)?;
            path.pop();
        }
    }

    for (key, t) in tables {
        out.push('[');
        write_header_path(out, path, key);
        out.push_str("]\n");

        path.push(key.to_string());
        write_table(out, t, path, options)?;
        path.pop();
    }

    Ok(())
}

fn write_value(
    out: &mut String,
    value: &Value,
    entry_path: &FmtStr,
    options: &Options,
) -> Result<(), Error> {
    match value {
        Value::String(s) => write_string(out, s),
        Value::Int(i) => {
            _ = write!(out, "{i}");
        }
        Value::Float(f) => write_float(out, *f),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::DateTime(d) => {
            _ = write!(out, "{d}");
        }
        Value::Array(values) => {
            if options.strict_arrays {
                if let Some((expected, found)) = array_type_mismatch(values) {
                    return Err(Error::HeterogeneousArrayValue {
                        path: entry_path.clone(),
                        expected,
                        found,
                    });
                }
            }

            out.push('[');
            for (i, value) in values.iter().enumerate() {
                if i != 0 {
                    out.push_str(", ");
                }
                write_value(out, value, entry_path, options)?;
            }
            out.push(']');
        }
        Value::Table(table) => {
            let mut keys: Vec<&str> = table.keys().map(|k| k.as_str()).collect();
            keys.sort_unstable();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i != 0 {
                    out.push_str(", ");
                }
                write_key(out, key);
                out.push_str(" = ");
                write_value(out, &table[*key], entry_path, options)?;
            }
            out.push('}');
        }
    }

    Ok(())
}

/// Bare where possible, literal quotes for keys that start with a double
/// quote, basic quotes with escapes for everything else.
fn write_key(out: &mut String, key: &str) {
    let bare = !key.is_empty()
        && key
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'-'));

    if bare {
        out.push_str(key);
    } else if key.starts_with('"') && !key.contains('\'') && !key.contains('\n') {
        out.push('\'');
        out.push_str(key);
        out.push('\'');
    } else {
        write_string(out, key);
    }
}

fn write_header_path(out: &mut String, path: &[String], key: &str) {
    for seg in path {
        write_key(out, seg);
        out.push('.');
    }
    write_key(out, key);
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{C}' => out.push_str("\\f"),
            '\u{8}' => out.push_str("\\b"),
            '\x00'..='\x08' | '\x0b' | '\x0e'..='\x1f' => {
                _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// The shortest decimal representation that parses back to the same bits,
/// with a fractional part forced so the value stays a float.
fn write_float(out: &mut String, f: f64) {
    if f.is_nan() {
        out.push_str("nan");
    } else if f == f64::INFINITY {
        out.push_str("inf");
    } else if f == f64::NEG_INFINITY {
        out.push_str("-inf");
    } else {
        let mut repr = f.to_string();
        if !repr.contains('.') && !repr.contains('e') && !repr.contains('E') {
            repr.push_str(".0");
        }
        repr.make_ascii_lowercase();
        out.push_str(&repr);
    }
}

fn join_key_path(path: &[String], key: &str) -> FmtStr {
    let mut joined = String::new();
    for seg in path {
        joined.push_str(seg);
        joined.push('.');
    }
    joined.push_str(key);
    FmtStr::from_string(joined)
}
