//! A pure decode/encode library for TOML v0.5 documents, with v1.0 style
//! heterogeneous arrays accepted by default.
//!
//! Decoding produces an owned [`Table`] of tagged [`Value`]s, encoding
//! renders a value tree back to a canonical document with lexicographically
//! sorted keys. The codec performs no I/O and keeps no state between calls.
//!
//! ```
//! let table = toml_codec::parse("answer = 42")?;
//! assert_eq!(table["answer"], toml_codec::Value::Int(42));
//!
//! let doc = toml_codec::to_toml(&toml_codec::Value::Table(table))?;
//! assert_eq!(doc, "answer = 42\n");
//! # Ok::<(), toml_codec::Error>(())
//! ```

pub use error::{Error, ErrorKind, FmtChar, FmtStr};
pub use lex::{Pos, Quote, Span};
pub use parse::num::IntPrefix;
pub use value::{Datatype, Table, Value};

pub mod datetime;
mod error;
mod lex;
mod map;
mod parse;
#[cfg(feature = "serde")]
mod serde;
mod value;
mod write;

use datetime::DateTime;

/// Decode and encode configuration.
///
/// The inflation hooks replace the default representation of date-time and
/// boolean tokens while the document is decoded, so callers can substitute
/// their own carrier values without a second pass over the tree.
#[derive(Default)]
pub struct Options {
    /// Require all elements of an array to have the same type, when
    /// decoding as well as encoding.
    pub strict_arrays: bool,
    /// Replaces every decoded date-time value.
    pub inflate_datetime: Option<Box<dyn Fn(&DateTime) -> Value>>,
    /// Replaces every decoded boolean value.
    pub inflate_boolean: Option<Box<dyn Fn(bool) -> Value>>,
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("strict_arrays", &self.strict_arrays)
            .field("inflate_datetime", &self.inflate_datetime.is_some())
            .field("inflate_boolean", &self.inflate_boolean.is_some())
            .finish()
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strict_arrays(mut self, strict_arrays: bool) -> Self {
        self.strict_arrays = strict_arrays;
        self
    }

    pub fn with_inflate_datetime(
        mut self,
        hook: impl Fn(&DateTime) -> Value + 'static,
    ) -> Self {
        self.inflate_datetime = Some(Box::new(hook));
        self
    }

    pub fn with_inflate_boolean(mut self, hook: impl Fn(bool) -> Value + 'static) -> Self {
        self.inflate_boolean = Some(Box::new(hook));
        self
    }
}

/// Decodes a document with default options.
pub fn parse(input: &str) -> Result<Table, Error> {
    parse::parse(input, &Options::default())
}

/// Decodes a document.
pub fn parse_with(input: &str, options: &Options) -> Result<Table, Error> {
    parse::parse(input, options)
}

/// Dual-return decode convenience: exactly one of the table and the error
/// is present.
pub fn parse_or_pair(input: &str, options: &Options) -> (Option<Table>, Option<Error>) {
    match parse::parse(input, options) {
        Ok(table) => (Some(table), None),
        Err(error) => (None, Some(error)),
    }
}

/// Decodes a document from raw bytes, validating that they are UTF-8.
pub fn from_slice(input: &[u8], options: &Options) -> Result<Table, Error> {
    let input = std::str::from_utf8(input).map_err(|e| {
        let valid = &input[..e.valid_up_to()];
        let line = valid.iter().filter(|&&b| b == b'\n').count() as u32;
        let line_start = valid
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        Error::InvalidUtf8(Pos::new(line, (valid.len() - line_start) as u32))
    })?;
    parse::parse(input, options)
}

/// Encodes a value tree with default options. The root has to be a table.
pub fn to_toml(value: &Value) -> Result<String, Error> {
    write::write(value, &Options::default())
}

/// Encodes a value tree. The root has to be a table.
pub fn to_toml_with(value: &Value, options: &Options) -> Result<String, Error> {
    write::write(value, options)
}

/// Bundles a set of [`Options`] for repeated use.
#[derive(Debug, Default)]
pub struct Codec {
    options: Options,
}

impl Codec {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn decode(&self, input: &str) -> Result<Table, Error> {
        parse_with(input, &self.options)
    }

    pub fn decode_slice(&self, input: &[u8]) -> Result<Table, Error> {
        from_slice(input, &self.options)
    }

    pub fn encode(&self, value: &Value) -> Result<String, Error> {
        to_toml_with(value, &self.options)
    }
}
