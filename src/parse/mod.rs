pub(crate) mod datetime;
mod doc;
mod ignored;
mod numbers;
mod strings;

use alloc::{borrow::Cow, collections::BTreeSet, format, string::String, vec::Vec};

use winnow::{
    ascii::space0,
    combinator::{alt, cut_err, delimited, eof, fail, opt, peek, preceded, separated},
    dispatch,
    error::{AddContext, ErrMode, ErrorKind, FromExternalError, ParserError},
    stream::Stream,
    token::{any, one_of, take_while},
    Parser,
};

use crate::{source, Array, Error, MetaData, ParseError, Table, Value};
use doc::Doc;

/// Result type shared by the grammar parsers.
pub(crate) type PResult<T> = winnow::PResult<T, PError>;

/// Grammar-level error: an optional message plus the length of the
/// remaining input at the failure point, which pins the byte offset
/// (all parsing happens on suffixes of one buffer).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PError {
    message: Option<Cow<'static, str>>,
    rem: usize,
}

impl PError {
    fn new(input: &&str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: Some(message.into()),
            rem: input.len(),
        }
    }
}

/// Fail hard with the given message at the current position.
pub(crate) fn cut<T>(input: &&str, message: impl Into<Cow<'static, str>>) -> PResult<T> {
    Err(ErrMode::Cut(PError::new(input, message)))
}

impl<'i> ParserError<&'i str> for PError {
    fn from_error_kind(input: &&'i str, _kind: ErrorKind) -> Self {
        Self {
            message: None,
            rem: input.len(),
        }
    }

    fn append(
        self,
        _input: &&'i str,
        _token_start: &<&'i str as Stream>::Checkpoint,
        _kind: ErrorKind,
    ) -> Self {
        self
    }

    fn or(self, other: Self) -> Self {
        // Keep the error from the branch that made it furthest.
        if other.rem < self.rem {
            other
        } else {
            self
        }
    }
}

impl<'i> AddContext<&'i str, &'static str> for PError {
    fn add_context(
        mut self,
        _input: &&'i str,
        _token_start: &<&'i str as Stream>::Checkpoint,
        context: &'static str,
    ) -> Self {
        if self.message.is_none() {
            self.message = Some(Cow::Borrowed(context));
        }
        self
    }
}

impl<'i, E: core::fmt::Display> FromExternalError<&'i str, E> for PError {
    fn from_external_error(input: &&'i str, _kind: ErrorKind, e: E) -> Self {
        use alloc::string::ToString;

        Self {
            message: Some(Cow::Owned(e.to_string())),
            rem: input.len(),
        }
    }
}

/// Parse a TOML document into a generic table.
pub fn parse(input: &str) -> Result<Table<'_>, Error> {
    document(input).map(|(table, _)| table)
}

/// Parse a TOML document from raw bytes into a generic table.
///
/// The bytes must be UTF-8: a leading UTF-8 BOM is stripped, and UTF-16
/// input or NUL bytes are rejected.
pub fn parse_slice(input: &[u8]) -> Result<Table<'_>, Error> {
    document_bytes(input).map(|(table, _)| table)
}

pub(crate) fn document(input: &str) -> Result<(Table<'_>, MetaData<'_>), Error> {
    document_prepared(source::prepare_str(input)?)
}

pub(crate) fn document_bytes(input: &[u8]) -> Result<(Table<'_>, MetaData<'_>), Error> {
    document_prepared(source::prepare_bytes(input)?)
}

fn document_prepared(src: &str) -> Result<(Table<'_>, MetaData<'_>), Error> {
    let mut input = src;
    let mut doc = Doc::new();
    let mut last_key = String::new();
    loop {
        if let Err(e) = ignored::ws_comment_newline(&mut input) {
            return Err(positioned(src, e, &last_key));
        }
        if input.is_empty() {
            break;
        }
        statement(src, &mut input, &mut doc, &mut last_key)?;
    }
    Ok(doc.finish())
}

/// One line of the document: a key-value pair, a `[table]` header, or an
/// `[[array-of-tables]]` header. Blank lines and comments are consumed
/// by the caller.
fn statement<'i>(
    src: &'i str,
    input: &mut &'i str,
    doc: &mut Doc<'i>,
    last_key: &mut String,
) -> Result<(), Error> {
    let stmt_rem = input.len();
    if input.starts_with('[') {
        let (path, is_array) = table_header
            .parse_next(input)
            .map_err(|e| positioned(src, e, last_key))?;
        *last_key = doc::display_path(&path);
        line_end(input).map_err(|e| positioned(src, e, last_key))?;
        let result = if is_array {
            doc.begin_array_table(path)
        } else {
            doc.begin_table(path)
        };
        result.map_err(|message| semantic(src, stmt_rem, message, last_key))
    } else {
        let path = cut_err(dotted_key)
            .context("expected a key")
            .parse_next(input)
            .map_err(|e| positioned(src, e, last_key))?;
        *last_key = doc.display_abs(&path);
        let value = (|| -> PResult<Value<'i>> {
            let _ = cut_err('=')
                .context("expected '=' after a key")
                .parse_next(input)?;
            let _ = space0.parse_next(input)?;
            let value = parse_value(input, 0)?;
            line_end(input)?;
            Ok(value)
        })()
        .map_err(|e| positioned(src, e, last_key))?;
        doc.assign(path, value)
            .map_err(|message| semantic(src, stmt_rem, message, last_key))
    }
}

fn positioned(src: &str, err: ErrMode<PError>, last_key: &str) -> Error {
    let e = match err {
        ErrMode::Backtrack(e) | ErrMode::Cut(e) => e,
        ErrMode::Incomplete(_) => PError {
            message: None,
            rem: 0,
        },
    };
    let offset = src.len().saturating_sub(e.rem);
    let message = match e.message {
        Some(m) => m.into_owned(),
        None => String::from("invalid TOML syntax"),
    };
    Error::Parse(ParseError::new(
        source::line_at(src, offset),
        message,
        String::from(last_key),
    ))
}

fn semantic(src: &str, stmt_rem: usize, message: String, last_key: &str) -> Error {
    let offset = src.len().saturating_sub(stmt_rem);
    Error::Parse(ParseError::new(
        source::line_at(src, offset),
        message,
        String::from(last_key),
    ))
}

// key = simple-key / dotted-key
// dotted-key = simple-key 1*( dot-sep simple-key )
fn dotted_key<'i>(input: &mut &'i str) -> PResult<Vec<Cow<'i, str>>> {
    separated(1.., key_segment, '.').parse_next(input)
}

// simple-key = quoted-key / unquoted-key
fn key_segment<'i>(input: &mut &'i str) -> PResult<Cow<'i, str>> {
    delimited(space0, alt((quoted_key, bare_key)), space0).parse_next(input)
}

// unquoted-key = 1*( ALPHA / DIGIT / %x2D / %x5F ) ; a-z A-Z 0-9 - _
fn bare_key<'i>(input: &mut &'i str) -> PResult<Cow<'i, str>> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        .map(Cow::Borrowed)
        .parse_next(input)
}

// quoted-key = basic-string / literal-string ; the single-line forms only
fn quoted_key<'i>(input: &mut &'i str) -> PResult<Cow<'i, str>> {
    alt((
        preceded(
            peek(alt(("\"\"\"", "'''"))),
            cut_err(fail).context("multiline strings cannot be used as keys"),
        ),
        strings::basic,
        strings::literal,
    ))
    .parse_next(input)
}

// table = std-table / array-table
// std-table = "[" key "]"
// array-table = "[[" key "]]"
fn table_header<'i>(input: &mut &'i str) -> PResult<(Vec<Cow<'i, str>>, bool)> {
    alt((
        delimited(
            "[[",
            cut_err(dotted_key).context("expected a key in the table header"),
            cut_err("]]").context("expected ']]' to close the table header"),
        )
        .map(|path| (path, true)),
        delimited(
            '[',
            cut_err(dotted_key).context("expected a key in the table header"),
            cut_err(']').context("expected ']' to close the table header"),
        )
        .map(|path| (path, false)),
    ))
    .parse_next(input)
}

/// Every statement ends with optional whitespace, an optional comment,
/// and a newline (or the end of input).
fn line_end(input: &mut &str) -> PResult<()> {
    (
        space0,
        opt(ignored::comment),
        alt((
            ignored::newline,
            eof.void(),
            cut_err(fail).context("expected a newline after the statement"),
        )),
    )
        .void()
        .parse_next(input)
}

// Inline tables and arrays nest through recursion; cap the depth so that
// pathological documents fail cleanly instead of exhausting the stack.
const MAX_NESTING: usize = 128;

// val = string / boolean / array / inline-table / date-time / float / integer
pub(crate) fn parse_value<'i>(input: &mut &'i str, depth: usize) -> PResult<Value<'i>> {
    if depth > MAX_NESTING {
        return cut(input, "values are nested too deeply");
    }
    let start_rem = input.len();
    let result = dispatch! {peek(any);
        '"' => alt((strings::multiline_basic, strings::basic)).map(Value::String),
        '\'' => alt((strings::multiline_literal, strings::literal)).map(Value::String),
        't' | 'f' => alt((
            "true".value(Value::Boolean(true)),
            "false".value(Value::Boolean(false)),
        )),
        '[' => |i: &mut &'i str| array(i, depth),
        '{' => |i: &mut &'i str| inline_table(i, depth),
        'i' | 'n' => numbers::float.map(Value::Float),
        '+' | '-' => alt((
            numbers::float.map(Value::Float),
            numbers::integer.map(Value::Integer),
        )),
        '0'..='9' => alt((
            datetime::date_time.map(Value::Datetime),
            numbers::float.map(Value::Float),
            numbers::integer.map(Value::Integer),
        )),
        _ => fail,
    }
    .parse_next(input);
    // A value is mandatory here, so nothing may backtrack past this point.
    result.map_err(|e| match e {
        ErrMode::Backtrack(pe) => ErrMode::Cut(match pe.message {
            Some(_) => pe,
            None => PError {
                message: Some(Cow::Borrowed("expected a value")),
                rem: start_rem,
            },
        }),
        other => other,
    })
}

// array = array-open [ array-values ] ws-comment-newline array-close
// Newlines, comments, and a trailing comma are permitted inside.
fn array<'i>(input: &mut &'i str, depth: usize) -> PResult<Value<'i>> {
    let _ = '['.parse_next(input)?;
    let mut values = Array::new();
    loop {
        ignored::ws_comment_newline(input)?;
        if opt(']').parse_next(input)?.is_some() {
            break;
        }
        if input.is_empty() {
            return cut(input, "unexpected EOF; expected ']'");
        }
        values.push(parse_value(input, depth + 1)?);
        ignored::ws_comment_newline(input)?;
        match opt(one_of((',', ']'))).parse_next(input)? {
            Some(',') => {}
            Some(_) => break,
            None if input.is_empty() => return cut(input, "unexpected EOF; expected ']'"),
            None => return cut(input, "expected ',' or ']' after an array value"),
        }
    }
    Ok(Value::Array(values))
}

// inline-table = "{" [ inline-table-keyvals ] "}"
// Fully defined on one line: no newlines, no trailing comma.
fn inline_table<'i>(input: &mut &'i str, depth: usize) -> PResult<Value<'i>> {
    let _ = '{'.parse_next(input)?;
    let mut builder = InlineTable::default();
    let _ = space0.parse_next(input)?;
    if opt('}').parse_next(input)?.is_some() {
        return Ok(Value::Table(builder.table));
    }
    loop {
        if opt(peek(one_of(('\n', '\r')))).parse_next(input)?.is_some() {
            return cut(input, "newlines are not permitted within inline tables");
        }
        let path = cut_err(dotted_key)
            .context("expected a key")
            .parse_next(input)?;
        let _ = cut_err('=')
            .context("expected '=' after a key")
            .parse_next(input)?;
        let _ = space0.parse_next(input)?;
        let value = parse_value(input, depth + 1)?;
        if let Err(message) = builder.assign(path, value) {
            return cut(input, message);
        }
        let _ = space0.parse_next(input)?;
        match opt(one_of((',', '}'))).parse_next(input)? {
            Some('}') => break,
            Some(_) => {
                let _ = space0.parse_next(input)?;
                if opt(peek('}')).parse_next(input)?.is_some() {
                    return cut(input, "trailing commas are not permitted in inline tables");
                }
            }
            None => {
                if input.is_empty() {
                    return cut(input, "unexpected EOF; expected '}'");
                }
                if input.starts_with('\n') || input.starts_with('\r') {
                    return cut(input, "newlines are not permitted within inline tables");
                }
                return cut(input, "expected ',' or '}' after an inline table value");
            }
        }
    }
    Ok(Value::Table(builder.table))
}

/// Builds an inline table, enforcing key uniqueness and the dotted-key
/// rules within the table's own scope.
#[derive(Default)]
struct InlineTable<'i> {
    table: Table<'i>,
    dotted: BTreeSet<Vec<Cow<'i, str>>>,
}

impl<'i> InlineTable<'i> {
    fn assign(&mut self, path: Vec<Cow<'i, str>>, value: Value<'i>) -> Result<(), String> {
        let Some((leaf, parents)) = path.split_last() else {
            return Err(String::from("empty key"));
        };
        let mut table = &mut self.table;
        let mut prefix = Vec::new();
        for segment in parents {
            prefix.push(segment.clone());
            let exists = table.get(segment.as_ref()).is_some();
            if exists {
                if !self.dotted.contains(&prefix) {
                    return Err(format!(
                        "key '{}' has already been defined",
                        doc::display_path(&prefix)
                    ));
                }
            } else {
                self.dotted.insert(prefix.clone());
            }
            table = match table.entry(segment.clone()).or_insert_with(|| Table::new().into()) {
                Value::Table(t) => t,
                _ => unreachable!("dotted-tracked inline entries are tables"),
            };
        }
        if table.get(leaf.as_ref()).is_some() {
            prefix.push(leaf.clone());
            return Err(format!(
                "key '{}' has already been defined",
                doc::display_path(&prefix)
            ));
        }
        table.insert(leaf.clone(), value);
        Ok(())
    }
}
