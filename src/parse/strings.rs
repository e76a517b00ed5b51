use alloc::{borrow::Cow, format};

use winnow::{
    combinator::{alt, cut_err, delimited, empty, fail, not, opt, peek, preceded, repeat, terminated},
    dispatch,
    token::{any, one_of, take_while},
    Parser,
};

use super::{cut, ignored, PResult};

// Control characters other than tab may never appear raw in a string;
// in the single-line forms that covers newlines too.
fn is_control(c: char) -> bool {
    matches!(c, '\0'..='\u{08}' | '\u{0a}'..='\u{1f}' | '\u{7f}')
}

// Multiline bodies additionally keep raw newlines; CRLF and lone CR are
// handled by their own alternatives.
fn is_ml_control(c: char) -> bool {
    matches!(c, '\0'..='\u{08}' | '\u{0b}'..='\u{1f}' | '\u{7f}')
}

fn is_basic_text(c: char) -> bool {
    c != '"' && c != '\\' && !is_control(c)
}

fn is_literal_text(c: char) -> bool {
    c != '\'' && !is_control(c)
}

fn is_ml_basic_text(c: char) -> bool {
    c != '"' && c != '\\' && !is_ml_control(c)
}

fn is_ml_literal_text(c: char) -> bool {
    c != '\'' && !is_ml_control(c)
}

/// One decoded chunk of string content. Bodies fold pieces into a `Cow`
/// so escape-free strings stay borrowed.
#[derive(Clone)]
enum Piece<'i> {
    Slice(&'i str),
    Char(char),
}

fn append<'i>(mut acc: Cow<'i, str>, piece: Piece<'i>) -> Cow<'i, str> {
    match piece {
        Piece::Slice("") => acc,
        Piece::Slice(s) if acc.is_empty() => Cow::Borrowed(s),
        Piece::Slice(s) => {
            acc.to_mut().push_str(s);
            acc
        }
        Piece::Char(c) => {
            acc.to_mut().push(c);
            acc
        }
    }
}

/// Refuse the raw control character sitting at the cursor.
fn control_error<'i, O>(input: &mut &'i str) -> PResult<O> {
    preceded(
        peek(one_of(is_control)),
        cut_err(fail).context("control characters are not allowed"),
    )
    .parse_next(input)
}

// basic-string = quotation-mark *basic-char quotation-mark
pub(super) fn basic<'i>(input: &mut &'i str) -> PResult<Cow<'i, str>> {
    delimited(
        '"',
        repeat(0.., basic_piece).fold(|| Cow::Borrowed(""), append),
        cut_err('"').context("unexpected EOF; expected '\"'"),
    )
    .parse_next(input)
}

fn basic_piece<'i>(input: &mut &'i str) -> PResult<Piece<'i>> {
    alt((
        take_while(1.., is_basic_text).map(Piece::Slice),
        preceded('\\', escape).map(Piece::Char),
        control_error,
    ))
    .parse_next(input)
}

// literal-string = apostrophe *literal-char apostrophe
pub(super) fn literal<'i>(input: &mut &'i str) -> PResult<Cow<'i, str>> {
    delimited(
        '\'',
        take_while(0.., is_literal_text).map(Cow::Borrowed),
        literal_close,
    )
    .parse_next(input)
}

fn literal_close(input: &mut &str) -> PResult<()> {
    alt((
        '\''.void(),
        control_error,
        cut_err(fail).context("unexpected EOF; expected \"'\""),
    ))
    .parse_next(input)
}

// ml-basic-string = ml-basic-string-delim [ newline ] ml-basic-body
//                   ml-basic-string-delim
// The newline right after the opening delimiter is trimmed.
pub(super) fn multiline_basic<'i>(input: &mut &'i str) -> PResult<Cow<'i, str>> {
    preceded(("\"\"\"", opt(ignored::newline)), ml_basic_body).parse_next(input)
}

fn ml_basic_body<'i>(input: &mut &'i str) -> PResult<Cow<'i, str>> {
    let mut body = repeat(0.., ml_basic_piece)
        .fold(|| Cow::Borrowed(""), append)
        .parse_next(input)?;
    // one or two quotes may sit directly against the closing delimiter
    if let Some(quotes) = opt(terminated(alt(("\"\"", "\"")), peek("\"\"\"")))
        .parse_next(input)?
    {
        body = append(body, Piece::Slice(quotes));
    }
    cut_err("\"\"\"")
        .context("unexpected EOF; expected '\"\"\"'")
        .void()
        .parse_next(input)?;
    Ok(body)
}

fn ml_basic_piece<'i>(input: &mut &'i str) -> PResult<Piece<'i>> {
    alt((
        take_while(1.., is_ml_basic_text).map(Piece::Slice),
        // one or two quotes are ordinary content
        terminated(alt(("\"\"", "\"")), not('"')).map(Piece::Slice),
        preceded(
            '\\',
            alt((
                line_continuation.value(Piece::Slice("")),
                escape.map(Piece::Char),
            )),
        ),
        // CRLF is normalized so the decoded content is independent of
        // the source's line terminators
        "\r\n".value(Piece::Char('\n')),
        control_error,
    ))
    .parse_next(input)
}

// ml-literal-string = ml-literal-string-delim [ newline ] ml-literal-body
//                     ml-literal-string-delim
pub(super) fn multiline_literal<'i>(input: &mut &'i str) -> PResult<Cow<'i, str>> {
    preceded(("'''", opt(ignored::newline)), ml_literal_body).parse_next(input)
}

fn ml_literal_body<'i>(input: &mut &'i str) -> PResult<Cow<'i, str>> {
    let mut body = repeat(0.., ml_literal_piece)
        .fold(|| Cow::Borrowed(""), append)
        .parse_next(input)?;
    if let Some(quotes) = opt(terminated(alt(("''", "'")), peek("'''"))).parse_next(input)? {
        body = append(body, Piece::Slice(quotes));
    }
    cut_err("'''")
        .context("unexpected EOF; expected \"'''\"")
        .void()
        .parse_next(input)?;
    Ok(body)
}

fn ml_literal_piece<'i>(input: &mut &'i str) -> PResult<Piece<'i>> {
    alt((
        take_while(1.., is_ml_literal_text).map(Piece::Slice),
        terminated(alt(("''", "'")), not('\'')).map(Piece::Slice),
        "\r\n".value(Piece::Char('\n')),
        control_error,
    ))
    .parse_next(input)
}

// escape-seq-char = %x22 / %x5C / %x62 / %x66 / %x6E / %x72 / %x74
//                 / %x75 4HEXDIG / %x55 8HEXDIG
fn escape(input: &mut &str) -> PResult<char> {
    dispatch! {any;
        '"' => empty.value('"'),
        '\\' => empty.value('\\'),
        'b' => empty.value('\u{8}'),
        'f' => empty.value('\u{c}'),
        'n' => empty.value('\n'),
        'r' => empty.value('\r'),
        't' => empty.value('\t'),
        'u' => cut_err(hexescape::<4>)
            .context("expected four hexadecimal digits in a Unicode escape"),
        'U' => cut_err(hexescape::<8>)
            .context("expected eight hexadecimal digits in a Unicode escape"),
        c => invalid_escape(c),
    }
    .parse_next(input)
}

fn invalid_escape(c: char) -> impl FnMut(&mut &str) -> PResult<char> {
    move |input| cut(input, format!("invalid escape character {c:?}"))
}

fn hexescape<const N: usize>(input: &mut &str) -> PResult<char> {
    take_while(N..=N, |c: char| c.is_ascii_hexdigit())
        .try_map(|digits: &str| {
            u32::from_str_radix(digits, 16)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| {
                    format!("escaped value '{digits}' is not a valid Unicode scalar value")
                })
        })
        .parse_next(input)
}

// A backslash directly before the end of a line swallows that newline
// and every following whitespace character; backslash-whitespace is only
// valid in that form.
fn line_continuation(input: &mut &str) -> PResult<()> {
    (
        take_while(0.., (' ', '\t')),
        ignored::newline,
        repeat(
            0..,
            alt((one_of((' ', '\t')).void(), ignored::newline)),
        )
        .map(|()| ()),
    )
        .void()
        .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run<'i>(
        parser: impl Fn(&mut &'i str) -> PResult<Cow<'i, str>>,
        mut input: &'i str,
    ) -> Result<(Cow<'i, str>, &'i str), ()> {
        match parser(&mut input) {
            Ok(s) => Ok((s, input)),
            Err(_) => Err(()),
        }
    }

    #[test]
    fn basic_borrows_without_escapes() {
        let (s, rest) = run(basic, "\"hello\" tail").unwrap();
        assert!(matches!(s, Cow::Borrowed("hello")));
        assert_eq!(rest, " tail");
    }

    #[test]
    fn basic_decodes_escapes() {
        let (s, _) = run(basic, r#""a\tb\u00E9\U0001F600""#).unwrap();
        assert_eq!(s, "a\tb\u{e9}\u{1f600}");
    }

    #[test]
    fn basic_rejects_bad_escapes() {
        assert!(run(basic, r#""a\qb""#).is_err());
        assert!(run(basic, r#""\uD800""#).is_err()); // surrogate
        assert!(run(basic, r#""\u12""#).is_err());
    }

    #[test]
    fn basic_rejects_raw_controls() {
        assert!(run(basic, "\"a\u{1}b\"").is_err());
        assert!(run(basic, "\"a\nb\"").is_err());
        assert!(run(basic, "\"unterminated").is_err());
    }

    #[test]
    fn literal_takes_content_verbatim() {
        let (s, _) = run(literal, r#"'C:\Users\nodejs'"#).unwrap();
        assert_eq!(s, r"C:\Users\nodejs");
    }

    #[test]
    fn multiline_trims_first_newline() {
        let (s, _) = run(multiline_basic, "\"\"\"\nroses\"\"\"").unwrap();
        assert_eq!(s, "roses");
        let (s, _) = run(multiline_literal, "'''\r\nroses'''").unwrap();
        assert_eq!(s, "roses");
    }

    #[test]
    fn multiline_line_continuation() {
        let (s, _) = run(multiline_basic, "\"\"\"a\\\n    b\"\"\"").unwrap();
        assert_eq!(s, "ab");
        // escaped backslash does not continue the line
        let (s, _) = run(multiline_basic, "\"\"\"a\\\\\nb\"\"\"").unwrap();
        assert_eq!(s, "a\\\nb");
        // whitespace between the backslash and the newline is fine
        let (s, _) = run(multiline_basic, "\"\"\"a\\  \n  \n  b\"\"\"").unwrap();
        assert_eq!(s, "ab");
        // ... but a backslash-space not ending the line is not
        assert!(run(multiline_basic, "\"\"\"a\\ b\"\"\"").is_err());
    }

    #[test]
    fn multiline_quote_runs() {
        let (s, _) = run(multiline_basic, "\"\"\"a\"\"b\"\"\"").unwrap();
        assert_eq!(s, "a\"\"b");
        let (s, rest) = run(multiline_basic, "\"\"\"a\"\"\"\"\"").unwrap();
        assert_eq!(s, "a\"\"");
        assert_eq!(rest, "");
        // longer quote runs spill past the closing delimiter
        let (s, rest) = run(multiline_basic, "\"\"\"a\"\"\"\"\"\"\"\"\"").unwrap();
        assert_eq!(s, "a\"\"");
        assert_eq!(rest, "\"\"\"\"");
    }

    #[test]
    fn multiline_normalizes_crlf() {
        let (s, _) = run(multiline_basic, "\"\"\"a\r\nb\"\"\"").unwrap();
        assert_eq!(s, "a\nb");
        let (s, _) = run(multiline_literal, "'''a\r\nb'''").unwrap();
        assert_eq!(s, "a\nb");
    }
}
