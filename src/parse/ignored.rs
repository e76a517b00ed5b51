use winnow::{
    ascii::space0,
    combinator::{alt, cut_err, empty, eof, fail, opt, peek},
    dispatch,
    token::{any, one_of, take_while},
    Parser,
};

use super::PResult;

// comment = %x23 *non-eol
// > Control characters other than tab (U+0000 to U+0008, U+000A to
// > U+001F, U+007F) are not permitted in comments.
pub(super) fn comment(input: &mut &str) -> PResult<()> {
    (
        '#',
        take_while(0.., |c: char| {
            !matches!(c, '\0'..='\u{08}' | '\u{0a}'..='\u{1f}' | '\u{7f}')
        }),
        alt((
            peek(one_of(('\n', '\r'))).void(),
            eof.void(),
            cut_err(fail).context("control characters are not allowed in comments"),
        )),
    )
        .void()
        .parse_next(input)
}

// A newline is LF or CRLF; a bare CR is not permitted.
pub(super) fn newline(input: &mut &str) -> PResult<()> {
    dispatch! {any;
        '\n' => empty,
        '\r' => cut_err('\n'.void())
            .context("carriage return must be followed by a line feed"),
        _ => fail,
    }
    .parse_next(input)
}

/// Skip any run of whitespace, comments, and newlines.
pub(super) fn ws_comment_newline(input: &mut &str) -> PResult<()> {
    loop {
        let _ = space0.parse_next(input)?;
        match opt(peek(any)).parse_next(input)? {
            Some('#') => comment.parse_next(input)?,
            Some('\n') | Some('\r') => newline.parse_next(input)?,
            _ => return Ok(()),
        }
    }
}
