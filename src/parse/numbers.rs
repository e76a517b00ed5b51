use alloc::{format, string::String};
use core::ops::RangeInclusive;

use winnow::{
    combinator::{alt, cut_err, fail, not, opt, peek, preceded, repeat, trace},
    dispatch,
    token::{any, one_of, take},
    Parser,
};

use super::{cut, PError, PResult};

// ;; Integer

// integer = dec-int / hex-int / oct-int / bin-int
pub(super) fn integer(input: &mut &str) -> PResult<i64> {
    // catch a signed base prefix up front so the error points at the sign
    if peek(opt((
        one_of(('+', '-')),
        alt(("0x", "0o", "0b", "0X", "0O", "0B")),
    )))
    .parse_next(input)?
    .is_some()
    {
        return cut(input, "cannot use sign with non-decimal numbers");
    }
    trace(
        "integer",
        dispatch! {peek(opt::<_, &str, _, _>(take(2usize)));
            Some("0x") => cut_err(hex_int.try_map(|s: &str| int_from_radix("0x", s, 16))),
            Some("0o") => cut_err(oct_int.try_map(|s: &str| int_from_radix("0o", s, 8))),
            Some("0b") => cut_err(bin_int.try_map(|s: &str| int_from_radix("0b", s, 2))),
            Some("0X") | Some("0O") | Some("0B") => lowercase_prefix,
            _ => dec_int_value,
        },
    )
    .parse_next(input)
}

fn lowercase_prefix(input: &mut &str) -> PResult<i64> {
    cut(input, "base prefix must be lowercase")
}

fn int_from_radix(prefix: &str, digits: &str, radix: u32) -> Result<i64, String> {
    i64::from_str_radix(&digits.replace('_', ""), radix)
        .map_err(|_| format!("integer '{prefix}{digits}' is out of range of 64-bit signed integers"))
}

// the grammar accepts any digit string; range-check it afterwards
fn dec_int_value(input: &mut &str) -> PResult<i64> {
    let repr = dec_int.parse_next(input)?;
    match repr.replace('_', "").parse() {
        Ok(value) => Ok(value),
        Err(_) => cut(
            input,
            format!("integer '{repr}' is out of range of 64-bit signed integers"),
        ),
    }
}

// dec-int = [ minus / plus ] unsigned-dec-int
pub(super) fn dec_int<'i>(input: &mut &'i str) -> PResult<&'i str> {
    trace(
        "dec-int",
        (opt(one_of(('+', '-'))), unsigned_dec_int).take(),
    )
    .parse_next(input)
}

// unsigned-dec-int = DIGIT / digit1-9 1*( DIGIT / underscore DIGIT )
fn unsigned_dec_int(input: &mut &str) -> PResult<()> {
    alt((
        (
            one_of(DIGIT1_9),
            repeat(
                0..,
                alt((
                    digit.void(),
                    (
                        one_of('_'),
                        cut_err(digit).context("underscores must be surrounded by digits"),
                    )
                        .void(),
                )),
            )
            .map(|()| ()),
        )
            .void(),
        // a lone zero; a digit or underscore after it would be a leading zero
        (
            '0',
            cut_err(not(one_of((DIGIT, '_')))).context("cannot have leading zeroes"),
        )
            .void(),
    ))
    .parse_next(input)
}

// hex-prefix = %x30.78               ; 0x
// hex-int = hex-prefix HEXDIG *( HEXDIG / underscore HEXDIG )
fn hex_int<'i>(input: &mut &'i str) -> PResult<&'i str> {
    trace(
        "hex-int",
        prefixed_digits("0x", hexdig, "expected a hexadecimal digit"),
    )
    .parse_next(input)
}

// oct-prefix = %x30.6F               ; 0o
// oct-int = oct-prefix digit0-7 *( digit0-7 / underscore digit0-7 )
fn oct_int<'i>(input: &mut &'i str) -> PResult<&'i str> {
    trace(
        "oct-int",
        prefixed_digits("0o", oct_digit, "expected an octal digit"),
    )
    .parse_next(input)
}

// bin-prefix = %x30.62               ; 0b
// bin-int = bin-prefix digit0-1 *( digit0-1 / underscore digit0-1 )
fn bin_int<'i>(input: &mut &'i str) -> PResult<&'i str> {
    trace(
        "bin-int",
        prefixed_digits("0b", bin_digit, "expected a binary digit"),
    )
    .parse_next(input)
}

fn prefixed_digits<'i>(
    prefix: &'static str,
    digit: fn(&mut &'i str) -> PResult<char>,
    expected: &'static str,
) -> impl Parser<&'i str, &'i str, PError> {
    preceded(
        prefix,
        cut_err(
            (
                digit,
                repeat(
                    0..,
                    alt((
                        digit.void(),
                        (
                            one_of('_'),
                            cut_err(digit).context("underscores must be surrounded by digits"),
                        )
                            .void(),
                    )),
                )
                .map(|()| ()),
            )
                .take(),
        )
        .context(expected),
    )
}

// ;; Float

// float = float-int-part ( exp / frac [ exp ] )
// float =/ special-float
pub(super) fn float(input: &mut &str) -> PResult<f64> {
    trace("float", alt((regular_float, special_float))).parse_next(input)
}

fn regular_float(input: &mut &str) -> PResult<f64> {
    let repr = float_repr.parse_next(input)?;
    match repr.replace('_', "").parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => cut(
            input,
            format!("float '{repr}' is out of the range of 64-bit IEEE-754 floats"),
        ),
    }
}

// float-int-part = dec-int
fn float_repr<'i>(input: &mut &'i str) -> PResult<&'i str> {
    (dec_int, alt((exp, (frac, opt(exp)).void())))
        .take()
        .parse_next(input)
}

// frac = decimal-point zero-prefixable-int
// decimal-point = %x2E               ; .
fn frac(input: &mut &str) -> PResult<()> {
    (
        '.',
        cut_err(zero_prefixable_int).context("expected at least one digit"),
    )
        .void()
        .parse_next(input)
}

// zero-prefixable-int = DIGIT *( DIGIT / underscore DIGIT )
fn zero_prefixable_int(input: &mut &str) -> PResult<()> {
    (
        digit,
        repeat(
            0..,
            alt((
                digit.void(),
                (
                    one_of('_'),
                    cut_err(digit).context("underscores must be surrounded by digits"),
                )
                    .void(),
            )),
        )
        .map(|()| ()),
    )
        .void()
        .parse_next(input)
}

// exp = "e" float-exp-part
// float-exp-part = [ minus / plus ] zero-prefixable-int
fn exp(input: &mut &str) -> PResult<()> {
    (
        one_of(('e', 'E')),
        opt(one_of(('+', '-'))),
        cut_err(zero_prefixable_int).context("expected at least one digit"),
    )
        .void()
        .parse_next(input)
}

// special-float = [ minus / plus ] ( inf / nan )
fn special_float(input: &mut &str) -> PResult<f64> {
    (opt(one_of(('+', '-'))), special_float_value)
        .map(|(sign, value)| match sign {
            Some('-') => -value,
            _ => value,
        })
        .parse_next(input)
}

// inf = %x69.6e.66  ; inf
// nan = %x6e.61.6e  ; nan
fn special_float_value(input: &mut &str) -> PResult<f64> {
    dispatch! {peek(any);
        'i' => cut_err("inf".value(f64::INFINITY)).context("invalid float"),
        'n' => cut_err("nan".value(f64::NAN)).context("invalid float"),
        _ => fail,
    }
    .parse_next(input)
}

// DIGIT = %x30-39 ; 0-9
fn digit(input: &mut &str) -> PResult<char> {
    one_of(DIGIT).parse_next(input)
}
const DIGIT: RangeInclusive<u8> = b'0'..=b'9';
const DIGIT1_9: RangeInclusive<u8> = b'1'..=b'9';

// HEXDIG = DIGIT / "A" / "B" / "C" / "D" / "E" / "F"
fn hexdig(input: &mut &str) -> PResult<char> {
    one_of(HEXDIG).parse_next(input)
}
const HEXDIG: (RangeInclusive<u8>, RangeInclusive<u8>, RangeInclusive<u8>) =
    (DIGIT, b'A'..=b'F', b'a'..=b'f');

fn oct_digit(input: &mut &str) -> PResult<char> {
    one_of(DIGIT0_7).parse_next(input)
}
const DIGIT0_7: RangeInclusive<u8> = b'0'..=b'7';

fn bin_digit(input: &mut &str) -> PResult<char> {
    one_of(DIGIT0_1).parse_next(input)
}
const DIGIT0_1: RangeInclusive<u8> = b'0'..=b'1';

#[cfg(test)]
mod tests {
    use super::*;

    fn int(mut input: &str) -> Result<(i64, &str), ()> {
        match integer(&mut input) {
            Ok(v) => Ok((v, input)),
            Err(_) => Err(()),
        }
    }

    fn flt(mut input: &str) -> Result<f64, ()> {
        float(&mut input).map_err(|_| ())
    }

    #[test]
    fn decimal_integers() {
        assert_eq!(int("0").unwrap().0, 0);
        assert_eq!(int("+99").unwrap().0, 99);
        assert_eq!(int("-17").unwrap().0, -17);
        assert_eq!(int("1_000_000").unwrap().0, 1_000_000);
        assert_eq!(int("-9_223_372_036_854_775_808").unwrap().0, i64::MIN);
        assert_eq!(int("9_223_372_036_854_775_807").unwrap().0, i64::MAX);
        assert!(int("9_223_372_036_854_775_808").is_err());
    }

    #[test]
    fn radix_integers() {
        assert_eq!(int("0xdead_BEEF").unwrap().0, 0xdead_beef);
        assert_eq!(int("0o777").unwrap().0, 0o777);
        assert_eq!(int("0b1101").unwrap().0, 0b1101);
        assert_eq!(int("0x0").unwrap().0, 0);
    }

    #[test]
    fn rejected_integers() {
        assert!(int("00").is_err());
        assert!(int("01").is_err());
        assert!(int("0_1").is_err());
        assert!(int("+0x3").is_err());
        assert!(int("0B0").is_err());
        assert!(int("123_").is_err());
        assert!(int("1__2").is_err());
        assert!(int("0x_d00d").is_err());
    }

    #[test]
    fn floats() {
        assert_eq!(flt("3.14").unwrap(), 3.14);
        assert_eq!(flt("-0.01").unwrap(), -0.01);
        assert_eq!(flt("5e+22").unwrap(), 5e+22);
        assert_eq!(flt("6.626e-34").unwrap(), 6.626e-34);
        assert_eq!(flt("9_224_617.445_991").unwrap(), 9_224_617.445_991);
        assert_eq!(flt("inf").unwrap(), f64::INFINITY);
        assert_eq!(flt("-inf").unwrap(), f64::NEG_INFINITY);
        assert!(flt("nan").unwrap().is_nan());
        assert!(flt("-nan").unwrap().is_nan());
    }

    #[test]
    fn rejected_floats() {
        assert!(flt("1._23").is_err());
        assert!(flt("1.").is_err());
        assert!(flt("03.14").is_err());
        assert!(flt("+in").is_err());
        assert!(flt("-na").is_err());
        assert!(flt("1e400").is_err());
    }
}
