use winnow::{
    combinator::{alt, fail, opt, trace},
    token::{one_of, take_while},
    Parser,
};

use super::{cut, PResult};
use crate::{datetime::Offset, Date, Datetime, Time};

// ;; Date and Time (as defined in RFC 3339)

// date-time = offset-date-time / local-date-time / local-date / local-time
// offset-date-time = full-date time-delim full-time
// local-date-time = full-date time-delim partial-time
// local-date = full-date
// local-time = partial-time
pub(crate) fn date_time(input: &mut &str) -> PResult<Datetime> {
    trace(
        "date-time",
        alt((
            (full_date, opt((time_delim, partial_time, opt(time_offset)))).map(
                |(date, tail)| match tail {
                    Some((_, time, offset)) => Datetime {
                        date: Some(date),
                        time: Some(time),
                        offset,
                    },
                    None => Datetime {
                        date: Some(date),
                        time: None,
                        offset: None,
                    },
                },
            ),
            partial_time.map(Into::into),
        )),
    )
    .parse_next(input)
}

// full-date = date-fullyear "-" date-month "-" date-mday
fn full_date(input: &mut &str) -> PResult<Date> {
    let year = fixed_digits::<4>(input)? as u16;
    let Some(rest) = input.strip_prefix('-') else {
        return fail.parse_next(input);
    };
    *input = rest;
    // committed to a date from here on
    let month = fixed_digits_cut::<2>(input)?;
    if !(1..=12).contains(&month) {
        return cut(input, "invalid date and time encoding");
    }
    if let Some(rest) = input.strip_prefix('-') {
        *input = rest;
    } else {
        return cut(input, "invalid date and time encoding");
    }
    let day = fixed_digits_cut::<2>(input)?;
    let is_leap_year = (year % 4 == 0) && ((year % 100 != 0) || (year % 400 == 0));
    let max_days_in_month = match month {
        2 if is_leap_year => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    };
    if day < 1 || day > max_days_in_month {
        return cut(input, "invalid date and time encoding");
    }
    Ok(Date {
        year,
        month: month as u8,
        day: day as u8,
    })
}

// partial-time = time-hour ":" time-minute ":" time-second [ time-secfrac ]
fn partial_time(input: &mut &str) -> PResult<Time> {
    let hour = fixed_digits::<2>(input)?;
    let Some(rest) = input.strip_prefix(':') else {
        return fail.parse_next(input);
    };
    *input = rest;
    let minute = fixed_digits_cut::<2>(input)?;
    if let Some(rest) = input.strip_prefix(':') {
        *input = rest;
    } else {
        return cut(input, "invalid date and time encoding");
    }
    let second = fixed_digits_cut::<2>(input)?;
    // time-hour 00-23, time-minute 00-59, time-second 00-60 (leap second)
    if hour > 23 || minute > 59 || second > 60 {
        return cut(input, "invalid date and time encoding");
    }
    let nanosecond = if let Some(rest) = input.strip_prefix('.') {
        *input = rest;
        time_secfrac(input)?
    } else {
        0
    };
    Ok(Time {
        hour: hour as u8,
        minute: minute as u8,
        second: second as u8,
        nanosecond,
    })
}

// time-secfrac = "." 1*DIGIT
// Anything beyond nanosecond precision is truncated, not rounded.
fn time_secfrac(input: &mut &str) -> PResult<u32> {
    let result: PResult<&str> = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input);
    let Ok(digits) = result else {
        return cut(input, "invalid date and time encoding");
    };
    let kept = &digits[..digits.len().min(9)];
    let value: u32 = kept.parse().unwrap_or(0);
    let scale = 10_u32.pow(9 - kept.len() as u32);
    Ok(value * scale)
}

// time-delim = "T" / %x20 ; T, t, or space
fn time_delim(input: &mut &str) -> PResult<char> {
    one_of(('T', 't', ' ')).parse_next(input)
}

// time-offset = "Z" / time-numoffset
// time-numoffset = ( "+" / "-" ) time-hour ":" time-minute
fn time_offset(input: &mut &str) -> PResult<Offset> {
    match input.chars().next() {
        Some('Z') | Some('z') => {
            *input = &input[1..];
            Ok(Offset::Z)
        }
        Some(sign @ ('+' | '-')) => {
            *input = &input[1..];
            let hours = fixed_digits_cut::<2>(input)? as i16;
            if let Some(rest) = input.strip_prefix(':') {
                *input = rest;
            } else {
                return cut(input, "invalid date and time encoding");
            }
            let minutes = fixed_digits_cut::<2>(input)? as i16;
            let mut total = hours * 60 + minutes;
            if sign == '-' {
                total = -total;
            }
            if !((-24 * 60)..=(24 * 60)).contains(&total) {
                return cut(input, "invalid date and time encoding");
            }
            Ok(Offset::Custom { minutes: total })
        }
        _ => fail.parse_next(input),
    }
}

// date-fullyear = 4DIGIT, etc.
fn fixed_digits<const N: usize>(input: &mut &str) -> PResult<u32> {
    let s: &str = take_while(N..=N, |c: char| c.is_ascii_digit()).parse_next(input)?;
    Ok(s.parse().unwrap_or(0))
}

fn fixed_digits_cut<const N: usize>(input: &mut &str) -> PResult<u32> {
    match fixed_digits::<N>(input) {
        Ok(v) => Ok(v),
        Err(_) => cut(input, "invalid date and time encoding"),
    }
}
