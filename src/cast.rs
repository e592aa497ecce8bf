//! Scalar coercion: converting a loosely-typed [`Value`] into a concrete
//! scalar.
//!
//! These functions are what the engine uses for leaf destinations, and are
//! exposed for hooks that want the same rules.

use std::{
    borrow::Cow,
    error::Error,
    fmt::{self, Display, Write},
    num::{ParseFloatError, ParseIntError},
    time::{Duration, SystemTime},
};

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{Native, Value};

/// Error returned when a value cannot be coerced into a scalar.
#[derive(Debug)]
pub struct CastError {
    target: &'static str,
    found: &'static str,
    kind: CastErrorKind,
}

impl CastError {
    pub(crate) fn new(target: &'static str, src: &Value, kind: CastErrorKind) -> Self {
        Self {
            target,
            found: src.kind_name(),
            kind,
        }
    }

    /// Name of the type the value was being converted to.
    pub fn target(&self) -> &'static str {
        self.target
    }

    /// Kind of the offending source value.
    pub fn found(&self) -> &'static str {
        self.found
    }

    /// Returns a reference to the error kind for detailed error inspection.
    pub fn kind(&self) -> &CastErrorKind {
        &self.kind
    }
}

impl Display for CastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let CastError {
            target,
            found,
            kind,
        } = self;
        write!(f, "cannot convert {found} to {target}: {kind}")
    }
}

impl Error for CastError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            CastErrorKind::InvalidInt(err) => Some(err),
            CastErrorKind::InvalidFloat(err) => Some(err),
            CastErrorKind::InvalidTimestamp(err) => Some(err),
            _ => None,
        }
    }
}

/// Detailed classification of coercion failures.
#[derive(Debug)]
#[non_exhaustive]
pub enum CastErrorKind {
    /// No rule converts this kind of source into the target.
    Unsupported,
    /// The value does not fit the target's range.
    Overflow,
    /// The string is not a recognised boolean spelling.
    InvalidBool,
    /// The string is not an integer.
    InvalidInt(ParseIntError),
    /// The string is not a float.
    InvalidFloat(ParseFloatError),
    /// The string is not a duration.
    InvalidDuration(String),
    /// The string is not an RFC 3339 timestamp.
    InvalidTimestamp(time::error::Parse),
}

impl Display for CastErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CastErrorKind::Unsupported => write!(f, "unsupported conversion"),
            CastErrorKind::Overflow => write!(f, "value out of range"),
            CastErrorKind::InvalidBool => write!(f, "invalid boolean"),
            CastErrorKind::InvalidInt(err) => write!(f, "{err}"),
            CastErrorKind::InvalidFloat(err) => write!(f, "{err}"),
            CastErrorKind::InvalidDuration(msg) => write!(f, "invalid duration: {msg}"),
            CastErrorKind::InvalidTimestamp(err) => write!(f, "{err}"),
        }
    }
}

type Result<T> = std::result::Result<T, CastError>;

/// Converts `src` into a `bool`.
///
/// Numbers are true when non-zero. Strings accept `1 t T TRUE true True`
/// and `0 f F FALSE false False`; the empty string is false.
pub fn to_bool(src: &Value) -> Result<bool> {
    let fail = |kind| CastError::new("bool", src, kind);
    match src {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(*b),
        Value::Int(i) => Ok(*i != 0),
        Value::Uint(u) => Ok(*u != 0),
        Value::Float(x) => Ok(*x != 0.0),
        Value::String(s) => parse_bool(s).ok_or_else(|| fail(CastErrorKind::InvalidBool)),
        Value::Native(native) => match native_text(native) {
            Some(s) => parse_bool(&s).ok_or_else(|| fail(CastErrorKind::InvalidBool)),
            None => Err(fail(CastErrorKind::Unsupported)),
        },
        Value::Seq(_) | Value::Map(_) => Err(fail(CastErrorKind::Unsupported)),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "" | "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        _ => None,
    }
}

/// Converts `src` into an `i64`.
///
/// Floats are truncated toward zero; a `Duration` native converts to
/// milliseconds and a timestamp native to Unix seconds.
pub fn to_i64(src: &Value) -> Result<i64> {
    let fail = |kind| CastError::new("i64", src, kind);
    match src {
        Value::Null => Ok(0),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Int(i) => Ok(*i),
        Value::Uint(u) => i64::try_from(*u).map_err(|_| fail(CastErrorKind::Overflow)),
        Value::Float(x) => float_to_i64(*x).ok_or_else(|| fail(CastErrorKind::Overflow)),
        Value::String(s) => parse_i64(s).map_err(fail),
        Value::Native(native) => {
            if let Some(d) = native.downcast_ref::<Duration>() {
                return i64::try_from(d.as_millis()).map_err(|_| fail(CastErrorKind::Overflow));
            }
            if let Some(t) = native_timestamp(native) {
                return Ok(t.unix_timestamp());
            }
            match native_text(native) {
                Some(s) => parse_i64(&s).map_err(fail),
                None => Err(fail(CastErrorKind::Unsupported)),
            }
        }
        Value::Seq(_) | Value::Map(_) => Err(fail(CastErrorKind::Unsupported)),
    }
}

fn float_to_i64(x: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    (x.is_finite() && x >= i64::MIN as f64 && x < i64::MAX as f64).then(|| x.trunc() as i64)
}

fn parse_i64(s: &str) -> std::result::Result<i64, CastErrorKind> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(0);
    }
    match s.parse::<i64>() {
        Ok(i) => Ok(i),
        Err(err) => match s.parse::<f64>() {
            Ok(x) => float_to_i64(x).ok_or(CastErrorKind::Overflow),
            Err(_) => Err(CastErrorKind::InvalidInt(err)),
        },
    }
}

/// Converts `src` into a `u64`. Negative values are out of range.
pub fn to_u64(src: &Value) -> Result<u64> {
    let fail = |kind| CastError::new("u64", src, kind);
    match src {
        Value::Null => Ok(0),
        Value::Bool(b) => Ok(u64::from(*b)),
        Value::Int(i) => u64::try_from(*i).map_err(|_| fail(CastErrorKind::Overflow)),
        Value::Uint(u) => Ok(*u),
        Value::Float(x) => float_to_u64(*x).ok_or_else(|| fail(CastErrorKind::Overflow)),
        Value::String(s) => parse_u64(s).map_err(fail),
        Value::Native(native) => {
            if let Some(d) = native.downcast_ref::<Duration>() {
                return u64::try_from(d.as_millis()).map_err(|_| fail(CastErrorKind::Overflow));
            }
            if let Some(t) = native_timestamp(native) {
                return u64::try_from(t.unix_timestamp())
                    .map_err(|_| fail(CastErrorKind::Overflow));
            }
            match native_text(native) {
                Some(s) => parse_u64(&s).map_err(fail),
                None => Err(fail(CastErrorKind::Unsupported)),
            }
        }
        Value::Seq(_) | Value::Map(_) => Err(fail(CastErrorKind::Unsupported)),
    }
}

fn float_to_u64(x: f64) -> Option<u64> {
    (x.is_finite() && x > -1.0 && x < u64::MAX as f64).then(|| x.trunc() as u64)
}

fn parse_u64(s: &str) -> std::result::Result<u64, CastErrorKind> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(0);
    }
    match s.parse::<u64>() {
        Ok(u) => Ok(u),
        Err(err) => match s.parse::<f64>() {
            Ok(x) => float_to_u64(x).ok_or(CastErrorKind::Overflow),
            Err(_) => Err(CastErrorKind::InvalidInt(err)),
        },
    }
}

/// Converts `src` into an `f64`. A `Duration` native converts to seconds.
pub fn to_f64(src: &Value) -> Result<f64> {
    let fail = |kind| CastError::new("f64", src, kind);
    match src {
        Value::Null => Ok(0.0),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Int(i) => Ok(*i as f64),
        Value::Uint(u) => Ok(*u as f64),
        Value::Float(x) => Ok(*x),
        Value::String(s) => parse_f64(s).map_err(fail),
        Value::Native(native) => {
            if let Some(d) = native.downcast_ref::<Duration>() {
                return Ok(d.as_secs_f64());
            }
            match native_text(native) {
                Some(s) => parse_f64(&s).map_err(fail),
                None => Err(fail(CastErrorKind::Unsupported)),
            }
        }
        Value::Seq(_) | Value::Map(_) => Err(fail(CastErrorKind::Unsupported)),
    }
}

/// Converts `src` into an `f32`, rounding to the nearest representable
/// value. A finite value beyond the `f32` range is an overflow.
pub fn to_f32(src: &Value) -> Result<f32> {
    let wide = to_f64(src).map_err(|err| CastError { target: "f32", ..err })?;
    let narrow = wide as f32;
    if wide.is_finite() && narrow.is_infinite() {
        return Err(CastError::new("f32", src, CastErrorKind::Overflow));
    }
    Ok(narrow)
}

fn parse_f64(s: &str) -> std::result::Result<f64, CastErrorKind> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(0.0);
    }
    s.parse::<f64>().map_err(CastErrorKind::InvalidFloat)
}

/// Converts `src` into a `String`.
///
/// Numbers use their shortest form, durations the `1h2m3.5s` notation and
/// timestamps RFC 3339.
pub fn to_string(src: &Value) -> Result<String> {
    let fail = |kind| CastError::new("String", src, kind);
    match src {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Int(i) => Ok(i.to_string()),
        Value::Uint(u) => Ok(u.to_string()),
        Value::Float(x) => Ok(x.to_string()),
        Value::String(s) => Ok(s.clone()),
        Value::Native(native) => {
            if let Some(d) = native.downcast_ref::<Duration>() {
                return Ok(format_duration(*d));
            }
            if let Some(t) = native_timestamp(native) {
                return t
                    .format(&Rfc3339)
                    .map_err(|_| fail(CastErrorKind::Unsupported));
            }
            match native_text(native) {
                Some(s) => Ok(s.into_owned()),
                None => Err(fail(CastErrorKind::Unsupported)),
            }
        }
        Value::Seq(_) | Value::Map(_) => Err(fail(CastErrorKind::Unsupported)),
    }
}

/// Converts `src` into a `Duration`.
///
/// Integers and digit-only strings are milliseconds, floats are seconds, and
/// other strings use the `300ms` / `1.5h` / `2h45m` notation.
pub fn to_duration(src: &Value) -> Result<Duration> {
    let fail = |kind| CastError::new("Duration", src, kind);
    match src {
        Value::Null => Ok(Duration::ZERO),
        Value::Int(i) => u64::try_from(*i)
            .map(Duration::from_millis)
            .map_err(|_| fail(CastErrorKind::Overflow)),
        Value::Uint(u) => Ok(Duration::from_millis(*u)),
        Value::Float(x) => {
            Duration::try_from_secs_f64(*x).map_err(|_| fail(CastErrorKind::Overflow))
        }
        Value::String(s) => parse_duration(s).map_err(fail),
        Value::Native(native) => {
            if let Some(d) = native.downcast_ref::<Duration>() {
                return Ok(*d);
            }
            match native_text(native) {
                Some(s) => parse_duration(&s).map_err(fail),
                None => Err(fail(CastErrorKind::Unsupported)),
            }
        }
        Value::Bool(_) | Value::Seq(_) | Value::Map(_) => Err(fail(CastErrorKind::Unsupported)),
    }
}

fn parse_duration(s: &str) -> std::result::Result<Duration, CastErrorKind> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Duration::ZERO);
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| CastErrorKind::Overflow);
    }
    parse_duration_units(s).map_err(CastErrorKind::InvalidDuration)
}

const NANOS_PER_SEC: u128 = 1_000_000_000;

fn parse_duration_units(input: &str) -> std::result::Result<Duration, String> {
    let invalid = || format!("{input:?}");

    let mut rest = input.strip_prefix('+').unwrap_or(input);
    if rest.starts_with('-') {
        return Err(format!("{input:?} is negative"));
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, tail) = rest.split_at(int_len);
        let (frac_part, tail) = match tail.strip_prefix('.') {
            Some(tail) => {
                let frac_len = tail.bytes().take_while(u8::is_ascii_digit).count();
                tail.split_at(frac_len)
            }
            None => ("", tail),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }

        let unit_len = tail
            .bytes()
            .take_while(|b| !b.is_ascii_digit() && *b != b'.')
            .count();
        let (unit, tail) = tail.split_at(unit_len);
        let scale: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 3_600 * NANOS_PER_SEC,
            "" => return Err(format!("missing unit in {input:?}")),
            unit => return Err(format!("unknown unit {unit:?} in {input:?}")),
        };

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        let mut nanos = whole.checked_mul(scale).ok_or_else(invalid)?;
        if !frac_part.is_empty() {
            let frac: f64 = format!("0.{frac_part}").parse().map_err(|_| invalid())?;
            nanos = nanos
                .checked_add((frac * scale as f64) as u128)
                .ok_or_else(invalid)?;
        }
        total = total.checked_add(nanos).ok_or_else(invalid)?;
        rest = tail;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| invalid())?;
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

/// Formats a duration the way `1h2m3.5s`, `1.5ms` and `0s` read.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_owned();
    }
    if nanos < NANOS_PER_SEC {
        let (unit, div) = if nanos < 1_000 {
            ("ns", 1)
        } else if nanos < 1_000_000 {
            ("µs", 1_000)
        } else {
            ("ms", 1_000_000)
        };
        return format!("{}{unit}", fixed_point(nanos, div));
    }

    let secs = nanos / NANOS_PER_SEC;
    let (hours, minutes, seconds) = (secs / 3_600, secs / 60 % 60, secs % 60);
    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h");
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    let rem = seconds * NANOS_PER_SEC + nanos % NANOS_PER_SEC;
    let _ = write!(out, "{}s", fixed_point(rem, NANOS_PER_SEC));
    out
}

fn fixed_point(value: u128, div: u128) -> String {
    let (int, frac) = (value / div, value % div);
    if frac == 0 {
        return int.to_string();
    }
    let width = div.to_string().len() - 1;
    let frac = format!("{frac:0width$}");
    format!("{int}.{}", frac.trim_end_matches('0'))
}

/// Converts `src` into a UTC timestamp.
///
/// Numbers and digit-only strings are Unix seconds; other strings must be
/// RFC 3339.
pub fn to_timestamp(src: &Value) -> Result<OffsetDateTime> {
    let fail = |kind| CastError::new("OffsetDateTime", src, kind);
    match src {
        Value::Int(i) => {
            OffsetDateTime::from_unix_timestamp(*i).map_err(|_| fail(CastErrorKind::Overflow))
        }
        Value::Uint(u) => i64::try_from(*u)
            .ok()
            .and_then(|i| OffsetDateTime::from_unix_timestamp(i).ok())
            .ok_or_else(|| fail(CastErrorKind::Overflow)),
        Value::Float(x) => {
            let nanos = x * 1e9;
            if !nanos.is_finite() {
                return Err(fail(CastErrorKind::Overflow));
            }
            OffsetDateTime::from_unix_timestamp_nanos(nanos as i128)
                .map_err(|_| fail(CastErrorKind::Overflow))
        }
        Value::String(s) => parse_timestamp(s).map_err(fail),
        Value::Native(native) => {
            if let Some(t) = native_timestamp(native) {
                return Ok(t);
            }
            match native_text(native) {
                Some(s) => parse_timestamp(&s).map_err(fail),
                None => Err(fail(CastErrorKind::Unsupported)),
            }
        }
        Value::Null | Value::Bool(_) | Value::Seq(_) | Value::Map(_) => {
            Err(fail(CastErrorKind::Unsupported))
        }
    }
}

fn parse_timestamp(s: &str) -> std::result::Result<OffsetDateTime, CastErrorKind> {
    let s = s.trim();
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        return s
            .parse::<i64>()
            .ok()
            .and_then(|i| OffsetDateTime::from_unix_timestamp(i).ok())
            .ok_or(CastErrorKind::Overflow);
    }
    OffsetDateTime::parse(s, &Rfc3339).map_err(CastErrorKind::InvalidTimestamp)
}

fn native_timestamp(native: &Native) -> Option<OffsetDateTime> {
    if let Some(t) = native.downcast_ref::<OffsetDateTime>() {
        return Some(*t);
    }
    native
        .downcast_ref::<SystemTime>()
        .map(|t| OffsetDateTime::from(*t))
}

fn native_text(native: &Native) -> Option<Cow<'_, str>> {
    if let Some(s) = native.downcast_ref::<String>() {
        return Some(Cow::Borrowed(s));
    }
    if let Some(s) = native.downcast_ref::<&'static str>() {
        return Some(Cow::Borrowed(s));
    }
    native
        .downcast_ref::<char>()
        .map(|c| Cow::Owned(c.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_bool() {
        assert!(to_bool(&Value::from("True")).unwrap());
        assert!(to_bool(&Value::from("1")).unwrap());
        assert!(!to_bool(&Value::from("F")).unwrap());
        assert!(!to_bool(&Value::from("")).unwrap());
        assert!(to_bool(&Value::Int(-3)).unwrap());
        assert!(!to_bool(&Value::Float(0.0)).unwrap());

        let err = to_bool(&Value::from("yes")).unwrap_err();
        assert!(matches!(err.kind(), CastErrorKind::InvalidBool));
        assert_eq!(err.target(), "bool");
        assert_eq!(err.found(), "string");
    }

    #[test]
    fn test_to_i64() {
        assert_eq!(to_i64(&Value::Bool(true)).unwrap(), 1);
        assert_eq!(to_i64(&Value::Float(-2.9)).unwrap(), -2);
        assert_eq!(to_i64(&Value::from("42")).unwrap(), 42);
        assert_eq!(to_i64(&Value::from("4.7")).unwrap(), 4);
        assert_eq!(to_i64(&Value::from("")).unwrap(), 0);
        assert_eq!(to_i64(&Value::from(Duration::from_secs(1))).unwrap(), 1000);

        let unix = SystemTime::UNIX_EPOCH + Duration::from_secs(1_672_531_200);
        assert_eq!(to_i64(&Value::from(unix)).unwrap(), 1_672_531_200);

        let err = to_i64(&Value::Uint(u64::MAX)).unwrap_err();
        assert!(matches!(err.kind(), CastErrorKind::Overflow));

        let err = to_i64(&Value::from("abc")).unwrap_err();
        assert!(matches!(err.kind(), CastErrorKind::InvalidInt(_)));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_to_u64() {
        assert_eq!(to_u64(&Value::Int(7)).unwrap(), 7);
        assert_eq!(to_u64(&Value::from("0.5")).unwrap(), 0);
        assert!(matches!(
            to_u64(&Value::Int(-1)).unwrap_err().kind(),
            CastErrorKind::Overflow
        ));
        assert!(matches!(
            to_u64(&Value::from("-12")).unwrap_err().kind(),
            CastErrorKind::Overflow
        ));
    }

    #[test]
    fn test_to_f64() {
        assert_eq!(to_f64(&Value::from("1.25")).unwrap(), 1.25);
        assert_eq!(to_f64(&Value::Int(3)).unwrap(), 3.0);
        assert_eq!(to_f64(&Value::from(Duration::from_millis(1500))).unwrap(), 1.5);
        assert!(matches!(
            to_f64(&Value::from("x")).unwrap_err().kind(),
            CastErrorKind::InvalidFloat(_)
        ));
    }

    #[test]
    fn test_to_f32() {
        assert_eq!(to_f32(&Value::from("1.5")).unwrap(), 1.5);
        assert_eq!(to_f32(&Value::Float(1e-60)).unwrap(), 0.0);
        assert!(to_f32(&Value::Float(f64::INFINITY)).unwrap().is_infinite());

        let err = to_f32(&Value::Float(1e300)).unwrap_err();
        assert!(matches!(err.kind(), CastErrorKind::Overflow));
        assert_eq!(err.target(), "f32");
    }

    #[test]
    fn test_to_string() {
        assert_eq!(to_string(&Value::Int(40)).unwrap(), "40");
        assert_eq!(to_string(&Value::Float(30.0)).unwrap(), "30");
        assert_eq!(to_string(&Value::Float(1.5)).unwrap(), "1.5");
        assert_eq!(to_string(&Value::Bool(false)).unwrap(), "false");
        assert_eq!(to_string(&Value::native('x')).unwrap(), "x");
        assert_eq!(
            to_string(&Value::from(Duration::from_millis(3_723_500))).unwrap(),
            "1h2m3.5s"
        );
        assert!(matches!(
            to_string(&Value::Seq(vec![])).unwrap_err().kind(),
            CastErrorKind::Unsupported
        ));
    }

    #[test]
    fn test_to_duration() {
        assert_eq!(to_duration(&Value::from("1s")).unwrap(), Duration::from_secs(1));
        assert_eq!(to_duration(&Value::Int(2000)).unwrap(), Duration::from_secs(2));
        assert_eq!(to_duration(&Value::Float(3.0)).unwrap(), Duration::from_secs(3));
        assert_eq!(to_duration(&Value::from("250")).unwrap(), Duration::from_millis(250));
        assert_eq!(to_duration(&Value::from("")).unwrap(), Duration::ZERO);
        assert_eq!(
            to_duration(&Value::from("1.5h")).unwrap(),
            Duration::from_secs(5_400)
        );
        assert_eq!(
            to_duration(&Value::from("2h45m")).unwrap(),
            Duration::from_secs(9_900)
        );
        assert_eq!(
            to_duration(&Value::from("300ms")).unwrap(),
            Duration::from_millis(300)
        );
        assert_eq!(
            to_duration(&Value::from("10µs")).unwrap(),
            Duration::from_micros(10)
        );

        for bad in ["-1s", "1x", "h", "1.5", "94522879700260684295381835.9h"] {
            let err = to_duration(&Value::from(bad)).unwrap_err();
            assert!(
                matches!(err.kind(), CastErrorKind::InvalidDuration(_)),
                "{bad}: {err}"
            );
        }
        assert!(matches!(
            to_duration(&Value::Int(-5)).unwrap_err().kind(),
            CastErrorKind::Overflow
        ));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_nanos(40)), "40ns");
        assert_eq!(format_duration(Duration::from_micros(1500)), "1.5ms");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h0m0s");
        assert_eq!(format_duration(Duration::from_secs(61)), "1m1s");
    }

    #[test]
    fn test_to_timestamp() {
        let t = to_timestamp(&Value::Int(1_672_531_200)).unwrap();
        assert_eq!(t.unix_timestamp(), 1_672_531_200);

        let t = to_timestamp(&Value::from("2023-02-01T00:00:00Z")).unwrap();
        assert_eq!(t.unix_timestamp(), 1_675_209_600);

        let t = to_timestamp(&Value::from("1672531200")).unwrap();
        assert_eq!(t.unix_timestamp(), 1_672_531_200);

        let t = to_timestamp(&Value::Float(1.5)).unwrap();
        assert_eq!(t.unix_timestamp_nanos(), 1_500_000_000);

        let err = to_timestamp(&Value::from("yesterday")).unwrap_err();
        assert!(matches!(err.kind(), CastErrorKind::InvalidTimestamp(_)));
    }
}
