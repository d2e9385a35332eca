//! Binary wire formats the driver has no Rust mapping for.
//!
//! tokio-postgres exchanges every value in binary format. Types outside its
//! built-in `FromSql`/`ToSql` impls are decoded and encoded here, producing
//! the same text PostgreSQL itself prints for them.

use std::error::Error;
use std::fmt;
use std::net::IpAddr;

use bytes::{BufMut, BytesMut};
use chrono::{NaiveTime, Timelike};
use postgres_protocol::types as protocol;
use postgres_types::{Kind, Type};

/// Error type shared with `FromSql`/`ToSql`.
pub type WireResult<T> = Result<T, Box<dyn Error + Sync + Send>>;

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

const MICROS_PER_DAY: f64 = 86_400_000_000.0;

/// Types whose binary representation is their text.
pub fn is_text_format(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN | Type::XML
    ) || matches!(ty.kind(), Kind::Enum(_))
        || ty.name() == "citext"
}

fn take<const N: usize>(buf: &mut &[u8]) -> WireResult<[u8; N]> {
    if buf.len() < N {
        return Err("unexpected end of value".into());
    }
    let (head, rest) = buf.split_at(N);
    *buf = rest;
    let mut out = [0u8; N];
    out.copy_from_slice(head);
    Ok(out)
}

fn done(buf: &[u8]) -> WireResult<()> {
    if buf.is_empty() {
        Ok(())
    } else {
        Err("invalid buffer size".into())
    }
}

/// `HH:MM:SS` followed by the fraction with trailing zeros removed.
fn write_clock(out: &mut dyn fmt::Write, micros: u64) -> fmt::Result {
    let seconds = micros / 1_000_000;
    let fraction = micros % 1_000_000;
    write!(out, "{:02}:{:02}:{:02}", seconds / 3600, seconds / 60 % 60, seconds % 60)?;
    if fraction != 0 {
        let digits = format!("{fraction:06}");
        write!(out, ".{}", digits.trim_end_matches('0'))?;
    }
    Ok(())
}

// numeric

/// Render a `numeric` exactly, keeping its display scale.
pub fn numeric_to_string(mut raw: &[u8]) -> WireResult<String> {
    let ndigits = i16::from_be_bytes(take(&mut raw)?);
    let weight = i32::from(i16::from_be_bytes(take(&mut raw)?));
    let sign = u16::from_be_bytes(take(&mut raw)?);
    let dscale = usize::from(u16::from_be_bytes(take(&mut raw)?));

    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        NUMERIC_POS | NUMERIC_NEG => {}
        _ => return Err("invalid numeric sign".into()),
    }
    if ndigits < 0 {
        return Err("invalid numeric digit count".into());
    }

    let digits = (0..ndigits)
        .map(|_| Ok(i16::from_be_bytes(take(&mut raw)?)))
        .collect::<WireResult<Vec<i16>>>()?;
    done(raw)?;
    let digit = |idx: i32| -> i16 {
        usize::try_from(idx)
            .ok()
            .and_then(|idx| digits.get(idx).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        out.push_str(&digit(0).to_string());
        for idx in 1..=weight {
            out.push_str(&format!("{:04}", digit(idx)));
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut idx = weight + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", digit(idx)));
            idx += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }
    Ok(out)
}

/// Encode decimal text such as `-12.50` or `1.5e-3` as a `numeric`.
///
/// Returns `None` when the text is not a number.
pub fn encode_numeric(text: &str, out: &mut BytesMut) -> Option<()> {
    let text = text.trim();
    let special = match text.to_ascii_lowercase().as_str() {
        "nan" => Some(NUMERIC_NAN),
        "infinity" | "+infinity" | "inf" => Some(NUMERIC_PINF),
        "-infinity" | "-inf" => Some(NUMERIC_NINF),
        _ => None,
    };
    if let Some(sign) = special {
        out.put_i16(0);
        out.put_i16(0);
        out.put_u16(sign);
        out.put_u16(0);
        return Some(());
    }

    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(idx) => (&body[..idx], body[idx + 1..].parse::<i64>().ok()?),
        None => (body, 0),
    };
    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if (int.is_empty() && frac.is_empty())
        || !int.bytes().all(|b| b.is_ascii_digit())
        || !frac.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let digits = format!("{int}{frac}");
    let point = i64::try_from(int.len()).ok()?.checked_add(exponent)?;
    if point.unsigned_abs() > 150_000 {
        return None;
    }
    let (int_digits, frac_digits) = if point <= 0 {
        (String::new(), "0".repeat(point.unsigned_abs() as usize) + &digits)
    } else if point as usize >= digits.len() {
        (digits.clone() + &"0".repeat(point as usize - digits.len()), String::new())
    } else {
        (digits[..point as usize].to_string(), digits[point as usize..].to_string())
    };
    let dscale = u16::try_from(frac_digits.len()).ok()?;

    let int_padded = "0".repeat((4 - int_digits.len() % 4) % 4) + &int_digits;
    let frac_padded = frac_digits.clone() + &"0".repeat((4 - frac_digits.len() % 4) % 4);
    let mut groups = int_padded
        .as_bytes()
        .chunks(4)
        .chain(frac_padded.as_bytes().chunks(4))
        .map(|chunk| std::str::from_utf8(chunk).ok()?.parse::<i16>().ok())
        .collect::<Option<Vec<i16>>>()?;

    let mut weight = i64::try_from(int_padded.len() / 4).ok()? - 1;
    let leading = groups.iter().take_while(|g| **g == 0).count();
    groups.drain(..leading);
    weight -= i64::try_from(leading).ok()?;
    while groups.last() == Some(&0) {
        groups.pop();
    }
    if groups.is_empty() {
        weight = 0;
    }

    out.put_i16(i16::try_from(groups.len()).ok()?);
    out.put_i16(i16::try_from(weight).ok()?);
    out.put_u16(if negative && !groups.is_empty() { NUMERIC_NEG } else { NUMERIC_POS });
    out.put_u16(dscale);
    for group in groups {
        out.put_i16(group);
    }
    Some(())
}

// money

/// `money` is a count of cents; rendered without currency symbol.
pub fn money_to_string(raw: &[u8]) -> WireResult<String> {
    let cents = protocol::int8_from_sql(raw)?;
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    Ok(format!("{sign}{}.{:02}", abs / 100, abs % 100))
}

/// Parse `1234.56`, `$1,234.56` or `-0.5` into cents, rounding half up.
pub fn parse_money(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let text: String = text.strip_prefix('$').unwrap_or(text).replace(',', "");
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), ""));
    if (whole.is_empty() && frac.is_empty())
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !frac.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut digits = frac.bytes().map(|b| i64::from(b - b'0'));
    let cents = digits.next().unwrap_or(0) * 10 + digits.next().unwrap_or(0);
    let round = i64::from(digits.next().is_some_and(|d| d >= 5));
    let magnitude = whole.checked_mul(100)?.checked_add(cents + round)?;
    Some(if negative { -magnitude } else { magnitude })
}

pub fn encode_money(cents: i64, out: &mut BytesMut) {
    protocol::int8_to_sql(cents, out);
}

// interval

/// A PostgreSQL `interval`: months, days and microseconds kept apart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Interval {
    pub months: i32,
    pub days: i32,
    pub micros: i64,
}

#[derive(Clone, Copy)]
enum Field {
    Months,
    Days,
    Micros,
}

fn unit_scale(unit: &str) -> Option<(f64, Field)> {
    Some(match unit {
        "microsecond" | "microseconds" | "us" | "usec" | "usecs" => (1.0, Field::Micros),
        "millisecond" | "milliseconds" | "ms" | "msec" | "msecs" => (1_000.0, Field::Micros),
        "second" | "seconds" | "sec" | "secs" | "s" => (1_000_000.0, Field::Micros),
        "minute" | "minutes" | "min" | "mins" | "m" => (60_000_000.0, Field::Micros),
        "hour" | "hours" | "hr" | "hrs" | "h" => (3_600_000_000.0, Field::Micros),
        "day" | "days" | "d" => (1.0, Field::Days),
        "week" | "weeks" | "w" => (7.0, Field::Days),
        "mon" | "mons" | "month" | "months" => (1.0, Field::Months),
        "year" | "years" | "yr" | "yrs" | "y" => (12.0, Field::Months),
        "decade" | "decades" => (120.0, Field::Months),
        "century" | "centuries" => (1_200.0, Field::Months),
        "millennium" | "millennia" => (12_000.0, Field::Months),
        _ => return None,
    })
}

fn is_unit(word: &str) -> bool {
    unit_scale(&word.to_ascii_lowercase()).is_some()
}

/// Accumulates parsed parts; fractions spill into the next smaller field
/// the way PostgreSQL does (a month is 30 days).
#[derive(Default)]
struct IntervalParts {
    months: i64,
    days: i64,
    micros: f64,
}

impl IntervalParts {
    fn add(&mut self, value: f64, unit: &str) -> Option<()> {
        if !value.is_finite() {
            return None;
        }
        let (scale, field) = unit_scale(&unit.to_ascii_lowercase())?;
        match field {
            Field::Months => {
                let total = value * scale;
                let whole = total.trunc();
                self.months += whole as i64;
                self.add_days((total - whole) * 30.0);
            }
            Field::Days => self.add_days(value * scale),
            Field::Micros => self.micros += value * scale,
        }
        Some(())
    }

    fn add_days(&mut self, days: f64) {
        let whole = days.trunc();
        self.days += whole as i64;
        self.micros += (days - whole) * MICROS_PER_DAY;
    }

    fn finish(self, negate: bool) -> Option<Interval> {
        let sign = if negate { -1 } else { 1 };
        Some(Interval {
            months: i32::try_from(self.months * sign).ok()?,
            days: i32::try_from(self.days * sign).ok()?,
            micros: (self.micros.round() as i64) * sign,
        })
    }
}

/// `[+-]H:M[:S[.f]]` as microseconds.
fn parse_clock(token: &str) -> Option<f64> {
    let (sign, body) = match token.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, token.strip_prefix('+').unwrap_or(token)),
    };
    let parts: Vec<&str> = body.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }
    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = match parts.get(2) {
        Some(s) => s.parse().ok()?,
        None => 0.0,
    };
    Some(sign * ((hours * 3600.0 + minutes * 60.0 + seconds) * 1_000_000.0))
}

impl Interval {
    pub fn decode(mut raw: &[u8]) -> WireResult<Self> {
        let micros = i64::from_be_bytes(take(&mut raw)?);
        let days = i32::from_be_bytes(take(&mut raw)?);
        let months = i32::from_be_bytes(take(&mut raw)?);
        done(raw)?;
        Ok(Self {
            months,
            days,
            micros,
        })
    }

    pub fn encode(&self, out: &mut BytesMut) {
        out.put_i64(self.micros);
        out.put_i32(self.days);
        out.put_i32(self.months);
    }

    /// Parse PostgreSQL interval input (`1 day 02:00:00`, `2 hours ago`,
    /// `-1 days +01:00`, a bare number of seconds) or ISO 8601 (`P1DT2H`).
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        match text.strip_prefix(['P', 'p']) {
            Some(body) => Self::parse_iso(body),
            None => Self::parse_postgres(text),
        }
    }

    fn parse_postgres(text: &str) -> Option<Self> {
        let mut parts = IntervalParts::default();
        let mut tokens = text.split_whitespace().peekable();
        let mut ago = false;
        let mut seen = false;

        while let Some(token) = tokens.next() {
            if token == "@" {
                continue;
            }
            if token.eq_ignore_ascii_case("ago") {
                ago = true;
                continue;
            }
            if token.contains(':') {
                parts.micros += parse_clock(token)?;
                seen = true;
                continue;
            }

            let split = token
                .find(|c: char| c.is_ascii_alphabetic())
                .unwrap_or(token.len());
            let (number, unit) = token.split_at(split);
            let value: f64 = number.parse().ok()?;
            let unit = if unit.is_empty() {
                tokens.next_if(|next| is_unit(next)).unwrap_or("second")
            } else {
                unit
            };
            parts.add(value, unit)?;
            seen = true;
        }

        if seen { parts.finish(ago) } else { None }
    }

    fn parse_iso(body: &str) -> Option<Self> {
        let mut parts = IntervalParts::default();
        let mut in_time = false;
        let mut number = String::new();
        let mut seen = false;

        for c in body.chars() {
            match c {
                'T' | 't' if number.is_empty() && !in_time => in_time = true,
                '0'..='9' | '.' | '-' | '+' => number.push(c),
                designator => {
                    let value: f64 = number.parse().ok()?;
                    number.clear();
                    let unit = match (designator.to_ascii_uppercase(), in_time) {
                        ('Y', false) => "year",
                        ('M', false) => "month",
                        ('W', false) => "week",
                        ('D', false) => "day",
                        ('H', true) => "hour",
                        ('M', true) => "minute",
                        ('S', true) => "second",
                        _ => return None,
                    };
                    parts.add(value, unit)?;
                    seen = true;
                }
            }
        }

        if seen && number.is_empty() { parts.finish(false) } else { None }
    }
}

/// PostgreSQL's default `IntervalStyle` output.
impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut is_before = false;
        let mut is_zero = true;

        let fields = [
            (i64::from(self.months / 12), "year"),
            (i64::from(self.months % 12), "mon"),
            (i64::from(self.days), "day"),
        ];
        for (value, unit) in fields {
            if value == 0 {
                continue;
            }
            let sep = if is_zero { "" } else { " " };
            let sign = if is_before && value > 0 { "+" } else { "" };
            let plural = if value != 1 { "s" } else { "" };
            write!(f, "{sep}{sign}{value} {unit}{plural}")?;
            is_before = value < 0;
            is_zero = false;
        }

        if is_zero || self.micros != 0 {
            let sep = if is_zero { "" } else { " " };
            let sign = if self.micros < 0 {
                "-"
            } else if is_before {
                "+"
            } else {
                ""
            };
            write!(f, "{sep}{sign}")?;
            write_clock(f, self.micros.unsigned_abs())?;
        }
        Ok(())
    }
}

// timetz

/// Time of day with a fixed UTC offset in seconds east.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeTz {
    pub micros: i64,
    pub offset: i32,
}

impl TimeTz {
    pub fn decode(mut raw: &[u8]) -> WireResult<Self> {
        let micros = i64::from_be_bytes(take(&mut raw)?);
        // The wire carries seconds west of UTC.
        let zone = i32::from_be_bytes(take(&mut raw)?);
        done(raw)?;
        Ok(Self {
            micros,
            offset: -zone,
        })
    }

    pub fn encode(&self, out: &mut BytesMut) {
        out.put_i64(self.micros);
        out.put_i32(-self.offset);
    }

    /// Parse `10:20:30+02`, `10:20:30.5-05:30` or `10:20Z`. An offset is
    /// required.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (time, offset) = match text.strip_suffix(['Z', 'z']) {
            Some(time) => (time, 0),
            None => {
                let idx = text.rfind(['+', '-'])?;
                (&text[..idx], parse_offset(&text[idx..])?)
            }
        };
        let time = time.trim();
        let time = NaiveTime::parse_from_str(time, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
            .ok()?;
        let micros = i64::from(time.num_seconds_from_midnight()) * 1_000_000
            + i64::from(time.nanosecond() / 1_000);
        Some(Self { micros, offset })
    }
}

fn parse_offset(text: &str) -> Option<i32> {
    if !text.is_ascii() || text.len() < 2 {
        return None;
    }
    let (sign, body) = match text.split_at(1) {
        ("+", body) => (1, body),
        ("-", body) => (-1, body),
        _ => return None,
    };
    let parts: Vec<&str> = if body.contains(':') {
        body.split(':').collect()
    } else if body.len() == 4 {
        vec![&body[..2], &body[2..]]
    } else {
        vec![body]
    };
    if parts.len() > 3 || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }

    let mut seconds = 0i32;
    for (part, scale) in parts.iter().zip([3600, 60, 1]) {
        seconds += part.parse::<i32>().ok()? * scale;
    }
    Some(sign * seconds)
}

impl fmt::Display for TimeTz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_clock(f, self.micros.unsigned_abs())?;

        let sign = if self.offset < 0 { '-' } else { '+' };
        let abs = self.offset.unsigned_abs();
        let (hours, minutes, seconds) = (abs / 3600, abs / 60 % 60, abs % 60);
        if seconds != 0 {
            write!(f, "{sign}{hours:02}:{minutes:02}:{seconds:02}")
        } else if minutes != 0 {
            write!(f, "{sign}{hours:02}:{minutes:02}")
        } else {
            write!(f, "{sign}{hours:02}")
        }
    }
}

// inet, cidr, macaddr

/// `inet` drops a full-width netmask, `cidr` always shows it.
pub fn inet_to_string(ty: &Type, raw: &[u8]) -> WireResult<String> {
    let inet = protocol::inet_from_sql(raw)?;
    let full = if inet.addr().is_ipv4() { 32 } else { 128 };
    if *ty == Type::INET && inet.netmask() == full {
        Ok(inet.addr().to_string())
    } else {
        Ok(format!("{}/{}", inet.addr(), inet.netmask()))
    }
}

/// `10.0.0.1` or `10.0.0.0/24`.
pub fn parse_inet(text: &str) -> Option<(IpAddr, u8)> {
    let (addr, netmask) = match text.trim().split_once('/') {
        Some((addr, netmask)) => (addr, Some(netmask)),
        None => (text.trim(), None),
    };
    let addr: IpAddr = addr.parse().ok()?;
    let full = if addr.is_ipv4() { 32 } else { 128 };
    let netmask = match netmask {
        Some(n) => n.parse::<u8>().ok().filter(|n| *n <= full)?,
        None => full,
    };
    Some((addr, netmask))
}

pub fn encode_inet(addr: IpAddr, netmask: u8, out: &mut BytesMut) {
    protocol::inet_to_sql(addr, netmask, out);
}

pub fn macaddr_to_string(raw: &[u8]) -> WireResult<String> {
    let bytes = protocol::macaddr_from_sql(raw)?;
    Ok(bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":"))
}

/// Six hex octets, separated by `:`, `-`, `.` or nothing.
pub fn parse_macaddr(text: &str) -> Option<[u8; 6]> {
    let hex: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .collect();
    if hex.len() != 12 || !hex.is_ascii() {
        return None;
    }
    let mut out = [0u8; 6];
    for (idx, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[idx * 2..idx * 2 + 2], 16).ok()?;
    }
    Some(out)
}

pub fn encode_macaddr(bytes: [u8; 6], out: &mut BytesMut) {
    protocol::macaddr_to_sql(bytes, out);
}
