//! Time boundary resolution.
//!
//! A boundary string resolves through an ordered chain of parsers, first
//! match wins:
//!
//! 1. epoch milliseconds: an explicit instant, never rounded;
//! 2. relative shorthand (`"1h"`, `"90m"`, `"1h30m"`), always meaning
//!    "that long ago";
//! 3. [`datemath`] expression (`"now-1d/d"`), honoring the rounding
//!    direction and optional location.
//!
//! `from` resolves with round-down semantics and `to` with round-up, so
//! a range like `now-1d/d .. now-1d/d` covers the whole calendar day.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

use crate::datemath;
use crate::error::TimeRangeError;

// ------------------------------------------------------------------ //
//  Fallback chain                                                     //
// ------------------------------------------------------------------ //

struct Boundary<'a> {
    raw: &'a str,
    now: DateTime<Utc>,
    round_up: bool,
    location: Option<FixedOffset>,
}

enum ParseOutcome {
    /// The parser matched and produced an instant.
    Resolved(DateTime<Utc>),
    /// The parser matched the input's shape but the content is invalid;
    /// later parsers are not consulted.
    Invalid(TimeRangeError),
    /// Not this parser's syntax; try the next one.
    NoMatch,
}

type BoundaryParser = fn(&Boundary) -> ParseOutcome;

const PARSERS: &[BoundaryParser] = &[parse_epoch_ms, parse_shorthand, parse_date_math];

/// Resolve one boundary string against a fixed `now`.
pub(crate) fn resolve(
    raw: &str,
    now: DateTime<Utc>,
    round_up: bool,
    location: Option<FixedOffset>,
) -> Result<DateTime<Utc>, TimeRangeError> {
    let boundary = Boundary {
        raw,
        now,
        round_up,
        location,
    };
    for parser in PARSERS {
        match parser(&boundary) {
            ParseOutcome::Resolved(t) => return Ok(t),
            ParseOutcome::Invalid(e) => return Err(e),
            ParseOutcome::NoMatch => {}
        }
    }
    Err(TimeRangeError::Unparseable(raw.to_string()))
}

fn parse_epoch_ms(b: &Boundary) -> ParseOutcome {
    let Ok(ms) = b.raw.parse::<i64>() else {
        return ParseOutcome::NoMatch;
    };
    match Utc.timestamp_millis_opt(ms).single() {
        Some(t) => ParseOutcome::Resolved(t),
        None => ParseOutcome::Invalid(TimeRangeError::Invalid {
            raw: b.raw.to_string(),
            reason: "epoch milliseconds out of range".into(),
        }),
    }
}

fn parse_shorthand(b: &Boundary) -> ParseOutcome {
    // A bare duration always means "that long ago", so negate before
    // parsing; callers never write the sign themselves.
    let negated = format!("-{}", b.raw);
    match parse_signed_duration(&negated) {
        Some(delta) => match b.now.checked_add_signed(delta) {
            Some(t) => ParseOutcome::Resolved(t),
            None => ParseOutcome::Invalid(TimeRangeError::Invalid {
                raw: b.raw.to_string(),
                reason: "relative duration out of range".into(),
            }),
        },
        None => ParseOutcome::NoMatch,
    }
}

fn parse_date_math(b: &Boundary) -> ParseOutcome {
    match datemath::parse(b.raw, b.now, b.round_up, b.location) {
        Ok(t) => ParseOutcome::Resolved(t),
        Err(TimeRangeError::Unparseable(_)) => ParseOutcome::NoMatch,
        Err(e) => ParseOutcome::Invalid(e),
    }
}

/// Parse a signed shorthand duration: an optional sign followed by one
/// or more `<integer><unit>` segments, units `ms s m h d w`.
fn parse_signed_duration(s: &str) -> Option<Duration> {
    let (negative, rest) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    let bytes = rest.as_bytes();
    if bytes.is_empty() {
        return None;
    }

    let mut total = Duration::zero();
    let mut i = 0;
    while i < bytes.len() {
        let digits_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if digits_start == i {
            return None;
        }
        let n: i64 = rest[digits_start..i].parse().ok()?;

        let unit_ms: i64 = if rest[i..].starts_with("ms") {
            i += 2;
            1
        } else {
            let unit = *bytes.get(i)?;
            i += 1;
            match unit {
                b's' => 1_000,
                b'm' => 60_000,
                b'h' => 3_600_000,
                b'd' => 86_400_000,
                b'w' => 604_800_000,
                _ => return None,
            }
        };
        total = total.checked_add(&Duration::milliseconds(n.checked_mul(unit_ms)?))?;
    }

    Some(if negative { -total } else { total })
}

// ------------------------------------------------------------------ //
//  TimeRange                                                          //
// ------------------------------------------------------------------ //

/// The raw boundary strings of a batch plus the reference instant they
/// resolve against.
///
/// `now` is captured once at construction so every resolution within the
/// same request is consistent. The strings never change afterwards, so
/// each boundary's resolution is cached per instance.
#[derive(Debug, Clone)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
    pub now: DateTime<Utc>,
    location: Option<FixedOffset>,
    from_cache: OnceLock<Result<DateTime<Utc>, TimeRangeError>>,
    to_cache: OnceLock<Result<DateTime<Utc>, TimeRangeError>>,
}

impl TimeRange {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::with_now(from, to, Utc::now())
    }

    /// Construct against an explicit reference instant.
    pub fn with_now(from: impl Into<String>, to: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            now,
            location: None,
            from_cache: OnceLock::new(),
            to_cache: OnceLock::new(),
        }
    }

    /// Set the timezone for calendar-relative boundaries. Must be called
    /// before the first resolution.
    pub fn with_location(mut self, location: FixedOffset) -> Self {
        self.location = Some(location);
        self
    }

    /// Resolve the lower boundary (round-down semantics).
    pub fn resolve_from(&self) -> Result<DateTime<Utc>, TimeRangeError> {
        self.from_cache
            .get_or_init(|| resolve(&self.from, self.now, false, self.location))
            .clone()
    }

    /// Resolve the upper boundary (round-up semantics).
    pub fn resolve_to(&self) -> Result<DateTime<Utc>, TimeRangeError> {
        self.to_cache
            .get_or_init(|| resolve(&self.to, self.now, true, self.location))
            .clone()
    }

    pub fn from_epoch_ms(&self) -> Result<i64, TimeRangeError> {
        Ok(self.resolve_from()?.timestamp_millis())
    }

    pub fn to_epoch_ms(&self) -> Result<i64, TimeRangeError> {
        Ok(self.resolve_to()?.timestamp_millis())
    }

    pub fn from_epoch_seconds(&self) -> Result<i64, TimeRangeError> {
        Ok(self.resolve_from()?.timestamp())
    }

    pub fn to_epoch_seconds(&self) -> Result<i64, TimeRangeError> {
        Ok(self.resolve_to()?.timestamp())
    }

    /// Lower boundary, substituting the Unix epoch when unresolvable.
    ///
    /// Display paths only. Dispatch uses [`TimeRange::resolve_from`] and
    /// propagates the error; a bad range must fail the query, not
    /// silently become 1970-01-01.
    pub fn from_or_epoch(&self) -> DateTime<Utc> {
        self.resolve_from().unwrap_or_else(|_| unix_epoch())
    }

    /// Upper boundary, substituting the Unix epoch when unresolvable.
    /// Display paths only; see [`TimeRange::from_or_epoch`].
    pub fn to_or_epoch(&self) -> DateTime<Utc> {
        self.resolve_to().unwrap_or_else(|_| unix_epoch())
    }
}

fn unix_epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}
