//! `now`-anchored date-math expressions.
//!
//! Grammar: the literal anchor `now` followed by any number of
//! operations, applied left to right:
//!
//! * `+N<unit>` / `-N<unit>`: calendar arithmetic; `N` defaults to 1
//!   when omitted (`now-d` == `now-1d`).
//! * `/<unit>`: round to the unit boundary. Rounding down yields the
//!   first instant of the unit; rounding up yields the last nanosecond
//!   before the next unit begins.
//!
//! Units: `s` seconds, `m` minutes, `h` hours, `d` days, `w` weeks
//! (Monday-aligned), `M` months, `y` years. Calendar-dependent units are
//! computed in the supplied fixed offset, UTC when absent.

use chrono::{
    DateTime, Datelike, Days, Duration, FixedOffset, Months, NaiveDate, Timelike, Utc,
};

use crate::error::TimeRangeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Unit {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            b's' => Some(Unit::Second),
            b'm' => Some(Unit::Minute),
            b'h' => Some(Unit::Hour),
            b'd' => Some(Unit::Day),
            b'w' => Some(Unit::Week),
            b'M' => Some(Unit::Month),
            b'y' => Some(Unit::Year),
            _ => None,
        }
    }
}

/// Evaluate `expr` relative to `now`.
///
/// Anything not starting with `now` is rejected as
/// [`TimeRangeError::Unparseable`]; a malformed operation after a valid
/// anchor is [`TimeRangeError::Invalid`].
pub fn parse(
    expr: &str,
    now: DateTime<Utc>,
    round_up: bool,
    location: Option<FixedOffset>,
) -> Result<DateTime<Utc>, TimeRangeError> {
    let rest = expr
        .strip_prefix("now")
        .ok_or_else(|| TimeRangeError::Unparseable(expr.to_string()))?;

    let offset = location.unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset"));
    let mut t = now.with_timezone(&offset);

    let invalid = |reason: String| TimeRangeError::Invalid {
        raw: expr.to_string(),
        reason,
    };

    let bytes = rest.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'/' => {
                let unit = bytes
                    .get(i + 1)
                    .copied()
                    .and_then(Unit::from_byte)
                    .ok_or_else(|| invalid("'/' must be followed by a unit".into()))?;
                t = round(t, unit, round_up).ok_or_else(|| invalid("rounding overflow".into()))?;
                i += 2;
            }
            sign @ (b'+' | b'-') => {
                i += 1;
                let digits_start = i;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                let n: i64 = if digits_start == i {
                    1
                } else {
                    rest[digits_start..i]
                        .parse()
                        .map_err(|_| invalid("operand out of range".into()))?
                };
                let unit = bytes
                    .get(i)
                    .copied()
                    .and_then(Unit::from_byte)
                    .ok_or_else(|| invalid(format!("missing or unknown unit after '{n}'")))?;
                i += 1;
                let n = if sign == b'-' { -n } else { n };
                t = advance(t, unit, n).ok_or_else(|| invalid("arithmetic overflow".into()))?;
            }
            _ => {
                let c = rest[i..].chars().next().unwrap_or('?');
                return Err(invalid(format!("unexpected character '{c}'")));
            }
        }
    }

    Ok(t.with_timezone(&Utc))
}

fn advance(t: DateTime<FixedOffset>, unit: Unit, n: i64) -> Option<DateTime<FixedOffset>> {
    let by_days = |t: DateTime<FixedOffset>, days: i64| {
        if days >= 0 {
            t.checked_add_days(Days::new(days as u64))
        } else {
            t.checked_sub_days(Days::new(days.unsigned_abs()))
        }
    };
    let by_months = |t: DateTime<FixedOffset>, months: i64| {
        let m = u32::try_from(months.unsigned_abs()).ok()?;
        if months >= 0 {
            t.checked_add_months(Months::new(m))
        } else {
            t.checked_sub_months(Months::new(m))
        }
    };

    match unit {
        Unit::Second => t.checked_add_signed(Duration::seconds(n)),
        Unit::Minute => t.checked_add_signed(Duration::minutes(n)),
        Unit::Hour => t.checked_add_signed(Duration::hours(n)),
        Unit::Day => by_days(t, n),
        Unit::Week => by_days(t, n.checked_mul(7)?),
        Unit::Month => by_months(t, n),
        Unit::Year => by_months(t, n.checked_mul(12)?),
    }
}

fn round(t: DateTime<FixedOffset>, unit: Unit, round_up: bool) -> Option<DateTime<FixedOffset>> {
    let start = floor(t, unit)?;
    if round_up {
        // Last representable instant of the unit containing `t`.
        advance(start, unit, 1)?.checked_sub_signed(Duration::nanoseconds(1))
    } else {
        Some(start)
    }
}

fn floor(t: DateTime<FixedOffset>, unit: Unit) -> Option<DateTime<FixedOffset>> {
    let midnight = |d: NaiveDate| {
        d.and_hms_opt(0, 0, 0)
            .and_then(|dt| dt.and_local_timezone(*t.offset()).single())
    };

    match unit {
        Unit::Second => t.with_nanosecond(0),
        Unit::Minute => t.with_nanosecond(0)?.with_second(0),
        Unit::Hour => t.with_nanosecond(0)?.with_second(0)?.with_minute(0),
        Unit::Day => midnight(t.date_naive()),
        Unit::Week => {
            let days_from_monday = t.weekday().num_days_from_monday();
            let monday = t
                .date_naive()
                .checked_sub_days(Days::new(u64::from(days_from_monday)))?;
            midnight(monday)
        }
        Unit::Month => midnight(t.date_naive().with_day(1)?),
        Unit::Year => midnight(NaiveDate::from_ymd_opt(t.year(), 1, 1)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn bare_now() {
        let now = at("2021-06-15T12:34:56.789Z");
        assert_eq!(parse("now", now, false, None).unwrap(), now);
        assert_eq!(parse("now", now, true, None).unwrap(), now);
    }

    #[test]
    fn hour_arithmetic() {
        let now = at("2021-06-15T12:00:00Z");
        assert_eq!(
            parse("now-5h", now, false, None).unwrap(),
            at("2021-06-15T07:00:00Z")
        );
        assert_eq!(
            parse("now+1h", now, false, None).unwrap(),
            at("2021-06-15T13:00:00Z")
        );
    }

    #[test]
    fn omitted_count_defaults_to_one() {
        let now = at("2021-06-15T12:00:00Z");
        assert_eq!(
            parse("now-d", now, false, None).unwrap(),
            parse("now-1d", now, false, None).unwrap()
        );
    }

    #[test]
    fn day_floor_and_ceiling() {
        let now = at("2021-06-15T12:00:00Z");
        let start = parse("now-1d/d", now, false, None).unwrap();
        let end = parse("now-1d/d", now, true, None).unwrap();
        assert_eq!(start, at("2021-06-14T00:00:00Z"));
        assert_eq!(
            end,
            at("2021-06-15T00:00:00Z") - Duration::nanoseconds(1)
        );
    }

    #[test]
    fn week_rounds_to_monday() {
        // 2021-06-15 is a Tuesday.
        let now = at("2021-06-15T12:00:00Z");
        assert_eq!(
            parse("now/w", now, false, None).unwrap(),
            at("2021-06-14T00:00:00Z")
        );
    }

    #[test]
    fn month_arithmetic_clamps_day() {
        let now = at("2021-03-31T12:00:00Z");
        assert_eq!(
            parse("now-1M", now, false, None).unwrap(),
            at("2021-02-28T12:00:00Z")
        );
    }

    #[test]
    fn month_and_year_floors() {
        let now = at("2021-06-15T12:00:00Z");
        assert_eq!(
            parse("now/M", now, false, None).unwrap(),
            at("2021-06-01T00:00:00Z")
        );
        assert_eq!(
            parse("now/y", now, false, None).unwrap(),
            at("2021-01-01T00:00:00Z")
        );
    }

    #[test]
    fn chained_operations_apply_left_to_right() {
        let now = at("2021-06-15T12:00:00Z");
        assert_eq!(
            parse("now-1d/d+6h", now, false, None).unwrap(),
            at("2021-06-14T06:00:00Z")
        );
    }

    #[test]
    fn day_floor_honors_location() {
        // 01:30 UTC is already "tomorrow" at +05:00.
        let now = at("2021-06-15T01:30:00Z");
        let offset = FixedOffset::east_opt(5 * 3600).unwrap();
        let local_midnight = offset
            .with_ymd_and_hms(2021, 6, 15, 0, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            parse("now/d", now, false, Some(offset)).unwrap(),
            local_midnight
        );
        assert_eq!(
            parse("now/d", now, false, None).unwrap(),
            at("2021-06-15T00:00:00Z")
        );
    }

    #[test]
    fn non_now_anchor_is_unparseable() {
        let now = at("2021-06-15T12:00:00Z");
        assert!(matches!(
            parse("2021-06-01||/d", now, false, None),
            Err(TimeRangeError::Unparseable(_))
        ));
    }

    #[test]
    fn malformed_operations_are_invalid() {
        let now = at("2021-06-15T12:00:00Z");
        assert!(matches!(
            parse("now-1x", now, false, None),
            Err(TimeRangeError::Invalid { .. })
        ));
        assert!(matches!(
            parse("now/", now, false, None),
            Err(TimeRangeError::Invalid { .. })
        ));
        assert!(matches!(
            parse("now*2d", now, false, None),
            Err(TimeRangeError::Invalid { .. })
        ));
    }
}
