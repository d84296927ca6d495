// src/dates.rs

use crate::order::RawOrder;
use time::format_description::well_known::Iso8601;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Naive layouts tried in order after the ISO-8601 attempt.
const DATETIME_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]/[month]/[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
];

const DATE_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]/[month]/[day]"),
    format_description!("[year]-[month]-[day]"),
];

const DISPLAY: &[BorrowedFormatItem<'static>] =
    format_description!("[month]/[day]/[year repr:last_two]");

const API_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]/[month]/[day]");

/// A parsed timestamp, remembering whether it carried its own offset.
enum Parsed {
    Zoned(OffsetDateTime),
    Naive(PrimitiveDateTime),
}

/// Order date of `order` as `MM/DD/YY` in the reference zone.
///
/// Candidates are checked in priority order; the first non-empty one is
/// parsed. Returns an empty string when nothing usable is found.
pub fn order_date(order: &RawOrder, zone: UtcOffset) -> String {
    let candidates = [
        order.order_details.payment_date.as_deref(),
        order.order_details.order_date.as_deref(),
        order.payment_date.as_deref(),
        order.created.as_deref(),
        order.create_date.as_deref(),
    ];
    match candidates.into_iter().flatten().find(|v| !v.is_empty()) {
        Some(raw) => parse(raw, zone),
        None => String::new(),
    }
}

/// Normalize a date-like string to `MM/DD/YY` in `zone`.
///
/// Offset-carrying values are converted into `zone`; naive values are
/// taken to already be in `zone`. Never fails: unparsable input yields "".
pub fn parse(raw: &str, zone: UtcOffset) -> String {
    let val = raw.trim();
    if val.is_empty() {
        return String::new();
    }

    let parsed = parse_known(val).or_else(|| {
        let head: String = val.chars().take(19).collect();
        parse_iso(&head)
    });

    let dt = match parsed {
        Some(Parsed::Zoned(dt)) => dt.to_offset(zone),
        Some(Parsed::Naive(dt)) => dt.assume_offset(zone),
        None => match parse_display(val) {
            Some(date) => date.midnight().assume_offset(zone),
            None => return String::new(),
        },
    };
    dt.format(DISPLAY).unwrap_or_default()
}

fn parse_known(val: &str) -> Option<Parsed> {
    if val.contains('T') {
        return parse_iso(val);
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = PrimitiveDateTime::parse(val, *fmt) {
            return Some(Parsed::Naive(dt));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = Date::parse(val, *fmt) {
            return Some(Parsed::Naive(d.midnight()));
        }
    }
    None
}

fn parse_iso(val: &str) -> Option<Parsed> {
    if let Ok(dt) = OffsetDateTime::parse(val, &Iso8601::DEFAULT) {
        return Some(Parsed::Zoned(dt));
    }
    if let Ok(dt) = PrimitiveDateTime::parse(val, &Iso8601::DEFAULT) {
        return Some(Parsed::Naive(dt));
    }
    // ISO also allows a space between date and time
    if let Ok(dt) = PrimitiveDateTime::parse(val, DATETIME_FORMATS[1]) {
        return Some(Parsed::Naive(dt));
    }
    Date::parse(val, DATE_FORMATS[1]).ok().map(|d| Parsed::Naive(d.midnight()))
}

/// Our own `MM/DD/YY` output, read back with a 20xx century.
fn parse_display(val: &str) -> Option<Date> {
    let mut parts = val.split('/');
    let (m, d, y) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || y.len() != 2 {
        return None;
    }
    let month = time::Month::try_from(m.parse::<u8>().ok()?).ok()?;
    let day = d.parse::<u8>().ok()?;
    let year = 2000 + y.parse::<i32>().ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

/// Payment-date window for the order API: `days` ago through today, both as
/// `YYYY/MM/DD` in `zone`.
pub fn window(now: OffsetDateTime, days: i64, zone: UtcOffset) -> (String, String) {
    let today = now.to_offset(zone).date();
    let start = today.saturating_sub(Duration::days(days));
    (
        start.format(API_DATE).unwrap_or_default(),
        today.format(API_DATE).unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    const PHX: UtcOffset = offset!(-7);

    #[test]
    fn test_iso_with_z_converts_to_zone() {
        // 03:00 UTC is the previous evening in Phoenix
        assert_eq!(parse("2024-03-10T03:00:00Z", PHX), "03/09/24");
        assert_eq!(parse("2024-03-10T03:00:00+00:00", PHX), "03/09/24");
    }

    #[test]
    fn test_naive_values_stay_in_zone() {
        assert_eq!(parse("2024-03-10T03:00:00", PHX), "03/10/24");
        assert_eq!(parse("2024/03/10 23:59:59", PHX), "03/10/24");
        assert_eq!(parse("2024-03-10 00:00:01", PHX), "03/10/24");
        assert_eq!(parse("2024/03/10", PHX), "03/10/24");
        assert_eq!(parse("2024-03-10", PHX), "03/10/24");
    }

    #[test]
    fn test_fallback_to_first_19_chars() {
        assert_eq!(parse("2024-03-10 12:30:00.123456", PHX), "03/10/24");
    }

    #[test]
    fn test_garbage_is_empty() {
        assert_eq!(parse("", PHX), "");
        assert_eq!(parse("not a date", PHX), "");
        assert_eq!(parse("13/45/99", PHX), "");
    }

    #[test]
    fn test_display_output_reparses_to_itself() {
        for raw in ["2024-01-05T10:00:00Z", "2031/12/31", "2000-02-29"] {
            let once = parse(raw, PHX);
            assert!(!once.is_empty());
            assert_eq!(parse(&once, PHX), once);
        }
    }

    #[test]
    fn test_order_date_candidate_priority() {
        let mut order = RawOrder::default();
        assert_eq!(order_date(&order, PHX), "");

        order.create_date = Some("2024-01-03".into());
        order.payment_date = Some(String::new());
        assert_eq!(order_date(&order, PHX), "01/03/24");

        order.order_details.order_date = Some("2024/01/02".into());
        assert_eq!(order_date(&order, PHX), "01/02/24");
    }

    #[test]
    fn test_window_in_reference_zone() {
        // 05:00 UTC on the 4th is still the 3rd in Phoenix
        let now = datetime!(2024-03-04 05:00 UTC);
        assert_eq!(window(now, 3, PHX), ("2024/02/29".to_string(), "2024/03/03".to_string()));
    }
}
