// Calendar-aware expiry arithmetic

use chrono::{DateTime, Days, Duration, Months, Utc};

/// Add a months/days/hours/minutes offset to a timestamp.
///
/// Months and days use calendar arithmetic so "1 month" from Jan 31 clamps to
/// the end of February rather than overflowing into March.
pub fn add_offset(
    from: DateTime<Utc>,
    months: u32,
    days: u32,
    hours: u32,
    minutes: u32,
) -> DateTime<Utc> {
    let base = from
        .checked_add_months(Months::new(months))
        .and_then(|t| t.checked_add_days(Days::new(days as u64)))
        .unwrap_or(from);
    base + Duration::hours(hours as i64) + Duration::minutes(minutes as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_add_offset_combines_units() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let till = add_offset(from, 0, 2, 3, 30);
        assert_eq!(till, Utc.with_ymd_and_hms(2024, 1, 3, 3, 30, 0).unwrap());
    }

    #[test]
    fn test_add_offset_clamps_month_end() {
        let from = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        let till = add_offset(from, 1, 0, 0, 0);
        // 2024 is a leap year
        assert_eq!(till, Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap());
    }
}
