use chrono::{NaiveDate, Weekday};

/// All weekdays in tracker order. The per-day marks of a record are indexed with this order.
pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// This is the standard way of converting a date to a matrix row key in daytally.
pub fn date_to_row_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Full day name, which the tracker uses as the key of the category field ("Monday").
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// 3-letter abbreviation, which the tracker uses as the key of the worked checkbox ("Mon").
pub fn weekday_abbrev(day: Weekday) -> &'static str {
    &weekday_name(day)[..3]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbrev_is_name_prefix() {
        for day in WEEK {
            assert!(weekday_name(day).starts_with(weekday_abbrev(day)));
            assert_eq!(weekday_abbrev(day).len(), 3);
        }
    }

    #[test]
    fn row_key_format() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        assert_eq!(date_to_row_key(date), "2024-01-08");
    }
}
