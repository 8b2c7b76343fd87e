//! Text for date and time headings.

use chrono::{Datelike, NaiveDate, Timelike, Weekday};

/// English month names, January first
pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Ordinal form of a day of month, e.g. 1 -> "1st", 12 -> "12th"
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

/// 12-hour clock time with lowercase suffix, e.g. "1:05pm"
pub fn clock_time<T: Timelike>(time: &T) -> String {
    let (is_pm, hour) = time.hour12();
    let suffix = if is_pm { "pm" } else { "am" };
    format!("{}:{:02}{}", hour, time.minute(), suffix)
}

/// Month name for a 1-based month number
pub fn month_name(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month).ok()?.checked_sub(1)?;
    MONTHS.get(index).copied()
}

/// 1-based month number for an exact month name
pub fn month_number(name: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| *m == name)
        .map(|i| i as u32 + 1)
}

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

/// Day heading text, e.g. "Monday 3rd"
pub fn day_heading(date: NaiveDate) -> String {
    format!("{} {}", weekday_name(date.weekday()), ordinal(date.day()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_ordinal() {
        let cases = [
            (1, "1st"),
            (2, "2nd"),
            (3, "3rd"),
            (4, "4th"),
            (11, "11th"),
            (12, "12th"),
            (13, "13th"),
            (21, "21st"),
            (22, "22nd"),
            (23, "23rd"),
            (30, "30th"),
            (31, "31st"),
            (111, "111th"),
        ];
        for (n, expected) in cases {
            assert_eq!(ordinal(n), expected, "ordinal({})", n);
        }
    }

    #[test]
    fn test_clock_time() {
        assert_eq!(clock_time(&at(0, 0)), "12:00am");
        assert_eq!(clock_time(&at(0, 7)), "12:07am");
        assert_eq!(clock_time(&at(9, 30)), "9:30am");
        assert_eq!(clock_time(&at(12, 0)), "12:00pm");
        assert_eq!(clock_time(&at(13, 5)), "1:05pm");
        assert_eq!(clock_time(&at(23, 59)), "11:59pm");
    }

    #[test]
    fn test_month_lookup() {
        assert_eq!(month_name(1), Some("January"));
        assert_eq!(month_name(12), Some("December"));
        assert_eq!(month_name(0), None);
        assert_eq!(month_name(13), None);
        assert_eq!(month_number("March"), Some(3));
        assert_eq!(month_number("march"), None);
    }

    #[test]
    fn test_day_heading() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        assert_eq!(day_heading(date), "Monday 3rd");
        let date = NaiveDate::from_ymd_opt(2024, 12, 22).unwrap();
        assert_eq!(day_heading(date), "Sunday 22nd");
    }
}
