use chrono::{Datelike, Duration, NaiveDate, Weekday};

// Days to step back from each weekday (Mon..Sun) to reach the previous weekday.
const PREV_WEEKDAY_OFFSETS: [i64; 7] = [3, 1, 1, 1, 1, 1, 2];

pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Closest earlier weekday. Monday and both weekend days map back to Friday.
pub fn prev_weekday(date: NaiveDate) -> NaiveDate {
    let offset = PREV_WEEKDAY_OFFSETS[date.weekday().num_days_from_monday() as usize];
    date - Duration::days(offset)
}

/// Snaps a weekend date to the adjacent weekday: Saturday -> Friday, Sunday -> Monday.
pub fn closest_weekday(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

/// Last calendar day of `date`'s month, rolled back to Friday if it is a weekend day.
pub fn last_weekday_of_month(date: NaiveDate) -> NaiveDate {
    // Any day 32 days after the 1st lies in the following month.
    let in_next_month = first_of_month(date) + Duration::days(32);
    let last_day = prev_month(in_next_month);

    if is_weekday(last_day) {
        last_day
    } else {
        prev_weekday(last_day)
    }
}

/// Last calendar day of the month preceding `date`'s month.
pub fn prev_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date) - Duration::days(1)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn weekend_days_are_not_weekdays() {
        // 2017-01-14 is Saturday.
        assert!(!is_weekday(d(2017, 1, 14)));
        assert!(!is_weekday(d(2017, 1, 15)));
        assert!(is_weekday(d(2017, 1, 16)));
        assert!(is_weekday(d(2017, 1, 13)));
    }

    #[test]
    fn prev_weekday_skips_weekend() {
        // Monday -> Friday.
        assert_eq!(prev_weekday(d(2017, 1, 16)), d(2017, 1, 13));
        assert_eq!(prev_weekday(d(2017, 1, 13)), d(2017, 1, 12));
        assert_eq!(prev_weekday(d(2017, 1, 10)), d(2017, 1, 9));
        // Saturday and Sunday -> Friday.
        assert_eq!(prev_weekday(d(2017, 1, 14)), d(2017, 1, 13));
        assert_eq!(prev_weekday(d(2017, 1, 15)), d(2017, 1, 13));
    }

    #[test]
    fn closest_weekday_snaps_weekends() {
        assert_eq!(closest_weekday(d(2017, 1, 16)), d(2017, 1, 16));
        assert_eq!(closest_weekday(d(2017, 1, 15)), d(2017, 1, 16));
        assert_eq!(closest_weekday(d(2017, 1, 14)), d(2017, 1, 13));
    }

    #[test]
    fn prev_month_crosses_year_boundary() {
        assert_eq!(prev_month(d(2017, 1, 1)), d(2016, 12, 31));
        assert_eq!(prev_month(d(2017, 3, 10)), d(2017, 2, 28));
        assert_eq!(prev_month(d(2016, 3, 31)), d(2016, 2, 29));
    }

    #[test]
    fn last_weekday_of_month_rolls_back_from_weekend() {
        // 2017-04-30 is Sunday.
        assert_eq!(last_weekday_of_month(d(2017, 4, 12)), d(2017, 4, 28));
        // 2017-09-30 is Saturday.
        assert_eq!(last_weekday_of_month(d(2017, 9, 1)), d(2017, 9, 29));
        // 2017-01-31 is Tuesday.
        assert_eq!(last_weekday_of_month(d(2017, 1, 31)), d(2017, 1, 31));
        assert_eq!(last_weekday_of_month(d(2016, 12, 5)), d(2016, 12, 30));
    }
}
