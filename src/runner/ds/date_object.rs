use chrono::{Datelike, Duration, NaiveDate};

use crate::runner::ds::value::Value;

/// Beyond this many days no representable date can result.
const MAX_DAY_OFFSET: i64 = 1 << 32;

pub fn date_add_days(date: NaiveDate, days: i64) -> Value {
    if days.abs() > MAX_DAY_OFFSET {
        return Value::Undefined;
    }
    date.checked_add_signed(Duration::days(days))
        .map(Value::date)
        .unwrap_or(Value::Undefined)
}

pub fn date_diff_days(a: NaiveDate, b: NaiveDate) -> i64 {
    a.signed_duration_since(b).num_days()
}

/// The read-only `day`, `month` and `year` fields.
pub fn date_field(date: NaiveDate, name: &str) -> Option<Value> {
    match name {
        "day" => Some(Value::int(date.day() as i64)),
        "month" => Some(Value::int(date.month() as i64)),
        "year" => Some(Value::int(date.year() as i64)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_arithmetic() {
        let d = NaiveDate::from_ymd_opt(2020, 2, 28).unwrap();
        assert_eq!(date_add_days(d, 2).as_date(), NaiveDate::from_ymd_opt(2020, 3, 1));
        assert!(date_add_days(d, i64::MAX).is_undefined());
        let later = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        assert_eq!(date_diff_days(later, d), 2);
        assert_eq!(date_field(d, "month"), Some(Value::int(2)));
        assert_eq!(date_field(d, "weekday"), None);
    }
}
