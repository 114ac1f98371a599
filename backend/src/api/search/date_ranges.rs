//! Fixed "last modified" buckets for the date facet.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};

use crate::services::Translator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBucket {
    Day,
    Week,
    Month,
    Year,
}

impl DateBucket {
    fn label_key(&self) -> (&'static str, &'static str) {
        match self {
            DateBucket::Day => ("Search.Facets.Label.Date.Day", "Past 24H"),
            DateBucket::Week => ("Search.Facets.Label.Date.Week", "Past week"),
            DateBucket::Month => ("Search.Facets.Label.Date.Month", "Past month"),
            DateBucket::Year => ("Search.Facets.Label.Date.Year", "Past year"),
        }
    }
}

/// Lower bounds of the date buckets, as epoch milliseconds rendered to
/// strings. Each bound starts at midnight UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct DateRanges {
    buckets: Vec<(DateBucket, String)>,
}

impl DateRanges {
    pub fn from_now(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let bounds = [
            (DateBucket::Day, today.checked_sub_days(Days::new(1))),
            (DateBucket::Week, today.checked_sub_days(Days::new(7))),
            (DateBucket::Month, months_back(today, 1)),
            (DateBucket::Year, months_back(today, 12)),
        ];
        let buckets = bounds
            .into_iter()
            .filter_map(|(bucket, day)| Some((bucket, midnight_millis(day?)?)))
            .collect();
        Self { buckets }
    }

    pub fn lower_bounds(&self) -> Vec<String> {
        self.buckets.iter().map(|(_, from)| from.clone()).collect()
    }

    pub fn bucket_for(&self, from: &str) -> Option<DateBucket> {
        self.buckets.iter().find(|(_, f)| f == from).map(|(b, _)| *b)
    }

    pub fn label_for(&self, from: &str, translator: &dyn Translator) -> Option<String> {
        let (key, default) = self.bucket_for(from)?.label_key();
        Some(translator.translate_in_working_language(key, default))
    }
}

/// Same day of the month `months` earlier. A day past the end of the target
/// month rolls over into the next one, so Mar 31 gives Mar 2 (or Mar 3).
fn months_back(day: NaiveDate, months: u32) -> Option<NaiveDate> {
    let total = day.year() * 12 + day.month0() as i32 - months as i32;
    let first = NaiveDate::from_ymd_opt(total.div_euclid(12), total.rem_euclid(12) as u32 + 1, 1)?;
    first.checked_add_days(Days::new(u64::from(day.day0())))
}

fn midnight_millis(day: NaiveDate) -> Option<String> {
    Some(day.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis().to_string())
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct Echo;

    impl Translator for Echo {
        fn translate(&self, _key: &str, default: &str) -> String {
            default.to_string()
        }
        fn translate_in_working_language(&self, _key: &str, default: &str) -> String {
            default.to_string()
        }
    }

    #[test]
    fn bounds_start_at_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 13, 45, 0).unwrap();
        let ranges = DateRanges::from_now(now);
        let expected: Vec<String> = [
            Utc.with_ymd_and_hms(2024, 3, 14, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 15, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2023, 3, 15, 0, 0, 0).unwrap(),
        ]
        .iter()
        .map(|d| d.timestamp_millis().to_string())
        .collect();
        assert_eq!(ranges.lower_bounds(), expected);
    }

    #[test]
    fn month_and_year_bounds_roll_over_short_months() {
        assert_eq!(months_back(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(), 12), NaiveDate::from_ymd_opt(2023, 3, 1));
        assert_eq!(months_back(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(), 1), NaiveDate::from_ymd_opt(2024, 3, 2));
        assert_eq!(months_back(NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(), 1), NaiveDate::from_ymd_opt(2023, 3, 3));
        assert_eq!(months_back(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), 1), NaiveDate::from_ymd_opt(2023, 12, 15));

        let leap_day = Utc.with_ymd_and_hms(2024, 2, 29, 8, 0, 0).unwrap();
        let year = DateRanges::from_now(leap_day).lower_bounds()[3].clone();
        assert_eq!(year, Utc.with_ymd_and_hms(2023, 3, 1, 0, 0, 0).unwrap().timestamp_millis().to_string());
    }

    #[test]
    fn labels_resolve_by_bound() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 13, 45, 0).unwrap();
        let ranges = DateRanges::from_now(now);
        let week = ranges.lower_bounds()[1].clone();
        assert_eq!(ranges.label_for(&week, &Echo), Some("Past week".to_string()));
        assert_eq!(ranges.label_for("12", &Echo), None);
    }
}
