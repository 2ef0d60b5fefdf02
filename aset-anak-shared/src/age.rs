use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Age {
    pub years: u32,
    pub months: u32,
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tahun {} bulan", self.years, self.months)
    }
}

/// Whole-month age of someone born on `birthdate`, as of `as_of`.
///
/// A month only counts once its day-of-month has been reached, and a negative
/// month difference borrows a year, so `months` is always in `0..=11`.
/// Returns `None` when `as_of` is before the birthdate.
pub fn age_from_birthdate(birthdate: NaiveDate, as_of: NaiveDate) -> Option<Age> {
    if as_of < birthdate {
        return None;
    }
    let mut years = as_of.year() - birthdate.year();
    let mut months = as_of.month() as i32 - birthdate.month() as i32;
    if as_of.day() < birthdate.day() {
        months -= 1;
    }
    if months < 0 {
        years -= 1;
        months += 12;
    }
    Some(Age {
        years: years as u32,
        months: months as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn borrows_a_year_when_birthday_not_reached() {
        let age = age_from_birthdate(date(2020, 6, 15), date(2024, 3, 1)).unwrap();
        assert_eq!(age, Age { years: 3, months: 8 });
    }

    #[test]
    fn exact_birthday_counts_full_year() {
        let age = age_from_birthdate(date(2020, 6, 15), date(2024, 6, 15)).unwrap();
        assert_eq!(age, Age { years: 4, months: 0 });
    }

    #[test]
    fn day_before_birthday_is_eleven_months() {
        let age = age_from_birthdate(date(2020, 6, 15), date(2024, 6, 14)).unwrap();
        assert_eq!(age, Age { years: 3, months: 11 });
    }

    #[test]
    fn newborn_is_zero() {
        let age = age_from_birthdate(date(2024, 1, 31), date(2024, 2, 29)).unwrap();
        assert_eq!(age, Age { years: 0, months: 0 });
    }

    #[test]
    fn months_stay_in_range_over_a_span() {
        let birth = date(2019, 8, 31);
        let mut day = birth;
        while day < date(2023, 8, 31) {
            let age = age_from_birthdate(birth, day).unwrap();
            assert!(age.months <= 11, "{day}: {age:?}");
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn future_birthdate_has_no_age() {
        assert!(age_from_birthdate(date(2025, 1, 1), date(2024, 12, 31)).is_none());
    }

    #[test]
    fn displays_in_malay() {
        assert_eq!(Age { years: 3, months: 8 }.to_string(), "3 tahun 8 bulan");
    }
}
