//! # Temporal Types — `DD MM YYYY` Calendar Dates
//!
//! R9 documents carry manufacturing, commissioning, reuse, delivery and
//! deposit dates as day-first text. `CalendarDate` accepts the whole
//! `DD MM YYYY` family (space, hyphen or slash separators) and re-emits the
//! three components space-joined, exactly as the input spelled them: no
//! zero-padding is added or removed, so `"1-2-2020"` canonicalizes to
//! `"1 2 2020"`.
//!
//! A date is accepted only if it names a real calendar day in years
//! 1 through 9999.

use chrono::{Datelike, NaiveDate};

use crate::error::DateError;

/// A validated day-first calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CalendarDate {
    day: String,
    month: String,
    year: String,
    date: NaiveDate,
}

impl CalendarDate {
    /// Parse a `DD MM YYYY`-family date.
    ///
    /// # Errors
    ///
    /// - `DateError::Layout` unless there are exactly three components.
    /// - `DateError::NonNumeric` if a component is not all ASCII digits.
    /// - `DateError::Nonexistent` if the day does not exist (e.g. `31 02 2020`)
    ///   or the year is outside 1..=9999.
    pub fn parse(s: &str) -> Result<Self, DateError> {
        let normalized: String = s
            .chars()
            .map(|c| if c == '-' || c == '/' { ' ' } else { c })
            .collect();
        let parts: Vec<&str> = normalized.split_whitespace().collect();
        let [day, month, year] = parts.as_slice() else {
            return Err(DateError::Layout {
                literal: s.to_string(),
            });
        };

        let d = parse_component(day, s)?;
        let m = parse_component(month, s)?;
        let y = parse_component(year, s)?;

        let nonexistent = || DateError::Nonexistent {
            literal: s.to_string(),
        };
        if !(1..=9999).contains(&y) {
            return Err(nonexistent());
        }
        let year_i32 = i32::try_from(y).map_err(|_| nonexistent())?;
        let month_u32 = u32::try_from(m).map_err(|_| nonexistent())?;
        let day_u32 = u32::try_from(d).map_err(|_| nonexistent())?;
        let date = NaiveDate::from_ymd_opt(year_i32, month_u32, day_u32).ok_or_else(nonexistent)?;

        Ok(Self {
            day: (*day).to_string(),
            month: (*month).to_string(),
            year: (*year).to_string(),
            date,
        })
    }

    /// Format a chrono date as zero-padded `DD MM YYYY`.
    pub fn from_naive(date: NaiveDate) -> Self {
        Self {
            day: format!("{:02}", date.day()),
            month: format!("{:02}", date.month()),
            year: format!("{:04}", date.year()),
            date,
        }
    }

    /// Today's date in the local timezone.
    pub fn today() -> Self {
        Self::from_naive(chrono::Local::now().date_naive())
    }

    /// The validated calendar day.
    pub fn as_naive(&self) -> NaiveDate {
        self.date
    }

    /// Canonical text: the three input components joined by single spaces.
    pub fn canonical(&self) -> String {
        format!("{} {} {}", self.day, self.month, self.year)
    }
}

impl std::fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn parse_component(component: &str, literal: &str) -> Result<u64, DateError> {
    let non_numeric = || DateError::NonNumeric {
        component: component.to_string(),
        literal: literal.to_string(),
    };
    if !component.bytes().all(|b| b.is_ascii_digit()) {
        return Err(non_numeric());
    }
    component.parse::<u64>().map_err(|_| non_numeric())
}
