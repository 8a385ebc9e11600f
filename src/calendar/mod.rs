//! Calendar matching against a static table of Chinese public holidays
//! and shopping festivals (exact per-year ranges for 2018-2030).
//!
//! The table is data, not code: it lives in `data/holidays.json` and is
//! extended by editing the resource, never by touching the matcher.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Where a date falls relative to a holiday window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolidayPhase {
    /// Within the pre-holiday window.
    Pre,
    /// First day of the holiday range.
    Start,
    /// Inside the holiday range.
    During,
    /// Last day of the holiday range.
    End,
    /// Within the post-holiday window.
    Post,
}

/// A matched holiday with direction-specific explanation candidates.
#[derive(Debug, Clone)]
pub struct HolidayMatch {
    /// Display label, phase included (e.g. "Double 11 (pre-holiday)").
    pub label: String,
    pub phase: HolidayPhase,
    pub up_phrases: &'static [String],
    pub down_phrases: &'static [String],
}

#[derive(Debug, Deserialize)]
struct HolidayTable {
    holidays: Vec<HolidaySpec>,
}

#[derive(Debug, Deserialize)]
struct HolidaySpec {
    name: String,
    #[serde(default)]
    per_year: BTreeMap<i32, Vec<String>>,
    #[serde(default)]
    fixed_range: Vec<String>,
    #[serde(default)]
    extended_range: Vec<String>,
    #[serde(default = "default_offset")]
    pre_days: u32,
    #[serde(default = "default_offset")]
    post_days: u32,
    up_phrases: Vec<String>,
    down_phrases: Vec<String>,
}

fn default_offset() -> u32 {
    3
}

static TABLE: LazyLock<HolidayTable> = LazyLock::new(|| {
    serde_json::from_str(include_str!("../../data/holidays.json"))
        .expect("embedded holiday table is valid JSON")
});

fn month_day(date: NaiveDate) -> String {
    format!("{:02}-{:02}", date.month(), date.day())
}

/// Parse an "MM-DD" key into a date of the given year.
fn resolve(year: i32, month_day: &str) -> Option<NaiveDate> {
    let (m, d) = month_day.split_once('-')?;
    NaiveDate::from_ymd_opt(year, m.parse().ok()?, d.parse().ok()?)
}

impl HolidaySpec {
    fn matched(&'static self, label: String, phase: HolidayPhase) -> HolidayMatch {
        HolidayMatch {
            label,
            phase,
            up_phrases: &self.up_phrases,
            down_phrases: &self.down_phrases,
        }
    }

    /// Match a date directly inside one of this holiday's ranges.
    fn match_in_range(&'static self, date: NaiveDate) -> Option<HolidayMatch> {
        let md = month_day(date);

        if self.fixed_range.iter().any(|d| *d == md) {
            return Some(self.matched(self.name.clone(), HolidayPhase::During));
        }

        if self.extended_range.iter().any(|d| *d == md) {
            // Pre or post depends on the nearest occurrence of the fixed
            // date, so a Dec 30 entry still reads as run-up to Jan 1.
            let before = self.nearest_fixed_day(date).map(|d| date < d).unwrap_or(true);
            return if before {
                Some(self.matched(format!("{} (pre-holiday)", self.name), HolidayPhase::Pre))
            } else {
                Some(self.matched(format!("{} (post-holiday)", self.name), HolidayPhase::Post))
            };
        }

        if let Some(range) = self.per_year.get(&date.year()) {
            if range.iter().any(|d| *d == md) {
                let phase = if md == range[0] {
                    HolidayPhase::Start
                } else if Some(&md) == range.last() {
                    HolidayPhase::End
                } else {
                    HolidayPhase::During
                };
                let label = match phase {
                    HolidayPhase::Start => format!("{} (first day)", self.name),
                    HolidayPhase::End => format!("{} (last day)", self.name),
                    _ => self.name.clone(),
                };
                return Some(self.matched(label, phase));
            }
        }
        None
    }

    /// The occurrence of this holiday's first fixed day closest to `date`.
    fn nearest_fixed_day(&self, date: NaiveDate) -> Option<NaiveDate> {
        let first = self.fixed_range.first()?;
        [-1, 0, 1]
            .iter()
            .filter_map(|dy| resolve(date.year() + dy, first))
            .min_by_key(|d| (*d - date).num_days().abs())
    }

    /// Match a date in the pre/post offset windows around the ranges.
    fn match_near_range(&'static self, date: NaiveDate) -> Option<HolidayMatch> {
        if let (Some(first), Some(last)) = (self.fixed_range.first(), self.fixed_range.last()) {
            // Fixed-date holidays look two days out on either side.
            for offset in 1..=2i64 {
                if month_day(date + Duration::days(offset)) == *first {
                    return Some(
                        self.matched(format!("{} (pre-holiday)", self.name), HolidayPhase::Pre),
                    );
                }
                if month_day(date - Duration::days(offset)) == *last {
                    return Some(
                        self.matched(format!("{} (post-holiday)", self.name), HolidayPhase::Post),
                    );
                }
            }
        }

        if let Some(range) = self.per_year.get(&date.year()) {
            let first = resolve(date.year(), range.first()?)?;
            let last = resolve(date.year(), range.last()?)?;
            for offset in 1..=self.pre_days as i64 {
                if date == first - Duration::days(offset) {
                    return Some(
                        self.matched(format!("{} (pre-holiday)", self.name), HolidayPhase::Pre),
                    );
                }
            }
            for offset in 1..=self.post_days as i64 {
                if date == last + Duration::days(offset) {
                    return Some(
                        self.matched(format!("{} (post-holiday)", self.name), HolidayPhase::Post),
                    );
                }
            }
        }
        None
    }
}

/// Match a date against the holiday table.
///
/// In-range matches win over near-range (pre/post window) matches, and
/// holidays are checked in table order.
pub fn match_holiday(date: NaiveDate) -> Option<HolidayMatch> {
    for spec in &TABLE.holidays {
        if let Some(m) = spec.match_in_range(date) {
            return Some(m);
        }
    }
    for spec in &TABLE.holidays {
        if let Some(m) = spec.match_near_range(date) {
            return Some(m);
        }
    }
    None
}
