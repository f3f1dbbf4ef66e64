//! Canonical recurrence rules.
//!
//! Both providers' native recurrence dialects are normalized into one
//! RFC-5545-style rule string (`FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE;...`).
//! Translation is best-effort: a native pattern this model cannot express
//! becomes "no recurrence" rather than an error, and the caller logs the
//! drop distinctly from hard failures.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc, Weekday};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    fn token(self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token {
            "DAILY" => Some(Frequency::Daily),
            "WEEKLY" => Some(Frequency::Weekly),
            "MONTHLY" => Some(Frequency::Monthly),
            "YEARLY" => Some(Frequency::Yearly),
            _ => None,
        }
    }
}

/// End condition of a recurring series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleEnd {
    Never,
    /// Inclusive until-instant; an explicit end date maps to the end of
    /// that day.
    Until(DateTime<Utc>),
    Count(u32),
}

/// One BYDAY entry, optionally qualified by a relative position within the
/// month or year: `2TU` is "second Tuesday", `-1FR` is "last Friday".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByDay {
    pub ordinal: Option<i8>,
    pub weekday: Weekday,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecurrenceRule {
    pub freq: Frequency,
    pub interval: u32,
    pub by_day: Vec<ByDay>,
    pub by_month_day: Option<u32>,
    pub by_month: Option<u32>,
    pub end: RuleEnd,
}

pub fn weekday_token(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

pub fn parse_weekday_token(token: &str) -> Option<Weekday> {
    match token {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_by_day_entry(entry: &str) -> Option<ByDay> {
    // The split point may land inside a multi-byte character in garbled
    // remote data; that is malformed input, not a panic.
    if entry.len() < 2 || !entry.is_char_boundary(entry.len() - 2) {
        return None;
    }
    let (prefix, token) = entry.split_at(entry.len() - 2);
    let weekday = parse_weekday_token(token)?;
    let ordinal = if prefix.is_empty() {
        None
    } else {
        Some(prefix.parse::<i8>().ok()?)
    };
    Some(ByDay { ordinal, weekday })
}

const UNTIL_FORMAT: &str = "%Y%m%dT%H%M%SZ";

impl RecurrenceRule {
    /// Parse a canonical rule string. Returns `None` for anything outside
    /// the supported model (unknown frequency, malformed parts), matching
    /// the engine's degrade-to-no-recurrence policy.
    pub fn parse(rule: &str) -> Option<Self> {
        let mut freq = None;
        let mut interval = 1u32;
        let mut by_day = Vec::new();
        let mut by_month_day = None;
        let mut by_month = None;
        let mut end = RuleEnd::Never;

        for part in rule.trim().trim_end_matches(';').split(';') {
            let (key, value) = part.split_once('=')?;
            match key {
                "FREQ" => freq = Some(Frequency::parse(value)?),
                "INTERVAL" => interval = value.parse().ok()?,
                "BYDAY" => {
                    for entry in value.split(',') {
                        by_day.push(parse_by_day_entry(entry)?);
                    }
                }
                "BYMONTHDAY" => by_month_day = Some(value.parse().ok()?),
                "BYMONTH" => by_month = Some(value.parse().ok()?),
                "COUNT" => end = RuleEnd::Count(value.parse().ok()?),
                "UNTIL" => {
                    let until = NaiveDateTime::parse_from_str(value, UNTIL_FORMAT)
                        .map(|naive| naive.and_utc())
                        .or_else(|_| {
                            // Date-only UNTIL: inclusive through end of day.
                            chrono::NaiveDate::parse_from_str(value, "%Y%m%d")
                                .map(crate::dates::end_of_day_utc)
                        })
                        .ok()?;
                    end = RuleEnd::Until(until);
                }
                // WKST and other qualifiers do not change the supported
                // semantics; keep parsing.
                _ => {}
            }
        }

        Some(Self {
            freq: freq?,
            interval,
            by_day,
            by_month_day,
            by_month,
            end,
        })
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", self.freq.token())?;
        if self.interval != 1 {
            write!(f, ";INTERVAL={}", self.interval)?;
        }
        if !self.by_day.is_empty() {
            write!(f, ";BYDAY=")?;
            for (index, entry) in self.by_day.iter().enumerate() {
                if index > 0 {
                    write!(f, ",")?;
                }
                if let Some(ordinal) = entry.ordinal {
                    write!(f, "{ordinal}")?;
                }
                write!(f, "{}", weekday_token(entry.weekday))?;
            }
        }
        if let Some(day) = self.by_month_day {
            write!(f, ";BYMONTHDAY={day}")?;
        }
        if let Some(month) = self.by_month {
            write!(f, ";BYMONTH={month}")?;
        }
        match self.end {
            RuleEnd::Never => {}
            RuleEnd::Until(until) => write!(f, ";UNTIL={}", until.format(UNTIL_FORMAT))?,
            RuleEnd::Count(count) => write!(f, ";COUNT={count}")?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn weekly_rule_round_trips() {
        let rule = RecurrenceRule {
            freq: Frequency::Weekly,
            interval: 2,
            by_day: vec![
                ByDay {
                    ordinal: None,
                    weekday: Weekday::Mon,
                },
                ByDay {
                    ordinal: None,
                    weekday: Weekday::Wed,
                },
            ],
            by_month_day: None,
            by_month: None,
            end: RuleEnd::Never,
        };
        let text = rule.to_string();
        assert_eq!(text, "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE");
        assert_eq!(RecurrenceRule::parse(&text), Some(rule));
    }

    #[test]
    fn second_tuesday_of_month_round_trips() {
        let text = "FREQ=MONTHLY;BYDAY=2TU";
        let rule = RecurrenceRule::parse(text).unwrap();
        assert_eq!(rule.freq, Frequency::Monthly);
        assert_eq!(
            rule.by_day,
            vec![ByDay {
                ordinal: Some(2),
                weekday: Weekday::Tue
            }]
        );
        assert_eq!(rule.to_string(), text);
    }

    #[test]
    fn last_friday_parses_with_negative_ordinal() {
        let rule = RecurrenceRule::parse("FREQ=MONTHLY;BYDAY=-1FR").unwrap();
        assert_eq!(
            rule.by_day,
            vec![ByDay {
                ordinal: Some(-1),
                weekday: Weekday::Fri
            }]
        );
    }

    #[test]
    fn until_is_parsed_as_instant() {
        let rule = RecurrenceRule::parse("FREQ=DAILY;UNTIL=20261231T235959Z").unwrap();
        assert_eq!(
            rule.end,
            RuleEnd::Until(Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap())
        );
    }

    #[test]
    fn date_only_until_becomes_inclusive_end_of_day() {
        let rule = RecurrenceRule::parse("FREQ=DAILY;UNTIL=20261231").unwrap();
        assert_eq!(
            rule.end,
            RuleEnd::Until(Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap())
        );
    }

    #[test]
    fn count_rule_round_trips() {
        let text = "FREQ=YEARLY;BYMONTHDAY=14;BYMONTH=2;COUNT=10";
        let rule = RecurrenceRule::parse(text).unwrap();
        assert_eq!(rule.end, RuleEnd::Count(10));
        assert_eq!(rule.by_month, Some(2));
        assert_eq!(rule.to_string(), text);
    }

    #[test]
    fn unknown_frequency_degrades_to_none() {
        assert_eq!(RecurrenceRule::parse("FREQ=SECONDLY;INTERVAL=5"), None);
        assert_eq!(RecurrenceRule::parse("garbage"), None);
        assert_eq!(RecurrenceRule::parse("BYDAY=MO"), None);
    }

    #[test]
    fn multibyte_byday_entries_degrade_to_none() {
        assert_eq!(RecurrenceRule::parse("FREQ=WEEKLY;BYDAY=éa"), None);
        assert_eq!(RecurrenceRule::parse("FREQ=WEEKLY;BYDAY=Mé"), None);
        assert_eq!(RecurrenceRule::parse("FREQ=WEEKLY;BYDAY=é"), None);
    }

    #[test]
    fn unrecognized_qualifiers_are_ignored() {
        let rule = RecurrenceRule::parse("FREQ=WEEKLY;WKST=SU;BYDAY=TH").unwrap();
        assert_eq!(rule.freq, Frequency::Weekly);
        assert_eq!(rule.by_day.len(), 1);
    }
}
