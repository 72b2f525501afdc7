//! Lazy cycle generation for a rule anchored at a civil-time instant.
//!
//! A cycle is one interval step of the rule: an hour block (HOURLY), a day
//! (DAILY), a week starting Monday (WEEKLY) or a calendar month (MONTHLY).
//! Each cycle yields its candidates in ascending order, and cycles never
//! overlap, so the flattened sequence is strictly increasing.

use chrono::{Datelike, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::rule::{RecurrenceRule, RecurrenceType};

/// One interval step and the instants it can fire at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Cycle {
    /// Earliest instant the cycle covers (block/day/week/month start).
    pub start: NaiveDateTime,
    /// Candidate instants, ascending. May be empty (e.g. day 31 in April).
    pub candidates: Vec<NaiveDateTime>,
}

/// Iterator over the cycles of a rule. Pure function of `(rule, anchor)`.
pub(crate) struct Cycles<'a> {
    rule: &'a RecurrenceRule,
    /// Cycle 0 origin: hour block, date, Monday of the week, or month index.
    origin: Origin,
    /// Time-of-day combinations for DAILY/WEEKLY/MONTHLY.
    times: Vec<NaiveTime>,
    /// Weekday offsets (0 = Monday) or days of month, depending on type.
    days: Vec<u32>,
    index: i64,
}

#[derive(Debug, Clone, Copy)]
enum Origin {
    Hour(NaiveDateTime),
    Day(NaiveDate),
    Week(NaiveDate),
    /// `year * 12 + month0`
    Month(i64),
}

impl<'a> Cycles<'a> {
    /// Start at the first cycle that may contain a candidate later than `after`.
    ///
    /// Every cycle before the returned position ends at or before `after`, so
    /// skipping them cannot drop a match.
    pub(crate) fn starting_after(
        rule: &'a RecurrenceRule,
        anchor: NaiveDateTime,
        after: NaiveDateTime,
    ) -> Self {
        let mut cycles = Self::new(rule, anchor);
        let interval = i64::from(rule.interval());

        let elapsed_units = match cycles.origin {
            Origin::Hour(base) => (after - base).num_hours(),
            Origin::Day(base) => (after.date() - base).num_days(),
            Origin::Week(base) => (after.date() - base).num_days() / 7,
            Origin::Month(base) => month_index(after.date()) - base,
        };
        cycles.index = if elapsed_units > 0 { elapsed_units / interval } else { 0 };
        cycles
    }

    fn new(rule: &'a RecurrenceRule, anchor: NaiveDateTime) -> Self {
        let date = anchor.date();
        let origin = match rule.kind() {
            RecurrenceType::Hourly => Origin::Hour(date.and_time(
                NaiveTime::from_hms_opt(anchor.hour(), 0, 0).unwrap_or(NaiveTime::MIN),
            )),
            RecurrenceType::Daily => Origin::Day(date),
            RecurrenceType::Weekly => {
                let back = u64::from(date.weekday().num_days_from_monday());
                Origin::Week(date.checked_sub_days(Days::new(back)).unwrap_or(date))
            }
            RecurrenceType::Monthly => Origin::Month(month_index(date)),
        };

        let days = match rule.kind() {
            RecurrenceType::Weekly if rule.days_of_week().is_empty() => {
                vec![date.weekday().num_days_from_monday()]
            }
            RecurrenceType::Weekly => rule
                .days_of_week()
                .iter()
                .map(|d| u32::from(*d) - 1)
                .collect(),
            RecurrenceType::Monthly if rule.days_of_month().is_empty() => vec![date.day()],
            RecurrenceType::Monthly => rule.days_of_month().iter().map(|d| u32::from(*d)).collect(),
            RecurrenceType::Hourly | RecurrenceType::Daily => Vec::new(),
        };

        Self {
            rule,
            origin,
            times: times_of_day(rule, anchor),
            days,
            index: 0,
        }
    }

    fn cycle_at(&self, index: i64) -> Option<Cycle> {
        let step = index.checked_mul(i64::from(self.rule.interval()))?;

        match self.origin {
            Origin::Hour(base) => {
                let start = base.checked_add_signed(Duration::try_hours(step)?)?;
                let candidates = self
                    .rule
                    .minutes()
                    .iter()
                    .filter_map(|m| start.checked_add_signed(Duration::minutes(i64::from(*m))))
                    .collect();
                Some(Cycle { start, candidates })
            }
            Origin::Day(base) => {
                let day = base.checked_add_days(Days::new(u64::try_from(step).ok()?))?;
                Some(Cycle {
                    start: day.and_time(NaiveTime::MIN),
                    candidates: self.times.iter().map(|t| day.and_time(*t)).collect(),
                })
            }
            Origin::Week(base) => {
                let week = base.checked_add_days(Days::new(u64::try_from(step.checked_mul(7)?).ok()?))?;
                let candidates = self
                    .days
                    .iter()
                    .filter_map(|offset| week.checked_add_days(Days::new(u64::from(*offset))))
                    .flat_map(|day| self.times.iter().map(move |t| day.and_time(*t)))
                    .collect();
                Some(Cycle {
                    start: week.and_time(NaiveTime::MIN),
                    candidates,
                })
            }
            Origin::Month(base) => {
                let idx = base.checked_add(step)?;
                let year = i32::try_from(idx.div_euclid(12)).ok()?;
                let month = idx.rem_euclid(12) as u32 + 1;
                let first = NaiveDate::from_ymd_opt(year, month, 1)?;
                // Days the month lacks are skipped, never clamped or rolled over.
                let candidates = self
                    .days
                    .iter()
                    .filter_map(|d| NaiveDate::from_ymd_opt(year, month, *d))
                    .flat_map(|day| self.times.iter().map(move |t| day.and_time(*t)))
                    .collect();
                Some(Cycle {
                    start: first.and_time(NaiveTime::MIN),
                    candidates,
                })
            }
        }
    }
}

impl Iterator for Cycles<'_> {
    type Item = Cycle;

    fn next(&mut self) -> Option<Cycle> {
        let cycle = self.cycle_at(self.index)?;
        self.index += 1;
        Some(cycle)
    }
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

/// Sorted `hours × minutes`, with the anchor's hour standing in for empty hours.
fn times_of_day(rule: &RecurrenceRule, anchor: NaiveDateTime) -> Vec<NaiveTime> {
    let hours: Vec<u32> = if rule.hours().is_empty() {
        vec![anchor.hour()]
    } else {
        rule.hours().iter().map(|h| u32::from(*h)).collect()
    };

    hours
        .iter()
        .flat_map(|h| {
            rule.minutes()
                .iter()
                .filter_map(move |m| NaiveTime::from_hms_opt(*h, u32::from(*m), 0))
        })
        .collect()
}
