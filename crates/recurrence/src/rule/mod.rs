//! Recurrence rule model: type, interval, and the weekday/day/hour/minute sets.
//!
//! A [`RecurrenceRule`] is only ever built through validation
//! ([`RecurrenceRule::create`] or [`RuleBuilder`]), so the calculator can rely
//! on every set being in range and `minutes` never being empty.

mod display;
mod raw;


use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{RecurrenceError, Result};

pub use self::raw::{RawRecurrence, RawType};

/// Repetition unit of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrenceType {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl RecurrenceType {
    /// Legacy numeric code used by task template payloads.
    pub fn code(self) -> u8 {
        match self {
            RecurrenceType::Hourly => 1,
            RecurrenceType::Daily => 2,
            RecurrenceType::Weekly => 3,
            RecurrenceType::Monthly => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(RecurrenceType::Hourly),
            2 => Some(RecurrenceType::Daily),
            3 => Some(RecurrenceType::Weekly),
            4 => Some(RecurrenceType::Monthly),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "hourly" => Some(RecurrenceType::Hourly),
            "daily" => Some(RecurrenceType::Daily),
            "weekly" => Some(RecurrenceType::Weekly),
            "monthly" => Some(RecurrenceType::Monthly),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecurrenceType::Hourly => "HOURLY",
            RecurrenceType::Daily => "DAILY",
            RecurrenceType::Weekly => "WEEKLY",
            RecurrenceType::Monthly => "MONTHLY",
        }
    }
}

/// A validated repetition pattern.
///
/// Empty `hours`, `days_of_week` and `days_of_month` mean "inherit from the
/// anchor time"; `minutes` is normalized to `{0}` when empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRecurrence", into = "RawRecurrence")]
pub struct RecurrenceRule {
    kind: RecurrenceType,
    interval: u32,
    days_of_week: BTreeSet<u8>,
    days_of_month: BTreeSet<u8>,
    hours: BTreeSet<u8>,
    minutes: BTreeSet<u8>,
    enabled: bool,
}

impl RecurrenceRule {
    /// Validate and normalize a raw payload into a rule.
    pub fn create(raw: RawRecurrence) -> Result<Self> {
        let kind = raw.kind.as_ref().ok_or(RecurrenceError::MissingType)?.resolve()?;

        let interval = raw.interval.unwrap_or(1);
        if interval < 1 || interval > i64::from(u32::MAX) {
            return Err(RecurrenceError::InvalidInterval(interval));
        }

        let days_of_week = collect_range(
            &raw.days_of_week,
            raw.day_of_week,
            1..=7,
            RecurrenceError::InvalidDayOfWeek,
        )?;
        let days_of_month = collect_range(
            &raw.days_of_month,
            raw.day_of_month,
            1..=31,
            RecurrenceError::InvalidDayOfMonth,
        )?;
        let hours = collect_range(&raw.hours, raw.hour_of_day, 0..=23, RecurrenceError::InvalidHour)?;
        let mut minutes = collect_range(
            &raw.minutes,
            raw.minute_of_hour,
            0..=59,
            RecurrenceError::InvalidMinute,
        )?;
        if minutes.is_empty() {
            minutes.insert(0);
        }

        Ok(Self {
            kind,
            interval: interval as u32,
            days_of_week,
            days_of_month,
            hours,
            minutes,
            enabled: raw.enabled.unwrap_or(true),
        })
    }

    /// Start a builder for the given type.
    pub fn builder(kind: RecurrenceType) -> RuleBuilder {
        RuleBuilder::new(kind)
    }

    /// Copy of this rule with only `enabled` changed.
    pub fn with_enabled(&self, enabled: bool) -> Self {
        Self {
            enabled,
            ..self.clone()
        }
    }

    /// Compare the pattern shape, ignoring the enabled flag.
    pub fn same_pattern(&self, other: &Self) -> bool {
        self.with_enabled(true) == other.with_enabled(true)
    }

    pub fn kind(&self) -> RecurrenceType {
        self.kind
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// ISO weekdays, 1 = Monday .. 7 = Sunday.
    pub fn days_of_week(&self) -> &BTreeSet<u8> {
        &self.days_of_week
    }

    pub fn days_of_month(&self) -> &BTreeSet<u8> {
        &self.days_of_month
    }

    pub fn hours(&self) -> &BTreeSet<u8> {
        &self.hours
    }

    pub fn minutes(&self) -> &BTreeSet<u8> {
        &self.minutes
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

impl TryFrom<RawRecurrence> for RecurrenceRule {
    type Error = RecurrenceError;

    fn try_from(raw: RawRecurrence) -> Result<Self> {
        Self::create(raw)
    }
}

impl From<RecurrenceRule> for RawRecurrence {
    fn from(rule: RecurrenceRule) -> Self {
        let widen = |set: &BTreeSet<u8>| set.iter().map(|v| i64::from(*v)).collect::<Vec<_>>();
        RawRecurrence {
            kind: Some(RawType::Name(rule.kind.as_str().to_string())),
            interval: Some(i64::from(rule.interval)),
            days_of_week: widen(&rule.days_of_week),
            days_of_month: widen(&rule.days_of_month),
            hours: widen(&rule.hours),
            minutes: widen(&rule.minutes),
            enabled: Some(rule.enabled),
            ..RawRecurrence::default()
        }
    }
}

/// Merge a plural list and an optional singular value into a range-checked set.
fn collect_range(
    values: &[i64],
    single: Option<i64>,
    range: std::ops::RangeInclusive<i64>,
    invalid: fn(i64) -> RecurrenceError,
) -> Result<BTreeSet<u8>> {
    values
        .iter()
        .copied()
        .chain(single)
        .map(|v| if range.contains(&v) { Ok(v as u8) } else { Err(invalid(v)) })
        .collect()
}

// ── Builder ─────────────────────────────────────────────────────────

/// Fluent construction of a [`RecurrenceRule`]; validation runs in [`build`](RuleBuilder::build).
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    raw: RawRecurrence,
}

impl RuleBuilder {
    pub fn new(kind: RecurrenceType) -> Self {
        Self {
            raw: RawRecurrence {
                kind: Some(RawType::Code(i64::from(kind.code()))),
                ..RawRecurrence::default()
            },
        }
    }

    pub fn interval(mut self, interval: i64) -> Self {
        self.raw.interval = Some(interval);
        self
    }

    pub fn days_of_week(mut self, days: impl IntoIterator<Item = i64>) -> Self {
        self.raw.days_of_week = days.into_iter().collect();
        self
    }

    pub fn days_of_month(mut self, days: impl IntoIterator<Item = i64>) -> Self {
        self.raw.days_of_month = days.into_iter().collect();
        self
    }

    pub fn hours(mut self, hours: impl IntoIterator<Item = i64>) -> Self {
        self.raw.hours = hours.into_iter().collect();
        self
    }

    pub fn minutes(mut self, minutes: impl IntoIterator<Item = i64>) -> Self {
        self.raw.minutes = minutes.into_iter().collect();
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.raw.enabled = Some(enabled);
        self
    }

    pub fn build(self) -> Result<RecurrenceRule> {
        RecurrenceRule::create(self.raw)
    }
}
