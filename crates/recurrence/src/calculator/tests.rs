//! Tests for cycle generation and the per-type search rules.

use chrono::{DateTime, FixedOffset, Utc};

use super::*;
use crate::rule::RecurrenceType;

fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn calc() -> OccurrenceCalculator {
    OccurrenceCalculator::utc()
}

// -- HOURLY ------------------------------------------------------------

#[test]
fn hourly_blocks_start_at_the_anchor_hour() {
    let rule = RecurrenceRule::builder(RecurrenceType::Hourly)
        .interval(2)
        .minutes([0, 30])
        .build()
        .unwrap();
    let anchor = at("2024-01-01T10:15:00Z");

    let next = calc()
        .upcoming(&rule, anchor, anchor, 5)
        .unwrap();
    assert_eq!(
        next,
        vec![
            at("2024-01-01T10:30:00Z"),
            at("2024-01-01T12:00:00Z"),
            at("2024-01-01T12:30:00Z"),
            at("2024-01-01T14:00:00Z"),
            at("2024-01-01T14:30:00Z"),
        ]
    );
}

#[test]
fn hourly_ignores_hours_set() {
    let rule = RecurrenceRule::builder(RecurrenceType::Hourly)
        .hours([3])
        .minutes([45])
        .build()
        .unwrap();
    let anchor = at("2024-01-01T10:00:00Z");
    assert_eq!(
        calc().next(&rule, anchor, anchor).unwrap(),
        Some(at("2024-01-01T10:45:00Z"))
    );
}

#[test]
fn hourly_skips_ahead_far_from_anchor() {
    let rule = RecurrenceRule::builder(RecurrenceType::Hourly)
        .interval(5)
        .build()
        .unwrap();
    let anchor = at("2024-01-01T00:00:00Z");
    // 2024-03-01T12:34 is 1452.57h after the anchor; blocks fall on multiples of 5h.
    let next = calc().next(&rule, anchor, at("2024-03-01T12:34:00Z")).unwrap();
    assert_eq!(next, Some(at("2024-03-01T15:00:00Z")));
}

// -- DAILY -------------------------------------------------------------

#[test]
fn daily_inherits_anchor_hour_when_hours_empty() {
    let rule = RecurrenceRule::builder(RecurrenceType::Daily)
        .minutes([15])
        .build()
        .unwrap();
    let anchor = at("2024-05-10T07:00:00Z");
    assert_eq!(
        calc().next(&rule, anchor, anchor).unwrap(),
        Some(at("2024-05-10T07:15:00Z"))
    );
    assert_eq!(
        calc().next(&rule, anchor, at("2024-05-10T07:15:00Z")).unwrap(),
        Some(at("2024-05-11T07:15:00Z"))
    );
}

#[test]
fn daily_multiple_times_sorted_within_day() {
    let rule = RecurrenceRule::builder(RecurrenceType::Daily)
        .hours([18, 9])
        .minutes([30, 0])
        .build()
        .unwrap();
    let anchor = at("2024-01-01T00:00:00Z");
    let next = calc().upcoming(&rule, anchor, anchor, 5).unwrap();
    assert_eq!(
        next,
        vec![
            at("2024-01-01T09:00:00Z"),
            at("2024-01-01T09:30:00Z"),
            at("2024-01-01T18:00:00Z"),
            at("2024-01-01T18:30:00Z"),
            at("2024-01-02T09:00:00Z"),
        ]
    );
}

#[test]
fn daily_never_returns_candidates_before_anchor() {
    let rule = RecurrenceRule::builder(RecurrenceType::Daily)
        .hours([6])
        .build()
        .unwrap();
    let anchor = at("2024-01-01T12:00:00Z");
    // Asking from before the anchor still yields nothing earlier than the anchor.
    assert_eq!(
        calc().next(&rule, anchor, at("2023-12-01T00:00:00Z")).unwrap(),
        Some(at("2024-01-02T06:00:00Z"))
    );
}

// -- WEEKLY ------------------------------------------------------------

#[test]
fn weekly_interval_is_anchored_to_creation_week() {
    let rule = RecurrenceRule::builder(RecurrenceType::Weekly)
        .interval(2)
        .days_of_week([1])
        .hours([9])
        .build()
        .unwrap();
    // Wednesday; the creation week's Monday (2024-01-08) has already passed.
    let anchor = at("2024-01-10T12:00:00Z");
    let next = calc().upcoming(&rule, anchor, anchor, 3).unwrap();
    assert_eq!(
        next,
        vec![
            at("2024-01-22T09:00:00Z"),
            at("2024-02-05T09:00:00Z"),
            at("2024-02-19T09:00:00Z"),
        ]
    );
}

#[test]
fn weekly_defaults_to_anchor_weekday() {
    let rule = RecurrenceRule::builder(RecurrenceType::Weekly)
        .hours([8])
        .build()
        .unwrap();
    // Thursday
    let anchor = at("2024-02-01T06:00:00Z");
    let next = calc().upcoming(&rule, anchor, anchor, 2).unwrap();
    assert_eq!(next, vec![at("2024-02-01T08:00:00Z"), at("2024-02-08T08:00:00Z")]);
}

#[test]
fn weekly_sunday_belongs_to_the_same_week() {
    let rule = RecurrenceRule::builder(RecurrenceType::Weekly)
        .interval(2)
        .days_of_week([7, 1])
        .hours([10])
        .build()
        .unwrap();
    let anchor = at("2024-01-01T00:00:00Z");
    let next = calc().upcoming(&rule, anchor, anchor, 4).unwrap();
    assert_eq!(
        next,
        vec![
            at("2024-01-01T10:00:00Z"),
            at("2024-01-07T10:00:00Z"),
            at("2024-01-15T10:00:00Z"),
            at("2024-01-21T10:00:00Z"),
        ]
    );
}

// -- MONTHLY -----------------------------------------------------------

#[test]
fn monthly_defaults_to_anchor_day() {
    let rule = RecurrenceRule::builder(RecurrenceType::Monthly)
        .hours([9])
        .build()
        .unwrap();
    let anchor = at("2024-01-15T08:00:00Z");
    let next = calc().upcoming(&rule, anchor, anchor, 3).unwrap();
    assert_eq!(
        next,
        vec![
            at("2024-01-15T09:00:00Z"),
            at("2024-02-15T09:00:00Z"),
            at("2024-03-15T09:00:00Z"),
        ]
    );
}

#[test]
fn monthly_skips_months_without_the_day() {
    let rule = RecurrenceRule::builder(RecurrenceType::Monthly)
        .days_of_month([30, 31])
        .hours([0])
        .build()
        .unwrap();
    let anchor = at("2024-01-31T00:00:00Z");
    let next = calc().upcoming(&rule, anchor, anchor, 4).unwrap();
    assert_eq!(
        next,
        vec![
            at("2024-03-30T00:00:00Z"),
            at("2024-03-31T00:00:00Z"),
            at("2024-04-30T00:00:00Z"),
            at("2024-05-30T00:00:00Z"),
        ]
    );
}

#[test]
fn monthly_leap_day() {
    let rule = RecurrenceRule::builder(RecurrenceType::Monthly)
        .interval(12)
        .days_of_month([29])
        .hours([12])
        .build()
        .unwrap();
    let anchor = at("2024-02-01T00:00:00Z");
    let next = calc().upcoming(&rule, anchor, anchor, 2).unwrap();
    assert_eq!(next, vec![at("2024-02-29T12:00:00Z"), at("2028-02-29T12:00:00Z")]);
}

#[test]
fn monthly_interval_crosses_year_boundary() {
    let rule = RecurrenceRule::builder(RecurrenceType::Monthly)
        .interval(5)
        .days_of_month([1])
        .hours([0])
        .build()
        .unwrap();
    let anchor = at("2024-10-01T00:00:00Z");
    assert_eq!(
        calc().next(&rule, anchor, anchor).unwrap(),
        Some(at("2025-03-01T00:00:00Z"))
    );
}

// -- enable / offset / exhaustion --------------------------------------

#[test]
fn disabled_rule_returns_none() {
    let rule = RecurrenceRule::builder(RecurrenceType::Daily)
        .enabled(false)
        .build()
        .unwrap();
    let anchor = at("2024-01-01T00:00:00Z");
    assert_eq!(calc().next(&rule, anchor, anchor).unwrap(), None);
    assert!(calc().upcoming(&rule, anchor, anchor, 3).unwrap().is_empty());
}

#[test]
fn civil_time_follows_configured_offset() {
    // UTC+02:00: 09:00 local is 07:00 UTC.
    let offset = FixedOffset::east_opt(2 * 3600).unwrap();
    let calc = OccurrenceCalculator::new(offset, 10);
    let rule = RecurrenceRule::builder(RecurrenceType::Daily)
        .hours([9])
        .build()
        .unwrap();
    let anchor = at("2024-01-01T06:00:00Z");
    assert_eq!(
        calc.next(&rule, anchor, anchor).unwrap(),
        Some(at("2024-01-01T07:00:00Z"))
    );
}

#[test]
fn from_config_reads_offset_and_lookahead() {
    let config = SchedulerConfig {
        utc_offset_minutes: -330,
        lookahead_years: 3,
        ..SchedulerConfig::default()
    };
    let calc = OccurrenceCalculator::from_config(&config);
    assert_eq!(calc.offset().local_minus_utc(), -330 * 60);
    assert_eq!(calc.lookahead_years(), 3);

    let bogus = SchedulerConfig {
        utc_offset_minutes: 100_000,
        ..SchedulerConfig::default()
    };
    assert_eq!(OccurrenceCalculator::from_config(&bogus).offset().local_minus_utc(), 0);
}

#[test]
fn pathological_rule_exhausts() {
    // February never has a 30th, and interval 12 only ever visits February.
    let rule = RecurrenceRule::builder(RecurrenceType::Monthly)
        .interval(12)
        .days_of_month([30])
        .build()
        .unwrap();
    let anchor = at("2024-02-10T00:00:00Z");
    let err = calc().with_lookahead_years(2).next(&rule, anchor, anchor).unwrap_err();
    assert!(matches!(err, RecurrenceError::Exhausted { horizon_days } if horizon_days >= 730));
    assert!(!err.is_validation());
}

#[test]
fn monthly_day_31_every_other_month() {
    // Day 31 with interval 2 from January visits Jan, Mar, May, Jul, Sep, Nov.
    let rule = RecurrenceRule::builder(RecurrenceType::Monthly)
        .interval(2)
        .days_of_month([31])
        .hours([0])
        .build()
        .unwrap();
    let anchor = at("2024-01-01T00:00:00Z");
    let next = calc().upcoming(&rule, anchor, anchor, 3).unwrap();
    assert_eq!(
        next,
        vec![
            at("2024-01-31T00:00:00Z"),
            at("2024-03-31T00:00:00Z"),
            at("2024-05-31T00:00:00Z"),
        ]
    );
}
