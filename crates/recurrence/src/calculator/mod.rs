//! Next-occurrence search.
//!
//! [`OccurrenceCalculator`] maps `(rule, anchor, after)` to the earliest
//! instant strictly after `after` (and not before `anchor`) that the rule
//! produces. All calendar arithmetic happens in the civil time of one fixed
//! UTC offset, so "every day at 09:00" stays at 09:00 regardless of elapsed
//! seconds. The search is bounded by a lookahead horizon.

mod cycles;

#[cfg(test)]
mod tests;

use chrono::{DateTime, FixedOffset, Months, NaiveDateTime, Offset, TimeZone, Utc};

use taskflow_core::SchedulerConfig;

use crate::error::{RecurrenceError, Result};
use crate::rule::RecurrenceRule;

use self::cycles::Cycles;

/// Default lookahead before a search is reported as exhausted.
pub const DEFAULT_LOOKAHEAD_YEARS: u32 = 10;

/// Stateless occurrence search. Cheap to copy and safe to share across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccurrenceCalculator {
    offset: FixedOffset,
    lookahead_years: u32,
}

impl Default for OccurrenceCalculator {
    fn default() -> Self {
        Self::utc()
    }
}

impl OccurrenceCalculator {
    pub fn new(offset: FixedOffset, lookahead_years: u32) -> Self {
        Self {
            offset,
            lookahead_years: lookahead_years.max(1),
        }
    }

    /// Calculator working in UTC civil time with the default lookahead.
    pub fn utc() -> Self {
        Self::new(Utc.fix(), DEFAULT_LOOKAHEAD_YEARS)
    }

    /// Build from scheduler settings. An out-of-range offset falls back to UTC.
    pub fn from_config(config: &SchedulerConfig) -> Self {
        let offset = config
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self::new(offset, config.lookahead_years)
    }

    pub fn with_lookahead_years(self, years: u32) -> Self {
        Self::new(self.offset, years)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn lookahead_years(&self) -> u32 {
        self.lookahead_years
    }

    /// Earliest occurrence strictly after `after`.
    ///
    /// Returns `Ok(None)` for a disabled rule without searching, and
    /// [`RecurrenceError::Exhausted`] when nothing matches within the lookahead.
    pub fn next(
        &self,
        rule: &RecurrenceRule,
        anchor: DateTime<Utc>,
        after: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        if !rule.enabled() {
            return Ok(None);
        }

        let anchor_local = self.to_local(anchor);
        let after_local = self.to_local(after);
        let search_from = after_local.max(anchor_local);
        let horizon = search_from
            .checked_add_months(Months::new(self.lookahead_years.saturating_mul(12)))
            .unwrap_or(NaiveDateTime::MAX);

        for cycle in Cycles::starting_after(rule, anchor_local, after_local) {
            if cycle.start > horizon {
                break;
            }
            let found = cycle
                .candidates
                .into_iter()
                .filter(|c| *c >= anchor_local && *c > after_local)
                .find_map(|c| self.to_instant(c));
            if found.is_some() {
                return Ok(found);
            }
        }

        Err(RecurrenceError::Exhausted {
            horizon_days: (horizon - search_from).num_days(),
        })
    }

    /// Up to `limit` successive occurrences after `after`.
    ///
    /// Stops early, without error, when the rule is disabled or the search
    /// runs out of lookahead after at least one occurrence was found.
    pub fn upcoming(
        &self,
        rule: &RecurrenceRule,
        anchor: DateTime<Utc>,
        after: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DateTime<Utc>>> {
        let mut out = Vec::with_capacity(limit);
        let mut cursor = after;

        while out.len() < limit {
            match self.next(rule, anchor, cursor) {
                Ok(Some(next)) => {
                    out.push(next);
                    cursor = next;
                }
                Ok(None) => break,
                Err(e) if out.is_empty() => return Err(e),
                Err(_) => break,
            }
        }

        Ok(out)
    }

    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.offset).naive_local()
    }

    fn to_instant(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.offset
            .from_local_datetime(&local)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }
}
