//! Human-readable rule labels, e.g. "every 2 weeks on Mon, Fri at 08:00".

use std::collections::BTreeSet;
use std::fmt;

use super::{RecurrenceRule, RecurrenceType};

const WEEKDAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

fn join(values: impl Iterator<Item = String>) -> String {
    values.collect::<Vec<_>>().join(", ")
}

fn unit(kind: RecurrenceType) -> &'static str {
    match kind {
        RecurrenceType::Hourly => "hour",
        RecurrenceType::Daily => "day",
        RecurrenceType::Weekly => "week",
        RecurrenceType::Monthly => "month",
    }
}

fn times(hours: &BTreeSet<u8>, minutes: &BTreeSet<u8>) -> String {
    if hours.is_empty() {
        let mins = join(minutes.iter().map(|m| format!(":{:02}", m)));
        return format!("at {} past the start hour", mins);
    }
    let all = hours
        .iter()
        .flat_map(|h| minutes.iter().map(move |m| format!("{:02}:{:02}", h, m)));
    format!("at {}", join(all))
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = unit(self.kind);
        if self.interval == 1 {
            write!(f, "every {}", unit)?;
        } else {
            write!(f, "every {} {}s", self.interval, unit)?;
        }

        match self.kind {
            RecurrenceType::Hourly => {
                let mins = join(self.minutes.iter().map(|m| format!(":{:02}", m)));
                write!(f, " at {}", mins)?;
            }
            RecurrenceType::Daily => {
                write!(f, " {}", times(&self.hours, &self.minutes))?;
            }
            RecurrenceType::Weekly => {
                if !self.days_of_week.is_empty() {
                    let days = join(
                        self.days_of_week
                            .iter()
                            .map(|d| WEEKDAY_NAMES[usize::from(*d - 1)].to_string()),
                    );
                    write!(f, " on {}", days)?;
                }
                write!(f, " {}", times(&self.hours, &self.minutes))?;
            }
            RecurrenceType::Monthly => {
                if !self.days_of_month.is_empty() {
                    let days = join(self.days_of_month.iter().map(|d| d.to_string()));
                    let label = if self.days_of_month.len() == 1 { "day" } else { "days" };
                    write!(f, " on {} {}", label, days)?;
                }
                write!(f, " {}", times(&self.hours, &self.minutes))?;
            }
        }

        if !self.enabled {
            write!(f, " (paused)")?;
        }
        Ok(())
    }
}
