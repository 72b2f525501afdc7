//! Raw recurrence payload as sent by the template-authoring UI.

use serde::{Deserialize, Serialize};

use crate::error::{RecurrenceError, Result};

use super::RecurrenceType;

/// Recurrence type as it appears on the wire: a legacy numeric code
/// (`1` hourly .. `4` monthly) or a case-insensitive name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawType {
    Code(i64),
    Name(String),
}

impl RawType {
    pub fn resolve(&self) -> Result<RecurrenceType> {
        match self {
            RawType::Code(code) => RecurrenceType::from_code(*code)
                .ok_or_else(|| RecurrenceError::UnknownType(code.to_string())),
            RawType::Name(name) => RecurrenceType::from_name(name)
                .ok_or_else(|| RecurrenceError::UnknownType(name.clone())),
        }
    }
}

/// Unvalidated rule fields.
///
/// Values are kept as `i64` so out-of-range input surfaces as a
/// [`RecurrenceError`] instead of a deserialization failure. The singular
/// `hourOfDay`/`dayOfWeek`/`dayOfMonth`/`minuteOfHour` fields are merged into
/// their plural sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecurrence {
    #[serde(rename = "type", alias = "recurrenceType", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RawType>,
    #[serde(alias = "recurrenceInterval", default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days_of_week: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days_of_month: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hours: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub minutes: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour_of_day: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute_of_hour: Option<i64>,
    #[serde(alias = "recurrenceEnable", alias = "isRecurrenceEnabled", default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}
