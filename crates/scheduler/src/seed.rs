//! YAML seed file of recurring task templates.
//!
//! ```yaml
//! schedules:
//!   - name: Weekly review
//!     anchor: 2024-01-01T08:00:00Z
//!     recurrence: { type: weekly, daysOfWeek: [5], hours: [16] }
//!     template: { title: Weekly review, project: ops }
//! ```

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use taskflow_core::{Result, TaskflowError};
use taskflow_recurrence::{RawRecurrence, RecurrenceRule};

use crate::types::NewSchedule;

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub schedules: Vec<SeedEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SeedEntry {
    pub name: String,
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Defaults to the load time.
    #[serde(default)]
    pub anchor: Option<DateTime<Utc>>,
    pub recurrence: RawRecurrence,
    #[serde(default)]
    pub template: serde_json::Value,
}

impl SeedEntry {
    fn into_new_schedule(self, now: DateTime<Utc>) -> Result<NewSchedule> {
        let rule = RecurrenceRule::create(self.recurrence).map_err(|e| TaskflowError::InvalidSeed {
            name: self.name.clone(),
            reason: e.to_string(),
        })?;
        let template = if self.template.is_null() {
            serde_json::json!({ "title": self.name })
        } else {
            self.template
        };

        Ok(NewSchedule {
            id: self.id,
            rule,
            anchor_time: self.anchor.unwrap_or(now),
            template,
        })
    }
}

/// Parse seed YAML into schedules ready for `create_schedule`.
pub fn parse_seed(contents: &str, now: DateTime<Utc>) -> Result<Vec<NewSchedule>> {
    let file: SeedFile =
        serde_yaml::from_str(contents).map_err(|e| TaskflowError::Serialize(e.to_string()))?;
    file.schedules
        .into_iter()
        .map(|entry| entry.into_new_schedule(now))
        .collect()
}

pub fn load_seed(path: &Path, now: DateTime<Utc>) -> Result<Vec<NewSchedule>> {
    let contents = fs::read_to_string(path)?;
    let schedules = parse_seed(&contents, now)?;
    info!(path = %path.display(), count = schedules.len(), "loaded seed file");
    Ok(schedules)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use taskflow_recurrence::RecurrenceType;

    use super::*;

    const SEED: &str = r#"
schedules:
  - name: Standup notes
    anchor: 2024-01-01T09:00:00Z
    recurrence:
      type: 2
      hourOfDay: 9
  - name: Invoice run
    id: 6f1c1a52-36a5-4d0e-9d38-0c8d5d0b2f4e
    recurrence:
      type: monthly
      daysOfMonth: [1, 15]
      hours: [6]
      enabled: false
    template:
      title: Send invoices
      priority: high
"#;

    #[test]
    fn parses_entries() {
        let now: DateTime<Utc> = "2024-02-01T00:00:00Z".parse().unwrap();
        let schedules = parse_seed(SEED, now).unwrap();
        assert_eq!(schedules.len(), 2);

        let standup = &schedules[0];
        assert_eq!(standup.rule.kind(), RecurrenceType::Daily);
        assert!(standup.rule.hours().contains(&9));
        assert_eq!(standup.template["title"], "Standup notes");
        assert_eq!(standup.anchor_time, "2024-01-01T09:00:00Z".parse::<DateTime<Utc>>().unwrap());

        let invoices = &schedules[1];
        assert_eq!(invoices.anchor_time, now);
        assert!(!invoices.rule.enabled());
        assert_eq!(invoices.template["priority"], "high");
        assert!(invoices.id.is_some());
    }

    #[test]
    fn invalid_rule_names_the_entry() {
        let yaml = "schedules:\n  - name: Broken\n    recurrence: { type: daily, interval: 0 }\n";
        let err = parse_seed(yaml, Utc::now()).unwrap_err();
        match err {
            TaskflowError::InvalidSeed { name, .. } => assert_eq!(name, "Broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SEED.as_bytes()).unwrap();

        let schedules = load_seed(file.path(), Utc::now()).unwrap();
        assert_eq!(schedules.len(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_seed(&dir.path().join("absent.yml"), Utc::now()).unwrap_err();
        assert!(matches!(err, TaskflowError::Io(_)));
    }
}
