//! Field-level validation for records entering the stores.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{NewBlock, Project};

/// ISO calendar date format accepted for every date attribute.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Per-field validation messages, keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for `field`. The first message per field wins.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Add every message of `other`, keeping messages already recorded.
    pub fn absorb(&mut self, other: Self) {
        for (field, message) in other.0 {
            self.insert(field, message);
        }
    }

    /// `Ok(())` when no message was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        f.write_str(&parts.join("; "))
    }
}

/// A validation rule set for records of type `T`.
pub trait Validator<T: ?Sized> {
    /// Check `value`, returning every violated field.
    fn validate(&self, value: &T) -> Result<(), FieldErrors>;
}

/// Parse an ISO `YYYY-MM-DD` date.
#[must_use]
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Plain non-negative decimal: digits with an optional fractional part.
fn is_decimal(value: &str) -> bool {
    let mut parts = value.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let frac = parts.next();
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    digits(whole) && frac.map_or(true, digits)
}

/// Rules for a complete (merged) project record.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectValidator;

impl Validator<Project> for ProjectValidator {
    fn validate(&self, project: &Project) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        if project.meeting_name.trim().is_empty() {
            errors.insert("meeting_name", "Meeting name is required");
        }

        let dates = [
            ("start_date", project.start_date.as_deref()),
            ("end_date", project.end_date.as_deref()),
            ("precon_date", project.precon_date.as_deref()),
            ("kickoff_date", project.kickoff_date.as_deref()),
        ];
        for (field, value) in dates {
            if let Some(value) = value {
                if parse_date(value).is_none() {
                    errors.insert(field, format!("'{value}' is not a valid date (YYYY-MM-DD)"));
                }
            }
        }

        let start = project.start_date.as_deref().and_then(parse_date);
        let end = project.end_date.as_deref().and_then(parse_date);
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                errors.insert("end_date", "End date must not be before start date");
            }
        }

        for (field, value) in [
            ("est_budget", project.est_budget.trim()),
            ("cost_per_attendee", project.cost_per_attendee.trim()),
        ] {
            if !value.is_empty() && !is_decimal(value) {
                errors.insert(field, format!("'{value}' is not a decimal amount"));
            }
        }

        errors.into_result()
    }
}

/// Rules for a block created from scratch.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockValidator;

impl Validator<NewBlock> for BlockValidator {
    fn validate(&self, block: &NewBlock) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if block.title.trim().is_empty() {
            errors.insert("title", "Block title is required");
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Project {
        Project {
            meeting_name: name.to_string(),
            ..Project::default()
        }
    }

    #[test]
    fn test_meeting_name_required() {
        let errors = ProjectValidator.validate(&named("   ")).unwrap_err();
        assert!(errors.get("meeting_name").is_some());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_end_before_start_rejected() {
        let project = Project {
            start_date: Some("2024-03-10".to_string()),
            end_date: Some("2024-03-09".to_string()),
            ..named("Kickoff")
        };
        let errors = ProjectValidator.validate(&project).unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["end_date"]);
    }

    #[test]
    fn test_same_day_range_allowed() {
        let project = Project {
            start_date: Some("2024-03-10".to_string()),
            end_date: Some("2024-03-10".to_string()),
            ..named("Kickoff")
        };
        assert!(ProjectValidator.validate(&project).is_ok());
    }

    #[test]
    fn test_end_without_start_allowed() {
        let project = Project {
            end_date: Some("2024-03-10".to_string()),
            ..named("Kickoff")
        };
        assert!(ProjectValidator.validate(&project).is_ok());
    }

    #[test]
    fn test_malformed_dates_are_field_scoped() {
        let project = Project {
            precon_date: Some("03/10/2024".to_string()),
            kickoff_date: Some("2024-02-30".to_string()),
            ..named("Kickoff")
        };
        let errors = ProjectValidator.validate(&project).unwrap_err();
        assert!(errors.get("precon_date").is_some());
        assert!(errors.get("kickoff_date").is_some());
    }

    #[test]
    fn test_decimal_amounts() {
        assert!(is_decimal("1500"));
        assert!(is_decimal("12.50"));
        assert!(!is_decimal("12."));
        assert!(!is_decimal(".5"));
        assert!(!is_decimal("1e3"));
        assert!(!is_decimal("-4"));

        let project = Project {
            est_budget: "lots".to_string(),
            cost_per_attendee: "42.75".to_string(),
            ..named("Kickoff")
        };
        let errors = ProjectValidator.validate(&project).unwrap_err();
        assert!(errors.get("est_budget").is_some());
        assert!(errors.get("cost_per_attendee").is_none());
    }

    #[test]
    fn test_block_title_required() {
        let errors = BlockValidator.validate(&NewBlock::default()).unwrap_err();
        assert!(errors.get("title").is_some());
    }

    #[test]
    fn test_field_errors_first_message_wins() {
        let mut errors = FieldErrors::new();
        errors.insert("end_date", "first");
        errors.insert("end_date", "second");
        assert_eq!(errors.get("end_date"), Some("first"));
        assert_eq!(errors.to_string(), "end_date: first");
    }

    #[test]
    fn test_absorb_keeps_existing_messages() {
        let mut errors = FieldErrors::new();
        errors.insert("status", "Unknown status 'done'");
        let mut rules = FieldErrors::new();
        rules.insert("status", "other");
        rules.insert("meeting_name", "Meeting name is required");

        errors.absorb(rules);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("status"), Some("Unknown status 'done'"));
        assert!(errors.get("meeting_name").is_some());
    }
}
