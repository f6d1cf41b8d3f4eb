//! Client-local sorting of the project list. Sorting never changes the
//! underlying rows; it only produces an ordered view.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use pim_core::model::Project;
use pim_core::validate::parse_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    MeetingName,
    ClientName,
    JobNumber,
    MeetingType,
    Status,
    StartDate,
    EndDate,
    PreconDate,
    KickoffDate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Which column the view is sorted by. Unsorted until the first toggle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortState {
    field: Option<SortField>,
    direction: SortDirection,
}

enum SortKey<'a> {
    Text(String),
    Date(NaiveDate),
    Raw(&'a str),
}

impl SortField {
    fn key(self, project: &Project) -> SortKey<'_> {
        // NaiveDate::default() is 1970-01-01.
        let date = |value: &Option<String>| {
            SortKey::Date(value.as_deref().and_then(parse_date).unwrap_or_default())
        };
        match self {
            Self::MeetingName => SortKey::Text(project.meeting_name.to_lowercase()),
            Self::ClientName => SortKey::Text(project.client_name.to_lowercase()),
            Self::JobNumber => SortKey::Text(project.job_number.to_lowercase()),
            Self::MeetingType => SortKey::Text(project.meeting_type.to_lowercase()),
            Self::Status => SortKey::Raw(project.status.map_or("", |s| s.as_str())),
            Self::StartDate => date(&project.start_date),
            Self::EndDate => date(&project.end_date),
            Self::PreconDate => date(&project.precon_date),
            Self::KickoffDate => date(&project.kickoff_date),
        }
    }

    fn compare(self, a: &Project, b: &Project) -> Ordering {
        match (self.key(a), self.key(b)) {
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(&b),
            (SortKey::Date(a), SortKey::Date(b)) => a.cmp(&b),
            (SortKey::Raw(a), SortKey::Raw(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl SortState {
    #[must_use]
    pub const fn field(&self) -> Option<SortField> {
        self.field
    }

    #[must_use]
    pub const fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Sort by `field`: the same field again flips the direction, a new
    /// field starts ascending.
    pub fn toggle(&mut self, field: SortField) {
        if self.field == Some(field) {
            self.direction = self.direction.flipped();
        } else {
            self.field = Some(field);
            self.direction = SortDirection::Asc;
        }
    }

    /// Ordered view of `rows`. Draft rows stay at the end in their
    /// original order; the sort is stable for equal keys.
    #[must_use]
    pub fn sorted<'a>(&self, rows: &'a [Project]) -> Vec<&'a Project> {
        let (mut saved, drafts): (Vec<&Project>, Vec<&Project>) =
            rows.iter().partition(|p| !p.is_draft());

        if let Some(field) = self.field {
            saved.sort_by(|a, b| {
                let ord = field.compare(a, b);
                match self.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }

        saved.extend(drafts);
        saved
    }
}
