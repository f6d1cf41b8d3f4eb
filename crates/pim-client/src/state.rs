//! Local mirror of the project list.
//!
//! The list always ends with exactly one draft row (`id == None`). Edits are
//! applied locally first; saves, updates and deletes reconcile the mirror
//! with what the server returns. A failed operation leaves the rows as they
//! were and records the error for display.

use std::fmt;
use std::str::FromStr;

use pim_core::model::{Project, ProjectFields, ProjectId, ProjectStatus};
use pim_core::validate::{parse_date, FieldErrors};

use crate::sort::{SortField, SortState};
use crate::transport::{ClientError, ClientResult, PimClient};

/// An editable project attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProjectField {
    MeetingName,
    ClientName,
    JobNumber,
    Description,
    Resources,
    StartDate,
    EndDate,
    Status,
    MeetingType,
    AttendeesExpected,
    AttendeesActual,
    EstBudget,
    CostPerAttendee,
    PreconDate,
    KickoffDate,
    /// An entry of the free-form `custom` map.
    Custom(String),
}

const NAMED_FIELDS: [ProjectField; 15] = [
    ProjectField::MeetingName,
    ProjectField::ClientName,
    ProjectField::JobNumber,
    ProjectField::Description,
    ProjectField::Resources,
    ProjectField::StartDate,
    ProjectField::EndDate,
    ProjectField::Status,
    ProjectField::MeetingType,
    ProjectField::AttendeesExpected,
    ProjectField::AttendeesActual,
    ProjectField::EstBudget,
    ProjectField::CostPerAttendee,
    ProjectField::PreconDate,
    ProjectField::KickoffDate,
];

impl ProjectField {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::MeetingName => "meeting_name",
            Self::ClientName => "client_name",
            Self::JobNumber => "job_number",
            Self::Description => "description",
            Self::Resources => "resources",
            Self::StartDate => "start_date",
            Self::EndDate => "end_date",
            Self::Status => "status",
            Self::MeetingType => "meeting_type",
            Self::AttendeesExpected => "attendees_expected",
            Self::AttendeesActual => "attendees_actual",
            Self::EstBudget => "est_budget",
            Self::CostPerAttendee => "cost_per_attendee",
            Self::PreconDate => "precon_date",
            Self::KickoffDate => "kickoff_date",
            Self::Custom(key) => key,
        }
    }

    /// Current value of this field as display text.
    #[must_use]
    pub fn get(&self, project: &Project) -> String {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        let num = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_default();
        match self {
            Self::MeetingName => project.meeting_name.clone(),
            Self::ClientName => project.client_name.clone(),
            Self::JobNumber => project.job_number.clone(),
            Self::Description => project.description.clone(),
            Self::Resources => project.resources.clone(),
            Self::StartDate => opt(&project.start_date),
            Self::EndDate => opt(&project.end_date),
            Self::Status => project.status.map(|s| s.to_string()).unwrap_or_default(),
            Self::MeetingType => project.meeting_type.clone(),
            Self::AttendeesExpected => num(project.attendees_expected),
            Self::AttendeesActual => num(project.attendees_actual),
            Self::EstBudget => project.est_budget.clone(),
            Self::CostPerAttendee => project.cost_per_attendee.clone(),
            Self::PreconDate => opt(&project.precon_date),
            Self::KickoffDate => opt(&project.kickoff_date),
            Self::Custom(key) => project.custom.get(key).cloned().unwrap_or_default(),
        }
    }

    /// Set this field on `project` from text input.
    ///
    /// Rejects values the row could never hold: unknown statuses and
    /// non-numeric attendee counts. An empty value clears optional fields.
    pub fn apply(&self, project: &mut Project, value: &str) -> ClientResult<()> {
        let opt = |v: &str| (!v.trim().is_empty()).then(|| v.trim().to_string());
        let count = |v: &str| -> ClientResult<Option<u32>> {
            let v = v.trim();
            if v.is_empty() {
                return Ok(None);
            }
            v.parse()
                .map(Some)
                .map_err(|_| ClientError::local(self.name(), "Must be a whole number"))
        };
        match self {
            Self::MeetingName => project.meeting_name = value.to_string(),
            Self::ClientName => project.client_name = value.to_string(),
            Self::JobNumber => project.job_number = value.to_string(),
            Self::Description => project.description = value.to_string(),
            Self::Resources => project.resources = value.to_string(),
            Self::StartDate => project.start_date = opt(value),
            Self::EndDate => project.end_date = opt(value),
            Self::Status => {
                project.status = match opt(value) {
                    None => None,
                    Some(s) => Some(
                        s.parse::<ProjectStatus>()
                            .map_err(|e| ClientError::local("status", e))?,
                    ),
                };
            }
            Self::MeetingType => project.meeting_type = value.to_string(),
            Self::AttendeesExpected => project.attendees_expected = count(value)?,
            Self::AttendeesActual => project.attendees_actual = count(value)?,
            Self::EstBudget => project.est_budget = value.to_string(),
            Self::CostPerAttendee => project.cost_per_attendee = value.to_string(),
            Self::PreconDate => project.precon_date = opt(value),
            Self::KickoffDate => project.kickoff_date = opt(value),
            Self::Custom(key) => {
                project.custom.insert(key.clone(), value.to_string());
            }
        }
        Ok(())
    }

    /// A one-field update request carrying this field's value from `project`.
    #[must_use]
    pub fn patch(&self, project: &Project) -> ProjectFields {
        let full = ProjectFields::from(project);
        let mut patch = ProjectFields::default();
        match self {
            Self::MeetingName => patch.meeting_name = full.meeting_name,
            Self::ClientName => patch.client_name = full.client_name,
            Self::JobNumber => patch.job_number = full.job_number,
            Self::Description => patch.description = full.description,
            Self::Resources => patch.resources = full.resources,
            Self::StartDate => patch.start_date = Some(self.get(project)),
            Self::EndDate => patch.end_date = Some(self.get(project)),
            Self::Status => patch.status = Some(self.get(project)),
            Self::MeetingType => patch.meeting_type = full.meeting_type,
            Self::AttendeesExpected => patch.attendees_expected = Some(project.attendees_expected),
            Self::AttendeesActual => patch.attendees_actual = Some(project.attendees_actual),
            Self::EstBudget => patch.est_budget = full.est_budget,
            Self::CostPerAttendee => patch.cost_per_attendee = full.cost_per_attendee,
            Self::PreconDate => patch.precon_date = Some(self.get(project)),
            Self::KickoffDate => patch.kickoff_date = Some(self.get(project)),
            Self::Custom(key) => {
                patch.custom = Some([(key.clone(), self.get(project))].into_iter().collect());
            }
        }
        patch
    }
}

impl fmt::Display for ProjectField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProjectField {
    type Err = String;

    /// Named attributes by their wire name; `custom.<key>` for custom entries.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(key) = s.strip_prefix("custom.") {
            if key.is_empty() {
                return Err("custom field key must not be empty".to_string());
            }
            return Ok(Self::Custom(key.to_string()));
        }
        NAMED_FIELDS
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| format!("unknown project field '{s}'"))
    }
}

/// End date must not precede start date, when both are set.
fn check_range(project: &Project) -> ClientResult<()> {
    let start = project.start_date.as_deref().and_then(parse_date);
    let end = project.end_date.as_deref().and_then(parse_date);
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(ClientError::local(
            "end_date",
            "End date must be after start date",
        )),
        _ => Ok(()),
    }
}

/// The client-side project list.
pub struct ProjectListState<C> {
    client: C,
    rows: Vec<Project>,
    sort: SortState,
    field_errors: FieldErrors,
    banner: Option<String>,
}

impl<C: PimClient> ProjectListState<C> {
    /// Empty state holding only the draft row. Call [`Self::load`] to fill it.
    pub fn new(client: C) -> Self {
        Self {
            client,
            rows: vec![Project::draft()],
            sort: SortState::default(),
            field_errors: FieldErrors::new(),
            banner: None,
        }
    }

    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Rows in store order, draft last.
    pub fn rows(&self) -> &[Project] {
        &self.rows
    }

    /// Saved rows only.
    pub fn saved(&self) -> &[Project] {
        &self.rows[..self.draft_index()]
    }

    pub fn draft(&self) -> &Project {
        &self.rows[self.draft_index()]
    }

    pub const fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub const fn sort(&self) -> &SortState {
        &self.sort
    }

    /// Sort the view by `field`, flipping direction on repeat.
    pub fn toggle_sort(&mut self, field: SortField) {
        self.sort.toggle(field);
    }

    /// Rows ordered by the current sort, draft last.
    pub fn view(&self) -> Vec<&Project> {
        self.sort.sorted(&self.rows)
    }

    /// Replace the mirror with the server's list plus a fresh draft.
    pub fn load(&mut self) -> ClientResult<()> {
        let projects = self.record(self.client.list_projects())?;
        self.rows = projects;
        self.rows.push(Project::draft());
        Ok(())
    }

    /// Local-only edit of the row at `index` (into [`Self::rows`]).
    ///
    /// Rejected edits leave the row untouched and are recorded as field errors.
    pub fn edit_field(&mut self, index: usize, field: &ProjectField, value: &str) -> ClientResult<()> {
        let Some(current) = self.rows.get(index) else {
            return Err(ClientError::local(field.name(), format!("No row at position {index}")));
        };
        let mut edited = current.clone();
        let result = field.apply(&mut edited, value).and_then(|()| check_range(&edited));
        self.record(result)?;
        self.rows[index] = edited;
        Ok(())
    }

    /// Edit the draft row locally.
    pub fn edit_draft(&mut self, field: &ProjectField, value: &str) -> ClientResult<()> {
        let index = self.draft_index();
        self.edit_field(index, field, value)
    }

    /// Send the draft to the server.
    ///
    /// Without a meeting name nothing is sent. On success the saved record
    /// takes the draft's place and a new empty draft is appended.
    pub fn save_draft(&mut self) -> ClientResult<Project> {
        let index = self.draft_index();
        let draft = &self.rows[index];
        if draft.meeting_name.trim().is_empty() {
            return self.record(Err(ClientError::local(
                "meeting_name",
                "Meeting name is required",
            )));
        }

        let fields = ProjectFields::from(draft);
        let saved = self.record(self.client.create_project(&fields))?;
        tracing::debug!(project_id = saved.id, "draft saved");
        self.rows[index] = saved.clone();
        self.rows.push(Project::draft());
        Ok(saved)
    }

    /// Edit a saved project and send the change immediately.
    ///
    /// The returned record replaces the row with the same id. If the server
    /// rejects the change, the row goes back to what it was.
    pub fn edit_and_save(&mut self, id: ProjectId, field: &ProjectField, value: &str) -> ClientResult<Project> {
        let index = self.index_of(id)?;
        let before = self.rows[index].clone();
        self.edit_field(index, field, value)?;

        let patch = field.patch(&self.rows[index]);
        match self.record(self.client.update_project(id, &patch)) {
            Ok(updated) => {
                self.replace(&updated);
                Ok(updated)
            }
            Err(err) => {
                if let Ok(index) = self.index_of(id) {
                    self.rows[index] = before;
                }
                Err(err)
            }
        }
    }

    /// Delete a saved project after `confirm` approves it.
    ///
    /// Returns `Ok(false)` when the user declined; nothing is sent then.
    pub fn delete(&mut self, id: ProjectId, confirm: impl FnOnce(&Project) -> bool) -> ClientResult<bool> {
        let index = self.index_of(id)?;
        if !confirm(&self.rows[index]) {
            return Ok(false);
        }
        self.record(self.client.delete_project(id))?;
        self.rows.retain(|p| p.id != Some(id));
        Ok(true)
    }

    /// Forget any displayed errors.
    pub fn clear_errors(&mut self) {
        self.field_errors = FieldErrors::new();
        self.banner = None;
    }

    /// Replace the row whose id matches `record`, if it is still present.
    fn replace(&mut self, record: &Project) {
        if let Some(row) = self.rows.iter_mut().find(|p| p.id.is_some() && p.id == record.id) {
            *row = record.clone();
        }
    }

    fn index_of(&self, id: ProjectId) -> ClientResult<usize> {
        self.rows
            .iter()
            .position(|p| p.id == Some(id))
            .ok_or(ClientError::UnknownRow { id })
    }

    fn draft_index(&self) -> usize {
        // The draft is always the last row.
        self.rows.len() - 1
    }

    /// Clear old errors, then surface the outcome of `result`.
    fn record<T>(&mut self, result: ClientResult<T>) -> ClientResult<T> {
        self.clear_errors();
        if let Err(err) = &result {
            match err.field_errors() {
                Some(fields) => self.field_errors = fields,
                None => self.banner = Some(err.to_string()),
            }
        }
        result
    }
}
