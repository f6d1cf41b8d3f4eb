//! Project store.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{Db, Store};
use crate::core::{CoreError, CoreResult};
use crate::model::{Project, ProjectFields, ProjectId};
use crate::validate::{ProjectValidator, Validator};

const SELECT_PROJECT: &str = "SELECT
    id, meeting_name, client_name, job_number, description, resources,
    start_date, end_date, status, meeting_type, attendees_expected,
    attendees_actual, est_budget, cost_per_attendee, precon_date,
    kickoff_date, custom_json, created_at, updated_at
FROM projects";

/// Store for project records.
pub struct ProjectStore<'a> {
    db: &'a Db,
}

impl<'a> ProjectStore<'a> {
    pub(crate) const fn new(db: &'a Db) -> Self {
        Self { db }
    }

    /// Create a project from `fields`, assigning a fresh identity.
    ///
    /// Fails with a validation error (and persists nothing) when the merged
    /// record breaks a [`ProjectValidator`] rule.
    pub fn create(&self, fields: &ProjectFields) -> CoreResult<Project> {
        let mut project = merge_checked(fields, Project::draft())?;

        let now = Utc::now().to_rfc3339();
        let custom_json = serde_json::to_string(&project.custom)
            .context("Failed to encode custom fields")?;

        let conn = self.db.lock()?;
        conn.execute(
            "INSERT INTO projects (
                meeting_name, client_name, job_number, description, resources,
                start_date, end_date, status, meeting_type, attendees_expected,
                attendees_actual, est_budget, cost_per_attendee, precon_date,
                kickoff_date, custom_json, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                project.meeting_name,
                project.client_name,
                project.job_number,
                project.description,
                project.resources,
                project.start_date,
                project.end_date,
                project.status.map(|s| s.as_str()),
                project.meeting_type,
                project.attendees_expected,
                project.attendees_actual,
                project.est_budget,
                project.cost_per_attendee,
                project.precon_date,
                project.kickoff_date,
                custom_json,
                now,
                now,
            ],
        )
        .context("Failed to insert project")?;

        project.id = Some(conn.last_insert_rowid());
        project.created_at = Some(now.clone());
        project.updated_at = Some(now);

        tracing::info!(project_id = project.id, "project created");
        Ok(project)
    }

    /// Merge `fields` onto an existing project.
    ///
    /// The merged record is validated as a whole, so a new `end_date` is
    /// checked against the stored `start_date`. On failure the stored record
    /// is unchanged.
    pub fn update(&self, id: ProjectId, fields: &ProjectFields) -> CoreResult<Project> {
        let mut conn = self.db.lock()?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        let existing =
            query_project(&tx, id)?.ok_or(CoreError::ProjectNotFound { project_id: id })?;
        let mut project = merge_checked(fields, existing)?;

        let now = Utc::now().to_rfc3339();
        let custom_json = serde_json::to_string(&project.custom)
            .context("Failed to encode custom fields")?;

        tx.execute(
            "UPDATE projects SET
                meeting_name = ?, client_name = ?, job_number = ?, description = ?,
                resources = ?, start_date = ?, end_date = ?, status = ?,
                meeting_type = ?, attendees_expected = ?, attendees_actual = ?,
                est_budget = ?, cost_per_attendee = ?, precon_date = ?,
                kickoff_date = ?, custom_json = ?, updated_at = ?
            WHERE id = ?",
            params![
                project.meeting_name,
                project.client_name,
                project.job_number,
                project.description,
                project.resources,
                project.start_date,
                project.end_date,
                project.status.map(|s| s.as_str()),
                project.meeting_type,
                project.attendees_expected,
                project.attendees_actual,
                project.est_budget,
                project.cost_per_attendee,
                project.precon_date,
                project.kickoff_date,
                custom_json,
                now,
                id,
            ],
        )
        .context("Failed to update project")?;
        tx.commit().context("Failed to commit project update")?;

        project.updated_at = Some(now);
        tracing::info!(project_id = id, "project updated");
        Ok(project)
    }

    /// Delete a project and, through the schema's cascade, its blocks.
    pub fn delete(&self, id: ProjectId) -> CoreResult<()> {
        let deleted = self
            .db
            .lock()?
            .execute("DELETE FROM projects WHERE id = ?", params![id])
            .context("Failed to delete project")?;

        if deleted == 0 {
            return Err(CoreError::ProjectNotFound { project_id: id });
        }
        tracing::info!(project_id = id, "project deleted");
        Ok(())
    }

    /// Whether a project with this identity exists.
    pub fn exists(&self, id: ProjectId) -> CoreResult<bool> {
        Ok(project_exists(&*self.db.lock()?, id)?)
    }

    /// Number of stored projects.
    pub fn count(&self) -> CoreResult<i64> {
        let count = self
            .db
            .lock()?
            .query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))
            .context("Failed to count projects")?;
        Ok(count)
    }
}

impl Store<Project> for ProjectStore<'_> {
    type Id = ProjectId;

    /// All projects, ordered by identity.
    fn list(&self) -> CoreResult<Vec<Project>> {
        let conn = self.db.lock()?;
        let mut stmt = conn
            .prepare(&format!("{SELECT_PROJECT} ORDER BY id"))
            .context("Failed to prepare project list")?;
        let projects = stmt
            .query_map([], project_from_row)
            .context("Failed to query projects")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read projects")?;
        Ok(projects)
    }

    fn get(&self, id: ProjectId) -> CoreResult<Project> {
        query_project(&*self.db.lock()?, id)?.ok_or(CoreError::ProjectNotFound { project_id: id })
    }
}

/// Merge `fields` onto `base` and validate the result, reporting merge and
/// rule failures together.
fn merge_checked(fields: &ProjectFields, base: Project) -> CoreResult<Project> {
    let (project, mut errors) = fields.merge_into(base);
    if let Err(rules) = ProjectValidator.validate(&project) {
        errors.absorb(rules);
    }
    errors.into_result()?;
    Ok(project)
}

pub(super) fn project_exists(conn: &Connection, id: ProjectId) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?)",
        params![id],
        |row| row.get(0),
    )
    .context("Failed to check project")
}

fn query_project(conn: &Connection, id: ProjectId) -> Result<Option<Project>> {
    conn.query_row(
        &format!("{SELECT_PROJECT} WHERE id = ?"),
        params![id],
        project_from_row,
    )
    .optional()
    .with_context(|| format!("Failed to query project {id}"))
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    let status: Option<String> = row.get("status")?;
    let status = status
        .map(|s| s.parse())
        .transpose()
        .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, e.into()))?;

    let custom_json: String = row.get("custom_json")?;
    let custom: BTreeMap<String, String> = serde_json::from_str(&custom_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(16, Type::Text, Box::new(e)))?;

    Ok(Project {
        id: Some(row.get("id")?),
        meeting_name: row.get("meeting_name")?,
        client_name: row.get("client_name")?,
        job_number: row.get("job_number")?,
        description: row.get("description")?,
        resources: row.get("resources")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        status,
        meeting_type: row.get("meeting_type")?,
        attendees_expected: row.get("attendees_expected")?,
        attendees_actual: row.get("attendees_actual")?,
        est_budget: row.get("est_budget")?,
        cost_per_attendee: row.get("cost_per_attendee")?,
        precon_date: row.get("precon_date")?,
        kickoff_date: row.get("kickoff_date")?,
        custom,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
