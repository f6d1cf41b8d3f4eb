//! Implementation of `pim projects` subcommands.

use anyhow::{bail, Result};
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::output::{Formatter, OutputFormat};
use pim_client::{PimClient, ProjectListState, SortDirection, SortField};
use pim_core::model::{Project, ProjectFields, ProjectId};

use super::helpers::{client_error, core_error, open_session};

/// List projects, optionally sorted by a column.
#[tracing::instrument(skip(root, token, format))]
pub fn run_projects_list(
    root: &Path,
    token: Option<&str>,
    sort: Option<SortField>,
    descending: bool,
    format: OutputFormat,
) -> Result<()> {
    let session = open_session(root, token)?;
    let mut state = ProjectListState::new(session.client());
    state.load().map_err(client_error)?;

    if let Some(field) = sort {
        state.toggle_sort(field);
        if descending && state.sort().direction() == SortDirection::Asc {
            state.toggle_sort(field);
        }
    }

    let rows: Vec<&Project> = state.view().into_iter().filter(|p| !p.is_draft()).collect();
    Formatter::new(format).print_list(&rows, "No projects.", "projects")
}

/// Show a single project.
pub fn run_projects_show(
    root: &Path,
    token: Option<&str>,
    id: ProjectId,
    format: OutputFormat,
) -> Result<()> {
    let session = open_session(root, token)?;
    let project = session
        .services()
        .projects()
        .get(session.request(), id)
        .map_err(core_error)?;
    Formatter::new(format).print(&project)
}

/// Create a project from the given fields.
#[tracing::instrument(skip(root, token, fields, format))]
pub fn run_projects_create(
    root: &Path,
    token: Option<&str>,
    fields: &ProjectFields,
    format: OutputFormat,
) -> Result<()> {
    let has_name = fields
        .meeting_name
        .as_deref()
        .is_some_and(|name| !name.trim().is_empty());
    if !has_name {
        bail!("A project needs a meeting name (--name).");
    }

    let session = open_session(root, token)?;
    let project = session
        .client()
        .create_project(fields)
        .map_err(client_error)?;
    Formatter::new(format).print(&project)
}

/// Apply the given fields to an existing project.
#[tracing::instrument(skip(root, token, fields, format))]
pub fn run_projects_update(
    root: &Path,
    token: Option<&str>,
    id: ProjectId,
    fields: &ProjectFields,
    format: OutputFormat,
) -> Result<()> {
    if *fields == ProjectFields::default() {
        bail!("Nothing to update: pass at least one field option.");
    }

    let session = open_session(root, token)?;
    let project = session
        .client()
        .update_project(id, fields)
        .map_err(client_error)?;
    Formatter::new(format).print(&project)
}

/// Delete a project and its blocks, asking first unless `yes` is set.
#[tracing::instrument(skip(root, token, format))]
pub fn run_projects_delete(
    root: &Path,
    token: Option<&str>,
    id: ProjectId,
    yes: bool,
    format: OutputFormat,
) -> Result<()> {
    let session = open_session(root, token)?;
    let mut state = ProjectListState::new(session.client());
    state.load().map_err(client_error)?;

    let deleted = state
        .delete(id, |project| yes || confirm_delete(project))
        .map_err(client_error)?;

    let formatter = Formatter::new(format);
    match format {
        OutputFormat::Json => formatter.print(&serde_json::json!({
            "id": id,
            "deleted": deleted,
        }))?,
        OutputFormat::Text if deleted => println!("Deleted project {id}"),
        OutputFormat::Text => println!("Aborted."),
    }
    Ok(())
}

fn confirm_delete(project: &Project) -> bool {
    let mut stderr = io::stderr().lock();
    let _ = write!(
        stderr,
        "Delete project '{}' and all of its blocks? [y/N] ",
        project.meeting_name
    );
    let _ = stderr.flush();

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes" | "YES")
}
