//! Project service: CRUD gated by capability.

use crate::auth::{Capability, RequestContext};
use crate::model::{Project, ProjectFields, ProjectId};
use crate::store::{Db, Store};

use super::{CoreResult, Gate};

/// Service for project operations.
pub struct ProjectService<'a> {
    gate: Gate<'a>,
    db: &'a Db,
}

impl<'a> ProjectService<'a> {
    pub(crate) const fn new(gate: Gate<'a>, db: &'a Db) -> Self {
        Self { gate, db }
    }

    /// All projects, ascending by id.
    #[tracing::instrument(skip_all)]
    pub fn list(&self, request: &RequestContext) -> CoreResult<Vec<Project>> {
        self.gate
            .require(request, Capability::ReadProjects, "view projects")?;
        self.db.projects().list()
    }

    /// One project by id.
    ///
    /// Returns `Err(CoreError::ProjectNotFound)` if it does not exist.
    #[tracing::instrument(skip(self, request))]
    pub fn get(&self, request: &RequestContext, id: ProjectId) -> CoreResult<Project> {
        self.gate
            .require(request, Capability::ReadProjects, "view projects")?;
        self.db.projects().get(id)
    }

    #[tracing::instrument(skip_all)]
    pub fn create(&self, request: &RequestContext, fields: &ProjectFields) -> CoreResult<Project> {
        let principal = self
            .gate
            .require(request, Capability::EditProjects, "create projects")?;
        let project = self.db.projects().create(fields)?;
        tracing::info!(
            project_id = project.id,
            user_id = principal.user_id,
            "project created via service"
        );
        Ok(project)
    }

    /// Merge `fields` onto project `id` and validate the result.
    #[tracing::instrument(skip(self, request, fields))]
    pub fn update(
        &self,
        request: &RequestContext,
        id: ProjectId,
        fields: &ProjectFields,
    ) -> CoreResult<Project> {
        self.gate
            .require(request, Capability::EditProjects, "edit projects")?;
        self.db.projects().update(id, fields)
    }

    /// Delete project `id` together with its blocks.
    #[tracing::instrument(skip(self, request))]
    pub fn delete(&self, request: &RequestContext, id: ProjectId) -> CoreResult<()> {
        self.gate
            .require(request, Capability::EditProjects, "delete projects")?;
        self.db.projects().delete(id)
    }
}
