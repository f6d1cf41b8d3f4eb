//! Block service: list a project's blocks, create from scratch or from a template.

use crate::auth::{Capability, RequestContext};
use crate::model::{Block, FromTemplate, NewBlock, ProjectId};
use crate::store::Db;

use super::{CoreResult, Gate};

/// Service for block operations.
pub struct BlockService<'a> {
    gate: Gate<'a>,
    db: &'a Db,
}

impl<'a> BlockService<'a> {
    pub(crate) const fn new(gate: Gate<'a>, db: &'a Db) -> Self {
        Self { gate, db }
    }

    #[tracing::instrument(skip(self, request))]
    pub fn list(&self, request: &RequestContext, project_id: ProjectId) -> CoreResult<Vec<Block>> {
        self.gate
            .require(request, Capability::ReadProjects, "view project blocks")?;
        self.db.blocks().list_for_project(project_id)
    }

    #[tracing::instrument(skip(self, request, block), fields(title = %block.title))]
    pub fn create(
        &self,
        request: &RequestContext,
        project_id: ProjectId,
        block: &NewBlock,
    ) -> CoreResult<Block> {
        self.gate
            .require(request, Capability::EditProjects, "add project blocks")?;
        self.db.blocks().create(project_id, block)
    }

    #[tracing::instrument(skip(self, request, from), fields(template_id = from.template_id))]
    pub fn create_from_template(
        &self,
        request: &RequestContext,
        project_id: ProjectId,
        from: &FromTemplate,
    ) -> CoreResult<Block> {
        self.gate
            .require(request, Capability::EditProjects, "add project blocks")?;
        self.db
            .blocks()
            .create_from_template(project_id, from.template_id, from.title.as_deref())
    }
}
