//! Template service: read-only access to block templates.

use crate::auth::{Capability, RequestContext};
use crate::model::{Template, TemplateId};
use crate::store::{Db, Store};

use super::{CoreResult, Gate};

pub struct TemplateService<'a> {
    gate: Gate<'a>,
    db: &'a Db,
}

impl<'a> TemplateService<'a> {
    pub(crate) const fn new(gate: Gate<'a>, db: &'a Db) -> Self {
        Self { gate, db }
    }

    #[tracing::instrument(skip_all)]
    pub fn list(&self, request: &RequestContext) -> CoreResult<Vec<Template>> {
        self.gate
            .require(request, Capability::ReadProjects, "view block templates")?;
        self.db.templates().list()
    }

    #[tracing::instrument(skip(self, request))]
    pub fn get(&self, request: &RequestContext, id: TemplateId) -> CoreResult<Template> {
        self.gate
            .require(request, Capability::ReadProjects, "view block templates")?;
        self.db.templates().get(id)
    }
}
