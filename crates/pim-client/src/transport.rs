//! Client transport: the [`PimClient`] trait and an in-process implementation.

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use pim_core::api::{ApiRequest, ErrorBody, Router};
use pim_core::model::{
    Block, FromTemplate, NewBlock, Project, ProjectFields, ProjectId, Template,
};
use pim_core::validate::FieldErrors;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected before any request was sent.
    #[error("{message}")]
    LocalValidation { field: String, message: String },

    /// The server rejected one or more fields.
    #[error("Validation failed: {fields}")]
    Validation { fields: FieldErrors },

    /// Any other non-success response.
    #[error("{message} (HTTP {status})")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// The row addressed by the caller is not in local state.
    #[error("No project with id {id} in the list")]
    UnknownRow { id: ProjectId },

    /// The response could not be read.
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl ClientError {
    pub(crate) fn local(field: &str, message: impl Into<String>) -> Self {
        Self::LocalValidation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Per-field messages, for errors that carry them.
    #[must_use]
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            Self::Validation { fields } => Some(fields.clone()),
            Self::LocalValidation { field, message } => {
                let mut fields = FieldErrors::new();
                fields.insert(field.as_str(), message.as_str());
                Some(fields)
            }
            _ => None,
        }
    }
}

/// Operations the client state needs from the server.
pub trait PimClient {
    fn list_projects(&self) -> ClientResult<Vec<Project>>;
    fn create_project(&self, fields: &ProjectFields) -> ClientResult<Project>;
    fn update_project(&self, id: ProjectId, fields: &ProjectFields) -> ClientResult<Project>;
    fn delete_project(&self, id: ProjectId) -> ClientResult<()>;
    fn list_blocks(&self, project_id: ProjectId) -> ClientResult<Vec<Block>>;
    fn create_block(&self, project_id: ProjectId, block: &NewBlock) -> ClientResult<Block>;
    fn create_block_from_template(
        &self,
        project_id: ProjectId,
        from: &FromTemplate,
    ) -> ClientResult<Block>;
    fn list_templates(&self) -> ClientResult<Vec<Template>>;
}

impl<C: PimClient + ?Sized> PimClient for &C {
    fn list_projects(&self) -> ClientResult<Vec<Project>> {
        (**self).list_projects()
    }
    fn create_project(&self, fields: &ProjectFields) -> ClientResult<Project> {
        (**self).create_project(fields)
    }
    fn update_project(&self, id: ProjectId, fields: &ProjectFields) -> ClientResult<Project> {
        (**self).update_project(id, fields)
    }
    fn delete_project(&self, id: ProjectId) -> ClientResult<()> {
        (**self).delete_project(id)
    }
    fn list_blocks(&self, project_id: ProjectId) -> ClientResult<Vec<Block>> {
        (**self).list_blocks(project_id)
    }
    fn create_block(&self, project_id: ProjectId, block: &NewBlock) -> ClientResult<Block> {
        (**self).create_block(project_id, block)
    }
    fn create_block_from_template(
        &self,
        project_id: ProjectId,
        from: &FromTemplate,
    ) -> ClientResult<Block> {
        (**self).create_block_from_template(project_id, from)
    }
    fn list_templates(&self) -> ClientResult<Vec<Template>> {
        (**self).list_templates()
    }
}

/// Client that sends JSON requests through an in-process [`Router`].
///
/// Every call goes through the same serialization and error mapping a
/// remote client would see.
pub struct LocalClient {
    router: Router,
    token: Option<String>,
}

impl LocalClient {
    #[must_use]
    pub const fn new(router: Router, token: Option<String>) -> Self {
        Self { router, token }
    }

    #[must_use]
    pub const fn router(&self) -> &Router {
        &self.router
    }

    fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        let request = request.with_token(self.token.clone());
        tracing::debug!(method = %request.method, path = %request.path, "client request");
        let response = self.router.dispatch(&request);

        if response.is_success() {
            return serde_json::from_value(response.body)
                .with_context(|| format!("Unexpected response body from {}", request.path))
                .map_err(ClientError::from);
        }

        let error: ErrorBody = serde_json::from_value(response.body)
            .with_context(|| format!("Unreadable error body from {}", request.path))?;
        Err(match error.fields {
            Some(fields) if error.code == "validation" => ClientError::Validation { fields },
            _ => ClientError::Api {
                status: response.status,
                code: error.code,
                message: error.message,
            },
        })
    }
}

fn body<T: Serialize>(value: &T) -> ClientResult<serde_json::Value> {
    serde_json::to_value(value)
        .context("Failed to encode request body")
        .map_err(ClientError::from)
}

impl PimClient for LocalClient {
    fn list_projects(&self) -> ClientResult<Vec<Project>> {
        self.call(ApiRequest::get("/projects"))
    }

    fn create_project(&self, fields: &ProjectFields) -> ClientResult<Project> {
        self.call(ApiRequest::post("/projects", body(fields)?))
    }

    fn update_project(&self, id: ProjectId, fields: &ProjectFields) -> ClientResult<Project> {
        self.call(ApiRequest::put(format!("/projects/{id}"), body(fields)?))
    }

    fn delete_project(&self, id: ProjectId) -> ClientResult<()> {
        let _: serde_json::Value = self.call(ApiRequest::delete(format!("/projects/{id}")))?;
        Ok(())
    }

    fn list_blocks(&self, project_id: ProjectId) -> ClientResult<Vec<Block>> {
        self.call(ApiRequest::get(format!("/projects/{project_id}/blocks")))
    }

    fn create_block(&self, project_id: ProjectId, block: &NewBlock) -> ClientResult<Block> {
        self.call(ApiRequest::post(
            format!("/projects/{project_id}/blocks"),
            body(block)?,
        ))
    }

    fn create_block_from_template(
        &self,
        project_id: ProjectId,
        from: &FromTemplate,
    ) -> ClientResult<Block> {
        self.call(ApiRequest::post(
            format!("/projects/{project_id}/blocks/from-template"),
            body(from)?,
        ))
    }

    fn list_templates(&self) -> ClientResult<Vec<Template>> {
        self.call(ApiRequest::get("/block-templates"))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use pim_core::api::Router;
    use pim_core::auth::{Principal, Role, TokenAuthenticator};
    use pim_core::config::default_templates;
    use pim_core::core::PimServices;
    use pim_core::store::Db;

    use super::LocalClient;

    /// In-process client over a fresh in-memory database, authenticated as `role`.
    pub(crate) fn client(role: Role) -> LocalClient {
        let db = Db::open_in_memory().unwrap();
        db.init_schema().unwrap();
        db.templates().seed(&default_templates()).unwrap();
        let auth: TokenAuthenticator = [(
            "token".to_string(),
            Principal {
                user_id: 1,
                name: "tester".to_string(),
                role,
            },
        )]
        .into_iter()
        .collect();
        LocalClient::new(
            Router::new(PimServices::new(db, auth)),
            Some("token".to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::testing::client;
    use super::*;
    use pim_core::auth::Role;

    #[test]
    fn test_round_trip_through_router() {
        let client = client(Role::Editor);
        let created = client
            .create_project(&ProjectFields::named("Kickoff"))
            .unwrap();
        assert_eq!(client.list_projects().unwrap(), vec![created.clone()]);

        let id = created.id.unwrap();
        client.delete_project(id).unwrap();
        assert!(client.list_projects().unwrap().is_empty());
    }

    #[test]
    fn test_validation_errors_keep_fields() {
        let client = client(Role::Editor);
        let err = client
            .create_project(&ProjectFields::named(" "))
            .unwrap_err();
        let fields = err.field_errors().unwrap();
        assert!(fields.get("meeting_name").is_some());
    }

    #[test]
    fn test_other_errors_carry_status() {
        let client = client(Role::Subscriber);
        let err = client
            .create_project(&ProjectFields::named("Kickoff"))
            .unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 403, .. }));

        let err = client.delete_project(77).unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 403, .. }));
    }

    #[test]
    fn test_missing_token() {
        let mut client = client(Role::Administrator);
        client.token = None;
        let err = client.list_projects().unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 401, .. }));
    }
}
