//! Block panel: a project's blocks, the available templates, and the block
//! being composed.

use pim_core::model::{Block, BlockType, Element, NewBlock, ProjectId, Template, TemplateId, ValueType};
use pim_core::validate::FieldErrors;

use crate::transport::{ClientError, ClientResult, PimClient};

/// A block under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockDraft {
    pub title: String,
    pub block_type: BlockType,
    pub elements: Vec<Element>,
}

impl BlockDraft {
    /// Append an empty text element.
    pub fn add_element(&mut self) {
        self.elements.push(Element::new("", "", ValueType::Text));
    }

    /// Mutable access to one element, for key/value/type edits.
    pub fn element_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.elements.get_mut(index)
    }

    /// Take the template's type and a copy of its elements.
    ///
    /// The title is left as typed.
    pub fn apply_template(&mut self, template: &Template) {
        self.block_type = BlockType::Template(template.id);
        self.elements.clone_from(&template.elements);
    }

    /// A block needs a title and at least one element before it can be saved.
    #[must_use]
    pub fn can_save(&self) -> bool {
        !self.title.trim().is_empty() && !self.elements.is_empty()
    }

    fn to_new_block(&self) -> NewBlock {
        NewBlock {
            title: self.title.clone(),
            block_type: self.block_type,
            elements: self.elements.clone(),
        }
    }
}

/// Blocks of one project plus the draft being composed.
///
/// Failed loads and submits are kept for display: per-field messages in
/// [`Self::field_errors`], anything else in [`Self::banner`].
pub struct BlockPanel<C> {
    client: C,
    project_id: ProjectId,
    blocks: Vec<Block>,
    templates: Vec<Template>,
    draft: BlockDraft,
    field_errors: FieldErrors,
    banner: Option<String>,
}

impl<C: PimClient> BlockPanel<C> {
    pub fn new(client: C, project_id: ProjectId) -> Self {
        Self {
            client,
            project_id,
            blocks: Vec::new(),
            templates: Vec::new(),
            draft: BlockDraft::default(),
            field_errors: FieldErrors::new(),
            banner: None,
        }
    }

    /// Fetch the project's blocks and the template list.
    pub fn load(&mut self) -> ClientResult<()> {
        let fetched = self
            .client
            .list_blocks(self.project_id)
            .and_then(|blocks| Ok((blocks, self.client.list_templates()?)));
        let (blocks, templates) = self.record(fetched)?;
        self.blocks = blocks;
        self.templates = templates;
        Ok(())
    }

    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub const fn draft(&self) -> &BlockDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut BlockDraft {
        &mut self.draft
    }

    pub const fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Apply a loaded template to the draft. Unknown ids leave it unchanged.
    pub fn apply_template(&mut self, template_id: TemplateId) -> bool {
        match self.templates.iter().find(|t| t.id == template_id) {
            Some(template) => {
                self.draft.apply_template(template);
                true
            }
            None => false,
        }
    }

    /// Create the draft on the server, append the result, reset the draft.
    pub fn submit(&mut self) -> ClientResult<Block> {
        let result = if self.draft.can_save() {
            self.client
                .create_block(self.project_id, &self.draft.to_new_block())
        } else {
            let field = if self.draft.title.trim().is_empty() {
                "title"
            } else {
                "elements"
            };
            Err(ClientError::local(
                field,
                "A block needs a title and at least one element",
            ))
        };
        let created = self.record(result)?;
        self.blocks.push(created.clone());
        self.draft = BlockDraft::default();
        Ok(created)
    }

    /// Clear old errors, then surface the outcome of `result`.
    fn record<T>(&mut self, result: ClientResult<T>) -> ClientResult<T> {
        self.field_errors = FieldErrors::new();
        self.banner = None;
        if let Err(err) = &result {
            match err.field_errors() {
                Some(fields) => self.field_errors = fields,
                None => self.banner = Some(err.to_string()),
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::client;
    use crate::transport::LocalClient;
    use pim_core::auth::Role;
    use pim_core::model::{FromTemplate, ProjectFields};

    fn panel() -> BlockPanel<LocalClient> {
        let client = client(Role::Editor);
        let project = client
            .create_project(&ProjectFields::named("Kickoff"))
            .unwrap();
        let mut panel = BlockPanel::new(client, project.id.unwrap());
        panel.load().unwrap();
        panel
    }

    #[test]
    fn test_load_lists_templates() {
        let panel = panel();
        assert!(panel.blocks().is_empty());
        assert!(!panel.templates().is_empty());
    }

    #[test]
    fn test_can_save_needs_title_and_element() {
        let mut draft = BlockDraft::default();
        assert!(!draft.can_save());
        draft.title = "Scope".to_string();
        assert!(!draft.can_save());
        draft.add_element();
        assert!(draft.can_save());
    }

    #[test]
    fn test_submit_rejects_incomplete_draft() {
        let mut panel = panel();
        panel.draft_mut().title = "Scope".to_string();
        let err = panel.submit().unwrap_err();
        assert!(matches!(err, ClientError::LocalValidation { ref field, .. } if field == "elements"));
        assert!(panel.field_errors().get("elements").is_some());
        assert!(panel.banner().is_none());
        assert!(panel.blocks().is_empty());

        panel.draft_mut().add_element();
        panel.submit().unwrap();
        assert!(panel.field_errors().is_empty());
    }

    #[test]
    fn test_load_missing_project_sets_banner() {
        let mut panel = BlockPanel::new(client(Role::Editor), 9999);
        let err = panel.load().unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 404, .. }));
        assert!(panel.banner().is_some_and(|b| b.contains("9999")));
        assert!(panel.field_errors().is_empty());
        assert!(panel.templates().is_empty());
    }

    #[test]
    fn test_server_rejection_sets_banner_and_keeps_draft() {
        let mut panel = panel();
        panel.draft_mut().title = "Venue".to_string();
        panel.draft_mut().add_element();
        panel.draft_mut().block_type = BlockType::Template(4040);
        let before = panel.draft().clone();

        let err = panel.submit().unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 400, .. }));
        assert!(panel.banner().is_some());
        assert!(panel.field_errors().is_empty());
        assert_eq!(panel.draft(), &before);
        assert!(panel.blocks().is_empty());
    }

    #[test]
    fn test_compose_and_submit_custom_block() {
        let mut panel = panel();
        panel.draft_mut().title = "Scope".to_string();
        panel.draft_mut().add_element();
        let element = panel.draft_mut().element_mut(0).unwrap();
        element.key = "Budget".to_string();
        element.value = "1500".to_string();
        element.value_type = ValueType::Number;

        let created = panel.submit().unwrap();
        assert_eq!(created.block_type, BlockType::Custom);
        assert_eq!(created.elements[0].key, "Budget");
        assert_eq!(panel.blocks(), &[created]);
        assert_eq!(panel.draft(), &BlockDraft::default());
    }

    #[test]
    fn test_apply_template_copies_elements() {
        let mut panel = panel();
        let template = panel.templates()[0].clone();

        assert!(!panel.apply_template(template.id + 1000));
        assert!(panel.apply_template(template.id));
        assert_eq!(panel.draft().elements, template.elements);
        assert_eq!(panel.draft().block_type, BlockType::Template(template.id));

        panel.draft_mut().elements[0].value = "Hall A".to_string();
        assert_ne!(panel.draft().elements, panel.templates()[0].elements);

        panel.draft_mut().title = "Venue".to_string();
        let created = panel.submit().unwrap();
        assert_eq!(created.elements[0].value, "Hall A");
        assert_eq!(created.block_type, BlockType::Template(template.id));
    }

    #[test]
    fn test_blocks_from_template_show_after_reload() {
        let mut panel = panel();
        let template_id = panel.templates()[0].id;
        panel
            .client
            .create_block_from_template(
                panel.project_id(),
                &FromTemplate {
                    template_id,
                    title: Some("Main hall".to_string()),
                },
            )
            .unwrap();
        panel.load().unwrap();
        assert_eq!(panel.blocks()[0].title, "Main hall");
    }
}
