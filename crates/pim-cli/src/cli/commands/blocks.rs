//! Implementation of `pim blocks` subcommands.

use anyhow::{bail, Result};
use std::path::Path;

use crate::output::{Formatter, OutputFormat};
use pim_client::{BlockDraft, BlockPanel, PimClient};
use pim_core::model::{Element, FromTemplate, ProjectId, TemplateId};

use super::helpers::{client_error, open_session};

/// List the blocks attached to a project, oldest first.
pub fn run_blocks_list(
    root: &Path,
    token: Option<&str>,
    project_id: ProjectId,
    format: OutputFormat,
) -> Result<()> {
    let session = open_session(root, token)?;
    let blocks = session
        .client()
        .list_blocks(project_id)
        .map_err(client_error)?;
    Formatter::new(format).print_list(&blocks, "No blocks.", "blocks")
}

/// Compose a block and attach it to a project.
///
/// With `template`, the draft starts from that template's elements and each
/// `--element` either overrides the element with the same key or is appended.
#[tracing::instrument(skip(root, token, elements, format))]
pub fn run_blocks_add(
    root: &Path,
    token: Option<&str>,
    project_id: ProjectId,
    title: &str,
    template: Option<TemplateId>,
    elements: Vec<Element>,
    format: OutputFormat,
) -> Result<()> {
    let session = open_session(root, token)?;
    let mut panel = BlockPanel::new(session.client(), project_id);
    panel.load().map_err(client_error)?;

    if let Some(template_id) = template {
        if !panel.apply_template(template_id) {
            bail!("Template not found: {template_id}. Run 'pim templates list' to see available templates.");
        }
    }

    let draft = panel.draft_mut();
    draft.title = title.to_string();
    merge_elements(draft, elements);

    let block = panel.submit().map_err(client_error)?;
    Formatter::new(format).print(&block)
}

fn merge_elements(draft: &mut BlockDraft, elements: Vec<Element>) {
    for element in elements {
        match draft.elements.iter_mut().find(|e| e.key == element.key) {
            Some(existing) => *existing = element,
            None => draft.elements.push(element),
        }
    }
}

/// Stamp a new block from a template.
#[tracing::instrument(skip(root, token, format))]
pub fn run_blocks_from_template(
    root: &Path,
    token: Option<&str>,
    project_id: ProjectId,
    template_id: TemplateId,
    title: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let session = open_session(root, token)?;
    let block = session
        .client()
        .create_block_from_template(project_id, &FromTemplate { template_id, title })
        .map_err(client_error)?;
    Formatter::new(format).print(&block)
}
