//! Implementation of `pim templates` subcommands.

use anyhow::Result;
use std::path::Path;

use crate::output::{Formatter, OutputFormat};
use pim_client::PimClient;
use pim_core::model::TemplateId;

use super::helpers::{client_error, core_error, open_session};

pub fn run_templates_list(root: &Path, token: Option<&str>, format: OutputFormat) -> Result<()> {
    let session = open_session(root, token)?;
    let templates = session.client().list_templates().map_err(client_error)?;
    Formatter::new(format).print_list(&templates, "No templates.", "templates")
}

pub fn run_templates_show(
    root: &Path,
    token: Option<&str>,
    id: TemplateId,
    format: OutputFormat,
) -> Result<()> {
    let session = open_session(root, token)?;
    let template = session
        .services()
        .templates()
        .get(session.request(), id)
        .map_err(core_error)?;
    Formatter::new(format).print(&template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::helpers::testing::initialized_root;

    #[test]
    fn test_list_and_show() {
        let (dir, token) = initialized_root();
        run_templates_list(dir.path(), Some(&token), OutputFormat::Text).unwrap();

        let session = open_session(dir.path(), Some(&token)).unwrap();
        let first = session.client().list_templates().unwrap().remove(0);
        run_templates_show(dir.path(), Some(&token), first.id, OutputFormat::Json).unwrap();

        let err = run_templates_show(dir.path(), Some(&token), 4040, OutputFormat::Json).unwrap_err();
        assert!(err.to_string().contains("4040"));
    }
}
