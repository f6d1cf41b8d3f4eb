//! pim - project information manager

use anyhow::Result;
use clap::Parser;
use std::env;

use pim_cli::cli::commands::{
    run_api, run_blocks_add, run_blocks_from_template, run_blocks_list, run_init,
    run_projects_create, run_projects_delete, run_projects_list, run_projects_show,
    run_projects_update, run_stats, run_status, run_templates_list, run_templates_show,
    run_whoami,
};
use pim_cli::cli::{BlocksCommands, Cli, Commands, ProjectsCommands, TemplatesCommands};
use pim_cli::logging;
use pim_cli::output::OutputFormat;

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    let root = match cli.root {
        Some(root) => root,
        None => env::current_dir()?,
    };
    let token = cli.token.as_deref();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Commands::Init { admin_name } => run_init(&root, &admin_name, format)?,
        Commands::Status => run_status(&root, token, format)?,
        Commands::Whoami => run_whoami(&root, token, format)?,
        Commands::Stats => run_stats(&root, token, format)?,
        Commands::Projects(cmd) => match cmd {
            ProjectsCommands::List { sort, desc } => {
                run_projects_list(&root, token, sort.map(Into::into), desc, format)?;
            }
            ProjectsCommands::Show { id } => run_projects_show(&root, token, id, format)?,
            ProjectsCommands::Create { fields } => {
                run_projects_create(&root, token, &fields.into(), format)?;
            }
            ProjectsCommands::Update { id, fields } => {
                run_projects_update(&root, token, id, &fields.into(), format)?;
            }
            ProjectsCommands::Delete { id, yes } => {
                run_projects_delete(&root, token, id, yes, format)?;
            }
        },
        Commands::Blocks(cmd) => match cmd {
            BlocksCommands::List { project_id } => {
                run_blocks_list(&root, token, project_id, format)?;
            }
            BlocksCommands::Add {
                project_id,
                title,
                template,
                elements,
            } => {
                run_blocks_add(&root, token, project_id, &title, template, elements, format)?;
            }
            BlocksCommands::FromTemplate {
                project_id,
                template_id,
                title,
            } => {
                run_blocks_from_template(&root, token, project_id, template_id, title, format)?;
            }
        },
        Commands::Templates(cmd) => match cmd {
            TemplatesCommands::List => run_templates_list(&root, token, format)?,
            TemplatesCommands::Show { id } => run_templates_show(&root, token, id, format)?,
        },
        Commands::Api { method, path, body } => {
            run_api(&root, token, &method, &path, body.as_deref(), format)?;
        }
    }

    Ok(())
}
