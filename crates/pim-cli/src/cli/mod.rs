//! CLI command definitions and handlers.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use pim_client::SortField;
use pim_core::model::{Element, ProjectFields, ProjectStatus, ValueType};

pub mod commands;

/// Project information manager: projects, information blocks, templates
#[derive(Parser, Debug)]
#[command(name = "pim")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Bearer token identifying the caller
    #[arg(long, global = true, env = "PIM_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Directory containing .pim/ (default: current directory)
    #[arg(long, global = true, env = "PIM_ROOT")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create .pim/ with a config, an administrator token and stock templates
    Init {
        /// Display name of the initial administrator
        #[arg(long, default_value = "admin")]
        admin_name: String,
    },

    /// Service info and whether the current token is accepted
    Status,

    /// Show the authenticated caller
    Whoami,

    /// Project, block and template counts (administrators only)
    Stats,

    /// Manage projects
    #[command(subcommand)]
    Projects(ProjectsCommands),

    /// Manage a project's information blocks
    #[command(subcommand)]
    Blocks(BlocksCommands),

    /// Browse block templates
    #[command(subcommand)]
    Templates(TemplatesCommands),

    /// Send a raw request through the JSON API router
    Api {
        /// HTTP method (GET, POST, PUT, DELETE)
        method: String,

        /// Route path, e.g. /projects/1/blocks
        path: String,

        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },
}

// ============================================================================
// Projects subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ProjectsCommands {
    /// List projects
    List {
        /// Sort by a column
        #[arg(long, value_enum)]
        sort: Option<SortColumn>,

        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,
    },

    /// Show one project
    Show {
        /// Project ID
        id: i64,
    },

    /// Create a project
    Create {
        #[command(flatten)]
        fields: ProjectArgs,
    },

    /// Update fields of a project; unspecified fields are kept
    Update {
        /// Project ID
        id: i64,

        #[command(flatten)]
        fields: ProjectArgs,
    },

    /// Delete a project and its blocks
    Delete {
        /// Project ID
        id: i64,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

/// Sortable project columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SortColumn {
    MeetingName,
    ClientName,
    JobNumber,
    MeetingType,
    Status,
    StartDate,
    EndDate,
    PreconDate,
    KickoffDate,
}

impl From<SortColumn> for SortField {
    fn from(column: SortColumn) -> Self {
        match column {
            SortColumn::MeetingName => Self::MeetingName,
            SortColumn::ClientName => Self::ClientName,
            SortColumn::JobNumber => Self::JobNumber,
            SortColumn::MeetingType => Self::MeetingType,
            SortColumn::Status => Self::Status,
            SortColumn::StartDate => Self::StartDate,
            SortColumn::EndDate => Self::EndDate,
            SortColumn::PreconDate => Self::PreconDate,
            SortColumn::KickoffDate => Self::KickoffDate,
        }
    }
}

/// Project attributes settable from the command line.
///
/// Dates are `YYYY-MM-DD`; pass an empty string to clear an optional date.
#[derive(Args, Debug, Default, Clone)]
pub struct ProjectArgs {
    #[arg(long = "name")]
    pub meeting_name: Option<String>,
    #[arg(long = "client")]
    pub client_name: Option<String>,
    #[arg(long)]
    pub job_number: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub resources: Option<String>,
    #[arg(long = "start")]
    pub start_date: Option<String>,
    #[arg(long = "end")]
    pub end_date: Option<String>,
    #[arg(long, value_enum)]
    pub status: Option<ProjectStatus>,
    #[arg(long)]
    pub meeting_type: Option<String>,
    #[arg(long = "expected")]
    pub attendees_expected: Option<u32>,
    #[arg(long = "actual")]
    pub attendees_actual: Option<u32>,
    #[arg(long = "budget")]
    pub est_budget: Option<String>,
    #[arg(long)]
    pub cost_per_attendee: Option<String>,
    #[arg(long = "precon")]
    pub precon_date: Option<String>,
    #[arg(long = "kickoff")]
    pub kickoff_date: Option<String>,
    /// Custom field as KEY=VALUE (repeatable)
    #[arg(long = "custom", value_parser = parse_custom)]
    pub custom: Vec<(String, String)>,
}

impl From<ProjectArgs> for ProjectFields {
    fn from(args: ProjectArgs) -> Self {
        Self {
            meeting_name: args.meeting_name,
            client_name: args.client_name,
            job_number: args.job_number,
            description: args.description,
            resources: args.resources,
            start_date: args.start_date,
            end_date: args.end_date,
            status: args.status.map(|s| s.to_string()),
            meeting_type: args.meeting_type,
            attendees_expected: args.attendees_expected.map(Some),
            attendees_actual: args.attendees_actual.map(Some),
            est_budget: args.est_budget,
            cost_per_attendee: args.cost_per_attendee,
            precon_date: args.precon_date,
            kickoff_date: args.kickoff_date,
            custom: (!args.custom.is_empty()).then(|| args.custom.into_iter().collect()),
        }
    }
}

fn parse_custom(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("custom field key must not be empty".to_string());
    }
    Ok((key.to_string(), value.to_string()))
}

// ============================================================================
// Blocks subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum BlocksCommands {
    /// List a project's blocks
    List {
        /// Project ID
        project_id: i64,
    },

    /// Add a block built from scratch
    Add {
        /// Project ID
        project_id: i64,

        /// Block title
        #[arg(long)]
        title: String,

        /// Template ID to record as the block type (default: custom)
        #[arg(long)]
        template: Option<i64>,

        /// Element as KEY[:TYPE]=VALUE, in order (repeatable)
        #[arg(long = "element", short = 'e', value_parser = parse_element)]
        elements: Vec<Element>,
    },

    /// Add a block stamped from a template
    FromTemplate {
        /// Project ID
        project_id: i64,

        /// Template ID
        template_id: i64,

        /// Title (default: the template's title)
        #[arg(long)]
        title: Option<String>,
    },
}

/// Parse `KEY[:TYPE]=VALUE`, e.g. `Capacity:number=120` or `Notes=`.
pub fn parse_element(raw: &str) -> Result<Element, String> {
    let (head, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY[:TYPE]=VALUE, got '{raw}'"))?;
    let (key, value_type) = match head.rsplit_once(':') {
        Some((key, ty)) => (key, ty.parse::<ValueType>()?),
        None => (head, ValueType::Text),
    };
    let key = key.trim();
    if key.is_empty() {
        return Err("element key must not be empty".to_string());
    }
    Ok(Element::new(key, value, value_type))
}

// ============================================================================
// Templates subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum TemplatesCommands {
    /// List templates
    List,

    /// Show one template
    Show {
        /// Template ID
        id: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_element() {
        assert_eq!(
            parse_element("Capacity:number=120").unwrap(),
            Element::new("Capacity", "120", ValueType::Number)
        );
        assert_eq!(
            parse_element("Notes=").unwrap(),
            Element::new("Notes", "", ValueType::Text)
        );
        assert_eq!(
            parse_element("Link:url=https://example.com/a=b").unwrap(),
            Element::new("Link", "https://example.com/a=b", ValueType::Url)
        );
        assert!(parse_element("Capacity:weight=1").is_err());
        assert!(parse_element("=value").is_err());
        assert!(parse_element("novalue").is_err());
    }

    #[test]
    fn test_project_args_into_fields() {
        let cli = Cli::parse_from([
            "pim", "projects", "create", "--name", "Kickoff", "--status", "active",
            "--custom", "dress_code=casual", "--start", "2024-01-02",
        ]);
        let Commands::Projects(ProjectsCommands::Create { fields }) = cli.command else {
            panic!("expected projects create");
        };
        let fields = ProjectFields::from(fields);
        assert_eq!(fields.meeting_name.as_deref(), Some("Kickoff"));
        assert_eq!(fields.status.as_deref(), Some("active"));
        assert_eq!(fields.start_date.as_deref(), Some("2024-01-02"));
        assert_eq!(
            fields.custom.unwrap().get("dress_code").map(String::as_str),
            Some("casual")
        );
        assert!(fields.client_name.is_none());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["pim", "templates", "list", "--json", "--token", "abc"]);
        assert!(cli.json);
        assert_eq!(cli.token.as_deref(), Some("abc"));
    }
}
