//! Command implementations.

pub mod api;
pub mod blocks;
pub mod helpers;
pub mod init;
pub mod projects;
pub mod status;
pub mod templates;

pub use api::run_api;
pub use blocks::{run_blocks_add, run_blocks_from_template, run_blocks_list};
pub use init::run_init;
pub use projects::{
    run_projects_create, run_projects_delete, run_projects_list, run_projects_show,
    run_projects_update,
};
pub use status::{run_stats, run_status, run_whoami};
pub use templates::{run_templates_list, run_templates_show};
