//! Implementation of `pim status`, `pim whoami` and `pim stats`.

use anyhow::Result;
use std::path::Path;

use crate::output::{Formatter, OutputFormat};

use super::helpers::{core_error, open_session};

/// Service banner plus whether the supplied token is accepted.
pub fn run_status(root: &Path, token: Option<&str>, format: OutputFormat) -> Result<()> {
    let session = open_session(root, token)?;
    let status = session.services().status();
    let info = status.public_info();
    let auth = status.auth_status(session.request());

    let output = serde_json::json!({
        "service": info.service,
        "version": info.version,
        "timestamp": info.timestamp,
        "auth": auth,
    });
    Formatter::new(format).print(&output)
}

/// The authenticated caller.
pub fn run_whoami(root: &Path, token: Option<&str>, format: OutputFormat) -> Result<()> {
    let session = open_session(root, token)?;
    let principal = session
        .services()
        .status()
        .profile(session.request())
        .map_err(core_error)?;
    Formatter::new(format).print(&principal)
}

/// Record counts; administrators only.
pub fn run_stats(root: &Path, token: Option<&str>, format: OutputFormat) -> Result<()> {
    let session = open_session(root, token)?;
    let stats = session
        .services()
        .status()
        .admin_stats(session.request())
        .map_err(core_error)?;
    Formatter::new(format).print(&stats)
}
