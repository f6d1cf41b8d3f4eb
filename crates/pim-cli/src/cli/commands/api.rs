//! Implementation of `pim api`: one raw request through the router.

use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;

use crate::output::{Formatter, OutputFormat};
use pim_core::api::{ApiRequest, ApiResponse, Method};

use super::helpers::open_session;

/// Dispatch `method path [body]` and print the response.
///
/// The response body is printed for both success and failure; a non-2xx
/// status also makes the command fail.
#[tracing::instrument(skip(root, token, body, format))]
pub fn run_api(
    root: &Path,
    token: Option<&str>,
    method: &str,
    path: &str,
    body: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let response = send(root, token, method, path, body)?;

    let formatter = Formatter::new(format);
    match format {
        OutputFormat::Json => formatter.print(&serde_json::json!({
            "status": response.status,
            "body": response.body,
        }))?,
        OutputFormat::Text => formatter.print(&response.body)?,
    }

    if !response.is_success() {
        bail!("Request failed with HTTP {}", response.status);
    }
    Ok(())
}

fn send(
    root: &Path,
    token: Option<&str>,
    method: &str,
    path: &str,
    body: Option<&str>,
) -> Result<ApiResponse> {
    let method: Method = method.parse().map_err(|e: String| anyhow!(e))?;
    let mut request = ApiRequest::new(method, path);
    if let Some(raw) = body {
        let value = serde_json::from_str(raw).context("--body is not valid JSON")?;
        request = request.with_body(value);
    }

    let session = open_session(root, token)?;
    Ok(session.router().dispatch(&request.with_token(session.token())))
}
