//! Build-time version information.

/// Human-readable service name reported by the public endpoint.
pub const SERVICE_NAME: &str = "project-info-manager";

/// Crate version, as reported to clients.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Namespace used by the API routes, mirroring the host's REST prefix.
pub const API_NAMESPACE: &str = "project-info-manager/v1";
