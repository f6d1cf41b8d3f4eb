//! pim-cli: command-line front end for the project information manager.
//!
//! Every command opens the root's `.pim/` directory, wraps the services in
//! the in-process API router, and talks to it through the same client
//! used by other front ends.

pub mod cli;
pub mod logging;
pub mod output;
