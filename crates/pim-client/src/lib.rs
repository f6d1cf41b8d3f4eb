//! pim-client: client-side state for the project information manager.
//!
//! Mirrors the server's project list locally (with a trailing draft row),
//! applies per-field edits, reconciles save/delete responses, and sorts the
//! view. The server is reached through the [`PimClient`] trait.

pub mod blocks;
pub mod sort;
pub mod state;
pub mod transport;

pub use blocks::{BlockDraft, BlockPanel};
pub use sort::{SortDirection, SortField, SortState};
pub use state::{ProjectField, ProjectListState};
pub use transport::{ClientError, ClientResult, LocalClient, PimClient};
